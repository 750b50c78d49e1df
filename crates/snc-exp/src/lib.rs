//! Experiment configuration, fingerprinting and expansion for the SNC pipeline.

mod config;
mod expand;
mod hash;
mod serde;
mod settings;

pub use config::{
    AlgorithmChoice, ExperimentConfig, ExportOptions, ParamValues, RangeSpec, RunConfig,
    SimulatorKind, StageOverwrites, Variant, MAX_RANGE_LEN, NON_SEMANTIC_FIELDS,
};
pub use expand::{expand, expand_pinned, expand_with};
pub use hash::{config_to_filename, fingerprint, flatten, stable_hash_string, MAX_FILENAME_LEN};
pub use settings::{ParamSchema, SupportedSettings};

pub use crate::serde::{
    from_json_slice, load_settings_file, to_canonical_json_bytes, to_canonical_value,
};
