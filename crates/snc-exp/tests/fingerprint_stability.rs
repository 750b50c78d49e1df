use std::collections::BTreeMap;

use proptest::prelude::*;
use serde_json::{json, Value};
use snc_exp::{
    config_to_filename, fingerprint, AlgorithmChoice, ExportOptions, RunConfig, SimulatorKind,
    StageOverwrites, Variant, MAX_FILENAME_LEN, NON_SEMANTIC_FIELDS,
};

fn run(seed: u64, m_val: i64) -> RunConfig {
    let mut params = BTreeMap::new();
    params.insert("m_val".to_string(), json!(m_val));
    RunConfig {
        algorithm: AlgorithmChoice {
            name: "MDSA".to_string(),
            params,
        },
        adaptation: None,
        radiation: Some(Variant::new("neuron_death", json!(0.25))),
        seed,
        graph_size: 3,
        graph_nr: 0,
        simulator: SimulatorKind::Nx,
        overwrite: StageOverwrites::default(),
        export: ExportOptions::default(),
        unique_id: None,
        extra: BTreeMap::new(),
    }
}

#[test]
fn key_order_does_not_change_fingerprint() {
    let forward: Value = serde_json::from_str(r#"{"a": 1, "b": {"c": 2, "d": [3, 4]}}"#).unwrap();
    let reversed: Value = serde_json::from_str(r#"{"b": {"d": [3, 4], "c": 2}, "a": 1}"#).unwrap();
    assert_eq!(
        fingerprint(&forward, &[]).unwrap(),
        fingerprint(&reversed, &[]).unwrap()
    );
}

#[test]
fn adaptation_none_differs_from_present() {
    let plain = run(1, 2);
    let mut adapted = plain.clone();
    adapted.adaptation = Some(Variant::new("redundancy", json!(2)));
    assert_ne!(plain.fingerprint().unwrap(), adapted.fingerprint().unwrap());
}

#[test]
fn unknown_extra_fields_are_semantic() {
    let plain = run(1, 2);
    let mut extended = plain.clone();
    extended.extra.insert("legacy_flag".to_string(), json!(true));
    assert_ne!(plain.fingerprint().unwrap(), extended.fingerprint().unwrap());
}

#[test]
fn supplied_id_must_match_content() {
    let mut pinned = run(1, 2);
    pinned.unique_id = Some("not-a-fingerprint".to_string());
    let err = pinned.with_unique_id().unwrap_err();
    assert_eq!(err.info().code, "unique_id_mismatch");

    let assigned = run(1, 2).with_unique_id().unwrap();
    assert_eq!(assigned.id().unwrap(), run(1, 2).fingerprint().unwrap());
    assert!(assigned.clone().with_unique_id().is_ok());
}

#[test]
fn long_configurations_fall_back_to_digest_filenames() {
    let short = json!({"algorithm": "MDSA", "m_val": 2});
    let name = config_to_filename(&short, &NON_SEMANTIC_FIELDS).unwrap();
    assert_eq!(name, "algorithm=MDSA,m_val=2");

    let long = json!({"description": "x".repeat(MAX_FILENAME_LEN + 1)});
    let name = config_to_filename(&long, &NON_SEMANTIC_FIELDS).unwrap();
    assert_eq!(name, fingerprint(&long, &NON_SEMANTIC_FIELDS).unwrap());
    assert_eq!(name.len(), 64);
}

proptest! {
    #[test]
    fn execution_controls_do_not_affect_identity(
        seed in any::<u64>(),
        m_val in 0i64..20,
        flags in proptest::array::uniform4(any::<bool>()),
        export_images in any::<bool>(),
    ) {
        let base = run(seed, m_val);
        let mut toggled = base.clone();
        toggled.overwrite = StageOverwrites {
            creation: flags[0],
            propagation: flags[1],
            visualisation: flags[2],
            results: flags[3],
        };
        toggled.export = ExportOptions {
            export_images,
            export_types: vec!["svg".to_string()],
            show_snns: !export_images,
        };
        prop_assert_eq!(base.fingerprint().unwrap(), toggled.fingerprint().unwrap());
    }

    #[test]
    fn semantic_differences_change_identity(seed in any::<u64>(), m_val in 0i64..20) {
        let base = run(seed, m_val);
        prop_assert_ne!(base.fingerprint().unwrap(), run(seed.wrapping_add(1), m_val).fingerprint().unwrap());
        prop_assert_ne!(base.fingerprint().unwrap(), run(seed, m_val + 1).fingerprint().unwrap());
        let mut resized = base.clone();
        resized.graph_size += 1;
        prop_assert_ne!(base.fingerprint().unwrap(), resized.fingerprint().unwrap());
    }
}
