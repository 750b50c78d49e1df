//! Reconciliation of a cached run configuration with the intended one.

use snc_core::errors::{ErrorInfo, SncError};
use snc_exp::RunConfig;
use tracing::info;

/// Overwrites every field of `loaded` with the value of `intended`, logging
/// each change. The result equals `intended`; fields only `loaded` carries
/// mean the cache entry belongs to another configuration.
pub fn reconcile(intended: &RunConfig, loaded: &RunConfig) -> Result<RunConfig, SncError> {
    let target = intended.to_fields()?;
    let mut fields = loaded.to_fields()?;
    let run = intended.id()?;
    for (key, value) in &target {
        match fields.get(key) {
            Some(current) if current == value => {}
            current => {
                let from = current.map(|v| v.to_string()).unwrap_or_else(|| "<absent>".to_string());
                info!(run = %run, key = %key, from = %from, to = %value, "reconciled run configuration field");
                fields.insert(key.clone(), value.clone());
            }
        }
    }
    if fields != target {
        let leftover: Vec<String> = fields
            .keys()
            .filter(|key| !target.contains_key(*key))
            .cloned()
            .collect();
        return Err(SncError::Consistency(
            ErrorInfo::new("run_config_mismatch", "cached run configuration cannot be reconciled")
                .with_context("unique_id", run)
                .with_context("fields", leftover.join(","))
                .with_hint("remove the cached artifact or rerun with --overwrite-creation"),
        ));
    }
    RunConfig::from_fields(fields)
}
