//! Merging scored results into the graph set before export.

use std::collections::BTreeMap;

use serde_json::Value;
use snc_core::errors::{ErrorInfo, SncError};
use snc_core::graph::{GraphEntry, GraphRole, GraphSet, FINAL_STAGE};

/// Attaches each role's result to a copy of `graphs` and verifies the copy.
///
/// `graphs` is left untouched. Every role in `expected` must be present, every
/// expected SNN role must have a result, and results can only be attached to
/// SNN graphs. The copy is marked with the final stage and must then carry
/// markers for stages 1 to 4.
pub fn integrate(
    graphs: &GraphSet,
    results: &BTreeMap<GraphRole, Value>,
    expected: &[GraphRole],
) -> Result<GraphSet, SncError> {
    let mut merged = graphs.clone();
    for role in expected.iter().copied().filter(|role| role.is_snn()) {
        if !results.contains_key(&role) {
            return Err(SncError::StructuralIntegrity(
                ErrorInfo::new("missing_result", "scorer returned no result for role")
                    .with_context("role", role.name()),
            ));
        }
    }
    for (role, result) in results {
        match merged.require_mut(*role)? {
            GraphEntry::Input(_) => {
                return Err(SncError::UnsupportedType(
                    ErrorInfo::new("result_target", "results attach to SNN graphs only")
                        .with_context("role", role.name())
                        .with_context("found", "input"),
                ))
            }
            entry => entry.as_snn_mut()?.results = Some(result.clone()),
        }
    }
    merged.mark_stage(FINAL_STAGE);
    merged.verify_stages(expected, FINAL_STAGE)?;
    Ok(merged)
}
