use snc_core::errors::{ErrorInfo, SncError};

fn sample_info(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_context("run", "abc")
        .with_context("stage", "2")
}

#[test]
fn configuration_error_surface() {
    let err = SncError::Configuration(sample_info("unsupported_algorithm", "BFS"));
    assert_eq!(err.info().code, "unsupported_algorithm");
    assert!(err.info().context.contains_key("run"));
    assert!(err.to_string().starts_with("configuration error"));
}

#[test]
fn consistency_error_surface() {
    let err = SncError::Consistency(sample_info("run_config_mismatch", "unequal"));
    assert_eq!(err.info().code, "run_config_mismatch");
}

#[test]
fn structural_error_surface() {
    let err = SncError::structural("missing_role", "adapted graph absent");
    assert_eq!(err.info().code, "missing_role");
    assert!(err.info().context.is_empty());
}

#[test]
fn unsupported_type_error_surface() {
    let err = SncError::UnsupportedType(sample_info("graph_kind", "input graph"));
    assert_eq!(err.info().context.get("stage").map(String::as_str), Some("2"));
}

#[test]
fn display_includes_context_and_hint() {
    let err = SncError::Aborted(
        ErrorInfo::new("stale_visualisation", "operator declined")
            .with_context("run", "abc")
            .with_hint("pass --overwrite-visualisation"),
    );
    let rendered = err.to_string();
    assert!(rendered.contains("code: stale_visualisation"));
    assert!(rendered.contains("run=abc"));
    assert!(rendered.contains("hint: pass --overwrite-visualisation"));
}

#[test]
fn errors_roundtrip_through_json() {
    let err = SncError::serde("stage_write", "disk full");
    let json = serde_json::to_string(&err).expect("serialize");
    let back: SncError = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(err, back);
}

#[test]
fn context_can_be_added_to_any_variant() {
    let err = SncError::Simulation(ErrorInfo::new("non_finite_state", "diverged"))
        .with_context("state", "stage-2");
    assert!(matches!(err, SncError::Simulation(_)));
    assert_eq!(err.info().context.get("state").map(String::as_str), Some("stage-2"));
}
