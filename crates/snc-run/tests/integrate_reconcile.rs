use std::collections::BTreeMap;

use assert_json_diff::assert_json_eq;
use serde_json::json;
use snc_core::{GraphEntry, GraphRole, GraphSet, InputGraph, SncError, SnnGraph};
use snc_exp::{expand, ExperimentConfig, RunConfig};
use snc_run::{integrate, reconcile};

fn graphs_after_stage_3(roles: &[GraphRole]) -> GraphSet {
    let mut graphs = GraphSet::new();
    graphs.insert(
        GraphRole::Input,
        GraphEntry::Input(InputGraph::new(3, [(0, 1), (1, 2)], vec![0, 1, 2])),
    );
    for &role in roles {
        graphs.insert(role, GraphEntry::Snn(SnnGraph::default()));
    }
    for stage in 1..=3 {
        graphs.mark_stage(stage);
    }
    graphs
}

fn expected(roles: &[GraphRole]) -> Vec<GraphRole> {
    let mut expected = vec![GraphRole::Input];
    expected.extend_from_slice(roles);
    expected
}

#[test]
fn results_are_attached_to_a_copy() {
    let roles = [GraphRole::SnnAlgo, GraphRole::AdaptedSnn];
    let graphs = graphs_after_stage_3(&roles);
    let results = BTreeMap::from([
        (GraphRole::SnnAlgo, json!({"passed": true})),
        (GraphRole::AdaptedSnn, json!({"passed": false})),
    ]);

    let merged = integrate(&graphs, &results, &expected(&roles)).expect("integrate");
    assert!(merged.verify_stages(&expected(&roles), 4).is_ok());
    let adapted = merged.require(GraphRole::AdaptedSnn).expect("role").as_snn().expect("snn");
    assert_eq!(adapted.results, Some(json!({"passed": false})));
    assert!(graphs.verify_stages(&expected(&roles), 4).is_err());
}

#[test]
fn every_expected_role_needs_a_result() {
    let roles = [GraphRole::SnnAlgo, GraphRole::RadSnnAlgo];
    let graphs = graphs_after_stage_3(&roles);
    let results = BTreeMap::from([(GraphRole::SnnAlgo, json!({"passed": true}))]);

    let err = integrate(&graphs, &results, &expected(&roles)).unwrap_err();
    assert!(matches!(err, SncError::StructuralIntegrity(_)), "unexpected family: {err}");
    assert_eq!(err.info().code, "missing_result");
}

#[test]
fn results_for_absent_roles_are_rejected() {
    let roles = [GraphRole::SnnAlgo];
    let graphs = graphs_after_stage_3(&roles);
    let results = BTreeMap::from([
        (GraphRole::SnnAlgo, json!({"passed": true})),
        (GraphRole::AdaptedSnn, json!({"passed": true})),
    ]);

    let err = integrate(&graphs, &results, &expected(&roles)).unwrap_err();
    assert!(matches!(err, SncError::StructuralIntegrity(_)), "unexpected family: {err}");
}

#[test]
fn input_graphs_cannot_carry_results() {
    let roles = [GraphRole::SnnAlgo];
    let graphs = graphs_after_stage_3(&roles);
    let results = BTreeMap::from([
        (GraphRole::SnnAlgo, json!({"passed": true})),
        (GraphRole::Input, json!({"passed": true})),
    ]);

    let err = integrate(&graphs, &results, &expected(&roles)).unwrap_err();
    assert!(matches!(err, SncError::UnsupportedType(_)), "unexpected family: {err}");
    assert_eq!(err.info().code, "result_target");
}

fn sample_run() -> RunConfig {
    expand(&ExperimentConfig::default_mdsa()).expect("expand").remove(0)
}

#[test]
fn execution_flags_are_taken_from_the_intended_configuration() {
    let loaded = sample_run();
    let mut intended = loaded.clone();
    intended.overwrite.results = true;
    intended.export.show_snns = true;

    let reconciled = reconcile(&intended, &loaded).expect("reconcile");
    assert_json_eq!(
        serde_json::to_value(&reconciled).expect("encode"),
        serde_json::to_value(&intended).expect("encode")
    );
    assert_eq!(reconciled, intended);
}

#[test]
fn fields_only_the_cache_knows_are_a_mismatch() {
    let intended = sample_run();
    let mut loaded = intended.clone();
    loaded.extra.insert("note".to_string(), json!("legacy"));

    let err = reconcile(&intended, &loaded).unwrap_err();
    assert!(matches!(err, SncError::Consistency(_)), "unexpected family: {err}");
    assert_eq!(err.info().code, "run_config_mismatch");
    assert!(err.info().hint.is_some());
}
