use std::collections::BTreeMap;
use std::fs;

use serde_json::json;
use snc_core::SncError;
use snc_exp::{expand, ExperimentConfig, ParamValues, RunConfig};
use tempfile::tempdir;

fn with_algorithm(name: &str, params: &[(&str, serde_json::Value)]) -> ExperimentConfig {
    let mut exp = ExperimentConfig::default_mdsa();
    let params = params
        .iter()
        .map(|(key, value)| (key.to_string(), ParamValues::from(value.clone())))
        .collect::<BTreeMap<_, _>>();
    exp.algorithms = BTreeMap::from([(name.to_string(), params)]);
    exp
}

fn code(err: SncError) -> String {
    assert!(matches!(err, SncError::Configuration(_)), "unexpected family: {err}");
    err.info().code.clone()
}

#[test]
fn unsupported_algorithm_is_named() {
    let err = expand(&with_algorithm("BFS", &[("m_val", json!(2))])).unwrap_err();
    assert_eq!(err.info().context.get("algorithm").map(String::as_str), Some("BFS"));
    assert_eq!(code(err), "unsupported_algorithm");
}

#[test]
fn string_m_val_is_a_type_error() {
    let err = expand(&with_algorithm("MDSA", &[("m_val", json!("two"))])).unwrap_err();
    assert_eq!(code(err), "param_type");
}

#[test]
fn m_val_range_and_presence_are_checked() {
    let err = expand(&with_algorithm("MDSA", &[("m_val", json!(99))])).unwrap_err();
    assert_eq!(code(err), "param_range");
    let err = expand(&with_algorithm("MDSA", &[])).unwrap_err();
    assert_eq!(code(err), "missing_param");
    let err = expand(&with_algorithm("MDSA", &[("m_val", json!(1)), ("k", json!(1))])).unwrap_err();
    assert_eq!(code(err), "unknown_param");
}

#[test]
fn sizes_counts_and_simulators_are_checked() {
    let mut exp = ExperimentConfig::default_mdsa();
    exp.size_and_max_graphs = vec![(2, 1)];
    assert_eq!(code(expand(&exp).unwrap_err()), "graph_size_range");

    let mut exp = ExperimentConfig::default_mdsa();
    exp.size_and_max_graphs = vec![(3, 0)];
    assert_eq!(code(expand(&exp).unwrap_err()), "max_graphs_range");

    let mut exp = ExperimentConfig::default_mdsa();
    exp.simulators = vec!["lava".to_string()];
    assert_eq!(code(expand(&exp).unwrap_err()), "unsupported_simulator");

    let mut exp = ExperimentConfig::default_mdsa();
    exp.seeds.clear();
    assert_eq!(code(expand(&exp).unwrap_err()), "empty_param");
}

#[test]
fn image_export_needs_supported_types() {
    let mut exp = ExperimentConfig::default_mdsa();
    exp.export.export_images = true;
    assert_eq!(code(expand(&exp).unwrap_err()), "missing_export_types");
    exp.export.export_types = vec!["gif".to_string()];
    assert_eq!(code(expand(&exp).unwrap_err()), "unsupported_export_type");
    exp.export.export_types = vec!["svg".to_string(), "dot".to_string()];
    assert!(expand(&exp).is_ok());
}

#[test]
fn radiation_probability_must_be_in_unit_interval() {
    let mut exp = ExperimentConfig::default_mdsa();
    exp.radiations = Some(BTreeMap::from([(
        "neuron_death".to_string(),
        ParamValues::Single(json!(1.5)),
    )]));
    assert_eq!(code(expand(&exp).unwrap_err()), "param_range");
}

#[test]
fn yaml_settings_load_with_defaults() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("experiment.yaml");
    fs::write(
        &path,
        "algorithms:\n  MDSA:\n    m_val: {start: 0, stop: 3}\nradiations: {}\nseeds: [7]\nsize_and_max_graphs: [[3, 2]]\nsimulators: [nx]\n",
    )
    .expect("write");
    let exp = ExperimentConfig::from_path(&path).expect("load");
    assert!(exp.adaptations().is_none());
    assert!(exp.radiations().is_none());
    assert!(!exp.overwrite.creation);
    assert_eq!(expand(&exp).expect("expand").len(), 6);
}

#[test]
fn malformed_size_tuples_are_configuration_errors() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("experiment.json");
    fs::write(
        &path,
        r#"{"algorithms": {"MDSA": {"m_val": 2}}, "seeds": [1], "size_and_max_graphs": [[3]], "simulators": ["nx"]}"#,
    )
    .expect("write");
    let err = ExperimentConfig::from_path(&path).unwrap_err();
    assert_eq!(code(err), "malformed_settings");
}

#[test]
fn run_config_files_load_and_keep_unknown_fields() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("run.json");
    fs::write(
        &path,
        r#"{"algorithm": {"name": "MDSA", "params": {"m_val": 2}}, "adaptation": null, "radiation": null,
            "seed": 42, "graph_size": 3, "graph_nr": 0, "simulator": "nx", "note": "legacy"}"#,
    )
    .expect("write");
    let run = RunConfig::from_path(&path).expect("load");
    assert_eq!(run.extra.get("note"), Some(&json!("legacy")));
    assert_eq!(run.m_val().unwrap(), 2);
}

#[test]
fn yaml_lists_expand_to_every_element() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("experiment.yaml");
    fs::write(
        &path,
        "algorithms:\n  MDSA:\n    m_val: [0, 1]\nadaptations:\n  redundancy: [1, 2, 3]\nseeds: [7]\nsize_and_max_graphs: [[3, 1]]\nsimulators: [nx]\n",
    )
    .expect("write");
    let exp = ExperimentConfig::from_path(&path).expect("load");
    assert_eq!(
        exp.algorithms["MDSA"]["m_val"],
        ParamValues::List(vec![json!(0), json!(1)])
    );
    assert_eq!(expand(&exp).expect("expand").len(), 2 * 3);
}

#[test]
fn oversized_ranges_are_configuration_errors() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("experiment.json");
    fs::write(
        &path,
        r#"{"algorithms": {"MDSA": {"m_val": {"start": 0, "stop": 1000000000000}}}, "seeds": [1],
            "size_and_max_graphs": [[3, 1]], "simulators": ["nx"]}"#,
    )
    .expect("write");
    let exp = ExperimentConfig::from_path(&path).expect("load");
    assert_eq!(code(expand(&exp).unwrap_err()), "range_too_large");
}
