use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;
use serde_json::json;
use snc_exp::{
    expand, expand_pinned, ExperimentConfig, ExportOptions, ParamValues, RangeSpec,
    StageOverwrites,
};

fn mdsa(m_val: ParamValues) -> ExperimentConfig {
    let mut params = BTreeMap::new();
    params.insert("m_val".to_string(), m_val);
    let mut algorithms = BTreeMap::new();
    algorithms.insert("MDSA".to_string(), params);
    ExperimentConfig {
        algorithms,
        adaptations: None,
        radiations: None,
        seeds: vec![42],
        size_and_max_graphs: vec![(3, 1)],
        simulators: vec!["nx".to_string()],
        overwrite: StageOverwrites::default(),
        export: ExportOptions::default(),
        unique_id: None,
    }
}

#[test]
fn minimal_experiment_yields_one_run() {
    let runs = expand(&mdsa(ParamValues::Single(json!(2)))).expect("expand");
    assert_eq!(runs.len(), 1);
    let run = &runs[0];
    assert_eq!(run.m_val().unwrap(), 2);
    assert_eq!((run.graph_size, run.graph_nr, run.seed), (3, 0, 42));
    assert!(run.unique_id.is_some());
}

#[test]
fn absent_adaptation_and_radiation_are_values() {
    let mut exp = mdsa(ParamValues::Single(json!(2)));
    exp.radiations = Some(BTreeMap::new());
    let runs = expand(&exp).expect("expand");
    assert_eq!(runs.len(), 1);
    assert!(runs[0].adaptation.is_none());
    assert!(runs[0].radiation.is_none());

    let fields = runs[0].to_fields().unwrap();
    assert_eq!(fields.get("adaptation"), Some(&json!(null)));
    assert_eq!(fields.get("radiation"), Some(&json!(null)));
}

#[test]
fn cross_product_counts_every_dimension() {
    let mut exp = mdsa(ParamValues::Range(RangeSpec {
        start: 1,
        stop: 4,
        step: 1,
    }));
    let mut adaptations = BTreeMap::new();
    adaptations.insert("redundancy".to_string(), ParamValues::List(vec![json!(1), json!(2)]));
    exp.adaptations = Some(adaptations);
    let mut radiations = BTreeMap::new();
    radiations.insert("neuron_death".to_string(), ParamValues::Single(json!(0.1)));
    exp.radiations = Some(radiations);
    exp.seeds = vec![1, 2];
    exp.size_and_max_graphs = vec![(3, 2), (5, 3)];
    exp.simulators = vec!["nx".to_string(), "simsnn".to_string()];

    let runs = expand(&exp).expect("expand");
    assert_eq!(runs.len(), 3 * 2 * 1 * 2 * (2 + 3) * 2);
    let ids: BTreeSet<_> = runs.iter().map(|run| run.unique_id.clone().unwrap()).collect();
    assert_eq!(ids.len(), runs.len());
    assert!(runs.iter().all(|run| run.graph_nr < 3));
}

#[test]
fn expansion_is_repeatable() {
    let exp = ExperimentConfig::default_mdsa();
    let first = expand(&exp).expect("expand");
    let second = expand(&exp).expect("expand");
    assert_eq!(first, second);
}

#[test]
fn pin_round_trips_to_generated_identifier() {
    let exp = ExperimentConfig::default_mdsa();
    let runs = expand(&exp).expect("expand");
    let target = runs[runs.len() / 2].clone();

    let mut pin = target.clone();
    pin.unique_id = None;
    pin.overwrite.results = true;
    let pinned = expand_pinned(&exp, Some(&pin)).expect("pinned");
    assert_eq!(pinned.len(), 1);
    assert_eq!(pinned[0].unique_id, target.unique_id);
}

#[test]
fn pin_outside_the_experiment_is_rejected() {
    let exp = ExperimentConfig::default_mdsa();
    let mut pin = expand(&exp).expect("expand")[0].clone();
    pin.unique_id = None;
    pin.seed += 1000;
    let err = expand_pinned(&exp, Some(&pin)).unwrap_err();
    assert_eq!(err.info().code, "pin_not_found");
}

#[test]
fn pin_with_stale_identifier_is_rejected() {
    let exp = ExperimentConfig::default_mdsa();
    let mut pin = expand(&exp).expect("expand")[0].clone();
    pin.seed += 1;
    let err = expand_pinned(&exp, Some(&pin)).unwrap_err();
    assert_eq!(err.info().code, "unique_id_mismatch");
}

#[test]
fn duplicate_sizes_are_deduplicated() {
    let mut exp = mdsa(ParamValues::Single(json!(2)));
    exp.size_and_max_graphs = vec![(3, 1), (3, 2)];
    let runs = expand(&exp).expect("expand");
    assert_eq!(runs.len(), 2);
}

proptest! {
    #[test]
    fn run_count_matches_product(
        m_vals in proptest::collection::btree_set(0i64..20, 1..4),
        seeds in proptest::collection::btree_set(any::<u64>(), 1..4),
        counts in proptest::collection::vec(1u32..4, 1..3),
    ) {
        let mut exp = mdsa(ParamValues::List(m_vals.iter().map(|m| json!(m)).collect()));
        exp.seeds = seeds.iter().copied().collect();
        exp.size_and_max_graphs = counts
            .iter()
            .enumerate()
            .map(|(idx, count)| (3 + idx as u32, *count))
            .collect();
        let runs = expand(&exp).unwrap();
        let graphs: u32 = counts.iter().sum();
        prop_assert_eq!(runs.len(), m_vals.len() * seeds.len() * graphs as usize);
    }
}
