use snc_core::graph::{GraphEntry, GraphRole, GraphSet, InputGraph, SnnGraph};
use snc_core::SncError;

fn sample_set() -> GraphSet {
    let mut set = GraphSet::new();
    set.insert(
        GraphRole::Input,
        GraphEntry::Input(InputGraph::new(3, [(0, 1), (2, 1)], vec![0, 1, 2])),
    );
    set.insert(GraphRole::SnnAlgo, GraphEntry::Snn(SnnGraph::default()));
    set
}

#[test]
fn expected_roles_follow_adaptation_and_radiation() {
    assert_eq!(
        GraphRole::expected(false, false),
        vec![GraphRole::Input, GraphRole::SnnAlgo]
    );
    assert_eq!(GraphRole::expected(true, false).len(), 3);
    assert_eq!(
        GraphRole::expected(false, true),
        vec![GraphRole::Input, GraphRole::SnnAlgo, GraphRole::RadSnnAlgo]
    );
    assert_eq!(GraphRole::expected(true, true).len(), 5);
}

#[test]
fn input_graph_normalises_edges() {
    let graph = InputGraph::new(4, [(2, 1), (1, 2), (3, 3), (0, 3)], vec![0; 4]);
    assert_eq!(graph.edges, vec![(0, 3), (1, 2)]);
    assert_eq!(graph.closed_neighbourhood(3), vec![0, 3]);
    assert_eq!(graph.degree(1), 1);
}

#[test]
fn verify_stages_requires_markers_up_to_stage() {
    let mut set = sample_set();
    let expected = GraphRole::expected(false, false);
    let err = set.verify_stages(&expected, 1).expect_err("unmarked set");
    assert_eq!(err.info().code, "missing_stage_marker");

    set.mark_stage(1);
    set.verify_stages(&expected, 1).expect("stage 1 complete");
    assert!(set.verify_stages(&expected, 2).is_err());
}

#[test]
fn verify_stages_reports_missing_roles() {
    let mut set = sample_set();
    set.mark_stage(1);
    let err = set
        .verify_stages(&GraphRole::expected(true, false), 1)
        .expect_err("adapted role missing");
    match err {
        SncError::StructuralIntegrity(info) => {
            assert_eq!(info.code, "missing_role");
            assert_eq!(info.context["role"], "adapted_snn_graph");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn input_entry_is_not_an_snn() {
    let set = sample_set();
    let err = set
        .require(GraphRole::Input)
        .and_then(GraphEntry::as_snn)
        .expect_err("input is not an snn");
    assert!(matches!(err, SncError::UnsupportedType(_)));
}

#[test]
fn graph_set_serializes_with_role_names() {
    let set = sample_set();
    let json = serde_json::to_value(&set).expect("serialize");
    assert!(json.get("input_graph").is_some());
    assert_eq!(json["snn_algo_graph"]["kind"], "snn");
    let back: GraphSet = serde_json::from_value(json).expect("deserialize");
    assert_eq!(back, set);
}
