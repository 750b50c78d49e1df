use std::collections::BTreeMap;

use criterion::{criterion_group, criterion_main, Criterion};
use serde_json::json;
use snc_exp::{expand, ExperimentConfig, ParamValues, RangeSpec};

fn make_experiment() -> ExperimentConfig {
    let mut exp = ExperimentConfig::default_mdsa();
    exp.algorithms.insert(
        "MDSA".to_string(),
        BTreeMap::from([(
            "m_val".to_string(),
            ParamValues::Range(RangeSpec {
                start: 0,
                stop: 6,
                step: 1,
            }),
        )]),
    );
    exp.adaptations = Some(BTreeMap::from([(
        "redundancy".to_string(),
        ParamValues::List(vec![json!(1), json!(2), json!(3)]),
    )]));
    exp.seeds = vec![1, 2, 3];
    exp.size_and_max_graphs = vec![(3, 5), (6, 5), (9, 5)];
    exp.simulators = vec!["nx".to_string(), "simsnn".to_string()];
    exp
}

fn bench_expand(c: &mut Criterion) {
    let exp = make_experiment();
    c.bench_function("expand_throughput", |b| {
        b.iter(|| {
            let _ = expand(&exp).expect("expand");
        });
    });
}

criterion_group!(benches, bench_expand);
criterion_main!(benches);
