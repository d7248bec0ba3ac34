use std::collections::BTreeMap;

use proptest::prelude::*;
use serde_json::Map;

use stencil::analyzers::DependencyGraph;
use stencil::collectors::relationships::{Dependency, RelationKind};
use stencil::collectors::Traverser;
use stencil::config::Config;
use stencil::parser::{Parser, TemplateParser};
use stencil::score::{grade, ScoreTable};
use stencil::stats::{self, Summary};

fn graph_from(edges: &[(usize, usize)], nodes: usize) -> DependencyGraph {
    let mut graph = DependencyGraph::new();
    for i in 0..nodes {
        graph.add_node(&format!("t{i}.twig"));
    }
    for (source, target) in edges {
        graph.add_dependency(Dependency {
            source: format!("t{source}.twig"),
            target: format!("t{target}.twig"),
            kind: RelationKind::Includes,
            metadata: Map::new(),
        });
    }
    graph
}

fn edges_strategy() -> impl Strategy<Value = Vec<(usize, usize)>> {
    prop::collection::vec((0usize..8, 0usize..8), 0..24)
}

// ---------------------------------------------------------------------------
// Dependency graph properties
// ---------------------------------------------------------------------------

proptest! {
    /// Every distinct edge is counted once on each side.
    #[test]
    fn fan_in_equals_fan_out(edges in edges_strategy()) {
        let graph = graph_from(&edges, 8);
        let nodes = graph.nodes();
        let fan_in: usize = nodes.iter().map(|n| graph.fan_in(n)).sum();
        let fan_out: usize = nodes.iter().map(|n| graph.fan_out(n)).sum();
        prop_assert_eq!(fan_in, fan_out);
        prop_assert_eq!(fan_out, graph.edge_count());
    }

    /// Orphans are exactly the nodes with no edges at all.
    #[test]
    fn orphans_have_no_edges(edges in edges_strategy()) {
        let graph = graph_from(&edges, 8);
        for node in graph.nodes() {
            let isolated = graph.fan_in(&node) == 0 && graph.fan_out(&node) == 0;
            prop_assert_eq!(graph.orphans().contains(&node), isolated);
        }
    }

    /// Edges that only point forward can never form a cycle.
    #[test]
    fn forward_edges_are_acyclic(edges in edges_strategy()) {
        let forward: Vec<(usize, usize)> = edges
            .into_iter()
            .filter(|(s, t)| s < t)
            .collect();
        let graph = graph_from(&forward, 8);
        prop_assert_eq!(graph.cycle_count(), 0);
        prop_assert!(graph.cycle_groups().is_empty());
    }

    #[test]
    fn instability_is_bounded(edges in edges_strategy()) {
        let graph = graph_from(&edges, 8);
        for node in graph.nodes() {
            let i = graph.instability(&node);
            prop_assert!((0.0..=1.0).contains(&i));
        }
        let mean = graph.graph_instability();
        prop_assert!((0.0..=1.0).contains(&mean));
    }
}

// ---------------------------------------------------------------------------
// Statistics properties
// ---------------------------------------------------------------------------

proptest! {
    /// Summaries stay finite for any finite sample, including empty ones.
    #[test]
    fn summary_is_finite(values in prop::collection::vec(-1.0e6f64..1.0e6, 0..40)) {
        let s = Summary::from_values(&values);
        for v in [s.min, s.max, s.mean, s.median, s.std_dev, s.coefficient_of_variation,
                  s.p25, s.p75, s.p90, s.p95, s.gini] {
            prop_assert!(v.is_finite());
        }
        prop_assert_eq!(s.count, values.len());
    }

    #[test]
    fn gini_is_bounded_for_sizes(values in prop::collection::vec(0.0f64..5000.0, 0..40)) {
        let g = stats::gini(&values);
        prop_assert!((0.0..=1.0 + 1e-9).contains(&g));
    }

    #[test]
    fn singleton_has_no_spread(value in -1.0e6f64..1.0e6) {
        prop_assert_eq!(stats::std_dev(&[value]), 0.0);
        prop_assert_eq!(stats::coefficient_of_variation(&[value]), 0.0);
        prop_assert_eq!(stats::gini(&[value]), 0.0);
    }

    #[test]
    fn percentiles_are_ordered(values in prop::collection::vec(-1.0e3f64..1.0e3, 1..40)) {
        let p25 = stats::percentile(&values, 25.0);
        let p50 = stats::percentile(&values, 50.0);
        let p90 = stats::percentile(&values, 90.0);
        prop_assert!(p25 <= p50 + 1e-9);
        prop_assert!(p50 <= p90 + 1e-9);
    }
}

// ---------------------------------------------------------------------------
// Traversal properties
// ---------------------------------------------------------------------------

fn nested_template(loops: &[bool]) -> String {
    let mut source = String::new();
    for (i, is_loop) in loops.iter().enumerate() {
        if *is_loop {
            source.push_str(&format!("{{% for item{i} in items %}}"));
        } else {
            source.push_str(&format!("{{% if flag{i} %}}"));
        }
    }
    source.push_str("{{ value }}");
    for is_loop in loops.iter().rev() {
        source.push_str(if *is_loop { "{% endfor %}" } else { "{% endif %}" });
    }
    source
}

proptest! {
    /// Every opened nesting level is closed again once traversal completes.
    #[test]
    fn depth_counters_return_to_zero(loops in prop::collection::vec(any::<bool>(), 0..8)) {
        let source = nested_template(&loops);
        let tree = Parser::new().parse("nested.twig", &source).unwrap();
        let config = Config::default();
        let mut traverser = Traverser::for_template("nested.twig", &config, None);
        traverser.traverse(&tree);
        prop_assert_eq!(traverser.open_scopes(), 0);

        let data = traverser.data();
        prop_assert_eq!(data.count("max_control_depth"), loops.len());
        prop_assert_eq!(data.count("fors"), loops.iter().filter(|l| **l).count());
    }
}

// ---------------------------------------------------------------------------
// Scoring properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn scores_stay_in_range(values in prop::collection::vec(-1.0e4f64..1.0e4, 5)) {
        let table = ScoreTable::architecture();
        let drivers: BTreeMap<String, f64> = table
            .rules
            .iter()
            .zip(values)
            .map(|(rule, v)| (rule.driver.clone(), v))
            .collect();
        let graded = grade(&table, &drivers);
        prop_assert!((0.0..=100.0).contains(&graded.score));
        prop_assert!(["A", "B", "C", "D", "F"].contains(&graded.grade.as_str()));
        let triggered = table
            .rules
            .iter()
            .filter(|r| r.triggered(drivers[&r.driver]))
            .count();
        prop_assert_eq!(graded.insights.len(), triggered);
    }
}
