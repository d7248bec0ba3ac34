//! Coupling analyzer: fan-in, fan-out, instability, cycles and orphans.

use serde::{Deserialize, Serialize};

use super::graph::DependencyGraph;
use crate::config::CouplingConfig;
use crate::core::{AnalysisContext, Analyzer as AnalyzerTrait, Result};
use crate::stats::{ratio, round};

/// Coupling analyzer.
#[derive(Default)]
pub struct Analyzer;

impl Analyzer {
    pub fn new() -> Self {
        Self
    }

    /// Analyze a graph directly.
    pub fn analyze_graph(&self, graph: &DependencyGraph, config: &CouplingConfig) -> Analysis {
        let fan_in = graph.fan_in_map();
        let nodes: Vec<NodeCoupling> = fan_in
            .iter()
            .map(|(path, fi)| {
                let fo = graph.fan_out(path);
                NodeCoupling {
                    path: path.clone(),
                    fan_in: *fi,
                    fan_out: fo,
                    instability: round(super::graph::instability(*fi, fo), 4),
                    analyzed: graph.is_analyzed(path),
                }
            })
            .collect();

        let mut hotspots: Vec<NodeCoupling> =
            nodes.iter().filter(|n| n.total() > 0).cloned().collect();
        hotspots.sort_by(|a, b| b.total().cmp(&a.total()).then_with(|| a.path.cmp(&b.path)));
        hotspots.truncate(config.hotspot_count);

        let highly_coupled: Vec<String> = nodes
            .iter()
            .filter(|n| n.total() >= config.highly_coupled_threshold)
            .map(|n| n.path.clone())
            .collect();

        let cycles = graph.cycle_groups();
        let orphans = graph.orphans();
        let summary = AnalysisSummary::build(&nodes, graph, config, orphans.len(), &highly_coupled);

        Analysis {
            nodes,
            hotspots,
            highly_coupled,
            cycles,
            orphans,
            summary,
        }
    }
}

impl AnalyzerTrait for Analyzer {
    type Output = Analysis;

    fn name(&self) -> &'static str {
        "coupling"
    }

    fn description(&self) -> &'static str {
        "Measure fan-in/fan-out, instability, cycles and orphans of the template graph"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Self::Output> {
        let analysis = self.analyze_graph(&ctx.batch.graph, &ctx.config.coupling);
        tracing::info!(
            "Coupling analysis: {} nodes, {} edges, {} cycles, {} orphans",
            analysis.summary.total_nodes,
            analysis.summary.edge_count,
            analysis.summary.cycle_count,
            analysis.summary.orphan_count
        );
        Ok(analysis)
    }
}

/// Coupling analysis result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    pub nodes: Vec<NodeCoupling>,
    /// Most connected nodes, highest fan-in + fan-out first.
    pub hotspots: Vec<NodeCoupling>,
    pub highly_coupled: Vec<String>,
    /// Strongly connected groups containing a cycle.
    pub cycles: Vec<Vec<String>>,
    pub orphans: Vec<String>,
    pub summary: AnalysisSummary,
}

/// Degree metrics of one graph node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeCoupling {
    pub path: String,
    pub fan_in: usize,
    pub fan_out: usize,
    pub instability: f64,
    /// False for referenced targets that were not part of the batch.
    pub analyzed: bool,
}

impl NodeCoupling {
    pub fn total(&self) -> usize {
        self.fan_in + self.fan_out
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub total_nodes: usize,
    pub edge_count: usize,
    pub total_fan_in: usize,
    pub total_fan_out: usize,
    pub avg_fan_in: f64,
    pub avg_fan_out: f64,
    pub max_fan_in: usize,
    pub max_fan_out: usize,
    pub avg_instability: f64,
    pub stable_count: usize,
    pub balanced_count: usize,
    pub unstable_count: usize,
    pub highly_coupled_count: usize,
    /// Back edges found by DFS; approximates the number of cycles.
    pub cycle_count: usize,
    pub orphan_count: usize,
}

impl AnalysisSummary {
    fn build(
        nodes: &[NodeCoupling],
        graph: &DependencyGraph,
        config: &CouplingConfig,
        orphan_count: usize,
        highly_coupled: &[String],
    ) -> Self {
        let total_fan_in: usize = nodes.iter().map(|n| n.fan_in).sum();
        let total_fan_out: usize = nodes.iter().map(|n| n.fan_out).sum();
        let count = nodes.len() as f64;
        // unconnected nodes have no meaningful instability
        let connected: Vec<&NodeCoupling> = nodes.iter().filter(|n| n.total() > 0).collect();
        Self {
            total_nodes: nodes.len(),
            edge_count: graph.edge_count(),
            total_fan_in,
            total_fan_out,
            avg_fan_in: round(ratio(total_fan_in as f64, count), 4),
            avg_fan_out: round(ratio(total_fan_out as f64, count), 4),
            max_fan_in: nodes.iter().map(|n| n.fan_in).max().unwrap_or(0),
            max_fan_out: nodes.iter().map(|n| n.fan_out).max().unwrap_or(0),
            avg_instability: round(graph.graph_instability(), 4),
            stable_count: connected
                .iter()
                .filter(|n| n.instability < config.stable_threshold)
                .count(),
            balanced_count: connected
                .iter()
                .filter(|n| {
                    n.instability >= config.stable_threshold
                        && n.instability <= config.unstable_threshold
                })
                .count(),
            unstable_count: connected
                .iter()
                .filter(|n| n.instability > config.unstable_threshold)
                .count(),
            highly_coupled_count: highly_coupled.len(),
            cycle_count: graph.cycle_count(),
            orphan_count,
        }
    }
}
