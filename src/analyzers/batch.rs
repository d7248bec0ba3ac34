//! Batch analysis over a full template set.
//!
//! Phase 1 analyzes every template independently and in parallel. Phase 2
//! starts only once phase 1 has produced the complete result set: it builds
//! the dependency graph and derives the cross-template metrics of each
//! result.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;

use super::classify::{architectural_role, coupling_risk, Profile};
use super::graph::{inheritance_depth, DependencyGraph, GraphParentResolver};
use super::template::TemplateAnalyzer;
use crate::config::Config;
use crate::core::{AnalysisResult, BatchError, MetricMap, Summary, TemplateInput};
use crate::stats::round;

type ProgressFn = Box<dyn Fn(usize, usize) + Send + Sync>;

/// Everything one run produces.
#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    /// One result per input, in input order.
    pub results: Vec<AnalysisResult>,
    pub graph: DependencyGraph,
    pub errors: Vec<BatchError>,
    pub summary: Summary,
}

impl BatchResult {
    /// Results that are not fallbacks for a failed template.
    pub fn successful(&self) -> impl Iterator<Item = &AnalysisResult> {
        self.results.iter().filter(|r| !r.is_failure())
    }

    pub fn get(&self, path: &str) -> Option<&AnalysisResult> {
        self.results.iter().find(|r| r.path == path)
    }
}

/// Runs the two analysis phases.
pub struct BatchAnalyzer {
    analyzer: TemplateAnalyzer,
    on_progress: Option<ProgressFn>,
}

impl BatchAnalyzer {
    pub fn new(config: &Config) -> Self {
        Self {
            analyzer: TemplateAnalyzer::new(config),
            on_progress: None,
        }
    }

    /// Use a preconfigured template analyzer (e.g. with another parser).
    pub fn with_analyzer(mut self, analyzer: TemplateAnalyzer) -> Self {
        self.analyzer = analyzer;
        self
    }

    /// Called with `(done, total)` after each template of phase 1.
    pub fn with_progress<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, usize) + Send + Sync + 'static,
    {
        self.on_progress = Some(Box::new(f));
        self
    }

    pub fn analyze(&self, inputs: &[TemplateInput]) -> BatchResult {
        let start = Instant::now();
        let total = inputs.len();
        let counter = AtomicUsize::new(0);

        let outcomes: Vec<(AnalysisResult, Option<BatchError>)> = inputs
            .par_iter()
            .map(|input| {
                let outcome = self.analyzer.analyze_or_fallback(input);
                let done = counter.fetch_add(1, Ordering::Relaxed) + 1;
                if let Some(ref f) = self.on_progress {
                    f(done, total);
                }
                outcome
            })
            .collect();

        let mut results = Vec::with_capacity(outcomes.len());
        let mut errors = Vec::new();
        for (result, error) in outcomes {
            results.push(result);
            errors.extend(error);
        }
        tracing::info!(
            "Collected {} templates in {:?} ({} errors)",
            results.len(),
            start.elapsed(),
            errors.len()
        );

        let graph_start = Instant::now();
        let graph = DependencyGraph::from_results(&results);
        let results = self.enrich(&results, &graph);
        tracing::info!(
            "Built dependency graph in {:?}: {} nodes, {} edges",
            graph_start.elapsed(),
            graph.nodes().len(),
            graph.edge_count()
        );

        let summary = Summary::new(results.len(), errors.len(), start.elapsed());
        BatchResult {
            results,
            graph,
            errors,
            summary,
        }
    }

    /// Graph-derived metrics are added to failed results too, so a failed
    /// template that others reference still reports its `referenced_by`.
    fn enrich(&self, results: &[AnalysisResult], graph: &DependencyGraph) -> Vec<AnalysisResult> {
        let resolver = GraphParentResolver::from_graph(graph);
        let fan_in = graph.fan_in_map();
        let classification = &self.analyzer.config().classification;

        results
            .iter()
            .map(|result| {
                let path = result.path.as_str();
                let referenced_by = fan_in.get(path).copied().unwrap_or(0);
                let references = graph.fan_out(path);

                let mut extra = MetricMap::new()
                    .with("referenced_by", referenced_by)
                    .with("references", references)
                    .with("instability", round(graph.instability(path), 4))
                    .with("inheritance_depth", inheritance_depth(path, &resolver))
                    .with("is_orphan", referenced_by == 0 && references == 0);

                let mut merged = result.metrics.clone();
                merged.merge(extra.clone());
                let profile = Profile::from_metrics(&merged);
                extra.insert("architectural_role", architectural_role(&profile, classification));
                extra.insert("coupling_risk", coupling_risk(&profile, classification));

                result.enriched(extra)
            })
            .collect()
    }
}
