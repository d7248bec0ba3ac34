//! Dimension reporters.
//!
//! Each reporter reduces a complete batch to driver values, detail metrics
//! and distributions. Grading is shared and lives in [`DimensionReporter::report`].

use std::collections::BTreeMap;

use serde_json::{json, Value};

use super::{grade, DimensionMetrics, ScoreTable};
use crate::analyzers::{blocks, coupling, security, style};
use crate::config::ScoringConfig;
use crate::core::metrics::counts_value;
use crate::core::{AnalysisContext, AnalysisResult, Analyzer as AnalyzerTrait, MetricMap, Result};
use crate::stats::diversity::{merge_counts, top_n, DiversityProfile};
use crate::stats::{gini, mean, ratio, round, Summary};

const TOP_N: usize = 5;

/// Raw material of one card before grading.
#[derive(Debug, Clone, Default)]
pub struct DimensionInputs {
    /// Values the score table is evaluated against.
    pub drivers: BTreeMap<String, f64>,
    pub detail_metrics: MetricMap,
    pub distributions: BTreeMap<String, Summary>,
}

impl DimensionInputs {
    fn driver(&mut self, name: &str, value: f64) {
        self.drivers.insert(name.to_string(), value);
    }

    fn distribution(&mut self, name: &str, values: &[f64]) {
        self.distributions
            .insert(name.to_string(), Summary::from_values(values));
    }
}

/// One scored quality axis.
pub trait DimensionReporter: Send + Sync {
    fn name(&self) -> &'static str;

    fn table<'a>(&self, scoring: &'a ScoringConfig) -> &'a ScoreTable;

    fn collect(&self, ctx: &AnalysisContext<'_>) -> Result<DimensionInputs>;

    fn report(&self, ctx: &AnalysisContext<'_>) -> Result<DimensionMetrics> {
        let inputs = self.collect(ctx)?;
        let graded = grade(self.table(&ctx.config.scoring), &inputs.drivers);
        let core_metrics = inputs
            .drivers
            .iter()
            .map(|(k, v)| (k.clone(), Value::from(round(*v, 4))))
            .collect();
        Ok(DimensionMetrics {
            name: self.name().to_string(),
            score: graded.score,
            grade: graded.grade,
            core_metrics,
            detail_metrics: inputs.detail_metrics,
            distributions: inputs.distributions,
            insights: graded.insights,
        })
    }
}

/// All reporters in card order.
pub fn all() -> Vec<Box<dyn DimensionReporter>> {
    vec![
        Box::new(StyleReporter),
        Box::new(ComplexityReporter),
        Box::new(ArchitectureReporter),
        Box::new(CallablesReporter),
        Box::new(MaintainabilityReporter),
    ]
}

fn samples(ctx: &AnalysisContext<'_>, key: &str) -> Vec<f64> {
    ctx.batch.successful().map(|r| r.metrics.number(key)).collect()
}

fn pct(part: f64, whole: f64) -> f64 {
    round(ratio(part, whole) * 100.0, 2)
}

fn max_of(values: &[f64]) -> f64 {
    values.iter().copied().fold(0.0, f64::max)
}

fn tally<'a>(results: impl Iterator<Item = &'a AnalysisResult>, key: &str) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for result in results {
        *counts
            .entry(result.metrics.string_or(key, "unknown").to_string())
            .or_insert(0) += 1;
    }
    counts
}

/// Paths with the largest value of `key`, largest first.
fn top_templates(ctx: &AnalysisContext<'_>, key: &str) -> Value {
    let mut ranked: Vec<(&str, f64)> = ctx
        .batch
        .successful()
        .map(|r| (r.path.as_str(), r.metrics.number(key)))
        .filter(|(_, v)| *v > 0.0)
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked.truncate(TOP_N);
    Value::Array(
        ranked
            .into_iter()
            .map(|(path, value)| json!({ "template": path, "value": value }))
            .collect(),
    )
}

fn ranked_names(counts: &BTreeMap<String, usize>) -> Value {
    Value::Array(
        top_n(counts, TOP_N)
            .into_iter()
            .map(|(name, count)| json!({ "name": name, "count": count }))
            .collect(),
    )
}

pub struct StyleReporter;

impl DimensionReporter for StyleReporter {
    fn name(&self) -> &'static str {
        "style"
    }

    fn table<'a>(&self, scoring: &'a ScoringConfig) -> &'a ScoreTable {
        &scoring.style
    }

    fn collect(&self, ctx: &AnalysisContext<'_>) -> Result<DimensionInputs> {
        let analysis = style::Analyzer::new().analyze(ctx)?;
        let s = &analysis.summary;

        let mut inputs = DimensionInputs::default();
        inputs.driver("indentation_consistency", s.indentation_consistency);
        // an empty batch has no names to judge
        if s.templates > 0 {
            inputs.driver("naming_consistency", s.avg_naming_consistency);
        }
        inputs.driver("long_line_pct", round(s.long_line_ratio * 100.0, 2));
        inputs.driver(
            "trailing_whitespace_pct",
            round(s.trailing_whitespace_ratio * 100.0, 2),
        );
        inputs.driver("mixed_indentation_files", s.mixed_indentation_files as f64);

        let naming = merge_counts(
            ctx.batch
                .successful()
                .map(|r| r.metrics.counts("naming_patterns"))
                .collect::<Vec<_>>()
                .iter(),
        );
        let worst: Vec<Value> = analysis
            .templates
            .iter()
            .take(TOP_N)
            .map(|t| json!({ "template": t.path, "violations": t.violations }))
            .collect();

        inputs.detail_metrics = MetricMap::new()
            .with("dominant_indentation", s.dominant_indentation.clone())
            .with("total_violations", s.total_violations)
            .with("templates_with_violations", analysis.templates.len())
            .with("naming_patterns", counts_value(&naming))
            .with("worst_templates", worst);

        inputs.distribution("avg_line_length", &samples(ctx, "avg_line_length"));
        inputs.distribution("max_line_length", &samples(ctx, "max_line_length"));
        inputs.distribution("naming_consistency", &samples(ctx, "naming_consistency"));
        Ok(inputs)
    }
}

pub struct ComplexityReporter;

impl DimensionReporter for ComplexityReporter {
    fn name(&self) -> &'static str {
        "complexity"
    }

    fn table<'a>(&self, scoring: &'a ScoringConfig) -> &'a ScoreTable {
        &scoring.complexity
    }

    fn collect(&self, ctx: &AnalysisContext<'_>) -> Result<DimensionInputs> {
        let scores = samples(ctx, "complexity_score");
        let depths = samples(ctx, "max_depth");
        let ratings = tally(ctx.batch.successful(), "complexity_rating");
        let complex = ratings.get("D").copied().unwrap_or(0) + ratings.get("E").copied().unwrap_or(0);
        let nested = ctx
            .batch
            .successful()
            .filter(|r| r.metrics.flag("has_nested_loops"))
            .count();
        let complex_conditions = ctx
            .batch
            .successful()
            .filter(|r| r.metrics.flag("has_complex_conditions"))
            .count();

        let mut inputs = DimensionInputs::default();
        inputs.driver("avg_complexity", round(mean(&scores), 2));
        inputs.driver("max_depth", max_of(&depths));
        inputs.driver("complex_template_pct", pct(complex as f64, scores.len() as f64));
        inputs.driver("max_complexity", max_of(&scores));
        inputs.driver("nested_loop_templates", nested as f64);

        let total = |key: &str| -> usize { ctx.batch.successful().map(|r| r.metrics.count(key)).sum() };
        inputs.detail_metrics = MetricMap::new()
            .with("total_conditions", total("conditions"))
            .with("total_loops", total("loops"))
            .with("total_ternaries", total("ternaries"))
            .with("total_logical_operators", total("logical_operators"))
            .with("complex_condition_templates", complex_conditions)
            .with("complexity_ratings", counts_value(&ratings))
            .with("most_complex", top_templates(ctx, "complexity_score"));

        inputs.distribution("complexity_score", &scores);
        inputs.distribution("max_depth", &depths);
        inputs.distribution("max_control_depth", &samples(ctx, "max_control_depth"));
        Ok(inputs)
    }
}

pub struct ArchitectureReporter;

impl DimensionReporter for ArchitectureReporter {
    fn name(&self) -> &'static str {
        "architecture"
    }

    fn table<'a>(&self, scoring: &'a ScoringConfig) -> &'a ScoreTable {
        &scoring.architecture
    }

    fn collect(&self, ctx: &AnalysisContext<'_>) -> Result<DimensionInputs> {
        let coupling = coupling::Analyzer::new().analyze(ctx)?;
        let blocks = blocks::Analyzer::new().analyze(ctx)?;
        let c = &coupling.summary;
        let depths = samples(ctx, "inheritance_depth");

        let mut inputs = DimensionInputs::default();
        inputs.driver("cycle_count", c.cycle_count as f64);
        inputs.driver(
            "orphan_pct",
            pct(c.orphan_count as f64, ctx.batch.results.len() as f64),
        );
        inputs.driver("avg_instability", c.avg_instability);
        inputs.driver("max_inheritance_depth", max_of(&depths));
        inputs.driver("highly_coupled", c.highly_coupled_count as f64);

        let hotspots: Vec<Value> = coupling
            .hotspots
            .iter()
            .take(TOP_N)
            .map(|n| json!({ "template": n.path, "fan_in": n.fan_in, "fan_out": n.fan_out }))
            .collect();
        inputs.detail_metrics = MetricMap::new()
            .with("edge_count", c.edge_count)
            .with("total_fan_in", c.total_fan_in)
            .with("total_fan_out", c.total_fan_out)
            .with("stable_count", c.stable_count)
            .with("balanced_count", c.balanced_count)
            .with("unstable_count", c.unstable_count)
            .with("cycles", json!(coupling.cycles))
            .with("orphans", json!(coupling.orphans))
            .with("hotspots", hotspots)
            .with(
                "architectural_roles",
                counts_value(&tally(ctx.batch.successful(), "architectural_role")),
            )
            .with(
                "coupling_risks",
                counts_value(&tally(ctx.batch.successful(), "coupling_risk")),
            )
            .with("orphaned_blocks", blocks.summary.orphaned_count)
            .with("avg_blocks_per_template", blocks.summary.avg_blocks_per_template);

        inputs.distribution("fan_in", &samples(ctx, "referenced_by"));
        inputs.distribution("fan_out", &samples(ctx, "references"));
        inputs.distribution("instability", &samples(ctx, "instability"));
        inputs.distribution("inheritance_depth", &depths);
        Ok(inputs)
    }
}

pub struct CallablesReporter;

impl DimensionReporter for CallablesReporter {
    fn name(&self) -> &'static str {
        "callables"
    }

    fn table<'a>(&self, scoring: &'a ScoringConfig) -> &'a ScoreTable {
        &scoring.callables
    }

    fn collect(&self, ctx: &AnalysisContext<'_>) -> Result<DimensionInputs> {
        let security = security::Analyzer::new().analyze(ctx)?;
        let merged = |key: &str| {
            let maps: Vec<BTreeMap<String, usize>> =
                ctx.batch.successful().map(|r| r.metrics.counts(key)).collect();
            merge_counts(maps.iter())
        };
        let filters = merged("filters");
        let functions = merged("functions");
        let macros = merged("macro_calls");

        let filter_total: usize = filters.values().sum();
        let top_filter = filters.values().copied().max().unwrap_or(0);

        let mut inputs = DimensionInputs::default();
        inputs.driver("high_risk_calls", security.summary.high_risk_calls as f64);
        inputs.driver("medium_risk_calls", security.summary.medium_risk_calls as f64);
        inputs.driver(
            "avg_callable_density",
            round(mean(&samples(ctx, "callable_density")), 4),
        );
        inputs.driver(
            "top_filter_share_pct",
            pct(top_filter as f64, filter_total as f64),
        );

        let findings: Vec<Value> = security
            .findings
            .iter()
            .take(TOP_N)
            .map(|f| {
                json!({
                    "template": f.template,
                    "callable": f.callable,
                    "kind": f.kind,
                    "level": f.level,
                    "count": f.count,
                })
            })
            .collect();
        inputs.detail_metrics = MetricMap::new()
            .with("filter_diversity", serde_json::to_value(DiversityProfile::from_counts(&filters))?)
            .with(
                "function_diversity",
                serde_json::to_value(DiversityProfile::from_counts(&functions))?,
            )
            .with("top_filters", ranked_names(&filters))
            .with("top_functions", ranked_names(&functions))
            .with("top_macros", ranked_names(&macros))
            .with("low_risk_calls", security.summary.low_risk_calls)
            .with("templates_with_findings", security.summary.templates_with_findings)
            .with("riskiest_usages", findings);

        inputs.distribution("callable_density", &samples(ctx, "callable_density"));
        inputs.distribution("filter_calls", &samples(ctx, "total_filter_calls"));
        inputs.distribution("function_calls", &samples(ctx, "total_function_calls"));
        inputs.distribution("unique_variables", &samples(ctx, "unique_variables"));
        Ok(inputs)
    }
}

pub struct MaintainabilityReporter;

impl DimensionReporter for MaintainabilityReporter {
    fn name(&self) -> &'static str {
        "maintainability"
    }

    fn table<'a>(&self, scoring: &'a ScoringConfig) -> &'a ScoreTable {
        &scoring.maintainability
    }

    fn collect(&self, ctx: &AnalysisContext<'_>) -> Result<DimensionInputs> {
        let lines = samples(ctx, "lines");
        let total_lines: f64 = lines.iter().sum();
        let comment_lines: f64 = samples(ctx, "comment_lines").iter().sum();
        let large_limit = ctx.config.size.large_template_lines as f64;
        let large = lines.iter().filter(|l| **l > large_limit).count();
        let analyzed = ctx.batch.results.len();

        let mut inputs = DimensionInputs::default();
        inputs.driver("avg_lines", round(mean(&lines), 2));
        inputs.driver("large_template_pct", pct(large as f64, lines.len() as f64));
        inputs.driver("size_gini", round(gini(&lines), 4));
        if total_lines > 0.0 {
            inputs.driver("comment_pct", pct(comment_lines, total_lines));
        }
        if analyzed > 0 {
            inputs.driver(
                "error_pct",
                pct(ctx.batch.errors.len() as f64, analyzed as f64),
            );
        }

        inputs.detail_metrics = MetricMap::new()
            .with("total_lines", total_lines as u64)
            .with(
                "total_bytes",
                ctx.batch
                    .successful()
                    .map(|r| r.metrics.count("file_size"))
                    .sum::<usize>(),
            )
            .with("error_count", ctx.batch.errors.len())
            .with(
                "size_ratings",
                counts_value(&tally(ctx.batch.successful(), "size_rating")),
            )
            .with(
                "categories",
                counts_value(&tally(ctx.batch.results.iter(), "category")),
            )
            .with("largest_templates", top_templates(ctx, "lines"));

        inputs.distribution("lines", &lines);
        inputs.distribution("file_size", &samples(ctx, "file_size"));
        inputs.distribution("comment_ratio", &samples(ctx, "comment_ratio"));
        inputs.distribution("logic_ratio", &samples(ctx, "logic_ratio"));
        Ok(inputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::batch::{BatchAnalyzer, BatchResult};
    use crate::config::Config;
    use crate::core::TemplateInput;

    fn batch(config: &Config, inputs: &[(&str, &str)]) -> BatchResult {
        let inputs: Vec<TemplateInput> = inputs
            .iter()
            .map(|(p, s)| TemplateInput::from_content(*p, *s))
            .collect();
        BatchAnalyzer::new(config).analyze(&inputs)
    }

    fn card(reporter: &dyn DimensionReporter, inputs: &[(&str, &str)]) -> DimensionMetrics {
        let config = Config::default();
        let batch = batch(&config, inputs);
        let ctx = AnalysisContext::new(&batch, &config);
        let card = reporter.report(&ctx).unwrap();
        card
    }

    #[test]
    fn test_all_reporters_in_order() {
        let names: Vec<&str> = all().iter().map(|r| r.name()).collect();
        assert_eq!(
            names,
            vec!["style", "complexity", "architecture", "callables", "maintainability"]
        );
    }

    #[test]
    fn test_architecture_cycle_insight() {
        let card = card(
            &ArchitectureReporter,
            &[
                ("a.twig", "{% include 'b.twig' %}"),
                ("b.twig", "{% include 'a.twig' %}"),
            ],
        );
        assert_eq!(card.core_metrics.number("cycle_count"), 1.0);
        assert!(card.score <= 90.0);
        assert!(card.insights.iter().any(|i| i.contains("dependency cycles")));
    }

    #[test]
    fn test_architecture_orphans() {
        let card = card(
            &ArchitectureReporter,
            &[("a.twig", "hello"), ("b.twig", "world")],
        );
        assert_eq!(card.core_metrics.number("orphan_pct"), 100.0);
        assert_eq!(card.score, 85.0);
        assert_eq!(card.insights.len(), 1);
    }

    #[test]
    fn test_callables_high_risk() {
        let card = card(
            &CallablesReporter,
            &[("a.twig", "{{ body|raw }}{{ name|upper }}")],
        );
        assert_eq!(card.core_metrics.number("high_risk_calls"), 1.0);
        assert_eq!(card.core_metrics.number("top_filter_share_pct"), 50.0);
        assert!(card.score < 100.0);
        assert!(card.detail_metrics.contains_key("filter_diversity"));
    }

    #[test]
    fn test_complexity_nested_loops() {
        let card = card(
            &ComplexityReporter,
            &[(
                "a.twig",
                "{% for row in rows %}{% for cell in row %}{{ cell }}{% endfor %}{% endfor %}",
            )],
        );
        assert_eq!(card.core_metrics.number("nested_loop_templates"), 1.0);
        assert!(card.insights.iter().any(|i| i.contains("nested loops")));
        assert_eq!(card.distributions["complexity_score"].count, 1);
    }

    #[test]
    fn test_maintainability_counts_errors() {
        let config = Config::default();
        let inputs = vec![
            TemplateInput::from_content("ok.twig", "{# note #}\nhello\n"),
            TemplateInput::from_content("bad.twig", "{% if x %}\nno end"),
        ];
        let batch = BatchAnalyzer::new(&config).analyze(&inputs);
        let card = MaintainabilityReporter
            .report(&AnalysisContext::new(&batch, &config))
            .unwrap();
        assert_eq!(card.core_metrics.number("error_pct"), 50.0);
        assert_eq!(card.distributions["lines"].count, 1);
        assert!(card.insights.iter().any(|i| i.contains("could not be analyzed")));
    }

    #[test]
    fn test_empty_batch_scores_clean() {
        let config = Config::default();
        let batch = batch(&config, &[]);
        let ctx = AnalysisContext::new(&batch, &config);
        for reporter in all() {
            let card = reporter.report(&ctx).unwrap();
            assert_eq!(card.score, 100.0, "{}", card.name);
            assert_eq!(card.grade, "A");
            assert!(card.insights.is_empty());
        }
    }
}
