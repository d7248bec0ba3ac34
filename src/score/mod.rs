//! Dimension scoring and the composite report.
//!
//! Every dimension starts at 100 and loses points for each penalty rule its
//! drivers trigger. The same crossings produce the card's insights, so a
//! card is fully determined by its driver values and its table.

pub mod dimensions;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{AnalysisContext, Analyzer as AnalyzerTrait, Error, MetricMap, Result};
use crate::stats::{round, Summary};

/// Which side of the threshold is penalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Above,
    Below,
}

/// One threshold crossing and what it costs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PenaltyRule {
    pub driver: String,
    pub direction: Direction,
    pub threshold: f64,
    /// Points lost per unit past the threshold.
    pub per_unit: f64,
    pub max_penalty: f64,
    /// Insight text; `{value}` is replaced with the driver value.
    pub insight: String,
}

impl PenaltyRule {
    pub fn new(
        driver: &str,
        direction: Direction,
        threshold: f64,
        per_unit: f64,
        max_penalty: f64,
        insight: &str,
    ) -> Self {
        Self {
            driver: driver.to_string(),
            direction,
            threshold,
            per_unit,
            max_penalty,
            insight: insight.to_string(),
        }
    }

    /// Distance past the threshold, `0.0` when not crossed.
    pub fn excess(&self, value: f64) -> f64 {
        let excess = match self.direction {
            Direction::Above => value - self.threshold,
            Direction::Below => self.threshold - value,
        };
        if excess.is_finite() {
            excess.max(0.0)
        } else {
            0.0
        }
    }

    pub fn triggered(&self, value: f64) -> bool {
        self.excess(value) > 0.0
    }

    pub fn penalty(&self, value: f64) -> f64 {
        (self.excess(value) * self.per_unit).clamp(0.0, self.max_penalty.max(0.0))
    }

    pub fn insight(&self, value: f64) -> String {
        self.insight.replace("{value}", &round(value, 2).to_string())
    }
}

/// Minimum scores of grades A to D; anything lower is F.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradeBands {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

impl Default for GradeBands {
    fn default() -> Self {
        Self {
            a: 90.0,
            b: 80.0,
            c: 70.0,
            d: 60.0,
        }
    }
}

impl GradeBands {
    pub fn grade(&self, score: f64) -> &'static str {
        if score >= self.a {
            "A"
        } else if score >= self.b {
            "B"
        } else if score >= self.c {
            "C"
        } else if score >= self.d {
            "D"
        } else {
            "F"
        }
    }
}

/// Penalty rules and grade bands of one dimension.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreTable {
    pub rules: Vec<PenaltyRule>,
    pub bands: GradeBands,
}

impl ScoreTable {
    pub fn new(rules: Vec<PenaltyRule>) -> Self {
        Self {
            rules,
            bands: GradeBands::default(),
        }
    }

    pub fn style() -> Self {
        use Direction::*;
        Self::new(vec![
            PenaltyRule::new("indentation_consistency", Below, 90.0, 1.0, 25.0,
                "Only {value}% of indented templates use the dominant indentation style"),
            PenaltyRule::new("naming_consistency", Below, 80.0, 0.5, 20.0,
                "Declared names follow the dominant naming convention {value}% of the time"),
            PenaltyRule::new("long_line_pct", Above, 5.0, 2.0, 20.0,
                "{value}% of lines exceed the maximum line length"),
            PenaltyRule::new("trailing_whitespace_pct", Above, 2.0, 2.0, 15.0,
                "{value}% of lines end with trailing whitespace"),
            PenaltyRule::new("mixed_indentation_files", Above, 0.0, 5.0, 20.0,
                "{value} templates mix tabs and spaces"),
        ])
    }

    pub fn complexity() -> Self {
        use Direction::*;
        Self::new(vec![
            PenaltyRule::new("avg_complexity", Above, 10.0, 2.0, 30.0,
                "Average complexity score is {value}"),
            PenaltyRule::new("max_depth", Above, 5.0, 5.0, 20.0,
                "Nesting reaches depth {value}"),
            PenaltyRule::new("complex_template_pct", Above, 10.0, 1.0, 25.0,
                "{value}% of templates are rated D or worse for complexity"),
            PenaltyRule::new("max_complexity", Above, 50.0, 0.5, 15.0,
                "The most complex template scores {value}"),
            PenaltyRule::new("nested_loop_templates", Above, 0.0, 2.0, 10.0,
                "{value} templates contain nested loops"),
        ])
    }

    pub fn architecture() -> Self {
        use Direction::*;
        Self::new(vec![
            PenaltyRule::new("cycle_count", Above, 0.0, 10.0, 30.0,
                "{value} dependency cycles detected"),
            PenaltyRule::new("orphan_pct", Above, 20.0, 0.5, 15.0,
                "{value}% of templates neither reference nor are referenced by others"),
            PenaltyRule::new("avg_instability", Above, 0.7, 50.0, 15.0,
                "Average instability is {value}"),
            PenaltyRule::new("max_inheritance_depth", Above, 4.0, 5.0, 15.0,
                "Inheritance chains reach depth {value}"),
            PenaltyRule::new("highly_coupled", Above, 0.0, 3.0, 15.0,
                "{value} templates are highly coupled"),
        ])
    }

    pub fn callables() -> Self {
        use Direction::*;
        Self::new(vec![
            PenaltyRule::new("high_risk_calls", Above, 0.0, 10.0, 40.0,
                "{value} calls to high-risk filters or functions"),
            PenaltyRule::new("medium_risk_calls", Above, 0.0, 2.0, 20.0,
                "{value} calls to medium-risk filters or functions"),
            PenaltyRule::new("avg_callable_density", Above, 0.5, 20.0, 15.0,
                "Templates average {value} callable uses per code line"),
            PenaltyRule::new("top_filter_share_pct", Above, 60.0, 0.5, 10.0,
                "The most used filter accounts for {value}% of filter calls"),
        ])
    }

    pub fn maintainability() -> Self {
        use Direction::*;
        Self::new(vec![
            PenaltyRule::new("avg_lines", Above, 150.0, 0.1, 20.0,
                "Templates average {value} lines"),
            PenaltyRule::new("large_template_pct", Above, 10.0, 1.0, 20.0,
                "{value}% of templates exceed the large-template size"),
            PenaltyRule::new("size_gini", Above, 0.6, 50.0, 15.0,
                "Template sizes are unevenly distributed (Gini {value})"),
            PenaltyRule::new("comment_pct", Below, 1.0, 5.0, 10.0,
                "Only {value}% of lines are comments"),
            PenaltyRule::new("error_pct", Above, 0.0, 2.0, 30.0,
                "{value}% of templates could not be analyzed"),
        ])
    }
}

/// Relative weight of each dimension in the overall score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub style: f64,
    pub complexity: f64,
    pub architecture: f64,
    pub callables: f64,
    pub maintainability: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            style: 1.0,
            complexity: 1.0,
            architecture: 1.0,
            callables: 0.8,
            maintainability: 1.0,
        }
    }
}

impl ScoreWeights {
    pub fn for_dimension(&self, name: &str) -> f64 {
        match name {
            "style" => self.style,
            "complexity" => self.complexity,
            "architecture" => self.architecture,
            "callables" => self.callables,
            "maintainability" => self.maintainability,
            _ => 0.0,
        }
    }
}

/// Output of [`grade`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Graded {
    pub score: f64,
    pub grade: String,
    pub insights: Vec<String>,
}

/// Score a dimension from its driver values.
///
/// Rules whose driver is absent are skipped. The score is clamped to
/// `[0, 100]`; insights follow rule order.
pub fn grade(table: &ScoreTable, drivers: &BTreeMap<String, f64>) -> Graded {
    let mut score = 100.0;
    let mut insights = Vec::new();
    for rule in &table.rules {
        let Some(&value) = drivers.get(&rule.driver) else {
            continue;
        };
        if rule.triggered(value) {
            score -= rule.penalty(value);
            insights.push(rule.insight(value));
        }
    }
    let score = round(score.clamp(0.0, 100.0), 2);
    Graded {
        score,
        grade: table.bands.grade(score).to_string(),
        insights,
    }
}

/// Scored card of one quality dimension.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionMetrics {
    pub name: String,
    pub score: f64,
    pub grade: String,
    /// Driver values that feed the score.
    pub core_metrics: MetricMap,
    pub detail_metrics: MetricMap,
    pub distributions: BTreeMap<String, Summary>,
    pub insights: Vec<String>,
}

/// Composite report over all dimensions.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub templates_analyzed: usize,
    pub error_count: usize,
    pub overall_score: f64,
    pub grade: String,
    pub dimensions: Vec<DimensionMetrics>,
}

impl Report {
    pub fn dimension(&self, name: &str) -> Option<&DimensionMetrics> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    /// Fail when the overall score is below `fail_under`.
    pub fn check_threshold(&self, fail_under: f64) -> Result<()> {
        if self.overall_score < fail_under {
            return Err(Error::threshold_violation(
                format!(
                    "overall score {:.1} is below the minimum of {:.1}",
                    self.overall_score, fail_under
                ),
                self.overall_score,
            ));
        }
        Ok(())
    }
}

/// Score analyzer - runs every dimension reporter.
#[derive(Default)]
pub struct Analyzer;

impl Analyzer {
    pub fn new() -> Self {
        Self
    }
}

impl AnalyzerTrait for Analyzer {
    type Output = Report;

    fn name(&self) -> &'static str {
        "score"
    }

    fn description(&self) -> &'static str {
        "Score style, complexity, architecture, callable usage and maintainability"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Self::Output> {
        let scoring = &ctx.config.scoring;
        let reporters = dimensions::all();
        let total = reporters.len();

        let mut cards = Vec::with_capacity(total);
        for (i, reporter) in reporters.iter().enumerate() {
            cards.push(reporter.report(ctx)?);
            ctx.report_progress(i + 1, total);
        }

        let mut weighted_sum = 0.0;
        let mut total_weight = 0.0;
        for card in &cards {
            let weight = scoring.weights.for_dimension(&card.name).max(0.0);
            weighted_sum += card.score * weight;
            total_weight += weight;
        }
        let overall_score = if total_weight > 0.0 {
            round(weighted_sum / total_weight, 2)
        } else {
            100.0
        };

        tracing::info!(
            "Scored {} dimensions: overall {:.1}",
            cards.len(),
            overall_score
        );

        Ok(Report {
            generated_at: Utc::now(),
            templates_analyzed: ctx.batch.results.len(),
            error_count: ctx.batch.errors.len(),
            overall_score,
            grade: scoring.overall.grade(overall_score).to_string(),
            dimensions: cards,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::batch::BatchAnalyzer;
    use crate::config::Config;
    use crate::core::TemplateInput;

    fn drivers(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_grade_bands() {
        let bands = GradeBands::default();
        assert_eq!(bands.grade(95.0), "A");
        assert_eq!(bands.grade(90.0), "A");
        assert_eq!(bands.grade(85.0), "B");
        assert_eq!(bands.grade(75.0), "C");
        assert_eq!(bands.grade(65.0), "D");
        assert_eq!(bands.grade(10.0), "F");
    }

    #[test]
    fn test_rule_penalty_is_capped() {
        let rule = PenaltyRule::new("cycle_count", Direction::Above, 0.0, 10.0, 30.0, "{value} cycles");
        assert_eq!(rule.penalty(0.0), 0.0);
        assert!(!rule.triggered(0.0));
        assert_eq!(rule.penalty(2.0), 20.0);
        assert_eq!(rule.penalty(9.0), 30.0);
        assert_eq!(rule.insight(2.0), "2 cycles");
    }

    #[test]
    fn test_below_rule() {
        let rule = PenaltyRule::new("x", Direction::Below, 90.0, 1.0, 25.0, "{value}%");
        assert_eq!(rule.penalty(85.0), 5.0);
        assert_eq!(rule.penalty(95.0), 0.0);
        assert_eq!(rule.insight(66.666), "66.67%");
    }

    #[test]
    fn test_grade_clean_dimension() {
        let graded = grade(&ScoreTable::architecture(), &drivers(&[("cycle_count", 0.0)]));
        assert_eq!(graded.score, 100.0);
        assert_eq!(graded.grade, "A");
        assert!(graded.insights.is_empty());
    }

    #[test]
    fn test_grade_insights_follow_crossings() {
        let graded = grade(
            &ScoreTable::architecture(),
            &drivers(&[("cycle_count", 1.0), ("orphan_pct", 10.0), ("highly_coupled", 2.0)]),
        );
        assert_eq!(graded.score, 84.0);
        assert_eq!(graded.grade, "B");
        assert_eq!(graded.insights.len(), 2);
        assert!(graded.insights[0].contains("1 dependency cycles"));
    }

    #[test]
    fn test_grade_is_clamped() {
        let table = ScoreTable::new(vec![
            PenaltyRule::new("a", Direction::Above, 0.0, 100.0, 80.0, "a"),
            PenaltyRule::new("b", Direction::Above, 0.0, 100.0, 80.0, "b"),
        ]);
        let graded = grade(&table, &drivers(&[("a", 1.0), ("b", 1.0)]));
        assert_eq!(graded.score, 0.0);
        assert_eq!(graded.grade, "F");
    }

    #[test]
    fn test_missing_driver_is_skipped() {
        let graded = grade(&ScoreTable::style(), &BTreeMap::new());
        assert_eq!(graded.score, 100.0);
    }

    #[test]
    fn test_check_threshold() {
        let report = Report {
            generated_at: Utc::now(),
            templates_analyzed: 1,
            error_count: 0,
            overall_score: 72.5,
            grade: "C".to_string(),
            dimensions: Vec::new(),
        };
        assert!(report.check_threshold(70.0).is_ok());
        let err = report.check_threshold(80.0).unwrap_err();
        assert!(matches!(err, Error::ThresholdViolation { score, .. } if score == 72.5));
    }

    #[test]
    fn test_report_over_batch() {
        let config = Config::default();
        let batch = BatchAnalyzer::new(&config).analyze(&[
            TemplateInput::from_content("layouts/base.twig", "{% block body %}{% endblock %}\n"),
            TemplateInput::from_content(
                "pages/home.twig",
                "{% extends 'layouts/base.twig' %}\n{% block body %}{{ title|upper }}{% endblock %}\n",
            ),
        ]);
        let report = Analyzer::new()
            .analyze(&AnalysisContext::new(&batch, &config))
            .unwrap();
        let names: Vec<&str> = report.dimensions.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["style", "complexity", "architecture", "callables", "maintainability"]
        );
        assert_eq!(report.templates_analyzed, 2);
        assert!((0.0..=100.0).contains(&report.overall_score));
        for card in &report.dimensions {
            assert!((0.0..=100.0).contains(&card.score));
        }
        assert_eq!(report.dimension("architecture").unwrap().score, 100.0);
    }

    #[test]
    fn test_weights_lookup() {
        let weights = ScoreWeights::default();
        assert_eq!(weights.for_dimension("callables"), 0.8);
        assert_eq!(weights.for_dimension("unknown"), 0.0);
    }
}
