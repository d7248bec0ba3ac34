//! Formatting consistency across templates.

use serde::{Deserialize, Serialize};

use crate::core::{AnalysisContext, Analyzer as AnalyzerTrait, Result};
use crate::stats::{mean, ratio, round};

/// Style analyzer.
#[derive(Default)]
pub struct Analyzer;

impl Analyzer {
    pub fn new() -> Self {
        Self
    }
}

impl AnalyzerTrait for Analyzer {
    type Output = Analysis;

    fn name(&self) -> &'static str {
        "style"
    }

    fn description(&self) -> &'static str {
        "Check indentation, naming and line-length consistency"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Self::Output> {
        let templates: Vec<TemplateStyle> = ctx
            .batch
            .successful()
            .map(|r| {
                let m = &r.metrics;
                let long_lines = m.count("long_lines");
                let trailing = m.count("trailing_whitespace_lines");
                let mixed = m.count("mixed_indentation_lines");
                TemplateStyle {
                    path: r.path.clone(),
                    lines: m.count("lines"),
                    indentation_style: m.string_or("indentation_style", "none").to_string(),
                    naming_consistency: m.number("naming_consistency"),
                    long_lines,
                    trailing_whitespace_lines: trailing,
                    mixed_indentation_lines: mixed,
                    violations: long_lines + trailing + mixed,
                }
            })
            .collect();

        let tabs = templates.iter().filter(|t| t.indentation_style == "tabs").count();
        let spaces = templates.iter().filter(|t| t.indentation_style == "spaces").count();
        let indented = templates
            .iter()
            .filter(|t| t.indentation_style != "none")
            .count();
        let (dominant, dominant_count) = if tabs == 0 && spaces == 0 {
            (if indented > 0 { "mixed" } else { "none" }, 0)
        } else if tabs > spaces {
            ("tabs", tabs)
        } else {
            ("spaces", spaces)
        };
        let indentation_consistency = if indented == 0 {
            100.0
        } else {
            dominant_count as f64 / indented as f64 * 100.0
        };

        let naming: Vec<f64> = templates.iter().map(|t| t.naming_consistency).collect();
        let total_lines: usize = templates.iter().map(|t| t.lines).sum();
        let long_lines: usize = templates.iter().map(|t| t.long_lines).sum();
        let trailing: usize = templates.iter().map(|t| t.trailing_whitespace_lines).sum();

        let summary = AnalysisSummary {
            templates: templates.len(),
            dominant_indentation: dominant.to_string(),
            indentation_consistency: round(indentation_consistency, 2),
            avg_naming_consistency: if naming.is_empty() {
                100.0
            } else {
                round(mean(&naming), 2)
            },
            long_line_ratio: round(ratio(long_lines as f64, total_lines as f64), 4),
            trailing_whitespace_ratio: round(ratio(trailing as f64, total_lines as f64), 4),
            mixed_indentation_files: templates
                .iter()
                .filter(|t| t.indentation_style == "mixed")
                .count(),
            total_violations: templates.iter().map(|t| t.violations).sum(),
        };

        let mut violating: Vec<TemplateStyle> =
            templates.into_iter().filter(|t| t.violations > 0).collect();
        violating.sort_by(|a, b| b.violations.cmp(&a.violations).then_with(|| a.path.cmp(&b.path)));

        Ok(Analysis {
            templates: violating,
            summary,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    /// Templates with at least one violation, most violations first.
    pub templates: Vec<TemplateStyle>,
    pub summary: AnalysisSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateStyle {
    pub path: String,
    pub lines: usize,
    pub indentation_style: String,
    pub naming_consistency: f64,
    pub long_lines: usize,
    pub trailing_whitespace_lines: usize,
    pub mixed_indentation_lines: usize,
    /// Long, trailing-whitespace and mixed-indentation lines.
    pub violations: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub templates: usize,
    pub dominant_indentation: String,
    /// Percent of indented templates using the dominant style.
    pub indentation_consistency: f64,
    pub avg_naming_consistency: f64,
    pub long_line_ratio: f64,
    pub trailing_whitespace_ratio: f64,
    pub mixed_indentation_files: usize,
    pub total_violations: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::batch::BatchAnalyzer;
    use crate::config::Config;
    use crate::core::TemplateInput;

    fn analyze(inputs: &[(&str, &str)]) -> Analysis {
        let config = Config::default();
        let inputs: Vec<TemplateInput> = inputs
            .iter()
            .map(|(p, s)| TemplateInput::from_content(*p, *s))
            .collect();
        let batch = BatchAnalyzer::new(&config).analyze(&inputs);
        let ctx = AnalysisContext::new(&batch, &config);
        let analysis = Analyzer::new().analyze(&ctx).unwrap();
        analysis
    }

    #[test]
    fn test_indentation_consistency() {
        let analysis = analyze(&[
            ("a.twig", "<div>\n    <p>a</p>\n</div>"),
            ("b.twig", "<div>\n  <p>b</p>\n</div>"),
            ("c.twig", "<div>\n\t<p>c</p>\n</div>"),
            ("d.twig", "flat"),
        ]);
        let s = &analysis.summary;
        assert_eq!(s.dominant_indentation, "spaces");
        // two of the three indented templates use spaces
        assert_eq!(s.indentation_consistency, 66.67);
        assert_eq!(s.total_violations, 0);
        assert!(analysis.templates.is_empty());
    }

    #[test]
    fn test_violations() {
        let source = format!("{}\nend  \n", "x".repeat(130));
        let analysis = analyze(&[("a.twig", source.as_str()), ("b.twig", "\t  mixed\nok")]);
        let s = &analysis.summary;
        assert_eq!(s.total_violations, 3);
        assert_eq!(s.mixed_indentation_files, 1);
        assert_eq!(s.long_line_ratio, 0.25);
        assert_eq!(analysis.templates[0].path, "a.twig");
        assert_eq!(analysis.templates[0].violations, 2);
    }

    #[test]
    fn test_empty_batch() {
        let analysis = analyze(&[]);
        assert_eq!(analysis.summary.indentation_consistency, 100.0);
        assert_eq!(analysis.summary.avg_naming_consistency, 100.0);
        assert_eq!(analysis.summary.dominant_indentation, "none");
    }
}
