//! Per-template analysis: parse, traverse, merge and enrich.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use crate::analyzers::graph::ParentResolver;
use crate::collectors::{StyleScanner, Traverser};
use crate::config::Config;
use crate::core::template::directory_of;
use crate::core::{AnalysisResult, BatchError, Error, MetricMap, Result, Template, TemplateInput};
use crate::parser::{Node, Parser, TemplateParser};
use crate::stats::{ratio, round};

/// Category assigned to templates that could not be analyzed.
pub const ERROR_CATEGORY: &str = "error";

/// Runs the collector set over one template.
pub struct TemplateAnalyzer {
    parser: Arc<dyn TemplateParser>,
    config: Config,
}

impl TemplateAnalyzer {
    pub fn new(config: &Config) -> Self {
        Self {
            parser: Arc::new(Parser::new()),
            config: config.clone(),
        }
    }

    /// Replace the built-in parser.
    pub fn with_parser(mut self, parser: Arc<dyn TemplateParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Load and analyze one input.
    pub fn analyze(&self, input: &TemplateInput) -> Result<AnalysisResult> {
        let template = input.load()?;
        self.analyze_template(&template, None)
    }

    /// Analyze an already loaded template.
    ///
    /// Without a resolver `inheritance_depth` is 1 for a template that
    /// extends and 0 otherwise; the batch resolves the full chain later.
    pub fn analyze_template(
        &self,
        template: &Template,
        resolver: Option<&dyn ParentResolver>,
    ) -> Result<AnalysisResult> {
        let start = Instant::now();
        let root = self.parser.parse(&template.path, &template.source)?;
        let metrics = self.collect(template, &root, resolver);

        tracing::debug!(
            "Analyzed {} in {:?}: {} metrics",
            template.path,
            start.elapsed(),
            metrics.len()
        );
        Ok(AnalysisResult::new(&template.path, metrics, start.elapsed()))
    }

    /// Traverse `root`, union in the source-text pass and enrich.
    fn collect(
        &self,
        template: &Template,
        root: &Node,
        resolver: Option<&dyn ParentResolver>,
    ) -> MetricMap {
        let mut traverser = Traverser::for_template(&template.path, &self.config, resolver);
        traverser.traverse(root);

        // tree-derived keys win over source-text keys
        let mut metrics = traverser.data();
        metrics.merge_missing(
            StyleScanner::new(self.config.style.max_line_length).scan(&template.source),
        );
        let enrichment = self.enrichment(template, &metrics);
        metrics.merge(enrichment);
        metrics
    }

    /// Analyze, turning any read or parse failure into a zeroed result plus
    /// an error record.
    pub fn analyze_or_fallback(&self, input: &TemplateInput) -> (AnalysisResult, Option<BatchError>) {
        match self.analyze(input) {
            Ok(result) => (result, None),
            Err(e) => {
                tracing::warn!("Analysis of {} failed: {}", input.path, e);
                (
                    self.fallback(&input.path, &e),
                    Some(BatchError::from_error(&input.path, &e)),
                )
            }
        }
    }

    /// Zero-valued result carrying the full base vocabulary.
    pub fn fallback(&self, path: &str, error: &Error) -> AnalysisResult {
        let empty = Template::new(path, String::new());
        let base = self.collect(&empty, &Node::Template { body: Vec::new() }, None);

        let mut metrics: MetricMap = base.into_iter().map(|(k, v)| (k, zeroed(v))).collect();
        metrics.insert("file", file_name(path));
        metrics.insert("directory", directory_of(path));
        metrics.insert("category", ERROR_CATEGORY);
        metrics.insert("complexity_rating", "n/a");
        metrics.insert("size_rating", "n/a");
        metrics.insert("analysis_error", error.to_string());
        AnalysisResult::new(path, metrics, Default::default())
    }

    fn enrichment(&self, template: &Template, metrics: &MetricMap) -> MetricMap {
        let lines = metrics.number("lines");
        let code_lines = metrics.number("code_lines");
        let logic = metrics.number("ifs") + metrics.number("fors") + metrics.number("sets");
        let macro_calls: usize = metrics.counts("macro_calls").values().sum();
        let callables = metrics.number("total_function_calls")
            + metrics.number("total_filter_calls")
            + macro_calls as f64;

        MetricMap::new()
            .with("file", template.file_name())
            .with("directory", template.directory())
            .with("file_size", template.size)
            .with("category", categorize(&template.path))
            .with(
                "comment_ratio",
                round(ratio(metrics.number("comment_lines"), lines), 4),
            )
            .with(
                "blank_line_ratio",
                round(ratio(metrics.number("blank_lines"), lines), 4),
            )
            .with("logic_ratio", round(ratio(logic, code_lines), 4))
            .with("callable_density", round(ratio(callables, code_lines), 4))
            .with(
                "complexity_rating",
                rating(
                    metrics.number("complexity_score"),
                    &self.config.complexity.rating_thresholds,
                ),
            )
            .with(
                "size_rating",
                rating(lines, &self.config.size.rating_thresholds),
            )
    }
}

fn zeroed(value: Value) -> Value {
    match value {
        Value::Number(_) => Value::from(0),
        Value::Bool(_) => Value::Bool(false),
        other => other,
    }
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Letter A..E: the first threshold `value` does not exceed, E past the last.
pub fn rating(value: f64, thresholds: &[f64; 4]) -> &'static str {
    const LETTERS: [&str; 4] = ["A", "B", "C", "D"];
    thresholds
        .iter()
        .zip(LETTERS)
        .find(|(limit, _)| value <= **limit)
        .map(|(_, letter)| letter)
        .unwrap_or("E")
}

/// Category from directory names (outermost first), then the `_` file prefix.
pub fn categorize(path: &str) -> &'static str {
    let mut segments: Vec<&str> = path.split('/').collect();
    let file = segments.pop().unwrap_or_default();
    for segment in segments {
        let category = match segment.to_ascii_lowercase().as_str() {
            "component" | "components" => Some("component"),
            "layout" | "layouts" => Some("layout"),
            "page" | "pages" => Some("page"),
            "partial" | "partials" => Some("partial"),
            "email" | "emails" => Some("email"),
            "form" | "forms" => Some("form"),
            "macro" | "macros" => Some("macro"),
            _ => None,
        };
        if let Some(category) = category {
            return category;
        }
    }
    if file.starts_with('_') {
        "partial"
    } else {
        "other"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyzer() -> TemplateAnalyzer {
        TemplateAnalyzer::new(&Config::default())
    }

    #[test]
    fn test_categorize() {
        assert_eq!(categorize("components/button.twig"), "component");
        assert_eq!(categorize("layouts/base.twig"), "layout");
        assert_eq!(categorize("admin/Pages/list.twig"), "page");
        assert_eq!(categorize("shared/_nav.twig"), "partial");
        assert_eq!(categorize("emails/welcome.twig"), "email");
        assert_eq!(categorize("forms/login.twig"), "form");
        assert_eq!(categorize("macros/ui.twig"), "macro");
        assert_eq!(categorize("pages/partials/row.twig"), "page");
        assert_eq!(categorize("index.twig"), "other");
    }

    #[test]
    fn test_rating() {
        let thresholds = [5.0, 10.0, 20.0, 30.0];
        assert_eq!(rating(0.0, &thresholds), "A");
        assert_eq!(rating(5.0, &thresholds), "A");
        assert_eq!(rating(5.5, &thresholds), "B");
        assert_eq!(rating(30.0, &thresholds), "D");
        assert_eq!(rating(31.0, &thresholds), "E");
    }

    #[test]
    fn test_analyze_enriches_metrics() {
        let input = TemplateInput::from_content(
            "pages/home.twig",
            "{% extends 'base.twig' %}\n{# page #}\n\n{% block body %}\n{% if user %}{{ user.name|upper }}{% endif %}\n{% endblock %}\n",
        );
        let result = analyzer().analyze(&input).unwrap();
        let m = &result.metrics;
        assert_eq!(result.path, "pages/home.twig");
        assert_eq!(m.string("file"), "home.twig");
        assert_eq!(m.string("directory"), "pages");
        assert_eq!(m.string("category"), "page");
        assert_eq!(m.count("lines"), 6);
        assert_eq!(m.count("comment_lines"), 1);
        assert_eq!(m.count("code_lines"), 4);
        assert_eq!(m.number("comment_ratio"), round(1.0 / 6.0, 4));
        // one if over four code lines
        assert_eq!(m.number("logic_ratio"), 0.25);
        assert_eq!(m.number("callable_density"), 0.25);
        assert_eq!(m.string("extends"), "base.twig");
        assert_eq!(m.count("inheritance_depth"), 1);
        assert_eq!(m.string("size_rating"), "A");
        assert!(m.contains_key("complexity_score"));
        assert!(!result.is_failure());
    }

    #[test]
    fn test_text_only_template_has_no_complexity_keys() {
        let input = TemplateInput::from_content("plain.twig", "just text");
        let result = analyzer().analyze(&input).unwrap();
        assert!(!result.metrics.contains_key("complexity_score"));
        assert_eq!(result.metrics.string("complexity_rating"), "A");
        assert!(result.metrics.contains_key("lines"));
        assert!(result.metrics.contains_key("filters"));
    }

    #[test]
    fn test_parse_failure_falls_back() {
        let input = TemplateInput::from_content("pages/broken.twig", "line one\n{% if x %}\nno end");
        let (result, error) = analyzer().analyze_or_fallback(&input);
        let error = error.unwrap();
        assert_eq!(error.path, "pages/broken.twig");
        assert_eq!(error.kind, crate::core::BatchErrorKind::Parse);
        assert!(result.is_failure());
        assert_eq!(result.metrics.string("category"), ERROR_CATEGORY);
        assert_eq!(result.metrics.string("file"), "broken.twig");
        assert_eq!(result.metrics.count("lines"), 0);
        assert_eq!(result.metrics.number("naming_consistency"), 0.0);
    }

    #[test]
    fn test_fallback_carries_base_vocabulary() {
        let ok = analyzer()
            .analyze(&TemplateInput::from_content("a.twig", "{{ x }}"))
            .unwrap();
        let failed = analyzer().fallback("a.twig", &Error::analysis("boom"));
        for key in ok.metrics.keys() {
            assert!(failed.metrics.contains_key(key), "missing {key}");
        }
        for (key, value) in failed.metrics.iter() {
            if let Value::Number(n) = value {
                assert_eq!(n.as_f64(), Some(0.0), "{key} is not zero");
            }
        }
    }

    #[test]
    fn test_custom_parser() {
        struct Failing;
        impl TemplateParser for Failing {
            fn parse(&self, path: &str, _source: &str) -> Result<crate::parser::Node> {
                Err(Error::parse(path, 1, "unsupported"))
            }
        }
        let analyzer = analyzer().with_parser(Arc::new(Failing));
        let input = TemplateInput::from_content("x.twig", "");
        assert!(analyzer.analyze(&input).is_err());
    }

    #[test]
    fn test_fallback_vocabulary_does_not_need_the_parser() {
        struct Failing;
        impl TemplateParser for Failing {
            fn parse(&self, path: &str, _source: &str) -> Result<crate::parser::Node> {
                Err(Error::parse(path, 1, "unsupported"))
            }
        }
        let reference = analyzer()
            .analyze(&TemplateInput::from_content("x.twig", "{{ x }}"))
            .unwrap();
        let (result, error) = analyzer()
            .with_parser(Arc::new(Failing))
            .analyze_or_fallback(&TemplateInput::from_content("x.twig", "{{ x }}"));
        assert!(error.is_some());
        for key in reference.metrics.keys() {
            assert!(result.metrics.contains_key(key), "missing base key {key}");
        }
        assert_eq!(result.metrics.count("lines"), 0);
        assert_eq!(result.metrics.string("category"), ERROR_CATEGORY);
    }
}
