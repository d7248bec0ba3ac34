//! Block inheritance analyzer.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::graph::{ancestors, GraphParentResolver};
use crate::core::{AnalysisContext, Analyzer as AnalyzerTrait, Result};
use crate::stats::{ratio, round};

const MOST_OVERRIDDEN: usize = 5;

/// Block analyzer.
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
        "blocks"
    }

    fn description(&self) -> &'static str {
        "Track block definitions, overrides and orphaned blocks"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Self::Output> {
        let batch = ctx.batch;
        let resolver = GraphParentResolver::from_graph(&batch.graph);

        let provided: BTreeMap<&str, BTreeSet<String>> = batch
            .successful()
            .map(|r| {
                let blocks = r.metrics.strings("provided_blocks").into_iter().collect();
                (r.path.as_str(), blocks)
            })
            .collect();

        let mut by_name: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (path, blocks) in &provided {
            for block in blocks {
                by_name
                    .entry(block.clone())
                    .or_default()
                    .push(path.to_string());
            }
        }
        let blocks: Vec<BlockUsage> = by_name
            .into_iter()
            .map(|(name, templates)| BlockUsage {
                name,
                definitions: templates.len(),
                templates,
            })
            .collect();

        let mut most_overridden: Vec<BlockUsage> =
            blocks.iter().filter(|b| b.definitions > 1).cloned().collect();
        most_overridden.sort_by(|a, b| {
            b.definitions
                .cmp(&a.definitions)
                .then_with(|| a.name.cmp(&b.name))
        });
        most_overridden.truncate(MOST_OVERRIDDEN);

        let mut orphaned_blocks = Vec::new();
        for result in batch.successful() {
            if result.metrics.string("extends").is_empty() {
                continue;
            }
            let analyzed: Vec<String> = ancestors(&result.path, &resolver)
                .into_iter()
                .filter(|a| provided.contains_key(a.as_str()))
                .collect();
            // nothing to compare against when no ancestor was analyzed
            if analyzed.is_empty() {
                continue;
            }
            let inherited: BTreeSet<&String> = analyzed
                .iter()
                .filter_map(|a| provided.get(a.as_str()))
                .flatten()
                .collect();
            let used: BTreeSet<String> = result.metrics.strings("used_blocks").into_iter().collect();
            let Some(own) = provided.get(result.path.as_str()) else {
                continue;
            };
            for block in own {
                if !inherited.contains(block) && !used.contains(block) {
                    orphaned_blocks.push(OrphanedBlock {
                        template: result.path.clone(),
                        block: block.clone(),
                        ancestors: analyzed.clone(),
                    });
                }
            }
        }

        let total_blocks: usize = provided.values().map(BTreeSet::len).sum();
        let templates_with_blocks = provided.values().filter(|b| !b.is_empty()).count();
        let summary = AnalysisSummary {
            total_blocks,
            unique_block_names: blocks.len(),
            templates_with_blocks,
            avg_blocks_per_template: round(ratio(total_blocks as f64, provided.len() as f64), 4),
            orphaned_count: orphaned_blocks.len(),
        };

        Ok(Analysis {
            blocks,
            most_overridden,
            orphaned_blocks,
            summary,
        })
    }
}

/// Block analysis result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    /// Every block name, sorted.
    pub blocks: Vec<BlockUsage>,
    pub most_overridden: Vec<BlockUsage>,
    pub orphaned_blocks: Vec<OrphanedBlock>,
    pub summary: AnalysisSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockUsage {
    pub name: String,
    /// Number of templates defining this block.
    pub definitions: usize,
    pub templates: Vec<String>,
}

/// A block defined in a child template that no analyzed ancestor declares
/// and the template never renders through `block()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrphanedBlock {
    pub template: String,
    pub block: String,
    pub ancestors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub total_blocks: usize,
    pub unique_block_names: usize,
    pub templates_with_blocks: usize,
    pub avg_blocks_per_template: f64,
    pub orphaned_count: usize,
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
    fn test_overrides_and_orphans() {
        let analysis = analyze(&[
            ("base.twig", "{% block title %}{% endblock %}{% block body %}{% endblock %}"),
            ("layout.twig", "{% extends 'base.twig' %}{% block body %}{% block main %}{% endblock %}{% endblock %}"),
            ("page.twig", "{% extends 'layout.twig' %}{% block main %}{% endblock %}{% block title %}{% endblock %}{% block extra %}{% endblock %}"),
        ]);

        let body = analysis.blocks.iter().find(|b| b.name == "body").unwrap();
        assert_eq!(body.definitions, 2);
        assert_eq!(analysis.most_overridden.len(), 3);

        // layout introduces `main`; page introduces `extra`
        let orphans: Vec<(&str, &str)> = analysis
            .orphaned_blocks
            .iter()
            .map(|o| (o.template.as_str(), o.block.as_str()))
            .collect();
        assert_eq!(orphans, vec![("layout.twig", "main"), ("page.twig", "extra")]);
        let page = &analysis.orphaned_blocks[1];
        assert_eq!(page.ancestors, vec!["layout.twig", "base.twig"]);

        assert_eq!(analysis.summary.total_blocks, 7);
        assert_eq!(analysis.summary.templates_with_blocks, 3);
    }

    #[test]
    fn test_block_function_use_is_not_orphaned() {
        let analysis = analyze(&[
            ("base.twig", "{% block body %}{% endblock %}"),
            ("child.twig", "{% extends 'base.twig' %}{% block body %}{{ block('helper') }}{% endblock %}{% block helper %}x{% endblock %}"),
        ]);
        assert!(analysis.orphaned_blocks.is_empty());
    }

    #[test]
    fn test_unanalyzed_parent_is_skipped() {
        let analysis = analyze(&[(
            "child.twig",
            "{% extends '@Vendor/base.twig' %}{% block anything %}{% endblock %}",
        )]);
        assert!(analysis.orphaned_blocks.is_empty());
        assert_eq!(analysis.summary.avg_blocks_per_template, 1.0);
    }
}
