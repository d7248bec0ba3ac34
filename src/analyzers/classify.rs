//! Architectural role and coupling risk of a template.
//!
//! Both are ordered rule cascades: the first matching rule wins, so a
//! template matching several rules gets the earliest one.

use crate::config::ClassificationConfig;
use crate::core::MetricMap;

/// Inputs of both cascades, read from an enriched metric map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Profile<'a> {
    pub referenced_by: usize,
    pub dependency_count: usize,
    pub unique_blocks: usize,
    pub complexity: f64,
    pub category: &'a str,
}

impl<'a> Profile<'a> {
    pub fn from_metrics(metrics: &'a MetricMap) -> Self {
        Self {
            referenced_by: metrics.count("referenced_by"),
            dependency_count: metrics.count("dependency_count"),
            unique_blocks: metrics.count("unique_blocks"),
            complexity: metrics.number("complexity_score"),
            category: metrics.string_or("category", "other"),
        }
    }
}

pub fn architectural_role(profile: &Profile<'_>, config: &ClassificationConfig) -> &'static str {
    let p = profile;
    if p.referenced_by >= config.core_component_refs {
        "core_component"
    } else if p.category == "layout" && p.unique_blocks >= config.layout_min_blocks {
        "layout"
    } else if p.unique_blocks >= config.base_template_blocks
        && p.referenced_by >= config.base_template_refs
    {
        "base_template"
    } else if p.category == "component" && p.referenced_by >= config.reusable_component_refs {
        "reusable_component"
    } else if p.dependency_count >= config.orchestrator_dependencies {
        "orchestrator"
    } else if p.referenced_by == 0 && p.dependency_count == 0 {
        "isolated"
    } else if p.referenced_by == 0 {
        "entry_point"
    } else if p.complexity >= config.complex_leaf_score {
        "complex_leaf"
    } else {
        "leaf"
    }
}

pub fn coupling_risk(profile: &Profile<'_>, config: &ClassificationConfig) -> &'static str {
    let p = profile;
    if p.referenced_by >= config.critical_refs && p.complexity >= config.critical_complexity {
        "critical"
    } else if p.referenced_by >= config.high_refs
        || p.dependency_count >= config.high_dependencies
        || (p.referenced_by >= config.high_shared_refs
            && p.dependency_count >= config.high_shared_dependencies)
    {
        "high"
    } else if p.referenced_by >= config.medium_refs || p.dependency_count >= config.medium_dependencies
    {
        "medium"
    } else {
        "low"
    }
}
