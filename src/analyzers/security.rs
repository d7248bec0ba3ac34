//! Risky filter and function usage.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::{RiskLevel, SecurityConfig};
use crate::core::{AnalysisContext, AnalysisResult, Analyzer as AnalyzerTrait, Result};

/// Security analyzer.
#[derive(Default)]
pub struct Analyzer;

impl Analyzer {
    pub fn new() -> Self {
        Self
    }

    /// Findings of one template, sorted by callable name.
    pub fn scan(&self, result: &AnalysisResult, config: &SecurityConfig) -> Vec<Finding> {
        let mut findings = Vec::new();
        let tables = [
            (CallableKind::Filter, "filters", &config.filters),
            (CallableKind::Function, "functions", &config.functions),
        ];
        for (kind, key, table) in tables {
            for (name, count) in result.metrics.counts(key) {
                if let Some(level) = table.get(&name) {
                    findings.push(Finding {
                        template: result.path.clone(),
                        callable: name,
                        kind,
                        level: *level,
                        count,
                    });
                }
            }
        }
        findings
    }
}

impl AnalyzerTrait for Analyzer {
    type Output = Analysis;

    fn name(&self) -> &'static str {
        "security"
    }

    fn description(&self) -> &'static str {
        "Flag filters and functions that bypass escaping or expose internals"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Self::Output> {
        let mut findings: Vec<Finding> = ctx
            .batch
            .successful()
            .flat_map(|r| self.scan(r, &ctx.config.security))
            .collect();
        findings.sort_by(|a, b| {
            b.level
                .cmp(&a.level)
                .then_with(|| a.template.cmp(&b.template))
                .then_with(|| a.callable.cmp(&b.callable))
        });

        let mut calls: BTreeMap<RiskLevel, usize> = BTreeMap::new();
        for finding in &findings {
            *calls.entry(finding.level).or_insert(0) += finding.count;
        }
        let mut templates: Vec<&str> = findings.iter().map(|f| f.template.as_str()).collect();
        templates.sort_unstable();
        templates.dedup();

        let summary = AnalysisSummary {
            high_risk_calls: calls.get(&RiskLevel::High).copied().unwrap_or(0),
            medium_risk_calls: calls.get(&RiskLevel::Medium).copied().unwrap_or(0),
            low_risk_calls: calls.get(&RiskLevel::Low).copied().unwrap_or(0),
            templates_with_findings: templates.len(),
            total_findings: findings.len(),
        };
        Ok(Analysis { findings, summary })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallableKind {
    Filter,
    Function,
}

/// Usage of one risky callable in one template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub template: String,
    pub callable: String,
    pub kind: CallableKind,
    pub level: RiskLevel,
    /// Call sites in the template.
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    /// Highest risk first.
    pub findings: Vec<Finding>,
    pub summary: AnalysisSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub high_risk_calls: usize,
    pub medium_risk_calls: usize,
    pub low_risk_calls: usize,
    pub templates_with_findings: usize,
    pub total_findings: usize,
}
