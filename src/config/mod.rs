//! Layered analysis settings: defaults, `stencil.toml`, then `STENCIL_*` variables.

use std::collections::BTreeMap;
use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::core::Result;
use crate::score::{GradeBands, ScoreTable, ScoreWeights};

/// Analysis settings, one section per concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// File name suffixes treated as templates.
    pub extensions: Vec<String>,
    /// Exclude patterns (glob, relative to the analysis root).
    #[serde(rename = "exclude")]
    pub exclude_patterns: Vec<String>,
    pub complexity: ComplexityConfig,
    pub control_flow: ControlFlowConfig,
    pub style: StyleConfig,
    pub size: SizeConfig,
    pub security: SecurityConfig,
    pub classification: ClassificationConfig,
    pub coupling: CouplingConfig,
    pub scoring: ScoringConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            extensions: [".twig", ".jinja", ".jinja2", ".j2"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            exclude_patterns: Vec::new(),
            complexity: ComplexityConfig::default(),
            control_flow: ControlFlowConfig::default(),
            style: StyleConfig::default(),
            size: SizeConfig::default(),
            security: SecurityConfig::default(),
            classification: ClassificationConfig::default(),
            coupling: CouplingConfig::default(),
            scoring: ScoringConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from an explicit file path.
    ///
    /// Errors if the file does not exist. Use this for explicit `--config` flags.
    /// Env vars with `STENCIL_` prefix override file values.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(crate::core::Error::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file_exact(path))
            .merge(Env::prefixed("STENCIL_").split("__"))
            .extract()
            .map_err(|e| crate::core::Error::Config(e.to_string()))?;
        Ok(config)
    }

    /// Load configuration from directory, looking for stencil.toml or .stencil/stencil.toml.
    ///
    /// Missing files are silently skipped (defaults are used).
    /// Env vars with `STENCIL_` prefix override file/default values.
    pub fn load_default(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(dir.join("stencil.toml")))
            .merge(Toml::file(dir.join(".stencil/stencil.toml")))
            .merge(Env::prefixed("STENCIL_").split("__"))
            .extract()
            .map_err(|e| crate::core::Error::Config(e.to_string()))?;
        Ok(config)
    }

    /// Parse a standalone TOML document over the defaults, without file
    /// discovery or environment overrides.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Documented default config file content.
    pub fn default_toml() -> &'static str {
        include_str!("default_config.toml")
    }
}

/// Weights of the complexity score terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplexityWeights {
    pub condition: f64,
    #[serde(rename = "loop")]
    pub loop_: f64,
    pub ternary: f64,
    pub logical_operator: f64,
    pub test: f64,
    pub depth: f64,
}

impl Default for ComplexityWeights {
    fn default() -> Self {
        Self {
            condition: 1.0,
            loop_: 2.0,
            ternary: 1.0,
            logical_operator: 1.0,
            test: 0.0,
            depth: 2.0,
        }
    }
}

/// Complexity collector and rating configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplexityConfig {
    pub weights: ComplexityWeights,
    /// Upper bounds of ratings A..D; anything above the last is E.
    pub rating_thresholds: [f64; 4],
}

impl Default for ComplexityConfig {
    fn default() -> Self {
        Self {
            weights: ComplexityWeights::default(),
            rating_thresholds: [5.0, 10.0, 20.0, 30.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlFlowConfig {
    /// An `if` whose test joins more operands than this is complex.
    pub complex_condition_arity: usize,
}

impl Default for ControlFlowConfig {
    fn default() -> Self {
        Self {
            complex_condition_arity: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    /// Lines wider than this (display columns) are long.
    pub max_line_length: usize,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            max_line_length: 120,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizeConfig {
    /// Upper bounds (lines) of ratings A..D; anything above the last is E.
    pub rating_thresholds: [f64; 4],
    /// Templates longer than this count as large.
    pub large_template_lines: usize,
}

impl Default for SizeConfig {
    fn default() -> Self {
        Self {
            rating_thresholds: [50.0, 100.0, 200.0, 400.0],
            large_template_lines: 300,
        }
    }
}

/// Risk level of a callable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

/// Risky callable tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub filters: BTreeMap<String, RiskLevel>,
    pub functions: BTreeMap<String, RiskLevel>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        let filters = [
            ("raw", RiskLevel::High),
            ("safe", RiskLevel::High),
            ("convert_encoding", RiskLevel::Low),
            ("markdown_to_html", RiskLevel::Medium),
        ];
        let functions = [
            ("template_from_string", RiskLevel::High),
            ("constant", RiskLevel::Medium),
            ("attribute", RiskLevel::Medium),
            ("source", RiskLevel::Medium),
            ("dump", RiskLevel::Medium),
        ];
        Self {
            filters: filters.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            functions: functions.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }
}

/// Thresholds of the architectural-role and coupling-risk cascades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationConfig {
    pub core_component_refs: usize,
    pub layout_min_blocks: usize,
    pub base_template_blocks: usize,
    pub base_template_refs: usize,
    pub reusable_component_refs: usize,
    pub orchestrator_dependencies: usize,
    pub complex_leaf_score: f64,
    pub critical_refs: usize,
    pub critical_complexity: f64,
    pub high_refs: usize,
    pub high_dependencies: usize,
    pub high_shared_refs: usize,
    pub high_shared_dependencies: usize,
    pub medium_refs: usize,
    pub medium_dependencies: usize,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            core_component_refs: 10,
            layout_min_blocks: 3,
            base_template_blocks: 5,
            base_template_refs: 2,
            reusable_component_refs: 1,
            orchestrator_dependencies: 5,
            complex_leaf_score: 20.0,
            critical_refs: 10,
            critical_complexity: 20.0,
            high_refs: 10,
            high_dependencies: 8,
            high_shared_refs: 5,
            high_shared_dependencies: 4,
            medium_refs: 3,
            medium_dependencies: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CouplingConfig {
    /// fan-in + fan-out at or above this is highly coupled.
    pub highly_coupled_threshold: usize,
    /// Number of hotspots to report.
    pub hotspot_count: usize,
    /// I < this is considered stable.
    pub stable_threshold: f64,
    /// I > this is considered unstable.
    pub unstable_threshold: f64,
}

impl Default for CouplingConfig {
    fn default() -> Self {
        Self {
            highly_coupled_threshold: 10,
            hotspot_count: 10,
            stable_threshold: 0.3,
            unstable_threshold: 0.7,
        }
    }
}

/// Per-dimension score tables, overall weights and CI gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Minimum overall score to pass.
    pub fail_under: Option<f64>,
    pub weights: ScoreWeights,
    pub overall: GradeBands,
    pub style: ScoreTable,
    pub complexity: ScoreTable,
    pub architecture: ScoreTable,
    pub callables: ScoreTable,
    pub maintainability: ScoreTable,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            fail_under: None,
            weights: ScoreWeights::default(),
            overall: GradeBands::default(),
            style: ScoreTable::style(),
            complexity: ScoreTable::complexity(),
            architecture: ScoreTable::architecture(),
            callables: ScoreTable::callables(),
            maintainability: ScoreTable::maintainability(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.extensions.contains(&".twig".to_string()));
        assert_eq!(config.complexity.weights.loop_, 2.0);
        assert_eq!(config.complexity.weights.test, 0.0);
        assert_eq!(config.control_flow.complex_condition_arity, 3);
        assert_eq!(config.style.max_line_length, 120);
        assert_eq!(config.security.filters.get("raw"), Some(&RiskLevel::High));
        assert!(config.scoring.fail_under.is_none());
    }

    #[test]
    fn test_config_from_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "stencil.toml",
                "[complexity.weights]\nloop = 3.0\n\n[style]\nmax_line_length = 80",
            )?;
            let config = Config::from_file("stencil.toml").unwrap();
            assert_eq!(config.complexity.weights.loop_, 3.0);
            assert_eq!(config.complexity.weights.condition, 1.0);
            assert_eq!(config.style.max_line_length, 80);
            Ok(())
        });
    }

    #[test]
    fn test_config_load_default_stencil_toml() {
        Jail::expect_with(|jail| {
            jail.create_file("stencil.toml", "[coupling]\nhotspot_count = 3")?;
            let config = Config::load_default(".").unwrap();
            assert_eq!(config.coupling.hotspot_count, 3);
            Ok(())
        });
    }

    #[test]
    fn test_config_load_default_dot_stencil() {
        Jail::expect_with(|jail| {
            std::fs::create_dir(jail.directory().join(".stencil")).unwrap();
            jail.create_file(".stencil/stencil.toml", "[size]\nlarge_template_lines = 99")?;
            let config = Config::load_default(".").unwrap();
            assert_eq!(config.size.large_template_lines, 99);
            Ok(())
        });
    }

    #[test]
    fn test_config_load_default_no_file() {
        Jail::expect_with(|_jail| {
            let config = Config::load_default(".").unwrap();
            assert_eq!(config, Config::default());
            Ok(())
        });
    }

    #[test]
    fn test_from_file_errors_on_missing_file() {
        let result = Config::from_file("/nonexistent/path/stencil.toml");
        let err = result.unwrap_err().to_string();
        assert!(err.contains("not found"), "expected 'not found' in: {err}");
    }

    #[test]
    fn test_env_var_overrides_file_value() {
        Jail::expect_with(|jail| {
            jail.create_file("stencil.toml", "[control_flow]\ncomplex_condition_arity = 4")?;
            jail.set_env("STENCIL_CONTROL_FLOW__COMPLEX_CONDITION_ARITY", "6");
            let config = Config::from_file("stencil.toml").unwrap();
            assert_eq!(config.control_flow.complex_condition_arity, 6);
            Ok(())
        });
    }

    #[test]
    fn test_security_table_override() {
        Jail::expect_with(|jail| {
            jail.create_file("stencil.toml", "[security.filters]\nnl2br = \"low\"")?;
            let config = Config::from_file("stencil.toml").unwrap();
            assert_eq!(config.security.filters.get("nl2br"), Some(&RiskLevel::Low));
            Ok(())
        });
    }

    #[test]
    fn test_scoring_fail_under_and_weights() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "stencil.toml",
                "[scoring]\nfail_under = 70.0\n\n[scoring.weights]\nstyle = 0.5",
            )?;
            let config = Config::from_file("stencil.toml").unwrap();
            assert_eq!(config.scoring.fail_under, Some(70.0));
            assert_eq!(config.scoring.weights.style, 0.5);
            assert_eq!(config.scoring.weights.complexity, 1.0);
            assert_eq!(config.scoring.architecture, ScoreTable::architecture());
            Ok(())
        });
    }

    #[test]
    fn test_default_toml_parses_to_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file("stencil.toml", Config::default_toml())?;
            let config = Config::from_file("stencil.toml").unwrap();
            assert_eq!(config, Config::default());
            Ok(())
        });
    }

    #[test]
    fn test_from_toml_str() {
        let config = Config::from_toml_str("[style]\nmax_line_length = 100").unwrap();
        assert_eq!(config.style.max_line_length, 100);
        assert_eq!(config.size, SizeConfig::default());
        assert_eq!(Config::from_toml_str(Config::default_toml()).unwrap(), Config::default());
    }

    #[test]
    fn test_from_toml_str_rejects_bad_types() {
        let err = Config::from_toml_str("[style]\nmax_line_length = \"wide\"").unwrap_err();
        assert!(matches!(err, crate::core::Error::Toml(_)));
    }

    #[test]
    fn test_config_with_exclude_patterns() {
        Jail::expect_with(|jail| {
            jail.create_file("stencil.toml", "exclude = [\"vendor/**\", \"node_modules/**\"]")?;
            let config = Config::from_file("stencil.toml").unwrap();
            assert_eq!(config.exclude_patterns.len(), 2);
            assert!(config.exclude_patterns.contains(&"vendor/**".to_string()));
            Ok(())
        });
    }
}
