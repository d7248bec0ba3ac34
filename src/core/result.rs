//! Per-template results and per-file error records.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{Error, MetricMap};

/// Metrics for one template.
///
/// Built once. Cross-template enrichment goes through [`AnalysisResult::enriched`],
/// which returns a new instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub path: String,
    pub metrics: MetricMap,
    #[serde(with = "duration_serde")]
    pub elapsed: Duration,
}

impl AnalysisResult {
    pub fn new(path: impl Into<String>, metrics: MetricMap, elapsed: Duration) -> Self {
        Self {
            path: path.into(),
            metrics,
            elapsed,
        }
    }

    /// A copy carrying `extra` on top of the current metrics (extra wins).
    pub fn enriched(&self, extra: MetricMap) -> Self {
        let mut metrics = self.metrics.clone();
        metrics.merge(extra);
        Self {
            path: self.path.clone(),
            metrics,
            elapsed: self.elapsed,
        }
    }

    /// Whether this is a fallback result for a failed template.
    pub fn is_failure(&self) -> bool {
        self.metrics.contains_key("analysis_error")
    }
}

/// Stage at which a template failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchErrorKind {
    Read,
    Parse,
}

/// Batch-level record of one failed template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchError {
    pub path: String,
    pub kind: BatchErrorKind,
    pub message: String,
}

impl BatchError {
    pub fn from_error(path: impl Into<String>, error: &Error) -> Self {
        let kind = if error.is_read_failure() {
            BatchErrorKind::Read
        } else {
            BatchErrorKind::Parse
        };
        Self {
            path: path.into(),
            kind,
            message: error.to_string(),
        }
    }
}

/// Quick batch statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub templates_analyzed: usize,
    pub errors: usize,
    #[serde(with = "duration_serde")]
    pub duration: Duration,
}

impl Summary {
    pub fn new(templates_analyzed: usize, errors: usize, duration: Duration) -> Self {
        Self {
            templates_analyzed,
            errors,
            duration,
        }
    }
}

mod duration_serde {
    use std::time::Duration;

    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Ok(Duration::from_secs_f64(secs.max(0.0)))
    }
}
