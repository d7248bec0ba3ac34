//! Second-pass analyzers over a complete batch.

use serde::Serialize;

use super::Result;
use crate::analyzers::batch::BatchResult;
use crate::config::Config;

type ProgressFn<'a> = Box<dyn Fn(usize, usize) + Send + Sync + 'a>;

/// An analysis that needs every template's phase-1 result.
///
/// Implementations read the batch and configuration from the
/// [`AnalysisContext`]; they never see a partial set of results.
pub trait Analyzer: Send + Sync {
    type Output: Serialize + Send;

    /// Short identifier, e.g. `"coupling"`.
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Self::Output>;
}

/// Inputs shared by second-pass analyzers.
pub struct AnalysisContext<'a> {
    pub batch: &'a BatchResult,
    pub config: &'a Config,
    pub on_progress: Option<ProgressFn<'a>>,
}

impl<'a> AnalysisContext<'a> {
    pub fn new(batch: &'a BatchResult, config: &'a Config) -> Self {
        Self {
            batch,
            config,
            on_progress: None,
        }
    }

    pub fn with_progress<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, usize) + Send + Sync + 'a,
    {
        self.on_progress = Some(Box::new(f));
        self
    }

    /// Forward `(current, total)` to the callback, if any.
    pub fn report_progress(&self, current: usize, total: usize) {
        if let Some(callback) = &self.on_progress {
            callback(current, total);
        }
    }
}
