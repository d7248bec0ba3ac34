//! Core types and traits for template analysis.

mod analyzer;
mod error;
mod file_set;
pub mod metrics;
pub mod progress;
mod result;
pub mod template;

pub use analyzer::{AnalysisContext, Analyzer};
pub use error::{Error, Result};
pub use file_set::FileSet;
pub use metrics::MetricMap;
pub use result::{AnalysisResult, BatchError, BatchErrorKind, Summary};
pub use template::{InputSource, Template, TemplateInput};
