//! Library error type.
//!
//! Per-template `Io` and `Parse` errors are caught by the batch analyzer and
//! recorded as [`super::BatchError`]s; everything else reaches the caller.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A template root or input file that does not exist.
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Template syntax error at a 1-based line.
    #[error("Parse error in {path} at line {line}: {message}")]
    Parse {
        path: String,
        line: u32,
        message: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A second-pass analyzer could not produce its output.
    #[error("Analysis error: {message}")]
    Analysis { message: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Overall score under the `--fail-under` minimum.
    #[error("Threshold violation: {message}")]
    ThresholdViolation { message: String, score: f64 },
}

impl Error {
    pub fn analysis(message: impl Into<String>) -> Self {
        Self::Analysis {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn parse(path: impl Into<String>, line: u32, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            line,
            message: message.into(),
        }
    }

    pub fn threshold_violation(message: impl Into<String>, score: f64) -> Self {
        Self::ThresholdViolation {
            message: message.into(),
            score,
        }
    }

    /// Whether this error came from reading the template rather than parsing it.
    pub fn is_read_failure(&self) -> bool {
        matches!(self, Self::Io(_) | Self::FileNotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_template_message() {
        let err = Error::FileNotFound {
            path: PathBuf::from("layouts/base.html.twig"),
        };
        assert_eq!(err.to_string(), "File not found: layouts/base.html.twig");
        assert!(err.is_read_failure());
    }

    #[test]
    fn test_parse_error_names_line() {
        let err = Error::parse("page.twig", 3, "unclosed tag 'if'");
        assert_eq!(
            err.to_string(),
            "Parse error in page.twig at line 3: unclosed tag 'if'"
        );
        assert!(!err.is_read_failure());
    }

    #[test]
    fn test_io_is_read_failure() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "locked").into();
        assert!(err.is_read_failure());
        assert!(err.to_string().starts_with("I/O error"));
    }

    #[test]
    fn test_analysis_and_config_messages() {
        assert_eq!(
            Error::analysis("empty graph").to_string(),
            "Analysis error: empty graph"
        );
        assert_eq!(
            Error::config("bad weight").to_string(),
            "Configuration error: bad weight"
        );
    }

    #[test]
    fn test_threshold_violation_keeps_score() {
        let err = Error::threshold_violation("overall score 58.0 is below 70.0", 58.0);
        assert!(err.to_string().starts_with("Threshold violation"));
        let Error::ThresholdViolation { score, .. } = err else {
            panic!("expected threshold violation");
        };
        assert_eq!(score, 58.0);
    }
}
