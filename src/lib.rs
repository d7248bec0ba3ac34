//! Stencil - quality metrics for Twig and Jinja-style template sets.
//!
//! Stencil parses every template once, collects per-template metrics with a
//! set of tree collectors, builds the cross-template dependency graph and
//! scores five quality dimensions: style, complexity, architecture, callable
//! usage and maintainability.
//!
//! # Example
//!
//! ```no_run
//! use stencil::analyzers::BatchAnalyzer;
//! use stencil::config::Config;
//! use stencil::core::{AnalysisContext, Analyzer, FileSet};
//!
//! let config = Config::default();
//! let files = FileSet::from_path("templates", &config).unwrap();
//! let batch = BatchAnalyzer::new(&config).analyze(&files.inputs());
//! let report = stencil::score::Analyzer::new()
//!     .analyze(&AnalysisContext::new(&batch, &config))
//!     .unwrap();
//! println!("{} templates, grade {}", report.templates_analyzed, report.grade);
//! ```

pub mod analyzers;
pub mod cli;
pub mod collectors;
pub mod config;
pub mod core;
pub mod output;
pub mod parser;
pub mod score;
pub mod stats;

pub use core::{AnalysisContext, AnalysisResult, Analyzer};
