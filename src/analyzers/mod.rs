//! Template analyzers.
//!
//! [`template`] and [`batch`] produce the per-template results and the
//! dependency graph; the remaining modules are second-pass analyzers over a
//! complete [`batch::BatchResult`].

pub mod batch;
pub mod blocks;
pub mod classify;
pub mod coupling;
pub mod graph;
pub mod security;
pub mod style;
pub mod template;

// Re-export analyzer types for convenience
pub use batch::{BatchAnalyzer, BatchResult};
pub use coupling::Analyzer as CouplingAnalyzer;
pub use graph::{DependencyGraph, GraphParentResolver, ParentResolver};
pub use template::TemplateAnalyzer;
