//! Single-pass traversal with pluggable stateful collectors.
//!
//! A [`Traverser`] walks a template tree depth-first, pre-order. On entering
//! a node every registered collector's [`Collector::enter_node`] fires in
//! registration order, then the children are visited, then every
//! [`Collector::leave_node`] fires in the same order. Collector sets are
//! built fresh for each template and never reused.

pub mod callables;
pub mod complexity;
pub mod control_flow;
pub mod relationships;
pub mod style;
pub mod variables;

use crate::analyzers::graph::ParentResolver;
use crate::config::Config;
use crate::core::MetricMap;
use crate::parser::Node;

pub use callables::CallablesCollector;
pub use complexity::ComplexityCollector;
pub use control_flow::ControlFlowCollector;
pub use relationships::{Dependency, RelationKind, RelationshipsCollector};
pub use style::StyleScanner;
pub use variables::VariablesCollector;

/// A stateful visitor producing one template's metrics.
pub trait Collector {
    /// Short identifier, used in logs.
    fn name(&self) -> &'static str;

    fn enter_node(&mut self, node: &Node);

    fn leave_node(&mut self, node: &Node);

    /// Metrics gathered so far.
    fn data(&self) -> MetricMap;

    /// Nesting levels currently open; `0` once a traversal has completed.
    fn open_scopes(&self) -> usize {
        0
    }
}

/// Drives registered collectors over a tree.
#[derive(Default)]
pub struct Traverser<'a> {
    collectors: Vec<Box<dyn Collector + 'a>>,
}

impl<'a> Traverser<'a> {
    pub fn new() -> Self {
        Self {
            collectors: Vec::new(),
        }
    }

    /// The standard collector set for one template.
    ///
    /// Registration order is complexity, control flow, callables, variables,
    /// relationships; on key collisions later collectors win.
    pub fn for_template(
        path: &str,
        config: &Config,
        resolver: Option<&'a dyn ParentResolver>,
    ) -> Self {
        Self::new()
            .register(ComplexityCollector::new(config.complexity.weights.clone()))
            .register(ControlFlowCollector::new(
                config.control_flow.complex_condition_arity,
            ))
            .register(CallablesCollector::new())
            .register(VariablesCollector::new())
            .register(RelationshipsCollector::new(path, resolver))
    }

    /// Append a collector; it runs after those already registered.
    pub fn register(mut self, collector: impl Collector + 'a) -> Self {
        self.collectors.push(Box::new(collector));
        self
    }

    pub fn collector_names(&self) -> Vec<&'static str> {
        self.collectors.iter().map(|c| c.name()).collect()
    }

    /// Visit `root` and every descendant.
    pub fn traverse(&mut self, root: &Node) {
        for collector in &mut self.collectors {
            collector.enter_node(root);
        }
        for child in root.children() {
            self.traverse(child);
        }
        for collector in &mut self.collectors {
            collector.leave_node(root);
        }
    }

    /// Union of every collector's metrics in registration order.
    pub fn data(&self) -> MetricMap {
        let mut merged = MetricMap::new();
        for collector in &self.collectors {
            merged.merge(collector.data());
        }
        merged
    }

    /// Sum of nesting levels still open across collectors.
    pub fn open_scopes(&self) -> usize {
        self.collectors.iter().map(|c| c.open_scopes()).sum()
    }
}
