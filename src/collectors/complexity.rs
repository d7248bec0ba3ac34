//! Logical complexity of a template.
//!
//! ```text
//! complexity_score = condition * conditions
//!                  + loop * loops
//!                  + ternary * ternaries
//!                  + logical_operator * logical_operators
//!                  + test * tests
//!                  + depth * max_depth
//! ```
//!
//! Nesting is tracked over `If`, `For`, `Block` and `Macro`. A template that
//! never enters any of the counted node kinds gets no complexity keys at all.

use super::Collector;
use crate::config::ComplexityWeights;
use crate::core::MetricMap;
use crate::parser::Node;
use crate::stats::round;

#[derive(Debug, Clone, Default)]
pub struct ComplexityCollector {
    weights: ComplexityWeights,
    conditions: usize,
    loops: usize,
    ternaries: usize,
    logical_operators: usize,
    tests: usize,
    depth: usize,
    max_depth: usize,
    applicable: bool,
}

impl ComplexityCollector {
    pub fn new(weights: ComplexityWeights) -> Self {
        Self {
            weights,
            ..Self::default()
        }
    }

    /// Weighted score for the counts seen so far.
    pub fn score(&self) -> f64 {
        let w = &self.weights;
        w.condition * self.conditions as f64
            + w.loop_ * self.loops as f64
            + w.ternary * self.ternaries as f64
            + w.logical_operator * self.logical_operators as f64
            + w.test * self.tests as f64
            + w.depth * self.max_depth as f64
    }

    fn nest(&mut self) {
        self.depth += 1;
        self.max_depth = self.max_depth.max(self.depth);
    }
}

fn is_nesting(node: &Node) -> bool {
    matches!(
        node,
        Node::If { .. } | Node::For { .. } | Node::Block { .. } | Node::Macro { .. }
    )
}

impl Collector for ComplexityCollector {
    fn name(&self) -> &'static str {
        "complexity"
    }

    fn enter_node(&mut self, node: &Node) {
        match node {
            Node::If { .. } => self.conditions += 1,
            Node::For { .. } => self.loops += 1,
            Node::Conditional { .. } => self.ternaries += 1,
            Node::Logical { .. } => self.logical_operators += 1,
            Node::TestExpr { .. } => self.tests += 1,
            Node::Block { .. } | Node::Macro { .. } => {}
            _ => return,
        }
        self.applicable = true;
        if is_nesting(node) {
            self.nest();
        }
    }

    fn leave_node(&mut self, node: &Node) {
        if is_nesting(node) {
            self.depth = self.depth.saturating_sub(1);
        }
    }

    fn data(&self) -> MetricMap {
        if !self.applicable {
            return MetricMap::new();
        }
        MetricMap::new()
            .with("complexity_score", round(self.score(), 2))
            .with("conditions", self.conditions)
            .with("loops", self.loops)
            .with("ternaries", self.ternaries)
            .with("logical_operators", self.logical_operators)
            .with("tests", self.tests)
            .with("max_depth", self.max_depth)
    }

    fn open_scopes(&self) -> usize {
        self.depth
    }
}
