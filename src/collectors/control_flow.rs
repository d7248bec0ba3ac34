//! Control-flow statements and structure.

use std::collections::BTreeSet;

use super::Collector;
use crate::core::metrics::strings_value;
use crate::core::MetricMap;
use crate::parser::Node;

/// Counts control statements and tracks `if`/`for` nesting.
///
/// Only `if` and `for` open a control level. `has_nested_loops` is set when
/// a `for` brings the control depth above 1, i.e. when it opens inside
/// another `if` or `for`; a loop directly inside a block or macro does not
/// count.
#[derive(Debug, Clone, Default)]
pub struct ControlFlowCollector {
    complex_condition_arity: usize,
    ifs: usize,
    fors: usize,
    blocks: usize,
    macros: usize,
    sets: usize,
    block_names: BTreeSet<String>,
    macro_names: BTreeSet<String>,
    depth: usize,
    max_depth: usize,
    has_nested_loops: bool,
    has_complex_conditions: bool,
}

impl ControlFlowCollector {
    pub fn new(complex_condition_arity: usize) -> Self {
        Self {
            complex_condition_arity,
            ..Self::default()
        }
    }

    fn nest(&mut self) {
        self.depth += 1;
        self.max_depth = self.max_depth.max(self.depth);
    }
}

impl Collector for ControlFlowCollector {
    fn name(&self) -> &'static str {
        "control_flow"
    }

    fn enter_node(&mut self, node: &Node) {
        match node {
            Node::If { test, .. } => {
                self.ifs += 1;
                self.nest();
                if test.condition_arity() > self.complex_condition_arity {
                    self.has_complex_conditions = true;
                }
            }
            Node::For { .. } => {
                self.fors += 1;
                self.nest();
                if self.depth > 1 {
                    self.has_nested_loops = true;
                }
            }
            Node::Block { name, .. } => {
                self.blocks += 1;
                self.block_names.insert(name.clone());
            }
            Node::Macro { name, .. } => {
                self.macros += 1;
                self.macro_names.insert(name.clone());
            }
            Node::Set { .. } => self.sets += 1,
            _ => {}
        }
    }

    fn leave_node(&mut self, node: &Node) {
        if matches!(node, Node::If { .. } | Node::For { .. }) {
            self.depth = self.depth.saturating_sub(1);
        }
    }

    fn data(&self) -> MetricMap {
        MetricMap::new()
            .with("ifs", self.ifs)
            .with("fors", self.fors)
            .with("blocks", self.blocks)
            .with("macros", self.macros)
            .with("sets", self.sets)
            .with("block_names", strings_value(&self.block_names))
            .with("macro_names", strings_value(&self.macro_names))
            .with("unique_blocks", self.block_names.len())
            .with("unique_macros", self.macro_names.len())
            .with("max_control_depth", self.max_depth)
            .with("has_nested_loops", self.has_nested_loops)
            .with("has_complex_conditions", self.has_complex_conditions)
    }

    fn open_scopes(&self) -> usize {
        self.depth
    }
}
