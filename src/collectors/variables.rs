//! Free-variable references resolved against a lexical scope stack.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use super::Collector;
use crate::core::metrics::counts_value;
use crate::core::MetricMap;
use crate::parser::Node;

/// Names provided by the engine; never reported as variables.
pub const BUILTIN_NAMES: &[&str] = &[
    "_self", "_context", "_charset", "_key", "app", "loop", "true", "false", "null", "none",
    "varargs",
];

/// Records references to names that are neither builtins nor bound by an
/// enclosing `for`, `macro` or earlier `set`.
///
/// Scopes: `for` binds its targets plus `loop`, `macro` binds its params plus
/// `varargs`, `block` opens an empty scope. Lookups scan the whole stack.
#[derive(Debug, Clone)]
pub struct VariablesCollector {
    scopes: Vec<HashSet<String>>,
    references: BTreeMap<String, usize>,
    defined: BTreeSet<String>,
}

impl Default for VariablesCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl VariablesCollector {
    pub fn new() -> Self {
        Self {
            scopes: vec![HashSet::new()],
            references: BTreeMap::new(),
            defined: BTreeSet::new(),
        }
    }

    fn in_scope(&self, name: &str) -> bool {
        self.scopes.iter().any(|frame| frame.contains(name))
    }

    fn push(&mut self, names: impl IntoIterator<Item = String>) {
        self.scopes.push(names.into_iter().collect());
    }

    fn bind(&mut self, name: &str) {
        if let Some(frame) = self.scopes.last_mut() {
            frame.insert(name.to_string());
        }
    }

    /// Frames above the root frame.
    pub fn scope_depth(&self) -> usize {
        self.scopes.len().saturating_sub(1)
    }
}

impl Collector for VariablesCollector {
    fn name(&self) -> &'static str {
        "variables"
    }

    fn enter_node(&mut self, node: &Node) {
        match node {
            Node::NameRef(name) => {
                if !BUILTIN_NAMES.contains(&name.as_str()) && !self.in_scope(name) {
                    *self.references.entry(name.clone()).or_insert(0) += 1;
                }
            }
            Node::For { targets, .. } => {
                let names = targets.iter().cloned().chain(["loop".to_string()]);
                self.push(names);
            }
            Node::Macro { params, .. } => {
                let names = params.iter().cloned().chain(["varargs".to_string()]);
                self.push(names);
            }
            Node::Block { .. } => self.push(Vec::new()),
            Node::Import { alias, names, .. } => {
                if let Some(alias) = alias {
                    self.bind(alias);
                }
                for (name, local) in names {
                    self.bind(local.as_deref().unwrap_or(name));
                }
            }
            _ => {}
        }
    }

    fn leave_node(&mut self, node: &Node) {
        match node {
            Node::For { .. } | Node::Macro { .. } | Node::Block { .. } => {
                if self.scopes.len() > 1 {
                    self.scopes.pop();
                }
            }
            // Bound after the value, so `set x = x + 1` still reads the outer `x`.
            Node::Set { targets, .. } => {
                for target in targets {
                    self.bind(target);
                    self.defined.insert(target.clone());
                }
            }
            _ => {}
        }
    }

    fn data(&self) -> MetricMap {
        MetricMap::new()
            .with("variables", counts_value(&self.references))
            .with("unique_variables", self.references.len())
            .with(
                "variable_references",
                self.references.values().sum::<usize>(),
            )
            .with("defined_variables", self.defined.len())
    }

    fn open_scopes(&self) -> usize {
        self.scope_depth()
    }
}
