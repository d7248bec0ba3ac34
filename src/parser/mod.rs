//! Twig/Jinja-style template parser.
//!
//! The analysis core depends only on [`TemplateParser`]; [`Parser`] is the
//! built-in implementation.

pub mod ast;
mod grammar;
pub mod lexer;

pub use ast::{Literal, LogicalOp, Node, NodeKind};

use crate::core::Result;

/// Turns `(path, source)` into a syntax tree rooted at [`Node::Template`].
pub trait TemplateParser: Send + Sync {
    fn parse(&self, path: &str, source: &str) -> Result<Node>;
}

/// Built-in recursive-descent parser.
#[derive(Debug, Default, Clone, Copy)]
pub struct Parser;

impl Parser {
    /// Create a new parser.
    pub fn new() -> Self {
        Self
    }
}

impl TemplateParser for Parser {
    fn parse(&self, path: &str, source: &str) -> Result<Node> {
        let tokens = lexer::tokenize(path, source)?;
        grammar::Grammar::new(path, tokens).parse_template()
    }
}
