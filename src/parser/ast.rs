//! Template syntax tree.
//!
//! The node set is closed: collectors dispatch with a `match` over [`Node`]
//! and never need an open-ended visitor hierarchy.

use serde::Serialize;

/// Literal constant.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    Number(f64),
    Bool(bool),
    Null,
}

/// Short-circuit operator of a [`Node::Logical`] expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// A syntax tree node.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Root of a parsed template.
    Template { body: Vec<Node> },
    /// Raw text between tags.
    Text(String),
    /// `{{ expr }}`.
    Output { expr: Box<Node> },
    /// `{% if %}`; `elseif` chains are nested `If` nodes in `else_body`.
    If {
        test: Box<Node>,
        body: Vec<Node>,
        else_body: Vec<Node>,
    },
    /// `{% for targets in iter [if condition] %}`.
    For {
        targets: Vec<String>,
        iter: Box<Node>,
        condition: Option<Box<Node>>,
        body: Vec<Node>,
        else_body: Vec<Node>,
    },
    /// `{% block name %}`.
    Block { name: String, body: Vec<Node> },
    /// `{% macro name(params) %}`.
    Macro {
        name: String,
        params: Vec<String>,
        defaults: Vec<Node>,
        body: Vec<Node>,
    },
    /// Call of an imported macro: `forms.input()`, `_self.row()` or a
    /// from-imported name.
    MacroCall {
        namespace: Option<String>,
        name: String,
        args: Vec<Node>,
    },
    /// `name(args)`.
    FunctionCall { name: String, args: Vec<Node> },
    /// `target|name(args)`; `target` is `None` inside `{% apply %}`.
    FilterCall {
        name: String,
        target: Option<Box<Node>>,
        args: Vec<Node>,
    },
    /// `target is [not] name(args)`.
    TestExpr {
        name: String,
        target: Box<Node>,
        args: Vec<Node>,
        negated: bool,
    },
    /// `{% include template [ignore missing] [with vars] [only] %}`.
    Include {
        template: Box<Node>,
        variables: Option<Box<Node>>,
        with_context: bool,
        ignore_missing: bool,
    },
    /// `{% embed template %}...{% endembed %}`.
    Embed {
        template: Box<Node>,
        variables: Option<Box<Node>>,
        with_context: bool,
        ignore_missing: bool,
        body: Vec<Node>,
    },
    /// `{% extends template %}`.
    Extends { template: Box<Node> },
    /// `{% import template as alias %}` or `{% from template import a as b %}`.
    Import {
        template: Box<Node>,
        alias: Option<String>,
        names: Vec<(String, Option<String>)>,
    },
    /// `{% set a = expr %}` or capture form `{% set a %}...{% endset %}`.
    Set {
        targets: Vec<String>,
        value: Option<Box<Node>>,
        body: Vec<Node>,
    },
    /// Variable reference.
    NameRef(String),
    /// `test ? then : otherwise`; `then` is `None` for `test ?: otherwise`.
    Conditional {
        test: Box<Node>,
        then: Option<Box<Node>>,
        otherwise: Option<Box<Node>>,
    },
    /// `left and right`, `left or right`.
    Logical {
        op: LogicalOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    Unary { op: String, operand: Box<Node> },
    Binary {
        op: String,
        left: Box<Node>,
        right: Box<Node>,
    },
    /// `object.name` or method call `object.name(args)`.
    Attribute {
        object: Box<Node>,
        name: String,
        args: Option<Vec<Node>>,
    },
    /// `object[index]`.
    Subscript { object: Box<Node>, index: Box<Node> },
    Literal(Literal),
    List(Vec<Node>),
    Hash(Vec<(Node, Node)>),
    /// Any other tag (`apply`, `with`, `autoescape`, `do`, ...).
    Container {
        tag: String,
        args: Vec<Node>,
        body: Vec<Node>,
    },
}

/// Field-less node discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Template,
    Text,
    Output,
    If,
    For,
    Block,
    Macro,
    MacroCall,
    FunctionCall,
    FilterCall,
    TestExpr,
    Include,
    Embed,
    Extends,
    Import,
    Set,
    NameRef,
    Conditional,
    Logical,
    Unary,
    Binary,
    Attribute,
    Subscript,
    Literal,
    List,
    Hash,
    Container,
}

impl Node {
    /// Discriminant of this node.
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Template { .. } => NodeKind::Template,
            Node::Text(_) => NodeKind::Text,
            Node::Output { .. } => NodeKind::Output,
            Node::If { .. } => NodeKind::If,
            Node::For { .. } => NodeKind::For,
            Node::Block { .. } => NodeKind::Block,
            Node::Macro { .. } => NodeKind::Macro,
            Node::MacroCall { .. } => NodeKind::MacroCall,
            Node::FunctionCall { .. } => NodeKind::FunctionCall,
            Node::FilterCall { .. } => NodeKind::FilterCall,
            Node::TestExpr { .. } => NodeKind::TestExpr,
            Node::Include { .. } => NodeKind::Include,
            Node::Embed { .. } => NodeKind::Embed,
            Node::Extends { .. } => NodeKind::Extends,
            Node::Import { .. } => NodeKind::Import,
            Node::Set { .. } => NodeKind::Set,
            Node::NameRef(_) => NodeKind::NameRef,
            Node::Conditional { .. } => NodeKind::Conditional,
            Node::Logical { .. } => NodeKind::Logical,
            Node::Unary { .. } => NodeKind::Unary,
            Node::Binary { .. } => NodeKind::Binary,
            Node::Attribute { .. } => NodeKind::Attribute,
            Node::Subscript { .. } => NodeKind::Subscript,
            Node::Literal(_) => NodeKind::Literal,
            Node::List(_) => NodeKind::List,
            Node::Hash(_) => NodeKind::Hash,
            Node::Container { .. } => NodeKind::Container,
        }
    }

    /// Children in source order.
    pub fn children(&self) -> Vec<&Node> {
        let mut out: Vec<&Node> = Vec::new();
        match self {
            Node::Template { body } | Node::Block { body, .. } => out.extend(body),
            Node::Text(_) | Node::NameRef(_) | Node::Literal(_) => {}
            Node::Output { expr } => out.push(expr),
            Node::If {
                test,
                body,
                else_body,
            } => {
                out.push(test);
                out.extend(body);
                out.extend(else_body);
            }
            Node::For {
                iter,
                condition,
                body,
                else_body,
                ..
            } => {
                out.push(iter);
                out.extend(condition.as_deref());
                out.extend(body);
                out.extend(else_body);
            }
            Node::Macro { defaults, body, .. } => {
                out.extend(defaults);
                out.extend(body);
            }
            Node::MacroCall { args, .. } | Node::FunctionCall { args, .. } => out.extend(args),
            Node::FilterCall { target, args, .. } => {
                out.extend(target.as_deref());
                out.extend(args);
            }
            Node::TestExpr { target, args, .. } => {
                out.push(target);
                out.extend(args);
            }
            Node::Include {
                template,
                variables,
                ..
            } => {
                out.push(template);
                out.extend(variables.as_deref());
            }
            Node::Embed {
                template,
                variables,
                body,
                ..
            } => {
                out.push(template);
                out.extend(variables.as_deref());
                out.extend(body);
            }
            Node::Extends { template } | Node::Import { template, .. } => out.push(template),
            Node::Set { value, body, .. } => {
                out.extend(value.as_deref());
                out.extend(body);
            }
            Node::Conditional {
                test,
                then,
                otherwise,
            } => {
                out.push(test);
                out.extend(then.as_deref());
                out.extend(otherwise.as_deref());
            }
            Node::Logical { left, right, .. } | Node::Binary { left, right, .. } => {
                out.push(left);
                out.push(right);
            }
            Node::Unary { operand, .. } => out.push(operand),
            Node::Attribute { object, args, .. } => {
                out.push(object);
                if let Some(args) = args {
                    out.extend(args);
                }
            }
            Node::Subscript { object, index } => {
                out.push(object);
                out.push(index);
            }
            Node::List(items) => out.extend(items),
            Node::Hash(pairs) => {
                for (key, value) in pairs {
                    out.push(key);
                    out.push(value);
                }
            }
            Node::Container { args, body, .. } => {
                out.extend(args);
                out.extend(body);
            }
        }
        out
    }

    /// Constant string value, if this node is a string literal.
    pub fn as_str_literal(&self) -> Option<&str> {
        match self {
            Node::Literal(Literal::Str(s)) => Some(s),
            _ => None,
        }
    }

    /// Number of operands joined by `and`/`or` at the top of this expression.
    pub fn condition_arity(&self) -> usize {
        match self {
            Node::Logical { left, right, .. } => left.condition_arity() + right.condition_arity(),
            _ => 1,
        }
    }

    /// Total number of nodes in this subtree.
    pub fn size(&self) -> usize {
        1 + self.children().iter().map(|c| c.size()).sum::<usize>()
    }

    pub fn name(name: &str) -> Node {
        Node::NameRef(name.to_string())
    }

    pub fn str(value: &str) -> Node {
        Node::Literal(Literal::Str(value.to_string()))
    }
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Template => "template",
            NodeKind::Text => "text",
            NodeKind::Output => "output",
            NodeKind::If => "if",
            NodeKind::For => "for",
            NodeKind::Block => "block",
            NodeKind::Macro => "macro",
            NodeKind::MacroCall => "macro_call",
            NodeKind::FunctionCall => "function_call",
            NodeKind::FilterCall => "filter_call",
            NodeKind::TestExpr => "test_expr",
            NodeKind::Include => "include",
            NodeKind::Embed => "embed",
            NodeKind::Extends => "extends",
            NodeKind::Import => "import",
            NodeKind::Set => "set",
            NodeKind::NameRef => "name_ref",
            NodeKind::Conditional => "conditional",
            NodeKind::Logical => "logical",
            NodeKind::Unary => "unary",
            NodeKind::Binary => "binary",
            NodeKind::Attribute => "attribute",
            NodeKind::Subscript => "subscript",
            NodeKind::Literal => "literal",
            NodeKind::List => "list",
            NodeKind::Hash => "hash",
            NodeKind::Container => "container",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_children_source_order() {
        let node = Node::If {
            test: Box::new(Node::name("a")),
            body: vec![Node::Text("x".into())],
            else_body: vec![Node::Text("y".into())],
        };
        let kinds: Vec<NodeKind> = node.children().iter().map(|c| c.kind()).collect();
        assert_eq!(kinds, vec![NodeKind::NameRef, NodeKind::Text, NodeKind::Text]);
        assert_eq!(node.size(), 4);
    }

    #[test]
    fn test_condition_arity() {
        let cond = Node::Logical {
            op: LogicalOp::And,
            left: Box::new(Node::Logical {
                op: LogicalOp::Or,
                left: Box::new(Node::name("a")),
                right: Box::new(Node::name("b")),
            }),
            right: Box::new(Node::name("c")),
        };
        assert_eq!(cond.condition_arity(), 3);
        assert_eq!(Node::name("a").condition_arity(), 1);
    }

    #[test]
    fn test_str_literal() {
        assert_eq!(Node::str("base.twig").as_str_literal(), Some("base.twig"));
        assert_eq!(Node::name("tpl").as_str_literal(), None);
    }
}
