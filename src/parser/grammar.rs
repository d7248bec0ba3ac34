//! Recursive-descent grammar over lexer tokens.

use std::collections::HashSet;

use super::ast::{Literal, LogicalOp, Node};
use super::lexer::{Spanned, Token};
use crate::core::{Error, Result};

/// Tags that enclose a body closed by `end<tag>`.
const PAIRED_TAGS: &[&str] = &[
    "apply",
    "autoescape",
    "cache",
    "call",
    "filter",
    "guard",
    "sandbox",
    "spaceless",
    "stopwatch",
    "trans",
    "with",
];

/// Deepest tag or sub-expression recursion accepted.
const MAX_NESTING: usize = 128;

/// Tallest expression tree, and longest operator or filter chain, accepted.
const MAX_HEIGHT: usize = 256;

static EOF: Token = Token::Eof;

pub(crate) struct Grammar<'a> {
    path: &'a str,
    tokens: Vec<Spanned>,
    pos: usize,
    /// Names whose attribute calls are macro calls (`_self`, import aliases).
    macro_namespaces: HashSet<String>,
    /// Names callable directly as macros (from-imports, local macros).
    imported_macros: HashSet<String>,
    inline_if: bool,
    depth: usize,
}

impl<'a> Grammar<'a> {
    pub(crate) fn new(path: &'a str, tokens: Vec<Spanned>) -> Self {
        Self {
            path,
            tokens,
            pos: 0,
            macro_namespaces: HashSet::from(["_self".to_string()]),
            imported_macros: HashSet::new(),
            inline_if: true,
            depth: 0,
        }
    }

    pub(crate) fn parse_template(mut self) -> Result<Node> {
        let (body, _) = self.parse_body(&[])?;
        Ok(Node::Template { body })
    }

    // -- token helpers ------------------------------------------------------

    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        self.tokens
            .get(self.pos + offset)
            .map(|s| &s.token)
            .unwrap_or(&EOF)
    }

    fn line(&self) -> u32 {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|s| s.line)
            .unwrap_or(1)
    }

    fn next(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::parse(self.path, self.line(), message)
    }

    fn is_punct(&self, punct: &str) -> bool {
        matches!(self.peek(), Token::Punct(p) if *p == punct)
    }

    fn is_name(&self, name: &str) -> bool {
        matches!(self.peek(), Token::Name(n) if n == name)
    }

    fn eat_punct(&mut self, punct: &str) -> bool {
        if self.is_punct(punct) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_name(&mut self, name: &str) -> bool {
        if self.is_name(name) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, punct: &str) -> Result<()> {
        if self.eat_punct(punct) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{punct}', found {}", describe(self.peek()))))
        }
    }

    fn expect_name(&mut self) -> Result<String> {
        match self.peek() {
            Token::Name(_) => match self.next() {
                Token::Name(name) => Ok(name),
                _ => unreachable!("peeked a name"),
            },
            other => Err(self.error(format!("expected a name, found {}", describe(other)))),
        }
    }

    fn expect_block_end(&mut self) -> Result<()> {
        if matches!(self.peek(), Token::BlockEnd) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!(
                "expected end of tag, found {}",
                describe(self.peek())
            )))
        }
    }

    fn skip_optional_name(&mut self) {
        if matches!(self.peek(), Token::Name(_)) {
            self.pos += 1;
        }
    }

    fn with_inline_if<T>(&mut self, allowed: bool, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let saved = std::mem::replace(&mut self.inline_if, allowed);
        let result = f(self);
        self.inline_if = saved;
        result
    }

    /// Run `f` one nesting level deeper.
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= MAX_NESTING {
            return Err(self.error("nesting too deep"));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Count one more link of an operator or postfix chain.
    fn link(&self, links: &mut usize) -> Result<()> {
        *links += 1;
        if *links > MAX_HEIGHT {
            return Err(self.error("expression chain too long"));
        }
        Ok(())
    }

    // -- statements ---------------------------------------------------------

    /// Parse nodes until one of `end_tags` opens a tag; returns the tag found.
    fn parse_body(&mut self, end_tags: &[&str]) -> Result<(Vec<Node>, String)> {
        let mut body = Vec::new();
        loop {
            let line = self.line();
            match self.next() {
                Token::Eof => {
                    if end_tags.is_empty() {
                        return Ok((body, String::new()));
                    }
                    return Err(Error::parse(
                        self.path,
                        line,
                        format!("unexpected end of template, expected '{}'", end_tags.join("' or '")),
                    ));
                }
                Token::Text(text) => body.push(Node::Text(text)),
                Token::VarStart => {
                    let expr = self.parse_expr()?;
                    if !matches!(self.next(), Token::VarEnd) {
                        return Err(Error::parse(self.path, line, "expected '}}'"));
                    }
                    body.push(Node::Output {
                        expr: Box::new(expr),
                    });
                }
                Token::BlockStart => {
                    let tag = self.expect_name()?;
                    if end_tags.contains(&tag.as_str()) {
                        return Ok((body, tag));
                    }
                    if tag.starts_with("end") || matches!(tag.as_str(), "else" | "elseif" | "elif") {
                        return Err(Error::parse(
                            self.path,
                            line,
                            format!("unexpected '{tag}' tag"),
                        ));
                    }
                    body.push(self.nested(|g| g.parse_tag(&tag))?);
                }
                other => {
                    return Err(Error::parse(
                        self.path,
                        line,
                        format!("unexpected {}", describe(&other)),
                    ))
                }
            }
        }
    }

    fn parse_tag(&mut self, tag: &str) -> Result<Node> {
        match tag {
            "if" => self.parse_if(),
            "for" => self.parse_for(),
            "block" => self.parse_block(),
            "macro" => self.parse_macro(),
            "set" => self.parse_set(),
            "include" => {
                let template = self.parse_expr()?;
                let options = self.parse_include_options()?;
                self.expect_block_end()?;
                Ok(Node::Include {
                    template: Box::new(template),
                    variables: options.variables.map(Box::new),
                    with_context: options.with_context,
                    ignore_missing: options.ignore_missing,
                })
            }
            "embed" => {
                let template = self.parse_expr()?;
                let options = self.parse_include_options()?;
                self.expect_block_end()?;
                let (body, _) = self.parse_body(&["endembed"])?;
                self.expect_block_end()?;
                Ok(Node::Embed {
                    template: Box::new(template),
                    variables: options.variables.map(Box::new),
                    with_context: options.with_context,
                    ignore_missing: options.ignore_missing,
                    body,
                })
            }
            "extends" => {
                let template = self.parse_expr()?;
                self.expect_block_end()?;
                Ok(Node::Extends {
                    template: Box::new(template),
                })
            }
            "import" => self.parse_import(),
            "from" => self.parse_from(),
            _ => self.parse_container(tag),
        }
    }

    fn parse_if(&mut self) -> Result<Node> {
        let test = self.parse_expr()?;
        self.expect_block_end()?;
        let (body, end) = self.parse_body(&["elseif", "elif", "else", "endif"])?;
        let else_body = match end.as_str() {
            "elseif" | "elif" => vec![self.nested(|g| g.parse_if())?],
            "else" => {
                self.expect_block_end()?;
                let (else_body, _) = self.parse_body(&["endif"])?;
                self.expect_block_end()?;
                else_body
            }
            _ => {
                self.expect_block_end()?;
                Vec::new()
            }
        };
        Ok(Node::If {
            test: Box::new(test),
            body,
            else_body,
        })
    }

    fn parse_for(&mut self) -> Result<Node> {
        let mut targets = vec![self.expect_name()?];
        while self.eat_punct(",") {
            targets.push(self.expect_name()?);
        }
        if !self.eat_name("in") {
            return Err(self.error("expected 'in' in for tag"));
        }
        let iter = self.with_inline_if(false, |g| g.parse_expr())?;
        let condition = if self.eat_name("if") {
            Some(Box::new(self.parse_expr()?))
        } else {
            None
        };
        self.eat_name("recursive");
        self.expect_block_end()?;
        let (body, end) = self.parse_body(&["else", "endfor"])?;
        let else_body = if end == "else" {
            self.expect_block_end()?;
            let (else_body, _) = self.parse_body(&["endfor"])?;
            else_body
        } else {
            Vec::new()
        };
        self.expect_block_end()?;
        Ok(Node::For {
            targets,
            iter: Box::new(iter),
            condition,
            body,
            else_body,
        })
    }

    fn parse_block(&mut self) -> Result<Node> {
        let name = self.expect_name()?;
        while self.eat_name("scoped") || self.eat_name("required") {}
        if matches!(self.peek(), Token::BlockEnd) {
            self.pos += 1;
            let (body, _) = self.parse_body(&["endblock"])?;
            self.skip_optional_name();
            self.expect_block_end()?;
            return Ok(Node::Block { name, body });
        }
        let expr = self.parse_expr()?;
        self.expect_block_end()?;
        Ok(Node::Block {
            name,
            body: vec![Node::Output {
                expr: Box::new(expr),
            }],
        })
    }

    fn parse_macro(&mut self) -> Result<Node> {
        let name = self.expect_name()?;
        let mut params = Vec::new();
        let mut defaults = Vec::new();
        self.expect_punct("(")?;
        if !self.eat_punct(")") {
            loop {
                params.push(self.expect_name()?);
                if self.eat_punct("=") {
                    defaults.push(self.parse_expr()?);
                }
                if !self.eat_punct(",") {
                    self.expect_punct(")")?;
                    break;
                }
            }
        }
        self.expect_block_end()?;
        let (body, _) = self.parse_body(&["endmacro"])?;
        self.skip_optional_name();
        self.expect_block_end()?;
        self.imported_macros.insert(name.clone());
        Ok(Node::Macro {
            name,
            params,
            defaults,
            body,
        })
    }

    fn parse_set(&mut self) -> Result<Node> {
        let mut targets = vec![self.expect_name()?];
        while self.eat_punct(",") {
            targets.push(self.expect_name()?);
        }
        if self.eat_punct("=") {
            let mut values = vec![self.parse_expr()?];
            while self.eat_punct(",") {
                values.push(self.parse_expr()?);
            }
            self.expect_block_end()?;
            let value = if values.len() == 1 {
                values.pop()
            } else {
                Some(Node::List(values))
            };
            return Ok(Node::Set {
                targets,
                value: value.map(Box::new),
                body: Vec::new(),
            });
        }
        self.expect_block_end()?;
        let (body, _) = self.parse_body(&["endset"])?;
        self.expect_block_end()?;
        Ok(Node::Set {
            targets,
            value: None,
            body,
        })
    }

    fn parse_include_options(&mut self) -> Result<IncludeOptions> {
        let mut options = IncludeOptions {
            variables: None,
            with_context: true,
            ignore_missing: false,
        };
        loop {
            if self.eat_name("ignore") {
                if !self.eat_name("missing") {
                    return Err(self.error("expected 'missing' after 'ignore'"));
                }
                options.ignore_missing = true;
            } else if self.eat_name("with") {
                if !self.eat_name("context") {
                    options.variables = Some(self.parse_expr()?);
                }
            } else if self.eat_name("without") {
                self.eat_name("context");
                options.with_context = false;
            } else if self.eat_name("only") {
                options.with_context = false;
            } else {
                return Ok(options);
            }
        }
    }

    fn parse_import(&mut self) -> Result<Node> {
        let template = self.parse_expr()?;
        if !self.eat_name("as") {
            return Err(self.error("expected 'as' in import tag"));
        }
        let alias = self.expect_name()?;
        self.skip_context_clause();
        self.expect_block_end()?;
        self.macro_namespaces.insert(alias.clone());
        Ok(Node::Import {
            template: Box::new(template),
            alias: Some(alias),
            names: Vec::new(),
        })
    }

    fn parse_from(&mut self) -> Result<Node> {
        let template = self.parse_expr()?;
        if !self.eat_name("import") {
            return Err(self.error("expected 'import' in from tag"));
        }
        let mut names = Vec::new();
        loop {
            let name = self.expect_name()?;
            let alias = if self.eat_name("as") {
                Some(self.expect_name()?)
            } else {
                None
            };
            self.imported_macros
                .insert(alias.clone().unwrap_or_else(|| name.clone()));
            names.push((name, alias));
            if !self.eat_punct(",") {
                break;
            }
        }
        self.skip_context_clause();
        self.expect_block_end()?;
        Ok(Node::Import {
            template: Box::new(template),
            alias: None,
            names,
        })
    }

    fn skip_context_clause(&mut self) {
        if self.eat_name("with") || self.eat_name("without") {
            self.eat_name("context");
        }
    }

    fn parse_container(&mut self, tag: &str) -> Result<Node> {
        let mut args = Vec::new();
        if matches!(tag, "apply" | "filter") && matches!(self.peek(), Token::Name(_)) {
            let mut chain = self.parse_filter_segment(None)?;
            while self.eat_punct("|") {
                chain = self.parse_filter_segment(Some(Box::new(chain)))?;
            }
            args.push(chain);
        }
        loop {
            match self.peek() {
                Token::BlockEnd | Token::Eof => break,
                Token::Punct(",") => self.pos += 1,
                Token::Name(n) if n == "only" => self.pos += 1,
                _ => args.push(self.parse_expr()?),
            }
        }
        self.expect_block_end()?;
        let body = if PAIRED_TAGS.contains(&tag) {
            let end = format!("end{tag}");
            let (body, _) = self.parse_body(&[end.as_str()])?;
            self.skip_optional_name();
            self.expect_block_end()?;
            body
        } else {
            Vec::new()
        };
        Ok(Node::Container {
            tag: tag.to_string(),
            args,
            body,
        })
    }

    // -- expressions --------------------------------------------------------

    pub(crate) fn parse_expr(&mut self) -> Result<Node> {
        let line = self.line();
        let expr = self.nested(|g| g.parse_conditional())?;
        if height(&expr) > MAX_HEIGHT {
            return Err(Error::parse(self.path, line, "expression nested too deeply"));
        }
        Ok(expr)
    }

    fn parse_conditional(&mut self) -> Result<Node> {
        let mut expr = self.parse_coalesce()?;
        let mut links = 0;
        loop {
            if self.eat_punct("?:") {
                self.link(&mut links)?;
                let otherwise = self.parse_expr()?;
                expr = Node::Conditional {
                    test: Box::new(expr),
                    then: None,
                    otherwise: Some(Box::new(otherwise)),
                };
            } else if self.eat_punct("?") {
                self.link(&mut links)?;
                let then = self.parse_expr()?;
                let otherwise = if self.eat_punct(":") {
                    Some(Box::new(self.parse_expr()?))
                } else {
                    None
                };
                expr = Node::Conditional {
                    test: Box::new(expr),
                    then: Some(Box::new(then)),
                    otherwise,
                };
            } else if self.inline_if && self.is_name("if") {
                self.pos += 1;
                self.link(&mut links)?;
                let test = self.parse_coalesce()?;
                let otherwise = if self.eat_name("else") {
                    Some(Box::new(self.parse_expr()?))
                } else {
                    None
                };
                expr = Node::Conditional {
                    test: Box::new(test),
                    then: Some(Box::new(expr)),
                    otherwise,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_coalesce(&mut self) -> Result<Node> {
        let mut left = self.parse_or()?;
        let mut links = 0;
        while self.eat_punct("??") {
            self.link(&mut links)?;
            let right = self.parse_or()?;
            left = binary("??", left, right);
        }
        Ok(left)
    }

    fn parse_or(&mut self) -> Result<Node> {
        let mut left = self.parse_and()?;
        let mut links = 0;
        while self.eat_name("or") {
            self.link(&mut links)?;
            let right = self.parse_and()?;
            left = Node::Logical {
                op: LogicalOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Node> {
        let mut left = self.parse_not()?;
        let mut links = 0;
        while self.eat_name("and") {
            self.link(&mut links)?;
            let right = self.parse_not()?;
            left = Node::Logical {
                op: LogicalOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Node> {
        if self.eat_name("not") {
            let operand = self.nested(|g| g.parse_not())?;
            return Ok(Node::Unary {
                op: "not".to_string(),
                operand: Box::new(operand),
            });
        }
        self.parse_compare()
    }

    fn parse_compare(&mut self) -> Result<Node> {
        let mut left = self.parse_range()?;
        let mut links = 0;
        loop {
            if self.eat_name("is") {
                self.link(&mut links)?;
                left = self.parse_test(left)?;
            } else if let Some(op) = self.eat_compare_op() {
                self.link(&mut links)?;
                let right = self.parse_range()?;
                left = binary(op, left, right);
            } else {
                return Ok(left);
            }
        }
    }

    fn eat_compare_op(&mut self) -> Option<&'static str> {
        let (op, width) = match (self.peek(), self.peek_at(1)) {
            (Token::Punct(p), _) => match *p {
                "==" => ("==", 1),
                "!=" => ("!=", 1),
                "<" => ("<", 1),
                ">" => (">", 1),
                "<=" => ("<=", 1),
                ">=" => (">=", 1),
                _ => return None,
            },
            (Token::Name(a), Token::Name(b)) if a == "not" && b == "in" => ("not in", 2),
            (Token::Name(a), Token::Name(b)) if a == "starts" && b == "with" => ("starts with", 2),
            (Token::Name(a), Token::Name(b)) if a == "ends" && b == "with" => ("ends with", 2),
            (Token::Name(a), _) if a == "in" => ("in", 1),
            (Token::Name(a), _) if a == "matches" => ("matches", 1),
            _ => return None,
        };
        self.pos += width;
        Some(op)
    }

    fn parse_test(&mut self, target: Node) -> Result<Node> {
        let negated = self.eat_name("not");
        let mut name = self.expect_name()?;
        let joined = match self.peek() {
            Token::Name(next)
                if (name == "divisible" && next == "by") || (name == "same" && next == "as") =>
            {
                Some(next.clone())
            }
            _ => None,
        };
        if let Some(next) = joined {
            self.pos += 1;
            name = format!("{name} {next}");
        }
        let args = if self.is_punct("(") {
            self.parse_call_args()?
        } else {
            Vec::new()
        };
        Ok(Node::TestExpr {
            name,
            target: Box::new(target),
            args,
            negated,
        })
    }

    fn parse_range(&mut self) -> Result<Node> {
        let left = self.parse_concat()?;
        if self.eat_punct("..") {
            let right = self.parse_concat()?;
            return Ok(binary("..", left, right));
        }
        Ok(left)
    }

    fn parse_concat(&mut self) -> Result<Node> {
        let mut left = self.parse_additive()?;
        let mut links = 0;
        while self.eat_punct("~") {
            self.link(&mut links)?;
            let right = self.parse_additive()?;
            left = binary("~", left, right);
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Node> {
        let mut left = self.parse_multiplicative()?;
        let mut links = 0;
        loop {
            let op = if self.eat_punct("+") {
                "+"
            } else if self.eat_punct("-") {
                "-"
            } else {
                return Ok(left);
            };
            self.link(&mut links)?;
            let right = self.parse_multiplicative()?;
            left = binary(op, left, right);
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Node> {
        let mut left = self.parse_power()?;
        let mut links = 0;
        loop {
            let op = ["*", "//", "/", "%"]
                .into_iter()
                .find(|op| self.is_punct(op));
            let Some(op) = op else {
                return Ok(left);
            };
            self.pos += 1;
            self.link(&mut links)?;
            let right = self.parse_power()?;
            left = binary(op, left, right);
        }
    }

    fn parse_power(&mut self) -> Result<Node> {
        let mut left = self.parse_unary()?;
        let mut links = 0;
        while self.eat_punct("**") {
            self.link(&mut links)?;
            let right = self.parse_unary()?;
            left = binary("**", left, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Node> {
        for op in ["-", "+"] {
            if self.eat_punct(op) {
                let operand = self.nested(|g| g.parse_unary())?;
                return Ok(Node::Unary {
                    op: op.to_string(),
                    operand: Box::new(operand),
                });
            }
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Node> {
        let mut node = self.parse_primary()?;
        let mut links = 0;
        loop {
            if [".", "[", "|"].iter().any(|p| self.is_punct(p)) {
                self.link(&mut links)?;
            }
            if self.eat_punct(".") {
                let name = match self.next() {
                    Token::Name(name) => name,
                    Token::Number(n) => format_number(n),
                    other => {
                        return Err(self.error(format!(
                            "expected attribute name, found {}",
                            describe(&other)
                        )))
                    }
                };
                let args = if self.is_punct("(") {
                    Some(self.parse_call_args()?)
                } else {
                    None
                };
                node = match (node, args) {
                    (Node::NameRef(namespace), Some(args))
                        if self.macro_namespaces.contains(&namespace) =>
                    {
                        Node::MacroCall {
                            namespace: Some(namespace),
                            name,
                            args,
                        }
                    }
                    (object, args) => Node::Attribute {
                        object: Box::new(object),
                        name,
                        args,
                    },
                };
            } else if self.eat_punct("[") {
                let index = self.with_inline_if(true, |g| g.parse_slice())?;
                self.expect_punct("]")?;
                node = Node::Subscript {
                    object: Box::new(node),
                    index: Box::new(index),
                };
            } else if self.eat_punct("|") {
                node = self.parse_filter_segment(Some(Box::new(node)))?;
            } else {
                return Ok(node);
            }
        }
    }

    fn parse_slice(&mut self) -> Result<Node> {
        let start = if self.is_punct(":") {
            Node::Literal(Literal::Null)
        } else {
            self.parse_expr()?
        };
        if !self.eat_punct(":") {
            return Ok(start);
        }
        let end = if self.is_punct("]") {
            Node::Literal(Literal::Null)
        } else {
            self.parse_expr()?
        };
        Ok(binary(":", start, end))
    }

    fn parse_filter_segment(&mut self, target: Option<Box<Node>>) -> Result<Node> {
        let name = self.expect_name()?;
        let args = if self.is_punct("(") {
            self.parse_call_args()?
        } else {
            Vec::new()
        };
        Ok(Node::FilterCall { name, target, args })
    }

    fn parse_call_args(&mut self) -> Result<Vec<Node>> {
        self.expect_punct("(")?;
        self.with_inline_if(true, |g| {
            let mut args = Vec::new();
            while !g.eat_punct(")") {
                let named = matches!(g.peek(), Token::Name(_))
                    && matches!(g.peek_at(1), Token::Punct("=") | Token::Punct(":"));
                if named {
                    g.pos += 2;
                }
                args.push(g.parse_expr()?);
                if !g.eat_punct(",") {
                    g.expect_punct(")")?;
                    break;
                }
            }
            Ok(args)
        })
    }

    fn parse_primary(&mut self) -> Result<Node> {
        let line = self.line();
        match self.next() {
            Token::Number(n) => Ok(Node::Literal(Literal::Number(n))),
            Token::Str(s) => Ok(Node::Literal(Literal::Str(s))),
            Token::Name(name) => {
                let constant = match name.as_str() {
                    "true" | "True" => Some(Literal::Bool(true)),
                    "false" | "False" => Some(Literal::Bool(false)),
                    "null" | "none" | "None" => Some(Literal::Null),
                    _ => None,
                };
                if let Some(constant) = constant {
                    return Ok(Node::Literal(constant));
                }
                if !self.is_punct("(") {
                    return Ok(Node::NameRef(name));
                }
                let args = self.parse_call_args()?;
                if self.imported_macros.contains(&name) {
                    Ok(Node::MacroCall {
                        namespace: None,
                        name,
                        args,
                    })
                } else {
                    Ok(Node::FunctionCall { name, args })
                }
            }
            Token::Punct("(") => {
                let expr = self.with_inline_if(true, |g| g.parse_expr())?;
                self.expect_punct(")")?;
                Ok(expr)
            }
            Token::Punct("[") => {
                let mut items = Vec::new();
                while !self.eat_punct("]") {
                    items.push(self.with_inline_if(true, |g| g.parse_expr())?);
                    if !self.eat_punct(",") {
                        self.expect_punct("]")?;
                        break;
                    }
                }
                Ok(Node::List(items))
            }
            Token::Punct("{") => self.parse_hash(),
            other => Err(Error::parse(
                self.path,
                line,
                format!("unexpected {} in expression", describe(&other)),
            )),
        }
    }

    fn parse_hash(&mut self) -> Result<Node> {
        let mut pairs = Vec::new();
        while !self.eat_punct("}") {
            let (key, shorthand) = match self.next() {
                Token::Name(name) => (Node::str(&name), Some(name)),
                Token::Str(s) => (Node::Literal(Literal::Str(s)), None),
                Token::Number(n) => (Node::Literal(Literal::Number(n)), None),
                Token::Punct("(") => {
                    let key = self.parse_expr()?;
                    self.expect_punct(")")?;
                    (key, None)
                }
                other => {
                    return Err(self.error(format!("unexpected {} as hash key", describe(&other))))
                }
            };
            let value = if self.eat_punct(":") {
                self.with_inline_if(true, |g| g.parse_expr())?
            } else if let Some(name) = shorthand {
                Node::NameRef(name)
            } else {
                return Err(self.error("expected ':' after hash key"));
            };
            pairs.push((key, value));
            if !self.eat_punct(",") {
                self.expect_punct("}")?;
                break;
            }
        }
        Ok(Node::Hash(pairs))
    }
}

struct IncludeOptions {
    variables: Option<Node>,
    with_context: bool,
    ignore_missing: bool,
}

/// Height of `root`, walked without recursion.
fn height(root: &Node) -> usize {
    let mut tallest = 0;
    let mut stack = vec![(root, 1)];
    while let Some((node, level)) = stack.pop() {
        tallest = tallest.max(level);
        stack.extend(node.children().into_iter().map(|child| (child, level + 1)));
    }
    tallest
}

fn binary(op: &str, left: Node, right: Node) -> Node {
    Node::Binary {
        op: op.to_string(),
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn describe(token: &Token) -> String {
    match token {
        Token::Text(_) => "text".to_string(),
        Token::VarStart => "'{{'".to_string(),
        Token::VarEnd => "'}}'".to_string(),
        Token::BlockStart => "'{%'".to_string(),
        Token::BlockEnd => "'%}'".to_string(),
        Token::Name(name) => format!("name '{name}'"),
        Token::Str(s) => format!("string \"{s}\""),
        Token::Number(n) => format!("number {n}"),
        Token::Punct(p) => format!("'{p}'"),
        Token::Eof => "end of template".to_string(),
    }
}
