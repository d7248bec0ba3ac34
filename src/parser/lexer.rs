//! Tokenizer for Twig/Jinja-style template source.

use std::sync::OnceLock;

use regex::Regex;

use crate::core::{Error, Result};

/// Token kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Text(String),
    VarStart,
    VarEnd,
    BlockStart,
    BlockEnd,
    Name(String),
    Str(String),
    Number(f64),
    Punct(&'static str),
    Eof,
}

/// Token with its 1-based source line.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub line: u32,
}

/// Operators and punctuation, longest first.
const PUNCTUATION: &[&str] = &[
    "??", "?:", "==", "!=", "<=", ">=", "..", "//", "**", "+", "-", "*", "/", "%", "~", "<", ">",
    "=", "|", ".", ",", ":", "?", "(", ")", "[", "]", "{", "}",
];

fn raw_end_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{%[-~]?\s*end(verbatim|raw)\s*[-~]?%\}").expect("valid regex")
    })
}

#[derive(Clone, Copy, PartialEq)]
enum Trim {
    None,
    All,
    Line,
}

/// Tokenize a template.
pub fn tokenize(path: &str, source: &str) -> Result<Vec<Spanned>> {
    Lexer::new(path, source).run()
}

struct Lexer<'a> {
    path: &'a str,
    src: &'a str,
    pos: usize,
    line: u32,
    tokens: Vec<Spanned>,
    trim_next: Trim,
}

impl<'a> Lexer<'a> {
    fn new(path: &'a str, src: &'a str) -> Self {
        Self {
            path,
            src,
            pos: 0,
            line: 1,
            tokens: Vec::new(),
            trim_next: Trim::None,
        }
    }

    fn run(mut self) -> Result<Vec<Spanned>> {
        let src = self.src;
        while self.pos < src.len() {
            let rest = &src[self.pos..];
            match find_open(rest) {
                Some((offset, kind)) => {
                    let control = rest[offset + 2..].chars().next();
                    let trim_before = match control {
                        Some('-') => Trim::All,
                        Some('~') => Trim::Line,
                        _ => Trim::None,
                    };
                    self.push_text(&rest[..offset], trim_before);
                    self.advance(offset + 2);
                    if trim_before != Trim::None {
                        self.advance(1);
                    }
                    match kind {
                        '#' => self.lex_comment()?,
                        '{' => {
                            self.emit(Token::VarStart);
                            self.lex_expression("}}", Token::VarEnd)?;
                        }
                        _ => {
                            self.emit(Token::BlockStart);
                            self.lex_expression("%}", Token::BlockEnd)?;
                            self.lex_raw_section()?;
                        }
                    }
                }
                None => {
                    self.push_text(rest, Trim::None);
                    self.pos = src.len();
                }
            }
        }
        self.emit(Token::Eof);
        Ok(self.tokens)
    }

    fn emit(&mut self, token: Token) {
        self.tokens.push(Spanned {
            token,
            line: self.line,
        });
    }

    fn advance(&mut self, bytes: usize) {
        let end = (self.pos + bytes).min(self.src.len());
        self.line += self.src[self.pos..end].matches('\n').count() as u32;
        self.pos = end;
    }

    fn push_text(&mut self, text: &str, trim_after: Trim) {
        let mut text = text;
        text = match self.trim_next {
            Trim::All => text.trim_start(),
            Trim::Line => text.trim_start_matches([' ', '\t']),
            Trim::None => text,
        };
        text = match trim_after {
            Trim::All => text.trim_end(),
            Trim::Line => text.trim_end_matches([' ', '\t']),
            Trim::None => text,
        };
        self.trim_next = Trim::None;
        if !text.is_empty() {
            self.emit(Token::Text(text.to_string()));
        }
    }

    fn lex_comment(&mut self) -> Result<()> {
        let src = self.src;
        let rest = &src[self.pos..];
        let Some(end) = rest.find("#}") else {
            return Err(Error::parse(self.path, self.line, "unclosed comment"));
        };
        self.trim_next = match rest[..end].chars().last() {
            Some('-') => Trim::All,
            Some('~') => Trim::Line,
            _ => Trim::None,
        };
        self.advance(end + 2);
        Ok(())
    }

    /// Tokenize an expression until the closing delimiter at bracket depth 0.
    fn lex_expression(&mut self, close: &str, end: Token) -> Result<()> {
        let src = self.src;
        let mut depth = 0usize;
        loop {
            let rest = &src[self.pos..];
            let trimmed = rest.trim_start();
            self.advance(rest.len() - trimmed.len());
            let rest = &src[self.pos..];
            if rest.is_empty() {
                let what = if close == "}}" { "output" } else { "tag" };
                return Err(Error::parse(
                    self.path,
                    self.line,
                    format!("unclosed {what} delimiter"),
                ));
            }

            if depth == 0 {
                for (marker, trim) in [("-", Trim::All), ("~", Trim::Line), ("", Trim::None)] {
                    if rest.starts_with(marker) && rest[marker.len()..].starts_with(close) {
                        self.emit(end.clone());
                        self.advance(marker.len() + close.len());
                        self.trim_next = trim;
                        return Ok(());
                    }
                }
            }

            let c = rest.chars().next().unwrap_or(' ');
            if c == '"' || c == '\'' {
                self.lex_string(c)?;
            } else if c.is_ascii_digit() {
                let len = rest
                    .find(|ch: char| !(ch.is_ascii_digit() || ch == '_'))
                    .unwrap_or(rest.len());
                let mut len = len;
                if rest[len..].starts_with('.')
                    && rest[len + 1..].starts_with(|ch: char| ch.is_ascii_digit())
                {
                    len += 1 + rest[len + 1..]
                        .find(|ch: char| !ch.is_ascii_digit())
                        .unwrap_or(rest.len() - len - 1);
                }
                let value: f64 = rest[..len].replace('_', "").parse().unwrap_or(0.0);
                self.emit(Token::Number(value));
                self.advance(len);
            } else if c.is_alphabetic() || c == '_' {
                let len = rest
                    .find(|ch: char| !(ch.is_alphanumeric() || ch == '_'))
                    .unwrap_or(rest.len());
                self.emit(Token::Name(rest[..len].to_string()));
                self.advance(len);
            } else if let Some(punct) = PUNCTUATION.iter().find(|p| rest.starts_with(**p)) {
                match *punct {
                    "(" | "[" | "{" => depth += 1,
                    ")" | "]" | "}" => depth = depth.saturating_sub(1),
                    _ => {}
                }
                self.emit(Token::Punct(*punct));
                self.advance(punct.len());
            } else {
                return Err(Error::parse(
                    self.path,
                    self.line,
                    format!("unexpected character '{c}'"),
                ));
            }
        }
    }

    fn lex_string(&mut self, quote: char) -> Result<()> {
        let src = self.src;
        let start_line = self.line;
        let body = &src[self.pos + 1..];
        let mut value = String::new();
        let mut escaped = false;
        let mut consumed = None;
        for (i, ch) in body.char_indices() {
            if escaped {
                value.push(ch);
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == quote {
                consumed = Some(i + ch.len_utf8());
                break;
            } else {
                value.push(ch);
            }
        }
        let Some(consumed) = consumed else {
            return Err(Error::parse(self.path, start_line, "unterminated string"));
        };
        self.tokens.push(Spanned {
            token: Token::Str(value),
            line: start_line,
        });
        self.advance(1 + consumed);
        Ok(())
    }

    /// After `{% verbatim %}` / `{% raw %}`, swallow everything up to the end tag as text.
    fn lex_raw_section(&mut self) -> Result<()> {
        let n = self.tokens.len();
        if n < 3 {
            return Ok(());
        }
        let is_raw = matches!(
            (&self.tokens[n - 3].token, &self.tokens[n - 2].token),
            (Token::BlockStart, Token::Name(name)) if name == "verbatim" || name == "raw"
        );
        if !is_raw {
            return Ok(());
        }
        let line = self.tokens[n - 3].line;
        self.tokens.truncate(n - 3);
        let src = self.src;
        let rest = &src[self.pos..];
        let Some(found) = raw_end_pattern().find(rest) else {
            return Err(Error::parse(self.path, line, "unclosed verbatim section"));
        };
        let text = rest[..found.start()].to_string();
        let consumed = found.end();
        self.push_text(&text, Trim::None);
        self.advance(consumed);
        Ok(())
    }
}

/// Find the next `{{`, `{%` or `{#` and return its offset and marker char.
fn find_open(s: &str) -> Option<(usize, char)> {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i + 1 < bytes.len() {
        if bytes[i] == b'{' {
            match bytes[i + 1] {
                b'{' => return Some((i, '{')),
                b'%' => return Some((i, '%')),
                b'#' => return Some((i, '#')),
                _ => {}
            }
        }
        i += 1;
    }
    None
}
