//! Line-level formatting and naming conventions.
//!
//! Unlike the tree collectors this works on raw source text, so it also
//! produces metrics for templates that fail to parse.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use unicode_width::UnicodeWidthStr;

use crate::core::metrics::{counts_value, strings_value};
use crate::core::MetricMap;
use crate::stats::round;

fn declared_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{%[-~]?\s*(?:block|macro|set)\s+([A-Za-z_][A-Za-z0-9_]*)")
            .expect("valid regex")
    })
}

/// Identifier case conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NamingPattern {
    SnakeCase,
    CamelCase,
    PascalCase,
    UpperCase,
    Lowercase,
    Other,
}

impl NamingPattern {
    pub const ALL: [NamingPattern; 6] = [
        NamingPattern::SnakeCase,
        NamingPattern::CamelCase,
        NamingPattern::PascalCase,
        NamingPattern::UpperCase,
        NamingPattern::Lowercase,
        NamingPattern::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NamingPattern::SnakeCase => "snake_case",
            NamingPattern::CamelCase => "camel_case",
            NamingPattern::PascalCase => "pascal_case",
            NamingPattern::UpperCase => "upper_case",
            NamingPattern::Lowercase => "lowercase",
            NamingPattern::Other => "other",
        }
    }

    /// Classify one identifier.
    pub fn classify(name: &str) -> Self {
        let trimmed = name.trim_start_matches('_');
        if trimmed.is_empty() {
            return NamingPattern::Other;
        }
        let has_lower = trimmed.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = trimmed.chars().any(|c| c.is_ascii_uppercase());
        let has_underscore = trimmed.contains('_');
        let first_upper = trimmed.starts_with(|c: char| c.is_ascii_uppercase());

        match (has_lower, has_upper, has_underscore) {
            (true, false, false) => NamingPattern::Lowercase,
            (true, false, true) => NamingPattern::SnakeCase,
            (false, true, _) => NamingPattern::UpperCase,
            (true, true, false) if first_upper => NamingPattern::PascalCase,
            (true, true, false) => NamingPattern::CamelCase,
            _ => NamingPattern::Other,
        }
    }
}

/// Indentation of a single line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Indent {
    None,
    Tabs,
    Spaces,
    Mixed,
}

fn indent_of(line: &str) -> Indent {
    let leading: String = line.chars().take_while(|c| *c == ' ' || *c == '\t').collect();
    if leading.len() == line.len() {
        // whitespace-only lines carry no indentation signal
        return Indent::None;
    }
    match (leading.contains('\t'), leading.contains(' ')) {
        (false, false) => Indent::None,
        (true, false) => Indent::Tabs,
        (false, true) => Indent::Spaces,
        (true, true) => Indent::Mixed,
    }
}

/// Source-text scanner for formatting metrics.
#[derive(Debug, Clone, Copy)]
pub struct StyleScanner {
    max_line_length: usize,
}

impl Default for StyleScanner {
    fn default() -> Self {
        Self::new(120)
    }
}

impl StyleScanner {
    pub fn new(max_line_length: usize) -> Self {
        Self { max_line_length }
    }

    pub fn scan(&self, source: &str) -> MetricMap {
        let mut lines = 0usize;
        let mut blank = 0usize;
        let mut comment = 0usize;
        let mut widths: Vec<usize> = Vec::new();
        let mut long_lines = 0usize;
        let mut trailing = 0usize;
        let mut tabs = 0usize;
        let mut spaces = 0usize;
        let mut mixed = 0usize;
        let mut in_comment = false;

        for line in source.lines() {
            lines += 1;
            let width = line.width();
            widths.push(width);
            if width > self.max_line_length {
                long_lines += 1;
            }
            if line.ends_with([' ', '\t']) {
                trailing += 1;
            }
            match indent_of(line) {
                Indent::Tabs => tabs += 1,
                Indent::Spaces => spaces += 1,
                Indent::Mixed => mixed += 1,
                Indent::None => {}
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                if in_comment {
                    comment += 1;
                } else {
                    blank += 1;
                }
                continue;
            }
            if in_comment || trimmed.starts_with("{#") {
                comment += 1;
            }
            in_comment = comment_open_after(line, in_comment);
        }

        let code_lines = lines - blank - comment;
        let avg = if widths.is_empty() {
            0.0
        } else {
            widths.iter().sum::<usize>() as f64 / widths.len() as f64
        };
        let indentation_style = if mixed > 0 || (tabs > 0 && spaces > 0) {
            "mixed"
        } else if tabs > 0 {
            "tabs"
        } else if spaces > 0 {
            "spaces"
        } else {
            "none"
        };

        let names: Vec<String> = declared_name_pattern()
            .captures_iter(source)
            .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
            .collect();
        let naming = NamingSummary::from_names(&names);

        MetricMap::new()
            .with("lines", lines)
            .with("code_lines", code_lines)
            .with("blank_lines", blank)
            .with("comment_lines", comment)
            .with("chars", source.chars().count())
            .with("avg_line_length", round(avg, 2))
            .with("max_line_length", widths.iter().copied().max().unwrap_or(0))
            .with("long_lines", long_lines)
            .with("trailing_whitespace_lines", trailing)
            .with("tab_indented_lines", tabs)
            .with("space_indented_lines", spaces)
            .with("mixed_indentation_lines", mixed)
            .with("indentation_style", indentation_style)
            .with("declared_names", strings_value(&names))
            .with("naming_patterns", counts_value(&naming.counts))
            .with("dominant_naming_pattern", naming.dominant)
            .with("naming_consistency", round(naming.consistency, 2))
    }
}

/// Whether a `{# ... #}` comment is still open at the end of `line`.
fn comment_open_after(line: &str, mut open: bool) -> bool {
    let mut rest = line;
    loop {
        if open {
            match rest.find("#}") {
                Some(i) => {
                    open = false;
                    rest = &rest[i + 2..];
                }
                None => return true,
            }
        } else {
            match rest.find("{#") {
                Some(i) => {
                    open = true;
                    rest = &rest[i + 2..];
                }
                None => return false,
            }
        }
    }
}

struct NamingSummary {
    counts: BTreeMap<String, usize>,
    dominant: &'static str,
    consistency: f64,
}

impl NamingSummary {
    /// `lowercase` names are compatible with both snake and camel case, so
    /// they count toward either when it dominates.
    fn from_names(names: &[String]) -> Self {
        let mut by_pattern: BTreeMap<NamingPattern, usize> = BTreeMap::new();
        for name in names {
            *by_pattern.entry(NamingPattern::classify(name)).or_insert(0) += 1;
        }
        let counts = by_pattern
            .iter()
            .map(|(p, c)| (p.as_str().to_string(), *c))
            .collect();

        if names.is_empty() {
            return Self {
                counts,
                dominant: "none",
                consistency: 100.0,
            };
        }

        let mut dominant = NamingPattern::Lowercase;
        let mut best = 0usize;
        for pattern in NamingPattern::ALL {
            if pattern == NamingPattern::Lowercase {
                continue;
            }
            let count = by_pattern.get(&pattern).copied().unwrap_or(0);
            if count > best {
                best = count;
                dominant = pattern;
            }
        }

        let lowercase = by_pattern
            .get(&NamingPattern::Lowercase)
            .copied()
            .unwrap_or(0);
        let consistent = match dominant {
            NamingPattern::Lowercase => lowercase,
            NamingPattern::SnakeCase | NamingPattern::CamelCase => best + lowercase,
            _ => best,
        };

        Self {
            counts,
            dominant: dominant.as_str(),
            consistency: consistent as f64 / names.len() as f64 * 100.0,
        }
    }
}
