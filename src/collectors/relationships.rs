//! Inheritance and inclusion relationships of a template.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::Collector;
use crate::analyzers::graph::{inheritance_depth, ParentResolver};
use crate::core::metrics::strings_value;
use crate::core::MetricMap;
use crate::parser::Node;
use crate::stats::diversity::top_n;

/// How a template refers to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    Extends,
    Includes,
    IncludesFunction,
    Embeds,
    Imports,
}

impl RelationKind {
    pub const ALL: [RelationKind; 5] = [
        RelationKind::Extends,
        RelationKind::Includes,
        RelationKind::IncludesFunction,
        RelationKind::Embeds,
        RelationKind::Imports,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::Extends => "extends",
            RelationKind::Includes => "includes",
            RelationKind::IncludesFunction => "includes_function",
            RelationKind::Embeds => "embeds",
            RelationKind::Imports => "imports",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }
}

/// One literal reference from `source` to `target`.
///
/// The target is kept as written and need not name an analyzed template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
    pub source: String,
    pub target: String,
    pub kind: RelationKind,
    pub metadata: Map<String, Value>,
}

impl Dependency {
    /// Metric-map encoding (`{type, template, metadata}`); the source is implied.
    pub fn to_value(&self) -> Value {
        json!({
            "type": self.kind.as_str(),
            "template": self.target,
            "metadata": self.metadata,
        })
    }

    /// Decode an entry of a template's `dependencies` metric.
    pub fn from_value(source: &str, value: &Value) -> Option<Self> {
        let kind = RelationKind::parse(value.get("type")?.as_str()?)?;
        let target = value.get("template")?.as_str()?.to_string();
        let metadata = value
            .get("metadata")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        Some(Self {
            source: source.to_string(),
            target,
            kind,
            metadata,
        })
    }

    /// Read every dependency recorded in a metric map.
    pub fn all_from_metrics(source: &str, metrics: &MetricMap) -> Vec<Self> {
        metrics
            .list("dependencies")
            .iter()
            .filter_map(|v| Self::from_value(source, v))
            .collect()
    }
}

/// Collects extends/include/embed/import targets and block usage.
///
/// Only string-literal targets are recorded.
pub struct RelationshipsCollector<'a> {
    path: String,
    resolver: Option<&'a dyn ParentResolver>,
    extends: Option<String>,
    dependencies: Vec<Dependency>,
    provided_blocks: BTreeSet<String>,
    used_blocks: BTreeSet<String>,
}

impl<'a> RelationshipsCollector<'a> {
    pub fn new(path: &str, resolver: Option<&'a dyn ParentResolver>) -> Self {
        Self {
            path: path.to_string(),
            resolver,
            extends: None,
            dependencies: Vec::new(),
            provided_blocks: BTreeSet::new(),
            used_blocks: BTreeSet::new(),
        }
    }

    fn record(&mut self, kind: RelationKind, target: &Node, metadata: Map<String, Value>) {
        let Some(target) = target.as_str_literal() else {
            return;
        };
        self.dependencies.push(Dependency {
            source: self.path.clone(),
            target: target.to_string(),
            kind,
            metadata,
        });
    }

    fn targets(&self, kinds: &[RelationKind]) -> Vec<String> {
        self.dependencies
            .iter()
            .filter(|d| kinds.contains(&d.kind))
            .map(|d| d.target.clone())
            .collect()
    }

    fn top_references(&self) -> Value {
        let mut out = Map::new();
        for kind in RelationKind::ALL {
            let mut counts: BTreeMap<String, usize> = BTreeMap::new();
            for dep in self.dependencies.iter().filter(|d| d.kind == kind) {
                *counts.entry(dep.target.clone()).or_insert(0) += 1;
            }
            if counts.is_empty() {
                continue;
            }
            let top: Vec<Value> = top_n(&counts, 5)
                .into_iter()
                .map(|(template, count)| json!({ "template": template, "count": count }))
                .collect();
            out.insert(kind.as_str().to_string(), Value::Array(top));
        }
        Value::Object(out)
    }

    fn inheritance_depth(&self) -> usize {
        match self.resolver {
            Some(resolver) => inheritance_depth(&self.path, resolver),
            None => usize::from(self.extends.is_some()),
        }
    }
}

fn include_metadata(
    variables: &Option<Box<Node>>,
    with_context: bool,
    ignore_missing: bool,
) -> Map<String, Value> {
    let mut metadata = Map::new();
    metadata.insert("with_context".into(), Value::Bool(with_context));
    metadata.insert("ignore_missing".into(), Value::Bool(ignore_missing));
    metadata.insert("has_variables".into(), Value::Bool(variables.is_some()));
    metadata
}

impl Collector for RelationshipsCollector<'_> {
    fn name(&self) -> &'static str {
        "relationships"
    }

    fn enter_node(&mut self, node: &Node) {
        match node {
            Node::Extends { template } => {
                if self.extends.is_none() {
                    self.extends = template.as_str_literal().map(str::to_string);
                }
                self.record(RelationKind::Extends, template, Map::new());
            }
            Node::Include {
                template,
                variables,
                with_context,
                ignore_missing,
            } => {
                let metadata = include_metadata(variables, *with_context, *ignore_missing);
                self.record(RelationKind::Includes, template, metadata);
            }
            Node::Embed {
                template,
                variables,
                with_context,
                ignore_missing,
                ..
            } => {
                let metadata = include_metadata(variables, *with_context, *ignore_missing);
                self.record(RelationKind::Embeds, template, metadata);
            }
            Node::Import {
                template,
                alias,
                names,
            } => {
                let mut metadata = Map::new();
                if let Some(alias) = alias {
                    metadata.insert("alias".into(), Value::from(alias.as_str()));
                }
                if !names.is_empty() {
                    let imported: Vec<Value> =
                        names.iter().map(|(n, _)| Value::from(n.as_str())).collect();
                    metadata.insert("names".into(), Value::Array(imported));
                }
                self.record(RelationKind::Imports, template, metadata);
            }
            Node::FunctionCall { name, args } if name == "include" => {
                if let Some(first) = args.first() {
                    self.record(RelationKind::IncludesFunction, first, Map::new());
                }
            }
            Node::FunctionCall { name, args } if name == "block" => {
                if let Some(block) = args.first().and_then(Node::as_str_literal) {
                    self.used_blocks.insert(block.to_string());
                }
            }
            Node::Block { name, .. } => {
                self.provided_blocks.insert(name.clone());
            }
            _ => {}
        }
    }

    fn leave_node(&mut self, _node: &Node) {}

    fn data(&self) -> MetricMap {
        let dependencies: Vec<Value> = self.dependencies.iter().map(Dependency::to_value).collect();
        MetricMap::new()
            .with("extends", self.extends.clone().unwrap_or_default())
            .with("dependencies", Value::Array(dependencies))
            .with(
                "includes",
                self.targets(&[RelationKind::Includes, RelationKind::IncludesFunction]),
            )
            .with("embeds", self.targets(&[RelationKind::Embeds]))
            .with("imports", self.targets(&[RelationKind::Imports]))
            .with("dependency_count", self.dependencies.len())
            .with("provided_blocks", strings_value(&self.provided_blocks))
            .with("used_blocks", strings_value(&self.used_blocks))
            .with("inheritance_depth", self.inheritance_depth())
            .with("top_references", self.top_references())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::collectors::Traverser;
    use crate::parser::{Parser, TemplateParser};

    fn collect(source: &str, resolver: Option<&dyn ParentResolver>) -> MetricMap {
        let root = Parser::new().parse("pages/home.twig", source).unwrap();
        let mut traverser =
            Traverser::new().register(RelationshipsCollector::new("pages/home.twig", resolver));
        traverser.traverse(&root);
        traverser.data()
    }

    #[test]
    fn test_literal_targets() {
        let data = collect(
            "{% extends 'base.twig' %}\
             {% block content %}{% include 'nav.twig' only %}{{ include('footer.twig') }}\
             {% embed 'card.twig' %}{% endembed %}{% endblock %}\
             {% import 'forms.twig' as forms %}{% from 'ui.twig' import button %}",
            None,
        );
        assert_eq!(data.string("extends"), "base.twig");
        assert_eq!(data.strings("includes"), vec!["nav.twig", "footer.twig"]);
        assert_eq!(data.strings("embeds"), vec!["card.twig"]);
        assert_eq!(data.strings("imports"), vec!["forms.twig", "ui.twig"]);
        assert_eq!(data.count("dependency_count"), 6);
        assert_eq!(data.strings("provided_blocks"), vec!["content"]);
        assert_eq!(data.count("inheritance_depth"), 1);

        let deps = Dependency::all_from_metrics("pages/home.twig", &data);
        assert_eq!(deps.len(), 6);
        assert_eq!(deps[0].kind, RelationKind::Extends);
        assert_eq!(deps[2].kind, RelationKind::IncludesFunction);
        assert_eq!(deps[1].metadata.get("with_context"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_dynamic_targets_are_skipped() {
        let data = collect("{% extends layout %}{% include 'row_' ~ type ~ '.twig' %}", None);
        assert_eq!(data.string("extends"), "");
        assert_eq!(data.count("dependency_count"), 0);
        assert_eq!(data.count("inheritance_depth"), 0);
    }

    #[test]
    fn test_used_blocks() {
        let data = collect("{% block sidebar %}{{ block('title') }}{% endblock %}", None);
        assert_eq!(data.strings("used_blocks"), vec!["title"]);
        assert_eq!(data.strings("provided_blocks"), vec!["sidebar"]);
    }

    #[test]
    fn test_top_references() {
        let data = collect(
            "{% include 'a.twig' %}{% include 'b.twig' %}{% include 'a.twig' %}",
            None,
        );
        let top = data.object("top_references").unwrap();
        let includes = top["includes"].as_array().unwrap();
        assert_eq!(includes[0]["template"], "a.twig");
        assert_eq!(includes[0]["count"], 2);
        assert!(!top.contains_key("extends"));
    }

    #[test]
    fn test_depth_through_resolver() {
        let parents: HashMap<String, String> = [
            ("pages/home.twig", "layouts/page.twig"),
            ("layouts/page.twig", "base.twig"),
        ]
        .iter()
        .map(|(a, b)| (a.to_string(), b.to_string()))
        .collect();
        let data = collect("{% extends 'layouts/page.twig' %}", Some(&parents));
        assert_eq!(data.count("inheritance_depth"), 2);
    }
}
