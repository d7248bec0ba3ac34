//! Function, filter, test and macro usage.

use std::collections::BTreeMap;

use super::Collector;
use crate::core::metrics::counts_value;
use crate::core::MetricMap;
use crate::parser::Node;

type Multiset = BTreeMap<String, usize>;

#[derive(Debug, Clone, Default)]
pub struct CallablesCollector {
    functions: Multiset,
    filters: Multiset,
    tests: Multiset,
    macro_calls: Multiset,
    macro_definitions: Multiset,
}

impl CallablesCollector {
    pub fn new() -> Self {
        Self::default()
    }
}

fn bump(set: &mut Multiset, name: &str) {
    *set.entry(name.to_string()).or_insert(0) += 1;
}

impl Collector for CallablesCollector {
    fn name(&self) -> &'static str {
        "callables"
    }

    fn enter_node(&mut self, node: &Node) {
        match node {
            Node::FunctionCall { name, .. } => bump(&mut self.functions, name),
            Node::FilterCall { name, .. } => bump(&mut self.filters, name),
            Node::TestExpr { name, .. } => bump(&mut self.tests, name),
            Node::MacroCall {
                namespace, name, ..
            } => match namespace {
                Some(ns) => bump(&mut self.macro_calls, &format!("{ns}.{name}")),
                None => bump(&mut self.macro_calls, name),
            },
            Node::Macro { name, .. } => bump(&mut self.macro_definitions, name),
            _ => {}
        }
    }

    fn leave_node(&mut self, _node: &Node) {}

    fn data(&self) -> MetricMap {
        MetricMap::new()
            .with("functions", counts_value(&self.functions))
            .with("filters", counts_value(&self.filters))
            .with("test_calls", counts_value(&self.tests))
            .with("macro_calls", counts_value(&self.macro_calls))
            .with("macro_definitions", counts_value(&self.macro_definitions))
            .with("total_function_calls", self.functions.values().sum::<usize>())
            .with("total_filter_calls", self.filters.values().sum::<usize>())
            .with("unique_functions", self.functions.len())
            .with("unique_filters", self.filters.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::Traverser;
    use crate::parser::{Parser, TemplateParser};

    fn collect(source: &str) -> MetricMap {
        let root = Parser::new().parse("t.twig", source).unwrap();
        let mut traverser = Traverser::new().register(CallablesCollector::new());
        traverser.traverse(&root);
        traverser.data()
    }

    #[test]
    fn test_multisets() {
        let data = collect(
            "{% import 'forms.twig' as forms %}\
             {{ title|upper|trim }}{{ name|upper }}{{ path('home') }}{{ path('about') }}\
             {{ x is defined ? x : '' }}{{ forms.input('q') }}\
             {% macro row(cells) %}{{ cells|join(', ') }}{% endmacro %}",
        );
        let filters = data.counts("filters");
        assert_eq!(filters.get("upper"), Some(&2));
        assert_eq!(filters.get("trim"), Some(&1));
        assert_eq!(filters.get("join"), Some(&1));
        assert_eq!(data.count("total_filter_calls"), 4);
        assert_eq!(data.count("unique_filters"), 3);
        assert_eq!(data.counts("functions").get("path"), Some(&2));
        assert_eq!(data.count("total_function_calls"), 2);
        assert_eq!(data.count("unique_functions"), 1);
        assert_eq!(data.counts("test_calls").get("defined"), Some(&1));
        assert_eq!(data.counts("macro_calls").get("forms.input"), Some(&1));
        assert_eq!(data.counts("macro_definitions").get("row"), Some(&1));
    }

    #[test]
    fn test_empty_template() {
        let data = collect("plain");
        assert_eq!(data.count("total_function_calls"), 0);
        assert!(data.counts("filters").is_empty());
    }

    #[test]
    fn test_apply_filters_are_counted() {
        let data = collect("{% apply spaceless %}<b> x </b>{% endapply %}");
        assert_eq!(data.counts("filters").get("spaceless"), Some(&1));
    }
}
