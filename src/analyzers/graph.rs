//! Cross-template dependency graph.
//!
//! Built once per batch from the literal targets recorded by the
//! relationships collector, then only queried. Node identities are template
//! paths; targets that were never analyzed still appear as nodes.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{depth_first_search, DfsEvent};
use serde::Serialize;

use crate::collectors::{Dependency, RelationKind};
use crate::core::template::normalize_path;
use crate::core::AnalysisResult;

/// Looks up the template a path extends.
pub trait ParentResolver {
    fn resolve_parent(&self, path: &str) -> Option<String>;
}

impl ParentResolver for HashMap<String, String> {
    fn resolve_parent(&self, path: &str) -> Option<String> {
        self.get(path).cloned()
    }
}

impl ParentResolver for BTreeMap<String, String> {
    fn resolve_parent(&self, path: &str) -> Option<String> {
        self.get(path).cloned()
    }
}

/// Number of `extends` hops from `path` up its parent chain.
///
/// The walk stops when no parent resolves or a path repeats. The starting
/// path counts as visited, so a template extending itself has depth 0.
pub fn inheritance_depth(path: &str, resolver: &dyn ParentResolver) -> usize {
    ancestors(path, resolver).len()
}

/// Parent chain of `path`, nearest first, with the same stop rules as
/// [`inheritance_depth`].
pub fn ancestors(path: &str, resolver: &dyn ParentResolver) -> Vec<String> {
    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(path.to_string());
    let mut chain = Vec::new();
    let mut current = path.to_string();
    while let Some(parent) = resolver.resolve_parent(&current) {
        if !visited.insert(parent.clone()) {
            break;
        }
        chain.push(parent.clone());
        current = parent;
    }
    chain
}

/// Parent table derived from the `extends` edges of a graph.
#[derive(Debug, Clone, Default)]
pub struct GraphParentResolver {
    parents: HashMap<String, String>,
}

impl GraphParentResolver {
    pub fn from_graph(graph: &DependencyGraph) -> Self {
        let mut parents = HashMap::new();
        for dep in graph.dependencies() {
            if dep.kind == RelationKind::Extends {
                parents
                    .entry(dep.source.clone())
                    .or_insert_with(|| normalize_target(&dep.target));
            }
        }
        Self { parents }
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }
}

impl ParentResolver for GraphParentResolver {
    fn resolve_parent(&self, path: &str) -> Option<String> {
        self.parents.get(path).cloned()
    }
}

/// Map a literal reference onto the path identity space.
pub fn normalize_target(target: &str) -> String {
    normalize_path(target).trim_start_matches('/').to_string()
}

/// Directed template dependency graph.
///
/// `adjacency` keeps every reference in source order, duplicates and
/// self-references included. Degree queries count each distinct
/// `(source, target)` pair once.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DependencyGraph {
    adjacency: BTreeMap<String, Vec<String>>,
    dependencies: Vec<Dependency>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from phase-1 results; every result becomes a node.
    pub fn from_results(results: &[AnalysisResult]) -> Self {
        let mut graph = Self::new();
        for result in results {
            graph.add_node(&result.path);
            for dep in Dependency::all_from_metrics(&result.path, &result.metrics) {
                graph.add_dependency(dep);
            }
        }
        graph
    }

    pub fn add_node(&mut self, path: &str) {
        self.adjacency.entry(path.to_string()).or_default();
    }

    pub fn add_dependency(&mut self, dependency: Dependency) {
        let target = normalize_target(&dependency.target);
        self.adjacency
            .entry(dependency.source.clone())
            .or_default()
            .push(target);
        self.dependencies.push(dependency);
    }

    /// Raw adjacency list.
    pub fn adjacency(&self) -> &BTreeMap<String, Vec<String>> {
        &self.adjacency
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    /// Whether `path` was added as a source (analyzed template).
    pub fn is_analyzed(&self, path: &str) -> bool {
        self.adjacency.contains_key(path)
    }

    /// Sources and targets, sorted.
    pub fn nodes(&self) -> Vec<String> {
        let mut nodes: BTreeSet<&String> = self.adjacency.keys().collect();
        nodes.extend(self.adjacency.values().flatten());
        nodes.into_iter().cloned().collect()
    }

    /// Distinct targets of `source`, in first-reference order.
    pub fn targets(&self, source: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        self.adjacency
            .get(source)
            .map(|targets| {
                targets
                    .iter()
                    .filter(|t| seen.insert(t.as_str()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Distinct edges, sorted.
    pub fn edges(&self) -> Vec<(String, String)> {
        let mut edges = BTreeSet::new();
        for (source, targets) in &self.adjacency {
            for target in targets {
                edges.insert((source.clone(), target.clone()));
            }
        }
        edges.into_iter().collect()
    }

    pub fn edge_count(&self) -> usize {
        self.edges().len()
    }

    pub fn fan_out(&self, node: &str) -> usize {
        self.targets(node).len()
    }

    /// Distinct sources referencing `node`.
    pub fn fan_in(&self, node: &str) -> usize {
        self.adjacency
            .values()
            .filter(|targets| targets.iter().any(|t| t == node))
            .count()
    }

    /// Fan-in of every node at once.
    pub fn fan_in_map(&self) -> BTreeMap<String, usize> {
        let mut fan_in: BTreeMap<String, usize> =
            self.nodes().into_iter().map(|n| (n, 0)).collect();
        for (_, target) in self.edges() {
            *fan_in.entry(target).or_insert(0) += 1;
        }
        fan_in
    }

    /// `fan_out / (fan_in + fan_out)`, `0.0` for an unconnected node.
    pub fn instability(&self, node: &str) -> f64 {
        instability(self.fan_in(node), self.fan_out(node))
    }

    /// Mean instability over all nodes.
    pub fn graph_instability(&self) -> f64 {
        let fan_in = self.fan_in_map();
        if fan_in.is_empty() {
            return 0.0;
        }
        let total: f64 = fan_in
            .iter()
            .map(|(node, fi)| instability(*fi, self.fan_out(node)))
            .sum();
        total / fan_in.len() as f64
    }

    /// Nodes with neither incoming nor outgoing edges.
    pub fn orphans(&self) -> Vec<String> {
        let fan_in = self.fan_in_map();
        fan_in
            .into_iter()
            .filter(|(node, fi)| *fi == 0 && self.fan_out(node) == 0)
            .map(|(node, _)| node)
            .collect()
    }

    /// Back edges met by a depth-first search over every component.
    ///
    /// This approximates the number of cycles: shared back edges or several
    /// entry points can make it differ from the count of distinct cycles.
    pub fn cycle_count(&self) -> usize {
        let (graph, _) = self.to_petgraph();
        let mut back_edges = 0;
        depth_first_search(&graph, graph.node_indices(), |event| {
            if let DfsEvent::BackEdge(_, _) = event {
                back_edges += 1;
            }
        });
        back_edges
    }

    /// Strongly connected groups that contain a cycle, members sorted.
    pub fn cycle_groups(&self) -> Vec<Vec<String>> {
        let (graph, _) = self.to_petgraph();
        let mut groups: Vec<Vec<String>> = tarjan_scc(&graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
            .map(|scc| {
                let mut members: Vec<String> = scc.iter().map(|&i| graph[i].clone()).collect();
                members.sort();
                members
            })
            .collect();
        groups.sort();
        groups
    }

    fn to_petgraph(&self) -> (DiGraph<String, ()>, HashMap<String, NodeIndex>) {
        let mut graph: DiGraph<String, ()> = DiGraph::new();
        let mut indices: HashMap<String, NodeIndex> = HashMap::new();
        for node in self.nodes() {
            let index = graph.add_node(node.clone());
            indices.insert(node, index);
        }
        for (source, target) in self.edges() {
            if let (Some(&from), Some(&to)) = (indices.get(&source), indices.get(&target)) {
                graph.add_edge(from, to, ());
            }
        }
        (graph, indices)
    }
}

pub(crate) fn instability(fan_in: usize, fan_out: usize) -> f64 {
    let total = fan_in + fan_out;
    if total == 0 {
        0.0
    } else {
        fan_out as f64 / total as f64
    }
}
