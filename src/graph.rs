//! Directed dependency graphs and acyclicity checks.
//!
//! Used by JobFlow flow dependencies, Job task dependencies and the queue
//! parent chain. The graph is an arena: nodes live in a `Vec`, a name index
//! maps names to positions, and edges are stored as positions. The graph has
//! no knowledge of what its nodes represent.

use std::collections::BTreeMap;

use thiserror::Error;

/// Graph construction failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// An edge points at a name that is not a node of the graph
    #[error("'{from}' depends on unknown node '{target}'")]
    UnknownNode { from: String, target: String },

    /// The same node name was supplied twice
    #[error("node '{0}' is defined more than once")]
    DuplicateNode(String),
}

#[derive(Debug, Clone)]
struct Node {
    name: String,
    edges: Vec<usize>,
}

/// DFS colouring: unvisited, on the current stack, fully processed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnStack,
    Done,
}

/// A directed graph keyed by node name
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: Vec<Node>,
    index: BTreeMap<String, usize>,
}

impl DependencyGraph {
    /// Build a graph from `(name, direct dependencies)` pairs.
    ///
    /// Traversal order follows the order of `nodes`, which keeps cycle
    /// diagnostics stable across calls.
    pub fn new<I, N, T, S>(nodes: I) -> Result<Self, GraphError>
    where
        I: IntoIterator<Item = (N, T)>,
        N: Into<String>,
        T: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut graph = DependencyGraph::default();
        let mut pending: Vec<Vec<String>> = Vec::new();

        for (name, targets) in nodes {
            let name = name.into();
            if graph.index.contains_key(&name) {
                return Err(GraphError::DuplicateNode(name));
            }
            graph.index.insert(name.clone(), graph.nodes.len());
            graph.nodes.push(Node {
                name,
                edges: Vec::new(),
            });
            pending.push(targets.into_iter().map(|t| t.as_ref().to_string()).collect());
        }

        for (node, targets) in graph.nodes.iter_mut().zip(pending) {
            for target in targets {
                match graph.index.get(&target) {
                    Some(&position) => node.edges.push(position),
                    None => {
                        return Err(GraphError::UnknownNode {
                            from: node.name.clone(),
                            target,
                        });
                    }
                }
            }
        }

        Ok(graph)
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether a node with this name exists
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Whether the graph contains no cycles
    pub fn is_acyclic(&self) -> bool {
        self.find_cycle().is_none()
    }

    /// Find one cycle, if any.
    ///
    /// The returned path starts and ends with the same node, e.g.
    /// `["a", "b", "a"]`; a self-loop is `["a", "a"]`.
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        let mut marks = vec![Mark::Unvisited; self.nodes.len()];

        for start in 0..self.nodes.len() {
            if marks.get(start) != Some(&Mark::Unvisited) {
                continue;
            }
            if let Some(cycle) = self.visit(start, &mut marks) {
                return Some(cycle);
            }
        }
        None
    }

    /// Iterative DFS from `start`; returns the first back edge found as a path
    fn visit(&self, start: usize, marks: &mut [Mark]) -> Option<Vec<String>> {
        // (node, next edge to explore)
        let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
        set_mark(marks, start, Mark::OnStack);

        while let Some(top) = stack.last_mut() {
            let (current, next_edge) = *top;
            let edges = self.nodes.get(current).map(|n| n.edges.as_slice())?;
            match edges.get(next_edge).copied() {
                Some(target) => {
                    top.1 += 1;
                    match marks.get(target).copied() {
                        Some(Mark::Unvisited) => {
                            set_mark(marks, target, Mark::OnStack);
                            stack.push((target, 0));
                        }
                        Some(Mark::OnStack) => {
                            return Some(self.cycle_path(&stack, target));
                        }
                        _ => {}
                    }
                }
                None => {
                    set_mark(marks, current, Mark::Done);
                    stack.pop();
                }
            }
        }
        None
    }

    /// Render the stack suffix beginning at `target` as a closed path
    fn cycle_path(&self, stack: &[(usize, usize)], target: usize) -> Vec<String> {
        let begin = stack
            .iter()
            .position(|&(node, _)| node == target)
            .unwrap_or(0);
        let mut path: Vec<String> = stack
            .iter()
            .skip(begin)
            .filter_map(|&(node, _)| self.nodes.get(node).map(|n| n.name.clone()))
            .collect();
        if let Some(node) = self.nodes.get(target) {
            path.push(node.name.clone());
        }
        path
    }
}

fn set_mark(marks: &mut [Mark], position: usize, mark: Mark) {
    if let Some(slot) = marks.get_mut(position) {
        *slot = mark;
    }
}
