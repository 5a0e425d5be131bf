// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Bean cycle detection over the resolved graph.
//!
//! One node per bean (socket beans included), one edge per resolved,
//! *required* socket. Optional and unresolved sockets contribute no edge: they
//! cannot force a cycle to materialize at runtime. Lazy sockets contribute
//! edges like any other: laziness defers evaluation, not the static wiring
//! dependency.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::name::{BeanName, SocketName};

/// One edge of a detected cycle: the consuming bean and the socket the
/// dependency was requested through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CycleEdge {
    /// The bean the dependency originates from.
    pub bean: BeanName,
    /// The socket the dependency goes through.
    pub socket: SocketName,
    /// Whether the socket is a socket bean, i.e. the edge crosses a module
    /// boundary.
    pub socket_bean: bool,
}

impl CycleEdge {
    /// A boundary-crossing edge re-entering the enclosing module through a
    /// composed module's socket, as opposed to wiring further inward.
    pub fn is_boundary_reentry(&self) -> bool {
        self.socket_bean && self.socket.bean() == &self.bean
    }
}

#[derive(Debug)]
struct Edge {
    to: usize,
    socket: SocketName,
    socket_bean: bool,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    InProgress,
    Done,
}

/// The directed dependency graph of one module's resolved wiring.
///
/// Node and edge insertion order is declaration order, which makes detection
/// output deterministic.
#[derive(Debug, Default)]
pub(crate) struct DependencyGraph {
    nodes: Vec<BeanName>,
    index: FxHashMap<BeanName, usize>,
    edges: Vec<Vec<Edge>>,
}

impl DependencyGraph {
    pub fn add_node(&mut self, name: BeanName) {
        if !self.index.contains_key(&name) {
            self.index.insert(name.clone(), self.nodes.len());
            self.nodes.push(name);
            self.edges.push(Vec::new());
        }
    }

    /// Adds a `from --socket--> to` edge. Endpoints outside the graph are
    /// ignored; they belong to already-validated modules.
    pub fn add_edge(&mut self, from: &BeanName, to: &BeanName, socket: SocketName, socket_bean: bool) {
        let (Some(&from), Some(&to)) = (self.index.get(from), self.index.get(to)) else {
            return;
        };
        self.edges[from].push(Edge {
            to,
            socket,
            socket_bean,
        });
    }

    /// Finds every cycle of required edges.
    ///
    /// Three-color depth-first search; a back edge to an in-progress node
    /// yields one cycle reconstructed from the DFS stack. The search is
    /// exhaustive, continuing after a cycle is found, and cycles are
    /// deduplicated by canonical rotation.
    pub fn find_cycles(&self) -> Vec<Vec<CycleEdge>> {
        let mut colors = vec![Color::White; self.nodes.len()];
        let mut cycles = Vec::new();
        let mut seen = FxHashSet::default();

        for node in 0..self.nodes.len() {
            if colors[node] == Color::White {
                let mut path_nodes = Vec::new();
                let mut path_edges: Vec<&Edge> = Vec::new();
                self.visit(node, &mut colors, &mut path_nodes, &mut path_edges, &mut seen, &mut cycles);
            }
        }

        tracing::debug!(nodes = self.nodes.len(), cycles = cycles.len(), "cycle detection done");
        cycles
    }

    fn visit<'a>(
        &'a self,
        node: usize,
        colors: &mut [Color],
        path_nodes: &mut Vec<usize>,
        path_edges: &mut Vec<&'a Edge>,
        seen: &mut FxHashSet<Vec<usize>>,
        cycles: &mut Vec<Vec<CycleEdge>>,
    ) {
        colors[node] = Color::InProgress;
        path_nodes.push(node);

        for edge in &self.edges[node] {
            match colors[edge.to] {
                Color::White => {
                    path_edges.push(edge);
                    self.visit(edge.to, colors, path_nodes, path_edges, seen, cycles);
                    path_edges.pop();
                }
                Color::InProgress => {
                    if let Some(start) = path_nodes.iter().position(|&n| n == edge.to) {
                        self.record_cycle(start, path_nodes, path_edges, edge, seen, cycles);
                    }
                }
                Color::Done => {}
            }
        }

        path_nodes.pop();
        colors[node] = Color::Done;
    }

    fn record_cycle(
        &self,
        start: usize,
        path_nodes: &[usize],
        path_edges: &[&Edge],
        closing: &Edge,
        seen: &mut FxHashSet<Vec<usize>>,
        cycles: &mut Vec<Vec<CycleEdge>>,
    ) {
        let member_nodes = &path_nodes[start..];

        // Canonical rotation for deduplication across DFS restarts.
        let Some(min_pos) = member_nodes
            .iter()
            .enumerate()
            .min_by_key(|&(_, &n)| &self.nodes[n])
            .map(|(i, _)| i)
        else {
            return;
        };
        let mut key: Vec<usize> = member_nodes[min_pos..].to_vec();
        key.extend_from_slice(&member_nodes[..min_pos]);
        if !seen.insert(key) {
            return;
        }

        let mut cycle = Vec::with_capacity(member_nodes.len());
        for (i, &from) in member_nodes.iter().enumerate() {
            let edge = if i + 1 < member_nodes.len() {
                path_edges[start + i]
            } else {
                closing
            };
            cycle.push(CycleEdge {
                bean: self.nodes[from].clone(),
                socket: edge.socket.clone(),
                socket_bean: edge.socket_bean,
            });
        }
        cycles.push(cycle);
    }
}

/// Renders a cycle as a vertical box-drawn chain, one block per bean: the
/// bean's qualified name, the socket the dependency goes through and a
/// directional marker. Socket-bean steps use a dotted link; boundary
/// re-entries are additionally marked `(┄)`.
pub(crate) fn render_cycle(cycle: &[CycleEdge]) -> String {
    let width = cycle
        .iter()
        .map(|edge| edge.bean.to_string().chars().count())
        .max()
        .unwrap_or(0)
        / 2
        + 4;
    let margin = " ".repeat(width);

    let mut lines = Vec::new();
    lines.push(format!("┌{}┐", "─".repeat(width + 2)));
    lines.push(format!("│{} │", margin));

    for (i, edge) in cycle.iter().enumerate() {
        let link = if edge.socket_bean { '┊' } else { '│' };
        let bean = edge.bean.to_string();
        let centering = " ".repeat(width.saturating_sub(bean.chars().count() / 2));
        lines.push(format!("│{centering}{bean}"));
        lines.push(format!("│{margin}{link}"));
        if edge.is_boundary_reentry() {
            lines.push(format!("│{}(┄) {}", &margin[..margin.len().saturating_sub(2)], edge.socket));
        } else {
            lines.push(format!("│{margin}{link} {}", edge.socket));
        }
        lines.push(format!("│{margin}{link}"));
        if i + 1 < cycle.len() {
            lines.push(format!("│{margin}▼"));
        }
    }

    lines.push(format!("└{}┘", "─".repeat(width + 2)));

    // The left border carries the dependency back to the top.
    let mid = lines.len() / 2;
    if let Some(line) = lines.get_mut(mid) {
        let mut replaced = String::with_capacity(line.len() + 2);
        replaced.push('▲');
        replaced.extend(line.chars().skip(1));
        *line = replaced;
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bean(name: &str) -> BeanName {
        BeanName::parse(name).unwrap()
    }

    fn socket(name: &str) -> SocketName {
        SocketName::parse(name).unwrap()
    }

    fn graph(nodes: &[&str], edges: &[(&str, &str)]) -> DependencyGraph {
        let mut graph = DependencyGraph::default();
        for node in nodes {
            graph.add_node(bean(node));
        }
        for (from, to) in edges {
            let via = format!("{from}:dep");
            graph.add_edge(&bean(from), &bean(to), socket(&via), false);
        }
        graph
    }

    #[test]
    fn acyclic_graph_has_no_cycles() {
        let graph = graph(&["m:a", "m:b", "m:c"], &[("m:a", "m:b"), ("m:b", "m:c")]);
        assert!(graph.find_cycles().is_empty());
    }

    #[test]
    fn finds_two_disjoint_cycles() {
        let graph = graph(
            &["m:a", "m:b", "m:c", "m:d", "m:e"],
            &[
                ("m:a", "m:b"),
                ("m:b", "m:c"),
                ("m:c", "m:a"),
                ("m:d", "m:e"),
                ("m:e", "m:d"),
            ],
        );

        let cycles = graph.find_cycles();
        assert_eq!(cycles.len(), 2);
        assert_eq!(cycles[0].len(), 3);
        assert_eq!(cycles[1].len(), 2);
    }

    #[test]
    fn self_edge_is_a_cycle_of_one() {
        let graph = graph(&["m:a"], &[("m:a", "m:a")]);
        let cycles = graph.find_cycles();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].len(), 1);
        assert_eq!(cycles[0][0].bean, bean("m:a"));
    }

    #[test]
    fn shared_node_cycles_are_not_conflated() {
        // a -> b -> a and b -> c -> b share b.
        let graph = graph(
            &["m:a", "m:b", "m:c"],
            &[("m:a", "m:b"), ("m:b", "m:a"), ("m:b", "m:c"), ("m:c", "m:b")],
        );
        assert_eq!(graph.find_cycles().len(), 2);
    }

    #[test]
    fn duplicate_discovery_is_deduplicated() {
        // Two entry points into the same cycle must not double-report it.
        let mut graph = graph(
            &["m:x", "m:y", "m:a", "m:b"],
            &[
                ("m:x", "m:a"),
                ("m:y", "m:a"),
                ("m:a", "m:b"),
                ("m:b", "m:a"),
            ],
        );
        graph.add_node(bean("m:z"));
        assert_eq!(graph.find_cycles().len(), 1);
    }

    #[test]
    fn edges_to_unknown_nodes_are_ignored() {
        let mut graph = graph(&["m:a"], &[]);
        graph.add_edge(&bean("m:a"), &bean("other:thing"), socket("m:a:dep"), false);
        assert!(graph.find_cycles().is_empty());
    }

    #[test]
    fn rendering_shows_beans_sockets_and_markers() {
        let cycle = vec![
            CycleEdge {
                bean: bean("m:a"),
                socket: socket("m:a:dep"),
                socket_bean: false,
            },
            CycleEdge {
                bean: bean("sub:ext"),
                socket: socket("sub:ext"),
                socket_bean: true,
            },
        ];

        let rendered = render_cycle(&cycle);
        assert!(rendered.contains("m:a"));
        assert!(rendered.contains("m:a:dep"));
        assert!(rendered.contains("sub:ext"));
        assert!(rendered.contains('▼'));
        assert!(rendered.contains('┊'));
        assert!(rendered.contains('▲'));
        assert!(rendered.contains("(┄)"));
    }

    #[test]
    fn boundary_reentry_is_the_socket_beans_own_edge() {
        let reentry = CycleEdge {
            bean: bean("sub:ext"),
            socket: socket("sub:ext"),
            socket_bean: true,
        };
        assert!(reentry.is_boundary_reentry());

        let inward = CycleEdge {
            bean: bean("sub:svc"),
            socket: socket("sub:ext"),
            socket_bean: true,
        };
        assert!(!inward.is_boundary_reentry());
    }
}
