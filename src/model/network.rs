//! Radial distribution feeder with a linearized voltage model.
//!
//! Voltage drop along an edge is proportional to the total load flowing
//! through it, with the proportionality constant carried on the edge as a
//! per-unit sensitivity (pu volts per kW of downstream flow). The substation
//! (root) is held at the target voltage.

use std::collections::HashMap;

use thiserror::Error;

/// Errors detected while assembling a feeder topology.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("edge ({from}, {to}) references a node outside 0..{node_count}")]
    NodeOutOfRange {
        from: usize,
        to: usize,
        node_count: usize,
    },
    #[error("edge ({from}, {to}) has non-positive sensitivity {resistance}")]
    BadResistance {
        from: usize,
        to: usize,
        resistance: f32,
    },
    #[error("topology is not a tree rooted at node {root}: {reason}")]
    NotATree { root: usize, reason: String },
    #[error("home {home} is mapped to unknown node {node}")]
    BadHomeNode { home: String, node: usize },
}

/// Feeder segment between two nodes.
///
/// `resistance` is the linearized voltage sensitivity of the segment in
/// per-unit volts per kW of downstream flow.
#[derive(Debug, Clone, Copy)]
pub struct Edge {
    pub from: usize,
    pub to: usize,
    pub resistance: f32,
}

/// Radial feeder rooted at a substation node, with a home-to-node mapping.
///
/// Read-only during optimization; construction verifies the topology is a
/// connected tree and that every home maps to an existing node.
#[derive(Debug, Clone)]
pub struct Network {
    node_count: usize,
    root: usize,
    /// Parent node and connecting-edge sensitivity, `None` for the root.
    parent: Vec<Option<(usize, f32)>>,
    /// Node indices in breadth-first order from the root.
    order: Vec<usize>,
    home_nodes: HashMap<String, usize>,
}

impl Network {
    /// Builds a feeder from an edge list and home placement.
    ///
    /// # Errors
    ///
    /// Returns a [`NetworkError`] if an edge references a missing node or
    /// carries a non-positive sensitivity, if the edges do not form a
    /// connected tree rooted at `root`, or if a home maps to an unknown node.
    pub fn new(
        node_count: usize,
        root: usize,
        edges: &[Edge],
        home_nodes: HashMap<String, usize>,
    ) -> Result<Self, NetworkError> {
        if root >= node_count {
            return Err(NetworkError::NotATree {
                root,
                reason: format!("root outside 0..{node_count}"),
            });
        }
        for e in edges {
            if e.from >= node_count || e.to >= node_count {
                return Err(NetworkError::NodeOutOfRange {
                    from: e.from,
                    to: e.to,
                    node_count,
                });
            }
            if !(e.resistance > 0.0) || !e.resistance.is_finite() {
                return Err(NetworkError::BadResistance {
                    from: e.from,
                    to: e.to,
                    resistance: e.resistance,
                });
            }
        }
        if edges.len() + 1 != node_count {
            return Err(NetworkError::NotATree {
                root,
                reason: format!("{} edges for {} nodes", edges.len(), node_count),
            });
        }

        // Undirected adjacency, then orient edges by BFS from the root.
        let mut adjacency: Vec<Vec<(usize, f32)>> = vec![Vec::new(); node_count];
        for e in edges {
            adjacency[e.from].push((e.to, e.resistance));
            adjacency[e.to].push((e.from, e.resistance));
        }

        let mut parent: Vec<Option<(usize, f32)>> = vec![None; node_count];
        let mut visited = vec![false; node_count];
        let mut order = Vec::with_capacity(node_count);
        let mut queue = std::collections::VecDeque::new();
        visited[root] = true;
        queue.push_back(root);
        while let Some(n) = queue.pop_front() {
            order.push(n);
            for &(next, r) in &adjacency[n] {
                if !visited[next] {
                    visited[next] = true;
                    parent[next] = Some((n, r));
                    queue.push_back(next);
                }
            }
        }
        if order.len() != node_count {
            return Err(NetworkError::NotATree {
                root,
                reason: format!("only {} of {} nodes reachable", order.len(), node_count),
            });
        }

        for (home, &node) in &home_nodes {
            if node >= node_count {
                return Err(NetworkError::BadHomeNode {
                    home: home.clone(),
                    node,
                });
            }
        }

        Ok(Self {
            node_count,
            root,
            parent,
            order,
            home_nodes,
        })
    }

    /// Number of nodes including the substation.
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Substation node index.
    pub fn root(&self) -> usize {
        self.root
    }

    /// Electrical node a home is served from, if the home is known.
    pub fn node_of(&self, home_id: &str) -> Option<usize> {
        self.home_nodes.get(home_id).copied()
    }

    /// Iterator over `(home_id, node)` placements.
    pub fn home_nodes(&self) -> impl Iterator<Item = (&str, usize)> {
        self.home_nodes.iter().map(|(h, &n)| (h.as_str(), n))
    }

    /// Per-node voltages for one hour of node loads, substation held at `vset`.
    ///
    /// Downstream flows are accumulated leaf-to-root, then drops applied
    /// root-to-leaf: `v[child] = v[parent] - r * downstream_kw`.
    pub fn voltage_profile(&self, node_load_kw: &[f32], vset: f32) -> Vec<f32> {
        debug_assert_eq!(node_load_kw.len(), self.node_count);
        let mut subtree_kw = node_load_kw.to_vec();
        for &n in self.order.iter().rev() {
            if let Some((p, _)) = self.parent[n] {
                subtree_kw[p] += subtree_kw[n];
            }
        }
        let mut voltage = vec![vset; self.node_count];
        for &n in &self.order {
            if let Some((p, r)) = self.parent[n] {
                voltage[n] = voltage[p] - r * subtree_kw[n];
            }
        }
        voltage
    }

    /// Voltages for every hour of a `[node][hour]` load matrix.
    pub fn voltage_series(&self, node_load_kw: &[Vec<f32>], vset: f32) -> Vec<Vec<f32>> {
        let horizon = node_load_kw.first().map_or(0, Vec::len);
        let mut series = vec![vec![vset; horizon]; self.node_count];
        let mut hour_load = vec![0.0_f32; self.node_count];
        for t in 0..horizon {
            for (n, row) in node_load_kw.iter().enumerate() {
                hour_load[n] = row[t];
            }
            let v = self.voltage_profile(&hour_load, vset);
            for (n, &vn) in v.iter().enumerate() {
                series[n][t] = vn;
            }
        }
        series
    }

    /// Voltage sensitivity matrix `S[n][m]`: the drop at node `n` per kW of
    /// load added at node `m`, equal to the summed sensitivity of the edges
    /// shared by the two root paths.
    pub fn sensitivity(&self) -> Vec<Vec<f32>> {
        // Root path of each node as (node, parent-edge sensitivity) pairs.
        let paths: Vec<Vec<(usize, f32)>> = (0..self.node_count)
            .map(|n| {
                let mut path = Vec::new();
                let mut cur = n;
                while let Some((p, r)) = self.parent[cur] {
                    path.push((cur, r));
                    cur = p;
                }
                path
            })
            .collect();

        let mut s = vec![vec![0.0_f32; self.node_count]; self.node_count];
        let mut on_path = vec![false; self.node_count];
        for m in 0..self.node_count {
            for &(k, _) in &paths[m] {
                on_path[k] = true;
            }
            for n in 0..self.node_count {
                s[n][m] = paths[n]
                    .iter()
                    .filter(|&&(k, _)| on_path[k])
                    .map(|&(_, r)| r)
                    .sum();
            }
            for &(k, _) in &paths[m] {
                on_path[k] = false;
            }
        }
        s
    }
}
