// SPDX-License-Identifier: MIT OR Apache-2.0
//! Structural queries over a node set and an edge set.
//!
//! These functions take the edges as an argument instead of reading them
//! from a model, so a hypothetical edge set (the current one plus a
//! candidate connection) can be checked without touching the real graph.
//! All traversals use explicit stacks.

use crate::connection::ConnectionId;
use crate::node::NodeId;
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    /// On the current DFS path
    InProgress,
    /// Fully explored
    Done,
}

/// Downstream neighbours of every node that has outgoing edges.
///
/// Parallel edges between the same two nodes are kept; they do not change
/// any result.
pub fn successors<'a>(edges: impl IntoIterator<Item = &'a ConnectionId>) -> HashMap<NodeId, Vec<NodeId>> {
    let mut map: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    for edge in edges {
        map.entry(edge.out_node_id).or_default().push(edge.in_node_id);
    }
    map
}

/// Depth-first walk from every root in order.
///
/// Calls `on_finish` when a node is fully explored and stops with `true` as
/// soon as an edge leads back into the current path.
fn depth_first(
    roots: &[NodeId],
    successors: &HashMap<NodeId, Vec<NodeId>>,
    mut on_finish: impl FnMut(NodeId),
) -> bool {
    let mut marks: HashMap<NodeId, Mark> = HashMap::new();
    let mut stack: Vec<(NodeId, usize)> = Vec::new();

    for &root in roots {
        if marks.contains_key(&root) {
            continue;
        }
        marks.insert(root, Mark::InProgress);
        stack.push((root, 0));

        while let Some(top) = stack.last_mut() {
            let node = top.0;
            let children = successors.get(&node).map(Vec::as_slice).unwrap_or(&[]);
            if top.1 < children.len() {
                let child = children[top.1];
                top.1 += 1;
                match marks.get(&child) {
                    Some(Mark::InProgress) => return true,
                    Some(Mark::Done) => {}
                    None => {
                        marks.insert(child, Mark::InProgress);
                        stack.push((child, 0));
                    }
                }
            } else {
                marks.insert(node, Mark::Done);
                on_finish(node);
                stack.pop();
            }
        }
    }
    false
}

/// Whether the directed graph contains a cycle
pub fn is_cyclic<'a>(nodes: &[NodeId], edges: impl IntoIterator<Item = &'a ConnectionId>) -> bool {
    let successors = successors(edges);
    depth_first(nodes, &successors, |_| {})
}

/// Nodes ordered so that every edge points forward.
///
/// Reverse DFS finish order; only meaningful for acyclic graphs. Ties are
/// broken by the order of `nodes` and of `edges`.
pub fn topological_order<'a>(nodes: &[NodeId], edges: impl IntoIterator<Item = &'a ConnectionId>) -> Vec<NodeId> {
    let successors = successors(edges);
    let mut finished = Vec::with_capacity(nodes.len());
    depth_first(nodes, &successors, |node| finished.push(node));
    finished.reverse();
    finished
}

/// Whether every node is reachable from every other, ignoring direction.
///
/// An empty graph is not connected.
pub fn is_connected<'a>(nodes: &[NodeId], edges: impl IntoIterator<Item = &'a ConnectionId>) -> bool {
    let Some(&start) = nodes.first() else {
        return false;
    };

    let mut neighbours: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    for edge in edges {
        neighbours.entry(edge.out_node_id).or_default().push(edge.in_node_id);
        neighbours.entry(edge.in_node_id).or_default().push(edge.out_node_id);
    }

    let members: HashSet<NodeId> = nodes.iter().copied().collect();
    let mut visited: HashSet<NodeId> = HashSet::from([start]);
    let mut queue = VecDeque::from([start]);
    while let Some(node) = queue.pop_front() {
        for &next in neighbours.get(&node).map(Vec::as_slice).unwrap_or(&[]) {
            if members.contains(&next) && visited.insert(next) {
                queue.push_back(next);
            }
        }
    }
    visited.len() == members.len()
}

/// Order-independent fingerprint of a node set and an edge set
pub fn structure_hash<'a>(nodes: &[NodeId], edges: impl IntoIterator<Item = &'a ConnectionId>) -> u64 {
    let mut nodes = nodes.to_vec();
    nodes.sort_unstable();
    let mut edges: Vec<ConnectionId> = edges.into_iter().copied().collect();
    edges.sort_unstable();

    let mut hasher = DefaultHasher::new();
    nodes.hash(&mut hasher);
    edges.hash(&mut hasher);
    hasher.finish()
}
