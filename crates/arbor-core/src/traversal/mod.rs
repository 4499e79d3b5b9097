//! Cycle-safe depth-first traversal of a version's graph.
//!
//! A [`Traversal`] is a lazy iterator: nothing touches the store until the
//! first call to `next()`. Each visit pairs a node with the edge it was
//! reached through. Every node is emitted at most once per traversal, so
//! cycles and self-loops terminate.

use std::collections::HashSet;
use std::fmt;

use crate::error::ArborResult;
use crate::store::StoreOps;
use crate::types::{Edge, Node, NodeId, Payload, VersionId};

/// A node reached during traversal.
#[derive(Debug, Clone, PartialEq)]
pub struct Visit {
    /// The visited node.
    pub node: Node,
    /// Edge the node was reached through; `None` for the start node.
    pub via: Option<Edge>,
    /// Number of edges between the start node and this one.
    pub depth: usize,
}

impl Visit {
    pub fn is_start(&self) -> bool {
        self.via.is_none()
    }
}

impl fmt::Display for Visit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(edge) = &self.via {
            writeln!(f, "Edge {}: {}", edge.id, payload_json(&edge.payload)?)?;
        }
        write!(f, "Node {} data: {}", self.node.id, payload_json(&self.node.payload)?)
    }
}

fn payload_json(payload: &Payload) -> Result<String, fmt::Error> {
    serde_json::to_string(payload).map_err(|_| fmt::Error)
}

/// Where a traversal is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalStatus {
    /// `next()` has not been called yet.
    Pending,
    Running,
    /// The start node does not exist in the traversed version.
    NodeNotFound(NodeId),
    Finished,
    /// A store error was yielded.
    Failed,
}

/// Entry point for graph walks over a store.
///
/// Works with any store handle, including the one handed to a transaction.
pub struct GraphTraversal<'a, S: StoreOps + ?Sized> {
    store: &'a S,
}

impl<'a, S: StoreOps + ?Sized> GraphTraversal<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Walk `version_id` depth-first from `start`.
    ///
    /// Calling this again starts a fresh walk with its own visited set.
    pub fn traverse(&self, version_id: VersionId, start: NodeId) -> Traversal<'a, S> {
        Traversal {
            store: self.store,
            version_id,
            start,
            stack: Vec::new(),
            visited: HashSet::new(),
            status: TraversalStatus::Pending,
        }
    }
}

struct Frame {
    node_id: NodeId,
    via: Option<Edge>,
    depth: usize,
}

/// Lazy depth-first walk. See [`GraphTraversal::traverse`].
pub struct Traversal<'a, S: StoreOps + ?Sized> {
    store: &'a S,
    version_id: VersionId,
    start: NodeId,
    stack: Vec<Frame>,
    visited: HashSet<NodeId>,
    status: TraversalStatus,
}

impl<'a, S: StoreOps + ?Sized> Traversal<'a, S> {
    pub fn status(&self) -> TraversalStatus {
        self.status
    }

    /// Number of nodes emitted so far.
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// Drain the traversal, stopping at the first store error.
    pub fn collect_visits(self) -> ArborResult<Vec<Visit>> {
        self.collect()
    }

    fn fail<T>(&mut self, err: crate::error::ArborError) -> Option<ArborResult<T>> {
        self.stack.clear();
        self.status = TraversalStatus::Failed;
        Some(Err(err))
    }

    /// Resolve a frame to a node in the traversed version.
    fn resolve(&self, frame: &Frame) -> ArborResult<Option<Node>> {
        Ok(self
            .store
            .get_node(frame.node_id)?
            .filter(|node| node.version_id == self.version_id))
    }
}

impl<S: StoreOps + ?Sized> Iterator for Traversal<'_, S> {
    type Item = ArborResult<Visit>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.status {
            TraversalStatus::Pending => {
                self.status = TraversalStatus::Running;
                self.stack.push(Frame {
                    node_id: self.start,
                    via: None,
                    depth: 0,
                });
            }
            TraversalStatus::Running => {}
            _ => return None,
        }

        while let Some(frame) = self.stack.pop() {
            if self.visited.contains(&frame.node_id) {
                continue;
            }

            let node = match self.resolve(&frame) {
                Ok(Some(node)) => node,
                Ok(None) if frame.via.is_none() => {
                    tracing::warn!(
                        "Start node {} not found in version {}",
                        frame.node_id,
                        self.version_id
                    );
                    self.status = TraversalStatus::NodeNotFound(frame.node_id);
                    return None;
                }
                Ok(None) => {
                    tracing::debug!(
                        "Skipping edge target {} outside version {}",
                        frame.node_id,
                        self.version_id
                    );
                    continue;
                }
                Err(e) => return self.fail(e),
            };

            let edges = match self.store.list_edges_by_source(node.id) {
                Ok(edges) => edges,
                Err(e) => return self.fail(e),
            };

            self.visited.insert(node.id);

            // Reversed so the first outgoing edge is explored first.
            for edge in edges.into_iter().rev() {
                if self.visited.contains(&edge.target_node_id) {
                    continue;
                }
                self.stack.push(Frame {
                    node_id: edge.target_node_id,
                    via: Some(edge),
                    depth: frame.depth + 1,
                });
            }

            return Some(Ok(Visit {
                node,
                via: frame.via,
                depth: frame.depth,
            }));
        }

        self.status = TraversalStatus::Finished;
        None
    }
}
