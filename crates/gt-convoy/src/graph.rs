//! The records and links a convoy run actually created.

use serde::Serialize;

use crate::collab::Relation;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NodeRole {
    Convoy,
    Leg { leg_id: String },
    Synthesis,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    pub record_id: String,
    #[serde(flatten)]
    pub role: NodeRole,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub relation: Relation,
}

/// Convoy → legs → synthesis, as created in the store.
///
/// Only successful creations and links are recorded, so the graph always
/// mirrors what the store holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConvoyGraph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl ConvoyGraph {
    pub fn add_node(&mut self, record_id: &str, role: NodeRole) {
        self.nodes.push(Node {
            record_id: record_id.to_string(),
            role,
        });
    }

    pub fn add_edge(&mut self, from: &str, to: &str, relation: Relation) {
        self.edges.push(Edge {
            from: from.to_string(),
            to: to.to_string(),
            relation,
        });
    }

    pub fn convoy(&self) -> Option<&str> {
        self.nodes
            .iter()
            .find(|n| n.role == NodeRole::Convoy)
            .map(|n| n.record_id.as_str())
    }

    pub fn synthesis(&self) -> Option<&str> {
        self.nodes
            .iter()
            .find(|n| n.role == NodeRole::Synthesis)
            .map(|n| n.record_id.as_str())
    }

    /// Record ids of the legs, in creation order.
    pub fn legs(&self) -> impl Iterator<Item = &str> {
        self.nodes
            .iter()
            .filter(|n| matches!(n.role, NodeRole::Leg { .. }))
            .map(|n| n.record_id.as_str())
    }

    /// Records that `id` waits on.
    pub fn blockers_of<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a str> {
        self.edges
            .iter()
            .filter(move |e| e.relation == Relation::Blocks && e.from == id)
            .map(|e| e.to.as_str())
    }

    /// Records tracked by `id`.
    pub fn tracked_by<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a str> {
        self.edges
            .iter()
            .filter(move |e| e.relation == Relation::Tracks && e.from == id)
            .map(|e| e.to.as_str())
    }
}
