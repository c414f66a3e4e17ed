//! Evidence graph derived from an investigation's signals.
//!
//! The graph is a disposable view-model: it is rebuilt from `(thread, signals)`
//! whenever either changes and is never mutated in place. See
//! [`build_graph_from_signals`] for the construction rules.

mod builder;

pub use builder::*;

use serde::{Deserialize, Serialize};

use crate::model::Relation;

/// Relation carried by an edge; same vocabulary as a signal's impact.
pub type EdgeRelation = Relation;

/// Tuning for graph construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Node confidence used when a signal carries none (0.0-1.0).
    #[serde(default = "default_confidence")]
    pub default_confidence: f64,
    /// Minimum strength of a weakening edge that kills a supporting path.
    #[serde(default = "default_dead_path_strength")]
    pub dead_path_strength: f64,
    /// Maximum characters in node and path labels.
    #[serde(default = "default_label_chars")]
    pub label_chars: usize,
}

fn default_confidence() -> f64 {
    0.5
}

fn default_dead_path_strength() -> f64 {
    0.5
}

fn default_label_chars() -> usize {
    80
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            default_confidence: default_confidence(),
            dead_path_strength: default_dead_path_strength(),
            label_chars: default_label_chars(),
        }
    }
}

/// A vertex: one signal, or several signals describing the same event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestigationGraphNode {
    /// Id of the first signal folded into this node.
    pub id: String,
    /// Headline derived from the summary.
    pub label: String,
    /// ISO date of the event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Confidence, canonical 0.0-1.0.
    pub confidence: f64,
    /// Publishers and URLs backing the node (never empty).
    pub sources: Vec<String>,
    /// Impact of the originating signal.
    pub impact: Relation,
    /// Every signal id folded into this node, first one equal to `id`.
    pub signal_ids: Vec<String>,
}

/// An inferred link from an earlier event to a later one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestigationGraphEdge {
    pub from: String,
    pub to: String,
    pub relation: EdgeRelation,
    /// 0.0-1.0, monotonic in the destination node's confidence.
    pub strength: f64,
    /// Destination node confidence.
    pub confidence: f64,
}

impl InvestigationGraphEdge {
    /// Selection key of this edge.
    pub fn key(&self) -> crate::views::EdgeKey {
        crate::views::EdgeKey::new(&self.from, &self.to)
    }
}

/// Whether a candidate narrative is still plausible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathStatus {
    #[default]
    Active,
    Dead,
}

impl std::fmt::Display for PathStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathStatus::Active => write!(f, "active"),
            PathStatus::Dead => write!(f, "dead"),
        }
    }
}

/// A candidate narrative: an ordered chain of node ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestigationPath {
    pub id: String,
    pub hypothesis_label: String,
    pub nodes: Vec<String>,
    pub status: PathStatus,
    /// Mean member-node confidence.
    pub confidence: f64,
}

impl InvestigationPath {
    /// Whether `node_id` is part of this path.
    pub fn contains(&self, node_id: &str) -> bool {
        self.nodes.iter().any(|n| n == node_id)
    }
}

/// Nodes, edges and candidate paths for one investigation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvestigationGraph {
    pub nodes: Vec<InvestigationGraphNode>,
    pub edges: Vec<InvestigationGraphEdge>,
    pub paths: Vec<InvestigationPath>,
}

impl InvestigationGraph {
    /// True when there is nothing to draw.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up a node by id.
    pub fn node(&self, id: &str) -> Option<&InvestigationGraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Look up a path by id.
    pub fn path(&self, id: &str) -> Option<&InvestigationPath> {
        self.paths.iter().find(|p| p.id == id)
    }

    /// Look up an edge by endpoints.
    pub fn edge(&self, from: &str, to: &str) -> Option<&InvestigationGraphEdge> {
        self.edges.iter().find(|e| e.from == from && e.to == to)
    }
}
