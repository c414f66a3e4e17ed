//! Flow view - chronological left-to-right chain.
//!
//! Nodes are laid out on one row in date order (undated last, input order
//! kept). Between consecutive nodes the view draws at most one arrow: the
//! first edge, by insertion order, leaving the left-hand node. Other
//! outgoing edges of that node are not drawn.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use super::{path_visible, ClickTarget, ViewCallbacks, ViewProps, ViewState};
use crate::graph::{chronological_order, EdgeRelation, InvestigationGraphEdge, PathStatus};
use crate::model::{confidence_percent, Relation};

pub const FLOW_NODE_WIDTH: f64 = 180.0;
pub const FLOW_NODE_HEIGHT: f64 = 72.0;
pub const FLOW_GAP: f64 = 64.0;
pub const FLOW_PADDING: f64 = 24.0;

const MIN_STROKE_WIDTH: f64 = 1.0;
const MAX_STROKE_WIDTH: f64 = 4.0;
const MIN_OPACITY: f64 = 0.4;
const MAX_OPACITY: f64 = 0.9;

/// A node box in the flow row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowNode {
    pub id: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub impact: Relation,
    pub confidence_percent: u8,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub selected: bool,
    pub in_path: bool,
}

impl FlowNode {
    fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }
}

/// An arrow between two node boxes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowEdge {
    pub from: String,
    pub to: String,
    pub relation: EdgeRelation,
    pub strength: f64,
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub stroke_width: f64,
    pub opacity: f64,
    pub selected: bool,
    pub in_path: bool,
}

/// A clickable candidate-path chip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathChip {
    pub id: String,
    pub label: String,
    pub status: PathStatus,
    pub confidence_percent: u8,
    pub node_count: usize,
    pub selected: bool,
}

/// Complete flow layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowLayout {
    pub nodes: Vec<FlowNode>,
    pub edges: Vec<FlowEdge>,
    pub path_chips: Vec<PathChip>,
    pub width: f64,
    pub height: f64,
}

/// Stroke width for an edge of the given strength, in [1, 4].
pub fn edge_stroke_width(strength: f64) -> f64 {
    MIN_STROKE_WIDTH + (MAX_STROKE_WIDTH - MIN_STROKE_WIDTH) * strength.clamp(0.0, 1.0)
}

/// Opacity for an edge of the given strength, in [0.4, 0.9].
pub fn edge_opacity(strength: f64) -> f64 {
    MIN_OPACITY + (MAX_OPACITY - MIN_OPACITY) * strength.clamp(0.0, 1.0)
}

/// Reduce the edge list to one edge per source node, first one wins.
pub fn first_edge_by_source(
    edges: &[InvestigationGraphEdge],
) -> HashMap<&str, &InvestigationGraphEdge> {
    let mut by_source: HashMap<&str, &InvestigationGraphEdge> = HashMap::new();
    for edge in edges {
        by_source.entry(edge.from.as_str()).or_insert(edge);
    }
    by_source
}

/// Lay out the graph as a chronological chain.
pub fn render_flow(props: &ViewProps<'_>) -> ViewState<FlowLayout> {
    let graph = props.graph;
    if graph.is_empty() {
        return ViewState::empty();
    }
    let resolved = props.resolve();

    let nodes: Vec<FlowNode> = chronological_order(&graph.nodes)
        .into_iter()
        .enumerate()
        .map(|(index, node)| FlowNode {
            id: node.id.clone(),
            label: node.label.clone(),
            date: node.date.clone(),
            impact: node.impact,
            confidence_percent: confidence_percent(node.confidence),
            x: FLOW_PADDING + index as f64 * (FLOW_NODE_WIDTH + FLOW_GAP),
            y: FLOW_PADDING,
            width: FLOW_NODE_WIDTH,
            height: FLOW_NODE_HEIGHT,
            selected: resolved.is_node_selected(&node.id),
            in_path: resolved.is_in_path(&node.id),
        })
        .collect();

    let position: HashMap<&str, &FlowNode> = nodes.iter().map(|n| (n.id.as_str(), n)).collect();
    let by_source = first_edge_by_source(&graph.edges);

    let edges: Vec<FlowEdge> = nodes
        .iter()
        .take(nodes.len().saturating_sub(1))
        .filter_map(|node| {
            let edge = by_source.get(node.id.as_str())?;
            // Dangling targets are not drawn.
            let target = position.get(edge.to.as_str())?;
            Some(FlowEdge {
                from: edge.from.clone(),
                to: edge.to.clone(),
                relation: edge.relation,
                strength: edge.strength,
                x1: node.x + node.width,
                y1: node.y + node.height / 2.0,
                x2: target.x,
                y2: target.y + target.height / 2.0,
                stroke_width: edge_stroke_width(edge.strength),
                opacity: edge_opacity(edge.strength),
                selected: resolved.is_edge_selected(&edge.from, &edge.to),
                in_path: resolved.is_edge_in_path(&edge.from, &edge.to),
            })
        })
        .collect();

    let path_chips: Vec<PathChip> = graph
        .paths
        .iter()
        .filter(|p| path_visible(p, props.show_dead_paths))
        .map(|p| PathChip {
            id: p.id.clone(),
            label: p.hypothesis_label.clone(),
            status: p.status,
            confidence_percent: confidence_percent(p.confidence),
            node_count: p.nodes.len(),
            selected: resolved.is_path_selected(&p.id),
        })
        .collect();

    let width = FLOW_PADDING * 2.0 + nodes.len() as f64 * FLOW_NODE_WIDTH
        + nodes.len().saturating_sub(1) as f64 * FLOW_GAP;

    ViewState::Ready {
        layout: FlowLayout {
            nodes,
            edges,
            path_chips,
            width,
            height: FLOW_PADDING * 2.0 + FLOW_NODE_HEIGHT,
        },
    }
}

impl FlowLayout {
    /// Node box under a point, if any.
    pub fn node_at(&self, x: f64, y: f64) -> Option<&FlowNode> {
        self.nodes.iter().find(|n| n.contains(x, y))
    }

    /// Forward a click to `callbacks` when the target is drawn here.
    pub fn dispatch(&self, target: &ClickTarget, callbacks: &mut dyn ViewCallbacks) -> bool {
        match target {
            ClickTarget::Node { id } if self.nodes.iter().any(|n| &n.id == id) => {
                callbacks.on_node_click(id);
                true
            }
            ClickTarget::Edge { from, to }
                if self.edges.iter().any(|e| &e.from == from && &e.to == to) =>
            {
                callbacks.on_edge_click(from, to);
                true
            }
            ClickTarget::Path { id } if self.path_chips.iter().any(|c| &c.id == id) => {
                callbacks.on_path_click(id);
                true
            }
            _ => false,
        }
    }
}

fn marks(selected: bool, in_path: bool) -> &'static str {
    match (selected, in_path) {
        (true, true) => " [selected, path]",
        (true, false) => " [selected]",
        (false, true) => " [path]",
        (false, false) => "",
    }
}

impl fmt::Display for FlowLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Flow: {} nodes, {} edges", self.nodes.len(), self.edges.len())?;
        for node in &self.nodes {
            writeln!(
                f,
                "  ({}) {} {} - {}% {}{}",
                node.id,
                node.date.as_deref().unwrap_or("no date"),
                node.label,
                node.confidence_percent,
                node.impact,
                marks(node.selected, node.in_path)
            )?;
            if let Some(edge) = self.edges.iter().find(|e| e.from == node.id) {
                writeln!(
                    f,
                    "      --{} {:.2}--> {}{}",
                    edge.relation,
                    edge.strength,
                    edge.to,
                    marks(edge.selected, edge.in_path)
                )?;
            }
        }
        if !self.path_chips.is_empty() {
            writeln!(f, "Paths:")?;
            for chip in &self.path_chips {
                writeln!(
                    f,
                    "  {} {} ({}, {}%, {} nodes){}",
                    if chip.selected { "*" } else { "-" },
                    chip.label,
                    chip.status,
                    chip.confidence_percent,
                    chip.node_count,
                    marks(chip.selected, false)
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{build_graph_from_signals, InvestigationGraph, InvestigationGraphNode};
    use crate::model::{InvestigationSignal, InvestigationThread};
    use crate::views::{EdgeKey, MockViewCallbacks, Selection};

    fn two_signal_graph() -> InvestigationGraph {
        let thread = InvestigationThread::new("T", "H");
        build_graph_from_signals(
            &thread,
            &[
                InvestigationSignal::new("s2", "B", "y", Relation::Weakens).with_date("2024-01-03"),
                InvestigationSignal::new("s1", "A", "x", Relation::Supports).with_date("2024-01-01"),
            ],
        )
    }

    fn node(id: &str, date: Option<&str>) -> InvestigationGraphNode {
        InvestigationGraphNode {
            id: id.to_string(),
            label: id.to_uppercase(),
            date: date.map(str::to_string),
            confidence: 0.5,
            sources: vec!["src".to_string()],
            impact: Relation::Neutral,
            signal_ids: vec![id.to_string()],
        }
    }

    fn edge(from: &str, to: &str, strength: f64) -> InvestigationGraphEdge {
        InvestigationGraphEdge {
            from: from.to_string(),
            to: to.to_string(),
            relation: Relation::Supports,
            strength,
            confidence: 0.5,
        }
    }

    fn layout(state: ViewState<FlowLayout>) -> FlowLayout {
        match state {
            ViewState::Ready { layout } => layout,
            ViewState::Empty { .. } => panic!("expected a layout"),
        }
    }

    #[test]
    fn test_renders_left_to_right_by_date() {
        let graph = two_signal_graph();
        let selection = Selection::default();
        let flow = layout(render_flow(&ViewProps::new(&graph, &selection)));

        let ids: Vec<&str> = flow.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "s2"]);
        assert!(flow.nodes[0].x < flow.nodes[1].x);

        assert_eq!(flow.edges.len(), 1);
        let e = &flow.edges[0];
        assert_eq!((e.from.as_str(), e.to.as_str()), ("s1", "s2"));
        assert_eq!(e.relation, Relation::Weakens);
        assert!(e.x1 <= e.x2);
    }

    #[test]
    fn test_undated_nodes_trail_in_input_order() {
        let graph = InvestigationGraph {
            nodes: vec![
                node("u1", None),
                node("d2", Some("2024-02-01")),
                node("u2", None),
                node("d1", Some("2024-01-01")),
            ],
            edges: vec![],
            paths: vec![],
        };
        let selection = Selection::default();
        let flow = layout(render_flow(&ViewProps::new(&graph, &selection)));
        let ids: Vec<&str> = flow.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["d1", "d2", "u1", "u2"]);
        assert!(flow.edges.is_empty());
    }

    #[test]
    fn test_first_outgoing_edge_wins() {
        let graph = InvestigationGraph {
            nodes: vec![
                node("a", Some("2024-01-01")),
                node("b", Some("2024-01-02")),
                node("c", Some("2024-01-03")),
            ],
            edges: vec![edge("a", "c", 0.9), edge("a", "b", 0.1), edge("b", "c", 0.5)],
            paths: vec![],
        };

        let reduced = first_edge_by_source(&graph.edges);
        assert_eq!(reduced["a"].to, "c");

        let selection = Selection::default();
        let flow = layout(render_flow(&ViewProps::new(&graph, &selection)));
        let pairs: Vec<(&str, &str)> = flow
            .edges
            .iter()
            .map(|e| (e.from.as_str(), e.to.as_str()))
            .collect();
        assert_eq!(pairs, vec![("a", "c"), ("b", "c")]);
    }

    #[test]
    fn test_dangling_edge_is_skipped() {
        let graph = InvestigationGraph {
            nodes: vec![node("a", Some("2024-01-01")), node("b", Some("2024-01-02"))],
            edges: vec![edge("a", "ghost", 0.5)],
            paths: vec![],
        };
        let selection = Selection::default();
        let flow = layout(render_flow(&ViewProps::new(&graph, &selection)));
        assert_eq!(flow.nodes.len(), 2);
        assert!(flow.edges.is_empty());
    }

    #[test]
    fn test_edge_weight_bounds() {
        assert_eq!(edge_stroke_width(0.0), 1.0);
        assert_eq!(edge_stroke_width(1.0), 4.0);
        assert_eq!(edge_stroke_width(7.0), 4.0);
        assert!((edge_opacity(0.0) - 0.4).abs() < 1e-9);
        assert!((edge_opacity(1.0) - 0.9).abs() < 1e-9);
        assert!(edge_stroke_width(0.3) < edge_stroke_width(0.6));
        assert!(edge_opacity(0.3) < edge_opacity(0.6));
    }

    #[test]
    fn test_selection_flags_and_stale_edge() {
        let graph = two_signal_graph();
        let selection = Selection::default()
            .with_node("s2")
            .with_edge(EdgeKey::new("s1", "s2"));
        let flow = layout(render_flow(&ViewProps::new(&graph, &selection)));
        assert!(!flow.nodes[0].selected);
        assert!(flow.nodes[1].selected);
        assert!(flow.edges[0].selected);

        let stale = Selection::default().with_edge(EdgeKey::new("s2", "s1"));
        let flow = layout(render_flow(&ViewProps::new(&graph, &stale)));
        assert!(!flow.edges[0].selected);
    }

    #[test]
    fn test_dead_paths_hidden_unless_requested() {
        let mut graph = two_signal_graph();
        graph.paths[0].status = PathStatus::Dead;
        let selection = Selection::default();

        let hidden = layout(render_flow(&ViewProps::new(&graph, &selection)));
        assert!(hidden.path_chips.is_empty());

        let shown = layout(render_flow(
            &ViewProps::new(&graph, &selection).show_dead_paths(true),
        ));
        assert_eq!(shown.path_chips.len(), 1);
        assert_eq!(shown.path_chips[0].status, PathStatus::Dead);
    }

    #[test]
    fn test_dispatch_routes_clicks() {
        let graph = two_signal_graph();
        let selection = Selection::default();
        let flow = layout(render_flow(&ViewProps::new(&graph, &selection)));

        let mut callbacks = MockViewCallbacks::new();
        callbacks
            .expect_on_node_click()
            .withf(|id| id == "s1")
            .times(1)
            .return_const(());
        callbacks
            .expect_on_edge_click()
            .withf(|from, to| from == "s1" && to == "s2")
            .times(1)
            .return_const(());
        callbacks
            .expect_on_path_click()
            .withf(|id| id == "path-1")
            .times(1)
            .return_const(());

        assert!(flow.dispatch(&ClickTarget::node("s1"), &mut callbacks));
        assert!(flow.dispatch(&ClickTarget::edge("s1", "s2"), &mut callbacks));
        assert!(flow.dispatch(&ClickTarget::path("path-1"), &mut callbacks));
        assert!(!flow.dispatch(&ClickTarget::node("missing"), &mut callbacks));
        assert!(!flow.dispatch(&ClickTarget::edge("s2", "s1"), &mut callbacks));
    }

    #[test]
    fn test_node_hit_test() {
        let graph = two_signal_graph();
        let selection = Selection::default();
        let flow = layout(render_flow(&ViewProps::new(&graph, &selection)));

        let second = &flow.nodes[1];
        let hit = flow.node_at(second.x + 5.0, second.y + 5.0).unwrap();
        assert_eq!(hit.id, "s2");
        assert!(flow.node_at(0.0, 0.0).is_none());
    }

    #[test]
    fn test_text_output_lists_nodes_and_paths() {
        let graph = two_signal_graph();
        let selection = Selection::default().with_path("path-1");
        let text = layout(render_flow(&ViewProps::new(&graph, &selection))).to_string();
        assert!(text.starts_with("Flow: 2 nodes, 1 edges"));
        assert!(text.contains("(s1) 2024-01-01"));
        assert!(text.contains("--weakens"));
        assert!(text.contains("Paths:"));
    }
}
