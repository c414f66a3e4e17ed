//! Map view - structural node-link grid.
//!
//! Nodes fill a square-ish grid in graph order (`columns = ceil(sqrt(n))`),
//! edges are straight lines between cell centres. Date plays no part in the
//! layout.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use super::{ClickTarget, ViewCallbacks, ViewProps, ViewState};
use crate::graph::EdgeRelation;
use crate::model::{confidence_percent, Relation};

pub const MAP_CELL_SIZE: f64 = 140.0;
pub const MAP_NODE_RADIUS: f64 = 22.0;

/// Fill of a node circle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeFill {
    Default,
    Selected,
}

/// Outline of a node circle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStroke {
    Default,
    Selected,
    Path,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapNode {
    pub id: String,
    pub label: String,
    pub impact: Relation,
    pub confidence_percent: u8,
    pub column: usize,
    pub row: usize,
    pub cx: f64,
    pub cy: f64,
    pub r: f64,
    pub fill: NodeFill,
    pub stroke: NodeStroke,
    pub selected: bool,
    pub in_path: bool,
}

impl MapNode {
    fn contains(&self, x: f64, y: f64) -> bool {
        let (dx, dy) = (x - self.cx, y - self.cy);
        dx * dx + dy * dy <= self.r * self.r
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapEdge {
    pub from: String,
    pub to: String,
    pub relation: EdgeRelation,
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub in_path: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapLayout {
    pub columns: usize,
    pub rows: usize,
    pub width: f64,
    pub height: f64,
    pub nodes: Vec<MapNode>,
    pub edges: Vec<MapEdge>,
}

/// Grid width for `count` nodes.
pub fn grid_columns(count: usize) -> usize {
    (count as f64).sqrt().ceil() as usize
}

/// Selected nodes change fill; path membership changes the outline only.
fn node_style(selected: bool, in_path: bool) -> (NodeFill, NodeStroke) {
    let fill = if selected {
        NodeFill::Selected
    } else {
        NodeFill::Default
    };
    let stroke = if in_path {
        NodeStroke::Path
    } else if selected {
        NodeStroke::Selected
    } else {
        NodeStroke::Default
    };
    (fill, stroke)
}

/// Lay out the graph on a grid.
pub fn render_map(props: &ViewProps<'_>) -> ViewState<MapLayout> {
    let graph = props.graph;
    if graph.is_empty() {
        return ViewState::empty();
    }
    let resolved = props.resolve();

    let columns = grid_columns(graph.nodes.len()).max(1);
    let rows = graph.nodes.len().div_ceil(columns);

    let nodes: Vec<MapNode> = graph
        .nodes
        .iter()
        .enumerate()
        .map(|(index, node)| {
            let (column, row) = (index % columns, index / columns);
            let selected = resolved.is_node_selected(&node.id);
            let in_path = resolved.is_in_path(&node.id);
            let (fill, stroke) = node_style(selected, in_path);
            MapNode {
                id: node.id.clone(),
                label: node.label.clone(),
                impact: node.impact,
                confidence_percent: confidence_percent(node.confidence),
                column,
                row,
                cx: column as f64 * MAP_CELL_SIZE + MAP_CELL_SIZE / 2.0,
                cy: row as f64 * MAP_CELL_SIZE + MAP_CELL_SIZE / 2.0,
                r: MAP_NODE_RADIUS,
                fill,
                stroke,
                selected,
                in_path,
            }
        })
        .collect();

    let centre: HashMap<&str, (f64, f64)> =
        nodes.iter().map(|n| (n.id.as_str(), (n.cx, n.cy))).collect();

    let edges: Vec<MapEdge> = graph
        .edges
        .iter()
        .filter_map(|edge| {
            let (x1, y1) = *centre.get(edge.from.as_str())?;
            let (x2, y2) = *centre.get(edge.to.as_str())?;
            Some(MapEdge {
                from: edge.from.clone(),
                to: edge.to.clone(),
                relation: edge.relation,
                x1,
                y1,
                x2,
                y2,
                in_path: resolved.is_edge_in_path(&edge.from, &edge.to),
            })
        })
        .collect();

    ViewState::Ready {
        layout: MapLayout {
            columns,
            rows,
            width: columns as f64 * MAP_CELL_SIZE,
            height: rows as f64 * MAP_CELL_SIZE,
            nodes,
            edges,
        },
    }
}

impl MapLayout {
    /// Node circle under a point, if any.
    pub fn node_at(&self, x: f64, y: f64) -> Option<&MapNode> {
        self.nodes.iter().find(|n| n.contains(x, y))
    }

    /// Forward a node click to `callbacks` when the node is drawn.
    pub fn dispatch(&self, target: &ClickTarget, callbacks: &mut dyn ViewCallbacks) -> bool {
        match target {
            ClickTarget::Node { id } if self.nodes.iter().any(|n| &n.id == id) => {
                callbacks.on_node_click(id);
                true
            }
            _ => false,
        }
    }

    /// Click at a point; dispatches when it lands on a node.
    pub fn click_at(&self, x: f64, y: f64, callbacks: &mut dyn ViewCallbacks) -> bool {
        match self.node_at(x, y) {
            Some(node) => {
                callbacks.on_node_click(&node.id);
                true
            }
            None => false,
        }
    }
}

impl fmt::Display for MapLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Map: {}x{} grid, {} nodes, {} edges",
            self.columns,
            self.rows,
            self.nodes.len(),
            self.edges.len()
        )?;
        for row in 0..self.rows {
            let cells: Vec<String> = self
                .nodes
                .iter()
                .filter(|n| n.row == row)
                .map(|n| {
                    let marker = match (n.selected, n.in_path) {
                        (true, true) => "*+",
                        (true, false) => "*",
                        (false, true) => "+",
                        (false, false) => "",
                    };
                    format!("[{}{}]", n.id, marker)
                })
                .collect();
            writeln!(f, "  {}", cells.join(" "))?;
        }
        for edge in &self.edges {
            writeln!(
                f,
                "  {} -> {} ({}){}",
                edge.from,
                edge.to,
                edge.relation,
                if edge.in_path { " +" } else { "" }
            )?;
        }
        Ok(())
    }
}
