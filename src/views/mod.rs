//! View renderers for the investigation graph.
//!
//! Three sibling renderers read the same [`InvestigationGraph`] and the same
//! [`Selection`]:
//! - [`render_flow`]: chronological left-to-right chain with arrow edges
//! - [`render_timeline`]: nodes grouped by event date
//! - [`render_map`]: square grid node-link diagram, independent of date
//!
//! Each returns a serializable layout (or an explicit empty state) and can
//! route clicks on rendered items to a [`ViewCallbacks`] implementation.
//! Selection is resolved once through [`ResolvedSelection`] so every view
//! highlights the same node ids.

mod flow;
mod map;
mod timeline;

pub use flow::*;
pub use map::*;
pub use timeline::*;

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::InputError;
use crate::graph::{InvestigationGraph, InvestigationGraphEdge, InvestigationPath, PathStatus};

/// Message shown by every view when the graph has no nodes.
pub const EMPTY_GRAPH_MESSAGE: &str =
    "No signals yet. Evidence gathered for this investigation will appear here.";

// ============================================================================
// View mode
// ============================================================================

/// Which renderer is active in the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    #[default]
    Flow,
    Timeline,
    Map,
}

impl ViewMode {
    /// All modes in tab order.
    pub const ALL: [ViewMode; 3] = [ViewMode::Flow, ViewMode::Timeline, ViewMode::Map];
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewMode::Flow => write!(f, "flow"),
            ViewMode::Timeline => write!(f, "timeline"),
            ViewMode::Map => write!(f, "map"),
        }
    }
}

impl std::str::FromStr for ViewMode {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "flow" => Ok(ViewMode::Flow),
            "timeline" => Ok(ViewMode::Timeline),
            "map" => Ok(ViewMode::Map),
            _ => Err(InputError::ViewMode {
                value: s.to_string(),
            }),
        }
    }
}

// ============================================================================
// Selection
// ============================================================================

/// Selection key for an edge, written `"{from}|{to}"`.
///
/// Parsing splits on the first `|`, so `from` ids must not contain one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct EdgeKey {
    pub from: String,
    pub to: String,
}

impl EdgeKey {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Whether this key names the edge `from -> to`.
    pub fn matches(&self, from: &str, to: &str) -> bool {
        self.from == from && self.to == to
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.from, self.to)
    }
}

impl std::str::FromStr for EdgeKey {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('|') {
            Some((from, to)) if !from.is_empty() && !to.is_empty() => Ok(EdgeKey::new(from, to)),
            _ => Err(InputError::EdgeKey { key: s.to_string() }),
        }
    }
}

impl From<EdgeKey> for String {
    fn from(key: EdgeKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for EdgeKey {
    type Error = InputError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// What the user has highlighted; ids may be stale after a rebuild.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_edge_key: Option<EdgeKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_path_id: Option<String>,
}

impl Selection {
    pub fn with_node(mut self, node_id: impl Into<String>) -> Self {
        self.selected_node_id = Some(node_id.into());
        self
    }

    pub fn with_edge(mut self, key: EdgeKey) -> Self {
        self.selected_edge_key = Some(key);
        self
    }

    pub fn with_path(mut self, path_id: impl Into<String>) -> Self {
        self.selected_path_id = Some(path_id.into());
        self
    }

    /// True when nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.selected_node_id.is_none()
            && self.selected_edge_key.is_none()
            && self.selected_path_id.is_none()
    }
}

/// Whether a path is listed given the dead-path toggle.
pub fn path_visible(path: &InvestigationPath, show_dead_paths: bool) -> bool {
    show_dead_paths || path.status != PathStatus::Dead
}

/// A [`Selection`] checked against one graph.
///
/// Ids with no match resolve to `None`. A dead path hidden by the
/// dead-path toggle resolves to no path.
#[derive(Debug, Clone, Default)]
pub struct ResolvedSelection<'g> {
    pub node_id: Option<&'g str>,
    pub edge: Option<&'g InvestigationGraphEdge>,
    pub path: Option<&'g InvestigationPath>,
    path_nodes: HashSet<&'g str>,
}

impl<'g> ResolvedSelection<'g> {
    pub fn resolve(
        graph: &'g InvestigationGraph,
        selection: &Selection,
        show_dead_paths: bool,
    ) -> Self {
        let node_id = selection
            .selected_node_id
            .as_deref()
            .and_then(|id| graph.node(id))
            .map(|n| n.id.as_str());
        let edge = selection
            .selected_edge_key
            .as_ref()
            .and_then(|key| graph.edge(&key.from, &key.to));
        let path = selection
            .selected_path_id
            .as_deref()
            .and_then(|id| graph.path(id))
            .filter(|p| path_visible(p, show_dead_paths));
        let path_nodes = path
            .map(|p| p.nodes.iter().map(String::as_str).collect())
            .unwrap_or_default();

        Self {
            node_id,
            edge,
            path,
            path_nodes,
        }
    }

    pub fn is_node_selected(&self, node_id: &str) -> bool {
        self.node_id == Some(node_id)
    }

    pub fn is_edge_selected(&self, from: &str, to: &str) -> bool {
        self.edge.is_some_and(|e| e.from == from && e.to == to)
    }

    pub fn is_path_selected(&self, path_id: &str) -> bool {
        self.path.is_some_and(|p| p.id == path_id)
    }

    /// Whether the node belongs to the highlighted path.
    pub fn is_in_path(&self, node_id: &str) -> bool {
        self.path_nodes.contains(node_id)
    }

    /// Whether `from -> to` is a consecutive step of the highlighted path.
    pub fn is_edge_in_path(&self, from: &str, to: &str) -> bool {
        self.path
            .is_some_and(|p| p.nodes.windows(2).any(|w| w[0] == from && w[1] == to))
    }
}

/// Inputs shared by all renderers.
#[derive(Debug, Clone, Copy)]
pub struct ViewProps<'a> {
    pub graph: &'a InvestigationGraph,
    pub selection: &'a Selection,
    pub show_dead_paths: bool,
}

impl<'a> ViewProps<'a> {
    pub fn new(graph: &'a InvestigationGraph, selection: &'a Selection) -> Self {
        Self {
            graph,
            selection,
            show_dead_paths: false,
        }
    }

    pub fn show_dead_paths(mut self, show: bool) -> Self {
        self.show_dead_paths = show;
        self
    }

    pub(crate) fn resolve(&self) -> ResolvedSelection<'a> {
        ResolvedSelection::resolve(self.graph, self.selection, self.show_dead_paths)
    }
}

// ============================================================================
// Interaction
// ============================================================================

/// Receiver of user clicks on rendered items.
#[cfg_attr(test, mockall::automock)]
pub trait ViewCallbacks {
    /// A node was clicked.
    fn on_node_click(&mut self, node_id: &str);

    /// An edge was clicked (Flow view only).
    fn on_edge_click(&mut self, from: &str, to: &str) {
        let _ = (from, to);
    }

    /// A path chip was clicked (Flow view only).
    fn on_path_click(&mut self, path_id: &str) {
        let _ = path_id;
    }
}

/// Something the user can click in a view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClickTarget {
    Node { id: String },
    Edge { from: String, to: String },
    Path { id: String },
}

impl ClickTarget {
    pub fn node(id: impl Into<String>) -> Self {
        ClickTarget::Node { id: id.into() }
    }

    pub fn edge(from: impl Into<String>, to: impl Into<String>) -> Self {
        ClickTarget::Edge {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn path(id: impl Into<String>) -> Self {
        ClickTarget::Path { id: id.into() }
    }
}

// ============================================================================
// Output
// ============================================================================

/// Renderer output: a layout, or the explicit empty state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ViewState<L> {
    Empty { message: String },
    Ready { layout: L },
}

impl<L> ViewState<L> {
    pub(crate) fn empty() -> Self {
        ViewState::Empty {
            message: EMPTY_GRAPH_MESSAGE.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ViewState::Empty { .. })
    }

    pub fn layout(&self) -> Option<&L> {
        match self {
            ViewState::Empty { .. } => None,
            ViewState::Ready { layout } => Some(layout),
        }
    }
}

impl<L: fmt::Display> fmt::Display for ViewState<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewState::Empty { message } => writeln!(f, "{}", message),
            ViewState::Ready { layout } => write!(f, "{}", layout),
        }
    }
}

/// Output of whichever view is active.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view", content = "output", rename_all = "snake_case")]
pub enum RenderedView {
    Flow(ViewState<FlowLayout>),
    Timeline(ViewState<TimelineLayout>),
    Map(ViewState<MapLayout>),
}

impl RenderedView {
    pub fn mode(&self) -> ViewMode {
        match self {
            RenderedView::Flow(_) => ViewMode::Flow,
            RenderedView::Timeline(_) => ViewMode::Timeline,
            RenderedView::Map(_) => ViewMode::Map,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            RenderedView::Flow(v) => v.is_empty(),
            RenderedView::Timeline(v) => v.is_empty(),
            RenderedView::Map(v) => v.is_empty(),
        }
    }

    /// Node ids flagged as members of the highlighted path, in layout order.
    pub fn in_path_node_ids(&self) -> Vec<&str> {
        match self {
            RenderedView::Flow(v) => v.layout().map_or_else(Vec::new, |l| {
                l.nodes.iter().filter(|n| n.in_path).map(|n| n.id.as_str()).collect()
            }),
            RenderedView::Timeline(v) => v.layout().map_or_else(Vec::new, |l| {
                l.items().filter(|i| i.in_path).map(|i| i.id.as_str()).collect()
            }),
            RenderedView::Map(v) => v.layout().map_or_else(Vec::new, |l| {
                l.nodes.iter().filter(|n| n.in_path).map(|n| n.id.as_str()).collect()
            }),
        }
    }

    /// Route a click to `callbacks` if the target is rendered in this view.
    pub fn dispatch(&self, target: &ClickTarget, callbacks: &mut dyn ViewCallbacks) -> bool {
        match self {
            RenderedView::Flow(v) => v.layout().is_some_and(|l| l.dispatch(target, callbacks)),
            RenderedView::Timeline(v) => {
                v.layout().is_some_and(|l| l.dispatch(target, callbacks))
            }
            RenderedView::Map(v) => v.layout().is_some_and(|l| l.dispatch(target, callbacks)),
        }
    }
}

impl fmt::Display for RenderedView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderedView::Flow(v) => write!(f, "{}", v),
            RenderedView::Timeline(v) => write!(f, "{}", v),
            RenderedView::Map(v) => write!(f, "{}", v),
        }
    }
}

/// Render `mode` for the given props.
pub fn render_view(mode: ViewMode, props: &ViewProps<'_>) -> RenderedView {
    match mode {
        ViewMode::Flow => RenderedView::Flow(render_flow(props)),
        ViewMode::Timeline => RenderedView::Timeline(render_timeline(props)),
        ViewMode::Map => RenderedView::Map(render_map(props)),
    }
}
