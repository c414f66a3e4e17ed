//! Selection state shared by every view.
//!
//! The controller lives in the host, outlives view switches and graph
//! rebuilds, and receives clicks through [`ViewCallbacks`]. Clicking an item
//! selects it; clicking the selected item again clears that selection.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ViewPreferences;
use crate::graph::InvestigationGraph;
use crate::views::{
    render_view, EdgeKey, RenderedView, Selection, ViewCallbacks, ViewMode, ViewProps,
};

/// Host-side selection and view-tab state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionController {
    selection: Selection,
    active_view: ViewMode,
    show_dead_paths: bool,
}

impl SelectionController {
    /// Create a controller from initial preferences.
    pub fn new(preferences: &ViewPreferences) -> Self {
        Self {
            selection: Selection::default(),
            active_view: preferences.default_view,
            show_dead_paths: preferences.show_dead_paths,
        }
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn active_view(&self) -> ViewMode {
        self.active_view
    }

    pub fn show_dead_paths(&self) -> bool {
        self.show_dead_paths
    }

    /// Switch view tabs. The selection is kept.
    pub fn set_active_view(&mut self, mode: ViewMode) {
        if self.active_view != mode {
            debug!(from = %self.active_view, to = %mode, "Switching investigation view");
            self.active_view = mode;
        }
    }

    pub fn set_show_dead_paths(&mut self, show: bool) {
        self.show_dead_paths = show;
    }

    /// Replace the whole selection, e.g. when restoring a saved view.
    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = selection;
    }

    pub fn clear(&mut self) {
        self.selection = Selection::default();
    }

    /// Render the active view of `graph` with the current selection.
    pub fn render(&self, graph: &InvestigationGraph) -> RenderedView {
        let props =
            ViewProps::new(graph, &self.selection).show_dead_paths(self.show_dead_paths);
        render_view(self.active_view, &props)
    }
}

fn toggle<T: PartialEq>(slot: &mut Option<T>, value: T) {
    if slot.as_ref() == Some(&value) {
        *slot = None;
    } else {
        *slot = Some(value);
    }
}

impl ViewCallbacks for SelectionController {
    fn on_node_click(&mut self, node_id: &str) {
        toggle(&mut self.selection.selected_node_id, node_id.to_string());
        debug!(selected = ?self.selection.selected_node_id, "Node selection changed");
    }

    fn on_edge_click(&mut self, from: &str, to: &str) {
        toggle(&mut self.selection.selected_edge_key, EdgeKey::new(from, to));
        debug!(selected = ?self.selection.selected_edge_key, "Edge selection changed");
    }

    fn on_path_click(&mut self, path_id: &str) {
        toggle(&mut self.selection.selected_path_id, path_id.to_string());
        debug!(selected = ?self.selection.selected_path_id, "Path selection changed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build_graph_from_signals;
    use crate::model::{InvestigationSignal, InvestigationThread, Relation};
    use crate::views::ClickTarget;

    fn graph() -> InvestigationGraph {
        build_graph_from_signals(
            &InvestigationThread::new("T", "H"),
            &[
                InvestigationSignal::new("s1", "A", "x", Relation::Supports).with_date("2024-01-01"),
                InvestigationSignal::new("s2", "B", "y", Relation::Weakens).with_date("2024-01-03"),
                InvestigationSignal::new("s3", "C", "z", Relation::Neutral),
            ],
        )
    }

    #[test]
    fn test_new_uses_preferences() {
        let controller = SelectionController::new(&ViewPreferences {
            default_view: ViewMode::Timeline,
            show_dead_paths: true,
        });
        assert_eq!(controller.active_view(), ViewMode::Timeline);
        assert!(controller.show_dead_paths());
        assert!(controller.selection().is_empty());
    }

    #[test]
    fn test_click_toggles_selection() {
        let mut controller = SelectionController::default();
        controller.on_node_click("s1");
        assert_eq!(controller.selection().selected_node_id.as_deref(), Some("s1"));

        controller.on_node_click("s2");
        assert_eq!(controller.selection().selected_node_id.as_deref(), Some("s2"));

        controller.on_node_click("s2");
        assert!(controller.selection().selected_node_id.is_none());

        controller.on_edge_click("s1", "s2");
        assert_eq!(
            controller.selection().selected_edge_key,
            Some(EdgeKey::new("s1", "s2"))
        );
        controller.on_path_click("path-1");
        controller.on_path_click("path-1");
        assert!(controller.selection().selected_path_id.is_none());
    }

    #[test]
    fn test_view_switch_preserves_selection() {
        let graph = graph();
        let mut controller = SelectionController::default();

        let flow = controller.render(&graph);
        assert!(flow.dispatch(&ClickTarget::node("s2"), &mut controller));

        for mode in [ViewMode::Map, ViewMode::Timeline, ViewMode::Flow] {
            controller.set_active_view(mode);
            assert_eq!(controller.selection().selected_node_id.as_deref(), Some("s2"));
            let rendered = controller.render(&graph);
            assert_eq!(rendered.mode(), mode);
            let json = serde_json::to_string(&rendered).unwrap();
            assert!(json.contains("\"selected\":true"));
        }
    }

    fn graph_with_dead_path() -> InvestigationGraph {
        build_graph_from_signals(
            &InvestigationThread::new("T", "H"),
            &[
                InvestigationSignal::new("s1", "A", "a", Relation::Supports).with_date("2024-01-01"),
                InvestigationSignal::new("s2", "B", "b", Relation::Supports)
                    .with_date("2024-01-02")
                    .with_confidence(0.9),
                InvestigationSignal::new("s3", "C", "c", Relation::Supports)
                    .with_date("2024-01-03")
                    .with_confidence(0.9),
                InvestigationSignal::new("s4", "D", "d", Relation::Weakens)
                    .with_date("2024-01-04")
                    .with_confidence(0.9),
            ],
        )
    }

    #[test]
    fn test_hiding_dead_paths_drops_selected_dead_path() {
        let graph = graph_with_dead_path();
        let mut controller = SelectionController::new(&ViewPreferences {
            default_view: ViewMode::Flow,
            show_dead_paths: true,
        });
        assert!(controller
            .render(&graph)
            .dispatch(&ClickTarget::path("path-1"), &mut controller));

        for mode in ViewMode::ALL {
            controller.set_active_view(mode);
            assert_eq!(controller.render(&graph).in_path_node_ids(), vec!["s1", "s2", "s3"]);
        }

        controller.set_show_dead_paths(false);
        for mode in ViewMode::ALL {
            controller.set_active_view(mode);
            let rendered = controller.render(&graph);
            assert!(rendered.in_path_node_ids().is_empty(), "mode {}", mode);
        }

        controller.set_active_view(ViewMode::Flow);
        match controller.render(&graph) {
            RenderedView::Flow(state) => {
                let chips: Vec<String> = state
                    .layout()
                    .unwrap()
                    .path_chips
                    .iter()
                    .map(|c| c.id.clone())
                    .collect();
                assert_eq!(chips, vec!["path-2".to_string()]);
            }
            other => panic!("unexpected render: {:?}", other),
        }
        let hidden = controller.render(&graph);
        assert!(!hidden.dispatch(&ClickTarget::path("path-1"), &mut controller));
        assert_eq!(controller.selection().selected_path_id.as_deref(), Some("path-1"));

        controller.set_show_dead_paths(true);
        assert_eq!(controller.render(&graph).in_path_node_ids(), vec!["s1", "s2", "s3"]);
    }

    #[test]
    fn test_clear_drops_every_selection() {
        let mut controller = SelectionController::default();
        controller.on_node_click("s1");
        controller.on_edge_click("s1", "s2");
        controller.on_path_click("path-1");
        controller.set_active_view(ViewMode::Map);

        controller.clear();
        assert!(controller.selection().is_empty());
        assert_eq!(controller.active_view(), ViewMode::Map);
    }

    #[test]
    fn test_stale_selection_survives_but_renders_as_none() {
        let mut controller = SelectionController::default();
        controller.on_node_click("removed");

        let rendered = controller.render(&graph());
        let json = serde_json::to_string(&rendered).unwrap();
        assert!(!json.contains("\"selected\":true"));
        assert_eq!(
            controller.selection().selected_node_id.as_deref(),
            Some("removed")
        );
    }
}
