//! Investigation workspace: the host side of the graph views.
//!
//! Owns the thread, the accumulated signals, the graph derived from them and
//! the selection controller. The graph is rebuilt whenever the thread or the
//! signal list changes and is shared by every view.

use tracing::info;

use crate::config::ViewPreferences;
use crate::graph::{GraphBuilder, InvestigationGraph};
use crate::model::{InvestigationBundle, InvestigationThread, RawSignal};
use crate::selection::SelectionController;
use crate::views::{ClickTarget, RenderedView, ViewMode};

/// One open investigation with its derived graph and view state.
#[derive(Debug, Clone)]
pub struct InvestigationWorkspace {
    builder: GraphBuilder,
    thread: InvestigationThread,
    signals: Vec<RawSignal>,
    graph: InvestigationGraph,
    controller: SelectionController,
}

impl InvestigationWorkspace {
    /// Open a workspace and build the initial graph.
    pub fn new(
        builder: GraphBuilder,
        thread: InvestigationThread,
        signals: Vec<RawSignal>,
        preferences: &ViewPreferences,
    ) -> Self {
        let graph = builder.build(&thread, &signals);
        info!(
            thread_id = %thread.id,
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            paths = graph.paths.len(),
            "Opened investigation workspace"
        );
        Self {
            builder,
            thread,
            signals,
            graph,
            controller: SelectionController::new(preferences),
        }
    }

    /// Open a workspace from a bundle file's contents.
    pub fn from_bundle(
        builder: GraphBuilder,
        bundle: InvestigationBundle,
        preferences: &ViewPreferences,
    ) -> Self {
        Self::new(builder, bundle.thread, bundle.signals, preferences)
    }

    pub fn thread(&self) -> &InvestigationThread {
        &self.thread
    }

    pub fn signals(&self) -> &[RawSignal] {
        &self.signals
    }

    pub fn graph(&self) -> &InvestigationGraph {
        &self.graph
    }

    pub fn controller(&self) -> &SelectionController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut SelectionController {
        &mut self.controller
    }

    fn rebuild(&mut self) {
        self.graph = self.builder.build(&self.thread, &self.signals);
    }

    /// Add signals delivered after a chat turn and rebuild the graph.
    pub fn append_signals<I>(&mut self, signals: I)
    where
        I: IntoIterator<Item = RawSignal>,
    {
        let before = self.signals.len();
        self.signals.extend(signals);
        if self.signals.len() != before {
            self.rebuild();
            info!(
                thread_id = %self.thread.id,
                added = self.signals.len() - before,
                nodes = self.graph.nodes.len(),
                "Signals appended, graph rebuilt"
            );
        }
    }

    /// Replace the thread (new assessment, confidence, ...) and rebuild.
    pub fn update_thread(&mut self, thread: InvestigationThread) {
        self.thread = thread;
        self.rebuild();
    }

    /// Switch the active view tab.
    pub fn set_view(&mut self, mode: ViewMode) {
        self.controller.set_active_view(mode);
    }

    /// Render the active view.
    pub fn render(&self) -> RenderedView {
        self.controller.render(&self.graph)
    }

    /// Apply a click on the active view. Returns false when the target is
    /// not rendered there.
    pub fn handle_click(&mut self, target: &ClickTarget) -> bool {
        let rendered = self.render();
        rendered.dispatch(target, &mut self.controller)
    }
}
