//! # Investigation Graph
//!
//! Turns an investigation thread and the evidence signals gathered for it
//! into a directed evidence graph, and renders that one graph three ways.
//!
//! ## Views
//!
//! - **Flow**: chronological chain of evidence cards with path chips
//! - **Timeline**: nodes grouped by event date, undated last
//! - **Map**: structural node-link grid
//!
//! All views share one selection (node, edge, path) held by the
//! [`SelectionController`], so switching views never loses it.
//!
//! ## Architecture
//!
//! ```text
//! signals ──► GraphBuilder ──► InvestigationGraph ──► render_view(mode) ──► view-model
//!                                       ▲                      │
//!                              InvestigationWorkspace ◄── clicks (ViewCallbacks)
//!                                       │
//!                               Storage (SQLite)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use investigation_graph::{build_graph_from_signals, render_view, Selection, ViewMode, ViewProps};
//! use investigation_graph::model::{InvestigationSignal, InvestigationThread, Relation};
//!
//! let thread = InvestigationThread::new("Grain corridor", "Exports resume by Q3");
//! let signals = vec![
//!     InvestigationSignal::new("s1", "Reuters", "Ports reopen.", Relation::Supports).with_date("2024-01-01"),
//!     InvestigationSignal::new("s2", "AP", "Insurers pull cover.", Relation::Weakens).with_date("2024-01-05"),
//! ];
//! let graph = build_graph_from_signals(&thread, &signals);
//! let selection = Selection::default();
//! let view = render_view(ViewMode::Flow, &ViewProps::new(&graph, &selection));
//! println!("{}", view);
//! ```

/// Command-line host.
pub mod cli;
/// Configuration management.
pub mod config;
/// Error types and result aliases for the application.
pub mod error;
/// Evidence graph types and construction.
pub mod graph;
/// Investigation threads, signals and messages.
pub mod model;
/// Selection state shared across views.
pub mod selection;
/// SQLite storage layer for persistence.
pub mod storage;
/// Flow, timeline and map renderers.
pub mod views;
/// Host-side owner of thread, signals, graph and selection.
pub mod workspace;

pub use config::{Config, ViewPreferences};
pub use error::{AppError, AppResult};
pub use graph::{build_graph_from_signals, GraphBuilder, GraphConfig, InvestigationGraph};
pub use selection::SelectionController;
pub use views::{
    render_flow, render_map, render_timeline, render_view, ClickTarget, RenderedView, Selection,
    ViewCallbacks, ViewMode, ViewProps,
};
pub use workspace::InvestigationWorkspace;
