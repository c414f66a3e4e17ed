//! Timeline view - nodes grouped by event date.
//!
//! Groups are keyed by the exact date string and ordered chronologically;
//! undated nodes collect in a final "No date" bucket. Inside a group nodes
//! keep graph order. The timeline has no edge selection.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use super::{ClickTarget, ViewCallbacks, ViewProps, ViewState};
use crate::graph::compare_dates;
use crate::model::{confidence_percent, parse_signal_date, Relation};

/// Label of the bucket holding undated nodes.
pub const NO_DATE_LABEL: &str = "No date";

/// One node row in a date group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineItem {
    pub id: String,
    pub label: String,
    pub sources: Vec<String>,
    pub impact: Relation,
    pub confidence_percent: u8,
    pub selected: bool,
    pub in_path: bool,
}

/// Nodes sharing one date string.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineGroup {
    /// Date string, `None` for the undated bucket.
    pub date: Option<String>,
    pub label: String,
    pub items: Vec<TimelineItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineLayout {
    pub groups: Vec<TimelineGroup>,
}

impl TimelineLayout {
    /// All items, group by group.
    pub fn items(&self) -> impl Iterator<Item = &TimelineItem> {
        self.groups.iter().flat_map(|g| g.items.iter())
    }

    /// Forward a node click to `callbacks` when the node is listed.
    pub fn dispatch(&self, target: &ClickTarget, callbacks: &mut dyn ViewCallbacks) -> bool {
        match target {
            ClickTarget::Node { id } if self.items().any(|i| &i.id == id) => {
                callbacks.on_node_click(id);
                true
            }
            _ => false,
        }
    }
}

/// Group the graph's nodes by date.
pub fn render_timeline(props: &ViewProps<'_>) -> ViewState<TimelineLayout> {
    let graph = props.graph;
    if graph.is_empty() {
        return ViewState::empty();
    }
    let resolved = props.resolve();

    let mut groups: Vec<TimelineGroup> = Vec::new();
    let mut index_by_date: HashMap<Option<&str>, usize> = HashMap::new();

    for node in &graph.nodes {
        let key = node.date.as_deref();
        let index = *index_by_date.entry(key).or_insert_with(|| {
            groups.push(TimelineGroup {
                date: key.map(str::to_string),
                label: key.unwrap_or(NO_DATE_LABEL).to_string(),
                items: Vec::new(),
            });
            groups.len() - 1
        });

        groups[index].items.push(TimelineItem {
            id: node.id.clone(),
            label: node.label.clone(),
            sources: node.sources.clone(),
            impact: node.impact,
            confidence_percent: confidence_percent(node.confidence),
            selected: resolved.is_node_selected(&node.id),
            in_path: resolved.is_in_path(&node.id),
        });
    }

    // Stable: groups with equal timestamps keep first-appearance order.
    groups.sort_by(|a, b| {
        a.date
            .is_none()
            .cmp(&b.date.is_none())
            .then_with(|| {
                compare_dates(
                    a.date.as_deref().and_then(parse_signal_date),
                    b.date.as_deref().and_then(parse_signal_date),
                )
            })
    });

    ViewState::Ready {
        layout: TimelineLayout { groups },
    }
}

impl fmt::Display for TimelineLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Timeline: {} dates", self.groups.len())?;
        for group in &self.groups {
            writeln!(f, "{}", group.label)?;
            for item in &group.items {
                let mut flags = Vec::new();
                if item.selected {
                    flags.push("selected");
                }
                if item.in_path {
                    flags.push("path");
                }
                writeln!(
                    f,
                    "  - ({}) {} [{}; {}%; {}]{}",
                    item.id,
                    item.label,
                    item.impact,
                    item.confidence_percent,
                    item.sources.join(", "),
                    if flags.is_empty() {
                        String::new()
                    } else {
                        format!(" <{}>", flags.join(", "))
                    }
                )?;
            }
        }
        Ok(())
    }
}
