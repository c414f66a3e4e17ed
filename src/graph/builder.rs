//! Graph construction: signals in, nodes/edges/paths out.
//!
//! Construction runs in three passes:
//! - Nodes: validate each record, fold signals describing the same event
//!   with the same impact
//! - Edges: link consecutive dated nodes in chronological order
//! - Paths: split the edge chain into supporting / weakening narratives
//!
//! The builder is pure and total. Malformed records are logged and skipped;
//! the same input always yields the same graph, ordering included.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::time::Instant;

use chrono::NaiveDateTime;
use tracing::{debug, warn};

use super::{
    GraphConfig, InvestigationGraph, InvestigationGraphEdge, InvestigationGraphNode,
    InvestigationPath, PathStatus,
};
use crate::model::{
    normalize_confidence, parse_signal_date, InvestigationThread, Relation, SignalRecord,
};

#[cfg(test)]
#[path = "builder_tests.rs"]
mod builder_tests;

/// Signals folded into one node beyond which evidence weight stops growing.
const EVIDENCE_SATURATION: usize = 3;

/// Build the evidence graph with the default [`GraphConfig`].
pub fn build_graph_from_signals<S: SignalRecord>(
    thread: &InvestigationThread,
    signals: &[S],
) -> InvestigationGraph {
    GraphBuilder::default().build(thread, signals)
}

/// Order nodes by date ascending; undated nodes last, input order kept on ties.
///
/// Dates that do not parse count as missing.
pub fn chronological_order(nodes: &[InvestigationGraphNode]) -> Vec<&InvestigationGraphNode> {
    let mut keyed: Vec<(Option<NaiveDateTime>, &InvestigationGraphNode)> = nodes
        .iter()
        .map(|n| (n.date.as_deref().and_then(parse_signal_date), n))
        .collect();
    // slice::sort_by is stable
    keyed.sort_by(|(a, _), (b, _)| compare_dates(*a, *b));
    keyed.into_iter().map(|(_, n)| n).collect()
}

/// Compare optional timestamps with missing values last.
pub(crate) fn compare_dates(a: Option<NaiveDateTime>, b: Option<NaiveDateTime>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Truncate to at most `max_chars` characters, ending with an ellipsis when cut.
pub(crate) fn truncate_label(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{}…", cut.trim_end())
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// First sentence of the first non-blank line.
fn headline(summary: &str, max_chars: usize) -> String {
    let line = summary
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("");
    let end = line
        .char_indices()
        .find(|&(i, c)| {
            matches!(c, '.' | '!' | '?') && line[i + c.len_utf8()..].starts_with(' ')
        })
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(line.len());
    truncate_label(&line[..end], max_chars)
}

/// Graph builder carrying construction settings.
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    config: GraphConfig,
}

/// Run of chain edges that tell one story.
struct Segment<'a> {
    polarity: Relation,
    edges: Vec<&'a InvestigationGraphEdge>,
    supports: usize,
    dead: bool,
}

impl Segment<'_> {
    fn conflicts_with(&self, relation: Relation) -> bool {
        matches!(
            (self.polarity, relation),
            (Relation::Supports, Relation::Weakens) | (Relation::Weakens, Relation::Supports)
        )
    }
}

impl GraphBuilder {
    /// Create a builder with explicit settings.
    pub fn new(config: GraphConfig) -> Self {
        Self { config }
    }

    /// Settings in use.
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Build the graph for `thread` from `signals`.
    pub fn build<S: SignalRecord>(
        &self,
        thread: &InvestigationThread,
        signals: &[S],
    ) -> InvestigationGraph {
        let start = Instant::now();

        let nodes = self.derive_nodes(signals);
        let edges = self.infer_edges(&nodes);
        let paths = self.derive_paths(thread, &nodes, &edges);

        debug!(
            thread_id = %thread.id,
            signals = signals.len(),
            nodes = nodes.len(),
            edges = edges.len(),
            paths = paths.len(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "Built investigation graph"
        );

        InvestigationGraph {
            nodes,
            edges,
            paths,
        }
    }

    fn derive_nodes<S: SignalRecord>(&self, signals: &[S]) -> Vec<InvestigationGraphNode> {
        let default_confidence = normalize_confidence(self.config.default_confidence);
        let mut nodes: Vec<InvestigationGraphNode> = Vec::with_capacity(signals.len());
        let mut seen_ids: HashSet<String> = HashSet::new();
        let mut by_event: HashMap<(Option<String>, String, Relation), usize> = HashMap::new();

        for (index, record) in signals.iter().enumerate() {
            let signal = match record.validate() {
                Ok(signal) => signal,
                Err(reason) => {
                    warn!(index, reason = %reason, "Skipping malformed signal");
                    continue;
                }
            };

            if !seen_ids.insert(signal.id.clone()) {
                debug!(signal_id = %signal.id, "Ignoring repeated signal id");
                continue;
            }

            let label = headline(&signal.summary, self.config.label_chars);
            let confidence = signal.confidence.unwrap_or(default_confidence);
            let mut sources = vec![signal.source.clone()];
            if let Some(url) = &signal.url {
                if !sources.contains(url) {
                    sources.push(url.clone());
                }
            }

            // Signals that disagree on the hypothesis stay separate nodes.
            let event_key = (
                signal.date.clone(),
                label.to_lowercase(),
                signal.impact_on_hypothesis,
            );
            if let Some(&existing) = by_event.get(&event_key) {
                let node = &mut nodes[existing];
                debug!(
                    signal_id = %signal.id,
                    node_id = %node.id,
                    "Folding signal into existing event node"
                );
                node.signal_ids.push(signal.id.clone());
                for source in sources {
                    if !node.sources.contains(&source) {
                        node.sources.push(source);
                    }
                }
                node.confidence = node.confidence.max(confidence);
                continue;
            }

            by_event.insert(event_key, nodes.len());
            nodes.push(InvestigationGraphNode {
                id: signal.id.clone(),
                label,
                date: signal.date.clone(),
                confidence,
                sources,
                impact: signal.impact_on_hypothesis,
                signal_ids: vec![signal.id.clone()],
            });
        }

        nodes
    }

    fn edge_strength(node: &InvestigationGraphNode) -> f64 {
        let weight =
            node.signal_ids.len().min(EVIDENCE_SATURATION) as f64 / EVIDENCE_SATURATION as f64;
        round3((0.6 * node.confidence + 0.4 * weight).clamp(0.0, 1.0))
    }

    fn infer_edges(&self, nodes: &[InvestigationGraphNode]) -> Vec<InvestigationGraphEdge> {
        let dated: Vec<&InvestigationGraphNode> = chronological_order(nodes)
            .into_iter()
            .filter(|n| n.date.as_deref().and_then(parse_signal_date).is_some())
            .collect();

        dated
            .windows(2)
            .map(|pair| {
                let (earlier, later) = (pair[0], pair[1]);
                InvestigationGraphEdge {
                    from: earlier.id.clone(),
                    to: later.id.clone(),
                    relation: later.impact,
                    strength: Self::edge_strength(later),
                    confidence: later.confidence,
                }
            })
            .collect()
    }

    fn derive_paths(
        &self,
        thread: &InvestigationThread,
        nodes: &[InvestigationGraphNode],
        edges: &[InvestigationGraphEdge],
    ) -> Vec<InvestigationPath> {
        let mut segments: Vec<Segment<'_>> = Vec::new();

        for edge in edges {
            let needs_new = match segments.last_mut() {
                None => true,
                Some(current) if current.conflicts_with(edge.relation) => {
                    if edge.relation == Relation::Weakens
                        && current.supports >= 2
                        && edge.strength >= self.config.dead_path_strength
                    {
                        current.dead = true;
                    }
                    true
                }
                Some(_) => false,
            };

            if needs_new {
                segments.push(Segment {
                    polarity: Relation::Neutral,
                    edges: Vec::new(),
                    supports: 0,
                    dead: false,
                });
            }

            if let Some(current) = segments.last_mut() {
                if current.polarity == Relation::Neutral {
                    current.polarity = edge.relation;
                }
                if edge.relation == Relation::Supports {
                    current.supports += 1;
                }
                current.edges.push(edge);
            }
        }

        let confidence_by_id: HashMap<&str, f64> =
            nodes.iter().map(|n| (n.id.as_str(), n.confidence)).collect();
        let hypothesis = truncate_label(thread.hypothesis_label(), self.config.label_chars);

        segments
            .into_iter()
            .enumerate()
            .filter_map(|(index, segment)| {
                let first = segment.edges.first()?;
                let mut members = vec![first.from.clone()];
                members.extend(segment.edges.iter().map(|e| e.to.clone()));

                let total: f64 = members
                    .iter()
                    .filter_map(|id| confidence_by_id.get(id.as_str()))
                    .sum();
                let confidence = round3(total / members.len() as f64);

                let prefix = match segment.polarity {
                    Relation::Supports => "Supports",
                    Relation::Weakens => "Weakens",
                    Relation::Neutral => "Context",
                };
                let hypothesis_label = if hypothesis.is_empty() {
                    prefix.to_string()
                } else {
                    format!("{}: {}", prefix, hypothesis)
                };

                Some(InvestigationPath {
                    id: format!("path-{}", index + 1),
                    hypothesis_label,
                    nodes: members,
                    status: if segment.dead {
                        PathStatus::Dead
                    } else {
                        PathStatus::Active
                    },
                    confidence,
                })
            })
            .collect()
    }
}
