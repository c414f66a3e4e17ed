//! Investigation domain records handed to the graph builder.
//!
//! Threads, signals and messages are produced by the chat loop and the signal
//! store; this crate only reads them. Signals arrive in a loosely typed wire
//! shape ([`RawSignal`]) and are validated into [`InvestigationSignal`] before
//! they can contribute a graph node.

use std::borrow::Cow;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::error::{InputError, InputResult};


// ============================================================================
// Relation & Assessment
// ============================================================================

/// Effect of a signal (or an edge) on the hypothesis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    /// Makes the hypothesis more plausible.
    Supports,
    /// Makes the hypothesis less plausible.
    Weakens,
    /// Context without a directional effect.
    #[default]
    Neutral,
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Relation::Supports => write!(f, "supports"),
            Relation::Weakens => write!(f, "weakens"),
            Relation::Neutral => write!(f, "neutral"),
        }
    }
}

impl std::str::FromStr for Relation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "supports" | "support" => Ok(Relation::Supports),
            "weakens" | "weaken" => Ok(Relation::Weakens),
            "neutral" => Ok(Relation::Neutral),
            _ => Err(format!("Unknown relation: {}", s)),
        }
    }
}

/// Current verdict on a thread's hypothesis, computed upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Assessment {
    Supported,
    PartiallySupported,
    Unclear,
    Contradicted,
}

impl std::fmt::Display for Assessment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Assessment::Supported => write!(f, "supported"),
            Assessment::PartiallySupported => write!(f, "partially_supported"),
            Assessment::Unclear => write!(f, "unclear"),
            Assessment::Contradicted => write!(f, "contradicted"),
        }
    }
}

impl std::str::FromStr for Assessment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "supported" => Ok(Assessment::Supported),
            "partially_supported" => Ok(Assessment::PartiallySupported),
            "unclear" => Ok(Assessment::Unclear),
            "contradicted" => Ok(Assessment::Contradicted),
            _ => Err(format!("Unknown assessment: {}", s)),
        }
    }
}

// ============================================================================
// Confidence & Dates
// ============================================================================

/// Normalize a confidence value to the canonical 0.0-1.0 scale.
///
/// Values above 1.0 are read as percentages. Non-finite input maps to 0.0.
pub fn normalize_confidence(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let scaled = if value > 1.0 { value / 100.0 } else { value };
    scaled.clamp(0.0, 1.0)
}

/// Convert a canonical confidence to a whole percentage for display.
pub fn confidence_percent(value: f64) -> u8 {
    (normalize_confidence(value) * 100.0).round() as u8
}

fn deserialize_confidence<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserializer)?;
    Ok(value.map(normalize_confidence))
}

/// Parse an ISO-8601 date or datetime into a sortable timestamp.
///
/// Accepts `YYYY-MM-DD`, naive `YYYY-MM-DDTHH:MM:SS[.fff]` and RFC 3339.
pub fn parse_signal_date(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt);
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

// ============================================================================
// Thread
// ============================================================================

/// A named investigation around one hypothesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestigationThread {
    /// Unique thread identifier.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Free-text claim under investigation.
    #[serde(default)]
    pub initial_hypothesis: String,
    /// Ordered lines of inquiry.
    #[serde(default)]
    pub investigative_axes: Vec<String>,
    /// Upstream verdict, if any.
    #[serde(default)]
    pub current_assessment: Option<Assessment>,
    /// Upstream confidence, canonical 0.0-1.0.
    #[serde(default, deserialize_with = "deserialize_confidence")]
    pub confidence_score: Option<f64>,
    /// Known gaps in the evidence.
    #[serde(default)]
    pub blind_spots: Vec<String>,
    /// Free-text scope statement.
    #[serde(default)]
    pub scope: Option<String>,
    /// Last modification time.
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl InvestigationThread {
    /// Create a new thread with a generated id.
    pub fn new(title: impl Into<String>, hypothesis: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            initial_hypothesis: hypothesis.into(),
            investigative_axes: Vec::new(),
            current_assessment: None,
            confidence_score: None,
            blind_spots: Vec::new(),
            scope: None,
            updated_at: Utc::now(),
        }
    }

    /// Set an explicit id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the upstream assessment and confidence (either scale).
    pub fn with_assessment(mut self, assessment: Assessment, confidence: f64) -> Self {
        self.current_assessment = Some(assessment);
        self.confidence_score = Some(normalize_confidence(confidence));
        self
    }

    /// Text used to label candidate paths: the hypothesis, else the title.
    pub fn hypothesis_label(&self) -> &str {
        let hypothesis = self.initial_hypothesis.trim();
        if hypothesis.is_empty() {
            self.title.trim()
        } else {
            hypothesis
        }
    }

    /// Upstream confidence as a percentage, for display.
    pub fn confidence_percent(&self) -> Option<u8> {
        self.confidence_score.map(confidence_percent)
    }
}

// ============================================================================
// Signals
// ============================================================================

fn default_signal_type() -> String {
    "signal".to_string()
}

/// A validated piece of evidence attached to a thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestigationSignal {
    /// Unique signal identifier.
    pub id: String,
    /// Free-form category (news, filing, statement, ...).
    #[serde(rename = "type", default = "default_signal_type")]
    pub signal_type: String,
    /// Publisher or origin.
    pub source: String,
    /// Excerpt text.
    pub summary: String,
    /// Link to the original document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// ISO date of the underlying event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Declared effect on the hypothesis.
    pub impact_on_hypothesis: Relation,
    /// Signal-level confidence, canonical 0.0-1.0.
    #[serde(
        default,
        deserialize_with = "deserialize_confidence",
        skip_serializing_if = "Option::is_none"
    )]
    pub confidence: Option<f64>,
}

impl InvestigationSignal {
    /// Create a signal with the required fields.
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        summary: impl Into<String>,
        impact: Relation,
    ) -> Self {
        Self {
            id: id.into(),
            signal_type: default_signal_type(),
            source: source.into(),
            summary: summary.into(),
            url: None,
            date: None,
            impact_on_hypothesis: impact,
            confidence: None,
        }
    }

    /// Set the event date.
    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    /// Set the document URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the signal confidence (either scale).
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(normalize_confidence(confidence));
        self
    }

    /// Set the category.
    pub fn with_type(mut self, signal_type: impl Into<String>) -> Self {
        self.signal_type = signal_type.into();
        self
    }
}

/// Signal as it arrives on the wire: any field may be absent or mistyped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSignal {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub signal_type: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact_on_hypothesis: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Value>,
}

impl From<&InvestigationSignal> for RawSignal {
    fn from(signal: &InvestigationSignal) -> Self {
        Self {
            id: Some(Value::from(signal.id.clone())),
            signal_type: Some(Value::from(signal.signal_type.clone())),
            source: Some(Value::from(signal.source.clone())),
            summary: Some(Value::from(signal.summary.clone())),
            url: signal.url.clone().map(Value::from),
            date: signal.date.clone().map(Value::from),
            impact_on_hypothesis: Some(Value::from(signal.impact_on_hypothesis.to_string())),
            confidence: signal.confidence.map(Value::from),
        }
    }
}

/// Why a signal record was left out of the graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalRejection {
    #[error("missing or empty field: {field}")]
    MissingField { field: &'static str },

    #[error("unrecognized impact_on_hypothesis: {value}")]
    InvalidImpact { value: String },

    #[error("signal id '{id}' contains the edge key separator '|'")]
    InvalidId { id: String },
}

/// Ids end up in `FROM|TO` edge keys, so they must not contain `|`.
fn check_id(id: &str) -> Result<(), SignalRejection> {
    if id.contains('|') {
        return Err(SignalRejection::InvalidId { id: id.to_string() });
    }
    Ok(())
}

/// A record that can be checked into a well-formed signal.
pub trait SignalRecord {
    /// Validate the record, borrowing when it is already well-formed.
    fn validate(&self) -> Result<Cow<'_, InvestigationSignal>, SignalRejection>;
}

fn required_text(value: Option<&Value>, field: &'static str) -> Result<String, SignalRejection> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(SignalRejection::MissingField { field }),
    }
}

fn optional_text(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

fn optional_number(value: Option<&Value>) -> Option<f64> {
    match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
}

impl SignalRecord for RawSignal {
    fn validate(&self) -> Result<Cow<'_, InvestigationSignal>, SignalRejection> {
        let id = required_text(self.id.as_ref(), "id")?;
        check_id(&id)?;
        let source = required_text(self.source.as_ref(), "source")?;
        let summary = required_text(self.summary.as_ref(), "summary")?;
        let impact_raw = required_text(self.impact_on_hypothesis.as_ref(), "impact_on_hypothesis")?;
        let impact_on_hypothesis = impact_raw
            .parse::<Relation>()
            .map_err(|_| SignalRejection::InvalidImpact { value: impact_raw })?;

        Ok(Cow::Owned(InvestigationSignal {
            id,
            signal_type: optional_text(self.signal_type.as_ref()).unwrap_or_else(default_signal_type),
            source,
            summary,
            url: optional_text(self.url.as_ref()),
            date: optional_text(self.date.as_ref()).filter(|d| parse_signal_date(d).is_some()),
            impact_on_hypothesis,
            confidence: optional_number(self.confidence.as_ref()).map(normalize_confidence),
        }))
    }
}

impl SignalRecord for InvestigationSignal {
    fn validate(&self) -> Result<Cow<'_, InvestigationSignal>, SignalRejection> {
        let mut trimmed = true;
        for (field, value) in [("id", &self.id), ("source", &self.source), ("summary", &self.summary)] {
            if value.trim().is_empty() {
                return Err(SignalRejection::MissingField { field });
            }
            trimmed &= value.trim().len() == value.len();
        }
        check_id(self.id.trim())?;

        let date_ok = self.date.as_deref().map_or(true, |d| parse_signal_date(d).is_some());
        let confidence_ok = self
            .confidence
            .map_or(true, |c| c == normalize_confidence(c));
        if trimmed && date_ok && confidence_ok {
            return Ok(Cow::Borrowed(self));
        }

        // Same normalisation as the raw wire path.
        let mut signal = self.clone();
        signal.id = self.id.trim().to_string();
        signal.source = self.source.trim().to_string();
        signal.summary = self.summary.trim().to_string();
        if !date_ok {
            signal.date = None;
        }
        signal.confidence = signal.confidence.map(normalize_confidence);
        Ok(Cow::Owned(signal))
    }
}

// ============================================================================
// Messages
// ============================================================================

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl std::str::FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            _ => Err(format!("Unknown message role: {}", s)),
        }
    }
}

/// One turn of the investigation chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestigationMessage {
    pub id: String,
    pub thread_id: String,
    pub role: MessageRole,
    pub content: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl InvestigationMessage {
    /// Create a message with a generated id and the current timestamp.
    pub fn new(thread_id: impl Into<String>, role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            thread_id: thread_id.into(),
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

// ============================================================================
// Bundle
// ============================================================================

/// JSON interchange file: one thread with its signals and messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestigationBundle {
    pub thread: InvestigationThread,
    #[serde(default)]
    pub signals: Vec<RawSignal>,
    #[serde(default)]
    pub messages: Vec<InvestigationMessage>,
}

impl InvestigationBundle {
    /// Parse a bundle from JSON text.
    pub fn from_json_str(json: &str) -> InputResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a bundle file.
    pub fn load(path: &Path) -> InputResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| InputError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json_str(&text)
    }
}
