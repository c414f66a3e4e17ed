//! Storage layer for investigation persistence.
//!
//! Threads are mutable (assessment and confidence change as the chat goes
//! on); signals and messages are append-only. The graph itself is never
//! stored: it is rebuilt from the thread and its signals on every load.

mod sqlite;

pub use sqlite::SqliteStorage;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{StorageError, StorageResult};
use crate::model::{
    InvestigationBundle, InvestigationMessage, InvestigationSignal, InvestigationThread,
    RawSignal, SignalRecord,
};

/// Persistence operations the investigation host needs.
#[async_trait]
pub trait Storage: Send + Sync {
    // Thread operations

    /// Create a new thread.
    async fn create_thread(&self, thread: &InvestigationThread) -> StorageResult<()>;
    /// Get a thread by ID.
    async fn get_thread(&self, id: &str) -> StorageResult<Option<InvestigationThread>>;
    /// Update an existing thread. Fails with `ThreadNotFound` when absent.
    async fn update_thread(&self, thread: &InvestigationThread) -> StorageResult<()>;
    /// List threads, most recently updated first.
    async fn list_threads(&self) -> StorageResult<Vec<InvestigationThread>>;
    /// Delete a thread with its signals and messages.
    async fn delete_thread(&self, id: &str) -> StorageResult<()>;

    // Signal operations (append-only)

    /// Append a signal to a thread. A repeated signal id is `DuplicateSignal`.
    async fn append_signal(
        &self,
        thread_id: &str,
        signal: &InvestigationSignal,
    ) -> StorageResult<()>;
    /// Signals of a thread in the order they were appended.
    async fn get_thread_signals(&self, thread_id: &str) -> StorageResult<Vec<InvestigationSignal>>;
    /// Number of signals stored for a thread.
    async fn count_thread_signals(&self, thread_id: &str) -> StorageResult<u64>;

    // Message operations (append-only)

    /// Append a chat message. Message ids are unique across all threads; a
    /// repeated id is `DuplicateMessage`.
    async fn append_message(&self, message: &InvestigationMessage) -> StorageResult<()>;
    /// Messages of a thread, oldest first.
    async fn get_thread_messages(&self, thread_id: &str)
        -> StorageResult<Vec<InvestigationMessage>>;
}

/// Outcome of [`import_bundle`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub thread_id: String,
    /// Whether the thread already existed and was updated in place.
    pub thread_updated: bool,
    pub signals_added: usize,
    pub signals_duplicate: usize,
    pub signals_rejected: usize,
    pub messages_added: usize,
    pub messages_duplicate: usize,
}

/// Store a bundle: upsert the thread, then append its signals and messages.
///
/// Malformed signals are skipped. Signals and messages already stored are
/// left alone, so importing the same bundle twice adds nothing the second
/// time. Message ids already used by another thread are skipped too.
pub async fn import_bundle<S>(storage: &S, bundle: &InvestigationBundle) -> StorageResult<ImportReport>
where
    S: Storage + ?Sized,
{
    let thread = &bundle.thread;
    let mut report = ImportReport {
        thread_id: thread.id.clone(),
        ..Default::default()
    };

    if storage.get_thread(&thread.id).await?.is_some() {
        storage.update_thread(thread).await?;
        report.thread_updated = true;
    } else {
        storage.create_thread(thread).await?;
    }

    for (index, raw) in bundle.signals.iter().enumerate() {
        let signal = match raw.validate() {
            Ok(signal) => signal,
            Err(rejection) => {
                warn!(thread_id = %thread.id, index, reason = %rejection, "Skipping malformed signal");
                report.signals_rejected += 1;
                continue;
            }
        };
        match storage.append_signal(&thread.id, &signal).await {
            Ok(()) => report.signals_added += 1,
            Err(StorageError::DuplicateSignal { signal_id }) => {
                debug!(thread_id = %thread.id, signal_id = %signal_id, "Signal already stored");
                report.signals_duplicate += 1;
            }
            Err(e) => return Err(e),
        }
    }

    for message in &bundle.messages {
        let mut message = message.clone();
        message.thread_id = thread.id.clone();
        match storage.append_message(&message).await {
            Ok(()) => report.messages_added += 1,
            Err(StorageError::DuplicateMessage { message_id }) => {
                debug!(thread_id = %thread.id, message_id = %message_id, "Message already stored");
                report.messages_duplicate += 1;
            }
            Err(e) => return Err(e),
        }
    }

    Ok(report)
}

/// Load a stored thread back into bundle form.
pub async fn load_bundle<S>(storage: &S, thread_id: &str) -> StorageResult<InvestigationBundle>
where
    S: Storage + ?Sized,
{
    let thread = storage
        .get_thread(thread_id)
        .await?
        .ok_or_else(|| StorageError::ThreadNotFound {
            thread_id: thread_id.to_string(),
        })?;
    let signals = storage
        .get_thread_signals(thread_id)
        .await?
        .iter()
        .map(RawSignal::from)
        .collect();
    let messages = storage.get_thread_messages(thread_id).await?;

    Ok(InvestigationBundle {
        thread,
        signals,
        messages,
    })
}
