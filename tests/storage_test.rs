//! Integration tests for SQLite storage layer
//!
//! Tests database operations using an in-memory SQLite database, plus one
//! file-backed round trip through a temporary directory.

use chrono::Utc;
use serde_json::json;

use investigation_graph::config::DatabaseConfig;
use investigation_graph::error::StorageError;
use investigation_graph::model::{
    Assessment, InvestigationBundle, InvestigationMessage, InvestigationSignal,
    InvestigationThread, MessageRole, Relation,
};
use investigation_graph::storage::{import_bundle, load_bundle, SqliteStorage, Storage};

/// Create an in-memory storage instance for testing
async fn create_test_storage() -> SqliteStorage {
    SqliteStorage::new_in_memory()
        .await
        .expect("Failed to create in-memory storage")
}

fn thread(id: &str) -> InvestigationThread {
    InvestigationThread::new("Grain corridor", "Exports resume by Q3").with_id(id)
}

#[cfg(test)]
mod thread_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_get_thread() {
        let storage = create_test_storage().await;

        let mut original = thread("inv-1").with_assessment(Assessment::PartiallySupported, 0.64);
        original.investigative_axes = vec!["Logistics".to_string(), "Insurance".to_string()];
        original.blind_spots = vec!["Black Sea weather".to_string()];
        original.scope = Some("Q1-Q3 2024".to_string());
        storage.create_thread(&original).await.unwrap();

        let retrieved = storage.get_thread("inv-1").await.unwrap().unwrap();
        assert_eq!(retrieved.title, "Grain corridor");
        assert_eq!(retrieved.investigative_axes, original.investigative_axes);
        assert_eq!(retrieved.blind_spots, original.blind_spots);
        assert_eq!(retrieved.current_assessment, Some(Assessment::PartiallySupported));
        assert_eq!(retrieved.confidence_score, Some(0.64));
        assert_eq!(retrieved.scope.as_deref(), Some("Q1-Q3 2024"));
    }

    #[tokio::test]
    async fn test_get_nonexistent_thread() {
        let storage = create_test_storage().await;

        let result = storage.get_thread("nonexistent-id").await.unwrap();
        assert!(result.is_none(), "Should return None for nonexistent thread");
    }

    #[tokio::test]
    async fn test_update_thread() {
        let storage = create_test_storage().await;
        let mut t = thread("inv-1");
        storage.create_thread(&t).await.unwrap();

        t.current_assessment = Some(Assessment::Contradicted);
        t.confidence_score = Some(0.2);
        t.updated_at = Utc::now();
        storage.update_thread(&t).await.unwrap();

        let retrieved = storage.get_thread("inv-1").await.unwrap().unwrap();
        assert_eq!(retrieved.current_assessment, Some(Assessment::Contradicted));
        assert_eq!(retrieved.confidence_score, Some(0.2));
    }

    #[tokio::test]
    async fn test_update_missing_thread_fails() {
        let storage = create_test_storage().await;

        let result = storage.update_thread(&thread("ghost")).await;
        assert!(matches!(
            result,
            Err(StorageError::ThreadNotFound { thread_id }) if thread_id == "ghost"
        ));
    }

    #[tokio::test]
    async fn test_list_threads_most_recent_first() {
        let storage = create_test_storage().await;

        let mut older = thread("inv-old");
        older.updated_at = Utc::now() - chrono::Duration::days(2);
        let newer = thread("inv-new");
        storage.create_thread(&older).await.unwrap();
        storage.create_thread(&newer).await.unwrap();

        let ids: Vec<String> = storage
            .list_threads()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec!["inv-new", "inv-old"]);
    }

    #[tokio::test]
    async fn test_delete_thread_cascades() {
        let storage = create_test_storage().await;
        storage.create_thread(&thread("inv-1")).await.unwrap();
        storage
            .append_signal(
                "inv-1",
                &InvestigationSignal::new("s1", "Wire", "Ports reopen", Relation::Supports),
            )
            .await
            .unwrap();

        storage.delete_thread("inv-1").await.unwrap();

        assert!(storage.get_thread("inv-1").await.unwrap().is_none());
        assert_eq!(storage.count_thread_signals("inv-1").await.unwrap(), 0);
    }
}

#[cfg(test)]
mod signal_tests {
    use super::*;

    #[tokio::test]
    async fn test_signals_keep_append_order() {
        let storage = create_test_storage().await;
        storage.create_thread(&thread("inv-1")).await.unwrap();

        for (id, date) in [("s3", "2024-03-01"), ("s1", "2024-01-01"), ("s2", "2024-02-01")] {
            let signal = InvestigationSignal::new(id, "Wire", format!("Event {}", id), Relation::Neutral)
                .with_date(date);
            storage.append_signal("inv-1", &signal).await.unwrap();
        }

        let ids: Vec<String> = storage
            .get_thread_signals("inv-1")
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec!["s3", "s1", "s2"]);
        assert_eq!(storage.count_thread_signals("inv-1").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_signal_fields_round_trip() {
        let storage = create_test_storage().await;
        storage.create_thread(&thread("inv-1")).await.unwrap();

        let signal = InvestigationSignal::new("s1", "Reuters", "Insurers pull cover.", Relation::Weakens)
            .with_date("2024-01-05T09:30:00Z")
            .with_url("https://example.com/insurers")
            .with_confidence(0.8)
            .with_type("news");
        storage.append_signal("inv-1", &signal).await.unwrap();

        let stored = storage.get_thread_signals("inv-1").await.unwrap();
        assert_eq!(stored, vec![signal]);
    }

    #[tokio::test]
    async fn test_duplicate_signal_rejected() {
        let storage = create_test_storage().await;
        storage.create_thread(&thread("inv-1")).await.unwrap();

        let signal = InvestigationSignal::new("s1", "Wire", "Ports reopen", Relation::Supports);
        storage.append_signal("inv-1", &signal).await.unwrap();
        let result = storage.append_signal("inv-1", &signal).await;

        assert!(matches!(
            result,
            Err(StorageError::DuplicateSignal { signal_id }) if signal_id == "s1"
        ));
    }

    #[tokio::test]
    async fn test_same_signal_id_in_two_threads() {
        let storage = create_test_storage().await;
        storage.create_thread(&thread("inv-1")).await.unwrap();
        storage.create_thread(&thread("inv-2")).await.unwrap();

        let signal = InvestigationSignal::new("s1", "Wire", "Ports reopen", Relation::Supports);
        storage.append_signal("inv-1", &signal).await.unwrap();
        storage.append_signal("inv-2", &signal).await.unwrap();
    }

    #[tokio::test]
    async fn test_signal_for_unknown_thread_fails() {
        let storage = create_test_storage().await;

        let signal = InvestigationSignal::new("s1", "Wire", "Ports reopen", Relation::Supports);
        let result = storage.append_signal("ghost", &signal).await;
        assert!(matches!(result, Err(StorageError::ThreadNotFound { .. })));
    }
}

#[cfg(test)]
mod message_tests {
    use super::*;

    #[tokio::test]
    async fn test_messages_oldest_first() {
        let storage = create_test_storage().await;
        storage.create_thread(&thread("inv-1")).await.unwrap();

        let question = InvestigationMessage::new("inv-1", MessageRole::User, "What changed?");
        let answer = InvestigationMessage::new("inv-1", MessageRole::Assistant, "Insurers left.");
        storage.append_message(&question).await.unwrap();
        storage.append_message(&answer).await.unwrap();

        let messages = storage.get_thread_messages("inv-1").await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[1].content, "Insurers left.");
    }

    #[tokio::test]
    async fn test_duplicate_message_rejected() {
        let storage = create_test_storage().await;
        storage.create_thread(&thread("inv-1")).await.unwrap();
        storage.create_thread(&thread("inv-2")).await.unwrap();

        let question = InvestigationMessage::new("inv-1", MessageRole::User, "What changed?");
        storage.append_message(&question).await.unwrap();

        let mut reused = question.clone();
        reused.thread_id = "inv-2".to_string();
        let result = storage.append_message(&reused).await;
        assert!(matches!(
            result,
            Err(StorageError::DuplicateMessage { message_id }) if message_id == question.id
        ));
    }
}

#[cfg(test)]
mod bundle_tests {
    use super::*;

    fn bundle() -> InvestigationBundle {
        serde_json::from_value(json!({
            "thread": {
                "id": "inv-1",
                "title": "Grain corridor",
                "initial_hypothesis": "Exports resume by Q3",
                "confidence_score": 64
            },
            "signals": [
                {"id": "s1", "source": "Reuters", "summary": "Ports reopen.",
                 "date": "2024-01-01", "impact_on_hypothesis": "supports"},
                {"id": "s2", "source": "AP", "summary": "Insurers pull cover.",
                 "date": "2024-01-05", "impact_on_hypothesis": "weakens", "confidence": "0.9"},
                {"id": "s3", "summary": "No source given", "impact_on_hypothesis": "neutral"},
                {"id": 7, "source": "Wire", "summary": "Numeric id", "impact_on_hypothesis": "neutral"}
            ],
            "messages": [
                {"id": "m1", "thread_id": "other", "role": "user", "content": "Why?"}
            ]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_import_bundle_report() {
        let storage = create_test_storage().await;

        let report = import_bundle(&storage, &bundle()).await.unwrap();
        assert_eq!(report.thread_id, "inv-1");
        assert!(!report.thread_updated);
        assert_eq!(report.signals_added, 2);
        assert_eq!(report.signals_rejected, 2);
        assert_eq!(report.messages_added, 1);

        let thread = storage.get_thread("inv-1").await.unwrap().unwrap();
        assert_eq!(thread.confidence_score, Some(0.64));

        let messages = storage.get_thread_messages("inv-1").await.unwrap();
        assert_eq!(messages[0].thread_id, "inv-1");
    }

    #[tokio::test]
    async fn test_reimport_adds_nothing() {
        let storage = create_test_storage().await;
        import_bundle(&storage, &bundle()).await.unwrap();

        let report = import_bundle(&storage, &bundle()).await.unwrap();
        assert!(report.thread_updated);
        assert_eq!(report.signals_added, 0);
        assert_eq!(report.signals_duplicate, 2);
        assert_eq!(report.messages_added, 0);
        assert_eq!(report.messages_duplicate, 1);
        assert_eq!(storage.count_thread_signals("inv-1").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_message_id_used_by_another_thread_is_skipped() {
        let storage = create_test_storage().await;
        import_bundle(&storage, &bundle()).await.unwrap();

        let mut other = bundle();
        other.thread.id = "inv-2".to_string();
        let report = import_bundle(&storage, &other).await.unwrap();
        assert!(!report.thread_updated);
        assert_eq!(report.signals_added, 2);
        assert_eq!(report.messages_added, 0);
        assert_eq!(report.messages_duplicate, 1);

        assert_eq!(storage.count_thread_signals("inv-2").await.unwrap(), 2);
        assert!(storage.get_thread_messages("inv-2").await.unwrap().is_empty());
        assert_eq!(storage.get_thread_messages("inv-1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_load_bundle_round_trip() {
        let storage = create_test_storage().await;
        import_bundle(&storage, &bundle()).await.unwrap();

        let loaded = load_bundle(&storage, "inv-1").await.unwrap();
        assert_eq!(loaded.thread.id, "inv-1");
        assert_eq!(loaded.signals.len(), 2);
        assert_eq!(loaded.signals[1].confidence, Some(json!(0.9)));
        assert_eq!(loaded.messages.len(), 1);

        let missing = load_bundle(&storage, "ghost").await;
        assert!(matches!(missing, Err(StorageError::ThreadNotFound { .. })));
    }

    #[tokio::test]
    async fn test_file_database_persists_between_opens() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            path: dir.path().join("nested").join("investigations.db"),
            max_connections: 2,
        };

        {
            let storage = SqliteStorage::new(&config).await.unwrap();
            import_bundle(&storage, &bundle()).await.unwrap();
            storage.pool().close().await;
        }

        let storage = SqliteStorage::new(&config).await.unwrap();
        assert_eq!(storage.list_threads().await.unwrap().len(), 1);
        assert_eq!(storage.count_thread_signals("inv-1").await.unwrap(), 2);
    }
}
