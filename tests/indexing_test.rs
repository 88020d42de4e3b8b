mod common;

use helpdesk_rag::domain::errors::RagError;
use helpdesk_rag::domain::models::{EmbeddingStatus, FaqRecord, PublishStatus};
use helpdesk_rag::domain::ports::EmbeddingStatusStore;

use common::{document, Harness, TEST_COLLECTION};

fn contents(harness: &Harness) -> Vec<(String, String)> {
    let mut rows: Vec<(String, String)> = harness
        .database
        .rows(TEST_COLLECTION)
        .into_iter()
        .map(|row| (row.document_id, row.content))
        .collect();
    rows.sort();
    rows
}

#[tokio::test]
async fn test_created_document_is_pending_before_embedding_runs() {
    common::setup_test_logging();
    let harness = Harness::with_hashing(32);
    let executor = harness.executor();
    let triggers = harness.triggers(executor.clone());
    let mut record = document(1, 3, "Refunds are processed within 5 business days.", PublishStatus::Published);
    record.embedding_status = EmbeddingStatus::Failed;
    harness.documents.insert(record.clone());

    let handle = triggers.on_document_saved(None, &record).await.unwrap();

    assert_eq!(handle.unwrap().name, "embed-document-1");
    assert_eq!(harness.documents.status_writes()[0], (1, EmbeddingStatus::Pending));

    executor.shutdown().await;

    assert_eq!(
        harness.documents.status_writes(),
        vec![
            (1, EmbeddingStatus::Pending),
            (1, EmbeddingStatus::Processing),
            (1, EmbeddingStatus::Completed)
        ]
    );
    assert_eq!(
        contents(&harness),
        vec![("1".to_string(), "Refunds are processed within 5 business days.".to_string())]
    );
    assert_eq!(executor.stats().succeeded, 1);
}

#[tokio::test]
async fn test_edited_body_replaces_the_indexed_chunk() {
    let harness = Harness::with_hashing(32);
    let original = document(1, 3, "Refunds are processed within 5 business days.", PublishStatus::Published);
    harness.index(original.clone()).await;
    harness
        .index(document(2, 3, "Gift cards never expire", PublishStatus::Published))
        .await;

    let mut edited = original.clone();
    edited.content = "Shipping takes two weeks.".to_string();
    edited.embedding_status = EmbeddingStatus::Completed;
    harness.documents.insert(edited.clone());

    let executor = harness.executor();
    let triggers = harness.triggers(executor.clone());
    triggers
        .on_document_saved(Some(&original), &edited)
        .await
        .unwrap()
        .expect("changed body should queue embedding");
    executor.shutdown().await;

    assert_eq!(
        contents(&harness),
        vec![
            ("1".to_string(), "Shipping takes two weeks.".to_string()),
            ("2".to_string(), "Gift cards never expire".to_string()),
        ]
    );
    assert_eq!(
        harness.documents.embedding_status(1).await.unwrap(),
        Some(EmbeddingStatus::Completed)
    );
}

#[tokio::test]
async fn test_unchanged_body_is_not_re_embedded() {
    let harness = Harness::with_hashing(32);
    let mut record = document(1, 3, "Refunds are processed within 5 business days.", PublishStatus::Published);
    record.embedding_status = EmbeddingStatus::Completed;
    harness.documents.insert(record.clone());

    let mut retitled = record.clone();
    retitled.title = "Refund timing".to_string();
    let executor = harness.executor();
    let triggers = harness.triggers(executor.clone());

    let handle = triggers.on_document_saved(Some(&record), &retitled).await.unwrap();
    executor.shutdown().await;

    assert!(handle.is_none());
    assert!(harness.documents.status_writes().is_empty());
    assert_eq!(executor.stats().submitted, 0);
}

#[tokio::test]
async fn test_edited_faq_answer_is_re_embedded() {
    let harness = Harness::with_hashing(32);
    let original = FaqRecord {
        id: 8,
        knowledge_base_id: Some(2),
        question: "How long does delivery take?".to_string(),
        answer: "Three business days.".to_string(),
        embedding_status: EmbeddingStatus::Pending,
    };
    harness.faqs.insert(original.clone());
    harness.pipeline().embed_faq(&original).await.unwrap();

    let mut edited = original.clone();
    edited.answer = "Two weeks during holidays.".to_string();
    edited.embedding_status = EmbeddingStatus::Completed;
    harness.faqs.insert(edited.clone());

    let executor = harness.executor();
    let triggers = harness.triggers(executor.clone());
    triggers.on_faq_saved(Some(&original), &edited).await.unwrap();
    executor.shutdown().await;

    let rows = harness.database.rows(TEST_COLLECTION);
    assert_eq!(rows.len(), 1);
    assert!(rows[0].content.contains("Two weeks during holidays."));
    assert_eq!(
        harness.faqs.embedding_status(8).await.unwrap(),
        Some(EmbeddingStatus::Completed)
    );
}

#[tokio::test]
async fn test_deleted_items_lose_their_vectors() {
    let harness = Harness::with_hashing(32);
    for (id, text) in [
        (1, "Refunds are issued within 7 days"),
        (2, "Shipping takes three business days"),
        (3, "Passwords can be reset from the login page"),
    ] {
        harness.index(document(id, 1, text, PublishStatus::Published)).await;
    }
    let executor = harness.executor();
    let triggers = harness.triggers(executor.clone());

    assert!(triggers.on_deleted(&[]).await.is_none());
    let handle = triggers.on_deleted(&[1, 3]).await;
    executor.shutdown().await;

    assert!(handle.is_some());
    let remaining: Vec<String> = contents(&harness).into_iter().map(|(id, _)| id).collect();
    assert_eq!(remaining, vec!["2".to_string()]);
}

#[tokio::test]
async fn test_closed_queue_marks_item_failed() {
    let harness = Harness::with_hashing(32);
    let record = document(1, 1, "Refunds are issued within 7 days", PublishStatus::Published);
    harness.documents.insert(record.clone());
    let executor = harness.executor();
    let triggers = harness.triggers(executor.clone());
    executor.shutdown().await;

    let err = triggers.on_document_saved(None, &record).await.unwrap_err();

    assert!(matches!(err, RagError::QueueClosed));
    assert_eq!(
        harness.documents.status_writes(),
        vec![(1, EmbeddingStatus::Pending), (1, EmbeddingStatus::Failed)]
    );
    assert_eq!(harness.database.row_count(TEST_COLLECTION), 0);
    assert!(triggers.on_deleted(&[1]).await.is_none());
}
