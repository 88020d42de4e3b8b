mod common;

use std::sync::Arc;

use helpdesk_rag::domain::errors::RagError;
use helpdesk_rag::domain::models::{EmbeddingStatus, FaqRecord, ItemKind, PublishStatus};
use helpdesk_rag::domain::ports::EmbeddingStatusStore;

use common::{document, Harness, PanickingProvider, TEST_COLLECTION};

#[tokio::test]
async fn test_document_moves_through_processing_to_completed() {
    let harness = Harness::with_hashing(32);
    let record = document(1, 7, "Refunds are issued within 7 days", PublishStatus::Published);
    harness.documents.insert(record.clone());

    harness.pipeline().embed_document(&record).await.unwrap();

    assert_eq!(
        harness.documents.status_writes(),
        vec![(1, EmbeddingStatus::Processing), (1, EmbeddingStatus::Completed)]
    );
    let rows = harness.database.rows(TEST_COLLECTION);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].document_id, "1");
    assert_eq!(rows[0].knowledge_base_id, "7");
}

#[tokio::test]
async fn test_faq_without_knowledge_base_is_indexed_under_zero() {
    let harness = Harness::with_hashing(32);
    let faq = FaqRecord {
        id: 5,
        knowledge_base_id: None,
        question: "Can I change my delivery address?".to_string(),
        answer: "Yes, until the order ships.".to_string(),
        embedding_status: EmbeddingStatus::Pending,
    };
    harness.faqs.insert(faq.clone());

    harness.pipeline().embed_faq(&faq).await.unwrap();

    let rows = harness.database.rows(TEST_COLLECTION);
    assert_eq!(rows[0].knowledge_base_id, "0");
    assert!(rows[0].content.contains("delivery address"));
    assert_eq!(
        harness.faqs.embedding_status(5).await.unwrap(),
        Some(EmbeddingStatus::Completed)
    );
}

#[tokio::test]
async fn test_batch_length_mismatch_writes_nothing() {
    let harness = Harness::with_hashing(32);
    for id in 1..=3 {
        harness
            .documents
            .insert(document(id, 1, "text", PublishStatus::Published));
    }

    let err = harness
        .pipeline()
        .embed_many(
            ItemKind::Document,
            &[1, 2, 3],
            &[1, 1, 1],
            &["first".to_string(), "second".to_string()],
        )
        .await
        .unwrap_err();

    assert!(matches!(err, RagError::LengthMismatch(_)));
    assert!(harness.documents.status_writes().is_empty());
    assert_eq!(harness.database.row_count(TEST_COLLECTION), 0);
}

#[tokio::test]
async fn test_panicking_provider_marks_document_failed() {
    let harness = Harness::new(Arc::new(PanickingProvider));
    let record = document(1, 1, "Refunds are issued within 7 days", PublishStatus::Published);
    harness.documents.insert(record.clone());

    let err = harness.pipeline().embed_document(&record).await.unwrap_err();

    assert!(matches!(err, RagError::Panicked(ref message) if message.contains("crashed")));
    assert_eq!(
        harness.documents.status_writes(),
        vec![(1, EmbeddingStatus::Processing), (1, EmbeddingStatus::Failed)]
    );
}

#[tokio::test]
async fn test_batch_import_skips_completed_documents() {
    let harness = Harness::with_hashing(32);
    let mut done = document(1, 1, "Already embedded", PublishStatus::Published);
    done.embedding_status = EmbeddingStatus::Completed;
    harness.documents.insert(done);
    harness
        .documents
        .insert(document(2, 1, "Refunds are issued within 7 days", PublishStatus::Published));
    harness
        .documents
        .insert(document(3, 1, "Shipping takes three business days", PublishStatus::Draft));

    let report = harness
        .pipeline()
        .embed_documents_batch(&[1, 2, 3])
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.skipped, vec![1]);
    assert_eq!(report.embedded, vec![2, 3]);
    assert_eq!(harness.database.row_count(TEST_COLLECTION), 2);
    assert_eq!(
        harness.documents.embedding_status(3).await.unwrap(),
        Some(EmbeddingStatus::Completed)
    );
}

#[tokio::test]
async fn test_batch_import_failure_reports_every_item() {
    let harness = Harness::new(Arc::new(PanickingProvider));
    for id in [4, 5] {
        harness
            .documents
            .insert(document(id, 1, "Gift cards never expire", PublishStatus::Published));
    }

    let report = harness
        .pipeline()
        .embed_documents_batch(&[4, 5])
        .await
        .unwrap();

    assert!(!report.is_success());
    assert_eq!(report.failed, vec![4, 5]);
    assert_eq!(report.errors.len(), 2);
    for id in [4, 5] {
        assert_eq!(
            harness.documents.embedding_status(id).await.unwrap(),
            Some(EmbeddingStatus::Failed)
        );
    }
}

#[tokio::test]
async fn test_delete_removes_vectors() {
    let harness = Harness::with_hashing(32);
    harness
        .index(document(1, 1, "Refunds are issued within 7 days", PublishStatus::Published))
        .await;
    harness
        .index(document(2, 1, "Shipping takes three business days", PublishStatus::Published))
        .await;

    harness.pipeline().delete_item(1).await.unwrap();

    let remaining: Vec<String> = harness
        .database
        .rows(TEST_COLLECTION)
        .into_iter()
        .map(|row| row.document_id)
        .collect();
    assert_eq!(remaining, vec!["2".to_string()]);
}

#[tokio::test]
async fn test_completed_document_cannot_jump_back_to_processing() {
    let harness = Harness::with_hashing(32);
    let mut record = document(1, 1, "Refunds are issued within 7 days", PublishStatus::Published);
    record.embedding_status = EmbeddingStatus::Completed;
    harness.documents.insert(record.clone());

    let err = harness.pipeline().embed_document(&record).await.unwrap_err();

    assert!(matches!(
        err,
        RagError::InvalidStatusTransition {
            id: 1,
            from: EmbeddingStatus::Completed,
            to: EmbeddingStatus::Processing
        }
    ));
    assert!(harness.documents.status_writes().is_empty());
    assert_eq!(harness.database.row_count(TEST_COLLECTION), 0);
}

#[tokio::test]
async fn test_batch_that_cannot_start_fails_items_already_started() {
    let harness = Harness::with_hashing(32);
    harness
        .documents
        .insert(document(1, 1, "Refunds are issued within 7 days", PublishStatus::Published));
    let mut done = document(2, 1, "Already embedded", PublishStatus::Published);
    done.embedding_status = EmbeddingStatus::Completed;
    harness.documents.insert(done);

    let err = harness
        .pipeline()
        .embed_many(
            ItemKind::Document,
            &[1, 2],
            &[1, 1],
            &["Refunds are issued within 7 days".to_string(), "Already embedded".to_string()],
        )
        .await
        .unwrap_err();

    assert!(matches!(err, RagError::InvalidStatusTransition { id: 2, .. }));
    assert_eq!(
        harness.documents.embedding_status(1).await.unwrap(),
        Some(EmbeddingStatus::Failed)
    );
    assert_eq!(
        harness.documents.embedding_status(2).await.unwrap(),
        Some(EmbeddingStatus::Completed)
    );
    assert_eq!(harness.database.row_count(TEST_COLLECTION), 0);
}

#[tokio::test]
async fn test_batch_import_retries_failed_documents() {
    let harness = Harness::with_hashing(32);
    let mut failed = document(1, 1, "Refunds are issued within 7 days", PublishStatus::Published);
    failed.embedding_status = EmbeddingStatus::Failed;
    harness.documents.insert(failed);

    let report = harness.pipeline().embed_documents_batch(&[1]).await.unwrap();

    assert_eq!(report.embedded, vec![1]);
    assert_eq!(
        harness.documents.status_writes(),
        vec![
            (1, EmbeddingStatus::Pending),
            (1, EmbeddingStatus::Processing),
            (1, EmbeddingStatus::Completed)
        ]
    );
}

#[tokio::test]
async fn test_re_embedding_replaces_the_stored_chunk() {
    let harness = Harness::with_hashing(32);
    harness
        .index(document(1, 1, "Refunds are processed within 5 business days.", PublishStatus::Published))
        .await;

    let mut edited = document(1, 1, "Shipping takes two weeks.", PublishStatus::Published);
    edited.embedding_status = EmbeddingStatus::Completed;
    harness.documents.insert(edited);
    let pipeline = harness.pipeline();
    pipeline.mark_pending(ItemKind::Document, 1).await.unwrap();
    pipeline.embed_stored(ItemKind::Document, 1).await.unwrap();

    let rows = harness.database.rows(TEST_COLLECTION);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].content, "Shipping takes two weeks.");
}
