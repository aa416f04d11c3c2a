use ora2pg_assist_core::{ClientConfig, MigrationFile, MigrationOptions, ObjectType, WorkflowStatus};
use ora2pg_assist_storage::traits::FileStore;
use uuid::Uuid;

use super::fakes::{object, FakeCorrector, FakeExporter, FakeTarget};
use super::Harness;
use crate::ServiceError;

fn exporter() -> FakeExporter {
    FakeExporter::with_objects(vec![
        object("emp", ObjectType::Table, None),
        object("dept", ObjectType::Table, None),
        object("idx_emp", ObjectType::Index, Some("emp")),
    ])
}

async fn migrated(h: &Harness) -> Uuid {
    let client = h.client().await;
    let session = h.orchestrator.run_migration(client.id, MigrationOptions::default()).await.unwrap();
    assert_eq!(session.status, WorkflowStatus::Completed);
    session.id
}

/// Session whose validated files are written directly, bypassing the workflow.
async fn with_validated(h: &Harness, names: &[&str]) -> Uuid {
    let client = h.client().await;
    let session = h.sessions.create_session(client.id, None, MigrationOptions::default()).await.unwrap();
    let files: Vec<MigrationFile> = names
        .iter()
        .zip(0_u32..)
        .map(|(name, ordinal)| {
            let mut file = MigrationFile::new(session.id, ordinal, (*name).to_owned(), ObjectType::Table, None);
            file.mark_validated(None);
            file
        })
        .collect();
    h.storage.insert_files(&files).await.unwrap();
    session.id
}

#[tokio::test]
async fn execute_without_confirm_touches_nothing() {
    let h = Harness::new(exporter(), Some(FakeCorrector::default()), FakeTarget::default());
    let session_id = migrated(&h).await;
    let executed_before = h.target.executed().len();

    let err = h.rollback.execute(session_id, false).await.unwrap_err();

    assert!(matches!(err, ServiceError::ConfirmationRequired(_)));
    assert!(err.is_bad_request());
    assert_eq!(h.target.executed().len(), executed_before);
    assert!(h.target.objects().contains("emp"));
}

#[tokio::test]
async fn execute_without_confirm_rejects_unknown_session_the_same_way() {
    let h = Harness::new(exporter(), None, FakeTarget::default());
    let err = h.rollback.execute(Uuid::new_v4(), false).await.unwrap_err();
    assert!(matches!(err, ServiceError::ConfirmationRequired(_)));
}

#[tokio::test]
async fn preview_lists_dependents_first() {
    let h = Harness::new(exporter(), Some(FakeCorrector::default()), FakeTarget::default());
    let session_id = migrated(&h).await;

    let plan = h.rollback.preview(session_id).await.unwrap();

    let names: Vec<&str> = plan.iter().map(|r| r.object_name.as_str()).collect();
    assert_eq!(names, vec!["idx_emp", "dept", "emp"]);
    assert_eq!(plan[0].drop_statement, "DROP INDEX IF EXISTS \"idx_emp\" CASCADE;");
    assert_eq!(plan[2].drop_statement, "DROP TABLE IF EXISTS \"emp\" CASCADE;");
}

#[tokio::test]
async fn preview_skips_objects_that_never_applied() {
    let mut exporter = exporter();
    exporter.failing.insert("dept".to_owned());
    let h = Harness::new(exporter, Some(FakeCorrector::default()), FakeTarget::default());
    let client = h.client().await;
    let session = h.orchestrator.run_migration(client.id, MigrationOptions::default()).await.unwrap();

    let plan = h.rollback.preview(session.id).await.unwrap();
    assert_eq!(plan.len(), 2);
    assert!(plan.iter().all(|r| r.object_name != "dept"));
}

#[tokio::test]
async fn preview_of_unknown_session_is_not_found() {
    let h = Harness::new(exporter(), None, FakeTarget::default());
    let err = h.rollback.preview(Uuid::new_v4()).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn confirmed_execute_drops_everything() {
    let h = Harness::new(exporter(), Some(FakeCorrector::default()), FakeTarget::default());
    let session_id = migrated(&h).await;

    let outcome = h.rollback.execute(session_id, true).await.unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.applied_count, 3);
    assert!(outcome.error.is_none());
    assert!(h.target.objects().is_empty());
}

#[tokio::test]
async fn failure_mid_sequence_rolls_back_the_transaction() {
    let h = Harness::new(FakeExporter::default(), None, FakeTarget::with_objects(&["a", "c"]));
    let session_id = with_validated(&h, &["a", "REJECT_ME", "c"]).await;

    let outcome = h.rollback.execute(session_id, true).await.unwrap();

    assert!(!outcome.success);
    assert_eq!(outcome.applied_count, 1);
    let error = outcome.error.unwrap();
    assert!(error.starts_with("statement 2 failed"), "{error}");
    let objects = h.target.objects();
    assert!(objects.contains("a"));
    assert!(objects.contains("c"));
}

#[tokio::test]
async fn nothing_validated_is_a_successful_noop() {
    let h = Harness::new(FakeExporter::default(), None, FakeTarget::default());
    let session_id = with_validated(&h, &[]).await;

    let outcome = h.rollback.execute(session_id, true).await.unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.applied_count, 0);
    assert!(h.target.executed().is_empty());
}

#[tokio::test]
async fn unreachable_target_reports_failure() {
    let target = FakeTarget { unreachable: true, ..FakeTarget::default() };
    let h = Harness::new(FakeExporter::default(), None, target);
    let session_id = with_validated(&h, &["a"]).await;

    let outcome = h.rollback.execute(session_id, true).await.unwrap();

    assert!(!outcome.success);
    assert_eq!(outcome.applied_count, 0);
    assert!(outcome.error.unwrap().contains("connection refused"));
}

#[tokio::test]
async fn missing_target_dsn_is_not_configured() {
    let h = Harness::new(FakeExporter::default(), None, FakeTarget::default());
    let client = h.client_with(ClientConfig::default()).await;
    let session = h.sessions.create_session(client.id, None, MigrationOptions::default()).await.unwrap();

    let err = h.rollback.execute(session.id, true).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotConfigured(_)));
}

#[tokio::test]
async fn download_has_header_and_statements() {
    let h = Harness::new(exporter(), Some(FakeCorrector::default()), FakeTarget::default());
    let session_id = migrated(&h).await;

    let script = h.rollback.download(session_id).await.unwrap();

    assert_eq!(script.file_name, format!("rollback_session_{session_id}.sql"));
    assert!(script.content.starts_with(&format!("-- Rollback script for migration session {session_id}")));
    assert!(script.content.contains("-- 3 statement(s)"));
    let index_pos = script.content.find("DROP INDEX").unwrap();
    let table_pos = script.content.find("DROP TABLE").unwrap();
    assert!(index_pos < table_pos);
}
