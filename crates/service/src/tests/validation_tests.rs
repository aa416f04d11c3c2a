use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use super::fakes::{FakeCorrector, FakeTarget, USAGE};
use crate::{SqlCorrector, TargetError, ValidationOptions, ValidationRunner};

const OPTIONS: ValidationOptions = ValidationOptions {
    clean_slate: false,
    auto_create_ddl: true,
    self_heal_attempts: 2,
    ai_timeout: Duration::from_secs(30),
};

async fn runner(
    target: &FakeTarget,
    options: ValidationOptions,
    corrector: Option<Arc<FakeCorrector>>,
) -> ValidationRunner {
    ValidationRunner::open(
        target,
        "postgres://fake/target",
        "public",
        options,
        corrector.map(|c| c as Arc<dyn SqlCorrector>),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn applies_valid_sql_and_strips_psql_meta() {
    let target = FakeTarget::default();
    let mut runner = runner(&target, OPTIONS, None).await;

    let outcome = runner.apply("\\set ON_ERROR_STOP on\nCREATE TABLE dept (id INTEGER);").await.unwrap();

    assert!(outcome.success);
    assert!(outcome.rewritten_sql.is_none());
    assert!(outcome.ai_usage.is_empty());
    assert_eq!(target.executed(), vec!["CREATE TABLE dept (id INTEGER);".to_owned()]);
}

#[tokio::test]
async fn missing_relation_is_created_then_retried() {
    let target = FakeTarget::default();
    let corrector = Arc::new(FakeCorrector::default());
    let mut runner = runner(&target, OPTIONS, Some(Arc::clone(&corrector))).await;

    let outcome = runner.apply("CREATE VIEW emp_v AS SELECT id FROM emp;").await.unwrap();

    assert!(outcome.success, "{}", outcome.message);
    assert!(outcome.message.contains("emp"));
    assert_eq!(outcome.ai_usage, vec![USAGE]);
    assert_eq!(corrector.synth_calls.load(Ordering::SeqCst), 1);
    let objects = target.objects();
    assert!(objects.contains("emp"));
    assert!(objects.contains("emp_v"));
}

#[tokio::test]
async fn auto_create_disabled_reports_missing_relation() {
    let target = FakeTarget::default();
    let corrector = Arc::new(FakeCorrector::default());
    let options = ValidationOptions { auto_create_ddl: false, self_heal_attempts: 0, ..OPTIONS };
    let mut runner = runner(&target, options, Some(Arc::clone(&corrector))).await;

    let outcome = runner.apply("CREATE VIEW emp_v AS SELECT id FROM emp;").await.unwrap();

    assert!(!outcome.success);
    assert_eq!(outcome.message, "relation \"emp\" does not exist");
    assert_eq!(corrector.synth_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failed_retry_reports_original_error() {
    let target = FakeTarget::default();
    let corrector = Arc::new(FakeCorrector::default());
    let options = ValidationOptions { self_heal_attempts: 1, ..OPTIONS };
    let mut runner = runner(&target, options, Some(Arc::clone(&corrector))).await;

    let outcome = runner.apply("CREATE VIEW v AS SELECT REJECT FROM dept;").await.unwrap();

    assert!(!outcome.success);
    assert_eq!(outcome.message, "relation \"dept\" does not exist");
    assert_eq!(corrector.synth_calls.load(Ordering::SeqCst), 1);
    assert_eq!(corrector.fix_calls.load(Ordering::SeqCst), 1);
    assert_eq!(outcome.ai_usage.len(), 2);
}

#[tokio::test]
async fn self_heal_returns_rewritten_sql() {
    let target = FakeTarget::default();
    let corrector = Arc::new(FakeCorrector::default());
    let mut runner = runner(&target, OPTIONS, Some(Arc::clone(&corrector))).await;

    let outcome = runner.apply("CREATE TABLE t (id BROKEN INTEGER);").await.unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.rewritten_sql.as_deref(), Some("CREATE TABLE t (id INTEGER);"));
    assert!(outcome.message.contains("self-heal attempt 1"));
    assert_eq!(corrector.fix_calls.load(Ordering::SeqCst), 1);
    assert!(target.objects().contains("t"));
}

#[tokio::test(start_paused = true)]
async fn stalled_remediation_calls_time_out_with_original_error() {
    let target = FakeTarget::default();
    let corrector = Arc::new(FakeCorrector {
        slow_marker: Some("STALL".to_owned()),
        slow_delay: Duration::from_secs(3600),
        ..FakeCorrector::default()
    });
    let options = ValidationOptions { self_heal_attempts: 1, ai_timeout: Duration::from_millis(50), ..OPTIONS };
    let mut runner = runner(&target, options, Some(Arc::clone(&corrector))).await;

    let started = tokio::time::Instant::now();
    let outcome = runner.apply("CREATE VIEW v AS SELECT id AS STALL FROM emp;").await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(!outcome.success);
    assert_eq!(outcome.message, "relation \"emp\" does not exist");
    assert_eq!(corrector.synth_calls.load(Ordering::SeqCst), 1);
    assert_eq!(corrector.fix_calls.load(Ordering::SeqCst), 1);
    assert!(outcome.ai_usage.is_empty());
    assert!(!target.objects().contains("emp"));
}

#[tokio::test]
async fn self_heal_disabled_leaves_rejection() {
    let target = FakeTarget::default();
    let corrector = Arc::new(FakeCorrector::default());
    let options = ValidationOptions { self_heal_attempts: 0, ..OPTIONS };
    let mut runner = runner(&target, options, Some(Arc::clone(&corrector))).await;

    let outcome = runner.apply("CREATE TABLE t (id BROKEN INTEGER);").await.unwrap();

    assert!(!outcome.success);
    assert!(outcome.message.starts_with("operator does not exist"));
    assert_eq!(corrector.fix_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unreachable_target_is_an_error() {
    let target = FakeTarget { unreachable: true, ..FakeTarget::default() };
    let err = ValidationRunner::open(&target, "postgres://fake/target", "public", OPTIONS, None)
        .await
        .unwrap_err();
    assert!(err.is_connection());
    assert!(matches!(err, TargetError::Connection { missing_database: false, .. }));
}

#[tokio::test]
async fn clean_slate_resets_only_when_requested() {
    let target = FakeTarget::with_objects(&["leftover"]);
    runner(&target, OPTIONS, None).await;
    assert!(target.objects().contains("leftover"));
    assert_eq!(target.db.lock().unwrap().resets, 0);

    runner(&target, ValidationOptions { clean_slate: true, ..OPTIONS }, None).await;
    assert!(target.objects().is_empty());
    assert_eq!(target.db.lock().unwrap().resets, 1);
}
