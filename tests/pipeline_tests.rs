mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use common::*;
use reportsmith::ServiceError;
use reportsmith::i18n::Language;
use reportsmith::jobs::{JobKey, JobStatus, SubmitOutcome};

#[tokio::test]
async fn test_report_job_completes_with_all_flags() {
    let completion = Arc::new(ScriptedCompletion::new());
    let app = TestAppBuilder::new(completion.clone()).build();
    let jobs = &app.services.jobs;

    let outcome = jobs.submit("  Solar Energy ", "English", 3).unwrap();
    let key = match outcome {
        SubmitOutcome::Started(key) => key,
        other => panic!("unexpected outcome {:?}", other),
    };
    assert_eq!(key.to_string(), "Solar Energy||English||3");

    let progress = wait_until_finished(&app.services, &key).await;
    assert_completed(&progress);
    assert!(progress.flags.all_set());
    assert!(progress.error.is_none());

    let artifact = jobs.artifact(&key).unwrap();
    assert!(artifact.document.starts_with(b"%PDF"));
    assert_eq!(artifact.document, artifact.canonical_document);
    assert!(artifact.plain_text.starts_with("# Solar Energy\n"));
    assert!(artifact.plain_text.contains("## 1. Photovoltaics"));
    assert!(artifact.plain_text.contains("## 3. Energy Policy"));
    assert!(!artifact.plain_text.contains("Grid Integration"));
    assert!(artifact.plain_text.contains("- Costs are falling"));
}

#[tokio::test]
async fn test_concurrent_submissions_share_one_run() {
    let completion = Arc::new(ScriptedCompletion::new().with_delay(Duration::from_millis(30)));
    let app = TestAppBuilder::new(completion.clone()).build();
    let jobs = &app.services.jobs;

    let first = jobs.submit("Solar Energy", "English", 3).unwrap();
    let second = jobs.submit("Solar Energy", "english", 3).unwrap();
    assert!(matches!(first, SubmitOutcome::Started(_)));
    assert!(matches!(second, SubmitOutcome::AlreadyInProgress(_)));
    assert_eq!(first.key(), second.key());

    let progress = wait_until_finished(&app.services, first.key()).await;
    assert_completed(&progress);
    let calls_after_first_run = completion.calls();

    // 已完成的键直接返回文档，不再调用模型
    match jobs.submit("Solar Energy", "English", 3).unwrap() {
        SubmitOutcome::AlreadyCompleted(_, artifact) => {
            assert!(artifact.document.starts_with(b"%PDF"))
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(completion.calls(), calls_after_first_run);
}

#[tokio::test]
async fn test_different_page_counts_are_separate_jobs() {
    let app = TestAppBuilder::new(Arc::new(ScriptedCompletion::new())).build();
    let jobs = &app.services.jobs;

    let three = jobs.submit("Solar Energy", "English", 3).unwrap();
    let four = jobs.submit("Solar Energy", "English", 4).unwrap();
    assert!(matches!(three, SubmitOutcome::Started(_)));
    assert!(matches!(four, SubmitOutcome::Started(_)));

    assert_completed(&wait_until_finished(&app.services, three.key()).await);
    assert_completed(&wait_until_finished(&app.services, four.key()).await);
    let artifact = jobs.artifact(four.key()).unwrap();
    assert!(artifact.plain_text.contains("## 4. Grid Integration"));
}

#[tokio::test]
async fn test_submit_validation() {
    let app = TestAppBuilder::new(Arc::new(ScriptedCompletion::new())).build();
    let jobs = &app.services.jobs;

    assert!(matches!(
        jobs.submit("   ", "English", 3),
        Err(ServiceError::Validation(_))
    ));
    assert!(matches!(
        jobs.submit("Solar", "Klingon", 3),
        Err(ServiceError::Validation(_))
    ));
    for pages in [0, 11, -2] {
        assert!(matches!(
            jobs.submit("Solar", "English", pages),
            Err(ServiceError::Validation(_))
        ));
    }
    assert_eq!(app.services.store.job_count(), 0);
}

#[tokio::test]
async fn test_hanging_stage_marks_job_failed() {
    let completion = Arc::new(ScriptedCompletion::new().hanging_on("comprehensive introduction"));
    let app = TestAppBuilder::new(completion).build();

    let outcome = app.services.jobs.submit("Solar Energy", "English", 3).unwrap();
    let progress = wait_until_finished(&app.services, outcome.key()).await;

    assert_eq!(progress.status, JobStatus::Failed);
    let error = progress.error.unwrap();
    assert!(error.contains("introduction stage failed"), "{}", error);
    assert!(error.contains("timed out"), "{}", error);
    assert!(!progress.flags.topic_analysis);
    assert!(matches!(
        app.services.jobs.artifact(outcome.key()),
        Err(ServiceError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_failed_job_restarts_on_resubmit() {
    let completion = Arc::new(ScriptedCompletion::new().failing_on("concluding paragraph"));
    let app = TestAppBuilder::new(completion).build();
    let jobs = &app.services.jobs;

    let outcome = jobs.submit("Solar Energy", "English", 3).unwrap();
    let progress = wait_until_finished(&app.services, outcome.key()).await;
    assert_eq!(progress.status, JobStatus::Failed);
    assert!(progress.flags.topic_analysis);
    assert!(!progress.flags.finalizing);

    let retry = jobs.submit("Solar Energy", "English", 3).unwrap();
    assert!(matches!(retry, SubmitOutcome::Started(_)));
    let progress = jobs.progress(retry.key());
    assert!(progress.error.is_none());
}

#[tokio::test]
async fn test_soft_failures_fall_back() {
    let completion = Arc::new(
        ScriptedCompletion::new()
            .failing_on("key insights")
            .failing_on("Summarize this content"),
    );
    let app = TestAppBuilder::new(completion)
        .search(Arc::new(FailingSearch))
        .build();

    let outcome = app.services.jobs.submit("Solar Energy", "English", 3).unwrap();
    assert_completed(&wait_until_finished(&app.services, outcome.key()).await);

    let artifact = app.services.jobs.artifact(outcome.key()).unwrap();
    assert!(artifact.plain_text.contains("### Insights"));
}

#[tokio::test]
async fn test_localized_report_keeps_canonical_document() {
    let translator = Arc::new(TaggingTranslator::default());
    let app = TestAppBuilder::new(Arc::new(ScriptedCompletion::new()))
        .translator(translator.clone())
        .build();

    let outcome = app.services.jobs.submit("Solar Energy", "Hindi", 3).unwrap();
    assert_eq!(outcome.key().language, Language::Hindi);
    assert_completed(&wait_until_finished(&app.services, outcome.key()).await);

    let artifact = app.services.jobs.artifact(outcome.key()).unwrap();
    assert_eq!(artifact.language, Language::Hindi);
    assert!(artifact.plain_text.contains("[hi] "));
    assert_ne!(artifact.document, artifact.canonical_document);
    assert!(translator.calls.load(Ordering::SeqCst) > 0);
}

#[tokio::test]
async fn test_progress_of_unknown_key_is_not_started() {
    let app = TestAppBuilder::new(Arc::new(ScriptedCompletion::new())).build();
    let key = JobKey::new("Never submitted", Language::English, 3);

    let progress = app.services.jobs.progress(&key);
    assert_eq!(progress.status, JobStatus::NotStarted);
    assert!(!progress.flags.topic_analysis);
}

#[tokio::test]
async fn test_update_artifact() {
    let app = TestAppBuilder::new(Arc::new(ScriptedCompletion::new())).build();
    let jobs = &app.services.jobs;

    let unknown = JobKey::new("Unknown", Language::English, 3);
    assert!(matches!(
        jobs.update_artifact(&unknown, "# Edited", None).await,
        Err(ServiceError::NotFound(_))
    ));

    let outcome = jobs.submit("Solar Energy", "English", 3).unwrap();
    assert_completed(&wait_until_finished(&app.services, outcome.key()).await);
    let original = jobs.artifact(outcome.key()).unwrap();

    assert!(matches!(
        jobs.update_artifact(outcome.key(), "  ", None).await,
        Err(ServiceError::Validation(_))
    ));

    let edited = "# Edited Report\n\n## Notes\n- First point\n- Second point";
    let updated = jobs
        .update_artifact(outcome.key(), edited, None)
        .await
        .unwrap();
    assert_eq!(updated.plain_text, edited);
    assert!(updated.document.starts_with(b"%PDF"));
    assert_eq!(updated.canonical_document, original.canonical_document);

    let stored = jobs.artifact(outcome.key()).unwrap();
    assert_eq!(stored.plain_text, edited);
}

#[tokio::test]
async fn test_rewrite_segment() {
    let app = TestAppBuilder::new(Arc::new(ScriptedCompletion::new())).build();
    let jobs = &app.services.jobs;

    let rewritten = jobs
        .rewrite("Solar power grows fast", Language::English)
        .await
        .unwrap();
    assert_eq!(rewritten, "Refined wording appears here");

    assert!(matches!(
        jobs.rewrite("", Language::English).await,
        Err(ServiceError::Validation(_))
    ));
}
