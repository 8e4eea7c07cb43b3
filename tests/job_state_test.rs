use std::collections::BTreeMap;

use dubforge::application::ports::{JobRepository, RepositoryError};
use dubforge::domain::{
    ArtifactKind, Job, JobId, JobMode, JobStage, JobStatus, MediaInput, StoragePath,
};
use dubforge::infrastructure::persistence::InMemoryJobRepository;

fn test_job(mode: JobMode) -> Job {
    Job::new(
        mode,
        "en".to_string(),
        Some("fr".to_string()),
        MediaInput {
            filename: "clip.mp4".to_string(),
            storage_path: StoragePath::from_raw("uploads/x/clip.mp4"),
            size_bytes: 512,
        },
        None,
    )
    .expect("valid job")
}

#[tokio::test]
async fn given_new_job_when_creating_and_retrieving_then_job_is_persisted() {
    let repo = InMemoryJobRepository::new();
    let job = test_job(JobMode::Transcribe);
    let job_id = job.id;

    repo.create(&job).await.expect("Failed to create job");

    let retrieved = repo
        .get_by_id(job_id)
        .await
        .expect("Failed to retrieve job")
        .expect("Job not found");

    assert_eq!(retrieved.id, job.id);
    assert_eq!(retrieved.status, JobStatus::Queued);
    assert_eq!(retrieved.stage, JobStage::Upload);
    assert_eq!(retrieved.progress, 0);
}

#[tokio::test]
async fn given_existing_job_when_setting_stage_then_status_becomes_processing() {
    let repo = InMemoryJobRepository::new();
    let job = test_job(JobMode::Dub);
    let job_id = job.id;
    repo.create(&job).await.unwrap();

    let updated = repo
        .set_stage(job_id, JobStage::Stt, 10)
        .await
        .expect("Failed to set stage");

    assert_eq!(updated.status, JobStatus::Processing);
    assert_eq!(updated.stage, JobStage::Stt);
    assert_eq!(updated.progress, 10);
}

#[tokio::test]
async fn given_advanced_job_when_moving_stage_backward_then_transition_rejected() {
    let repo = InMemoryJobRepository::new();
    let job = test_job(JobMode::Dub);
    let job_id = job.id;
    repo.create(&job).await.unwrap();

    repo.set_stage(job_id, JobStage::Translate, 40).await.unwrap();

    let result = repo.set_stage(job_id, JobStage::Stt, 50).await;
    assert!(matches!(
        result,
        Err(RepositoryError::InvalidTransition(_))
    ));

    // The stored record is untouched by the rejected transition.
    let stored = repo.get_by_id(job_id).await.unwrap().unwrap();
    assert_eq!(stored.stage, JobStage::Translate);
    assert_eq!(stored.progress, 40);
}

#[tokio::test]
async fn given_done_job_when_marking_done_again_then_outputs_merge_not_duplicate() {
    let repo = InMemoryJobRepository::new();
    let job = test_job(JobMode::Transcribe);
    let job_id = job.id;
    repo.create(&job).await.unwrap();

    let mut first = BTreeMap::new();
    first.insert(
        ArtifactKind::TranscriptJson,
        StoragePath::from_raw("a/transcript.json"),
    );
    let done = repo.mark_done(job_id, &first).await.unwrap();
    assert_eq!(done.status, JobStatus::Done);
    assert_eq!(done.progress, 100);
    assert_eq!(done.outputs.len(), 1);

    // Terminal jobs refuse further transitions.
    let mut second = BTreeMap::new();
    second.insert(ArtifactKind::Srt, StoragePath::from_raw("a/subtitles.srt"));
    assert!(matches!(
        repo.mark_done(job_id, &second).await,
        Err(RepositoryError::InvalidTransition(_))
    ));
}

#[tokio::test]
async fn given_job_at_any_stage_when_marking_failed_then_error_recorded() {
    let repo = InMemoryJobRepository::new();
    let job = test_job(JobMode::Dub);
    let job_id = job.id;
    repo.create(&job).await.unwrap();

    repo.set_stage(job_id, JobStage::Tts, 60).await.unwrap();
    let failed = repo
        .mark_failed(job_id, "synthesis exploded")
        .await
        .unwrap();

    assert_eq!(failed.status, JobStatus::Failed);
    assert_eq!(failed.error_message.as_deref(), Some("synthesis exploded"));
    assert_eq!(failed.stage, JobStage::Tts);
}

#[tokio::test]
async fn given_processing_job_when_resetting_for_requeue_then_back_to_queued_at_upload() {
    let repo = InMemoryJobRepository::new();
    let job = test_job(JobMode::Dub);
    let job_id = job.id;
    repo.create(&job).await.unwrap();
    repo.set_stage(job_id, JobStage::Translate, 40).await.unwrap();

    let reset = repo.reset_for_requeue(job_id).await.unwrap();
    assert_eq!(reset.status, JobStatus::Queued);
    assert_eq!(reset.stage, JobStage::Upload);
    assert_eq!(reset.progress, 0);
    assert!(reset.error_message.is_none());

    // The full stage ladder is valid again after the reset.
    repo.set_stage(job_id, JobStage::Stt, 10).await.unwrap();
    repo.set_stage(job_id, JobStage::Mux, 80).await.unwrap();
}

#[tokio::test]
async fn given_failed_job_when_resetting_for_requeue_then_rejected() {
    let repo = InMemoryJobRepository::new();
    let job = test_job(JobMode::Transcribe);
    let job_id = job.id;
    repo.create(&job).await.unwrap();
    repo.mark_failed(job_id, "stt exploded").await.unwrap();

    assert!(matches!(
        repo.reset_for_requeue(job_id).await,
        Err(RepositoryError::InvalidTransition(_))
    ));
}

#[tokio::test]
async fn given_jobs_with_different_statuses_when_listing_by_status_then_only_matching_returned() {
    let repo = InMemoryJobRepository::new();
    let job1 = test_job(JobMode::Transcribe);
    let job2 = test_job(JobMode::Transcribe);
    let job3 = test_job(JobMode::Transcribe);

    repo.create(&job1).await.unwrap();
    repo.create(&job2).await.unwrap();
    repo.create(&job3).await.unwrap();

    repo.set_stage(job2.id, JobStage::Stt, 10).await.unwrap();
    repo.set_stage(job3.id, JobStage::Stt, 10).await.unwrap();

    let processing = repo.list_by_status(JobStatus::Processing).await.unwrap();
    assert_eq!(processing.len(), 2);
    assert!(processing.iter().all(|j| j.status == JobStatus::Processing));
}

#[tokio::test]
async fn given_nonexistent_job_id_when_retrieving_then_returns_none() {
    let repo = InMemoryJobRepository::new();
    let result = repo
        .get_by_id(JobId::new())
        .await
        .expect("Query should succeed");
    assert!(result.is_none());
}
