use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tracing::Instrument;

use crate::application::ports::{
    JobNotification, JobRepository, MediaStore, RepositoryError, WebhookNotifier,
};
use crate::domain::{ArtifactKind, Job, JobId, JobStage, JobStatus, StoragePath};

use super::job_state::JobState;
use super::queue::{JobQueue, QueuedJob};
use super::stages::{StageContext, StageError};
use super::subtitles;

/// One worker slot of the pipeline orchestrator. Workers share a queue
/// receiver and each owns at most one job at a time; within a job, stages
/// run strictly sequentially. A stage failure is terminal for that job
/// only; the worker loop itself never dies.
pub struct PipelineWorker {
    pub worker_id: usize,
    pub queue: JobQueue,
    pub receiver: Arc<Mutex<mpsc::Receiver<QueuedJob>>>,
    pub repository: Arc<dyn JobRepository>,
    pub store: Arc<dyn MediaStore>,
    pub notifier: Arc<dyn WebhookNotifier>,
    pub stages: Arc<StageContext>,
    pub work_root: PathBuf,
    pub public_base_url: String,
}

#[derive(Debug, thiserror::Error)]
enum WorkerError {
    #[error("repository: {0}")]
    Repository(#[from] RepositoryError),
}

impl PipelineWorker {
    pub async fn run(self) {
        tracing::info!(worker_id = self.worker_id, "Pipeline worker started");
        loop {
            let item = { self.receiver.lock().await.recv().await };
            let Some(item) = item else {
                break;
            };

            let span = tracing::info_span!(
                "pipeline_job",
                worker_id = self.worker_id,
                job_id = %item.job_id,
                delivery = item.attempts + 1,
            );
            if let Err(e) = self.process(item.job_id).instrument(span).await {
                tracing::error!(job_id = %item.job_id, error = %e, "Job processing hit infrastructure failure");
                self.queue.redeliver(item);
            }
        }
        tracing::info!(worker_id = self.worker_id, "Pipeline worker stopped: queue closed");
    }

    /// Drive one job through its stages. `Err` here means the job's state
    /// could not be read or written and the work item is redelivered. Stage
    /// failures are absorbed into a terminal `failed` status instead.
    async fn process(&self, job_id: JobId) -> Result<(), WorkerError> {
        let Some(mut state) = JobState::load(Arc::clone(&self.repository), job_id).await? else {
            tracing::warn!("Dequeued job no longer exists");
            return Ok(());
        };
        if state.job().status.is_terminal() {
            tracing::debug!(status = %state.job().status, "Skipping terminal job");
            return Ok(());
        }

        // A redelivered or crash-recovered job may already sit mid-pipeline;
        // restart it from the top so the stage order stays forward-only.
        if state.job().status == JobStatus::Processing {
            tracing::warn!(stage = %state.job().stage, "Job found mid-processing, restarting pipeline");
            self.repository.reset_for_requeue(job_id).await?;
            let Some(reloaded) = JobState::load(Arc::clone(&self.repository), job_id).await? else {
                return Ok(());
            };
            state = reloaded;
        }

        let workdir = self.work_root.join(job_id.as_uuid().to_string());
        if let Err(e) = tokio::fs::create_dir_all(&workdir).await {
            state.mark_failed(&format!("working directory: {}", e)).await?;
            self.notify_terminal(state.job()).await;
            return Ok(());
        }

        let outcome = self.run_pipeline(&mut state, &workdir).await;

        if let Err(e) = tokio::fs::remove_dir_all(&workdir).await {
            tracing::warn!(error = %e, "Failed to clean up job working directory");
        }

        match outcome {
            Ok(outputs) => {
                state.mark_done(outputs).await?;
                tracing::info!(progress = 100, "Job completed");
            }
            // State could not be read or written mid-pipeline: leave the
            // job as-is and let the queue redeliver it.
            Err(PipelineFailure::Repository(e)) => return Err(WorkerError::Repository(e)),
            Err(e) => {
                tracing::error!(stage = %state.job().stage, error = %e, "Stage failed, job is terminal");
                state.mark_failed(&e.to_string()).await?;
            }
        }

        self.notify_terminal(state.job()).await;
        Ok(())
    }

    async fn run_pipeline(
        &self,
        state: &mut JobState,
        workdir: &std::path::Path,
    ) -> Result<BTreeMap<ArtifactKind, StoragePath>, PipelineFailure> {
        // Upload stage: claim the job, stage the source locally, clean the
        // audio. The transition is persisted before the work starts.
        state.set_stage(JobStage::Upload, 5).await?;
        let job = state.job().clone();

        let source_bytes = self
            .store
            .fetch(&job.input.storage_path)
            .await
            .map_err(|e| PipelineFailure::Fatal(format!("source media unavailable: {}", e)))?;
        let source_path = workdir.join(&job.input.filename);
        tokio::fs::write(&source_path, &source_bytes)
            .await
            .map_err(|e| PipelineFailure::Fatal(format!("staging source media: {}", e)))?;

        let audio_path = self.stages.run_upload(&source_path, workdir).await?;

        // STT stage, with the diarization merge inside its window.
        state.set_stage(JobStage::Stt, 10).await?;
        let audio_bytes = tokio::fs::read(&audio_path)
            .await
            .map_err(|e| PipelineFailure::Fatal(format!("reading normalized audio: {}", e)))?;
        let stt = self.stages.run_stt(&job, &audio_bytes).await?;
        let mut segments = stt.segments;
        state.set_stage(JobStage::Stt, 20).await?;

        self.stages.run_diarize(&audio_path, &mut segments).await;
        state.set_stage(JobStage::Stt, 30).await?;

        if job.needs_translation() {
            state.set_stage(JobStage::Translate, 40).await?;
            self.stages.run_translate(&job, &mut segments).await;
            state.set_stage(JobStage::Translate, 50).await?;
        }

        let mut outputs = BTreeMap::new();
        self.store_transcript_artifacts(&job, &segments, &mut outputs)
            .await?;

        if job.mode.wants_dubbing() {
            state.set_stage(JobStage::Tts, 60).await?;
            let track = self.stages.run_tts(&job, &segments, workdir).await?;
            state.set_stage(JobStage::Tts, 70).await?;

            state.set_stage(JobStage::Mux, 80).await?;
            let video = self
                .stages
                .run_mux(&source_path, &track, &segments, workdir)
                .await?;

            let video_bytes = tokio::fs::read(&video)
                .await
                .map_err(|e| PipelineFailure::Fatal(format!("reading muxed video: {}", e)))?;
            let video_path = StoragePath::new(&job.id, ArtifactKind::DubbedVideo.filename());
            self.store
                .store_bytes(&video_path, video_bytes)
                .await
                .map_err(|e| PipelineFailure::Fatal(format!("storing dubbed video: {}", e)))?;
            outputs.insert(ArtifactKind::DubbedVideo, video_path);
        }

        Ok(outputs)
    }

    async fn store_transcript_artifacts(
        &self,
        job: &Job,
        segments: &[crate::domain::Segment],
        outputs: &mut BTreeMap<ArtifactKind, StoragePath>,
    ) -> Result<(), PipelineFailure> {
        let transcript = serde_json::to_vec_pretty(segments)
            .map_err(|e| PipelineFailure::Fatal(format!("serializing transcript: {}", e)))?;

        let artifacts = [
            (ArtifactKind::TranscriptJson, transcript),
            (
                ArtifactKind::Srt,
                subtitles::srt_document(segments).into_bytes(),
            ),
            (
                ArtifactKind::Vtt,
                subtitles::vtt_document(segments).into_bytes(),
            ),
        ];

        for (kind, bytes) in artifacts {
            let path = StoragePath::new(&job.id, kind.filename());
            self.store
                .store_bytes(&path, bytes)
                .await
                .map_err(|e| PipelineFailure::Fatal(format!("storing {}: {}", kind, e)))?;
            outputs.insert(kind, path);
        }
        Ok(())
    }

    async fn notify_terminal(&self, job: &Job) {
        let Some(callback_url) = job.callback_url.clone() else {
            return;
        };

        let result_url = (job.status == JobStatus::Done).then(|| {
            format!(
                "{}/api/v1/jobs/{}/result",
                self.public_base_url.trim_end_matches('/'),
                job.id
            )
        });

        let notification = JobNotification {
            job_id: job.id,
            status: job.status,
            result_url,
            error: job.error_message.clone(),
            callback_url,
        };

        if let Err(e) = self.notifier.notify(&notification).await {
            // Explicit policy: a failed webhook is logged, never retried
            // here. The caller can re-poll the status endpoint.
            tracing::warn!(error = %e, "Webhook delivery failed");
        }
    }
}

/// Failure inside the pipeline body. `Repository` bubbles out of `process`
/// for redelivery; everything else flips the job to `failed`.
#[derive(Debug, thiserror::Error)]
enum PipelineFailure {
    #[error("{0}")]
    Stage(#[from] StageError),
    #[error("{0}")]
    Fatal(String),
    #[error("repository: {0}")]
    Repository(#[from] RepositoryError),
}
