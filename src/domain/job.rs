use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::artifact::ArtifactKind;
use super::ids::JobId;
use super::job_mode::JobMode;
use super::job_stage::JobStage;
use super::job_status::JobStatus;
use super::storage_path::StoragePath;

#[derive(Debug, Clone, PartialEq)]
pub struct MediaInput {
    pub filename: String,
    pub storage_path: StoragePath,
    pub size_bytes: u64,
}

/// The unit of work. Created `queued`, mutated exclusively by the worker
/// that owns it while `processing`, immutable once terminal.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub mode: JobMode,
    pub source_lang: String,
    pub target_lang: Option<String>,
    pub status: JobStatus,
    pub stage: JobStage,
    pub progress: u8,
    pub input: MediaInput,
    pub outputs: BTreeMap<ArtifactKind, StoragePath>,
    pub error_message: Option<String>,
    pub callback_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum JobTransitionError {
    #[error("stage {requested} is behind current stage {current}")]
    BackwardStage {
        current: JobStage,
        requested: JobStage,
    },
    #[error("progress {requested} does not advance past {current} for a stage transition")]
    ProgressNotIncreasing { current: u8, requested: u8 },
    #[error("progress {requested} decreases below {current}")]
    ProgressDecreasing { current: u8, requested: u8 },
    #[error("job is terminal ({status}) and cannot transition")]
    Terminal { status: JobStatus },
    #[error("target language is required for mode {mode}")]
    MissingTargetLang { mode: JobMode },
}

impl Job {
    pub fn new(
        mode: JobMode,
        source_lang: String,
        target_lang: Option<String>,
        input: MediaInput,
        callback_url: Option<String>,
    ) -> Result<Self, JobTransitionError> {
        if mode.requires_target_lang() && target_lang.is_none() {
            return Err(JobTransitionError::MissingTargetLang { mode });
        }
        let now = Utc::now();
        Ok(Self {
            id: JobId::new(),
            mode,
            source_lang,
            target_lang,
            status: JobStatus::Queued,
            stage: JobStage::Upload,
            progress: 0,
            input,
            outputs: BTreeMap::new(),
            error_message: None,
            callback_url,
            created_at: now,
            updated_at: now,
        })
    }

    /// Advance to `stage` at `progress`. Stage moves only forward in the
    /// fixed order; progress strictly increases on a stage change and never
    /// decreases within one. Also flips `queued` to `processing`.
    pub fn advance(&mut self, stage: JobStage, progress: u8) -> Result<(), JobTransitionError> {
        if self.status.is_terminal() {
            return Err(JobTransitionError::Terminal {
                status: self.status,
            });
        }
        if stage.ordinal() < self.stage.ordinal() {
            return Err(JobTransitionError::BackwardStage {
                current: self.stage,
                requested: stage,
            });
        }
        if stage != self.stage && progress <= self.progress {
            return Err(JobTransitionError::ProgressNotIncreasing {
                current: self.progress,
                requested: progress,
            });
        }
        if stage == self.stage && progress < self.progress {
            return Err(JobTransitionError::ProgressDecreasing {
                current: self.progress,
                requested: progress,
            });
        }
        self.stage = stage;
        self.progress = progress.min(100);
        self.status = JobStatus::Processing;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Merge `outputs` and mark the job done. Existing keys are overwritten,
    /// never deleted.
    pub fn complete(
        &mut self,
        outputs: BTreeMap<ArtifactKind, StoragePath>,
    ) -> Result<(), JobTransitionError> {
        if self.status.is_terminal() {
            return Err(JobTransitionError::Terminal {
                status: self.status,
            });
        }
        self.outputs.extend(outputs);
        self.status = JobStatus::Done;
        self.progress = 100;
        self.error_message = None;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn fail(&mut self, error: String) -> Result<(), JobTransitionError> {
        if self.status.is_terminal() {
            return Err(JobTransitionError::Terminal {
                status: self.status,
            });
        }
        self.status = JobStatus::Failed;
        self.error_message = Some(error);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Crash recovery: a job found `processing` after a worker restart is
    /// requeued and restarted from the beginning of the pipeline. Outputs
    /// are kept; overwrite semantics make the rerun consistent.
    pub fn reset_for_requeue(&mut self) -> Result<(), JobTransitionError> {
        if self.status.is_terminal() {
            return Err(JobTransitionError::Terminal {
                status: self.status,
            });
        }
        self.status = JobStatus::Queued;
        self.stage = JobStage::Upload;
        self.progress = 0;
        self.error_message = None;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Whether translation actually runs for this job: the mode must ask for
    /// it and the target language must differ from the source.
    pub fn needs_translation(&self) -> bool {
        self.mode.wants_translation()
            && self
                .target_lang
                .as_deref()
                .is_some_and(|target| target != self.source_lang)
    }
}
