use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::domain::{ArtifactKind, Job, JobId, JobStage, JobStatus, StoragePath};

use super::RepositoryError;

/// Single source of truth for job state. Writes are single-writer: the
/// worker that owns a job is the only mutator while it is processing.
/// Transition methods apply the domain invariants (forward-only stage,
/// monotone progress) and return the updated record.
#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn create(&self, job: &Job) -> Result<(), RepositoryError>;

    async fn get_by_id(&self, id: JobId) -> Result<Option<Job>, RepositoryError>;

    /// Persist a stage transition. Called before stage work begins so a
    /// crash mid-stage is observably stuck at a known stage.
    async fn set_stage(
        &self,
        id: JobId,
        stage: JobStage,
        progress: u8,
    ) -> Result<Job, RepositoryError>;

    /// Terminal success: merges `outputs` under overwrite semantics and
    /// sets progress to 100.
    async fn mark_done(
        &self,
        id: JobId,
        outputs: &BTreeMap<ArtifactKind, StoragePath>,
    ) -> Result<Job, RepositoryError>;

    /// Terminal failure, reachable from any stage.
    async fn mark_failed(&self, id: JobId, error: &str) -> Result<Job, RepositoryError>;

    /// Crash recovery: put a non-terminal job back to `queued` at the first
    /// stage so a worker can pick it up again.
    async fn reset_for_requeue(&self, id: JobId) -> Result<Job, RepositoryError>;

    async fn list_by_status(&self, status: JobStatus) -> Result<Vec<Job>, RepositoryError>;
}
