use std::collections::BTreeMap;
use std::sync::Arc;

use crate::application::ports::{JobRepository, RepositoryError};
use crate::domain::{ArtifactKind, Job, JobId, JobStage, StoragePath};

/// Single-writer handle on one job's persisted state. The owning worker is
/// the only mutator for the job's lifetime; every transition is persisted
/// before the corresponding stage work starts, so a crash mid-stage leaves
/// the job observably stuck at a known stage.
pub struct JobState {
    repository: Arc<dyn JobRepository>,
    job: Job,
}

impl JobState {
    pub async fn load(
        repository: Arc<dyn JobRepository>,
        id: JobId,
    ) -> Result<Option<Self>, RepositoryError> {
        let job = repository.get_by_id(id).await?;
        Ok(job.map(|job| Self { repository, job }))
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    pub async fn set_stage(&mut self, stage: JobStage, progress: u8) -> Result<(), RepositoryError> {
        tracing::debug!(stage = %stage, progress = progress, "Job stage transition");
        self.job = self
            .repository
            .set_stage(self.job.id, stage, progress)
            .await?;
        Ok(())
    }

    pub async fn mark_done(
        &mut self,
        outputs: BTreeMap<ArtifactKind, StoragePath>,
    ) -> Result<(), RepositoryError> {
        self.job = self.repository.mark_done(self.job.id, &outputs).await?;
        Ok(())
    }

    pub async fn mark_failed(&mut self, error: &str) -> Result<(), RepositoryError> {
        self.job = self.repository.mark_failed(self.job.id, error).await?;
        Ok(())
    }
}
