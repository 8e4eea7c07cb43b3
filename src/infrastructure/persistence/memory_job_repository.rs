use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::application::ports::{JobRepository, RepositoryError};
use crate::domain::{ArtifactKind, Job, JobId, JobStage, JobStatus, StoragePath};

/// In-memory job store for tests and single-node deployments. Applies the
/// same domain transitions as the Postgres repository; state is lost on
/// restart.
#[derive(Default)]
pub struct InMemoryJobRepository {
    jobs: RwLock<HashMap<Uuid, Job>>,
}

impl InMemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn mutate<F>(&self, id: JobId, f: F) -> Result<Job, RepositoryError>
    where
        F: FnOnce(&mut Job) -> Result<(), crate::domain::JobTransitionError>,
    {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(&id.as_uuid())
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;
        f(job).map_err(|e| RepositoryError::InvalidTransition(e.to_string()))?;
        Ok(job.clone())
    }
}

#[async_trait]
impl JobRepository for InMemoryJobRepository {
    async fn create(&self, job: &Job) -> Result<(), RepositoryError> {
        self.jobs
            .write()
            .await
            .insert(job.id.as_uuid(), job.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: JobId) -> Result<Option<Job>, RepositoryError> {
        Ok(self.jobs.read().await.get(&id.as_uuid()).cloned())
    }

    async fn set_stage(
        &self,
        id: JobId,
        stage: JobStage,
        progress: u8,
    ) -> Result<Job, RepositoryError> {
        self.mutate(id, |job| job.advance(stage, progress)).await
    }

    async fn mark_done(
        &self,
        id: JobId,
        outputs: &BTreeMap<ArtifactKind, StoragePath>,
    ) -> Result<Job, RepositoryError> {
        self.mutate(id, |job| job.complete(outputs.clone())).await
    }

    async fn mark_failed(&self, id: JobId, error: &str) -> Result<Job, RepositoryError> {
        self.mutate(id, |job| job.fail(error.to_string())).await
    }

    async fn reset_for_requeue(&self, id: JobId) -> Result<Job, RepositoryError> {
        self.mutate(id, |job| job.reset_for_requeue()).await
    }

    async fn list_by_status(&self, status: JobStatus) -> Result<Vec<Job>, RepositoryError> {
        let jobs = self.jobs.read().await;
        let mut matching: Vec<Job> = jobs
            .values()
            .filter(|job| job.status == status)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }
}
