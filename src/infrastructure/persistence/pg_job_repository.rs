use std::collections::BTreeMap;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;

use crate::application::ports::{JobRepository, RepositoryError};
use crate::domain::{
    ArtifactKind, Job, JobId, JobMode, JobStage, JobStatus, JobTransitionError, MediaInput,
    StoragePath,
};

pub struct PgJobRepository {
    pool: PgPool,
}

impl PgJobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, id: JobId) -> Result<Option<Job>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM jobs WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;
        row.map(map_row).transpose()
    }

    /// Read-modify-write under the single-writer-per-job contract: the
    /// domain type applies the transition, the row takes the result.
    async fn mutate<F>(&self, id: JobId, f: F) -> Result<Job, RepositoryError>
    where
        F: FnOnce(&mut Job) -> Result<(), JobTransitionError>,
    {
        let mut job = self
            .fetch(id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;
        f(&mut job).map_err(|e| RepositoryError::InvalidTransition(e.to_string()))?;

        sqlx::query(
            r#"
            UPDATE jobs
            SET status = $1, stage = $2, progress = $3, outputs = $4,
                error_message = $5, updated_at = $6
            WHERE id = $7
            "#,
        )
        .bind(job.status.as_str())
        .bind(job.stage.as_str())
        .bind(job.progress as i16)
        .bind(outputs_to_json(&job.outputs))
        .bind(job.error_message.as_deref())
        .bind(job.updated_at)
        .bind(job.id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        Ok(job)
    }
}

#[async_trait]
impl JobRepository for PgJobRepository {
    #[instrument(skip(self, job), fields(job_id = %job.id))]
    async fn create(&self, job: &Job) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO jobs (
                id, mode, source_lang, target_lang, status, stage, progress,
                input_filename, input_path, input_size_bytes, outputs,
                error_message, callback_url, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(job.id.as_uuid())
        .bind(job.mode.as_str())
        .bind(&job.source_lang)
        .bind(job.target_lang.as_deref())
        .bind(job.status.as_str())
        .bind(job.stage.as_str())
        .bind(job.progress as i16)
        .bind(&job.input.filename)
        .bind(job.input.storage_path.as_str())
        .bind(job.input.size_bytes as i64)
        .bind(outputs_to_json(&job.outputs))
        .bind(job.error_message.as_deref())
        .bind(job.callback_url.as_deref())
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    #[instrument(skip(self), fields(job_id = %id))]
    async fn get_by_id(&self, id: JobId) -> Result<Option<Job>, RepositoryError> {
        self.fetch(id).await
    }

    #[instrument(skip(self), fields(job_id = %id, stage = %stage))]
    async fn set_stage(
        &self,
        id: JobId,
        stage: JobStage,
        progress: u8,
    ) -> Result<Job, RepositoryError> {
        self.mutate(id, |job| job.advance(stage, progress)).await
    }

    #[instrument(skip(self, outputs), fields(job_id = %id))]
    async fn mark_done(
        &self,
        id: JobId,
        outputs: &BTreeMap<ArtifactKind, StoragePath>,
    ) -> Result<Job, RepositoryError> {
        self.mutate(id, |job| job.complete(outputs.clone())).await
    }

    #[instrument(skip(self, error), fields(job_id = %id))]
    async fn mark_failed(&self, id: JobId, error: &str) -> Result<Job, RepositoryError> {
        self.mutate(id, |job| job.fail(error.to_string())).await
    }

    #[instrument(skip(self), fields(job_id = %id))]
    async fn reset_for_requeue(&self, id: JobId) -> Result<Job, RepositoryError> {
        self.mutate(id, |job| job.reset_for_requeue()).await
    }

    #[instrument(skip(self), fields(status = %status))]
    async fn list_by_status(&self, status: JobStatus) -> Result<Vec<Job>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM jobs WHERE status = $1 ORDER BY created_at DESC")
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        rows.into_iter().map(map_row).collect()
    }
}

fn outputs_to_json(outputs: &BTreeMap<ArtifactKind, StoragePath>) -> serde_json::Value {
    serde_json::Value::Object(
        outputs
            .iter()
            .map(|(kind, path)| {
                (
                    kind.as_str().to_string(),
                    serde_json::Value::String(path.as_str().to_string()),
                )
            })
            .collect(),
    )
}

fn outputs_from_json(
    value: serde_json::Value,
) -> Result<BTreeMap<ArtifactKind, StoragePath>, RepositoryError> {
    let object = match value {
        serde_json::Value::Object(map) => map,
        other => {
            return Err(RepositoryError::QueryFailed(format!(
                "outputs column is not an object: {}",
                other
            )));
        }
    };

    object
        .into_iter()
        .map(|(key, value)| {
            let kind = ArtifactKind::from_str(&key).map_err(RepositoryError::QueryFailed)?;
            let path = value
                .as_str()
                .ok_or_else(|| RepositoryError::QueryFailed(format!("outputs[{}]", key)))?;
            Ok((kind, StoragePath::from_raw(path)))
        })
        .collect()
}

fn map_row(row: PgRow) -> Result<Job, RepositoryError> {
    let query_err = |e: sqlx::Error| RepositoryError::QueryFailed(e.to_string());

    let status: String = row.try_get("status").map_err(query_err)?;
    let stage: String = row.try_get("stage").map_err(query_err)?;
    let mode: String = row.try_get("mode").map_err(query_err)?;
    let outputs: serde_json::Value = row.try_get("outputs").map_err(query_err)?;
    let progress: i16 = row.try_get("progress").map_err(query_err)?;
    let size_bytes: i64 = row.try_get("input_size_bytes").map_err(query_err)?;
    let input_path: String = row.try_get("input_path").map_err(query_err)?;

    Ok(Job {
        id: JobId::from_uuid(row.try_get("id").map_err(query_err)?),
        mode: mode.parse::<JobMode>().map_err(RepositoryError::QueryFailed)?,
        source_lang: row.try_get("source_lang").map_err(query_err)?,
        target_lang: row.try_get("target_lang").map_err(query_err)?,
        status: status
            .parse::<JobStatus>()
            .map_err(RepositoryError::QueryFailed)?,
        stage: stage
            .parse::<JobStage>()
            .map_err(RepositoryError::QueryFailed)?,
        progress: progress.clamp(0, 100) as u8,
        input: MediaInput {
            filename: row.try_get("input_filename").map_err(query_err)?,
            storage_path: StoragePath::from_raw(input_path),
            size_bytes: size_bytes.max(0) as u64,
        },
        outputs: outputs_from_json(outputs)?,
        error_message: row.try_get("error_message").map_err(query_err)?,
        callback_url: row.try_get("callback_url").map_err(query_err)?,
        created_at: row.try_get("created_at").map_err(query_err)?,
        updated_at: row.try_get("updated_at").map_err(query_err)?,
    })
}
