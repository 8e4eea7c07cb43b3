use std::collections::BTreeMap;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{ArtifactKind, JobId, JobStatus};
use crate::presentation::state::AppState;

use super::ErrorResponse;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResultResponse {
    pub job_id: String,
    pub status: String,
    /// Final segment list, inline.
    pub transcript: serde_json::Value,
    /// Artifact kind to download path on this service.
    pub artifacts: BTreeMap<String, String>,
}

/// Job result, available only once the job is `done`: transcript inline
/// plus a download handle per artifact.
#[tracing::instrument(skip(state))]
pub async fn job_result_handler(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> impl IntoResponse {
    let uuid = match Uuid::parse_str(&job_id) {
        Ok(u) => u,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: format!("Invalid job ID: {}", job_id),
                }),
            )
                .into_response();
        }
    };

    let job = match state.job_repository.get_by_id(JobId::from_uuid(uuid)).await {
        Ok(Some(job)) => job,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: format!("Job not found: {}", job_id),
                }),
            )
                .into_response();
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch job");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to fetch job: {}", e),
                }),
            )
                .into_response();
        }
    };

    if job.status != JobStatus::Done {
        return (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: format!("Job is not done yet (status: {})", job.status),
            }),
        )
            .into_response();
    }

    let transcript = match job.outputs.get(&ArtifactKind::TranscriptJson) {
        Some(path) => match state.media_store.fetch(path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null),
            Err(e) => {
                tracing::error!(error = %e, "Failed to fetch transcript artifact");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: format!("Failed to fetch transcript: {}", e),
                    }),
                )
                    .into_response();
            }
        },
        None => serde_json::Value::Null,
    };

    let artifacts = job
        .outputs
        .keys()
        .map(|kind| {
            (
                kind.as_str().to_string(),
                format!("/api/v1/jobs/{}/artifacts/{}", job.id, kind),
            )
        })
        .collect();

    (
        StatusCode::OK,
        Json(JobResultResponse {
            job_id: job.id.to_string(),
            status: job.status.as_str().to_string(),
            transcript,
            artifacts,
        }),
    )
        .into_response()
}
