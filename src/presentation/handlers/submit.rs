use axum::Json;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{Job, JobMode, MediaInput, StoragePath};
use crate::presentation::state::AppState;

use super::ErrorResponse;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub job_id: String,
    pub status: String,
    pub message: String,
}

/// Accept a source video plus pipeline parameters and return immediately:
/// the job is created `queued` and handed to the worker pool.
#[tracing::instrument(skip(state, multipart))]
pub async fn submit_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut mode: Option<String> = None;
    let mut source_lang: Option<String> = None;
    let mut target_lang: Option<String> = None;
    let mut callback_url: Option<String> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(f)) => f,
            Ok(None) => break,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read multipart");
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ErrorResponse {
                        error: format!("Failed to read multipart: {}", e),
                    }),
                )
                    .into_response();
            }
        };

        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("upload.bin").to_string();
                match field.bytes().await {
                    Ok(bytes) => file = Some((filename, bytes.to_vec())),
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to read file bytes");
                        return (
                            StatusCode::BAD_REQUEST,
                            Json(ErrorResponse {
                                error: format!("Failed to read file: {}", e),
                            }),
                        )
                            .into_response();
                    }
                }
            }
            "mode" => mode = field.text().await.ok(),
            "sourceLang" => source_lang = field.text().await.ok(),
            "targetLang" => target_lang = field.text().await.ok().filter(|t| !t.is_empty()),
            "callbackUrl" => callback_url = field.text().await.ok().filter(|u| !u.is_empty()),
            other => tracing::debug!(field = other, "Ignoring unknown multipart field"),
        }
    }

    let Some((filename, data)) = file else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "No file uploaded".to_string(),
            }),
        )
            .into_response();
    };

    let mode = match mode.as_deref().unwrap_or("transcribe").parse::<JobMode>() {
        Ok(mode) => mode,
        Err(e) => {
            return (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: e })).into_response();
        }
    };
    let source_lang = source_lang.unwrap_or_else(|| "en".to_string());

    let storage_path = StoragePath::from_raw(format!("uploads/{}/{}", Uuid::new_v4(), filename));
    let size_bytes = data.len() as u64;

    if let Err(e) = state.media_store.store_bytes(&storage_path, data).await {
        tracing::error!(error = %e, "Failed to stage uploaded file");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: format!("Failed to store upload: {}", e),
            }),
        )
            .into_response();
    }

    let job = match Job::new(
        mode,
        source_lang,
        target_lang,
        MediaInput {
            filename,
            storage_path,
            size_bytes,
        },
        callback_url,
    ) {
        Ok(job) => job,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response();
        }
    };
    let job_id = job.id;

    if let Err(e) = state.job_repository.create(&job).await {
        tracing::error!(error = %e, "Failed to create job record");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: format!("Failed to create job: {}", e),
            }),
        )
            .into_response();
    }

    if let Err(e) = state.queue.enqueue(job_id).await {
        tracing::error!(error = %e, "Failed to enqueue job");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                error: "Pipeline queue full or workers unavailable".to_string(),
            }),
        )
            .into_response();
    }

    tracing::info!(
        job_id = %job_id,
        mode = %job.mode,
        "Pipeline job accepted"
    );

    (
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            job_id: job_id.to_string(),
            status: job.status.as_str().to_string(),
            message: "Job accepted".to_string(),
        }),
    )
        .into_response()
}
