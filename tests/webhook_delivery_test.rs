use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use dubforge::application::ports::{JobNotification, WebhookNotifier};
use dubforge::domain::{JobId, JobStatus};
use dubforge::infrastructure::webhook::{HttpWebhookNotifier, SIGNATURE_HEADER, sign_payload};

async fn hook(
    State(tx): State<mpsc::Sender<(Option<String>, Vec<u8>)>>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    tx.send((signature, body.to_vec())).await.ok();
    StatusCode::OK
}

async fn spawn_receiver() -> (String, mpsc::Receiver<(Option<String>, Vec<u8>)>) {
    let (tx, rx) = mpsc::channel(1);
    let app = Router::new().route("/hook", post(hook)).with_state(tx);
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    (format!("http://{}/hook", addr), rx)
}

#[tokio::test]
async fn given_done_job_when_notifying_then_payload_signed_and_verifiable() {
    let (callback_url, mut rx) = spawn_receiver().await;
    let notifier = HttpWebhookNotifier::new("shared-secret").expect("notifier");
    let job_id = JobId::new();

    notifier
        .notify(&JobNotification {
            job_id,
            status: JobStatus::Done,
            result_url: Some(format!("http://localhost:3000/api/v1/jobs/{}/result", job_id)),
            error: None,
            callback_url,
        })
        .await
        .expect("delivery succeeds");

    let (signature, body) = rx.recv().await.expect("payload received");

    // Signature verifies against the exact transmitted body.
    let expected = sign_payload(b"shared-secret", &body).unwrap();
    assert_eq!(signature.as_deref(), Some(expected.as_str()));
    assert!(expected.starts_with("sha256="));

    let payload: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(payload["jobId"], job_id.to_string());
    assert_eq!(payload["status"], "done");
    assert!(payload["resultUrl"].as_str().unwrap().contains("/result"));
    assert!(payload.get("error").is_none());
}

#[tokio::test]
async fn given_failed_job_when_notifying_then_error_present_and_result_url_absent() {
    let (callback_url, mut rx) = spawn_receiver().await;
    let notifier = HttpWebhookNotifier::new("shared-secret").expect("notifier");
    let job_id = JobId::new();

    notifier
        .notify(&JobNotification {
            job_id,
            status: JobStatus::Failed,
            result_url: None,
            error: Some("speech-to-text failed: retries exhausted".to_string()),
            callback_url,
        })
        .await
        .expect("delivery succeeds");

    let (_, body) = rx.recv().await.expect("payload received");
    let payload: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(payload["status"], "failed");
    assert!(payload.get("resultUrl").is_none());
    assert!(payload["error"].as_str().unwrap().contains("speech-to-text"));
}

#[tokio::test]
async fn given_unreachable_callback_when_notifying_then_error_reported_not_panicked() {
    let notifier = HttpWebhookNotifier::new("shared-secret").expect("notifier");
    let result = notifier
        .notify(&JobNotification {
            job_id: JobId::new(),
            status: JobStatus::Done,
            result_url: None,
            error: None,
            callback_url: "http://127.0.0.1:1/hook".to_string(),
        })
        .await;
    assert!(result.is_err());
}
