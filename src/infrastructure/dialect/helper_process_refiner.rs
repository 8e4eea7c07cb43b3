use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;

use crate::application::ports::{DialectRefiner, ServiceError};

/// Dialect-correction helper: a long-lived subprocess speaking one JSON
/// object per line on stdin/stdout. The process is spawned on first use and
/// respawned after a crash; a request that gets no answer within the
/// timeout tears the session down instead of blocking the pipeline.
pub struct HelperProcessRefiner {
    command: String,
    args: Vec<String>,
    timeout: Duration,
    session: Mutex<Option<HelperSession>>,
}

struct HelperSession {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

#[derive(Deserialize)]
struct HelperResponse {
    status: String,
    #[serde(default)]
    result: Option<Correction>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct Correction {
    corrected: String,
}

impl HelperProcessRefiner {
    pub fn new(command: &str, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            command: command.to_string(),
            args,
            timeout,
            session: Mutex::new(None),
        }
    }

    fn spawn_session(&self) -> Result<HelperSession, ServiceError> {
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ServiceError::Permanent(format!("spawning {}: {}", self.command, e))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ServiceError::Permanent("helper stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ServiceError::Permanent("helper stdout unavailable".to_string()))?;

        tracing::info!(command = %self.command, "Dialect helper process started");

        Ok(HelperSession {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        })
    }

    async fn exchange(&self, session: &mut HelperSession, text: &str) -> Result<String, ServiceError> {
        let request = json!({ "command": "correct", "text": text });
        let mut line = serde_json::to_string(&request)
            .map_err(|e| ServiceError::Permanent(format!("serializing request: {}", e)))?;
        line.push('\n');

        session
            .stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| ServiceError::Transient(format!("helper write: {}", e)))?;
        session
            .stdin
            .flush()
            .await
            .map_err(|e| ServiceError::Transient(format!("helper flush: {}", e)))?;

        let mut response = String::new();
        let read = tokio::time::timeout(self.timeout, session.stdout.read_line(&mut response))
            .await
            .map_err(|_| ServiceError::Transient("helper response timeout".to_string()))?
            .map_err(|e| ServiceError::Transient(format!("helper read: {}", e)))?;

        if read == 0 {
            return Err(ServiceError::Transient("helper closed stdout".to_string()));
        }
        Ok(response)
    }
}

#[async_trait]
impl DialectRefiner for HelperProcessRefiner {
    async fn correct(&self, text: &str) -> Result<Option<String>, ServiceError> {
        let mut guard = self.session.lock().await;
        if guard.is_none() {
            *guard = Some(self.spawn_session()?);
        }
        let Some(session) = guard.as_mut() else {
            return Err(ServiceError::Transient("helper session unavailable".to_string()));
        };

        let raw = match self.exchange(session, text).await {
            Ok(raw) => raw,
            Err(e) => {
                // A broken session gets torn down so the next call respawns.
                tracing::warn!(error = %e, "Dialect helper session lost, will respawn");
                if let Some(mut dead) = guard.take() {
                    let _ = dead.child.start_kill();
                }
                return Err(e);
            }
        };

        let response: HelperResponse = serde_json::from_str(raw.trim())
            .map_err(|e| ServiceError::Transient(format!("malformed helper response: {}", e)))?;

        if response.status != "success" {
            return Err(ServiceError::Transient(format!(
                "helper error: {}",
                response.message.unwrap_or_else(|| "unknown".to_string())
            )));
        }

        Ok(response.result.map(|c| c.corrected))
    }
}
