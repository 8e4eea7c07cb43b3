/// Failure of an external-service call, split by whether a retry can help.
///
/// `Warming` is the "still loading" signal some collaborators emit while a
/// model is being fetched; it retries on a fixed delay instead of the
/// doubling backoff used for ordinary transient failures. `Permanent` is
/// never retried.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("service warming up: {0}")]
    Warming(String),
    #[error("transient failure: {0}")]
    Transient(String),
    #[error("permanent failure: {0}")]
    Permanent(String),
}

impl ServiceError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ServiceError::Permanent(_))
    }
}
