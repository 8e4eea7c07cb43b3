use std::time::Duration;

use tokio::sync::mpsc;

use crate::domain::JobId;

/// Delivery attempts per work item at the queueing layer, independent of
/// the adapter-level retries inside a stage.
pub const MAX_DELIVERY_ATTEMPTS: u32 = 3;

const REDELIVERY_BASE_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy)]
pub struct QueuedJob {
    pub job_id: JobId,
    pub attempts: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("queue closed or full")]
    Unavailable,
}

/// In-process job queue. The mpsc channel gives at-most-one consumer per
/// message; redelivery re-enqueues a work item after a doubling backoff
/// until its attempt budget is spent.
#[derive(Clone)]
pub struct JobQueue {
    sender: mpsc::Sender<QueuedJob>,
}

impl JobQueue {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<QueuedJob>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }

    pub async fn enqueue(&self, job_id: JobId) -> Result<(), QueueError> {
        self.sender
            .send(QueuedJob {
                job_id,
                attempts: 0,
            })
            .await
            .map_err(|_| QueueError::Unavailable)
    }

    /// Schedule another delivery of a failed work item. Returns false when
    /// the attempt budget is exhausted and the item is dropped.
    pub fn redeliver(&self, item: QueuedJob) -> bool {
        let attempts = item.attempts + 1;
        if attempts >= MAX_DELIVERY_ATTEMPTS {
            tracing::error!(
                job_id = %item.job_id,
                attempts = attempts,
                "Work item exhausted its delivery attempts"
            );
            return false;
        }

        let delay = REDELIVERY_BASE_DELAY * 2u32.pow(attempts - 1);
        let sender = self.sender.clone();
        let job_id = item.job_id;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if sender.send(QueuedJob { job_id, attempts }).await.is_err() {
                tracing::warn!(job_id = %job_id, "Queue closed before redelivery");
            }
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn given_enqueued_job_when_receiving_then_item_has_zero_attempts() {
        let (queue, mut receiver) = JobQueue::new(4);
        let job_id = JobId::new();
        queue.enqueue(job_id).await.unwrap();

        let item = receiver.recv().await.unwrap();
        assert_eq!(item.job_id, job_id);
        assert_eq!(item.attempts, 0);
    }

    #[tokio::test]
    async fn given_item_at_attempt_budget_when_redelivering_then_dropped() {
        let (queue, _receiver) = JobQueue::new(4);
        let item = QueuedJob {
            job_id: JobId::new(),
            attempts: MAX_DELIVERY_ATTEMPTS - 1,
        };
        assert!(!queue.redeliver(item));
    }

    #[tokio::test]
    async fn given_failed_item_when_redelivering_then_attempts_increment() {
        let (queue, mut receiver) = JobQueue::new(4);
        let item = QueuedJob {
            job_id: JobId::new(),
            attempts: 0,
        };
        assert!(queue.redeliver(item));

        let redelivered = receiver.recv().await.unwrap();
        assert_eq!(redelivered.attempts, 1);
    }
}
