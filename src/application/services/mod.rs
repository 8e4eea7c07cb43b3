mod job_state;
mod queue;
mod retry;
mod stages;
pub mod subtitles;
mod worker;

pub use job_state::JobState;
pub use queue::{JobQueue, MAX_DELIVERY_ATTEMPTS, QueueError, QueuedJob};
pub use retry::RetryPolicy;
pub use stages::{SttOutcome, StageContext, StageError};
pub use worker::PipelineWorker;
