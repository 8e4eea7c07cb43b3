mod artifact;
mod health;
mod job_result;
mod job_status;
mod submit;

use serde::Serialize;

pub use artifact::artifact_handler;
pub use health::health_handler;
pub use job_result::job_result_handler;
pub use job_status::job_status_handler;
pub use submit::submit_handler;

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
