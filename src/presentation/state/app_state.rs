use std::sync::Arc;

use crate::application::ports::{JobRepository, MediaStore};
use crate::application::services::JobQueue;
use crate::presentation::config::Settings;

#[derive(Clone)]
pub struct AppState {
    pub job_repository: Arc<dyn JobRepository>,
    pub media_store: Arc<dyn MediaStore>,
    pub queue: JobQueue,
    pub settings: Settings,
}
