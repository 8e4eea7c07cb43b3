mod dialect_refiner;
mod diarizer;
mod job_repository;
mod media_store;
mod repository_error;
mod service_error;
mod speech_synthesizer;
mod stt_engine;
mod transcoder;
mod translator;
mod webhook_notifier;

pub use dialect_refiner::DialectRefiner;
pub use diarizer::{Diarizer, SpeakerAnnotation};
pub use job_repository::JobRepository;
pub use media_store::{MediaStore, MediaStoreError};
pub use repository_error::RepositoryError;
pub use service_error::ServiceError;
pub use speech_synthesizer::SpeechSynthesizer;
pub use stt_engine::{SttEngine, Transcript};
pub use transcoder::{MediaTranscoder, TrackPart};
pub use translator::Translator;
pub use webhook_notifier::{JobNotification, WebhookError, WebhookNotifier};
