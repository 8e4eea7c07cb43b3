mod environment;
mod settings;

pub use environment::Environment;
pub use settings::{
    DatabaseSettings, DialectSettings, DiarizationSettings, LoggingSettings, PipelineSettings,
    ServerSettings, Settings, StorageSettings, SttSettings, SynthesisSettings, TranscodeSettings,
    TranslationSettings, WebhookSettings,
};
