use std::env;
use std::str::FromStr;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub database: DatabaseSettings,
    pub stt: SttSettings,
    pub diarization: DiarizationSettings,
    pub translation: TranslationSettings,
    pub synthesis: SynthesisSettings,
    pub dialect: DialectSettings,
    pub transcode: TranscodeSettings,
    pub webhook: WebhookSettings,
    pub pipeline: PipelineSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Base URL callers can reach this service on; used to build the
    /// result link carried by webhooks.
    pub public_base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    pub media_dir: String,
    pub work_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// Absent means the in-memory repository (single-node mode).
    pub url: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SttSettings {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiarizationSettings {
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranslationSettings {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SynthesisSettings {
    pub base_url: String,
    pub api_key: String,
    pub model_id: String,
    pub default_voice: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DialectSettings {
    pub helper_command: String,
    pub helper_args: Vec<String>,
    pub helper_timeout_secs: u64,
    /// Source languages routed through the refinement sub-step.
    pub refinable: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranscodeSettings {
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookSettings {
    pub secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineSettings {
    pub workers: usize,
    pub queue_capacity: usize,
    pub retry_max_attempts: u32,
    pub retry_initial_delay_ms: u64,
    pub retry_warmup_delay_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    pub enable_json: bool,
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn list_or(key: &str, default: &[&str]) -> Vec<String> {
    env::var(key)
        .map(|v| {
            v.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_else(|_| default.iter().map(|s| s.to_string()).collect())
}

impl Settings {
    pub fn from_env() -> Self {
        let port: u16 = parse_or("SERVER_PORT", 3000);
        Self {
            server: ServerSettings {
                host: var_or("SERVER_HOST", "0.0.0.0"),
                port,
                public_base_url: var_or(
                    "PUBLIC_BASE_URL",
                    &format!("http://localhost:{}", port),
                ),
            },
            storage: StorageSettings {
                media_dir: var_or("MEDIA_DIR", "data/media"),
                work_dir: var_or("WORK_DIR", "data/work"),
            },
            database: DatabaseSettings {
                url: env::var("DATABASE_URL").ok(),
                max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 10),
            },
            stt: SttSettings {
                endpoint: var_or(
                    "STT_ENDPOINT",
                    "https://api.groq.com/openai/v1/audio/transcriptions",
                ),
                api_key: var_or("STT_API_KEY", ""),
                model: var_or("STT_MODEL", "whisper-large-v3"),
            },
            diarization: DiarizationSettings {
                base_url: var_or("DIARIZATION_URL", "http://localhost:8001"),
            },
            translation: TranslationSettings {
                endpoint: var_or(
                    "TRANSLATION_ENDPOINT",
                    "https://api.openai.com/v1/chat/completions",
                ),
                api_key: var_or("TRANSLATION_API_KEY", ""),
                model: var_or("TRANSLATION_MODEL", "gpt-4o-mini"),
            },
            synthesis: SynthesisSettings {
                base_url: var_or("TTS_BASE_URL", "https://api.elevenlabs.io"),
                api_key: var_or("TTS_API_KEY", ""),
                model_id: var_or("TTS_MODEL_ID", "eleven_multilingual_v2"),
                default_voice: var_or("TTS_DEFAULT_VOICE", "nPczCjzI2devNBz1zQrb"),
            },
            dialect: DialectSettings {
                helper_command: var_or("DIALECT_HELPER_COMMAND", "python3"),
                helper_args: list_or("DIALECT_HELPER_ARGS", &["services/dialect_helper.py"]),
                helper_timeout_secs: parse_or("DIALECT_HELPER_TIMEOUT_SECS", 10),
                refinable: list_or("DIALECT_REFINABLE_LANGS", &["tn"]),
            },
            transcode: TranscodeSettings {
                ffmpeg_path: var_or("FFMPEG_PATH", "ffmpeg"),
                ffprobe_path: var_or("FFPROBE_PATH", "ffprobe"),
            },
            webhook: WebhookSettings {
                secret: var_or("WEBHOOK_SECRET", ""),
            },
            pipeline: PipelineSettings {
                workers: parse_or("PIPELINE_WORKERS", 2),
                queue_capacity: parse_or("PIPELINE_QUEUE_CAPACITY", 64),
                retry_max_attempts: parse_or("RETRY_MAX_ATTEMPTS", 5),
                retry_initial_delay_ms: parse_or("RETRY_INITIAL_DELAY_MS", 1000),
                retry_warmup_delay_secs: parse_or("RETRY_WARMUP_DELAY_SECS", 30),
            },
            logging: LoggingSettings {
                enable_json: parse_or("LOG_JSON", false),
            },
        }
    }
}
