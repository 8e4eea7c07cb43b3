use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::Mutex;

use dubforge::application::ports::{JobRepository, MediaStore, WebhookNotifier};
use dubforge::application::services::{JobQueue, PipelineWorker, RetryPolicy, StageContext};
use dubforge::domain::JobStatus;
use dubforge::infrastructure::dialect::HelperProcessRefiner;
use dubforge::infrastructure::diarization::HttpDiarizer;
use dubforge::infrastructure::observability::{TracingConfig, init_tracing};
use dubforge::infrastructure::persistence::{
    InMemoryJobRepository, PgJobRepository, create_pool, run_migrations,
};
use dubforge::infrastructure::storage::LocalMediaStore;
use dubforge::infrastructure::stt::WhisperApiEngine;
use dubforge::infrastructure::synthesis::SpeechApiSynthesizer;
use dubforge::infrastructure::transcode::FfmpegTranscoder;
use dubforge::infrastructure::translation::LlmTranslator;
use dubforge::infrastructure::webhook::HttpWebhookNotifier;
use dubforge::presentation::{AppState, Environment, Settings, create_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::from_env();

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".to_string())
        .try_into()
        .map_err(anyhow::Error::msg)?;

    init_tracing(
        TracingConfig {
            environment: environment.to_string(),
            json_format: settings.logging.enable_json,
        },
        settings.server.port,
    );

    let job_repository: Arc<dyn JobRepository> = match &settings.database.url {
        Some(url) => {
            let pool = create_pool(url, settings.database.max_connections).await?;
            run_migrations(&pool).await?;
            Arc::new(PgJobRepository::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory job repository");
            Arc::new(InMemoryJobRepository::new())
        }
    };

    let media_store: Arc<dyn MediaStore> =
        Arc::new(LocalMediaStore::new(PathBuf::from(&settings.storage.media_dir))?);

    let transcoder = Arc::new(FfmpegTranscoder::new(
        &settings.transcode.ffmpeg_path,
        &settings.transcode.ffprobe_path,
    ));

    let stages = Arc::new(StageContext {
        stt: Arc::new(WhisperApiEngine::new(
            &settings.stt.endpoint,
            &settings.stt.api_key,
            &settings.stt.model,
        )),
        diarizer: Arc::new(HttpDiarizer::new(&settings.diarization.base_url)),
        translator: Arc::new(LlmTranslator::new(
            &settings.translation.endpoint,
            &settings.translation.api_key,
            &settings.translation.model,
        )),
        refiner: Arc::new(HelperProcessRefiner::new(
            &settings.dialect.helper_command,
            settings.dialect.helper_args.clone(),
            Duration::from_secs(settings.dialect.helper_timeout_secs),
        )),
        synthesizer: Arc::new(SpeechApiSynthesizer::new(
            &settings.synthesis.base_url,
            &settings.synthesis.api_key,
            &settings.synthesis.model_id,
            &settings.synthesis.default_voice,
            transcoder.clone(),
        )),
        transcoder,
        retry: RetryPolicy {
            max_attempts: settings.pipeline.retry_max_attempts,
            initial_delay: Duration::from_millis(settings.pipeline.retry_initial_delay_ms),
            warmup_delay: Duration::from_secs(settings.pipeline.retry_warmup_delay_secs),
        },
        refinable_dialects: settings.dialect.refinable.clone(),
    });

    let notifier: Arc<dyn WebhookNotifier> =
        Arc::new(HttpWebhookNotifier::new(&settings.webhook.secret)?);

    let (queue, receiver) = JobQueue::new(settings.pipeline.queue_capacity);
    let receiver = Arc::new(Mutex::new(receiver));

    for worker_id in 0..settings.pipeline.workers.max(1) {
        let worker = PipelineWorker {
            worker_id,
            queue: queue.clone(),
            receiver: Arc::clone(&receiver),
            repository: Arc::clone(&job_repository),
            store: Arc::clone(&media_store),
            notifier: Arc::clone(&notifier),
            stages: Arc::clone(&stages),
            work_root: PathBuf::from(&settings.storage.work_dir),
            public_base_url: settings.server.public_base_url.clone(),
        };
        tokio::spawn(worker.run());
    }

    // Jobs caught mid-flight by the previous process restart from the top
    // of the pipeline; overwrite semantics keep their outputs consistent.
    match job_repository.list_by_status(JobStatus::Processing).await {
        Ok(stuck) => {
            for job in stuck {
                tracing::warn!(job_id = %job.id, stage = %job.stage, "Requeueing interrupted job");
                if let Err(e) = job_repository.reset_for_requeue(job.id).await {
                    tracing::error!(job_id = %job.id, error = %e, "Failed to reset interrupted job");
                    continue;
                }
                if let Err(e) = queue.enqueue(job.id).await {
                    tracing::error!(job_id = %job.id, error = %e, "Failed to requeue interrupted job");
                }
            }
        }
        Err(e) => tracing::error!(error = %e, "Failed to scan for interrupted jobs"),
    }

    let state = AppState {
        job_repository,
        media_store,
        queue,
        settings: settings.clone(),
    };

    let router = create_router(state);
    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, workers = settings.pipeline.workers, "Listening");

    axum::serve(listener, router).await?;
    Ok(())
}
