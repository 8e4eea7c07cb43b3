#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use dubforge::application::ports::{
    DialectRefiner, Diarizer, JobNotification, JobRepository, MediaStore, MediaTranscoder,
    RepositoryError, ServiceError, SpeakerAnnotation, SpeechSynthesizer, SttEngine, TrackPart,
    Transcript, Translator, WebhookError, WebhookNotifier,
};
use dubforge::application::services::{JobQueue, PipelineWorker, RetryPolicy, StageContext};
use dubforge::domain::{
    ArtifactKind, Gender, Job, JobId, JobMode, JobStage, JobStatus, MediaInput, Segment,
    StoragePath,
};
use dubforge::infrastructure::persistence::InMemoryJobRepository;
use dubforge::infrastructure::storage::InMemoryMediaStore;

pub fn seg(start: f64, end: f64, text: &str) -> Segment {
    Segment::new(start, end, text.to_string())
}

// --- speech-to-text ---

pub enum SttScript {
    Ok(Vec<Segment>),
    AlwaysTransient,
}

pub struct MockSttEngine {
    pub script: SttScript,
}

#[async_trait::async_trait]
impl SttEngine for MockSttEngine {
    async fn transcribe(
        &self,
        _audio: &[u8],
        language_hint: Option<&str>,
    ) -> Result<Transcript, ServiceError> {
        match &self.script {
            SttScript::Ok(segments) => Ok(Transcript {
                detected_language: language_hint.map(String::from),
                segments: segments.clone(),
            }),
            SttScript::AlwaysTransient => {
                Err(ServiceError::Transient("stt offline".to_string()))
            }
        }
    }
}

// --- diarization ---

pub enum DiarizerScript {
    Annotate,
    AlwaysFail,
    WrongCardinality,
}

pub struct MockDiarizer {
    pub script: DiarizerScript,
}

#[async_trait::async_trait]
impl Diarizer for MockDiarizer {
    async fn diarize(
        &self,
        _audio_path: &Path,
        segments: &[Segment],
    ) -> Result<Vec<SpeakerAnnotation>, ServiceError> {
        match self.script {
            DiarizerScript::Annotate => Ok(segments
                .iter()
                .enumerate()
                .map(|(i, _)| SpeakerAnnotation {
                    speaker_id: format!("SPEAKER_{:02}", i % 2),
                    voice_id: "nPczCjzI2devNBz1zQrb".to_string(),
                    gender: if i % 2 == 0 {
                        Gender::Male
                    } else {
                        Gender::Female
                    },
                })
                .collect()),
            DiarizerScript::AlwaysFail => {
                Err(ServiceError::Transient("diarizer down".to_string()))
            }
            DiarizerScript::WrongCardinality => Ok(vec![SpeakerAnnotation {
                speaker_id: "SPEAKER_00".to_string(),
                voice_id: "nPczCjzI2devNBz1zQrb".to_string(),
                gender: Gender::Male,
            }]),
        }
    }
}

// --- translation ---

pub enum TranslatorScript {
    Prefix(&'static str),
    WrongCount,
    AlwaysFail,
}

pub struct MockTranslator {
    pub script: TranslatorScript,
}

#[async_trait::async_trait]
impl Translator for MockTranslator {
    async fn translate(
        &self,
        segments: &[Segment],
        _source_lang: &str,
        _target_lang: &str,
    ) -> Result<Vec<String>, ServiceError> {
        match self.script {
            TranslatorScript::Prefix(prefix) => Ok(segments
                .iter()
                .map(|s| format!("{}{}", prefix, s.text))
                .collect()),
            TranslatorScript::WrongCount => Ok(vec!["only one".to_string()]),
            TranslatorScript::AlwaysFail => {
                Err(ServiceError::Transient("translator down".to_string()))
            }
        }
    }
}

// --- dialect refinement ---

pub struct NoopRefiner;

#[async_trait::async_trait]
impl DialectRefiner for NoopRefiner {
    async fn correct(&self, _text: &str) -> Result<Option<String>, ServiceError> {
        Ok(None)
    }
}

// --- synthesis ---

pub enum SynthesizerScript {
    Ok,
    AlwaysPermanent,
}

pub struct MockSynthesizer {
    pub script: SynthesizerScript,
}

#[async_trait::async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    async fn synthesize_track(
        &self,
        _segments: &[Segment],
        _lang: &str,
        workdir: &Path,
    ) -> Result<PathBuf, ServiceError> {
        match self.script {
            SynthesizerScript::Ok => {
                let track = workdir.join("dub_track.mp3");
                tokio::fs::write(&track, b"tts-track")
                    .await
                    .map_err(|e| ServiceError::Permanent(e.to_string()))?;
                Ok(track)
            }
            SynthesizerScript::AlwaysPermanent => {
                Err(ServiceError::Permanent("voice api rejected request".to_string()))
            }
        }
    }
}

// --- transcoding ---

pub struct MockTranscoder;

#[async_trait::async_trait]
impl MediaTranscoder for MockTranscoder {
    async fn normalize_audio(&self, _input: &Path, output: &Path) -> Result<(), ServiceError> {
        tokio::fs::write(output, b"normalized-wav")
            .await
            .map_err(|e| ServiceError::Permanent(e.to_string()))
    }

    async fn stretch_audio(
        &self,
        input: &Path,
        output: &Path,
        _ratio: f64,
    ) -> Result<(), ServiceError> {
        tokio::fs::copy(input, output)
            .await
            .map(|_| ())
            .map_err(|e| ServiceError::Permanent(e.to_string()))
    }

    async fn probe_duration_ms(&self, _path: &Path) -> Result<u64, ServiceError> {
        Ok(1000)
    }

    async fn assemble_track(
        &self,
        _parts: &[TrackPart],
        output: &Path,
    ) -> Result<(), ServiceError> {
        tokio::fs::write(output, b"assembled-track")
            .await
            .map_err(|e| ServiceError::Permanent(e.to_string()))
    }

    async fn mux(
        &self,
        _video: &Path,
        _audio: &Path,
        _subtitles: &Path,
        output: &Path,
    ) -> Result<(), ServiceError> {
        tokio::fs::write(output, b"muxed-video")
            .await
            .map_err(|e| ServiceError::Permanent(e.to_string()))
    }
}

// --- webhook ---

#[derive(Default)]
pub struct RecordingNotifier {
    pub notifications: Mutex<Vec<JobNotification>>,
}

#[async_trait::async_trait]
impl WebhookNotifier for RecordingNotifier {
    async fn notify(&self, notification: &JobNotification) -> Result<(), WebhookError> {
        self.notifications.lock().await.push(notification.clone());
        Ok(())
    }
}

// --- state-transition recording ---

pub struct RecordingRepository {
    inner: InMemoryJobRepository,
    pub transitions: Mutex<Vec<(JobStage, u8, JobStatus)>>,
}

impl RecordingRepository {
    pub fn new() -> Self {
        Self {
            inner: InMemoryJobRepository::new(),
            transitions: Mutex::new(Vec::new()),
        }
    }

    async fn record(&self, job: &Job) {
        self.transitions
            .lock()
            .await
            .push((job.stage, job.progress, job.status));
    }
}

#[async_trait::async_trait]
impl JobRepository for RecordingRepository {
    async fn create(&self, job: &Job) -> Result<(), RepositoryError> {
        self.inner.create(job).await
    }

    async fn get_by_id(&self, id: JobId) -> Result<Option<Job>, RepositoryError> {
        self.inner.get_by_id(id).await
    }

    async fn set_stage(
        &self,
        id: JobId,
        stage: JobStage,
        progress: u8,
    ) -> Result<Job, RepositoryError> {
        let job = self.inner.set_stage(id, stage, progress).await?;
        self.record(&job).await;
        Ok(job)
    }

    async fn mark_done(
        &self,
        id: JobId,
        outputs: &BTreeMap<ArtifactKind, StoragePath>,
    ) -> Result<Job, RepositoryError> {
        let job = self.inner.mark_done(id, outputs).await?;
        self.record(&job).await;
        Ok(job)
    }

    async fn mark_failed(&self, id: JobId, error: &str) -> Result<Job, RepositoryError> {
        let job = self.inner.mark_failed(id, error).await?;
        self.record(&job).await;
        Ok(job)
    }

    async fn reset_for_requeue(&self, id: JobId) -> Result<Job, RepositoryError> {
        let job = self.inner.reset_for_requeue(id).await?;
        self.record(&job).await;
        Ok(job)
    }

    async fn list_by_status(&self, status: JobStatus) -> Result<Vec<Job>, RepositoryError> {
        self.inner.list_by_status(status).await
    }
}

// --- harness ---

pub struct PipelineHarness {
    pub repository: Arc<RecordingRepository>,
    pub store: Arc<InMemoryMediaStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub queue: JobQueue,
    pub work_root: tempfile::TempDir,
}

impl PipelineHarness {
    pub fn spawn(
        stt: SttScript,
        diarizer: DiarizerScript,
        translator: TranslatorScript,
        synthesizer: SynthesizerScript,
    ) -> Self {
        let repository = Arc::new(RecordingRepository::new());
        let store = Arc::new(InMemoryMediaStore::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let work_root = tempfile::tempdir().expect("tempdir");

        let stages = Arc::new(StageContext {
            stt: Arc::new(MockSttEngine { script: stt }),
            diarizer: Arc::new(MockDiarizer { script: diarizer }),
            translator: Arc::new(MockTranslator { script: translator }),
            refiner: Arc::new(NoopRefiner),
            synthesizer: Arc::new(MockSynthesizer {
                script: synthesizer,
            }),
            transcoder: Arc::new(MockTranscoder),
            retry: RetryPolicy::immediate(3),
            refinable_dialects: vec![],
        });

        let (queue, receiver) = JobQueue::new(16);
        let worker = PipelineWorker {
            worker_id: 0,
            queue: queue.clone(),
            receiver: Arc::new(Mutex::new(receiver)),
            repository: Arc::clone(&repository) as Arc<dyn JobRepository>,
            store: Arc::clone(&store) as Arc<dyn MediaStore>,
            notifier: Arc::clone(&notifier) as Arc<dyn WebhookNotifier>,
            stages,
            work_root: work_root.path().to_path_buf(),
            public_base_url: "http://localhost:3000".to_string(),
        };
        tokio::spawn(worker.run());

        Self {
            repository,
            store,
            notifier,
            queue,
            work_root,
        }
    }

    pub async fn submit(
        &self,
        mode: JobMode,
        source_lang: &str,
        target_lang: Option<&str>,
        callback_url: Option<&str>,
    ) -> JobId {
        let storage_path = StoragePath::from_raw("uploads/test/clip.mp4");
        self.store
            .store_bytes(&storage_path, b"fake-video-bytes".to_vec())
            .await
            .expect("staging upload");

        let job = Job::new(
            mode,
            source_lang.to_string(),
            target_lang.map(String::from),
            MediaInput {
                filename: "clip.mp4".to_string(),
                storage_path,
                size_bytes: 16,
            },
            callback_url.map(String::from),
        )
        .expect("valid job");
        let job_id = job.id;

        self.repository.create(&job).await.expect("creating job");
        self.queue.enqueue(job_id).await.expect("enqueueing job");
        job_id
    }

    pub async fn wait_terminal(&self, job_id: JobId) -> Job {
        for _ in 0..500 {
            let job = self
                .repository
                .get_by_id(job_id)
                .await
                .expect("fetching job")
                .expect("job exists");
            if job.status.is_terminal() {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job did not reach a terminal status in time");
    }

    pub async fn fetch_segments(&self, job: &Job) -> Vec<Segment> {
        let path = job
            .outputs
            .get(&ArtifactKind::TranscriptJson)
            .expect("transcript artifact registered");
        let bytes = self.store.fetch(path).await.expect("transcript stored");
        serde_json::from_slice(&bytes).expect("transcript parses as segment array")
    }
}
