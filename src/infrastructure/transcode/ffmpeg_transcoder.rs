use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;

use crate::application::ports::{MediaTranscoder, ServiceError, TrackPart};

/// ffmpeg subprocess adapter. Every operation is one bounded invocation:
/// args in, exit code and stderr out. A non-zero exit is a permanent
/// failure of the stage; the adapter never retries.
pub struct FfmpegTranscoder {
    ffmpeg_path: String,
    ffprobe_path: String,
}

impl FfmpegTranscoder {
    pub fn new(ffmpeg_path: &str, ffprobe_path: &str) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.to_string(),
            ffprobe_path: ffprobe_path.to_string(),
        }
    }

    async fn run(&self, args: &[String]) -> Result<(), ServiceError> {
        tracing::debug!(args = ?args, "Running ffmpeg");

        let output = Command::new(&self.ffmpeg_path)
            .args(args)
            .output()
            .await
            .map_err(|e| ServiceError::Permanent(format!("spawning ffmpeg: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: String = stderr
                .chars()
                .rev()
                .take(500)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            return Err(ServiceError::Permanent(format!(
                "ffmpeg exited with {}: {}",
                output.status, tail
            )));
        }
        Ok(())
    }
}

fn arg(path: &Path) -> String {
    path.display().to_string()
}

#[async_trait]
impl MediaTranscoder for FfmpegTranscoder {
    async fn normalize_audio(&self, input: &Path, output: &Path) -> Result<(), ServiceError> {
        self.run(&[
            "-y".to_string(),
            "-i".to_string(),
            arg(input),
            "-ac".to_string(),
            "1".to_string(),
            "-ar".to_string(),
            "16000".to_string(),
            "-af".to_string(),
            "afftdn,loudnorm".to_string(),
            "-vn".to_string(),
            arg(output),
        ])
        .await
    }

    async fn stretch_audio(
        &self,
        input: &Path,
        output: &Path,
        ratio: f64,
    ) -> Result<(), ServiceError> {
        // atempo accepts 0.5..=2.0 per invocation; the slot fitting never
        // needs more than that.
        let ratio = ratio.clamp(0.5, 2.0);
        self.run(&[
            "-y".to_string(),
            "-i".to_string(),
            arg(input),
            "-filter:a".to_string(),
            format!("atempo={}", ratio),
            "-vn".to_string(),
            arg(output),
        ])
        .await
    }

    async fn probe_duration_ms(&self, path: &Path) -> Result<u64, ServiceError> {
        let output = Command::new(&self.ffprobe_path)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path)
            .output()
            .await
            .map_err(|e| ServiceError::Permanent(format!("spawning ffprobe: {}", e)))?;

        if !output.status.success() {
            return Err(ServiceError::Permanent(format!(
                "ffprobe exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        let seconds: f64 = String::from_utf8_lossy(&output.stdout)
            .trim()
            .parse()
            .map_err(|e| ServiceError::Permanent(format!("parsing ffprobe duration: {}", e)))?;
        Ok((seconds * 1000.0).round() as u64)
    }

    async fn assemble_track(
        &self,
        parts: &[TrackPart],
        output: &Path,
    ) -> Result<(), ServiceError> {
        let scratch = output
            .parent()
            .ok_or_else(|| ServiceError::Permanent("track output has no parent".to_string()))?;

        let mut list = String::new();
        for (i, part) in parts.iter().enumerate() {
            match part {
                TrackPart::Clip { path } => {
                    list.push_str(&format!("file '{}'\n", path.display()));
                }
                TrackPart::Silence { duration_ms } => {
                    let silence = scratch.join(format!("silence_{}.mp3", i));
                    self.run(&[
                        "-y".to_string(),
                        "-f".to_string(),
                        "lavfi".to_string(),
                        "-i".to_string(),
                        "anullsrc=r=44100:cl=mono".to_string(),
                        "-t".to_string(),
                        format!("{:.3}", *duration_ms as f64 / 1000.0),
                        arg(&silence),
                    ])
                    .await?;
                    list.push_str(&format!("file '{}'\n", silence.display()));
                }
            }
        }

        let list_path = scratch.join("track_parts.txt");
        tokio::fs::write(&list_path, list)
            .await
            .map_err(|e| ServiceError::Permanent(format!("writing concat list: {}", e)))?;

        self.run(&[
            "-y".to_string(),
            "-f".to_string(),
            "concat".to_string(),
            "-safe".to_string(),
            "0".to_string(),
            "-i".to_string(),
            arg(&list_path),
            arg(output),
        ])
        .await
    }

    async fn mux(
        &self,
        video: &Path,
        audio: &Path,
        subtitles: &Path,
        output: &Path,
    ) -> Result<(), ServiceError> {
        self.run(&[
            "-y".to_string(),
            "-i".to_string(),
            arg(video),
            "-i".to_string(),
            arg(audio),
            "-map".to_string(),
            "0:v".to_string(),
            "-map".to_string(),
            "1:a".to_string(),
            "-c:v".to_string(),
            "libx264".to_string(),
            "-crf".to_string(),
            "28".to_string(),
            "-preset".to_string(),
            "medium".to_string(),
            "-vf".to_string(),
            format!("subtitles={}", subtitles.display()),
            "-c:a".to_string(),
            "aac".to_string(),
            "-b:a".to_string(),
            "64k".to_string(),
            "-movflags".to_string(),
            "+faststart".to_string(),
            arg(output),
        ])
        .await
    }
}
