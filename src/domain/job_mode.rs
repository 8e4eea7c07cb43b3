use std::fmt;
use std::str::FromStr;

/// What the caller asked for. The mode decides which pipeline stages run:
/// `Transcribe` stops after speech-to-text and diarization, `Translate`
/// adds the translation stage, `Dub` adds synthesis and muxing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobMode {
    Transcribe,
    Translate,
    Dub,
}

impl JobMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobMode::Transcribe => "transcribe",
            JobMode::Translate => "translate",
            JobMode::Dub => "dub",
        }
    }

    pub fn wants_translation(&self) -> bool {
        matches!(self, JobMode::Translate | JobMode::Dub)
    }

    pub fn wants_dubbing(&self) -> bool {
        matches!(self, JobMode::Dub)
    }

    pub fn requires_target_lang(&self) -> bool {
        self.wants_translation()
    }
}

impl FromStr for JobMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "transcribe" => Ok(JobMode::Transcribe),
            "translate" => Ok(JobMode::Translate),
            "dub" => Ok(JobMode::Dub),
            _ => Err(format!("Invalid job mode: {}", s)),
        }
    }
}

impl fmt::Display for JobMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
