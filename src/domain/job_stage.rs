use std::fmt;
use std::str::FromStr;

/// A named phase of the pipeline with a fixed position in the total order.
/// A job's stage only ever moves forward; stages inapplicable to the job's
/// mode are skipped, never revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JobStage {
    Upload,
    Stt,
    Translate,
    Tts,
    Mux,
}

impl JobStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStage::Upload => "upload",
            JobStage::Stt => "stt",
            JobStage::Translate => "translate",
            JobStage::Tts => "tts",
            JobStage::Mux => "mux",
        }
    }

    /// Position in the fixed stage order.
    pub fn ordinal(&self) -> u8 {
        match self {
            JobStage::Upload => 0,
            JobStage::Stt => 1,
            JobStage::Translate => 2,
            JobStage::Tts => 3,
            JobStage::Mux => 4,
        }
    }
}

impl FromStr for JobStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upload" => Ok(JobStage::Upload),
            "stt" => Ok(JobStage::Stt),
            "translate" => Ok(JobStage::Translate),
            "tts" => Ok(JobStage::Tts),
            "mux" => Ok(JobStage::Mux),
            _ => Err(format!("Invalid job stage: {}", s)),
        }
    }
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
