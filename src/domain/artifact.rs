use std::fmt;
use std::str::FromStr;

/// Kind of output artifact a finished job exposes for download. Keys of the
/// job's outputs map; once written an entry is only ever overwritten under
/// the same key, never appended as a duplicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArtifactKind {
    TranscriptJson,
    Srt,
    Vtt,
    DubbedVideo,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::TranscriptJson => "transcriptJson",
            ArtifactKind::Srt => "srt",
            ArtifactKind::Vtt => "vtt",
            ArtifactKind::DubbedVideo => "dubbedVideo",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ArtifactKind::TranscriptJson => "application/json",
            ArtifactKind::Srt => "application/x-subrip",
            ArtifactKind::Vtt => "text/vtt",
            ArtifactKind::DubbedVideo => "video/mp4",
        }
    }

    pub fn filename(&self) -> &'static str {
        match self {
            ArtifactKind::TranscriptJson => "transcript.json",
            ArtifactKind::Srt => "subtitles.srt",
            ArtifactKind::Vtt => "subtitles.vtt",
            ArtifactKind::DubbedVideo => "dubbed.mp4",
        }
    }
}

impl FromStr for ArtifactKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "transcriptJson" => Ok(ArtifactKind::TranscriptJson),
            "srt" => Ok(ArtifactKind::Srt),
            "vtt" => Ok(ArtifactKind::Vtt),
            "dubbedVideo" => Ok(ArtifactKind::DubbedVideo),
            _ => Err(format!("Invalid artifact kind: {}", s)),
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
