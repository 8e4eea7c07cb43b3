use serde::{Deserialize, Serialize};

/// A timed utterance, the unit flowing through every pipeline stage.
///
/// `text` is the current working text and is overwritten by each
/// text-mutating stage; `original_text` is set once at transcription and
/// never touched again. Speaker and voice metadata arrive with diarization
/// and stay optional: a job can finish without them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub original_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalized_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edited_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Unknown,
}

impl Segment {
    pub fn new(start: f64, end: f64, text: String) -> Self {
        Self {
            start,
            end,
            original_text: text.clone(),
            text,
            normalized_text: None,
            edited_text: None,
            speaker_id: None,
            voice_id: None,
            gender: None,
        }
    }

    pub fn duration_secs(&self) -> f64 {
        self.end - self.start
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum MalformedSegments {
    #[error("segment {index}: end {end} is not after start {start}")]
    InvertedTimestamps { index: usize, start: f64, end: f64 },
    #[error("segment {index}: negative start {start}")]
    NegativeStart { index: usize, start: f64 },
    #[error("segment {index} starts at {start} before segment {prev_index} at {prev_start}")]
    OutOfOrder {
        index: usize,
        start: f64,
        prev_index: usize,
        prev_start: f64,
    },
}

/// Validate a segment batch before a stage consumes it. Ordering is fixed by
/// ascending start; timestamps must satisfy `0 <= start < end`.
pub fn validate_batch(segments: &[Segment]) -> Result<(), MalformedSegments> {
    let mut prev: Option<(usize, f64)> = None;
    for (index, segment) in segments.iter().enumerate() {
        if segment.start < 0.0 || !segment.start.is_finite() {
            return Err(MalformedSegments::NegativeStart {
                index,
                start: segment.start,
            });
        }
        if !segment.end.is_finite() || segment.end <= segment.start {
            return Err(MalformedSegments::InvertedTimestamps {
                index,
                start: segment.start,
                end: segment.end,
            });
        }
        if let Some((prev_index, prev_start)) = prev {
            if segment.start < prev_start {
                return Err(MalformedSegments::OutOfOrder {
                    index,
                    start: segment.start,
                    prev_index,
                    prev_start,
                });
            }
        }
        prev = Some((index, segment.start));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_valid_ordered_segments_when_validating_then_batch_accepted() {
        let segments = vec![
            Segment::new(0.0, 1.5, "hello".to_string()),
            Segment::new(1.5, 3.0, "world".to_string()),
        ];
        assert_eq!(validate_batch(&segments), Ok(()));
    }

    #[test]
    fn given_inverted_timestamps_when_validating_then_batch_rejected() {
        let segments = vec![Segment::new(2.0, 1.0, "oops".to_string())];
        assert_eq!(
            validate_batch(&segments),
            Err(MalformedSegments::InvertedTimestamps {
                index: 0,
                start: 2.0,
                end: 1.0,
            })
        );
    }

    #[test]
    fn given_zero_length_segment_when_validating_then_batch_rejected() {
        let segments = vec![Segment::new(1.0, 1.0, "empty".to_string())];
        assert!(validate_batch(&segments).is_err());
    }

    #[test]
    fn given_out_of_order_segments_when_validating_then_batch_rejected() {
        let segments = vec![
            Segment::new(5.0, 6.0, "b".to_string()),
            Segment::new(0.0, 1.0, "a".to_string()),
        ];
        assert!(matches!(
            validate_batch(&segments),
            Err(MalformedSegments::OutOfOrder { index: 1, .. })
        ));
    }

    #[test]
    fn given_segment_when_serialized_then_wire_form_is_camel_case() {
        let mut segment = Segment::new(0.0, 1.0, "salut".to_string());
        segment.speaker_id = Some("SPEAKER_00".to_string());
        let json = serde_json::to_value(&segment).unwrap();
        assert_eq!(json["originalText"], "salut");
        assert_eq!(json["speakerId"], "SPEAKER_00");
        assert!(json.get("voiceId").is_none());
    }
}
