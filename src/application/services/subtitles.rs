use crate::domain::Segment;

/// Subtitle rendering and parsing. Pure functions of segment order and
/// timestamps: the same segment list always produces the same bytes, and an
/// SRT document parses back into the exact (start, end, text) tuples at
/// millisecond precision.
///
/// Internal line breaks in segment text are collapsed to spaces so one
/// segment is always one cue line.

#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleCue {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SubtitleParseError {
    #[error("cue {0}: missing timing line")]
    MissingTiming(usize),
    #[error("cue {0}: malformed timing line: {1}")]
    MalformedTiming(usize, String),
    #[error("cue {0}: malformed timestamp: {1}")]
    MalformedTimestamp(usize, String),
}

fn millis(seconds: f64) -> u64 {
    (seconds * 1000.0).round() as u64
}

fn format_timestamp(seconds: f64, millis_sep: char) -> String {
    let total_ms = millis(seconds);
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let ms = total_ms % 1000;
    format!("{:02}:{:02}:{:02}{}{:03}", hours, minutes, secs, millis_sep, ms)
}

fn cue_text(segment: &Segment) -> String {
    segment
        .text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render the standard indexed timed-text document: index,
/// `HH:MM:SS,mmm --> HH:MM:SS,mmm`, text, blank line.
pub fn srt_document(segments: &[Segment]) -> String {
    let mut doc = String::new();
    for (i, segment) in segments.iter().enumerate() {
        doc.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            i + 1,
            format_timestamp(segment.start, ','),
            format_timestamp(segment.end, ','),
            cue_text(segment),
        ));
    }
    doc
}

/// Render the WebVTT variant of the same cues.
pub fn vtt_document(segments: &[Segment]) -> String {
    let mut doc = String::from("WEBVTT\n\n");
    for (i, segment) in segments.iter().enumerate() {
        doc.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            i + 1,
            format_timestamp(segment.start, '.'),
            format_timestamp(segment.end, '.'),
            cue_text(segment),
        ));
    }
    doc
}

fn parse_timestamp(raw: &str, cue: usize) -> Result<f64, SubtitleParseError> {
    let malformed = || SubtitleParseError::MalformedTimestamp(cue, raw.to_string());

    let (hms, ms) = raw.split_once(',').ok_or_else(malformed)?;
    let mut parts = hms.split(':');
    let hours: u64 = parts
        .next()
        .and_then(|p| p.parse().ok())
        .ok_or_else(malformed)?;
    let minutes: u64 = parts
        .next()
        .and_then(|p| p.parse().ok())
        .ok_or_else(malformed)?;
    let seconds: u64 = parts
        .next()
        .and_then(|p| p.parse().ok())
        .ok_or_else(malformed)?;
    if parts.next().is_some() {
        return Err(malformed());
    }
    let ms: u64 = ms.parse().map_err(|_| malformed())?;

    let total_ms = hours * 3_600_000 + minutes * 60_000 + seconds * 1000 + ms;
    Ok(total_ms as f64 / 1000.0)
}

/// Parse an SRT document back into ordered cues.
pub fn parse_srt(doc: &str) -> Result<Vec<SubtitleCue>, SubtitleParseError> {
    let mut cues = Vec::new();

    for (cue_index, block) in doc
        .split("\n\n")
        .map(str::trim_end)
        .filter(|b| !b.trim().is_empty())
        .enumerate()
    {
        let mut lines = block.lines();
        let first = lines.next().unwrap_or_default();
        // The index line is optional in the wild; detect it by shape.
        let timing_line = if first.trim().parse::<u64>().is_ok() {
            lines
                .next()
                .ok_or(SubtitleParseError::MissingTiming(cue_index))?
        } else {
            first
        };

        let (start_raw, end_raw) = timing_line
            .split_once(" --> ")
            .ok_or_else(|| SubtitleParseError::MalformedTiming(cue_index, timing_line.to_string()))?;

        let start = parse_timestamp(start_raw.trim(), cue_index)?;
        let end = parse_timestamp(end_raw.trim(), cue_index)?;
        let text = lines.collect::<Vec<_>>().join(" ");

        cues.push(SubtitleCue { start, end, text });
    }

    Ok(cues)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(start: f64, end: f64, text: &str) -> Segment {
        Segment::new(start, end, text.to_string())
    }

    #[test]
    fn given_segments_when_rendering_srt_then_document_is_indexed_timed_text() {
        let segments = vec![
            segment(0.0, 2.5, "First line"),
            segment(2.5, 5.0, "Second line"),
        ];
        let doc = srt_document(&segments);
        assert_eq!(
            doc,
            "1\n00:00:00,000 --> 00:00:02,500\nFirst line\n\n\
             2\n00:00:02,500 --> 00:00:05,000\nSecond line\n\n"
        );
    }

    #[test]
    fn given_hour_scale_timestamps_when_rendering_then_fields_carry() {
        let segments = vec![segment(3661.042, 3723.999, "Late cue")];
        let doc = srt_document(&segments);
        assert!(doc.contains("01:01:01,042 --> 01:02:03,999"));
    }

    #[test]
    fn given_rendered_document_when_parsed_then_cues_round_trip() {
        let segments = vec![
            segment(0.0, 1.25, "One"),
            segment(1.25, 3.9, "Two words"),
            segment(3.9, 10.0, "Three whole words"),
        ];
        let cues = parse_srt(&srt_document(&segments)).unwrap();
        assert_eq!(cues.len(), segments.len());
        for (cue, seg) in cues.iter().zip(&segments) {
            assert_eq!(cue.start, seg.start);
            assert_eq!(cue.end, seg.end);
            assert_eq!(cue.text, seg.text);
        }
    }

    #[test]
    fn given_multiline_text_when_rendering_then_line_breaks_collapse() {
        let segments = vec![segment(0.0, 1.0, "broken\nacross\nlines")];
        let cues = parse_srt(&srt_document(&segments)).unwrap();
        assert_eq!(cues[0].text, "broken across lines");
    }

    #[test]
    fn given_same_segments_when_rendering_twice_then_output_is_identical() {
        let segments = vec![segment(0.5, 2.0, "deterministic")];
        assert_eq!(srt_document(&segments), srt_document(&segments));
        assert_eq!(vtt_document(&segments), vtt_document(&segments));
    }

    #[test]
    fn given_vtt_output_when_rendering_then_header_and_dot_separator_used() {
        let segments = vec![segment(0.0, 1.5, "hello")];
        let doc = vtt_document(&segments);
        assert!(doc.starts_with("WEBVTT\n\n"));
        assert!(doc.contains("00:00:00.000 --> 00:00:01.500"));
    }

    #[test]
    fn given_malformed_timing_when_parsing_then_error_names_cue() {
        let doc = "1\n00:00:00,000 -> 00:00:01,000\nbad arrow\n\n";
        assert!(matches!(
            parse_srt(doc),
            Err(SubtitleParseError::MalformedTiming(0, _))
        ));
    }
}
