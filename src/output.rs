//! # Transcript Output Rendering
//!
//! Renders a [`Transcript`] in the formats selectable through the `output`
//! parameter: plain text, JSON, SubRip, WebVTT and tab-separated values.

use crate::asr::Transcript;
use crate::error::{AppError, AppResult};

/// Response format for `/asr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Srt,
    Vtt,
    Tsv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "txt" | "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "srt" => Ok(OutputFormat::Srt),
            "vtt" => Ok(OutputFormat::Vtt),
            "tsv" => Ok(OutputFormat::Tsv),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

impl OutputFormat {
    /// MIME type for the rendered body.
    pub fn content_type(self) -> &'static str {
        match self {
            OutputFormat::Text => "text/plain; charset=utf-8",
            OutputFormat::Json => "application/json",
            OutputFormat::Srt => "application/x-subrip",
            OutputFormat::Vtt => "text/vtt",
            OutputFormat::Tsv => "text/tab-separated-values",
        }
    }

    /// Render a transcript in this format.
    pub fn render(self, transcript: &Transcript) -> AppResult<String> {
        let body = match self {
            OutputFormat::Text => render_text(transcript),
            OutputFormat::Json => serde_json::to_string(transcript)
                .map_err(|e| AppError::Internal(format!("JSON serialization failed: {}", e)))?,
            OutputFormat::Srt => render_srt(transcript),
            OutputFormat::Vtt => render_vtt(transcript),
            OutputFormat::Tsv => render_tsv(transcript),
        };
        Ok(body)
    }
}

fn render_text(transcript: &Transcript) -> String {
    if transcript.segments.is_empty() {
        return transcript.text.clone();
    }

    let mut out = String::new();
    for segment in &transcript.segments {
        out.push_str(&segment.text);
        out.push('\n');
    }
    out
}

fn render_srt(transcript: &Transcript) -> String {
    let mut out = String::new();
    for (i, segment) in transcript.segments.iter().enumerate() {
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            i + 1,
            format_timestamp(segment.start, ','),
            format_timestamp(segment.end, ','),
            segment.text
        ));
    }
    out
}

fn render_vtt(transcript: &Transcript) -> String {
    let mut out = String::from("WEBVTT\n\n");
    for segment in &transcript.segments {
        out.push_str(&format!(
            "{} --> {}\n{}\n\n",
            format_timestamp(segment.start, '.'),
            format_timestamp(segment.end, '.'),
            segment.text
        ));
    }
    out
}

fn render_tsv(transcript: &Transcript) -> String {
    let mut out = String::from("start\tend\ttext\n");
    for segment in &transcript.segments {
        out.push_str(&format!(
            "{}\t{}\t{}\n",
            (segment.start * 1000.0).round() as u64,
            (segment.end * 1000.0).round() as u64,
            segment.text
        ));
    }
    out
}

/// `HH:MM:SS<sep>mmm` — SubRip uses a comma separator, WebVTT a period.
fn format_timestamp(seconds: f64, millis_separator: char) -> String {
    let total_millis = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_millis / 3_600_000;
    let minutes = (total_millis % 3_600_000) / 60_000;
    let secs = (total_millis % 60_000) / 1000;
    let millis = total_millis % 1000;
    format!(
        "{:02}:{:02}:{:02}{}{:03}",
        hours, minutes, secs, millis_separator, millis
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asr::TranscriptSegment;

    fn sample_transcript() -> Transcript {
        let segments = vec![
            TranscriptSegment {
                id: 0,
                start: 0.0,
                end: 2.5,
                text: "Hello there.".to_string(),
                temperature: 0.0,
                avg_logprob: -0.2,
                no_speech_prob: 0.01,
                words: None,
            },
            TranscriptSegment {
                id: 1,
                start: 2.5,
                end: 3661.75,
                text: "General Kenobi.".to_string(),
                temperature: 0.0,
                avg_logprob: -0.3,
                no_speech_prob: 0.02,
                words: None,
            },
        ];
        Transcript {
            text: "Hello there. General Kenobi.".to_string(),
            language: Some("en".to_string()),
            segments,
            audio_duration: 3661.75,
            processing_time_ms: 1500,
            model: "base".to_string(),
        }
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("txt".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("TEXT".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("srt".parse::<OutputFormat>().unwrap(), OutputFormat::Srt);
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_timestamp_formatting() {
        assert_eq!(format_timestamp(0.0, ','), "00:00:00,000");
        assert_eq!(format_timestamp(2.5, ','), "00:00:02,500");
        assert_eq!(format_timestamp(3661.75, '.'), "01:01:01.750");
        // Negative times clamp rather than underflow.
        assert_eq!(format_timestamp(-1.0, ','), "00:00:00,000");
    }

    #[test]
    fn test_srt_rendering() {
        let srt = OutputFormat::Srt.render(&sample_transcript()).unwrap();
        assert!(srt.starts_with("1\n00:00:00,000 --> 00:00:02,500\nHello there.\n"));
        assert!(srt.contains("2\n00:00:02,500 --> 01:01:01,750\nGeneral Kenobi.\n"));
    }

    #[test]
    fn test_vtt_rendering() {
        let vtt = OutputFormat::Vtt.render(&sample_transcript()).unwrap();
        assert!(vtt.starts_with("WEBVTT\n\n"));
        assert!(vtt.contains("00:00:00.000 --> 00:00:02.500\nHello there.\n"));
    }

    #[test]
    fn test_tsv_rendering() {
        let tsv = OutputFormat::Tsv.render(&sample_transcript()).unwrap();
        let mut lines = tsv.lines();
        assert_eq!(lines.next(), Some("start\tend\ttext"));
        assert_eq!(lines.next(), Some("0\t2500\tHello there."));
        assert_eq!(lines.next(), Some("2500\t3661750\tGeneral Kenobi."));
    }

    #[test]
    fn test_text_rendering_is_one_segment_per_line() {
        let text = OutputFormat::Text.render(&sample_transcript()).unwrap();
        assert_eq!(text, "Hello there.\nGeneral Kenobi.\n");
    }

    #[test]
    fn test_json_rendering_includes_segments() {
        let json = OutputFormat::Json.render(&sample_transcript()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["text"], "Hello there. General Kenobi.");
        assert_eq!(value["language"], "en");
        assert_eq!(value["segments"].as_array().unwrap().len(), 2);
        assert_eq!(value["segments"][0]["start"], 0.0);
    }
}
