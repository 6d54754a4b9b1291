//! # Speech Recognition Module
//!
//! Speech-to-text inference built on Candle-rs Whisper models. Pure Rust,
//! no FFI bindings to whisper.cpp.
//!
//! ## Key Components:
//! - **Model Management**: checkpoint download, loading and special-token
//!   resolution (`model`)
//! - **Engine**: model lifecycle, concurrency limits and idle unloading
//!   (`engine`)
//! - **Device Selection**: CPU/CUDA/Metal probing (`device`)
//! - **Feature Extraction**: mel filterbank generation (`mel`)
//! - **Languages**: the Whisper language table (`language`)
//!
//! ## Whisper Model Sizes:
//! - **tiny / tiny.en**: ~39MB, fastest, basic accuracy
//! - **base / base.en**: ~74MB, good for development
//! - **small / small.en**: ~244MB, balanced
//! - **medium / medium.en**: ~769MB, strong accuracy
//! - **large-v2 / large-v3**: ~1550MB, best accuracy, slowest

pub mod device;
pub mod engine;
pub mod language;
pub mod mel;
pub mod model;

pub use engine::{AsrEngine, LanguageDetection, Transcript, TranscriptSegment, WordTiming};

/// Type of inference requested by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    /// Speech to text in the spoken language
    Transcribe,
    /// Speech to English text
    Translate,
}

impl Task {
    /// Wire-format value used in API parameters and responses.
    pub fn as_str(self) -> &'static str {
        match self {
            Task::Transcribe => "transcribe",
            Task::Translate => "translate",
        }
    }
}

impl std::str::FromStr for Task {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "transcribe" => Ok(Task::Transcribe),
            "translate" => Ok(Task::Translate),
            _ => Err(format!("Unknown task: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_parsing() {
        assert_eq!("transcribe".parse::<Task>().unwrap(), Task::Transcribe);
        assert_eq!("TRANSLATE".parse::<Task>().unwrap(), Task::Translate);
        assert!("summarize".parse::<Task>().is_err());
    }

    #[test]
    fn test_task_wire_format() {
        assert_eq!(Task::Transcribe.as_str(), "transcribe");
        assert_eq!(Task::Translate.as_str(), "translate");
    }
}
