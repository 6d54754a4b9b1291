//! # ASR Engine
//!
//! Coordinates the model lifecycle and inference requests: lazy loading,
//! concurrency capping, idle unloading and performance accounting. HTTP
//! handlers talk to this type only; they never touch the model directly.
//!
//! ## Thread Safety:
//! The model sits behind `RwLock<Option<WhisperModel>>`. Decoding mutates
//! the model's KV caches, so inference takes the write lock and is
//! effectively serialized; the semaphore in front of it bounds how many
//! requests may wait, turning overload into fast 503s instead of an
//! unbounded queue.

use candle_core::Device;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::sync::{RwLock, Semaphore};

use crate::asr::device::device_label;
use crate::asr::language::language_name;
use crate::asr::model::{ModelKind, RawTranscript, WhisperModel};
use crate::asr::Task;
use crate::error::{AppError, AppResult};

/// Options for a single transcription request.
#[derive(Debug, Clone)]
pub struct TranscribeOptions {
    pub task: Task,
    /// ISO 639-1 hint; auto-detect when absent on multilingual models
    pub language: Option<String>,
    /// Optional text to bias decoding
    pub initial_prompt: Option<String>,
    /// Attach per-word timing to segments
    pub word_timestamps: bool,
}

impl Default for TranscribeOptions {
    fn default() -> Self {
        Self {
            task: Task::Transcribe,
            language: None,
            initial_prompt: None,
            word_timestamps: false,
        }
    }
}

/// Per-word timing derived from segment spans.
#[derive(Debug, Clone, serde::Serialize)]
pub struct WordTiming {
    pub word: String,
    pub start: f64,
    pub end: f64,
}

/// One transcript segment as exposed through the API.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TranscriptSegment {
    pub id: usize,
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub temperature: f64,
    pub avg_logprob: f64,
    pub no_speech_prob: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub words: Option<Vec<WordTiming>>,
}

/// Complete transcription result.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Transcript {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub segments: Vec<TranscriptSegment>,
    /// Duration of the processed audio in seconds
    pub audio_duration: f64,
    /// Wall-clock inference time in milliseconds
    pub processing_time_ms: u64,
    /// Model variant that produced this transcript
    pub model: String,
}

/// Result of the language-detection endpoint.
#[derive(Debug, Clone, serde::Serialize)]
pub struct LanguageDetection {
    pub detected_language: String,
    pub language_code: String,
    pub confidence: f32,
}

/// Aggregate engine counters.
#[derive(Debug, Default)]
struct EngineMetrics {
    total_requests: u64,
    failed_requests: u64,
    total_audio_seconds: f64,
    total_processing_ms: u64,
}

/// Snapshot of engine performance for the health endpoint.
#[derive(Debug, Clone, serde::Serialize)]
pub struct EngineStats {
    pub total_requests: u64,
    pub failed_requests: u64,
    pub total_audio_seconds: f64,
    pub average_processing_ms: u64,
    /// Ratio of audio time to processing time (>1.0 = faster than real time)
    pub realtime_factor: f64,
}

/// Engine owning the model lifecycle.
pub struct AsrEngine {
    kind: ModelKind,
    device: Device,
    sample_rate: u32,
    model: RwLock<Option<WhisperModel>>,
    inference_slots: Semaphore,
    idle_timeout: Option<Duration>,
    /// Millis since engine creation at last completed request
    last_used_ms: AtomicU64,
    created_at: Instant,
    metrics: Mutex<EngineMetrics>,
}

impl AsrEngine {
    /// Create an engine for the configured model variant.
    ///
    /// The model itself is loaded lazily on first use (or via
    /// [`AsrEngine::ensure_loaded`] at startup).
    pub fn new(
        kind: ModelKind,
        device: Device,
        sample_rate: u32,
        max_concurrent: usize,
        idle_timeout_secs: u64,
    ) -> Self {
        Self {
            kind,
            device,
            sample_rate,
            model: RwLock::new(None),
            inference_slots: Semaphore::new(max_concurrent),
            idle_timeout: (idle_timeout_secs > 0).then(|| Duration::from_secs(idle_timeout_secs)),
            last_used_ms: AtomicU64::new(0),
            created_at: Instant::now(),
            metrics: Mutex::new(EngineMetrics::default()),
        }
    }

    pub fn model_kind(&self) -> ModelKind {
        self.kind
    }

    pub fn device_name(&self) -> &'static str {
        device_label(&self.device)
    }

    pub async fn is_model_loaded(&self) -> bool {
        self.model.read().await.is_some()
    }

    /// Load the model now instead of on the first request.
    pub async fn ensure_loaded(&self) -> AppResult<()> {
        {
            let guard = self.model.read().await;
            if guard.is_some() {
                return Ok(());
            }
        }

        let mut guard = self.model.write().await;
        if guard.is_none() {
            let model = WhisperModel::load(self.kind, self.device.clone())
                .await
                .map_err(|e| AppError::Internal(format!("Failed to load model: {}", e)))?;
            *guard = Some(model);
        }
        Ok(())
    }

    /// Drop the loaded model to free memory.
    pub async fn unload_model(&self) {
        let mut guard = self.model.write().await;
        if guard.take().is_some() {
            tracing::info!("Unloaded Whisper {} model", self.kind);
        }
    }

    /// Transcribe 16 kHz mono f32 audio.
    pub async fn transcribe(&self, pcm: &[f32], opts: &TranscribeOptions) -> AppResult<Transcript> {
        if pcm.is_empty() {
            return Err(AppError::BadRequest("Audio data is empty".to_string()));
        }

        let _permit = self.inference_slots.try_acquire().map_err(|_| {
            AppError::Overloaded("All inference slots are busy, retry later".to_string())
        })?;

        self.ensure_loaded().await?;
        let start_time = Instant::now();
        let audio_duration = pcm.len() as f64 / self.sample_rate as f64;

        tracing::debug!(
            "Starting {} of {:.2}s audio",
            opts.task.as_str(),
            audio_duration
        );

        let result = {
            let mut guard = self.model.write().await;
            let model = guard
                .as_mut()
                .ok_or_else(|| AppError::Internal("Model was unloaded mid-request".to_string()))?;
            model.transcribe(
                pcm,
                opts.task,
                opts.language.as_deref(),
                opts.initial_prompt.as_deref(),
            )
        };

        let processing_time_ms = start_time.elapsed().as_millis() as u64;
        self.touch();
        self.record_request(audio_duration, processing_time_ms, result.is_ok());

        let raw = result.map_err(|e| AppError::Internal(format!("Transcription failed: {}", e)))?;
        let transcript = self.assemble_transcript(raw, audio_duration, processing_time_ms, opts);

        tracing::info!(
            "Transcribed {:.2}s audio into {} segment(s) in {}ms",
            audio_duration,
            transcript.segments.len(),
            processing_time_ms
        );

        Ok(transcript)
    }

    /// Detect the spoken language of the audio.
    pub async fn detect_language(&self, pcm: &[f32]) -> AppResult<LanguageDetection> {
        if !self.kind.is_multilingual() {
            return Err(AppError::Unprocessable(format!(
                "Model {} is English-only and cannot detect languages",
                self.kind
            )));
        }

        if pcm.is_empty() {
            return Err(AppError::BadRequest("Audio data is empty".to_string()));
        }

        let _permit = self.inference_slots.try_acquire().map_err(|_| {
            AppError::Overloaded("All inference slots are busy, retry later".to_string())
        })?;

        self.ensure_loaded().await?;
        let start_time = Instant::now();
        let audio_duration = pcm.len() as f64 / self.sample_rate as f64;

        let result = {
            let mut guard = self.model.write().await;
            let model = guard
                .as_mut()
                .ok_or_else(|| AppError::Internal("Model was unloaded mid-request".to_string()))?;
            model.detect_language(pcm)
        };

        let processing_time_ms = start_time.elapsed().as_millis() as u64;
        self.touch();
        self.record_request(audio_duration, processing_time_ms, result.is_ok());

        let ranked =
            result.map_err(|e| AppError::Internal(format!("Language detection failed: {}", e)))?;
        let (code, confidence) = ranked
            .first()
            .copied()
            .ok_or_else(|| AppError::Internal("Language ranking came back empty".to_string()))?;

        Ok(LanguageDetection {
            detected_language: language_name(code).unwrap_or(code).to_string(),
            language_code: code.to_string(),
            confidence,
        })
    }

    /// Unload the model if it has been idle past the configured timeout.
    pub async fn unload_if_idle(&self) {
        let Some(timeout) = self.idle_timeout else {
            return;
        };

        if !self.is_model_loaded().await {
            return;
        }

        let last_used_ms = self.last_used_ms.load(Ordering::Relaxed);
        let idle = self.created_at.elapsed().saturating_sub(Duration::from_millis(last_used_ms));
        if idle >= timeout {
            tracing::info!(
                "Model idle for {:.0}s (timeout {:.0}s), unloading",
                idle.as_secs_f64(),
                timeout.as_secs_f64()
            );
            self.unload_model().await;
        }
    }

    /// Spawn the background task enforcing the idle timeout.
    pub fn start_idle_watcher(self: &std::sync::Arc<Self>) {
        if self.idle_timeout.is_none() {
            return;
        }

        let engine = std::sync::Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(30));
            loop {
                interval.tick().await;
                engine.unload_if_idle().await;
            }
        });
    }

    /// Snapshot of engine counters for the health endpoint.
    pub fn stats(&self) -> EngineStats {
        let metrics = self.metrics.lock().unwrap();
        EngineStats {
            total_requests: metrics.total_requests,
            failed_requests: metrics.failed_requests,
            total_audio_seconds: metrics.total_audio_seconds,
            average_processing_ms: if metrics.total_requests > 0 {
                metrics.total_processing_ms / metrics.total_requests
            } else {
                0
            },
            realtime_factor: if metrics.total_processing_ms > 0 {
                (metrics.total_audio_seconds * 1000.0) / metrics.total_processing_ms as f64
            } else {
                0.0
            },
        }
    }

    fn touch(&self) {
        let elapsed_ms = self.created_at.elapsed().as_millis() as u64;
        self.last_used_ms.store(elapsed_ms, Ordering::Relaxed);
    }

    fn record_request(&self, audio_seconds: f64, processing_ms: u64, success: bool) {
        let mut metrics = self.metrics.lock().unwrap();
        metrics.total_requests += 1;
        metrics.total_audio_seconds += audio_seconds;
        metrics.total_processing_ms += processing_ms;
        if !success {
            metrics.failed_requests += 1;
        }
    }

    fn assemble_transcript(
        &self,
        raw: RawTranscript,
        audio_duration: f64,
        processing_time_ms: u64,
        opts: &TranscribeOptions,
    ) -> Transcript {
        let segments: Vec<TranscriptSegment> = raw
            .segments
            .into_iter()
            .enumerate()
            .map(|(id, seg)| {
                let words = opts
                    .word_timestamps
                    .then(|| interpolate_words(&seg.text, seg.start, seg.end));
                TranscriptSegment {
                    id,
                    start: seg.start,
                    end: seg.end,
                    text: seg.text,
                    temperature: seg.temperature,
                    avg_logprob: seg.avg_logprob,
                    no_speech_prob: seg.no_speech_prob,
                    words,
                }
            })
            .collect();

        let text = segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        Transcript {
            text,
            language: raw.language,
            segments,
            audio_duration,
            processing_time_ms,
            model: self.kind.to_string(),
        }
    }
}

/// Distribute a segment's time span over its words, weighted by word length.
///
/// A stand-in for attention-based alignment: per-word times are approximate
/// but always monotonic and contained in the segment span.
fn interpolate_words(text: &str, start: f64, end: f64) -> Vec<WordTiming> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }

    let total_chars: usize = words.iter().map(|w| w.len()).sum();
    let span = (end - start).max(0.0);
    let mut cursor = start;
    let mut timings = Vec::with_capacity(words.len());

    for word in &words {
        let share = if total_chars > 0 {
            word.len() as f64 / total_chars as f64
        } else {
            1.0 / words.len() as f64
        };
        let word_end = (cursor + span * share).min(end);
        timings.push(WordTiming {
            word: (*word).to_string(),
            start: cursor,
            end: word_end,
        });
        cursor = word_end;
    }

    // Rounding drift: pin the final word to the segment end.
    if let Some(last) = timings.last_mut() {
        last.end = end;
    }

    timings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_interpolation_is_monotonic() {
        let timings = interpolate_words("the quick brown fox", 10.0, 12.0);
        assert_eq!(timings.len(), 4);
        assert_eq!(timings[0].start, 10.0);
        assert_eq!(timings[3].end, 12.0);

        for pair in timings.windows(2) {
            assert!(pair[0].end <= pair[1].start + 1e-9);
        }
        for t in &timings {
            assert!(t.start <= t.end);
        }
    }

    #[test]
    fn test_word_interpolation_empty_text() {
        assert!(interpolate_words("   ", 0.0, 1.0).is_empty());
    }

    #[test]
    fn test_longer_words_get_longer_spans() {
        let timings = interpolate_words("a considerable", 0.0, 3.0);
        let short = timings[0].end - timings[0].start;
        let long = timings[1].end - timings[1].start;
        assert!(long > short);
    }

    #[tokio::test]
    async fn test_engine_starts_unloaded() {
        let engine = AsrEngine::new(ModelKind::Tiny, Device::Cpu, 16_000, 2, 0);
        assert!(!engine.is_model_loaded().await);
        assert_eq!(engine.model_kind(), ModelKind::Tiny);
        assert_eq!(engine.device_name(), "cpu");
    }

    #[tokio::test]
    async fn test_transcribe_rejects_empty_audio() {
        let engine = AsrEngine::new(ModelKind::Tiny, Device::Cpu, 16_000, 2, 0);
        let err = engine
            .transcribe(&[], &TranscribeOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_detect_language_rejects_english_only_models() {
        let engine = AsrEngine::new(ModelKind::BaseEn, Device::Cpu, 16_000, 2, 0);
        let err = engine.detect_language(&[0.0; 16_000]).await.unwrap_err();
        assert!(matches!(err, AppError::Unprocessable(_)));
    }

    #[test]
    fn test_engine_stats_accumulate() {
        let engine = AsrEngine::new(ModelKind::Tiny, Device::Cpu, 16_000, 2, 0);
        engine.record_request(10.0, 2000, true);
        engine.record_request(20.0, 4000, false);

        let stats = engine.stats();
        assert_eq!(stats.total_requests, 2);
        assert_eq!(stats.failed_requests, 1);
        assert_eq!(stats.average_processing_ms, 3000);
        assert!((stats.realtime_factor - 5.0).abs() < 1e-9);
    }
}
