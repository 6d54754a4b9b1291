//! # Whisper Model Management
//!
//! Loads Whisper checkpoints from the HuggingFace Hub and runs them through
//! Candle-rs. Pure Rust inference, no FFI bindings to whisper.cpp.
//!
//! ## Model Loading Process:
//! 1. Download model files from HuggingFace if not cached locally
//! 2. Load model weights (safetensors) and tokenizer
//! 3. Initialize model on the selected device (CPU/GPU)
//! 4. Resolve the special-token ids from the tokenizer vocabulary
//!
//! ## Decoding:
//! Audio is processed in 30-second mel windows. Each window is decoded
//! greedily with temperature fallback on low-confidence output; segment
//! boundaries come from the timestamp tokens the model emits, with the
//! window bounds as a fallback for windows that produce none.

use anyhow::{anyhow, Result};
use candle_core::{Device, IndexOp, Tensor};
use candle_nn::ops::softmax;
use candle_nn::VarBuilder;
use candle_transformers::models::whisper::{self as m, Config};
use rand::distributions::Distribution;
use rand::SeedableRng;
use tokenizers::Tokenizer;

use crate::asr::language::{language_token, LANGUAGES};
use crate::asr::mel;
use crate::asr::Task;

/// Seconds per timestamp-token step in the Whisper vocabulary.
const TIMESTAMP_STEP: f64 = 0.02;

/// Context token opening an initial-prompt block. Not exported by candle's
/// whisper module, so it is resolved by name.
const SOT_PREV_TOKEN: &str = "<|startofprev|>";

/// Maximum number of prompt tokens kept; matches the reference
/// implementation's half-context limit.
const MAX_PROMPT_TOKENS: usize = 224;

/// Available Whisper checkpoints.
///
/// ## Trade-offs:
/// - Larger variants are more accurate but slower and heavier
/// - `.en` variants are English-only: no language detection, no translation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ModelKind {
    Tiny,
    TinyEn,
    Base,
    BaseEn,
    Small,
    SmallEn,
    Medium,
    MediumEn,
    LargeV2,
    LargeV3,
}

impl ModelKind {
    /// HuggingFace model repository for this variant.
    pub fn repo_name(&self) -> &'static str {
        match self {
            ModelKind::Tiny => "openai/whisper-tiny",
            ModelKind::TinyEn => "openai/whisper-tiny.en",
            ModelKind::Base => "openai/whisper-base",
            ModelKind::BaseEn => "openai/whisper-base.en",
            ModelKind::Small => "openai/whisper-small",
            ModelKind::SmallEn => "openai/whisper-small.en",
            ModelKind::Medium => "openai/whisper-medium",
            ModelKind::MediumEn => "openai/whisper-medium.en",
            ModelKind::LargeV2 => "openai/whisper-large-v2",
            ModelKind::LargeV3 => "openai/whisper-large-v3",
        }
    }

    /// Approximate checkpoint size in MB.
    pub fn size_mb(&self) -> u32 {
        match self {
            ModelKind::Tiny | ModelKind::TinyEn => 39,
            ModelKind::Base | ModelKind::BaseEn => 74,
            ModelKind::Small | ModelKind::SmallEn => 244,
            ModelKind::Medium | ModelKind::MediumEn => 769,
            ModelKind::LargeV2 | ModelKind::LargeV3 => 1550,
        }
    }

    /// Whether the checkpoint supports languages other than English.
    pub fn is_multilingual(&self) -> bool {
        !matches!(
            self,
            ModelKind::TinyEn | ModelKind::BaseEn | ModelKind::SmallEn | ModelKind::MediumEn
        )
    }
}

impl std::str::FromStr for ModelKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "tiny" => Ok(ModelKind::Tiny),
            "tiny.en" => Ok(ModelKind::TinyEn),
            "base" => Ok(ModelKind::Base),
            "base.en" => Ok(ModelKind::BaseEn),
            "small" => Ok(ModelKind::Small),
            "small.en" => Ok(ModelKind::SmallEn),
            "medium" => Ok(ModelKind::Medium),
            "medium.en" => Ok(ModelKind::MediumEn),
            "large-v2" => Ok(ModelKind::LargeV2),
            "large" | "large-v3" => Ok(ModelKind::LargeV3),
            _ => Err(anyhow!("Unknown model: {}", s)),
        }
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ModelKind::Tiny => "tiny",
            ModelKind::TinyEn => "tiny.en",
            ModelKind::Base => "base",
            ModelKind::BaseEn => "base.en",
            ModelKind::Small => "small",
            ModelKind::SmallEn => "small.en",
            ModelKind::Medium => "medium",
            ModelKind::MediumEn => "medium.en",
            ModelKind::LargeV2 => "large-v2",
            ModelKind::LargeV3 => "large-v3",
        };
        write!(f, "{}", name)
    }
}

/// Special-token ids resolved from the tokenizer vocabulary.
#[derive(Debug, Clone)]
struct SpecialTokens {
    sot: u32,
    eot: u32,
    transcribe: u32,
    translate: u32,
    no_timestamps: u32,
    /// First timestamp token (`<|0.00|>`); ids from here upward encode time
    timestamp_begin: u32,
    no_speech: Option<u32>,
    sot_prev: Option<u32>,
}

impl SpecialTokens {
    fn resolve(tokenizer: &Tokenizer) -> Result<Self> {
        let no_timestamps = token_id(tokenizer, m::NO_TIMESTAMPS_TOKEN)?;
        Ok(Self {
            sot: token_id(tokenizer, m::SOT_TOKEN)?,
            eot: token_id(tokenizer, m::EOT_TOKEN)?,
            transcribe: token_id(tokenizer, m::TRANSCRIBE_TOKEN)?,
            translate: token_id(tokenizer, m::TRANSLATE_TOKEN)?,
            no_timestamps,
            timestamp_begin: no_timestamps + 1,
            no_speech: m::NO_SPEECH_TOKENS
                .iter()
                .find_map(|t| tokenizer.token_to_id(t)),
            sot_prev: tokenizer.token_to_id(SOT_PREV_TOKEN),
        })
    }
}

/// Look up a token id by its string form.
pub fn token_id(tokenizer: &Tokenizer, token: &str) -> Result<u32> {
    tokenizer
        .token_to_id(token)
        .ok_or_else(|| anyhow!("Token not found in vocabulary: {}", token))
}

/// One timestamped piece of a transcript, before output formatting.
#[derive(Debug, Clone)]
pub struct RawSegment {
    /// Start time in seconds from the beginning of the audio
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    /// Transcribed text, trimmed
    pub text: String,
    /// Temperature the window was decoded at
    pub temperature: f64,
    /// Mean log-probability of the decoded tokens
    pub avg_logprob: f64,
    /// Probability that the window contains no speech
    pub no_speech_prob: f64,
}

/// Full decoding result across all windows.
#[derive(Debug, Clone)]
pub struct RawTranscript {
    /// Language code the audio was decoded as (None for `.en` models)
    pub language: Option<String>,
    pub segments: Vec<RawSegment>,
}

/// Per-window decoding output.
#[derive(Debug)]
struct DecodingResult {
    tokens: Vec<u32>,
    avg_logprob: f64,
    no_speech_prob: f64,
    temperature: f64,
}

/// A loaded Whisper checkpoint ready for inference.
///
/// Decoding mutates internal KV caches, so callers need `&mut` access;
/// the engine serializes inference behind its model lock.
pub struct WhisperModel {
    model: m::model::Whisper,
    config: Config,
    device: Device,
    kind: ModelKind,
    tokenizer: Tokenizer,
    mel_filters: Vec<f32>,
    special: SpecialTokens,
    /// Additive logit mask: NEG_INFINITY for ids the checkpoint suppresses
    suppress_mask: Tensor,
    rng: rand::rngs::StdRng,
}

impl WhisperModel {
    /// Download (if needed) and load a checkpoint.
    ///
    /// ## HuggingFace access:
    /// Honors `HF_TOKEN` for gated access and `HF_HUB_CACHE` / `HF_HOME`
    /// for cache placement; downloads are cached, so subsequent loads are
    /// local file reads.
    pub async fn load(kind: ModelKind, device: Device) -> Result<Self> {
        tracing::info!("Loading Whisper {} model...", kind);
        let start_time = std::time::Instant::now();

        let api = {
            use hf_hub::api::tokio::ApiBuilder;

            let mut builder = ApiBuilder::new().with_token(std::env::var("HF_TOKEN").ok());

            if let Ok(cache_dir) = std::env::var("HF_HUB_CACHE") {
                builder = builder.with_cache_dir(cache_dir.into());
            } else if let Ok(hf_home) = std::env::var("HF_HOME") {
                builder = builder.with_cache_dir(std::path::PathBuf::from(hf_home).join("hub"));
            }

            builder.with_progress(false).build()?
        };

        let repo = api.model(kind.repo_name().to_string());

        let config_filename = repo.get("config.json").await.map_err(|e| {
            anyhow!(
                "Failed to download config.json from {}: {}",
                kind.repo_name(),
                e
            )
        })?;
        let tokenizer_filename = repo.get("tokenizer.json").await.map_err(|e| {
            anyhow!(
                "Failed to download tokenizer.json from {}: {}",
                kind.repo_name(),
                e
            )
        })?;
        let weights_filename = repo.get("model.safetensors").await.map_err(|e| {
            anyhow!(
                "Failed to download weights from {}: {}",
                kind.repo_name(),
                e
            )
        })?;

        let config: Config = serde_json::from_reader(std::fs::File::open(config_filename)?)?;

        let tokenizer = Tokenizer::from_file(tokenizer_filename)
            .map_err(|e| anyhow!("Failed to load tokenizer: {}", e))?;

        let mel_filters = mel::mel_filterbank(m::SAMPLE_RATE as u32, config.num_mel_bins);

        let vb =
            unsafe { VarBuilder::from_mmaped_safetensors(&[weights_filename], m::DTYPE, &device)? };
        let model = m::model::Whisper::load(&vb, config.clone())?;

        let special = SpecialTokens::resolve(&tokenizer)?;
        let suppress_mask = build_suppress_mask(&config, special.no_timestamps, &device)?;

        let load_time = start_time.elapsed();
        tracing::info!(
            "Whisper {} model loaded on {} in {:.2}s",
            kind,
            crate::asr::device::device_label(&device),
            load_time.as_secs_f64()
        );

        Ok(Self {
            model,
            config,
            device,
            kind,
            tokenizer,
            mel_filters,
            special,
            suppress_mask,
            rng: rand::rngs::StdRng::seed_from_u64(299_792_458),
        })
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Approximate resident memory for the loaded weights, in bytes.
    pub fn estimated_memory_usage(&self) -> usize {
        self.kind.size_mb() as usize * 1024 * 1024
    }

    /// Transcribe (or translate) 16 kHz mono audio.
    ///
    /// ## Parameters:
    /// - **pcm**: samples as f32 in `[-1.0, 1.0]`
    /// - **task**: transcribe or translate-to-English
    /// - **language**: ISO 639-1 hint; auto-detected when absent on
    ///   multilingual checkpoints
    /// - **initial_prompt**: optional text to bias decoding
    pub fn transcribe(
        &mut self,
        pcm: &[f32],
        task: Task,
        language: Option<&str>,
        initial_prompt: Option<&str>,
    ) -> Result<RawTranscript> {
        if pcm.is_empty() {
            return Err(anyhow!("Audio data is empty"));
        }

        let mel = m::audio::pcm_to_mel(&self.config, pcm, &self.mel_filters);
        let mel_len = mel.len();
        let n_frames_total = mel_len / self.config.num_mel_bins;
        let mel = Tensor::from_vec(
            mel,
            (1, self.config.num_mel_bins, n_frames_total),
            &self.device,
        )?;

        // Resolve the language once, against the first window.
        let language = if self.kind.is_multilingual() {
            match language {
                Some(code) => Some(code.to_string()),
                None => {
                    let first = mel.narrow(2, 0, usize::min(n_frames_total, m::N_FRAMES))?;
                    let ranked = self.rank_languages(&first)?;
                    let detected = ranked.first().map(|(code, _)| code.to_string());
                    tracing::debug!("Auto-detected language: {:?}", detected);
                    detected
                }
            }
        } else {
            None
        };

        let lang_token = match language.as_deref() {
            Some(code) => Some(token_id(&self.tokenizer, &language_token(code))?),
            None => None,
        };

        let prompt_tokens = self.encode_prompt(initial_prompt)?;

        // Walk the mel in 30-second windows.
        let mut segments = Vec::new();
        let mut seek = 0;
        while seek < n_frames_total {
            let window_offset = (seek * m::HOP_LENGTH) as f64 / m::SAMPLE_RATE as f64;
            let window_frames = usize::min(n_frames_total - seek, m::N_FRAMES);
            let window_duration = (window_frames * m::HOP_LENGTH) as f64 / m::SAMPLE_RATE as f64;
            let mel_window = mel.narrow(2, seek, window_frames)?;

            let dr = self.decode_with_fallback(&mel_window, task, lang_token, &prompt_tokens)?;
            seek += window_frames;

            if dr.no_speech_prob > m::NO_SPEECH_THRESHOLD && dr.avg_logprob < m::LOGPROB_THRESHOLD {
                tracing::debug!(
                    "Skipping window at {:.1}s: no speech detected (p={:.2})",
                    window_offset,
                    dr.no_speech_prob
                );
                continue;
            }

            let window_segments = self.segments_from_tokens(&dr, window_offset, window_duration)?;
            segments.extend(window_segments);
        }

        Ok(RawTranscript { language, segments })
    }

    /// Rank all languages by probability for the given audio.
    ///
    /// Runs one decoder step over the SOT token and softmaxes the logits
    /// restricted to the language-token block.
    pub fn detect_language(&mut self, pcm: &[f32]) -> Result<Vec<(&'static str, f32)>> {
        if pcm.is_empty() {
            return Err(anyhow!("Audio data is empty"));
        }

        // Only the first window matters for detection.
        let window: Vec<f32> = pcm.iter().take(m::N_SAMPLES).copied().collect();
        let mel = m::audio::pcm_to_mel(&self.config, &window, &self.mel_filters);
        let mel_len = mel.len();
        let mel = Tensor::from_vec(
            mel,
            (1, self.config.num_mel_bins, mel_len / self.config.num_mel_bins),
            &self.device,
        )?;

        self.rank_languages(&mel)
    }

    fn rank_languages(&mut self, mel: &Tensor) -> Result<Vec<(&'static str, f32)>> {
        let language_token_ids = LANGUAGES
            .iter()
            .map(|(code, _)| token_id(&self.tokenizer, &language_token(code)))
            .collect::<Result<Vec<_>>>()?;

        let audio_features = self.model.encoder.forward(mel, true)?;
        let tokens = Tensor::new(&[[self.special.sot]], &self.device)?;
        let language_token_ids = Tensor::new(language_token_ids.as_slice(), &self.device)?;

        let ys = self.model.decoder.forward(&tokens, &audio_features, true)?;
        let logits = self.model.decoder.final_linear(&ys.i(..1)?)?.i(0)?.i(0)?;
        let logits = logits.index_select(&language_token_ids, 0)?;
        let probs = softmax(&logits, candle_core::D::Minus1)?.to_vec1::<f32>()?;

        let mut ranked: Vec<(&'static str, f32)> =
            LANGUAGES.iter().map(|(code, _)| *code).zip(probs).collect();
        ranked.sort_by(|(_, a), (_, b)| b.total_cmp(a));
        Ok(ranked)
    }

    /// Decode one window, escalating temperature when the output looks bad.
    fn decode_with_fallback(
        &mut self,
        mel: &Tensor,
        task: Task,
        lang_token: Option<u32>,
        prompt_tokens: &[u32],
    ) -> Result<DecodingResult> {
        for (i, &t) in m::TEMPERATURES.iter().enumerate() {
            let last = i == m::TEMPERATURES.len() - 1;
            match self.decode_window(mel, t, task, lang_token, prompt_tokens) {
                Ok(dr) => {
                    let needs_fallback = dr.avg_logprob < m::LOGPROB_THRESHOLD;
                    if !needs_fallback || dr.no_speech_prob > m::NO_SPEECH_THRESHOLD || last {
                        return Ok(dr);
                    }
                    tracing::debug!(
                        "Low-confidence decode (avg_logprob {:.2}), retrying at temperature {:.1}",
                        dr.avg_logprob,
                        m::TEMPERATURES[i + 1]
                    );
                }
                Err(e) => {
                    if last {
                        return Err(e);
                    }
                    tracing::warn!("Decode failed at temperature {:.1}: {}", t, e);
                }
            }
        }
        unreachable!("temperature fallback loop always returns")
    }

    fn decode_window(
        &mut self,
        mel: &Tensor,
        temperature: f64,
        task: Task,
        lang_token: Option<u32>,
        prompt_tokens: &[u32],
    ) -> Result<DecodingResult> {
        let audio_features = self.model.encoder.forward(mel, true)?;
        let sample_len = self.config.max_target_positions / 2;

        let mut tokens: Vec<u32> = Vec::new();

        if !prompt_tokens.is_empty() {
            if let Some(sot_prev) = self.special.sot_prev {
                tokens.push(sot_prev);
                tokens.extend_from_slice(prompt_tokens);
            }
        }

        tokens.push(self.special.sot);
        if let Some(lang) = lang_token {
            tokens.push(lang);
        }
        if self.kind.is_multilingual() {
            tokens.push(match task {
                Task::Transcribe => self.special.transcribe,
                Task::Translate => self.special.translate,
            });
        }

        let initial_len = tokens.len();
        let mut sum_logprob = 0f64;
        let mut no_speech_prob = f64::NAN;

        for i in 0..sample_len {
            let tokens_t = Tensor::new(tokens.as_slice(), &self.device)?.unsqueeze(0)?;
            let ys = self.model.decoder.forward(&tokens_t, &audio_features, i == 0)?;

            if i == 0 {
                if let Some(no_speech) = self.special.no_speech {
                    let logits = self.model.decoder.final_linear(&ys.i(..1)?)?.i(0)?.i(0)?;
                    no_speech_prob = softmax(&logits, 0)?
                        .i(no_speech as usize)?
                        .to_scalar::<f32>()? as f64;
                }
            }

            let (_, seq_len, _) = ys.dims3()?;
            let logits = self
                .model
                .decoder
                .final_linear(&ys.i((..1, seq_len - 1..))?)?
                .i(0)?
                .i(0)?;
            let logits = logits.broadcast_add(&self.suppress_mask)?;

            let next_token = if temperature > 0f64 {
                let prs = softmax(&(&logits / temperature)?, 0)?;
                let weights: Vec<f32> = prs.to_vec1()?;
                let distr = rand::distributions::WeightedIndex::new(&weights)?;
                distr.sample(&mut self.rng) as u32
            } else {
                let logits_v: Vec<f32> = logits.to_vec1()?;
                logits_v
                    .iter()
                    .enumerate()
                    .max_by(|(_, u), (_, v)| u.total_cmp(v))
                    .map(|(i, _)| i as u32)
                    .ok_or_else(|| anyhow!("Empty logits"))?
            };

            tokens.push(next_token);

            let prob = softmax(&logits, candle_core::D::Minus1)?
                .i(next_token as usize)?
                .to_scalar::<f32>()? as f64;

            if next_token == self.special.eot || tokens.len() > self.config.max_target_positions {
                break;
            }
            sum_logprob += prob.ln();

            if is_repetitive(&tokens[initial_len..]) {
                return Err(anyhow!("Decoder entered a repetition loop"));
            }
        }

        let decoded = &tokens[initial_len..];
        let avg_logprob = sum_logprob / decoded.len().max(1) as f64;

        Ok(DecodingResult {
            tokens: decoded.to_vec(),
            avg_logprob,
            no_speech_prob,
            temperature,
        })
    }

    /// Split a window's decoded tokens into timestamped segments.
    ///
    /// Timestamp tokens come in `<|start|> text <|end|>` pairs; times are
    /// relative to the window and shifted by `window_offset`. When the model
    /// produced no usable pairs the whole window becomes one segment.
    fn segments_from_tokens(
        &self,
        dr: &DecodingResult,
        window_offset: f64,
        window_duration: f64,
    ) -> Result<Vec<RawSegment>> {
        let tb = self.special.timestamp_begin;
        let mut segments = Vec::new();
        let mut seg_start: Option<f64> = None;
        let mut text_tokens: Vec<u32> = Vec::new();

        for &tok in &dr.tokens {
            if tok >= tb {
                let time = (tok - tb) as f64 * TIMESTAMP_STEP;
                match seg_start {
                    None => seg_start = Some(time),
                    Some(start) => {
                        let text = self.decode_text(&text_tokens)?;
                        push_segment(
                            &mut segments,
                            dr,
                            window_offset,
                            start,
                            time.max(start),
                            text,
                        );
                        text_tokens.clear();
                        seg_start = None;
                    }
                }
            } else if tok != self.special.eot {
                text_tokens.push(tok);
            }
        }

        // Text after the last timestamp pair runs to the window end.
        if !text_tokens.is_empty() {
            let start = seg_start.unwrap_or(0.0);
            let text = self.decode_text(&text_tokens)?;
            push_segment(&mut segments, dr, window_offset, start, window_duration, text);
        }

        Ok(segments)
    }

    fn decode_text(&self, tokens: &[u32]) -> Result<String> {
        self.tokenizer
            .decode(tokens, true)
            .map_err(|e| anyhow!("Tokenizer decode error: {}", e))
    }

    fn encode_prompt(&self, prompt: Option<&str>) -> Result<Vec<u32>> {
        let Some(prompt) = prompt else {
            return Ok(Vec::new());
        };

        let encoding = self
            .tokenizer
            .encode(prompt, false)
            .map_err(|e| anyhow!("Failed to encode prompt: {}", e))?;

        let ids = encoding.get_ids();
        let start = ids.len().saturating_sub(MAX_PROMPT_TOKENS);
        Ok(ids[start..].to_vec())
    }
}

fn push_segment(
    segments: &mut Vec<RawSegment>,
    dr: &DecodingResult,
    window_offset: f64,
    start: f64,
    end: f64,
    text: String,
) {
    let text = text.trim().to_string();
    if !text.is_empty() {
        segments.push(RawSegment {
            start: window_offset + start,
            end: window_offset + end,
            text,
            temperature: dr.temperature,
            avg_logprob: dr.avg_logprob,
            no_speech_prob: dr.no_speech_prob,
        });
    }
}

/// Additive logit mask suppressing the checkpoint's blocked token ids, plus
/// `<|notimestamps|>` since decoding always runs with timestamps enabled.
fn build_suppress_mask(config: &Config, no_timestamps: u32, device: &Device) -> Result<Tensor> {
    let mask: Vec<f32> = (0..config.vocab_size as u32)
        .map(|i| {
            if config.suppress_tokens.contains(&i) || i == no_timestamps {
                f32::NEG_INFINITY
            } else {
                0f32
            }
        })
        .collect();
    Ok(Tensor::new(mask.as_slice(), device)?)
}

/// Detect short-cycle repetition in the decoded suffix.
fn is_repetitive(tokens: &[u32]) -> bool {
    let n = tokens.len();
    if n >= 4 && tokens[n - 4..].iter().all(|&t| t == tokens[n - 1]) {
        return true;
    }
    if n >= 8 && tokens[n - 4..] == tokens[n - 8..n - 4] {
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_kind_parsing() {
        assert_eq!("base".parse::<ModelKind>().unwrap(), ModelKind::Base);
        assert_eq!("TINY.EN".parse::<ModelKind>().unwrap(), ModelKind::TinyEn);
        assert_eq!("large".parse::<ModelKind>().unwrap(), ModelKind::LargeV3);
        assert_eq!("large-v2".parse::<ModelKind>().unwrap(), ModelKind::LargeV2);
        assert!("gigantic".parse::<ModelKind>().is_err());
    }

    #[test]
    fn test_model_kind_display_roundtrip() {
        for kind in [
            ModelKind::Tiny,
            ModelKind::TinyEn,
            ModelKind::Base,
            ModelKind::BaseEn,
            ModelKind::Small,
            ModelKind::SmallEn,
            ModelKind::Medium,
            ModelKind::MediumEn,
            ModelKind::LargeV2,
            ModelKind::LargeV3,
        ] {
            assert_eq!(kind.to_string().parse::<ModelKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_repo_names() {
        assert_eq!(ModelKind::Base.repo_name(), "openai/whisper-base");
        assert_eq!(ModelKind::TinyEn.repo_name(), "openai/whisper-tiny.en");
        assert_eq!(ModelKind::LargeV3.repo_name(), "openai/whisper-large-v3");
    }

    #[test]
    fn test_multilingual_flag() {
        assert!(ModelKind::Base.is_multilingual());
        assert!(ModelKind::LargeV3.is_multilingual());
        assert!(!ModelKind::BaseEn.is_multilingual());
        assert!(!ModelKind::MediumEn.is_multilingual());
    }

    #[test]
    fn test_repetition_detection() {
        assert!(!is_repetitive(&[1, 2, 3, 4, 5]));
        assert!(is_repetitive(&[9, 7, 7, 7, 7]));
        assert!(is_repetitive(&[1, 2, 3, 4, 1, 2, 3, 4]));
        assert!(!is_repetitive(&[1, 2]));
    }
}
