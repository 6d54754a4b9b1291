//! # Transcription REST Handlers
//!
//! The two inference endpoints:
//! - `POST /asr` — transcribe (or translate) an uploaded audio file
//! - `POST /detect-language` — identify the spoken language
//!
//! Both accept multipart form data with the audio in an `audio_file` field.
//! Options may arrive either as query parameters or as additional form
//! fields; form fields win when both are present, which matches how typical
//! clients submit everything as one form.

use actix_web::{web, HttpResponse};
use futures_util::stream::StreamExt;
use serde::Deserialize;
use std::collections::HashMap;

use crate::asr::engine::TranscribeOptions;
use crate::asr::language::is_valid_code;
use crate::asr::Task;
use crate::audio::decoder;
use crate::audio::ffmpeg::{transcode_to_pcm, TranscodeError};
use crate::error::{AppError, AppResult};
use crate::output::OutputFormat;
use crate::state::AppState;

/// Options accepted as query parameters on both endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct AsrQuery {
    pub encode: Option<bool>,
    pub task: Option<String>,
    pub language: Option<String>,
    pub initial_prompt: Option<String>,
    pub word_timestamps: Option<bool>,
    pub output: Option<String>,
}

/// Parsed multipart payload: the audio bytes plus any text form fields.
struct Upload {
    audio: Vec<u8>,
    filename: Option<String>,
    fields: HashMap<String, String>,
}

/// Fully resolved request options after merging query and form values.
#[derive(Debug, PartialEq)]
struct ResolvedParams {
    encode: bool,
    task: Task,
    language: Option<String>,
    initial_prompt: Option<String>,
    word_timestamps: bool,
    output: OutputFormat,
}

/// `POST /asr` — transcribe an uploaded audio file.
///
/// ## Parameters (query or form fields):
/// - `encode` (default true): transcode through ffmpeg first; when false the
///   payload must be a WAV file
/// - `task`: `transcribe` (default) or `translate`
/// - `language`: ISO 639-1 hint, auto-detected when omitted
/// - `initial_prompt`: text to bias decoding
/// - `word_timestamps` (default false): per-word timing in JSON output
/// - `output`: `txt` (default), `json`, `srt`, `vtt` or `tsv`
pub async fn transcribe_audio(
    state: web::Data<AppState>,
    query: web::Query<AsrQuery>,
    payload: actix_multipart::Multipart,
) -> AppResult<HttpResponse> {
    let config = state.get_config();
    let upload = read_upload(payload, config.audio.max_upload_bytes).await?;
    let params = resolve_params(&query, &upload.fields)?;

    let kind = state.engine.model_kind();
    if params.task == Task::Translate && !kind.is_multilingual() {
        return Err(AppError::Unprocessable(format!(
            "Model {} is English-only and cannot translate",
            kind
        )));
    }
    if let Some(lang) = params.language.as_deref() {
        if !kind.is_multilingual() && lang != "en" {
            return Err(AppError::Unprocessable(format!(
                "Model {} only supports English audio",
                kind
            )));
        }
    }

    tracing::debug!(
        filename = upload.filename.as_deref().unwrap_or("unknown"),
        size_bytes = upload.audio.len(),
        task = params.task.as_str(),
        "Received transcription request"
    );

    let pcm = decode_payload(&config, upload.audio, params.encode).await?;

    let duration = pcm.len() as f64 / config.audio.sample_rate as f64;
    if duration > config.limits.max_audio_duration_secs as f64 {
        return Err(AppError::Unprocessable(format!(
            "Audio is {:.0}s long, maximum is {}s",
            duration, config.limits.max_audio_duration_secs
        )));
    }

    let opts = TranscribeOptions {
        task: params.task,
        language: params.language,
        initial_prompt: params.initial_prompt,
        word_timestamps: params.word_timestamps,
    };

    let transcript = state.engine.transcribe(&pcm, &opts).await?;
    let body = params.output.render(&transcript)?;

    Ok(HttpResponse::Ok()
        .content_type(params.output.content_type())
        .body(body))
}

/// `POST /detect-language` — identify the spoken language of an upload.
///
/// Accepts the same multipart contract as `/asr` (only `encode` is
/// honored). Returns the top-ranked language with its confidence.
pub async fn detect_language(
    state: web::Data<AppState>,
    query: web::Query<AsrQuery>,
    payload: actix_multipart::Multipart,
) -> AppResult<HttpResponse> {
    let config = state.get_config();
    let upload = read_upload(payload, config.audio.max_upload_bytes).await?;
    let params = resolve_params(&query, &upload.fields)?;

    let pcm = decode_payload(&config, upload.audio, params.encode).await?;
    let detection = state.engine.detect_language(&pcm).await?;

    Ok(HttpResponse::Ok().json(detection))
}

/// Decode the uploaded bytes to mono f32 PCM at the configured rate.
async fn decode_payload(
    config: &crate::config::AppConfig,
    audio: Vec<u8>,
    encode: bool,
) -> AppResult<Vec<f32>> {
    if encode {
        transcode_to_pcm(&config.audio.ffmpeg_path, audio, config.audio.sample_rate)
            .await
            .map_err(|e| match e {
                TranscodeError::Spawn(_) => AppError::Internal(e.to_string()),
                TranscodeError::Decode(_) => AppError::UnsupportedMedia(e.to_string()),
            })
    } else {
        decoder::decode_wav(&audio, config.audio.sample_rate).map_err(AppError::UnsupportedMedia)
    }
}

/// Read the multipart payload: the `audio_file` field plus any text fields.
///
/// The size cap applies to the audio bytes and is enforced while streaming,
/// so an oversized upload is rejected without being buffered whole.
async fn read_upload(mut payload: actix_multipart::Multipart, max_bytes: usize) -> AppResult<Upload> {
    let mut audio: Option<Vec<u8>> = None;
    let mut filename: Option<String> = None;
    let mut fields: HashMap<String, String> = HashMap::new();

    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| AppError::BadRequest(format!("Multipart error: {}", e)))?;

        let content_disposition = field
            .content_disposition()
            .ok_or_else(|| AppError::BadRequest("Missing content disposition".to_string()))?;

        let field_name = content_disposition
            .get_name()
            .ok_or_else(|| AppError::BadRequest("Missing field name".to_string()))?
            .to_string();

        if field_name == "audio_file" {
            filename = content_disposition.get_filename().map(|s| s.to_string());

            let mut bytes = Vec::new();
            while let Some(chunk) = field.next().await {
                let chunk =
                    chunk.map_err(|e| AppError::BadRequest(format!("Upload error: {}", e)))?;
                if bytes.len() + chunk.len() > max_bytes {
                    return Err(AppError::PayloadTooLarge(format!(
                        "Upload exceeds the {} byte limit",
                        max_bytes
                    )));
                }
                bytes.extend_from_slice(&chunk);
            }

            audio = Some(bytes);
        } else {
            let mut bytes = Vec::new();
            while let Some(chunk) = field.next().await {
                let chunk =
                    chunk.map_err(|e| AppError::BadRequest(format!("Upload error: {}", e)))?;
                bytes.extend_from_slice(&chunk);
            }
            let value = String::from_utf8(bytes).map_err(|_| {
                AppError::BadRequest(format!("Field '{}' is not valid UTF-8", field_name))
            })?;
            fields.insert(field_name, value);
        }
    }

    let audio = audio
        .ok_or_else(|| AppError::BadRequest("No 'audio_file' field in upload".to_string()))?;

    if audio.is_empty() {
        return Err(AppError::BadRequest("Uploaded audio file is empty".to_string()));
    }

    Ok(Upload {
        audio,
        filename,
        fields,
    })
}

/// Merge query parameters with form fields (form wins) and parse them.
fn resolve_params(query: &AsrQuery, fields: &HashMap<String, String>) -> AppResult<ResolvedParams> {
    let encode = match fields.get("encode") {
        Some(raw) => parse_bool("encode", raw)?,
        None => query.encode.unwrap_or(true),
    };

    let task = match fields.get("task").map(String::as_str).or(query.task.as_deref()) {
        Some(raw) => raw
            .parse::<Task>()
            .map_err(AppError::BadRequest)?,
        None => Task::Transcribe,
    };

    let language = match fields
        .get("language")
        .map(String::as_str)
        .or(query.language.as_deref())
    {
        Some(raw) => {
            let code = raw.to_lowercase();
            if !is_valid_code(&code) {
                return Err(AppError::BadRequest(format!("Unknown language code: {}", raw)));
            }
            Some(code)
        }
        None => None,
    };

    let initial_prompt = fields
        .get("initial_prompt")
        .cloned()
        .or_else(|| query.initial_prompt.clone());

    let word_timestamps = match fields.get("word_timestamps") {
        Some(raw) => parse_bool("word_timestamps", raw)?,
        None => query.word_timestamps.unwrap_or(false),
    };

    let output = match fields
        .get("output")
        .map(String::as_str)
        .or(query.output.as_deref())
    {
        Some(raw) => raw.parse::<OutputFormat>().map_err(AppError::BadRequest)?,
        None => OutputFormat::Text,
    };

    Ok(ResolvedParams {
        encode,
        task,
        language,
        initial_prompt,
        word_timestamps,
        output,
    })
}

fn parse_bool(name: &str, raw: &str) -> AppResult<bool> {
    match raw.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(AppError::BadRequest(format!(
            "Field '{}' must be a boolean, got '{}'",
            name, raw
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_when_nothing_is_provided() {
        let params = resolve_params(&AsrQuery::default(), &HashMap::new()).unwrap();
        assert!(params.encode);
        assert_eq!(params.task, Task::Transcribe);
        assert_eq!(params.language, None);
        assert!(!params.word_timestamps);
        assert_eq!(params.output, OutputFormat::Text);
    }

    #[test]
    fn test_form_fields_override_query() {
        let query = AsrQuery {
            output: Some("json".to_string()),
            ..AsrQuery::default()
        };
        let form = fields(&[("output", "srt"), ("task", "translate"), ("encode", "false")]);

        let params = resolve_params(&query, &form).unwrap();
        assert_eq!(params.output, OutputFormat::Srt);
        assert_eq!(params.task, Task::Translate);
        assert!(!params.encode);
    }

    #[test]
    fn test_language_codes_are_validated() {
        let form = fields(&[("language", "DE")]);
        let params = resolve_params(&AsrQuery::default(), &form).unwrap();
        assert_eq!(params.language, Some("de".to_string()));

        let bad = fields(&[("language", "klingon")]);
        assert!(resolve_params(&AsrQuery::default(), &bad).is_err());
    }

    #[test]
    fn test_unknown_task_is_rejected() {
        let form = fields(&[("task", "summarize")]);
        let err = resolve_params(&AsrQuery::default(), &form).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_bool_parsing() {
        assert!(parse_bool("encode", "True").unwrap());
        assert!(parse_bool("encode", "1").unwrap());
        assert!(!parse_bool("encode", "no").unwrap());
        assert!(parse_bool("encode", "maybe").is_err());
    }
}
