//! # API Documentation Handlers
//!
//! Serves swagger-ui at `/docs` against the OpenAPI document at
//! `/openapi.json`. The swagger-ui assets themselves are the stock
//! distribution loaded from a CDN; only the API description is produced
//! here.

use actix_web::HttpResponse;
use serde_json::json;

const SWAGGER_UI_VERSION: &str = "5.17.14";

/// `GET /` — convenience redirect to the interactive docs.
pub async fn docs_redirect() -> HttpResponse {
    HttpResponse::Found()
        .append_header(("Location", "/docs"))
        .finish()
}

/// `GET /docs` — swagger-ui shell bound to `/openapi.json`.
pub async fn swagger_ui() -> HttpResponse {
    let html = format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8"/>
  <title>Whisper ASR Webservice - API Docs</title>
  <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@{version}/swagger-ui.css"/>
</head>
<body>
  <div id="swagger-ui"></div>
  <script src="https://unpkg.com/swagger-ui-dist@{version}/swagger-ui-bundle.js"></script>
  <script>
    window.onload = () => {{
      SwaggerUIBundle({{
        url: "/openapi.json",
        dom_id: "#swagger-ui",
      }});
    }};
  </script>
</body>
</html>
"##,
        version = SWAGGER_UI_VERSION
    );

    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(html)
}

/// `GET /openapi.json` — OpenAPI 3 description of the service.
pub async fn openapi_spec() -> HttpResponse {
    HttpResponse::Ok().json(openapi_document())
}

/// The OpenAPI document, built once per request; it is small and static.
pub fn openapi_document() -> serde_json::Value {
    let upload_body = json!({
        "required": true,
        "content": {
            "multipart/form-data": {
                "schema": {
                    "type": "object",
                    "required": ["audio_file"],
                    "properties": {
                        "audio_file": {
                            "type": "string",
                            "format": "binary",
                            "description": "Audio payload to process"
                        }
                    }
                }
            }
        }
    });

    json!({
        "openapi": "3.0.3",
        "info": {
            "title": "Whisper ASR Webservice",
            "description": "Speech-to-text transcription service backed by OpenAI Whisper models.",
            "version": env!("CARGO_PKG_VERSION")
        },
        "paths": {
            "/asr": {
                "post": {
                    "summary": "Transcribe or translate an audio file",
                    "operationId": "transcribe_audio",
                    "parameters": [
                        {
                            "name": "encode",
                            "in": "query",
                            "schema": {"type": "boolean", "default": true},
                            "description": "Transcode through ffmpeg before inference; disable only for 16 kHz WAV uploads"
                        },
                        {
                            "name": "task",
                            "in": "query",
                            "schema": {"type": "string", "enum": ["transcribe", "translate"], "default": "transcribe"}
                        },
                        {
                            "name": "language",
                            "in": "query",
                            "schema": {"type": "string"},
                            "description": "ISO 639-1 language hint; auto-detected when omitted"
                        },
                        {
                            "name": "initial_prompt",
                            "in": "query",
                            "schema": {"type": "string"},
                            "description": "Text used to bias decoding"
                        },
                        {
                            "name": "word_timestamps",
                            "in": "query",
                            "schema": {"type": "boolean", "default": false},
                            "description": "Attach per-word timing to JSON segments"
                        },
                        {
                            "name": "output",
                            "in": "query",
                            "schema": {"type": "string", "enum": ["txt", "json", "srt", "vtt", "tsv"], "default": "txt"}
                        }
                    ],
                    "requestBody": upload_body.clone(),
                    "responses": {
                        "200": {"description": "Transcript in the requested format"},
                        "400": {"description": "Malformed request"},
                        "413": {"description": "Upload exceeds the size limit"},
                        "415": {"description": "Payload could not be decoded as audio"},
                        "422": {"description": "Request is invalid for the loaded model"},
                        "503": {"description": "All inference slots are busy"}
                    }
                }
            },
            "/detect-language": {
                "post": {
                    "summary": "Detect the spoken language of an audio file",
                    "operationId": "detect_language",
                    "parameters": [
                        {
                            "name": "encode",
                            "in": "query",
                            "schema": {"type": "boolean", "default": true}
                        }
                    ],
                    "requestBody": upload_body,
                    "responses": {
                        "200": {
                            "description": "Top-ranked language",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "object",
                                        "properties": {
                                            "detected_language": {"type": "string"},
                                            "language_code": {"type": "string"},
                                            "confidence": {"type": "number"}
                                        }
                                    }
                                }
                            }
                        },
                        "422": {"description": "Model is English-only"}
                    }
                }
            },
            "/health": {
                "get": {
                    "summary": "Service health and engine status",
                    "operationId": "health_check",
                    "responses": {"200": {"description": "Health report"}}
                }
            },
            "/metrics": {
                "get": {
                    "summary": "Prometheus metrics",
                    "operationId": "metrics",
                    "responses": {"200": {"description": "Prometheus text exposition format"}}
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_document_lists_all_routes() {
        let doc = openapi_document();
        let paths = doc["paths"].as_object().unwrap();
        assert!(paths.contains_key("/asr"));
        assert!(paths.contains_key("/detect-language"));
        assert!(paths.contains_key("/health"));
        assert!(paths.contains_key("/metrics"));
    }

    #[test]
    fn test_asr_parameters_match_the_contract() {
        let doc = openapi_document();
        let params = doc["paths"]["/asr"]["post"]["parameters"].as_array().unwrap();
        let names: Vec<&str> = params
            .iter()
            .map(|p| p["name"].as_str().unwrap())
            .collect();
        for expected in ["encode", "task", "language", "initial_prompt", "word_timestamps", "output"] {
            assert!(names.contains(&expected), "missing parameter {}", expected);
        }
    }

    #[test]
    fn test_upload_field_is_audio_file() {
        let doc = openapi_document();
        let schema = &doc["paths"]["/asr"]["post"]["requestBody"]["content"]["multipart/form-data"]
            ["schema"];
        assert!(schema["properties"]["audio_file"].is_object());
    }
}
