//! # Configuration Management
//!
//! Loads and validates service configuration from multiple sources:
//! - TOML configuration files (config.toml)
//! - Environment variables (with APP_ prefix)
//! - Well-known deployment variables (ASR_MODEL, HOST, PORT, ...)
//! - Command-line flags (highest priority, applied by the caller)
//!
//! ## Configuration Priority (highest to lowest):
//! 1. CLI flags (`--host`, `--port`)
//! 2. Well-known environment variables (ASR_MODEL, ASR_DEVICE, HOST, PORT, ...)
//! 3. Environment variables with APP_ prefix (APP_SERVER_HOST, ...)
//! 4. Configuration file (config.toml)
//! 5. Built-in defaults

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

use crate::asr::device::DevicePreference;
use crate::asr::model::ModelKind;

/// Top-level service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub audio: AudioConfig,
    pub limits: LimitsConfig,
}

/// HTTP server settings.
///
/// ## Fields:
/// - `host`: address to bind (`0.0.0.0` inside a container)
/// - `port`: TCP port, 9000 by convention for this service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Whisper model settings.
///
/// ## Fields:
/// - `name`: model variant (`tiny`, `base.en`, `large-v3`, ...), selectable
///   at container start through `ASR_MODEL`
/// - `device`: inference device preference (`auto`, `cpu`, `cuda`, `metal`)
/// - `idle_timeout_secs`: drop the loaded model after this many seconds
///   without a request; 0 keeps it resident forever
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    pub device: String,
    pub idle_timeout_secs: u64,
}

/// Audio ingestion settings.
///
/// ## Fields:
/// - `sample_rate`: rate audio is decoded to before inference (Whisper
///   expects 16000)
/// - `max_upload_bytes`: hard cap on the uploaded payload size
/// - `ffmpeg_path`: path to the external ffmpeg binary used when the client
///   requests transcoding (`encode=true`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub max_upload_bytes: usize,
    pub ffmpeg_path: String,
}

/// Resource limits.
///
/// ## Tuning guidelines:
/// - `max_concurrent_inferences`: each inference pins a CPU core (or the GPU)
///   for seconds at a time; keep this small
/// - `max_audio_duration_secs`: reject absurdly long uploads before they tie
///   up the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    pub max_concurrent_inferences: usize,
    pub max_audio_duration_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 9000,
            },
            model: ModelConfig {
                name: "base".to_string(),
                device: "auto".to_string(),
                idle_timeout_secs: 0,
            },
            audio: AudioConfig {
                sample_rate: 16_000,
                max_upload_bytes: 100 * 1024 * 1024,
                ffmpeg_path: "ffmpeg".to_string(),
            },
            limits: LimitsConfig {
                max_concurrent_inferences: 2,
                max_audio_duration_secs: 1800,
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from all sources in priority order.
    ///
    /// ## Well-known environment variables:
    /// The containerized deployment configures the service through a handful
    /// of unprefixed variables; these are applied as overrides on top of the
    /// APP_-prefixed layer:
    /// - `ASR_MODEL` — model variant
    /// - `ASR_DEVICE` — inference device
    /// - `MODEL_IDLE_TIMEOUT` — idle unload timeout in seconds
    /// - `SAMPLE_RATE` — decode sample rate
    /// - `HOST` / `PORT` — bind address, as set by deployment platforms
    ///
    /// CLI flags are applied last via the `host`/`port` parameters.
    pub fn load(host: Option<String>, port: Option<u16>) -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("_"));

        if let Ok(model) = env::var("ASR_MODEL") {
            settings = settings.set_override("model.name", model)?;
        }
        if let Ok(device) = env::var("ASR_DEVICE") {
            settings = settings.set_override("model.device", device)?;
        }
        if let Ok(timeout) = env::var("MODEL_IDLE_TIMEOUT") {
            settings = settings.set_override("model.idle_timeout_secs", timeout)?;
        }
        if let Ok(rate) = env::var("SAMPLE_RATE") {
            settings = settings.set_override("audio.sample_rate", rate)?;
        }
        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }
        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        if let Some(host) = host {
            settings = settings.set_override("server.host", host)?;
        }
        if let Some(port) = port {
            settings = settings.set_override("server.port", port.to_string())?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    ///
    /// Catching bad values here produces one clear startup error instead of
    /// a confusing failure on the first request.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        self.model
            .name
            .parse::<ModelKind>()
            .map_err(|e| anyhow::anyhow!("Invalid model name: {}", e))?;

        self.model
            .device
            .parse::<DevicePreference>()
            .map_err(|e| anyhow::anyhow!("Invalid device preference: {}", e))?;

        if self.audio.sample_rate == 0 {
            return Err(anyhow::anyhow!("Sample rate must be greater than 0"));
        }

        if self.audio.max_upload_bytes == 0 {
            return Err(anyhow::anyhow!("Max upload size must be greater than 0"));
        }

        if self.limits.max_concurrent_inferences == 0 {
            return Err(anyhow::anyhow!(
                "Max concurrent inferences must be greater than 0"
            ));
        }

        if self.limits.max_audio_duration_secs == 0 {
            return Err(anyhow::anyhow!("Max audio duration must be greater than 0"));
        }

        Ok(())
    }

    /// Parsed model variant. Only meaningful after `validate()` has passed.
    pub fn model_kind(&self) -> Result<ModelKind> {
        self.model.name.parse::<ModelKind>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.model.name, "base");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_rejects_port_zero() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_rejects_unknown_model() {
        let mut config = AppConfig::default();
        config.model.name = "gigantic".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_rejects_zero_concurrency() {
        let mut config = AppConfig::default();
        config.limits.max_concurrent_inferences = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_model_kind_accessor() {
        let config = AppConfig::default();
        assert_eq!(config.model_kind().unwrap(), ModelKind::Base);
    }
}
