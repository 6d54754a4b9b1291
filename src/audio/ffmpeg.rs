//! # ffmpeg Transcoding
//!
//! Default ingestion path: the uploaded payload is piped through the
//! external ffmpeg binary and comes back as raw 16-bit mono PCM at the
//! inference sample rate. ffmpeg stays an external prebuilt dependency;
//! this module only does process plumbing.

use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::audio::processor::pcm16_bytes_to_f32;

/// How transcoding failed, so the handler can pick the right status code.
#[derive(Debug)]
pub enum TranscodeError {
    /// ffmpeg could not be started (missing binary, bad path)
    Spawn(String),
    /// ffmpeg ran but rejected the payload
    Decode(String),
}

impl std::fmt::Display for TranscodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranscodeError::Spawn(msg) => write!(f, "Failed to run ffmpeg: {}", msg),
            TranscodeError::Decode(msg) => write!(f, "ffmpeg could not decode the payload: {}", msg),
        }
    }
}

/// Transcode an arbitrary audio payload to mono f32 PCM at `sample_rate`.
///
/// ## Process:
/// Spawns `ffmpeg -i pipe:0 -f s16le -ac 1 -ar <rate> pipe:1`, feeds the
/// payload through stdin from a separate task (stdin and stdout are pumped
/// concurrently, otherwise large files deadlock on full pipe buffers) and
/// parses the PCM stream from stdout.
pub async fn transcode_to_pcm(
    ffmpeg_path: &str,
    input: Vec<u8>,
    sample_rate: u32,
) -> Result<Vec<f32>, TranscodeError> {
    let mut child = Command::new(ffmpeg_path)
        .args([
            "-hide_banner",
            "-loglevel",
            "error",
            "-i",
            "pipe:0",
            "-f",
            "s16le",
            "-ac",
            "1",
            "-ar",
            &sample_rate.to_string(),
            "pipe:1",
        ])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| TranscodeError::Spawn(format!("{} ({})", e, ffmpeg_path)))?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| TranscodeError::Spawn("ffmpeg stdin unavailable".to_string()))?;

    let writer = tokio::spawn(async move {
        // A write error here means ffmpeg exited early; its stderr carries
        // the real diagnosis.
        let _ = stdin.write_all(&input).await;
        let _ = stdin.shutdown().await;
    });

    let output = child
        .wait_with_output()
        .await
        .map_err(|e| TranscodeError::Spawn(e.to_string()))?;
    let _ = writer.await;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let tail: String = stderr
            .lines()
            .rev()
            .take(3)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect::<Vec<_>>()
            .join("; ");
        return Err(TranscodeError::Decode(if tail.is_empty() {
            format!("exit status {}", output.status)
        } else {
            tail
        }));
    }

    pcm16_bytes_to_f32(&output.stdout).map_err(TranscodeError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_binary_is_a_spawn_error() {
        let err = transcode_to_pcm("/nonexistent/ffmpeg-binary", vec![0u8; 16], 16_000)
            .await
            .unwrap_err();
        assert!(matches!(err, TranscodeError::Spawn(_)));
    }

    #[test]
    fn test_error_display() {
        let err = TranscodeError::Decode("Invalid data found".to_string());
        assert!(err.to_string().contains("Invalid data found"));
    }
}
