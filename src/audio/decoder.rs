//! # WAV Decoding
//!
//! In-process decoding for the `encode=false` path: parses a WAV container,
//! converts to f32, downmixes to mono and resamples to the inference rate.
//! Anything that is not a WAV file belongs to the ffmpeg path.

use std::io::Cursor;

use crate::audio::processor::{downmix_to_mono, resample_linear};

/// Decode a WAV payload to mono f32 at `target_rate`.
///
/// ## Supported sample formats:
/// 8/16/24-bit integer PCM and 32-bit float, any channel count.
///
/// ## Errors:
/// Returns a human-readable description when the payload is not a parseable
/// WAV file or contains no samples; the handler maps this to 415.
pub fn decode_wav(data: &[u8], target_rate: u32) -> Result<Vec<f32>, String> {
    if data.is_empty() {
        return Err("No audio data provided".to_string());
    }

    let mut reader = Cursor::new(data);
    let (header, bit_depth) =
        wav::read(&mut reader).map_err(|e| format!("Not a valid WAV file: {}", e))?;

    let samples: Vec<f32> = match bit_depth {
        wav::BitDepth::Eight(samples) => samples
            .into_iter()
            .map(|s| (s as f32 - 128.0) / 128.0)
            .collect(),
        wav::BitDepth::Sixteen(samples) => {
            samples.into_iter().map(|s| s as f32 / 32768.0).collect()
        }
        wav::BitDepth::TwentyFour(samples) => samples
            .into_iter()
            .map(|s| s as f32 / 8_388_608.0)
            .collect(),
        wav::BitDepth::ThirtyTwoFloat(samples) => samples,
        wav::BitDepth::Empty => {
            return Err("WAV file contains no samples".to_string());
        }
    };

    if samples.is_empty() {
        return Err("WAV file contains no samples".to_string());
    }

    let mono = downmix_to_mono(&samples, header.channel_count);
    Ok(resample_linear(&mono, header.sampling_rate, target_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build an in-memory 16-bit WAV file for tests.
    fn wav_bytes(sample_rate: u32, channels: u16, samples: &[i16]) -> Vec<u8> {
        let header = wav::Header::new(wav::WAV_FORMAT_PCM, channels, sample_rate, 16);
        let mut out = Cursor::new(Vec::new());
        wav::write(header, &wav::BitDepth::Sixteen(samples.to_vec()), &mut out).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_decode_mono_16bit_passthrough() {
        let samples: Vec<i16> = (0..1600).map(|i| (i % 100) as i16 * 100).collect();
        let bytes = wav_bytes(16_000, 1, &samples);

        let decoded = decode_wav(&bytes, 16_000).unwrap();
        assert_eq!(decoded.len(), samples.len());
        assert!((decoded[1] - samples[1] as f32 / 32768.0).abs() < 1e-6);
    }

    #[test]
    fn test_decode_downmixes_stereo() {
        // Interleaved L/R pairs with equal magnitude and opposite sign
        // cancel to silence when downmixed.
        let samples: Vec<i16> = (0..200).flat_map(|_| [1000i16, -1000i16]).collect();
        let bytes = wav_bytes(16_000, 2, &samples);

        let decoded = decode_wav(&bytes, 16_000).unwrap();
        assert_eq!(decoded.len(), 200);
        assert!(decoded.iter().all(|&s| s.abs() < 1e-6));
    }

    #[test]
    fn test_decode_resamples_to_target() {
        let samples: Vec<i16> = vec![0; 32_000];
        let bytes = wav_bytes(32_000, 1, &samples);

        let decoded = decode_wav(&bytes, 16_000).unwrap();
        assert_eq!(decoded.len(), 16_000);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_wav(b"definitely not audio", 16_000).is_err());
        assert!(decode_wav(&[], 16_000).is_err());
    }
}
