//! # PCM Sample Processing
//!
//! Conversion and validation helpers shared by both ingestion paths:
//! 16-bit PCM parsing, channel downmixing and linear resampling.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

/// Parse raw little-endian 16-bit PCM bytes into normalized f32 samples.
///
/// ## Validation:
/// - data must be non-empty
/// - length must be even (two bytes per sample)
///
/// ## Returns:
/// Samples scaled from `[-32768, 32767]` to `[-1.0, 1.0]`.
pub fn pcm16_bytes_to_f32(data: &[u8]) -> Result<Vec<f32>, String> {
    if data.is_empty() {
        return Err("No audio data provided".to_string());
    }
    if data.len() % 2 != 0 {
        return Err("Audio data length must be even for 16-bit samples".to_string());
    }

    let mut cursor = Cursor::new(data);
    let mut samples = Vec::with_capacity(data.len() / 2);

    while let Ok(sample) = cursor.read_i16::<LittleEndian>() {
        samples.push(sample as f32 / 32768.0);
    }

    Ok(samples)
}

/// Convert f32 samples back to 16-bit PCM.
pub fn f32_to_pcm16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&sample| {
            let scaled = sample * 32768.0;
            scaled.clamp(-32768.0, 32767.0) as i16
        })
        .collect()
}

/// Average interleaved channels down to mono.
///
/// Samples beyond the last complete frame are dropped.
pub fn downmix_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    let channels = channels.max(1) as usize;
    if channels == 1 {
        return samples.to_vec();
    }

    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Linear resampling between arbitrary rates.
///
/// Linear interpolation is plenty for speech feeding a mel frontend; the
/// heavy lifting (arbitrary codecs, proper filters) belongs to the ffmpeg
/// path.
pub fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = ((samples.len() as f64) / ratio).floor() as usize;
    let mut out = Vec::with_capacity(out_len);

    for i in 0..out_len {
        let src_pos = i as f64 * ratio;
        let idx = src_pos as usize;
        let frac = (src_pos - idx as f64) as f32;

        let a = samples[idx.min(samples.len() - 1)];
        let b = samples[(idx + 1).min(samples.len() - 1)];
        out.push(a + (b - a) * frac);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pcm16_parsing() {
        let mut data = Vec::new();
        for sample in [0i16, 16384, -16384, 32767, -32768] {
            data.extend_from_slice(&sample.to_le_bytes());
        }

        let samples = pcm16_bytes_to_f32(&data).unwrap();
        assert_eq!(samples.len(), 5);
        assert_eq!(samples[0], 0.0);
        assert!((samples[1] - 0.5).abs() < 1e-4);
        assert!((samples[4] + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_pcm16_rejects_bad_input() {
        assert!(pcm16_bytes_to_f32(&[]).is_err());
        assert!(pcm16_bytes_to_f32(&[0u8; 15]).is_err());
    }

    #[test]
    fn test_pcm_conversion_roundtrip() {
        let pcm = vec![0i16, 16384, -16384, 32767, -32768];
        let bytes: Vec<u8> = pcm.iter().flat_map(|s| s.to_le_bytes()).collect();

        let floats = pcm16_bytes_to_f32(&bytes).unwrap();
        let back = f32_to_pcm16(&floats);

        for (original, converted) in pcm.iter().zip(back.iter()) {
            assert!((original - converted).abs() <= 1);
        }
    }

    #[test]
    fn test_downmix_stereo() {
        let stereo = vec![1.0, 0.0, 0.5, 0.5, -1.0, 1.0];
        let mono = downmix_to_mono(&stereo, 2);
        assert_eq!(mono, vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn test_downmix_mono_passthrough() {
        let mono = vec![0.1, 0.2, 0.3];
        assert_eq!(downmix_to_mono(&mono, 1), mono);
    }

    #[test]
    fn test_resample_halves_length() {
        let samples: Vec<f32> = (0..1000).map(|i| (i as f32 / 100.0).sin()).collect();
        let resampled = resample_linear(&samples, 32_000, 16_000);
        assert_eq!(resampled.len(), 500);
    }

    #[test]
    fn test_resample_same_rate_is_identity() {
        let samples = vec![0.1, -0.2, 0.3];
        assert_eq!(resample_linear(&samples, 16_000, 16_000), samples);
    }

    #[test]
    fn test_resample_preserves_constant_signal() {
        let samples = vec![0.25; 441];
        let resampled = resample_linear(&samples, 44_100, 16_000);
        assert!(!resampled.is_empty());
        assert!(resampled.iter().all(|&s| (s - 0.25).abs() < 1e-6));
    }
}
