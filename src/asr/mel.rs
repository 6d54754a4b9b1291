//! Mel filterbank construction for Whisper feature extraction.
//!
//! Whisper's reference implementation ships precomputed filterbank matrices;
//! this module generates the same matrix programmatically (Slaney-style mel
//! scale with area normalization) so the service has no binary asset to
//! distribute. The output layout is `(n_mels, n_fft / 2 + 1)` row-major,
//! which is what the candle Whisper audio helpers expect.

/// FFT size used by all Whisper checkpoints at 16 kHz.
pub const N_FFT: usize = 400;

/// Convert a frequency in Hz to the Slaney mel scale.
///
/// Linear below 1 kHz, logarithmic above.
fn hz_to_mel(hz: f64) -> f64 {
    let f_sp = 200.0 / 3.0;
    let min_log_hz = 1000.0;
    let min_log_mel = min_log_hz / f_sp;
    let logstep = (6.4f64).ln() / 27.0;

    if hz < min_log_hz {
        hz / f_sp
    } else {
        min_log_mel + (hz / min_log_hz).ln() / logstep
    }
}

/// Inverse of [`hz_to_mel`].
fn mel_to_hz(mel: f64) -> f64 {
    let f_sp = 200.0 / 3.0;
    let min_log_hz = 1000.0;
    let min_log_mel = min_log_hz / f_sp;
    let logstep = (6.4f64).ln() / 27.0;

    if mel < min_log_mel {
        mel * f_sp
    } else {
        min_log_hz * (logstep * (mel - min_log_mel)).exp()
    }
}

/// Build the triangular mel filterbank.
///
/// ## Parameters:
/// - **sample_rate**: audio sample rate (16000 for Whisper)
/// - **n_mels**: number of mel bands (80, or 128 for large-v3)
///
/// ## Returns:
/// Row-major weights of shape `(n_mels, N_FFT / 2 + 1)`; each row is one
/// triangular filter, area-normalized so filter energy is comparable across
/// bands.
pub fn mel_filterbank(sample_rate: u32, n_mels: usize) -> Vec<f32> {
    let n_freqs = N_FFT / 2 + 1;
    let f_max = sample_rate as f64 / 2.0;

    // Center frequencies: n_mels + 2 points evenly spaced on the mel scale.
    let mel_min = hz_to_mel(0.0);
    let mel_max = hz_to_mel(f_max);
    let mel_points: Vec<f64> = (0..n_mels + 2)
        .map(|i| mel_min + (mel_max - mel_min) * i as f64 / (n_mels + 1) as f64)
        .map(mel_to_hz)
        .collect();

    // FFT bin center frequencies.
    let fft_freqs: Vec<f64> = (0..n_freqs)
        .map(|i| i as f64 * sample_rate as f64 / N_FFT as f64)
        .collect();

    let mut filters = vec![0.0f32; n_mels * n_freqs];

    for m in 0..n_mels {
        let f_left = mel_points[m];
        let f_center = mel_points[m + 1];
        let f_right = mel_points[m + 2];

        // Slaney area normalization.
        let enorm = 2.0 / (f_right - f_left);

        for (k, &freq) in fft_freqs.iter().enumerate() {
            let lower = (freq - f_left) / (f_center - f_left);
            let upper = (f_right - freq) / (f_right - f_center);
            let weight = lower.min(upper).max(0.0);
            filters[m * n_freqs + k] = (weight * enorm) as f32;
        }
    }

    filters
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mel_scale_roundtrip() {
        for hz in [0.0, 250.0, 999.0, 1000.0, 4000.0, 8000.0] {
            let back = mel_to_hz(hz_to_mel(hz));
            assert!((back - hz).abs() < 1e-6, "roundtrip failed for {} Hz", hz);
        }
    }

    #[test]
    fn test_filterbank_shape() {
        let filters = mel_filterbank(16_000, 80);
        assert_eq!(filters.len(), 80 * (N_FFT / 2 + 1));

        let filters_128 = mel_filterbank(16_000, 128);
        assert_eq!(filters_128.len(), 128 * (N_FFT / 2 + 1));
    }

    #[test]
    fn test_filters_are_nonnegative_and_nonzero() {
        let n_freqs = N_FFT / 2 + 1;
        let filters = mel_filterbank(16_000, 80);

        assert!(filters.iter().all(|&w| w >= 0.0));

        // Every band must respond to at least one FFT bin.
        for m in 0..80 {
            let row = &filters[m * n_freqs..(m + 1) * n_freqs];
            assert!(
                row.iter().any(|&w| w > 0.0),
                "mel band {} has no support",
                m
            );
        }
    }

    #[test]
    fn test_band_centers_increase() {
        let n_freqs = N_FFT / 2 + 1;
        let filters = mel_filterbank(16_000, 80);

        let peak_bin = |m: usize| {
            let row = &filters[m * n_freqs..(m + 1) * n_freqs];
            row.iter()
                .enumerate()
                .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
                .map(|(i, _)| i)
                .unwrap()
        };

        for m in 1..80 {
            assert!(peak_bin(m) >= peak_bin(m - 1));
        }
    }
}
