//! # Fast Fourier Transform (FFT) Module
//!
//! Computes the autocorrelation of a window through the frequency domain
//! (Wiener–Khinchin). The result matches the direct lag-by-lag sum used by the
//! pitch estimator up to floating-point rounding, at O(N log N) instead of
//! O(N²).
//!
//! ## Features
//! - High-performance FFT using RustFFT
//! - Zero padding so the circular correlation equals the linear one

use rustfft::{FftPlanner, num_complex::Complex};

/// Returns `c[i] = Σ_j signal[j] * signal[j + i]` for every lag `0..signal.len()`.
///
/// The signal is zero-padded to at least twice its length before the forward
/// transform, so lags never wrap around.
pub fn autocorrelation(signal: &[f32]) -> Vec<f32> {
    let len = signal.len();
    if len == 0 {
        return Vec::new();
    }
    let fft_len = (2 * len).next_power_of_two();

    let mut planner = FftPlanner::<f32>::new();
    let forward = planner.plan_fft_forward(fft_len);
    let inverse = planner.plan_fft_inverse(fft_len);

    let mut buffer: Vec<Complex<f32>> = signal
        .iter()
        .map(|&sample| Complex { re: sample, im: 0.0 })
        .chain(std::iter::repeat(Complex { re: 0.0, im: 0.0 }))
        .take(fft_len)
        .collect();

    forward.process(&mut buffer);

    // Power spectrum: X(k) * conj(X(k))
    for bin in buffer.iter_mut() {
        *bin = Complex {
            re: bin.norm_sqr(),
            im: 0.0,
        };
    }

    inverse.process(&mut buffer);

    // RustFFT does not normalize the inverse transform.
    let scale = 1.0 / fft_len as f32;
    buffer.iter().take(len).map(|c| c.re * scale).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn direct(signal: &[f32]) -> Vec<f32> {
        (0..signal.len())
            .map(|lag| {
                signal[..signal.len() - lag]
                    .iter()
                    .zip(&signal[lag..])
                    .map(|(a, b)| a * b)
                    .sum()
            })
            .collect()
    }

    #[test]
    fn matches_direct_sum() {
        let signal: Vec<f32> = (0..300)
            .map(|i| (i as f32 * 0.13).sin() * 0.6 + (i as f32 * 0.41).cos() * 0.2)
            .collect();
        let expected = direct(&signal);
        let actual = autocorrelation(&signal);
        assert_eq!(actual.len(), expected.len());
        let tolerance = expected[0] * 1e-4;
        for (a, e) in actual.iter().zip(expected.iter()) {
            assert!((a - e).abs() < tolerance, "fft {} vs direct {}", a, e);
        }
    }

    #[test]
    fn impulse_has_single_peak() {
        let c = autocorrelation(&[0.0, 1.0, 0.0, 0.0]);
        assert!((c[0] - 1.0).abs() < 1e-6);
        assert!(c[1..].iter().all(|v| v.abs() < 1e-6));
    }

    #[test]
    fn empty_signal() {
        assert!(autocorrelation(&[]).is_empty());
    }
}
