//! # Pitch Detection Module
//!
//! Estimates the fundamental frequency of a sustained drum tone with
//! autocorrelation. The estimator is a pure function of its input window: it
//! keeps no state between calls and never fails. Windows that cannot be
//! analysed are classified instead.
//!
//! ## Algorithm
//! 1. RMS noise gate: quiet windows are reported as [`Pitch::NoSignal`]
//! 2. Edge trimming: leading and trailing samples above the clip threshold are dropped
//! 3. Unnormalized autocorrelation over every lag of the trimmed window
//! 4. Skip the zero-lag peak by walking down to its first local minimum
//! 5. Take the highest remaining autocorrelation value as the period
//! 6. Parabolic interpolation around the period for sub-sample accuracy

use crate::audio::AudioWindow;
use crate::{fft, stats};

/// Windows with an RMS below this are treated as silence.
pub const SILENCE_THRESHOLD: f32 = 0.01;
/// Edge samples louder than this are trimmed before correlation.
pub const CLIP_THRESHOLD: f32 = 0.2;

/// How the autocorrelation sequence is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutocorrelationMethod {
    /// Lag-by-lag sum, O(N²).
    #[default]
    Direct,
    /// Same sequence through a zero-padded FFT, O(N log N).
    Fft,
}

/// Calibration constants for the estimator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimatorConfig {
    pub silence_threshold: f32,
    pub clip_threshold: f32,
    pub method: AutocorrelationMethod,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            silence_threshold: SILENCE_THRESHOLD,
            clip_threshold: CLIP_THRESHOLD,
            method: AutocorrelationMethod::Direct,
        }
    }
}

/// Outcome of analysing one window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pitch {
    /// RMS below the silence threshold.
    NoSignal,
    /// Loud enough, but no usable periodicity.
    Indeterminate,
    /// Estimated fundamental in Hz.
    Detected(f32),
}

/// Result of one estimation: the classification plus the window loudness.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchEstimate {
    pub pitch: Pitch,
    /// RMS of the whole window, reported whether or not a pitch was found.
    pub rms: f32,
}

impl PitchEstimate {
    pub fn frequency(&self) -> Option<f32> {
        match self.pitch {
            Pitch::Detected(hz) => Some(hz),
            _ => None,
        }
    }

    pub fn is_silent(&self) -> bool {
        self.pitch == Pitch::NoSignal
    }
}

/// Autocorrelation pitch estimator.
#[derive(Debug, Clone, Copy, Default)]
pub struct PitchEstimator {
    config: EstimatorConfig,
}

impl PitchEstimator {
    pub fn new(config: EstimatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Analyses one window.
    pub fn estimate(&self, window: &AudioWindow) -> PitchEstimate {
        let rms = stats::rms(&window.samples);
        let pitch = self.classify(&window.samples, window.sample_rate, rms);
        PitchEstimate { pitch, rms }
    }

    /// Turns a sequence of windows into a sequence of estimates, lazily.
    pub fn estimates<I>(&self, windows: I) -> Estimates<I::IntoIter>
    where
        I: IntoIterator<Item = AudioWindow>,
    {
        Estimates {
            estimator: *self,
            windows: windows.into_iter(),
        }
    }

    fn classify(&self, samples: &[f32], sample_rate: u32, rms: f32) -> Pitch {
        if rms < self.config.silence_threshold {
            return Pitch::NoSignal;
        }
        if !rms.is_finite() || sample_rate == 0 {
            return Pitch::Indeterminate;
        }

        let trimmed = trim_edges(samples, self.config.clip_threshold);
        if trimmed.len() <= 2 {
            return Pitch::Indeterminate;
        }

        let c = match self.config.method {
            AutocorrelationMethod::Direct => autocorrelation(trimmed),
            AutocorrelationMethod::Fft => fft::autocorrelation(trimmed),
        };

        match find_period(&c) {
            Some(period) => {
                let frequency = sample_rate as f32 / period;
                if frequency.is_finite() && frequency > 0.0 {
                    Pitch::Detected(frequency)
                } else {
                    Pitch::Indeterminate
                }
            }
            None => Pitch::Indeterminate,
        }
    }
}

/// Estimates a window with the default calibration.
pub fn estimate(window: &AudioWindow) -> PitchEstimate {
    PitchEstimator::default().estimate(window)
}

/// Iterator adapter returned by [`PitchEstimator::estimates`].
#[derive(Debug)]
pub struct Estimates<I> {
    estimator: PitchEstimator,
    windows: I,
}

impl<I> Iterator for Estimates<I>
where
    I: Iterator<Item = AudioWindow>,
{
    type Item = PitchEstimate;

    fn next(&mut self) -> Option<PitchEstimate> {
        self.windows.next().map(|w| self.estimator.estimate(&w))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.windows.size_hint()
    }
}

/// Drops the loud edges of a window.
///
/// Scans inward from each end (at most half the window, rounded up) for the
/// first sample quieter than `threshold`. The end bound is exclusive, so the
/// last sample is never kept.
fn trim_edges(samples: &[f32], threshold: f32) -> &[f32] {
    let size = samples.len();
    if size == 0 {
        return samples;
    }
    let half = size.div_ceil(2);

    let start = (0..half)
        .find(|&i| samples[i].abs() < threshold)
        .unwrap_or(0);
    let end = (1..half)
        .map(|i| size - i)
        .find(|&i| samples[i].abs() < threshold)
        .unwrap_or(size - 1);

    if start >= end { &samples[..0] } else { &samples[start..end] }
}

/// `c[i] = Σ_j x[j] * x[j + i]` for every lag `0..x.len()`.
fn autocorrelation(x: &[f32]) -> Vec<f32> {
    let len = x.len();
    (0..len)
        .map(|lag| {
            x[..len - lag]
                .iter()
                .zip(&x[lag..])
                .map(|(a, b)| a * b)
                .sum()
        })
        .collect()
}

/// Finds the period in samples from an autocorrelation sequence.
///
/// Returns `None` when the zero-lag slope never turns, or when the peak sits
/// on a boundary with no neighbours to interpolate.
fn find_period(c: &[f32]) -> Option<f32> {
    let len = c.len();

    // Walk off the zero-lag peak.
    let mut d = 0;
    while d + 1 < len && c[d] > c[d + 1] {
        d += 1;
    }
    if d + 1 >= len {
        return None;
    }

    let (t0, _) = c[d..]
        .iter()
        .enumerate()
        .fold((d, c[d]), |(best_i, best_v), (offset, &v)| {
            if v > best_v { (d + offset, v) } else { (best_i, best_v) }
        });

    if t0 == 0 || t0 + 1 >= len {
        return None;
    }

    let (x1, x2, x3) = (c[t0 - 1], c[t0], c[t0 + 1]);
    let a = (x1 + x3 - 2.0 * x2) / 2.0;
    let b = (x3 - x1) / 2.0;

    let period = if a != 0.0 {
        t0 as f32 - b / (2.0 * a)
    } else {
        t0 as f32
    };

    (period.is_finite() && period > 0.0).then_some(period)
}
