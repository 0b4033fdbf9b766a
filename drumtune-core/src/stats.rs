//! # Statistics Module
//!
//! Small numeric helpers shared by the pitch estimator and the session store.
//! Everything here is a pure function of its input.

use serde::{Deserialize, Serialize};

/// Readings whose spread is strictly below this value count as "even".
pub const EVENNESS_THRESHOLD_HZ: f32 = 5.0;

/// Root-mean-square amplitude of a block of samples.
///
/// Returns `0.0` for an empty slice instead of `NaN`.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_sq / samples.len() as f64).sqrt() as f32
}

/// Arithmetic mean, or `None` when there is nothing to average.
pub fn mean(values: &[f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    let sum: f64 = values.iter().map(|&v| v as f64).sum();
    Some((sum / values.len() as f64) as f32)
}

/// Difference between the largest and smallest value.
///
/// Fewer than two values have no spread, so this returns `0.0`.
pub fn spread(values: &[f32]) -> f32 {
    if values.len() < 2 {
        return 0.0;
    }
    let (min, max) = values
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    max - min
}

/// Aggregate view over the defined readings of one drum head.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReadingStats {
    /// Number of positions holding a reading.
    pub count: usize,
    /// Number of positions on the head.
    pub lug_count: usize,
    /// Mean of the defined readings in Hz.
    pub mean: Option<f32>,
    /// `max - min` of the defined readings in Hz.
    pub spread: f32,
    /// `spread < EVENNESS_THRESHOLD_HZ`.
    pub evenness: bool,
}

impl ReadingStats {
    /// Derives statistics from the defined readings of a head with `lug_count` positions.
    pub fn from_readings(values: &[f32], lug_count: usize) -> Self {
        let spread = spread(values);
        Self {
            count: values.len(),
            lug_count,
            mean: mean(values),
            spread,
            evenness: spread < EVENNESS_THRESHOLD_HZ,
        }
    }

    /// True once every position on the head has a reading.
    pub fn is_complete(&self) -> bool {
        self.lug_count > 0 && self.count == self.lug_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rms_of_empty_block_is_zero() {
        assert_eq!(rms(&[]), 0.0);
        assert_eq!(rms(&[0.0; 16]), 0.0);
    }

    #[test]
    fn rms_of_square_wave_is_amplitude() {
        let block: Vec<f32> = (0..64).map(|i| if i % 2 == 0 { 0.5 } else { -0.5 }).collect();
        assert!((rms(&block) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn spread_needs_two_values() {
        assert_eq!(spread(&[]), 0.0);
        assert_eq!(spread(&[220.0]), 0.0);
        assert_eq!(spread(&[220.0, 230.0, 225.0]), 10.0);
    }

    #[test]
    fn evenness_boundary() {
        let even = ReadingStats::from_readings(&[100.0, 104.99], 2);
        assert!(even.evenness);
        assert!(even.is_complete());

        let uneven = ReadingStats::from_readings(&[100.0, 105.0], 2);
        assert_eq!(uneven.spread, 5.0);
        assert!(!uneven.evenness);
    }

    #[test]
    fn empty_readings_have_no_mean() {
        let stats = ReadingStats::from_readings(&[], 6);
        assert_eq!(stats.count, 0);
        assert_eq!(stats.mean, None);
        assert!(!stats.is_complete());
    }
}
