//! # Frequency Tracker Module
//!
//! Turns the raw stream of estimates into what a tuner displays: the last
//! plausible frequency and a loudness level. Estimates outside the plausible
//! range are ignored, so a single bad window does not blank the display.

use crate::pitch::PitchEstimate;

/// Range of fundamentals accepted from the estimator, exclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlausibleRange {
    pub min_hz: f32,
    pub max_hz: f32,
}

impl Default for PlausibleRange {
    fn default() -> Self {
        Self {
            min_hz: 30.0,
            max_hz: 1000.0,
        }
    }
}

impl PlausibleRange {
    pub fn accepts(&self, hz: f32) -> bool {
        hz > self.min_hz && hz < self.max_hz
    }
}

/// Scale applied to the RMS before clamping it to a 0..=1 level.
const LEVEL_GAIN: f32 = 5.0;

#[derive(Debug, Clone, Default)]
pub struct FrequencyTracker {
    range: PlausibleRange,
    current: Option<f32>,
    level: f32,
}

impl FrequencyTracker {
    pub fn new(range: PlausibleRange) -> Self {
        Self {
            range,
            current: None,
            level: 0.0,
        }
    }

    /// Folds one estimate into the display state.
    ///
    /// Returns the accepted frequency, rounded to 0.1 Hz, if this estimate
    /// replaced the current one.
    pub fn update(&mut self, estimate: &PitchEstimate) -> Option<f32> {
        self.level = (estimate.rms * LEVEL_GAIN).clamp(0.0, 1.0);
        let hz = estimate.frequency().filter(|&hz| self.range.accepts(hz))?;
        let rounded = (hz * 10.0).round() / 10.0;
        self.current = Some(rounded);
        Some(rounded)
    }

    /// Last accepted frequency in Hz.
    pub fn current(&self) -> Option<f32> {
        self.current
    }

    /// Loudness of the latest window, 0.0 to 1.0.
    pub fn level(&self) -> f32 {
        self.level
    }

    /// Forgets everything; used when listening stops.
    pub fn reset(&mut self) {
        self.current = None;
        self.level = 0.0;
    }
}
