//! # Deviation Module
//!
//! Classifies how far a measured frequency sits from the target frequency.
//! The classification only describes the reading; choosing colors, labels
//! or haptic patterns from it is left to the front-end.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Readings closer than this to the target are on target.
pub const ON_TARGET_HZ: f32 = 3.0;
/// Readings closer than this (but not on target) are close.
pub const CLOSE_HZ: f32 = 8.0;

/// Three-way bucket for the distance to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviationClass {
    OnTarget,
    Close,
    Off,
}

/// Signed distance from the target frequency plus its classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Deviation {
    /// `frequency - target` in Hz. Positive means the head is sharp.
    pub diff_hz: f32,
    pub class: DeviationClass,
}

impl Deviation {
    /// Compares `frequency` against `target`.
    pub fn between(frequency: f32, target: f32) -> Self {
        let diff_hz = frequency - target;
        let magnitude = diff_hz.abs();
        let class = if magnitude < ON_TARGET_HZ {
            DeviationClass::OnTarget
        } else if magnitude < CLOSE_HZ {
            DeviationClass::Close
        } else {
            DeviationClass::Off
        };
        Self { diff_hz, class }
    }

    pub fn is_sharp(&self) -> bool {
        self.diff_hz > 0.0
    }
}

impl fmt::Display for Deviation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.class {
            DeviationClass::OnTarget => write!(f, "ON TARGET"),
            _ if self.is_sharp() => write!(f, "+{:.1} Hz HIGH", self.diff_hz),
            _ => write!(f, "{:.1} Hz LOW", self.diff_hz),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_boundaries_are_exact() {
        let target = 275.0;
        assert_eq!(Deviation::between(target + 2.99, target).class, DeviationClass::OnTarget);
        assert_eq!(Deviation::between(target + 3.0, target).class, DeviationClass::Close);
        assert_eq!(Deviation::between(target + 7.99, target).class, DeviationClass::Close);
        assert_eq!(Deviation::between(target + 8.0, target).class, DeviationClass::Off);
    }

    #[test]
    fn classification_is_symmetric() {
        assert_eq!(Deviation::between(272.0, 275.0).class, DeviationClass::Close);
        assert_eq!(Deviation::between(267.0, 275.0).class, DeviationClass::Off);
        assert_eq!(Deviation::between(273.5, 275.0).class, DeviationClass::OnTarget);
    }

    #[test]
    fn labels() {
        assert_eq!(Deviation::between(276.0, 275.0).to_string(), "ON TARGET");
        assert_eq!(Deviation::between(280.0, 275.0).to_string(), "+5.0 Hz HIGH");
        assert_eq!(Deviation::between(262.5, 275.0).to_string(), "-12.5 Hz LOW");
    }
}
