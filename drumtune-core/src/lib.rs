// drumtune-core/src/lib.rs

//! The core logic for the drum head tuner.
//! This crate is responsible for audio input, pitch estimation and the
//! per-lug tuning session. It is completely headless
//! and contains no GUI code.
//!
//! The two halves are independent: [`pitch`] turns audio windows into
//! estimates, [`session`] stores the readings a user commits. A front-end
//! wires them together, typically through a [`listener::Listener`] and a
//! [`tracker::FrequencyTracker`].

pub mod audio;
pub mod deviation;
pub mod fft;
pub mod instrument;
pub mod listener;
pub mod pitch;
pub mod session;
pub mod stats;
pub mod tracker;

pub use audio::{AudioSource, AudioWindow, MicrophoneSource, WindowSequence};
pub use deviation::{Deviation, DeviationClass};
pub use instrument::{CatalogError, FreqRange, HeadSide, Instrument, InstrumentCatalog};
pub use listener::Listener;
pub use pitch::{EstimatorConfig, Pitch, PitchEstimate, PitchEstimator};
pub use session::{HistoryEntry, ReadingSet, SessionError, SessionKey, TuningSession};
pub use stats::ReadingStats;
pub use tracker::{FrequencyTracker, PlausibleRange};
