use drumtune_core::{FreqRange, HistoryEntry, ReadingStats, SessionKey, TuningSession};
use serde::Serialize;

/// Snapshot of the active head, written by the `export` command.
#[derive(Debug, Serialize)]
pub struct SessionReport {
    pub key: SessionKey,
    pub target: f32,
    pub range: FreqRange,
    /// One entry per lug, `null` where nothing was recorded.
    pub readings: Vec<Option<f32>>,
    pub statistics: ReadingStats,
    pub history: Vec<HistoryEntry>,
}

impl SessionReport {
    /// `None` until a configuration has been selected.
    pub fn from_session(session: &TuningSession) -> Option<Self> {
        Some(Self {
            key: session.active_key()?.clone(),
            target: session.target()?,
            range: session.range()?,
            readings: session.readings()?.slots().to_vec(),
            statistics: session.statistics(),
            history: session.history().cloned().collect(),
        })
    }
}
