//! # Tuning Session Module
//!
//! In-memory record of the readings taken around each drum head.
//!
//! Readings are kept per (instrument, head side) pair. Switching to another
//! drum or head never discards anything: coming back to a pair restores its
//! readings exactly as they were left. All statistics are derived on demand
//! from the active head's readings.

use crate::deviation::Deviation;
use crate::instrument::{FreqRange, HeadSide, Instrument};
use crate::stats::ReadingStats;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::time::SystemTime;

/// Number of committed readings kept in the history log.
pub const HISTORY_CAPACITY: usize = 20;

/// Identifies one drum head within a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub instrument: String,
    pub head: HeadSide,
}

impl SessionKey {
    pub fn new(instrument: impl Into<String>, head: HeadSide) -> Self {
        Self {
            instrument: instrument.into(),
            head,
        }
    }
}

/// One optional reading per tension rod, indexed from zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingSet {
    slots: Vec<Option<f32>>,
}

impl ReadingSet {
    /// A set with `lug_count` unset positions.
    pub fn new(lug_count: usize) -> Self {
        Self {
            slots: vec![None; lug_count],
        }
    }

    pub fn lug_count(&self) -> usize {
        self.slots.len()
    }

    pub fn get(&self, position: usize) -> Option<f32> {
        self.slots.get(position).copied().flatten()
    }

    pub fn slots(&self) -> &[Option<f32>] {
        &self.slots
    }

    /// The defined readings in position order.
    pub fn defined(&self) -> Vec<f32> {
        self.slots.iter().flatten().copied().collect()
    }

    pub fn stats(&self) -> ReadingStats {
        ReadingStats::from_readings(&self.defined(), self.lug_count())
    }

    fn set(&mut self, position: usize, frequency: f32) {
        self.slots[position] = Some(frequency);
    }

    fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
    }

    fn resize(&mut self, lug_count: usize) {
        self.slots.resize(lug_count, None);
    }
}

/// An immutable record of one committed reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// 1-based position, as shown to the user.
    pub position: usize,
    pub frequency: f32,
    pub instrument: String,
    pub head: HeadSide,
    pub recorded_at: SystemTime,
}

/// Contract violations by the caller. The store is left untouched.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("No instrument configuration has been selected")]
    NoActiveConfiguration,

    #[error("Position {position} is out of range for a head with {lug_count} lugs")]
    PositionOutOfRange { position: usize, lug_count: usize },
}

#[derive(Debug, Clone)]
struct ActiveConfiguration {
    key: SessionKey,
    range: FreqRange,
    target: f32,
}

/// Per-head readings, the current target and the history log.
#[derive(Debug, Default)]
pub struct TuningSession {
    readings: HashMap<SessionKey, ReadingSet>,
    active: Option<ActiveConfiguration>,
    history: VecDeque<HistoryEntry>,
}

impl TuningSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `(instrument, head)` the active key.
    ///
    /// Creates an empty reading set the first time a key is seen and resets
    /// the target to the middle of `range`. Readings of other keys are kept.
    pub fn select_configuration(
        &mut self,
        instrument: &str,
        head: HeadSide,
        lug_count: usize,
        range: FreqRange,
    ) {
        let key = SessionKey::new(instrument, head);
        let readings = self
            .readings
            .entry(key.clone())
            .or_insert_with(|| ReadingSet::new(lug_count));
        if readings.lug_count() != lug_count {
            log::warn!(
                "[SESSION] Resizing {}/{} from {} to {} lugs",
                key.instrument,
                key.head,
                readings.lug_count(),
                lug_count
            );
            readings.resize(lug_count);
        }

        let target = range.midpoint();
        log::debug!(
            "[SESSION] Active configuration {}/{} ({} lugs, target {} Hz)",
            key.instrument,
            key.head,
            lug_count,
            target
        );
        self.active = Some(ActiveConfiguration { key, range, target });
    }

    /// Selects a catalog instrument.
    pub fn select_instrument(&mut self, instrument: &Instrument, head: HeadSide) {
        self.select_configuration(&instrument.id, head, instrument.lugs, instrument.range(head));
    }

    /// Overrides the target for the active key. Values outside the head's
    /// range are accepted.
    pub fn set_target(&mut self, hz: f32) -> Result<(), SessionError> {
        let active = self.active.as_mut().ok_or(SessionError::NoActiveConfiguration)?;
        if !active.range.contains(hz) {
            log::debug!(
                "[SESSION] Target {} Hz is outside the suggested {}-{} Hz range",
                hz,
                active.range.min,
                active.range.max
            );
        }
        active.target = hz;
        Ok(())
    }

    /// Commits a reading for `position` on the active head.
    ///
    /// Returns the position to measure next, wrapping around the head. When
    /// no frequency is available nothing is recorded and `Ok(None)` is
    /// returned.
    pub fn record(
        &mut self,
        position: usize,
        frequency: Option<f32>,
    ) -> Result<Option<usize>, SessionError> {
        let active = self.active.as_ref().ok_or(SessionError::NoActiveConfiguration)?;
        let readings = self
            .readings
            .get_mut(&active.key)
            .ok_or(SessionError::NoActiveConfiguration)?;
        let lug_count = readings.lug_count();
        if position >= lug_count {
            log::warn!(
                "[SESSION] Rejected reading for position {} ({} lugs)",
                position,
                lug_count
            );
            return Err(SessionError::PositionOutOfRange {
                position,
                lug_count,
            });
        }

        let Some(frequency) = frequency.filter(|hz| hz.is_finite()) else {
            return Ok(None);
        };

        readings.set(position, frequency);
        self.history.push_front(HistoryEntry {
            position: position + 1,
            frequency,
            instrument: active.key.instrument.clone(),
            head: active.key.head,
            recorded_at: SystemTime::now(),
        });
        self.history.truncate(HISTORY_CAPACITY);

        Ok(Some((position + 1) % lug_count))
    }

    /// Unsets every position of the active head. History is kept.
    pub fn clear(&mut self) -> Result<(), SessionError> {
        let active = self.active.as_ref().ok_or(SessionError::NoActiveConfiguration)?;
        if let Some(readings) = self.readings.get_mut(&active.key) {
            readings.clear();
        }
        Ok(())
    }

    /// Statistics over the active head's defined readings.
    ///
    /// Without an active key this describes an empty, zero-lug head.
    pub fn statistics(&self) -> ReadingStats {
        match self.readings() {
            Some(readings) => readings.stats(),
            None => ReadingStats::from_readings(&[], 0),
        }
    }

    /// Distance of `frequency` from the active target.
    pub fn deviation(&self, frequency: f32) -> Option<Deviation> {
        self.target().map(|target| Deviation::between(frequency, target))
    }

    pub fn active_key(&self) -> Option<&SessionKey> {
        self.active.as_ref().map(|a| &a.key)
    }

    pub fn target(&self) -> Option<f32> {
        self.active.as_ref().map(|a| a.target)
    }

    /// Suggested frequency range of the active head.
    pub fn range(&self) -> Option<FreqRange> {
        self.active.as_ref().map(|a| a.range)
    }

    /// Readings of the active head.
    pub fn readings(&self) -> Option<&ReadingSet> {
        self.active
            .as_ref()
            .and_then(|a| self.readings.get(&a.key))
    }

    /// Readings of any head seen during the session.
    pub fn readings_for(&self, key: &SessionKey) -> Option<&ReadingSet> {
        self.readings.get(key)
    }

    pub fn lug_count(&self) -> Option<usize> {
        self.readings().map(ReadingSet::lug_count)
    }

    /// Committed readings, most recent first.
    pub fn history(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deviation::DeviationClass;

    const SNARE_BATTER: FreqRange = FreqRange::new(220.0, 330.0);

    fn snare_session() -> TuningSession {
        let mut session = TuningSession::new();
        session.select_configuration("snare", HeadSide::Batter, 8, SNARE_BATTER);
        session
    }

    #[test]
    fn new_configuration_starts_empty() {
        for lug_count in [1, 5, 6, 8, 12] {
            let mut session = TuningSession::new();
            session.select_configuration("tom", HeadSide::Resonant, lug_count, SNARE_BATTER);
            let stats = session.statistics();
            assert_eq!(stats.count, 0);
            assert_eq!(stats.lug_count, lug_count);
            let readings = session.readings().unwrap();
            assert!((0..lug_count).all(|p| readings.get(p).is_none()));
        }
    }

    #[test]
    fn target_defaults_to_range_midpoint() {
        let mut session = snare_session();
        assert_eq!(session.target(), Some(275.0));

        session.set_target(400.0).unwrap();
        assert_eq!(session.target(), Some(400.0));

        session.select_configuration("snare", HeadSide::Resonant, 8, FreqRange::new(280.0, 420.0));
        assert_eq!(session.target(), Some(350.0));
    }

    #[test]
    fn record_advances_around_the_head() {
        let mut session = snare_session();
        let mut position = 0;
        for i in 0..8 {
            let next = session.record(position, Some(270.0 + i as f32)).unwrap();
            assert_eq!(next, Some((position + 1) % 8));
            position = next.unwrap();
            assert_eq!(session.statistics().count, i + 1);
        }
        assert_eq!(position, 0);
        assert!(session.statistics().is_complete());
    }

    #[test]
    fn record_recomputes_mean() {
        let mut session = snare_session();
        session.record(0, Some(270.0)).unwrap();
        assert_eq!(session.statistics().mean, Some(270.0));
        session.record(3, Some(280.0)).unwrap();
        assert_eq!(session.statistics().mean, Some(275.0));
        // Overwriting a position does not add a reading.
        session.record(3, Some(290.0)).unwrap();
        let stats = session.statistics();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.mean, Some(280.0));
    }

    #[test]
    fn record_without_frequency_is_a_no_op() {
        let mut session = snare_session();
        assert_eq!(session.record(2, None), Ok(None));
        assert_eq!(session.record(2, Some(f32::NAN)), Ok(None));
        assert_eq!(session.statistics().count, 0);
        assert_eq!(session.history_len(), 0);
    }

    #[test]
    fn invalid_state_is_rejected_without_mutation() {
        let mut session = TuningSession::new();
        assert_eq!(
            session.record(0, Some(200.0)),
            Err(SessionError::NoActiveConfiguration)
        );
        assert_eq!(session.clear(), Err(SessionError::NoActiveConfiguration));
        assert_eq!(session.set_target(200.0), Err(SessionError::NoActiveConfiguration));
        assert_eq!(session.deviation(200.0), None);

        let mut session = snare_session();
        assert_eq!(
            session.record(8, Some(200.0)),
            Err(SessionError::PositionOutOfRange {
                position: 8,
                lug_count: 8
            })
        );
        assert_eq!(session.statistics().count, 0);
        assert_eq!(session.history_len(), 0);
    }

    #[test]
    fn history_keeps_the_twenty_most_recent() {
        let mut session = snare_session();
        let mut position = 0;
        for i in 0..25 {
            position = session
                .record(position, Some(200.0 + i as f32))
                .unwrap()
                .unwrap();
        }
        let history: Vec<_> = session.history().collect();
        assert_eq!(history.len(), HISTORY_CAPACITY);
        assert_eq!(history[0].frequency, 224.0);
        assert_eq!(history[19].frequency, 205.0);
        assert_eq!(history[0].position, 1);
        assert_eq!(history[0].instrument, "snare");
        assert_eq!(history[0].head, HeadSide::Batter);
        assert!(history.windows(2).all(|w| w[0].recorded_at >= w[1].recorded_at));
    }

    #[test]
    fn readings_survive_switching_keys() {
        let mut session = snare_session();
        session.record(0, Some(271.0)).unwrap();
        session.record(5, Some(279.5)).unwrap();
        let before = session.readings().unwrap().clone();

        session.select_configuration("bass", HeadSide::Batter, 8, FreqRange::new(55.0, 90.0));
        assert_eq!(session.statistics().count, 0);
        session.record(1, Some(70.0)).unwrap();

        session.select_configuration("snare", HeadSide::Resonant, 8, FreqRange::new(280.0, 420.0));
        assert_eq!(session.statistics().count, 0);

        session.select_configuration("snare", HeadSide::Batter, 8, SNARE_BATTER);
        assert_eq!(session.readings(), Some(&before));
        assert_eq!(
            session
                .readings_for(&SessionKey::new("bass", HeadSide::Batter))
                .and_then(|r| r.get(1)),
            Some(70.0)
        );
    }

    #[test]
    fn clear_only_touches_the_active_head() {
        let mut session = snare_session();
        session.record(0, Some(275.0)).unwrap();
        session.select_configuration("snare", HeadSide::Resonant, 8, FreqRange::new(280.0, 420.0));
        session.record(0, Some(350.0)).unwrap();

        session.clear().unwrap();
        assert_eq!(session.statistics().count, 0);
        assert_eq!(session.history_len(), 2);

        session.select_configuration("snare", HeadSide::Batter, 8, SNARE_BATTER);
        assert_eq!(session.statistics().count, 1);
    }

    #[test]
    fn reselecting_with_a_new_lug_count_resizes() {
        let mut session = snare_session();
        session.record(7, Some(280.0)).unwrap();
        session.select_configuration("snare", HeadSide::Batter, 10, SNARE_BATTER);
        assert_eq!(session.lug_count(), Some(10));
        assert_eq!(session.readings().unwrap().get(7), Some(280.0));

        session.select_configuration("snare", HeadSide::Batter, 6, SNARE_BATTER);
        assert_eq!(session.lug_count(), Some(6));
        assert_eq!(session.statistics().count, 0);
    }

    #[test]
    fn deviation_uses_active_target() {
        let mut session = snare_session();
        assert_eq!(
            session.deviation(277.99).map(|d| d.class),
            Some(DeviationClass::OnTarget)
        );
        assert_eq!(session.deviation(283.0).map(|d| d.class), Some(DeviationClass::Off));
        session.set_target(283.0).unwrap();
        assert_eq!(
            session.deviation(283.0).map(|d| d.class),
            Some(DeviationClass::OnTarget)
        );
    }
}
