use drumtune_core::instrument::{self, HeadSide};
use drumtune_core::{DeviationClass, FreqRange, TuningSession};

#[test]
fn snare_batter_eight_lug_scenario() {
    let snare = instrument::find_preset("snare").unwrap();
    let mut session = TuningSession::new();
    session.select_instrument(snare, HeadSide::Batter);

    assert_eq!(session.target(), Some(275.0));
    assert_eq!(session.statistics().count, 0);

    let readings = [276.0, 274.0, 280.0, 270.0, 277.0, 273.0, 278.0, 272.0];
    let mut position = 0;
    for &hz in &readings {
        position = session.record(position, Some(hz)).unwrap().unwrap();
    }
    assert_eq!(position, 0);

    let stats = session.statistics();
    assert_eq!(stats.count, 8);
    assert_eq!(stats.lug_count, 8);
    assert_eq!(stats.mean, Some(275.0));
    assert_eq!(stats.spread, 10.0);
    assert!(!stats.evenness);
    assert!(stats.is_complete());

    let classes: Vec<_> = session
        .readings()
        .unwrap()
        .slots()
        .iter()
        .map(|slot| session.deviation(slot.unwrap()).unwrap().class)
        .collect();
    assert_eq!(
        classes,
        vec![
            DeviationClass::OnTarget,
            DeviationClass::OnTarget,
            DeviationClass::Close,
            DeviationClass::Close,
            DeviationClass::OnTarget,
            DeviationClass::OnTarget,
            DeviationClass::Close,
            DeviationClass::Close,
        ]
    );

    let history: Vec<_> = session.history().collect();
    assert_eq!(history.len(), 8);
    assert_eq!(history[0].position, 8);
    assert_eq!(history[0].frequency, 272.0);
    assert_eq!(history[7].position, 1);
}

#[test]
fn evening_out_the_head() {
    let mut session = TuningSession::new();
    session.select_configuration("rack-tom", HeadSide::Batter, 6, FreqRange::new(140.0, 240.0));
    for (position, hz) in [190.0, 192.0, 188.0, 196.0, 191.0, 189.0].into_iter().enumerate() {
        session.record(position, Some(hz)).unwrap();
    }
    assert!(!session.statistics().evenness);

    // Back off the sharp lug and re-measure it.
    session.record(3, Some(191.5)).unwrap();
    let stats = session.statistics();
    assert_eq!(stats.count, 6);
    assert!(stats.evenness);
    assert!(stats.spread < 5.0);
}
