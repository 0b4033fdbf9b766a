//! Session state for the interactive tuner.
//!
//! `TunerApp` owns both halves of the core: a [`Listener`] producing estimates
//! and the [`TuningSession`] holding committed readings. Estimates only reach
//! the session through [`Message::Record`].

use crate::commands::{HELP, Message};
use crate::report::SessionReport;
use anyhow::{Context, Result};
use drumtune_core::{
    DeviationClass, FrequencyTracker, HeadSide, Instrument, InstrumentCatalog, Listener,
    MicrophoneSource, PitchEstimator, TuningSession, WindowSequence, audio::WINDOW_SIZE,
};
use std::fs;
use std::path::PathBuf;

/// Where audio comes from when listening starts.
#[derive(Debug, Clone)]
pub enum SourceConfig {
    Microphone,
    Wav(PathBuf),
    /// A synthetic tone, in Hz.
    Sine(f32),
}

/// Number of windows generated for a synthetic tone (~10 s at 44.1 kHz).
const SINE_WINDOWS: usize = 108;

impl SourceConfig {
    fn start(&self, estimator: PitchEstimator) -> Result<Listener> {
        let listener = match self {
            SourceConfig::Microphone => Listener::start(MicrophoneSource::default(), estimator),
            SourceConfig::Wav(path) => {
                Listener::start(WindowSequence::from_wav(path, WINDOW_SIZE)?, estimator)
            }
            SourceConfig::Sine(hz) => Listener::start(
                WindowSequence::sine(*hz, 0.5, 44_100, WINDOW_SIZE, SINE_WINDOWS),
                estimator,
            ),
        };
        Ok(listener)
    }
}

/// What the session loop should do after handling a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct TunerApp {
    catalog: InstrumentCatalog,
    instrument: Instrument,
    head: HeadSide,
    session: TuningSession,

    source: SourceConfig,
    estimator: PitchEstimator,
    listener: Option<Listener>,
    tracker: FrequencyTracker,

    /// Lug the next `record` applies to, zero-based.
    selected_lug: Option<usize>,
    /// Last frequency printed, so the status line only repeats on change.
    last_shown: Option<f32>,
    was_listening: bool,
}

impl TunerApp {
    pub fn new(
        catalog: InstrumentCatalog,
        instrument: Instrument,
        head: HeadSide,
        source: SourceConfig,
        estimator: PitchEstimator,
    ) -> Self {
        let mut session = TuningSession::new();
        session.select_instrument(&instrument, head);
        Self {
            catalog,
            instrument,
            head,
            session,
            source,
            estimator,
            listener: None,
            tracker: FrequencyTracker::default(),
            selected_lug: Some(0),
            last_shown: None,
            was_listening: false,
        }
    }

    pub fn session(&self) -> &TuningSession {
        &self.session
    }

    pub fn selected_lug(&self) -> Option<usize> {
        self.selected_lug
    }

    pub fn is_listening(&self) -> bool {
        self.listener.as_ref().is_some_and(Listener::is_listening)
    }

    pub fn start_listening(&mut self) {
        if self.is_listening() {
            println!("Already listening.");
            return;
        }
        match self.source.start(self.estimator) {
            Ok(listener) => {
                log::info!("[MAIN] Listening on {:?}", self.source);
                self.listener = Some(listener);
                self.was_listening = true;
                println!("Listening... play the drum near lug {}.", self.lug_label());
            }
            Err(e) => {
                log::error!("[MAIN] Could not start audio source: {:#}", e);
                println!("No audio source: {:#}", e);
            }
        }
    }

    pub fn stop_listening(&mut self) {
        if let Some(mut listener) = self.listener.take() {
            listener.stop();
        }
        self.tracker.reset();
        self.last_shown = None;
        self.was_listening = false;
    }

    /// Drains new estimates. Called on every poll interval.
    pub fn tick(&mut self) {
        let Some(listener) = &self.listener else {
            return;
        };
        for estimate in listener.poll() {
            self.tracker.update(&estimate);
        }

        if self.was_listening && !listener.is_listening() {
            self.was_listening = false;
            println!("Audio source stopped. Type `start` to listen again.");
        }

        let current = self.tracker.current();
        if current.is_some() && current != self.last_shown {
            self.last_shown = current;
            self.print_status();
        }
    }

    pub fn update(&mut self, message: Message) -> Flow {
        log::debug!("[MAIN] Received message: {:?}", message);

        match message {
            Message::SelectDrum(id) => match self.catalog.find(&id).cloned() {
                Some(instrument) => {
                    self.instrument = instrument;
                    self.activate();
                }
                None => println!("Unknown drum '{}'. Type `drums` for the list.", id),
            },
            Message::SelectHead(head) => {
                self.head = head;
                self.activate();
            }
            Message::SelectLug(n) => {
                if n == 0 {
                    println!("Lugs are numbered from 1.");
                } else if n <= self.instrument.lugs {
                    self.selected_lug = Some(n - 1);
                    println!("Lug {} selected.", n);
                } else {
                    println!("{} has {} lugs.", self.instrument.name, self.instrument.lugs);
                }
            }
            Message::SetTarget(hz) => {
                if self.session.set_target(hz).is_ok() {
                    if let Some(range) = self.session.range().filter(|r| !r.contains(hz)) {
                        println!(
                            "Note: {:.1} Hz is outside the usual {}-{} Hz range.",
                            hz, range.min, range.max
                        );
                    }
                    println!("Target set to {:.1} Hz.", hz);
                }
            }
            Message::Record => self.record(),
            Message::Clear => {
                if self.session.clear().is_ok() {
                    self.selected_lug = None;
                    println!(
                        "Cleared {} {} readings. Select a lug with `lug <n>`.",
                        self.instrument.name, self.head
                    );
                }
            }
            Message::StartListening => self.start_listening(),
            Message::StopListening => {
                self.stop_listening();
                println!("Stopped listening.");
            }
            Message::ShowStatus => self.print_status(),
            Message::ShowStats => self.print_stats(),
            Message::ShowHistory => self.print_history(),
            Message::ListDrums => print_catalog(&self.catalog),
            Message::Export(path) => match self.export(&path) {
                Ok(()) => println!("Report written to {}.", path.display()),
                Err(e) => {
                    log::error!("[MAIN] Error saving report: {:#}", e);
                    println!("Could not write report: {:#}", e);
                }
            },
            Message::Help => println!("{}", HELP),
            Message::Quit => {
                self.stop_listening();
                return Flow::Quit;
            }
        }
        Flow::Continue
    }

    fn activate(&mut self) {
        self.session.select_instrument(&self.instrument, self.head);
        if self.selected_lug.is_some_and(|lug| lug >= self.instrument.lugs) {
            self.selected_lug = Some(0);
        }
        let stats = self.session.statistics();
        println!(
            "{} {} head: {} lugs, target {:.1} Hz, {} readings kept.",
            self.instrument.name,
            self.head,
            self.instrument.lugs,
            self.session.target().unwrap_or_default(),
            stats.count
        );
    }

    fn record(&mut self) {
        let Some(lug) = self.selected_lug else {
            println!("Select a lug first with `lug <n>`.");
            return;
        };
        let Some(frequency) = self.tracker.current() else {
            println!("No reading yet.");
            return;
        };
        match self.session.record(lug, Some(frequency)) {
            Ok(Some(next)) => {
                let label = self
                    .session
                    .deviation(frequency)
                    .map(|d| d.to_string())
                    .unwrap_or_default();
                println!("Lug {}: {:.1} Hz  {}", lug + 1, frequency, label);
                self.selected_lug = Some(next);
            }
            Ok(None) => println!("No reading yet."),
            Err(e) => log::warn!("[MAIN] Record rejected: {}", e),
        }
    }

    fn lug_label(&self) -> String {
        self.selected_lug
            .map(|lug| (lug + 1).to_string())
            .unwrap_or_else(|| "-".to_string())
    }

    fn print_status(&self) {
        let target = self.session.target().unwrap_or_default();
        match self.tracker.current() {
            Some(hz) => {
                let label = self
                    .session
                    .deviation(hz)
                    .map(|d| d.to_string())
                    .unwrap_or_default();
                println!(
                    "{:>7.1} Hz  [{}]  target {:.1} Hz  {}  lug {}",
                    hz,
                    level_bar(self.tracker.level()),
                    target,
                    label,
                    self.lug_label()
                );
            }
            None => println!(
                "    --- Hz  [{}]  target {:.1} Hz  lug {}",
                level_bar(self.tracker.level()),
                target,
                self.lug_label()
            ),
        }
    }

    fn print_stats(&self) {
        let Some(readings) = self.session.readings() else {
            return;
        };
        println!("{} {} head:", self.instrument.name, self.head);
        for (i, slot) in readings.slots().iter().enumerate() {
            let marker = if self.selected_lug == Some(i) { '>' } else { ' ' };
            match slot {
                Some(hz) => {
                    let deviation = self.session.deviation(*hz);
                    let class = deviation.map(|d| class_symbol(d.class)).unwrap_or(' ');
                    let label = deviation.map(|d| d.to_string()).unwrap_or_default();
                    println!("{} lug {:>2}: {:>7.1} Hz {} {}", marker, i + 1, hz, class, label);
                }
                None => println!("{} lug {:>2}:  no reading", marker, i + 1),
            }
        }

        let stats = self.session.statistics();
        println!(
            "Average {} | Max spread {:.1} Hz ({}) | Lugs recorded {} / {}",
            stats
                .mean
                .map(|m| format!("{:.1} Hz", m))
                .unwrap_or_else(|| "-".to_string()),
            stats.spread,
            if stats.evenness { "even" } else { "uneven" },
            stats.count,
            stats.lug_count
        );
    }

    fn print_history(&self) {
        if self.session.history_len() == 0 {
            println!("No readings recorded yet.");
            return;
        }
        for entry in self.session.history() {
            println!(
                "{} {} lug {}: {:.1} Hz",
                entry.instrument, entry.head, entry.position, entry.frequency
            );
        }
    }

    fn export(&self, path: &std::path::Path) -> Result<()> {
        let report = SessionReport::from_session(&self.session)
            .context("No active configuration to export")?;
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(path, json).with_context(|| format!("Failed to write '{}'", path.display()))?;
        Ok(())
    }
}

pub fn print_catalog(catalog: &InstrumentCatalog) {
    for instrument in catalog.instruments() {
        println!(
            "{:<10} {:<10} {} lugs  batter {}-{} Hz  resonant {}-{} Hz  {}  {}",
            instrument.id,
            instrument.name,
            instrument.lugs,
            instrument.batter_range.min,
            instrument.batter_range.max,
            instrument.resonant_range.min,
            instrument.resonant_range.max,
            size_summary(instrument),
            instrument.description
        );
    }
}

/// Shell sizes with the usual one marked, e.g. `13"/[14"]`.
fn size_summary(instrument: &Instrument) -> String {
    instrument
        .sizes
        .iter()
        .map(|size| {
            if instrument.default_size.as_ref() == Some(size) {
                format!("[{}]", size)
            } else {
                size.clone()
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn class_symbol(class: DeviationClass) -> char {
    match class {
        DeviationClass::OnTarget => '*',
        DeviationClass::Close => '~',
        DeviationClass::Off => '!',
    }
}

/// Ten-character loudness meter.
fn level_bar(level: f32) -> String {
    let filled = (level.clamp(0.0, 1.0) * 10.0).round() as usize;
    format!("{:<10}", "#".repeat(filled))
}
