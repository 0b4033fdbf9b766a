//! # drumtune - Drum Head Tuning Aid
//!
//! Terminal front-end for `drumtune-core`.
//!
//! ## Architecture
//! - **Audio Thread**: the core `Listener` estimates pitch on its own worker
//! - **Input Thread**: reads commands from stdin and forwards them as messages
//! - **Main Thread**: owns the tuning session and polls for estimates every 16ms

mod app;
mod commands;
mod config;
mod report;

use anyhow::{Context, Result, anyhow};
use app::{Flow, SourceConfig, TunerApp};
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use drumtune_core::{
    EstimatorConfig, HeadSide, Pitch, PitchEstimator, WindowSequence, listener::POLL_INTERVAL,
    pitch::AutocorrelationMethod,
};
use log::LevelFilter;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::thread;

fn cli() -> Command {
    Command::new("drumtune")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Measures drum head pitch at each lug to help tune a head evenly")
        .subcommand_required(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("More log output (-v info, -vv debug)")
                .action(ArgAction::Count)
                .global(true),
        )
        .arg(
            Arg::new("catalog")
                .long("catalog")
                .value_name("FILE")
                .help("JSON instrument catalog to use instead of the presets")
                .value_parser(value_parser!(PathBuf))
                .global(true),
        )
        .arg(
            Arg::new("fft")
                .long("fft")
                .help("Compute the autocorrelation through an FFT")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(Command::new("instruments").about("List the available instruments"))
        .subcommand(
            Command::new("analyze")
                .about("Estimate the pitch of every window of a WAV file")
                .arg(
                    Arg::new("file")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("target")
                        .short('t')
                        .long("target")
                        .value_name("HZ")
                        .help("Show the deviation from this frequency")
                        .value_parser(value_parser!(f32)),
                )
                .arg(
                    Arg::new("window")
                        .short('w')
                        .long("window")
                        .value_name("SAMPLES")
                        .default_value("4096")
                        .value_parser(value_parser!(usize)),
                ),
        )
        .subcommand(
            Command::new("session")
                .about("Interactive tuning session")
                .arg(
                    Arg::new("drum")
                        .short('d')
                        .long("drum")
                        .value_name("ID")
                        .help("Instrument id (default: first in the catalog)"),
                )
                .arg(
                    Arg::new("head")
                        .long("head")
                        .value_parser(["batter", "resonant"])
                        .default_value("batter"),
                )
                .arg(
                    Arg::new("wav")
                        .long("wav")
                        .value_name("FILE")
                        .help("Play a WAV file instead of listening to the microphone")
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("sine")
                        .long("sine")
                        .value_name("HZ")
                        .help("Listen to a synthetic tone instead of the microphone")
                        .value_parser(value_parser!(f32))
                        .conflicts_with("wav"),
                ),
        )
}

fn main() -> Result<()> {
    let matches = cli().get_matches();

    let level = match matches.get_count("verbose") {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    simple_logger::SimpleLogger::new()
        .with_level(level)
        .init()
        .context("Failed to initialize logging")?;

    let catalog =
        config::load_catalog(matches.get_one::<PathBuf>("catalog").map(PathBuf::as_path))?;
    let estimator = PitchEstimator::new(EstimatorConfig {
        method: if matches.get_flag("fft") {
            AutocorrelationMethod::Fft
        } else {
            AutocorrelationMethod::Direct
        },
        ..EstimatorConfig::default()
    });

    match matches.subcommand() {
        Some(("instruments", _)) => {
            app::print_catalog(&catalog);
            Ok(())
        }
        Some(("analyze", sub)) => analyze(sub, estimator),
        Some(("session", sub)) => run_session(sub, catalog, estimator),
        _ => Err(anyhow!("No subcommand given")),
    }
}

fn analyze(matches: &ArgMatches, estimator: PitchEstimator) -> Result<()> {
    let path = matches
        .get_one::<PathBuf>("file")
        .ok_or_else(|| anyhow!("No input file provided"))?;
    let window_size = matches.get_one::<usize>("window").copied().unwrap_or(4096);
    let target = matches.get_one::<f32>("target").copied();

    let windows = WindowSequence::from_wav(path, window_size)?;
    let mut offset_secs = 0.0;
    for (i, window) in windows.into_iter().enumerate() {
        let duration = window.duration_secs();
        let estimate = estimator.estimate(&window);
        let description = match estimate.pitch {
            Pitch::NoSignal => "no signal".to_string(),
            Pitch::Indeterminate => "indeterminate".to_string(),
            Pitch::Detected(hz) => match target {
                Some(target) => format!(
                    "{:.1} Hz  {}",
                    hz,
                    drumtune_core::Deviation::between(hz, target)
                ),
                None => format!("{:.1} Hz", hz),
            },
        };
        println!(
            "{:>4}  {:>7.3}s  rms {:.4}  {}",
            i, offset_secs, estimate.rms, description
        );
        offset_secs += duration;
    }
    Ok(())
}

fn run_session(
    matches: &ArgMatches,
    catalog: drumtune_core::InstrumentCatalog,
    estimator: PitchEstimator,
) -> Result<()> {
    let instrument = match matches.get_one::<String>("drum") {
        Some(id) => catalog
            .find(id)
            .cloned()
            .ok_or_else(|| anyhow!("Unknown drum '{}'", id))?,
        None => catalog
            .instruments()
            .first()
            .cloned()
            .ok_or_else(|| anyhow!("The catalog is empty"))?,
    };
    let head: HeadSide = matches
        .get_one::<String>("head")
        .map(|s| s.parse())
        .transpose()?
        .unwrap_or(HeadSide::Batter);
    let source = if let Some(path) = matches.get_one::<PathBuf>("wav") {
        SourceConfig::Wav(path.clone())
    } else if let Some(hz) = matches.get_one::<f32>("sine") {
        SourceConfig::Sine(*hz)
    } else {
        SourceConfig::Microphone
    };

    if !instrument.tips.is_empty() {
        println!("Tip: {}", instrument.tips);
    }
    println!("Type `help` for commands.");

    let mut app = TunerApp::new(catalog, instrument, head, source, estimator);
    app.update(commands::Message::ShowStats);
    app.start_listening();

    // stdin blocks, so it gets its own thread.
    let (message_tx, message_rx) = crossbeam_channel::unbounded();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            match commands::parse(&line) {
                Ok(Some(message)) => {
                    if message_tx.send(message).is_err() {
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => println!("{}", e),
            }
        }
    });

    let ticker = crossbeam_channel::tick(POLL_INTERVAL);
    loop {
        crossbeam_channel::select! {
            recv(message_rx) -> msg => match msg {
                Ok(message) => {
                    if app.update(message) == Flow::Quit {
                        break;
                    }
                }
                Err(_) => {
                    log::info!("[MAIN] Input closed");
                    app.stop_listening();
                    break;
                }
            },
            recv(ticker) -> _ => app.tick(),
        }
    }

    Ok(())
}
