//! Line commands accepted by an interactive session.

use drumtune_core::HeadSide;
use std::path::PathBuf;

/// User input for the session loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    // Configuration
    SelectDrum(String),  // Switch to another instrument from the catalog
    SelectHead(HeadSide),
    SelectLug(usize),    // 1-based, as printed next to each lug
    SetTarget(f32),

    // Readings
    Record,              // Commit the current frequency for the selected lug
    Clear,               // Forget every reading of the active head

    // Audio control
    StartListening,
    StopListening,

    // Output
    ShowStatus,
    ShowStats,
    ShowHistory,
    ListDrums,
    Export(PathBuf),
    Help,

    Quit,
}

pub const HELP: &str = "\
Commands:
  drum <id>          switch instrument (see `drums`)
  head <side>        batter | resonant
  lug <n>            select lug n (1-based)
  target <hz>        override the target frequency
  record | r         commit the current frequency to the selected lug
  clear              clear all readings of this head
  start | stop       start or stop listening
  status | s         show the current reading
  stats              show per-lug readings and statistics
  history            show recent readings
  drums              list instruments
  export <file>      write a JSON report of this session
  help               show this help
  quit | q           exit";

/// Parses one input line. Empty lines yield `Ok(None)`.
pub fn parse(line: &str) -> Result<Option<Message>, String> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(None);
    };
    let argument = words.next();

    let message = match (command.to_ascii_lowercase().as_str(), argument) {
        ("drum", Some(id)) => Message::SelectDrum(id.to_string()),
        ("head", Some(side)) => Message::SelectHead(side.parse().map_err(|e| format!("{}", e))?),
        ("lug", Some(n)) => {
            let n: usize = n.parse().map_err(|_| format!("'{}' is not a lug number", n))?;
            if n == 0 {
                return Err("Lugs are numbered from 1".to_string());
            }
            Message::SelectLug(n)
        }
        ("target", Some(hz)) => {
            let hz: f32 = hz.parse().map_err(|_| format!("'{}' is not a frequency", hz))?;
            if !hz.is_finite() || hz <= 0.0 {
                return Err("Target must be a positive frequency".to_string());
            }
            Message::SetTarget(hz)
        }
        ("export", Some(path)) => Message::Export(PathBuf::from(path)),
        ("record" | "r", None) => Message::Record,
        ("clear", None) => Message::Clear,
        ("start", None) => Message::StartListening,
        ("stop", None) => Message::StopListening,
        ("status" | "s", None) => Message::ShowStatus,
        ("stats", None) => Message::ShowStats,
        ("history", None) => Message::ShowHistory,
        ("drums", None) => Message::ListDrums,
        ("help" | "?", None) => Message::Help,
        ("quit" | "q" | "exit", None) => Message::Quit,
        ("drum" | "head" | "lug" | "target" | "export", None) => {
            return Err(format!("'{}' needs an argument", command));
        }
        _ => return Err(format!("Unknown command '{}'. Type `help`.", line.trim())),
    };
    Ok(Some(message))
}
