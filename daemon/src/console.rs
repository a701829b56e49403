/// Line-oriented command console on stdin.
///
/// The reader runs on a dedicated OS thread because a blocking stdin read
/// cannot be cancelled; the thread is simply abandoned when the daemon exits.
/// Each recognised line is forwarded to the main event loop as a
/// [`DaemonEvent`]. End of input counts as `quit`.
use std::io::BufRead;
use std::path::PathBuf;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::event::DaemonEvent;

pub const HELP: &str = "\
Commands:
  dir <path>  select the directory to mirror into
  start       start monitoring
  stop        stop monitoring
  toggle      start or stop monitoring
  save        write the clipboard to a new file now
  status      show the current state and directory
  help        show this list
  quit        stop monitoring and exit";

/// A parsed console line.
#[derive(Debug, PartialEq)]
pub enum Command {
    Event(DaemonEvent),
    Help,
}

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("unknown command '{0}'; type 'help' for a list of commands")]
    Unknown(String),
    #[error("'dir' needs a path, e.g. dir C:\\Users\\me\\Dropbox\\clips")]
    MissingPath,
}

/// Parses one input line. Blank lines yield `Ok(None)`.
///
/// The verb is case-insensitive. Everything after `dir` is taken as the path,
/// so paths containing spaces need no quoting; one pair of surrounding quotes
/// is stripped if present.
pub fn parse_command(line: &str) -> Result<Option<Command>, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let event = match verb.to_lowercase().as_str() {
        "dir" => {
            let path = strip_quotes(rest);
            if path.is_empty() {
                return Err(ParseError::MissingPath);
            }
            DaemonEvent::DirectorySelected(PathBuf::from(path))
        }
        "start" => DaemonEvent::StartMonitoring,
        "stop" => DaemonEvent::StopMonitoring,
        "toggle" => DaemonEvent::ToggleMonitoring,
        "save" => DaemonEvent::SaveNow,
        "status" => DaemonEvent::StatusRequested,
        "quit" | "exit" => DaemonEvent::Shutdown,
        "help" | "?" => return Ok(Some(Command::Help)),
        _ => return Err(ParseError::Unknown(verb.to_string())),
    };
    Ok(Some(Command::Event(event)))
}

fn strip_quotes(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(s)
}

/// Spawns the stdin reader thread.
pub fn start(tx: mpsc::Sender<DaemonEvent>) {
    let spawned = std::thread::Builder::new()
        .name("console".into())
        .spawn(move || read_commands(std::io::stdin().lock(), &tx));
    if let Err(e) = spawned {
        tracing::error!("Failed to start console thread: {e}");
    }
}

/// Reads commands from `input` until `quit`, end of input, or the event loop
/// goes away. Sends `Shutdown` on end of input.
fn read_commands(input: impl BufRead, tx: &mpsc::Sender<DaemonEvent>) {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!("Failed to read console input: {e}");
                break;
            }
        };
        match parse_command(&line) {
            Ok(None) => {}
            Ok(Some(Command::Help)) => println!("{HELP}"),
            Ok(Some(Command::Event(event))) => {
                let quit = event == DaemonEvent::Shutdown;
                if tx.blocking_send(event).is_err() || quit {
                    return;
                }
            }
            Err(e) => println!("error: {e}"),
        }
    }
    tracing::debug!("Console input closed");
    let _ = tx.blocking_send(DaemonEvent::Shutdown);
}
