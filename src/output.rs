use std::io::{self, Write};

use serde::Serialize;

use crate::app::{BatchResult, LookupResult, ProgressEvent, ProgressSink};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_convert(result: &BatchResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_lookup(result: &LookupResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

/// Writes progress lines to stderr for interactive runs.
pub struct StderrProgress;

impl ProgressSink for StderrProgress {
    fn event(&self, event: ProgressEvent) {
        let (phase, detail) = event
            .message
            .split_once("; ")
            .unwrap_or(("", event.message.as_str()));
        let phase = phase.trim_start_matches("phase=");
        match event.elapsed {
            Some(elapsed) => eprintln!(
                "\x1b[36m{phase:>8}\x1b[0m {detail} ({:.1}s)",
                elapsed.as_secs_f64()
            ),
            None => eprintln!("\x1b[36m{phase:>8}\x1b[0m {detail}"),
        }
    }
}
