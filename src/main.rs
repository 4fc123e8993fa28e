//! Amplitude relay replay tool - main entry point.
//!
//! Reads newline-delimited JSON events, runs them through the session
//! middleware and the Amplitude translator, and prints every vendor call the
//! client would have received as one JSON line on stdout.

use amplitude_relay::session::{Clock, ManualClock, SystemClock};
use amplitude_relay::{
    AnalyticsEvent, Config, EventTranslator, Pipeline, RecordingClient, SessionCorrelator,
};
use clap::Parser;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "amplitude-relay", version, about)]
struct Args {
    /// Relay configuration (JSON). Defaults apply when omitted.
    #[arg(long, env = "AMPLITUDE_RELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Events file (one JSON event per line). Reads stdin when omitted.
    input: Option<PathBuf>,

    /// Issue a flush after the last event.
    #[arg(long)]
    flush_at_end: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::from_json_str(&std::fs::read_to_string(path)?)?,
        None => Config::default(),
    };

    amplitude_relay::observability::init_tracing(&config.observability);

    // Sessions follow the recorded event timestamps, not replay time.
    let clock = ManualClock::new(SystemClock.now_millis());
    let client = Arc::new(RecordingClient::new());
    let mut pipeline = Pipeline::new()
        .with_middleware(SessionCorrelator::from_config(&config.session, clock.clone()))
        .with_destination(EventTranslator::new(config.integration.clone(), client.clone()));

    let reader: Box<dyn BufRead> = match &args.input {
        Some(path) => Box::new(BufReader::new(std::fs::File::open(path)?)),
        None => Box::new(BufReader::new(io::stdin())),
    };
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let mut processed = 0usize;
    let mut skipped = 0usize;
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let event: AnalyticsEvent = match serde_json::from_str(&line) {
            Ok(event) => event,
            Err(err) => {
                tracing::warn!(line = index + 1, error = %err, "skipping undecodable event");
                skipped += 1;
                continue;
            }
        };

        clock.set(
            event
                .meta
                .timestamp
                .map(|ts| ts.timestamp_millis())
                .unwrap_or_else(|| SystemClock.now_millis()),
        );
        pipeline.process(event)?;
        processed += 1;

        for call in client.take_calls() {
            serde_json::to_writer(&mut out, &call)?;
            out.write_all(b"\n")?;
        }
    }

    if args.flush_at_end {
        pipeline.flush()?;
        for call in client.take_calls() {
            serde_json::to_writer(&mut out, &call)?;
            out.write_all(b"\n")?;
        }
    }
    out.flush()?;

    tracing::info!(processed, skipped, "replay finished");
    Ok(())
}
