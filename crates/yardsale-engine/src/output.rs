//! Tick callback that streams snapshots as JSON lines.
//!
//! One [`TickSnapshot`] per line, written every
//! `output.snapshot_interval_ticks` ticks. Each snapshot's `series` holds
//! the summaries of the ticks since the one before it, so the stream
//! carries every tick's summary. Logs go to stderr, so stdout
//! carries nothing but snapshots and can be piped straight into a
//! dashboard or `jq`.

use std::io::Write;

use tracing::{debug, warn};
use yardsale_core::runner::TickCallback;
use yardsale_core::tick::{SimulationState, TickSummary};
use yardsale_types::TickSnapshot;

/// Errors that can occur while writing a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// The sink rejected the write.
    #[error("failed to write snapshot: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// The snapshot could not be serialized.
    #[error("failed to serialize snapshot: {source}")]
    Json {
        /// The underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

/// Writes snapshots of the session to a line-oriented sink.
pub struct SnapshotWriter<W> {
    out: W,
    /// Tick of the last snapshot written, so the closing snapshot is not
    /// a duplicate.
    last_written: Option<u64>,
    /// Snapshots that failed to write during the run.
    failures: u64,
}

impl<W: Write + Send> SnapshotWriter<W> {
    /// Wrap a sink.
    pub const fn new(out: W) -> Self {
        Self {
            out,
            last_written: None,
            failures: 0,
        }
    }

    /// Write one snapshot followed by a newline, and flush.
    pub fn write_snapshot(&mut self, snapshot: &TickSnapshot) -> Result<(), OutputError> {
        serde_json::to_writer(&mut self.out, snapshot)?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        self.last_written = Some(snapshot.tick);
        debug!(tick = snapshot.tick, "Snapshot written");
        Ok(())
    }

    /// Write the state's snapshot with the summaries of every tick since
    /// the last snapshot written.
    pub fn write_current(&mut self, state: &SimulationState) -> Result<(), OutputError> {
        self.write_snapshot(&state.snapshot_since(self.last_written))
    }

    /// Write the state's current snapshot unless that tick was already
    /// written.
    pub fn write_final(&mut self, state: &SimulationState) -> Result<(), OutputError> {
        if self.last_written == Some(state.clock.tick()) {
            return Ok(());
        }
        self.write_current(state)
    }

    /// Number of snapshots that failed to write during the run.
    pub const fn failures(&self) -> u64 {
        self.failures
    }

    /// Give back the sink.
    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> TickCallback for SnapshotWriter<W> {
    fn on_tick(&mut self, summary: &TickSummary, state: &SimulationState) {
        if !state.clock.is_snapshot_tick() {
            return;
        }
        if let Err(err) = self.write_current(state) {
            self.failures = self.failures.saturating_add(1);
            warn!(tick = summary.tick, %err, "Snapshot dropped");
        }
    }
}
