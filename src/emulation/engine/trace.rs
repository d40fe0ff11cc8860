//! Step tracing.
//!
//! With tracing on, the interpreter emits a [`TraceEvent`] for each dispatched instruction,
//! taken jump, entered or terminated frame and taint finding, enough to replay a run when a
//! finding needs explaining.
//!
//! # Usage
//!
//! Enable tracing via [`TracingConfig`](crate::emulation::TracingConfig):
//!
//! ```rust,no_run
//! use taintscope::emulation::{AnalysisConfig, ProcessBuilder, TracingConfig};
//!
//! let config = AnalysisConfig {
//!     tracing: TracingConfig::full_trace("trace.jsonl"),
//!     ..Default::default()
//! };
//!
//! let process = ProcessBuilder::new().config(config).build()?;
//! # Ok::<(), taintscope::Error>(())
//! ```
//!
//! # Output Format
//!
//! A file sink gets one JSON object per line, tagged by an `"event"` field and, when a
//! context is configured, led by a `"context"` field.

use std::{
    collections::VecDeque,
    fs::{File, OpenOptions},
    io::{BufWriter, Write},
    path::Path,
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex,
    },
};

use alloy_primitives::Address;
use serde::Serialize;

use crate::{
    emulation::{engine::arithmetic::BranchDistance, CallKind, TaintFlags},
    Result,
};

/// A trace event recorded during emulation.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEvent {
    /// An instruction is about to execute.
    Instruction {
        /// Frame depth (0 for the top-level frame).
        depth: usize,
        /// Offset of the instruction.
        pc: usize,
        /// Opcode byte.
        opcode: u8,
        /// Mnemonic, `"UNKNOWN"` for unassigned bytes.
        mnemonic: &'static str,
        /// Stack depth before execution.
        stack_depth: usize,
        /// Tag of the top stack entry, if any.
        top_taint: Option<TaintFlags>,
        /// Gas left before the static charge.
        gas_left: u64,
    },

    /// A jump was taken.
    Jump {
        /// Frame depth.
        depth: usize,
        /// Offset of the jump instruction.
        from: usize,
        /// Destination offset.
        to: usize,
        /// Whether the jump was a `JUMPI`.
        conditional: bool,
    },

    /// A tainted comparison recorded branch distances.
    BranchCost {
        /// Offset of the comparison.
        pc: usize,
        /// Recorded distances.
        distance: BranchDistance,
    },

    /// Externally driven arithmetic wrapped around.
    Overflow {
        /// Offset of the arithmetic instruction.
        pc: usize,
        /// Opcode byte.
        opcode: u8,
        /// Finding bits that were added.
        flags: TaintFlags,
        /// Name of the guard idiom that matched, if any.
        guard: Option<&'static str>,
    },

    /// A nested frame was entered.
    Call {
        /// Depth of the new frame.
        depth: usize,
        /// Call flavor.
        kind: CallKind,
        /// Account whose code runs.
        code_address: Address,
        /// Gas handed to the frame.
        gas: u64,
    },

    /// A frame terminated.
    Return {
        /// Depth of the terminated frame.
        depth: usize,
        /// Status, rendered.
        status: String,
        /// Length of the output.
        output_len: usize,
        /// OR of the output tags.
        output_taint: TaintFlags,
    },
}

#[derive(Serialize)]
struct TraceLine<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<&'a str>,
    #[serde(flatten)]
    event: &'a TraceEvent,
}

impl TraceEvent {
    /// Converts the event to a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        self.to_json_with_context(None)
    }

    /// Converts the event to a JSON string with an optional context prefix.
    ///
    /// When a context is provided, it is included as a `"context"` field at the beginning of
    /// the JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] if serialization fails.
    pub fn to_json_with_context(&self, context: Option<&str>) -> Result<String> {
        let line = TraceLine {
            context,
            event: self,
        };
        Ok(serde_json::to_string(&line)?)
    }
}

enum Sink {
    File(Mutex<BufWriter<File>>),
    Memory {
        events: Mutex<VecDeque<TraceEvent>>,
        capacity: usize,
    },
}

/// Destination for [`TraceEvent`]s: an NDJSON file or a bounded in-memory ring.
///
/// Tracing never fails a run. A write that cannot be serialized or stored is logged at `warn`
/// and dropped.
pub struct TraceWriter {
    sink: Sink,
    written: AtomicU64,
    context: Option<String>,
}

impl TraceWriter {
    /// Appends events to the file at `path`, creating it if needed.
    ///
    /// Several runs may share one file; `context` (for example `"seed-17"`) tells their lines
    /// apart.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::FileError`] if the file cannot be opened for appending.
    pub fn new_file<P: AsRef<Path>>(path: P, context: Option<String>) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::with_sink(Sink::File(Mutex::new(BufWriter::new(file))), context))
    }

    /// Keeps the newest `capacity` events in memory; zero keeps everything.
    #[must_use]
    pub fn new_memory(capacity: usize, context: Option<String>) -> Self {
        let events = Mutex::new(VecDeque::with_capacity(capacity.min(10_000)));
        Self::with_sink(Sink::Memory { events, capacity }, context)
    }

    fn with_sink(sink: Sink, context: Option<String>) -> Self {
        TraceWriter {
            sink,
            written: AtomicU64::new(0),
            context,
        }
    }

    /// Context attached to every line, if any.
    #[must_use]
    pub fn context_prefix(&self) -> Option<&str> {
        self.context.as_deref()
    }

    /// Records one event.
    pub fn write(&self, event: TraceEvent) {
        self.written.fetch_add(1, Ordering::Relaxed);

        match &self.sink {
            Sink::File(file) => {
                let json = match event.to_json_with_context(self.context.as_deref()) {
                    Ok(json) => json,
                    Err(error) => {
                        tracing::warn!(%error, "dropping unserializable trace event");
                        return;
                    }
                };
                let Ok(mut writer) = file.lock() else {
                    return;
                };
                if let Err(error) = writeln!(writer, "{json}") {
                    tracing::warn!(%error, "trace file write failed");
                }
            }
            Sink::Memory { events, capacity } => {
                let Ok(mut events) = events.lock() else {
                    return;
                };
                if *capacity > 0 && events.len() >= *capacity {
                    events.pop_front();
                }
                events.push_back(event);
            }
        }
    }

    /// Flushes the file sink.
    pub fn flush(&self) {
        if let Sink::File(file) = &self.sink {
            if let Ok(mut writer) = file.lock() {
                let _ = writer.flush();
            }
        }
    }

    /// Events written since creation, including those a full ring dropped.
    #[must_use]
    pub fn event_count(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    /// Drains the in-memory ring. `None` for a file sink.
    pub fn take_buffer(&self) -> Option<Vec<TraceEvent>> {
        match &self.sink {
            Sink::Memory { events, .. } => {
                events.lock().ok().map(|mut events| events.drain(..).collect())
            }
            Sink::File(_) => None,
        }
    }
}

impl Drop for TraceWriter {
    fn drop(&mut self) {
        self.flush();
    }
}

impl std::fmt::Debug for TraceWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sink = match &self.sink {
            Sink::File(_) => "file",
            Sink::Memory { .. } => "memory",
        };
        f.debug_struct("TraceWriter")
            .field("sink", &sink)
            .field("event_count", &self.event_count())
            .field("context", &self.context)
            .finish()
    }
}
