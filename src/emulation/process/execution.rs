//! Analysis process - main entry point for taint analysis runs.
//!
//! This module provides [`EmulationProcess`], which owns everything a run needs besides its
//! findings: the world state, the configuration, the abort signal and an optional trace
//! writer. Findings live in an [`AnalysisSession`] the caller passes in, so one process can
//! serve any number of runs, sequentially or in parallel.
//!
//! # Creating a Process
//!
//! Use [`ProcessBuilder`](super::ProcessBuilder) to create an `EmulationProcess`:
//!
//! ```rust
//! use std::sync::Arc;
//! use taintscope::assembly::{opcodes::*, BytecodeEncoder};
//! use taintscope::emulation::{AnalysisSession, InMemoryHost, Message, ProcessBuilder, TaintFlags, Word};
//! use alloy_primitives::Address;
//!
//! let target = Address::repeat_byte(0xCC);
//! let mut code = BytecodeEncoder::new();
//! code.push_u64(1).push_u64(0).emit(CALLDATALOAD).emit(ADD).emit(STOP);
//!
//! let host = Arc::new(InMemoryHost::new());
//! host.insert_account(target, Word::ZERO, code.finalize()?);
//! let process = ProcessBuilder::new().host(host).build()?;
//!
//! let message = Message::call(Address::ZERO, target).with_input(vec![0xFF; 32]);
//! let mut session = AnalysisSession::new();
//! process.execute(&message, &mut session)?;
//! assert!(session.flags().contains(TaintFlags::OVERFLOW));
//! # Ok::<(), taintscope::Error>(())
//! ```

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use rayon::prelude::*;
use tracing::{debug, info};

use crate::{
    emulation::{
        process::{AbortSignal, AnalysisConfig, Host},
        AnalysisSession, ExecutionResult, Interpreter, Message, TraceWriter,
    },
    Result,
};

/// An analysis process.
///
/// All methods take `&self`; the process is `Send + Sync` and may be shared between threads.
/// Every run polls the same [`AbortSignal`], so raising it stops all runs in flight.
pub struct EmulationProcess {
    /// Process name for identification and logging.
    pub(super) name: String,

    /// Analysis configuration (immutable after creation).
    pub(super) config: Arc<AnalysisConfig>,

    /// World state shared by all runs.
    pub(super) host: Arc<dyn Host>,

    /// Cooperative cancellation flag.
    pub(super) abort: AbortSignal,

    /// Trace writer, present when tracing is enabled.
    pub(super) trace_writer: Option<Arc<TraceWriter>>,

    /// Instructions executed across all runs.
    pub(super) instruction_count: AtomicU64,

    /// Completed runs, successful or not.
    pub(super) run_count: AtomicU64,
}

impl EmulationProcess {
    /// Returns the process name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the analysis configuration.
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Returns the world state.
    pub fn host(&self) -> &Arc<dyn Host> {
        &self.host
    }

    /// Returns the abort signal polled by every run of this process.
    pub fn abort_signal(&self) -> &AbortSignal {
        &self.abort
    }

    /// Returns the trace writer, if tracing is enabled.
    pub fn trace_writer(&self) -> Option<&Arc<TraceWriter>> {
        self.trace_writer.as_ref()
    }

    /// Returns the number of instructions executed across all runs.
    pub fn instruction_count(&self) -> u64 {
        self.instruction_count.load(Ordering::Relaxed)
    }

    /// Runs `message` to completion, recording findings into `session`.
    ///
    /// The session is not reset; findings accumulate across runs that share it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Emulation`](crate::Error::Emulation) if the top-level frame faults or an
    /// execution limit is exceeded. Findings recorded before the error stay in `session`.
    pub fn execute(
        &self,
        message: &Message,
        session: &mut AnalysisSession,
    ) -> Result<ExecutionResult> {
        let mut interpreter = Interpreter::new(
            self.host.as_ref(),
            session,
            &self.config,
            &self.abort,
            self.trace_writer.as_deref(),
        );
        let result = interpreter.run(message);

        self.instruction_count
            .fetch_add(interpreter.stats().instructions_executed, Ordering::Relaxed);
        self.run_count.fetch_add(1, Ordering::Relaxed);
        result
    }

    /// Runs `message` with a fresh session and returns both.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub fn analyze(&self, message: &Message) -> Result<(ExecutionResult, AnalysisSession)> {
        let mut session = AnalysisSession::with_capacity(self.config.recorder_capacity);
        let result = self.execute(message, &mut session)?;
        Ok((result, session))
    }

    /// Runs independent messages in parallel, each with its own session.
    ///
    /// Results are returned in the order of `messages`. All runs share the world state, so
    /// messages that write storage observe each other's writes in an unspecified order.
    pub fn execute_batch(
        &self,
        messages: &[Message],
    ) -> Vec<Result<(ExecutionResult, AnalysisSession)>> {
        info!(process = %self.name, runs = messages.len(), "starting batch");
        let results: Vec<_> = messages
            .par_iter()
            .map(|message| self.analyze(message))
            .collect();

        let failed = results.iter().filter(|result| result.is_err()).count();
        debug!(process = %self.name, failed, "batch finished");
        results
    }

    /// Returns a summary of the process state.
    pub fn summary(&self) -> ProcessSummary {
        ProcessSummary {
            name: self.name.clone(),
            runs: self.run_count.load(Ordering::Relaxed),
            instruction_count: self.instruction_count(),
            aborted: self.abort.is_aborted(),
            trace_events: self
                .trace_writer
                .as_ref()
                .map_or(0, |writer| writer.event_count()),
        }
    }
}

impl std::fmt::Debug for EmulationProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmulationProcess")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("instruction_count", &self.instruction_count())
            .field("tracing", &self.trace_writer.is_some())
            .finish()
    }
}

/// Summary snapshot of an [`EmulationProcess`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessSummary {
    /// Display name of the process.
    pub name: String,

    /// Completed runs.
    pub runs: u64,

    /// Instructions executed across all runs.
    pub instruction_count: u64,

    /// Whether the abort signal is raised.
    pub aborted: bool,

    /// Trace events written so far.
    pub trace_events: u64,
}
