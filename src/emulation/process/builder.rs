//! Fluent construction of [`EmulationProcess`] instances.

use std::sync::{atomic::AtomicU64, Arc};

use tracing::debug;

use crate::{
    emulation::{
        process::{
            AbortSignal, AnalysisConfig, CancellationGranularity, EmulationLimits, EmulationProcess,
            Host, InMemoryHost, TracingConfig,
        },
        TraceWriter,
    },
    Result,
};

/// Builder for [`EmulationProcess`].
///
/// Without an explicit host the process runs against an empty [`InMemoryHost`].
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use taintscope::emulation::{InMemoryHost, ProcessBuilder};
///
/// let host = Arc::new(InMemoryHost::new());
/// let process = ProcessBuilder::new()
///     .name("token")
///     .host(host)
///     .for_fuzzing()
///     .build()?;
/// assert_eq!(process.name(), "token");
/// # Ok::<(), taintscope::Error>(())
/// ```
#[derive(Default)]
pub struct ProcessBuilder {
    name: Option<String>,
    config: AnalysisConfig,
    host: Option<Arc<dyn Host>>,
    abort: Option<AbortSignal>,
}

impl ProcessBuilder {
    /// Creates a builder with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the process name used in logs and summaries.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the world state.
    #[must_use]
    pub fn host(mut self, host: Arc<dyn Host>) -> Self {
        self.host = Some(host);
        self
    }

    /// Replaces the whole configuration.
    #[must_use]
    pub fn config(mut self, config: AnalysisConfig) -> Self {
        self.config = config;
        self
    }

    /// Uses [`AnalysisConfig::analysis()`].
    #[must_use]
    pub fn for_analysis(self) -> Self {
        self.config(AnalysisConfig::analysis())
    }

    /// Uses [`AnalysisConfig::fuzzing()`].
    #[must_use]
    pub fn for_fuzzing(self) -> Self {
        self.config(AnalysisConfig::fuzzing())
    }

    /// Sets the execution limits.
    #[must_use]
    pub fn limits(mut self, limits: EmulationLimits) -> Self {
        self.config.limits = limits;
        self
    }

    /// Sets where the abort signal is polled.
    #[must_use]
    pub fn cancellation(mut self, granularity: CancellationGranularity) -> Self {
        self.config.cancellation = granularity;
        self
    }

    /// Leaves the `CALLDATALOAD` at `pc` untainted.
    #[must_use]
    pub fn selector_load_pc(mut self, pc: usize) -> Self {
        self.config.selector_load_pc = Some(pc);
        self
    }

    /// Sets the tracing configuration.
    #[must_use]
    pub fn tracing(mut self, tracing: TracingConfig) -> Self {
        self.config.tracing = tracing;
        self
    }

    /// Shares an existing abort signal with the process, e.g. one owned by a fuzzer's watchdog.
    #[must_use]
    pub fn abort_signal(mut self, signal: AbortSignal) -> Self {
        self.abort = Some(signal);
        self
    }

    /// Validates the configuration and creates the process.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`](crate::Error::Configuration) for an invalid configuration
    /// and [`Error::FileError`](crate::Error::FileError) if the trace file cannot be opened.
    pub fn build(self) -> Result<EmulationProcess> {
        self.config.validate()?;

        let tracing = &self.config.tracing;
        let trace_writer = if !tracing.is_enabled() {
            None
        } else if let Some(path) = &tracing.output_path {
            Some(Arc::new(TraceWriter::new_file(
                path,
                tracing.context_prefix.clone(),
            )?))
        } else {
            Some(Arc::new(TraceWriter::new_memory(
                tracing.max_trace_entries,
                tracing.context_prefix.clone(),
            )))
        };

        let name = self.name.unwrap_or_else(|| "taintscope".to_string());
        debug!(
            %name,
            max_instructions = self.config.limits.max_instructions,
            tracing = trace_writer.is_some(),
            "process created"
        );

        Ok(EmulationProcess {
            name,
            config: Arc::new(self.config),
            host: self.host.unwrap_or_else(|| Arc::new(InMemoryHost::new())),
            abort: self.abort.unwrap_or_default(),
            trace_writer,
            instruction_count: AtomicU64::new(0),
            run_count: AtomicU64::new(0),
        })
    }
}
