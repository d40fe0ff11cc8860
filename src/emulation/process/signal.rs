//! Cooperative cancellation.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Shared flag that asks running executions to stop.
///
/// Cloning yields a handle to the same flag, so a controller thread can keep one clone and
/// raise it while the interpreter polls another. The interpreter only checks the flag at the
/// points chosen by [`CancellationGranularity`](crate::emulation::CancellationGranularity); a
/// raised flag terminates the running frame and all its ancestors with
/// [`FrameStatus::Aborted`](crate::emulation::FrameStatus::Aborted).
///
/// # Examples
///
/// ```rust
/// use taintscope::emulation::AbortSignal;
///
/// let signal = AbortSignal::new();
/// let handle = signal.clone();
/// std::thread::spawn(move || handle.abort()).join().unwrap();
/// assert!(signal.is_aborted());
/// ```
#[derive(Clone, Debug, Default)]
pub struct AbortSignal {
    flag: Arc<AtomicBool>,
}

impl AbortSignal {
    /// Creates a lowered signal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the signal.
    pub fn abort(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Returns `true` once the signal has been raised.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Lowers the signal so the process can run again.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::Release);
    }
}
