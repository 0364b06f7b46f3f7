// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! [RAII] guard that marks the worker thread terminated on exit. See
//! [`TerminationGuard`].
//!
//! [RAII]: https://en.wikipedia.org/wiki/Resource_acquisition_is_initialization

use super::ThreadLiveness;
use std::sync::Arc;

/// [RAII] guard that calls [`mark_terminated()`] when the work loop exits.
///
/// It is the first local in the worker's stack frame, so it drops last: after
/// `deinitialize_work()` has returned on a normal exit, or during unwinding if any of
/// the work functions panicked. Either way [`WorkerThread::is_running()`] stops
/// reporting [`Running`] for a thread that no longer exists.
///
/// [RAII]: https://en.wikipedia.org/wiki/Resource_acquisition_is_initialization
/// [`Running`]: super::LivenessState::Running
/// [`WorkerThread::is_running()`]: super::WorkerThread::is_running
/// [`mark_terminated()`]: super::ThreadLiveness::mark_terminated
#[derive(Debug)]
pub struct TerminationGuard {
    liveness: Arc<ThreadLiveness>,
}

impl TerminationGuard {
    #[must_use]
    pub fn new(liveness: Arc<ThreadLiveness>) -> Self { Self { liveness } }
}

impl Drop for TerminationGuard {
    fn drop(&mut self) {
        if std::thread::panicking() {
            tracing::error!(
                generation = self.liveness.generation,
                "worker thread is unwinding from a panic"
            );
        }
        self.liveness.mark_terminated();
    }
}
