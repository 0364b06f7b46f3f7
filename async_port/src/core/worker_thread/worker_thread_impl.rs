// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! [`WorkerThread`] owns one OS thread running a [`ThreadWork`] loop. See the [module
//! docs] for the lifecycle diagram.
//!
//! [module docs]: super

use super::{LivenessState, StopSignal, TerminationGuard, ThreadLiveness, ThreadWork,
            WorkerThreadError};
use crate::{Continuation, ok};
use std::{sync::{Arc, Mutex, mpsc},
          thread::JoinHandle};

/// A named worker thread with a clean start / stop contract.
///
/// - [`start()`] spawns the thread and returns once [`ThreadWork::initialize_work()`]
///   has completed on it. Fails with [`AlreadyRunning`] (changing nothing) if the thread
///   is running.
/// - [`stop()`] requests a stop, [wakes] the work, and joins. It is a no-op when not
///   running.
/// - The thread may be started again after it stops; each incarnation gets a new
///   [generation].
///
/// # Locking
///
/// `lifecycle` is held across the whole of `start()` and `stop()` (including the join),
/// so a concurrent `start()` can never spawn a second thread over a worker that is still
/// running `deinitialize_work()`. Liveness queries use the separate `liveness` slot and
/// never wait on a join.
///
/// Don't call `start()` or `stop()` from inside the work itself (eg from a handler
/// running on this thread). Both detect this before touching `lifecycle`, so they fail
/// fast (with [`AlreadyRunning`] and [`StopFromWorker`]) even while another thread holds
/// it to join the worker.
///
/// [`AlreadyRunning`]: WorkerThreadError::AlreadyRunning
/// [`StopFromWorker`]: WorkerThreadError::StopFromWorker
/// [`start()`]: Self::start
/// [`stop()`]: Self::stop
/// [generation]: ThreadLiveness::generation
/// [wakes]: ThreadWork::wake
#[derive(Debug)]
pub struct WorkerThread<W: ThreadWork> {
    name: Mutex<String>,
    work: Arc<W>,
    lifecycle: Mutex<Option<RunningThread>>,
    liveness: Mutex<Option<Arc<ThreadLiveness>>>,
}

#[derive(Debug)]
struct RunningThread {
    stop_signal: StopSignal,
    join_handle: JoinHandle<()>,
}

impl<W: ThreadWork> WorkerThread<W> {
    pub fn new(name: impl Into<String>, work: W) -> Self {
        Self {
            name: Mutex::new(name.into()),
            work: Arc::new(work),
            lifecycle: Mutex::new(None),
            liveness: Mutex::new(None),
        }
    }

    /// The shared work object. Producer threads use this to reach the state that the
    /// worker loop consumes.
    #[must_use]
    pub fn work(&self) -> &Arc<W> { &self.work }

    /// Sets the name used for the next spawned OS thread (and for log events).
    pub fn set_name(&self, name: impl Into<String>) {
        match self.name.lock() {
            Ok(mut guard) => *guard = name.into(),
            Err(poisoned) => *poisoned.into_inner() = name.into(),
        }
    }

    #[must_use]
    pub fn get_name(&self) -> String {
        match self.name.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    #[must_use]
    pub fn is_running(&self) -> LivenessState {
        self.liveness
            .lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|it| it.is_running()))
            .unwrap_or(LivenessState::Terminated)
    }

    /// The generation of the current (or most recent) incarnation, or `0` if the thread
    /// has never been started. Incarnations are never numbered `0`.
    /// Whether the calling thread is the current incarnation's worker.
    #[must_use]
    pub fn is_current_thread(&self) -> bool {
        self.liveness
            .lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|it| it.is_worker_thread()))
            .unwrap_or(false)
    }

    #[must_use]
    pub fn generation(&self) -> u8 {
        self.liveness
            .lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|it| it.generation))
            .unwrap_or(0)
    }

    /// Spawns the worker thread and blocks until `initialize_work()` has returned on it.
    ///
    /// Returns the generation of the new thread.
    ///
    /// # Errors
    ///
    /// See [`WorkerThreadError`]. On error, nothing is left running.
    pub fn start(&self) -> Result<u8, WorkerThreadError> {
        if self.is_current_thread() {
            let name = self.get_name();
            tracing::error!(thread = %name, "start() called from the worker thread itself");
            return Err(WorkerThreadError::AlreadyRunning { name });
        }

        let mut lifecycle = self
            .lifecycle
            .lock()
            .map_err(|_| WorkerThreadError::MutexPoisoned { which: "lifecycle" })?;

        let name = self.get_name();

        if self.is_running() == LivenessState::Running {
            tracing::debug!(thread = %name, "start() ignored, worker thread already running");
            return Err(WorkerThreadError::AlreadyRunning { name });
        }

        // The previous incarnation exited on its own (Continuation::Stop or a panic).
        // Reap it before spawning a new one.
        if let Some(stale) = lifecycle.take() {
            drop(stale.join_handle.join());
        }

        let stop_signal = StopSignal::new();
        let liveness = Arc::new(ThreadLiveness::new());
        let generation = liveness.generation;
        let (started_tx, started_rx) = mpsc::channel::<()>();

        // Published before spawning, so the worker can recognize itself from inside
        // initialize_work().
        self.set_liveness(Some(Arc::clone(&liveness)));

        let spawn_result = std::thread::Builder::new()
            .name(format!("{name}-gen-{generation}"))
            .spawn({
                let work = Arc::clone(&self.work);
                let stop_signal = stop_signal.clone();
                let liveness = Arc::clone(&liveness);
                let name = name.clone();
                move || run_work_loop(&name, &work, &stop_signal, liveness, &started_tx)
            });
        let join_handle = match spawn_result {
            Ok(join_handle) => join_handle,
            Err(err) => {
                liveness.mark_terminated();
                return Err(WorkerThreadError::ThreadSpawn(err));
            }
        };

        // The sender is dropped without sending if initialize_work() unwinds.
        if started_rx.recv().is_err() {
            drop(join_handle.join());
            tracing::error!(thread = %name, generation, "worker thread died during start-up");
            return Err(WorkerThreadError::StartupFailed { name });
        }

        tracing::debug!(thread = %name, generation, "worker thread started");
        lifecycle.replace(RunningThread {
            stop_signal,
            join_handle,
        });

        ok!(generation)
    }

    /// Requests a stop, wakes the work, and blocks until the worker has run
    /// `deinitialize_work()` and exited. No-op if the thread was never started or has
    /// already been stopped.
    ///
    /// # Errors
    ///
    /// - [`WorkerThreadError::WorkerPanicked`] if the thread panicked at any point.
    /// - [`WorkerThreadError::StopFromWorker`] if called on the worker thread itself.
    /// - [`WorkerThreadError::MutexPoisoned`] if the lifecycle lock is poisoned.
    pub fn stop(&self) -> Result<(), WorkerThreadError> {
        if self.is_current_thread() {
            let name = self.get_name();
            tracing::error!(thread = %name, "stop() called from the worker thread itself");
            return Err(WorkerThreadError::StopFromWorker { name });
        }

        let mut lifecycle = self
            .lifecycle
            .lock()
            .map_err(|_| WorkerThreadError::MutexPoisoned { which: "lifecycle" })?;

        let name = self.get_name();

        let Some(running) = lifecycle.take() else {
            return ok!();
        };

        running.stop_signal.request_stop();
        self.work.wake();

        let result = running.join_handle.join();
        tracing::debug!(thread = %name, "worker thread joined");

        match result {
            Ok(()) => ok!(),
            Err(_) => {
                tracing::error!(thread = %name, "worker thread had panicked");
                Err(WorkerThreadError::WorkerPanicked { name })
            }
        }
    }

    fn set_liveness(&self, liveness: Option<Arc<ThreadLiveness>>) {
        match self.liveness.lock() {
            Ok(mut guard) => *guard = liveness,
            Err(poisoned) => *poisoned.into_inner() = liveness,
        }
    }
}

impl<W: ThreadWork> Drop for WorkerThread<W> {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            tracing::error!(?err, "failed to stop worker thread on drop");
        }
    }
}

/// Body of the spawned thread.
///
/// [`TerminationGuard`] is created before any work runs, so it drops after
/// `deinitialize_work()` (or during unwinding).
fn run_work_loop<W: ThreadWork>(
    name: &str,
    work: &Arc<W>,
    stop_signal: &StopSignal,
    liveness: Arc<ThreadLiveness>,
    started_tx: &mpsc::Sender<()>,
) {
    let span =
        tracing::info_span!("worker_thread", thread = %name, generation = liveness.generation);
    let _entered = span.enter();
    liveness.mark_worker_thread();
    let _guard = TerminationGuard::new(liveness);

    work.initialize_work();
    drop(started_tx.send(()));

    while !stop_signal.is_requested() {
        if work.do_work(stop_signal) == Continuation::Stop {
            tracing::debug!("work returned Continuation::Stop");
            break;
        }
    }

    work.deinitialize_work();
    // _guard dropped here (or during unwinding), calling mark_terminated().
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use std::{sync::atomic::{AtomicBool, AtomicUsize, Ordering},
              time::Duration};

    /// Counts lifecycle calls. `do_work` sleeps briefly so the loop doesn't spin hot.
    #[derive(Debug, Default)]
    struct CountingWork {
        initialize_count: AtomicUsize,
        do_work_count: AtomicUsize,
        deinitialize_count: AtomicUsize,
        wake_count: AtomicUsize,
        stop_after: Option<usize>,
        panic_in_initialize: bool,
        panic_in_do_work: AtomicBool,
    }

    impl ThreadWork for CountingWork {
        fn initialize_work(&self) {
            assert!(!self.panic_in_initialize, "deliberate panic in initialize_work");
            self.initialize_count.fetch_add(1, Ordering::SeqCst);
        }

        fn do_work(&self, _stop_signal: &StopSignal) -> Continuation {
            assert!(
                !self.panic_in_do_work.load(Ordering::SeqCst),
                "deliberate panic in do_work"
            );
            let count = self.do_work_count.fetch_add(1, Ordering::SeqCst) + 1;
            std::thread::sleep(Duration::from_millis(1));
            match self.stop_after {
                Some(limit) if count >= limit => Continuation::Stop,
                _ => Continuation::Continue,
            }
        }

        fn deinitialize_work(&self) {
            self.deinitialize_count.fetch_add(1, Ordering::SeqCst);
        }

        fn wake(&self) { self.wake_count.fetch_add(1, Ordering::SeqCst); }
    }

    fn wait_until(mut condition: impl FnMut() -> bool) {
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while !condition() {
            assert!(std::time::Instant::now() < deadline, "timed out waiting");
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_start_stop_runs_lifecycle_in_order() {
        let thread = WorkerThread::new("test-worker", CountingWork::default());
        assert_eq!(thread.is_running(), LivenessState::Terminated);

        thread.start().unwrap();
        assert_eq!(thread.is_running(), LivenessState::Running);
        // start() returns only after initialize_work() ran.
        assert_eq!(thread.work().initialize_count.load(Ordering::SeqCst), 1);

        wait_until(|| thread.work().do_work_count.load(Ordering::SeqCst) > 2);

        thread.stop().unwrap();
        assert_eq!(thread.is_running(), LivenessState::Terminated);
        assert_eq!(thread.work().initialize_count.load(Ordering::SeqCst), 1);
        assert_eq!(thread.work().deinitialize_count.load(Ordering::SeqCst), 1);
        assert_eq!(thread.work().wake_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_start_twice_is_rejected_and_changes_nothing() {
        let thread = WorkerThread::new("test-worker", CountingWork::default());
        let generation = thread.start().unwrap();

        let result = thread.start();
        assert!(matches!(
            result,
            Err(WorkerThreadError::AlreadyRunning { .. })
        ));
        assert_eq!(thread.generation(), generation);
        assert_eq!(thread.work().initialize_count.load(Ordering::SeqCst), 1);

        thread.stop().unwrap();
    }

    #[test]
    fn test_stop_when_not_running_is_noop() {
        let thread = WorkerThread::new("test-worker", CountingWork::default());
        thread.stop().unwrap();
        thread.stop().unwrap();
        assert_eq!(thread.work().deinitialize_count.load(Ordering::SeqCst), 0);
        assert_eq!(thread.work().wake_count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_name_is_readable_while_running() {
        let thread = WorkerThread::new("first", CountingWork::default());
        thread.start().unwrap();
        assert_eq!(thread.get_name(), "first");
        thread.set_name("second");
        assert_eq!(thread.get_name(), "second");
        thread.stop().unwrap();
    }

    #[test]
    #[serial]
    fn test_restart_gets_new_generation() {
        let thread = WorkerThread::new("test-worker", CountingWork::default());
        let first = thread.start().unwrap();
        thread.stop().unwrap();
        let second = thread.start().unwrap();
        assert_ne!(first, second);
        assert_eq!(thread.generation(), second);
        thread.stop().unwrap();
        assert_eq!(thread.work().initialize_count.load(Ordering::SeqCst), 2);
        assert_eq!(thread.work().deinitialize_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_work_can_stop_itself() {
        let work = CountingWork {
            stop_after: Some(3),
            ..Default::default()
        };
        let thread = WorkerThread::new("test-worker", work);
        thread.start().unwrap();

        wait_until(|| thread.is_running() == LivenessState::Terminated);
        assert_eq!(thread.work().do_work_count.load(Ordering::SeqCst), 3);
        assert_eq!(thread.work().deinitialize_count.load(Ordering::SeqCst), 1);

        // Stopping an already exited thread just reaps it.
        thread.stop().unwrap();
        // And it can be started again.
        thread.start().unwrap();
        thread.stop().unwrap();
    }

    #[test]
    fn test_panic_in_initialize_fails_start() {
        let work = CountingWork {
            panic_in_initialize: true,
            ..Default::default()
        };
        let thread = WorkerThread::new("test-worker", work);
        let result = thread.start();
        assert!(matches!(result, Err(WorkerThreadError::StartupFailed { .. })));
        assert_eq!(thread.is_running(), LivenessState::Terminated);
        // Nothing left to stop.
        thread.stop().unwrap();
    }

    #[test]
    fn test_panic_in_do_work_is_fatal_and_reported_on_stop() {
        let thread = WorkerThread::new("test-worker", CountingWork::default());
        thread.start().unwrap();
        thread.work().panic_in_do_work.store(true, Ordering::SeqCst);

        wait_until(|| thread.is_running() == LivenessState::Terminated);
        // deinitialize_work() is skipped when the loop unwinds.
        assert_eq!(thread.work().deinitialize_count.load(Ordering::SeqCst), 0);

        let result = thread.stop();
        assert!(matches!(
            result,
            Err(WorkerThreadError::WorkerPanicked { .. })
        ));
    }

    #[test]
    fn test_drop_stops_running_thread() {
        let shared_work;
        {
            let thread = WorkerThread::new("test-worker", CountingWork::default());
            thread.start().unwrap();
            shared_work = Arc::clone(thread.work());
        }
        assert_eq!(shared_work.deinitialize_count.load(Ordering::SeqCst), 1);
    }
}
