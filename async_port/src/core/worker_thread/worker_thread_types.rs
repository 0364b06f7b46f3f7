// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// cspell:words taskthreads

//! Errors from the [`WorkerThread`] lifecycle. See [`WorkerThreadError`].
//!
//! [`WorkerThread`]: super::WorkerThread

/// Errors from [`WorkerThread::start()`] and [`WorkerThread::stop()`].
///
/// | Variant                | Cause                                                   | Recoverable? |
/// | :--------------------- | :------------------------------------------------------ | :----------- |
/// | [`AlreadyRunning`]     | `start()` called twice without an intervening `stop()`  | Yes (no-op)  |
/// | [`ThreadSpawn`]        | [`std::thread::Builder::spawn()`] failed                | Maybe        |
/// | [`StartupFailed`]      | The worker died before `initialize_work()` returned     | No           |
/// | [`WorkerPanicked`]     | The worker thread panicked; reported when joined        | No           |
/// | [`StopFromWorker`]     | `stop()` called on the worker thread itself             | Yes (no-op)  |
/// | [`MutexPoisoned`]      | A prior thread panicked while holding a lifecycle lock  | No           |
///
/// [`AlreadyRunning`]: Self::AlreadyRunning
/// [`MutexPoisoned`]: Self::MutexPoisoned
/// [`StartupFailed`]: Self::StartupFailed
/// [`StopFromWorker`]: Self::StopFromWorker
/// [`ThreadSpawn`]: Self::ThreadSpawn
/// [`WorkerPanicked`]: Self::WorkerPanicked
/// [`WorkerThread::start()`]: super::WorkerThread::start
/// [`WorkerThread::stop()`]: super::WorkerThread::stop
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum WorkerThreadError {
    #[error("Worker thread '{name}' is already running")]
    #[diagnostic(
        code(r3bl_async_port::worker_thread::already_running),
        help("Call stop() before calling start() again.")
    )]
    AlreadyRunning { name: String },

    #[error("Failed to spawn worker thread")]
    #[diagnostic(code(r3bl_async_port::worker_thread::thread_spawn))]
    #[cfg_attr(
        target_os = "linux",
        diagnostic(help(
            "The system may have reached its thread limit - \
             check `ulimit -u` for per-user limit, \
             `cat /proc/sys/kernel/threads-max` for system-wide limit"
        ))
    )]
    #[cfg_attr(
        target_os = "macos",
        diagnostic(help(
            "The system may have reached its thread limit - \
             check `ulimit -u` for per-user limit, \
             `sysctl kern.num_taskthreads` for per-process limit"
        ))
    )]
    ThreadSpawn(#[source] std::io::Error),

    #[error("Worker thread '{name}' exited before it finished initializing")]
    #[diagnostic(
        code(r3bl_async_port::worker_thread::startup_failed),
        help("initialize_work() (eg a Handler::open() hook) panicked.")
    )]
    StartupFailed { name: String },

    #[error("Worker thread '{name}' panicked")]
    #[diagnostic(
        code(r3bl_async_port::worker_thread::panicked),
        help(
            "A handler or the work loop panicked. The thread is gone; \
             a supervisor may start it again."
        )
    )]
    WorkerPanicked { name: String },

    #[error("Worker thread '{name}' can't stop itself")]
    #[diagnostic(
        code(r3bl_async_port::worker_thread::stop_from_worker),
        help("Joining the current thread would deadlock. Stop it from another thread.")
    )]
    StopFromWorker { name: String },

    #[error("Worker thread internal mutex poisoned ({which})")]
    #[diagnostic(
        code(r3bl_async_port::worker_thread::mutex_poisoned),
        help("A prior thread panicked while holding this lock.")
    )]
    MutexPoisoned {
        /// Which mutex was poisoned (`"name"` or `"lifecycle"`).
        which: &'static str,
    },
}
