// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Running flag and incarnation number of one worker thread.
//!
//! The flag is an [`AtomicBool`] because [`WorkerThread::start()`] reads it while
//! holding its lifecycle lock, and the worker clears it from [`TerminationGuard`]
//! without taking any lock at all.
//!
//! [`AtomicBool`]: std::sync::atomic::AtomicBool
//! [`TerminationGuard`]: super::TerminationGuard
//! [`WorkerThread::start()`]: super::WorkerThread::start

use std::{sync::{OnceLock,
                 atomic::{AtomicBool, AtomicU8, Ordering}},
          thread::ThreadId};

/// Process-wide generation counter, bumped once per spawned worker. `0` is reserved for
/// "never started", so it wraps from `u8::MAX` to `1`.
static THREAD_GENERATION: AtomicU8 = AtomicU8::new(0);

fn generation_after(generation: u8) -> u8 { generation.checked_add(1).unwrap_or(1) }

fn next_generation() -> u8 {
    let previous = THREAD_GENERATION
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |it| {
            Some(generation_after(it))
        })
        .unwrap_or_else(|it| it);
    generation_after(previous)
}

/// Shared between a [`WorkerThread`] and the thread it spawned. A new one is made for
/// every `start()`, so a handle to a stale incarnation never reports the new one as
/// running.
///
/// [`WorkerThread`]: super::WorkerThread
#[derive(Debug)]
pub struct ThreadLiveness {
    pub is_running: AtomicBool,
    /// Distinguishes a reopened port's worker from the previous one. Never `0`.
    pub generation: u8,
    worker: OnceLock<ThreadId>,
}

impl ThreadLiveness {
    #[must_use]
    pub fn new() -> Self {
        Self {
            is_running: AtomicBool::new(true),
            generation: next_generation(),
            worker: OnceLock::new(),
        }
    }

    /// Records the calling thread as the worker. Runs first thing on the spawned thread.
    pub fn mark_worker_thread(&self) { drop(self.worker.set(std::thread::current().id())); }

    /// Whether the calling thread is this incarnation's worker. Lock free, so it is safe
    /// to ask while another thread is joining the worker.
    #[must_use]
    pub fn is_worker_thread(&self) -> bool {
        self.worker
            .get()
            .is_some_and(|id| *id == std::thread::current().id())
    }

    /// Runs on the worker thread as it exits, whether normally or by unwinding.
    pub fn mark_terminated(&self) { self.is_running.store(false, Ordering::SeqCst); }

    #[must_use]
    pub fn is_running(&self) -> LivenessState {
        if self.is_running.load(Ordering::SeqCst) {
            LivenessState::Running
        } else {
            LivenessState::Terminated
        }
    }
}

impl Default for ThreadLiveness {
    fn default() -> Self { Self::new() }
}

/// Reported by [`WorkerThread::is_running()`] and [`HandlerThread::is_running()`].
///
/// [`HandlerThread::is_running()`]: crate::HandlerThread::is_running
/// [`WorkerThread::is_running()`]: super::WorkerThread::is_running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessState {
    /// The worker thread is running `initialize_work` / `do_work` / `deinitialize_work`.
    Running,
    /// The worker thread has exited or was never started.
    Terminated,
}
