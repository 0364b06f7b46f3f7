// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The dependency-injection seam of [`WorkerThread`]: the [`ThreadWork`] trait and the
//! [`StopSignal`] it observes.
//!
//! [`WorkerThread`]: super::WorkerThread

use crate::Continuation;
use std::sync::{Arc,
                atomic::{AtomicBool, Ordering}};

/// Work that runs on a [`WorkerThread`]'s dedicated OS thread.
///
/// The framework calls [`initialize_work()`] once, then [`do_work()`] repeatedly until a
/// stop has been requested or it returns [`Continuation::Stop`], then
/// [`deinitialize_work()`] once.
///
/// # Trait Bounds - [`Send`] + [`Sync`] + `'static`
///
/// Unlike a worker that is moved into its thread and owned there, a [`ThreadWork`] is
/// shared via [`Arc`]: the worker thread runs the loop while producer threads call into
/// the same object (eg to enqueue messages). Hence [`Sync`].
///
/// # Waking
///
/// If [`do_work()`] blocks (on a condition variable, a socket, ...) then
/// [`WorkerThread::stop()`] would wait forever unless something interrupts it.
/// [`wake()`] is called right after the stop flag is set; implement it to unblock
/// whatever [`do_work()`] waits on. It must be idempotent.
///
/// [`Arc`]: std::sync::Arc
/// [`WorkerThread::stop()`]: super::WorkerThread::stop
/// [`WorkerThread`]: super::WorkerThread
/// [`deinitialize_work()`]: Self::deinitialize_work
/// [`do_work()`]: Self::do_work
/// [`initialize_work()`]: Self::initialize_work
/// [`wake()`]: Self::wake
pub trait ThreadWork: Send + Sync + 'static {
    /// Runs once on the worker thread before the first [`do_work()`].
    ///
    /// [`do_work()`]: Self::do_work
    fn initialize_work(&self) {}

    /// One iteration of the work loop. Check [`StopSignal::is_requested()`] before (or
    /// while) blocking to return promptly on shutdown.
    fn do_work(&self, stop_signal: &StopSignal) -> Continuation;

    /// Runs once on the worker thread after the last [`do_work()`].
    ///
    /// [`do_work()`]: Self::do_work
    fn deinitialize_work(&self) {}

    /// Unblocks a [`do_work()`] that is waiting. Called from the thread that requested
    /// the stop.
    ///
    /// [`do_work()`]: Self::do_work
    fn wake(&self) {}
}

/// Stop-requested flag shared between the thread calling [`WorkerThread::stop()`] and
/// the worker loop.
///
/// [`WorkerThread::stop()`]: super::WorkerThread::stop
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    inner: Arc<AtomicBool>,
}

impl StopSignal {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    pub fn request_stop(&self) { self.inner.store(true, Ordering::SeqCst); }

    #[must_use]
    pub fn is_requested(&self) -> bool { self.inner.load(Ordering::SeqCst) }
}
