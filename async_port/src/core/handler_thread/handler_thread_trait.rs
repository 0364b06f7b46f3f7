// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use super::HandlerThreadCore;
use crate::{CancelOutcome, Handler, HandlerId, LivenessState, Message, PortError,
            SharedMessage, WorkerThreadError};

/// A dedicated worker thread that dispatches messages to attached handlers.
///
/// Implementors supply the queueing strategy ([`add_message()`], [`cancel_message()`])
/// and the thread lifecycle. Handler bookkeeping comes for free from the provided
/// methods, which route through [`core()`].
///
/// # Trait Bounds - [`Send`] + [`Sync`]
///
/// An [`AsyncPort`] holds its handler thread in an [`Arc`] and every producer thread
/// calls into it concurrently.
///
/// [`AsyncPort`]: crate::AsyncPort
/// [`Arc`]: std::sync::Arc
/// [`add_message()`]: Self::add_message
/// [`cancel_message()`]: Self::cancel_message
/// [`core()`]: Self::core
pub trait HandlerThread: Send + Sync {
    fn core(&self) -> &HandlerThreadCore;

    /// Queues `message` for dispatch and wakes the worker. Never blocks on dispatch.
    fn add_message(&self, message: SharedMessage);

    /// Removes `message` (compared by identity) if it is still queued.
    fn cancel_message(&self, message: &SharedMessage) -> CancelOutcome;

    /// Spawns the worker. Returns once every handler's `open()` has run.
    ///
    /// # Errors
    ///
    /// See [`WorkerThreadError`].
    fn start(&self) -> Result<(), WorkerThreadError>;

    /// Stops and joins the worker. Returns once every handler's `close()` has run.
    ///
    /// # Errors
    ///
    /// See [`WorkerThreadError`].
    fn stop(&self) -> Result<(), WorkerThreadError>;

    fn is_running(&self) -> LivenessState;

    /// Whether the calling thread is this handler thread's worker, ie the caller is
    /// running inside a handler hook. Must not block on the lifecycle.
    fn is_worker_thread(&self) -> bool;

    fn name(&self) -> String;

    fn attach_handler(&self, handler: Box<dyn Handler>) -> HandlerId {
        self.core().handlers().attach(handler)
    }

    /// # Errors
    ///
    /// [`PortError::HandlerNotAttached`] if `id` isn't attached to this thread.
    fn detach_handler(&self, id: HandlerId) -> Result<Box<dyn Handler>, PortError> {
        self.core().handlers().detach(id)
    }

    fn detach_all_handlers(&self) -> Vec<Box<dyn Handler>> {
        self.core().handlers().detach_all()
    }

    fn handler_count(&self) -> usize { self.core().handlers().len() }

    /// Blocks the calling thread until `message` has been handled. See
    /// [`Message::wait_handled()`] for the blocked-forever hazard.
    fn wait_for_message(&self, message: &Message) { message.wait_handled(); }
}
