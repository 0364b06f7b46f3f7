// Copyright (c) 2023-2025 R3BL LLC. Licensed under Apache License, Version 2.0.

/// Control flow signal for the worker loop.
///
/// Returned by [`ThreadWork::do_work()`] after each iteration. The [`WorkerThread`]
/// keeps calling `do_work()` while this is [`Continue`] and no stop has been requested.
///
/// [`Continue`]: Self::Continue
/// [`ThreadWork::do_work()`]: crate::ThreadWork::do_work
/// [`WorkerThread`]: crate::WorkerThread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Continuation {
    /// Continue to the next iteration.
    #[default]
    Continue,

    /// Stop processing and exit the loop/thread.
    Stop,
}

/// Outcome of a single [`Handler::handle()`] call.
///
/// Handlers return a plain `bool` (it is the contract external collaborators implement);
/// the dispatch loop converts it into this type so that failure accounting reads like
/// what it means.
///
/// [`Handler::handle()`]: crate::Handler::handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleOutcome {
    Handled,
    Failed,
}

impl From<bool> for HandleOutcome {
    fn from(value: bool) -> Self {
        if value {
            HandleOutcome::Handled
        } else {
            HandleOutcome::Failed
        }
    }
}

/// Result of [`AsyncPort::cancel()`] / [`HandlerThread::cancel_message()`].
///
/// Cancellation is best effort. It only succeeds while the message is still sitting in
/// the pending queue; once the worker has swapped it into a dispatch batch, it is too
/// late and the result is [`NotPending`].
///
/// [`AsyncPort::cancel()`]: crate::AsyncPort::cancel
/// [`HandlerThread::cancel_message()`]: crate::HandlerThread::cancel_message
/// [`NotPending`]: Self::NotPending
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The message was removed from the queue and will never be delivered.
    Cancelled,
    /// The message was not in the queue (already dispatched, never sent, or already
    /// cancelled).
    NotPending,
}
