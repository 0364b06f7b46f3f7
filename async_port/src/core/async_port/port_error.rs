// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::{HandlerId, MessageId, WorkerThreadError};

/// Errors returned by [`AsyncPort`] and the handler bookkeeping behind it.
///
/// Everything except [`Thread`] and [`MutexPoisoned`] is a usage error: a defect in
/// the calling code. Usage errors are returned right away, logged at `error` level, and
/// leave the port exactly as it was.
///
/// [`AsyncPort`]: crate::AsyncPort
/// [`MutexPoisoned`]: Self::MutexPoisoned
/// [`Thread`]: Self::Thread
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum PortError {
    #[error("No handler thread is set on this port")]
    #[diagnostic(
        code(r3bl_async_port::port::no_handler_thread),
        help("Call set_handler_thread(), or build the port with AsyncPort::with_config().")
    )]
    NoHandlerThread,

    #[error("Port is not open")]
    #[diagnostic(
        code(r3bl_async_port::port::not_open),
        help("Call open() before send() or cancel().")
    )]
    NotOpen,

    #[error("Port is already open")]
    #[diagnostic(
        code(r3bl_async_port::port::already_open),
        help("Call close() first.")
    )]
    AlreadyOpen,

    #[error("Handler {id} is not attached to this port")]
    #[diagnostic(
        code(r3bl_async_port::port::handler_not_attached),
        help("It was already detached, or it belongs to another port.")
    )]
    HandlerNotAttached { id: HandlerId },

    #[error("Message {id} was already handled")]
    #[diagnostic(
        code(r3bl_async_port::port::already_handled),
        help("A message is dispatched at most once. Create a new one to send again.")
    )]
    AlreadyHandled { id: MessageId },

    #[error("Port internal mutex poisoned ({which})")]
    #[diagnostic(
        code(r3bl_async_port::port::mutex_poisoned),
        help("A prior thread panicked while holding this lock.")
    )]
    MutexPoisoned {
        /// Which mutex was poisoned (`"handler_thread"` or `"lifecycle"`).
        which: &'static str,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Thread(#[from] WorkerThreadError),
}
