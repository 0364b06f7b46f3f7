// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The worker side of a port: a [`HandlerThread`] owns the attached handlers and runs
//! the dispatch loop on its own [`WorkerThread`].
//!
//! The dispatch skeleton is shared by composition: every strategy embeds a
//! [`HandlerThreadCore`] and the trait's provided methods route handler bookkeeping
//! through it. The queueing strategy is what varies. [`BlockingHandlerThread`] is the
//! mutex + condition variable one.
//!
//! ```text
//! producer threads                       worker thread
//! ────────────────                       ─────────────
//! add_message(m) ──► [pending FIFO] ──┐  initialize_work: open() every handler
//! cancel_message(m) ─► remove if     │  loop {
//!                      still queued   └─►  wait (non-empty | timeout | stop)
//!                                          batch = take(pending)
//!                                          lock handlers {
//!                                            for m in batch: handle(m) × handlers
//!                                                            mark handled / park
//!                                            update() × handlers
//!                                          }
//!                                          finalize resolved deferred
//!                                        }
//!                                        deinitialize_work: drain|discard pending,
//!                                          clear deferred, close() every handler
//! ```
//!
//! [`WorkerThread`]: crate::WorkerThread

// Attach.
mod blocking_handler_thread;
mod handler_thread_core;
mod handler_thread_trait;

#[cfg(test)]
mod tests;

// Re-export.
pub use blocking_handler_thread::*;
pub use handler_thread_core::*;
pub use handler_thread_trait::*;
