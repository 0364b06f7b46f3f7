// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::{DeferredWaker, HandlerList, LockedHandlers, SharedMessage};
use std::{fmt::{Debug, Formatter},
          sync::{Mutex, MutexGuard, PoisonError}};

/// State and helpers shared by every [`HandlerThread`] strategy: the handler list and
/// the messages handlers have [deferred].
///
/// All methods except the handler-list accessors are meant to be called from the
/// worker thread.
///
/// A strategy whose worker can sleep indefinitely must build this with
/// [`with_deferred_waker()`], otherwise a deferred message resolved while the worker
/// sleeps is only finalized on its next unrelated wake.
///
/// [`HandlerThread`]: super::HandlerThread
/// [`with_deferred_waker()`]: Self::with_deferred_waker
/// [deferred]: crate::Message::defer
#[derive(Default)]
pub struct HandlerThreadCore {
    handlers: HandlerList,
    deferred: Mutex<Vec<SharedMessage>>,
    deferred_waker: Option<DeferredWaker>,
}

impl Debug for HandlerThreadCore {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerThreadCore")
            .field("handlers", &self.handlers)
            .field("deferred", &self.deferred_count())
            .field("has_deferred_waker", &self.deferred_waker.is_some())
            .finish()
    }
}

impl HandlerThreadCore {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// `waker` is handed to every message parked by [`Message::defer()`], and runs when
    /// that message's deferred work is resolved.
    ///
    /// [`Message::defer()`]: crate::Message::defer
    #[must_use]
    pub fn with_deferred_waker(waker: DeferredWaker) -> Self {
        Self {
            deferred_waker: Some(waker),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn handlers(&self) -> &HandlerList { &self.handlers }

    pub fn open_message_handlers(&self) { self.handlers.open_all(); }

    pub fn close_message_handlers(&self) { self.handlers.close_all(); }

    /// One cycle of the loop: open handlers attached since the last cycle, dispatch
    /// `batch` in FIFO order, then call `update()` on every handler, all under a single
    /// handler-list lock. Then finalize any deferred messages that were resolved in the
    /// meantime.
    ///
    /// Runs the `update()` pass even when `batch` is empty.
    pub fn dispatch_cycle(&self, batch: impl IntoIterator<Item = SharedMessage>) {
        {
            let mut handlers = self.handlers.lock();
            self.dispatch_locked(&mut handlers, batch);
            handlers.update_all();
        }
        self.finalize_resolved_deferred();
    }

    /// Dispatches `batch` without the `update()` pass. Used to drain leftovers at
    /// shutdown.
    pub fn dispatch_batch(&self, batch: impl IntoIterator<Item = SharedMessage>) {
        let mut handlers = self.handlers.lock();
        self.dispatch_locked(&mut handlers, batch);
    }

    /// Marks handled every parked message whose deferred work has been resolved.
    /// Returns how many were finalized.
    pub fn finalize_resolved_deferred(&self) -> usize {
        let resolved: Vec<SharedMessage> = {
            let mut deferred = self.lock_deferred();
            if deferred.is_empty() {
                return 0;
            }
            let (resolved, still_waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut *deferred)
                .into_iter()
                .partition(|it| it.is_deferred_handled());
            *deferred = still_waiting;
            resolved
        };

        for message in &resolved {
            message.mark_handled();
            tracing::debug!(message_id = %message.id(), "deferred message finalized");
        }
        resolved.len()
    }

    /// Shutdown: finalize deferred messages that were resolved, then discard the rest.
    /// Returns how many were discarded.
    pub fn clear_deferred_messages(&self) -> usize {
        self.finalize_resolved_deferred();
        let discarded = std::mem::take(&mut *self.lock_deferred());
        if !discarded.is_empty() {
            tracing::warn!(
                count = discarded.len(),
                "discarding deferred messages that were never resolved"
            );
        }
        discarded.len()
    }

    #[must_use]
    pub fn deferred_count(&self) -> usize { self.lock_deferred().len() }

    fn dispatch_locked(
        &self,
        handlers: &mut LockedHandlers<'_>,
        batch: impl IntoIterator<Item = SharedMessage>,
    ) {
        let opened = handlers.open_all();
        if opened > 0 {
            tracing::debug!(count = opened, "opened late-attached handlers");
        }
        for message in batch {
            let report = handlers.dispatch(&message);
            tracing::debug!(
                message_id = %message.id(),
                delivered = report.delivered,
                failed = report.failed,
                "message dispatched"
            );
            if message.is_deferred() && message.park(self.deferred_waker.clone()) {
                self.lock_deferred().push(message);
            } else {
                message.mark_handled();
            }
        }
    }

    fn lock_deferred(&self) -> MutexGuard<'_, Vec<SharedMessage>> {
        self.deferred.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
