// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use super::{Handler, HandlerId};
use crate::{HandleOutcome, Message, PortError};
use std::{fmt::{Debug, Formatter},
          sync::{Mutex, MutexGuard, PoisonError}};

/// Result of delivering one message to every attached handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
}

struct AttachedHandler {
    id: HandlerId,
    handler: Box<dyn Handler>,
    /// Between this handler's `open()` and `close()`.
    is_open: bool,
}

impl AttachedHandler {
    fn close(&mut self) {
        if self.is_open {
            self.handler.close();
            self.is_open = false;
        }
    }
}

/// The handlers attached to one handler thread, in attachment order.
///
/// One mutex guards the whole list. It is held for each attach and detach, and by the
/// worker for the full length of a dispatch cycle (see [`lock()`]). So a handler can't
/// be detached halfway through a batch, and no hook ever runs concurrently with another
/// hook on the same handler.
///
/// A panic inside a handler poisons the mutex (and kills the worker). The list itself
/// stays structurally valid, so it is recovered rather than reported, which lets a
/// supervisor restart the port with the same handlers.
///
/// [`lock()`]: Self::lock
#[derive(Default)]
pub struct HandlerList {
    handlers: Mutex<Vec<AttachedHandler>>,
}

impl Debug for HandlerList {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerList")
            .field("ids", &self.ids())
            .finish()
    }
}

impl HandlerList {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Runs [`Handler::on_attach()`] on the calling thread, then appends the handler.
    pub fn attach(&self, mut handler: Box<dyn Handler>) -> HandlerId {
        let id = HandlerId::new();
        let mut handlers = self.lock_inner();
        handler.on_attach();
        handlers.push(AttachedHandler {
            id,
            handler,
            is_open: false,
        });
        tracing::debug!(%id, count = handlers.len(), "handler attached");
        id
    }

    /// Removes the handler, runs [`Handler::on_detach()`] on the calling thread, and
    /// hands the handler back. A handler that was opened is closed first, on the same
    /// thread, so its `open()` / `close()` calls always pair up.
    ///
    /// # Errors
    ///
    /// [`PortError::HandlerNotAttached`] if `id` isn't in this list.
    pub fn detach(&self, id: HandlerId) -> Result<Box<dyn Handler>, PortError> {
        let mut handlers = self.lock_inner();
        let Some(index) = handlers.iter().position(|it| it.id == id) else {
            return Err(PortError::HandlerNotAttached { id });
        };
        let mut attached = handlers.remove(index);
        attached.close();
        let mut handler = attached.handler;
        handler.on_detach();
        tracing::debug!(%id, count = handlers.len(), "handler detached");
        Ok(handler)
    }

    /// Detaches every handler, in attachment order.
    pub fn detach_all(&self) -> Vec<Box<dyn Handler>> {
        self.lock_inner()
            .drain(..)
            .map(|mut attached| {
                attached.close();
                attached.handler.on_detach();
                tracing::debug!(id = %attached.id, "handler detached");
                attached.handler
            })
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize { self.lock_inner().len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    #[must_use]
    pub fn ids(&self) -> Vec<HandlerId> { self.lock_inner().iter().map(|it| it.id).collect() }

    /// Locks the list for a sequence of worker-side calls.
    pub fn lock(&self) -> LockedHandlers<'_> { LockedHandlers(self.lock_inner()) }

    pub fn open_all(&self) -> usize { self.lock().open_all() }

    pub fn close_all(&self) { self.lock().close_all(); }

    pub fn update_all(&self) { self.lock().update_all(); }

    pub fn dispatch(&self, message: &Message) -> DispatchReport { self.lock().dispatch(message) }

    fn lock_inner(&self) -> MutexGuard<'_, Vec<AttachedHandler>> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Exclusive access to a [`HandlerList`]. Attach and detach wait until this drops.
pub struct LockedHandlers<'a>(MutexGuard<'a, Vec<AttachedHandler>>);

impl LockedHandlers<'_> {
    /// Opens every handler that isn't open yet, so handlers attached while the worker
    /// runs are opened before they see their first message. Returns how many opened.
    pub fn open_all(&mut self) -> usize {
        let mut opened = 0;
        for attached in self.0.iter_mut().filter(|it| !it.is_open) {
            attached.handler.open();
            attached.is_open = true;
            opened += 1;
        }
        opened
    }

    /// Closes every open handler. Handlers that were never opened are skipped.
    pub fn close_all(&mut self) { self.0.iter_mut().for_each(AttachedHandler::close); }

    pub fn update_all(&mut self) {
        self.0
            .iter_mut()
            .filter(|it| it.is_open)
            .for_each(|it| it.handler.update());
    }

    /// Calls [`Handler::handle()`] on every handler in attachment order. A failure is
    /// counted (on the report and on the message) and logged, and delivery carries on.
    pub fn dispatch(&mut self, message: &Message) -> DispatchReport {
        let mut report = DispatchReport::default();
        for AttachedHandler { id, handler, .. } in self.0.iter_mut() {
            report.delivered += 1;
            if HandleOutcome::from(handler.handle(message)) == HandleOutcome::Failed {
                report.failed += 1;
                message.record_handling_failure();
                tracing::warn!(handler = %id, message_id = %message.id(), "handler failed to handle message");
            }
        }
        report
    }

    #[must_use]
    pub fn len(&self) -> usize { self.0.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}
