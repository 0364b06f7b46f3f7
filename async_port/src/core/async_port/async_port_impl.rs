// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use super::{PortConfig, PortError};
use crate::{BlockingHandlerThread, CancelOutcome, Handler, HandlerId, HandlerThread,
            Message, SharedMessage, WorkerThreadError, ok};
use std::{fmt::{Debug, Formatter},
          sync::{Arc, Mutex,
                 atomic::{AtomicBool, Ordering}}};

/// The surface application code talks to: producers [`send()`] messages, domain
/// subsystems [`attach_handler()`], and the port runs every handler on one dedicated
/// worker thread.
///
/// All methods take `&self`, so share a port between producer threads with
/// `Arc<AsyncPort>`.
///
/// # Lifecycle
///
/// ```text
///            set_handler_thread() / with_config()
///                          │
///  attach_handler() ───────┤ (any time)
///                          ▼
///   open() ──► worker spawned, every handler open()ed ──► is_open() == true
///                          │
///   send() / cancel() / send_and_wait()
///                          │
///   close() ──► is_open() == false, worker stops, pending messages per
///               ShutdownPolicy, every handler close()d, worker joined ──► returns
/// ```
///
/// A closed port can be opened again. A message sent concurrently with `close()` may
/// stay queued until the next `open()`.
///
/// # Usage errors
///
/// Sending to a port that is not open, opening twice, detaching a handler that isn't
/// attached and the like return an `Err` immediately, are logged, and change nothing.
/// See [`PortError`].
///
/// Handlers may call back into their own port. `send()` works as usual. `open()`,
/// `close()` and `set_handler_thread()` are refused immediately, without waiting on a
/// concurrent `close()` that is itself waiting for the handler to return.
///
/// [`attach_handler()`]: Self::attach_handler
/// [`send()`]: Self::send
pub struct AsyncPort {
    handler_thread: Mutex<Option<Arc<dyn HandlerThread>>>,
    is_open: AtomicBool,
    /// Serializes `open()`, `close()`, and `set_handler_thread()`.
    lifecycle: Mutex<()>,
}

impl Debug for AsyncPort {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = self.get_handler_thread().map(|it| it.name());
        f.debug_struct("AsyncPort")
            .field("handler_thread", &name)
            .field("is_open", &self.is_open())
            .finish()
    }
}

impl Default for AsyncPort {
    fn default() -> Self { Self::new() }
}

impl AsyncPort {
    /// A port with no handler thread. Call [`set_handler_thread()`] before [`open()`].
    ///
    /// [`open()`]: Self::open
    /// [`set_handler_thread()`]: Self::set_handler_thread
    #[must_use]
    pub fn new() -> Self {
        Self {
            handler_thread: Mutex::new(None),
            is_open: AtomicBool::new(false),
            lifecycle: Mutex::new(()),
        }
    }

    /// A port backed by a [`BlockingHandlerThread`] built from `config`.
    #[must_use]
    pub fn with_config(config: PortConfig) -> Self {
        Self::with_handler_thread(Arc::new(BlockingHandlerThread::new(config)))
    }

    #[must_use]
    pub fn with_handler_thread(handler_thread: Arc<dyn HandlerThread>) -> Self {
        Self {
            handler_thread: Mutex::new(Some(handler_thread)),
            is_open: AtomicBool::new(false),
            lifecycle: Mutex::new(()),
        }
    }

    /// Replaces the backing handler thread. Handlers attached to the previous one stay
    /// with it.
    ///
    /// # Errors
    ///
    /// [`PortError::AlreadyOpen`] while the port is open.
    pub fn set_handler_thread(
        &self,
        handler_thread: Arc<dyn HandlerThread>,
    ) -> Result<(), PortError> {
        log_usage_error(self.try_set_handler_thread(handler_thread))
    }

    #[must_use]
    pub fn get_handler_thread(&self) -> Option<Arc<dyn HandlerThread>> {
        self.handler_thread
            .lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(Arc::clone))
    }

    /// Runs the handler's `on_attach()` on the calling thread. The handler sees every
    /// message dispatched from now on. Valid whether or not the port is open.
    ///
    /// # Errors
    ///
    /// [`PortError::NoHandlerThread`] if no handler thread is set.
    pub fn attach_handler(&self, handler: Box<dyn Handler>) -> Result<HandlerId, PortError> {
        log_usage_error(self.require_handler_thread()).map(|it| it.attach_handler(handler))
    }

    /// Runs the handler's `on_detach()` on the calling thread and returns the handler.
    /// Waits for an in-flight dispatch cycle to finish first.
    ///
    /// # Errors
    ///
    /// [`PortError::NoHandlerThread`] or [`PortError::HandlerNotAttached`].
    pub fn detach_handler(&self, id: HandlerId) -> Result<Box<dyn Handler>, PortError> {
        log_usage_error(self.require_handler_thread().and_then(|it| it.detach_handler(id)))
    }

    /// # Errors
    ///
    /// [`PortError::NoHandlerThread`] if no handler thread is set.
    pub fn detach_all_handlers(&self) -> Result<Vec<Box<dyn Handler>>, PortError> {
        log_usage_error(self.require_handler_thread()).map(|it| it.detach_all_handlers())
    }

    /// Starts the worker. Returns once every attached handler's `open()` has run, and
    /// only then does [`is_open()`] report `true`.
    ///
    /// # Errors
    ///
    /// [`PortError::AlreadyOpen`], [`PortError::NoHandlerThread`], or
    /// [`PortError::Thread`] if the worker failed to start.
    ///
    /// [`is_open()`]: Self::is_open
    pub fn open(&self) -> Result<(), PortError> { log_usage_error(self.try_open()) }

    /// Stops the worker and blocks until it has exited, which is after every handler's
    /// `close()` has run. No-op on a port that isn't open.
    ///
    /// # Errors
    ///
    /// [`PortError::Thread`] if the worker had panicked (the port is closed anyway), or
    /// with [`WorkerThreadError::StopFromWorker`] if called from the port's own worker
    /// thread (nothing changes).
    pub fn close(&self) -> Result<(), PortError> { log_usage_error(self.try_close()) }

    #[must_use]
    pub fn is_open(&self) -> bool { self.is_open.load(Ordering::SeqCst) }

    /// Queues `message` and returns immediately. The port keeps its own reference
    /// until the message is dispatched or cancelled.
    ///
    /// # Errors
    ///
    /// [`PortError::NotOpen`], [`PortError::NoHandlerThread`], or
    /// [`PortError::AlreadyHandled`].
    pub fn send(&self, message: &SharedMessage) -> Result<(), PortError> {
        log_usage_error(self.try_send(message))
    }

    /// [`send()`] then [`wait_for_message()`]. Read [`Message::handling_failures()`]
    /// afterwards to find out if any handler reported a failure.
    ///
    /// # Errors
    ///
    /// Same as [`send()`].
    ///
    /// [`send()`]: Self::send
    /// [`wait_for_message()`]: Self::wait_for_message
    pub fn send_and_wait(&self, message: &SharedMessage) -> Result<(), PortError> {
        self.send(message)?;
        self.wait_for_message(message)
    }

    /// Best effort: succeeds only if the worker hasn't yet taken `message` into a
    /// dispatch batch.
    ///
    /// # Errors
    ///
    /// [`PortError::NotOpen`] or [`PortError::NoHandlerThread`].
    pub fn cancel(&self, message: &SharedMessage) -> Result<CancelOutcome, PortError> {
        log_usage_error(self.require_open_handler_thread())
            .map(|it| it.cancel_message(message))
    }

    /// Blocks the calling thread until `message` has been handled. Never returns for a
    /// message that is cancelled or never dispatched; see [`Message::wait_handled()`].
    ///
    /// # Errors
    ///
    /// [`PortError::NoHandlerThread`] if no handler thread is set.
    pub fn wait_for_message(&self, message: &Message) -> Result<(), PortError> {
        let handler_thread = log_usage_error(self.require_handler_thread())?;
        handler_thread.wait_for_message(message);
        ok!()
    }

    fn try_set_handler_thread(
        &self,
        handler_thread: Arc<dyn HandlerThread>,
    ) -> Result<(), PortError> {
        if self.is_called_from_worker() {
            return Err(PortError::AlreadyOpen);
        }
        let _lifecycle = self.lock_lifecycle()?;
        if self.is_open() {
            return Err(PortError::AlreadyOpen);
        }
        let mut slot = self
            .handler_thread
            .lock()
            .map_err(|_| PortError::MutexPoisoned {
                which: "handler_thread",
            })?;
        tracing::debug!(handler_thread = %handler_thread.name(), "handler thread set");
        slot.replace(handler_thread);
        ok!()
    }

    fn try_open(&self) -> Result<(), PortError> {
        if self.is_called_from_worker() {
            return Err(PortError::AlreadyOpen);
        }
        let _lifecycle = self.lock_lifecycle()?;
        if self.is_open() {
            return Err(PortError::AlreadyOpen);
        }
        let handler_thread = self.require_handler_thread()?;
        handler_thread.start()?;
        self.is_open.store(true, Ordering::SeqCst);
        tracing::debug!(port = %handler_thread.name(), "port opened");
        ok!()
    }

    fn try_close(&self) -> Result<(), PortError> {
        // Checked before taking `lifecycle`: a concurrent close() holds it while joining
        // this very thread.
        if let Some(handler_thread) = self.handler_thread_if_worker() {
            return Err(WorkerThreadError::StopFromWorker {
                name: handler_thread.name(),
            }
            .into());
        }

        let _lifecycle = self.lock_lifecycle()?;
        if !self.is_open() {
            tracing::debug!("close() ignored, port is not open");
            return ok!();
        }
        let handler_thread = self.require_handler_thread()?;

        // Refuse new sends before the worker starts shutting down.
        self.is_open.store(false, Ordering::SeqCst);
        handler_thread.stop()?;
        tracing::debug!(port = %handler_thread.name(), "port closed");
        ok!()
    }

    fn is_called_from_worker(&self) -> bool { self.handler_thread_if_worker().is_some() }

    fn handler_thread_if_worker(&self) -> Option<Arc<dyn HandlerThread>> {
        self.get_handler_thread()
            .filter(|it| it.is_worker_thread())
    }

    fn try_send(&self, message: &SharedMessage) -> Result<(), PortError> {
        let handler_thread = self.require_open_handler_thread()?;
        if message.is_handled() {
            return Err(PortError::AlreadyHandled { id: message.id() });
        }
        handler_thread.add_message(Arc::clone(message));
        ok!()
    }

    fn require_handler_thread(&self) -> Result<Arc<dyn HandlerThread>, PortError> {
        self.handler_thread
            .lock()
            .map_err(|_| PortError::MutexPoisoned {
                which: "handler_thread",
            })?
            .as_ref()
            .map(Arc::clone)
            .ok_or(PortError::NoHandlerThread)
    }

    fn require_open_handler_thread(&self) -> Result<Arc<dyn HandlerThread>, PortError> {
        let handler_thread = self.require_handler_thread()?;
        if !self.is_open() {
            return Err(PortError::NotOpen);
        }
        Ok(handler_thread)
    }

    fn lock_lifecycle(&self) -> Result<std::sync::MutexGuard<'_, ()>, PortError> {
        self.lifecycle
            .lock()
            .map_err(|_| PortError::MutexPoisoned { which: "lifecycle" })
    }
}

impl Drop for AsyncPort {
    fn drop(&mut self) {
        if !self.is_open() {
            return;
        }
        if let Err(err) = self.close() {
            tracing::error!(?err, "failed to close port on drop");
        }
    }
}

fn log_usage_error<T>(result: Result<T, PortError>) -> Result<T, PortError> {
    result.inspect_err(|err| tracing::error!(%err, "async port"))
}
