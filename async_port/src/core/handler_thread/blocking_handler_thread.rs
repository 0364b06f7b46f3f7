// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use super::{HandlerThread, HandlerThreadCore};
use crate::{CancelOutcome, Continuation, DeferredWaker, LivenessState, PortConfig,
            SharedMessage, ShutdownPolicy, StopSignal, ThreadWork, WorkerThread,
            WorkerThreadError};
use std::{collections::VecDeque,
          sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError,
                 atomic::{AtomicBool, Ordering}},
          time::Duration};

/// A [`HandlerThread`] backed by a FIFO queue, a mutex, and a condition variable.
///
/// - A timeout of zero means the worker sleeps until a message arrives. A nonzero
///   timeout wakes it at least that often, so [`Handler::update()`] fires periodically
///   even when nothing is sent.
/// - Each wake swaps the whole queue out into a local batch, so producers contend for
///   the queue lock only for the length of a [`VecDeque`] swap, never for the length of
///   a dispatch.
/// - What happens to still-queued messages at shutdown is set by [`ShutdownPolicy`].
///
/// [`Handler::update()`]: crate::Handler::update
#[derive(Debug)]
pub struct BlockingHandlerThread {
    thread: WorkerThread<BlockingDispatch>,
}

impl BlockingHandlerThread {
    #[must_use]
    pub fn new(config: PortConfig) -> Self {
        let PortConfig {
            name,
            timeout,
            shutdown_policy,
        } = config;
        Self {
            thread: WorkerThread::new(name, BlockingDispatch::new(timeout, shutdown_policy)),
        }
    }

    /// Takes effect on the worker's next wait.
    pub fn set_timeout(&self, timeout: Duration) { self.thread.work().set_timeout(timeout); }

    #[must_use]
    pub fn get_timeout(&self) -> Duration { self.thread.work().get_timeout() }

    /// Used as the thread name the next time the port opens.
    pub fn set_name(&self, name: impl Into<String>) { self.thread.set_name(name); }

    #[must_use]
    pub fn shutdown_policy(&self) -> ShutdownPolicy { self.thread.work().shutdown_policy }

    /// Messages queued and not yet swapped into a dispatch batch.
    #[must_use]
    pub fn pending_count(&self) -> usize { self.thread.work().queue.lock_pending().len() }

    #[must_use]
    pub fn generation(&self) -> u8 { self.thread.generation() }
}

impl Default for BlockingHandlerThread {
    fn default() -> Self { Self::new(PortConfig::default()) }
}

impl HandlerThread for BlockingHandlerThread {
    fn core(&self) -> &HandlerThreadCore { &self.thread.work().core }

    fn add_message(&self, message: SharedMessage) {
        let queue = &self.thread.work().queue;
        queue.lock_pending().push_back(message);
        queue.message_available.notify_one();
    }

    fn cancel_message(&self, message: &SharedMessage) -> CancelOutcome {
        let mut pending = self.thread.work().queue.lock_pending();
        let outcome = match pending.iter().position(|it| Arc::ptr_eq(it, message)) {
            Some(index) => {
                pending.remove(index);
                CancelOutcome::Cancelled
            }
            None => CancelOutcome::NotPending,
        };
        tracing::debug!(message_id = %message.id(), ?outcome, "cancel");
        outcome
    }

    fn start(&self) -> Result<(), WorkerThreadError> { self.thread.start().map(|_| ()) }

    fn stop(&self) -> Result<(), WorkerThreadError> { self.thread.stop() }

    fn is_running(&self) -> LivenessState { self.thread.is_running() }

    fn is_worker_thread(&self) -> bool { self.thread.is_current_thread() }

    fn name(&self) -> String { self.thread.get_name() }
}

/// The queue producers push into and the worker sleeps on.
#[derive(Debug, Default)]
struct DispatchQueue {
    pending: Mutex<VecDeque<SharedMessage>>,
    message_available: Condvar,
    /// A parked deferred message was resolved. Written and cleared under `pending`, so
    /// the wakeup can't slip in between the worker's check and its wait.
    deferred_resolved: AtomicBool,
}

impl DispatchQueue {
    fn lock_pending(&self) -> MutexGuard<'_, VecDeque<SharedMessage>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify_deferred_resolved(&self) {
        let _pending = self.lock_pending();
        self.deferred_resolved.store(true, Ordering::SeqCst);
        self.message_available.notify_one();
    }
}

/// The [`ThreadWork`] that runs on a [`BlockingHandlerThread`]'s worker.
#[derive(Debug)]
pub struct BlockingDispatch {
    core: HandlerThreadCore,
    queue: Arc<DispatchQueue>,
    timeout: Mutex<Duration>,
    shutdown_policy: ShutdownPolicy,
}

impl BlockingDispatch {
    fn new(timeout: Duration, shutdown_policy: ShutdownPolicy) -> Self {
        let queue = Arc::new(DispatchQueue::default());
        // Weak, since a parked message can outlive the thread that parked it.
        let deferred_waker: DeferredWaker = {
            let queue = Arc::downgrade(&queue);
            Arc::new(move || {
                if let Some(queue) = queue.upgrade() {
                    queue.notify_deferred_resolved();
                }
            })
        };
        Self {
            core: HandlerThreadCore::with_deferred_waker(deferred_waker),
            queue,
            timeout: Mutex::new(timeout),
            shutdown_policy,
        }
    }

    fn set_timeout(&self, timeout: Duration) {
        *self.timeout.lock().unwrap_or_else(PoisonError::into_inner) = timeout;
    }

    fn get_timeout(&self) -> Duration {
        *self.timeout.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Waits for a message, a resolved deferred message, a stop, or the timeout, then
    /// takes everything queued.
    /// Returns `None` when a stop was requested, leaving the queue to
    /// `deinitialize_work()`.
    fn wait_for_batch(&self, stop_signal: &StopSignal) -> Option<VecDeque<SharedMessage>> {
        let timeout = self.get_timeout();
        let queue = &*self.queue;
        let pending = queue.lock_pending();
        let keep_waiting = |pending: &mut VecDeque<SharedMessage>| {
            pending.is_empty()
                && !stop_signal.is_requested()
                && !queue.deferred_resolved.load(Ordering::SeqCst)
        };

        let mut pending = if timeout.is_zero() {
            queue
                .message_available
                .wait_while(pending, keep_waiting)
                .unwrap_or_else(PoisonError::into_inner)
        } else {
            queue
                .message_available
                .wait_timeout_while(pending, timeout, keep_waiting)
                .unwrap_or_else(PoisonError::into_inner)
                .0
        };

        if stop_signal.is_requested() {
            return None;
        }
        // The cycle that follows finalizes whatever was resolved.
        queue.deferred_resolved.store(false, Ordering::SeqCst);
        Some(std::mem::take(&mut *pending))
    }
}

impl ThreadWork for BlockingDispatch {
    fn initialize_work(&self) { self.core.open_message_handlers(); }

    fn do_work(&self, stop_signal: &StopSignal) -> Continuation {
        let Some(batch) = self.wait_for_batch(stop_signal) else {
            return Continuation::Stop;
        };
        if !batch.is_empty() {
            tracing::debug!(count = batch.len(), "dispatching batch");
        }
        self.core.dispatch_cycle(batch);
        Continuation::Continue
    }

    fn deinitialize_work(&self) {
        let leftover = std::mem::take(&mut *self.queue.lock_pending());
        if !leftover.is_empty() {
            match self.shutdown_policy {
                ShutdownPolicy::DrainPending => {
                    tracing::debug!(count = leftover.len(), "draining pending messages");
                    self.core.dispatch_batch(leftover);
                }
                ShutdownPolicy::DiscardPending => {
                    tracing::warn!(
                        count = leftover.len(),
                        "discarding pending messages at shutdown"
                    );
                }
            }
        }
        self.core.clear_deferred_messages();
        self.core.close_message_handlers();
    }

    fn wake(&self) {
        let _pending = self.queue.lock_pending();
        self.queue.message_available.notify_all();
    }
}
