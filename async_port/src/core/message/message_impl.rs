// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The unit of work that flows through a port. See [`Message`].

use super::{MessageId, MessageKind};
use std::{any::Any,
          fmt::{Debug, Formatter},
          sync::{Arc, Condvar, Mutex,
                 atomic::{AtomicBool, AtomicUsize, Ordering}},
          time::Duration};

/// Object-safe view of a payload. Blanket-implemented for every [`MessageKind`], so you
/// never implement this by hand.
pub trait MessagePayload: Any + Debug + Send + Sync {
    fn message_id(&self) -> MessageId;

    fn as_any(&self) -> &dyn Any;
}

impl<T: MessageKind> MessagePayload for T {
    fn message_id(&self) -> MessageId { T::ID }

    fn as_any(&self) -> &dyn Any { self }
}

/// A message is owned jointly by the producer (which may keep a clone to poll or wait
/// on it) and the port's queue. It is destroyed when the last reference drops.
pub type SharedMessage = Arc<Message>;

/// Wakes the worker that parked a deferred message, so it can finalize the message as
/// soon as [`Message::resolve_deferred()`] is called.
pub type DeferredWaker = Arc<dyn Fn() + Send + Sync>;

/// A unit of work sent through an [`AsyncPort`].
///
/// # Lifecycle
///
/// ```text
/// created ──send()──► queued ──batch swap──► dispatched ──► handled (wakes waiters)
///                       │                        │
///                       └──cancel()──► dropped   └──defer()──► parked ──resolve_deferred()──► handled
///                                                                 └──port closes──► discarded
/// ```
///
/// # The `handled` flag
///
/// `handled` goes from `false` to `true` exactly once per instance, is set only by the
/// dispatching worker thread, and is never reset. Producers observe it with
/// [`is_handled()`] or block on it with [`wait_handled()`].
///
/// [`AsyncPort`]: crate::AsyncPort
/// [`is_handled()`]: Self::is_handled
/// [`wait_handled()`]: Self::wait_handled
pub struct Message {
    id: MessageId,
    payload: Box<dyn MessagePayload>,
    distributed: bool,
    handled: AtomicBool,
    deferred: AtomicBool,
    deferred_handled: AtomicBool,
    handling_failures: AtomicUsize,
    /// Mirrors `handled` under a mutex so that waiters can't miss the wakeup.
    completion: Mutex<bool>,
    completion_signal: Condvar,
    /// Set while parked. Guards `deferred_handled` against a resolve racing the park.
    deferred_waker: Mutex<Option<DeferredWaker>>,
}

impl Message {
    pub fn new<T: MessageKind>(payload: T) -> Self { Self::from_payload(Box::new(payload)) }

    /// A message flagged for eventual cross-boundary delivery. The transport itself is
    /// not part of this crate; see [`MessageCodec`].
    ///
    /// [`MessageCodec`]: crate::MessageCodec
    pub fn distributed<T: MessageKind>(payload: T) -> Self {
        Self::new(payload).with_distributed(true)
    }

    /// Shorthand for `Arc::new(Message::new(payload))`.
    pub fn shared<T: MessageKind>(payload: T) -> SharedMessage { Arc::new(Self::new(payload)) }

    #[must_use]
    pub fn from_payload(payload: Box<dyn MessagePayload>) -> Self {
        Self {
            id: payload.message_id(),
            payload,
            distributed: false,
            handled: AtomicBool::new(false),
            deferred: AtomicBool::new(false),
            deferred_handled: AtomicBool::new(false),
            handling_failures: AtomicUsize::new(0),
            completion: Mutex::new(false),
            completion_signal: Condvar::new(),
            deferred_waker: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn with_distributed(mut self, distributed: bool) -> Self {
        self.distributed = distributed;
        self
    }

    #[must_use]
    pub fn into_shared(self) -> SharedMessage { Arc::new(self) }

    #[must_use]
    pub fn id(&self) -> MessageId { self.id }

    #[must_use]
    pub fn is_id(&self, id: MessageId) -> bool { self.id == id }

    #[must_use]
    pub fn is<T: MessageKind>(&self) -> bool { self.id == T::ID }

    /// Returns the concrete payload if this message is a `T`.
    #[must_use]
    pub fn payload<T: MessageKind>(&self) -> Option<&T> {
        if !self.is::<T>() {
            return None;
        }
        self.payload.as_any().downcast_ref::<T>()
    }

    #[must_use]
    pub fn payload_dyn(&self) -> &dyn MessagePayload { self.payload.as_ref() }

    #[must_use]
    pub fn is_distributed(&self) -> bool { self.distributed }

    #[must_use]
    pub fn is_handled(&self) -> bool { self.handled.load(Ordering::SeqCst) }

    /// Blocks the calling thread until the worker has marked this message handled.
    ///
    /// This never returns if the message is cancelled, discarded while deferred, or if
    /// its port closes before dispatching it. Don't use it on messages you may also
    /// cancel, and close ports only after all synchronous waits have resolved. Use
    /// [`wait_handled_timeout()`] when you can't guarantee that.
    ///
    /// [`wait_handled_timeout()`]: Self::wait_handled_timeout
    pub fn wait_handled(&self) {
        let guard = self
            .completion
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        drop(
            self.completion_signal
                .wait_while(guard, |done| !*done)
                .unwrap_or_else(std::sync::PoisonError::into_inner),
        );
    }

    /// Like [`wait_handled()`], but gives up after `timeout`. Returns whether the message
    /// was handled.
    ///
    /// [`wait_handled()`]: Self::wait_handled
    #[must_use]
    pub fn wait_handled_timeout(&self, timeout: Duration) -> bool {
        let guard = self
            .completion
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let (guard, _timeout_result) = self
            .completion_signal
            .wait_timeout_while(guard, timeout, |done| !*done)
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard
    }

    /// Called from inside [`Handler::handle()`] to hold this message instead of letting
    /// the worker finalize it after dispatch. It becomes handled once someone calls
    /// [`resolve_deferred()`], which also wakes the worker to finalize it. If the port
    /// closes first, it is discarded.
    ///
    /// [`Handler::handle()`]: crate::Handler::handle
    /// [`resolve_deferred()`]: Self::resolve_deferred
    pub fn defer(&self) { self.deferred.store(true, Ordering::SeqCst); }

    /// Marks deferred work on this message as complete and wakes the worker holding it.
    /// Safe to call from any thread.
    pub fn resolve_deferred(&self) {
        let waker = {
            let mut slot = self.lock_deferred_waker();
            self.deferred_handled.store(true, Ordering::SeqCst);
            slot.take()
        };
        if let Some(wake) = waker {
            wake();
        }
    }

    #[must_use]
    pub fn is_deferred(&self) -> bool { self.deferred.load(Ordering::SeqCst) }

    #[must_use]
    pub fn is_deferred_handled(&self) -> bool {
        self.deferred_handled.load(Ordering::SeqCst)
    }

    /// How many handlers returned `false` for this message. Producers read this after
    /// the message is handled to report local handling failures.
    #[must_use]
    pub fn handling_failures(&self) -> usize { self.handling_failures.load(Ordering::SeqCst) }

    /// Called by the worker after dispatching a deferred message. Returns `false` if the
    /// deferred work was already resolved, in which case the caller finalizes it right
    /// away. Otherwise `waker` runs on the eventual [`resolve_deferred()`].
    ///
    /// [`resolve_deferred()`]: Self::resolve_deferred
    pub(crate) fn park(&self, waker: Option<DeferredWaker>) -> bool {
        let mut slot = self.lock_deferred_waker();
        if self.is_deferred_handled() {
            return false;
        }
        *slot = waker;
        true
    }

    fn lock_deferred_waker(&self) -> std::sync::MutexGuard<'_, Option<DeferredWaker>> {
        self.deferred_waker
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub(crate) fn record_handling_failure(&self) {
        self.handling_failures.fetch_add(1, Ordering::SeqCst);
    }

    /// Sets `handled` and wakes every waiter. Only the dispatching worker calls this.
    /// Later calls are no-ops, so the flag never flips back.
    pub(crate) fn mark_handled(&self) {
        let mut done = self
            .completion
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if *done {
            return;
        }
        *done = true;
        self.handled.store(true, Ordering::SeqCst);
        drop(done);
        self.completion_signal.notify_all();
    }
}

impl Debug for Message {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Message")
            .field("id", &self.id)
            .field("payload", &self.payload)
            .field("distributed", &self.distributed)
            .field("handled", &self.is_handled())
            .field("deferred", &self.is_deferred())
            .field("deferred_handled", &self.is_deferred_handled())
            .finish_non_exhaustive()
    }
}
