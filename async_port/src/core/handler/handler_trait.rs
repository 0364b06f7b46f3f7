// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::Message;

/// A unit of domain logic attached to a port. See the [module docs] for which thread
/// calls each hook.
///
/// Only [`handle()`] is required. Handlers that poll something (a device, a socket)
/// independent of messages do that work in [`update()`], which fires on every wake of
/// the worker, including wakes caused only by the port's timeout.
///
/// # Trait Bounds - [`Send`] + `'static`
///
/// The port takes ownership of the handler (as a `Box<dyn Handler>`) and moves it to
/// its worker thread. [`Sync`] is not required since only one thread calls into a
/// handler at a time.
///
/// # Don't call back into your own port's handler list
///
/// [`handle()`], [`update()`], [`open()`] and [`close()`] run while the handler list is
/// locked. Attaching or detaching handlers on the same port from inside them deadlocks.
/// Sending messages is fine, but waiting on one never returns.
///
/// [`close()`]: Self::close
/// [`handle()`]: Self::handle
/// [`open()`]: Self::open
/// [`update()`]: Self::update
/// [module docs]: super
pub trait Handler: Send + 'static {
    fn on_attach(&mut self) {}

    fn on_detach(&mut self) {}

    fn open(&mut self) {}

    fn update(&mut self) {}

    fn close(&mut self) {}

    /// Processes one message. Return `false` to report a local failure. The message is
    /// still delivered to every later handler, and later messages are still dispatched.
    ///
    /// To hold on to the message beyond this call, invoke [`Message::defer()`] on it.
    fn handle(&mut self, message: &Message) -> bool;
}
