// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! # r3bl_async_port
//!
//! A small message-passing core that decouples subsystems (I/O, audio, game logic) which
//! must run on their own dedicated worker thread, while staying addressable from any
//! producer thread.
//!
//! ```text
//!   producer threads                       dedicated worker thread (one per port)
//!   ────────────────                       ──────────────────────────────────────
//!   port.send(msg) ──► [ FIFO queue ] ──►  swap batch ─► for msg in batch:
//!   port.cancel(msg) ──┘  (mutex+condvar)                 for h in handlers (attach order):
//!                                                             h.handle(msg)
//!   port.wait_for_message(msg) ◄─────────────────────────  msg.mark_handled()
//!                                                         for h in handlers: h.update()
//! ```
//!
//! The pieces, leaf first:
//!
//! | Type                      | Role                                                         |
//! | :------------------------ | :----------------------------------------------------------- |
//! | [`WorkerThread`]          | Named OS thread with start / stop (join) and liveness        |
//! | [`Handler`]               | Your domain logic: lifecycle hooks + `handle(msg) -> bool`   |
//! | [`Message`], [`MessageId`] | Unit of work and its per-type identity tag                  |
//! | [`HandlerThread`]         | Dispatch skeleton + handler list, queueing left abstract     |
//! | [`BlockingHandlerThread`] | FIFO queue with condvar, optional wake timeout, batching     |
//! | [`AsyncPort`]             | The facade that producer code talks to                       |
//!
//! # Example
//!
//! ```
//! use r3bl_async_port::{AsyncPort, Handler, Message, MessageId, MessageKind, PortConfig};
//!
//! #[derive(Debug)]
//! struct Beep(u32);
//! impl MessageKind for Beep {
//!     const ID: MessageId = MessageId::new("audio.beep");
//! }
//!
//! struct AudioHandler;
//! impl Handler for AudioHandler {
//!     fn handle(&mut self, message: &Message) -> bool {
//!         message.payload::<Beep>().is_some()
//!     }
//! }
//!
//! # fn main() -> miette::Result<()> {
//! let port = AsyncPort::with_config(PortConfig::default());
//! port.attach_handler(Box::new(AudioHandler))?;
//! port.open()?;
//! let msg = Message::shared(Beep(440));
//! port.send_and_wait(&msg)?;
//! assert!(msg.is_handled());
//! port.close()?;
//! # Ok(())
//! # }
//! ```

// Enforce strict error handling in production library code only. Tests are allowed to
// use .unwrap() (workspace `Cargo.toml` config allows it).
#![cfg_attr(not(test), deny(clippy::unwrap_in_result))]

// Attach modules (re-exported below to provide clean public API).
pub mod core;

// Re-export stable public API using glob imports for ergonomic, flat API surface.
pub use core::*;
