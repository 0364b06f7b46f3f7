// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The [`Handler`] contract that domain code implements, and the ordered
//! [`HandlerList`] a handler thread keeps them in.
//!
//! # Which thread calls what
//!
//! | Hook                          | Called on                                  | When                           |
//! | :---------------------------- | :----------------------------------------- | :----------------------------- |
//! | [`on_attach()`]               | the thread calling `attach_handler()`      | before insertion               |
//! | [`on_detach()`]               | the thread calling `detach_handler()`      | after removal                  |
//! | [`open()`]                    | the port's worker thread                   | at start, or before the first dispatch after a late attach |
//! | [`close()`]                   | the worker thread, or the detaching thread | at shutdown, or on detach if it was opened |
//! | [`handle()`]                  | the port's worker thread                   | once per dispatched message    |
//! | [`update()`]                  | the port's worker thread                   | once per wake                  |
//!
//! Every `open()` is matched by exactly one `close()`. A handler that was never opened
//! is never closed.
//!
//! A handler is never called concurrently with itself: attach, detach, and every
//! worker-side call go through the same [`HandlerList`] mutex.
//!
//! [`close()`]: Handler::close
//! [`handle()`]: Handler::handle
//! [`on_attach()`]: Handler::on_attach
//! [`on_detach()`]: Handler::on_detach
//! [`open()`]: Handler::open
//! [`update()`]: Handler::update

// Attach.
mod handler_id;
mod handler_list;
mod handler_trait;

// Re-export.
pub use handler_id::*;
pub use handler_list::*;
pub use handler_trait::*;
