// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// Attach.
pub mod async_port;
pub mod common;
pub mod handler;
pub mod handler_thread;
pub mod log;
pub mod message;
pub mod worker_thread;

#[cfg(test)]
pub(crate) mod test_fixtures;

// Re-export.
pub use async_port::*;
pub use common::*;
pub use handler::*;
pub use handler_thread::*;
pub use log::*;
pub use message::*;
pub use worker_thread::*;
