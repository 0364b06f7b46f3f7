// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! A minimal named worker-thread lifecycle: [`WorkerThread`] owns exactly one OS thread
//! that runs your [`ThreadWork`] implementation.
//!
//! ```text
//! start() ──spawn──► initialize_work()          ◄── start() returns after this
//!                         │
//!                         ▼
//!                 ┌─► do_work(&stop_signal) ──┐
//!                 └── Continue && !stopped ◄──┘
//!                         │
//!                         ▼
//!                 deinitialize_work()           ◄── stop() returns after this
//!                         │
//!                         ▼
//!              TerminationGuard::drop() → LivenessState::Terminated
//! ```
//!
//! The framework side ([`WorkerThread`]) handles spawning, the start-up handshake, the
//! stop flag, waking, joining, and liveness. The work side ([`ThreadWork`]) is only
//! concerned with one iteration at a time, the same inversion of control as the
//! reactor-thread workers in `r3bl_tui`.

// Attach.
mod termination_guard;
mod thread_liveness;
mod thread_work;
mod worker_thread_impl;
mod worker_thread_types;

// Re-export.
pub use termination_guard::*;
pub use thread_liveness::*;
pub use thread_work::*;
pub use worker_thread_impl::*;
pub use worker_thread_types::*;
