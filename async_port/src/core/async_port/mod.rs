// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// Attach.
mod async_port_impl;
mod port_config;
mod port_error;

#[cfg(test)]
mod tests;

// Re-export.
pub use async_port_impl::*;
pub use port_config::*;
pub use port_error::*;
