// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// Attach.
pub mod bincode_serde;
pub mod message_codec;
pub mod message_id;
pub mod message_impl;

// Re-export.
pub use bincode_serde::*;
pub use message_codec::*;
pub use message_id::*;
pub use message_impl::*;
