// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::fmt::{Display, Formatter};

/// Token returned when a handler is attached; pass it back to detach that handler.
///
/// Attaching moves the handler into the port, so the same handler instance can't be
/// attached twice. Each attach gets a fresh id, even for a handler that was detached
/// and re-attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(uuid::Uuid);

impl HandlerId {
    #[must_use]
    pub fn new() -> Self { Self(uuid::Uuid::new_v4()) }
}

impl Default for HandlerId {
    fn default() -> Self { Self::new() }
}

impl Display for HandlerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "handler-{}", self.0.as_simple())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let a = HandlerId::new();
        let b = HandlerId::new();
        assert_ne!(a, b);
        assert!(a.to_string().starts_with("handler-"));
    }
}
