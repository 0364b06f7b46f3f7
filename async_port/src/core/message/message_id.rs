// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Per-type message identity. See [`MessageId`] and [`MessageKind`].

use std::fmt::{Debug, Display, Formatter};

/// Identity of a message *type* (not of an instance).
///
/// Two ids are equal iff they denote the same declared message type. The id is an
/// interned `&'static str`, compared by value, so it is stable across processes and can
/// be written to a byte stream by [`MessageCodec`]. This replaces runtime type
/// information: handlers discriminate with [`Message::is_id()`] or
/// [`Message::payload::<T>()`] instead.
///
/// Pick names that are unique in your program, eg namespaced like `"io.read_file"`.
/// [`MessageCodec::register()`] rejects a second type claiming an id that is already
/// bound.
///
/// [`Message::is_id()`]: crate::Message::is_id
/// [`Message::payload::<T>()`]: crate::Message::payload
/// [`MessageCodec::register()`]: crate::MessageCodec::register
/// [`MessageCodec`]: crate::MessageCodec
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(&'static str);

impl MessageId {
    #[must_use]
    pub const fn new(name: &'static str) -> Self { Self(name) }

    #[must_use]
    pub const fn as_str(&self) -> &'static str { self.0 }
}

impl Debug for MessageId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "MessageId({})", self.0)
    }
}

impl Display for MessageId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { f.write_str(self.0) }
}

/// Implemented by every concrete message payload type. The mapping from the type to its
/// [`MessageId`] is fixed at compile time, and so for the lifetime of the process.
///
/// ```
/// use r3bl_async_port::{MessageId, MessageKind};
///
/// #[derive(Debug)]
/// struct PlaySound { clip: String }
///
/// impl MessageKind for PlaySound {
///     const ID: MessageId = MessageId::new("audio.play_sound");
/// }
///
/// assert_eq!(PlaySound::ID.as_str(), "audio.play_sound");
/// ```
pub trait MessageKind: Debug + Send + Sync + 'static {
    const ID: MessageId;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Debug)]
    struct Ping;
    impl MessageKind for Ping {
        const ID: MessageId = MessageId::new("test.ping");
    }

    #[derive(Debug)]
    struct Pong;
    impl MessageKind for Pong {
        const ID: MessageId = MessageId::new("test.pong");
    }

    #[test]
    fn test_ids_compare_by_identity_of_type() {
        assert_eq!(Ping::ID, MessageId::new("test.ping"));
        assert_ne!(Ping::ID, Pong::ID);
        assert_eq!(format!("{}", Ping::ID), "test.ping");
        assert_eq!(format!("{:?}", Pong::ID), "MessageId(test.pong)");
    }
}
