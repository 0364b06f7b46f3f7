// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Byte encoding for messages that have to leave the process (the `distributed` flag
//! on [`Message`]). The port itself never serializes anything; a transport that relays
//! distributed messages uses a [`MessageCodec`] to turn them into length-prefixed
//! frames and back.
//!
//! Payload types opt in by registering with the codec, which records how to encode
//! and decode them keyed by their [`MessageId`]. On the wire a frame looks like this:
//!
//! ```text
//! ┌──────────────────────┬──────────────────────────────────────────────┐
//! │ length prefix (u64,  │ bincode(WireEnvelope { id, distributed,      │
//! │ big endian)          │                        payload: bincode(T) }) │
//! └──────────────────────┴──────────────────────────────────────────────┘
//! ```

use super::{Buffer, BufferAtom, Message, MessageId, MessageKind, MessagePayload,
            bincode_serde};
use crate::ok;
use miette::IntoDiagnostic;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::{collections::HashMap,
          fmt::{Debug, Formatter},
          io::{Read, Write}};

pub type LengthPrefixType = u64;

pub mod protocol_constants {
    use super::LengthPrefixType;

    pub const MAX_PAYLOAD_SIZE: LengthPrefixType = 10_000_000;
}

/// What actually gets serialized for each message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireEnvelope {
    pub id: String,
    pub distributed: bool,
    pub payload: Buffer,
}

type EncodeFn = fn(&dyn MessagePayload) -> miette::Result<Buffer>;
type DecodeFn = fn(&[BufferAtom]) -> miette::Result<Box<dyn MessagePayload>>;

#[derive(Clone, Copy)]
struct CodecEntry {
    encode: EncodeFn,
    decode: DecodeFn,
}

/// Registry of payload types that may cross a byte-stream boundary.
#[derive(Default)]
pub struct MessageCodec {
    entries: HashMap<&'static str, CodecEntry>,
}

impl Debug for MessageCodec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<_> = self.entries.keys().collect();
        ids.sort();
        f.debug_struct("MessageCodec").field("ids", &ids).finish()
    }
}

impl MessageCodec {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Registers `T` so its messages can be encoded and decoded.
    ///
    /// # Errors
    ///
    /// Returns an error if another type already registered the same [`MessageId`].
    pub fn register<T>(&mut self) -> miette::Result<()>
    where
        T: MessageKind + Serialize + DeserializeOwned,
    {
        let id = T::ID.as_str();
        if self.entries.contains_key(id) {
            miette::bail!("Message id {} is already registered with this codec", id)
        }
        self.entries.insert(
            id,
            CodecEntry {
                encode: encode_payload::<T>,
                decode: decode_payload::<T>,
            },
        );
        ok!()
    }

    #[must_use]
    pub fn is_registered(&self, id: MessageId) -> bool {
        self.entries.contains_key(id.as_str())
    }

    /// # Errors
    ///
    /// Returns an error if the message's type was never registered, or if
    /// serialization fails.
    pub fn encode(&self, message: &Message) -> miette::Result<Buffer> {
        let id = message.id();
        let Some(entry) = self.entries.get(id.as_str()) else {
            miette::bail!("No codec registered for message id {}", id)
        };
        let envelope = WireEnvelope {
            id: id.as_str().to_string(),
            distributed: message.is_distributed(),
            payload: (entry.encode)(message.payload_dyn())?,
        };
        bincode_serde::try_serialize(&envelope)
    }

    /// Rebuilds a fresh, unhandled [`Message`] from bytes produced by [`encode()`].
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes aren't an envelope, or if the envelope names an id
    /// this codec doesn't know.
    ///
    /// [`encode()`]: Self::encode
    pub fn decode(&self, bytes: &[BufferAtom]) -> miette::Result<Message> {
        let envelope = bincode_serde::try_deserialize::<WireEnvelope>(bytes)?;
        let Some(entry) = self.entries.get(envelope.id.as_str()) else {
            miette::bail!("No codec registered for message id {}", envelope.id)
        };
        let payload = (entry.decode)(&envelope.payload)?;
        Ok(Message::from_payload(payload).with_distributed(envelope.distributed))
    }

    /// Writes one length-prefixed frame and flushes.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails, if the frame would exceed
    /// [`protocol_constants::MAX_PAYLOAD_SIZE`], or on I/O failure.
    pub fn try_write_frame<W: Write>(
        &self,
        writer: &mut W,
        message: &Message,
    ) -> miette::Result<()> {
        let payload_buffer = self.encode(message)?;

        let payload_size = payload_buffer.len() as LengthPrefixType;
        if payload_size > protocol_constants::MAX_PAYLOAD_SIZE {
            miette::bail!("Payload size is too large")
        }

        writer
            .write_all(&payload_size.to_be_bytes())
            .into_diagnostic()?;
        writer.write_all(&payload_buffer).into_diagnostic()?;
        writer.flush().into_diagnostic()?;

        ok!()
    }

    /// Reads one length-prefixed frame.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure, if the declared size exceeds
    /// [`protocol_constants::MAX_PAYLOAD_SIZE`], or if [`decode()`] fails.
    ///
    /// [`decode()`]: Self::decode
    pub fn try_read_frame<R: Read>(&self, reader: &mut R) -> miette::Result<Message> {
        let mut prefix = [0; size_of::<LengthPrefixType>()];
        reader.read_exact(&mut prefix).into_diagnostic()?;
        let size_of_payload = LengthPrefixType::from_be_bytes(prefix);

        if size_of_payload > protocol_constants::MAX_PAYLOAD_SIZE {
            miette::bail!("Payload size is too large")
        }

        // Bounded by MAX_PAYLOAD_SIZE above.
        #[allow(clippy::cast_possible_truncation)]
        let size_of_payload = size_of_payload as usize;

        let mut payload_buffer = vec![0; size_of_payload];
        reader.read_exact(&mut payload_buffer).into_diagnostic()?;

        self.decode(&payload_buffer)
    }
}

fn encode_payload<T: MessageKind + Serialize>(
    payload: &dyn MessagePayload,
) -> miette::Result<Buffer> {
    let Some(concrete) = payload.as_any().downcast_ref::<T>() else {
        miette::bail!("Payload does not match codec entry for {}", T::ID)
    };
    bincode_serde::try_serialize(concrete)
}

fn decode_payload<T: MessageKind + DeserializeOwned>(
    bytes: &[BufferAtom],
) -> miette::Result<Box<dyn MessagePayload>> {
    let payload = bincode_serde::try_deserialize::<T>(bytes)?;
    Ok(Box::new(payload))
}
