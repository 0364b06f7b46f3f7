// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! This is a module to make it easier to use `bincode` with `serde`.
//!
//! More info:
//! - [bincode v2.x migration guide](https://github.com/bincode-org/bincode/blob/trunk/docs/migration_guide.md)

use miette::IntoDiagnostic;
use serde::{Deserialize, Serialize};

/// Bytes on the wire.
pub type Buffer = Vec<BufferAtom>;
pub type BufferAtom = u8;

/// Serialize the payload using the [bincode] crate. Returns a [Buffer]. `T` must
/// implement the [Serialize] trait.
///
/// # Errors
///
/// Returns an error if `T`'s [Serialize] impl fails.
pub fn try_serialize<T: Serialize>(data: &T) -> miette::Result<Buffer> {
    let buffer = bincode::serde::encode_to_vec(data, get_config()).into_diagnostic()?;
    Ok(buffer)
}

/// You must provide the `T` type to deserialize the payload. Deserialize the payload
/// (of &[Buffer]) using the [bincode] crate.
///
/// # Errors
///
/// Returns an error if the bytes don't decode into a `T`.
pub fn try_deserialize<T: for<'de> Deserialize<'de>>(
    buffer: &[BufferAtom],
) -> miette::Result<T> {
    let res = bincode::serde::decode_from_slice::<T, _>(buffer, get_config());
    match res {
        Ok((payload, _bytes_read)) => Ok(payload),
        Err(err) => {
            let err_msg = format!("{err:?}");
            miette::bail!("Failed to deserialize: {}", err_msg)
        }
    }
}

fn get_config() -> bincode::config::Configuration { bincode::config::standard() }
