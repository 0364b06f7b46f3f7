// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

/// Shorthand for `Ok(())` or `Ok(value)` at the tail of fallible functions.
///
/// ```
/// use r3bl_async_port::ok;
///
/// fn nothing_to_report() -> Result<(), String> { ok!() }
/// fn answer() -> Result<u8, String> { ok!(42) }
///
/// assert_eq!(nothing_to_report(), Ok(()));
/// assert_eq!(answer(), Ok(42));
/// ```
#[macro_export]
macro_rules! ok {
    // No args.
    () => {
        Ok(())
    };
    // With arg.
    ($value:expr) => {
        Ok($value)
    };
}
