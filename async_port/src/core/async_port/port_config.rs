// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use miette::IntoDiagnostic;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What a [`BlockingHandlerThread`] does with messages still queued when it stops.
///
/// [`BlockingHandlerThread`]: crate::BlockingHandlerThread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownPolicy {
    /// Drop them undelivered. Producers waiting on them stay blocked.
    #[default]
    DiscardPending,
    /// Dispatch them (without an `update()` pass) before handlers are closed.
    DrainPending,
}

/// Everything needed to build a port in one call.
///
/// ```
/// use r3bl_async_port::{PortConfig, ShutdownPolicy};
/// use std::time::Duration;
///
/// let config = PortConfig::try_from_json_str(
///     r#"{ "name": "audio", "timeout_ms": 16, "shutdown_policy": "drain_pending" }"#,
/// )
/// .unwrap();
/// assert_eq!(config.timeout, Duration::from_millis(16));
/// assert_eq!(config.shutdown_policy, ShutdownPolicy::DrainPending);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PortConfig {
    /// Worker thread name (and the `thread` field on its log events).
    pub name: String,
    /// Zero blocks until a message arrives.
    #[serde(rename = "timeout_ms", with = "duration_as_millis")]
    pub timeout: Duration,
    pub shutdown_policy: ShutdownPolicy,
}

pub const DEFAULT_PORT_NAME: &str = "async-port";

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_PORT_NAME.to_string(),
            timeout: Duration::ZERO,
            shutdown_policy: ShutdownPolicy::default(),
        }
    }
}

impl PortConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_shutdown_policy(mut self, shutdown_policy: ShutdownPolicy) -> Self {
        self.shutdown_policy = shutdown_policy;
        self
    }

    /// Missing fields take their default. Unknown fields are rejected.
    ///
    /// # Errors
    ///
    /// Returns an error if `json` isn't a valid config object.
    pub fn try_from_json_str(json: &str) -> miette::Result<Self> {
        serde_json::from_str(json).into_diagnostic()
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn try_to_json_string(&self) -> miette::Result<String> {
        serde_json::to_string_pretty(self).into_diagnostic()
    }
}

mod duration_as_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(value.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test]
    fn test_defaults() {
        let config = PortConfig::default();
        assert_eq!(config.name, DEFAULT_PORT_NAME);
        assert_eq!(config.timeout, Duration::ZERO);
        assert_eq!(config.shutdown_policy, ShutdownPolicy::DiscardPending);
        assert_eq!(PortConfig::try_from_json_str("{}").unwrap(), config);
    }

    #[test_case(r#"{"name": "io"}"#, "io", 0, ShutdownPolicy::DiscardPending ; "name only")]
    #[test_case(r#"{"timeout_ms": 250}"#, DEFAULT_PORT_NAME, 250, ShutdownPolicy::DiscardPending ; "timeout only")]
    #[test_case(r#"{"shutdown_policy": "drain_pending"}"#, DEFAULT_PORT_NAME, 0, ShutdownPolicy::DrainPending ; "policy only")]
    fn test_partial_json(json: &str, name: &str, timeout_ms: u64, policy: ShutdownPolicy) {
        let config = PortConfig::try_from_json_str(json).unwrap();
        assert_eq!(config.name, name);
        assert_eq!(config.timeout, Duration::from_millis(timeout_ms));
        assert_eq!(config.shutdown_policy, policy);
    }

    #[test_case(r#"{"timeout": 5}"# ; "unknown field")]
    #[test_case(r#"{"timeout_ms": -1}"# ; "negative timeout")]
    #[test_case(r#"{"shutdown_policy": "later"}"# ; "unknown policy")]
    #[test_case("not json" ; "garbage")]
    fn test_invalid_json(json: &str) { assert!(PortConfig::try_from_json_str(json).is_err()); }

    #[test]
    fn test_json_roundtrip() {
        let config = PortConfig::new("game-logic")
            .with_timeout(Duration::from_millis(16))
            .with_shutdown_policy(ShutdownPolicy::DrainPending);
        let json = config.try_to_json_string().unwrap();
        assert!(json.contains("\"timeout_ms\": 16"));
        assert_eq!(PortConfig::try_from_json_str(&json).unwrap(), config);
    }
}
