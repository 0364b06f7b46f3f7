// Copyright (c) 2024-2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Configuration for the [`tracing`] subscriber that applications may install to see
//! what the port worker threads are doing. This crate never installs a subscriber on its
//! own; it only emits events.

use miette::IntoDiagnostic;
use tracing_core::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use super::try_create_layers;
use crate::ok;

/// Default file name used by [`WriterConfig::File`] when built via
/// [`TracingConfig::new_file`] with no explicit path.
pub const DEFAULT_LOG_FILE_NAME: &str = "async_port_log.txt";

/// Where display output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayPreference {
    #[default]
    Stdout,
    Stderr,
}

/// Which writers to attach to the subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WriterConfig {
    #[default]
    None,
    Display(DisplayPreference),
    File(String),
    DisplayAndFile(DisplayPreference, String),
}

/// Level filter + writers. Logging is **disabled** when the level is
/// [`LevelFilter::OFF`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    pub level_filter: LevelFilter,
    pub writer_config: WriterConfig,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level_filter: LevelFilter::OFF,
            writer_config: WriterConfig::None,
        }
    }
}

impl TracingConfig {
    #[must_use]
    pub fn new_display(level_filter: LevelFilter, pref: DisplayPreference) -> Self {
        Self {
            level_filter,
            writer_config: WriterConfig::Display(pref),
        }
    }

    #[must_use]
    pub fn new_file(level_filter: LevelFilter, path: Option<String>) -> Self {
        Self {
            level_filter,
            writer_config: WriterConfig::File(
                path.unwrap_or_else(|| DEFAULT_LOG_FILE_NAME.to_string()),
            ),
        }
    }

    #[must_use]
    pub fn get_level_filter(&self) -> LevelFilter { self.level_filter }

    #[must_use]
    pub fn get_writer_config(&self) -> WriterConfig { self.writer_config.clone() }

    /// Installs the layers as the process-wide default subscriber.
    ///
    /// # Errors
    ///
    /// Returns an error if a global subscriber is already installed, or if the file
    /// writer can't be created.
    pub fn install_global(self) -> miette::Result<()> {
        let layers = try_create_layers(&self)?.unwrap_or_default();
        tracing_subscriber::registry()
            .with(layers)
            .try_init()
            .into_diagnostic()?;
        ok!()
    }

    /// Installs the layers for the current thread only, until the returned guard drops.
    /// Handy in tests, where several may run in parallel in one process.
    ///
    /// # Errors
    ///
    /// Returns an error if the file writer can't be created.
    pub fn install_thread_local(
        self,
    ) -> miette::Result<tracing::subscriber::DefaultGuard> {
        let layers = try_create_layers(&self)?.unwrap_or_default();
        let subscriber = tracing_subscriber::registry().with(layers);
        ok!(tracing::subscriber::set_default(subscriber))
    }
}

impl From<LevelFilter> for TracingConfig {
    fn from(level_filter: LevelFilter) -> Self {
        Self::new_display(level_filter, DisplayPreference::Stderr)
    }
}

/// Global subscriber. Logging is **disabled** by default, so a config whose level is
/// [`LevelFilter::OFF`] returns early without installing anything.
///
/// # Errors
///
/// See [`TracingConfig::install_global`].
pub fn try_initialize_logging_global(options: impl Into<TracingConfig>) -> miette::Result<()> {
    let it: TracingConfig = options.into();

    // Early return if the level filter is off.
    if matches!(it.get_level_filter(), LevelFilter::OFF) {
        return ok!();
    }

    it.install_global()
}

/// Thread local subscriber, which you can assign differently per thread (eg per test).
/// Returns `None` when logging is disabled.
///
/// # Errors
///
/// See [`TracingConfig::install_thread_local`].
pub fn try_initialize_logging_thread_local(
    options: impl Into<TracingConfig>,
) -> miette::Result<Option<tracing::subscriber::DefaultGuard>> {
    let it: TracingConfig = options.into();

    if matches!(it.get_level_filter(), LevelFilter::OFF) {
        return ok!(None);
    }

    it.install_thread_local().map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_is_disabled() {
        let config = TracingConfig::default();
        assert_eq!(config.get_level_filter(), LevelFilter::OFF);
        assert_eq!(config.get_writer_config(), WriterConfig::None);
    }

    #[test]
    fn test_disabled_logging_installs_nothing() {
        let guard = try_initialize_logging_thread_local(TracingConfig::default()).unwrap();
        assert!(guard.is_none());
    }

    #[test]
    fn test_thread_local_install() {
        let guard = try_initialize_logging_thread_local(LevelFilter::DEBUG).unwrap();
        assert!(guard.is_some());
        tracing::debug!("visible only on this thread");
    }
}
