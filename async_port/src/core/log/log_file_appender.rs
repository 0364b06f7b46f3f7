// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use miette::IntoDiagnostic;
use std::path::Path;
use tracing_appender::rolling::RollingFileAppender;

/// Opens `path` for appending log events, creating its parent directory if needed. The
/// file never rotates: a port is usually shorter lived than a day.
///
/// # Errors
///
/// - `path` has no file name (eg it is `/` or ends in `..`).
/// - The parent directory can't be created.
pub fn try_create_log_file_appender(
    path: impl AsRef<Path>,
) -> miette::Result<RollingFileAppender> {
    let path = path.as_ref();

    let Some(file_name) = path.file_name() else {
        miette::bail!("Log file path {} has no file name", path.display());
    };

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).into_diagnostic()?;

    Ok(tracing_appender::rolling::never(parent, file_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_path_without_file_name() {
        assert!(try_create_log_file_appender("/").is_err());
    }

    #[test]
    fn test_creates_missing_parent_dir() {
        let dir = std::env::temp_dir().join(format!(
            "r3bl_async_port_appender_test_{}",
            std::process::id()
        ));
        let file_path = dir.join("nested").join("port.log");

        assert!(try_create_log_file_appender(&file_path).is_ok());
        assert!(dir.join("nested").is_dir());

        std::fs::remove_dir_all(&dir).ok();
    }
}
