use std::path::{Path, PathBuf};

use anyhow::{bail, Context};

use crate::types::GatewayTunnelResult;

/// The interpreter the monitor script is written for on this platform.
pub fn default_interpreter() -> &'static str {
    if cfg!(windows) {
        "python"
    } else {
        "python3"
    }
}

/// Resolve the interpreter used to run the monitor script.
///
/// A bare name, including the default from [`default_interpreter`], is looked up on the user's
/// `PATH`. Anything else is treated as a path and must exist.
pub fn interpreter_path(requested: Option<&Path>) -> GatewayTunnelResult<PathBuf> {
    let requested = requested.unwrap_or(Path::new(default_interpreter()));

    if requested.as_os_str().is_empty() {
        bail!("Monitor interpreter set to empty string");
    }

    if requested.components().count() == 1 && !requested.is_absolute() {
        log::debug!(
            "Looking for monitor interpreter '{}' in PATH",
            requested.display()
        );
        return which::which(requested).with_context(|| {
            format!(
                "Monitor interpreter '{}' not found in PATH. Install it or pass the path with '--monitor-interpreter'.",
                requested.display()
            )
        });
    }

    if !requested.exists() {
        bail!(
            "Monitor interpreter set to '{path}' but that path doesn't exist",
            path = requested.display()
        );
    }
    Ok(requested.to_path_buf())
}

#[cfg(test)]
mod tests {
    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn explicit_path_must_exist() {
        let result = interpreter_path(Some(Path::new("/non/existent/path/to/python3")));
        assert!(result.is_err());
    }

    #[test]
    fn explicit_path_is_used_as_is() {
        let temp = NamedTempFile::new().expect("failed to create temp file");
        let result = interpreter_path(Some(temp.path())).expect("failed to get interpreter path");
        assert_eq!(result, temp.path());
    }

    #[test]
    fn empty_name_is_rejected() {
        assert!(interpreter_path(Some(Path::new(""))).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn bare_name_is_found_in_path() {
        let result = interpreter_path(Some(Path::new("sh"))).expect("sh should be on PATH");
        assert!(result.is_absolute());
    }

    #[test]
    fn unknown_bare_name_is_an_error() {
        let result = interpreter_path(Some(Path::new("no-such-interpreter-4f1c")));
        assert!(result.is_err());
    }
}
