//! Best-effort permission bits for the Unix socket file.
//!
//! Runs after the socket is bound and before it accepts connections. Both
//! stages may fail independently; either way the socket stays usable with
//! its creation mode, so failures are reported and never abort the listener.

use std::io;
use std::num::ParseIntError;

use camino::Utf8PathBuf;
use thiserror::Error;
use tracing::debug;

use hearth_config::UnixBinding;

use crate::health::HealthReporter;

use super::LISTENER_TARGET;

/// Errors raised while re-permissioning the socket file.
#[derive(Debug, Error)]
pub enum PermissionError {
    /// The configured permission string is not an octal number.
    #[error("failed to parse socket file permission '{value}': {source}")]
    Parse {
        /// Configured permission string.
        value: String,
        /// Underlying parse error.
        #[source]
        source: ParseIntError,
    },
    /// Applying the mode to the socket file failed.
    #[error("failed to chmod socket file {path} to {mode:o}: {source}")]
    Apply {
        /// Socket file path.
        path: Utf8PathBuf,
        /// Mode that could not be applied.
        mode: u32,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Parses an octal permission string such as `"660"` or `"0755"`.
///
/// The string is taken verbatim: surrounding whitespace is a parse error.
pub(crate) fn parse_mode(value: &str) -> Result<u32, PermissionError> {
    u32::from_str_radix(value, 8).map_err(|source| PermissionError::Parse {
        value: value.to_owned(),
        source,
    })
}

/// Applies the configured permission string to the bound socket file.
///
/// Returns the applied mode, or `None` when the permission string is empty.
/// An empty string means "not configured": the creation mode is kept and
/// nothing is reported as degraded, unlike a malformed value.
#[cfg(unix)]
pub(crate) fn set_socket_permissions(binding: &UnixBinding) -> Result<Option<u32>, PermissionError> {
    use std::os::unix::fs::PermissionsExt;

    if binding.permissions.is_empty() {
        return Ok(None);
    }
    let mode = parse_mode(&binding.permissions)?;
    std::fs::set_permissions(binding.path(), std::fs::Permissions::from_mode(mode)).map_err(
        |source| PermissionError::Apply {
            path: binding.path.clone(),
            mode,
            source,
        },
    )?;
    Ok(Some(mode))
}

/// Applies socket permissions and reports the outcome; never fails.
#[cfg(unix)]
pub(super) fn apply_reported(binding: &UnixBinding, reporter: &dyn HealthReporter) {
    match set_socket_permissions(binding) {
        Ok(Some(mode)) => reporter.socket_permissions_applied(binding.path.as_str(), mode),
        Ok(None) => debug!(
            target: LISTENER_TARGET,
            path = %binding.path,
            "no socket file permission configured; keeping creation mode"
        ),
        Err(error) => reporter.socket_permissions_degraded(&error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("755", 0o755)]
    #[case("0660", 0o660)]
    #[case("777", 0o777)]
    fn parses_octal_modes(#[case] value: &str, #[case] expected: u32) {
        assert_eq!(parse_mode(value).expect("parse"), expected);
    }

    #[rstest]
    #[case("xyz")]
    #[case("789")]
    #[case("")]
    #[case(" 755")]
    #[case("755\n")]
    #[case("77777777777")]
    fn rejects_invalid_modes(#[case] value: &str) {
        let error = parse_mode(value).expect_err("invalid mode");
        assert!(matches!(error, PermissionError::Parse { .. }));
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use std::os::unix::fs::PermissionsExt;
        use std::os::unix::net::UnixListener;

        fn bound_socket(
            dir: &tempfile::TempDir,
            permissions: &str,
        ) -> (UnixListener, UnixBinding, u32) {
            let path = dir.path().join("hearth.sock");
            let listener = UnixListener::bind(&path).expect("bind socket");
            let initial = std::fs::metadata(&path).expect("metadata").permissions().mode() & 0o7777;
            let binding = UnixBinding::new(
                Utf8PathBuf::from_path_buf(path).expect("utf8 path"),
                permissions,
            );
            (listener, binding, initial)
        }

        fn mode_of(binding: &UnixBinding) -> u32 {
            std::fs::metadata(binding.path())
                .expect("metadata")
                .permissions()
                .mode()
                & 0o7777
        }

        #[test]
        fn applies_configured_mode() {
            let dir = tempfile::tempdir().expect("temp dir");
            let (_listener, binding, _) = bound_socket(&dir, "755");
            let applied = set_socket_permissions(&binding).expect("apply");
            assert_eq!(applied, Some(0o755));
            assert_eq!(mode_of(&binding), 0o755);
        }

        #[test]
        fn invalid_mode_leaves_socket_untouched() {
            let dir = tempfile::tempdir().expect("temp dir");
            let (_listener, binding, initial) = bound_socket(&dir, "xyz");
            let error = set_socket_permissions(&binding).expect_err("invalid mode");
            assert!(matches!(error, PermissionError::Parse { .. }));
            assert_eq!(mode_of(&binding), initial);
        }

        #[test]
        fn padded_mode_is_rejected_not_trimmed() {
            let dir = tempfile::tempdir().expect("temp dir");
            let (_listener, binding, initial) = bound_socket(&dir, " 700");
            let error = set_socket_permissions(&binding).expect_err("padded mode");
            assert!(matches!(error, PermissionError::Parse { .. }));
            assert_eq!(mode_of(&binding), initial);
        }

        #[test]
        fn empty_mode_keeps_creation_mode() {
            let dir = tempfile::tempdir().expect("temp dir");
            let (_listener, binding, initial) = bound_socket(&dir, "");
            assert_eq!(set_socket_permissions(&binding).expect("no-op"), None);
            assert_eq!(mode_of(&binding), initial);
        }

        #[test]
        fn missing_socket_reports_apply_failure() {
            let dir = tempfile::tempdir().expect("temp dir");
            let binding = UnixBinding::new(
                Utf8PathBuf::from_path_buf(dir.path().join("gone.sock")).expect("utf8 path"),
                "600",
            );
            let error = set_socket_permissions(&binding).expect_err("missing socket");
            assert!(matches!(error, PermissionError::Apply { mode: 0o600, .. }));
        }
    }
}
