//! Errors shared by the visadesk crates.
//!
//! Only the local environment can fail here: the config file and the
//! `~/.visadesk` directory tree. Network and payload failures live in
//! `visadesk-api`.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias for [`VisadeskError`].
pub type Result<T> = std::result::Result<T, VisadeskError>;

#[derive(Debug, Error)]
pub enum VisadeskError {
    /// `--config` pointed at a file that does not exist
    #[error("Configuration not found at {path}")]
    ConfigNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid YAML for [`crate::Config`]
    #[error("Invalid configuration at {path}: {message}")]
    ConfigInvalid { path: PathBuf, message: String },

    /// A value is out of range
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String },

    /// A value needed by the current command is not set anywhere
    #[error("Missing required config field: {field}")]
    ConfigMissingField { field: String },

    #[error("I/O error {operation}: {path}")]
    Io {
        operation: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create directory: {path}")]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Neither `--log-dir` nor a home directory is available
    #[error("Home directory could not be determined")]
    HomeDirUnknown,
}

impl VisadeskError {
    pub fn config_not_found(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ConfigNotFound {
            path: path.into(),
            source,
        }
    }

    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    pub fn io(
        operation: impl Into<String>,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::Io {
            operation: operation.into(),
            path: path.into(),
            source,
        }
    }

    /// True for problems the user fixes by editing config or flags.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigNotFound { .. }
                | Self::ConfigInvalid { .. }
                | Self::ConfigValidation { .. }
                | Self::ConfigMissingField { .. }
        )
    }

    /// A hint to print after the error, if there is a useful one.
    pub fn guidance(&self) -> Option<&'static str> {
        match self {
            Self::ConfigNotFound { .. } => {
                Some("Check the --config path, or omit it to use ~/.visadesk/config.yaml")
            }
            Self::ConfigInvalid { .. } => Some("Check the YAML syntax of the configuration file"),
            Self::ConfigValidation { .. } => {
                Some("Fix the reported value in ~/.visadesk/config.yaml")
            }
            Self::ConfigMissingField { field } if field == "viewer.full_name" => {
                Some("Pass --user or set viewer.full_name in ~/.visadesk/config.yaml")
            }
            Self::DirectoryCreation { .. } => Some("Check permissions, or pass --log-dir"),
            Self::HomeDirUnknown => Some("Set HOME or pass --log-dir and --config"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_not_found_error() {
        let source = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = VisadeskError::config_not_found("/etc/visadesk.yaml", source);
        assert!(err.to_string().contains("/etc/visadesk.yaml"));
        assert!(err.is_config_error());
        assert!(err.guidance().unwrap().contains("--config"));
    }

    #[test]
    fn test_missing_viewer_guidance() {
        let err = VisadeskError::ConfigMissingField {
            field: "viewer.full_name".into(),
        };
        assert!(err.is_config_error());
        assert!(err.guidance().unwrap().contains("--user"));
    }

    #[test]
    fn test_other_missing_field_has_no_hint() {
        let err = VisadeskError::ConfigMissingField {
            field: "api.token_env".into(),
        };
        assert_eq!(err.guidance(), None);
    }

    #[test]
    fn test_io_error_is_not_config_error() {
        let source = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = VisadeskError::io("reading config", "/root/config.yaml", source);
        assert!(!err.is_config_error());
        assert!(err.to_string().contains("reading config"));
    }
}
