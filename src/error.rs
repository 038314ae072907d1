use thiserror::Error;

use crate::path::ConfPath;
use crate::types::OverrideAction;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Type of {path} should be {expected}, not {found}")]
    TypeMismatch {
        path: ConfPath,
        expected: String,
        found: String,
    },

    #[error("Unknown option '{key}' in {path}{}", did_you_mean(.suggestions))]
    UnknownKey {
        key: String,
        path: ConfPath,
        suggestions: Vec<String>,
    },

    #[error("Invalid value for {path}: {reason}")]
    InvalidValue { path: ConfPath, reason: String },

    #[error("Option {path} does not support operation {action}")]
    UnsupportedAction {
        path: ConfPath,
        action: OverrideAction,
    },

    #[error("{path} requires a value")]
    MissingValue { path: ConfPath },

    #[error("Invalid reference from {path} to {target}: {reason}")]
    InvalidReference {
        path: ConfPath,
        target: ConfPath,
        reason: String,
    },

    #[error("Invalid path in {path}: {reason}")]
    Path { path: ConfPath, reason: String },

    #[error("Syntax error at line {line}, column {column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },
}

/// Coarse classification of a [`ConfigError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Wrong type, unknown key, bad enum or CMake type, conflicting operators.
    Schema,
    MissingValue,
    /// A schema refers to an option that does not exist, or refers in a cycle.
    InvalidReference,
    Path,
    Syntax,
}

impl ConfigError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConfigError::TypeMismatch { .. }
            | ConfigError::UnknownKey { .. }
            | ConfigError::InvalidValue { .. }
            | ConfigError::UnsupportedAction { .. } => ErrorKind::Schema,
            ConfigError::MissingValue { .. } => ErrorKind::MissingValue,
            ConfigError::InvalidReference { .. } => ErrorKind::InvalidReference,
            ConfigError::Path { .. } => ErrorKind::Path,
            ConfigError::Syntax { .. } => ErrorKind::Syntax,
        }
    }

    /// The tree location the error is about, if any.
    pub fn path(&self) -> Option<&ConfPath> {
        match self {
            ConfigError::TypeMismatch { path, .. }
            | ConfigError::UnknownKey { path, .. }
            | ConfigError::InvalidValue { path, .. }
            | ConfigError::UnsupportedAction { path, .. }
            | ConfigError::MissingValue { path }
            | ConfigError::InvalidReference { path, .. }
            | ConfigError::Path { path, .. } => Some(path),
            ConfigError::Syntax { .. } => None,
        }
    }

    pub(crate) fn mismatch(path: &ConfPath, expected: &str, found: &str) -> Self {
        ConfigError::TypeMismatch {
            path: path.clone(),
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    pub(crate) fn invalid(path: &ConfPath, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            path: path.clone(),
            reason: reason.into(),
        }
    }

    pub(crate) fn unsupported(path: &ConfPath, action: OverrideAction) -> Self {
        ConfigError::UnsupportedAction {
            path: path.clone(),
            action,
        }
    }
}

fn did_you_mean(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(". Did you mean: {}", suggestions.join(", "))
    }
}
