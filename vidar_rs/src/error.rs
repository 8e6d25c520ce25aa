//! Error taxonomy.
//!
//! [`ConfigError`] covers everything that can go wrong while declaring a
//! command. These errors are fatal to startup and always echo the offending
//! raw input. [`RegistryError`] covers misuse of the registration lifecycle.
//! Failures raised by handlers at runtime are plain [`anyhow::Error`]s and
//! never leave the router (see [`crate::router`]).

use thiserror::Error;

/// Result alias for configuration-time operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    /// A syntax string could not be parsed.
    #[error("invalid command syntax: {reason}\n\tfailed to parse: {raw}")]
    Grammar { raw: String, reason: String },

    /// A required value was absent or empty.
    #[error("missing {what}")]
    Missing { what: String },

    /// A value had the wrong shape (e.g. a docs entry that is neither text nor a locale map).
    #[error("invalid {what}: expected {expected}")]
    InvalidType { what: String, expected: String },

    #[error("cannot define duplicate {what} '{name}'")]
    Duplicate { what: String, name: String },

    #[error("properties '{first}' and '{second}' are mutually exclusive on '{subject}'")]
    Exclusive {
        subject: String,
        first: String,
        second: String,
    },

    #[error("value of '{what}' ({value}) is below the minimum of {min}")]
    BelowMinimum { what: String, value: f64, min: f64 },

    #[error("value of '{what}' ({value}) is above the maximum of {max}")]
    AboveMaximum { what: String, value: f64, max: f64 },

    /// A structural rule was violated.
    #[error("{0}")]
    Predicate(String),

    #[error("invalid {what} name '{name}': {reason}")]
    InvalidName {
        what: String,
        name: String,
        reason: String,
    },

    /// A reference (docs key, handler route, autocomplete key) points at nothing declared.
    #[error("{what} '{reference}' does not exist")]
    NotFound { what: String, reference: String },

    #[error("unknown argument type '{raw}'{}", did_you_mean(.suggestion))]
    UnknownType {
        raw: String,
        suggestion: Option<String>,
    },

    #[error("failed to read {path}: {message}")]
    Io { path: String, message: String },

    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },
}

fn did_you_mean(suggestion: &Option<String>) -> String {
    suggestion
        .as_ref()
        .map(|s| format!(" (did you mean '{s}'?)"))
        .unwrap_or_default()
}

impl ConfigError {
    pub fn grammar(raw: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::Grammar {
            raw: raw.into(),
            reason: reason.into(),
        }
    }

    pub fn not_found(what: impl Into<String>, reference: impl Into<String>) -> Self {
        ConfigError::NotFound {
            what: what.into(),
            reference: reference.into(),
        }
    }

    pub fn duplicate(what: impl Into<String>, name: impl Into<String>) -> Self {
        ConfigError::Duplicate {
            what: what.into(),
            name: name.into(),
        }
    }
}

/// Lifecycle errors raised by the registry coordinator.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry is already initialized")]
    AlreadyInitialized,

    #[error("registry initialization must run inside a tokio runtime")]
    NoRuntime,

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grammar_error_echoes_raw_input() {
        let err = ConfigError::grammar("<name]", "mismatched brackets");
        let text = err.to_string();
        assert!(text.contains("<name]"));
        assert!(text.contains("mismatched brackets"));
    }

    #[test]
    fn unknown_type_mentions_suggestion() {
        let err = ConfigError::UnknownType {
            raw: "integr".into(),
            suggestion: Some("integer".into()),
        };
        assert_eq!(
            err.to_string(),
            "unknown argument type 'integr' (did you mean 'integer'?)"
        );
        let bare = ConfigError::UnknownType {
            raw: "zzz".into(),
            suggestion: None,
        };
        assert_eq!(bare.to_string(), "unknown argument type 'zzz'");
    }
}
