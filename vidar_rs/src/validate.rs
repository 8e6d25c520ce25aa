//! Precondition checks used while compiling and building commands.
//!
//! Every function here is pure: it inspects its inputs and either returns
//! `Ok(())` or the [`ConfigError`] kind that describes the violation.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::argument::ChoiceValue;
use crate::error::{ConfigError, ConfigResult};

pub const MAX_NAME_LEN: usize = 32;
pub const MAX_DESCRIPTION_LEN: usize = 100;
pub const MAX_CHOICES: usize = 25;
pub const MAX_CHOICE_LEN: usize = 100;
pub const MAX_OPTIONS: usize = 25;
pub const MAX_LENGTH_BOUND: u16 = 6000;

static SLASH_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[-_\p{L}\p{N}\p{Devanagari}\p{Thai}]{1,32}$").expect("valid name regex")
});

/// Shape of a JSON value, for checking externally supplied documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonKind {
    String,
    Object,
    Array,
}

impl JsonKind {
    fn describe(self) -> &'static str {
        match self {
            JsonKind::String => "a string",
            JsonKind::Object => "an object",
            JsonKind::Array => "an array",
        }
    }
}

pub fn exists<T>(value: Option<T>, what: &str) -> ConfigResult<T> {
    value.ok_or_else(|| ConfigError::Missing {
        what: what.to_string(),
    })
}

pub fn not_blank(value: &str, what: &str) -> ConfigResult<()> {
    if value.trim().is_empty() {
        return Err(ConfigError::Missing {
            what: what.to_string(),
        });
    }
    Ok(())
}

pub fn kind(value: &Value, expected: JsonKind, what: &str) -> ConfigResult<()> {
    let matches = match expected {
        JsonKind::String => value.is_string(),
        JsonKind::Object => value.is_object(),
        JsonKind::Array => value.is_array(),
    };
    if !matches {
        return Err(ConfigError::InvalidType {
            what: what.to_string(),
            expected: expected.describe().to_string(),
        });
    }
    Ok(())
}

pub fn not_duplicate(already_present: bool, what: &str, name: &str) -> ConfigResult<()> {
    if already_present {
        return Err(ConfigError::duplicate(what, name));
    }
    Ok(())
}

pub fn exclusive(
    first_set: bool,
    second_set: bool,
    subject: &str,
    first: &str,
    second: &str,
) -> ConfigResult<()> {
    if first_set && second_set {
        return Err(ConfigError::Exclusive {
            subject: subject.to_string(),
            first: first.to_string(),
            second: second.to_string(),
        });
    }
    Ok(())
}

/// Inclusive range check.
pub fn range(value: f64, what: &str, min: f64, max: f64) -> ConfigResult<()> {
    if value < min {
        return Err(ConfigError::BelowMinimum {
            what: what.to_string(),
            value,
            min,
        });
    }
    if value > max {
        return Err(ConfigError::AboveMaximum {
            what: what.to_string(),
            value,
            max,
        });
    }
    Ok(())
}

/// Fails with `message` when `violated` holds.
pub fn predicate(violated: bool, message: impl Into<String>) -> ConfigResult<()> {
    if violated {
        return Err(ConfigError::Predicate(message.into()));
    }
    Ok(())
}

pub fn has_entry(found: bool, what: &str, reference: &str) -> ConfigResult<()> {
    if !found {
        return Err(ConfigError::not_found(what, reference));
    }
    Ok(())
}

/// Platform naming rules shared by commands, subgroups, subcommands and arguments.
///
/// Letters that have no lowercase form (most non-Latin scripts) pass the
/// lowercase requirement; only letters with an uppercase category fail it.
pub fn slash_name(name: &str, what: &str) -> ConfigResult<()> {
    if !SLASH_NAME.is_match(name) {
        return Err(ConfigError::InvalidName {
            what: what.to_string(),
            name: name.to_string(),
            reason: format!(
                "names must be 1-{MAX_NAME_LEN} characters of '-', '_', and letters or numbers in any language"
            ),
        });
    }
    if name.chars().any(char::is_uppercase) {
        return Err(ConfigError::InvalidName {
            what: what.to_string(),
            name: name.to_string(),
            reason: "names must be fully lowercase".to_string(),
        });
    }
    Ok(())
}

pub fn description(text: &str, what: &str) -> ConfigResult<()> {
    let len = text.chars().count();
    range(
        len as f64,
        &format!("{what} description length"),
        1.0,
        MAX_DESCRIPTION_LEN as f64,
    )
}

pub fn choices(values: &[ChoiceValue], subject: &str) -> ConfigResult<()> {
    range(
        values.len() as f64,
        &format!("{subject} choice count"),
        1.0,
        MAX_CHOICES as f64,
    )?;
    for value in values {
        let len = value.to_string().chars().count();
        range(
            len as f64,
            &format!("{subject} choice '{value}' length"),
            1.0,
            MAX_CHOICE_LEN as f64,
        )?;
    }
    Ok(())
}
