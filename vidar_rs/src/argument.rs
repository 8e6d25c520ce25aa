//! Argument descriptors: one user-facing input slot of a command.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::types::ArgType;
use crate::validate;

/// Description given to nodes and arguments that were never documented.
pub const PLACEHOLDER_DESCRIPTION: &str = "No description provided.";

/// A numeric literal that keeps its integer-ness on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn parse(raw: &str) -> Option<Number> {
        let raw = raw.trim();
        if let Ok(int) = raw.parse::<i64>() {
            return Some(Number::Int(int));
        }
        raw.parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(Number::Float)
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(v) => v as f64,
            Number::Float(v) => v,
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(self, Number::Int(_))
    }

    /// Re-type for an argument of `datatype`: floats stay floats, integers
    /// become floats for `Float` arguments.
    fn coerce(self, datatype: ArgType) -> Number {
        match (self, datatype) {
            (Number::Int(v), ArgType::Float) => Number::Float(v as f64),
            (other, _) => other,
        }
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Number::Int(value)
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Number::Float(value)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(v) => write!(f, "{v}"),
            Number::Float(v) => write!(f, "{v}"),
        }
    }
}

/// One fixed choice an argument accepts, also used for autocomplete suggestions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChoiceValue {
    Integer(i64),
    Float(f64),
    String(String),
}

impl ChoiceValue {
    /// Infer one shared datatype for a list of literals: integers when every
    /// literal is an integer, floats when every literal is a number, strings
    /// otherwise.
    pub fn infer(literals: &[&str]) -> (ArgType, Vec<ChoiceValue>) {
        let numbers: Option<Vec<Number>> = literals.iter().map(|l| Number::parse(l)).collect();
        match numbers {
            Some(nums) if nums.iter().all(|n| n.is_integer()) => {
                let values = nums
                    .into_iter()
                    .filter_map(|n| match n {
                        Number::Int(v) => Some(ChoiceValue::Integer(v)),
                        Number::Float(_) => None,
                    })
                    .collect();
                (ArgType::Integer, values)
            }
            Some(nums) => (
                ArgType::Float,
                nums.into_iter()
                    .map(|n| ChoiceValue::Float(n.as_f64()))
                    .collect(),
            ),
            None => (
                ArgType::String,
                literals
                    .iter()
                    .map(|l| ChoiceValue::String(l.to_string()))
                    .collect(),
            ),
        }
    }

    /// The argument type a value of this shape needs.
    pub fn datatype(&self) -> ArgType {
        match self {
            ChoiceValue::Integer(_) => ArgType::Integer,
            ChoiceValue::Float(_) => ArgType::Float,
            ChoiceValue::String(_) => ArgType::String,
        }
    }

    fn fits(&self, datatype: ArgType) -> bool {
        matches!(
            (self, datatype),
            (ChoiceValue::String(_), ArgType::String)
                | (ChoiceValue::Integer(_), ArgType::Integer)
                | (ChoiceValue::Integer(_), ArgType::Float)
                | (ChoiceValue::Float(_), ArgType::Float)
        )
    }

    fn coerce(self, datatype: ArgType) -> ChoiceValue {
        match (self, datatype) {
            (ChoiceValue::Integer(v), ArgType::Float) => ChoiceValue::Float(v as f64),
            (other, _) => other,
        }
    }
}

impl fmt::Display for ChoiceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChoiceValue::Integer(v) => write!(f, "{v}"),
            ChoiceValue::Float(v) => write!(f, "{v}"),
            ChoiceValue::String(v) => f.write_str(v),
        }
    }
}

impl From<&str> for ChoiceValue {
    fn from(value: &str) -> Self {
        ChoiceValue::String(value.to_string())
    }
}

impl From<String> for ChoiceValue {
    fn from(value: String) -> Self {
        ChoiceValue::String(value)
    }
}

impl From<i64> for ChoiceValue {
    fn from(value: i64) -> Self {
        ChoiceValue::Integer(value)
    }
}

impl From<f64> for ChoiceValue {
    fn from(value: f64) -> Self {
        ChoiceValue::Float(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub name: String,
    pub datatype: ArgType,
    pub required: bool,
    pub autocomplete: bool,
    /// Empty when the argument accepts free input.
    pub choices: Vec<ChoiceValue>,
    pub min: Option<Number>,
    pub max: Option<Number>,
    pub min_length: Option<u16>,
    pub max_length: Option<u16>,
    pub description: String,
    pub localizations: BTreeMap<String, String>,
}

impl Argument {
    pub fn new(name: impl Into<String>, datatype: ArgType, required: bool) -> Self {
        Self {
            name: name.into(),
            datatype,
            required,
            autocomplete: false,
            choices: Vec::new(),
            min: None,
            max: None,
            min_length: None,
            max_length: None,
            description: PLACEHOLDER_DESCRIPTION.to_string(),
            localizations: BTreeMap::new(),
        }
    }

    pub fn has_choices(&self) -> bool {
        !self.choices.is_empty()
    }

    pub fn has_bounds(&self) -> bool {
        self.min.is_some() || self.max.is_some()
    }

    pub fn has_length(&self) -> bool {
        self.min_length.is_some() || self.max_length.is_some()
    }

    /// Align bound and choice literals with the datatype (integer literals on a
    /// float argument travel as floats).
    pub(crate) fn normalize_literals(&mut self) {
        let datatype = self.datatype;
        self.min = self.min.map(|n| n.coerce(datatype));
        self.max = self.max.map(|n| n.coerce(datatype));
        self.choices = std::mem::take(&mut self.choices)
            .into_iter()
            .map(|c| c.coerce(datatype))
            .collect();
    }

    /// Check the descriptor against platform limits.
    pub fn validate(&self) -> ConfigResult<()> {
        let subject = self.name.as_str();
        validate::slash_name(&self.name, "argument")?;
        validate::description(&self.description, &format!("argument '{subject}'"))?;

        validate::exclusive(
            self.has_choices(),
            self.autocomplete,
            subject,
            "choices",
            "autocomplete",
        )?;
        validate::exclusive(
            self.has_choices(),
            self.has_bounds(),
            subject,
            "choices",
            "min/max",
        )?;
        validate::exclusive(
            self.has_choices(),
            self.has_length(),
            subject,
            "choices",
            "min_length/max_length",
        )?;

        if self.has_choices() {
            validate::predicate(
                !self.datatype.is_choice_compatible(),
                format!(
                    "argument '{subject}' of type {} cannot have choices",
                    self.datatype
                ),
            )?;
            validate::choices(&self.choices, subject)?;
            if let Some(bad) = self.choices.iter().find(|c| !c.fits(self.datatype)) {
                return Err(ConfigError::InvalidType {
                    what: format!("choice '{bad}' of argument '{subject}'"),
                    expected: format!("a {} literal", self.datatype),
                });
            }
        }

        validate::predicate(
            self.has_bounds() && !self.datatype.is_numeric(),
            format!(
                "min/max can only be set on numeric arguments, '{subject}' is {}",
                self.datatype
            ),
        )?;
        if let (Some(min), Some(max)) = (self.min, self.max) {
            validate::range(
                max.as_f64(),
                &format!("{subject} max"),
                min.as_f64(),
                f64::MAX,
            )?;
        }
        if self.datatype == ArgType::Integer {
            validate::predicate(
                self.min.is_some_and(|n| !n.is_integer())
                    || self.max.is_some_and(|n| !n.is_integer()),
                format!("integer argument '{subject}' needs integer bounds"),
            )?;
        }

        validate::predicate(
            self.has_length() && self.datatype != ArgType::String,
            format!(
                "min_length/max_length can only be set on string arguments, '{subject}' is {}",
                self.datatype
            ),
        )?;
        for (label, bound) in [("min_length", self.min_length), ("max_length", self.max_length)] {
            if let Some(bound) = bound {
                validate::range(
                    f64::from(bound),
                    &format!("{subject} {label}"),
                    0.0,
                    f64::from(validate::MAX_LENGTH_BOUND),
                )?;
            }
        }
        if let (Some(min), Some(max)) = (self.min_length, self.max_length) {
            validate::range(
                f64::from(max),
                &format!("{subject} max_length"),
                f64::from(min),
                f64::from(validate::MAX_LENGTH_BOUND),
            )?;
        }
        Ok(())
    }

    /// Re-serialize into the bracketed grammar form, e.g. `[*q: string]`.
    pub fn to_syntax(&self) -> String {
        let (open, close) = if self.required { ('<', '>') } else { ('[', ']') };
        let star = if self.autocomplete { "*" } else { "" };
        let spec = if self.has_choices() {
            // Whole floats keep their ".0" so the list re-infers as floats.
            let literals: Vec<String> = self.choices.iter().map(choice_literal).collect();
            literals.join(" | ")
        } else if self.has_bounds() {
            bound_expression(
                "x",
                self.min.map(|n| literal(n, self.datatype)),
                self.max.map(|n| literal(n, self.datatype)),
            )
        } else if self.has_length() {
            bound_expression(
                "l",
                self.min_length.map(|n| n.to_string()),
                self.max_length.map(|n| n.to_string()),
            )
        } else {
            self.datatype.keyword().to_string()
        };
        format!("{open}{star}{}: {spec}{close}", self.name)
    }
}

fn choice_literal(choice: &ChoiceValue) -> String {
    match choice {
        ChoiceValue::Float(v) if v.fract() == 0.0 => format!("{v:.1}"),
        other => other.to_string(),
    }
}

fn literal(number: Number, datatype: ArgType) -> String {
    match (number, datatype) {
        (Number::Float(v), _) if v.fract() == 0.0 => format!("{v:.1}"),
        (Number::Int(v), ArgType::Float) => format!("{v}.0"),
        (other, _) => other.to_string(),
    }
}

fn bound_expression(var: &str, min: Option<String>, max: Option<String>) -> String {
    match (min, max) {
        (Some(min), Some(max)) => format!("{min} <= {var} <= {max}"),
        (Some(min), None) => format!("{var} >= {min}"),
        (None, Some(max)) => format!("{var} <= {max}"),
        (None, None) => var.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_choice_types() {
        let (ty, values) = ChoiceValue::infer(&["1", "2", "3"]);
        assert_eq!(ty, ArgType::Integer);
        assert_eq!(values[0], ChoiceValue::Integer(1));

        let (ty, values) = ChoiceValue::infer(&["1", "2.5"]);
        assert_eq!(ty, ArgType::Float);
        assert_eq!(values[0], ChoiceValue::Float(1.0));

        let (ty, _) = ChoiceValue::infer(&["red", "2"]);
        assert_eq!(ty, ArgType::String);
    }

    #[test]
    fn choices_and_autocomplete_are_exclusive() {
        let mut arg = Argument::new("q", ArgType::String, false);
        arg.choices = vec!["red".into(), "blue".into()];
        arg.autocomplete = true;
        assert!(matches!(arg.validate(), Err(ConfigError::Exclusive { .. })));
    }

    #[test]
    fn bounds_need_numeric_type() {
        let mut arg = Argument::new("q", ArgType::String, true);
        arg.min = Some(Number::Int(1));
        assert!(matches!(arg.validate(), Err(ConfigError::Predicate(_))));
    }

    #[test]
    fn max_below_min_is_rejected() {
        let mut arg = Argument::new("q", ArgType::Integer, true);
        arg.min = Some(Number::Int(5));
        arg.max = Some(Number::Int(1));
        assert!(matches!(
            arg.validate(),
            Err(ConfigError::BelowMinimum { .. })
        ));
    }

    #[test]
    fn length_bounds_need_string_type() {
        let mut arg = Argument::new("q", ArgType::Integer, true);
        arg.max_length = Some(4);
        assert!(arg.validate().is_err());

        let mut arg = Argument::new("q", ArgType::String, true);
        arg.min_length = Some(3);
        arg.max_length = Some(27);
        assert!(arg.validate().is_ok());
    }

    #[test]
    fn choice_values_must_fit_datatype() {
        let mut arg = Argument::new("q", ArgType::Integer, true);
        arg.choices = vec![ChoiceValue::Integer(1), ChoiceValue::String("x".into())];
        assert!(matches!(
            arg.validate(),
            Err(ConfigError::InvalidType { .. })
        ));
    }

    #[test]
    fn float_arguments_carry_float_literals() {
        let mut arg = Argument::new("mult", ArgType::Float, false);
        arg.min = Some(Number::Int(1));
        arg.choices = Vec::new();
        arg.normalize_literals();
        assert_eq!(arg.min, Some(Number::Float(1.0)));
    }

    #[test]
    fn renders_syntax() {
        let mut arg = Argument::new("count", ArgType::Integer, true);
        arg.min = Some(Number::Int(1));
        arg.max = Some(Number::Int(5));
        assert_eq!(arg.to_syntax(), "<count: 1 <= x <= 5>");

        let mut arg = Argument::new("q", ArgType::String, false);
        arg.autocomplete = true;
        assert_eq!(arg.to_syntax(), "[*q: string]");

        let mut arg = Argument::new("value", ArgType::String, true);
        arg.min_length = Some(3);
        assert_eq!(arg.to_syntax(), "<value: l >= 3>");
    }

    #[test]
    fn numbers_serialize_without_tags() {
        assert_eq!(serde_json::to_string(&Number::Int(3)).unwrap(), "3");
        assert_eq!(
            serde_json::to_string(&ChoiceValue::String("red".into())).unwrap(),
            "\"red\""
        );
    }
}
