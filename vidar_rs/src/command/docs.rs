//! Human-readable references into a command tree, and the documentation
//! entries keyed by them.
//!
//! A reference is written the way the command is typed: `"group add"`,
//! `"group add <name>"`, `"<*hero>"`. Brackets, `*` markers and type
//! annotations are ignored; [`DEFAULT_KEY`] refers to the command itself.

use std::collections::BTreeMap;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::read_document;
use crate::error::{ConfigError, ConfigResult};
use crate::path::{DEFAULT_KEY, PathKey};
use crate::validate::{self, JsonKind};

use super::model::CommandTree;

static TYPE_ANNOTATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r":[^<>\[\]]*").expect("valid annotation regex"));

/// A description, or descriptions per locale with [`DEFAULT_KEY`] as the default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocEntry {
    Text(String),
    Localized(BTreeMap<String, String>),
}

impl From<&str> for DocEntry {
    fn from(text: &str) -> Self {
        DocEntry::Text(text.to_string())
    }
}

impl From<String> for DocEntry {
    fn from(text: String) -> Self {
        DocEntry::Text(text)
    }
}

/// What a reference points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Target {
    Command,
    Subgroup(String),
    Subcommand(PathKey),
    Argument(PathKey, String),
}

/// Split a reference into bare words.
pub fn normalize_reference(raw: &str) -> Vec<String> {
    let stripped = TYPE_ANNOTATION.replace_all(raw, "");
    let cleaned: String = stripped
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();
    cleaned.split_whitespace().map(str::to_string).collect()
}

/// Resolve a reference against the declared tree.
pub(crate) fn resolve(tree: &CommandTree, raw: &str) -> ConfigResult<Target> {
    if raw.trim() == DEFAULT_KEY {
        return Ok(Target::Command);
    }
    let words = normalize_reference(raw);
    let missing = || ConfigError::not_found("documentation reference", raw);
    let target = match words.as_slice() {
        [one] => {
            if tree.subgroup(one).is_some() {
                Target::Subgroup(one.clone())
            } else if tree.subcommand(one).is_some() {
                Target::Subcommand(PathKey::subcommand(one))
            } else if tree.arguments.iter().any(|a| &a.name == one) {
                Target::Argument(PathKey::root(), one.clone())
            } else {
                return Err(missing());
            }
        }
        [first, second] => {
            if let Some(group) = tree.subgroup(first) {
                group.subcommand(second).ok_or_else(missing)?;
                Target::Subcommand(PathKey::nested(first, second))
            } else {
                let sub = tree.subcommand(first).ok_or_else(missing)?;
                sub.argument(second).ok_or_else(missing)?;
                Target::Argument(PathKey::subcommand(first), second.clone())
            }
        }
        [group, sub, arg] => {
            tree.subgroup(group)
                .and_then(|g| g.subcommand(sub))
                .and_then(|s| s.argument(arg))
                .ok_or_else(missing)?;
            Target::Argument(PathKey::nested(group, sub), arg.clone())
        }
        _ => return Err(missing()),
    };
    Ok(target)
}

/// Validate a loaded documentation document and flatten it into entries.
pub(crate) fn entries_from_value(
    value: Value,
    source: &str,
) -> ConfigResult<Vec<(String, DocEntry)>> {
    validate::kind(&value, JsonKind::Object, source)?;
    let Value::Object(map) = value else {
        return Ok(Vec::new());
    };
    let mut entries = Vec::with_capacity(map.len());
    for (key, entry) in map {
        let what = format!("{source} entry '{key}'");
        let entry = match entry {
            Value::String(text) => DocEntry::Text(text),
            Value::Object(locales) => {
                let mut localized = BTreeMap::new();
                for (locale, text) in locales {
                    validate::kind(&text, JsonKind::String, &format!("{what} locale '{locale}'"))?;
                    if let Value::String(text) = text {
                        localized.insert(locale, text);
                    }
                }
                DocEntry::Localized(localized)
            }
            _ => {
                return Err(ConfigError::InvalidType {
                    what,
                    expected: "a string or a locale map".to_string(),
                });
            }
        };
        entries.push((key, entry));
    }
    Ok(entries)
}

pub(crate) fn read_entries(path: &Path) -> ConfigResult<Vec<(String, DocEntry)>> {
    let value = read_document(path)?;
    entries_from_value(value, &format!("docs file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::argument::Argument;
    use crate::command::model::{Node, placeholder_subcommand, placeholder_subgroup};
    use crate::types::ArgType;

    fn tree() -> CommandTree {
        let mut tree = CommandTree::default();
        let mut group = placeholder_subgroup("group");
        let mut add = placeholder_subcommand("add");
        add.arguments.push(Argument::new("name", ArgType::String, true));
        group.subcommands.push(add);
        tree.children.push(Node::Subgroup(group));
        let mut set = placeholder_subcommand("set");
        set.arguments.push(Argument::new("color", ArgType::String, true));
        tree.children.push(Node::Subcommand(set));
        tree
    }

    #[test]
    fn normalizes_references() {
        assert_eq!(normalize_reference("group add <name>"), vec!["group", "add", "name"]);
        assert_eq!(normalize_reference("  <*hero> "), vec!["hero"]);
        assert_eq!(normalize_reference("user get <user: user>"), vec!["user", "get", "user"]);
    }

    #[test]
    fn resolves_targets() {
        let tree = tree();
        assert_eq!(resolve(&tree, DEFAULT_KEY).unwrap(), Target::Command);
        assert_eq!(
            resolve(&tree, "group").unwrap(),
            Target::Subgroup("group".into())
        );
        assert_eq!(
            resolve(&tree, "group add").unwrap(),
            Target::Subcommand(PathKey::nested("group", "add"))
        );
        assert_eq!(
            resolve(&tree, "group add <name>").unwrap(),
            Target::Argument(PathKey::nested("group", "add"), "name".into())
        );
        assert_eq!(
            resolve(&tree, "set [color]").unwrap(),
            Target::Argument(PathKey::subcommand("set"), "color".into())
        );
    }

    #[test]
    fn missing_references_fail() {
        let tree = tree();
        for raw in ["nope", "group remove", "group add <age>", "set <size>", "a b c d", ""] {
            assert!(
                matches!(resolve(&tree, raw), Err(ConfigError::NotFound { .. })),
                "{raw:?} should not resolve"
            );
        }
    }

    #[test]
    fn entries_accept_text_and_locale_maps() {
        let entries = entries_from_value(
            json!({
                "$default": "Subgroup test",
                "group add": { "$default": "Add a group.", "fr": "Ajouter un groupe." }
            }),
            "docs",
        )
        .unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().any(|(_, e)| matches!(e, DocEntry::Localized(m) if m.len() == 2)));
    }

    #[test]
    fn entries_reject_bad_shapes() {
        assert!(matches!(
            entries_from_value(json!(["x"]), "docs"),
            Err(ConfigError::InvalidType { .. })
        ));
        assert!(matches!(
            entries_from_value(json!({ "group": 3 }), "docs"),
            Err(ConfigError::InvalidType { .. })
        ));
        assert!(matches!(
            entries_from_value(json!({ "group": { "fr": 3 } }), "docs"),
            Err(ConfigError::InvalidType { .. })
        ));
    }
}
