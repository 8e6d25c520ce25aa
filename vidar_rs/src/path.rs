//! Structured addresses inside a command tree.

use std::fmt;

/// Sentinel map key for "the command itself" in docs and for catch-all
/// handler and autocomplete entries. `$` is not a legal name character, so
/// it can never collide with a declared subgroup, subcommand or argument.
pub const DEFAULT_KEY: &str = "$default";

/// `(subgroup?, subcommand?)` address of a node. The empty key is the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathKey {
    pub subgroup: Option<String>,
    pub subcommand: Option<String>,
}

impl PathKey {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn subcommand(name: impl Into<String>) -> Self {
        Self {
            subgroup: None,
            subcommand: Some(name.into()),
        }
    }

    /// A subgroup with no subcommand selected.
    pub fn group(name: impl Into<String>) -> Self {
        Self {
            subgroup: Some(name.into()),
            subcommand: None,
        }
    }

    pub fn nested(subgroup: impl Into<String>, subcommand: impl Into<String>) -> Self {
        Self {
            subgroup: Some(subgroup.into()),
            subcommand: Some(subcommand.into()),
        }
    }

    /// Build from event fields, where empty strings mean "absent".
    pub fn from_parts(subgroup: Option<&str>, subcommand: Option<&str>) -> Self {
        let present = |s: Option<&str>| s.filter(|v| !v.trim().is_empty()).map(str::to_string);
        Self {
            subgroup: present(subgroup),
            subcommand: present(subcommand),
        }
    }

    pub fn is_root(&self) -> bool {
        self.subgroup.is_none() && self.subcommand.is_none()
    }

    /// The same key with the subcommand dropped.
    pub fn group_only(&self) -> Option<PathKey> {
        self.subgroup.as_ref().map(PathKey::group)
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.subgroup, &self.subcommand) {
            (Some(group), Some(sub)) => write!(f, "{group} {sub}"),
            (Some(group), None) => f.write_str(group),
            (None, Some(sub)) => f.write_str(sub),
            (None, None) => Ok(()),
        }
    }
}
