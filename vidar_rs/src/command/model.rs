//! The sealed command model.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use vidar_common::Permission;

use crate::argument::{Argument, PLACEHOLDER_DESCRIPTION};
use crate::error::{ConfigError, ConfigResult};
use crate::interaction::{AutocompleteFn, HandlerFn};
use crate::path::PathKey;
use crate::validate;

use super::payload::CommandPayload;

#[derive(Debug, Clone, PartialEq)]
pub struct SubcommandNode {
    pub name: String,
    pub description: String,
    pub localizations: BTreeMap<String, String>,
    pub arguments: Vec<Argument>,
}

impl SubcommandNode {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            localizations: BTreeMap::new(),
            arguments: Vec::new(),
        }
    }

    pub fn argument(&self, name: &str) -> Option<&Argument> {
        self.arguments.iter().find(|a| a.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubgroupNode {
    pub name: String,
    pub description: String,
    pub localizations: BTreeMap<String, String>,
    pub subcommands: Vec<SubcommandNode>,
}

impl SubgroupNode {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            localizations: BTreeMap::new(),
            subcommands: Vec::new(),
        }
    }

    pub fn subcommand(&self, name: &str) -> Option<&SubcommandNode> {
        self.subcommands.iter().find(|s| s.name == name)
    }
}

/// A direct child of the command root.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Subcommand(SubcommandNode),
    Subgroup(SubgroupNode),
}

impl Node {
    pub fn name(&self) -> &str {
        match self {
            Node::Subcommand(node) => &node.name,
            Node::Subgroup(node) => &node.name,
        }
    }
}

/// Root arguments plus subcommands and subgroups, in declaration order.
/// The platform forbids having both root arguments and children.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandTree {
    pub arguments: Vec<Argument>,
    pub children: Vec<Node>,
}

impl CommandTree {
    pub fn subgroup(&self, name: &str) -> Option<&SubgroupNode> {
        self.children.iter().find_map(|node| match node {
            Node::Subgroup(group) if group.name == name => Some(group),
            _ => None,
        })
    }

    pub fn subcommand(&self, name: &str) -> Option<&SubcommandNode> {
        self.children.iter().find_map(|node| match node {
            Node::Subcommand(sub) if sub.name == name => Some(sub),
            _ => None,
        })
    }

    pub(crate) fn subgroup_mut(&mut self, name: &str) -> Option<&mut SubgroupNode> {
        self.children.iter_mut().find_map(|node| match node {
            Node::Subgroup(group) if group.name == name => Some(group),
            _ => None,
        })
    }

    pub(crate) fn subcommand_mut(&mut self, path: &PathKey) -> Option<&mut SubcommandNode> {
        let name = path.subcommand.as_deref()?;
        match path.subgroup.as_deref() {
            Some(group) => self
                .subgroup_mut(group)?
                .subcommands
                .iter_mut()
                .find(|s| s.name == name),
            None => self.children.iter_mut().find_map(|node| match node {
                Node::Subcommand(sub) if sub.name == name => Some(sub),
                _ => None,
            }),
        }
    }

    pub fn has_child(&self, name: &str) -> bool {
        self.children.iter().any(|node| node.name() == name)
    }

    /// Whether `path` names a declared node.
    pub fn contains(&self, path: &PathKey) -> bool {
        match (path.subgroup.as_deref(), path.subcommand.as_deref()) {
            (None, None) => true,
            (Some(group), None) => self.subgroup(group).is_some(),
            (None, Some(sub)) => self.subcommand(sub).is_some(),
            (Some(group), Some(sub)) => self
                .subgroup(group)
                .is_some_and(|g| g.subcommand(sub).is_some()),
        }
    }

    /// Arguments declared at `path`.
    pub fn arguments(&self, path: &PathKey) -> Option<&[Argument]> {
        match (path.subgroup.as_deref(), path.subcommand.as_deref()) {
            (None, None) => Some(&self.arguments),
            (Some(_), None) => None,
            (None, Some(sub)) => self.subcommand(sub).map(|s| s.arguments.as_slice()),
            (Some(group), Some(sub)) => self
                .subgroup(group)
                .and_then(|g| g.subcommand(sub))
                .map(|s| s.arguments.as_slice()),
        }
    }

    pub(crate) fn arguments_mut(&mut self, path: &PathKey) -> Option<&mut Vec<Argument>> {
        if path.is_root() {
            return Some(&mut self.arguments);
        }
        self.subcommand_mut(path).map(|s| &mut s.arguments)
    }

    /// Every node address with its arguments, root first.
    pub fn nodes(&self) -> Vec<(PathKey, &[Argument])> {
        let mut nodes = vec![(PathKey::root(), self.arguments.as_slice())];
        for child in &self.children {
            match child {
                Node::Subcommand(sub) => {
                    nodes.push((PathKey::subcommand(&sub.name), sub.arguments.as_slice()));
                }
                Node::Subgroup(group) => {
                    for sub in &group.subcommands {
                        nodes.push((
                            PathKey::nested(&group.name, &sub.name),
                            sub.arguments.as_slice(),
                        ));
                    }
                }
            }
        }
        nodes
    }

    /// Platform structure rules that span nodes.
    pub fn check_structure(&self) -> ConfigResult<()> {
        validate::predicate(
            !self.arguments.is_empty() && !self.children.is_empty(),
            "a command with subcommands or subgroups cannot take root-level arguments",
        )?;
        validate::range(
            self.children.len() as f64,
            "subcommand and subgroup count",
            0.0,
            validate::MAX_OPTIONS as f64,
        )?;
        for child in &self.children {
            if let Node::Subgroup(group) = child {
                validate::range(
                    group.subcommands.len() as f64,
                    &format!("subcommand count of '{}'", group.name),
                    0.0,
                    validate::MAX_OPTIONS as f64,
                )?;
            }
        }
        for (path, arguments) in self.nodes() {
            validate::range(
                arguments.len() as f64,
                &format!("argument count of '{path}'"),
                0.0,
                validate::MAX_OPTIONS as f64,
            )?;
            if let Some(pos) = arguments.iter().position(|a| !a.required)
                && let Some(late) = arguments[pos..].iter().find(|a| a.required)
            {
                return Err(ConfigError::Predicate(format!(
                    "required argument '{}' cannot follow optional argument '{}'",
                    late.name, arguments[pos].name
                )));
            }
        }
        Ok(())
    }
}

/// Access requirement: a platform permission or a role.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Requirement {
    Permission(Permission),
    /// Role name or id.
    Role(String),
}

impl Requirement {
    /// `@Name` is always a role; other permission spellings are permissions;
    /// everything else is a role name or id.
    pub fn parse(raw: &str) -> ConfigResult<Requirement> {
        let raw = raw.trim();
        validate::not_blank(raw, "requirement")?;
        if let Some(role) = raw.strip_prefix('@') {
            validate::not_blank(role, "role name after '@'")?;
            return Ok(Requirement::Role(role.to_string()));
        }
        Ok(match raw.parse::<Permission>() {
            Ok(permission) => Requirement::Permission(permission),
            Err(_) => Requirement::Role(raw.to_string()),
        })
    }
}

/// Path-keyed handlers with an optional catch-all.
#[derive(Clone, Default)]
pub struct RouteTable {
    pub(crate) routes: HashMap<PathKey, HandlerFn>,
    pub(crate) default: Option<HandlerFn>,
}

impl RouteTable {
    pub fn len(&self) -> usize {
        self.routes.len() + usize::from(self.default.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Exact path, then the path's subgroup alone, then the default.
    pub fn resolve(&self, path: &PathKey) -> Option<&HandlerFn> {
        if !path.is_root()
            && let Some(handler) = self.routes.get(path)
        {
            return Some(handler);
        }
        if let Some(group) = path.group_only()
            && let Some(handler) = self.routes.get(&group)
        {
            return Some(handler);
        }
        self.default.as_ref()
    }
}

#[derive(Clone)]
pub enum Handler {
    Single(HandlerFn),
    Routes(RouteTable),
}

impl Handler {
    pub fn resolve(&self, path: &PathKey) -> Option<&HandlerFn> {
        match self {
            Handler::Single(handler) => Some(handler),
            Handler::Routes(table) => table.resolve(path),
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Single(_) => f.write_str("Handler::Single"),
            Handler::Routes(table) => {
                let mut keys: Vec<String> = table.routes.keys().map(PathKey::to_string).collect();
                keys.sort();
                f.debug_struct("Handler::Routes")
                    .field("routes", &keys)
                    .field("default", &table.default.is_some())
                    .finish()
            }
        }
    }
}

/// A sealed, immutable command.
pub struct CommandSpec {
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) localizations: BTreeMap<String, String>,
    pub(crate) tree: CommandTree,
    pub(crate) autocomplete: HashMap<(PathKey, String), AutocompleteFn>,
    pub(crate) autocomplete_fallback: Option<AutocompleteFn>,
    pub(crate) permissions: BTreeSet<Permission>,
    pub(crate) roles: BTreeSet<String>,
    pub(crate) channels: BTreeSet<String>,
    pub(crate) guilds: BTreeSet<String>,
    pub(crate) handler: Handler,
    pub(crate) payload: CommandPayload,
}

impl CommandSpec {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn localizations(&self) -> &BTreeMap<String, String> {
        &self.localizations
    }

    pub fn tree(&self) -> &CommandTree {
        &self.tree
    }

    pub fn permissions(&self) -> &BTreeSet<Permission> {
        &self.permissions
    }

    pub fn roles(&self) -> &BTreeSet<String> {
        &self.roles
    }

    pub fn channels(&self) -> &BTreeSet<String> {
        &self.channels
    }

    /// Guild ids or names the command is limited to; empty means global.
    pub fn guilds(&self) -> &BTreeSet<String> {
        &self.guilds
    }

    pub fn is_global(&self) -> bool {
        self.guilds.is_empty()
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    pub fn payload(&self) -> &CommandPayload {
        &self.payload
    }

    /// Callback for `argument` at `path`, falling back to the catch-all.
    pub fn autocomplete_for(&self, path: &PathKey, argument: &str) -> Option<&AutocompleteFn> {
        self.autocomplete
            .get(&(path.clone(), argument.to_string()))
            .or(self.autocomplete_fallback.as_ref())
    }

    pub fn arguments(&self, path: &PathKey) -> Option<&[Argument]> {
        self.tree.arguments(path)
    }
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSpec")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("tree", &self.tree)
            .field("autocomplete", &self.autocomplete.len())
            .field("permissions", &self.permissions)
            .field("roles", &self.roles)
            .field("channels", &self.channels)
            .field("guilds", &self.guilds)
            .field("handler", &self.handler)
            .finish()
    }
}

/// Nodes created by a declaration that names a path not declared yet.
pub(crate) fn placeholder_subcommand(name: &str) -> SubcommandNode {
    SubcommandNode::new(name, PLACEHOLDER_DESCRIPTION)
}

pub(crate) fn placeholder_subgroup(name: &str) -> SubgroupNode {
    SubgroupNode::new(name, PLACEHOLDER_DESCRIPTION)
}
