//! Fluent command builder.
//!
//! Every configuration call validates its input before touching the draft.
//! The first failure poisons the builder: later calls are skipped and the
//! terminal [`CommandBuilder::action`] / [`CommandBuilder::actions`] returns
//! that error.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};
use vidar_common::{Permission, is_locale};

use crate::argument::{Argument, ChoiceValue, Number, PLACEHOLDER_DESCRIPTION};
use crate::error::{ConfigError, ConfigResult};
use crate::interaction::{
    AutocompleteFn, AutocompleteRequest, HandlerFn, Interaction, autocomplete, handler,
};
use crate::path::{DEFAULT_KEY, PathKey};
use crate::registry::Registry;
use crate::syntax::{Declaration, parse_declaration, parse_single};
use crate::types::ArgType;
use crate::validate;

use super::docs::{self, DocEntry, Target};
use super::model::{
    CommandSpec, CommandTree, Handler, Node, Requirement, RouteTable, SubcommandNode,
    SubgroupNode, placeholder_subcommand, placeholder_subgroup,
};
use super::payload;

/// An argument declared with extra properties the syntax string cannot carry.
#[derive(Debug, Clone, Default)]
pub struct ArgumentOptions {
    /// Declaration with exactly one argument, e.g. `"sub [name: float]"`.
    pub syntax: String,
    pub description: Option<String>,
    /// Typed choices. These decide the datatype when the syntax leaves it as string.
    pub choices: Option<Vec<ChoiceValue>>,
    pub min: Option<Number>,
    pub max: Option<Number>,
    pub min_length: Option<u16>,
    pub max_length: Option<u16>,
    pub autocomplete: Option<bool>,
}

impl ArgumentOptions {
    pub fn new(syntax: impl Into<String>) -> Self {
        Self {
            syntax: syntax.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_choices<I, C>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ChoiceValue>,
    {
        self.choices = Some(choices.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_min(mut self, min: impl Into<Number>) -> Self {
        self.min = Some(min.into());
        self
    }

    pub fn with_max(mut self, max: impl Into<Number>) -> Self {
        self.max = Some(max.into());
        self
    }

    pub fn with_min_length(mut self, min: u16) -> Self {
        self.min_length = Some(min);
        self
    }

    pub fn with_max_length(mut self, max: u16) -> Self {
        self.max_length = Some(max);
        self
    }

    pub fn with_autocomplete(mut self, enabled: bool) -> Self {
        self.autocomplete = Some(enabled);
        self
    }

    fn into_argument(self) -> ConfigResult<(PathKey, Argument)> {
        let (path, mut arg) = parse_single(&self.syntax)?;
        let subject = arg.name.clone();

        if let Some(description) = self.description {
            validate::description(&description, &format!("argument '{subject}'"))?;
            arg.description = description;
        }

        if let Some(choices) = self.choices {
            validate::exclusive(
                true,
                self.autocomplete == Some(true),
                &subject,
                "choices",
                "autocomplete",
            )?;
            if arg.autocomplete {
                debug!(argument = %subject, "choices take precedence over autocomplete");
                arg.autocomplete = false;
            }
            if arg.datatype == ArgType::String {
                arg.datatype = choice_datatype(&subject, &choices)?;
            }
            arg.choices = choices;
        }

        if self.min.is_some() {
            arg.min = self.min;
        }
        if self.max.is_some() {
            arg.max = self.max;
        }
        if self.min_length.is_some() {
            arg.min_length = self.min_length;
        }
        if self.max_length.is_some() {
            arg.max_length = self.max_length;
        }
        if let Some(enabled) = self.autocomplete {
            arg.autocomplete = enabled;
        }
        arg.normalize_literals();
        Ok((path, arg))
    }
}

/// Shared datatype of typed choices; integers widen to floats when mixed.
fn choice_datatype(subject: &str, choices: &[ChoiceValue]) -> ConfigResult<ArgType> {
    let mut datatype: Option<ArgType> = None;
    for choice in choices {
        let next = choice.datatype();
        datatype = Some(match (datatype, next) {
            (None, next) => next,
            (Some(current), next) if current == next => current,
            (Some(ArgType::Integer), ArgType::Float) | (Some(ArgType::Float), ArgType::Integer) => {
                ArgType::Float
            }
            (Some(current), _) => {
                return Err(ConfigError::InvalidType {
                    what: format!("choice '{choice}' of argument '{subject}'"),
                    expected: format!("a {current} literal"),
                });
            }
        });
    }
    Ok(datatype.unwrap_or(ArgType::String))
}

/// Path-keyed handlers for [`CommandBuilder::actions`].
///
/// Keys use the reference syntax (`"group add"`, `"group"`, `"set"`) or
/// [`DEFAULT_KEY`] for the catch-all.
#[derive(Clone, Default)]
pub struct HandlerMap {
    routes: Vec<(String, HandlerFn)>,
}

impl HandlerMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route<F, Fut>(self, key: impl Into<String>, f: F) -> Self
    where
        F: Fn(Interaction) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.route_fn(key, handler(f))
    }

    pub fn route_fn(mut self, key: impl Into<String>, handler: HandlerFn) -> Self {
        self.routes.push((key.into(), handler));
        self
    }

    /// Catch-all for paths with no more specific route.
    pub fn fallback<F, Fut>(self, f: F) -> Self
    where
        F: Fn(Interaction) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.route(DEFAULT_KEY, f)
    }
}

enum PendingHandler {
    Single(HandlerFn),
    Map(HandlerMap),
}

struct Draft {
    name: String,
    description: String,
    localizations: BTreeMap<String, String>,
    tree: CommandTree,
    docs: Vec<(String, DocEntry)>,
    autocomplete: Vec<(String, AutocompleteFn)>,
    autocomplete_fallback: Option<AutocompleteFn>,
    permissions: BTreeSet<Permission>,
    roles: BTreeSet<String>,
    channels: BTreeSet<String>,
    guilds: BTreeSet<String>,
}

impl Draft {
    fn add_subgroup(&mut self, name: &str, description: &str) -> ConfigResult<()> {
        validate::slash_name(name, "subgroup")?;
        validate::description(description, &format!("subgroup '{name}'"))?;
        validate::not_duplicate(self.tree.has_child(name), "subgroup", name)?;
        self.forbid_root_arguments(name)?;
        self.tree
            .children
            .push(Node::Subgroup(SubgroupNode::new(name, description)));
        Ok(())
    }

    fn add_subcommand(&mut self, path: &PathKey, description: &str) -> ConfigResult<()> {
        let name = validate::exists(path.subcommand.as_deref(), "subcommand name")?;
        validate::description(description, &format!("subcommand '{path}'"))?;
        self.insert_subcommand(path, SubcommandNode::new(name, description))
    }

    /// Create the node a declaration names before it has been described.
    fn add_placeholder(&mut self, path: &PathKey) -> ConfigResult<()> {
        let name = validate::exists(path.subcommand.as_deref(), "subcommand name")?;
        self.insert_subcommand(path, placeholder_subcommand(name))
    }

    fn insert_subcommand(&mut self, path: &PathKey, node: SubcommandNode) -> ConfigResult<()> {
        let name = node.name.clone();
        let name = name.as_str();
        validate::slash_name(name, "subcommand")?;

        let Some(group) = path.subgroup.as_deref() else {
            validate::not_duplicate(self.tree.has_child(name), "subcommand", name)?;
            self.forbid_root_arguments(name)?;
            self.tree.children.push(Node::Subcommand(node));
            return Ok(());
        };

        if self.tree.subgroup(group).is_none() {
            validate::predicate(
                self.tree.subcommand(group).is_some(),
                format!("'{group}' is a subcommand and cannot contain subcommand '{name}'"),
            )?;
            validate::slash_name(group, "subgroup")?;
            self.forbid_root_arguments(group)?;
            self.tree
                .children
                .push(Node::Subgroup(placeholder_subgroup(group)));
        }
        let subgroup = self
            .tree
            .subgroup_mut(group)
            .ok_or_else(|| ConfigError::not_found("subgroup", group))?;
        validate::not_duplicate(
            subgroup.subcommand(name).is_some(),
            "subcommand",
            &path.to_string(),
        )?;
        subgroup.subcommands.push(node);
        Ok(())
    }

    fn forbid_root_arguments(&self, child: &str) -> ConfigResult<()> {
        validate::predicate(
            !self.tree.arguments.is_empty(),
            format!(
                "cannot add '{child}' to '{}': a command with root-level arguments cannot have subcommands or subgroups",
                self.name
            ),
        )
    }

    fn declare(&mut self, declaration: Declaration) -> ConfigResult<()> {
        let Declaration { path, arguments } = declaration;
        if arguments.is_empty() {
            return self.add_placeholder(&path);
        }
        if path.is_root() {
            validate::predicate(
                !self.tree.children.is_empty(),
                format!(
                    "'{}' has subcommands or subgroups and cannot take root-level arguments",
                    self.name
                ),
            )?;
        } else if !self.tree.contains(&path) {
            self.add_placeholder(&path)?;
        }
        for arg in arguments {
            self.add_argument(&path, arg)?;
        }
        Ok(())
    }

    fn add_argument(&mut self, path: &PathKey, arg: Argument) -> ConfigResult<()> {
        arg.validate()?;
        let args = self
            .tree
            .arguments_mut(path)
            .ok_or_else(|| ConfigError::not_found("subcommand", path.to_string()))?;
        let qualified = format!("{path} {}", arg.name);
        validate::not_duplicate(
            args.iter().any(|a| a.name == arg.name),
            "argument",
            qualified.trim(),
        )?;
        if arg.required
            && let Some(last) = args.last()
        {
            validate::predicate(
                !last.required,
                format!(
                    "required argument '{}' cannot follow optional argument '{}'",
                    arg.name, last.name
                ),
            )?;
        }
        validate::range(
            (args.len() + 1) as f64,
            &format!("argument count of '{}'", qualified.trim()),
            1.0,
            validate::MAX_OPTIONS as f64,
        )?;
        args.push(arg);
        Ok(())
    }

    fn require(&mut self, raw: &str) -> ConfigResult<()> {
        match Requirement::parse(raw)? {
            Requirement::Permission(permission) => {
                self.permissions.insert(permission);
            }
            Requirement::Role(role) => {
                self.roles.insert(role);
            }
        }
        Ok(())
    }

    fn localize(&mut self, locale: &str, description: &str) -> ConfigResult<()> {
        validate::has_entry(is_locale(locale), "locale", locale)?;
        validate::description(description, &format!("{locale} description of '{}'", self.name))?;
        self.localizations
            .insert(locale.to_string(), description.to_string());
        Ok(())
    }

    fn set_autocomplete(&mut self, key: &str, callback: AutocompleteFn) -> ConfigResult<()> {
        validate::not_blank(key, "autocomplete key")?;
        if key.trim() == DEFAULT_KEY {
            validate::not_duplicate(
                self.autocomplete_fallback.is_some(),
                "autocomplete callback",
                DEFAULT_KEY,
            )?;
            self.autocomplete_fallback = Some(callback);
        } else {
            self.autocomplete.push((key.to_string(), callback));
        }
        Ok(())
    }

    fn apply_docs(&mut self) -> ConfigResult<()> {
        for (key, entry) in std::mem::take(&mut self.docs) {
            let target = docs::resolve(&self.tree, &key)?;
            let (default, locales) = split_entry(&key, entry)?;
            let (description, localizations) = match &target {
                Target::Command => (&mut self.description, &mut self.localizations),
                Target::Subgroup(name) => {
                    let node = self
                        .tree
                        .subgroup_mut(name)
                        .ok_or_else(|| ConfigError::not_found("subgroup", name.as_str()))?;
                    (&mut node.description, &mut node.localizations)
                }
                Target::Subcommand(path) => {
                    let node = self
                        .tree
                        .subcommand_mut(path)
                        .ok_or_else(|| ConfigError::not_found("subcommand", path.to_string()))?;
                    (&mut node.description, &mut node.localizations)
                }
                Target::Argument(path, name) => {
                    let arg = self
                        .tree
                        .arguments_mut(path)
                        .and_then(|args| args.iter_mut().find(|a| &a.name == name))
                        .ok_or_else(|| ConfigError::not_found("argument", key.as_str()))?;
                    (&mut arg.description, &mut arg.localizations)
                }
            };
            if let Some(default) = default {
                *description = default;
            }
            localizations.extend(locales);
        }
        Ok(())
    }

    fn resolve_autocomplete(&self) -> ConfigResult<HashMap<(PathKey, String), AutocompleteFn>> {
        let mut resolved = HashMap::new();
        for (key, callback) in &self.autocomplete {
            let Target::Argument(path, name) = docs::resolve(&self.tree, key)? else {
                return Err(ConfigError::Predicate(format!(
                    "autocomplete key '{key}' must name an argument"
                )));
            };
            let declared = self
                .tree
                .arguments(&path)
                .and_then(|args| args.iter().find(|a| a.name == name))
                .is_some_and(|a| a.autocomplete);
            validate::predicate(
                !declared,
                format!("argument '{key}' must be declared with '*' to take an autocomplete callback"),
            )?;
            let slot = (path, name);
            validate::not_duplicate(resolved.contains_key(&slot), "autocomplete callback", key)?;
            resolved.insert(slot, callback.clone());
        }

        if self.autocomplete_fallback.is_none() {
            for (path, args) in self.tree.nodes() {
                for arg in args.iter().filter(|a| a.autocomplete) {
                    if !resolved.contains_key(&(path.clone(), arg.name.clone())) {
                        warn!(
                            command = %self.name,
                            argument = %arg.name,
                            "autocomplete argument has no callback"
                        );
                    }
                }
            }
        }
        Ok(resolved)
    }

    fn resolve_routes(&self, map: HandlerMap) -> ConfigResult<RouteTable> {
        let mut table = RouteTable::default();
        for (key, route) in map.routes {
            if key.trim() == DEFAULT_KEY {
                validate::not_duplicate(table.default.is_some(), "handler route", DEFAULT_KEY)?;
                table.default = Some(route);
                continue;
            }
            let words = docs::normalize_reference(&key);
            let path = match words.as_slice() {
                [one] if self.tree.subgroup(one).is_some() => PathKey::group(one),
                [one] => PathKey::subcommand(one),
                [group, sub] => PathKey::nested(group, sub),
                _ => return Err(ConfigError::not_found("handler route", key)),
            };
            validate::has_entry(self.tree.contains(&path), "handler route", &key)?;
            validate::not_duplicate(table.routes.contains_key(&path), "handler route", &key)?;
            table.routes.insert(path, route);
        }
        Ok(table)
    }

    fn seal(mut self, pending: PendingHandler) -> ConfigResult<CommandSpec> {
        self.apply_docs()?;
        validate::description(&self.description, &format!("command '{}'", self.name))?;
        self.tree.check_structure()?;
        for (_, args) in self.tree.nodes() {
            for arg in args {
                arg.validate()?;
            }
        }
        let autocomplete = self.resolve_autocomplete()?;
        let handler = match pending {
            PendingHandler::Single(handler) => Handler::Single(handler),
            PendingHandler::Map(map) => Handler::Routes(self.resolve_routes(map)?),
        };
        let permissions: Vec<Permission> = self.permissions.iter().copied().collect();
        let payload = payload::compile(
            &self.name,
            &self.description,
            &self.localizations,
            &self.tree,
            &permissions,
        );
        debug!(command = %self.name, "sealed command");
        Ok(CommandSpec {
            name: self.name,
            description: self.description,
            localizations: self.localizations,
            tree: self.tree,
            autocomplete,
            autocomplete_fallback: self.autocomplete_fallback,
            permissions: self.permissions,
            roles: self.roles,
            channels: self.channels,
            guilds: self.guilds,
            handler,
            payload,
        })
    }
}

type Described = (Option<String>, BTreeMap<String, String>);

/// Split an entry into its default description and per-locale descriptions.
fn split_entry(key: &str, entry: DocEntry) -> ConfigResult<Described> {
    let what = format!("docs entry '{key}'");
    match entry {
        DocEntry::Text(text) => {
            validate::description(&text, &what)?;
            Ok((Some(text), BTreeMap::new()))
        }
        DocEntry::Localized(mut map) => {
            let default = map.remove(DEFAULT_KEY);
            if let Some(text) = &default {
                validate::description(text, &what)?;
            }
            for (locale, text) in &map {
                validate::has_entry(is_locale(locale), "locale", locale)?;
                validate::description(text, &format!("{what} ({locale})"))?;
            }
            Ok((default, map))
        }
    }
}

/// Fluent, consuming builder for one command. Obtain one from
/// [`Registry::command`] to have the sealed command registered.
#[must_use = "a command is only registered by its terminal action() or actions() call"]
pub struct CommandBuilder {
    draft: Draft,
    registry: Option<Registry>,
    error: Option<ConfigError>,
}

impl CommandBuilder {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let name = name.into();
        let error = validate::slash_name(&name, "command").err();
        Self {
            draft: Draft {
                name,
                description: description.into(),
                localizations: BTreeMap::new(),
                tree: CommandTree::default(),
                docs: Vec::new(),
                autocomplete: Vec::new(),
                autocomplete_fallback: None,
                permissions: BTreeSet::new(),
                roles: BTreeSet::new(),
                channels: BTreeSet::new(),
                guilds: BTreeSet::new(),
            },
            registry: None,
            error,
        }
    }

    pub(crate) fn attach(mut self, registry: Registry) -> Self {
        self.registry = Some(registry);
        self
    }

    fn apply(mut self, step: impl FnOnce(&mut Draft) -> ConfigResult<()>) -> Self {
        if self.error.is_none()
            && let Err(err) = step(&mut self.draft)
        {
            self.error = Some(err);
        }
        self
    }

    pub fn description(self, description: impl Into<String>) -> Self {
        let description = description.into();
        self.apply(|draft| {
            validate::description(&description, &format!("command '{}'", draft.name))?;
            draft.description = description;
            Ok(())
        })
    }

    pub fn localize(self, locale: &str, description: &str) -> Self {
        self.apply(|draft| draft.localize(locale, description))
    }

    pub fn subgroup(self, name: &str, description: &str) -> Self {
        self.apply(|draft| draft.add_subgroup(name, description))
    }

    /// Declare a subcommand by path (`"add"` or `"group add"`).
    pub fn subcommand(self, path: &str, description: &str) -> Self {
        self.apply(|draft| {
            let words: Vec<&str> = path.split_whitespace().collect();
            let key = match words.as_slice() {
                [sub] => PathKey::subcommand(*sub),
                [group, sub] => PathKey::nested(*group, *sub),
                _ => {
                    return Err(ConfigError::grammar(
                        path,
                        "a subcommand path is one or two words",
                    ));
                }
            };
            draft.add_subcommand(&key, description)
        })
    }

    /// Declare several subcommands with placeholder descriptions.
    pub fn subcommands<'a>(mut self, paths: impl IntoIterator<Item = &'a str>) -> Self {
        for path in paths {
            self = self.subcommand(path, PLACEHOLDER_DESCRIPTION);
        }
        self
    }

    /// Declare arguments, a path, or both, e.g. `"set <color> [msg]"` or `"get"`.
    pub fn argument(self, syntax: &str) -> Self {
        self.apply(|draft| draft.declare(parse_declaration(syntax)?))
    }

    pub fn arguments<'a>(mut self, syntaxes: impl IntoIterator<Item = &'a str>) -> Self {
        for syntax in syntaxes {
            self = self.argument(syntax);
        }
        self
    }

    /// Declare one argument with properties beyond the syntax string.
    pub fn argument_with(self, options: ArgumentOptions) -> Self {
        self.apply(|draft| {
            let (path, arg) = options.into_argument()?;
            draft.declare(Declaration {
                path,
                arguments: vec![arg],
            })
        })
    }

    /// Require a permission (`"MANAGE_GUILD"`) or a role (`"@Moderator"`, `"Moderator"`, an id).
    pub fn require(self, requirement: &str) -> Self {
        self.apply(|draft| draft.require(requirement))
    }

    pub fn requires<'a>(mut self, requirements: impl IntoIterator<Item = &'a str>) -> Self {
        for requirement in requirements {
            self = self.require(requirement);
        }
        self
    }

    /// Allow the command in a channel (id or name). Without any, all channels are allowed.
    pub fn channel(self, channel: &str) -> Self {
        self.apply(|draft| {
            validate::not_blank(channel, "channel")?;
            draft.channels.insert(channel.trim().to_string());
            Ok(())
        })
    }

    pub fn channels<'a>(mut self, channels: impl IntoIterator<Item = &'a str>) -> Self {
        for channel in channels {
            self = self.channel(channel);
        }
        self
    }

    /// Register the command in a guild (id or name) instead of globally.
    pub fn guild(self, guild: &str) -> Self {
        self.apply(|draft| {
            validate::not_blank(guild, "guild")?;
            draft.guilds.insert(guild.trim().to_string());
            Ok(())
        })
    }

    pub fn guilds<'a>(mut self, guilds: impl IntoIterator<Item = &'a str>) -> Self {
        for guild in guilds {
            self = self.guild(guild);
        }
        self
    }

    /// Documentation keyed by reference. Applied when the command is sealed.
    pub fn docs<K, V>(self, entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<DocEntry>,
    {
        let entries: Vec<(String, DocEntry)> = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.apply(|draft| {
            draft.docs.extend(entries);
            Ok(())
        })
    }

    /// Documentation read from a JSON, YAML or TOML file.
    pub fn docs_file(self, path: impl AsRef<Path>) -> Self {
        self.apply(|draft| {
            draft.docs.extend(docs::read_entries(path.as_ref())?);
            Ok(())
        })
    }

    /// Autocomplete callback for an argument declared with `*`, or a catch-all
    /// under [`DEFAULT_KEY`].
    pub fn autocomplete<F, Fut>(self, key: &str, f: F) -> Self
    where
        F: Fn(AutocompleteRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Vec<ChoiceValue>>> + Send + 'static,
    {
        let callback = autocomplete(f);
        self.apply(|draft| draft.set_autocomplete(key, callback))
    }

    pub fn autocomplete_all<F, Fut>(self, f: F) -> Self
    where
        F: Fn(AutocompleteRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Vec<ChoiceValue>>> + Send + 'static,
    {
        self.autocomplete(DEFAULT_KEY, f)
    }

    /// Seal the command with a single handler.
    pub fn action<F, Fut>(self, f: F) -> ConfigResult<Arc<CommandSpec>>
    where
        F: Fn(Interaction) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.finish(PendingHandler::Single(handler(f)))
    }

    /// Seal the command with path-keyed handlers.
    pub fn actions(self, map: HandlerMap) -> ConfigResult<Arc<CommandSpec>> {
        self.finish(PendingHandler::Map(map))
    }

    fn finish(self, pending: PendingHandler) -> ConfigResult<Arc<CommandSpec>> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let spec = self.draft.seal(pending)?;
        match self.registry {
            Some(registry) => registry.seal(spec),
            None => Ok(Arc::new(spec)),
        }
    }
}

#[cfg(test)]
mod tests;
