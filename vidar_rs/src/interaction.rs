//! Events the router consumes and the capabilities they carry.
//!
//! The transport that produces these events is external. It describes each
//! event as plain data ([`InvocationData`]) and attaches a [`Responder`]
//! (or [`AutocompleteResponder`]) through which the core answers.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use vidar_common::Permission;

use crate::argument::ChoiceValue;
use crate::command::payload::ChoicePayload;
use crate::path::PathKey;

/// A command handler.
pub type HandlerFn = Arc<dyn Fn(Interaction) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// An autocomplete callback returning the suggested values.
pub type AutocompleteFn =
    Arc<dyn Fn(AutocompleteRequest) -> BoxFuture<'static, Result<Vec<ChoiceValue>>> + Send + Sync>;

/// Wrap an async closure as a [`HandlerFn`].
pub fn handler<F, Fut>(f: F) -> HandlerFn
where
    F: Fn(Interaction) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(move |interaction| f(interaction).boxed())
}

/// Wrap an async closure as an [`AutocompleteFn`].
pub fn autocomplete<F, Fut>(f: F) -> AutocompleteFn
where
    F: Fn(AutocompleteRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<ChoiceValue>>> + Send + 'static,
{
    Arc::new(move |request| f(request).boxed())
}

/// A message sent back to the invoking user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub content: String,
    #[serde(default)]
    pub ephemeral: bool,
}

impl Reply {
    pub fn public(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: false,
        }
    }

    /// Visible only to the invoking user.
    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: true,
        }
    }
}

impl From<&str> for Reply {
    fn from(content: &str) -> Self {
        Reply::public(content)
    }
}

impl From<String> for Reply {
    fn from(content: String) -> Self {
        Reply::public(content)
    }
}

#[async_trait]
pub trait Responder: Send + Sync {
    async fn reply(&self, reply: Reply) -> Result<()>;
    async fn defer(&self, ephemeral: bool) -> Result<()>;
    async fn edit_reply(&self, reply: Reply) -> Result<()>;
    async fn follow_up(&self, reply: Reply) -> Result<()>;
}

#[async_trait]
pub trait AutocompleteResponder: Send + Sync {
    async fn respond(&self, choices: Vec<ChoicePayload>) -> Result<()>;
}

/// Argument value as delivered by the transport. Users, roles, channels
/// and attachments arrive as their ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRef {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl ChannelRef {
    pub fn matches(&self, reference: &str) -> bool {
        self.id == reference || (!self.name.is_empty() && self.name == reference)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRef {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// The invoking guild member.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub user_id: String,
    #[serde(default)]
    pub permissions: BTreeSet<Permission>,
    #[serde(default)]
    pub roles: Vec<RoleRef>,
}

impl Member {
    /// Administrator implies every other permission.
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(&Permission::Administrator) || self.permissions.contains(&permission)
    }

    /// Match a role by id or by name.
    pub fn has_role(&self, reference: &str) -> bool {
        self.roles
            .iter()
            .any(|role| role.id == reference || role.name == reference)
    }
}

/// Plain description of an invocation, independent of how it is answered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvocationData {
    pub command: String,
    #[serde(default)]
    pub subgroup: Option<String>,
    #[serde(default)]
    pub subcommand: Option<String>,
    #[serde(default)]
    pub options: BTreeMap<String, OptionValue>,
    #[serde(default)]
    pub channel: Option<ChannelRef>,
    #[serde(default)]
    pub guild_id: Option<String>,
    #[serde(default)]
    pub member: Option<Member>,
}

impl InvocationData {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }

    pub fn with_subgroup(mut self, subgroup: impl Into<String>) -> Self {
        self.subgroup = Some(subgroup.into());
        self
    }

    pub fn with_subcommand(mut self, subcommand: impl Into<String>) -> Self {
        self.subcommand = Some(subcommand.into());
        self
    }

    pub fn with_option(mut self, name: impl Into<String>, value: OptionValue) -> Self {
        self.options.insert(name.into(), value);
        self
    }

    pub fn with_channel(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.channel = Some(ChannelRef {
            id: id.into(),
            name: name.into(),
        });
        self
    }

    pub fn with_guild(mut self, guild_id: impl Into<String>) -> Self {
        self.guild_id = Some(guild_id.into());
        self
    }

    pub fn with_member(mut self, member: Member) -> Self {
        self.member = Some(member);
        self
    }

    /// Handler lookup key; empty segments count as absent.
    pub fn path(&self) -> PathKey {
        PathKey::from_parts(self.subgroup.as_deref(), self.subcommand.as_deref())
    }

    pub fn string(&self, name: &str) -> Option<&str> {
        match self.options.get(name)? {
            OptionValue::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        match self.options.get(name)? {
            OptionValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Number argument; integer values widen.
    pub fn float(&self, name: &str) -> Option<f64> {
        match self.options.get(name)? {
            OptionValue::Float(value) => Some(*value),
            OptionValue::Integer(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn boolean(&self, name: &str) -> Option<bool> {
        match self.options.get(name)? {
            OptionValue::Boolean(value) => Some(*value),
            _ => None,
        }
    }
}

/// How far an invocation has been answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplyState {
    #[default]
    Pending,
    Deferred,
    Replied,
}

/// A command invocation with its reply capability.
#[derive(Clone)]
pub struct Interaction {
    pub data: InvocationData,
    responder: Arc<dyn Responder>,
    state: Arc<Mutex<ReplyState>>,
}

impl std::fmt::Debug for Interaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interaction")
            .field("data", &self.data)
            .field("state", &self.reply_state())
            .finish()
    }
}

impl Interaction {
    pub fn new(data: InvocationData, responder: Arc<dyn Responder>) -> Self {
        Self {
            data,
            responder,
            state: Arc::new(Mutex::new(ReplyState::Pending)),
        }
    }

    pub fn reply_state(&self) -> ReplyState {
        *self.state.lock()
    }

    pub async fn reply(&self, reply: impl Into<Reply>) -> Result<()> {
        self.responder.reply(reply.into()).await?;
        *self.state.lock() = ReplyState::Replied;
        Ok(())
    }

    pub async fn defer(&self, ephemeral: bool) -> Result<()> {
        self.responder.defer(ephemeral).await?;
        let mut state = self.state.lock();
        if *state == ReplyState::Pending {
            *state = ReplyState::Deferred;
        }
        Ok(())
    }

    pub async fn edit_reply(&self, reply: impl Into<Reply>) -> Result<()> {
        self.responder.edit_reply(reply.into()).await?;
        *self.state.lock() = ReplyState::Replied;
        Ok(())
    }

    pub async fn follow_up(&self, reply: impl Into<Reply>) -> Result<()> {
        self.responder.follow_up(reply.into()).await
    }

    /// Send `reply` through whichever channel the current state allows:
    /// edit a deferred reply, follow up an existing one, or reply fresh.
    pub async fn notify(&self, reply: Reply) -> Result<()> {
        match self.reply_state() {
            ReplyState::Deferred => self.edit_reply(reply).await,
            ReplyState::Replied => self.follow_up(reply).await,
            ReplyState::Pending => self.reply(reply).await,
        }
    }

    pub fn path(&self) -> PathKey {
        self.data.path()
    }

    pub fn string(&self, name: &str) -> Option<&str> {
        self.data.string(name)
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        self.data.integer(name)
    }

    pub fn float(&self, name: &str) -> Option<f64> {
        self.data.float(name)
    }

    pub fn boolean(&self, name: &str) -> Option<bool> {
        self.data.boolean(name)
    }
}

/// An autocomplete request for the argument the user is typing.
#[derive(Clone)]
pub struct AutocompleteRequest {
    pub data: InvocationData,
    /// Name of the focused argument.
    pub focused: String,
    /// Text typed so far.
    pub query: String,
    responder: Arc<dyn AutocompleteResponder>,
}

impl std::fmt::Debug for AutocompleteRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutocompleteRequest")
            .field("data", &self.data)
            .field("focused", &self.focused)
            .field("query", &self.query)
            .finish()
    }
}

impl AutocompleteRequest {
    pub fn new(
        data: InvocationData,
        focused: impl Into<String>,
        query: impl Into<String>,
        responder: Arc<dyn AutocompleteResponder>,
    ) -> Self {
        Self {
            data,
            focused: focused.into(),
            query: query.into(),
            responder,
        }
    }

    pub fn path(&self) -> PathKey {
        self.data.path()
    }

    pub async fn respond(&self, choices: Vec<ChoicePayload>) -> Result<()> {
        self.responder.respond(choices).await
    }
}

/// What the transport delivers to the router.
#[derive(Debug, Clone)]
pub enum Event {
    Invocation(Interaction),
    Autocomplete(AutocompleteRequest),
}
