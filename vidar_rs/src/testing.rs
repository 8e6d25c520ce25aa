//! Recording doubles for the transport traits, shared by unit tests.

use std::sync::Arc;

use anyhow::{Result, bail};
use async_trait::async_trait;
use parking_lot::Mutex;

use crate::command::{ChoicePayload, CommandPayload};
use crate::interaction::{AutocompleteResponder, Reply, Responder};
use crate::registry::{CommandRegistrar, GuildContext, Scope};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Reply(Reply),
    Defer,
    Edit(Reply),
    FollowUp(Reply),
}

#[derive(Default)]
pub struct RecordingResponder {
    pub sent: Mutex<Vec<Sent>>,
}

impl RecordingResponder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().clone()
    }

    pub fn contents(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Reply(r) | Sent::Edit(r) | Sent::FollowUp(r) => Some(r.content),
                Sent::Defer => None,
            })
            .collect()
    }
}

#[async_trait]
impl Responder for RecordingResponder {
    async fn reply(&self, reply: Reply) -> Result<()> {
        self.sent.lock().push(Sent::Reply(reply));
        Ok(())
    }

    async fn defer(&self, _ephemeral: bool) -> Result<()> {
        self.sent.lock().push(Sent::Defer);
        Ok(())
    }

    async fn edit_reply(&self, reply: Reply) -> Result<()> {
        self.sent.lock().push(Sent::Edit(reply));
        Ok(())
    }

    async fn follow_up(&self, reply: Reply) -> Result<()> {
        self.sent.lock().push(Sent::FollowUp(reply));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingSuggestions {
    pub responses: Mutex<Vec<Vec<ChoicePayload>>>,
}

impl RecordingSuggestions {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl AutocompleteResponder for RecordingSuggestions {
    async fn respond(&self, choices: Vec<ChoicePayload>) -> Result<()> {
        self.responses.lock().push(choices);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Set(Scope, Vec<String>),
    Create(Scope, String),
}

#[derive(Default)]
pub struct RecordingRegistrar {
    pub calls: Mutex<Vec<Call>>,
    pub contexts: Vec<GuildContext>,
    /// Scopes whose bulk call fails.
    pub failing: Vec<Scope>,
    pub contexts_fail: bool,
}

impl RecordingRegistrar {
    pub fn with_guilds(guilds: &[(&str, &str)]) -> Self {
        Self {
            contexts: guilds
                .iter()
                .map(|(id, name)| GuildContext {
                    id: id.to_string(),
                    name: name.to_string(),
                })
                .collect(),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl CommandRegistrar for RecordingRegistrar {
    async fn set_commands(&self, scope: Scope, commands: Vec<CommandPayload>) -> Result<()> {
        let names = commands.into_iter().map(|c| c.name).collect();
        self.calls.lock().push(Call::Set(scope.clone(), names));
        if self.failing.contains(&scope) {
            bail!("registration rejected for {scope}");
        }
        Ok(())
    }

    async fn create_command(&self, scope: Scope, command: CommandPayload) -> Result<()> {
        self.calls.lock().push(Call::Create(scope, command.name));
        Ok(())
    }

    async fn list_contexts(&self) -> Result<Vec<GuildContext>> {
        if self.contexts_fail {
            bail!("gateway not connected");
        }
        Ok(self.contexts.clone())
    }
}
