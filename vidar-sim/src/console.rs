//! In-memory transport that prints what the core sends.

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;
use vidar::{
    AutocompleteResponder, ChoicePayload, CommandPayload, CommandRegistrar, GuildContext, Reply,
    Responder, Scope,
};

/// Accepts every registration and logs it. Guild ids double as names.
pub struct ConsoleRegistrar {
    contexts: Vec<GuildContext>,
}

impl ConsoleRegistrar {
    pub fn new(guilds: &[String]) -> Self {
        Self {
            contexts: guilds
                .iter()
                .map(|id| GuildContext {
                    id: id.clone(),
                    name: id.clone(),
                })
                .collect(),
        }
    }
}

#[async_trait]
impl CommandRegistrar for ConsoleRegistrar {
    async fn set_commands(&self, scope: Scope, commands: Vec<CommandPayload>) -> Result<()> {
        let names: Vec<&str> = commands.iter().map(|c| c.name.as_str()).collect();
        info!(%scope, commands = ?names, "set commands");
        Ok(())
    }

    async fn create_command(&self, scope: Scope, command: CommandPayload) -> Result<()> {
        info!(%scope, command = %command.name, "created command");
        Ok(())
    }

    async fn list_contexts(&self) -> Result<Vec<GuildContext>> {
        Ok(self.contexts.clone())
    }
}

/// Prints replies to stdout as `[label] verb: content`.
pub struct ConsoleResponder {
    label: String,
}

impl ConsoleResponder {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    fn print(&self, verb: &str, reply: &Reply) {
        let marker = if reply.ephemeral { " (ephemeral)" } else { "" };
        println!("[{}] {verb}{marker}: {}", self.label, reply.content);
    }
}

#[async_trait]
impl Responder for ConsoleResponder {
    async fn reply(&self, reply: Reply) -> Result<()> {
        self.print("reply", &reply);
        Ok(())
    }

    async fn defer(&self, ephemeral: bool) -> Result<()> {
        let marker = if ephemeral { " (ephemeral)" } else { "" };
        println!("[{}] deferred{marker}", self.label);
        Ok(())
    }

    async fn edit_reply(&self, reply: Reply) -> Result<()> {
        self.print("edit", &reply);
        Ok(())
    }

    async fn follow_up(&self, reply: Reply) -> Result<()> {
        self.print("follow-up", &reply);
        Ok(())
    }
}

pub struct ConsoleSuggestions {
    label: String,
}

impl ConsoleSuggestions {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

#[async_trait]
impl AutocompleteResponder for ConsoleSuggestions {
    async fn respond(&self, choices: Vec<ChoicePayload>) -> Result<()> {
        let names: Vec<&str> = choices.iter().map(|c| c.name.as_str()).collect();
        println!("[{}] suggestions: {}", self.label, names.join(", "));
        Ok(())
    }
}
