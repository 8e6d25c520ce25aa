//! Dispatch router.
//!
//! Each invocation moves through `received -> gated -> {rejected | executing}
//! -> {completed | failed}`. Gates run in a fixed order (channel, then
//! permissions, then roles) and the first one that fails answers the user and
//! stops the event. Handler failures are contained: they are logged, a
//! generic notice is scheduled for the user, and later events are unaffected.

use std::any::Any;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use futures::future::BoxFuture;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::command::{ChoicePayload, CommandSpec};
use crate::config::RouterConfig;
use crate::interaction::{AutocompleteRequest, Event, Interaction, InvocationData, Reply};
use crate::registry::Registry;
use crate::validate::MAX_CHOICES;

/// An access check that can reject an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Channel,
    Permissions,
    Roles,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No command with this name is registered here.
    Ignored,
    Rejected(Gate),
    /// The command has no handler for this path.
    Unhandled,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutocompleteOutcome {
    Ignored,
    /// Neither the argument nor the command has a callback.
    NoCallback,
    /// Suggestions sent, after truncation.
    Responded(usize),
    /// The callback failed; an empty list was sent.
    Failed,
}

#[derive(Clone, Debug)]
pub struct Router {
    registry: Registry,
    config: Arc<RouterConfig>,
    notices: TaskTracker,
}

impl Router {
    pub fn new(registry: Registry, config: RouterConfig) -> Self {
        Self {
            registry,
            config: Arc::new(config),
            notices: TaskTracker::new(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub async fn handle(&self, event: Event) {
        match event {
            Event::Invocation(interaction) => {
                self.dispatch(interaction).await;
            }
            Event::Autocomplete(request) => {
                self.autocomplete(request).await;
            }
        }
    }

    /// Process events until the channel closes or `shutdown` fires, each on
    /// its own task. Returns once every started event has finished.
    pub async fn listen(&self, mut events: mpsc::Receiver<Event>, shutdown: CancellationToken) {
        let tracker = TaskTracker::new();
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                event = events.recv() => {
                    let Some(event) = event else { break };
                    let router = self.clone();
                    tracker.spawn(async move { router.handle(event).await });
                }
            }
        }
        tracker.close();
        tracker.wait().await;
        info!("event listener stopped");
    }

    pub async fn dispatch(&self, interaction: Interaction) -> DispatchOutcome {
        let Some(spec) = self.registry.get(&interaction.data.command) else {
            debug!(command = %interaction.data.command, "ignoring unknown command");
            return DispatchOutcome::Ignored;
        };

        if let Some(gate) = check_gates(&spec, &interaction.data) {
            let messages = &self.config.messages;
            let text = match gate {
                Gate::Channel => &messages.wrong_channel,
                Gate::Permissions => &messages.missing_permissions,
                Gate::Roles => &messages.missing_roles,
            };
            warn!(command = spec.name(), ?gate, "invocation rejected");
            if let Err(err) = interaction.reply(Reply::ephemeral(text.clone())).await {
                warn!(command = spec.name(), error = %err, "failed to send rejection");
            }
            return DispatchOutcome::Rejected(gate);
        }

        let path = interaction.path();
        let Some(handler) = spec.handler().resolve(&path).cloned() else {
            debug!(command = spec.name(), %path, "no handler for path");
            return DispatchOutcome::Unhandled;
        };

        match self.isolate(handler(interaction.clone())).await {
            Ok(()) => DispatchOutcome::Completed,
            Err(err) => {
                error!(command = spec.name(), %path, error = %format!("{err:#}"), "command failed");
                self.schedule_notice(interaction);
                DispatchOutcome::Failed
            }
        }
    }

    pub async fn autocomplete(&self, request: AutocompleteRequest) -> AutocompleteOutcome {
        let Some(spec) = self.registry.get(&request.data.command) else {
            debug!(command = %request.data.command, "ignoring autocomplete for unknown command");
            return AutocompleteOutcome::Ignored;
        };
        let path = request.path();
        let Some(callback) = spec.autocomplete_for(&path, &request.focused).cloned() else {
            debug!(
                command = spec.name(),
                %path,
                argument = %request.focused,
                "no autocomplete callback"
            );
            return AutocompleteOutcome::NoCallback;
        };

        match self.isolate(callback(request.clone())).await {
            Ok(values) => {
                if values.len() > MAX_CHOICES {
                    warn!(
                        command = spec.name(),
                        argument = %request.focused,
                        returned = values.len(),
                        "dropping suggestions beyond {MAX_CHOICES}"
                    );
                }
                let choices: Vec<ChoicePayload> = values
                    .into_iter()
                    .take(MAX_CHOICES)
                    .map(ChoicePayload::from)
                    .collect();
                let sent = choices.len();
                if let Err(err) = request.respond(choices).await {
                    warn!(command = spec.name(), error = %err, "failed to send suggestions");
                }
                AutocompleteOutcome::Responded(sent)
            }
            Err(err) => {
                error!(
                    command = spec.name(),
                    argument = %request.focused,
                    error = %format!("{err:#}"),
                    "autocomplete failed"
                );
                if let Err(err) = request.respond(Vec::new()).await {
                    warn!(command = spec.name(), error = %err, "failed to send empty suggestions");
                }
                AutocompleteOutcome::Failed
            }
        }
    }

    /// Wait until every scheduled failure notice has been sent.
    pub async fn flush_notices(&self) {
        self.notices.close();
        self.notices.wait().await;
        self.notices.reopen();
    }

    /// Run a callback on its own task so a panic or a timeout becomes an error.
    async fn isolate<T: Send + 'static>(&self, task: BoxFuture<'static, Result<T>>) -> Result<T> {
        let handle = tokio::spawn(task);
        let joined = match self.config.execution_timeout {
            Some(limit) => {
                let abort = handle.abort_handle();
                match tokio::time::timeout(limit, handle).await {
                    Ok(joined) => joined,
                    Err(_) => {
                        abort.abort();
                        return Err(anyhow!("timed out after {limit:?}"));
                    }
                }
            }
            None => handle.await,
        };
        match joined {
            Ok(result) => result,
            Err(err) if err.is_panic() => {
                let payload = err.into_panic();
                Err(anyhow!("panicked: {}", panic_message(&*payload)))
            }
            Err(err) => Err(anyhow!("task ended early: {err}")),
        }
    }

    fn schedule_notice(&self, interaction: Interaction) {
        let delay = self.config.failure_notice_delay;
        let notice = Reply::ephemeral(self.config.messages.failure.clone());
        self.notices.spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if let Err(err) = interaction.notify(notice).await {
                warn!(
                    command = %interaction.data.command,
                    error = %err,
                    "failed to send failure notice"
                );
            }
        });
    }
}

fn check_gates(spec: &CommandSpec, data: &InvocationData) -> Option<Gate> {
    if !spec.channels().is_empty() {
        let allowed = data
            .channel
            .as_ref()
            .is_some_and(|channel| spec.channels().iter().any(|r| channel.matches(r)));
        if !allowed {
            return Some(Gate::Channel);
        }
    }
    if !spec.permissions().is_empty() {
        let held = data
            .member
            .as_ref()
            .is_some_and(|member| spec.permissions().iter().all(|p| member.has_permission(*p)));
        if !held {
            return Some(Gate::Permissions);
        }
    }
    if !spec.roles().is_empty() {
        let held = data
            .member
            .as_ref()
            .is_some_and(|member| spec.roles().iter().all(|r| member.has_role(r)));
        if !held {
            return Some(Gate::Roles);
        }
    }
    None
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        text.to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic".to_string()
    }
}
