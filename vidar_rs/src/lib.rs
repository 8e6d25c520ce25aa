//! # vidar - slash-command grammar compiler and dispatch router
//!
//! Declare chat commands with a compact grammar, seal them into an immutable
//! model plus the platform's registration payload, keep them in sync with the
//! platform's command registry and route incoming interactions to handlers.
//!
//! ## Features
//!
//! - **Compact grammar**: `"group add <name> <count: 1 < x < 5> [*tag: red | blue]"`
//! - **Validation up front**: every declaration is checked when it is made; the
//!   first error is returned by the terminal call with the offending input
//! - **Two-phase registration**: one bulk sync per scope at startup, then
//!   individual creates for commands added later
//! - **Gated dispatch**: channel, permission and role checks before any handler runs
//! - **Failure isolation**: handler errors, panics and timeouts become a single
//!   generic notice to the user
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use tokio::sync::mpsc;
//! use tokio_util::sync::CancellationToken;
//! use vidar::{CommandRegistrar, Vidar, VidarConfig};
//!
//! async fn run(registrar: Arc<dyn CommandRegistrar>) -> anyhow::Result<()> {
//!     let vidar = Vidar::new(VidarConfig::default());
//!     vidar
//!         .command("greet", "Greet someone")
//!         .argument("<name> [times: 1 <= x <= 3]")
//!         .action(|interaction| async move {
//!             let name = interaction.string("name").unwrap_or("stranger").to_string();
//!             interaction.reply(format!("Hello, {name}!")).await
//!         })?;
//!
//!     let (_events_tx, events) = mpsc::channel(64);
//!     let handle = vidar.start(registrar, events, CancellationToken::new()).await?;
//!     handle.wait().await?;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub mod argument;
pub mod command;
pub mod config;
pub mod error;
pub mod interaction;
pub mod path;
pub mod registry;
pub mod router;
pub mod syntax;
pub mod types;
pub mod validate;

#[cfg(test)]
mod testing;

pub use argument::{Argument, ChoiceValue, Number, PLACEHOLDER_DESCRIPTION};
pub use command::{
    ArgumentOptions, ChoicePayload, CommandBuilder, CommandPayload, CommandSpec, DocEntry,
    HandlerMap, OptionPayload,
};
pub use config::{Messages, RouterConfig, VidarConfig, load_config};
pub use error::{ConfigError, ConfigResult, RegistryError};
pub use interaction::{
    AutocompleteRequest, AutocompleteResponder, Event, Interaction, InvocationData, Member,
    OptionValue, Reply, Responder, autocomplete, handler,
};
pub use path::{DEFAULT_KEY, PathKey};
pub use registry::{CommandRegistrar, GuildContext, Registry, RegistryState, Scope, SyncReport};
pub use router::{AutocompleteOutcome, DispatchOutcome, Gate, Router};
pub use types::{ArgType, ChannelScope};
pub use vidar_common::Permission;

/// Registry and router wired together from one [`VidarConfig`].
#[derive(Debug, Clone)]
pub struct Vidar {
    config: VidarConfig,
    registry: Registry,
    router: Router,
}

impl Default for Vidar {
    fn default() -> Self {
        Self::new(VidarConfig::default())
    }
}

impl Vidar {
    pub fn new(config: VidarConfig) -> Self {
        let registry = Registry::new();
        registry.debug_guilds(config.debug_guilds.iter().cloned());
        let router = Router::new(registry.clone(), config.router_config());
        Self {
            config,
            registry,
            router,
        }
    }

    pub fn config(&self) -> &VidarConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Start declaring a command; it is registered when sealed.
    pub fn command(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> CommandBuilder {
        self.registry.command(name, description)
    }

    /// Sync every declared command, then process `events` on a background
    /// task until the channel closes or `shutdown` fires.
    pub async fn start(
        &self,
        registrar: Arc<dyn CommandRegistrar>,
        events: mpsc::Receiver<Event>,
        shutdown: CancellationToken,
    ) -> Result<VidarHandle, RegistryError> {
        let report = self.registry.initialize(registrar).await?;
        if self.config.is_development() {
            info!(guilds = ?self.config.debug_guilds, "development mode");
        }

        let router = self.router.clone();
        let registry = self.registry.clone();
        let token = shutdown.clone();
        let join_handle = tokio::spawn(async move {
            router.listen(events, token).await;
            router.flush_notices().await;
            registry.flush().await;
        });

        Ok(VidarHandle {
            report,
            shutdown,
            join_handle,
        })
    }
}

/// Handle for a running listener loop.
pub struct VidarHandle {
    report: SyncReport,
    shutdown: CancellationToken,
    join_handle: tokio::task::JoinHandle<()>,
}

impl VidarHandle {
    /// What the startup sync did.
    pub fn report(&self) -> &SyncReport {
        &self.report
    }

    /// Stop taking new events. Events already started run to completion.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn is_running(&self) -> bool {
        !self.join_handle.is_finished()
    }

    /// Wait for the loop, pending failure notices and hot-adds to finish.
    pub async fn wait(self) -> anyhow::Result<()> {
        self.join_handle.await?;
        Ok(())
    }
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::testing::{Call, RecordingRegistrar, RecordingResponder};

    #[tokio::test]
    async fn start_syncs_then_dispatches_until_shutdown() {
        let vidar = Vidar::new(VidarConfig::default().with_debug_guilds(["100"]));
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        vidar
            .command("ping", "Replies with pong")
            .action(move |interaction| {
                let seen = seen.clone();
                async move {
                    seen.fetch_add(1, Ordering::SeqCst);
                    interaction.reply("pong").await
                }
            })
            .unwrap();

        let registrar = Arc::new(RecordingRegistrar::with_guilds(&[("100", "Dev")]));
        let (tx, rx) = mpsc::channel(4);
        let handle = vidar
            .start(registrar.clone(), rx, CancellationToken::new())
            .await
            .unwrap();
        assert!(handle.report().is_clean());
        assert_eq!(
            registrar.calls(),
            vec![Call::Set(Scope::Guild("100".into()), vec!["ping".into()])]
        );

        let responder = RecordingResponder::new();
        let interaction = Interaction::new(InvocationData::new("ping"), responder.clone());
        tx.send(Event::Invocation(interaction)).await.unwrap();
        drop(tx);
        handle.wait().await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(responder.contents(), vec!["pong".to_string()]);
    }

    #[tokio::test]
    async fn shutdown_stops_the_loop() {
        let vidar = Vidar::default();
        let (_tx, rx) = mpsc::channel(1);
        let handle = vidar
            .start(Arc::new(RecordingRegistrar::default()), rx, CancellationToken::new())
            .await
            .unwrap();
        handle.shutdown();
        handle.wait().await.unwrap();
        assert!(matches!(
            vidar
                .start(
                    Arc::new(RecordingRegistrar::default()),
                    mpsc::channel(1).1,
                    CancellationToken::new()
                )
                .await,
            Err(RegistryError::AlreadyInitialized)
        ));
    }

    #[test]
    fn debug_guilds_reach_the_registry() {
        let vidar = Vidar::new(VidarConfig::default().with_debug_guilds(["1", "2"]));
        let spec = vidar
            .command("ping", "Pong")
            .action(|_| async { Ok(()) })
            .unwrap();
        assert_eq!(vidar.registry().targets(&spec).len(), 2);
        assert!(vidar.config().is_development());
    }
}
