use std::sync::atomic::{AtomicBool, Ordering};

use super::*;
use crate::testing::{Call, RecordingRegistrar};

fn add(registry: &Registry, name: &str, guilds: &[&str]) {
    registry
        .command(name, "Test command")
        .guilds(guilds.iter().copied())
        .action(|_| async { Ok(()) })
        .unwrap();
}

fn guild(id: &str) -> Scope {
    Scope::Guild(id.to_string())
}

#[tokio::test]
async fn commands_sealed_before_startup_go_in_one_call() {
    let registry = Registry::new();
    add(&registry, "alpha", &[]);
    add(&registry, "beta", &[]);
    assert_eq!(registry.state(), RegistryState::Uninitialized);

    let registrar = Arc::new(RecordingRegistrar::default());
    let report = registry.initialize(registrar.clone()).await.unwrap();

    assert_eq!(
        registrar.calls(),
        vec![Call::Set(Scope::Global, vec!["alpha".into(), "beta".into()])]
    );
    assert!(report.is_clean());
    assert_eq!(registry.state(), RegistryState::Ready);
}

#[tokio::test]
async fn commands_sealed_after_startup_are_created_individually() {
    let registry = Registry::new();
    add(&registry, "alpha", &[]);
    let registrar = Arc::new(RecordingRegistrar::default());
    registry.initialize(registrar.clone()).await.unwrap();

    add(&registry, "gamma", &[]);
    registry.flush().await;

    assert_eq!(
        registrar.calls(),
        vec![
            Call::Set(Scope::Global, vec!["alpha".into()]),
            Call::Create(Scope::Global, "gamma".into()),
        ]
    );
    assert!(registry.get("gamma").is_some());
}

#[tokio::test]
async fn second_initialize_is_rejected() {
    let registry = Registry::new();
    let registrar = Arc::new(RecordingRegistrar::default());
    registry.initialize(registrar.clone()).await.unwrap();
    assert!(matches!(
        registry.initialize(registrar).await,
        Err(RegistryError::AlreadyInitialized)
    ));
}

#[test]
fn initialize_needs_a_runtime() {
    let registry = Registry::new();
    let registrar = Arc::new(RecordingRegistrar::default());
    let result = futures::executor::block_on(registry.initialize(registrar));
    assert!(matches!(result, Err(RegistryError::NoRuntime)));
    assert_eq!(registry.state(), RegistryState::Uninitialized);
}

#[test]
fn duplicate_names_are_rejected() {
    let registry = Registry::new();
    add(&registry, "ping", &[]);
    let err = registry
        .command("ping", "Again")
        .action(|_| async { Ok(()) })
        .unwrap_err();
    assert_eq!(err, ConfigError::duplicate("command", "ping"));
    assert_eq!(registry.len(), 1);
}

#[tokio::test]
async fn guild_commands_are_batched_per_guild() {
    let registry = Registry::new();
    add(&registry, "global", &[]);
    add(&registry, "local", &["Dev Lab"]);
    add(&registry, "both", &["100", "200"]);

    let registrar = Arc::new(RecordingRegistrar::with_guilds(&[
        ("100", "Dev Lab"),
        ("200", "Prod"),
    ]));
    let report = registry.initialize(registrar.clone()).await.unwrap();

    assert_eq!(
        registrar.calls(),
        vec![
            Call::Set(Scope::Global, vec!["global".into()]),
            Call::Set(guild("100"), vec!["local".into(), "both".into()]),
            Call::Set(guild("200"), vec!["both".into()]),
        ]
    );
    assert_eq!(report.batches.len(), 3);
    assert!(report.is_clean());
}

#[tokio::test]
async fn unknown_guilds_are_reported_and_skipped() {
    let registry = Registry::new();
    add(&registry, "lost", &["Nowhere"]);
    add(&registry, "found", &["Prod"]);

    let registrar = Arc::new(RecordingRegistrar::with_guilds(&[("200", "Prod")]));
    let report = registry.initialize(registrar.clone()).await.unwrap();

    assert_eq!(report.unknown_guilds, vec!["Nowhere".to_string()]);
    assert!(!report.is_clean());
    assert_eq!(
        registrar.calls(),
        vec![Call::Set(guild("200"), vec!["found".into()])]
    );
}

#[tokio::test]
async fn failed_batch_does_not_stop_the_others() {
    let registry = Registry::new();
    add(&registry, "everywhere", &[]);
    add(&registry, "first", &["100"]);
    add(&registry, "second", &["200"]);

    let registrar = Arc::new(RecordingRegistrar {
        failing: vec![guild("100")],
        ..RecordingRegistrar::with_guilds(&[("100", "A"), ("200", "B")])
    });
    let report = registry.initialize(registrar.clone()).await.unwrap();

    let failed: Vec<&SyncBatch> = report.failed().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].scope, guild("100"));
    assert!(failed[0].error.as_deref().unwrap().contains("rejected"));
    assert_eq!(registrar.calls().len(), 3);
    assert!(registrar
        .calls()
        .contains(&Call::Set(guild("200"), vec!["second".into()])));
    assert_eq!(registry.state(), RegistryState::Ready);
}

#[tokio::test]
async fn context_listing_failure_skips_guild_commands() {
    let registry = Registry::new();
    add(&registry, "global", &[]);
    add(&registry, "scoped", &["100"]);

    let registrar = Arc::new(RecordingRegistrar {
        contexts_fail: true,
        ..RecordingRegistrar::default()
    });
    let report = registry.initialize(registrar.clone()).await.unwrap();

    assert!(report.context_error.is_some());
    assert_eq!(
        registrar.calls(),
        vec![Call::Set(Scope::Global, vec!["global".into()])]
    );
}

#[tokio::test]
async fn debug_guilds_apply_to_every_command() {
    let registry = Registry::new();
    registry.debug_guilds(["100"]);
    add(&registry, "plain", &[]);
    add(&registry, "scoped", &["200"]);

    let spec = registry.get("scoped").unwrap();
    assert_eq!(
        registry.targets(&spec),
        BTreeSet::from(["100".to_string(), "200".to_string()])
    );

    let registrar = Arc::new(RecordingRegistrar::with_guilds(&[("100", "Dev"), ("200", "Prod")]));
    registry.initialize(registrar.clone()).await.unwrap();

    assert_eq!(
        registrar.calls(),
        vec![
            Call::Set(guild("100"), vec!["plain".into(), "scoped".into()]),
            Call::Set(guild("200"), vec!["scoped".into()]),
        ]
    );
}

#[tokio::test]
async fn hot_add_resolves_guild_names() {
    let registry = Registry::new();
    let registrar = Arc::new(RecordingRegistrar::with_guilds(&[("200", "Prod")]));
    registry.initialize(registrar.clone()).await.unwrap();

    add(&registry, "late", &["Prod", "Gone"]);
    registry.flush().await;

    assert_eq!(
        registrar.calls(),
        vec![Call::Create(guild("200"), "late".into())]
    );
}

/// Seals one more command from inside the bulk call.
struct SealsDuringSync {
    registry: Registry,
    inner: RecordingRegistrar,
    sealed: AtomicBool,
}

#[async_trait]
impl CommandRegistrar for SealsDuringSync {
    async fn set_commands(&self, scope: Scope, commands: Vec<CommandPayload>) -> Result<()> {
        if !self.sealed.swap(true, Ordering::SeqCst) {
            assert_eq!(self.registry.state(), RegistryState::Syncing);
            add(&self.registry, "straggler", &[]);
        }
        self.inner.set_commands(scope, commands).await
    }

    async fn create_command(&self, scope: Scope, command: CommandPayload) -> Result<()> {
        self.inner.create_command(scope, command).await
    }

    async fn list_contexts(&self) -> Result<Vec<GuildContext>> {
        self.inner.list_contexts().await
    }
}

#[tokio::test]
async fn command_sealed_during_sync_is_added_once_ready() {
    let registry = Registry::new();
    add(&registry, "early", &[]);
    let registrar = Arc::new(SealsDuringSync {
        registry: registry.clone(),
        inner: RecordingRegistrar::default(),
        sealed: AtomicBool::new(false),
    });

    registry.initialize(registrar.clone()).await.unwrap();
    registry.flush().await;

    assert_eq!(
        registrar.inner.calls(),
        vec![
            Call::Set(Scope::Global, vec!["early".into()]),
            Call::Create(Scope::Global, "straggler".into()),
        ]
    );
    assert_eq!(registry.len(), 2);
}

#[test]
fn scope_display_and_serde() {
    assert_eq!(Scope::Global.to_string(), "global");
    assert_eq!(guild("42").to_string(), "guild <42>");
    assert_eq!(
        serde_json::to_string(&guild("42")).unwrap(),
        r#"{"scope":"guild","id":"42"}"#
    );
}
