//! Registry lifecycle coordinator.
//!
//! Holds every sealed command by name and reconciles them with the external
//! command registry in two phases: one bulk sync at [`Registry::initialize`],
//! then an individual create call for each command sealed afterwards.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::command::{CommandBuilder, CommandPayload, CommandSpec};
use crate::error::{ConfigError, ConfigResult, RegistryError};

/// Where a command is registered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "scope", content = "id", rename_all = "lowercase")]
pub enum Scope {
    Global,
    Guild(String),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Global => f.write_str("global"),
            Scope::Guild(id) => write!(f, "guild <{id}>"),
        }
    }
}

/// A guild the transport can register commands in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildContext {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl GuildContext {
    fn matches(&self, reference: &str) -> bool {
        self.id == reference || (!self.name.is_empty() && self.name == reference)
    }
}

/// The external command registration API.
#[async_trait]
pub trait CommandRegistrar: Send + Sync {
    /// Replace every command registered in `scope`.
    async fn set_commands(&self, scope: Scope, commands: Vec<CommandPayload>) -> Result<()>;
    /// Add or update one command in `scope`.
    async fn create_command(&self, scope: Scope, command: CommandPayload) -> Result<()>;
    async fn list_contexts(&self) -> Result<Vec<GuildContext>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryState {
    Uninitialized,
    Syncing,
    Ready,
}

/// One bulk registration call made during initialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncBatch {
    pub scope: Scope,
    pub commands: Vec<String>,
    /// Error text when the call failed.
    pub error: Option<String>,
}

/// What [`Registry::initialize`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub batches: Vec<SyncBatch>,
    /// Guild references no known context matched.
    pub unknown_guilds: Vec<String>,
    /// Set when listing contexts failed; scoped commands were then skipped.
    pub context_error: Option<String>,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.batches.iter().all(|b| b.error.is_none())
            && self.unknown_guilds.is_empty()
            && self.context_error.is_none()
    }

    pub fn failed(&self) -> impl Iterator<Item = &SyncBatch> {
        self.batches.iter().filter(|b| b.error.is_some())
    }
}

struct Cache {
    specs: Vec<Arc<CommandSpec>>,
    index: HashMap<String, usize>,
    state: RegistryState,
    debug_guilds: BTreeSet<String>,
    queued: Vec<Arc<CommandSpec>>,
    registrar: Option<Arc<dyn CommandRegistrar>>,
    runtime: Option<Handle>,
}

struct Inner {
    cache: RwLock<Cache>,
    hot_adds: TaskTracker,
}

/// Cheaply cloneable handle to the process-wide command cache.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<Inner>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cache = self.inner.cache.read();
        f.debug_struct("Registry")
            .field("commands", &cache.specs.len())
            .field("state", &cache.state)
            .field("debug_guilds", &cache.debug_guilds)
            .finish()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                cache: RwLock::new(Cache {
                    specs: Vec::new(),
                    index: HashMap::new(),
                    state: RegistryState::Uninitialized,
                    debug_guilds: BTreeSet::new(),
                    queued: Vec::new(),
                    registrar: None,
                    runtime: None,
                }),
                hot_adds: TaskTracker::new(),
            }),
        }
    }

    /// Start declaring a command that is registered here once sealed.
    pub fn command(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> CommandBuilder {
        CommandBuilder::new(name, description).attach(self.clone())
    }

    pub fn get(&self, name: &str) -> Option<Arc<CommandSpec>> {
        let cache = self.inner.cache.read();
        cache.index.get(name).map(|&i| cache.specs[i].clone())
    }

    pub fn specs(&self) -> Vec<Arc<CommandSpec>> {
        self.inner.cache.read().specs.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.cache.read().specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn state(&self) -> RegistryState {
        self.inner.cache.read().state
    }

    /// Guilds every command is additionally registered in.
    pub fn debug_guilds<I, S>(&self, guilds: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut cache = self.inner.cache.write();
        cache.debug_guilds.extend(guilds.into_iter().map(Into::into));
    }

    /// Guild references `spec` registers in, debug guilds included.
    pub fn targets(&self, spec: &CommandSpec) -> BTreeSet<String> {
        let cache = self.inner.cache.read();
        spec.guilds()
            .iter()
            .chain(cache.debug_guilds.iter())
            .cloned()
            .collect()
    }

    /// Add a sealed command. Names are unique for the life of the registry.
    pub fn seal(&self, spec: CommandSpec) -> ConfigResult<Arc<CommandSpec>> {
        let spec = Arc::new(spec);
        let hot_add = {
            let mut cache = self.inner.cache.write();
            if cache.index.contains_key(spec.name()) {
                return Err(ConfigError::duplicate("command", spec.name()));
            }
            let position = cache.specs.len();
            cache.index.insert(spec.name().to_string(), position);
            cache.specs.push(spec.clone());
            match cache.state {
                RegistryState::Uninitialized => None,
                RegistryState::Syncing => {
                    cache.queued.push(spec.clone());
                    None
                }
                RegistryState::Ready => Some(spec.clone()),
            }
        };
        debug!(command = spec.name(), "added to cache");
        if let Some(spec) = hot_add {
            self.hot_add(spec);
        }
        Ok(spec)
    }

    /// Bulk-register every cached command, then switch to hot-add mode.
    pub async fn initialize(
        &self,
        registrar: Arc<dyn CommandRegistrar>,
    ) -> Result<SyncReport, RegistryError> {
        let runtime = Handle::try_current().map_err(|_| RegistryError::NoRuntime)?;
        let (specs, debug_guilds) = {
            let mut cache = self.inner.cache.write();
            if cache.state != RegistryState::Uninitialized {
                return Err(RegistryError::AlreadyInitialized);
            }
            cache.state = RegistryState::Syncing;
            cache.registrar = Some(registrar.clone());
            cache.runtime = Some(runtime);
            (cache.specs.clone(), cache.debug_guilds.clone())
        };

        let report = sync_all(registrar.as_ref(), &specs, &debug_guilds).await;

        let queued = {
            let mut cache = self.inner.cache.write();
            cache.state = RegistryState::Ready;
            std::mem::take(&mut cache.queued)
        };
        info!(
            commands = specs.len(),
            batches = report.batches.len(),
            clean = report.is_clean(),
            "command registry ready"
        );
        for spec in queued {
            self.hot_add(spec);
        }
        Ok(report)
    }

    /// Wait for in-flight hot-add registrations.
    pub async fn flush(&self) {
        let tracker = &self.inner.hot_adds;
        tracker.close();
        tracker.wait().await;
        tracker.reopen();
    }

    fn hot_add(&self, spec: Arc<CommandSpec>) {
        let (registrar, runtime, targets) = {
            let cache = self.inner.cache.read();
            let targets: BTreeSet<String> = spec
                .guilds()
                .iter()
                .chain(cache.debug_guilds.iter())
                .cloned()
                .collect();
            (cache.registrar.clone(), cache.runtime.clone(), targets)
        };
        let (Some(registrar), Some(runtime)) = (registrar, runtime) else {
            return;
        };
        self.inner.hot_adds.spawn_on(
            async move {
                create_one(registrar.as_ref(), &spec, &targets).await;
            },
            &runtime,
        );
    }
}

async fn sync_all(
    registrar: &dyn CommandRegistrar,
    specs: &[Arc<CommandSpec>],
    debug_guilds: &BTreeSet<String>,
) -> SyncReport {
    let mut report = SyncReport::default();
    let targets_of = |spec: &CommandSpec| -> BTreeSet<String> {
        spec.guilds()
            .iter()
            .chain(debug_guilds.iter())
            .cloned()
            .collect()
    };
    let (global, scoped): (Vec<Arc<CommandSpec>>, Vec<Arc<CommandSpec>>) = specs
        .iter()
        .cloned()
        .partition(|spec| targets_of(spec).is_empty());

    if !global.is_empty() {
        let batch = submit(
            registrar,
            Scope::Global,
            global.iter().map(Arc::as_ref).collect(),
        )
        .await;
        report.batches.push(batch);
    }

    if scoped.is_empty() {
        return report;
    }
    let contexts = match registrar.list_contexts().await {
        Ok(contexts) => contexts,
        Err(err) => {
            error!(error = %err, "failed to list guilds; guild commands were not registered");
            report.context_error = Some(format!("{err:#}"));
            return report;
        }
    };

    let mut per_guild: BTreeMap<String, Vec<&CommandSpec>> = BTreeMap::new();
    let mut unknown = BTreeSet::new();
    for spec in &scoped {
        for reference in targets_of(spec) {
            let Some(context) = contexts.iter().find(|c| c.matches(&reference)) else {
                unknown.insert(reference);
                continue;
            };
            let batch = per_guild.entry(context.id.clone()).or_default();
            if !batch.iter().any(|s| s.name() == spec.name()) {
                batch.push(Arc::as_ref(spec));
            }
        }
    }
    for reference in &unknown {
        warn!(guild = %reference, "no guild matches this reference; skipped");
    }
    report.unknown_guilds = unknown.into_iter().collect();

    for (guild, batch) in per_guild {
        report
            .batches
            .push(submit(registrar, Scope::Guild(guild), batch).await);
    }
    report
}

async fn submit(
    registrar: &dyn CommandRegistrar,
    scope: Scope,
    specs: Vec<&CommandSpec>,
) -> SyncBatch {
    let commands: Vec<String> = specs.iter().map(|s| s.name().to_string()).collect();
    let payloads: Vec<CommandPayload> = specs.iter().map(|s| s.payload().clone()).collect();
    match registrar.set_commands(scope.clone(), payloads).await {
        Ok(()) => {
            info!(%scope, commands = ?commands, "registered commands");
            SyncBatch {
                scope,
                commands,
                error: None,
            }
        }
        Err(err) => {
            error!(%scope, commands = ?commands, error = %err, "bulk registration failed");
            SyncBatch {
                scope,
                commands,
                error: Some(format!("{err:#}")),
            }
        }
    }
}

async fn create_one(
    registrar: &dyn CommandRegistrar,
    spec: &CommandSpec,
    targets: &BTreeSet<String>,
) {
    if targets.is_empty() {
        match registrar
            .create_command(Scope::Global, spec.payload().clone())
            .await
        {
            Ok(()) => info!(command = spec.name(), "hot-added global command"),
            Err(err) => error!(command = spec.name(), error = %err, "hot-add failed"),
        }
        return;
    }

    let contexts = match registrar.list_contexts().await {
        Ok(contexts) => contexts,
        Err(err) => {
            error!(command = spec.name(), error = %err, "failed to list guilds for hot-add");
            return;
        }
    };
    let mut guilds = BTreeSet::new();
    for reference in targets {
        match contexts.iter().find(|c| c.matches(reference)) {
            Some(context) => {
                guilds.insert(context.id.clone());
            }
            None => warn!(
                command = spec.name(),
                guild = %reference,
                "no guild matches this reference; skipped"
            ),
        }
    }
    for guild in guilds {
        let scope = Scope::Guild(guild);
        match registrar
            .create_command(scope.clone(), spec.payload().clone())
            .await
        {
            Ok(()) => info!(command = spec.name(), %scope, "hot-added guild command"),
            Err(err) => error!(command = spec.name(), %scope, error = %err, "hot-add failed"),
        }
    }
}

#[cfg(test)]
mod tests;
