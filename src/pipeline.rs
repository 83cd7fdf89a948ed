//! Request pipeline: parse -> resolve alias -> dispatch
//!
//! Single entry point for inbound metric requests. A request is validated by
//! the key grammar, rewritten through the alias table, and either handed back
//! as a built-in key or turned into a command line by the user parameter
//! templater.
//!
//! The alias table and the binding table are published together as one
//! [`PipelineSnapshot`]. A request loads the snapshot once, so both lookups
//! always see tables built from the same configuration.

use crate::alias::AliasTable;
use crate::config::{AgentConfig, ConfigError};
use crate::key::{parse_key, ItemKey, KeyError};
use crate::userparam::{BindingTable, UserParamError};
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

/// Where a request goes after resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// No user parameter matches; handled by a built-in collector
    Builtin(ItemKey),
    /// Bound to a user parameter; `command` is ready to hand to the executor
    Command { key: ItemKey, command: String },
}

impl Dispatch {
    pub fn key(&self) -> &ItemKey {
        match self {
            Dispatch::Builtin(key) => key,
            Dispatch::Command { key, .. } => key,
        }
    }
}

/// Errors from dispatching a single request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// Request (or its alias target) is not a valid key
    Key { key: String, source: KeyError },
    /// User parameter rejected the request
    UserParam(UserParamError),
}

impl std::fmt::Display for DispatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchError::Key { key, source } => write!(f, "invalid key \"{}\": {}", key, source),
            DispatchError::UserParam(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DispatchError::Key { source, .. } => Some(source),
            DispatchError::UserParam(e) => Some(e),
        }
    }
}

impl From<UserParamError> for DispatchError {
    fn from(e: UserParamError) -> Self {
        DispatchError::UserParam(e)
    }
}

/// Both request tables from one configuration
#[derive(Debug, Default)]
pub struct PipelineSnapshot {
    pub aliases: AliasTable,
    pub bindings: BindingTable,
    /// Successful reloads before this snapshot was installed, plus one
    pub generation: u64,
}

impl PipelineSnapshot {
    /// Parse `request`, apply aliases and parse the result
    pub fn resolve(&self, request: &str) -> Result<ItemKey, DispatchError> {
        parse_key(request).map_err(|source| DispatchError::Key {
            key: request.to_string(),
            source,
        })?;

        let resolved = self.aliases.resolve(request);
        parse_key(&resolved).map_err(|source| DispatchError::Key {
            key: resolved.to_string(),
            source,
        })
    }

    /// Resolve `request` and decide how it is served
    pub fn dispatch(&self, request: &str) -> Result<Dispatch, DispatchError> {
        let key = self.resolve(request)?;

        if !self.bindings.contains(key.name()) {
            debug!(request, key = %key, "dispatching to built-in collector");
            return Ok(Dispatch::Builtin(key));
        }

        let command = self.bindings.build_command(key.name(), key.params())?;
        debug!(request, key = %key, "dispatching to user parameter");
        Ok(Dispatch::Command { key, command })
    }
}

/// Parse -> alias -> user parameter pipeline
#[derive(Debug)]
pub struct RequestPipeline {
    snapshot: ArcSwap<PipelineSnapshot>,
    reload_lock: Mutex<()>,
}

impl RequestPipeline {
    /// Pipeline with no aliases and no user parameters
    pub fn empty() -> Self {
        RequestPipeline {
            snapshot: ArcSwap::from_pointee(PipelineSnapshot::default()),
            reload_lock: Mutex::new(()),
        }
    }

    /// Build a pipeline from configuration
    pub fn from_config(config: &AgentConfig) -> Result<Self, ConfigError> {
        let pipeline = Self::empty();
        pipeline.reload(config)?;
        Ok(pipeline)
    }

    /// Replace both tables from `config` in one swap.
    ///
    /// Nothing is installed unless both tables build. Returns the new
    /// generation number.
    pub fn reload(&self, config: &AgentConfig) -> Result<u64, ConfigError> {
        let _guard = self.reload_lock.lock();

        let policy = config.policy()?;
        let aliases = AliasTable::build(&config.aliases)?;
        let bindings = BindingTable::build(&config.user_parameters, policy)?;
        let generation = self.snapshot.load().generation + 1;

        info!(
            generation,
            rules = aliases.len(),
            bindings = bindings.len(),
            unsafe_params = policy.allows_unsafe(),
            "request pipeline reloaded"
        );
        self.snapshot.store(Arc::new(PipelineSnapshot {
            aliases,
            bindings,
            generation,
        }));
        Ok(generation)
    }

    /// Number of successful reloads
    pub fn generation(&self) -> u64 {
        self.snapshot.load().generation
    }

    /// Current tables, both from the same reload
    pub fn snapshot(&self) -> Arc<PipelineSnapshot> {
        self.snapshot.load_full()
    }

    /// Resolve a request without dispatching it
    pub fn resolve(&self, request: &str) -> Result<ItemKey, DispatchError> {
        self.snapshot.load().resolve(request)
    }

    /// Resolve a request and decide how it is served
    pub fn dispatch(&self, request: &str) -> Result<Dispatch, DispatchError> {
        self.snapshot.load().dispatch(request)
    }
}

impl Default for RequestPipeline {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AgentConfig {
        AgentConfig {
            aliases: vec![
                "dir.size[*]:vfs.dir.size[*]".to_string(),
                "who:system.test".to_string(),
                "host:agent.hostname".to_string(),
            ],
            user_parameters: vec![
                "vfs.dir.size[*],du -s -B 1 \"$1\" | cut -f1".to_string(),
                "system.test,who | wc -l".to_string(),
            ],
            unsafe_user_parameters: 0,
        }
    }

    #[test]
    fn test_alias_to_user_parameter() {
        let pipeline = RequestPipeline::from_config(&config()).unwrap();
        let dispatch = pipeline.dispatch("dir.size[/tmp]").unwrap();
        assert_eq!(
            dispatch,
            Dispatch::Command {
                key: ItemKey::new("vfs.dir.size", vec!["/tmp".to_string()]).unwrap(),
                command: "du -s -B 1 \"/tmp\" | cut -f1".to_string(),
            }
        );
    }

    #[test]
    fn test_builtin_passthrough() {
        let pipeline = RequestPipeline::from_config(&config()).unwrap();
        let dispatch = pipeline.dispatch("host").unwrap();
        assert_eq!(
            dispatch,
            Dispatch::Builtin(ItemKey::new("agent.hostname", vec![]).unwrap())
        );

        let dispatch = pipeline.dispatch("system.cpu.load[all,avg1]").unwrap();
        assert_eq!(dispatch.key().name(), "system.cpu.load");
        assert_eq!(dispatch.key().params(), &["all", "avg1"]);
    }

    #[test]
    fn test_invalid_request() {
        let pipeline = RequestPipeline::from_config(&config()).unwrap();
        assert!(matches!(
            pipeline.dispatch("key[a]]"),
            Err(DispatchError::Key { .. })
        ));
    }

    #[test]
    fn test_unsafe_parameter_rejected() {
        let pipeline = RequestPipeline::from_config(&config()).unwrap();
        assert!(matches!(
            pipeline.dispatch("dir.size[`reboot`]"),
            Err(DispatchError::UserParam(UserParamError::UnsafeParameter { .. }))
        ));
        assert!(matches!(
            pipeline.dispatch("system.test[x]"),
            Err(DispatchError::UserParam(UserParamError::TooManyParameters { .. }))
        ));
    }

    #[test]
    fn test_snapshot_outlives_reload() {
        let pipeline = RequestPipeline::from_config(&config()).unwrap();
        let before = pipeline.snapshot();

        let mut next = config();
        next.aliases = vec!["who:vfs.dir.size[/var]".to_string()];
        next.user_parameters = vec!["vfs.dir.size[*],ls $1".to_string()];
        assert_eq!(pipeline.reload(&next).unwrap(), 2);

        // Old snapshot still answers with the old pair of tables
        assert_eq!(before.generation, 1);
        assert!(matches!(
            before.dispatch("who"),
            Ok(Dispatch::Command { ref command, .. }) if command == "who | wc -l"
        ));

        match pipeline.dispatch("who").unwrap() {
            Dispatch::Command { command, .. } => assert_eq!(command, "ls /var"),
            other => panic!("expected command, got {:?}", other),
        }
    }

    #[test]
    fn test_failed_reload_installs_nothing() {
        let pipeline = RequestPipeline::from_config(&config()).unwrap();
        assert_eq!(pipeline.generation(), 1);

        let mut bad = config();
        bad.aliases = vec!["new:alias".to_string()];
        bad.user_parameters.push("broken".to_string());
        assert!(pipeline.reload(&bad).is_err());

        assert_eq!(pipeline.generation(), 1);
        let snapshot = pipeline.snapshot();
        assert_eq!(snapshot.aliases.resolve("host"), "agent.hostname");
        assert_eq!(snapshot.aliases.resolve("new"), "new");
        assert_eq!(snapshot.bindings.len(), 2);
    }
}
