//! Action registry.
//!
//! Built once at startup from explicitly registered actions and named
//! [`ActionModule`]s, then read-only for the lifetime of the simulator. The
//! registry never loads code by path; a [`ModuleResolver`] supplies modules by
//! name.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::{ConfigError, HookError};

use super::{Action, InvocationContext};

/// A named collection of actions, the unit a configuration refers to.
#[derive(Clone)]
pub struct ActionModule {
    name: String,
    actions: Vec<(String, Arc<dyn Action>)>,
}

impl ActionModule {
    /// Empty module called `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            actions: Vec::new(),
        }
    }

    /// Adds an action. Duplicate names are reported when the registry is built.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, action: impl Action + 'static) -> Self {
        let action: Arc<dyn Action> = Arc::new(action);
        self.actions.push((name.into(), action));
        self
    }

    /// Adds a closure action.
    #[must_use]
    pub fn with_fn<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut InvocationContext<'_>) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.with(name, f)
    }

    /// Module name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of actions in the module.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Returns true if the module has no actions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl std::fmt::Debug for ActionModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionModule")
            .field("name", &self.name)
            .field("actions", &self.actions.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>())
            .finish()
    }
}

/// Supplies action modules by name.
pub trait ModuleResolver: Send + Sync {
    /// Returns the module registered under `name`.
    ///
    /// # Errors
    /// A human-readable reason when the module cannot be produced.
    fn resolve(&self, name: &str) -> Result<ActionModule, String>;
}

type ModuleFactory = Box<dyn Fn() -> ActionModule + Send + Sync>;

/// Resolver over a fixed set of module factories.
///
/// Each resolution calls the factory again, so stateful actions start fresh
/// for every registry built from it.
#[derive(Default)]
pub struct StaticModules {
    factories: HashMap<String, ModuleFactory>,
}

impl StaticModules {
    /// Resolver with no modules.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver that knows the modules shipped with the crate.
    #[must_use]
    pub fn standard() -> Self {
        Self::new()
            .with(super::builtin::MODULE_NAME, super::builtin::module)
            .with(super::custom::MODULE_NAME, super::custom::module)
    }

    /// Adds a module factory under `name`.
    #[must_use]
    pub fn with<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> ActionModule + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
        self
    }
}

impl ModuleResolver for StaticModules {
    fn resolve(&self, name: &str) -> Result<ActionModule, String> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| "no module is registered under this name".to_string())?;
        Ok(factory())
    }
}

/// Collects actions before the registry is frozen.
#[derive(Default)]
pub struct ActionRegistryBuilder {
    entries: Vec<(String, Arc<dyn Action>)>,
}

impl ActionRegistryBuilder {
    /// Adds an action under `name`.
    #[must_use]
    pub fn register(mut self, name: impl Into<String>, action: impl Action + 'static) -> Self {
        let action: Arc<dyn Action> = Arc::new(action);
        self.entries.push((name.into(), action));
        self
    }

    /// Adds a closure action under `name`.
    #[must_use]
    pub fn register_fn<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut InvocationContext<'_>) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.register(name, f)
    }

    /// Adds every action of `module`.
    #[must_use]
    pub fn module(mut self, module: ActionModule) -> Self {
        self.entries.extend(module.actions);
        self
    }

    /// Resolves `name` through `resolver` and adds its actions.
    ///
    /// # Errors
    /// `ModuleLoadFailure` when the resolver cannot produce the module.
    pub fn resolve_module(self, resolver: &dyn ModuleResolver, name: &str) -> Result<Self, ConfigError> {
        let module = resolver.resolve(name).map_err(|reason| ConfigError::ModuleLoadFailure {
            module: name.to_string(),
            reason,
        })?;
        debug!(module = name, actions = module.len(), "resolved action module");
        Ok(self.module(module))
    }

    /// Freezes the registry.
    ///
    /// # Errors
    /// `DuplicateActionName` when two entries share a name.
    pub fn build(self) -> Result<ActionRegistry, ConfigError> {
        let mut actions = HashMap::with_capacity(self.entries.len());
        for (name, action) in self.entries {
            if actions.contains_key(&name) {
                return Err(ConfigError::DuplicateActionName { name });
            }
            actions.insert(name, action);
        }
        debug!(actions = actions.len(), "action registry built");
        Ok(ActionRegistry { actions })
    }
}

/// Immutable mapping from action name to implementation.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    actions: HashMap<String, Arc<dyn Action>>,
}

impl ActionRegistry {
    /// Starts an empty builder.
    #[must_use]
    pub fn builder() -> ActionRegistryBuilder {
        ActionRegistryBuilder::default()
    }

    /// Builds a registry holding exactly the module `name` resolved through `resolver`.
    ///
    /// # Errors
    /// `ModuleLoadFailure` or `DuplicateActionName`.
    pub fn from_module(resolver: &dyn ModuleResolver, name: &str) -> Result<Self, ConfigError> {
        Self::builder().resolve_module(resolver, name)?.build()
    }

    /// Looks up an action by name. Pure.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Action>> {
        self.actions.get(name).cloned()
    }

    /// Returns true if an action is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.actions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Returns true if no action is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRegistry").field("actions", &self.names()).finish()
    }
}
