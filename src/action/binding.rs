//! Per-cell action bindings.
//!
//! A binding is resolved against the registry exactly once, while the device is
//! built. Requests only follow the stored action reference.

use std::sync::Arc;

use crate::error::ConfigError;
use crate::register::{RegisterCell, RegisterKind};
use crate::value::ActionArgs;

use super::registry::ActionRegistry;
use super::Action;

/// An action attached to a register cell, with its arguments.
#[derive(Clone)]
pub struct ActionBinding {
    name: String,
    args: ActionArgs,
    action: Arc<dyn Action>,
}

impl ActionBinding {
    /// Resolves `name` in `registry`.
    ///
    /// # Errors
    /// `UnknownAction` when the registry has no action of that name.
    pub fn resolve(
        name: &str,
        args: ActionArgs,
        registry: &ActionRegistry,
        kind: RegisterKind,
        address: u16,
    ) -> Result<Self, ConfigError> {
        let action = registry.lookup(name).ok_or_else(|| ConfigError::UnknownAction {
            name: name.to_string(),
            kind,
            address,
        })?;
        Ok(Self {
            name: name.to_string(),
            args,
            action,
        })
    }

    /// Name the action was registered under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Arguments passed on every call.
    #[must_use]
    pub const fn args(&self) -> &ActionArgs {
        &self.args
    }

    /// The resolved action.
    #[must_use]
    pub fn action(&self) -> &dyn Action {
        self.action.as_ref()
    }
}

impl std::fmt::Debug for ActionBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionBinding")
            .field("name", &self.name)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

/// Binds `action` with `args` to `cell`.
///
/// With no action name the cell stays unbound, which is the invoker's fast
/// path. Arguments are stored as given.
///
/// # Errors
/// - `UnknownAction` when the name does not resolve
/// - `ArgumentsWithoutAction` when arguments are given without an action
pub fn bind(
    cell: &mut RegisterCell,
    kind: RegisterKind,
    action: Option<&str>,
    args: ActionArgs,
    registry: &ActionRegistry,
) -> Result<(), ConfigError> {
    let Some(name) = action else {
        if args.is_empty() {
            return Ok(());
        }
        return Err(ConfigError::ArgumentsWithoutAction {
            kind,
            address: cell.address(),
        });
    };

    let binding = ActionBinding::resolve(name, args, registry, kind, cell.address())?;
    cell.attach(binding);
    Ok(())
}
