//! Simulated device: register store, bindings and request pipeline.
//!
//! A [`Device`] is built once from a [`DeviceConfig`] and an action registry.
//! Every binding is resolved during the build, so an unknown action name stops
//! construction before any request is served.
//!
//! Requests are serialized on the device's store lock. Each request runs
//! validate → write → WRITE-phase actions → READ_BACK-phase actions → encode
//! without interleaving with other requests. An action that blocks holds that
//! lock, delaying other requests to the same device.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, debug_span};

use crate::action::{bind, builtin, ActionRegistry, ModuleResolver};
use crate::config::{DeviceConfig, SpaceConfig};
use crate::error::{ConfigError, SimError, SimResult};
use crate::pipeline::{HookFailurePolicy, RequestPipeline};
use crate::protocol::{Request, Response};
use crate::register::{CellValue, RegisterKind, RegisterSpace, RegisterStore};

/// A simulated device.
#[derive(Debug)]
pub struct Device {
    store: Mutex<RegisterStore>,
    pipeline: RequestPipeline,
    registry: Arc<ActionRegistry>,
}

impl Device {
    /// Builds a device whose bindings resolve against `registry`.
    ///
    /// # Errors
    /// Any layout error, or `UnknownAction` for a binding that does not resolve.
    pub fn build(config: &DeviceConfig, registry: Arc<ActionRegistry>) -> Result<Self, ConfigError> {
        let spaces = [
            build_space(RegisterKind::Coil, config.space(RegisterKind::Coil), &registry)?,
            build_space(RegisterKind::DiscreteInput, config.space(RegisterKind::DiscreteInput), &registry)?,
            build_space(RegisterKind::HoldingRegister, config.space(RegisterKind::HoldingRegister), &registry)?,
            build_space(RegisterKind::InputRegister, config.space(RegisterKind::InputRegister), &registry)?,
        ];
        let store = RegisterStore::new(spaces);

        debug!(
            bound_cells = store.bound_cells(),
            policy = ?config.hook_failure_policy,
            "device built"
        );

        Ok(Self {
            store: Mutex::new(store),
            pipeline: RequestPipeline::new(config.hook_failure_policy),
            registry,
        })
    }

    /// Builds the registry (built-in module plus the configured custom
    /// module, if any) and then the device.
    ///
    /// # Errors
    /// `ModuleLoadFailure`, `DuplicateActionName`, or any error of [`Device::build`].
    pub fn from_config(config: &DeviceConfig, resolver: &dyn ModuleResolver) -> Result<Self, ConfigError> {
        let mut builder = ActionRegistry::builder().module(builtin::module());
        if let Some(module) = config.custom_actions_module.as_deref() {
            builder = builder.resolve_module(resolver, module)?;
        }
        Self::build(config, Arc::new(builder.build()?))
    }

    /// Handles one request, turning every failure into an exception response.
    ///
    /// Never panics because of a misbehaving action.
    pub fn handle(&self, request: &Request) -> Response {
        match self.try_handle(request) {
            Ok(response) => response,
            Err(err) => {
                let code = match &err {
                    SimError::Request(e) => e.exception_code(),
                    _ => crate::protocol::ExceptionCode::ServerDeviceFailure,
                };
                debug!(error = %err, %code, "request failed");
                Response::Exception {
                    function_code: request.function_code(),
                    code,
                }
            }
        }
    }

    /// Handles one request.
    ///
    /// # Errors
    /// `SimError::Request` for protocol exceptions and action failures,
    /// `SimError::Internal` for a poisoned store lock.
    pub fn try_handle(&self, request: &Request) -> SimResult<Response> {
        let function_code = request.function_code();
        let _span = debug_span!("request", %function_code).entered();

        let mut store = self.lock()?;
        Ok(self.pipeline.execute(&mut store, request)?)
    }

    /// Current value of a cell.
    ///
    /// # Errors
    /// `SimError::Internal` for a poisoned store lock.
    pub fn value(&self, kind: RegisterKind, address: u16) -> SimResult<Option<CellValue>> {
        Ok(self.lock()?.value(kind, address))
    }

    /// Runs `f` with shared access to the store.
    ///
    /// # Errors
    /// `SimError::Internal` for a poisoned store lock.
    pub fn with_store<R>(&self, f: impl FnOnce(&RegisterStore) -> R) -> SimResult<R> {
        let store = self.lock()?;
        Ok(f(&*store))
    }

    /// Registry the device's bindings were resolved against.
    #[must_use]
    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    #[must_use]
    pub const fn hook_failure_policy(&self) -> HookFailurePolicy {
        self.pipeline.policy()
    }

    fn lock(&self) -> SimResult<MutexGuard<'_, RegisterStore>> {
        self.store
            .lock()
            .map_err(|_| SimError::internal("register store lock poisoned"))
    }
}

fn build_space(kind: RegisterKind, cfg: &SpaceConfig, registry: &ActionRegistry) -> Result<RegisterSpace, ConfigError> {
    let mut space = RegisterSpace::new(kind, cfg.start, cfg.size, cfg.default.unwrap_or(kind.zero()))?;
    let mut seen = HashSet::with_capacity(cfg.cells.len());

    for cell_cfg in &cfg.cells {
        let address = cell_cfg.address;
        if !seen.insert(address) {
            return Err(ConfigError::DuplicateAddress { kind, address });
        }
        let cell = space
            .cell_mut(address)
            .ok_or(ConfigError::AddressOutOfRange { kind, address })?;

        if let Some(value) = cell_cfg.value {
            cell.set_value(value).map_err(|_| ConfigError::ValueKindMismatch {
                kind,
                address,
                expected: kind.zero().type_name(),
            })?;
        }
        bind(cell, kind, cell_cfg.action.as_deref(), cell_cfg.kwargs.clone(), registry)?;
    }

    Ok(space)
}
