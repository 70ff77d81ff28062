//! # regsim - custom action dispatch for a register-level device simulator
//!
//! regsim models a Modbus-style device whose register cells can carry
//! user-supplied hook logic ("actions"). Actions are bound to cells by
//! configuration and invoked while the device processes client requests.
//!
//! ## Core Concepts
//!
//! - **ActionRegistry**: immutable name → action map built once at startup
//! - **ActionBinding**: an action plus its typed kwargs, attached to one cell
//! - **Invoker**: calls the bound action for one invocation point and turns
//!   errors and panics into [`ActionError`]
//! - **Pipeline**: decides, per function code, which cells get called in which
//!   [`Phase`]; write-and-echo requests call WRITE then READ_BACK
//!
//! ## Usage
//!
//! ```rust
//! use regsim::{Device, DeviceConfig, FunctionCode, Request, Response, StaticModules};
//!
//! let config = DeviceConfig::from_json_str(r#"{
//!     "custom_actions_module": "custom_actions",
//!     "holding_registers": {
//!         "size": 16,
//!         "cells": [
//!             { "address": 3, "action": "read_hr_always_return_value", "kwargs": { "value": 1234 } }
//!         ]
//!     }
//! }"#)?;
//! let device = Device::from_config(&config, &StaticModules::standard())?;
//!
//! let response = device.handle(&Request::ReadHoldingRegisters { address: 3, count: 1 });
//! assert_eq!(
//!     response,
//!     Response::ReadWords { function_code: FunctionCode::ReadHoldingRegisters, values: vec![1234] }
//! );
//! # Ok::<(), regsim::ConfigError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod action;
pub mod config;
pub mod device;
pub mod error;
pub mod pipeline;
pub mod protocol;
pub mod register;
pub mod value;

// Re-export primary types at crate root for convenience
pub use action::{
    bind, invoke, Action, ActionBinding, ActionModule, ActionRegistry, ActionRegistryBuilder, InvocationContext,
    ModuleResolver, Phase, StaticModules,
};
pub use config::{CellConfig, DeviceConfig, SpaceConfig};
pub use device::Device;
pub use error::{ActionError, ConfigError, HookError, RequestError, SimError, SimResult};
pub use pipeline::{invoke_for_function_code, AffectedCells, HookFailurePolicy, RequestPipeline};
pub use protocol::{ExceptionCode, FunctionClass, FunctionCode, Request, Response};
pub use register::{CellValue, RegisterCell, RegisterKind, RegisterSpace, RegisterStore};
pub use value::{ActionArgs, ArgValue};
