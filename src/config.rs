//! Device configuration.
//!
//! A device is described by one JSON document: the optional user action module
//! to load, the hook failure policy, and the layout of the four register spaces.
//! Individual cells can carry an initial value and an action binding:
//!
//! ```json
//! {
//!   "custom_actions_module": "custom_actions",
//!   "holding_registers": {
//!     "size": 4096,
//!     "cells": [
//!       { "address": 2307, "action": "write_hr_delay", "kwargs": { "time_s": 0.5 } }
//!     ]
//!   }
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::pipeline::HookFailurePolicy;
use crate::register::{CellValue, RegisterKind};
use crate::value::ActionArgs;

/// Top-level device configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeviceConfig {
    /// User action module resolved by name at startup. The built-in module is
    /// always available.
    pub custom_actions_module: Option<String>,
    pub hook_failure_policy: HookFailurePolicy,
    pub coils: SpaceConfig,
    pub discrete_inputs: SpaceConfig,
    pub holding_registers: SpaceConfig,
    pub input_registers: SpaceConfig,
}

/// Layout of one register space.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpaceConfig {
    /// First address of the space.
    pub start: u16,
    /// Number of cells.
    pub size: usize,
    /// Initial value of cells without an explicit one.
    pub default: Option<CellValue>,
    /// Cells with an initial value and/or an action.
    pub cells: Vec<CellConfig>,
}

/// One configured cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CellConfig {
    pub address: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<CellValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "ActionArgs::is_empty")]
    pub kwargs: ActionArgs,
}

impl CellConfig {
    /// A cell with only an initial value.
    #[must_use]
    pub fn with_value(address: u16, value: CellValue) -> Self {
        Self {
            address,
            value: Some(value),
            action: None,
            kwargs: ActionArgs::new(),
        }
    }

    /// A cell bound to `action`.
    #[must_use]
    pub fn with_action(address: u16, action: impl Into<String>, kwargs: ActionArgs) -> Self {
        Self {
            address,
            value: None,
            action: Some(action.into()),
            kwargs,
        }
    }
}

impl DeviceConfig {
    /// Parses a JSON document.
    ///
    /// # Errors
    /// `ConfigError::Parse` for malformed JSON or unknown fields.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })
    }

    /// Reads and parses a JSON file.
    ///
    /// # Errors
    /// `ConfigError::Io` or `ConfigError::Parse`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    #[must_use]
    pub const fn space(&self, kind: RegisterKind) -> &SpaceConfig {
        match kind {
            RegisterKind::Coil => &self.coils,
            RegisterKind::DiscreteInput => &self.discrete_inputs,
            RegisterKind::HoldingRegister => &self.holding_registers,
            RegisterKind::InputRegister => &self.input_registers,
        }
    }

    pub fn space_mut(&mut self, kind: RegisterKind) -> &mut SpaceConfig {
        match kind {
            RegisterKind::Coil => &mut self.coils,
            RegisterKind::DiscreteInput => &mut self.discrete_inputs,
            RegisterKind::HoldingRegister => &mut self.holding_registers,
            RegisterKind::InputRegister => &mut self.input_registers,
        }
    }
}
