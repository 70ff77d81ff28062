//! Error types for regsim.
//!
//! All errors in regsim are strongly typed using thiserror.
//! Startup problems surface as [`ConfigError`] and abort device construction;
//! request-time hook problems surface as [`ActionError`] and are turned into
//! protocol exception responses by the pipeline.

use thiserror::Error;

use crate::action::Phase;
use crate::protocol::{ExceptionCode, FunctionCode};
use crate::register::RegisterKind;

/// Configuration errors raised while building the registry or the device.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Action name '{name}' is registered more than once")]
    DuplicateActionName {
        name: String,
    },

    #[error("Register {kind} {address} references unknown action '{name}'")]
    UnknownAction {
        name: String,
        kind: RegisterKind,
        address: u16,
    },

    #[error("Action module '{module}' could not be loaded: {reason}")]
    ModuleLoadFailure {
        module: String,
        reason: String,
    },

    #[error("Register {kind} {address} is outside the configured space")]
    AddressOutOfRange {
        kind: RegisterKind,
        address: u16,
    },

    #[error("Register {kind} {address} is configured more than once")]
    DuplicateAddress {
        kind: RegisterKind,
        address: u16,
    },

    #[error("Register {kind} {address} has a value of the wrong kind: expected {expected}")]
    ValueKindMismatch {
        kind: RegisterKind,
        address: u16,
        expected: &'static str,
    },

    #[error("Register {kind} {address} has kwargs but no action")]
    ArgumentsWithoutAction {
        kind: RegisterKind,
        address: u16,
    },

    #[error("Space {kind} starting at {start} with size {size} exceeds the 16-bit address range")]
    SpaceTooLarge {
        kind: RegisterKind,
        start: u16,
        size: usize,
    },

    #[error("Invalid configuration: {message}")]
    Parse {
        message: String,
    },

    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors an action implementation reports about its own invocation.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("Required argument '{name}' is missing")]
    MissingArgument {
        name: String,
    },

    #[error("Argument '{name}' must be {expected}, got {found}")]
    InvalidArgument {
        name: String,
        expected: &'static str,
        found: String,
    },

    #[error("Target cell holds a {found} value, expected {expected}")]
    CellKindMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Action panicked: {message}")]
    Panicked {
        message: String,
    },

    #[error("{message}")]
    Failed {
        message: String,
    },
}

impl HookError {
    /// Creates a free-form failure.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

/// Request-time errors raised by the action invoker.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("Action '{action}' failed on {kind} {address} (function code {function_code}, {phase} phase): {source}")]
    HookFailure {
        action: String,
        kind: RegisterKind,
        address: u16,
        function_code: FunctionCode,
        phase: Phase,
        #[source]
        source: HookError,
    },
}

impl ActionError {
    /// Name of the action that failed.
    #[must_use]
    pub fn action_name(&self) -> &str {
        match self {
            Self::HookFailure { action, .. } => action,
        }
    }

    /// Phase in which the failure happened.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        match self {
            Self::HookFailure { phase, .. } => *phase,
        }
    }
}

/// Errors that abort the processing of a single request.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Protocol exception: {0}")]
    Exception(ExceptionCode),

    #[error(transparent)]
    Action(#[from] ActionError),
}

impl RequestError {
    /// Exception code reported to the client for this error.
    #[must_use]
    pub const fn exception_code(&self) -> ExceptionCode {
        match self {
            Self::Exception(code) => *code,
            Self::Action(_) => ExceptionCode::ServerDeviceFailure,
        }
    }
}

impl From<ExceptionCode> for RequestError {
    fn from(code: ExceptionCode) -> Self {
        Self::Exception(code)
    }
}

/// Top-level error type for regsim.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Request error: {0}")]
    Request(#[from] RequestError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl SimError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns true if a hook failure aborted the request.
    #[must_use]
    pub const fn is_action(&self) -> bool {
        matches!(self, Self::Request(RequestError::Action(_)))
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }
}

/// Result type alias for regsim operations.
pub type SimResult<T> = Result<T, SimError>;
