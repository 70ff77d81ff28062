//! Custom action dispatch.
//!
//! An [`Action`] is user hook logic bound to a register cell by configuration.
//! The registry maps names to actions once at startup, bindings attach a
//! resolved action plus its arguments to cells, and the invoker calls the bound
//! action at the invocation points the request pipeline defines.
//!
//! Actions may keep private mutable state between calls (for example to act
//! only on the first of the two calls a write-and-echo request produces). The
//! dispatcher never inspects or resets that state. When the same action can be
//! reached by concurrent requests, making that state access-safe is the
//! action's job.

/// Per-cell action bindings.
pub mod binding;
/// Actions shipped with the simulator.
pub mod builtin;
/// Example user module with the delay and fixed-value actions.
pub mod custom;
/// Invocation of bound actions with failure isolation.
pub mod invoker;
/// Immutable name to action registry and module resolution.
pub mod registry;

use serde::{Deserialize, Serialize};

use crate::error::HookError;
use crate::protocol::FunctionCode;
use crate::register::RegisterCell;
use crate::value::ActionArgs;

pub use binding::{bind, ActionBinding};
pub use invoker::invoke;
pub use registry::{ActionModule, ActionRegistry, ActionRegistryBuilder, ModuleResolver, StaticModules};

/// Pipeline phase an invocation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// After the request's value has been stored in the cell.
    Write,
    /// Before the cell's value is encoded into the response.
    ReadBack,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Write => f.write_str("write"),
            Self::ReadBack => f.write_str("read-back"),
        }
    }
}

/// Everything an action sees during one call.
///
/// `registers` is the full cell array of the target's space and `index` the
/// target's position in it, so an action can touch neighbours as well.
#[derive(Debug)]
pub struct InvocationContext<'a> {
    registers: &'a mut [RegisterCell],
    index: usize,
    function_code: FunctionCode,
    phase: Phase,
    args: &'a ActionArgs,
}

impl<'a> InvocationContext<'a> {
    /// `index` must be a valid position in `registers`.
    pub(crate) fn new(
        registers: &'a mut [RegisterCell],
        index: usize,
        function_code: FunctionCode,
        phase: Phase,
        args: &'a ActionArgs,
    ) -> Self {
        debug_assert!(index < registers.len());
        Self {
            registers,
            index,
            function_code,
            phase,
            args,
        }
    }

    /// Function code of the request being processed.
    #[must_use]
    pub const fn function_code(&self) -> FunctionCode {
        self.function_code
    }

    /// Phase this call belongs to.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Position of the target cell in [`registers`](Self::registers).
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Arguments configured with the binding.
    #[must_use]
    pub const fn args(&self) -> &ActionArgs {
        self.args
    }

    /// The cell the action is bound to.
    #[must_use]
    pub fn cell(&self) -> &RegisterCell {
        &self.registers[self.index]
    }

    /// Mutable access to the target cell.
    pub fn cell_mut(&mut self) -> &mut RegisterCell {
        &mut self.registers[self.index]
    }

    /// Every cell of the target's register space.
    #[must_use]
    pub fn registers(&self) -> &[RegisterCell] {
        &*self.registers
    }

    /// Mutable access to the whole register space.
    pub fn registers_mut(&mut self) -> &mut [RegisterCell] {
        &mut *self.registers
    }
}

/// User-supplied hook logic.
///
/// Effects are communicated only through the context's cells, by blocking the
/// calling thread, or through the action's own state. Returning an error fails
/// the request the call belongs to; it never tears down the simulator.
pub trait Action: Send + Sync {
    /// Runs the action for one invocation point.
    ///
    /// # Errors
    /// Any [`HookError`]; malformed arguments should be reported as
    /// `MissingArgument` or `InvalidArgument`.
    fn invoke(&self, ctx: &mut InvocationContext<'_>) -> Result<(), HookError>;
}

impl<F> Action for F
where
    F: Fn(&mut InvocationContext<'_>) -> Result<(), HookError> + Send + Sync,
{
    fn invoke(&self, ctx: &mut InvocationContext<'_>) -> Result<(), HookError> {
        self(ctx)
    }
}
