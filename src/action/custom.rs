//! Example user action module.
//!
//! Shows the two typical shapes of user hooks: one that stalls the response to
//! a write, and one that overrides what a read returns.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::error::HookError;
use crate::protocol::FunctionCode;
use crate::value::ArgValue;

use super::registry::ActionModule;
use super::{Action, InvocationContext};

/// Name under which [`module`] is resolved.
pub const MODULE_NAME: &str = "custom_actions";

/// The example module: `write_hr_delay`, `read_hr_always_return_value`.
#[must_use]
pub fn module() -> ActionModule {
    ActionModule::new(MODULE_NAME)
        .with("write_hr_delay", WriteDelay::new())
        .with_fn("read_hr_always_return_value", read_hr_always_return_value)
}

/// Delays the reply to a write single register request by `time_s` seconds.
///
/// A write single register request calls the action twice (write, then
/// read-back). The first call sleeps and raises `performed`; the second sees
/// the flag, lowers it and returns, so the request is delayed once.
///
/// The flag is shared by every cell bound to this instance. One device calls it
/// under its store lock, but devices built from one shared registry can
/// interleave their calls and sleep zero or two times.
#[derive(Debug, Default)]
pub struct WriteDelay {
    performed: AtomicBool,
}

impl WriteDelay {
    /// Delay action with the flag lowered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Action for WriteDelay {
    fn invoke(&self, ctx: &mut InvocationContext<'_>) -> Result<(), HookError> {
        if self.performed.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        if ctx.function_code() == FunctionCode::WriteSingleRegister {
            let secs = ctx.args().float("time_s")?;
            let delay = Duration::try_from_secs_f64(secs).map_err(|_| HookError::InvalidArgument {
                name: "time_s".to_string(),
                expected: "a non-negative number of seconds",
                found: ArgValue::Float(secs).to_string(),
            })?;
            std::thread::sleep(delay);
            self.performed.store(true, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// Makes every read holding registers request return `value` for the cell.
///
/// # Errors
/// Missing or out-of-range `value`.
pub fn read_hr_always_return_value(ctx: &mut InvocationContext<'_>) -> Result<(), HookError> {
    if ctx.function_code() == FunctionCode::ReadHoldingRegisters {
        let value = ctx.args().word("value")?;
        ctx.cell_mut().set_word(value)?;
    }
    Ok(())
}
