//! Invocation of bound actions.
//!
//! The invoker calls whatever is bound to the target cell, once per call it
//! receives. It never suppresses a call and never swallows a failure: an error
//! or a panic inside the action becomes an [`ActionError::HookFailure`].

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{error, trace};

use crate::error::{ActionError, HookError};
use crate::protocol::FunctionCode;
use crate::register::{RegisterCell, RegisterKind};

use super::{InvocationContext, Phase};

/// Invokes the action bound to `registers[index]`, if any.
///
/// Unbound cells (and indices outside `registers`) return `Ok(())` without
/// touching any action.
///
/// # Errors
/// `ActionError::HookFailure` when the action returns an error or panics.
pub fn invoke(
    registers: &mut [RegisterCell],
    index: usize,
    kind: RegisterKind,
    function_code: FunctionCode,
    phase: Phase,
) -> Result<(), ActionError> {
    let Some(binding) = registers.get(index).and_then(RegisterCell::binding) else {
        return Ok(());
    };
    // The binding lives on the cell the action may mutate; hold our own handle.
    let binding = Arc::clone(binding);
    let address = registers[index].address();

    trace!(
        action = binding.name(),
        %kind,
        address,
        %function_code,
        %phase,
        "invoking action"
    );

    let mut ctx = InvocationContext::new(registers, index, function_code, phase, binding.args());
    let outcome = catch_unwind(AssertUnwindSafe(|| binding.action().invoke(&mut ctx)));

    let source = match outcome {
        Ok(Ok(())) => return Ok(()),
        Ok(Err(err)) => err,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(action = binding.name(), %kind, address, %message, "action panicked");
            HookError::Panicked { message }
        }
    };

    Err(ActionError::HookFailure {
        action: binding.name().to_string(),
        kind,
        address,
        function_code,
        phase,
        source,
    })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;
    use crate::action::{bind, ActionRegistry};
    use crate::register::CellValue;
    use crate::value::ActionArgs;

    fn cells(n: u16) -> Vec<RegisterCell> {
        (0..n).map(|a| RegisterCell::new(a, CellValue::Word(0))).collect()
    }

    #[test]
    fn test_unbound_cell_is_noop() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let registry = ActionRegistry::builder()
            .register_fn("count", move |_ctx| {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .build()
            .unwrap();

        let mut regs = cells(3);
        bind(&mut regs[0], RegisterKind::HoldingRegister, Some("count"), ActionArgs::new(), &registry).unwrap();

        invoke(&mut regs, 1, RegisterKind::HoldingRegister, FunctionCode::ReadHoldingRegisters, Phase::ReadBack)
            .unwrap();
        invoke(&mut regs, 99, RegisterKind::HoldingRegister, FunctionCode::ReadHoldingRegisters, Phase::ReadBack)
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        invoke(&mut regs, 0, RegisterKind::HoldingRegister, FunctionCode::ReadHoldingRegisters, Phase::ReadBack)
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_context_carries_call_details() {
        let seen: Arc<Mutex<Vec<(usize, FunctionCode, Phase, i64)>>> = Arc::default();
        let log = Arc::clone(&seen);
        let registry = ActionRegistry::builder()
            .register_fn("record", move |ctx| {
                let value = ctx.args().int("value")?;
                log.lock().unwrap().push((ctx.index(), ctx.function_code(), ctx.phase(), value));
                ctx.cell_mut().set_word(u16::try_from(value).unwrap_or(0))?;
                Ok(())
            })
            .build()
            .unwrap();

        let mut regs = cells(4);
        bind(
            &mut regs[2],
            RegisterKind::HoldingRegister,
            Some("record"),
            ActionArgs::new().with("value", 77),
            &registry,
        )
        .unwrap();

        invoke(&mut regs, 2, RegisterKind::HoldingRegister, FunctionCode::WriteSingleRegister, Phase::Write).unwrap();

        assert_eq!(
            seen.lock().unwrap().as_slice(),
            &[(2, FunctionCode::WriteSingleRegister, Phase::Write, 77)]
        );
        assert_eq!(regs[2].value(), CellValue::Word(77));
    }

    #[test]
    fn test_action_error_becomes_hook_failure() {
        let registry = ActionRegistry::builder()
            .register_fn("needs_arg", |ctx| ctx.args().float("time_s").map(|_| ()))
            .build()
            .unwrap();
        let mut regs = cells(1);
        bind(&mut regs[0], RegisterKind::HoldingRegister, Some("needs_arg"), ActionArgs::new(), &registry).unwrap();

        let err = invoke(&mut regs, 0, RegisterKind::HoldingRegister, FunctionCode::WriteSingleRegister, Phase::Write)
            .unwrap_err();
        let ActionError::HookFailure { action, phase, source, .. } = err;
        assert_eq!(action, "needs_arg");
        assert_eq!(phase, Phase::Write);
        assert!(matches!(source, HookError::MissingArgument { .. }));
    }

    #[test]
    fn test_panic_is_contained() {
        let registry = ActionRegistry::builder()
            .register_fn("boom", |_ctx| panic!("pump jammed"))
            .build()
            .unwrap();
        let mut regs = cells(1);
        bind(&mut regs[0], RegisterKind::HoldingRegister, Some("boom"), ActionArgs::new(), &registry).unwrap();

        let err = invoke(&mut regs, 0, RegisterKind::HoldingRegister, FunctionCode::ReadHoldingRegisters, Phase::ReadBack)
            .unwrap_err();
        let ActionError::HookFailure { source, .. } = err;
        assert!(matches!(source, HookError::Panicked { ref message } if message.contains("pump jammed")));
        // The cell array is intact and still usable.
        assert_eq!(regs[0].value(), CellValue::Word(0));
    }
}
