//! Actions shipped with the simulator.
//!
//! All of them act on the READ_BACK phase only, so a write-and-echo request
//! triggers them once.

use std::time::Instant;

use chrono::{Datelike, Timelike, Utc};

use crate::error::HookError;

use super::registry::ActionModule;
use super::{Action, InvocationContext, Phase};

/// Name under which [`module`] is resolved.
pub const MODULE_NAME: &str = "builtin";

/// Registers written by [`timestamp`].
pub const TIMESTAMP_WORDS: usize = 7;

/// The built-in module: `increment`, `timestamp`, `uptime`.
#[must_use]
pub fn module() -> ActionModule {
    ActionModule::new(MODULE_NAME)
        .with_fn("increment", increment)
        .with_fn("timestamp", timestamp)
        .with("uptime", Uptime::new())
}

/// Adds `step` (default 1) to the cell, wrapping from above `max` back to `min`.
///
/// kwargs: `step`, `min` (default 0), `max` (default 65535).
///
/// # Errors
/// Malformed kwargs, `min > max`, or a bit cell.
pub fn increment(ctx: &mut InvocationContext<'_>) -> Result<(), HookError> {
    if ctx.phase() != Phase::ReadBack {
        return Ok(());
    }
    let step = ctx.args().int_or("step", 1)?;
    let min = ctx.args().int_or("min", 0)?;
    let max = ctx.args().int_or("max", i64::from(u16::MAX))?;
    if min > max || min < 0 || max > i64::from(u16::MAX) {
        return Err(HookError::failed(format!(
            "increment range {min}..={max} must lie within 0..=65535"
        )));
    }

    let current = i64::from(ctx.cell().word()?);
    let span = max - min + 1;
    // Reduce `step` first so arbitrary configured steps cannot overflow.
    let next = min + (current - min + step.rem_euclid(span)).rem_euclid(span);
    // `next` is in min..=max, which was checked to fit a word.
    let next = u16::try_from(next).map_err(|_| HookError::failed("increment overflow"))?;
    ctx.cell_mut().set_word(next)
}

/// Writes the current UTC time into seven consecutive registers starting at
/// the target: year, month, day, weekday (Monday = 1), hour, minute, second.
///
/// # Errors
/// Fewer than seven word registers from the target to the end of the space.
pub fn timestamp(ctx: &mut InvocationContext<'_>) -> Result<(), HookError> {
    if ctx.phase() != Phase::ReadBack {
        return Ok(());
    }
    let index = ctx.index();
    if index + TIMESTAMP_WORDS > ctx.registers().len() {
        return Err(HookError::failed(format!(
            "timestamp needs {TIMESTAMP_WORDS} registers from the target, space ends after {}",
            ctx.registers().len() - index
        )));
    }

    let now = Utc::now();
    let year = u16::try_from(now.year()).map_err(|_| HookError::failed("year out of range"))?;
    let fields = [
        year,
        // Calendar fields are small; the casts cannot truncate.
        now.month() as u16,
        now.day() as u16,
        now.weekday().number_from_monday() as u16,
        now.hour() as u16,
        now.minute() as u16,
        now.second() as u16,
    ];
    for (cell, value) in ctx.registers_mut()[index..index + TIMESTAMP_WORDS].iter_mut().zip(fields) {
        cell.set_word(value)?;
    }
    Ok(())
}

/// Seconds since the action was created, saturating at 65535.
#[derive(Debug)]
pub struct Uptime {
    started: Instant,
}

impl Uptime {
    /// Uptime counter starting now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for Uptime {
    fn default() -> Self {
        Self::new()
    }
}

impl Action for Uptime {
    fn invoke(&self, ctx: &mut InvocationContext<'_>) -> Result<(), HookError> {
        if ctx.phase() != Phase::ReadBack {
            return Ok(());
        }
        let secs = u16::try_from(self.started.elapsed().as_secs()).unwrap_or(u16::MAX);
        ctx.cell_mut().set_word(secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::FunctionCode;
    use crate::register::{CellValue, RegisterCell};
    use crate::value::ActionArgs;

    fn words(values: &[u16]) -> Vec<RegisterCell> {
        values
            .iter()
            .zip(0u16..)
            .map(|(v, a)| RegisterCell::new(a, CellValue::Word(*v)))
            .collect()
    }

    fn run(
        action: &dyn Action,
        regs: &mut [RegisterCell],
        index: usize,
        phase: Phase,
        args: &ActionArgs,
    ) -> Result<(), HookError> {
        let mut ctx = InvocationContext::new(regs, index, FunctionCode::ReadHoldingRegisters, phase, args);
        action.invoke(&mut ctx)
    }

    #[test]
    fn test_increment_steps_and_wraps() {
        let mut regs = words(&[8]);
        let args = ActionArgs::new().with("step", 2).with("min", 5).with("max", 9);

        run(&increment, &mut regs, 0, Phase::ReadBack, &args).unwrap();
        assert_eq!(regs[0].value(), CellValue::Word(5));
        run(&increment, &mut regs, 0, Phase::ReadBack, &args).unwrap();
        assert_eq!(regs[0].value(), CellValue::Word(7));
    }

    #[test]
    fn test_increment_ignores_write_phase() {
        let mut regs = words(&[1]);
        run(&increment, &mut regs, 0, Phase::Write, &ActionArgs::new()).unwrap();
        assert_eq!(regs[0].value(), CellValue::Word(1));
        run(&increment, &mut regs, 0, Phase::ReadBack, &ActionArgs::new()).unwrap();
        assert_eq!(regs[0].value(), CellValue::Word(2));
    }

    #[test]
    fn test_increment_default_wraps_at_word_max() {
        let mut regs = words(&[u16::MAX]);
        run(&increment, &mut regs, 0, Phase::ReadBack, &ActionArgs::new()).unwrap();
        assert_eq!(regs[0].value(), CellValue::Word(0));
    }

    #[test]
    fn test_increment_extreme_steps_do_not_overflow() {
        let mut regs = words(&[0]);
        let args = ActionArgs::new().with("step", i64::MAX);
        run(&increment, &mut regs, 0, Phase::ReadBack, &args).unwrap();
        assert_eq!(regs[0].value(), CellValue::Word(u16::MAX));

        let args = ActionArgs::new().with("step", i64::MIN);
        run(&increment, &mut regs, 0, Phase::ReadBack, &args).unwrap();
        assert_eq!(regs[0].value(), CellValue::Word(u16::MAX));

        // i64::MAX % 5 == 2
        let mut regs = words(&[8]);
        let args = ActionArgs::new().with("step", i64::MAX).with("min", 5).with("max", 9);
        run(&increment, &mut regs, 0, Phase::ReadBack, &args).unwrap();
        assert_eq!(regs[0].value(), CellValue::Word(5));
    }

    #[test]
    fn test_increment_rejects_bad_range() {
        let mut regs = words(&[0]);
        let args = ActionArgs::new().with("min", 10).with("max", 2);
        assert!(run(&increment, &mut regs, 0, Phase::ReadBack, &args).is_err());

        let args = ActionArgs::new().with("step", "one");
        assert!(matches!(
            run(&increment, &mut regs, 0, Phase::ReadBack, &args),
            Err(HookError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_timestamp_fills_seven_registers() {
        let mut regs = words(&[0; 9]);
        run(&timestamp, &mut regs, 1, Phase::ReadBack, &ActionArgs::new()).unwrap();

        assert_eq!(regs[0].value(), CellValue::Word(0));
        assert!(regs[1].word().unwrap() >= 2024);
        assert!((1..=12).contains(&regs[2].word().unwrap()));
        assert!((1..=31).contains(&regs[3].word().unwrap()));
        assert!((1..=7).contains(&regs[4].word().unwrap()));
        assert!(regs[7].word().unwrap() < 60);
        assert_eq!(regs[8].value(), CellValue::Word(0));
    }

    #[test]
    fn test_timestamp_needs_room() {
        let mut regs = words(&[0; 7]);
        assert!(run(&timestamp, &mut regs, 1, Phase::ReadBack, &ActionArgs::new()).is_err());
        assert!(regs.iter().all(|c| c.value() == CellValue::Word(0)));
    }

    #[test]
    fn test_uptime_starts_near_zero() {
        let mut regs = words(&[500]);
        run(&Uptime::new(), &mut regs, 0, Phase::ReadBack, &ActionArgs::new()).unwrap();
        assert!(regs[0].word().unwrap() < 5);
    }

    #[test]
    fn test_module_contents() {
        let module = module();
        assert_eq!(module.name(), MODULE_NAME);
        assert_eq!(module.len(), 3);
    }
}
