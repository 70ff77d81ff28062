//! Which cells get an action call, in which phase, for each function code.
//!
//! | class          | WRITE phase           | READ_BACK phase        |
//! |----------------|-----------------------|------------------------|
//! | pure read      | -                     | once per returned cell |
//! | pure write     | once per written cell | -                      |
//! | write and echo | once per written cell | once per written or returned cell |
//!
//! All WRITE-phase calls of a request run before any READ_BACK-phase call, on
//! the calling thread, before the response is encoded. A cell that is both
//! written and returned (function code 23 with overlapping ranges) gets one
//! READ_BACK call.

use std::ops::Range;

use tracing::warn;

use crate::action::{invoke, Phase};
use crate::error::ActionError;
use crate::protocol::{FunctionClass, FunctionCode};
use crate::register::RegisterCell;

/// Phases in which `function_code` invokes actions, in call order.
#[must_use]
pub const fn phases(function_code: FunctionCode) -> &'static [Phase] {
    match function_code.class() {
        FunctionClass::PureRead => &[Phase::ReadBack],
        FunctionClass::PureWrite => &[Phase::Write],
        FunctionClass::WriteAndEcho => &[Phase::Write, Phase::ReadBack],
    }
}

/// Cell index ranges a request touches within its register space.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AffectedCells {
    /// Cells the request writes.
    pub written: Range<usize>,
    /// Cells whose values are encoded into the response.
    pub returned: Range<usize>,
}

impl AffectedCells {
    /// Pure read: READ_BACK on every returned cell.
    #[must_use]
    pub const fn read(returned: Range<usize>) -> Self {
        Self {
            written: 0..0,
            returned,
        }
    }

    /// Pure write: WRITE on every written cell.
    #[must_use]
    pub const fn write(written: Range<usize>) -> Self {
        Self {
            written,
            returned: 0..0,
        }
    }

    /// The written cells are also the ones echoed back.
    #[must_use]
    pub fn echo(cells: Range<usize>) -> Self {
        Self {
            written: cells.clone(),
            returned: cells,
        }
    }

    /// Function code 23: READ_BACK covers the written and the returned cells.
    #[must_use]
    pub const fn write_then_read(written: Range<usize>, returned: Range<usize>) -> Self {
        Self { written, returned }
    }

    /// Cell indices visited in `phase`, ascending, each at most once.
    fn for_phase(&self, phase: Phase) -> impl Iterator<Item = usize> + '_ {
        let span = match phase {
            Phase::Write => self.written.clone(),
            Phase::ReadBack if self.written.is_empty() => self.returned.clone(),
            Phase::ReadBack if self.returned.is_empty() => self.written.clone(),
            Phase::ReadBack => {
                self.written.start.min(self.returned.start)..self.written.end.max(self.returned.end)
            }
        };
        span.filter(move |i| match phase {
            Phase::Write => true,
            Phase::ReadBack => self.written.contains(i) || self.returned.contains(i),
        })
    }
}

/// Runs every invocation point `function_code` defines over `affected`.
///
/// A failing call does not stop the remaining ones: a WRITE-phase failure is
/// still followed by the READ_BACK phase. The first failure is returned once
/// all points ran; later ones are logged.
///
/// # Errors
/// The first `ActionError` raised by any invocation point.
pub fn invoke_for_function_code(
    function_code: FunctionCode,
    registers: &mut [RegisterCell],
    affected: &AffectedCells,
) -> Result<(), ActionError> {
    let kind = function_code.space();
    let mut first_failure = None;

    for &phase in phases(function_code) {
        for index in affected.for_phase(phase) {
            if let Err(err) = invoke(registers, index, kind, function_code, phase) {
                if first_failure.is_none() {
                    first_failure = Some(err);
                } else {
                    warn!(error = %err, "further action failure in the same request");
                }
            }
        }
    }

    first_failure.map_or(Ok(()), Err)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::action::{bind, ActionRegistry};
    use crate::error::HookError;
    use crate::register::{CellValue, RegisterKind};
    use crate::value::ActionArgs;

    type Calls = Arc<Mutex<Vec<(u16, Phase)>>>;

    fn recording_cells(n: u16, fail: bool) -> (Vec<RegisterCell>, Calls) {
        let calls: Calls = Arc::default();
        let log = Arc::clone(&calls);
        let registry = ActionRegistry::builder()
            .register_fn("record", move |ctx| {
                log.lock().unwrap().push((ctx.cell().address(), ctx.phase()));
                if fail {
                    return Err(HookError::failed("sensor offline"));
                }
                Ok(())
            })
            .build()
            .unwrap();

        let mut cells: Vec<RegisterCell> = (0..n).map(|a| RegisterCell::new(a, CellValue::Word(0))).collect();
        for cell in &mut cells {
            bind(cell, RegisterKind::HoldingRegister, Some("record"), ActionArgs::new(), &registry).unwrap();
        }
        (cells, calls)
    }

    #[test]
    fn test_phase_table() {
        assert_eq!(phases(FunctionCode::ReadCoils), &[Phase::ReadBack]);
        assert_eq!(phases(FunctionCode::ReadInputRegisters), &[Phase::ReadBack]);
        assert_eq!(phases(FunctionCode::WriteMultipleCoils), &[Phase::Write]);
        assert_eq!(phases(FunctionCode::WriteMultipleRegisters), &[Phase::Write]);
        for fc in [
            FunctionCode::WriteSingleCoil,
            FunctionCode::WriteSingleRegister,
            FunctionCode::MaskWriteRegister,
            FunctionCode::ReadWriteMultipleRegisters,
        ] {
            assert_eq!(phases(fc), &[Phase::Write, Phase::ReadBack], "function code {fc}");
        }
    }

    #[test]
    fn test_write_and_echo_calls_write_then_read_back() {
        let (mut cells, calls) = recording_cells(4, false);
        invoke_for_function_code(FunctionCode::WriteSingleRegister, &mut cells, &AffectedCells::echo(2..3)).unwrap();
        assert_eq!(calls.lock().unwrap().as_slice(), &[(2, Phase::Write), (2, Phase::ReadBack)]);
    }

    #[test]
    fn test_all_writes_precede_all_read_backs() {
        let (mut cells, calls) = recording_cells(6, false);
        invoke_for_function_code(
            FunctionCode::ReadWriteMultipleRegisters,
            &mut cells,
            &AffectedCells::write_then_read(0..2, 3..6),
        )
        .unwrap();
        assert_eq!(
            calls.lock().unwrap().as_slice(),
            &[
                (0, Phase::Write),
                (1, Phase::Write),
                (0, Phase::ReadBack),
                (1, Phase::ReadBack),
                (3, Phase::ReadBack),
                (4, Phase::ReadBack),
                (5, Phase::ReadBack),
            ]
        );
    }

    #[test]
    fn test_read_write_multiple_reads_back_written_cells_outside_read_range() {
        let (mut cells, calls) = recording_cells(10, false);
        invoke_for_function_code(
            FunctionCode::ReadWriteMultipleRegisters,
            &mut cells,
            &AffectedCells::write_then_read(8..9, 0..2),
        )
        .unwrap();
        assert_eq!(
            calls.lock().unwrap().as_slice(),
            &[
                (8, Phase::Write),
                (0, Phase::ReadBack),
                (1, Phase::ReadBack),
                (8, Phase::ReadBack),
            ]
        );
    }

    #[test]
    fn test_overlapping_ranges_read_back_each_cell_once() {
        let (mut cells, calls) = recording_cells(6, false);
        invoke_for_function_code(
            FunctionCode::ReadWriteMultipleRegisters,
            &mut cells,
            &AffectedCells::write_then_read(2..4, 3..5),
        )
        .unwrap();
        assert_eq!(
            calls.lock().unwrap().as_slice(),
            &[
                (2, Phase::Write),
                (3, Phase::Write),
                (2, Phase::ReadBack),
                (3, Phase::ReadBack),
                (4, Phase::ReadBack),
            ]
        );
    }

    #[test]
    fn test_pure_write_and_pure_read_call_once_per_cell() {
        let (mut cells, calls) = recording_cells(5, false);
        invoke_for_function_code(FunctionCode::WriteMultipleRegisters, &mut cells, &AffectedCells::write(1..4)).unwrap();
        assert_eq!(
            calls.lock().unwrap().as_slice(),
            &[(1, Phase::Write), (2, Phase::Write), (3, Phase::Write)]
        );

        calls.lock().unwrap().clear();
        invoke_for_function_code(FunctionCode::ReadHoldingRegisters, &mut cells, &AffectedCells::read(0..2)).unwrap();
        assert_eq!(calls.lock().unwrap().as_slice(), &[(0, Phase::ReadBack), (1, Phase::ReadBack)]);
    }

    #[test]
    fn test_write_failure_does_not_skip_read_back() {
        let (mut cells, calls) = recording_cells(1, true);
        let err = invoke_for_function_code(FunctionCode::WriteSingleRegister, &mut cells, &AffectedCells::echo(0..1))
            .unwrap_err();
        assert_eq!(err.phase(), Phase::Write);
        assert_eq!(calls.lock().unwrap().as_slice(), &[(0, Phase::Write), (0, Phase::ReadBack)]);
    }
}
