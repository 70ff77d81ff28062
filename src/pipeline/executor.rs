//! Request execution.
//!
//! Order of work for every request: validate quantities and addresses, store
//! written values, run the invocation plan, encode the response. Nothing is
//! written when validation fails.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ActionError, RequestError};
use crate::protocol::{
    ExceptionCode, FunctionCode, Request, Response, MAX_READ_BITS, MAX_READ_WORDS, MAX_READ_WRITE_WORDS,
    MAX_WRITE_BITS, MAX_WRITE_WORDS,
};
use crate::register::{CellValue, RegisterCell, RegisterSpace, RegisterStore};

use super::plan::{invoke_for_function_code, AffectedCells};

/// What to do with a request whose action failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookFailurePolicy {
    /// Fail the request with a server device failure exception.
    #[default]
    Abort,
    /// Log the failure and answer normally.
    LogAndContinue,
}

/// Executes decoded requests against a register store.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestPipeline {
    policy: HookFailurePolicy,
}

impl RequestPipeline {
    #[must_use]
    pub const fn new(policy: HookFailurePolicy) -> Self {
        Self { policy }
    }

    #[must_use]
    pub const fn policy(&self) -> HookFailurePolicy {
        self.policy
    }

    /// Executes `request`.
    ///
    /// The caller must hold exclusive access to `store` for the whole call;
    /// actions may block, which stalls the call.
    ///
    /// # Errors
    /// - `RequestError::Exception` for invalid quantities or addresses
    /// - `RequestError::Action` for a failed action under `HookFailurePolicy::Abort`
    pub fn execute(&self, store: &mut RegisterStore, request: &Request) -> Result<Response, RequestError> {
        let function_code = request.function_code();
        let space = store.space_mut(function_code.space());

        match request {
            Request::ReadCoils { address, count } | Request::ReadDiscreteInputs { address, count } => {
                let range = checked_range(space, *address, usize::from(*count), MAX_READ_BITS)?;
                self.run_plan(function_code, space, &AffectedCells::read(range.clone()))?;
                Ok(Response::ReadBits {
                    function_code,
                    values: bits(&space.cells()[range])?,
                })
            }

            Request::ReadHoldingRegisters { address, count } | Request::ReadInputRegisters { address, count } => {
                let range = checked_range(space, *address, usize::from(*count), MAX_READ_WORDS)?;
                self.run_plan(function_code, space, &AffectedCells::read(range.clone()))?;
                Ok(Response::ReadWords {
                    function_code,
                    values: words(&space.cells()[range])?,
                })
            }

            Request::WriteSingleCoil { address, value } => {
                let range = checked_range(space, *address, 1, 1)?;
                store_values(space, range.clone(), std::iter::once(CellValue::Bit(*value)))?;
                self.run_plan(function_code, space, &AffectedCells::echo(range.clone()))?;
                Ok(Response::WriteSingleCoil {
                    address: *address,
                    value: bits(&space.cells()[range])?[0],
                })
            }

            Request::WriteSingleRegister { address, value } => {
                let range = checked_range(space, *address, 1, 1)?;
                store_values(space, range.clone(), std::iter::once(CellValue::Word(*value)))?;
                self.run_plan(function_code, space, &AffectedCells::echo(range.clone()))?;
                Ok(Response::WriteSingleRegister {
                    address: *address,
                    value: words(&space.cells()[range])?[0],
                })
            }

            Request::WriteMultipleCoils { address, values } => {
                let range = checked_range(space, *address, values.len(), MAX_WRITE_BITS)?;
                store_values(space, range.clone(), values.iter().copied().map(CellValue::Bit))?;
                self.run_plan(function_code, space, &AffectedCells::write(range))?;
                Ok(write_multiple(function_code, *address, values.len()))
            }

            Request::WriteMultipleRegisters { address, values } => {
                let range = checked_range(space, *address, values.len(), MAX_WRITE_WORDS)?;
                store_values(space, range.clone(), values.iter().copied().map(CellValue::Word))?;
                self.run_plan(function_code, space, &AffectedCells::write(range))?;
                Ok(write_multiple(function_code, *address, values.len()))
            }

            Request::MaskWriteRegister {
                address,
                and_mask,
                or_mask,
            } => {
                let range = checked_range(space, *address, 1, 1)?;
                let current = words(&space.cells()[range.clone()])?[0];
                let masked = (current & and_mask) | (or_mask & !and_mask);
                store_values(space, range.clone(), std::iter::once(CellValue::Word(masked)))?;
                self.run_plan(function_code, space, &AffectedCells::echo(range))?;
                Ok(Response::MaskWriteRegister {
                    address: *address,
                    and_mask: *and_mask,
                    or_mask: *or_mask,
                })
            }

            Request::ReadWriteMultipleRegisters {
                read_address,
                read_count,
                write_address,
                values,
            } => {
                let read = checked_range(space, *read_address, usize::from(*read_count), MAX_READ_WORDS)?;
                let written = checked_range(space, *write_address, values.len(), MAX_READ_WRITE_WORDS)?;
                store_values(space, written.clone(), values.iter().copied().map(CellValue::Word))?;
                self.run_plan(function_code, space, &AffectedCells::write_then_read(written, read.clone()))?;
                Ok(Response::ReadWords {
                    function_code,
                    values: words(&space.cells()[read])?,
                })
            }
        }
    }

    fn run_plan(
        &self,
        function_code: FunctionCode,
        space: &mut RegisterSpace,
        affected: &AffectedCells,
    ) -> Result<(), ActionError> {
        match invoke_for_function_code(function_code, space.cells_mut(), affected) {
            Ok(()) => Ok(()),
            Err(err) => match self.policy {
                HookFailurePolicy::Abort => {
                    debug!(error = %err, "aborting request after action failure");
                    Err(err)
                }
                HookFailurePolicy::LogAndContinue => {
                    warn!(error = %err, "ignoring action failure");
                    Ok(())
                }
            },
        }
    }
}

fn checked_range(
    space: &RegisterSpace,
    address: u16,
    count: usize,
    max: usize,
) -> Result<Range<usize>, ExceptionCode> {
    if count == 0 || count > max {
        return Err(ExceptionCode::IllegalDataValue);
    }
    space.range(address, count).ok_or(ExceptionCode::IllegalDataAddress)
}

fn store_values(
    space: &mut RegisterSpace,
    range: Range<usize>,
    values: impl Iterator<Item = CellValue>,
) -> Result<(), ExceptionCode> {
    for (cell, value) in space.cells_mut()[range].iter_mut().zip(values) {
        // Request kind always matches the space kind; a mismatch is a device fault.
        cell.set_value(value).map_err(|_| ExceptionCode::ServerDeviceFailure)?;
    }
    Ok(())
}

fn bits(cells: &[RegisterCell]) -> Result<Vec<bool>, ExceptionCode> {
    cells
        .iter()
        .map(|c| c.value().as_bit().ok_or(ExceptionCode::ServerDeviceFailure))
        .collect()
}

fn words(cells: &[RegisterCell]) -> Result<Vec<u16>, ExceptionCode> {
    cells
        .iter()
        .map(|c| c.value().as_word().ok_or(ExceptionCode::ServerDeviceFailure))
        .collect()
}

fn write_multiple(function_code: FunctionCode, address: u16, count: usize) -> Response {
    Response::WriteMultiple {
        function_code,
        address,
        // Bounded by the write quantity limits.
        count: u16::try_from(count).unwrap_or(u16::MAX),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{bind, ActionRegistry};
    use crate::error::HookError;
    use crate::register::RegisterKind;
    use crate::value::ActionArgs;

    fn store() -> RegisterStore {
        RegisterStore::new([
            RegisterSpace::new(RegisterKind::Coil, 0, 16, CellValue::Bit(false)).unwrap(),
            RegisterSpace::new(RegisterKind::DiscreteInput, 0, 16, CellValue::Bit(true)).unwrap(),
            RegisterSpace::new(RegisterKind::HoldingRegister, 0, 16, CellValue::Word(0)).unwrap(),
            RegisterSpace::new(RegisterKind::InputRegister, 0, 16, CellValue::Word(9)).unwrap(),
        ])
    }

    fn bind_holding(store: &mut RegisterStore, address: u16, registry: &ActionRegistry, name: &str) {
        let cell = store.space_mut(RegisterKind::HoldingRegister).cell_mut(address).unwrap();
        bind(cell, RegisterKind::HoldingRegister, Some(name), ActionArgs::new(), registry).unwrap();
    }

    #[test]
    fn test_reads() {
        let mut store = store();
        let pipeline = RequestPipeline::default();

        let resp = pipeline
            .execute(&mut store, &Request::ReadDiscreteInputs { address: 2, count: 3 })
            .unwrap();
        assert_eq!(
            resp,
            Response::ReadBits {
                function_code: FunctionCode::ReadDiscreteInputs,
                values: vec![true; 3]
            }
        );

        let resp = pipeline
            .execute(&mut store, &Request::ReadInputRegisters { address: 14, count: 2 })
            .unwrap();
        assert_eq!(
            resp,
            Response::ReadWords {
                function_code: FunctionCode::ReadInputRegisters,
                values: vec![9, 9]
            }
        );
    }

    #[test]
    fn test_quantity_and_address_validation() {
        let mut store = store();
        let pipeline = RequestPipeline::default();

        let err = pipeline
            .execute(&mut store, &Request::ReadHoldingRegisters { address: 0, count: 0 })
            .unwrap_err();
        assert_eq!(err.exception_code(), ExceptionCode::IllegalDataValue);

        let err = pipeline
            .execute(&mut store, &Request::ReadHoldingRegisters { address: 0, count: 126 })
            .unwrap_err();
        assert_eq!(err.exception_code(), ExceptionCode::IllegalDataValue);

        let err = pipeline
            .execute(&mut store, &Request::ReadHoldingRegisters { address: 10, count: 7 })
            .unwrap_err();
        assert_eq!(err.exception_code(), ExceptionCode::IllegalDataAddress);

        let err = pipeline
            .execute(
                &mut store,
                &Request::WriteMultipleRegisters {
                    address: 15,
                    values: vec![1, 2],
                },
            )
            .unwrap_err();
        assert_eq!(err.exception_code(), ExceptionCode::IllegalDataAddress);
        assert_eq!(store.value(RegisterKind::HoldingRegister, 15), Some(CellValue::Word(0)));
    }

    #[test]
    fn test_writes_store_values() {
        let mut store = store();
        let pipeline = RequestPipeline::default();

        let resp = pipeline
            .execute(&mut store, &Request::WriteSingleCoil { address: 3, value: true })
            .unwrap();
        assert_eq!(resp, Response::WriteSingleCoil { address: 3, value: true });

        let resp = pipeline
            .execute(
                &mut store,
                &Request::WriteMultipleCoils {
                    address: 4,
                    values: vec![true, false, true],
                },
            )
            .unwrap();
        assert_eq!(
            resp,
            Response::WriteMultiple {
                function_code: FunctionCode::WriteMultipleCoils,
                address: 4,
                count: 3
            }
        );
        assert_eq!(store.value(RegisterKind::Coil, 6), Some(CellValue::Bit(true)));

        pipeline
            .execute(
                &mut store,
                &Request::WriteMultipleRegisters {
                    address: 0,
                    values: vec![10, 20],
                },
            )
            .unwrap();
        assert_eq!(store.value(RegisterKind::HoldingRegister, 1), Some(CellValue::Word(20)));
    }

    #[test]
    fn test_mask_write() {
        let mut store = store();
        let pipeline = RequestPipeline::default();
        pipeline
            .execute(&mut store, &Request::WriteSingleRegister { address: 4, value: 0x12 })
            .unwrap();

        let resp = pipeline
            .execute(
                &mut store,
                &Request::MaskWriteRegister {
                    address: 4,
                    and_mask: 0xF2,
                    or_mask: 0x25,
                },
            )
            .unwrap();
        assert_eq!(
            resp,
            Response::MaskWriteRegister {
                address: 4,
                and_mask: 0xF2,
                or_mask: 0x25
            }
        );
        assert_eq!(store.value(RegisterKind::HoldingRegister, 4), Some(CellValue::Word(0x17)));
    }

    #[test]
    fn test_read_write_multiple_returns_read_range() {
        let mut store = store();
        let pipeline = RequestPipeline::default();
        let resp = pipeline
            .execute(
                &mut store,
                &Request::ReadWriteMultipleRegisters {
                    read_address: 1,
                    read_count: 3,
                    write_address: 2,
                    values: vec![7, 8],
                },
            )
            .unwrap();
        assert_eq!(
            resp,
            Response::ReadWords {
                function_code: FunctionCode::ReadWriteMultipleRegisters,
                values: vec![0, 7, 8]
            }
        );
    }

    #[test]
    fn test_write_phase_mutation_reaches_response() {
        let registry = ActionRegistry::builder()
            .register_fn("double_on_write", |ctx| {
                if ctx.phase() == crate::action::Phase::Write {
                    let v = ctx.cell().word()?;
                    ctx.cell_mut().set_word(v.wrapping_mul(2))?;
                }
                Ok(())
            })
            .build()
            .unwrap();
        let mut store = store();
        bind_holding(&mut store, 5, &registry, "double_on_write");

        let resp = RequestPipeline::default()
            .execute(&mut store, &Request::WriteSingleRegister { address: 5, value: 21 })
            .unwrap();
        assert_eq!(resp, Response::WriteSingleRegister { address: 5, value: 42 });
    }

    #[test]
    fn test_failure_policy() {
        let registry = ActionRegistry::builder()
            .register_fn("broken", |_ctx| Err(HookError::failed("broken")))
            .build()
            .unwrap();
        let mut store = store();
        bind_holding(&mut store, 0, &registry, "broken");
        let request = Request::ReadHoldingRegisters { address: 0, count: 2 };

        let err = RequestPipeline::new(HookFailurePolicy::Abort)
            .execute(&mut store, &request)
            .unwrap_err();
        assert!(matches!(err, RequestError::Action(_)));
        assert_eq!(err.exception_code(), ExceptionCode::ServerDeviceFailure);

        let resp = RequestPipeline::new(HookFailurePolicy::LogAndContinue)
            .execute(&mut store, &request)
            .unwrap();
        assert!(!resp.is_exception());
    }
}
