//! Decoded protocol surface.
//!
//! Byte-level framing lives outside this crate. Requests arrive here already
//! decoded: a function code plus its target range and payload in host types.
//! Responses are returned in the same decoded form.

use serde::{Deserialize, Serialize};

use crate::register::RegisterKind;

/// Max bits returned by FC 1 / FC 2.
pub const MAX_READ_BITS: usize = 2000;
/// Max words returned by FC 3 / FC 4 / FC 23.
pub const MAX_READ_WORDS: usize = 125;
/// Max coils written by FC 15.
pub const MAX_WRITE_BITS: usize = 1968;
/// Max registers written by FC 16.
pub const MAX_WRITE_WORDS: usize = 123;
/// Max registers written by FC 23.
pub const MAX_READ_WRITE_WORDS: usize = 121;

/// Supported function codes.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionCode {
    ReadCoils,
    ReadDiscreteInputs,
    ReadHoldingRegisters,
    ReadInputRegisters,
    WriteSingleCoil,
    WriteSingleRegister,
    WriteMultipleCoils,
    WriteMultipleRegisters,
    MaskWriteRegister,
    ReadWriteMultipleRegisters,
}

/// How a function code interacts with the action hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionClass {
    /// Reads cells and returns their values.
    PureRead,
    /// Writes cells, response does not carry the written values.
    PureWrite,
    /// Writes cells, then reads values back for the response.
    WriteAndEcho,
}

impl FunctionCode {
    /// All supported function codes, in numeric order.
    pub const ALL: [Self; 10] = [
        Self::ReadCoils,
        Self::ReadDiscreteInputs,
        Self::ReadHoldingRegisters,
        Self::ReadInputRegisters,
        Self::WriteSingleCoil,
        Self::WriteSingleRegister,
        Self::WriteMultipleCoils,
        Self::WriteMultipleRegisters,
        Self::MaskWriteRegister,
        Self::ReadWriteMultipleRegisters,
    ];

    #[must_use]
    pub const fn from_u8(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(Self::ReadCoils),
            0x02 => Some(Self::ReadDiscreteInputs),
            0x03 => Some(Self::ReadHoldingRegisters),
            0x04 => Some(Self::ReadInputRegisters),
            0x05 => Some(Self::WriteSingleCoil),
            0x06 => Some(Self::WriteSingleRegister),
            0x0F => Some(Self::WriteMultipleCoils),
            0x10 => Some(Self::WriteMultipleRegisters),
            0x16 => Some(Self::MaskWriteRegister),
            0x17 => Some(Self::ReadWriteMultipleRegisters),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::ReadCoils => 0x01,
            Self::ReadDiscreteInputs => 0x02,
            Self::ReadHoldingRegisters => 0x03,
            Self::ReadInputRegisters => 0x04,
            Self::WriteSingleCoil => 0x05,
            Self::WriteSingleRegister => 0x06,
            Self::WriteMultipleCoils => 0x0F,
            Self::WriteMultipleRegisters => 0x10,
            Self::MaskWriteRegister => 0x16,
            Self::ReadWriteMultipleRegisters => 0x17,
        }
    }

    /// Hook classification of this function code.
    #[must_use]
    pub const fn class(self) -> FunctionClass {
        match self {
            Self::ReadCoils
            | Self::ReadDiscreteInputs
            | Self::ReadHoldingRegisters
            | Self::ReadInputRegisters => FunctionClass::PureRead,
            Self::WriteMultipleCoils | Self::WriteMultipleRegisters => FunctionClass::PureWrite,
            Self::WriteSingleCoil
            | Self::WriteSingleRegister
            | Self::MaskWriteRegister
            | Self::ReadWriteMultipleRegisters => FunctionClass::WriteAndEcho,
        }
    }

    /// Register space this function code addresses.
    #[must_use]
    pub const fn space(self) -> RegisterKind {
        match self {
            Self::ReadCoils | Self::WriteSingleCoil | Self::WriteMultipleCoils => RegisterKind::Coil,
            Self::ReadDiscreteInputs => RegisterKind::DiscreteInput,
            Self::ReadInputRegisters => RegisterKind::InputRegister,
            Self::ReadHoldingRegisters
            | Self::WriteSingleRegister
            | Self::WriteMultipleRegisters
            | Self::MaskWriteRegister
            | Self::ReadWriteMultipleRegisters => RegisterKind::HoldingRegister,
        }
    }
}

impl std::fmt::Display for FunctionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:02X}", self.as_u8())
    }
}

impl PartialEq<u8> for FunctionCode {
    fn eq(&self, other: &u8) -> bool {
        self.as_u8() == *other
    }
}

/// Protocol exception codes reported to clients.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExceptionCode {
    IllegalFunction,
    IllegalDataAddress,
    IllegalDataValue,
    ServerDeviceFailure,
}

impl ExceptionCode {
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::IllegalFunction => 0x01,
            Self::IllegalDataAddress => 0x02,
            Self::IllegalDataValue => 0x03,
            Self::ServerDeviceFailure => 0x04,
        }
    }
}

impl std::fmt::Display for ExceptionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::IllegalFunction => "illegal function",
            Self::IllegalDataAddress => "illegal data address",
            Self::IllegalDataValue => "illegal data value",
            Self::ServerDeviceFailure => "server device failure",
        };
        write!(f, "{name} (0x{:02X})", self.as_u8())
    }
}

/// A decoded client request.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "function", rename_all = "snake_case")]
pub enum Request {
    ReadCoils { address: u16, count: u16 },
    ReadDiscreteInputs { address: u16, count: u16 },
    ReadHoldingRegisters { address: u16, count: u16 },
    ReadInputRegisters { address: u16, count: u16 },
    WriteSingleCoil { address: u16, value: bool },
    WriteSingleRegister { address: u16, value: u16 },
    WriteMultipleCoils { address: u16, values: Vec<bool> },
    WriteMultipleRegisters { address: u16, values: Vec<u16> },
    MaskWriteRegister { address: u16, and_mask: u16, or_mask: u16 },
    ReadWriteMultipleRegisters {
        read_address: u16,
        read_count: u16,
        write_address: u16,
        values: Vec<u16>,
    },
}

impl Request {
    #[must_use]
    pub const fn function_code(&self) -> FunctionCode {
        match self {
            Self::ReadCoils { .. } => FunctionCode::ReadCoils,
            Self::ReadDiscreteInputs { .. } => FunctionCode::ReadDiscreteInputs,
            Self::ReadHoldingRegisters { .. } => FunctionCode::ReadHoldingRegisters,
            Self::ReadInputRegisters { .. } => FunctionCode::ReadInputRegisters,
            Self::WriteSingleCoil { .. } => FunctionCode::WriteSingleCoil,
            Self::WriteSingleRegister { .. } => FunctionCode::WriteSingleRegister,
            Self::WriteMultipleCoils { .. } => FunctionCode::WriteMultipleCoils,
            Self::WriteMultipleRegisters { .. } => FunctionCode::WriteMultipleRegisters,
            Self::MaskWriteRegister { .. } => FunctionCode::MaskWriteRegister,
            Self::ReadWriteMultipleRegisters { .. } => FunctionCode::ReadWriteMultipleRegisters,
        }
    }
}

/// A decoded response.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    ReadBits {
        function_code: FunctionCode,
        values: Vec<bool>,
    },
    ReadWords {
        function_code: FunctionCode,
        values: Vec<u16>,
    },
    WriteSingleCoil {
        address: u16,
        value: bool,
    },
    WriteSingleRegister {
        address: u16,
        value: u16,
    },
    WriteMultiple {
        function_code: FunctionCode,
        address: u16,
        count: u16,
    },
    MaskWriteRegister {
        address: u16,
        and_mask: u16,
        or_mask: u16,
    },
    Exception {
        function_code: FunctionCode,
        code: ExceptionCode,
    },
}

impl Response {
    #[must_use]
    pub const fn is_exception(&self) -> bool {
        matches!(self, Self::Exception { .. })
    }

    /// Exception code, if this is an exception response.
    #[must_use]
    pub const fn exception_code(&self) -> Option<ExceptionCode> {
        match self {
            Self::Exception { code, .. } => Some(*code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_code_numbers_round_trip() {
        for fc in FunctionCode::ALL {
            assert_eq!(FunctionCode::from_u8(fc.as_u8()), Some(fc));
        }
        assert_eq!(FunctionCode::from_u8(0x2B), None);
        assert_eq!(FunctionCode::WriteSingleRegister, 0x06);
    }

    #[test]
    fn test_function_classes() {
        use FunctionClass::{PureRead, PureWrite, WriteAndEcho};

        let expected = [
            (0x01, PureRead),
            (0x02, PureRead),
            (0x03, PureRead),
            (0x04, PureRead),
            (0x05, WriteAndEcho),
            (0x06, WriteAndEcho),
            (0x0F, PureWrite),
            (0x10, PureWrite),
            (0x16, WriteAndEcho),
            (0x17, WriteAndEcho),
        ];
        for (code, class) in expected {
            let fc = FunctionCode::from_u8(code).unwrap();
            assert_eq!(fc.class(), class, "function code {fc}");
        }
    }

    #[test]
    fn test_function_code_spaces() {
        assert_eq!(FunctionCode::ReadCoils.space(), RegisterKind::Coil);
        assert_eq!(FunctionCode::ReadDiscreteInputs.space(), RegisterKind::DiscreteInput);
        assert_eq!(FunctionCode::ReadInputRegisters.space(), RegisterKind::InputRegister);
        assert_eq!(FunctionCode::MaskWriteRegister.space(), RegisterKind::HoldingRegister);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", FunctionCode::MaskWriteRegister), "0x16");
        assert!(format!("{}", ExceptionCode::ServerDeviceFailure).contains("0x04"));
    }

    #[test]
    fn test_request_serde_shape() {
        let req: Request =
            serde_json::from_str(r#"{"function": "write_single_register", "address": 2307, "value": 5}"#)
                .unwrap();
        assert_eq!(
            req,
            Request::WriteSingleRegister {
                address: 2307,
                value: 5
            }
        );
        assert_eq!(req.function_code(), FunctionCode::WriteSingleRegister);
    }
}
