//! A single addressable register cell.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::action::ActionBinding;
use crate::error::HookError;

/// Value held by a cell: one bit for coils and discrete inputs, one 16-bit word
/// for holding and input registers.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Bit(bool),
    Word(u16),
}

impl CellValue {
    pub const fn as_bit(self) -> Option<bool> {
        match self {
            Self::Bit(v) => Some(v),
            Self::Word(_) => None,
        }
    }

    pub const fn as_word(self) -> Option<u16> {
        match self {
            Self::Word(v) => Some(v),
            Self::Bit(_) => None,
        }
    }

    /// Returns a human-readable type name.
    #[must_use]
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::Bit(_) => "bit",
            Self::Word(_) => "word",
        }
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bit(v) => write!(f, "{}", u8::from(*v)),
            Self::Word(v) => write!(f, "{v}"),
        }
    }
}

/// One addressable register.
///
/// Cells are owned by their [`RegisterSpace`](super::RegisterSpace). The
/// dispatcher reads and writes `value` and reads `binding`; it never adds or
/// removes cells.
#[derive(Debug, Clone)]
pub struct RegisterCell {
    address: u16,
    value: CellValue,
    binding: Option<Arc<ActionBinding>>,
}

impl RegisterCell {
    #[must_use]
    pub const fn new(address: u16, value: CellValue) -> Self {
        Self {
            address,
            value,
            binding: None,
        }
    }

    #[must_use]
    pub const fn address(&self) -> u16 {
        self.address
    }

    #[must_use]
    pub const fn value(&self) -> CellValue {
        self.value
    }

    /// Replaces the value. The kind (bit or word) of a cell never changes.
    ///
    /// # Errors
    /// `HookError::CellKindMismatch` when `value` is of the other kind.
    pub fn set_value(&mut self, value: CellValue) -> Result<(), HookError> {
        match (self.value, value) {
            (CellValue::Bit(_), CellValue::Bit(_)) | (CellValue::Word(_), CellValue::Word(_)) => {
                self.value = value;
                Ok(())
            }
            (current, _) => Err(HookError::CellKindMismatch {
                expected: value.type_name(),
                found: current.type_name(),
            }),
        }
    }

    /// Reads the word value.
    ///
    /// # Errors
    /// `HookError::CellKindMismatch` on a bit cell.
    pub fn word(&self) -> Result<u16, HookError> {
        self.value.as_word().ok_or(HookError::CellKindMismatch {
            expected: "word",
            found: "bit",
        })
    }

    /// Reads the bit value.
    ///
    /// # Errors
    /// `HookError::CellKindMismatch` on a word cell.
    pub fn bit(&self) -> Result<bool, HookError> {
        self.value.as_bit().ok_or(HookError::CellKindMismatch {
            expected: "bit",
            found: "word",
        })
    }

    /// # Errors
    /// `HookError::CellKindMismatch` on a bit cell.
    pub fn set_word(&mut self, value: u16) -> Result<(), HookError> {
        self.set_value(CellValue::Word(value))
    }

    /// # Errors
    /// `HookError::CellKindMismatch` on a word cell.
    pub fn set_bit(&mut self, value: bool) -> Result<(), HookError> {
        self.set_value(CellValue::Bit(value))
    }

    #[must_use]
    pub fn binding(&self) -> Option<&Arc<ActionBinding>> {
        self.binding.as_ref()
    }

    pub(crate) fn attach(&mut self, binding: ActionBinding) {
        self.binding = Some(Arc::new(binding));
    }
}
