//! Register spaces and the store that owns them.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

use super::cell::{CellValue, RegisterCell};

/// The four address spaces of a device.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegisterKind {
    Coil,
    DiscreteInput,
    HoldingRegister,
    InputRegister,
}

impl RegisterKind {
    /// All kinds, in store order.
    pub const ALL: [Self; 4] = [
        Self::Coil,
        Self::DiscreteInput,
        Self::HoldingRegister,
        Self::InputRegister,
    ];

    /// True for the single-bit spaces.
    #[must_use]
    pub const fn is_bit(self) -> bool {
        matches!(self, Self::Coil | Self::DiscreteInput)
    }

    /// Value a fresh cell of this kind holds.
    #[must_use]
    pub const fn zero(self) -> CellValue {
        if self.is_bit() {
            CellValue::Bit(false)
        } else {
            CellValue::Word(0)
        }
    }

    const fn slot(self) -> usize {
        match self {
            Self::Coil => 0,
            Self::DiscreteInput => 1,
            Self::HoldingRegister => 2,
            Self::InputRegister => 3,
        }
    }
}

impl std::fmt::Display for RegisterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Coil => "coil",
            Self::DiscreteInput => "discrete input",
            Self::HoldingRegister => "holding register",
            Self::InputRegister => "input register",
        };
        f.write_str(name)
    }
}

/// A contiguous block of cells starting at `start`.
#[derive(Debug, Clone)]
pub struct RegisterSpace {
    kind: RegisterKind,
    start: u16,
    cells: Vec<RegisterCell>,
}

impl RegisterSpace {
    /// Creates `size` cells at `start..start + size`, all holding `initial`.
    ///
    /// # Errors
    /// - `SpaceTooLarge` when the block does not fit the 16-bit address range
    /// - `ValueKindMismatch` when `initial` is not of the space's kind
    pub fn new(kind: RegisterKind, start: u16, size: usize, initial: CellValue) -> Result<Self, ConfigError> {
        if usize::from(start) + size > usize::from(u16::MAX) + 1 {
            return Err(ConfigError::SpaceTooLarge { kind, start, size });
        }
        if initial.type_name() != kind.zero().type_name() {
            return Err(ConfigError::ValueKindMismatch {
                kind,
                address: start,
                expected: kind.zero().type_name(),
            });
        }

        let cells = (0..size)
            .map(|offset| {
                // Bounded by the check above.
                #[allow(clippy::cast_possible_truncation)]
                let address = (usize::from(start) + offset) as u16;
                RegisterCell::new(address, initial)
            })
            .collect();

        Ok(Self { kind, start, cells })
    }

    /// An empty space; every request against it is out of range.
    #[must_use]
    pub const fn empty(kind: RegisterKind) -> Self {
        Self {
            kind,
            start: 0,
            cells: Vec::new(),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> RegisterKind {
        self.kind
    }

    #[must_use]
    pub const fn start(&self) -> u16 {
        self.start
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Index of `address` within the cell array.
    #[must_use]
    pub fn index_of(&self, address: u16) -> Option<usize> {
        let offset = usize::from(address.checked_sub(self.start)?);
        (offset < self.cells.len()).then_some(offset)
    }

    /// Index range covering `count` cells from `address`, if fully inside the space.
    #[must_use]
    pub fn range(&self, address: u16, count: usize) -> Option<Range<usize>> {
        let first = self.index_of(address)?;
        let end = first.checked_add(count)?;
        (end <= self.cells.len()).then_some(first..end)
    }

    #[must_use]
    pub fn cells(&self) -> &[RegisterCell] {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut [RegisterCell] {
        &mut self.cells
    }

    #[must_use]
    pub fn cell(&self, address: u16) -> Option<&RegisterCell> {
        self.index_of(address).map(|i| &self.cells[i])
    }

    pub fn cell_mut(&mut self, address: u16) -> Option<&mut RegisterCell> {
        self.index_of(address).map(move |i| &mut self.cells[i])
    }
}

/// All register spaces of one simulated device.
#[derive(Debug, Clone)]
pub struct RegisterStore {
    spaces: [RegisterSpace; 4],
}

impl RegisterStore {
    /// Assembles a store; each space is placed by its own kind.
    #[must_use]
    pub fn new(spaces: [RegisterSpace; 4]) -> Self {
        let mut ordered = RegisterKind::ALL.map(RegisterSpace::empty);
        for space in spaces {
            let slot = space.kind().slot();
            ordered[slot] = space;
        }
        Self { spaces: ordered }
    }

    #[must_use]
    pub fn space(&self, kind: RegisterKind) -> &RegisterSpace {
        &self.spaces[kind.slot()]
    }

    pub fn space_mut(&mut self, kind: RegisterKind) -> &mut RegisterSpace {
        &mut self.spaces[kind.slot()]
    }

    /// Current value at `address` in `kind`, if the address exists.
    #[must_use]
    pub fn value(&self, kind: RegisterKind, address: u16) -> Option<CellValue> {
        self.space(kind).cell(address).map(RegisterCell::value)
    }

    /// Number of cells carrying an action binding.
    #[must_use]
    pub fn bound_cells(&self) -> usize {
        self.spaces
            .iter()
            .flat_map(RegisterSpace::cells)
            .filter(|cell| cell.binding().is_some())
            .count()
    }
}

impl Default for RegisterStore {
    fn default() -> Self {
        Self {
            spaces: RegisterKind::ALL.map(RegisterSpace::empty),
        }
    }
}
