//! Register store model.
//!
//! The simulator keeps four independent address spaces. Each space is a flat,
//! contiguous array of [`RegisterCell`]s; actions receive the whole array of the
//! space their target cell lives in.

/// Register cell and its value.
pub mod cell;
/// Register spaces and the store that owns them.
pub mod store;

pub use cell::{CellValue, RegisterCell};
pub use store::{RegisterKind, RegisterSpace, RegisterStore};
