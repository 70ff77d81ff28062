//! Request pipeline integration.
//!
//! The pipeline turns a decoded [`Request`](crate::protocol::Request) into a
//! [`Response`](crate::protocol::Response): validate, apply writes, run the
//! action invocation points the function code defines, then encode the
//! response from the cells' post-hook values.

/// Request execution against a register store.
pub mod executor;
/// Per-function-code invocation plan.
pub mod plan;

pub use executor::{HookFailurePolicy, RequestPipeline};
pub use plan::{invoke_for_function_code, phases, AffectedCells};
