//! Finite-difference operator algebra on structured N-dimensional grids.
//!
//! Axis derivatives of arbitrary order and accuracy combine with scalars and
//! spatially varying coefficient fields into immutable expression trees that
//! are evaluated against `ndarray` arrays.

pub mod config;
pub mod errors;
pub mod grid;
pub mod operators;
pub mod presets;
pub mod runtime;
pub mod stencil;
pub mod telemetry;

pub use config::{AxisConfig, Concurrency, EngineConfig, GridConfig};
pub use errors::{FdError, Result};
pub use grid::{Grid, GridAxis, Spacing};
pub use operators::{AxisDerivative, CoefficientField, Execution, Expr, SparseMatrix};
pub use presets::{curl, divergence, gradient, laplacian, mixed, Curl, Divergence, Gradient};
pub use runtime::Runtime;
pub use stencil::{coefficients, Stencil, StencilFamily};

pub mod prelude {
    //! Common imports for building and applying operators.
    pub use crate::grid::{Grid, GridAxis};
    pub use crate::operators::{AxisDerivative, CoefficientField, Expr};
    pub use crate::presets::{divergence, gradient, laplacian};
    pub use crate::runtime::Runtime;
}

/// Emit a textual banner used by CLI integrations and smoke tests.
pub fn banner() -> String {
    let msg = format!("fd-engine {} :: finite-difference operators", env!("CARGO_PKG_VERSION"));
    tracing::info!(target: "fd_engine", "{}", msg);
    msg
}
