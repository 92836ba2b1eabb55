//! Operator algebra over sampled N-dimensional fields.

pub mod axis;
pub mod expr;
pub mod field;
pub mod matrix;

use ndarray::{Array, ArrayD, Dimension};

use crate::errors::{FdError, Result};

pub use axis::AxisDerivative;
pub use expr::Expr;
pub use field::CoefficientField;
pub use matrix::SparseMatrix;

/// How array kernels distribute work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Execution {
    Sequential,
    /// Lane- and subtree-parallel on the current rayon pool.
    Parallel,
}

impl Execution {
    pub fn is_parallel(self) -> bool {
        matches!(self, Execution::Parallel)
    }
}

/// Convert a dynamic-dimension result back to the caller's dimension type.
pub(crate) fn restore_dim<D: Dimension>(out: ArrayD<f64>) -> Result<Array<f64, D>> {
    let found = out.ndim();
    out.into_dimensionality::<D>().map_err(|_| FdError::ShapeMismatch {
        expected: vec![D::NDIM.unwrap_or(found)],
        found: vec![found],
    })
}
