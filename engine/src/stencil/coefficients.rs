use serde::{Deserialize, Serialize};

use crate::errors::{FdError, Result};

use super::Stencil;

/// Centered, forward and backward stencils for one (order, accuracy) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StencilFamily {
    pub center: Stencil,
    pub forward: Stencil,
    pub backward: Stencil,
}

/// Reject order zero and accuracies that are not positive even integers.
pub fn validate_order(order: usize, accuracy: usize) -> Result<()> {
    if order == 0 {
        return Err(FdError::InvalidOrder(order));
    }
    if accuracy == 0 || accuracy % 2 != 0 {
        return Err(FdError::InvalidAccuracy(accuracy));
    }
    Ok(())
}

/// Number of points in the symmetric interior stencil.
pub fn centered_width(order: usize, accuracy: usize) -> usize {
    2 * ((order + 1) / 2) - 1 + accuracy
}

/// Number of points in a one-sided stencil of the same accuracy.
pub fn one_sided_width(order: usize, accuracy: usize) -> usize {
    order + accuracy
}

/// Stencil over `width` consecutive points, the evaluation point being the
/// `shift`-th of them.
pub(crate) fn shifted(order: usize, width: usize, shift: usize) -> Result<Stencil> {
    let start = -(shift as isize);
    let offsets: Vec<isize> = (start..start + width as isize).collect();
    Stencil::from_offsets(order, &offsets)
}

pub(crate) fn centered(order: usize, accuracy: usize) -> Result<Stencil> {
    let width = centered_width(order, accuracy);
    shifted(order, width, width / 2)
}

/// Unit-spacing stencils for the `order`-th derivative at `accuracy`.
pub fn coefficients(order: usize, accuracy: usize) -> Result<StencilFamily> {
    validate_order(order, accuracy)?;
    let side = one_sided_width(order, accuracy);
    Ok(StencilFamily {
        center: centered(order, accuracy)?,
        forward: shifted(order, side, 0)?,
        backward: shifted(order, side, side - 1)?,
    })
}
