//! Finite-difference stencils and their coefficient solver.

pub mod coefficients;
pub mod solver;

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

use crate::errors::{FdError, Result};

pub use coefficients::{
    centered_width, coefficients, one_sided_width, validate_order, StencilFamily,
};
pub use solver::{solve_weights, truncation_order};

/// Weighted sum of shifted samples approximating a derivative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stencil {
    pub order: usize,
    pub offsets: Vec<isize>,
    pub weights: Vec<f64>,
    /// Measured truncation order of the approximation.
    pub accuracy: usize,
}

impl Stencil {
    /// Stencil on unit spacing for an explicit set of integer offsets.
    pub fn from_offsets(order: usize, offsets: &[isize]) -> Result<Self> {
        if order == 0 {
            return Err(FdError::InvalidOrder(order));
        }
        let real: Vec<f64> = offsets.iter().map(|&o| o as f64).collect();
        let weights = solve_weights(order, &real)?;
        let accuracy = truncation_order(order, &real, &weights);
        Ok(Self {
            order,
            offsets: offsets.to_vec(),
            weights,
            accuracy,
        })
    }

    /// Stencil over index `offsets` whose samples sit at physical `deltas`
    /// from the evaluation point.
    pub(crate) fn from_deltas(order: usize, offsets: Vec<isize>, deltas: &[f64]) -> Result<Self> {
        let span = deltas.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
            - deltas.iter().cloned().fold(f64::INFINITY, f64::min);
        let h = span / (deltas.len().saturating_sub(1).max(1)) as f64;
        if !(h.is_finite() && h > 0.0) {
            return Err(FdError::singular(order, "coordinate deltas span no distance"));
        }
        let scaled: Vec<f64> = deltas.iter().map(|d| d / h).collect();
        let weights = solve_weights(order, &scaled)?;
        let accuracy = truncation_order(order, &scaled, &weights);
        let factor = h.powi(order as i32).recip();
        Ok(Self {
            order,
            offsets,
            weights: weights.into_iter().map(|w| w * factor).collect(),
            accuracy,
        })
    }

    /// Multiply every weight by `factor`, e.g. `1 / h^order`.
    pub fn scaled(mut self, factor: f64) -> Self {
        self.weights.iter_mut().for_each(|w| *w *= factor);
        self
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (isize, f64)> + '_ {
        self.offsets.iter().copied().zip(self.weights.iter().copied())
    }

    pub fn weight_sum(&self) -> f64 {
        self.weights.iter().sum()
    }

    /// Weighted sum around `i`; every shifted index must lie inside `lane`.
    #[inline]
    pub fn apply_at(&self, lane: &ArrayView1<'_, f64>, i: usize) -> f64 {
        self.iter()
            .map(|(o, w)| w * lane[(i as isize + o) as usize])
            .sum()
    }

    /// Weighted sum around `i` with indices wrapped onto the lane length.
    #[inline]
    pub fn apply_wrapped(&self, lane: &ArrayView1<'_, f64>, i: usize) -> f64 {
        let n = lane.len() as isize;
        self.iter()
            .map(|(o, w)| w * lane[(i as isize + o).rem_euclid(n) as usize])
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::Array1;

    #[test]
    fn explicit_offsets() {
        let s = Stencil::from_offsets(1, &[-2, -1, 0, 1, 2]).unwrap();
        let expected = [1.0 / 12.0, -2.0 / 3.0, 0.0, 2.0 / 3.0, -1.0 / 12.0];
        assert_abs_diff_eq!(s.weights.as_slice(), expected.as_slice(), epsilon = 1e-12);
        assert_eq!(s.accuracy, 4);
        assert!(matches!(Stencil::from_offsets(0, &[0, 1]), Err(FdError::InvalidOrder(0))));
    }

    #[test]
    fn non_uniform_deltas_rescale() {
        // Uniform deltas with h = 0.1 must match the unit stencil divided by h^2.
        let s = Stencil::from_deltas(2, vec![-1, 0, 1], &[-0.1, 0.0, 0.1]).unwrap();
        assert_abs_diff_eq!(
            s.weights.as_slice(),
            [100.0, -200.0, 100.0].as_slice(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn apply_in_lane() {
        let lane = Array1::from(vec![0.0, 1.0, 4.0, 9.0, 16.0]);
        let s = Stencil::from_offsets(2, &[-1, 0, 1]).unwrap();
        assert_abs_diff_eq!(s.apply_at(&lane.view(), 2), 2.0, epsilon = 1e-12);
        // Wrapped: lane[4] - 2 lane[0] + lane[1]
        assert_abs_diff_eq!(s.apply_wrapped(&lane.view(), 0), 17.0, epsilon = 1e-12);
    }
}
