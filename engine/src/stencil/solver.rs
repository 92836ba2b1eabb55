use nalgebra::{DMatrix, DVector};

use crate::{
    errors::{FdError, Result},
    telemetry,
};

/// Relative size below which a Taylor moment is treated as vanishing.
const MOMENT_TOL: f64 = 1e-8;

fn factorial(k: usize) -> f64 {
    (1..=k).map(|i| i as f64).product()
}

/// Finite-difference weights approximating the `order`-th derivative at zero
/// from samples at `offsets`.
///
/// Builds the Taylor system `M[j][i] = offsets[i]^j / j!` and solves
/// `M w = e_order` by LU decomposition. Offsets may be integers (uniform grid
/// in units of the step) or rescaled physical deltas (non-uniform grids).
pub fn solve_weights(order: usize, offsets: &[f64]) -> Result<Vec<f64>> {
    let n = offsets.len();
    if n < order + 1 {
        return Err(FdError::singular(
            order,
            format!("needs at least {} offsets, got {n}", order + 1),
        ));
    }
    if offsets.iter().any(|o| !o.is_finite()) {
        return Err(FdError::singular(order, "offsets must be finite"));
    }
    let mut sorted = offsets.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    if let Some(dup) = sorted.windows(2).find(|w| w[0] == w[1]) {
        return Err(FdError::singular(order, format!("duplicate offset {}", dup[0])));
    }

    let matrix = DMatrix::from_fn(n, n, |row, col| {
        offsets[col].powi(row as i32) / factorial(row)
    });
    let mut rhs = DVector::<f64>::zeros(n);
    rhs[order] = 1.0;

    let weights = matrix
        .lu()
        .solve(&rhs)
        .ok_or_else(|| FdError::singular(order, "taylor system is singular"))?;
    if weights.iter().any(|w| !w.is_finite()) {
        return Err(FdError::singular(order, "taylor system is ill-conditioned"));
    }
    telemetry::record_stencil_solve(n);
    Ok(weights.iter().copied().collect())
}

/// Leading truncation order of a stencil: the first Taylor moment beyond
/// `order` that does not cancel, minus `order`.
pub fn truncation_order(order: usize, offsets: &[f64], weights: &[f64]) -> usize {
    let n = offsets.len();
    for m in (order + 1)..=(order + n + 1) {
        let fact = factorial(m);
        let (moment, magnitude) = offsets.iter().zip(weights).fold(
            (0.0, 0.0),
            |(acc, mag), (o, w)| {
                let term = w * o.powi(m as i32) / fact;
                (acc + term, mag + term.abs())
            },
        );
        if magnitude > 0.0 && moment.abs() > MOMENT_TOL * magnitude {
            return m - order;
        }
    }
    n.saturating_sub(order)
}
