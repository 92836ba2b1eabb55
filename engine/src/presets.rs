//! Common differential operators assembled from per-axis derivatives.
//!
//! Every builder takes the grid explicitly; nothing here keeps state.

use ndarray::{stack, ArrayBase, ArrayD, ArrayViewD, Axis, Data, Dimension};

use crate::{
    errors::{FdError, Result},
    grid::Grid,
    operators::{Execution, Expr},
};

fn first_derivatives(grid: &Grid, accuracy: usize) -> Result<Vec<Expr>> {
    grid.axes()
        .iter()
        .map(|axis| Expr::derivative(axis, 1, accuracy))
        .collect()
}

fn sum_terms(terms: Vec<Expr>) -> Result<Expr> {
    terms
        .into_iter()
        .reduce(|acc, term| acc + term)
        .ok_or_else(|| FdError::InvalidGrid("grid has no axes".into()))
}

/// `sum_i d^2/dx_i^2` over every grid axis.
pub fn laplacian(grid: &Grid, accuracy: usize) -> Result<Expr> {
    let terms = grid
        .axes()
        .iter()
        .map(|axis| Expr::derivative(axis, 2, accuracy))
        .collect::<Result<Vec<_>>>()?;
    sum_terms(terms)
}

/// Mixed partial derivative from `(axis, order)` factors. The last factor is
/// applied first.
pub fn mixed(grid: &Grid, factors: &[(usize, usize)], accuracy: usize) -> Result<Expr> {
    let parts = factors
        .iter()
        .map(|&(axis, order)| Expr::derivative(grid.axis(axis)?, order, accuracy))
        .collect::<Result<Vec<_>>>()?;
    parts
        .into_iter()
        .reduce(|outer, inner| outer * inner)
        .ok_or_else(|| FdError::InvalidGrid("mixed derivative needs at least one factor".into()))
}

fn split_components<'a, S, D>(
    field: &'a ArrayBase<S, D>,
    components: usize,
) -> Result<Vec<ArrayViewD<'a, f64>>>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    let shape = field.shape();
    if shape.len() != components + 1 || shape[0] != components {
        let mut expected = vec![components];
        expected.extend(shape.iter().skip(1));
        return Err(FdError::shape(&expected, shape));
    }
    let dyn_view = field.view().into_dyn();
    Ok((0..components)
        .map(|i| dyn_view.clone().index_axis_move(Axis(0), i))
        .collect())
}

fn stack_components(parts: Vec<ArrayD<f64>>) -> Result<ArrayD<f64>> {
    let views: Vec<ArrayViewD<'_, f64>> = parts.iter().map(|p| p.view()).collect();
    stack(Axis(0), &views).map_err(|_| {
        let found = parts.first().map(|p| p.shape().to_vec()).unwrap_or_default();
        FdError::shape(&found, &found)
    })
}

/// Vector of first derivatives, one per axis.
#[derive(Debug, Clone)]
pub struct Gradient {
    components: Vec<Expr>,
}

impl Gradient {
    pub fn components(&self) -> &[Expr] {
        &self.components
    }

    /// Returns an array with a leading component axis of length `ndim`.
    pub fn apply<S, D>(&self, field: &ArrayBase<S, D>) -> Result<ArrayD<f64>>
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        let input = field.view().into_dyn();
        let parts = self
            .components
            .iter()
            .map(|c| c.evaluate(input.view(), Execution::Sequential))
            .collect::<Result<Vec<_>>>()?;
        stack_components(parts)
    }
}

pub fn gradient(grid: &Grid, accuracy: usize) -> Result<Gradient> {
    Ok(Gradient {
        components: first_derivatives(grid, accuracy)?,
    })
}

/// `sum_i dF_i/dx_i` of a vector field with a leading component axis.
#[derive(Debug, Clone)]
pub struct Divergence {
    components: Vec<Expr>,
}

impl Divergence {
    pub fn apply<S, D>(&self, field: &ArrayBase<S, D>) -> Result<ArrayD<f64>>
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        let parts = split_components(field, self.components.len())?;
        let mut terms = self
            .components
            .iter()
            .zip(parts)
            .map(|(op, part)| op.evaluate(part, Execution::Sequential));
        let first = terms
            .next()
            .ok_or_else(|| FdError::InvalidGrid("grid has no axes".into()))??;
        terms.try_fold(first, |acc, term| Ok(acc + &term?))
    }
}

pub fn divergence(grid: &Grid, accuracy: usize) -> Result<Divergence> {
    Ok(Divergence {
        components: first_derivatives(grid, accuracy)?,
    })
}

/// Rotation of a vector field on a three-dimensional grid.
#[derive(Debug, Clone)]
pub struct Curl {
    partials: Vec<Expr>,
}

impl Curl {
    /// Maps a `(3, nx, ny, nz)` field to a `(3, nx, ny, nz)` field.
    pub fn apply<S, D>(&self, field: &ArrayBase<S, D>) -> Result<ArrayD<f64>>
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        let f = split_components(field, 3)?;
        let d = &self.partials;
        let parts = (0..3)
            .map(|k| {
                let a = (k + 1) % 3;
                let b = (k + 2) % 3;
                let plus = d[a].evaluate(f[b].view(), Execution::Sequential)?;
                let minus = d[b].evaluate(f[a].view(), Execution::Sequential)?;
                Ok(plus - minus)
            })
            .collect::<Result<Vec<_>>>()?;
        stack_components(parts)
    }
}

pub fn curl(grid: &Grid, accuracy: usize) -> Result<Curl> {
    if grid.ndim() != 3 {
        return Err(FdError::InvalidGrid(format!(
            "curl needs a 3-dimensional grid, got {}",
            grid.ndim()
        )));
    }
    Ok(Curl {
        partials: first_derivatives(grid, accuracy)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{Array2, Array3, Array4};

    fn square_grid(n: usize, h: f64) -> Grid {
        Grid::uniform(&[(h, n), (h, n)]).unwrap()
    }

    #[test]
    fn laplacian_of_paraboloid() {
        let grid = square_grid(12, 0.1);
        let f = Array2::from_shape_fn((12, 12), |(i, j)| {
            let (x, y) = (i as f64 * 0.1, j as f64 * 0.1);
            x * x + y * y
        });
        let lap = laplacian(&grid, 2).unwrap();
        let out = lap.apply(&f).unwrap();
        for v in out.iter() {
            assert_abs_diff_eq!(*v, 4.0, epsilon = 1e-8);
        }
    }

    #[test]
    fn gradient_then_divergence() {
        let grid = square_grid(10, 0.2);
        let f = Array2::from_shape_fn((10, 10), |(i, j)| {
            let (x, y) = (i as f64 * 0.2, j as f64 * 0.2);
            x * x + 3.0 * x * y
        });
        let g = gradient(&grid, 2).unwrap().apply(&f).unwrap();
        assert_eq!(g.shape(), &[2, 10, 10]);
        assert_abs_diff_eq!(g[[0, 4, 5]], 2.0 * 0.8 + 3.0 * 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(g[[1, 4, 5]], 3.0 * 0.8, epsilon = 1e-9);

        let div = divergence(&grid, 2).unwrap().apply(&g).unwrap();
        assert_eq!(div.shape(), &[10, 10]);
        for v in div.iter() {
            assert_abs_diff_eq!(*v, 2.0, epsilon = 1e-8);
        }
    }

    #[test]
    fn divergence_rejects_wrong_component_count() {
        let grid = square_grid(6, 0.5);
        let field = Array3::<f64>::zeros((3, 6, 6));
        let err = divergence(&grid, 2).unwrap().apply(&field).unwrap_err();
        assert!(matches!(err, FdError::ShapeMismatch { .. }));
    }

    #[test]
    fn curl_of_rotation_field() {
        let n = 6;
        let h = 0.25;
        let grid = Grid::uniform(&[(h, n), (h, n), (h, n)]).unwrap();
        // F = (-y, x, 0): curl F = (0, 0, 2).
        let field = Array4::from_shape_fn((3, n, n, n), |(c, i, j, _)| match c {
            0 => -(j as f64) * h,
            1 => i as f64 * h,
            _ => 0.0,
        });
        let rot = curl(&grid, 2).unwrap().apply(&field).unwrap();
        assert_eq!(rot.shape(), &[3, n, n, n]);
        for ((c, ..), v) in rot
            .view()
            .into_dimensionality::<ndarray::Ix4>()
            .unwrap()
            .indexed_iter()
        {
            let expected = if c == 2 { 2.0 } else { 0.0 };
            assert_abs_diff_eq!(*v, expected, epsilon = 1e-9);
        }
        assert!(matches!(curl(&square_grid(5, 1.0), 2), Err(FdError::InvalidGrid(_))));
    }

    #[test]
    fn mixed_partial() {
        let grid = square_grid(9, 0.1);
        let f = Array2::from_shape_fn((9, 9), |(i, j)| (i as f64 * 0.1).powi(2) * (j as f64 * 0.1));
        let dxy = mixed(&grid, &[(0, 1), (1, 1)], 2).unwrap();
        let out = dxy.apply(&f).unwrap();
        for ((i, _), v) in out.indexed_iter() {
            assert_abs_diff_eq!(*v, 2.0 * i as f64 * 0.1, epsilon = 1e-9);
        }
        assert!(mixed(&grid, &[(2, 1)], 2).is_err());
    }
}
