use std::collections::BTreeMap;

use nalgebra::DMatrix;
use ndarray::{Array, ArrayBase, Data, Dimension};

use crate::errors::{FdError, Result};

use super::AxisDerivative;

/// Row-compressed sparse matrix of a discretised operator.
///
/// Rows and columns index a row-major (C order) flattening of the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseMatrix {
    n_rows: usize,
    n_cols: usize,
    /// Column-sorted `(col, value)` pairs per row.
    rows: Vec<Vec<(usize, f64)>>,
}

impl SparseMatrix {
    pub fn identity(n: usize) -> Self {
        Self {
            n_rows: n,
            n_cols: n,
            rows: (0..n).map(|i| vec![(i, 1.0)]).collect(),
        }
    }

    fn from_accumulated(n_cols: usize, rows: Vec<BTreeMap<usize, f64>>) -> Self {
        Self {
            n_rows: rows.len(),
            n_cols,
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().filter(|(_, v)| *v != 0.0).collect())
                .collect(),
        }
    }

    pub(crate) fn from_axis(op: &AxisDerivative, shape: &[usize]) -> Result<Self> {
        let axis = op.axis();
        if axis >= shape.len() {
            return Err(FdError::AxisOutOfBounds {
                axis,
                ndim: shape.len(),
            });
        }
        if shape[axis] != op.len() {
            let mut expected = shape.to_vec();
            expected[axis] = op.len();
            return Err(FdError::shape(&expected, shape));
        }

        let n: usize = shape.iter().product();
        let len = shape[axis];
        let stride: usize = shape[axis + 1..].iter().product();
        let rows = (0..n)
            .map(|p| {
                let i = (p / stride) % len;
                let base = p - i * stride;
                let stencil = op
                    .stencil_at(i)
                    .ok_or(FdError::AxisOutOfBounds { axis, ndim: shape.len() })?;
                let mut row = BTreeMap::new();
                for (o, w) in stencil.iter() {
                    let j = if op.is_periodic() {
                        (i as isize + o).rem_euclid(len as isize) as usize
                    } else {
                        (i as isize + o) as usize
                    };
                    *row.entry(base + j * stride).or_insert(0.0) += w;
                }
                Ok(row)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_accumulated(n, rows))
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows, self.n_cols)
    }

    /// Number of stored non-zero entries.
    pub fn nnz(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }

    pub fn row(&self, r: usize) -> &[(usize, f64)] {
        self.rows.get(r).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn get(&self, r: usize, c: usize) -> f64 {
        let row = self.row(r);
        row.binary_search_by_key(&c, |(col, _)| *col)
            .map(|idx| row[idx].1)
            .unwrap_or(0.0)
    }

    pub fn scaled(mut self, factor: f64) -> Self {
        for row in &mut self.rows {
            row.iter_mut().for_each(|(_, v)| *v *= factor);
        }
        self
    }

    /// Left-multiply by `diag(factors)`.
    pub fn scale_rows(mut self, factors: &[f64]) -> Self {
        for (row, f) in self.rows.iter_mut().zip(factors) {
            row.iter_mut().for_each(|(_, v)| *v *= f);
        }
        self
    }

    pub fn add(&self, other: &SparseMatrix) -> Result<Self> {
        if self.shape() != other.shape() {
            return Err(FdError::shape(
                &[self.n_rows, self.n_cols],
                &[other.n_rows, other.n_cols],
            ));
        }
        let rows = self
            .rows
            .iter()
            .zip(&other.rows)
            .map(|(a, b)| {
                let mut acc = BTreeMap::new();
                for &(c, v) in a.iter().chain(b.iter()) {
                    *acc.entry(c).or_insert(0.0) += v;
                }
                acc
            })
            .collect();
        Ok(Self::from_accumulated(self.n_cols, rows))
    }

    /// `self * other`, i.e. `other` applied first.
    pub fn matmul(&self, other: &SparseMatrix) -> Result<Self> {
        if self.n_cols != other.n_rows {
            return Err(FdError::shape(
                &[self.n_rows, self.n_cols],
                &[other.n_rows, other.n_cols],
            ));
        }
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut acc = BTreeMap::new();
                for &(k, a) in row {
                    for &(j, b) in &other.rows[k] {
                        *acc.entry(j).or_insert(0.0) += a * b;
                    }
                }
                acc
            })
            .collect();
        Ok(Self::from_accumulated(other.n_cols, rows))
    }

    /// Apply to an array whose element count matches the column count.
    pub fn dot<S, D>(&self, input: &ArrayBase<S, D>) -> Result<Array<f64, D>>
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        if input.len() != self.n_cols || self.n_rows != self.n_cols {
            return Err(FdError::shape(&[self.n_rows, self.n_cols], input.shape()));
        }
        let flat: Vec<f64> = input.iter().copied().collect();
        let out: Vec<f64> = self
            .rows
            .iter()
            .map(|row| row.iter().map(|&(c, v)| v * flat[c]).sum())
            .collect();
        Array::from_shape_vec(input.raw_dim(), out)
            .map_err(|_| FdError::shape(&[self.n_rows], input.shape()))
    }

    pub fn to_dense(&self) -> DMatrix<f64> {
        let mut dense = DMatrix::zeros(self.n_rows, self.n_cols);
        for (r, row) in self.rows.iter().enumerate() {
            for &(c, v) in row {
                dense[(r, c)] = v;
            }
        }
        dense
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::{CoefficientField, Expr};
    use approx::assert_abs_diff_eq;
    use ndarray::Array2;

    #[test]
    fn one_dimensional_second_derivative() {
        let d2 = AxisDerivative::uniform(0, 1.0, 5, 2, 2).unwrap();
        let m = Expr::axis(d2).to_matrix(&[5]).unwrap();
        assert_eq!(m.shape(), (5, 5));
        // First row: one-sided [2, -5, 4, -1].
        assert_abs_diff_eq!(m.get(0, 0), 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(m.get(0, 3), -1.0, epsilon = 1e-12);
        // Interior row: [1, -2, 1].
        assert_abs_diff_eq!(m.get(2, 1), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(m.get(2, 2), -2.0, epsilon = 1e-12);
        assert_eq!(m.get(2, 4), 0.0);
        assert_eq!(m.nnz(), 4 + 3 + 3 + 3 + 4);
    }

    #[test]
    fn periodic_rows_wrap() {
        let d = AxisDerivative::periodic(0, 1.0, 6, 1, 2).unwrap();
        let m = Expr::axis(d).to_matrix(&[6]).unwrap();
        assert_abs_diff_eq!(m.get(0, 5), -0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(m.get(5, 0), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn matrix_matches_direct_evaluation() {
        let shape = (7, 6);
        let f = Array2::from_shape_fn(shape, |(i, j)| (0.3 * i as f64).sin() * (0.2 * j as f64).cos());
        let coef = CoefficientField::new(Array2::from_shape_fn(shape, |(i, j)| 1.0 + (i + j) as f64));
        let dx = Expr::axis(AxisDerivative::uniform(0, 0.1, 7, 1, 2).unwrap());
        let dyy = Expr::axis(AxisDerivative::uniform(1, 0.2, 6, 2, 2).unwrap());
        let expr = coef.clone() * dx.clone() + 3.0 * (dyy * coef) - dx * Expr::Identity;

        let direct = expr.apply(&f).unwrap();
        let m = expr.to_matrix(&[7, 6]).unwrap();
        let via_matrix = m.dot(&f).unwrap();
        for (a, b) in direct.iter().zip(via_matrix.iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-9);
        }
        let dense = m.to_dense();
        assert_eq!(dense.nrows(), 42);
        assert_abs_diff_eq!(dense[(10, 4)], m.get(10, 4), epsilon = 0.0);
    }
}
