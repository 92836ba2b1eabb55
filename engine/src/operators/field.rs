use std::sync::Arc;

use ndarray::{Array, ArrayBase, ArrayD, ArrayViewD, Data, Dimension, Zip};

use crate::errors::{FdError, Result};

use super::{restore_dim, Execution};

/// Spatially varying multiplicative coefficient sampled on the grid.
///
/// The samples are shared, never copied or mutated by the engine.
#[derive(Debug, Clone)]
pub struct CoefficientField {
    values: Arc<ArrayD<f64>>,
}

impl CoefficientField {
    pub fn new<D: Dimension>(values: Array<f64, D>) -> Self {
        Self {
            values: Arc::new(values.into_dyn()),
        }
    }

    pub fn from_shared(values: Arc<ArrayD<f64>>) -> Self {
        Self { values }
    }

    pub fn shape(&self) -> &[usize] {
        self.values.shape()
    }

    pub fn values(&self) -> &ArrayD<f64> {
        &self.values
    }

    /// Elementwise product with `operand`; shapes must match exactly.
    pub fn multiply<S, D>(&self, operand: &ArrayBase<S, D>) -> Result<Array<f64, D>>
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        let mut out = operand.view().into_dyn().to_owned();
        self.multiply_in_place(&mut out, Execution::Sequential)?;
        restore_dim(out)
    }

    pub(crate) fn check_shape(&self, operand: &ArrayViewD<'_, f64>) -> Result<()> {
        if self.values.shape() != operand.shape() {
            return Err(FdError::shape(self.values.shape(), operand.shape()));
        }
        Ok(())
    }

    pub(crate) fn multiply_in_place(&self, operand: &mut ArrayD<f64>, exec: Execution) -> Result<()> {
        self.check_shape(&operand.view())?;
        let zip = Zip::from(operand).and(self.values.as_ref());
        match exec {
            Execution::Sequential => zip.for_each(|o, &c| *o *= c),
            Execution::Parallel => zip.par_for_each(|o, &c| *o *= c),
        }
        Ok(())
    }
}

impl<D: Dimension> From<Array<f64, D>> for CoefficientField {
    fn from(values: Array<f64, D>) -> Self {
        Self::new(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    #[test]
    fn multiplies_elementwise() {
        let field = CoefficientField::new(array![[1.0, 2.0], [3.0, 4.0]]);
        let out = field.multiply(&array![[2.0, 2.0], [0.5, -1.0]]).unwrap();
        assert_eq!(out, array![[2.0, 4.0], [1.5, -4.0]]);
        assert_eq!(field.shape(), &[2, 2]);
    }

    #[test]
    fn shape_mismatch_is_reported() {
        let field = CoefficientField::new(Array2::<f64>::ones((3, 4)));
        let err = field.multiply(&Array2::<f64>::ones((4, 3))).unwrap_err();
        match err {
            FdError::ShapeMismatch { expected, found } => {
                assert_eq!(expected, vec![3, 4]);
                assert_eq!(found, vec![4, 3]);
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn shared_samples_are_not_copied() {
        let values = Arc::new(Array2::<f64>::ones((2, 2)).into_dyn());
        let field = CoefficientField::from_shared(Arc::clone(&values));
        let copy = field.clone();
        assert_eq!(Arc::strong_count(&values), 3);
        assert!(std::ptr::eq(copy.values(), values.as_ref()));
    }
}
