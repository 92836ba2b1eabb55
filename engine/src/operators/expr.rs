use std::{
    fmt,
    ops::{Add, Mul, Neg, Sub},
    sync::Arc,
};

use ndarray::{Array, ArrayBase, ArrayD, ArrayViewD, Data, Dimension, Zip};

use crate::{
    errors::{FdError, Result},
    grid::GridAxis,
    telemetry,
};

use super::{restore_dim, AxisDerivative, CoefficientField, Execution, SparseMatrix};

/// Immutable tree of linear operators.
///
/// Building an expression never touches data; [`Expr::apply`] evaluates it
/// against an array. Children are applied in exactly the order they were
/// combined: `Product(a, b)` applies `b` first, then `a`.
#[derive(Debug, Clone)]
pub enum Expr {
    /// Leaves the input unchanged.
    Identity,
    /// Partial derivative along one axis.
    Axis(Arc<AxisDerivative>),
    /// `field * child(f)`.
    Coefficient(CoefficientField, Box<Expr>),
    /// `a(f) + b(f)`.
    Sum(Box<Expr>, Box<Expr>),
    /// `s * child(f)`.
    Scale(f64, Box<Expr>),
    /// `a(b(f))`.
    Product(Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn axis(op: AxisDerivative) -> Self {
        Expr::Axis(Arc::new(op))
    }

    /// Leaf sharing an operator with other expressions.
    pub fn shared(op: &Arc<AxisDerivative>) -> Self {
        Expr::Axis(Arc::clone(op))
    }

    /// `d^order / dx^order` along `grid_axis`.
    pub fn derivative(grid_axis: &GridAxis, order: usize, accuracy: usize) -> Result<Self> {
        Ok(Expr::axis(AxisDerivative::new(grid_axis, order, accuracy)?))
    }

    pub fn add(self, other: Expr) -> Self {
        Expr::Sum(Box::new(self), Box::new(other))
    }

    pub fn scale(self, factor: f64) -> Self {
        Expr::Scale(factor, Box::new(self))
    }

    /// Multiply this operator's output by `field`.
    pub fn multiply_by_field(self, field: CoefficientField) -> Self {
        Expr::Coefficient(field, Box::new(self))
    }

    /// Apply `inner` first, then `self`.
    pub fn compose(self, inner: Expr) -> Self {
        Expr::Product(Box::new(self), Box::new(inner))
    }

    /// Evaluate against `input`, returning a freshly allocated array of the
    /// same shape.
    pub fn apply<S, D>(&self, input: &ArrayBase<S, D>) -> Result<Array<f64, D>>
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        let out = self.run(input.view().into_dyn(), Execution::Sequential)?;
        restore_dim(out)
    }

    pub(crate) fn run(&self, input: ArrayViewD<'_, f64>, exec: Execution) -> Result<ArrayD<f64>> {
        telemetry::record_evaluation(exec.is_parallel());
        self.evaluate(input, exec)
    }

    /// Recursive evaluation over the tree.
    pub fn evaluate(&self, input: ArrayViewD<'_, f64>, exec: Execution) -> Result<ArrayD<f64>> {
        match self {
            Expr::Identity => Ok(input.to_owned()),
            Expr::Axis(op) => op.apply_view(input, exec),
            Expr::Coefficient(field, child) => {
                let mut out = child.evaluate(input, exec)?;
                field.multiply_in_place(&mut out, exec)?;
                Ok(out)
            }
            Expr::Sum(a, b) => {
                let (left, right) = if exec.is_parallel() {
                    rayon::join(
                        || a.evaluate(input.view(), exec),
                        || b.evaluate(input.view(), exec),
                    )
                } else {
                    (a.evaluate(input.view(), exec), b.evaluate(input.view(), exec))
                };
                let (mut left, right) = (left?, right?);
                if left.shape() != right.shape() {
                    return Err(FdError::shape(left.shape(), right.shape()));
                }
                Zip::from(&mut left).and(&right).for_each(|l, &r| *l += r);
                Ok(left)
            }
            Expr::Scale(s, child) => {
                let mut out = child.evaluate(input, exec)?;
                out.mapv_inplace(|v| v * s);
                Ok(out)
            }
            Expr::Product(outer, inner) => {
                let mid = inner.evaluate(input, exec)?;
                outer.evaluate(mid.view(), exec)
            }
        }
    }

    /// Sparse matrix of this operator acting on row-major flattened arrays of
    /// the given shape.
    pub fn to_matrix(&self, shape: &[usize]) -> Result<SparseMatrix> {
        match self {
            Expr::Identity => Ok(SparseMatrix::identity(shape.iter().product())),
            Expr::Axis(op) => SparseMatrix::from_axis(op, shape),
            Expr::Coefficient(field, child) => {
                if field.shape() != shape {
                    return Err(FdError::shape(field.shape(), shape));
                }
                let factors: Vec<f64> = field.values().iter().copied().collect();
                Ok(child.to_matrix(shape)?.scale_rows(&factors))
            }
            Expr::Sum(a, b) => a.to_matrix(shape)?.add(&b.to_matrix(shape)?),
            Expr::Scale(s, child) => Ok(child.to_matrix(shape)?.scaled(*s)),
            Expr::Product(a, b) => a.to_matrix(shape)?.matmul(&b.to_matrix(shape)?),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Identity => write!(f, "I"),
            Expr::Axis(op) if op.order() == 1 => write!(f, "d/dx{}", op.axis()),
            Expr::Axis(op) => write!(f, "d^{}/dx{}^{}", op.order(), op.axis(), op.order()),
            Expr::Coefficient(field, child) => {
                let dims: Vec<String> = field.shape().iter().map(|d| d.to_string()).collect();
                write!(f, "c[{}]*{}", dims.join("x"), child)
            }
            Expr::Sum(a, b) => write!(f, "({a} + {b})"),
            Expr::Scale(s, child) => write!(f, "{s}*{child}"),
            Expr::Product(a, b) => write!(f, "{a}({b})"),
        }
    }
}

impl From<AxisDerivative> for Expr {
    fn from(op: AxisDerivative) -> Self {
        Expr::axis(op)
    }
}

impl From<Arc<AxisDerivative>> for Expr {
    fn from(op: Arc<AxisDerivative>) -> Self {
        Expr::Axis(op)
    }
}

impl Add for Expr {
    type Output = Expr;

    fn add(self, rhs: Expr) -> Expr {
        Expr::add(self, rhs)
    }
}

impl Sub for Expr {
    type Output = Expr;

    fn sub(self, rhs: Expr) -> Expr {
        Expr::add(self, rhs.scale(-1.0))
    }
}

impl Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        self.scale(-1.0)
    }
}

impl Mul<Expr> for f64 {
    type Output = Expr;

    fn mul(self, rhs: Expr) -> Expr {
        rhs.scale(self)
    }
}

impl Mul<f64> for Expr {
    type Output = Expr;

    fn mul(self, rhs: f64) -> Expr {
        self.scale(rhs)
    }
}

/// `a * b` applies `b` first.
impl Mul for Expr {
    type Output = Expr;

    fn mul(self, rhs: Expr) -> Expr {
        self.compose(rhs)
    }
}

/// `field * op`: differentiate, then multiply.
impl Mul<Expr> for CoefficientField {
    type Output = Expr;

    fn mul(self, rhs: Expr) -> Expr {
        rhs.multiply_by_field(self)
    }
}

impl Mul<Expr> for &CoefficientField {
    type Output = Expr;

    fn mul(self, rhs: Expr) -> Expr {
        rhs.multiply_by_field(self.clone())
    }
}

/// `op * field`: multiply, then differentiate.
impl Mul<CoefficientField> for Expr {
    type Output = Expr;

    fn mul(self, rhs: CoefficientField) -> Expr {
        self.compose(Expr::Identity.multiply_by_field(rhs))
    }
}
