use ndarray::{Array, ArrayBase, ArrayD, ArrayView1, ArrayViewD, ArrayViewMut1, Axis, Data, Dimension, Zip};

use crate::{
    errors::{FdError, Result},
    grid::{GridAxis, Spacing},
    stencil::{
        centered_width,
        coefficients::{centered, shifted},
        one_sided_width, validate_order, Stencil,
    },
    telemetry,
};

use super::{restore_dim, Execution};

/// Stencils resolved for every sample position of one axis.
#[derive(Debug, Clone)]
enum StencilPlan {
    /// Uniform axis with one-sided stencils within the half-width of each edge.
    /// `right[i]` serves the sample `i` positions from the last one.
    Bounded {
        interior: Stencil,
        left: Vec<Stencil>,
        right: Vec<Stencil>,
    },
    /// Uniform axis whose ends wrap around.
    Periodic { interior: Stencil },
    /// Non-uniform axis, one stencil per sample.
    Pointwise(Vec<Stencil>),
}

/// Partial derivative of fixed order and accuracy along one grid axis.
///
/// All stencils are solved at construction; `apply` only convolves.
#[derive(Debug, Clone)]
pub struct AxisDerivative {
    axis: usize,
    order: usize,
    accuracy: usize,
    len: usize,
    plan: StencilPlan,
}

#[allow(clippy::len_without_is_empty)]
impl AxisDerivative {
    pub fn new(grid_axis: &GridAxis, order: usize, accuracy: usize) -> Result<Self> {
        validate_order(order, accuracy)?;
        grid_axis.validate()?;
        let axis = grid_axis.index;
        let len = grid_axis.len;
        let required = centered_width(order, accuracy);
        if len < required {
            return Err(FdError::InsufficientGrid {
                axis,
                len,
                order,
                accuracy,
                required,
            });
        }

        let plan = match &grid_axis.spacing {
            Spacing::Uniform(h) => {
                let scale = h.powi(order as i32).recip();
                let interior = centered(order, accuracy)?.scaled(scale);
                if grid_axis.periodic {
                    StencilPlan::Periodic { interior }
                } else {
                    let half = required / 2;
                    let width = boundary_width(axis, order, accuracy, len);
                    let left = (0..half)
                        .map(|i| shifted(order, width, i).map(|s| s.scaled(scale)))
                        .collect::<Result<Vec<_>>>()?;
                    let right = (0..half)
                        .map(|i| shifted(order, width, width - 1 - i).map(|s| s.scaled(scale)))
                        .collect::<Result<Vec<_>>>()?;
                    StencilPlan::Bounded {
                        interior,
                        left,
                        right,
                    }
                }
            }
            Spacing::Coordinates(coords) => {
                StencilPlan::Pointwise(pointwise(axis, coords, order, accuracy)?)
            }
        };

        let op = Self {
            axis,
            order,
            accuracy,
            len,
            plan,
        };
        tracing::debug!(
            target: "fd_engine",
            axis,
            order,
            accuracy,
            len,
            stencils = op.cached_stencils(),
            "built axis derivative"
        );
        telemetry::record_operator_built(axis, op.cached_stencils());
        Ok(op)
    }

    /// `d^order / dx_axis^order` on `len` samples spaced `step` apart.
    pub fn uniform(axis: usize, step: f64, len: usize, order: usize, accuracy: usize) -> Result<Self> {
        Self::new(&GridAxis::uniform(axis, step, len)?, order, accuracy)
    }

    /// Same as [`AxisDerivative::uniform`] with wrap-around ends.
    pub fn periodic(axis: usize, step: f64, len: usize, order: usize, accuracy: usize) -> Result<Self> {
        Self::new(&GridAxis::periodic(axis, step, len)?, order, accuracy)
    }

    /// Derivative on an axis sampled at explicit coordinates.
    pub fn coordinates(axis: usize, coords: Vec<f64>, order: usize, accuracy: usize) -> Result<Self> {
        Self::new(&GridAxis::coordinates(axis, coords)?, order, accuracy)
    }

    pub fn axis(&self) -> usize {
        self.axis
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn accuracy(&self) -> usize {
        self.accuracy
    }

    /// Samples along the axis, never fewer than the centered stencil width.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_periodic(&self) -> bool {
        matches!(self.plan, StencilPlan::Periodic { .. })
    }

    /// Number of distinct stencils held by this operator.
    pub fn cached_stencils(&self) -> usize {
        match &self.plan {
            StencilPlan::Bounded { left, right, .. } => 1 + left.len() + right.len(),
            StencilPlan::Periodic { .. } => 1,
            StencilPlan::Pointwise(all) => all.len(),
        }
    }

    /// Stencil used at sample `i`, weights already scaled by the spacing.
    pub fn stencil_at(&self, i: usize) -> Option<&Stencil> {
        if i >= self.len {
            return None;
        }
        match &self.plan {
            StencilPlan::Bounded {
                interior,
                left,
                right,
            } => {
                if i < left.len() {
                    left.get(i)
                } else if i >= self.len - right.len() {
                    right.get(self.len - 1 - i)
                } else {
                    Some(interior)
                }
            }
            StencilPlan::Periodic { interior } => Some(interior),
            StencilPlan::Pointwise(all) => all.get(i),
        }
    }

    /// Differentiate `input` along this operator's axis.
    pub fn apply<S, D>(&self, input: &ArrayBase<S, D>) -> Result<Array<f64, D>>
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        let out = self.apply_view(input.view().into_dyn(), Execution::Sequential)?;
        restore_dim(out)
    }

    pub(crate) fn apply_view(&self, input: ArrayViewD<'_, f64>, exec: Execution) -> Result<ArrayD<f64>> {
        let ndim = input.ndim();
        if self.axis >= ndim {
            return Err(FdError::AxisOutOfBounds {
                axis: self.axis,
                ndim,
            });
        }
        if input.len_of(Axis(self.axis)) != self.len {
            let mut expected = input.shape().to_vec();
            expected[self.axis] = self.len;
            return Err(FdError::shape(&expected, input.shape()));
        }

        let mut out = ArrayD::<f64>::zeros(input.raw_dim());
        let zip = Zip::from(out.lanes_mut(Axis(self.axis))).and(input.lanes(Axis(self.axis)));
        match exec {
            Execution::Sequential => zip.for_each(|o, i| self.apply_lane(i, o)),
            Execution::Parallel => zip.par_for_each(|o, i| self.apply_lane(i, o)),
        }
        telemetry::record_axis_apply(self.axis, input.len() / self.len);
        Ok(out)
    }

    fn apply_lane(&self, lane: ArrayView1<'_, f64>, mut out: ArrayViewMut1<'_, f64>) {
        let n = lane.len();
        match &self.plan {
            StencilPlan::Bounded {
                interior,
                left,
                right,
            } => {
                for (i, s) in left.iter().enumerate() {
                    out[i] = s.apply_at(&lane, i);
                }
                for i in left.len()..n - right.len() {
                    out[i] = interior.apply_at(&lane, i);
                }
                for (i, s) in right.iter().enumerate() {
                    out[n - 1 - i] = s.apply_at(&lane, n - 1 - i);
                }
            }
            StencilPlan::Periodic { interior } => {
                for i in 0..n {
                    out[i] = interior.apply_wrapped(&lane, i);
                }
            }
            StencilPlan::Pointwise(all) => {
                for (i, s) in all.iter().enumerate() {
                    out[i] = s.apply_at(&lane, i);
                }
            }
        }
    }
}

/// Width of edge stencils, narrowed to the axis length when it is too short
/// for the full one-sided stencil.
fn boundary_width(axis: usize, order: usize, accuracy: usize, len: usize) -> usize {
    let full = one_sided_width(order, accuracy);
    if len < full {
        tracing::warn!(
            target: "fd_engine",
            axis,
            order,
            accuracy,
            len,
            "axis shorter than one-sided stencil; boundary accuracy reduced"
        );
        len
    } else {
        full
    }
}

/// Per-sample stencils for a coordinate axis. Without the symmetry of a
/// uniform grid the odd error term does not cancel, so every window spans
/// `order + accuracy` samples, as centered as the edges allow.
fn pointwise(axis: usize, coords: &[f64], order: usize, accuracy: usize) -> Result<Vec<Stencil>> {
    let n = coords.len();
    let width = boundary_width(axis, order, accuracy, n);
    let lead = (width - 1) / 2;
    (0..n)
        .map(|i| {
            let start = i.saturating_sub(lead).min(n - width);
            let offsets: Vec<isize> = (start..start + width)
                .map(|j| j as isize - i as isize)
                .collect();
            let deltas: Vec<f64> = (start..start + width).map(|j| coords[j] - coords[i]).collect();
            Stencil::from_deltas(order, offsets, &deltas)
        })
        .collect()
}
