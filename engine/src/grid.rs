//! Structured grid descriptors consumed by operator constructors.

use serde::{Deserialize, Serialize};

use crate::errors::{FdError, Result};

/// Sample placement along one axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Spacing {
    /// Equidistant samples with a fixed step.
    Uniform(f64),
    /// Explicit, strictly monotonic sample coordinates.
    Coordinates(Vec<f64>),
}

/// One dimension of a sampled grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridAxis {
    pub index: usize,
    pub spacing: Spacing,
    pub len: usize,
    #[serde(default)]
    pub periodic: bool,
    /// Coordinate of the first sample on a uniform axis.
    #[serde(default)]
    pub origin: f64,
}

impl GridAxis {
    /// Uniformly spaced axis with `len` samples.
    pub fn uniform(index: usize, step: f64, len: usize) -> Result<Self> {
        let axis = Self {
            index,
            spacing: Spacing::Uniform(step),
            len,
            periodic: false,
            origin: 0.0,
        };
        axis.validate()?;
        Ok(axis)
    }

    /// Uniform axis whose last sample wraps around onto the first.
    pub fn periodic(index: usize, step: f64, len: usize) -> Result<Self> {
        let axis = Self {
            index,
            spacing: Spacing::Uniform(step),
            len,
            periodic: true,
            origin: 0.0,
        };
        axis.validate()?;
        Ok(axis)
    }

    /// Axis sampled at explicit coordinates.
    pub fn coordinates(index: usize, coords: Vec<f64>) -> Result<Self> {
        let axis = Self {
            index,
            len: coords.len(),
            spacing: Spacing::Coordinates(coords),
            periodic: false,
            origin: 0.0,
        };
        axis.validate()?;
        Ok(axis)
    }

    /// Shift a uniform axis so its first sample sits at `origin`.
    /// Coordinate axes already carry physical positions and ignore it.
    pub fn with_origin(mut self, origin: f64) -> Result<Self> {
        self.origin = origin;
        self.validate()?;
        Ok(self)
    }

    pub fn is_uniform(&self) -> bool {
        matches!(self.spacing, Spacing::Uniform(_))
    }

    /// Check the spacing invariants for this axis.
    pub fn validate(&self) -> Result<()> {
        match &self.spacing {
            Spacing::Uniform(h) => {
                if !h.is_finite() || *h <= 0.0 {
                    return Err(FdError::spacing(
                        self.index,
                        format!("uniform step must be positive and finite, got {h}"),
                    ));
                }
                if !self.origin.is_finite() {
                    return Err(FdError::spacing(
                        self.index,
                        format!("origin must be finite, got {}", self.origin),
                    ));
                }
            }
            Spacing::Coordinates(coords) => {
                if coords.len() != self.len {
                    return Err(FdError::spacing(
                        self.index,
                        format!("{} coordinates for {} samples", coords.len(), self.len),
                    ));
                }
                if coords.iter().any(|x| !x.is_finite()) {
                    return Err(FdError::spacing(self.index, "coordinates must be finite"));
                }
                let increasing = coords.windows(2).all(|w| w[1] > w[0]);
                let decreasing = coords.windows(2).all(|w| w[1] < w[0]);
                if !(increasing || decreasing) {
                    return Err(FdError::spacing(
                        self.index,
                        "coordinates must be strictly monotonic",
                    ));
                }
                if self.periodic {
                    return Err(FdError::InvalidGrid(format!(
                        "axis {} cannot be periodic with non-uniform coordinates",
                        self.index
                    )));
                }
            }
        }
        Ok(())
    }

    /// Physical sample coordinates.
    pub fn points(&self) -> Vec<f64> {
        match &self.spacing {
            Spacing::Uniform(h) => (0..self.len).map(|i| self.origin + i as f64 * h).collect(),
            Spacing::Coordinates(coords) => coords.clone(),
        }
    }
}

/// Ordered collection of axes describing an N-dimensional grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    axes: Vec<GridAxis>,
}

impl Grid {
    pub fn new(axes: Vec<GridAxis>) -> Result<Self> {
        if axes.is_empty() {
            return Err(FdError::InvalidGrid("grid needs at least one axis".into()));
        }
        for (pos, axis) in axes.iter().enumerate() {
            if axis.index != pos {
                return Err(FdError::InvalidGrid(format!(
                    "axis at position {pos} declares index {}",
                    axis.index
                )));
            }
            axis.validate()?;
        }
        Ok(Self { axes })
    }

    /// Uniform grid from `(step, len)` pairs, one per axis.
    pub fn uniform(dims: &[(f64, usize)]) -> Result<Self> {
        let axes = dims
            .iter()
            .enumerate()
            .map(|(index, &(step, len))| GridAxis::uniform(index, step, len))
            .collect::<Result<Vec<_>>>()?;
        Self::new(axes)
    }

    pub fn ndim(&self) -> usize {
        self.axes.len()
    }

    pub fn shape(&self) -> Vec<usize> {
        self.axes.iter().map(|a| a.len).collect()
    }

    pub fn axes(&self) -> &[GridAxis] {
        &self.axes
    }

    pub fn axis(&self, index: usize) -> Result<&GridAxis> {
        self.axes.get(index).ok_or(FdError::AxisOutOfBounds {
            axis: index,
            ndim: self.axes.len(),
        })
    }

    /// Sample coordinates along `axis`.
    pub fn points(&self, axis: usize) -> Result<Vec<f64>> {
        Ok(self.axis(axis)?.points())
    }
}
