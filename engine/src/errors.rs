use thiserror::Error;

/// Unified error type for the operator engine.
#[derive(Debug, Error)]
pub enum FdError {
    /// Offsets cannot determine a stencil for the requested derivative.
    #[error("singular stencil for derivative order {order}: {reason}")]
    SingularStencil { order: usize, reason: String },
    /// Axis has fewer samples than the narrowest admissible stencil.
    #[error("axis {axis} has {len} samples but order {order} / accuracy {accuracy} needs at least {required}")]
    InsufficientGrid {
        axis: usize,
        len: usize,
        order: usize,
        accuracy: usize,
        required: usize,
    },
    /// Array shapes disagree during evaluation.
    #[error("shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        found: Vec<usize>,
    },
    /// Uniform step is not positive or coordinates are not strictly monotonic.
    #[error("invalid spacing on axis {axis}: {reason}")]
    InvalidSpacing { axis: usize, reason: String },
    /// Accuracy order must be a positive even integer.
    #[error("accuracy must be a positive even integer, got {0}")]
    InvalidAccuracy(usize),
    /// Derivative order must be at least one.
    #[error("derivative order must be at least 1, got {0}")]
    InvalidOrder(usize),
    /// Operator axis does not exist on the input array.
    #[error("axis {axis} out of bounds for array with {ndim} dimensions")]
    AxisOutOfBounds { axis: usize, ndim: usize },
    /// Grid description cannot support the requested operator.
    #[error("invalid grid: {0}")]
    InvalidGrid(String),
    /// Worker pool could not be prepared.
    #[error("runtime error: {0}")]
    Runtime(String),
    /// Wrapper around I/O errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON parsing error.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    /// YAML parsing error.
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// TOML parsing error.
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl FdError {
    pub fn singular<T: Into<String>>(order: usize, reason: T) -> Self {
        Self::SingularStencil {
            order,
            reason: reason.into(),
        }
    }

    pub fn spacing<T: Into<String>>(axis: usize, reason: T) -> Self {
        Self::InvalidSpacing {
            axis,
            reason: reason.into(),
        }
    }

    pub fn shape(expected: &[usize], found: &[usize]) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_vec(),
            found: found.to_vec(),
        }
    }
}

pub type Result<T, E = FdError> = std::result::Result<T, E>;
