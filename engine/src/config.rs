use std::fs;

use serde::{Deserialize, Serialize};

use crate::{
    errors::{FdError, Result},
    grid::{Grid, GridAxis, Spacing},
};

/// Concurrency strategy for operator evaluation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Concurrency {
    /// Single-threaded deterministic execution.
    Single,
    /// Rayon work-stealing pool with the given number of workers.
    Rayon { workers: usize },
}

impl Default for Concurrency {
    fn default() -> Self {
        Self::Rayon {
            workers: num_cpus::get().max(1),
        }
    }
}

/// One axis of a configured grid: either `start`/`spacing`/`len` or `coords`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AxisConfig {
    #[serde(default)]
    pub start: f64,
    pub spacing: Option<f64>,
    pub len: Option<usize>,
    pub coords: Option<Vec<f64>>,
    #[serde(default)]
    pub periodic: bool,
}

impl AxisConfig {
    fn build(&self, index: usize) -> Result<GridAxis> {
        let axis = match (&self.coords, self.spacing, self.len) {
            (Some(coords), None, _) => GridAxis {
                index,
                len: coords.len(),
                spacing: Spacing::Coordinates(coords.clone()),
                periodic: self.periodic,
                origin: 0.0,
            },
            (None, Some(step), Some(len)) => GridAxis {
                index,
                spacing: Spacing::Uniform(step),
                len,
                periodic: self.periodic,
                origin: self.start,
            },
            _ => {
                return Err(FdError::InvalidGrid(format!(
                    "axis {index} needs either `coords` or both `spacing` and `len`"
                )))
            }
        };
        axis.validate()?;
        Ok(axis)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
pub struct GridConfig {
    pub axes: Vec<AxisConfig>,
}

impl GridConfig {
    pub fn build(&self) -> Result<Grid> {
        let axes = self
            .axes
            .iter()
            .enumerate()
            .map(|(index, axis)| axis.build(index))
            .collect::<Result<Vec<_>>>()?;
        Grid::new(axes)
    }
}

const fn default_accuracy() -> usize {
    2
}

/// Engine configuration loaded from TOML/YAML.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub concurrency: Concurrency,
    #[serde(default = "default_accuracy")]
    pub accuracy: usize,
    pub grid: Option<GridConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            concurrency: Concurrency::default(),
            accuracy: default_accuracy(),
            grid: None,
        }
    }
}

impl EngineConfig {
    /// Load a configuration from a TOML file on disk.
    pub fn from_toml_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(raw)?;
        Ok(cfg)
    }

    /// Load a configuration from a YAML file on disk.
    pub fn from_yaml_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let cfg: Self = serde_yaml::from_str(&raw)?;
        Ok(cfg)
    }

    /// Pick the loader from the file extension, defaulting to TOML.
    pub fn from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_path(path),
            Some("json") => {
                let raw = fs::read_to_string(path)?;
                Ok(serde_json::from_str(&raw)?)
            }
            _ => Self::from_toml_path(path),
        }
    }

    /// The configured grid, if any.
    pub fn grid(&self) -> Result<Option<Grid>> {
        self.grid.as_ref().map(GridConfig::build).transpose()
    }
}
