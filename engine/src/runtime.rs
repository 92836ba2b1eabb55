use std::sync::Arc;

use ndarray::{Array, ArrayBase, ArrayD, Data, Dimension};
use rayon::{prelude::*, ThreadPool};

use crate::{
    config::{Concurrency, EngineConfig},
    errors::{FdError, Result},
    operators::{restore_dim, Execution, Expr},
    telemetry,
};

/// Evaluates operator expressions under a configured concurrency strategy.
///
/// Parallel and sequential evaluation produce bit-identical results.
pub struct Runtime {
    cfg: EngineConfig,
    pool: Option<Arc<ThreadPool>>,
}

impl Default for Runtime {
    fn default() -> Self {
        Self {
            cfg: EngineConfig {
                concurrency: Concurrency::Single,
                ..EngineConfig::default()
            },
            pool: None,
        }
    }
}

impl Runtime {
    pub fn new(cfg: EngineConfig) -> Result<Self> {
        let pool = match cfg.concurrency {
            Concurrency::Rayon { workers } => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(workers)
                    .build()
                    .map_err(|err| FdError::Runtime(format!("failed to build rayon pool: {err}")))?;
                tracing::info!(target: "fd_engine", workers, "runtime prepared with rayon pool");
                Some(Arc::new(pool))
            }
            Concurrency::Single => {
                tracing::info!(target: "fd_engine", "runtime prepared single-threaded");
                None
            }
        };
        Ok(Self { cfg, pool })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    pub fn is_parallel(&self) -> bool {
        self.pool.is_some()
    }

    /// Evaluate `expr` against `input`.
    pub fn apply<S, D>(&self, expr: &Expr, input: &ArrayBase<S, D>) -> Result<Array<f64, D>>
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        let view = input.view().into_dyn();
        let out = match &self.pool {
            Some(pool) => pool.install(|| expr.run(view, Execution::Parallel))?,
            None => expr.run(view, Execution::Sequential)?,
        };
        restore_dim(out)
    }

    /// Evaluate `expr` against every array in `inputs`, preserving order.
    pub fn apply_batch(&self, expr: &Expr, inputs: &[ArrayD<f64>]) -> Result<Vec<ArrayD<f64>>> {
        telemetry::record_batch(inputs.len());
        match &self.pool {
            Some(pool) => pool.install(|| {
                inputs
                    .par_iter()
                    .map(|input| expr.run(input.view(), Execution::Parallel))
                    .collect()
            }),
            None => inputs
                .iter()
                .map(|input| expr.run(input.view(), Execution::Sequential))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{grid::Grid, operators::CoefficientField, presets::laplacian};
    use ndarray::Array2;

    fn sample(shape: (usize, usize), phase: f64) -> Array2<f64> {
        Array2::from_shape_fn(shape, |(i, j)| (0.3 * i as f64 + phase).sin() * (0.7 * j as f64).cos())
    }

    #[test]
    fn parallel_matches_sequential() {
        let grid = Grid::uniform(&[(0.1, 30), (0.2, 25)]).unwrap();
        let coef = CoefficientField::new(sample((30, 25), 1.0));
        let expr = coef * laplacian(&grid, 4).unwrap();
        let f = sample((30, 25), 0.0);

        let single = Runtime::default();
        let pooled = Runtime::new(EngineConfig {
            concurrency: Concurrency::Rayon { workers: 3 },
            ..EngineConfig::default()
        })
        .unwrap();
        assert!(pooled.is_parallel());
        let a = single.apply(&expr, &f).unwrap();
        let b = pooled.apply(&expr, &f).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, expr.apply(&f).unwrap());
    }

    #[test]
    fn batch_preserves_order() {
        let grid = Grid::uniform(&[(0.1, 12), (0.1, 12)]).unwrap();
        let expr = laplacian(&grid, 2).unwrap();
        let inputs: Vec<ArrayD<f64>> = (0..4).map(|k| sample((12, 12), k as f64).into_dyn()).collect();
        let pooled = Runtime::new(EngineConfig {
            concurrency: Concurrency::Rayon { workers: 2 },
            ..EngineConfig::default()
        })
        .unwrap();
        let outs = pooled.apply_batch(&expr, &inputs).unwrap();
        assert_eq!(outs.len(), 4);
        for (input, out) in inputs.iter().zip(&outs) {
            assert_eq!(&expr.apply(input).unwrap(), out);
        }
    }
}
