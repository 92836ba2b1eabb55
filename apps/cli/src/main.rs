use std::{f64::consts::PI, path::PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use fd_engine::{
    coefficients, laplacian, AxisDerivative, CoefficientField, EngineConfig, Expr, Runtime, Stencil,
};
use ndarray::{Array2, ArrayD, Dimension, IxDyn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Finite-difference operator toolkit", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Display engine banner
    Banner,

    /// Print stencil coefficients for a derivative order and accuracy
    Stencil {
        #[arg(long, default_value_t = 1)]
        order: usize,
        #[arg(long, default_value_t = 2)]
        accuracy: usize,
        /// Explicit integer offsets, e.g. `--offsets=-1,0,1,2`
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        offsets: Option<Vec<isize>>,
        #[arg(long)]
        json: bool,
    },

    /// Apply the polar Laplacian to r^2 on r in [0.1, 10], phi in [0, 2pi)
    PolarLaplacian {
        #[arg(long, default_value_t = 100)]
        nr: usize,
        #[arg(long, default_value_t = 100)]
        nphi: usize,
        #[arg(long, default_value_t = 2)]
        accuracy: usize,
    },

    /// Apply the Laplacian to sum(x_i^2) on a configured grid
    Check {
        #[arg(long)]
        config: PathBuf,
    },
}

fn print_stencil(label: &str, stencil: &Stencil) {
    let pairs: Vec<String> = stencil
        .iter()
        .map(|(offset, weight)| format!("{offset:+}:{weight:.6}"))
        .collect();
    println!("{label:>9} [{}]", pairs.join(", "));
}

fn stencil_cmd(order: usize, accuracy: usize, offsets: Option<Vec<isize>>, json: bool) -> Result<()> {
    match offsets {
        Some(offsets) => {
            let stencil = Stencil::from_offsets(order, &offsets)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stencil)?);
            } else {
                print_stencil("explicit", &stencil);
            }
        }
        None => {
            let family = coefficients(order, accuracy)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&family)?);
            } else {
                print_stencil("center", &family.center);
                print_stencil("forward", &family.forward);
                print_stencil("backward", &family.backward);
            }
        }
    }
    Ok(())
}

fn polar_laplacian_cmd(nr: usize, nphi: usize, accuracy: usize) -> Result<()> {
    if nr < 2 || nphi < 2 {
        bail!("polar grid needs at least two samples per axis");
    }
    let dr = (10.0 - 0.1) / (nr - 1) as f64;
    let dphi = 2.0 * PI / nphi as f64;
    let radius = Array2::from_shape_fn((nr, nphi), |(i, _)| 0.1 + i as f64 * dr);

    let d_r = AxisDerivative::uniform(0, dr, nr, 1, accuracy)?;
    let d2_r = AxisDerivative::uniform(0, dr, nr, 2, accuracy)?;
    let d2_phi = AxisDerivative::periodic(1, dphi, nphi, 2, accuracy)?;
    let inv_r = CoefficientField::new(radius.mapv(f64::recip));
    let inv_r2 = CoefficientField::new(radius.mapv(|r| (r * r).recip()));
    let lap = Expr::axis(d2_r) + inv_r * Expr::axis(d_r) + inv_r2 * Expr::axis(d2_phi);
    tracing::info!(nr, nphi, accuracy, "applying {lap}");

    let runtime = Runtime::new(EngineConfig::default())?;
    let out = runtime.apply(&lap, &radius.mapv(|r| r * r))?;
    let deviation = out.iter().fold(0.0_f64, |acc, v| acc.max((v - 4.0).abs()));
    println!("max |lap(r^2) - 4| = {deviation:.3e}");
    Ok(())
}

fn check_cmd(path: PathBuf) -> Result<()> {
    let cfg = EngineConfig::from_path(&path)
        .with_context(|| format!("failed to load config {}", path.display()))?;
    let grid = cfg.grid()?.context("config has no [grid] section")?;
    let points: Vec<Vec<f64>> = grid.axes().iter().map(|axis| axis.points()).collect();

    let shape = grid.shape();
    let f = ArrayD::from_shape_fn(IxDyn(&shape), |idx| {
        idx.slice()
            .iter()
            .zip(&points)
            .map(|(&i, xs)| xs[i] * xs[i])
            .sum::<f64>()
    });
    let lap = laplacian(&grid, cfg.accuracy)?;
    let runtime = Runtime::new(cfg.clone())?;
    let out = runtime.apply(&lap, &f)?;

    let expected = 2.0 * grid.ndim() as f64;
    let deviation = out.iter().fold(0.0_f64, |acc, v| acc.max((v - expected).abs()));
    println!("grid {shape:?}, accuracy {}: max |lap - {expected}| = {deviation:.3e}", cfg.accuracy);
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Banner => {
            println!("{}", fd_engine::banner());
        }
        Command::Stencil {
            order,
            accuracy,
            offsets,
            json,
        } => stencil_cmd(order, accuracy, offsets, json)?,
        Command::PolarLaplacian { nr, nphi, accuracy } => polar_laplacian_cmd(nr, nphi, accuracy)?,
        Command::Check { config } => check_cmd(config)?,
    }
    Ok(())
}
