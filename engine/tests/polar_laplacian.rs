//! Laplacian in polar coordinates applied to f = r^2 = x^2 + y^2.

use std::f64::consts::PI;

use approx::assert_abs_diff_eq;
use fd_engine::{
    AxisDerivative, CoefficientField, Concurrency, EngineConfig, Expr, Runtime,
};
use ndarray::Array2;

const N: usize = 100;

fn polar_laplacian(d_r: AxisDerivative, d2_r: AxisDerivative, r: &[f64], n_phi: usize) -> Expr {
    let dphi = 2.0 * PI / n_phi as f64;
    let d2_phi = AxisDerivative::periodic(1, dphi, n_phi, 2, 2).unwrap();
    let radius = Array2::from_shape_fn((r.len(), n_phi), |(i, _)| r[i]);
    let inv_r = CoefficientField::new(radius.mapv(f64::recip));
    let inv_r2 = CoefficientField::new(radius.mapv(|r| (r * r).recip()));

    Expr::axis(d2_r) + inv_r * Expr::axis(d_r) + inv_r2 * Expr::axis(d2_phi)
}

fn radial_square(r: &[f64], n_phi: usize) -> Array2<f64> {
    Array2::from_shape_fn((r.len(), n_phi), |(i, _)| r[i] * r[i])
}

#[test]
fn uniform_radius_reproduces_cartesian_laplacian() {
    let dr = (10.0 - 0.1) / (N - 1) as f64;
    let r: Vec<f64> = (0..N).map(|i| 0.1 + i as f64 * dr).collect();
    let lap = polar_laplacian(
        AxisDerivative::uniform(0, dr, N, 1, 2).unwrap(),
        AxisDerivative::uniform(0, dr, N, 2, 2).unwrap(),
        &r,
        N,
    );
    let f = radial_square(&r, N);
    let out = lap.apply(&f).unwrap();
    assert_eq!(out.shape(), &[N, N]);
    for v in out.iter() {
        assert!(v.is_finite());
        assert_abs_diff_eq!(*v, 4.0, epsilon = 1e-6);
    }

    // Same expression, same input: bit-identical.
    assert_eq!(out, lap.apply(&f).unwrap());
}

#[test]
fn stretched_radius_reproduces_cartesian_laplacian() {
    let r: Vec<f64> = (0..N)
        .map(|i| 0.1 * (100f64).powf(i as f64 / (N - 1) as f64))
        .collect();
    let lap = polar_laplacian(
        AxisDerivative::coordinates(0, r.clone(), 1, 2).unwrap(),
        AxisDerivative::coordinates(0, r.clone(), 2, 2).unwrap(),
        &r,
        N,
    );
    let out = lap.apply(&radial_square(&r, N)).unwrap();
    for v in out.iter() {
        assert_abs_diff_eq!(*v, 4.0, epsilon = 1e-6);
    }
}

#[test]
fn pooled_runtime_and_matrix_agree() {
    let n = 30;
    let dr = 0.2;
    let r: Vec<f64> = (0..n).map(|i| 0.5 + i as f64 * dr).collect();
    let lap = polar_laplacian(
        AxisDerivative::uniform(0, dr, n, 1, 4).unwrap(),
        AxisDerivative::uniform(0, dr, n, 2, 4).unwrap(),
        &r,
        n,
    );
    let f = radial_square(&r, n);

    let runtime = Runtime::new(EngineConfig {
        concurrency: Concurrency::Rayon { workers: 4 },
        ..EngineConfig::default()
    })
    .unwrap();
    let pooled = runtime.apply(&lap, &f).unwrap();
    assert_eq!(pooled, lap.apply(&f).unwrap());

    let matrix = lap.to_matrix(&[n, n]).unwrap();
    let via_matrix = matrix.dot(&f).unwrap();
    for (a, b) in pooled.iter().zip(via_matrix.iter()) {
        assert_abs_diff_eq!(*a, 4.0, epsilon = 1e-8);
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-8);
    }
}
