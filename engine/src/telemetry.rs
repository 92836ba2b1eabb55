use metrics::{counter, gauge};

pub fn record_stencil_solve(points: usize) {
    counter!("fd.stencil.solves", 1);
    gauge!("fd.stencil.points", points as f64);
}

pub fn record_operator_built(axis: usize, cached_stencils: usize) {
    counter!("fd.operator.built", 1, "axis" => axis.to_string());
    gauge!("fd.operator.cached_stencils", cached_stencils as f64);
}

pub fn record_axis_apply(axis: usize, lanes: usize) {
    counter!("fd.axis.applications", 1, "axis" => axis.to_string());
    gauge!("fd.axis.lanes", lanes as f64);
}

pub fn record_evaluation(parallel: bool) {
    counter!("fd.expr.evaluations", 1, "parallel" => parallel.to_string());
}

pub fn record_batch(size: usize) {
    gauge!("fd.runtime.batch_size", size as f64);
}
