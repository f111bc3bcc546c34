//! Test utilities

/// Divide-by-zero-resistant approximate comparison
pub(crate) fn approx(truth: f64, val: f64, rtol: f64, atol: f64) -> bool {
    let abs_err = (val - truth).abs();
    let lim = rtol * truth.abs() + atol;
    abs_err <= lim
}

/// Evenly spaced values from start to end
pub(crate) fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| start + (i as f64 / (n - 1) as f64) * (end - start))
        .collect::<Vec<f64>>()
}

/// Logarithmically spaced values from 10^start to 10^end
pub(crate) fn logspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    linspace(start, end, n)
        .iter()
        .map(|v| 10.0_f64.powf(*v))
        .collect::<Vec<f64>>()
}
