//! Statistical kernels shared by the engines.
//!
//! Kernels return `Option<f64>`: `None` means the statistic is not defined
//! for the input (too few points, or zero variance where variance is in a
//! denominator). Mapping `None` onto the richer [`finsight_core::Measure`]
//! vocabulary happens at the engine boundary, where the reason is known.

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample variance (n - 1 denominator); `None` below two points.
pub fn variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let sum_sq: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    Some(sum_sq / (values.len() - 1) as f64)
}

/// Sample standard deviation; `None` below two points.
pub fn std_dev(values: &[f64]) -> Option<f64> {
    variance(values).map(f64::sqrt)
}

/// Trailing sample standard deviation, one slot per input slot.
///
/// A slot is `None` until `window` observations have accumulated.
pub fn rolling_std(values: &[f64], window: usize) -> Vec<Option<f64>> {
    values
        .iter()
        .enumerate()
        .map(|(idx, _)| {
            if idx + 1 < window {
                None
            } else {
                std_dev(&values[idx + 1 - window..=idx])
            }
        })
        .collect()
}

const MIN_DENOMINATOR: f64 = 1e-12;

/// Pearson correlation over two equal-length slices.
///
/// `None` when the slices are shorter than two points, differ in length,
/// or either side is (numerically) constant.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }

    let mx = mean(x)?;
    let my = mean(y)?;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (a, b) in x.iter().zip(y) {
        let dx = a - mx;
        let dy = b - my;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denom = (var_x * var_y).sqrt();
    if denom < MIN_DENOMINATOR {
        return None;
    }

    Some((cov / denom).clamp(-1.0, 1.0))
}
