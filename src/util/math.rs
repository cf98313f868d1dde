//! Mathematical helpers for detection and fitting.

/// Clamps `value` into `[lo, hi]`.
pub(crate) fn clamp_f64(value: f64, lo: f64, hi: f64) -> f64 {
    value.max(lo).min(hi)
}

/// Median of a slice; even-length inputs average the two middle values.
///
/// `None` for an empty slice.
pub(crate) fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Mean of a slice, or `None` when empty.
pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Least-squares fit of `y = m * x + b` over point pairs.
///
/// Returns `None` when fewer than two points are given or the x-spread is
/// numerically zero (a vertical configuration).
pub(crate) fn fit_line_lsq(points: &[(f64, f64)]) -> Option<(f64, f64)> {
    let n = points.len() as f64;
    if points.len() < 2 {
        return None;
    }
    let sum_x: f64 = points.iter().map(|p| p.0).sum();
    let sum_y: f64 = points.iter().map(|p| p.1).sum();
    let sum_xx: f64 = points.iter().map(|p| p.0 * p.0).sum();
    let sum_xy: f64 = points.iter().map(|p| p.0 * p.1).sum();

    let denom = n * sum_xx - sum_x * sum_x;
    if denom.abs() < 1e-9 {
        return None;
    }
    let m = (n * sum_xy - sum_x * sum_y) / denom;
    let b = (sum_y - m * sum_x) / n;
    Some((m, b))
}

#[cfg(test)]
mod tests {
    use super::{clamp_f64, fit_line_lsq, mean, median};

    #[test]
    fn clamp_bounds() {
        assert_eq!(clamp_f64(1.5, 0.8, 1.25), 1.25);
        assert_eq!(clamp_f64(0.5, 0.8, 1.25), 0.8);
        assert_eq!(clamp_f64(1.0, 0.8, 1.25), 1.0);
    }

    #[test]
    fn median_even_averages_middle_pair() {
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[5.0, 1.0, 3.0]), Some(3.0));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn median_resists_single_outlier_where_mean_does_not() {
        let values = [10.0, 10.5, 9.5, 500.0];
        assert!((median(&values).unwrap() - 10.25).abs() < 1e-9);
        assert!(mean(&values).unwrap() > 100.0);
    }

    #[test]
    fn lsq_recovers_exact_line() {
        let pts: Vec<(f64, f64)> = (0..10).map(|x| (x as f64, 2.0 * x as f64 + 1.0)).collect();
        let (m, b) = fit_line_lsq(&pts).unwrap();
        assert!((m - 2.0).abs() < 1e-9);
        assert!((b - 1.0).abs() < 1e-9);
    }

    #[test]
    fn lsq_rejects_degenerate_input() {
        assert!(fit_line_lsq(&[(1.0, 2.0)]).is_none());
        assert!(fit_line_lsq(&[(1.0, 2.0), (1.0, 5.0)]).is_none());
    }
}
