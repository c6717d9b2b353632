// Small numeric helpers shared by the metric passes

pub(crate) fn median(values: &[u32]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] as f64 + sorted[mid] as f64) / 2.0)
    } else {
        Some(sorted[mid] as f64)
    }
}

/// Median of the window of `width` values centered on each position,
/// clipped at the ends of the series.
pub(crate) fn rolling_median(values: &[u32], width: usize) -> Vec<f64> {
    let width = width.max(1);
    let before = (width - 1) / 2;
    let after = width - 1 - before;

    (0..values.len())
        .filter_map(|i| {
            let start = i.saturating_sub(before);
            let end = (i + after + 1).min(values.len());
            median(&values[start..end])
        })
        .collect()
}

/// Ordinary least-squares slope of `y` against `x`.
///
/// `None` with fewer than two points or when all `x` coincide.
pub(crate) fn ols_slope(points: &[(f64, f64)]) -> Option<f64> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;

    let mut num = 0.0;
    let mut den = 0.0;
    for (x, y) in points {
        num += (x - mean_x) * (y - mean_y);
        den += (x - mean_x) * (x - mean_x);
    }
    if den == 0.0 {
        return None;
    }
    Some(num / den)
}

pub(crate) fn mean(values: &[i64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<i64>() as f64 / values.len() as f64)
}
