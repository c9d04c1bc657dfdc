//! Equal-width binning shared by the histogram figures.

/// `bins + 1` equal-width edges over `[min, max]`. A degenerate range is
/// widened to unit width around the value.
pub fn bin_edges(min: f64, max: f64, bins: usize) -> Vec<f64> {
    let bins = bins.max(1);
    let (lo, hi) = if max > min {
        (min, max)
    } else {
        (min - 0.5, min + 0.5)
    };
    let width = (hi - lo) / bins as f64;
    (0..=bins)
        .map(|i| if i == bins { hi } else { lo + width * i as f64 })
        .collect()
}

/// Edges spanning every finite value; `None` if there is none.
pub fn edges_for<'a, I: IntoIterator<Item = &'a f64>>(values: I, bins: usize) -> Option<Vec<f64>> {
    let (lo, hi) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<(f64, f64)>, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })?;
    Some(bin_edges(lo, hi, bins))
}

/// Weighted counts per bin. Bins are half-open except the last, which also
/// takes values equal to the upper edge; out-of-range and non-finite values
/// are dropped. Missing weights count as 1.
pub fn histogram(values: &[f64], weights: Option<&[f64]>, edges: &[f64]) -> Vec<f64> {
    let bins = edges.len().saturating_sub(1);
    let mut counts = vec![0.0; bins];
    if bins == 0 {
        return counts;
    }
    let (lo, hi) = (edges[0], edges[bins]);
    for (i, &v) in values.iter().enumerate() {
        if !v.is_finite() || v < lo || v > hi {
            continue;
        }
        // First edge strictly greater than v, minus one.
        let bin = edges.partition_point(|&e| e <= v).saturating_sub(1).min(bins - 1);
        counts[bin] += weights.and_then(|w| w.get(i)).copied().unwrap_or(1.0);
    }
    counts
}
