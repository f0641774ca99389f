//! Percentage tolerance checks and outlier-rejecting averages.

/// Whether `check` lies within `percent` percent of `base`.
///
/// The band is symmetric around `base`: `|check - base| <= |base| * percent / 100`.
/// A negative or non-finite `percent` never matches.
pub fn is_within_tolerance(base: f64, check: f64, percent: f64) -> bool {
    if !percent.is_finite() || percent < 0.0 || !base.is_finite() || !check.is_finite() {
        return false;
    }
    (check - base).abs() <= base.abs() * percent / 100.0
}

/// Average of the samples that agree with their successor.
///
/// For every consecutive pair `(samples[i-1], samples[i])` within tolerance the
/// earlier sample is kept. Returns `None` when no pair agrees, including when
/// fewer than two samples are given.
pub fn consensus_average(samples: &[f64], percent: f64) -> Option<f64> {
    let kept: Vec<f64> = samples
        .windows(2)
        .filter(|pair| is_within_tolerance(pair[0], pair[1], percent))
        .map(|pair| pair[0])
        .collect();

    if kept.is_empty() {
        None
    } else {
        Some(kept.iter().sum::<f64>() / kept.len() as f64)
    }
}
