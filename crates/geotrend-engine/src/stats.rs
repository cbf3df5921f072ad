// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Numeric helpers shared by the pipeline stages.
//!
//! Every function in this module is total over its inputs: degenerate or
//! non-finite cases come back as `None`, never as NaN, so no caller can leak
//! a NaN into a classification comparison.

/// Maps NaN and infinities to `None`; finite values pass through.
pub fn finite_or_none(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// Arithmetic mean; `None` on empty input.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    finite_or_none(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator); `None` below 2 values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let sum_sq: f64 = values
        .iter()
        .map(|v| {
            let diff = v - m;
            diff * diff
        })
        .sum();
    finite_or_none((sum_sq / (values.len() - 1) as f64).sqrt())
}

/// Median of a slice; `None` on empty input.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Some(sorted[mid])
    } else {
        Some((sorted[mid - 1] + sorted[mid]) * 0.5)
    }
}

/// Linearly interpolated quantile over unsorted values; `q` in [0, 1].
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    if lower == upper {
        return Some(sorted[lower]);
    }
    let frac = pos - lower as f64;
    finite_or_none(sorted[lower] + frac * (sorted[upper] - sorted[lower]))
}

/// Interquartile range (q75 - q25); `None` on empty input.
pub fn interquartile_range(values: &[f64]) -> Option<f64> {
    let q75 = quantile(values, 0.75)?;
    let q25 = quantile(values, 0.25)?;
    finite_or_none(q75 - q25)
}

/// Assigns 1-based average ranks, sharing the mean rank across ties.
pub fn assign_average_ranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]).then_with(|| a.cmp(&b)));

    let mut ranks = vec![0.0; n];
    let mut group_start = 0usize;
    while group_start < n {
        let mut group_end = group_start + 1;
        while group_end < n
            && values[order[group_end]]
                .total_cmp(&values[order[group_start]])
                .is_eq()
        {
            group_end += 1;
        }

        let rank_low = group_start as f64 + 1.0;
        let rank_high = group_end as f64;
        let avg_rank = 0.5 * (rank_low + rank_high);

        for &idx in &order[group_start..group_end] {
            ranks[idx] = avg_rank;
        }
        group_start = group_end;
    }

    ranks
}

/// Converts raw values to percentile scores in (0, 1] via average ranks.
pub fn percentile_scores(values: &[f64]) -> Vec<f64> {
    let n = values.len() as f64;
    assign_average_ranks(values)
        .into_iter()
        .map(|rank| rank / n)
        .collect()
}

/// Result of a trend fit over `(year, value)` samples.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrendFit {
    pub slope: f64,
    /// Median absolute residual (robust path) or slope standard error (OLS).
    pub fit_quality: f64,
}

/// Theil-Sen estimator: median of pairwise slopes, with a median-based
/// intercept for residuals. `None` when no valid slope pair exists.
pub fn theil_sen(years: &[i32], values: &[f64]) -> Option<TrendFit> {
    if years.len() != values.len() || years.len() < 2 {
        return None;
    }

    let xs: Vec<f64> = years.iter().map(|y| f64::from(*y)).collect();
    let mut slopes = Vec::new();
    for i in 0..xs.len() {
        for j in (i + 1)..xs.len() {
            let dx = xs[j] - xs[i];
            if dx == 0.0 {
                continue;
            }
            let slope = (values[j] - values[i]) / dx;
            if slope.is_finite() {
                slopes.push(slope);
            }
        }
    }

    let slope = finite_or_none(median(&slopes)?)?;
    let intercept = finite_or_none(median(values)? - slope * median(&xs)?)?;

    let abs_residuals: Vec<f64> = xs
        .iter()
        .zip(values)
        .map(|(x, y)| (y - (intercept + slope * x)).abs())
        .collect();
    let fit_quality = finite_or_none(median(&abs_residuals)?)?;

    Some(TrendFit { slope, fit_quality })
}

/// Ordinary least squares fallback: slope plus its standard error.
/// `None` when the design is degenerate (all years equal or < 3 samples).
pub fn fit_ols(years: &[i32], values: &[f64]) -> Option<TrendFit> {
    let n = years.len();
    if n != values.len() || n < 3 {
        return None;
    }

    let xs: Vec<f64> = years.iter().map(|y| f64::from(*y)).collect();
    let n_f = n as f64;
    let (sum_t, sum_y, sum_tt, sum_ty) = xs
        .iter()
        .zip(values)
        .fold((0.0, 0.0, 0.0, 0.0), |(st, sy, stt, sty), (t, y)| {
            (st + *t, sy + *y, stt + t * t, sty + t * y)
        });
    let denom = n_f * sum_tt - sum_t * sum_t;
    if !denom.is_finite() || denom.abs() <= f64::EPSILON {
        return None;
    }

    let slope = (n_f * sum_ty - sum_t * sum_y) / denom;
    let intercept = (sum_y - slope * sum_t) / n_f;

    let sse: f64 = xs
        .iter()
        .zip(values)
        .map(|(t, y)| {
            let resid = y - (intercept + slope * t);
            resid * resid
        })
        .sum();
    let t_bar = sum_t / n_f;
    let sxx: f64 = xs
        .iter()
        .map(|t| {
            let diff = t - t_bar;
            diff * diff
        })
        .sum();
    if sxx <= 0.0 {
        return None;
    }
    let std_err = (sse / (n_f - 2.0) / sxx).sqrt();

    Some(TrendFit {
        slope: finite_or_none(slope)?,
        fit_quality: finite_or_none(std_err)?,
    })
}
