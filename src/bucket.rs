//! Top-N bucketing and period-over-period growth ranking.
//!
//! Both functions are pure: they take rows that were already fetched and
//! return new rows, which keeps them testable without a database.

use crate::error::{DashboardError, Result};
use crate::record::{CategoryAggregate, GrowthMatrix, OTHER_CATEGORY};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Aggregation applied to a group of salaries, and again to the tail that
/// gets folded into "Other".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reducer {
    Mean,
    Median,
}

impl Reducer {
    /// Reduce `values`; NaN when `values` is empty.
    pub fn apply(self, values: &[f64]) -> f64 {
        match self {
            Reducer::Mean => mean(values),
            Reducer::Median => median(values),
        }
    }

    /// Word used in chart titles and column headers.
    pub fn label(self) -> &'static str {
        match self {
            Reducer::Mean => "Average",
            Reducer::Median => "Median",
        }
    }
}

/// Arithmetic mean; NaN for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// 50th percentile, i.e. the mean of the two middle values for even
/// lengths. NaN for an empty slice.
pub fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    quantile_sorted(&sorted, 0.5)
}

/// Quantile `q` (0.0..=1.0) of already sorted values, interpolating
/// linearly between neighbours like PostgreSQL's `percentile_cont`.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (position - lower as f64)
}

/// Keep the first `n` aggregates and fold the rest into one "Other" row.
///
/// `sorted` must already be ordered by value, descending; this function does
/// not check. When `n` covers the whole input it is returned unchanged. The
/// "Other" row is always last, whatever its value.
///
/// # Errors
/// * `InvalidArgument` when `n` is zero
pub fn bucket(
    sorted: &[CategoryAggregate],
    n: usize,
    reducer: Reducer,
) -> Result<Vec<CategoryAggregate>> {
    if n < 1 {
        return Err(DashboardError::invalid("top N must be at least 1"));
    }
    if n >= sorted.len() {
        return Ok(sorted.to_vec());
    }

    let (head, tail) = sorted.split_at(n);
    let tail_values: Vec<f64> = tail.iter().map(|aggregate| aggregate.value).collect();

    let mut result = Vec::with_capacity(n + 1);
    result.extend_from_slice(head);
    result.push(CategoryAggregate::new(
        OTHER_CATEGORY,
        reducer.apply(&tail_values),
    ));
    Ok(result)
}

/// Like [`bucket`], but ranks a copy of the input first, so unsorted rows
/// still produce the true top N. NaN values rank last.
pub fn bucket_ranked(
    aggregates: &[CategoryAggregate],
    n: usize,
    reducer: Reducer,
) -> Result<Vec<CategoryAggregate>> {
    let mut ranked = aggregates.to_vec();
    ranked.sort_by(|a, b| descending_nan_last(a.value, b.value));
    bucket(&ranked, n, reducer)
}

fn descending_nan_last(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.total_cmp(&a),
    }
}

/// How cells absent from one period are treated when differencing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingCells {
    /// Missing cells count as 0 before differencing. A department that
    /// appears mid-series gets an infinite change, one that disappears gets -100%.
    #[default]
    ZeroFill,
    /// Period pairs with a missing cell on either side are ignored.
    Skip,
}

/// Mean fractional change of one category across consecutive periods.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GrowthRate {
    pub category_name: String,
    /// `None` when no consecutive pair produced a defined change.
    pub mean_change: Option<f64>,
}

/// Mean of `(v_t - v_{t-1}) / v_{t-1}` per category, in category-name order.
///
/// `0 -> 0` transitions are undefined and left out of the mean; `x -> y`
/// with `x == 0` and `y != 0` is infinite and kept.
pub fn growth_rates(matrix: &GrowthMatrix, policy: MissingCells) -> Vec<GrowthRate> {
    let categories: BTreeSet<&String> = matrix.values().flat_map(|row| row.keys()).collect();
    let periods: Vec<_> = matrix.values().collect();

    categories
        .into_iter()
        .map(|category| {
            let mut changes = Vec::new();
            for pair in periods.windows(2) {
                let previous = pair[0].get(category).copied();
                let current = pair[1].get(category).copied();
                let (previous, current) = match policy {
                    MissingCells::ZeroFill => (previous.unwrap_or(0.0), current.unwrap_or(0.0)),
                    MissingCells::Skip => match (previous, current) {
                        (Some(p), Some(c)) => (p, c),
                        _ => continue,
                    },
                };
                let change = (current - previous) / previous;
                if !change.is_nan() {
                    changes.push(change);
                }
            }

            let mean_change = Some(mean(&changes)).filter(|value| !value.is_nan());
            GrowthRate {
                category_name: category.clone(),
                mean_change,
            }
        })
        .collect()
}

/// Growth rates ranked by mean change, descending. Categories without a
/// defined change rank last; ties keep category-name order.
pub fn ranked_growth(matrix: &GrowthMatrix, policy: MissingCells) -> Vec<GrowthRate> {
    let mut rates = growth_rates(matrix, policy);
    rates.sort_by(|a, b| {
        descending_nan_last(
            a.mean_change.unwrap_or(f64::NAN),
            b.mean_change.unwrap_or(f64::NAN),
        )
    });
    rates
}

/// Names of the `n` categories with the highest mean growth, zero-filling
/// missing cells.
///
/// # Errors
/// * `InvalidArgument` when `n` is zero
pub fn rank_by_growth(matrix: &GrowthMatrix, n: usize) -> Result<Vec<String>> {
    rank_by_growth_with(matrix, n, MissingCells::ZeroFill)
}

/// [`rank_by_growth`] with an explicit policy for missing cells.
pub fn rank_by_growth_with(
    matrix: &GrowthMatrix,
    n: usize,
    policy: MissingCells,
) -> Result<Vec<String>> {
    if n < 1 {
        return Err(DashboardError::invalid("top N must be at least 1"));
    }
    Ok(ranked_growth(matrix, policy)
        .into_iter()
        .take(n)
        .map(|rate| rate.category_name)
        .collect())
}
