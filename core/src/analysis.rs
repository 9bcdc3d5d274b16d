use crate::models::{DailyChange, DailySeries, LatestBmi, Statistics, WeightReport};
use crate::smoothing::smooth_daily_series;

/// Mean, maximum and minimum of `weights`, or `None` for an empty slice.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn calculate_statistics(weights: &[f64]) -> Option<Statistics> {
    if weights.is_empty() {
        return None;
    }
    let sum: f64 = weights.iter().sum();
    Some(Statistics {
        average_kg: sum / weights.len() as f64,
        maximum_kg: weights.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        minimum_kg: weights.iter().copied().fold(f64::INFINITY, f64::min),
        days: weights.len(),
    })
}

/// First difference: `weights[i] - weights[i - 1]` for each `i >= 1`.
#[must_use]
pub fn weight_changes(weights: &[f64]) -> Vec<f64> {
    weights.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Changes paired with the later date of each pair.
#[must_use]
pub fn dated_changes(series: &DailySeries) -> Vec<DailyChange> {
    let changes = weight_changes(&series.weights());
    series
        .points()
        .iter()
        .skip(1)
        .zip(changes)
        .map(|(p, change_kg)| DailyChange {
            date: p.date,
            change_kg,
        })
        .collect()
}

/// Body mass index: kg / m².
#[must_use]
pub fn calculate_bmi(weight_kg: f64, height_cm: f64) -> f64 {
    let height_m = height_cm / 100.0;
    weight_kg / (height_m * height_m)
}

#[must_use]
pub fn latest_bmi(series: &DailySeries, height_cm: f64) -> Option<LatestBmi> {
    let last = series.last()?;
    Some(LatestBmi {
        date: last.date,
        weight_kg: last.weight_kg,
        bmi: calculate_bmi(last.weight_kg, height_cm),
        height_cm,
    })
}

/// Build the full report for a series, or `None` when it has no data.
#[must_use]
pub fn build_report(series: &DailySeries, height_cm: f64) -> Option<WeightReport> {
    let statistics = calculate_statistics(&series.weights())?;
    Some(WeightReport {
        statistics,
        latest_bmi: latest_bmi(series, height_cm),
        daily: series.clone(),
        changes: dated_changes(series),
        smoothed: smooth_daily_series(series),
    })
}
