use std::ops::Range;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use plotters::coord::Shift;
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{FontDesc, FontFamily, FontStyle};
use tracing::info;

use weighlog_core::models::{DATE_FORMAT, WeightReport};

pub const CHART_SIZE: (u32, u32) = (1200, 1000);

const FONT: &str = "sans-serif";
const RAW_TITLE: &str = "Weight Change Over Time";
const SMOOTHED_TITLE: &str = "Smoothed Weight Change";
const CHANGE_TITLE: &str = "Weight Change Rate Trend";
const NO_SMOOTHING: &str = "Not enough data for smoothing";
const NO_CHANGES: &str = "Not enough data for change rate calculation";

type Chart<'a, DB> = ChartContext<'a, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

/// Render the three stacked panels to a PNG at `path`.
pub fn render_weight_charts(path: &Path, report: &WeightReport) -> Result<()> {
    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    draw_weight_charts(&root, report)?;
    root.present()
        .with_context(|| format!("Failed to write chart: {}", path.display()))?;
    info!(path = %path.display(), "chart written");
    Ok(())
}

fn draw_weight_charts<'a, DB>(
    root: &'a DrawingArea<DB, Shift>,
    report: &WeightReport,
) -> Result<()>
where
    DB: DrawingBackend + 'a,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    let panels = root.split_evenly((3, 1));

    let xs: Vec<f64> = report.daily.points().iter().map(|p| ordinal(p.date)).collect();
    let ys = report.daily.weights();

    draw_raw_panel(&panels[0], &xs, &ys)?;

    match &report.smoothed {
        Some(smoothed) => draw_smoothed_panel(&panels[1], &xs, &ys, smoothed)?,
        None => draw_notice(&panels[1], SMOOTHED_TITLE, NO_SMOOTHING)?,
    }

    if report.changes.is_empty() {
        draw_notice(&panels[2], CHANGE_TITLE, NO_CHANGES)?;
    } else {
        let change_xs: Vec<f64> = report.changes.iter().map(|c| ordinal(c.date)).collect();
        let change_ys: Vec<f64> = report.changes.iter().map(|c| c.change_kg).collect();
        draw_change_panel(&panels[2], &change_xs, &change_ys)?;
    }

    Ok(())
}

fn draw_raw_panel<'a, DB>(area: &'a DrawingArea<DB, Shift>, xs: &[f64], ys: &[f64]) -> Result<()>
where
    DB: DrawingBackend + 'a,
    DB::ErrorType: 'static,
{
    let mut chart = build_chart(area, RAW_TITLE, x_bounds(xs), value_bounds(ys, false))?;
    draw_mesh(&mut chart, "Weight (kg)")?;

    chart
        .draw_series(LineSeries::new(zip_points(xs, ys), BLUE.mix(0.7)))?
        .label("Raw Data")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE.mix(0.7)));

    draw_legend(&mut chart)
}

fn draw_smoothed_panel<'a, DB>(
    area: &'a DrawingArea<DB, Shift>,
    xs: &[f64],
    ys: &[f64],
    smoothed: &[f64],
) -> Result<()>
where
    DB: DrawingBackend + 'a,
    DB::ErrorType: 'static,
{
    let all: Vec<f64> = ys.iter().chain(smoothed).copied().collect();
    let mut chart = build_chart(area, SMOOTHED_TITLE, x_bounds(xs), value_bounds(&all, false))?;
    draw_mesh(&mut chart, "Weight (kg)")?;

    chart
        .draw_series(LineSeries::new(zip_points(xs, smoothed), RED.stroke_width(2)))?
        .label("Smoothed Data")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED.stroke_width(2)));
    chart
        .draw_series(LineSeries::new(zip_points(xs, ys), BLUE.mix(0.3)))?
        .label("Raw Data")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE.mix(0.3)));

    draw_legend(&mut chart)
}

fn draw_change_panel<'a, DB>(
    area: &'a DrawingArea<DB, Shift>,
    xs: &[f64],
    changes: &[f64],
) -> Result<()>
where
    DB: DrawingBackend + 'a,
    DB::ErrorType: 'static,
{
    let x_range = x_bounds(xs);
    let mut chart = build_chart(area, CHANGE_TITLE, x_range.clone(), value_bounds(changes, true))?;
    draw_mesh(&mut chart, "Weight Change (kg/day)")?;

    chart.draw_series(LineSeries::new(zip_points(xs, changes), GREEN.mix(0.7)))?;
    chart.draw_series(LineSeries::new(
        vec![(x_range.start, 0.0), (x_range.end, 0.0)],
        RED.mix(0.3),
    ))?;
    Ok(())
}

/// Title plus a centred message in place of a chart.
fn draw_notice<'a, DB>(
    area: &'a DrawingArea<DB, Shift>,
    title: &str,
    message: &str,
) -> Result<()>
where
    DB: DrawingBackend + 'a,
    DB::ErrorType: 'static,
{
    let mut chart = ChartBuilder::on(area)
        .caption(title, (FONT, 22))
        .margin(10)
        .build_cartesian_2d(0.0..1.0, 0.0..1.0)?;
    let style = TextStyle::from(FontDesc::new(FontFamily::SansSerif, 18.0, FontStyle::Normal))
        .pos(Pos::new(HPos::Center, VPos::Center));
    let text = Text::new(message.to_string(), (0.5, 0.5), style);
    chart.draw_series(std::iter::once(text))?;
    Ok(())
}

fn build_chart<'a, DB>(
    area: &'a DrawingArea<DB, Shift>,
    title: &str,
    x_range: Range<f64>,
    y_range: Range<f64>,
) -> Result<Chart<'a, DB>>
where
    DB: DrawingBackend + 'a,
    DB::ErrorType: 'static,
{
    let chart = ChartBuilder::on(area)
        .caption(title, (FONT, 22))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range)?;
    Ok(chart)
}

fn draw_mesh<'a, DB>(chart: &mut Chart<'a, DB>, y_desc: &str) -> Result<()>
where
    DB: DrawingBackend + 'a,
    DB::ErrorType: 'static,
{
    chart
        .configure_mesh()
        .x_desc("Date")
        .y_desc(y_desc)
        .x_labels(8)
        .x_label_formatter(&|x| format_ordinal(*x))
        .y_label_formatter(&|y| format!("{y:.1}"))
        .bold_line_style(BLACK.mix(0.15))
        .light_line_style(BLACK.mix(0.05))
        .draw()?;
    Ok(())
}

fn draw_legend<'a, DB>(chart: &mut Chart<'a, DB>) -> Result<()>
where
    DB: DrawingBackend + 'a,
    DB::ErrorType: 'static,
{
    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    Ok(())
}

fn zip_points(xs: &[f64], ys: &[f64]) -> Vec<(f64, f64)> {
    xs.iter().copied().zip(ys.iter().copied()).collect()
}

/// Days since the common era, the x coordinate of every panel.
pub(crate) fn ordinal(date: NaiveDate) -> f64 {
    f64::from(date.num_days_from_ce())
}

pub(crate) fn format_ordinal(x: f64) -> String {
    NaiveDate::from_num_days_from_ce_opt(x.round() as i32)
        .map(|d| d.format(DATE_FORMAT).to_string())
        .unwrap_or_default()
}

/// Date axis range; a single day is widened by one day each side.
pub(crate) fn x_bounds(xs: &[f64]) -> Range<f64> {
    let (lo, hi) = min_max(xs).unwrap_or((0.0, 1.0));
    if hi > lo { lo..hi } else { (lo - 1.0)..(hi + 1.0) }
}

/// Value axis range with 5% headroom. `with_zero` keeps the zero line visible.
pub(crate) fn value_bounds(values: &[f64], with_zero: bool) -> Range<f64> {
    let (mut lo, mut hi) = min_max(values).unwrap_or((0.0, 1.0));
    if with_zero {
        lo = lo.min(0.0);
        hi = hi.max(0.0);
    }
    let pad = if hi > lo { (hi - lo) * 0.05 } else { 0.5 };
    (lo - pad)..(hi + pad)
}

fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    values.iter().copied().fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use weighlog_core::analysis::build_report;
    use weighlog_core::models::DailySeries;

    fn series(weights: &[f64]) -> DailySeries {
        let start = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
        let mut s = DailySeries::default();
        for (day, w) in (0_i64..).zip(weights) {
            s.push(start + chrono::Duration::days(day), *w);
        }
        s
    }

    fn assert_png(path: &Path) {
        let bytes = std::fs::read(path).unwrap();
        assert!(bytes.starts_with(b"\x89PNG"), "not a PNG: {}", path.display());
    }

    #[test]
    fn test_render_single_day_uses_notices() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("weight_analysis.png");
        let report = build_report(&series(&[70.0]), 175.0).unwrap();
        assert!(report.smoothed.is_none());
        assert!(report.changes.is_empty());

        render_weight_charts(&path, &report).unwrap();
        assert_png(&path);
    }

    #[test]
    fn test_render_full_report() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("weight_analysis.png");
        let report =
            build_report(&series(&[71.0, 70.6, 70.9, 70.2, 69.8, 70.1, 69.5]), 175.0).unwrap();
        assert!(report.smoothed.is_some());

        render_weight_charts(&path, &report).unwrap();
        assert_png(&path);
    }

    #[test]
    fn test_render_changes_without_smoothing() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("weight_analysis.png");
        let report = build_report(&series(&[70.0, 70.4]), 175.0).unwrap();
        assert!(report.smoothed.is_none());
        assert_eq!(report.changes.len(), 1);

        render_weight_charts(&path, &report).unwrap();
        assert_png(&path);
    }

    #[test]
    fn test_ordinal_round_trip_format() {
        let d = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
        assert_eq!(format_ordinal(ordinal(d)), "2025.07.01");
        assert_eq!(format_ordinal(ordinal(d) + 0.4), "2025.07.01");
        assert_eq!(format_ordinal(ordinal(d) + 1.0), "2025.07.02");
    }

    #[test]
    fn test_x_bounds_single_day() {
        let r = x_bounds(&[100.0]);
        assert!((r.start - 99.0).abs() < f64::EPSILON);
        assert!((r.end - 101.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_x_bounds_span() {
        let r = x_bounds(&[103.0, 100.0, 110.0]);
        assert!((r.start - 100.0).abs() < f64::EPSILON);
        assert!((r.end - 110.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_value_bounds_padding() {
        let r = value_bounds(&[70.0, 80.0], false);
        assert!((r.start - 69.5).abs() < 1e-9);
        assert!((r.end - 80.5).abs() < 1e-9);
    }

    #[test]
    fn test_value_bounds_flat_series() {
        let r = value_bounds(&[70.0, 70.0], false);
        assert!(r.start < 70.0 && r.end > 70.0);
    }

    #[test]
    fn test_value_bounds_include_zero() {
        let r = value_bounds(&[0.5, 1.5], true);
        assert!(r.start < 0.0);
        assert!(r.end > 1.5);
    }

    #[test]
    fn test_min_max_empty() {
        assert!(min_max(&[]).is_none());
        assert_eq!(min_max(&[2.0, -1.0, 3.0]), Some((-1.0, 3.0)));
    }
}
