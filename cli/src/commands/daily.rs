use anyhow::Result;
use serde::Serialize;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use weighlog_core::analysis::dated_changes;
use weighlog_core::models::DailySeries;
use weighlog_core::service::WeightLogService;

use crate::config::Config;

use super::analyze::NO_DATA_MESSAGE;
use super::helpers::{format_date, no_neg_zero};

#[derive(Debug, Serialize)]
struct DailyRow {
    date: String,
    weight_kg: f64,
    change_kg: Option<f64>,
}

/// One row per day; the first day has no change.
fn daily_rows(series: &DailySeries) -> Vec<DailyRow> {
    let changes = std::iter::once(None).chain(
        dated_changes(series)
            .into_iter()
            .map(|c| Some(c.change_kg)),
    );
    series
        .points()
        .iter()
        .zip(changes)
        .map(|(p, change_kg)| DailyRow {
            date: format_date(p.date),
            weight_kg: p.weight_kg,
            change_kg,
        })
        .collect()
}

pub(crate) fn cmd_daily(config: &Config, json: bool) -> Result<()> {
    let series = WeightLogService::new(&config.data_path).daily_series()?;
    let rows = daily_rows(&series);

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    if rows.is_empty() {
        eprintln!("{NO_DATA_MESSAGE}");
        return Ok(());
    }

    #[derive(Tabled)]
    struct TableRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Weight (kg)")]
        weight: String,
        #[tabled(rename = "Change (kg)")]
        change: String,
    }

    let table_rows: Vec<TableRow> = rows
        .iter()
        .map(|r| TableRow {
            date: r.date.clone(),
            weight: format!("{:.2}", r.weight_kg),
            change: r
                .change_kg
                .map_or("-".into(), |c| format!("{:+.2}", no_neg_zero(c))),
        })
        .collect();

    let table = Table::new(&table_rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_daily_rows_changes() {
        let start = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
        let mut series = DailySeries::default();
        for (i, w) in [70.0, 71.0, 69.0].into_iter().enumerate() {
            series.push(start + chrono::Duration::days(i as i64), w);
        }

        let rows = daily_rows(&series);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].date, "2025.07.01");
        assert!(rows[0].change_kg.is_none());
        assert!((rows[1].change_kg.unwrap() - 1.0).abs() < 1e-9);
        assert!((rows[2].change_kg.unwrap() + 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_daily_missing_file_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = Config::in_dir(tmp.path()).unwrap();
        assert!(cmd_daily(&config, false).is_err());
    }
}
