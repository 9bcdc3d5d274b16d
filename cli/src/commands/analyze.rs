use std::fmt::Write as _;

use anyhow::Result;
use tracing::warn;

use weighlog_core::models::WeightReport;
use weighlog_core::service::WeightLogService;

use crate::chart::render_weight_charts;
use crate::config::Config;

use super::helpers::{format_date, json_error};

pub(crate) const NO_DATA_MESSAGE: &str = "No weight data found in the CSV file.";

/// Bootstrap, read, compute, plot, print.
pub(crate) fn cmd_analyze(config: &Config, json: bool, show: bool) -> Result<()> {
    let svc = WeightLogService::new(&config.data_path);

    if svc.initialize(config.log_start, config.log_end)? {
        let file = config.data_file_label();
        if json {
            println!(
                "{}",
                serde_json::json!({
                    "created": file,
                    "message": "Please fill in the weight data and run the program again.",
                })
            );
        } else {
            println!("CSV file created: {file}");
            println!("Please fill in the weight data and run the program again.");
        }
        return Ok(());
    }

    let Some(report) = svc.report(config.height_cm)? else {
        if json {
            println!("{}", json_error(NO_DATA_MESSAGE));
        } else {
            println!("{NO_DATA_MESSAGE}");
        }
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", format_summary(&report));
    }

    render_weight_charts(&config.plot_path, &report)?;
    if !json {
        println!("Plots saved as '{}'", config.plot_file_label());
    }

    if show {
        if let Err(e) = open::that(&config.plot_path) {
            warn!(error = %e, path = %config.plot_path.display(), "could not open chart viewer");
        }
    }

    Ok(())
}

/// Statistics block followed by the latest BMI line.
pub(crate) fn format_summary(report: &WeightReport) -> String {
    let stats = &report.statistics;
    let mut out = String::new();
    let _ = writeln!(out, "Statistics:");
    let _ = writeln!(out, "Average weight: {:.2} kg", stats.average_kg);
    let _ = writeln!(out, "Maximum weight: {:.2} kg", stats.maximum_kg);
    let _ = writeln!(out, "Minimum weight: {:.2} kg", stats.minimum_kg);
    let _ = writeln!(out, "Total data points: {} days", stats.days);

    if let Some(latest) = &report.latest_bmi {
        let _ = writeln!(
            out,
            "Latest BMI ({}): {:.2} (Height: {:.0}cm)",
            format_date(latest.date),
            latest.bmi,
            latest.height_cm
        );
    }
    out
}
