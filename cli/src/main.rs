mod chart;
mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::{io, process};
use tracing_subscriber::EnvFilter;

use crate::commands::{cmd_analyze, cmd_daily, cmd_init, cmd_log};
use crate::config::Config;

#[derive(Parser)]
#[command(
    name = "weighlog",
    version,
    about = "A daily body weight log with statistics and charts",
    long_about = "Keeps up to four weight measurements per day in weight_data.csv, \
                  prints summary statistics and BMI, and plots the raw, smoothed \
                  and day-to-day change series to weight_analysis.png.\n\n\
                  Running without a subcommand is the same as `weighlog analyze`."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print statistics and render charts (creates the log on first run)
    Analyze {
        /// Output the report as JSON
        #[arg(long)]
        json: bool,
        /// Open the chart in the system image viewer afterwards
        #[arg(long)]
        show: bool,
    },
    /// Create the log file with one empty row per day
    Init {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the daily average weights and day-to-day changes
    Daily {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Record a measurement in the next free slot for a day
    Log {
        /// Weight in kg
        value: f64,
        /// Date (YYYY.MM.DD, YYYY-MM-DD, today or yesterday; default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;

    match cli.command.unwrap_or(Commands::Analyze {
        json: false,
        show: false,
    }) {
        Commands::Analyze { json, show } => cmd_analyze(&config, json, show),
        Commands::Init { json } => cmd_init(&config, json),
        Commands::Daily { json } => cmd_daily(&config, json),
        Commands::Log { value, date, json } => cmd_log(&config, value, date.as_deref(), json),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand_parses() {
        let cli = Cli::try_parse_from(["weighlog"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_log_args() {
        let cli = Cli::try_parse_from(["weighlog", "log", "70.4", "--date", "2025.07.01"]).unwrap();
        match cli.command {
            Some(Commands::Log { value, date, json }) => {
                assert!((value - 70.4).abs() < f64::EPSILON);
                assert_eq!(date.as_deref(), Some("2025.07.01"));
                assert!(!json);
            }
            _ => panic!("expected log command"),
        }
    }

    #[test]
    fn test_analyze_flags() {
        let cli = Cli::try_parse_from(["weighlog", "analyze", "--json", "--show"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Analyze {
                json: true,
                show: true
            })
        ));
    }
}
