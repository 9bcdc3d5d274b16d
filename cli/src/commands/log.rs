use anyhow::Result;

use weighlog_core::service::WeightLogService;

use crate::config::Config;

use super::helpers::{format_date, parse_date, parse_weight};

pub(crate) fn cmd_log(config: &Config, value: f64, date: Option<&str>, json: bool) -> Result<()> {
    let weight_kg = parse_weight(value)?;
    let date = parse_date(date)?;

    let svc = WeightLogService::new(&config.data_path);
    if svc.initialize(config.log_start, config.log_end)? {
        eprintln!("CSV file created: {}", config.data_file_label());
    }

    let logged = svc.log_measurement(date, weight_kg)?;
    let date_str = format_date(date);

    if json {
        println!(
            "{}",
            serde_json::json!({
                "date": date_str,
                "weight_kg": weight_kg,
                "slot": logged.slot,
                "new_row": logged.new_row,
            })
        );
    } else {
        println!("Logged {weight_kg:.1} kg for {date_str} (Weight{})", logged.slot);
        if logged.new_row {
            println!("  Added a new row for {date_str}");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_creates_file_and_fills_slots() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = Config::in_dir(tmp.path()).unwrap();

        cmd_log(&config, 70.0, Some("2025.07.01"), false).unwrap();
        cmd_log(&config, 71.0, Some("2025-07-01"), true).unwrap();

        let series = WeightLogService::new(&config.data_path)
            .daily_series()
            .unwrap();
        assert_eq!(series.len(), 1);
        assert!((series.weights()[0] - 70.5).abs() < 1e-9);
    }

    #[test]
    fn test_log_rejects_fifth_value() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = Config::in_dir(tmp.path()).unwrap();

        for w in [70.0, 70.2, 70.4, 70.6] {
            cmd_log(&config, w, Some("2025.07.01"), false).unwrap();
        }
        let err = cmd_log(&config, 70.8, Some("2025.07.01"), false).unwrap_err();
        assert!(err.to_string().contains("already filled"));
    }

    #[test]
    fn test_log_rejects_bad_input() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = Config::in_dir(tmp.path()).unwrap();
        assert!(cmd_log(&config, 0.0, None, false).is_err());
        assert!(cmd_log(&config, 70.0, Some("someday"), false).is_err());
        assert!(!config.data_path.exists());
    }
}
