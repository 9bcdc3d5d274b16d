use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::PathBuf;

pub const DATA_FILE_NAME: &str = "weight_data.csv";
pub const PLOT_FILE_NAME: &str = "weight_analysis.png";
pub const HEIGHT_CM: f64 = 175.0;

pub struct Config {
    pub data_path: PathBuf,
    pub plot_path: PathBuf,
    pub height_cm: f64,
    pub log_start: NaiveDate,
    pub log_end: NaiveDate,
}

impl Config {
    /// Resolve the fixed file names against the current directory.
    pub fn load() -> Result<Self> {
        let cwd = std::env::current_dir().context("Could not determine current directory")?;
        Self::in_dir(cwd)
    }

    pub fn in_dir(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        let log_start = NaiveDate::from_ymd_opt(2025, 7, 1).context("Invalid log start date")?;
        let log_end = NaiveDate::from_ymd_opt(2026, 12, 31).context("Invalid log end date")?;

        Ok(Config {
            data_path: dir.join(DATA_FILE_NAME),
            plot_path: dir.join(PLOT_FILE_NAME),
            height_cm: HEIGHT_CM,
            log_start,
            log_end,
        })
    }

    /// File name as shown to the user in console messages.
    pub fn data_file_label(&self) -> String {
        self.data_path
            .file_name()
            .map_or_else(|| DATA_FILE_NAME.to_string(), |n| n.to_string_lossy().into_owned())
    }

    pub fn plot_file_label(&self) -> String {
        self.plot_path
            .file_name()
            .map_or_else(|| PLOT_FILE_NAME.to_string(), |n| n.to_string_lossy().into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_dir_paths() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = Config::in_dir(tmp.path()).unwrap();
        assert_eq!(config.data_path, tmp.path().join("weight_data.csv"));
        assert_eq!(config.plot_path, tmp.path().join("weight_analysis.png"));
        assert_eq!(config.data_file_label(), "weight_data.csv");
        assert_eq!(config.plot_file_label(), "weight_analysis.png");
    }

    #[test]
    fn test_defaults() {
        let config = Config::in_dir("/tmp").unwrap();
        assert!((config.height_cm - 175.0).abs() < f64::EPSILON);
        assert_eq!(config.log_start, NaiveDate::from_ymd_opt(2025, 7, 1).unwrap());
        assert_eq!(config.log_end, NaiveDate::from_ymd_opt(2026, 12, 31).unwrap());
    }
}
