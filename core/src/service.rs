use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;

use crate::analysis;
use crate::log_file::{self, LoggedSlot};
use crate::models::{DailySeries, LogRecord, WeightReport};

/// Access to one weight log file.
///
/// Every call opens the file, does its work and closes it again; nothing is
/// cached between calls.
pub struct WeightLogService {
    path: PathBuf,
}

impl WeightLogService {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    // --- File lifecycle ---

    /// Create the log for `start..=end` unless it already exists.
    pub fn initialize(&self, start: NaiveDate, end: NaiveDate) -> Result<bool> {
        log_file::initialize_log(&self.path, start, end)
    }

    pub fn records(&self) -> Result<Vec<LogRecord>> {
        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open log file: {}", self.path.display()))?;
        log_file::read_records(file)
    }

    // --- Analysis ---

    pub fn daily_series(&self) -> Result<DailySeries> {
        log_file::read_log(&self.path)
    }

    /// Report for the whole log, `None` when it holds no measurements.
    pub fn report(&self, height_cm: f64) -> Result<Option<WeightReport>> {
        let series = self.daily_series()?;
        Ok(analysis::build_report(&series, height_cm))
    }

    // --- Measurements ---

    pub fn log_measurement(&self, date: NaiveDate, weight_kg: f64) -> Result<LoggedSlot> {
        log_file::log_measurement(&self.path, date, weight_kg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_initialize_then_report_empty() {
        let tmp = tempfile::TempDir::new().unwrap();
        let svc = WeightLogService::new(tmp.path().join("weight_data.csv"));
        assert!(!svc.exists());

        assert!(svc.initialize(ymd(2025, 7, 1), ymd(2025, 7, 31)).unwrap());
        assert!(svc.exists());
        assert_eq!(svc.records().unwrap().len(), 31);
        assert!(svc.report(175.0).unwrap().is_none());
    }

    #[test]
    fn test_log_then_report() {
        let tmp = tempfile::TempDir::new().unwrap();
        let svc = WeightLogService::new(tmp.path().join("weight_data.csv"));
        svc.initialize(ymd(2025, 7, 1), ymd(2025, 7, 31)).unwrap();

        for (day, w) in [(1, 70.0), (2, 71.0), (3, 69.0)] {
            svc.log_measurement(ymd(2025, 7, day), w).unwrap();
        }

        let report = svc.report(175.0).unwrap().unwrap();
        assert_eq!(report.statistics.days, 3);
        assert!((report.statistics.average_kg - 70.0).abs() < 1e-9);
        assert_eq!(report.changes.len(), 2);
        let latest = report.latest_bmi.unwrap();
        assert_eq!(latest.date, ymd(2025, 7, 3));
    }

    #[test]
    fn test_missing_file_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let svc = WeightLogService::new(tmp.path().join("nope.csv"));
        let err = svc.daily_series().unwrap_err();
        assert!(format!("{err:#}").contains("nope.csv"));
    }
}
