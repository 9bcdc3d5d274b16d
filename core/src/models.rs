use chrono::NaiveDate;
use serde::{Serialize, Serializer};

/// Date format used in the log file, e.g. `2025.07.01`.
pub const DATE_FORMAT: &str = "%Y.%m.%d";

/// Number of measurement columns per day.
pub const MEASUREMENT_SLOTS: usize = 4;

/// Header row written to and expected from the log file.
pub const LOG_HEADER: [&str; 1 + MEASUREMENT_SLOTS] =
    ["Date", "Weight1", "Weight2", "Weight3", "Weight4"];

/// One raw row of the log file. Cells are kept as written so a rewrite
/// doesn't reformat the user's input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub date: String,
    pub cells: [String; MEASUREMENT_SLOTS],
}

impl LogRecord {
    #[must_use]
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date: date.format(DATE_FORMAT).to_string(),
            cells: Default::default(),
        }
    }

    /// Every cell that parses as a finite number, in column order.
    #[must_use]
    pub fn measurements(&self) -> Vec<f64> {
        self.cells.iter().filter_map(|c| parse_measurement(c)).collect()
    }

    /// Mean of the valid measurements, or `None` when the row has none.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn average(&self) -> Option<f64> {
        let values = self.measurements();
        if values.is_empty() {
            return None;
        }
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }

    #[must_use]
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.date.trim(), DATE_FORMAT).ok()
    }
}

/// Best-effort numeric parse of a measurement cell. Blank, non-numeric and
/// non-finite content yields `None`.
#[must_use]
pub fn parse_measurement(cell: &str) -> Option<f64> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyWeight {
    #[serde(serialize_with = "serialize_log_date")]
    pub date: NaiveDate,
    pub weight_kg: f64,
}

/// Daily average weights in file order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DailySeries {
    points: Vec<DailyWeight>,
}

impl DailySeries {
    #[must_use]
    pub fn new(points: Vec<DailyWeight>) -> Self {
        Self { points }
    }

    pub fn push(&mut self, date: NaiveDate, weight_kg: f64) {
        self.points.push(DailyWeight { date, weight_kg });
    }

    #[must_use]
    pub fn points(&self) -> &[DailyWeight] {
        &self.points
    }

    #[must_use]
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    #[must_use]
    pub fn weights(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.weight_kg).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[must_use]
    pub fn last(&self) -> Option<&DailyWeight> {
        self.points.last()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Statistics {
    pub average_kg: f64,
    pub maximum_kg: f64,
    pub minimum_kg: f64,
    pub days: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatestBmi {
    #[serde(serialize_with = "serialize_log_date")]
    pub date: NaiveDate,
    pub weight_kg: f64,
    pub bmi: f64,
    pub height_cm: f64,
}

/// Day-over-day change, dated by the later of the two days.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyChange {
    #[serde(serialize_with = "serialize_log_date")]
    pub date: NaiveDate,
    pub change_kg: f64,
}

/// Everything the analysis run reports.
#[derive(Debug, Clone, Serialize)]
pub struct WeightReport {
    pub statistics: Statistics,
    pub latest_bmi: Option<LatestBmi>,
    pub daily: DailySeries,
    pub changes: Vec<DailyChange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smoothed: Option<Vec<f64>>,
}

fn serialize_log_date<S: Serializer>(date: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(&date.format(DATE_FORMAT))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(cells: [&str; MEASUREMENT_SLOTS]) -> LogRecord {
        LogRecord {
            date: "2025.07.01".to_string(),
            cells: cells.map(str::to_string),
        }
    }

    #[test]
    fn test_average_skips_blank_cells() {
        let r = record(["70", "", "71", ""]);
        assert!((r.average().unwrap() - 70.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_average_ignores_non_numeric() {
        let r = record(["70", "heavy", " 72 ", "n/a"]);
        assert_eq!(r.measurements(), vec![70.0, 72.0]);
        assert!((r.average().unwrap() - 71.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_average_none_when_no_values() {
        assert!(record(["", "", "", ""]).average().is_none());
        assert!(record(["abc", " ", "-", "?"]).average().is_none());
    }

    #[test]
    fn test_parse_measurement_rejects_non_finite() {
        assert!(parse_measurement("nan").is_none());
        assert!(parse_measurement("inf").is_none());
        assert_eq!(parse_measurement("7e1"), Some(70.0));
    }

    #[test]
    fn test_empty_record_formats_date() {
        let r = LogRecord::empty(NaiveDate::from_ymd_opt(2025, 7, 1).unwrap());
        assert_eq!(r.date, "2025.07.01");
        assert!(r.cells.iter().all(String::is_empty));
        assert_eq!(r.parsed_date(), NaiveDate::from_ymd_opt(2025, 7, 1));
    }

    #[test]
    fn test_daily_weight_serializes_log_date() {
        let p = DailyWeight {
            date: NaiveDate::from_ymd_opt(2025, 7, 2).unwrap(),
            weight_kg: 70.5,
        };
        let json = serde_json::to_value(p).unwrap();
        assert_eq!(json["date"], "2025.07.02");
        assert_eq!(json["weight_kg"], 70.5);
    }
}
