use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use tracing::{debug, info};

use crate::models::{
    DATE_FORMAT, DailySeries, LOG_HEADER, LogRecord, MEASUREMENT_SLOTS, parse_measurement,
};

/// Create the log at `path` with one empty row per day in `start..=end`.
///
/// Returns `false` without touching anything when the file already exists.
pub fn initialize_log(path: &Path, start: NaiveDate, end: NaiveDate) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    let file = File::create(path)
        .with_context(|| format!("Failed to create log file: {}", path.display()))?;
    let rows = write_empty_log(file, start, end)?;
    info!(path = %path.display(), rows, "created weight log");
    Ok(true)
}

/// Write the header and an empty row for every day in `start..=end`.
/// Returns the number of date rows written.
pub fn write_empty_log<W: Write>(writer: W, start: NaiveDate, end: NaiveDate) -> Result<usize> {
    if end < start {
        bail!("Log range ends ({end}) before it starts ({start})");
    }
    let records: Vec<LogRecord> = start
        .iter_days()
        .take_while(|d| *d <= end)
        .map(LogRecord::empty)
        .collect();
    LogTable::from_records(&records).write(writer)?;
    Ok(records.len())
}

/// A log file as it sits on disk: the header row and every field of every
/// row, including columns other than `Date` and `WeightN`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    date_col: usize,
    weight_cols: [Option<usize>; MEASUREMENT_SLOTS],
}

impl LogTable {
    /// Table under the canonical header holding `records`.
    #[must_use]
    pub fn from_records(records: &[LogRecord]) -> Self {
        let rows = records
            .iter()
            .map(|r| {
                std::iter::once(r.date.clone())
                    .chain(r.cells.iter().cloned())
                    .collect()
            })
            .collect();
        Self {
            headers: LOG_HEADER.iter().map(ToString::to_string).collect(),
            rows,
            date_col: 0,
            weight_cols: [Some(1), Some(2), Some(3), Some(4)],
        }
    }

    /// Read a log, locating `Date` and `WeightN` by exact header name.
    /// `Date` is required; a missing `WeightN` column reads as empty cells.
    pub fn read<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = rdr
            .headers()
            .context("Failed to read CSV headers")?
            .iter()
            .map(ToString::to_string)
            .collect();
        let col = |name: &str| -> Option<usize> { headers.iter().position(|h| h == name) };

        let date_col = col(LOG_HEADER[0]).context("Missing 'Date' column")?;
        let mut weight_cols = [None; MEASUREMENT_SLOTS];
        for (slot, name) in weight_cols.iter_mut().zip(&LOG_HEADER[1..]) {
            *slot = col(*name);
        }

        let mut rows = Vec::new();
        for (line_num, result) in rdr.records().enumerate() {
            let row = result.with_context(|| format!("Failed to parse CSV row {}", line_num + 2))?;
            rows.push(row.iter().map(ToString::to_string).collect());
        }

        debug!(rows = rows.len(), columns = headers.len(), "read weight log");
        Ok(Self {
            headers,
            rows,
            date_col,
            weight_cols,
        })
    }

    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The `Date` and `WeightN` view of every row, in file order.
    #[must_use]
    pub fn records(&self) -> Vec<LogRecord> {
        self.rows.iter().map(|row| self.record(row)).collect()
    }

    fn record(&self, row: &[String]) -> LogRecord {
        let mut cells: [String; MEASUREMENT_SLOTS] = Default::default();
        for (cell, idx) in cells.iter_mut().zip(&self.weight_cols) {
            field(row, *idx).clone_into(cell);
        }
        LogRecord {
            date: field(row, Some(self.date_col)).to_string(),
            cells,
        }
    }

    fn row_date(&self, row: &[String]) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(field(row, Some(self.date_col)).trim(), DATE_FORMAT).ok()
    }

    /// Store `weight_kg` in the first empty slot of `date`'s row.
    ///
    /// A row is inserted in date order when the date isn't in the file yet.
    /// A missing `WeightN` column is appended to the header when its slot is
    /// the one filled.
    pub fn record_measurement(&mut self, date: NaiveDate, weight_kg: f64) -> Result<LoggedSlot> {
        let date_str = date.format(DATE_FORMAT).to_string();

        let existing = self.rows.iter().position(|r| self.row_date(r) == Some(date));
        let (idx, new_row) = if let Some(i) = existing {
            (i, false)
        } else {
            let at = self
                .rows
                .iter()
                .position(|r| self.row_date(r).is_some_and(|d| d > date))
                .unwrap_or(self.rows.len());
            let mut row = vec![String::new(); self.headers.len()];
            row[self.date_col].clone_from(&date_str);
            self.rows.insert(at, row);
            (at, true)
        };

        let Some(slot) = self
            .record(&self.rows[idx])
            .cells
            .iter()
            .position(|c| c.trim().is_empty())
        else {
            bail!("All {MEASUREMENT_SLOTS} measurements for {date_str} are already filled");
        };

        let col = self.weight_column(slot);
        let row = &mut self.rows[idx];
        if row.len() <= col {
            row.resize(col + 1, String::new());
        }
        row[col] = weight_kg.to_string();

        Ok(LoggedSlot {
            slot: slot + 1,
            new_row,
        })
    }

    fn weight_column(&mut self, slot: usize) -> usize {
        if let Some(col) = self.weight_cols[slot] {
            return col;
        }
        self.headers.push(LOG_HEADER[slot + 1].to_string());
        let col = self.headers.len() - 1;
        self.weight_cols[slot] = Some(col);
        col
    }

    /// Write the header and rows back out unchanged apart from edits.
    pub fn write<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(writer);
        wtr.write_record(&self.headers)
            .context("Failed to write CSV header")?;
        for (line_num, row) in self.rows.iter().enumerate() {
            wtr.write_record(row)
                .with_context(|| format!("Failed to write CSV row {}", line_num + 2))?;
        }
        wtr.flush().context("Failed to flush CSV writer")?;
        Ok(())
    }
}

fn field(row: &[String], idx: Option<usize>) -> &str {
    idx.and_then(|i| row.get(i)).map_or("", String::as_str)
}

/// Read every row of a log, keeping cells as raw text.
pub fn read_records<R: Read>(reader: R) -> Result<Vec<LogRecord>> {
    Ok(LogTable::read(reader)?.records())
}

/// Parse a log into its daily average series.
///
/// Rows without a single valid measurement are skipped. A row that has
/// measurements but no parseable date is an error.
pub fn parse_log<R: Read>(reader: R) -> Result<DailySeries> {
    let records = read_records(reader)?;
    let mut series = DailySeries::default();

    for (line_num, record) in records.iter().enumerate() {
        for cell in record.cells.iter().filter(|c| !c.trim().is_empty()) {
            if parse_measurement(cell).is_none() {
                debug!(date = %record.date, cell = %cell, "skipping non-numeric measurement");
            }
        }
        let Some(avg) = record.average() else {
            continue;
        };
        let Some(date) = record.parsed_date() else {
            bail!(
                "Invalid date '{}' on row {}. Expected {}",
                record.date,
                line_num + 2,
                DATE_FORMAT
            );
        };
        series.push(date, avg);
    }

    debug!(days = series.len(), "built daily series");
    Ok(series)
}

pub fn read_log(path: &Path) -> Result<DailySeries> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))?;
    parse_log(file)
}

/// Where a measurement landed after [`log_measurement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoggedSlot {
    /// 1-based `WeightN` column.
    pub slot: usize,
    /// Whether a new row had to be inserted for the date.
    pub new_row: bool,
}


/// Add a measurement to the log file at `path`.
///
/// The updated log is written next to the original and renamed over it, so
/// a failed write leaves the old file in place.
pub fn log_measurement(path: &Path, date: NaiveDate, weight_kg: f64) -> Result<LoggedSlot> {
    if !weight_kg.is_finite() || weight_kg <= 0.0 {
        bail!("Weight must be greater than 0");
    }
    let file = File::open(path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))?;
    let mut table = LogTable::read(file)?;

    let logged = table.record_measurement(date, weight_kg)?;
    replace_log(path, &table)?;
    debug!(%date, slot = logged.slot, new_row = logged.new_row, "logged measurement");
    Ok(logged)
}

fn replace_log(path: &Path, table: &LogTable) -> Result<()> {
    let temp_path = path.with_extension("csv.tmp");
    let file = File::create(&temp_path)
        .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;
    table.write(&file)?;
    file.sync_all()
        .with_context(|| format!("Failed to sync temp file: {}", temp_path.display()))?;
    fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to replace log file: {}", path.display()))?;
    Ok(())
}
