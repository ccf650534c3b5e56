use async_trait::async_trait;
use log::{debug, warn};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::LoadError;
use crate::record::{FeedbackRecord, REQUIRED_COLUMNS};

/// Raw tabular data as returned by a source: a header row plus data rows.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SheetRows {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl SheetRows {
    pub fn new(header: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        SheetRows { header, rows }
    }

    /// Splits a grid whose first row is the header.
    pub fn from_grid(mut grid: Vec<Vec<String>>) -> Self {
        if grid.is_empty() {
            return SheetRows::default();
        }
        let header = grid.remove(0);
        SheetRows { header, rows: grid }
    }
}

/// Anything that can produce the raw feedback table.
#[async_trait]
pub trait FeedbackSource: Send + Sync {
    /// Fetches every row of the table.
    async fn fetch_rows(&self) -> Result<SheetRows, LoadError>;

    /// Short human-readable name used in log lines.
    fn describe(&self) -> String;
}

/// Fetches rows from `source` and converts them into records.
pub async fn load(source: &dyn FeedbackSource) -> Result<Vec<FeedbackRecord>, LoadError> {
    let rows = source.fetch_rows().await?;
    records_from_rows(&rows)
}

/// Convert a raw table into feedback records
///
/// Columns are located by exact header name, so their order does not matter
/// and extra columns are ignored. Rows shorter than the header are padded
/// with empty cells. Dates that do not parse as `dd.mm.yyyy` become `None`;
/// the row itself is kept.
///
/// # Arguments
/// * `table` - Header plus data rows
///
/// # Returns
/// * `Result<Vec<FeedbackRecord>, LoadError>` - The records, or
///   `LoadError::MissingColumn` naming the first absent required column
///
/// # Examples
/// ```
/// use feedback_dashboard::loader::{SheetRows, records_from_rows};
///
/// let table = SheetRows::from_grid(vec![
///     vec!["date".into(), "source".into(), "dish".into(), "comment".into()],
///     vec!["01.01.2024".into(), "R1".into(), "Soup".into(), "плохо".into()],
/// ]);
/// let records = records_from_rows(&table).unwrap();
/// assert_eq!(records.len(), 1);
/// ```
pub fn records_from_rows(table: &SheetRows) -> Result<Vec<FeedbackRecord>, LoadError> {
    let mut positions = [0usize; 4];
    for (slot, name) in positions.iter_mut().zip(REQUIRED_COLUMNS) {
        *slot = table
            .header
            .iter()
            .position(|column| column.trim() == name)
            .ok_or_else(|| LoadError::MissingColumn(name.to_string()))?;
    }
    let [date_col, source_col, dish_col, comment_col] = positions;

    let cell = |row: &[String], col: usize| -> String {
        row.get(col).cloned().unwrap_or_default()
    };

    let mut nulled_dates = 0usize;
    let records: Vec<FeedbackRecord> = table
        .rows
        .iter()
        .filter(|row| row.iter().any(|value| !value.trim().is_empty()))
        .map(|row| {
            let record = FeedbackRecord::from_cells(
                &cell(row, date_col),
                &cell(row, source_col),
                &cell(row, dish_col),
                &cell(row, comment_col),
            );
            if record.date.is_none() {
                nulled_dates += 1;
            }
            record
        })
        .collect();

    if nulled_dates > 0 {
        warn!(
            "{} of {} rows have an unparseable date and will not match date filters",
            nulled_dates,
            records.len()
        );
    }
    debug!("converted {} rows into feedback records", records.len());

    Ok(records)
}

/// Reads a CSV export of the feedback sheet
///
/// The first line must be the header. Fields may be quoted; quoted fields can
/// contain commas and newlines.
///
/// # Examples
/// ```no_run
/// use feedback_dashboard::loader::from_csv;
///
/// match from_csv("feedback.csv") {
///     Ok(table) => println!("Loaded {} rows", table.rows.len()),
///     Err(e) => eprintln!("Error loading CSV: {}", e),
/// }
/// ```
pub fn from_csv(filepath: impl AsRef<Path>) -> Result<SheetRows, LoadError> {
    let file = File::open(filepath)?;
    from_csv_reader(file)
}

/// Same as [`from_csv`] over any reader.
pub fn from_csv_reader<R: Read>(reader: R) -> Result<SheetRows, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let header = reader
        .headers()?
        .iter()
        .map(|name| name.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(SheetRows { header, rows })
}

/// A local CSV file used in place of the remote sheet.
pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CsvSource { path: path.into() }
    }
}

#[async_trait]
impl FeedbackSource for CsvSource {
    async fn fetch_rows(&self) -> Result<SheetRows, LoadError> {
        from_csv(&self.path)
    }

    fn describe(&self) -> String {
        format!("csv file {}", self.path.display())
    }
}

/// Rows held in memory. Each fetch hands out a copy.
#[derive(Clone, Debug, Default)]
pub struct StaticSource {
    table: SheetRows,
}

impl StaticSource {
    pub fn new(table: SheetRows) -> Self {
        StaticSource { table }
    }
}

#[async_trait]
impl FeedbackSource for StaticSource {
    async fn fetch_rows(&self) -> Result<SheetRows, LoadError> {
        Ok(self.table.clone())
    }

    fn describe(&self) -> String {
        format!("in-memory table ({} rows)", self.table.rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn finds_columns_by_name_and_ignores_extras() {
        let table = SheetRows::new(
            strings(&["comment", "extra", "dish", "source", "date"]),
            vec![strings(&["плохо", "x", "Soup", "R1", "01.01.2024"])],
        );
        let records = records_from_rows(&table).unwrap();
        assert_eq!(
            records,
            vec![FeedbackRecord::new(
                NaiveDate::from_ymd_opt(2024, 1, 1),
                "R1",
                "Soup",
                Some("плохо".to_string())
            )]
        );
    }

    #[test]
    fn missing_column_is_fatal() {
        let table = SheetRows::new(strings(&["date", "source", "comment"]), vec![]);
        match records_from_rows(&table) {
            Err(LoadError::MissingColumn(name)) => assert_eq!(name, "dish"),
            other => panic!("expected missing column, got {:?}", other),
        }
    }

    #[test]
    fn short_rows_are_padded_and_bad_dates_nulled() {
        let table = SheetRows::new(
            strings(&["date", "source", "dish", "comment"]),
            vec![strings(&["not a date", "R2", "Salad"])],
        );
        let records = records_from_rows(&table).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].date, None);
        assert_eq!(records[0].comment, None);
    }

    #[test]
    fn blank_rows_are_skipped() {
        let table = SheetRows::new(
            strings(&["date", "source", "dish", "comment"]),
            vec![strings(&["", "", "", ""]), strings(&["02.01.2024", "R1", "Soup", "ok"])],
        );
        assert_eq!(records_from_rows(&table).unwrap().len(), 1);
    }

    #[test]
    fn reads_quoted_csv() {
        let data = "date,source,dish,comment\n01.01.2024,R1,Soup,\"плохо, очень\"\n";
        let table = from_csv_reader(data.as_bytes()).unwrap();
        assert_eq!(table.header, strings(&["date", "source", "dish", "comment"]));
        assert_eq!(table.rows[0][3], "плохо, очень");
    }

    #[test]
    fn grid_without_rows_is_empty() {
        assert_eq!(SheetRows::from_grid(Vec::new()), SheetRows::default());
    }
}
