use crate::aggregate::DisplayRow;
use crate::error::ExportError;

/// Column headers shared by every export format.
pub const EXPORT_HEADER: [&str; 5] = ["date", "comment", "dish", "source", "negative"];

/// Convert the detail rows to CSV format
///
/// Dates are written as displayed (`dd.mm.yyyy`). Fields containing commas,
/// quotes or newlines are quoted by the writer.
///
/// # Arguments
/// * `rows` - Detail rows of the current view
///
/// # Returns
/// * `Result<String, ExportError>` - CSV content as a string or an error
///
/// # Examples
/// ```
/// use feedback_dashboard::aggregate::DisplayRow;
/// use feedback_dashboard::export::to_csv;
///
/// let rows = vec![DisplayRow {
///     date: "01.01.2024".into(),
///     comment: "плохо".into(),
///     dish: "Soup".into(),
///     source: "R1".into(),
///     negative: true,
/// }];
/// let csv = to_csv(&rows).unwrap();
/// assert!(csv.starts_with("date,comment,dish,source,negative\n"));
/// ```
pub fn to_csv(rows: &[DisplayRow]) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(EXPORT_HEADER)?;

    for row in rows {
        writer.write_record([
            row.date.as_str(),
            row.comment.as_str(),
            row.dish.as_str(),
            row.source.as_str(),
            if row.negative { "true" } else { "false" },
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Io(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Convert the detail rows to XLSX format
///
/// Produces a single worksheet with a header row followed by one row per
/// record. The negative flag is written as a boolean cell.
///
/// # Returns
/// * `Result<Vec<u8>, ExportError>` - XLSX file content as bytes or an error
#[cfg(feature = "web")]
pub fn to_xlsx(rows: &[DisplayRow]) -> Result<Vec<u8>, ExportError> {
    use rust_xlsxwriter::{Workbook, Worksheet};

    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();
    worksheet.set_name("Feedback")?;

    for (col, name) in EXPORT_HEADER.iter().enumerate() {
        worksheet.write_string(0, col as u16, *name)?;
    }

    for (index, row) in rows.iter().enumerate() {
        let r = (index + 1) as u32;
        worksheet.write_string(r, 0, row.date.as_str())?;
        worksheet.write_string(r, 1, row.comment.as_str())?;
        worksheet.write_string(r, 2, row.dish.as_str())?;
        worksheet.write_string(r, 3, row.source.as_str())?;
        worksheet.write_boolean(r, 4, row.negative)?;
    }

    workbook.push_worksheet(worksheet);
    let buffer = workbook.save_to_buffer()?;

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(comment: &str, negative: bool) -> DisplayRow {
        DisplayRow {
            date: "02.01.2024".into(),
            comment: comment.into(),
            dish: "Salad".into(),
            source: "R2".into(),
            negative,
        }
    }

    #[test]
    fn csv_quotes_special_characters() {
        let csv = to_csv(&[row("вкусно, \"очень\"", false)]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "date,comment,dish,source,negative");
        assert_eq!(lines[1], "02.01.2024,\"вкусно, \"\"очень\"\"\",Salad,R2,false");
    }

    #[test]
    fn csv_of_no_rows_is_just_the_header() {
        assert_eq!(to_csv(&[]).unwrap(), "date,comment,dish,source,negative\n");
    }

    #[cfg(feature = "web")]
    #[test]
    fn xlsx_is_a_zip_archive() {
        let bytes = to_xlsx(&[row("плохо", true)]).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }
}
