#![cfg(not(tarpaulin_include))]
use crate::table::DataTable;
use serde_json::Value;

/// Convert a data table to CSV format
///
/// The header row holds the column names. Fields containing commas, quotes
/// or newlines are quoted, with inner quotes doubled.
///
/// # Arguments
/// * `table` - Reference to the table to convert
///
/// # Returns
/// * `String` - CSV content
///
/// # Examples
/// ```
/// use salary_dashboard::downloader::to_csv;
/// use salary_dashboard::table::DataTable;
///
/// let mut table = DataTable::new(&["Department", "Average Salary"]);
/// table.push_row(vec!["Physics".into(), 98000.5.into()]);
/// assert_eq!(to_csv(&table), "Department,Average Salary\nPhysics,98000.5\n");
/// ```
pub fn to_csv(table: &DataTable) -> String {
    let mut csv_content = String::new();

    push_csv_line(&mut csv_content, table.columns.iter().map(String::as_str));
    for row in &table.rows {
        let cells: Vec<String> = row.iter().map(cell_text).collect();
        push_csv_line(&mut csv_content, cells.iter().map(String::as_str));
    }

    csv_content
}

fn push_csv_line<'a>(out: &mut String, fields: impl Iterator<Item = &'a str>) {
    for (i, field) in fields.enumerate() {
        if i > 0 {
            out.push(',');
        }
        if field.contains(',') || field.contains('"') || field.contains('\n') {
            out.push_str(&format!("\"{}\"", field.replace('"', "\"\"")));
        } else {
            out.push_str(field);
        }
    }
    out.push('\n');
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Convert a data table to XLSX format
///
/// Numbers are written as numeric cells so they stay sortable in Excel;
/// everything else is written as text.
///
/// # Arguments
/// * `table` - Reference to the table to convert
///
/// # Returns
/// * `Result<Vec<u8>>` - XLSX file content as bytes or an `Export` error
#[cfg(feature = "web")]
pub fn to_xlsx(table: &DataTable) -> crate::error::Result<Vec<u8>> {
    use crate::error::DashboardError;
    use rust_xlsxwriter::{Format, Workbook};

    let export_error = |e: rust_xlsxwriter::XlsxError| DashboardError::Export {
        details: e.to_string(),
    };

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    let header = Format::new().set_bold();

    for (c, column) in table.columns.iter().enumerate() {
        worksheet
            .write_string_with_format(0, c as u16, column, &header)
            .map_err(export_error)?;
    }

    for (r, row) in table.rows.iter().enumerate() {
        let xlsx_row = (r + 1) as u32;
        for (c, cell) in row.iter().enumerate() {
            let col = c as u16;
            match cell {
                Value::Number(n) => {
                    if let Some(number) = n.as_f64() {
                        worksheet
                            .write_number(xlsx_row, col, number)
                            .map_err(export_error)?;
                    }
                }
                Value::Null => {}
                other => {
                    worksheet
                        .write_string(xlsx_row, col, cell_text(other))
                        .map_err(export_error)?;
                }
            }
        }
    }

    workbook.save_to_buffer().map_err(export_error)
}

/// File name for an export, e.g. `average-salary-20240131-120000.csv`.
pub fn export_filename(stem: &str, extension: &str) -> String {
    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    format!("{stem}-{stamp}.{extension}")
}
