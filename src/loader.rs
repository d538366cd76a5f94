#![cfg(not(tarpaulin_include))]
use crate::error::{DashboardError, Result};
use crate::record::SalaryRecord;
use crate::store::MemoryStore;
use log::{info, warn};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Header names accepted for each record field, lower-cased.
const NAME_HEADERS: &[&str] = &["employee_name", "full_name", "name"];
const TITLE_HEADERS: &[&str] = &["job_title", "title"];
const DEPARTMENT_HEADERS: &[&str] = &["department_description", "department"];
const YEAR_HEADERS: &[&str] = &["calendar_year", "year"];
const SALARY_HEADERS: &[&str] = &["salary"];

/// Load salary records from a CSV export of the salary table
///
/// The first line must be a header naming the columns; their order does not
/// matter. Salaries may carry a currency sign and thousands separators.
/// Rows that cannot be parsed are skipped with a warning.
///
/// # Arguments
/// * `filepath` - Path to the CSV file to load
///
/// # Returns
/// * `Result<MemoryStore>` - A store over the loaded records
///
/// # Examples
/// ```no_run
/// use salary_dashboard::loader::from_csv;
///
/// match from_csv("salaries.csv") {
///     Ok(store) => println!("Loaded {} records", store.records().len()),
///     Err(e) => eprintln!("Error loading CSV: {}", e),
/// }
/// ```
pub fn from_csv(filepath: impl AsRef<Path>) -> Result<MemoryStore> {
    let path = filepath.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let records = read_records(reader)?;
    info!("Loaded {} salary records from {}", records.len(), path.display());
    Ok(MemoryStore::new(records))
}

/// Parse salary records from any CSV reader.
pub fn read_records<R: BufRead>(reader: R) -> Result<Vec<SalaryRecord>> {
    let mut lines = reader.lines();
    let header = match lines.next() {
        Some(line) => line?,
        None => return Err(DashboardError::invalid("CSV file is empty")),
    };
    let columns = ColumnMap::from_header(&parse_csv_row(&header))?;

    let mut records = Vec::new();
    for (index, line) in lines.enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let fields = parse_csv_row(&line);
        match columns.record(&fields) {
            Some(record) => records.push(record),
            // +2: one for the header, one for 1-based line numbers
            None => warn!("Skipping malformed CSV line {}", index + 2),
        }
    }
    Ok(records)
}

struct ColumnMap {
    name: usize,
    title: usize,
    department: usize,
    year: usize,
    salary: usize,
}

impl ColumnMap {
    fn from_header(header: &[String]) -> Result<Self> {
        let find = |accepted: &[&str]| {
            header
                .iter()
                .position(|h| accepted.contains(&h.trim().to_lowercase().as_str()))
                .ok_or_else(|| {
                    DashboardError::invalid(format!("CSV header is missing column {}", accepted[0]))
                })
        };

        Ok(ColumnMap {
            name: find(NAME_HEADERS)?,
            title: find(TITLE_HEADERS)?,
            department: find(DEPARTMENT_HEADERS)?,
            year: find(YEAR_HEADERS)?,
            salary: find(SALARY_HEADERS)?,
        })
    }

    fn record(&self, fields: &[String]) -> Option<SalaryRecord> {
        let field = |i: usize| fields.get(i).map(|f| f.trim());

        Some(SalaryRecord {
            employee_name: field(self.name)?.to_string(),
            job_title: field(self.title)?.to_string(),
            department: field(self.department)?.to_string(),
            calendar_year: field(self.year)?.parse().ok()?,
            salary: parse_amount(field(self.salary)?)?,
        })
    }
}

// "$1,234.50" -> 1234.5
fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| !matches!(c, '$' | ',')).collect();
    cleaned.trim().parse().ok()
}

// Parse a CSV row into a vector of strings
fn parse_csv_row(line: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current_field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                if in_quotes && chars.peek() == Some(&'"') {
                    // Escaped quote inside a quoted field
                    current_field.push('"');
                    chars.next();
                } else {
                    in_quotes = !in_quotes;
                }
            }
            ',' if !in_quotes => {
                result.push(std::mem::take(&mut current_field));
            }
            _ => current_field.push(c),
        }
    }

    result.push(current_field);
    result
}
