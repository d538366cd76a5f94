use serde::{Deserialize, Serialize};

/// Rows shown per page when the caller does not pick a size.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// The tabular view that accompanies every chart.
///
/// Cells are kept as JSON values so numbers stay numbers in the browser and
/// in the XLSX export.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DataTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl DataTable {
    pub fn new(columns: &[&str]) -> Self {
        DataTable {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<serde_json::Value>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Slice out one page. `page` is 1-based and clamped into range, so an
    /// empty table still has a single (empty) page.
    pub fn page(&self, page: usize, page_size: usize) -> TablePage {
        let page_size = page_size.max(1);
        let total_rows = self.rows.len();
        let total_pages = total_rows.div_ceil(page_size).max(1);
        let page = page.clamp(1, total_pages);

        let start = (page - 1) * page_size;
        let end = (start + page_size).min(total_rows);

        TablePage {
            columns: self.columns.clone(),
            rows: self.rows[start..end].to_vec(),
            page,
            page_size,
            total_rows,
            total_pages,
        }
    }
}

/// One page of a [`DataTable`], as sent to the browser.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TablePage {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
    pub page: usize,
    pub page_size: usize,
    pub total_rows: usize,
    pub total_pages: usize,
}
