//! One dashboard interaction: fetch rows for the selected analysis, post-process
//! them and describe the chart and table to show.

use crate::bucket::{MissingCells, Reducer, bucket_ranked, median, quantile_sorted, ranked_growth};
use crate::error::{DashboardError, Result};
use crate::record::{CategoryAggregate, SalaryRecord, pivot_yearly};
use crate::store::SalaryStore;
use crate::table::DataTable;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;

pub const DEFAULT_TOP_N: usize = 5;

const RECORD_COLUMNS: [&str; 5] = ["Employee", "Job Title", "Department", "Year", "Salary"];

/// The analyses offered in the dashboard's selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnalysisKind {
    #[serde(rename = "average-salary")]
    AverageSalary,
    #[serde(rename = "median-salary")]
    MedianSalary,
    #[serde(rename = "distribution")]
    Distribution,
    #[serde(rename = "department-growth-over-time")]
    DepartmentGrowth,
    #[serde(rename = "top-n-growth-over-time")]
    TopNGrowth,
    #[serde(rename = "highest-individual-salaries")]
    HighestSalaries,
}

impl AnalysisKind {
    pub const ALL: [AnalysisKind; 6] = [
        AnalysisKind::AverageSalary,
        AnalysisKind::MedianSalary,
        AnalysisKind::Distribution,
        AnalysisKind::DepartmentGrowth,
        AnalysisKind::TopNGrowth,
        AnalysisKind::HighestSalaries,
    ];

    /// Value used in query strings and the selector.
    pub fn slug(self) -> &'static str {
        match self {
            AnalysisKind::AverageSalary => "average-salary",
            AnalysisKind::MedianSalary => "median-salary",
            AnalysisKind::Distribution => "distribution",
            AnalysisKind::DepartmentGrowth => "department-growth-over-time",
            AnalysisKind::TopNGrowth => "top-n-growth-over-time",
            AnalysisKind::HighestSalaries => "highest-individual-salaries",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AnalysisKind::AverageSalary => "Average Salary by Department",
            AnalysisKind::MedianSalary => "Median Salary by Department",
            AnalysisKind::Distribution => "Salary Distribution",
            AnalysisKind::DepartmentGrowth => "Department Salary Over Time",
            AnalysisKind::TopNGrowth => "Top N Departments by Salary Growth",
            AnalysisKind::HighestSalaries => "Highest Individual Salaries",
        }
    }
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}

fn default_page() -> usize {
    1
}

/// The dashboard inputs, as sent by the browser on every change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub kind: AnalysisKind,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default = "default_page")]
    pub page: usize,
}

impl AnalysisRequest {
    pub fn new(kind: AnalysisKind) -> Self {
        AnalysisRequest {
            kind,
            year: None,
            department: None,
            top_n: DEFAULT_TOP_N,
            page: 1,
        }
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    /// Reject inputs the UI should never send: a top N below 1, a missing
    /// year for the distribution, a missing department for its growth line.
    pub fn validate(&self) -> Result<()> {
        if self.top_n < 1 {
            return Err(DashboardError::invalid("top N must be at least 1"));
        }
        if self.kind == AnalysisKind::Distribution && self.year.is_none() {
            return Err(DashboardError::invalid("a calendar year is required"));
        }
        if self.kind == AnalysisKind::DepartmentGrowth
            && self.department.as_deref().is_none_or(|d| d.trim().is_empty())
        {
            return Err(DashboardError::invalid("a department is required"));
        }
        Ok(())
    }

    fn year_label(&self) -> String {
        match self.year {
            Some(year) => year.to_string(),
            None => "All Years".to_string(),
        }
    }
}

/// Summary of one box in a box plot.
///
/// Whiskers reach the most extreme values within 1.5 IQR of the box;
/// anything beyond is listed in `outliers`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoxStats {
    pub label: String,
    pub count: usize,
    pub lower_whisker: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

impl BoxStats {
    pub fn from_values(label: impl Into<String>, values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let q1 = quantile_sorted(&sorted, 0.25);
        let median = quantile_sorted(&sorted, 0.5);
        let q3 = quantile_sorted(&sorted, 0.75);
        let fence = 1.5 * (q3 - q1);
        let (low_fence, high_fence) = (q1 - fence, q3 + fence);

        let inside = sorted.iter().filter(|v| **v >= low_fence && **v <= high_fence);
        let lower_whisker = inside.clone().next().copied().unwrap_or(q1);
        let upper_whisker = inside.last().copied().unwrap_or(q3);
        let outliers = sorted
            .iter()
            .copied()
            .filter(|v| *v < low_fence || *v > high_fence)
            .collect();

        Some(BoxStats {
            label: label.into(),
            count: sorted.len(),
            lower_whisker,
            q1,
            median,
            q3,
            upper_whisker,
            outliers,
        })
    }
}

/// A named line of (year, value) points.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineSeries {
    pub name: String,
    pub points: Vec<(i32, f64)>,
}

/// Data behind a chart, independent of how it is drawn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChartData {
    /// Horizontal bars, first entry on top.
    Bar {
        labels: Vec<String>,
        values: Vec<f64>,
    },
    Box {
        groups: Vec<BoxStats>,
    },
    Line {
        series: Vec<LineSeries>,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub data: ChartData,
}

/// Everything one interaction produces.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub kind: AnalysisKind,
    pub chart: ChartSpec,
    pub table: DataTable,
}

/// Run the analysis selected in `request` against `store`.
///
/// # Errors
/// * `InvalidArgument` for inputs rejected by [`AnalysisRequest::validate`]
/// * `QueryFailure` when the store cannot answer
pub async fn run_analysis(store: &dyn SalaryStore, request: &AnalysisRequest) -> Result<Analysis> {
    request.validate()?;
    debug!("Running {:?}", request);

    match request.kind {
        AnalysisKind::AverageSalary => {
            let aggregates = store.department_means(request.year).await?;
            bucketed(request, &aggregates, Reducer::Mean)
        }
        AnalysisKind::MedianSalary => {
            let aggregates = store.department_medians(request.year).await?;
            bucketed(request, &aggregates, Reducer::Median)
        }
        AnalysisKind::Distribution => distribution(store, request).await,
        AnalysisKind::DepartmentGrowth => department_growth(store, request).await,
        AnalysisKind::TopNGrowth => top_n_growth(store, request).await,
        AnalysisKind::HighestSalaries => highest_salaries(store, request).await,
    }
}

fn bucketed(
    request: &AnalysisRequest,
    aggregates: &[CategoryAggregate],
    reducer: Reducer,
) -> Result<Analysis> {
    let rows = bucket_ranked(aggregates, request.top_n, reducer)?;
    let value_label = format!("{} Salary", reducer.label());

    let mut table = DataTable::new(&["Department", value_label.as_str()]);
    for row in &rows {
        table.push_row(vec![json!(row.category_name), json!(row.value)]);
    }

    Ok(Analysis {
        kind: request.kind,
        chart: ChartSpec {
            title: format!(
                "{} Salary by Department for {} (Top {} + Other)",
                reducer.label(),
                request.year_label(),
                request.top_n
            ),
            x_label: format!("{value_label} ($)"),
            y_label: "Department".to_string(),
            data: ChartData::Bar {
                labels: rows.iter().map(|r| r.category_name.clone()).collect(),
                values: rows.iter().map(|r| r.value).collect(),
            },
        },
        table,
    })
}

async fn distribution(store: &dyn SalaryStore, request: &AnalysisRequest) -> Result<Analysis> {
    let year = request
        .year
        .ok_or_else(|| DashboardError::invalid("a calendar year is required"))?;
    let records = store.records_for_year(year).await?;

    let mut by_department: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for record in &records {
        by_department
            .entry(record.department.as_str())
            .or_default()
            .push(record.salary);
    }

    // Departments ranked by median salary; only the top N get a box.
    let mut ranked: Vec<CategoryAggregate> = by_department
        .iter()
        .map(|(department, salaries)| CategoryAggregate::new(*department, median(salaries)))
        .collect();
    ranked.sort_by(|a, b| b.value.total_cmp(&a.value));
    ranked.truncate(request.top_n);

    let groups: Vec<BoxStats> = ranked
        .iter()
        .filter_map(|aggregate| {
            let salaries = by_department.get(aggregate.category_name.as_str())?;
            BoxStats::from_values(aggregate.category_name.as_str(), salaries)
        })
        .collect();

    let shown: Vec<&SalaryRecord> = records
        .iter()
        .filter(|r| ranked.iter().any(|a| a.category_name == r.department))
        .collect();

    Ok(Analysis {
        kind: request.kind,
        chart: ChartSpec {
            title: format!(
                "Salary Distribution for {year} (Top {} Departments by Median)",
                request.top_n
            ),
            x_label: "Department".to_string(),
            y_label: "Salary ($)".to_string(),
            data: ChartData::Box { groups },
        },
        table: record_table(shown),
    })
}

async fn department_growth(store: &dyn SalaryStore, request: &AnalysisRequest) -> Result<Analysis> {
    let department = request
        .department
        .as_deref()
        .map(str::trim)
        .ok_or_else(|| DashboardError::invalid("a department is required"))?;

    let yearly = store.department_year_means().await?;
    let points: Vec<(i32, f64)> = yearly
        .iter()
        .filter(|row| row.category_name == department)
        .map(|row| (row.calendar_year, row.value))
        .collect();
    let records = store.records_for_department(department).await?;

    Ok(Analysis {
        kind: request.kind,
        chart: ChartSpec {
            title: format!("Average Salary Over Time: {department}"),
            x_label: "Calendar Year".to_string(),
            y_label: "Average Salary ($)".to_string(),
            data: ChartData::Line {
                series: vec![LineSeries {
                    name: department.to_string(),
                    points,
                }],
            },
        },
        table: record_table(records.iter()),
    })
}

async fn top_n_growth(store: &dyn SalaryStore, request: &AnalysisRequest) -> Result<Analysis> {
    let yearly = store.department_year_means().await?;
    let matrix = pivot_yearly(&yearly);

    let mut rates = ranked_growth(&matrix, MissingCells::ZeroFill);
    rates.truncate(request.top_n);

    let series = rates
        .iter()
        .map(|rate| LineSeries {
            name: rate.category_name.clone(),
            points: matrix
                .iter()
                .filter_map(|(year, row)| row.get(&rate.category_name).map(|v| (*year, *v)))
                .collect(),
        })
        .collect();

    let mut table = DataTable::new(&["Department", "Mean Annual Growth"]);
    for rate in &rates {
        table.push_row(vec![json!(rate.category_name), json!(rate.mean_change)]);
    }

    Ok(Analysis {
        kind: request.kind,
        chart: ChartSpec {
            title: format!(
                "Top {} Departments by Average Salary Growth",
                request.top_n
            ),
            x_label: "Calendar Year".to_string(),
            y_label: "Average Salary ($)".to_string(),
            data: ChartData::Line { series },
        },
        table,
    })
}

async fn highest_salaries(store: &dyn SalaryStore, request: &AnalysisRequest) -> Result<Analysis> {
    let records = store.top_earners(request.top_n, request.year).await?;

    Ok(Analysis {
        kind: request.kind,
        chart: ChartSpec {
            title: format!(
                "Top {} Individual Salaries for {}",
                request.top_n,
                request.year_label()
            ),
            x_label: "Salary ($)".to_string(),
            y_label: "Employee".to_string(),
            data: ChartData::Bar {
                labels: records.iter().map(|r| r.employee_name.clone()).collect(),
                values: records.iter().map(|r| r.salary).collect(),
            },
        },
        table: record_table(records.iter()),
    })
}

fn record_table<'a>(records: impl IntoIterator<Item = &'a SalaryRecord>) -> DataTable {
    let mut table = DataTable::new(&RECORD_COLUMNS);
    for record in records {
        table.push_row(vec![
            json!(record.employee_name),
            json!(record.job_title),
            json!(record.department),
            json!(record.calendar_year),
            json!(record.salary),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_kind_slugs_round_trip_through_serde() {
        for kind in AnalysisKind::ALL {
            let encoded = serde_json::to_string(&kind).unwrap();
            assert_eq!(encoded, format!("\"{}\"", kind.slug()));
        }
    }

    #[test]
    fn test_request_defaults() {
        let request: AnalysisRequest =
            serde_json::from_str(r#"{"kind":"average-salary"}"#).unwrap();
        assert_eq!(request.top_n, DEFAULT_TOP_N);
        assert_eq!(request.page, 1);
        assert_eq!(request.year, None);
    }

    #[test]
    fn test_validation() {
        assert!(
            AnalysisRequest::new(AnalysisKind::AverageSalary)
                .with_top_n(0)
                .validate()
                .is_err()
        );
        assert!(
            AnalysisRequest::new(AnalysisKind::Distribution)
                .validate()
                .is_err()
        );
        assert!(
            AnalysisRequest::new(AnalysisKind::DepartmentGrowth)
                .with_department("  ")
                .validate()
                .is_err()
        );
        assert!(
            AnalysisRequest::new(AnalysisKind::TopNGrowth)
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn test_box_stats() {
        let stats = BoxStats::from_values("Physics", &[1.0, 2.0, 3.0, 4.0, 5.0, 100.0]).unwrap();
        assert_eq!(stats.count, 6);
        assert_eq!(stats.q1, 2.25);
        assert_eq!(stats.median, 3.5);
        assert_eq!(stats.q3, 4.75);
        assert_eq!(stats.lower_whisker, 1.0);
        assert_eq!(stats.upper_whisker, 5.0);
        assert_eq!(stats.outliers, vec![100.0]);
        assert!(BoxStats::from_values("Empty", &[]).is_none());
    }
}
