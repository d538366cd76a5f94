use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name given to the synthetic row that summarizes everything below the top N.
pub const OTHER_CATEGORY: &str = "Other";

/// One row of the employee salary table.
///
/// Owned by the database; the dashboard only ever reads it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "web", derive(sqlx::FromRow))]
pub struct SalaryRecord {
    pub employee_name: String,
    pub job_title: String,
    pub department: String,
    pub calendar_year: i32,
    pub salary: f64,
}

/// A per-department numeric aggregate (mean or median salary).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "web", derive(sqlx::FromRow))]
pub struct CategoryAggregate {
    pub category_name: String,
    pub value: f64,
}

impl CategoryAggregate {
    pub fn new(category_name: impl Into<String>, value: f64) -> Self {
        CategoryAggregate {
            category_name: category_name.into(),
            value,
        }
    }

    /// True for the synthetic "Other" row appended by bucketing.
    pub fn is_other(&self) -> bool {
        self.category_name == OTHER_CATEGORY
    }
}

/// Mean salary of one department in one calendar year.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "web", derive(sqlx::FromRow))]
pub struct YearlyAggregate {
    pub category_name: String,
    pub calendar_year: i32,
    pub value: f64,
}

/// Period -> (category -> value). Periods iterate in ascending order.
pub type GrowthMatrix = BTreeMap<i32, BTreeMap<String, f64>>;

/// Pivot department/year rows into a growth matrix.
///
/// Later rows overwrite earlier ones for the same (year, department) cell.
pub fn pivot_yearly(rows: &[YearlyAggregate]) -> GrowthMatrix {
    let mut matrix = GrowthMatrix::new();
    for row in rows {
        matrix
            .entry(row.calendar_year)
            .or_default()
            .insert(row.category_name.clone(), row.value);
    }
    matrix
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn pivot_groups_by_year_then_department() {
        let rows = vec![
            YearlyAggregate {
                category_name: "Physics".to_string(),
                calendar_year: 2021,
                value: 90.0,
            },
            YearlyAggregate {
                category_name: "Biology".to_string(),
                calendar_year: 2020,
                value: 70.0,
            },
            YearlyAggregate {
                category_name: "Physics".to_string(),
                calendar_year: 2020,
                value: 80.0,
            },
        ];

        let matrix = pivot_yearly(&rows);
        assert_eq!(matrix.keys().copied().collect::<Vec<_>>(), vec![2020, 2021]);
        assert_eq!(matrix[&2020]["Biology"], 70.0);
        assert_eq!(matrix[&2020]["Physics"], 80.0);
        assert_eq!(matrix[&2021].len(), 1);
    }

    #[test]
    fn other_row_is_recognised() {
        assert!(CategoryAggregate::new(OTHER_CATEGORY, 1.0).is_other());
        assert!(!CategoryAggregate::new("Library", 1.0).is_other());
    }
}
