//! Data access for salary records.
//!
//! [`SalaryStore`] is the only way the analysis layer reaches data, so it
//! can run against PostgreSQL in production and an in-memory record set in
//! tests or offline mode.

use crate::bucket::{mean, median};
use crate::error::Result;
use crate::record::{CategoryAggregate, SalaryRecord, YearlyAggregate};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};

/// The queries the dashboard needs. Aggregates come back ordered by value,
/// descending; record lists by salary, descending.
#[async_trait]
pub trait SalaryStore: Send + Sync {
    async fn years(&self) -> Result<Vec<i32>>;

    async fn departments(&self) -> Result<Vec<String>>;

    /// Mean salary per department, optionally restricted to one year.
    async fn department_means(&self, year: Option<i32>) -> Result<Vec<CategoryAggregate>>;

    /// Median salary per department, optionally restricted to one year.
    async fn department_medians(&self, year: Option<i32>) -> Result<Vec<CategoryAggregate>>;

    async fn records_for_year(&self, year: i32) -> Result<Vec<SalaryRecord>>;

    async fn records_for_department(&self, department: &str) -> Result<Vec<SalaryRecord>>;

    /// Mean salary per (department, year), ordered by department then year.
    async fn department_year_means(&self) -> Result<Vec<YearlyAggregate>>;

    /// The `limit` highest individual salaries, optionally within one year.
    async fn top_earners(&self, limit: usize, year: Option<i32>) -> Result<Vec<SalaryRecord>>;
}

/// Records held in memory; every query is computed over the full set.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    records: Vec<SalaryRecord>,
}

impl MemoryStore {
    pub fn new(records: Vec<SalaryRecord>) -> Self {
        MemoryStore { records }
    }

    pub fn records(&self) -> &[SalaryRecord] {
        &self.records
    }

    fn aggregate_by_department<F>(&self, year: Option<i32>, reduce: F) -> Vec<CategoryAggregate>
    where
        F: Fn(&[f64]) -> f64,
    {
        let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        for record in self.in_year(year) {
            groups
                .entry(record.department.as_str())
                .or_default()
                .push(record.salary);
        }

        let mut aggregates: Vec<CategoryAggregate> = groups
            .into_iter()
            .map(|(department, salaries)| CategoryAggregate::new(department, reduce(&salaries)))
            .collect();
        aggregates.sort_by(|a, b| b.value.total_cmp(&a.value));
        aggregates
    }

    fn in_year(&self, year: Option<i32>) -> impl Iterator<Item = &SalaryRecord> {
        self.records
            .iter()
            .filter(move |record| year.is_none_or(|y| record.calendar_year == y))
    }
}

fn by_salary_desc(mut records: Vec<SalaryRecord>) -> Vec<SalaryRecord> {
    records.sort_by(|a, b| b.salary.total_cmp(&a.salary));
    records
}

#[async_trait]
impl SalaryStore for MemoryStore {
    async fn years(&self) -> Result<Vec<i32>> {
        let years: BTreeSet<i32> = self.records.iter().map(|r| r.calendar_year).collect();
        Ok(years.into_iter().collect())
    }

    async fn departments(&self) -> Result<Vec<String>> {
        let departments: BTreeSet<&str> =
            self.records.iter().map(|r| r.department.as_str()).collect();
        Ok(departments.into_iter().map(str::to_string).collect())
    }

    async fn department_means(&self, year: Option<i32>) -> Result<Vec<CategoryAggregate>> {
        Ok(self.aggregate_by_department(year, mean))
    }

    async fn department_medians(&self, year: Option<i32>) -> Result<Vec<CategoryAggregate>> {
        Ok(self.aggregate_by_department(year, median))
    }

    async fn records_for_year(&self, year: i32) -> Result<Vec<SalaryRecord>> {
        Ok(by_salary_desc(self.in_year(Some(year)).cloned().collect()))
    }

    async fn records_for_department(&self, department: &str) -> Result<Vec<SalaryRecord>> {
        Ok(by_salary_desc(
            self.records
                .iter()
                .filter(|r| r.department == department)
                .cloned()
                .collect(),
        ))
    }

    async fn department_year_means(&self) -> Result<Vec<YearlyAggregate>> {
        let mut groups: BTreeMap<(&str, i32), Vec<f64>> = BTreeMap::new();
        for record in &self.records {
            groups
                .entry((record.department.as_str(), record.calendar_year))
                .or_default()
                .push(record.salary);
        }
        Ok(groups
            .into_iter()
            .map(|((department, year), salaries)| YearlyAggregate {
                category_name: department.to_string(),
                calendar_year: year,
                value: mean(&salaries),
            })
            .collect())
    }

    async fn top_earners(&self, limit: usize, year: Option<i32>) -> Result<Vec<SalaryRecord>> {
        let mut records = by_salary_desc(self.in_year(year).cloned().collect());
        records.truncate(limit);
        Ok(records)
    }
}

#[cfg(feature = "web")]
pub use postgres::PgSalaryStore;

#[cfg(feature = "web")]
mod postgres {
    use super::SalaryStore;
    use crate::config::{DbCredentials, TableName};
    use crate::error::{DashboardError, Result};
    use crate::record::{CategoryAggregate, SalaryRecord, YearlyAggregate};
    use async_trait::async_trait;
    use log::{debug, info};
    use sqlx::PgPool;
    use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

    const MAX_CONNECTIONS: u32 = 5;

    /// PostgreSQL-backed store. Every value is a bound parameter; only the
    /// validated table name is formatted into the SQL text.
    #[derive(Clone, Debug)]
    pub struct PgSalaryStore {
        pool: PgPool,
        table: TableName,
    }

    impl PgSalaryStore {
        pub fn new(pool: PgPool, table: TableName) -> Self {
            PgSalaryStore { pool, table }
        }

        /// Open the pool. Any failure here is a `ConnectionFailure`.
        pub async fn connect(credentials: &DbCredentials, table: TableName) -> Result<Self> {
            let options = PgConnectOptions::new()
                .host(&credentials.host)
                .port(credentials.port)
                .database(&credentials.database)
                .username(&credentials.user)
                .password(&credentials.password);

            let pool = PgPoolOptions::new()
                .max_connections(MAX_CONNECTIONS)
                .connect_with(options)
                .await
                .map_err(|e| DashboardError::ConnectionFailure {
                    details: e.to_string(),
                })?;

            info!(
                "Connected to PostgreSQL at {}:{}/{}",
                credentials.host, credentials.port, credentials.database
            );
            Ok(Self::new(pool, table))
        }
    }

    // NULL salaries cannot decode into f64, and an all-NULL group would
    // aggregate to NULL, so every statement drops them up front.
    fn records_sql(table: &TableName, filter: &str, tail: &str) -> String {
        format!(
            "SELECT employee_name, job_title, department_description AS department, \
             calendar_year::int4 AS calendar_year, salary::float8 AS salary \
             FROM {table} \
             WHERE salary IS NOT NULL AND ({filter}) \
             ORDER BY salary DESC{tail}"
        )
    }

    fn department_aggregate_sql(table: &TableName, aggregate: &str) -> String {
        format!(
            "SELECT department_description AS category_name, {aggregate}::float8 AS value \
             FROM {table} \
             WHERE salary IS NOT NULL AND ($1::int4 IS NULL OR calendar_year = $1) \
             GROUP BY department_description \
             ORDER BY value DESC"
        )
    }

    fn department_year_means_sql(table: &TableName) -> String {
        format!(
            "SELECT department_description AS category_name, \
             calendar_year::int4 AS calendar_year, AVG(salary)::float8 AS value \
             FROM {table} \
             WHERE salary IS NOT NULL \
             GROUP BY department_description, calendar_year \
             ORDER BY department_description, calendar_year"
        )
    }

    #[async_trait]
    impl SalaryStore for PgSalaryStore {
        async fn years(&self) -> Result<Vec<i32>> {
            let sql = format!(
                "SELECT DISTINCT calendar_year::int4 FROM {} ORDER BY 1",
                self.table
            );
            debug!("years: {sql}");
            sqlx::query_scalar::<_, i32>(&sql)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| DashboardError::query("years", e))
        }

        async fn departments(&self) -> Result<Vec<String>> {
            let sql = format!(
                "SELECT DISTINCT department_description FROM {} ORDER BY 1",
                self.table
            );
            sqlx::query_scalar::<_, String>(&sql)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| DashboardError::query("departments", e))
        }

        async fn department_means(&self, year: Option<i32>) -> Result<Vec<CategoryAggregate>> {
            let sql = department_aggregate_sql(&self.table, "AVG(salary)");
            sqlx::query_as::<_, CategoryAggregate>(&sql)
                .bind(year)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| DashboardError::query("department_means", e))
        }

        async fn department_medians(&self, year: Option<i32>) -> Result<Vec<CategoryAggregate>> {
            let sql = department_aggregate_sql(
                &self.table,
                "PERCENTILE_CONT(0.5) WITHIN GROUP (ORDER BY salary)",
            );
            sqlx::query_as::<_, CategoryAggregate>(&sql)
                .bind(year)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| DashboardError::query("department_medians", e))
        }

        async fn records_for_year(&self, year: i32) -> Result<Vec<SalaryRecord>> {
            let sql = records_sql(&self.table, "calendar_year = $1", "");
            sqlx::query_as::<_, SalaryRecord>(&sql)
                .bind(year)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| DashboardError::query("records_for_year", e))
        }

        async fn records_for_department(&self, department: &str) -> Result<Vec<SalaryRecord>> {
            let sql = records_sql(&self.table, "department_description = $1", "");
            sqlx::query_as::<_, SalaryRecord>(&sql)
                .bind(department)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| DashboardError::query("records_for_department", e))
        }

        async fn department_year_means(&self) -> Result<Vec<YearlyAggregate>> {
            let sql = department_year_means_sql(&self.table);
            sqlx::query_as::<_, YearlyAggregate>(&sql)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| DashboardError::query("department_year_means", e))
        }

        async fn top_earners(&self, limit: usize, year: Option<i32>) -> Result<Vec<SalaryRecord>> {
            let limit = i64::try_from(limit)
                .map_err(|_| DashboardError::invalid(format!("limit too large: {limit}")))?;
            let sql = records_sql(
                &self.table,
                "$1::int4 IS NULL OR calendar_year = $1",
                " LIMIT $2",
            );
            sqlx::query_as::<_, SalaryRecord>(&sql)
                .bind(year)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| DashboardError::query("top_earners", e))
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(name: &str, department: &str, year: i32, salary: f64) -> SalaryRecord {
        SalaryRecord {
            employee_name: name.to_string(),
            job_title: "Staff".to_string(),
            department: department.to_string(),
            calendar_year: year,
            salary,
        }
    }

    fn store() -> MemoryStore {
        MemoryStore::new(vec![
            record("Ada", "Physics", 2020, 100.0),
            record("Ben", "Physics", 2020, 50.0),
            record("Cy", "Physics", 2021, 120.0),
            record("Di", "History", 2020, 60.0),
            record("Ed", "History", 2021, 70.0),
            record("Flo", "History", 2021, 90.0),
            record("Gus", "History", 2021, 20.0),
        ])
    }

    #[tokio::test]
    async fn test_distinct_years_and_departments() {
        let store = store();
        assert_eq!(store.years().await.unwrap(), vec![2020, 2021]);
        assert_eq!(
            store.departments().await.unwrap(),
            vec!["History".to_string(), "Physics".to_string()]
        );
    }

    #[tokio::test]
    async fn test_means_are_sorted_descending() {
        let means = store().department_means(Some(2020)).await.unwrap();
        assert_eq!(
            means,
            vec![
                CategoryAggregate::new("Physics", 75.0),
                CategoryAggregate::new("History", 60.0),
            ]
        );
    }

    #[tokio::test]
    async fn test_medians_across_all_years() {
        let medians = store().department_medians(None).await.unwrap();
        // History: 20, 60, 70, 90 -> 65; Physics: 50, 100, 120 -> 100
        assert_eq!(medians[0], CategoryAggregate::new("Physics", 100.0));
        assert_eq!(medians[1], CategoryAggregate::new("History", 65.0));
    }

    #[tokio::test]
    async fn test_department_year_means() {
        let rows = store().department_year_means().await.unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].category_name, "History");
        assert_eq!(rows[1].calendar_year, 2021);
        assert_eq!(rows[1].value, 60.0);
    }

    #[tokio::test]
    async fn test_top_earners_respects_limit_and_year() {
        let store = store();
        let top = store.top_earners(2, None).await.unwrap();
        assert_eq!(
            top.iter().map(|r| r.employee_name.as_str()).collect::<Vec<_>>(),
            vec!["Cy", "Ada"]
        );
        let in_2021 = store.top_earners(10, Some(2021)).await.unwrap();
        assert_eq!(in_2021.len(), 4);
        assert_eq!(in_2021[0].employee_name, "Cy");
    }

    #[tokio::test]
    async fn test_record_filters() {
        let store = store();
        assert_eq!(store.records_for_year(2020).await.unwrap().len(), 3);
        let history = store.records_for_department("History").await.unwrap();
        assert_eq!(history.len(), 4);
        assert_eq!(history[0].salary, 90.0);
        assert!(store.records_for_department("Law").await.unwrap().is_empty());
    }
}
