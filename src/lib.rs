/*!
# Salary Dashboard

A browser-based dashboard for exploring employee salary data by department,
built in Rust.

## Overview

Salary records (employee, job title, department, calendar year, salary) are
read from a PostgreSQL table, or from a CSV file for offline use. The
dashboard offers six analyses, each drawn as a chart with a paginated data
table underneath that can be exported to CSV or XLSX.

## Architecture

### Frontend Layer
- **Technologies**: HTML (handlebars), CSS, JavaScript
- **Key Components**:
  - Analysis selector with year, department and Top N inputs
  - Chart image, re-fetched whenever an input changes
  - Data table with pagination and export links

### Backend Layer
- **Technologies**: Rust, axum, sqlx
- **Core Components**:
  - Store - Runs the aggregate and record queries
  - Bucketing - Keeps the top N categories and folds the rest into "Other"
  - Growth ranking - Orders departments by mean year-over-year change
  - Analysis - Turns a request into a chart description and a data table
  - Graph - Renders chart descriptions to PNG with plotters

## Analyses

- Average salary by department (Top N + Other)
- Median salary by department (Top N + Other)
- Salary distribution for a year (box plot of the top N departments)
- Salary over time for one department
- Top N departments by salary growth
- Highest individual salaries

## Modules

- **record**: Salary records and aggregate rows
- **bucket**: Top N + Other bucketing and growth ranking
- **store**: The query seam, with in-memory and PostgreSQL stores
- **loader**: CSV import into the in-memory store
- **analysis**: The six analyses
- **table**: Tabular results and pagination
- **downloader**: Export functionality (CSV, XLSX)
- **graph**: PNG chart rendering
- **config**: Credentials, table name and command line flags
- **error**: Error type shared by every module
- **app**: Routing and handlers

## REST API Endpoints

- `/` - The dashboard page
- `/api/options` - Available years, departments and analyses
- `/api/analysis` - Chart description and one page of the data table
- `/api/chart.png` - The rendered chart
- `/api/export.csv`, `/api/export.xlsx` - The full data table as a download
*/

pub mod analysis;
pub mod bucket;
pub mod config;
pub mod downloader;
pub mod error;
pub mod loader;
pub mod record;
pub mod store;
pub mod table;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod graph;

pub use bucket::{bucket, bucket_ranked, rank_by_growth};
pub use error::{DashboardError, Result};
pub use record::{CategoryAggregate, SalaryRecord, YearlyAggregate};
pub use store::{MemoryStore, SalaryStore};
