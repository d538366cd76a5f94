mod common;

use common::sample_store;
use pretty_assertions::assert_eq;
use salary_dashboard::analysis::{AnalysisKind, AnalysisRequest, ChartData, run_analysis};
use salary_dashboard::downloader::to_csv;
use salary_dashboard::{DashboardError, SalaryStore};
use serde_json::json;

#[tokio::test]
async fn average_salary_keeps_top_n_and_other() {
    let store = sample_store();
    let request = AnalysisRequest::new(AnalysisKind::AverageSalary)
        .with_year(2021)
        .with_top_n(2);

    let analysis = run_analysis(&store, &request).await.unwrap();

    assert_eq!(
        analysis.chart.title,
        "Average Salary by Department for 2021 (Top 2 + Other)"
    );
    assert_eq!(
        analysis.chart.data,
        ChartData::Bar {
            labels: vec!["Physics".into(), "Chemistry".into(), "Other".into()],
            values: vec![110_000.0, 90_000.0, 37_500.0],
        }
    );
    assert_eq!(analysis.table.columns, vec!["Department", "Average Salary"]);
    assert_eq!(analysis.table.rows[2], vec![json!("Other"), json!(37_500.0)]);
}

#[tokio::test]
async fn median_salary_over_all_years() {
    let store = sample_store();
    let request = AnalysisRequest::new(AnalysisKind::MedianSalary).with_top_n(1);

    let analysis = run_analysis(&store, &request).await.unwrap();

    assert_eq!(
        analysis.chart.title,
        "Median Salary by Department for All Years (Top 1 + Other)"
    );
    match analysis.chart.data {
        ChartData::Bar { labels, values } => {
            assert_eq!(labels, vec!["Physics", "Other"]);
            assert_eq!(values[0], 120_000.0);
        }
        other => panic!("expected a bar chart, got {other:?}"),
    }
}

#[tokio::test]
async fn top_n_larger_than_department_count_has_no_other_row() {
    let store = sample_store();
    let request = AnalysisRequest::new(AnalysisKind::AverageSalary)
        .with_year(2022)
        .with_top_n(50);

    let analysis = run_analysis(&store, &request).await.unwrap();
    assert_eq!(analysis.table.len(), 6);
    assert!(analysis.table.rows.iter().all(|row| row[0] != json!("Other")));
}

#[tokio::test]
async fn distribution_boxes_the_top_departments_by_median() {
    let store = sample_store();
    let request = AnalysisRequest::new(AnalysisKind::Distribution)
        .with_year(2021)
        .with_top_n(2);

    let analysis = run_analysis(&store, &request).await.unwrap();

    match &analysis.chart.data {
        ChartData::Box { groups } => {
            let labels: Vec<&str> = groups.iter().map(|g| g.label.as_str()).collect();
            assert_eq!(labels, vec!["Physics", "Chemistry"]);
            assert_eq!(groups[0].median, 110_000.0);
            assert_eq!(groups[0].count, 2);
        }
        other => panic!("expected a box chart, got {other:?}"),
    }
    // Ada, Grace and Marie
    assert_eq!(analysis.table.len(), 3);
}

#[tokio::test]
async fn distribution_without_a_year_is_rejected() {
    let store = sample_store();
    let request = AnalysisRequest::new(AnalysisKind::Distribution);

    let err = run_analysis(&store, &request).await.unwrap_err();
    assert!(matches!(err, DashboardError::InvalidArgument { .. }));
}

#[tokio::test]
async fn department_growth_plots_one_series() {
    let store = sample_store();
    let request = AnalysisRequest::new(AnalysisKind::DepartmentGrowth).with_department("Physics");

    let analysis = run_analysis(&store, &request).await.unwrap();

    match &analysis.chart.data {
        ChartData::Line { series } => {
            assert_eq!(series.len(), 1);
            assert_eq!(series[0].points, vec![(2021, 110_000.0), (2022, 121_000.0)]);
        }
        other => panic!("expected a line chart, got {other:?}"),
    }
    assert_eq!(analysis.table.len(), 3);
}

#[tokio::test]
async fn department_growth_ignores_surrounding_whitespace() {
    let store = sample_store();
    let request = AnalysisRequest::new(AnalysisKind::DepartmentGrowth).with_department(" Physics ");

    let analysis = run_analysis(&store, &request).await.unwrap();

    assert_eq!(analysis.chart.title, "Average Salary Over Time: Physics");
    match &analysis.chart.data {
        ChartData::Line { series } => {
            assert_eq!(series[0].name, "Physics");
            assert_eq!(series[0].points.len(), 2);
        }
        other => panic!("expected a line chart, got {other:?}"),
    }
    assert_eq!(analysis.table.len(), 3);
}

#[tokio::test]
async fn department_growth_needs_a_department() {
    let store = sample_store();
    let request = AnalysisRequest::new(AnalysisKind::DepartmentGrowth).with_department("   ");

    assert!(run_analysis(&store, &request).await.is_err());
}

#[tokio::test]
async fn top_n_growth_puts_fastest_growing_department_first() {
    let store = sample_store();
    let request = AnalysisRequest::new(AnalysisKind::TopNGrowth).with_top_n(3);

    let analysis = run_analysis(&store, &request).await.unwrap();

    assert_eq!(analysis.table.columns, vec!["Department", "Mean Annual Growth"]);
    assert_eq!(analysis.table.len(), 3);
    assert_eq!(analysis.table.rows[0][0], json!("Chemistry"));
    match &analysis.chart.data {
        ChartData::Line { series } => {
            assert_eq!(series.len(), 3);
            assert_eq!(series[0].name, "Chemistry");
        }
        other => panic!("expected a line chart, got {other:?}"),
    }
}

#[tokio::test]
async fn highest_salaries_are_limited_and_ordered() {
    let store = sample_store();
    let request = AnalysisRequest::new(AnalysisKind::HighestSalaries)
        .with_year(2022)
        .with_top_n(2);

    let analysis = run_analysis(&store, &request).await.unwrap();

    assert_eq!(
        analysis.chart.data,
        ChartData::Bar {
            labels: vec!["Ada".into(), "Marie".into()],
            values: vec![121_000.0, 108_000.0],
        }
    );
}

#[tokio::test]
async fn zero_top_n_is_rejected_for_every_analysis() {
    let store = sample_store();
    for kind in AnalysisKind::ALL {
        let request = AnalysisRequest::new(kind)
            .with_year(2021)
            .with_department("Physics")
            .with_top_n(0);
        let err = run_analysis(&store, &request).await.unwrap_err();
        assert!(
            matches!(err, DashboardError::InvalidArgument { .. }),
            "{kind:?}"
        );
    }
}

#[tokio::test]
async fn exported_table_matches_the_analysis() {
    let store = sample_store();
    let request = AnalysisRequest::new(AnalysisKind::AverageSalary)
        .with_year(2021)
        .with_top_n(1);

    let analysis = run_analysis(&store, &request).await.unwrap();
    assert_eq!(
        to_csv(&analysis.table),
        "Department,Average Salary\nPhysics,110000.0\nOther,48000.0\n"
    );
}

#[tokio::test]
async fn options_are_sorted() {
    let store = sample_store();
    assert_eq!(store.years().await.unwrap(), vec![2021, 2022]);
    assert_eq!(
        store.departments().await.unwrap(),
        vec!["Arts", "Biology", "Chemistry", "History", "Music", "Physics"]
    );
}
