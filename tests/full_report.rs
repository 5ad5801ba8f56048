use std::fs::File;

use sales_report::prelude::*;
use strum::IntoEnumIterator;

#[test]
fn full_report() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let charts = dir.path().join("charts");
    let json = dir.path().join("report.json");

    let app = SalesReportApp::with_args(vec![
        "full_report_test".to_string(),
        "--quiet".to_string(),
        format!("--output-dir={}", charts.display()),
        format!("--json={}", json.display()),
    ])?;

    let aggregates = app.execute()?;

    assert_eq!(aggregates.orders, 2000);
    assert_eq!(aggregates.top_products.len(), 10);
    assert_eq!(aggregates.top_customers.len(), 10);
    assert_eq!(aggregates.category_age_pivot.total(), aggregates.total_revenue);

    for kind in ChartKind::iter() {
        assert!(charts.join(kind.file_name()).is_file(), "missing {}", kind.file_name());
    }

    let report: serde_json::Value = serde_json::from_reader(File::open(&json)?)?;
    assert_eq!(report["total_revenue"].as_u64(), Some(aggregates.total_revenue));
    assert_eq!(report["monthly_revenue"].as_array().map(|m| m.len()), Some(12));
    assert_eq!(report["category_age_pivot"]["age_groups"][0], "18-25");

    Ok(())
}

#[test]
fn same_seed_same_report() -> Result<(), Box<dyn std::error::Error>> {
    let run = |seed: &str| -> Result<Aggregates, Box<dyn std::error::Error>> {
        let app = SalesReportApp::with_args(["repeat_test", "--quiet", "--no-charts", "--seed", seed])?;
        Ok(app.execute()?)
    };

    let first = run("42")?;
    let second = run("42")?;
    assert_eq!(first.total_revenue, second.total_revenue);
    assert_eq!(first, second);

    let other = run("43")?;
    assert_ne!(first.total_revenue, other.total_revenue);

    Ok(())
}

#[test]
fn small_dataset() -> Result<(), Box<dyn std::error::Error>> {
    let app = SalesReportApp::with_args([
        "small_test",
        "--quiet",
        "--no-charts",
        "--customers=3",
        "--products=2",
        "--orders=5",
    ])?;

    let aggregates = app.execute()?;
    assert_eq!(aggregates.orders, 5);
    assert!(aggregates.top_products.len() <= 2);
    assert!(aggregates.top_customers.len() <= 3);
    let monthly: u64 = aggregates.monthly_revenue.iter().map(|m| m.revenue).sum();
    assert_eq!(monthly, aggregates.total_revenue);

    Ok(())
}

#[test]
fn leap_year_report() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let app = SalesReportApp::with_args(vec![
        "leap_year_test".to_string(),
        "--quiet".to_string(),
        "--year=2024".to_string(),
        format!("--output-dir={}", dir.path().display()),
    ])?;

    let aggregates = app.execute()?;
    assert_eq!(aggregates.monthly_revenue.len(), 12);
    assert!(aggregates.monthly_revenue.iter().all(|m| m.month.starts_with("2024-")));

    let monthly = std::fs::read_to_string(dir.path().join(ChartKind::MonthlyRevenue.file_name()))?;
    assert!(monthly.contains("Monthly Revenue (2024)"));

    Ok(())
}
