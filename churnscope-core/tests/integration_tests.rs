//! Integration tests for churn analysis over billing export fixtures

use churnscope_core::report::{export_csv, render_csv};
use churnscope_core::{
    analyze_source, render_json, render_text, FetchOptions, JsonExportSource, RecordSource,
    ResolvedConfig, RiskLevel, SourceError,
};
use std::path::PathBuf;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .join("tests")
        .join("fixtures")
        .join("customers")
        .join(name)
}

fn analyze_fixture(name: &str) -> churnscope_core::Analysis {
    let source = JsonExportSource::new(fixture_path(name));
    analyze_source(&source, &FetchOptions::default(), &ResolvedConfig::defaults()).unwrap()
}

fn result_ids(analysis: &churnscope_core::Analysis) -> Vec<&str> {
    analysis
        .report
        .results()
        .iter()
        .map(|r| r.customer_id.as_str())
        .collect()
}

#[test]
fn test_export_report_order() {
    let analysis = analyze_fixture("export.json");
    assert_eq!(
        result_ids(&analysis),
        vec![
            "cus_A002", "cus_A007", "cus_A003", "cus_A004", "cus_A005", "cus_A009", "cus_A006",
            "cus_A008", "cus_A001"
        ]
    );
}

#[test]
fn test_export_scores_and_levels() {
    let analysis = analyze_fixture("export.json");
    let scores: Vec<(f64, RiskLevel)> = analysis
        .report
        .results()
        .iter()
        .map(|r| (r.risk_score, r.risk_level))
        .collect();
    assert_eq!(
        scores,
        vec![
            (100.0, RiskLevel::Critical),
            (100.0, RiskLevel::Critical),
            (95.0, RiskLevel::Critical),
            (80.0, RiskLevel::Critical),
            (80.0, RiskLevel::Critical),
            (70.0, RiskLevel::High),
            (49.0, RiskLevel::Medium),
            (30.0, RiskLevel::Medium),
            (0.0, RiskLevel::Low),
        ]
    );
}

#[test]
fn test_export_summary_counts() {
    let summary = analyze_fixture("export.json").report.summary();
    assert_eq!(summary.total, 9);
    assert_eq!(summary.low, 1);
    assert_eq!(summary.medium, 2);
    assert_eq!(summary.high, 1);
    assert_eq!(summary.critical, 5);
}

#[test]
fn test_unrecognized_status_kept_verbatim() {
    let analysis = analyze_fixture("export.json");
    let paused = analysis
        .report
        .results()
        .iter()
        .find(|r| r.customer_id == "cus_A008")
        .unwrap();
    assert_eq!(paused.subscription_status, "paused");
    assert_eq!(paused.breakdown.status, 0.0);
    assert_eq!(paused.breakdown.payment_method, 30.0);
}

#[test]
fn test_high_risk_recommendations() {
    let analysis = analyze_fixture("export.json");
    let ids: Vec<&str> = analysis
        .recommendations
        .iter()
        .map(|r| r.customer_id.as_str())
        .collect();
    assert_eq!(
        ids,
        vec!["cus_A002", "cus_A007", "cus_A003", "cus_A004", "cus_A005", "cus_A009"]
    );

    let bob = &analysis.recommendations[0];
    assert_eq!(bob.rules, vec!["critical-intervention", "payment-failures"]);
    assert_eq!(bob.recommendations.len(), 5);

    // 80 is not above the intervention cut-off
    let no_email = &analysis.recommendations[3];
    assert_eq!(no_email.email, None);
    assert_eq!(no_email.rules, vec!["missing-payment-method"]);

    let heidi = &analysis.recommendations[5];
    assert_eq!(
        heidi.rules,
        vec![
            "payment-failures",
            "missing-payment-method",
            "renewal-approaching"
        ]
    );
}

#[test]
fn test_envelope_and_json_lines_exports() {
    let envelope = analyze_fixture("envelope.json");
    assert_eq!(result_ids(&envelope), vec!["cus_E2", "cus_E1"]);

    let lines = analyze_fixture("export.jsonl");
    assert_eq!(result_ids(&lines), vec!["cus_L2", "cus_L3", "cus_L1"]);
    assert_eq!(lines.report.results()[2].risk_score, 20.0);
}

#[test]
fn test_empty_export_is_no_data() {
    let analysis = analyze_fixture("empty.json");
    assert!(analysis.report.is_no_data());
    assert_eq!(analysis.report.summary().total, 0);
    assert_eq!(render_text(&analysis, false), "No customers found\n");
}

#[test]
fn test_retrieval_failures_are_errors() {
    let options = FetchOptions::default();
    let config = ResolvedConfig::defaults();

    let malformed = JsonExportSource::new(fixture_path("malformed.jsonl"));
    assert!(matches!(
        analyze_source(&malformed, &options, &config),
        Err(SourceError::Parse { line: 2, .. })
    ));

    let missing = JsonExportSource::new(fixture_path("missing_id.json"));
    assert!(matches!(
        analyze_source(&missing, &options, &config),
        Err(SourceError::MissingCustomerId { index: 1, .. })
    ));

    let duplicate = JsonExportSource::new(fixture_path("duplicate_id.json"));
    assert!(matches!(
        analyze_source(&duplicate, &options, &config),
        Err(SourceError::DuplicateCustomerId { .. })
    ));

    let absent = JsonExportSource::new(fixture_path("does_not_exist.json"));
    assert!(matches!(
        analyze_source(&absent, &options, &config),
        Err(SourceError::Io { .. })
    ));
}

#[test]
fn test_single_customer_and_limit() {
    let source = JsonExportSource::new(fixture_path("export.json"));

    let single = FetchOptions {
        customer_id: Some("cus_A006".to_string()),
        ..Default::default()
    };
    let records = source.fetch(&single).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].email.as_deref(), Some("eve@echo.net"));

    let limited = FetchOptions {
        customer_id: None,
        limit: 3,
    };
    let analysis = analyze_source(&source, &limited, &ResolvedConfig::defaults()).unwrap();
    // First three in export order, then sorted by score
    assert_eq!(result_ids(&analysis), vec!["cus_A002", "cus_A003", "cus_A001"]);
}

#[test]
fn test_text_report_sections() {
    let text = render_text(&analyze_fixture("export.json"), false);
    assert!(text.contains("CHURN RISK ANALYSIS"));
    assert!(text.contains("HIGH RISK CUSTOMERS - RECOMMENDATIONS"));
    assert!(text.contains("bob@beta.dev (Risk: 100.0%)"));
    assert!(text.contains("cus_A004 (Risk: 80.0%)"));
    assert!(text.contains("Total Customers: 9"));
    assert!(text.contains("Critical Risk: 5"));
    assert!(!text.contains("eve@echo.net (Risk"));
}

#[test]
fn test_csv_export_matches_report() {
    let analysis = analyze_fixture("export.json");
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("churn.csv");

    export_csv(&path, analysis.report.results()).unwrap();
    let written = std::fs::read_to_string(&path).unwrap();
    assert_eq!(written, render_csv(analysis.report.results()));

    let lines: Vec<&str> = written.lines().collect();
    assert_eq!(lines.len(), 10);
    assert_eq!(
        lines[0],
        "Customer ID,Email,Status,Risk Score,Risk Level,Failed Charges,Days Until Renewal,Customer Age (days)"
    );
    assert_eq!(lines[1], "cus_A002,bob@beta.dev,past_due,100.00,Critical,2,-3.0,200.0");
    assert_eq!(lines[4], "cus_A004,N/A,none,80.00,Critical,0,0.0,90.0");
}

#[test]
fn test_json_output_shape() {
    let json = render_json(&analyze_fixture("export.jsonl"));
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["report"]["status"], "scored");
    assert_eq!(value["report"]["summary"]["total"], 3);
    assert_eq!(value["report"]["results"][0]["customer_id"], "cus_L2");
    assert_eq!(value["report"]["results"][0]["risk_level"], "Critical");
    assert_eq!(value["recommendations"][0]["rules"][0], "critical-intervention");

    let empty = render_json(&analyze_fixture("empty.json"));
    let value: serde_json::Value = serde_json::from_str(&empty).unwrap();
    assert_eq!(value["report"]["status"], "no_data");
    assert!(value.get("recommendations").is_none());
}
