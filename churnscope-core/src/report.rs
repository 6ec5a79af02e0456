//! Reporting and output generation
//!
//! Global invariants enforced:
//! - Deterministic output ordering (score descending, ties keep input order)
//! - "No data" is a distinct report state, never an empty table
//! - Byte-for-byte identical output across runs

use crate::aggregates::RiskSummary;
use crate::recommend::CustomerRecommendations;
use crate::record::CustomerFeatureRecord;
use crate::risk::{self, RiskLevel, RiskThresholds, ScoreBreakdown, ScoringWeights};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// CSV header, one column per `RiskResult` display field
pub const CSV_HEADER: [&str; 8] = [
    "Customer ID",
    "Email",
    "Status",
    "Risk Score",
    "Risk Level",
    "Failed Charges",
    "Days Until Renewal",
    "Customer Age (days)",
];

/// Round to a fixed number of decimal places for display
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Decimal places kept on a reported score
pub const SCORE_DECIMALS: i32 = 2;

/// A record together with its scoring output
///
/// `score` is the reported score, rounded to `SCORE_DECIMALS`; `level`,
/// sorting and every filtered view derive from it so a row never disagrees
/// with itself. `breakdown` keeps the unrounded contributions.
#[derive(Debug, Clone, Copy)]
pub struct ScoredRecord<'a> {
    pub record: &'a CustomerFeatureRecord,
    pub breakdown: ScoreBreakdown,
    pub score: f64,
    pub level: RiskLevel,
}

impl<'a> ScoredRecord<'a> {
    /// Score and classify one record
    pub fn new(
        record: &'a CustomerFeatureRecord,
        weights: &ScoringWeights,
        thresholds: &RiskThresholds,
    ) -> Self {
        let breakdown = risk::calculate_score_breakdown(record, weights);
        let score = round_to(breakdown.score(), SCORE_DECIMALS);
        let level = risk::assign_risk_level_with_thresholds(score, thresholds);
        ScoredRecord {
            record,
            breakdown,
            score,
            level,
        }
    }
}

/// One report row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct RiskResult {
    pub customer_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub subscription_status: String,
    /// Rounded to 2 decimals
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub failed_charges: u32,
    /// Rounded to 1 decimal
    pub days_until_renewal: f64,
    /// Rounded to 1 decimal
    pub customer_age_days: f64,
    #[serde(skip, default)]
    pub breakdown: ScoreBreakdown,
}

impl RiskResult {
    pub fn new(scored: &ScoredRecord<'_>) -> Self {
        let record = scored.record;
        RiskResult {
            customer_id: record.customer_id.clone(),
            email: record.email.clone(),
            subscription_status: record.subscription_status.to_string(),
            risk_score: scored.score,
            risk_level: scored.level,
            failed_charges: record.failed_charges,
            days_until_renewal: round_to(record.days_until_renewal, 1),
            customer_age_days: round_to(record.customer_age_days, 1),
            breakdown: scored.breakdown,
        }
    }

    /// Email if known, otherwise the customer id
    pub fn display_name(&self) -> &str {
        self.email.as_deref().unwrap_or(&self.customer_id)
    }
}

/// Populated report body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct ScoredReport {
    pub results: Vec<RiskResult>,
    pub summary: RiskSummary,
}

/// Outcome of aggregating one evaluation cycle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Report {
    /// No records were supplied
    NoData,
    Scored(ScoredReport),
}

impl Report {
    pub fn is_no_data(&self) -> bool {
        matches!(self, Report::NoData)
    }

    /// Rows in report order; empty for `NoData`
    pub fn results(&self) -> &[RiskResult] {
        match self {
            Report::NoData => &[],
            Report::Scored(report) => &report.results,
        }
    }

    /// Bucket counts; all zero for `NoData`
    pub fn summary(&self) -> RiskSummary {
        match self {
            Report::NoData => RiskSummary::default(),
            Report::Scored(report) => report.summary,
        }
    }

    /// Rows at High level or above
    pub fn high_risk(&self) -> impl Iterator<Item = &RiskResult> {
        self.results()
            .iter()
            .filter(|r| r.risk_level >= RiskLevel::High)
    }

    /// Rows at Critical level, the alerting view
    pub fn critical(&self) -> impl Iterator<Item = &RiskResult> {
        self.results()
            .iter()
            .filter(|r| r.risk_level == RiskLevel::Critical)
    }
}

/// Full output of one analysis run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct Analysis {
    pub report: Report,
    /// High-risk customers only, in report order
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub recommendations: Vec<CustomerRecommendations>,
}

/// Sort scored records deterministically
pub fn sort_scored(mut scored: Vec<ScoredRecord<'_>>) -> Vec<ScoredRecord<'_>> {
    // Score descending; `sort_by` is stable so ties keep input order
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored
}

/// Aggregate ranked records into a report with summary counts
///
/// Rows keep the order of `ranked`; callers rank with [`sort_scored`].
pub fn build_report(ranked: &[ScoredRecord<'_>]) -> Report {
    if ranked.is_empty() {
        return Report::NoData;
    }

    let results: Vec<RiskResult> = ranked.iter().map(RiskResult::new).collect();
    let summary = RiskSummary::from_results(&results);

    Report::Scored(ScoredReport { results, summary })
}

const RULE: &str =
    "================================================================================";

fn section(output: &mut String, title: &str) {
    output.push_str(RULE);
    output.push('\n');
    output.push_str(title);
    output.push('\n');
    output.push_str(RULE);
    output.push('\n');
}

/// Render the results table
///
/// With `explain`, each row is followed by its non-zero rule contributions.
pub fn render_table(results: &[RiskResult], explain: bool) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "{:<20} {:<28} {:<10} {:>7} {:<9} {:>6} {:>8} {:>8}\n",
        "CUSTOMER ID", "EMAIL", "STATUS", "SCORE", "LEVEL", "FAILED", "RENEWAL", "AGE"
    ));

    for result in results {
        output.push_str(&format!(
            "{:<20} {:<28} {:<10} {:>7.2} {:<9} {:>6} {:>8.1} {:>8.1}\n",
            truncate_or_pad(&result.customer_id, 20),
            truncate_or_pad(result.email.as_deref().unwrap_or("N/A"), 28),
            truncate_or_pad(&result.subscription_status, 10),
            result.risk_score,
            result.risk_level.as_str(),
            result.failed_charges,
            result.days_until_renewal,
            result.customer_age_days,
        ));

        if explain {
            let parts: Vec<String> = result
                .breakdown
                .contributions()
                .iter()
                .filter(|(_, value)| *value != 0.0)
                .map(|(name, value)| format!("{}=+{:.1}", name, value))
                .collect();
            if !parts.is_empty() {
                output.push_str(&format!("    {}\n", parts.join(" ")));
            }
        }
    }

    output
}

/// Render per-customer recommendation blocks
pub fn render_recommendations(recommendations: &[CustomerRecommendations]) -> String {
    let mut output = String::new();
    for entry in recommendations {
        output.push_str(&format!(
            "\n{} (Risk: {:.1}%)\n",
            entry.email.as_deref().unwrap_or(&entry.customer_id),
            entry.risk_score
        ));
        for line in &entry.recommendations {
            output.push_str(&format!("   {}\n", line));
        }
    }
    output
}

/// Render bucket counts
pub fn render_summary(summary: &RiskSummary) -> String {
    let mut output = String::new();
    output.push_str(&format!("Total Customers: {}\n", summary.total));
    for level in RiskLevel::ALL {
        output.push_str(&format!(
            "{} Risk: {}\n",
            level.as_str(),
            summary.count(level)
        ));
    }
    output
}

/// Render a full analysis as text output
pub fn render_text(analysis: &Analysis, explain: bool) -> String {
    let report = match &analysis.report {
        Report::NoData => return "No customers found\n".to_string(),
        Report::Scored(report) => report,
    };

    let mut output = String::new();
    section(&mut output, "CHURN RISK ANALYSIS");
    output.push_str(&render_table(&report.results, explain));

    if !analysis.recommendations.is_empty() {
        output.push('\n');
        section(&mut output, "HIGH RISK CUSTOMERS - RECOMMENDATIONS");
        output.push_str(&render_recommendations(&analysis.recommendations));
    }

    output.push('\n');
    section(&mut output, "SUMMARY");
    output.push_str(&render_summary(&report.summary));
    output
}

/// Render a full analysis as JSON output
pub fn render_json(analysis: &Analysis) -> String {
    serde_json::to_string_pretty(analysis).unwrap_or_else(|_| "{}".to_string())
}

/// Quote a CSV field when it contains a delimiter, quote or line break
fn csv_field(value: &str) -> String {
    if value.contains(|c| matches!(c, ',' | '"' | '\n' | '\r')) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Render results as CSV, one row per result in report order
pub fn render_csv(results: &[RiskResult]) -> String {
    let mut output = CSV_HEADER.join(",");
    output.push('\n');

    for result in results {
        let row = [
            csv_field(&result.customer_id),
            csv_field(result.email.as_deref().unwrap_or("N/A")),
            csv_field(&result.subscription_status),
            format!("{:.2}", result.risk_score),
            result.risk_level.as_str().to_string(),
            result.failed_charges.to_string(),
            format!("{:.1}", result.days_until_renewal),
            format!("{:.1}", result.customer_age_days),
        ];
        output.push_str(&row.join(","));
        output.push('\n');
    }

    output
}

/// Write results as CSV to `path`
pub fn export_csv(path: &Path, results: &[RiskResult]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }
    std::fs::write(path, render_csv(results))
        .with_context(|| format!("failed to write CSV export: {}", path.display()))
}

/// Truncate or pad string to fixed width (in characters)
fn truncate_or_pad(s: &str, width: usize) -> String {
    if s.chars().count() > width {
        let kept: String = s.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        format!("{:<width$}", s, width = width)
    }
}
