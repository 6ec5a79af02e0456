//! churnscope core library - rule-based customer churn risk scoring

#![deny(warnings)]

// Global invariants enforced in this crate:
// - Scoring is strictly per-record
// - No global mutable state
// - No randomness, clocks, threads, or async in the scoring path
// - Deterministic ordering must be explicit
// - Identical input yields byte-for-byte identical output

pub mod aggregates;
pub mod config;
pub mod error;
pub mod monitor;
pub mod recommend;
pub mod record;
pub mod report;
pub mod risk;
pub mod source;

pub use aggregates::RiskSummary;
pub use config::ResolvedConfig;
pub use error::{SourceError, SourceResult};
pub use record::{CustomerFeatureRecord, RawCustomerRecord, SubscriptionStatus};
pub use report::{render_json, render_text, Analysis, Report, RiskResult};
pub use risk::RiskLevel;
pub use source::{FetchOptions, InMemorySource, JsonExportSource, RecordSource};

use recommend::CustomerRecommendations;
use report::ScoredRecord;

/// Score, classify and aggregate a list of records
///
/// Recommendations are produced for every record at level High or above,
/// in report order.
pub fn analyze(records: &[CustomerFeatureRecord], config: &ResolvedConfig) -> Analysis {
    let scored: Vec<ScoredRecord<'_>> = records
        .iter()
        .map(|record| ScoredRecord::new(record, &config.weights, &config.thresholds))
        .inspect(|s| {
            log::debug!(
                "scored {}: {:.2} ({})",
                s.record.customer_id,
                s.score,
                s.level.as_str()
            )
        })
        .collect();
    let ranked = report::sort_scored(scored);

    let report = report::build_report(&ranked);

    let recommendations: Vec<CustomerRecommendations> = ranked
        .iter()
        .filter(|s| s.level >= RiskLevel::High)
        .map(|s| CustomerRecommendations::new(s.record, s.score))
        .collect();

    let summary = report.summary();
    log::info!(
        "analyzed {} customers: {} low, {} medium, {} high, {} critical ({} need attention)",
        summary.total,
        summary.low,
        summary.medium,
        summary.high,
        summary.critical,
        summary.high_plus()
    );

    Analysis {
        report,
        recommendations,
    }
}

/// Fetch records from a source and analyze them
///
/// A fetch failure is returned as-is; a fetch that yields zero records is a
/// successful `Report::NoData` analysis.
pub fn analyze_source(
    source: &dyn RecordSource,
    options: &FetchOptions,
    config: &ResolvedConfig,
) -> SourceResult<Analysis> {
    let records = source.fetch(options).map_err(|e| {
        log::error!("failed to fetch customers from {}: {}", source.describe(), e);
        e
    })?;
    Ok(analyze(&records, config))
}
