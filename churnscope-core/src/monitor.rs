//! Periodic churn checks
//!
//! One check re-reads the source, runs the full analysis and picks out the
//! Critical customers as alerts. Scheduling lives in the CLI.

use crate::aggregates::RiskSummary;
use crate::config::ResolvedConfig;
use crate::error::SourceResult;
use crate::report::RiskResult;
use crate::source::{FetchOptions, RecordSource};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Result of one monitor check
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CheckOutcome {
    pub checked_at: DateTime<Utc>,
    pub summary: RiskSummary,
    /// Critical customers in report order
    pub alerts: Vec<RiskResult>,
}

impl CheckOutcome {
    pub fn has_alerts(&self) -> bool {
        !self.alerts.is_empty()
    }
}

/// Run a single check against `source`
pub fn run_check(
    source: &dyn RecordSource,
    options: &FetchOptions,
    config: &ResolvedConfig,
    now: DateTime<Utc>,
) -> SourceResult<CheckOutcome> {
    log::info!("running churn check against {}", source.describe());

    let analysis = crate::analyze_source(source, options, config)?;
    let alerts: Vec<RiskResult> = analysis.report.critical().cloned().collect();
    for alert in &alerts {
        log::warn!(
            "critical churn risk: {} ({:.1}%)",
            alert.display_name(),
            alert.risk_score
        );
    }

    Ok(CheckOutcome {
        checked_at: now,
        summary: analysis.report.summary(),
        alerts,
    })
}

/// Time of the check after one that ran at `last`
pub fn next_check(last: DateTime<Utc>, interval_hours: u32) -> DateTime<Utc> {
    last + Duration::hours(i64::from(interval_hours))
}

/// Render a check outcome for the terminal
pub fn render_outcome(outcome: &CheckOutcome) -> String {
    let mut output = format!(
        "[{}] Checked {} customers\n",
        outcome.checked_at.format("%Y-%m-%d %H:%M:%S"),
        outcome.summary.total
    );

    if outcome.has_alerts() {
        output.push_str(&format!(
            "ALERT: {} critical risk customers found!\n",
            outcome.alerts.len()
        ));
        for alert in &outcome.alerts {
            output.push_str(&format!(
                "   - {}: {:.1}% risk\n",
                alert.display_name(),
                alert.risk_score
            ));
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use crate::record::{CustomerFeatureRecord, SubscriptionStatus};
    use crate::source::InMemorySource;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap()
    }

    fn healthy(id: &str) -> CustomerFeatureRecord {
        CustomerFeatureRecord {
            subscription_status: SubscriptionStatus::Active,
            has_default_payment_source: true,
            days_until_renewal: 20.0,
            customer_age_days: 365.0,
            ..CustomerFeatureRecord::new(id)
        }
    }

    #[test]
    fn test_check_alerts_on_critical_only() {
        let source = InMemorySource::new(vec![
            healthy("cus_ok"),
            CustomerFeatureRecord {
                subscription_status: SubscriptionStatus::Canceled,
                email: Some("gone@example.com".to_string()),
                ..healthy("cus_gone")
            },
            CustomerFeatureRecord {
                // 20 + 30 + 15 = 65, High but not Critical
                subscription_status: SubscriptionStatus::Trialing,
                has_default_payment_source: false,
                customer_age_days: 3.0,
                ..healthy("cus_trial")
            },
        ]);

        let outcome = run_check(
            &source,
            &FetchOptions::default(),
            &ResolvedConfig::defaults(),
            at(9),
        )
        .unwrap();

        assert_eq!(outcome.summary.total, 3);
        assert_eq!(outcome.summary.high, 1);
        assert_eq!(outcome.alerts.len(), 1);
        assert_eq!(outcome.alerts[0].customer_id, "cus_gone");

        let text = render_outcome(&outcome);
        assert!(text.starts_with("[2024-03-01 09:00:00] Checked 3 customers\n"));
        assert!(text.contains("ALERT: 1 critical risk customers found!"));
        assert!(text.contains("   - gone@example.com: 100.0% risk"));
    }

    #[test]
    fn test_quiet_check_has_no_alert_section() {
        let source = InMemorySource::new(vec![healthy("cus_ok")]);
        let outcome = run_check(
            &source,
            &FetchOptions::default(),
            &ResolvedConfig::defaults(),
            at(9),
        )
        .unwrap();
        assert!(!outcome.has_alerts());
        assert!(!render_outcome(&outcome).contains("ALERT"));
    }

    #[test]
    fn test_check_propagates_source_errors() {
        let source = InMemorySource::new(vec![healthy("a"), healthy("a")]);
        let result = run_check(
            &source,
            &FetchOptions::default(),
            &ResolvedConfig::defaults(),
            at(9),
        );
        assert!(matches!(result, Err(SourceError::DuplicateCustomerId { .. })));
    }

    #[test]
    fn test_next_check_adds_interval() {
        assert_eq!(next_check(at(1), 6), at(7));
        assert_eq!(next_check(at(0), 24), at(0) + Duration::days(1));
    }
}
