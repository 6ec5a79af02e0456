//! Churn risk score calculation
//!
//! Global invariants enforced:
//! - Deterministic risk calculations
//! - Every rule contributes independently and non-negatively
//! - Scores are clamped to [0, 100]

use crate::record::{CustomerFeatureRecord, SubscriptionStatus};
use serde::{Deserialize, Serialize};

/// Upper clamp for a risk score
pub const MAX_RISK_SCORE: f64 = 100.0;

/// Renewals strictly inside (0, 7) days count as "approaching"
pub const RENEWAL_WINDOW_DAYS: f64 = 7.0;

/// Customers younger than this are still onboarding
pub const NEW_CUSTOMER_DAYS: f64 = 30.0;

/// Risk level classification, ordered from lowest to highest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,      // < 30
    Medium,   // 30-60
    High,     // 60-80
    Critical, // >= 80
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
            RiskLevel::Critical => "Critical",
        }
    }

    /// All levels, lowest first
    pub const ALL: [RiskLevel; 4] = [
        RiskLevel::Low,
        RiskLevel::Medium,
        RiskLevel::High,
        RiskLevel::Critical,
    ];
}

/// Per-rule contributions to a customer's raw score
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoreBreakdown {
    pub status: f64,
    pub cancel_at_period_end: f64,
    pub payment_failures: f64,
    pub renewal: f64,
    pub payment_method: f64,
    pub tenure: f64,
}

impl ScoreBreakdown {
    /// Unclamped sum of all contributions
    pub fn raw_total(&self) -> f64 {
        self.status
            + self.cancel_at_period_end
            + self.payment_failures
            + self.renewal
            + self.payment_method
            + self.tenure
    }

    /// Final score, clamped to `MAX_RISK_SCORE`
    pub fn score(&self) -> f64 {
        self.raw_total().min(MAX_RISK_SCORE)
    }

    /// Named contributions in rule order
    pub fn contributions(&self) -> [(&'static str, f64); 6] {
        [
            ("status", self.status),
            ("cancel_at_period_end", self.cancel_at_period_end),
            ("payment_failures", self.payment_failures),
            ("renewal", self.renewal),
            ("payment_method", self.payment_method),
            ("tenure", self.tenure),
        ]
    }
}

/// Configurable rule weights
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWeights {
    pub canceled: f64,
    pub unpaid: f64,
    pub past_due: f64,
    pub no_subscription: f64,
    pub trialing: f64,
    pub cancel_at_period_end: f64,
    /// Multiplied by failed/total charges
    pub failure_rate: f64,
    pub renewal_soon: f64,
    pub renewal_overdue: f64,
    pub no_payment_method: f64,
    pub new_customer: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        ScoringWeights {
            canceled: 100.0,
            unpaid: 90.0,
            past_due: 80.0,
            no_subscription: 50.0,
            trialing: 20.0,
            cancel_at_period_end: 70.0,
            failure_rate: 40.0,
            renewal_soon: 30.0,
            renewal_overdue: 50.0,
            no_payment_method: 30.0,
            new_customer: 15.0,
        }
    }
}

/// Configurable risk level thresholds (lower bound of each level)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskThresholds {
    pub medium: f64,
    pub high: f64,
    pub critical: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        RiskThresholds {
            medium: 30.0,
            high: 60.0,
            critical: 80.0,
        }
    }
}

/// Weight for the subscription status; active and unrecognized statuses add nothing
fn status_contribution(status: &SubscriptionStatus, weights: &ScoringWeights) -> f64 {
    match status {
        SubscriptionStatus::Canceled => weights.canceled,
        SubscriptionStatus::Unpaid => weights.unpaid,
        SubscriptionStatus::PastDue => weights.past_due,
        SubscriptionStatus::None => weights.no_subscription,
        SubscriptionStatus::Trialing => weights.trialing,
        SubscriptionStatus::Active | SubscriptionStatus::Other(_) => 0.0,
    }
}

/// Overdue renewals and renewals inside the window both add risk; day 0 does not
fn renewal_contribution(days_until_renewal: f64, weights: &ScoringWeights) -> f64 {
    if days_until_renewal > 0.0 && days_until_renewal < RENEWAL_WINDOW_DAYS {
        weights.renewal_soon
    } else if days_until_renewal < 0.0 {
        weights.renewal_overdue
    } else {
        0.0
    }
}

/// Evaluate every rule against a record with custom weights
pub fn calculate_score_breakdown(
    record: &CustomerFeatureRecord,
    weights: &ScoringWeights,
) -> ScoreBreakdown {
    ScoreBreakdown {
        status: status_contribution(&record.subscription_status, weights),
        cancel_at_period_end: if record.cancel_at_period_end {
            weights.cancel_at_period_end
        } else {
            0.0
        },
        payment_failures: record.failure_rate() * weights.failure_rate,
        renewal: renewal_contribution(record.days_until_renewal, weights),
        payment_method: if record.has_default_payment_source {
            0.0
        } else {
            weights.no_payment_method
        },
        tenure: if record.customer_age_days < NEW_CUSTOMER_DAYS {
            weights.new_customer
        } else {
            0.0
        },
    }
}

/// Calculate churn risk score with default weights
///
/// Formula: sum of all rule contributions, clamped to 100.
pub fn score_record(record: &CustomerFeatureRecord) -> f64 {
    score_record_with_weights(record, &ScoringWeights::default())
}

/// Calculate churn risk score with custom weights
pub fn score_record_with_weights(record: &CustomerFeatureRecord, weights: &ScoringWeights) -> f64 {
    calculate_score_breakdown(record, weights).score()
}

/// Assign risk level based on score with default thresholds
pub fn assign_risk_level(score: f64) -> RiskLevel {
    assign_risk_level_with_thresholds(score, &RiskThresholds::default())
}

/// Assign risk level with custom thresholds
pub fn assign_risk_level_with_thresholds(score: f64, thresholds: &RiskThresholds) -> RiskLevel {
    if score < thresholds.medium {
        RiskLevel::Low
    } else if score < thresholds.high {
        RiskLevel::Medium
    } else if score < thresholds.critical {
        RiskLevel::High
    } else {
        RiskLevel::Critical
    }
}

/// Calculate complete risk analysis for a record (default weights/thresholds)
pub fn analyze_risk(record: &CustomerFeatureRecord) -> (ScoreBreakdown, f64, RiskLevel) {
    analyze_risk_with_config(record, &ScoringWeights::default(), &RiskThresholds::default())
}

/// Calculate complete risk analysis with custom weights and thresholds
pub fn analyze_risk_with_config(
    record: &CustomerFeatureRecord,
    weights: &ScoringWeights,
    thresholds: &RiskThresholds,
) -> (ScoreBreakdown, f64, RiskLevel) {
    let breakdown = calculate_score_breakdown(record, weights);
    let score = breakdown.score();
    let level = assign_risk_level_with_thresholds(score, thresholds);
    (breakdown, score, level)
}
