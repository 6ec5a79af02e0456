//! Retention recommendations
//!
//! Recommendations come from a fixed, ordered rule table. Every rule is
//! evaluated independently; the output order is the table order.
//!
//! Global invariants enforced:
//! - Same (record, score) always yields the same list
//! - The healthy fallback appears only when no rule fired, and then alone

use crate::record::CustomerFeatureRecord;
use crate::risk::{NEW_CUSTOMER_DAYS, RENEWAL_WINDOW_DAYS};
use serde::{Deserialize, Serialize};

/// Scores strictly above this trigger the critical-intervention block
pub const CRITICAL_INTERVENTION_SCORE: f64 = 80.0;

/// A single recommendation rule
#[derive(Clone, Copy)]
pub struct RecommendationRule {
    /// Stable identifier used in JSON output
    pub id: &'static str,
    pub applies: fn(&CustomerFeatureRecord, f64) -> bool,
    pub lines: &'static [&'static str],
}

fn needs_intervention(_: &CustomerFeatureRecord, score: f64) -> bool {
    score > CRITICAL_INTERVENTION_SCORE
}

fn has_payment_failures(record: &CustomerFeatureRecord, _: f64) -> bool {
    record.failed_charges > 0
}

fn is_cancelling(record: &CustomerFeatureRecord, _: f64) -> bool {
    record.cancel_at_period_end
}

fn lacks_payment_method(record: &CustomerFeatureRecord, _: f64) -> bool {
    !record.has_default_payment_source
}

fn renewal_approaching(record: &CustomerFeatureRecord, _: f64) -> bool {
    record.days_until_renewal > 0.0 && record.days_until_renewal < RENEWAL_WINDOW_DAYS
}

fn is_new_customer(record: &CustomerFeatureRecord, _: f64) -> bool {
    record.customer_age_days < NEW_CUSTOMER_DAYS
}

/// Recommendation rules in evaluation order
pub const RULES: &[RecommendationRule] = &[
    RecommendationRule {
        id: "critical-intervention",
        applies: needs_intervention,
        lines: &[
            "CRITICAL: Immediate intervention required",
            "   - Reach out personally to customer",
            "   - Offer discount or extended trial",
            "   - Review payment method issues",
        ],
    },
    RecommendationRule {
        id: "payment-failures",
        applies: has_payment_failures,
        lines: &["Payment failures detected - update payment method"],
    },
    RecommendationRule {
        id: "scheduled-cancellation",
        applies: is_cancelling,
        lines: &["Customer scheduled cancellation - offer retention deal"],
    },
    RecommendationRule {
        id: "missing-payment-method",
        applies: lacks_payment_method,
        lines: &["No payment method on file - request update"],
    },
    RecommendationRule {
        id: "renewal-approaching",
        applies: renewal_approaching,
        lines: &["Renewal approaching - send reminder and offer"],
    },
    RecommendationRule {
        id: "new-customer",
        applies: is_new_customer,
        lines: &["New customer - ensure onboarding is complete"],
    },
];

/// Id of the fallback emitted when nothing else fired
pub const HEALTHY_RULE_ID: &str = "healthy";

const HEALTHY_MESSAGE: &str = "Customer appears healthy - maintain engagement";

/// Rules that fire for a record, in table order
pub fn matching_rules(record: &CustomerFeatureRecord, score: f64) -> Vec<&'static RecommendationRule> {
    RULES
        .iter()
        .filter(|rule| (rule.applies)(record, score))
        .collect()
}

/// Ordered recommendation lines for a record
pub fn recommendations(record: &CustomerFeatureRecord, score: f64) -> Vec<String> {
    let lines: Vec<String> = matching_rules(record, score)
        .into_iter()
        .flat_map(|rule| rule.lines.iter().map(|line| line.to_string()))
        .collect();

    if lines.is_empty() {
        return vec![HEALTHY_MESSAGE.to_string()];
    }
    lines
}

/// Recommendations for one high-risk customer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct CustomerRecommendations {
    pub customer_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub risk_score: f64,
    /// Ids of the rules that fired, or `healthy`
    pub rules: Vec<String>,
    pub recommendations: Vec<String>,
}

impl CustomerRecommendations {
    pub fn new(record: &CustomerFeatureRecord, score: f64) -> Self {
        let mut rules: Vec<String> = matching_rules(record, score)
            .iter()
            .map(|rule| rule.id.to_string())
            .collect();
        if rules.is_empty() {
            rules.push(HEALTHY_RULE_ID.to_string());
        }

        CustomerRecommendations {
            customer_id: record.customer_id.clone(),
            email: record.email.clone(),
            risk_score: crate::report::round_to(score, 2),
            rules,
            recommendations: recommendations(record, score),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::SubscriptionStatus;

    fn healthy(id: &str) -> CustomerFeatureRecord {
        CustomerFeatureRecord {
            subscription_status: SubscriptionStatus::Active,
            has_default_payment_source: true,
            days_until_renewal: 20.0,
            total_charges: 10,
            customer_age_days: 365.0,
            ..CustomerFeatureRecord::new(id)
        }
    }

    #[test]
    fn test_healthy_fallback_is_alone() {
        let recs = recommendations(&healthy("cus_ok"), 0.0);
        assert_eq!(recs, vec![HEALTHY_MESSAGE.to_string()]);
    }

    #[test]
    fn test_rules_one_three_five_in_order() {
        let record = CustomerFeatureRecord {
            cancel_at_period_end: true,
            days_until_renewal: 3.0,
            ..healthy("cus_135")
        };
        let ids: Vec<&str> = matching_rules(&record, 85.0).iter().map(|r| r.id).collect();
        assert_eq!(
            ids,
            vec![
                "critical-intervention",
                "scheduled-cancellation",
                "renewal-approaching"
            ]
        );

        let recs = recommendations(&record, 85.0);
        assert_eq!(recs.len(), 6);
        assert_eq!(recs[0], "CRITICAL: Immediate intervention required");
        assert_eq!(recs[3], "   - Review payment method issues");
        assert_eq!(recs[4], "Customer scheduled cancellation - offer retention deal");
        assert_eq!(recs[5], "Renewal approaching - send reminder and offer");
        assert!(!recs.iter().any(|r| r.contains("healthy")));
    }

    #[test]
    fn test_critical_block_needs_score_above_80() {
        let record = healthy("cus_edge");
        assert!(matching_rules(&record, 80.0).is_empty());
        assert_eq!(matching_rules(&record, 80.01).len(), 1);
    }

    #[test]
    fn test_every_rule_fires_in_table_order() {
        let record = CustomerFeatureRecord {
            failed_charges: 1,
            total_charges: 2,
            cancel_at_period_end: true,
            has_default_payment_source: false,
            days_until_renewal: 1.0,
            customer_age_days: 2.0,
            ..healthy("cus_all")
        };
        let ids: Vec<&str> = matching_rules(&record, 100.0).iter().map(|r| r.id).collect();
        let expected: Vec<&str> = RULES.iter().map(|r| r.id).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_renewal_rule_excludes_overdue_and_day_zero() {
        for days in [0.0, -1.0, 7.0] {
            let record = CustomerFeatureRecord {
                days_until_renewal: days,
                ..healthy("cus_renew")
            };
            assert!(
                !matching_rules(&record, 10.0)
                    .iter()
                    .any(|r| r.id == "renewal-approaching"),
                "days={days}"
            );
        }
    }

    #[test]
    fn test_customer_recommendations_names_rules() {
        let record = CustomerFeatureRecord {
            failed_charges: 2,
            ..healthy("cus_pay")
        };
        let view = CustomerRecommendations::new(&record, 8.0);
        assert_eq!(view.rules, vec!["payment-failures".to_string()]);
        assert_eq!(view.risk_score, 8.0);

        let healthy_view = CustomerRecommendations::new(&healthy("cus_ok"), 0.0);
        assert_eq!(healthy_view.rules, vec![HEALTHY_RULE_ID.to_string()]);
    }

    #[test]
    fn test_recommendations_are_deterministic() {
        let record = CustomerFeatureRecord::new("cus_same");
        assert_eq!(recommendations(&record, 95.0), recommendations(&record, 95.0));
    }
}
