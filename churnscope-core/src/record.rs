//! Customer feature records
//!
//! A billing export row arrives as a [`RawCustomerRecord`] with every field
//! optional. It is resolved into a [`CustomerFeatureRecord`] exactly once;
//! scoring code never looks at a missing field.
//!
//! Global invariants enforced:
//! - Defaults are applied in one place (`RawCustomerRecord::resolve`)
//! - Resolved records are never mutated

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Subscription state of a customer's most recent subscription
///
/// Statuses the engine has no rule for are kept verbatim in `Other` so they
/// still render in reports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SubscriptionStatus {
    #[default]
    None,
    Active,
    Trialing,
    PastDue,
    Unpaid,
    Canceled,
    Other(String),
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            SubscriptionStatus::None => "none",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Trialing => "trialing",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Unpaid => "unpaid",
            SubscriptionStatus::Canceled => "canceled",
            SubscriptionStatus::Other(s) => s.as_str(),
        }
    }
}

impl From<&str> for SubscriptionStatus {
    fn from(s: &str) -> Self {
        match s.trim() {
            "" | "none" => SubscriptionStatus::None,
            "active" => SubscriptionStatus::Active,
            "trialing" => SubscriptionStatus::Trialing,
            "past_due" => SubscriptionStatus::PastDue,
            "unpaid" => SubscriptionStatus::Unpaid,
            "canceled" => SubscriptionStatus::Canceled,
            other => SubscriptionStatus::Other(other.to_string()),
        }
    }
}

impl From<String> for SubscriptionStatus {
    fn from(s: String) -> Self {
        SubscriptionStatus::from(s.as_str())
    }
}

impl From<SubscriptionStatus> for String {
    fn from(status: SubscriptionStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One customer as it appears in a billing export
///
/// Unknown fields (currency, payment method type, ...) are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCustomerRecord {
    #[serde(alias = "id")]
    pub customer_id: Option<String>,
    pub email: Option<String>,
    /// Unix seconds
    pub created: Option<i64>,
    #[serde(alias = "default_source")]
    pub has_default_payment_source: Option<bool>,
    pub subscription_status: Option<String>,
    pub cancel_at_period_end: Option<bool>,
    /// Unix seconds, 0 when the subscription never had a trial
    pub trial_end: Option<i64>,
    pub days_until_renewal: Option<f64>,
    pub failed_charges: Option<u32>,
    pub total_charges: Option<u32>,
    pub customer_age_days: Option<f64>,
}

impl RawCustomerRecord {
    /// Apply documented defaults and produce a scoreable record
    ///
    /// Returns `None` when the row has no usable customer id; the caller
    /// decides how to report that.
    pub fn resolve(self) -> Option<CustomerFeatureRecord> {
        let customer_id = self
            .customer_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())?;

        Some(CustomerFeatureRecord {
            customer_id,
            email: self.email.filter(|e| !e.trim().is_empty()),
            created: timestamp(self.created.unwrap_or(0)),
            has_default_payment_source: self.has_default_payment_source.unwrap_or(false),
            subscription_status: self
                .subscription_status
                .map(SubscriptionStatus::from)
                .unwrap_or_default(),
            cancel_at_period_end: self.cancel_at_period_end.unwrap_or(false),
            trial_end: self.trial_end.filter(|&t| t != 0).map(timestamp),
            days_until_renewal: self.days_until_renewal.unwrap_or(0.0),
            failed_charges: self.failed_charges.unwrap_or(0),
            total_charges: self.total_charges.unwrap_or(0),
            customer_age_days: self.customer_age_days.unwrap_or(0.0).max(0.0),
        })
    }
}

/// Normalized scoring input for one customer
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerFeatureRecord {
    pub customer_id: String,
    pub email: Option<String>,
    pub created: DateTime<Utc>,
    pub has_default_payment_source: bool,
    pub subscription_status: SubscriptionStatus,
    pub cancel_at_period_end: bool,
    /// `None` when the subscription never had a trial
    pub trial_end: Option<DateTime<Utc>>,
    /// Negative when the current period already lapsed
    pub days_until_renewal: f64,
    pub failed_charges: u32,
    pub total_charges: u32,
    pub customer_age_days: f64,
}

impl CustomerFeatureRecord {
    /// Record with every optional field at its default
    pub fn new(customer_id: impl Into<String>) -> Self {
        CustomerFeatureRecord {
            customer_id: customer_id.into(),
            email: None,
            created: timestamp(0),
            has_default_payment_source: false,
            subscription_status: SubscriptionStatus::None,
            cancel_at_period_end: false,
            trial_end: None,
            days_until_renewal: 0.0,
            failed_charges: 0,
            total_charges: 0,
            customer_age_days: 0.0,
        }
    }

    /// Share of charges that failed, 0.0 when there were no charges
    pub fn failure_rate(&self) -> f64 {
        if self.total_charges == 0 {
            return 0.0;
        }
        self.failed_charges as f64 / self.total_charges as f64
    }
}

/// Unix seconds to UTC; out-of-range values collapse to the epoch
fn timestamp(secs: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or_default()
}
