//! Summary counts over a report
//!
//! Global invariants enforced:
//! - Summaries are strictly derived (computed from results, never stored)
//! - Bucket counts always sum to the total

use crate::report::RiskResult;
use crate::risk::RiskLevel;
use serde::{Deserialize, Serialize};

/// Number of customers per risk level
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct RiskSummary {
    pub total: usize,
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    pub critical: usize,
}

impl RiskSummary {
    /// Count results per level
    pub fn from_results(results: &[RiskResult]) -> Self {
        results.iter().fold(RiskSummary::default(), |mut summary, result| {
            summary.total += 1;
            match result.risk_level {
                RiskLevel::Low => summary.low += 1,
                RiskLevel::Medium => summary.medium += 1,
                RiskLevel::High => summary.high += 1,
                RiskLevel::Critical => summary.critical += 1,
            }
            summary
        })
    }

    pub fn count(&self, level: RiskLevel) -> usize {
        match level {
            RiskLevel::Low => self.low,
            RiskLevel::Medium => self.medium,
            RiskLevel::High => self.high,
            RiskLevel::Critical => self.critical,
        }
    }

    /// High and Critical customers combined
    pub fn high_plus(&self) -> usize {
        self.high + self.critical
    }
}
