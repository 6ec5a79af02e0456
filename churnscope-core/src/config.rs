//! Configuration file support for churnscope
//!
//! Loads scoring weights, risk thresholds and fetch limits from JSON files.
//!
//! Search order:
//! 1. Explicit path (--config CLI flag)
//! 2. `.churnscoperc.json` in the working directory
//! 3. `churnscope.config.json` in the working directory
//!
//! All fields are optional. CLI flags take precedence over config file values.

use crate::risk::{RiskThresholds, ScoringWeights, MAX_RISK_SCORE};
use crate::source::DEFAULT_LIMIT;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file names searched for during discovery, in priority order
pub const CONFIG_FILE_NAMES: [&str; 2] = [".churnscoperc.json", "churnscope.config.json"];

/// churnscope configuration loaded from a JSON config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChurnscopeConfig {
    /// Custom rule weights
    #[serde(default)]
    pub weights: Option<WeightConfig>,

    /// Custom risk level thresholds
    #[serde(default)]
    pub thresholds: Option<ThresholdConfig>,

    /// Maximum number of customers fetched per run (default: 100)
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Custom rule weights; unset fields keep their defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WeightConfig {
    /// Subscription canceled (default: 100)
    pub canceled: Option<f64>,
    /// Subscription unpaid (default: 90)
    pub unpaid: Option<f64>,
    /// Subscription past due (default: 80)
    pub past_due: Option<f64>,
    /// No subscription at all (default: 50)
    pub no_subscription: Option<f64>,
    /// Subscription still in trial (default: 20)
    pub trialing: Option<f64>,
    /// Cancellation scheduled at period end (default: 70)
    pub cancel_at_period_end: Option<f64>,
    /// Multiplier for the failed/total charge ratio (default: 40)
    pub failure_rate: Option<f64>,
    /// Renewal within the next 7 days (default: 30)
    pub renewal_soon: Option<f64>,
    /// Renewal date already passed (default: 50)
    pub renewal_overdue: Option<f64>,
    /// No default payment source (default: 30)
    pub no_payment_method: Option<f64>,
    /// Customer younger than 30 days (default: 15)
    pub new_customer: Option<f64>,
}

impl WeightConfig {
    fn entries(&self) -> [(&'static str, Option<f64>); 11] {
        [
            ("canceled", self.canceled),
            ("unpaid", self.unpaid),
            ("past_due", self.past_due),
            ("no_subscription", self.no_subscription),
            ("trialing", self.trialing),
            ("cancel_at_period_end", self.cancel_at_period_end),
            ("failure_rate", self.failure_rate),
            ("renewal_soon", self.renewal_soon),
            ("renewal_overdue", self.renewal_overdue),
            ("no_payment_method", self.no_payment_method),
            ("new_customer", self.new_customer),
        ]
    }

    /// Overlay the set fields on top of `base`
    fn apply(&self, base: ScoringWeights) -> ScoringWeights {
        ScoringWeights {
            canceled: self.canceled.unwrap_or(base.canceled),
            unpaid: self.unpaid.unwrap_or(base.unpaid),
            past_due: self.past_due.unwrap_or(base.past_due),
            no_subscription: self.no_subscription.unwrap_or(base.no_subscription),
            trialing: self.trialing.unwrap_or(base.trialing),
            cancel_at_period_end: self.cancel_at_period_end.unwrap_or(base.cancel_at_period_end),
            failure_rate: self.failure_rate.unwrap_or(base.failure_rate),
            renewal_soon: self.renewal_soon.unwrap_or(base.renewal_soon),
            renewal_overdue: self.renewal_overdue.unwrap_or(base.renewal_overdue),
            no_payment_method: self.no_payment_method.unwrap_or(base.no_payment_method),
            new_customer: self.new_customer.unwrap_or(base.new_customer),
        }
    }
}

/// Custom risk level thresholds (lower bound of each level)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThresholdConfig {
    /// Score where Medium starts (default: 30)
    pub medium: Option<f64>,
    /// Score where High starts (default: 60)
    pub high: Option<f64>,
    /// Score where Critical starts (default: 80)
    pub critical: Option<f64>,
}

impl ThresholdConfig {
    fn apply(&self, base: RiskThresholds) -> RiskThresholds {
        RiskThresholds {
            medium: self.medium.unwrap_or(base.medium),
            high: self.high.unwrap_or(base.high),
            critical: self.critical.unwrap_or(base.critical),
        }
    }
}

/// Configuration with every value filled in
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub weights: ScoringWeights,
    pub thresholds: RiskThresholds,
    pub limit: usize,
    /// Path the config was loaded from (None if defaults)
    pub config_path: Option<PathBuf>,
}

impl ChurnscopeConfig {
    /// Validate the configuration for logical errors
    pub fn validate(&self) -> Result<()> {
        // Weights are non-negative and no larger than a full score
        if let Some(ref w) = self.weights {
            for (name, val) in w.entries() {
                if let Some(v) = val {
                    if v < 0.0 {
                        anyhow::bail!("weights.{} must be non-negative (got {})", name, v);
                    }
                    if v > MAX_RISK_SCORE {
                        anyhow::bail!(
                            "weights.{} must be at most {} (got {})",
                            name,
                            MAX_RISK_SCORE,
                            v
                        );
                    }
                }
            }
        }

        // Thresholds stay inside (0, 100] and strictly increase
        if let Some(ref t) = self.thresholds {
            let resolved = t.apply(RiskThresholds::default());
            for (name, val) in [
                ("medium", resolved.medium),
                ("high", resolved.high),
                ("critical", resolved.critical),
            ] {
                if val <= 0.0 || val > MAX_RISK_SCORE {
                    anyhow::bail!(
                        "thresholds.{} must be in (0, {}] (got {})",
                        name,
                        MAX_RISK_SCORE,
                        val
                    );
                }
            }
            if resolved.medium >= resolved.high {
                anyhow::bail!(
                    "thresholds.medium ({}) must be less than thresholds.high ({})",
                    resolved.medium,
                    resolved.high
                );
            }
            if resolved.high >= resolved.critical {
                anyhow::bail!(
                    "thresholds.high ({}) must be less than thresholds.critical ({})",
                    resolved.high,
                    resolved.critical
                );
            }
        }

        if self.limit == Some(0) {
            anyhow::bail!("limit must be at least 1");
        }

        Ok(())
    }

    /// Resolve config into the form used by scoring
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        self.validate()?;

        let weights = match &self.weights {
            Some(w) => w.apply(ScoringWeights::default()),
            None => ScoringWeights::default(),
        };
        let thresholds = match &self.thresholds {
            Some(t) => t.apply(RiskThresholds::default()),
            None => RiskThresholds::default(),
        };

        Ok(ResolvedConfig {
            weights,
            thresholds,
            limit: self.limit.unwrap_or(DEFAULT_LIMIT),
            config_path: None,
        })
    }
}

impl ResolvedConfig {
    /// Built-in weights, thresholds and limit (no config file)
    pub fn defaults() -> Self {
        ResolvedConfig {
            weights: ScoringWeights::default(),
            thresholds: RiskThresholds::default(),
            limit: DEFAULT_LIMIT,
            config_path: None,
        }
    }
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self::defaults()
    }
}

/// Pick the config file to use, if any
///
/// An explicit path always wins, even when it does not exist, so a typo in
/// `--config` surfaces as a read error instead of silently falling back.
/// Otherwise the first of `CONFIG_FILE_NAMES` present in `dir` is used.
pub fn locate_config(dir: &Path, explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => CONFIG_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|candidate| candidate.is_file()),
    }
}

/// Discover and load a config file from a directory
///
/// Returns `None` if no config file is found (use defaults).
pub fn discover_config(dir: &Path) -> Result<Option<(ChurnscopeConfig, PathBuf)>> {
    locate_config(dir, None)
        .map(|path| load_config_file(&path).map(|config| (config, path)))
        .transpose()
}

/// Read, parse and validate one config file
///
/// Every failure carries the file path as its outermost context.
pub fn load_config_file(path: &Path) -> Result<ChurnscopeConfig> {
    std::fs::read_to_string(path)
        .context("cannot read file")
        .and_then(|content| {
            serde_json::from_str::<ChurnscopeConfig>(&content).context("not a valid config document")
        })
        .and_then(|config| config.validate().map(|()| config))
        .with_context(|| format!("config file {}", path.display()))
}

/// Resolve the configuration for a run started in `dir`
///
/// Falls back to built-in defaults when `locate_config` finds nothing.
pub fn load_and_resolve(dir: &Path, config_path: Option<&Path>) -> Result<ResolvedConfig> {
    let Some(path) = locate_config(dir, config_path) else {
        log::debug!("no config file in {}, using defaults", dir.display());
        return Ok(ResolvedConfig::defaults());
    };

    let resolved = ResolvedConfig {
        config_path: Some(path.clone()),
        ..load_config_file(&path)?.resolve()?
    };
    log::debug!("config resolved from {}", path.display());
    Ok(resolved)
}
