//! Pipeline configuration.
//!
//! Every parameter has a default matching the quarterly Compustat extract the
//! pipeline was built for. Configurations can be loaded from JSON; missing keys
//! fall back to defaults. Validation happens in [`PipelineConfig::validate`],
//! which [`crate::FeaturePipeline::new`] calls before any data is touched.

use crate::{PipelineError, Result, period::QuarterAnchor};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Column layout of the raw input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Entity identifier column (default: `tic`)
    pub entity_column: String,
    /// Raw date column, encoded `YYYYMMDD` (default: `datadate`)
    pub date_column: String,
    /// First column of the fundamental field range (default: `actq`)
    pub first_field: String,
    /// Last column of the fundamental field range; `None` runs to the last column
    pub last_field: Option<String>,
    /// Columns dropped unconditionally from the field range
    pub excluded_fields: Vec<String>,
    /// Month scheme the raw dates are snapped to
    pub anchor: QuarterAnchor,
    /// Day of month every canonical period is pinned to (1..=28)
    pub anchor_day: u32,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            entity_column: "tic".to_string(),
            date_column: "datadate".to_string(),
            first_field: "actq".to_string(),
            last_field: None,
            // quarterly high/low price, company status, and the utility
            // accounts-payable column which is empty for this universe
            excluded_fields: ["prchq", "prclq", "costat", "uaptq"]
                .into_iter()
                .map(String::from)
                .collect(),
            anchor: QuarterAnchor::QuarterEnd,
            anchor_day: 28,
        }
    }
}

/// Raw columns read by the derived fundamental formulas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldMap {
    /// Total assets (default: `atq`)
    pub total_assets: String,
    /// Total liabilities (default: `ltq`)
    pub total_liabilities: String,
    /// Common shares outstanding (default: `cshoq`)
    pub shares_outstanding: String,
    /// Quarter close price per share (default: `prccq`)
    pub price: String,
    /// Debt in current liabilities (default: `dlcq`)
    pub current_debt: String,
    /// Long-term debt (default: `dlttq`)
    pub long_term_debt: String,
    /// Preferred stock (default: `pstkq`)
    pub preferred_shares: String,
    /// Noncontrolling interest (default: `mibq`)
    pub noncontrolling_interest: String,
    /// Cash and short-term investments (default: `cheq`)
    pub cash: String,
    /// Operating income after depreciation (default: `oiadpq`)
    pub operating_income: String,
}

impl Default for FieldMap {
    fn default() -> Self {
        Self {
            total_assets: "atq".to_string(),
            total_liabilities: "ltq".to_string(),
            shares_outstanding: "cshoq".to_string(),
            price: "prccq".to_string(),
            current_debt: "dlcq".to_string(),
            long_term_debt: "dlttq".to_string(),
            preferred_shares: "pstkq".to_string(),
            noncontrolling_interest: "mibq".to_string(),
            cash: "cheq".to_string(),
            operating_income: "oiadpq".to_string(),
        }
    }
}

impl FieldMap {
    /// All mapped raw columns, in formula order.
    pub fn columns(&self) -> [&str; 10] {
        [
            self.total_assets.as_str(),
            self.total_liabilities.as_str(),
            self.shares_outstanding.as_str(),
            self.price.as_str(),
            self.current_debt.as_str(),
            self.long_term_debt.as_str(),
            self.preferred_shares.as_str(),
            self.noncontrolling_interest.as_str(),
            self.cash.as_str(),
            self.operating_income.as_str(),
        ]
    }
}

/// Full pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Raw file layout
    pub loader: LoaderConfig,
    /// Raw columns used by the derived fundamentals
    pub fields: FieldMap,
    /// Percent-change lookbacks in periods (default: 1, 2, 3, 4)
    pub momentum_lookbacks: Vec<usize>,
    /// Columns ranked cross-sectionally per period
    pub rank_columns: Vec<String>,
    /// Maximum run of consecutive gaps a forward-fill may cover (default: 1)
    pub fill_limit: usize,
    /// Lag of the year-over-year log-change features (default: 4)
    pub yoy_lag: usize,
    /// Columns left out of the year-over-year block
    pub yoy_excluded: Vec<String>,
    /// Forward horizon of the label in periods (default: 4)
    pub label_horizon: usize,
    /// Append the pre-fill fundamental missingness indicators to the matrix
    pub include_fundamental_indicators: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            loader: LoaderConfig::default(),
            fields: FieldMap::default(),
            momentum_lookbacks: vec![1, 2, 3, 4],
            rank_columns: [
                "pct_change_1",
                "pct_change_2",
                "pct_change_3",
                "pct_change_4",
                "book_to_market",
                "earnings_yield",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            fill_limit: 1,
            yoy_lag: 4,
            yoy_excluded: vec!["earnings_yield".to_string()],
            label_horizon: 4,
            include_fundamental_indicators: false,
        }
    }
}

impl PipelineConfig {
    /// Parse a configuration from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| PipelineError::config("config", e.to_string()))
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Name of the percent-change column for a lookback.
    pub fn momentum_column(lookback: usize) -> String {
        format!("pct_change_{lookback}")
    }

    /// Largest number of prior periods any stage reaches back or forward.
    pub fn max_lookback(&self) -> usize {
        self.momentum_lookbacks
            .iter()
            .copied()
            .chain([self.yoy_lag, self.label_horizon])
            .max()
            .unwrap_or(0)
    }

    /// Check parameter ranges and cross-parameter consistency.
    pub fn validate(&self) -> Result<()> {
        if self.fill_limit == 0 {
            return Err(PipelineError::config("fill_limit", "must be at least 1"));
        }
        if self.momentum_lookbacks.is_empty() {
            return Err(PipelineError::config(
                "momentum_lookbacks",
                "at least one lookback is required",
            ));
        }
        if self.momentum_lookbacks.contains(&0) {
            return Err(PipelineError::config(
                "momentum_lookbacks",
                "lookbacks must be at least 1",
            ));
        }
        if self.yoy_lag == 0 {
            return Err(PipelineError::config("yoy_lag", "must be at least 1"));
        }
        if !self.momentum_lookbacks.contains(&self.label_horizon) {
            return Err(PipelineError::config(
                "label_horizon",
                format!(
                    "{} is not one of the momentum lookbacks {:?}",
                    self.label_horizon, self.momentum_lookbacks
                ),
            ));
        }
        if !(1..=28).contains(&self.loader.anchor_day) {
            return Err(PipelineError::config(
                "loader.anchor_day",
                format!("{} is outside 1..=28", self.loader.anchor_day),
            ));
        }

        let rankable: Vec<String> = self
            .momentum_lookbacks
            .iter()
            .map(|&k| Self::momentum_column(k))
            .chain(
                crate::fundamentals::DERIVED_COLUMNS
                    .iter()
                    .map(|c| c.to_string()),
            )
            .collect();
        if let Some(unknown) = self.rank_columns.iter().find(|c| !rankable.contains(c)) {
            return Err(PipelineError::config(
                "rank_columns",
                format!("{unknown} is neither a momentum nor a derived column"),
            ));
        }

        Ok(())
    }
}
