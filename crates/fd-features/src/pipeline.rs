//! Pipeline driver.
//!
//! Stages run strictly in dependency order, each taking the previous panels by
//! reference and returning a new one:
//!
//! ```text
//! load -> momentum ─┬─> ranks ───────────────────────────┐
//!      -> derived ──┤                                     ├─> assemble -> X
//!                   └─> indicators, fill -> normalize/yoy ┘
//!         momentum ─────────────────────────> labels ─────────────────> y
//! ```

use crate::{
    PipelineConfig, PipelineError, Result,
    assemble::{assemble_features, to_matrix},
    fundamentals::derive_fundamentals,
    label::{LABEL, outperformance_labels},
    loader::load_csv,
    missing::{fill_missing, missingness_indicator},
    momentum::price_momentum,
    normalize::{normalize, yoy_log_changes},
    panel::{Panel, PanelKey},
    rank::cross_sectional_ranks,
};
use ndarray::{Array1, Array2};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info};

/// Feature matrix, labels and their row keys.
///
/// Row `i` of [`FeatureSet::features`] and element `i` of
/// [`FeatureSet::labels`] both describe [`FeatureSet::keys`]`[i]`.
#[derive(Debug, Clone)]
pub struct FeatureSet {
    keys: Vec<PanelKey>,
    columns: Vec<String>,
    features: Array2<f64>,
    labels: Array1<u8>,
    fundamental_missing: Panel,
    norm: f64,
}

impl FeatureSet {
    /// Row keys, entity-major and period-minor.
    pub fn keys(&self) -> &[PanelKey] {
        &self.keys
    }

    /// Feature column names, in matrix column order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Feature matrix `X`, one row per key.
    pub const fn features(&self) -> &Array2<f64> {
        &self.features
    }

    /// Binary outperformance labels `y`, one per key.
    pub const fn labels(&self) -> &Array1<u8> {
        &self.labels
    }

    /// 0/1 indicators of the fundamental and momentum cells that were
    /// undefined before the fill policy ran.
    pub const fn fundamental_missing(&self) -> &Panel {
        &self.fundamental_missing
    }

    /// Frobenius norm the fundamental block was divided by.
    pub const fn norm(&self) -> f64 {
        self.norm
    }

    /// Share of rows labelled 1.
    pub fn positive_rate(&self) -> f64 {
        if self.labels.is_empty() {
            return 0.0;
        }
        self.labels.iter().map(|&y| f64::from(y)).sum::<f64>() / self.labels.len() as f64
    }

    /// Consume the set and return `(X, y)`.
    pub fn into_arrays(self) -> (Array2<f64>, Array1<u8>) {
        (self.features, self.labels)
    }
}

/// Validated feature pipeline.
#[derive(Debug, Clone)]
pub struct FeaturePipeline {
    config: PipelineConfig,
}

impl FeaturePipeline {
    /// Create a pipeline, rejecting invalid configuration up front.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        debug!(?config, "pipeline configured");
        Ok(Self { config })
    }

    /// Configuration in use.
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load a raw CSV file with this pipeline's loader settings.
    pub fn load(
        &self,
        path: impl AsRef<Path>,
        universe: Option<&BTreeSet<String>>,
    ) -> Result<Panel> {
        load_csv(path, &self.config.loader, universe)
    }

    /// Load a raw CSV file and run every stage on it.
    pub fn run_csv(
        &self,
        path: impl AsRef<Path>,
        universe: Option<&BTreeSet<String>>,
    ) -> Result<FeatureSet> {
        let panel = self.load(path, universe)?;
        self.run(&panel)
    }

    /// Run every stage on a loaded panel of raw fields.
    pub fn run(&self, panel: &Panel) -> Result<FeatureSet> {
        let config = &self.config;
        panel.ensure_sorted()?;

        let required = config.max_lookback() + 1;
        let available = panel.longest_history()?;
        if available < required {
            return Err(PipelineError::InsufficientData {
                required,
                available,
            });
        }

        let momentum = price_momentum(panel, &config.fields.price, &config.momentum_lookbacks)?;
        let derived = derive_fundamentals(panel, &config.fields)?;
        let fundamentals = panel.hstack(&[("derived", &derived)])?;
        drop(derived);

        let observed = fundamentals.hstack(&[("momentum", &momentum)])?;
        let ranks = cross_sectional_ranks(&observed, &config.rank_columns)?;
        let fundamental_missing = missingness_indicator(&observed)?;
        drop(observed);

        let filled = fill_missing(&fundamentals, config.fill_limit)?;
        drop(fundamentals);
        let (normalized, norm) = normalize(&filled)?;
        let yoy = yoy_log_changes(&filled, config.yoy_lag, &config.yoy_excluded)?;
        drop(filled);

        let labels = outperformance_labels(&momentum, config.label_horizon)?;
        drop(momentum);

        let extra = config
            .include_fundamental_indicators
            .then_some(&fundamental_missing);
        let assembled = assemble_features(&yoy, &ranks, &normalized, extra, config.fill_limit)?;
        assembled.ensure_aligned(&labels, "labels")?;

        let labels: Array1<u8> = labels
            .frame()
            .column(LABEL)?
            .i32()?
            .into_iter()
            .enumerate()
            .map(|(row, y)| {
                y.map(|y| u8::from(y == 1))
                    .ok_or_else(|| PipelineError::Computation(format!("undefined label at row {row}")))
            })
            .collect::<Result<_>>()?;

        let features = FeatureSet {
            keys: assembled.keys()?,
            columns: assembled.value_columns(),
            features: to_matrix(&assembled)?,
            labels,
            fundamental_missing,
            norm,
        };
        info!(
            rows = features.keys.len(),
            features = features.columns.len(),
            positive_rate = features.positive_rate(),
            "feature pipeline complete"
        );
        Ok(features)
    }
}
