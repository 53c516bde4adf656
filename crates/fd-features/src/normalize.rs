//! Global scaling and year-over-year log changes.
//!
//! The fundamental block is scaled by one constant, its Frobenius norm, so the
//! relative magnitudes between fields are preserved. Year-over-year changes are
//! taken from the block before scaling, as `ln(1 + x_t / x_{t-lag})` inside
//! each entity's history.

use crate::{
    PipelineError, Result,
    missing::finite_or_null,
    panel::{DATE, Panel, SYMBOL},
};
use polars::prelude::*;
use tracing::{info, warn};

/// Prefix of normalized fundamental columns.
pub const NORM_PREFIX: &str = "norm_";

/// Prefix of year-over-year log-change columns.
pub const YOY_PREFIX: &str = "yoy_";

/// Square root of the sum of squares of all finite values in the block.
pub fn frobenius_norm(block: &Panel) -> Result<f64> {
    let mut sum_sq = 0.0;
    for name in block.value_columns() {
        let values = block.frame().column(&name)?.f64()?;
        sum_sq += values
            .into_iter()
            .flatten()
            .filter(|v| v.is_finite())
            .map(|v| v * v)
            .sum::<f64>();
    }
    Ok(sum_sq.sqrt())
}

/// Divide every value of the block by `norm`, prefixing column names.
///
/// A zero norm means the block is all zeros; it is passed through unscaled.
pub fn scale_block(block: &Panel, norm: f64) -> Result<Panel> {
    block.ensure_sorted()?;
    if !norm.is_finite() || norm < 0.0 {
        return Err(PipelineError::Computation(format!(
            "invalid normalization constant {norm}"
        )));
    }
    let divisor = if norm == 0.0 {
        warn!("fundamental block has zero norm, leaving it unscaled");
        1.0
    } else {
        norm
    };

    let mut exprs = vec![col(SYMBOL), col(DATE)];
    for name in block.value_columns() {
        exprs.push((col(name.as_str()) / lit(divisor)).alias(format!("{NORM_PREFIX}{name}")));
    }
    Panel::new(block.lazy().select(exprs).collect()?)
}

/// Normalize the block by its own Frobenius norm.
///
/// Returns the scaled block and the constant used.
pub fn normalize(block: &Panel) -> Result<(Panel, f64)> {
    let norm = frobenius_norm(block)?;
    let scaled = scale_block(block, norm)?;
    info!(norm, columns = scaled.value_columns().len(), "normalized fundamental block");
    Ok((scaled, norm))
}

/// Year-over-year log changes `ln(1 + x_t / x_{t-lag})` per entity.
///
/// Columns listed in `excluded` are skipped. The first `lag` rows of every
/// entity are undefined because the lagged value comes from a shift inside the
/// entity's own partition. Non-finite results are undefined.
pub fn yoy_log_changes(block: &Panel, lag: usize, excluded: &[String]) -> Result<Panel> {
    block.ensure_sorted()?;

    let mut exprs = vec![col(SYMBOL), col(DATE)];
    for name in block.value_columns() {
        if excluded.contains(&name) {
            continue;
        }
        let lagged = col(name.as_str()).shift(lit(lag as i64)).over([col(SYMBOL)]);
        let ratio = col(name.as_str()) / lagged;
        exprs.push(
            finite_or_null((lit(1.0) + ratio).log(std::f64::consts::E))
                .alias(format!("{YOY_PREFIX}{name}")),
        );
    }

    let changes = Panel::new(block.lazy().select(exprs).collect()?)?;
    info!(lag, columns = changes.value_columns().len(), "computed year-over-year log changes");
    Ok(changes)
}
