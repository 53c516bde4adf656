//! Per-entity price momentum.
//!
//! Percent changes are computed over row distance inside each entity's own
//! sorted history: `shift(k).over(symbol)` never reaches into the preceding
//! entity's rows, so the first `k` observations of every entity are undefined.

use crate::{
    PipelineConfig, Result,
    missing::finite_or_null,
    panel::{DATE, Panel, SYMBOL},
};
use polars::prelude::*;
use tracing::info;

/// Percent change of `price` over each lookback, within each entity.
///
/// Output columns are `pct_change_{k}`, computed as
/// `price_t / price_{t-k} - 1`. A zero or undefined prior price yields an
/// undefined value.
pub fn price_momentum(panel: &Panel, price: &str, lookbacks: &[usize]) -> Result<Panel> {
    panel.ensure_sorted()?;
    panel.require_columns(&[price])?;

    let mut exprs = vec![col(SYMBOL), col(DATE)];
    for &k in lookbacks {
        let lagged = col(price).shift(lit(k as i64)).over([col(SYMBOL)]);
        exprs.push(
            finite_or_null((col(price) / lagged) - lit(1.0))
                .alias(PipelineConfig::momentum_column(k)),
        );
    }

    let block = Panel::new(panel.lazy().select(exprs).collect()?)?;
    info!(lookbacks = ?lookbacks, rows = block.height(), "computed price momentum");
    Ok(block)
}
