//! Missing-value policy.
//!
//! Undefined cells are polars nulls. The policy runs in two stages inside each
//! entity's history: a forward-fill bounded by a maximum run length, then a
//! zero-fill of whatever is still undefined. Missingness indicators are
//! captured from the block before any fill touches it.

use crate::{
    Result,
    panel::{DATE, Panel, SYMBOL},
};
use polars::prelude::*;
use tracing::{debug, info};

/// Prefix of missingness indicator columns.
pub const MISSING_PREFIX: &str = "missing_";

/// Replace NaN and ±inf with null so they are treated as missing data.
pub fn finite_or_null(expr: Expr) -> Expr {
    when(expr.clone().is_finite())
        .then(expr)
        .otherwise(lit(NULL))
}

/// 0/1 indicator block marking the undefined cells of every value column.
///
/// Columns are named `missing_{column}` and are always complete.
pub fn missingness_indicator(block: &Panel) -> Result<Panel> {
    block.ensure_sorted()?;

    let mut exprs = vec![col(SYMBOL), col(DATE)];
    for name in block.value_columns() {
        exprs.push(
            col(name.as_str())
                .is_null()
                .cast(DataType::Float64)
                .alias(format!("{MISSING_PREFIX}{name}")),
        );
    }
    Panel::new(block.lazy().select(exprs).collect()?)
}

/// Apply the two-stage fill policy to every value column of `block`.
///
/// Stage one forward-fills at most `limit` consecutive gaps from the previous
/// defined value of the same entity; stage two sets the rest to zero. Values
/// never propagate across an entity boundary.
pub fn fill_missing(block: &Panel, limit: usize) -> Result<Panel> {
    block.ensure_sorted()?;

    let columns = block.value_columns();
    let before = null_cells(block.frame());

    let mut exprs = vec![col(SYMBOL), col(DATE)];
    for name in &columns {
        exprs.push(
            col(name.as_str())
                .fill_null_with_strategy(FillNullStrategy::Forward(Some(limit as IdxSize)))
                .over([col(SYMBOL)])
                .fill_null(lit(0.0))
                .alias(name.as_str()),
        );
    }
    let filled = Panel::new(block.lazy().select(exprs).collect()?)?;

    debug!(limit, columns = columns.len(), "applied fill policy");
    info!(cells = before, "filled undefined cells");
    Ok(filled)
}

/// Total number of null cells across the frame.
pub fn null_cells(frame: &DataFrame) -> usize {
    frame.get_columns().iter().map(|c| c.null_count()).sum()
}
