//! Forward-looking outperformance label.
//!
//! For each period the cross-sectional median of the one-year price change is
//! taken over entities with a defined change. An entity outperforms in that
//! period when its own change is strictly above the median. The label attached
//! to row `(entity, t)` is the outperformance flag computed at `t + horizon`
//! for the same entity, so the row only carries information that becomes known
//! after `t`.
//!
//! Rows whose future flag does not exist (the last `horizon` rows of every
//! entity) are labelled 0.

use crate::{
    PipelineConfig, Result,
    panel::{DATE, Panel, SYMBOL},
};
use polars::prelude::*;
use tracing::{info, warn};

/// Label column.
pub const LABEL: &str = "label";

const OUTPERFORMED: &str = "outperformed";

/// Build the label block from the momentum block.
///
/// Reads `pct_change_{horizon}` and returns the key columns plus an `Int32`
/// [`LABEL`] column holding 0 or 1.
pub fn outperformance_labels(momentum: &Panel, horizon: usize) -> Result<Panel> {
    momentum.ensure_sorted()?;
    let change = PipelineConfig::momentum_column(horizon);
    momentum.require_columns(&[change.as_str()])?;

    let frame = momentum
        .lazy()
        // partition by period: median over the cross-section
        .with_column(
            col(change.as_str())
                .gt(col(change.as_str()).median().over([col(DATE)]))
                .cast(DataType::Int32)
                .fill_null(lit(0))
                .alias(OUTPERFORMED),
        )
        // partition by entity: pull the outcome back to the start of the window
        .with_column(
            col(OUTPERFORMED)
                .shift(lit(-(horizon as i64)))
                .over([col(SYMBOL)])
                .fill_null(lit(0))
                .cast(DataType::Int32)
                .alias(LABEL),
        )
        .select([col(SYMBOL), col(DATE), col(LABEL)])
        .collect()?;

    let labels = Panel::new(frame)?;
    let positives = labels.frame().column(LABEL)?.i32()?.sum().unwrap_or(0);
    if positives == 0 {
        warn!(rows = labels.height(), "no positive labels");
    }
    info!(rows = labels.height(), positives, horizon, "built outperformance labels");
    Ok(labels)
}
