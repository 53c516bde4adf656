//! Cross-sectional percentile ranks.
//!
//! Each period is ranked independently: an entity's rank is its average-tie
//! rank among the entities with a defined value in that period, divided by the
//! number of such entities. Ranks therefore lie in (0, 1]. Undefined inputs
//! receive an undefined rank and are left out of the denominator.

use crate::{
    Result,
    panel::{DATE, Panel, SYMBOL},
};
use polars::prelude::*;
use tracing::info;

/// Prefix of percentile rank columns.
pub const RANK_PREFIX: &str = "rank_";

/// Percentile-rank expression for one column, partitioned by period.
pub fn percentile_rank(column: &str) -> Expr {
    let options = RankOptions {
        method: RankMethod::Average,
        descending: false,
    };
    let rank = col(column).rank(options, None).over([col(DATE)]);
    let defined = col(column).count().over([col(DATE)]).cast(DataType::Float64);
    (rank.cast(DataType::Float64) / defined).alias(format!("{RANK_PREFIX}{column}"))
}

/// Rank every column of `columns` within each period.
///
/// `block` must hold the columns with undefined values already stored as null;
/// a NaN would otherwise rank above every finite value.
pub fn cross_sectional_ranks(block: &Panel, columns: &[String]) -> Result<Panel> {
    block.ensure_sorted()?;
    block.require_columns(columns)?;

    let mut exprs = vec![col(SYMBOL), col(DATE)];
    exprs.extend(columns.iter().map(|c| percentile_rank(c)));

    let ranks = Panel::new(block.lazy().select(exprs).collect()?)?;
    info!(columns = columns.len(), rows = ranks.height(), "computed cross-sectional ranks");
    Ok(ranks)
}
