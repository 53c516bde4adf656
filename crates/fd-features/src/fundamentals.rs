//! Derived accounting and valuation fundamentals.
//!
//! Row-wise identities over the raw fields. Each formula reads only the row it
//! is computing, so the result does not depend on row order. Division by zero
//! and undefined operands produce undefined values, never errors.
//!
//! # Formulas
//!
//! ```text
//! shareholders_equity = total_assets - total_liabilities
//! market_cap          = shares_outstanding * price
//! book_to_market      = shareholders_equity / market_cap
//! enterprise_value    = market_cap + current_debt + long_term_debt
//!                       + preferred_shares * price
//!                       + noncontrolling_interest (undefined -> 0)
//!                       - cash
//! earnings_yield      = operating_income / enterprise_value
//! ```

use crate::{
    FieldMap, Result,
    missing::finite_or_null,
    panel::{DATE, Panel, SYMBOL},
};
use polars::prelude::*;
use tracing::info;

/// Shareholders' equity column.
pub const SHAREHOLDERS_EQUITY: &str = "shareholders_equity";
/// Market capitalization column.
pub const MARKET_CAP: &str = "market_cap";
/// Book-to-market column.
pub const BOOK_TO_MARKET: &str = "book_to_market";
/// Enterprise value column.
pub const ENTERPRISE_VALUE: &str = "enterprise_value";
/// Earnings yield column.
pub const EARNINGS_YIELD: &str = "earnings_yield";

/// Derived columns in output order.
pub const DERIVED_COLUMNS: [&str; 5] = [
    SHAREHOLDERS_EQUITY,
    MARKET_CAP,
    BOOK_TO_MARKET,
    ENTERPRISE_VALUE,
    EARNINGS_YIELD,
];

/// Compute the derived fundamentals block.
///
/// Returns the key columns plus [`DERIVED_COLUMNS`]. Non-finite results are
/// stored as undefined.
pub fn derive_fundamentals(panel: &Panel, fields: &FieldMap) -> Result<Panel> {
    panel.ensure_sorted()?;
    panel.require_columns(&fields.columns())?;

    let price = || col(fields.price.as_str());
    let equity = col(fields.total_assets.as_str()) - col(fields.total_liabilities.as_str());
    let market_cap = col(fields.shares_outstanding.as_str()) * price();
    // noncontrolling interest is zeroed before it enters the sum
    let enterprise_value = market_cap.clone()
        + col(fields.current_debt.as_str())
        + col(fields.long_term_debt.as_str())
        + col(fields.preferred_shares.as_str()) * price()
        + col(fields.noncontrolling_interest.as_str()).fill_null(lit(0.0))
        - col(fields.cash.as_str());

    let derived = panel
        .lazy()
        .select([
            col(SYMBOL),
            col(DATE),
            finite_or_null(equity).alias(SHAREHOLDERS_EQUITY),
            finite_or_null(market_cap).alias(MARKET_CAP),
            finite_or_null(enterprise_value).alias(ENTERPRISE_VALUE),
            col(fields.operating_income.as_str()).alias("__operating_income"),
        ])
        .with_columns([
            finite_or_null(col(SHAREHOLDERS_EQUITY) / col(MARKET_CAP)).alias(BOOK_TO_MARKET),
            finite_or_null(col("__operating_income") / col(ENTERPRISE_VALUE))
                .alias(EARNINGS_YIELD),
        ])
        .select([
            col(SYMBOL),
            col(DATE),
            col(SHAREHOLDERS_EQUITY),
            col(MARKET_CAP),
            col(BOOK_TO_MARKET),
            col(ENTERPRISE_VALUE),
            col(EARNINGS_YIELD),
        ])
        .collect()?;

    let block = Panel::new(derived)?;
    info!(rows = block.height(), "computed derived fundamentals");
    Ok(block)
}
