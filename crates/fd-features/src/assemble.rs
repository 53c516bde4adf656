//! Final feature matrix assembly.
//!
//! Column order is fixed: year-over-year log changes, cross-sectional ranks,
//! normalized fundamentals, then one missingness indicator per preceding
//! column. The fill policy runs on the numeric part only; indicators are
//! complete by construction.

use crate::{
    PipelineError, Result,
    missing::{fill_missing, missingness_indicator, null_cells},
    panel::Panel,
};
use ndarray::Array2;
use tracing::info;

/// Concatenate the feature blocks, append indicators and fill gaps.
///
/// `extra_indicators` are appended unchanged after the fresh indicators.
pub fn assemble_features(
    yoy: &Panel,
    ranks: &Panel,
    normalized: &Panel,
    extra_indicators: Option<&Panel>,
    fill_limit: usize,
) -> Result<Panel> {
    let numeric = yoy.hstack(&[("ranks", ranks), ("normalized", normalized)])?;
    let indicators = missingness_indicator(&numeric)?;
    let filled = fill_missing(&numeric, fill_limit)?;

    let mut blocks = vec![("indicators", &indicators)];
    if let Some(extra) = extra_indicators {
        blocks.push(("fundamental_indicators", extra));
    }
    let assembled = filled.hstack(&blocks)?;

    let remaining = null_cells(assembled.frame());
    if remaining > 0 {
        return Err(PipelineError::Computation(format!(
            "{remaining} undefined cells left after assembly"
        )));
    }
    info!(
        rows = assembled.height(),
        features = assembled.value_columns().len(),
        "assembled feature matrix"
    );
    Ok(assembled)
}

/// Copy the value columns of a complete panel into a row-major matrix.
pub fn to_matrix(panel: &Panel) -> Result<Array2<f64>> {
    let columns = panel.value_columns();
    let mut matrix = Array2::<f64>::zeros((panel.height(), columns.len()));
    for (j, name) in columns.iter().enumerate() {
        let values = panel.frame().column(name)?.f64()?;
        for (i, value) in values.into_iter().enumerate() {
            matrix[[i, j]] = value.ok_or_else(|| {
                PipelineError::Computation(format!("undefined value in {name} at row {i}"))
            })?;
        }
    }
    Ok(matrix)
}
