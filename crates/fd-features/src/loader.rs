//! Raw CSV loading and quarter alignment.
//!
//! Reads a flat fundamentals extract (one row per ticker per report date),
//! keeps the configured field range, snaps report dates onto the quarterly
//! grid and returns a key-validated [`Panel`].

use crate::{
    LoaderConfig, PipelineError, Result,
    panel::{DATE, Panel, SYMBOL},
    period::canonical_period,
};
use polars::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

/// Load a fundamentals CSV file into a panel.
///
/// When `universe` is given, rows of entities outside it are skipped.
pub fn load_csv(
    path: impl AsRef<Path>,
    config: &LoaderConfig,
    universe: Option<&BTreeSet<String>>,
) -> Result<Panel> {
    let path = path.as_ref();
    info!(path = %path.display(), "loading fundamentals");
    load_reader(File::open(path)?, config, universe)
}

/// Load fundamentals CSV data from any reader.
pub fn load_reader<R: Read>(
    reader: R,
    config: &LoaderConfig,
    universe: Option<&BTreeSet<String>>,
) -> Result<Panel> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = reader.headers()?.clone();

    let position = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| PipelineError::MissingColumn(name.to_string()))
    };
    let entity_idx = position(&config.entity_column)?;
    let date_idx = position(&config.date_column)?;
    let first_idx = position(&config.first_field)?;
    let last_idx = match &config.last_field {
        Some(last) => position(last)?,
        None => headers.len().saturating_sub(1),
    };
    if last_idx < first_idx {
        return Err(PipelineError::config(
            "loader.last_field",
            format!("{} precedes {}", &headers[last_idx], config.first_field),
        ));
    }

    let fields: Vec<(usize, String)> = (first_idx..=last_idx)
        .filter(|&i| i != entity_idx && i != date_idx)
        .map(|i| (i, headers[i].to_string()))
        .filter(|(_, name)| !config.excluded_fields.contains(name))
        .collect();
    debug!(fields = fields.len(), "selected fundamental field range");

    let mut symbols: Vec<String> = Vec::new();
    let mut dates: Vec<String> = Vec::new();
    let mut values: Vec<Vec<Option<f64>>> = vec![Vec::new(); fields.len()];
    let mut seen: HashMap<(String, String), String> = HashMap::new();
    let mut skipped = 0usize;

    for record in reader.records() {
        let record = record?;
        let symbol = record.get(entity_idx).unwrap_or_default();
        if let Some(universe) = universe {
            if !universe.contains(symbol) {
                skipped += 1;
                continue;
            }
        }
        let raw_date = record.get(date_idx).unwrap_or_default();
        let period = canonical_period(raw_date, symbol, config.anchor, config.anchor_day)?;

        if let Some(first) = seen.insert((symbol.to_string(), period.clone()), raw_date.to_string())
        {
            return Err(PipelineError::AliasedPeriod {
                symbol: symbol.to_string(),
                period,
                first,
                second: raw_date.to_string(),
            });
        }

        for ((idx, name), column) in fields.iter().zip(values.iter_mut()) {
            column.push(parse_value(record.get(*idx).unwrap_or_default(), symbol, name)?);
        }
        symbols.push(symbol.to_string());
        dates.push(period);
    }

    if skipped > 0 {
        warn!(skipped, "skipped rows of entities outside the universe");
    }

    let mut columns: Vec<Column> = Vec::with_capacity(fields.len() + 2);
    columns.push(Series::new(SYMBOL.into(), symbols).into());
    columns.push(Series::new(DATE.into(), dates).into());
    for ((_, name), column) in fields.iter().zip(values) {
        columns.push(Series::new(name.as_str().into(), column).into());
    }

    let panel = Panel::from_unsorted(DataFrame::new(columns)?)?;
    info!(
        rows = panel.height(),
        entities = panel.entities()?.len(),
        fields = fields.len(),
        "loaded panel"
    );
    Ok(panel)
}

/// Parse one numeric cell. Empty and non-finite cells are undefined.
fn parse_value(raw: &str, symbol: &str, column: &str) -> Result<Option<f64>> {
    if raw.is_empty() {
        return Ok(None);
    }
    let value: f64 = raw.parse().map_err(|_| PipelineError::InvalidValue {
        symbol: symbol.to_string(),
        column: column.to_string(),
        value: raw.to_string(),
    })?;
    Ok(value.is_finite().then_some(value))
}
