//! CSV export of the feature matrix and labels.
//!
//! Both files carry the `symbol,date` key in front of the values so rows can be
//! joined back to the panel after the model has consumed them.

use crate::{FeatureSet, Result};
use std::path::Path;
use tracing::info;

/// Write `symbol,date,<features...>` rows.
pub fn write_features(path: impl AsRef<Path>, features: &FeatureSet) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path)?;

    let mut header = vec!["symbol".to_string(), "date".to_string()];
    header.extend(features.columns().iter().cloned());
    writer.write_record(&header)?;

    for (key, row) in features.keys().iter().zip(features.features().rows()) {
        let mut record = Vec::with_capacity(row.len() + 2);
        record.push(key.symbol.clone());
        record.push(key.date.clone());
        record.extend(row.iter().map(|v| v.to_string()));
        writer.write_record(&record)?;
    }
    writer.flush()?;

    info!(path = %path.display(), rows = features.keys().len(), "wrote features");
    Ok(())
}

/// Write `symbol,date,label` rows.
pub fn write_labels(path: impl AsRef<Path>, features: &FeatureSet) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["symbol", "date", "label"])?;

    for (key, label) in features.keys().iter().zip(features.labels().iter()) {
        let label = label.to_string();
        writer.write_record([key.symbol.as_str(), key.date.as_str(), label.as_str()])?;
    }
    writer.flush()?;

    info!(path = %path.display(), rows = features.labels().len(), "wrote labels");
    Ok(())
}
