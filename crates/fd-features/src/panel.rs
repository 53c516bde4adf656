//! Entity × period panel.
//!
//! A [`Panel`] is a polars `DataFrame` whose first two columns are the key
//! `symbol` and `date`. Rows are ordered entity-major, period-minor with no
//! duplicate key. The ordering is what makes `shift(k).over(symbol)` mean "k
//! rows back in this entity's own history", so every stage re-checks it on
//! entry instead of trusting the caller.

use crate::{PipelineError, Result};
use derive_more::Display;
use polars::prelude::*;
use std::cmp::Ordering;

/// Entity identifier column.
pub const SYMBOL: &str = "symbol";

/// Canonical period column.
pub const DATE: &str = "date";

/// Row key of a panel.
#[derive(Debug, Display, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[display("({symbol}, {date})")]
pub struct PanelKey {
    /// Entity id
    pub symbol: String,
    /// Canonical period
    pub date: String,
}

/// Key-validated panel of per-(entity, period) values.
#[derive(Debug, Clone)]
pub struct Panel {
    frame: DataFrame,
}

impl Panel {
    /// Wrap a frame that is already sorted by (symbol, date).
    ///
    /// Fails if the key columns are missing, null, duplicated or out of order.
    pub fn new(frame: DataFrame) -> Result<Self> {
        let panel = Self { frame };
        panel.ensure_sorted()?;
        Ok(panel)
    }

    /// Sort a frame by (symbol, date) and wrap it.
    pub fn from_unsorted(frame: DataFrame) -> Result<Self> {
        for key in [SYMBOL, DATE] {
            if frame.column(key).is_err() {
                return Err(PipelineError::MissingColumn(key.to_string()));
            }
        }
        let sorted = frame
            .lazy()
            .sort([SYMBOL, DATE], SortMultipleOptions::default())
            .collect()?;
        Self::new(sorted)
    }

    /// Check the entity-major, period-minor ordering and key uniqueness.
    pub fn ensure_sorted(&self) -> Result<()> {
        let symbols = self.key_column(SYMBOL)?;
        let dates = self.key_column(DATE)?;

        let mut previous: Option<(&str, &str)> = None;
        for (row, (symbol, date)) in symbols.into_iter().zip(dates.into_iter()).enumerate() {
            let (Some(symbol), Some(date)) = (symbol, date) else {
                return Err(PipelineError::NullKey(row));
            };
            if let Some(prev) = previous {
                match prev.cmp(&(symbol, date)) {
                    Ordering::Less => {}
                    Ordering::Equal => {
                        return Err(PipelineError::DuplicateKey {
                            symbol: symbol.to_string(),
                            date: date.to_string(),
                        });
                    }
                    Ordering::Greater => {
                        return Err(PipelineError::UnsortedPanel {
                            symbol: symbol.to_string(),
                            date: date.to_string(),
                        });
                    }
                }
            }
            previous = Some((symbol, date));
        }
        Ok(())
    }

    fn key_column(&self, name: &str) -> Result<&StringChunked> {
        let column = self
            .frame
            .column(name)
            .map_err(|_| PipelineError::MissingColumn(name.to_string()))?;
        Ok(column.str()?)
    }

    /// Underlying frame.
    pub const fn frame(&self) -> &DataFrame {
        &self.frame
    }

    /// Consume the panel and return its frame.
    pub fn into_frame(self) -> DataFrame {
        self.frame
    }

    /// Lazy view for building the next block.
    pub fn lazy(&self) -> LazyFrame {
        self.frame.clone().lazy()
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.frame.height()
    }

    /// Names of the non-key columns, in frame order.
    pub fn value_columns(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .filter(|name| name != SYMBOL && name != DATE)
            .collect()
    }

    /// Fail with [`PipelineError::MissingColumn`] unless all `columns` exist.
    pub fn require_columns<S: AsRef<str>>(&self, columns: &[S]) -> Result<()> {
        for column in columns {
            let name = column.as_ref();
            if self.frame.column(name).is_err() {
                return Err(PipelineError::MissingColumn(name.to_string()));
            }
        }
        Ok(())
    }

    /// Row keys in panel order.
    pub fn keys(&self) -> Result<Vec<PanelKey>> {
        let symbols = self.key_column(SYMBOL)?;
        let dates = self.key_column(DATE)?;
        symbols
            .into_iter()
            .zip(dates.into_iter())
            .enumerate()
            .map(|(row, key)| match key {
                (Some(symbol), Some(date)) => Ok(PanelKey {
                    symbol: symbol.to_string(),
                    date: date.to_string(),
                }),
                _ => Err(PipelineError::NullKey(row)),
            })
            .collect()
    }

    /// Sorted distinct entity ids.
    pub fn entities(&self) -> Result<Vec<String>> {
        let mut entities: Vec<String> = Vec::new();
        for symbol in self.key_column(SYMBOL)?.into_iter().flatten() {
            if entities.last().is_none_or(|last| last != symbol) {
                entities.push(symbol.to_string());
            }
        }
        Ok(entities)
    }

    /// Number of rows of the entity with the longest history.
    pub fn longest_history(&self) -> Result<usize> {
        let mut longest = 0;
        let mut run = 0;
        let mut current: Option<&str> = None;
        for symbol in self.key_column(SYMBOL)?.into_iter().flatten() {
            if current == Some(symbol) {
                run += 1;
            } else {
                current = Some(symbol);
                run = 1;
            }
            longest = longest.max(run);
        }
        Ok(longest)
    }

    /// Fail unless `other` has exactly the same row keys in the same order.
    pub fn ensure_aligned(&self, other: &Self, block: &str) -> Result<()> {
        let same_symbols = self
            .key_column(SYMBOL)?
            .into_iter()
            .eq(other.key_column(SYMBOL)?.into_iter());
        let same_dates = self
            .key_column(DATE)?
            .into_iter()
            .eq(other.key_column(DATE)?.into_iter());
        if same_symbols && same_dates {
            Ok(())
        } else {
            Err(PipelineError::KeyMismatch(block.to_string()))
        }
    }

    /// Concatenate the value columns of aligned blocks after this panel's.
    pub fn hstack(&self, blocks: &[(&str, &Self)]) -> Result<Self> {
        let mut columns: Vec<Column> = self.frame.get_columns().to_vec();
        for (name, block) in blocks {
            self.ensure_aligned(block, name)?;
            for value in block.value_columns() {
                columns.push(block.frame.column(&value)?.clone());
            }
        }
        Ok(Self {
            frame: DataFrame::new(columns)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(symbols: &[&str], dates: &[&str]) -> DataFrame {
        let values: Vec<f64> = (0..symbols.len()).map(|i| i as f64).collect();
        df![
            SYMBOL => symbols,
            DATE => dates,
            "value" => values,
        ]
        .unwrap()
    }

    #[test]
    fn test_sorted_panel_accepted() {
        let panel = Panel::new(frame(
            &["A", "A", "B"],
            &["2020-03-28", "2020-06-28", "2020-03-28"],
        ))
        .unwrap();
        assert_eq!(panel.height(), 3);
        assert_eq!(panel.value_columns(), vec!["value".to_string()]);
        assert_eq!(panel.entities().unwrap(), vec!["A", "B"]);
        assert_eq!(panel.longest_history().unwrap(), 2);
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let err = Panel::new(frame(&["A", "A"], &["2020-03-28", "2020-03-28"])).unwrap_err();
        match err {
            PipelineError::DuplicateKey { symbol, date } => {
                assert_eq!(symbol, "A");
                assert_eq!(date, "2020-03-28");
            }
            other => panic!("expected duplicate key, got {other:?}"),
        }
    }

    #[test]
    fn test_unsorted_rejected_and_sortable() {
        let unsorted = frame(&["B", "A", "A"], &["2020-03-28", "2020-06-28", "2020-03-28"]);
        assert!(matches!(
            Panel::new(unsorted.clone()),
            Err(PipelineError::UnsortedPanel { .. })
        ));

        let panel = Panel::from_unsorted(unsorted).unwrap();
        let keys = panel.keys().unwrap();
        assert_eq!(keys[0].to_string(), "(A, 2020-03-28)");
        assert_eq!(keys[1].to_string(), "(A, 2020-06-28)");
        assert_eq!(keys[2].to_string(), "(B, 2020-03-28)");
    }

    #[test]
    fn test_missing_key_column() {
        let df = df!["value" => [1.0, 2.0]].unwrap();
        assert!(matches!(
            Panel::from_unsorted(df),
            Err(PipelineError::MissingColumn(c)) if c == SYMBOL
        ));
    }

    #[test]
    fn test_hstack_checks_alignment() {
        let base = Panel::new(frame(&["A", "B"], &["2020-03-28", "2020-03-28"])).unwrap();
        let other = Panel::new(
            df![
                SYMBOL => ["A", "B"],
                DATE => ["2020-03-28", "2020-03-28"],
                "extra" => [5.0, 6.0],
            ]
            .unwrap(),
        )
        .unwrap();
        let stacked = base.hstack(&[("extra", &other)]).unwrap();
        assert_eq!(stacked.value_columns(), vec!["value", "extra"]);

        let shifted = Panel::new(frame(&["A", "C"], &["2020-03-28", "2020-03-28"])).unwrap();
        assert!(matches!(
            base.hstack(&[("shifted", &shifted)]),
            Err(PipelineError::KeyMismatch(b)) if b == "shifted"
        ));
    }
}
