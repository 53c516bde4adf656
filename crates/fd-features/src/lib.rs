#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/fd-features/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod assemble;
pub mod config;
pub mod error;
pub mod export;
pub mod fundamentals;
pub mod label;
pub mod loader;
pub mod missing;
pub mod momentum;
pub mod normalize;
pub mod panel;
pub mod period;
pub mod pipeline;
pub mod rank;
pub mod universe;

// Re-export core types
pub use config::{FieldMap, LoaderConfig, PipelineConfig};
pub use error::{PipelineError, Result};
pub use panel::{Panel, PanelKey};
pub use period::QuarterAnchor;
pub use pipeline::{FeaturePipeline, FeatureSet};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
