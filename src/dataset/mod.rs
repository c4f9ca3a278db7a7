//! Feature dataset: the built-in reference table, its CSV representation
//! and the preparer stage that writes it.

pub mod iris;
pub mod preparer;
pub mod table;

pub use preparer::{DataPreparer, DatasetSummary};
pub use table::{FeatureDataset, Label, TARGET_COLUMN};
