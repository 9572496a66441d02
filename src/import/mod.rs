//! Loads exported CSV back into an in-memory graph.

pub mod csv;

use serde::{Deserialize, Serialize};

pub use self::csv::load;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportConfig {
    /// Skip rows whose `_id` was already loaded instead of failing
    pub ignore_duplicate_nodes: bool,
    /// The file was exported with `differentiateNulls`: a quoted empty field
    /// is the empty string, a bare empty field is null
    pub differentiate_nulls: bool,
    pub delim: char,
    /// Separator of list elements written without JSON brackets
    pub array_delim: String,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            ignore_duplicate_nodes: false,
            differentiate_nulls: false,
            delim: ',',
            array_delim: ";".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub nodes: u64,
    pub relationships: u64,
    pub properties: u64,
    pub skipped_duplicates: u64,
}
