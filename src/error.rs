use std::path::PathBuf;

use thiserror::Error;

use crate::types::Dataset;

/// Everything that can stop a load, merge or export.
///
/// Every variant names the dataset and, where one exists, the column and
/// line so the message can be shown to the person who uploaded the file.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A required column is not in the header row.
    #[error("{dataset} data: missing required column `{column}`")]
    Schema { dataset: Dataset, column: String },

    /// A cell could not be read as the value its column needs.
    #[error("{dataset} data, line {line}, column `{column}`: cannot read {value:?} as {expected}")]
    Parse {
        dataset: Dataset,
        line: u64,
        column: String,
        value: String,
        expected: &'static str,
    },

    /// The export target encoding cannot hold a value.
    #[error("export, row {row}, column `{column}`: {detail}")]
    Encoding {
        row: usize,
        column: String,
        detail: String,
    },

    /// The delimited text itself is malformed.
    #[error("{dataset} data: malformed CSV: {source}")]
    Csv {
        dataset: Dataset,
        #[source]
        source: csv::Error,
    },

    #[error("{dataset} data: cannot access {path:?}: {source}")]
    Io {
        dataset: Dataset,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    /// The dataset at fault, `None` for export failures.
    pub fn dataset(&self) -> Option<Dataset> {
        match self {
            PipelineError::Schema { dataset, .. }
            | PipelineError::Parse { dataset, .. }
            | PipelineError::Csv { dataset, .. }
            | PipelineError::Io { dataset, .. } => Some(*dataset),
            PipelineError::Encoding { .. } => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
