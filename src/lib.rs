pub mod config;
pub mod dates;
pub mod error;
pub mod export;
pub mod generator;
pub mod loader;
pub mod pipeline;
pub mod tui;
pub mod types;
pub mod web;

pub use config::{AggregationMode, Config, TextEncoding};
pub use error::{ConfigError, PipelineError};
pub use pipeline::{analyze, merge, summarize, summarize_independent, Analysis};
