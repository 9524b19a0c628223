use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dates::DateParser;
use crate::error::ConfigError;
use crate::export::ExportOptions;
use crate::loader::ReadOptions;

/// How spend is totalled when several orders share a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AggregationMode {
    /// Sum over joined rows: an ad's spend counts once per matching order.
    #[default]
    Joined,
    /// Sum spend and revenue per date separately, then line them up.
    Independent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TextEncoding {
    #[default]
    Utf8,
    Latin1,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub date_format: Option<String>,
    pub ads_date_column: String,
    pub orders_date_column: String,
    pub delimiter: char,
    pub aggregation: AggregationMode,
    pub export_encoding: TextEncoding,
    pub preview_rows: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            date_format: None,
            ads_date_column: "date".into(),
            orders_date_column: "date".into(),
            delimiter: ',',
            aggregation: AggregationMode::Joined,
            export_encoding: TextEncoding::Utf8,
            preview_rows: 5,
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.delimiter.is_ascii() || matches!(self.delimiter, '"' | '\r' | '\n') {
            return Err(ConfigError::Invalid(format!(
                "delimiter {:?} must be a single ASCII character other than a quote or line break",
                self.delimiter
            )));
        }
        if self.preview_rows == 0 {
            return Err(ConfigError::Invalid("preview_rows must be at least 1".into()));
        }
        if self.ads_date_column.trim().is_empty() || self.orders_date_column.trim().is_empty() {
            return Err(ConfigError::Invalid("date column names must not be empty".into()));
        }
        Ok(())
    }

    pub fn delimiter_byte(&self) -> u8 {
        // validate() guarantees ASCII
        self.delimiter as u8
    }

    pub fn read_options(&self) -> ReadOptions {
        ReadOptions {
            delimiter: self.delimiter_byte(),
            dates: DateParser::new(self.date_format.clone()),
            encoding: TextEncoding::Utf8,
        }
    }

    /// Options for reading back an exported merged table.
    ///
    /// Export always writes canonical dates, so the configured `date_format`
    /// does not apply; the text is decoded as it was encoded.
    pub fn merged_read_options(&self) -> ReadOptions {
        ReadOptions {
            delimiter: self.delimiter_byte(),
            dates: DateParser::default(),
            encoding: self.export_encoding,
        }
    }

    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            delimiter: self.delimiter_byte(),
            encoding: self.export_encoding,
        }
    }
}
