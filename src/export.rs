use std::fs;
use std::path::Path;

use csv::{QuoteStyle, WriterBuilder};
use tracing::debug;

use crate::config::TextEncoding;
use crate::error::{PipelineError, Result};
use crate::loader::{AD_GROUP, CLICKS, DATE, ORDER_ID, PRODUCT, REVENUE, SPEND};
use crate::types::{Dataset, MergedRecord};

/// Suggested name of the download.
pub const EXPORT_FILENAME: &str = "etsy_ads_merged.csv";
pub const CONTENT_TYPE: &str = "text/csv";

pub const HEADERS: [&str; 7] = [DATE, AD_GROUP, SPEND, CLICKS, ORDER_ID, PRODUCT, REVENUE];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    pub delimiter: u8,
    pub encoding: TextEncoding,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self { delimiter: b',', encoding: TextEncoding::Utf8 }
    }
}

fn fields(row: &MergedRecord) -> [String; 7] {
    [
        row.date.to_string(),
        row.ad_group.clone().unwrap_or_default(),
        row.spend.to_string(),
        row.clicks.map(|c| c.to_string()).unwrap_or_default(),
        row.order_id.clone().unwrap_or_default(),
        row.product.clone().unwrap_or_default(),
        row.revenue.map(|r| r.to_string()).unwrap_or_default(),
    ]
}

fn check_latin1(row: usize, fields: &[String; 7]) -> Result<()> {
    for (value, column) in fields.iter().zip(HEADERS) {
        if let Some(c) = value.chars().find(|c| u32::from(*c) > 0xFF) {
            return Err(PipelineError::Encoding {
                row,
                column: column.to_string(),
                detail: format!("character {c:?} (U+{:04X}) has no Latin-1 encoding", u32::from(c)),
            });
        }
    }
    Ok(())
}

/// Encodes the merged table as delimited text with a header row.
///
/// Values holding the delimiter, a quote or a line break are quoted.
/// `row` in an [`PipelineError::Encoding`] is the 1-based data row.
///
/// Reading the output back with [`crate::loader::load_merged`] trims every
/// cell and turns empty text into `None`, so `Some(" x")` returns as
/// `Some("x")` and `Some("")` as `None`. Loaded records are already in that
/// form and round-trip unchanged.
pub fn export(merged: &[MergedRecord], options: &ExportOptions) -> Result<Vec<u8>> {
    let write_err = |row: usize, err: csv::Error| PipelineError::Encoding {
        row,
        column: "*".into(),
        detail: err.to_string(),
    };

    let mut wtr = WriterBuilder::new()
        .delimiter(options.delimiter)
        .quote_style(QuoteStyle::Necessary)
        .from_writer(Vec::new());

    wtr.write_record(HEADERS).map_err(|e| write_err(0, e))?;
    for (idx, row) in merged.iter().enumerate() {
        let fields = fields(row);
        if options.encoding == TextEncoding::Latin1 {
            check_latin1(idx + 1, &fields)?;
        }
        wtr.write_record(&fields).map_err(|e| write_err(idx + 1, e))?;
    }

    let bytes = wtr.into_inner().map_err(|e| PipelineError::Encoding {
        row: merged.len(),
        column: "*".into(),
        detail: e.to_string(),
    })?;

    debug!(rows = merged.len(), bytes = bytes.len(), encoding = ?options.encoding, "exported merged table");

    match options.encoding {
        TextEncoding::Utf8 => Ok(bytes),
        TextEncoding::Latin1 => {
            let text = String::from_utf8(bytes).map_err(|e| PipelineError::Encoding {
                row: 0,
                column: "*".into(),
                detail: e.to_string(),
            })?;
            // Every char was checked to be <= U+00FF above.
            Ok(text.chars().map(|c| c as u8).collect())
        }
    }
}

/// Runs [`export`] and writes the bytes to `path`.
pub fn write_export(path: impl AsRef<Path>, merged: &[MergedRecord], options: &ExportOptions) -> Result<usize> {
    let path = path.as_ref();
    let bytes = export(merged, options)?;
    fs::write(path, &bytes).map_err(|source| PipelineError::Io {
        dataset: Dataset::Merged,
        path: path.to_path_buf(),
        source,
    })?;
    Ok(bytes.len())
}
