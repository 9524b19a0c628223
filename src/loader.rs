use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::debug;

use crate::config::{Config, TextEncoding};
use crate::dates::DateParser;
use crate::error::{PipelineError, Result};
use crate::types::*;

pub const DATE: &str = "date";
pub const AD_GROUP: &str = "ad_group";
pub const SPEND: &str = "spend";
pub const CLICKS: &str = "clicks";
pub const ORDER_ID: &str = "order_id";
pub const PRODUCT: &str = "product";
pub const REVENUE: &str = "revenue";

#[derive(Debug, Clone)]
pub struct ReadOptions {
    pub delimiter: u8,
    pub dates: DateParser,
    /// Text encoding of the input bytes.
    pub encoding: TextEncoding,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self { delimiter: b',', dates: DateParser::default(), encoding: TextEncoding::Utf8 }
    }
}

/// A data row whose date cell has already been normalized.
#[derive(Debug, Clone)]
pub struct Row {
    /// 1-based line in the source text; the header is line 1.
    pub line: u64,
    pub date: EventDate,
    pub values: Vec<String>,
}

/// An uploaded table after date normalization, before typing.
#[derive(Debug, Clone)]
pub struct Table {
    pub dataset: Dataset,
    pub headers: Vec<String>,
    pub date_column: usize,
    pub rows: Vec<Row>,
}

impl Table {
    /// Header lookup, trimmed and case-insensitive.
    pub fn column(&self, name: &str) -> Option<usize> {
        find_column(&self.headers, name)
    }

    fn require(&self, name: &str) -> Result<usize> {
        self.column(name).ok_or_else(|| PipelineError::Schema {
            dataset: self.dataset,
            column: name.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn find_column(headers: &[String], name: &str) -> Option<usize> {
    let wanted = name.trim().to_lowercase();
    headers.iter().position(|h| h.to_lowercase() == wanted)
}

/// Reads a delimited table and replaces every value of `date_column` with
/// its canonical date. One unreadable date fails the whole load.
///
/// Latin-1 input is decoded to UTF-8 before parsing.
pub fn load_and_normalize<R: Read>(
    reader: R,
    dataset: Dataset,
    date_column: &str,
    options: &ReadOptions,
) -> Result<Table> {
    match options.encoding {
        TextEncoding::Utf8 => read_table(reader, dataset, date_column, options),
        TextEncoding::Latin1 => {
            let text = decode_latin1(reader).map_err(|e| PipelineError::Csv {
                dataset,
                source: csv::Error::from(e),
            })?;
            read_table(text.as_bytes(), dataset, date_column, options)
        }
    }
}

fn decode_latin1<R: Read>(mut reader: R) -> io::Result<String> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    Ok(bytes.into_iter().map(char::from).collect())
}

fn read_table<R: Read>(
    reader: R,
    dataset: Dataset,
    date_column: &str,
    options: &ReadOptions,
) -> Result<Table> {
    let csv_err = |source| PipelineError::Csv { dataset, source };

    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .delimiter(options.delimiter)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let date_idx = find_column(&headers, date_column).ok_or_else(|| PipelineError::Schema {
        dataset,
        column: date_column.to_string(),
    })?;

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record: StringRecord = result.map_err(csv_err)?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let raw = record.get(date_idx).unwrap_or("");
        let date = options.dates.parse(raw).ok_or_else(|| PipelineError::Parse {
            dataset,
            line,
            column: headers[date_idx].clone(),
            value: raw.to_string(),
            expected: "a date",
        })?;
        rows.push(Row {
            line,
            date,
            values: record.iter().map(String::from).collect(),
        });
    }

    debug!(%dataset, rows = rows.len(), columns = headers.len(), "loaded table");

    Ok(Table { dataset, headers, date_column: date_idx, rows })
}

// ── Typed extraction ──

struct Cells<'a> {
    table: &'a Table,
    row: &'a Row,
}

impl Cells<'_> {
    fn raw(&self, idx: usize) -> &str {
        self.row.values.get(idx).map(String::as_str).unwrap_or("")
    }

    fn parse_error(&self, idx: usize, expected: &'static str) -> PipelineError {
        PipelineError::Parse {
            dataset: self.table.dataset,
            line: self.row.line,
            column: self.table.headers[idx].clone(),
            value: self.raw(idx).to_string(),
            expected,
        }
    }

    fn text(&self, idx: Option<usize>) -> Option<String> {
        idx.map(|i| self.raw(i))
            .filter(|v| !v.is_empty())
            .map(String::from)
    }

    fn amount(&self, idx: usize) -> Result<f64> {
        parse_amount(self.raw(idx)).ok_or_else(|| self.parse_error(idx, "a non-negative number"))
    }

    fn optional_amount(&self, idx: Option<usize>) -> Result<Option<f64>> {
        match idx {
            Some(i) if !self.raw(i).is_empty() => self.amount(i).map(Some),
            _ => Ok(None),
        }
    }

    fn count(&self, idx: Option<usize>) -> Result<Option<u64>> {
        match idx {
            Some(i) if !self.raw(i).is_empty() => self
                .raw(i)
                .parse::<u64>()
                .map(Some)
                .map_err(|_| self.parse_error(i, "a whole number")),
            _ => Ok(None),
        }
    }
}

fn parse_amount(raw: &str) -> Option<f64> {
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}

fn cells<'a>(table: &'a Table) -> impl Iterator<Item = Cells<'a>> {
    table.rows.iter().map(move |row| Cells { table, row })
}

pub fn ads_from_table(table: &Table) -> Result<Vec<AdRecord>> {
    let spend = table.require(SPEND)?;
    let ad_group = table.column(AD_GROUP);
    let clicks = table.column(CLICKS);

    cells(table)
        .map(|c| {
            Ok(AdRecord {
                date: c.row.date,
                ad_group: c.text(ad_group),
                spend: c.amount(spend)?,
                clicks: c.count(clicks)?,
            })
        })
        .collect()
}

pub fn orders_from_table(table: &Table) -> Result<Vec<OrderRecord>> {
    let revenue = table.require(REVENUE)?;
    let order_id = table.column(ORDER_ID);
    let product = table.column(PRODUCT);

    cells(table)
        .map(|c| {
            Ok(OrderRecord {
                date: c.row.date,
                order_id: c.text(order_id),
                product: c.text(product),
                revenue: c.amount(revenue)?,
            })
        })
        .collect()
}

/// Reads back a table produced by [`crate::export::export`].
pub fn merged_from_table(table: &Table) -> Result<Vec<MergedRecord>> {
    let spend = table.require(SPEND)?;
    let revenue = table.require(REVENUE)?;
    let ad_group = table.column(AD_GROUP);
    let clicks = table.column(CLICKS);
    let order_id = table.column(ORDER_ID);
    let product = table.column(PRODUCT);

    cells(table)
        .map(|c| {
            Ok(MergedRecord {
                date: c.row.date,
                ad_group: c.text(ad_group),
                spend: c.amount(spend)?,
                clicks: c.count(clicks)?,
                order_id: c.text(order_id),
                product: c.text(product),
                revenue: c.optional_amount(Some(revenue))?,
            })
        })
        .collect()
}

// ── Convenience loaders ──

pub fn load_ads<R: Read>(reader: R, config: &Config) -> Result<Vec<AdRecord>> {
    let table = load_and_normalize(reader, Dataset::Ads, &config.ads_date_column, &config.read_options())?;
    ads_from_table(&table)
}

pub fn load_orders<R: Read>(reader: R, config: &Config) -> Result<Vec<OrderRecord>> {
    let table = load_and_normalize(reader, Dataset::Orders, &config.orders_date_column, &config.read_options())?;
    orders_from_table(&table)
}

/// Reads a table written by [`crate::export::export`] with the same config.
pub fn load_merged<R: Read>(reader: R, config: &Config) -> Result<Vec<MergedRecord>> {
    let table = load_and_normalize(reader, Dataset::Merged, DATE, &config.merged_read_options())?;
    merged_from_table(&table)
}

fn open(path: &Path, dataset: Dataset) -> Result<File> {
    File::open(path).map_err(|source| PipelineError::Io {
        dataset,
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_ads_path(path: impl AsRef<Path>, config: &Config) -> Result<Vec<AdRecord>> {
    load_ads(open(path.as_ref(), Dataset::Ads)?, config)
}

pub fn load_orders_path(path: impl AsRef<Path>, config: &Config) -> Result<Vec<OrderRecord>> {
    load_orders(open(path.as_ref(), Dataset::Orders)?, config)
}

pub fn load_merged_path(path: impl AsRef<Path>, config: &Config) -> Result<Vec<MergedRecord>> {
    load_merged(open(path.as_ref(), Dataset::Merged)?, config)
}
