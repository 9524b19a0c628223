//! Loading, schema validation and export of the delimited-text tables.

use std::io::Write;

use chrono::NaiveDate;

use etsy_ads_dashboard::config::{Config, TextEncoding};
use etsy_ads_dashboard::error::{ConfigError, PipelineError};
use etsy_ads_dashboard::export::{export, write_export, ExportOptions, EXPORT_FILENAME};
use etsy_ads_dashboard::generator::{ads_csv, orders_csv, SampleGenerator};
use etsy_ads_dashboard::loader::{self, load_and_normalize, ReadOptions};
use etsy_ads_dashboard::pipeline::merge;
use etsy_ads_dashboard::types::*;

fn day(y: i32, m: u32, d: u32) -> EventDate {
    EventDate::ymd(y, m, d).unwrap()
}

fn cfg() -> Config {
    Config::default()
}

// ── Loading ──
#[test]
fn test_load_ads_with_extra_columns() {
    let csv = "Date, Ad_Group ,Spend,Clicks,Impressions\n\
               2024-01-01,Mugs,10.5,12,900\n\
               2024-01-02,,0,,\n";
    let ads = loader::load_ads(csv.as_bytes(), &cfg()).unwrap();

    assert_eq!(
        ads,
        vec![
            AdRecord { date: day(2024, 1, 1), ad_group: Some("Mugs".into()), spend: 10.5, clicks: Some(12) },
            AdRecord { date: day(2024, 1, 2), ad_group: None, spend: 0.0, clicks: None },
        ]
    );
}

#[test]
fn test_load_orders_minimal_columns() {
    let csv = "date,revenue\n01/15/2024,42.00\n";
    let orders = loader::load_orders(csv.as_bytes(), &cfg()).unwrap();
    assert_eq!(orders, vec![OrderRecord::new(day(2024, 1, 15), 42.0)]);
}

#[test]
fn test_header_only_table_is_empty_not_an_error() {
    let orders = loader::load_orders("date,order_id,product,revenue\n".as_bytes(), &cfg()).unwrap();
    assert!(orders.is_empty());
}

#[test]
fn test_missing_required_column() {
    let err = loader::load_ads("date,clicks\n2024-01-01,3\n".as_bytes(), &cfg()).unwrap_err();
    match &err {
        PipelineError::Schema { dataset, column } => {
            assert_eq!(*dataset, Dataset::Ads);
            assert_eq!(column, "spend");
        }
        other => panic!("expected schema error, got {other:?}"),
    }
    assert_eq!(err.to_string(), "ads data: missing required column `spend`");

    let err = loader::load_orders("when,revenue\n2024-01-01,3\n".as_bytes(), &cfg()).unwrap_err();
    assert!(matches!(err, PipelineError::Schema { dataset: Dataset::Orders, ref column } if column == "date"));
}

#[test]
fn test_bad_date_fails_whole_load() {
    let csv = "date,spend\n2024-01-01,1\nnot-a-date,2\n2024-01-03,3\n";
    let err = loader::load_ads(csv.as_bytes(), &cfg()).unwrap_err();
    match &err {
        PipelineError::Parse { dataset, line, column, value, .. } => {
            assert_eq!(*dataset, Dataset::Ads);
            assert_eq!(*line, 3);
            assert_eq!(column, "date");
            assert_eq!(value, "not-a-date");
        }
        other => panic!("expected parse error, got {other:?}"),
    }
    assert_eq!(err.dataset(), Some(Dataset::Ads));
}

#[test]
fn test_bad_numbers_are_parse_errors() {
    for bad in ["-3", "abc", "NaN", "inf", ""] {
        let csv = format!("date,revenue\n2024-01-01,{bad}\n");
        let err = loader::load_orders(csv.as_bytes(), &cfg()).unwrap_err();
        assert!(
            matches!(err, PipelineError::Parse { dataset: Dataset::Orders, line: 2, ref column, .. } if column == "revenue"),
            "{bad:?} should be rejected, got {err:?}"
        );
    }

    let err = loader::load_ads("date,spend,clicks\n2024-01-01,1,2.5\n".as_bytes(), &cfg()).unwrap_err();
    assert!(matches!(err, PipelineError::Parse { ref column, expected: "a whole number", .. } if column == "clicks"));
}

#[test]
fn test_malformed_utf8_is_csv_error() {
    let bytes: &[u8] = b"date,spend\n2024-01-01,\xff\xfe\n";
    let err = loader::load_ads(bytes, &cfg()).unwrap_err();
    assert!(matches!(err, PipelineError::Csv { dataset: Dataset::Ads, .. }), "got {err:?}");
}

#[test]
fn test_explicit_date_format_and_columns() {
    let config = Config {
        date_format: Some("%d/%m/%Y".into()),
        ads_date_column: "Day".into(),
        ..Config::default()
    };
    let ads = loader::load_ads("day,spend\n02/01/2024,4\n".as_bytes(), &config).unwrap();
    assert_eq!(ads[0].date, day(2024, 1, 2));

    let err = loader::load_ads("day,spend\n2024-01-02,4\n".as_bytes(), &config).unwrap_err();
    assert!(matches!(err, PipelineError::Parse { .. }));
}

#[test]
fn test_normalize_keeps_raw_cells() {
    let csv = "date,spend,note\n2024-01-01 08:15:00,3,hello\n";
    let table = load_and_normalize(csv.as_bytes(), Dataset::Ads, "DATE", &ReadOptions::default()).unwrap();

    assert_eq!(table.headers, vec!["date", "spend", "note"]);
    assert_eq!(table.date_column, 0);
    assert_eq!(table.len(), 1);
    assert_eq!(table.rows[0].line, 2);
    assert_eq!(table.rows[0].values[2], "hello");
    assert!(table.rows[0].date.has_time());
    assert_eq!(table.rows[0].date.to_string(), "2024-01-01 08:15:00");
    assert_eq!(table.column("Note"), Some(2));
}

#[test]
fn test_semicolon_delimiter() {
    let config = Config { delimiter: ';', ..Config::default() };
    let ads = loader::load_ads("date;spend\n2024-01-01;2.5\n".as_bytes(), &config).unwrap();
    assert_eq!(ads, vec![AdRecord::new(day(2024, 1, 1), 2.5)]);
}

#[test]
fn test_path_loaders() {
    let dir = tempfile::tempdir().unwrap();
    let ads_path = dir.path().join("ads.csv");
    let mut f = std::fs::File::create(&ads_path).unwrap();
    writeln!(f, "date,ad_group,spend,clicks").unwrap();
    writeln!(f, "2024-01-01,Mugs,10,5").unwrap();
    drop(f);

    let ads = loader::load_ads_path(&ads_path, &cfg()).unwrap();
    assert_eq!(ads.len(), 1);

    let err = loader::load_orders_path(dir.path().join("missing.csv"), &cfg()).unwrap_err();
    assert!(matches!(err, PipelineError::Io { dataset: Dataset::Orders, .. }), "got {err:?}");
}

// ── Export ──
fn sample_merged() -> Vec<MergedRecord> {
    let d1 = day(2024, 1, 1);
    let d2 = day(2024, 1, 2);
    let ads = vec![
        AdRecord { date: d1, ad_group: Some("Mugs, \"Large\"".into()), spend: 12.34, clicks: Some(7) },
        AdRecord { date: d2, ad_group: Some("Line\nBreak".into()), spend: 0.1, clicks: None },
    ];
    let orders = vec![OrderRecord {
        date: d1,
        order_id: Some("ORD-1".into()),
        product: Some("Café Mug".into()),
        revenue: 28.5,
    }];
    merge(&ads, &orders)
}

#[test]
fn test_export_layout_and_quoting() {
    let bytes = export(&sample_merged(), &ExportOptions::default()).unwrap();
    let text = String::from_utf8(bytes).unwrap();

    let expected = "date,ad_group,spend,clicks,order_id,product,revenue\n\
                    2024-01-01,\"Mugs, \"\"Large\"\"\",12.34,7,ORD-1,Café Mug,28.5\n\
                    2024-01-02,\"Line\nBreak\",0.1,,,,\n";
    assert_eq!(text, expected);
    assert_eq!(EXPORT_FILENAME, "etsy_ads_merged.csv");
}

#[test]
fn test_export_round_trip() {
    let merged = sample_merged();
    let bytes = export(&merged, &ExportOptions::default()).unwrap();
    let reloaded = loader::load_merged(bytes.as_slice(), &cfg()).unwrap();
    assert_eq!(reloaded, merged);
}

#[test]
fn test_export_round_trip_generated() {
    let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    let (ads, orders) = SampleGenerator::new(9).generate(start, 20);
    let merged = merge(&ads, &orders);

    let config = Config { delimiter: ';', ..Config::default() };
    let bytes = export(&merged, &config.export_options()).unwrap();
    let reloaded = loader::load_merged(bytes.as_slice(), &config).unwrap();
    assert_eq!(reloaded, merged);
}

#[test]
fn test_export_round_trip_keeps_time_of_day() {
    let at = EventDate::from_datetime(
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_milli_opt(17, 5, 9, 250).unwrap(),
    );
    let merged = merge(&[AdRecord::new(at, 1.0)], &[OrderRecord::new(at, 3.0)]);
    let bytes = export(&merged, &ExportOptions::default()).unwrap();
    assert!(String::from_utf8_lossy(&bytes).contains("2024-01-01 17:05:09.250"));
    assert_eq!(loader::load_merged(bytes.as_slice(), &cfg()).unwrap(), merged);
}

#[test]
fn test_export_round_trip_with_explicit_date_format() {
    let config = Config { date_format: Some("%d/%m/%Y".into()), ..Config::default() };
    let ads = loader::load_ads("date,spend\n02/01/2024,4\n".as_bytes(), &config).unwrap();
    let orders = loader::load_orders("date,revenue\n02/01/2024,10\n".as_bytes(), &config).unwrap();
    let merged = merge(&ads, &orders);

    let bytes = export(&merged, &config.export_options()).unwrap();
    assert!(String::from_utf8_lossy(&bytes).contains("2024-01-02,,4,,,,10"));
    assert_eq!(loader::load_merged(bytes.as_slice(), &config).unwrap(), merged);
}

#[test]
fn test_export_round_trip_normalizes_padding_and_empty_text() {
    let mut merged = sample_merged();
    merged[0].ad_group = Some("  Mugs ".into());
    merged[0].product = Some(String::new());

    let bytes = export(&merged, &ExportOptions::default()).unwrap();
    let reloaded = loader::load_merged(bytes.as_slice(), &cfg()).unwrap();
    assert_eq!(reloaded[0].ad_group.as_deref(), Some("Mugs"));
    assert_eq!(reloaded[0].product, None);

    let again = export(&reloaded, &ExportOptions::default()).unwrap();
    assert_eq!(loader::load_merged(again.as_slice(), &cfg()).unwrap(), reloaded, "loaded rows are stable");
}

#[test]
fn test_export_latin1_round_trip() {
    let config = Config { export_encoding: TextEncoding::Latin1, ..Config::default() };
    let merged = sample_merged();

    let bytes = export(&merged, &config.export_options()).unwrap();
    assert!(std::str::from_utf8(&bytes).is_err());
    assert_eq!(loader::load_merged(bytes.as_slice(), &config).unwrap(), merged);

    let options = ReadOptions { encoding: TextEncoding::Latin1, ..ReadOptions::default() };
    let table = load_and_normalize(bytes.as_slice(), Dataset::Merged, "date", &options).unwrap();
    let product = table.column("product").unwrap();
    assert_eq!(table.rows[0].values[product], "Café Mug");
}

#[test]
fn test_export_latin1() {
    let options = ExportOptions { encoding: TextEncoding::Latin1, ..ExportOptions::default() };
    let bytes = export(&sample_merged(), &options).unwrap();
    assert!(bytes.contains(&0xE9), "é should be a single Latin-1 byte");
    assert!(std::str::from_utf8(&bytes).is_err());

    let mut merged = sample_merged();
    merged[1].product = Some("Euro € print".into());
    let err = export(&merged, &options).unwrap_err();
    match &err {
        PipelineError::Encoding { row, column, .. } => {
            assert_eq!(*row, 2);
            assert_eq!(column, "product");
        }
        other => panic!("expected encoding error, got {other:?}"),
    }
    assert_eq!(err.dataset(), None);

    assert!(export(&merged, &ExportOptions::default()).is_ok(), "UTF-8 holds any value");
}

#[test]
fn test_export_empty_table_is_header_only() {
    let bytes = export(&[], &ExportOptions::default()).unwrap();
    assert_eq!(bytes, b"date,ad_group,spend,clicks,order_id,product,revenue\n");
}

#[test]
fn test_write_export() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(EXPORT_FILENAME);
    let written = write_export(&path, &sample_merged(), &ExportOptions::default()).unwrap();
    assert_eq!(std::fs::metadata(&path).unwrap().len() as usize, written);
    assert_eq!(loader::load_merged_path(&path, &cfg()).unwrap(), sample_merged());
}

// ── Config ──
#[test]
fn test_config_from_toml() {
    let config = Config::from_toml(
        r#"
        date_format = "%d/%m/%Y"
        aggregation = "independent"
        export_encoding = "latin1"
        delimiter = ";"
        preview_rows = 10
        "#,
    )
    .unwrap();

    assert_eq!(config.date_format.as_deref(), Some("%d/%m/%Y"));
    assert_eq!(config.aggregation, etsy_ads_dashboard::AggregationMode::Independent);
    assert_eq!(config.export_encoding, TextEncoding::Latin1);
    assert_eq!(config.delimiter_byte(), b';');
    assert_eq!(config.preview_rows, 10);
    assert_eq!(config.ads_date_column, "date", "unset keys keep defaults");
}

#[test]
fn test_config_rejects_bad_values() {
    assert!(matches!(Config::from_toml("delimiter = \"é\""), Err(ConfigError::Invalid(_))));
    assert!(matches!(Config::from_toml("preview_rows = 0"), Err(ConfigError::Invalid(_))));
    assert!(matches!(Config::from_toml("aggregation = \"weekly\""), Err(ConfigError::Toml(_))));
    assert!(matches!(Config::from_toml("colour = \"red\""), Err(ConfigError::Toml(_))));
    assert!(matches!(Config::load("/nonexistent/dashboard.toml"), Err(ConfigError::Io { .. })));
}

// ── Generator ──
#[test]
fn test_generator_is_seeded() {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let a = SampleGenerator::new(5).generate(start, 10);
    let b = SampleGenerator::new(5).generate(start, 10);
    assert_eq!(a, b);
    assert_eq!(a.0.len(), 10 * etsy_ads_dashboard::generator::AD_GROUPS.len());
}

#[test]
fn test_generated_csv_loads_back() {
    let start = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    let (ads, orders) = SampleGenerator::new(3).generate(start, 14);

    assert_eq!(loader::load_ads(ads_csv(&ads).unwrap().as_slice(), &cfg()).unwrap(), ads);
    assert_eq!(loader::load_orders(orders_csv(&orders).unwrap().as_slice(), &cfg()).unwrap(), orders);
}

#[test]
fn test_generated_csv_quotes_delimiters() {
    let date = day(2024, 1, 2);
    let ads = vec![AdRecord {
        date,
        ad_group: Some("Mugs, Large".into()),
        spend: 3.0,
        clicks: None,
    }];
    let orders = vec![OrderRecord {
        date,
        order_id: Some("ORD-1".into()),
        product: Some("Mug \"Classic\", 12oz".into()),
        revenue: 9.5,
    }];

    let ads_bytes = ads_csv(&ads).unwrap();
    assert_eq!(
        String::from_utf8(ads_bytes.clone()).unwrap(),
        "date,ad_group,spend,clicks\n2024-01-02,\"Mugs, Large\",3,\n"
    );
    assert_eq!(loader::load_ads(ads_bytes.as_slice(), &cfg()).unwrap(), ads);
    assert_eq!(loader::load_orders(orders_csv(&orders).unwrap().as_slice(), &cfg()).unwrap(), orders);
}
