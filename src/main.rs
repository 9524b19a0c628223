use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{ArgAction, Parser};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use etsy_ads_dashboard::config::{AggregationMode, Config, TextEncoding};
use etsy_ads_dashboard::export::{self, EXPORT_FILENAME};
use etsy_ads_dashboard::generator::SampleGenerator;
use etsy_ads_dashboard::loader;
use etsy_ads_dashboard::pipeline::{self, Analysis};
use etsy_ads_dashboard::tui;
use etsy_ads_dashboard::types::{format_roas, AdRecord, OrderRecord};
use etsy_ads_dashboard::web;

#[derive(Parser)]
#[command(name = "etsy-ads-dashboard", about = "Etsy Ads & Sales Analytics Dashboard")]
struct Cli {
    /// Run mode: tui, web, or headless
    #[arg(long, default_value = "tui")]
    mode: String,

    /// Etsy Ads CSV (date, spend, optional ad_group and clicks)
    #[arg(long)]
    ads: Option<PathBuf>,

    /// Etsy Orders CSV (date, revenue, optional order_id and product)
    #[arg(long)]
    orders: Option<PathBuf>,

    /// Use generated sample data instead of --ads/--orders
    #[arg(long)]
    demo: bool,

    /// Sample data seed (demo only)
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Days of sample data (demo only)
    #[arg(long, default_value = "30")]
    days: u32,

    /// Where to write the merged CSV
    #[arg(long)]
    output: Option<PathBuf>,

    /// Web server port (web mode only)
    #[arg(long, default_value = "3000")]
    port: u16,

    /// TOML file with loader/export settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Explicit chrono date format for both inputs, e.g. %d/%m/%Y
    #[arg(long)]
    date_format: Option<String>,

    #[arg(long, value_enum)]
    aggregation: Option<AggregationMode>,

    #[arg(long, value_enum)]
    export_encoding: Option<TextEncoding>,

    /// -v debug, -vv trace
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(&cli);

    let config = build_config(&cli)?;
    debug!(?config, "effective config");

    match cli.mode.as_str() {
        "tui" => {
            let analysis = run_pipeline(&cli, &config)?;
            let output = cli.output.clone().unwrap_or_else(|| PathBuf::from(EXPORT_FILENAME));
            tui::run(&analysis, &config, output)?
        }
        "web" => web::run(cli.port, config).await?,
        "headless" => run_headless(&cli, &config)?,
        other => eprintln!("Unknown mode: {other}. Use --mode tui|web|headless"),
    }

    Ok(())
}

fn init_logging(cli: &Cli) {
    // The TUI owns the terminal; stay quiet unless RUST_LOG asks otherwise.
    let level = match (cli.mode.as_str(), cli.verbose) {
        ("tui", _) => "off",
        (_, 0) => "info",
        (_, 1) => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(cli.verbose >= 2)
        .init();
}

fn build_config(cli: &Cli) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(format) = &cli.date_format {
        config.date_format = Some(format.clone());
    }
    if let Some(mode) = cli.aggregation {
        config.aggregation = mode;
    }
    if let Some(encoding) = cli.export_encoding {
        config.export_encoding = encoding;
    }
    config.validate()?;
    Ok(config)
}

fn load_inputs(cli: &Cli, config: &Config) -> Result<(Vec<AdRecord>, Vec<OrderRecord>), Box<dyn std::error::Error>> {
    if cli.demo {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).ok_or("invalid demo start date")?;
        return Ok(SampleGenerator::new(cli.seed).generate(start, cli.days));
    }
    match (&cli.ads, &cli.orders) {
        (Some(ads), Some(orders)) => Ok((
            loader::load_ads_path(ads, config)?,
            loader::load_orders_path(orders, config)?,
        )),
        _ => Err("Please provide both --ads and --orders CSV files (or --demo) to begin.".into()),
    }
}

fn run_pipeline(cli: &Cli, config: &Config) -> Result<Analysis, Box<dyn std::error::Error>> {
    let (ads, orders) = load_inputs(cli, config)?;
    Ok(pipeline::analyze(&ads, &orders, config.aggregation))
}

fn run_headless(cli: &Cli, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let analysis = run_pipeline(cli, config)?;
    let totals = analysis.totals();

    println!("=== Etsy Ads & Sales Analytics ===");
    println!(
        "Spend: {:.2}  Revenue: {:.2}  ROAS: {}  ({} merged rows, {} days)",
        totals.spend,
        totals.revenue,
        format_roas(totals.roas),
        analysis.merged.len(),
        analysis.daily.len()
    );
    println!();

    println!("Daily Spend vs Revenue");
    println!("  {:<20} {:>12} {:>12} {:>8}", "DATE", "SPEND", "REVENUE", "ROAS");
    for day in &analysis.daily {
        println!(
            "  {:<20} {:>12.2} {:>12.2} {:>8}",
            day.date.to_string(),
            day.total_spend,
            day.total_revenue,
            format_roas(day.roas)
        );
    }
    println!();

    println!("Raw Merged Data (first {})", config.preview_rows);
    println!(
        "  {:<20} {:<16} {:>8} {:>6} {:<12} {:<20} {:>8}",
        "DATE", "AD_GROUP", "SPEND", "CLICKS", "ORDER_ID", "PRODUCT", "REVENUE"
    );
    for row in analysis.preview(config.preview_rows) {
        println!(
            "  {:<20} {:<16} {:>8.2} {:>6} {:<12} {:<20} {:>8}",
            row.date.to_string(),
            row.ad_group.as_deref().unwrap_or("-"),
            row.spend,
            row.clicks.map(|c| c.to_string()).unwrap_or_else(|| "-".into()),
            row.order_id.as_deref().unwrap_or("-"),
            row.product.as_deref().unwrap_or("-"),
            row.revenue.map(|r| format!("{r:.2}")).unwrap_or_else(|| "-".into()),
        );
    }

    if let Some(path) = &cli.output {
        let bytes = export::write_export(path, &analysis.merged, &config.export_options())?;
        println!();
        println!("Wrote {} bytes to {}", bytes, path.display());
    }

    Ok(())
}
