use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use csv::{QuoteStyle, WriterBuilder};
use rand::{Rng, SeedableRng};

use crate::error::{PipelineError, Result};
use crate::loader::{AD_GROUP, CLICKS, DATE, ORDER_ID, PRODUCT, REVENUE, SPEND};
use crate::types::{AdRecord, Dataset, EventDate, OrderRecord};

pub const AD_GROUPS: &[&str] = &["Ceramic Mugs", "Linen Napkins", "Wall Prints", "Gift Bundles"];

pub const PRODUCTS: &[(&str, f64)] = &[
    ("Speckled Mug", 28.0),
    ("Linen Napkin Set", 42.0),
    ("Botanical Print A4", 18.5),
    ("Holiday Gift Box", 65.0),
    ("Espresso Cup Pair", 34.0),
];

/// Deterministic synthetic Etsy reports for demo runs and benchmarks.
pub struct SampleGenerator {
    rng: StdRng,
    order_seq: u64,
    /// Chance that a day has every ad group paused (zero spend).
    pub pause_rate: f64,
}

impl SampleGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            order_seq: 0,
            pause_rate: 0.1,
        }
    }

    /// One ad row per group per day, zero to six orders per day.
    pub fn generate(&mut self, start: NaiveDate, days: u32) -> (Vec<AdRecord>, Vec<OrderRecord>) {
        let mut ads = Vec::with_capacity(days as usize * AD_GROUPS.len());
        let mut orders = Vec::new();

        for offset in 0..days {
            let date = EventDate::from_date(start + Duration::days(i64::from(offset)));
            let paused = self.rng.gen_bool(self.pause_rate.clamp(0.0, 1.0));

            for group in AD_GROUPS {
                let (spend, clicks) = if paused {
                    (0.0, 0)
                } else {
                    (cents(self.rng.gen_range(0.5..12.0)), self.rng.gen_range(0..60))
                };
                ads.push(AdRecord {
                    date,
                    ad_group: Some(group.to_string()),
                    spend,
                    clicks: Some(clicks),
                });
            }

            let order_count = self.rng.gen_range(0..=6);
            for _ in 0..order_count {
                orders.push(self.order(date));
            }
        }

        (ads, orders)
    }

    /// Fixed-shape data for throughput runs: `ads_per_day` ad rows and
    /// `orders_per_day` orders on each of `days` days.
    pub fn generate_stress(
        &mut self,
        start: NaiveDate,
        days: u32,
        ads_per_day: usize,
        orders_per_day: usize,
    ) -> (Vec<AdRecord>, Vec<OrderRecord>) {
        let mut ads = Vec::with_capacity(days as usize * ads_per_day);
        let mut orders = Vec::with_capacity(days as usize * orders_per_day);

        for offset in 0..days {
            let date = EventDate::from_date(start + Duration::days(i64::from(offset)));
            for i in 0..ads_per_day {
                ads.push(AdRecord {
                    date,
                    ad_group: Some(AD_GROUPS[i % AD_GROUPS.len()].to_string()),
                    spend: cents(self.rng.gen_range(0.5..12.0)),
                    clicks: Some(self.rng.gen_range(0..60)),
                });
            }
            for _ in 0..orders_per_day {
                orders.push(self.order(date));
            }
        }

        (ads, orders)
    }

    fn order(&mut self, date: EventDate) -> OrderRecord {
        let (product, price) = PRODUCTS[self.rng.gen_range(0..PRODUCTS.len())];
        let quantity: u32 = self.rng.gen_range(1..=3);
        self.order_seq += 1;
        OrderRecord {
            date,
            order_id: Some(format!("ORD-{:06}", self.order_seq)),
            product: Some(product.to_string()),
            revenue: cents(price * f64::from(quantity)),
        }
    }
}

fn cents(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Renders ads the way an Etsy ads report is uploaded.
pub fn ads_csv(ads: &[AdRecord]) -> Result<Vec<u8>> {
    let rows = ads.iter().map(|ad| {
        [
            ad.date.to_string(),
            ad.ad_group.clone().unwrap_or_default(),
            ad.spend.to_string(),
            ad.clicks.map(|c| c.to_string()).unwrap_or_default(),
        ]
    });
    write_csv(Dataset::Ads, [DATE, AD_GROUP, SPEND, CLICKS], rows)
}

/// Renders orders the way an Etsy orders report is uploaded.
pub fn orders_csv(orders: &[OrderRecord]) -> Result<Vec<u8>> {
    let rows = orders.iter().map(|order| {
        [
            order.date.to_string(),
            order.order_id.clone().unwrap_or_default(),
            order.product.clone().unwrap_or_default(),
            order.revenue.to_string(),
        ]
    });
    write_csv(Dataset::Orders, [DATE, ORDER_ID, PRODUCT, REVENUE], rows)
}

fn write_csv(
    dataset: Dataset,
    headers: [&str; 4],
    rows: impl Iterator<Item = [String; 4]>,
) -> Result<Vec<u8>> {
    let csv_err = |source| PipelineError::Csv { dataset, source };

    let mut wtr = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .from_writer(Vec::new());
    wtr.write_record(headers).map_err(csv_err)?;
    for row in rows {
        wtr.write_record(&row).map_err(csv_err)?;
    }
    wtr.into_inner()
        .map_err(|e| csv_err(csv::Error::from(e.into_error())))
}
