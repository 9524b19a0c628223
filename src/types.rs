use std::fmt;

use serde::Serialize;

pub use crate::dates::EventDate;

// ── Input Types (one row of an uploaded report) ──

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdRecord {
    pub date: EventDate,
    pub ad_group: Option<String>,
    pub spend: f64,
    pub clicks: Option<u64>,
}

impl AdRecord {
    pub fn new(date: EventDate, spend: f64) -> Self {
        Self { date, ad_group: None, spend, clicks: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderRecord {
    pub date: EventDate,
    pub order_id: Option<String>,
    pub product: Option<String>,
    pub revenue: f64,
}

impl OrderRecord {
    pub fn new(date: EventDate, revenue: f64) -> Self {
        Self { date, order_id: None, product: None, revenue }
    }
}

// ── Output Types (handed to the dashboard and the exporter) ──

/// One ad row paired with one matching order, or with none.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedRecord {
    pub date: EventDate,
    pub ad_group: Option<String>,
    pub spend: f64,
    pub clicks: Option<u64>,
    pub order_id: Option<String>,
    pub product: Option<String>,
    pub revenue: Option<f64>,
}

impl MergedRecord {
    pub fn join(ad: &AdRecord, order: Option<&OrderRecord>) -> Self {
        Self {
            date: ad.date,
            ad_group: ad.ad_group.clone(),
            spend: ad.spend,
            clicks: ad.clicks,
            order_id: order.and_then(|o| o.order_id.clone()),
            product: order.and_then(|o| o.product.clone()),
            revenue: order.map(|o| o.revenue),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySummary {
    pub date: EventDate,
    pub total_spend: f64,
    pub total_revenue: f64,
    /// `None` when nothing was spent that day.
    pub roas: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Totals {
    pub spend: f64,
    pub revenue: f64,
    pub roas: Option<f64>,
}

/// Return on ad spend. Zero spend has no defined ratio, including 0/0.
/// Neither does a quotient that overflows, or an overflowed spend total.
pub fn roas(revenue: f64, spend: f64) -> Option<f64> {
    if spend == 0.0 || !spend.is_finite() {
        return None;
    }
    Some(revenue / spend).filter(|r| r.is_finite())
}

/// `n/a` for an undefined ratio, two decimals otherwise.
pub fn format_roas(roas: Option<f64>) -> String {
    match roas {
        Some(r) => format!("{r:.2}"),
        None => "n/a".to_string(),
    }
}

/// Which uploaded table a record or an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dataset {
    Ads,
    Orders,
    Merged,
}

impl Dataset {
    pub fn label(&self) -> &'static str {
        match self {
            Dataset::Ads => "ads",
            Dataset::Orders => "orders",
            Dataset::Merged => "merged",
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
