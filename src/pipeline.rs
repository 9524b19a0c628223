//! Merge ad spend with order revenue by date and derive daily ROAS.
//!
//! Every function here is pure: the same inputs always produce the same
//! rows in the same order.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::info;

use crate::config::AggregationMode;
use crate::types::*;

/// Left join of ads with orders on exact date.
///
/// Each ad is emitted once per order sharing its date, or once with the
/// order fields empty when none does. Output is stable-sorted by date.
pub fn merge(ads: &[AdRecord], orders: &[OrderRecord]) -> Vec<MergedRecord> {
    let mut by_date: HashMap<EventDate, Vec<&OrderRecord>> = HashMap::new();
    for order in orders {
        by_date.entry(order.date).or_default().push(order);
    }

    let mut merged = Vec::with_capacity(ads.len());
    for ad in ads {
        match by_date.get(&ad.date) {
            Some(matches) => {
                merged.extend(matches.iter().map(|order| MergedRecord::join(ad, Some(*order))));
            }
            None => merged.push(MergedRecord::join(ad, None)),
        }
    }

    merged.sort_by_key(|row| row.date);
    merged
}

/// Per-date totals over joined rows.
///
/// Spend is summed over every row, so an ad matched by `n` orders
/// contributes its spend `n` times. Missing revenue counts as zero.
pub fn summarize(merged: &[MergedRecord]) -> Vec<DailySummary> {
    let mut groups: BTreeMap<EventDate, (f64, f64)> = BTreeMap::new();
    for row in merged {
        let entry = groups.entry(row.date).or_insert((0.0, 0.0));
        entry.0 += row.spend;
        entry.1 += row.revenue.unwrap_or(0.0);
    }
    daily_rows(groups)
}

/// Per-date totals with spend and revenue aggregated separately.
///
/// Reports the same dates as `summarize(&merge(ads, orders))` (every ad
/// date) but each ad's spend is counted exactly once.
pub fn summarize_independent(ads: &[AdRecord], orders: &[OrderRecord]) -> Vec<DailySummary> {
    let mut revenue_by_date: HashMap<EventDate, f64> = HashMap::new();
    for order in orders {
        *revenue_by_date.entry(order.date).or_insert(0.0) += order.revenue;
    }

    let mut groups: BTreeMap<EventDate, (f64, f64)> = BTreeMap::new();
    for ad in ads {
        groups.entry(ad.date).or_insert((0.0, 0.0)).0 += ad.spend;
    }
    for (date, totals) in groups.iter_mut() {
        totals.1 = revenue_by_date.get(date).copied().unwrap_or(0.0);
    }
    daily_rows(groups)
}

fn daily_rows(groups: BTreeMap<EventDate, (f64, f64)>) -> Vec<DailySummary> {
    groups
        .into_iter()
        .map(|(date, (total_spend, total_revenue))| DailySummary {
            date,
            total_spend,
            total_revenue,
            roas: roas(total_revenue, total_spend),
        })
        .collect()
}

/// Whole-period spend, revenue and ROAS of a daily summary.
pub fn totals(daily: &[DailySummary]) -> Totals {
    let spend: f64 = daily.iter().map(|d| d.total_spend).sum();
    let revenue: f64 = daily.iter().map(|d| d.total_revenue).sum();
    Totals { spend, revenue, roas: roas(revenue, spend) }
}

/// The two result tables of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub merged: Vec<MergedRecord>,
    pub daily: Vec<DailySummary>,
}

impl Analysis {
    pub fn totals(&self) -> Totals {
        totals(&self.daily)
    }

    /// The first `n` merged rows.
    pub fn preview(&self, n: usize) -> &[MergedRecord] {
        &self.merged[..n.min(self.merged.len())]
    }
}

pub fn analyze(ads: &[AdRecord], orders: &[OrderRecord], mode: AggregationMode) -> Analysis {
    let merged = merge(ads, orders);
    let daily = match mode {
        AggregationMode::Joined => summarize(&merged),
        AggregationMode::Independent => summarize_independent(ads, orders),
    };
    info!(
        ads = ads.len(),
        orders = orders.len(),
        merged = merged.len(),
        days = daily.len(),
        ?mode,
        "pipeline run"
    );
    Analysis { merged, daily }
}
