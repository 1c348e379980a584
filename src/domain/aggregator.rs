//! Ranking of BUY candidates and per-index signal listings.
//!
//! The top tier is a stricter filter over BUY decisions with a per-sector
//! cap. Admission under the cap depends on processing order, so candidates
//! are admitted in a fixed order (ascending ATR ratio, then ticker) that does
//! not depend on how the caller happened to collect its decisions.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use crate::domain::signal::{Decision, Signal};

pub const UNKNOWN_SECTOR: &str = "Unknown";

/// Thresholds for the top tier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TopTierCriteria {
    pub min_adx: f64,
    pub min_atr_ratio: f64,
    pub max_atr_ratio: f64,
    pub min_volume_ratio: f64,
    pub max_rsi: f64,
}

impl Default for TopTierCriteria {
    fn default() -> Self {
        Self {
            min_adx: 25.0,
            min_atr_ratio: 1.5,
            max_atr_ratio: 3.5,
            min_volume_ratio: 1.5,
            max_rsi: 70.0,
        }
    }
}

impl TopTierCriteria {
    pub fn qualifies(&self, decision: &Decision) -> bool {
        let s = &decision.snapshot;
        decision.signal == Signal::Buy
            && s.adx > self.min_adx
            && s.plus_di > s.minus_di
            && s.is_above_sma200()
            && (self.min_atr_ratio..=self.max_atr_ratio).contains(&s.atr_ratio)
            && s.volume_ratio > self.min_volume_ratio
            && s.volume > s.avg_volume_20
            && decision.entry.quantity > 0
            && s.rsi < self.max_rsi
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TopTierCandidate {
    pub sector: String,
    pub decision: Decision,
}

/// Candidates dropped because their sector was already full.
#[derive(Debug, Clone, PartialEq)]
pub struct SectorCapped {
    pub ticker: String,
    pub sector: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TopTier {
    pub candidates: Vec<TopTierCandidate>,
    pub capped: Vec<SectorCapped>,
}

impl TopTier {
    pub fn average_atr_ratio(&self) -> f64 {
        if self.candidates.is_empty() {
            return 0.0;
        }
        self.candidates
            .iter()
            .map(|c| c.decision.snapshot.atr_ratio)
            .sum::<f64>()
            / self.candidates.len() as f64
    }
}

fn by_atr_ratio(a: &Decision, b: &Decision) -> Ordering {
    a.snapshot
        .atr_ratio
        .total_cmp(&b.snapshot.atr_ratio)
        .then_with(|| a.ticker.cmp(&b.ticker))
}

pub fn select_top_tier(
    decisions: &[Decision],
    sectors: &BTreeMap<String, String>,
    sector_limit: usize,
    criteria: &TopTierCriteria,
) -> TopTier {
    let mut qualifying: Vec<&Decision> = decisions.iter().filter(|d| criteria.qualifies(d)).collect();
    qualifying.sort_by(|a, b| by_atr_ratio(a, b));

    let mut per_sector: BTreeMap<&str, usize> = BTreeMap::new();
    let mut tier = TopTier::default();

    for decision in qualifying {
        let sector = sectors
            .get(&decision.ticker)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_SECTOR);
        let count = per_sector.entry(sector).or_insert(0);
        if *count >= sector_limit {
            tier.capped.push(SectorCapped {
                ticker: decision.ticker.clone(),
                sector: sector.to_string(),
            });
            continue;
        }
        *count += 1;
        tier.candidates.push(TopTierCandidate {
            sector: sector.to_string(),
            decision: decision.clone(),
        });
    }

    tier
}

/// BUY and SELL listings for one index, unfiltered by sector.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSection {
    pub name: String,
    pub ticker_count: usize,
    pub buys: Vec<Decision>,
    pub sells: Vec<Decision>,
}

pub fn index_section(name: &str, members: &BTreeSet<String>, decisions: &[Decision]) -> IndexSection {
    let mut buys: Vec<Decision> = Vec::new();
    let mut sells: Vec<Decision> = Vec::new();
    for decision in decisions.iter().filter(|d| members.contains(&d.ticker)) {
        match decision.signal {
            Signal::Buy => buys.push(decision.clone()),
            s if s.is_sell_like() => sells.push(decision.clone()),
            _ => {}
        }
    }
    buys.sort_by(by_atr_ratio);
    sells.sort_by(by_atr_ratio);

    IndexSection {
        name: name.to_string(),
        ticker_count: members.len(),
        buys,
        sells,
    }
}
