//! The daily report model handed to the report sink.
//!
//! Everything here is already decided; sinks only format and deliver.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::domain::aggregator::{index_section, select_top_tier, IndexSection, TopTier, TopTierCriteria};
use crate::domain::error::{FailureKind, TickerError};
use crate::domain::market_condition::MarketCondition;
use crate::domain::risk::{RegimeInputs, RegimeThresholds, RiskConfig};
use crate::domain::scan::{BacktestOutcome, ScanResult};
use crate::domain::signal::Decision;
use crate::domain::universe::{index_label, Universe};

pub const BACKTEST_NOTE: &str = "Backtests replay a simplified single-unit version of the rules: \
no pyramiding, no volume or volatility filters and no VIX adjustment. \
They approximate, and can diverge from, the live signals above.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportType {
    /// Built from the previous close, for planning before the session.
    #[default]
    MorningPlan,
    /// Built just before the open, for the final decision.
    Premarket,
}

impl ReportType {
    pub fn title(&self) -> &'static str {
        match self {
            ReportType::MorningPlan => "Turtle Trading Report: Morning Plan",
            ReportType::Premarket => "Turtle Trading Report: Premarket",
        }
    }

    pub fn subtitle(&self) -> &'static str {
        match self {
            ReportType::MorningPlan => {
                "Written after the close from the previous session's data, for planning."
            }
            ReportType::Premarket => {
                "Written just before the open with the latest available prices, for the final decision."
            }
        }
    }

    pub fn timing_note(&self) -> &'static str {
        match self {
            ReportType::MorningPlan => {
                "Based on the previous close. Re-check live prices before the market opens."
            }
            ReportType::Premarket => {
                "Reflects premarket prices. Confirm before placing any order."
            }
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReportType::MorningPlan => "morning-plan",
            ReportType::Premarket => "premarket",
        })
    }
}

impl FromStr for ReportType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "morning-plan" => Ok(ReportType::MorningPlan),
            "premarket" | "realtime" => Ok(ReportType::Premarket),
            other => Err(format!(
                "unknown report type '{other}', expected morning-plan or premarket"
            )),
        }
    }
}

/// One failed ticker, for the report's diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedTicker {
    pub ticker: String,
    pub kind: FailureKind,
    pub reason: String,
}

impl FailedTicker {
    fn new(ticker: &str, err: &TickerError) -> Self {
        Self {
            ticker: ticker.to_string(),
            kind: err.kind(),
            reason: err.to_string(),
        }
    }
}

/// Inputs shared by the whole run.
#[derive(Debug, Clone)]
pub struct ReportContext<'a> {
    pub report_type: ReportType,
    pub as_of: NaiveDate,
    pub risk: &'a RiskConfig,
    pub regime: RegimeInputs,
    pub thresholds: RegimeThresholds,
    pub sp500_disparity_pct: f64,
    pub criteria: TopTierCriteria,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailyReport {
    pub report_type: ReportType,
    pub as_of: NaiveDate,
    pub risk: RiskConfig,
    pub regime: RegimeInputs,
    pub thresholds: RegimeThresholds,
    pub market: MarketCondition,
    pub top_tier: TopTier,
    pub sections: Vec<IndexSection>,
    /// Decisions for open holdings, in ticker order.
    pub holdings: Vec<Decision>,
    pub backtests: Vec<BacktestOutcome>,
    pub failures: Vec<FailedTicker>,
    pub failure_counts: BTreeMap<FailureKind, usize>,
    pub universe_size: usize,
    pub evaluated: usize,
}

impl DailyReport {
    pub fn build(ctx: &ReportContext<'_>, universe: &Universe, scan: &ScanResult) -> Self {
        let decisions = scan.decisions();
        let top_tier = select_top_tier(
            &decisions,
            universe.sectors(),
            ctx.risk.sector_limit,
            &ctx.criteria,
        );
        let market = MarketCondition::assess(
            ctx.regime.vix_value,
            ctx.sp500_disparity_pct,
            top_tier.average_atr_ratio(),
            ctx.regime.forward_pe,
        );
        let sections = universe
            .index_names()
            .map(|index| index_section(index_label(index), &universe.list_tickers(index), &decisions))
            .collect();
        let holdings = decisions
            .iter()
            .filter(|d| !d.state.is_flat())
            .cloned()
            .collect();

        DailyReport {
            report_type: ctx.report_type,
            as_of: ctx.as_of,
            risk: ctx.risk.clone(),
            regime: ctx.regime,
            thresholds: ctx.thresholds,
            market,
            top_tier,
            sections,
            holdings,
            backtests: scan.backtests.clone(),
            failures: scan
                .failures()
                .map(|(ticker, err)| FailedTicker::new(ticker, err))
                .collect(),
            failure_counts: scan.failure_counts(),
            universe_size: universe.count(),
            evaluated: scan.succeeded(),
        }
    }

    pub fn subject(&self) -> String {
        format!("{} ({})", self.report_type.title(), self.as_of.format("%Y-%m-%d"))
    }

    /// Maximum loss per unit in KRW.
    pub fn max_loss_krw(&self) -> f64 {
        self.risk.total_seed * self.risk.max_loss_rate
    }
}
