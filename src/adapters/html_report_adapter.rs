//! HTML rendering of the daily report with Askama.
//!
//! All number formatting happens here so the template stays dumb. Prices are
//! shown in USD with the KRW equivalent alongside.

use std::fs;
use std::path::{Path, PathBuf};

use askama::Template;
use tracing::info;

use crate::domain::aggregator::IndexSection;
use crate::domain::error::TurtleError;
use crate::domain::position::PositionState;
use crate::domain::report::{DailyReport, BACKTEST_NOTE};
use crate::domain::signal::Decision;
use crate::ports::report_port::ReportPort;

/// Inserts `,` between groups of three digits in the integer part.
fn group_thousands(formatted: &str) -> String {
    let (sign, rest) = match formatted.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", formatted),
    };
    let (int_part, frac_part) = match rest.find('.') {
        Some(pos) => rest.split_at(pos),
        None => (rest, ""),
    };
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{sign}{grouped}{frac_part}")
}

/// KRW amount in 억원 (10^8) above one 억, otherwise in 만원 (10^4).
pub fn format_krw(amount: f64) -> String {
    if amount >= 1e8 {
        format!("{}억원", group_thousands(&format!("{:.1}", amount / 1e8)))
    } else {
        format!("{}만원", group_thousands(&format!("{:.0}", amount / 1e4)))
    }
}

fn usd_krw(usd: f64, exchange_rate: f64) -> String {
    format!("${:.2} ({})", usd, format_krw((usd * exchange_rate).round()))
}

struct MarketRow {
    gauge: &'static str,
    value: String,
    reading: String,
}

struct SignalRow {
    ticker: String,
    sector: String,
    signal: String,
    close: String,
    traded: String,
    volume_ratio: String,
    atr_ratio: String,
    rsi: String,
    target: String,
    stop: String,
    quantity: String,
}

impl SignalRow {
    fn new(decision: &Decision, sector: &str, exchange_rate: f64) -> Self {
        let s = &decision.snapshot;
        Self {
            ticker: decision.ticker.clone(),
            sector: sector.to_string(),
            signal: decision.signal.to_string(),
            close: usd_krw(s.close, exchange_rate),
            traded: format!("{:.1}억원", s.volume_krw_billion(exchange_rate)),
            volume_ratio: format!("{:.1}x", s.volume_ratio),
            atr_ratio: format!("{:.2}", s.atr_ratio),
            rsi: format!("{:.2}", s.rsi),
            target: usd_krw(decision.entry.target_price, exchange_rate),
            stop: usd_krw(decision.entry.stop_price, exchange_rate),
            quantity: group_thousands(&decision.entry.quantity.to_string()),
        }
    }
}

struct HoldingRow {
    ticker: String,
    signal: String,
    units: String,
    entry: String,
    close: String,
    stop: String,
    pyramid: String,
}

struct SectionView {
    name: String,
    ticker_count: usize,
    buys: Vec<SignalRow>,
    sells: Vec<SignalRow>,
}

struct BacktestRow {
    ticker: String,
    total_return: String,
    max_drawdown: String,
    trades: String,
}

struct FailureRow {
    ticker: String,
    kind: String,
    reason: String,
}

#[derive(Template)]
#[template(path = "daily_report.html")]
struct DailyReportTemplate {
    title: &'static str,
    subtitle: &'static str,
    timing_note: &'static str,
    as_of: String,
    vix: String,
    exchange_rate: String,
    forward_pe: String,
    seed: String,
    max_loss: String,
    adx_threshold: String,
    atr_ceiling: String,
    market_rows: Vec<MarketRow>,
    phase: String,
    advice: &'static str,
    top_tier: Vec<SignalRow>,
    capped: String,
    holdings: Vec<HoldingRow>,
    sections: Vec<SectionView>,
    backtest_note: &'static str,
    backtests: Vec<BacktestRow>,
    evaluated: usize,
    universe_size: usize,
    failures: Vec<FailureRow>,
}

fn section_view(section: &IndexSection, report: &DailyReport) -> SectionView {
    let fx = report.regime.exchange_rate_krw_usd;
    let row = |d: &Decision| SignalRow::new(d, "", fx);
    SectionView {
        name: section.name.clone(),
        ticker_count: section.ticker_count,
        buys: section.buys.iter().map(row).collect(),
        sells: section.sells.iter().map(row).collect(),
    }
}

fn build_template(report: &DailyReport) -> DailyReportTemplate {
    let fx = report.regime.exchange_rate_krw_usd;
    let m = &report.market;
    let market_rows = vec![
        MarketRow {
            gauge: "VIX",
            value: format!("{:.2}", m.vix),
            reading: m.vix_level.to_string(),
        },
        MarketRow {
            gauge: "S&P 500 disparity",
            value: format!("{:+.1}%", m.sp500_disparity_pct),
            reading: m.disparity_level.to_string(),
        },
        MarketRow {
            gauge: "Top-tier average ATR",
            value: format!("{:.2}%", m.avg_atr_ratio),
            reading: m.volatility_level.to_string(),
        },
        MarketRow {
            gauge: "Forward P/E",
            value: format!("{:.1}x", m.forward_pe),
            reading: m.valuation_level.to_string(),
        },
    ];

    let holdings = report
        .holdings
        .iter()
        .map(|d| HoldingRow {
            ticker: d.ticker.clone(),
            signal: d.signal.to_string(),
            units: format!("{} → {}", d.state.units(), d.next_units),
            entry: match d.state {
                PositionState::Holding { entry_price, .. } => {
                    usd_krw(entry_price, fx)
                }
                PositionState::Flat => String::new(),
            },
            close: usd_krw(d.snapshot.close, fx),
            stop: d
                .holding
                .map(|h| usd_krw(h.stop_price, fx))
                .unwrap_or_default(),
            pyramid: d
                .holding
                .map(|h| usd_krw(h.pyramid_price, fx))
                .unwrap_or_default(),
        })
        .collect();

    let backtests = report
        .backtests
        .iter()
        .map(|b| match &b.result {
            Ok(r) => BacktestRow {
                ticker: b.ticker.clone(),
                total_return: format!("{:+.2}%", r.total_return_pct),
                max_drawdown: format!("{:.2}%", r.max_drawdown_pct),
                trades: r.trades.to_string(),
            },
            Err(e) => BacktestRow {
                ticker: b.ticker.clone(),
                total_return: e.kind().to_string(),
                max_drawdown: String::new(),
                trades: String::new(),
            },
        })
        .collect();

    DailyReportTemplate {
        title: report.report_type.title(),
        subtitle: report.report_type.subtitle(),
        timing_note: report.report_type.timing_note(),
        as_of: report.as_of.format("%Y-%m-%d").to_string(),
        vix: format!("{:.2}", report.regime.vix_value),
        exchange_rate: group_thousands(&format!("{fx:.2}")),
        forward_pe: format!("{:.1}", report.regime.forward_pe),
        seed: format!("{}원", group_thousands(&format!("{:.0}", report.risk.total_seed))),
        max_loss: format!("{}원", group_thousands(&format!("{:.0}", report.max_loss_krw()))),
        adx_threshold: format!("{:.1}", report.thresholds.adx_threshold),
        atr_ceiling: format!("{:.2}", report.thresholds.atr_upper_limit_pct),
        market_rows,
        phase: m.phase.to_string(),
        advice: m.phase.advice(),
        top_tier: report
            .top_tier
            .candidates
            .iter()
            .map(|c| SignalRow::new(&c.decision, &c.sector, fx))
            .collect(),
        capped: report
            .top_tier
            .capped
            .iter()
            .map(|c| format!("{} ({})", c.ticker, c.sector))
            .collect::<Vec<_>>()
            .join(", "),
        holdings,
        sections: report.sections.iter().map(|s| section_view(s, report)).collect(),
        backtest_note: BACKTEST_NOTE,
        backtests,
        evaluated: report.evaluated,
        universe_size: report.universe_size,
        failures: report
            .failures
            .iter()
            .map(|f| FailureRow {
                ticker: f.ticker.clone(),
                kind: f.kind.to_string(),
                reason: f.reason.clone(),
            })
            .collect(),
    }
}

pub struct HtmlReportAdapter;

impl HtmlReportAdapter {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, report: &DailyReport) -> Result<String, TurtleError> {
        build_template(report)
            .render()
            .map_err(|e| TurtleError::Report {
                reason: format!("template rendering failed: {e}"),
            })
    }
}

impl Default for HtmlReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

/// Writes the rendered report to a file.
pub struct FileReportSink {
    path: PathBuf,
    renderer: HtmlReportAdapter,
}

impl FileReportSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            renderer: HtmlReportAdapter::new(),
        }
    }
}

impl ReportPort for FileReportSink {
    fn render_and_send(&self, report: &DailyReport) -> Result<(), TurtleError> {
        let html = self.renderer.render(report)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, html)?;
        info!(path = %self.path.display(), "report written");
        Ok(())
    }
}
