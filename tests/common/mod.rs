#![allow(dead_code)]

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;
use turtlescan::domain::config_validation::RunSettings;
use turtlescan::domain::error::TurtleError;
use turtlescan::domain::ohlcv::{PriceBar, PriceSeries};
use turtlescan::domain::position::Position;
use turtlescan::domain::risk::RiskConfig;
use turtlescan::domain::universe::Universe;
use turtlescan::ports::data_port::DataPort;
use turtlescan::ports::position_port::PositionPort;
use turtlescan::ports::regime_port::RegimePort;
use turtlescan::ports::universe_port::UniversePort;

pub const BASE_VOLUME: f64 = 1_000_000.0;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn start_date() -> NaiveDate {
    date(2023, 1, 2)
}

/// Date of the last bar of an `n`-bar series from the generators below.
pub fn last_date(n: usize) -> NaiveDate {
    start_date() + chrono::Duration::days(n as i64 - 1)
}

fn bar(i: usize, mid: f64, close: f64, half_range: f64, volume: f64) -> PriceBar {
    PriceBar {
        date: start_date() + chrono::Duration::days(i as i64),
        open: mid,
        high: mid + half_range,
        low: mid - half_range,
        close,
        volume,
    }
}

/// Mid price drifts by `drift` a bar; closes alternate 0.8 above and below
/// it, ending on a down close at bar `n - 1`.
fn zigzag(n: usize, start: f64, drift: f64) -> Vec<PriceBar> {
    (0..n)
        .map(|i| {
            let mid = start + drift * i as f64;
            let side = if (n - 1 - i) % 2 == 0 { -0.8 } else { 0.8 };
            bar(i, mid, mid + side, 1.5, BASE_VOLUME)
        })
        .collect()
}

/// Steady uptrend finished by a wide-range breakout bar on triple volume.
///
/// Every filter of the entry rule and of the top tier holds on the last bar:
/// ATR is 3.0 before the breakout and 3.05 on it, RSI sits near 66, -DI is
/// zero and the close clears the prior 20-day high by 1.1.
pub fn breakout_series(ticker: &str, n: usize) -> PriceSeries {
    let mut bars = zigzag(n - 1, 50.0, 0.4);
    let prev_mid = 50.0 + 0.4 * (n - 2) as f64;
    bars.push(PriceBar {
        date: start_date() + chrono::Duration::days(n as i64 - 1),
        open: prev_mid,
        high: prev_mid + 3.0,
        low: prev_mid - 1.0,
        close: prev_mid + 2.6,
        volume: 3.0 * BASE_VOLUME,
    });
    PriceSeries::new(ticker, bars)
}

/// Steady downtrend: closes below SMA200, never breaking out.
pub fn falling_series(ticker: &str, n: usize) -> PriceSeries {
    PriceSeries::new(ticker, zigzag(n, 220.0, -0.4))
}

/// Sideways series with no trend at all.
pub fn sideways_series(ticker: &str, n: usize) -> PriceSeries {
    let bars = (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.3).sin();
            bar(i, close, close, 1.0, BASE_VOLUME)
        })
        .collect();
    PriceSeries::new(ticker, bars)
}

/// Builds a series from closes, with a fixed one-point range around each.
pub fn series_from_closes(ticker: &str, closes: &[f64]) -> PriceSeries {
    let bars = closes
        .iter()
        .enumerate()
        .map(|(i, &c)| bar(i, c, c, 1.0, BASE_VOLUME))
        .collect();
    PriceSeries::new(ticker, bars)
}

pub fn position(ticker: &str, buy_price: f64, units: u32) -> Position {
    Position {
        ticker: ticker.to_string(),
        buy_date: date(2023, 9, 1),
        buy_price,
        units,
    }
}

pub fn risk_config() -> RiskConfig {
    RiskConfig {
        total_seed: 100_000_000.0,
        max_loss_rate: 0.01,
        volume_ratio_threshold: 1.5,
        adx_threshold: 20.0,
        atr_upper_limit_pct: 5.0,
        sector_limit: 2,
        max_pyramid_units: 4,
        forward_pe_default: 22.0,
    }
}

pub fn run_settings() -> RunSettings {
    RunSettings {
        backtest_limit: 3,
        max_stale_days: 7,
        vix_default: 30.0,
        exchange_rate_default: 1372.88,
        price_dir: "data/prices".into(),
        universe_file: "data/universe.csv".into(),
        positions_file: "portfolio.csv".into(),
        report_output: "report.html".into(),
    }
}

pub struct MockDataPort {
    pub series: BTreeMap<String, PriceSeries>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            series: BTreeMap::new(),
        }
    }

    pub fn with(mut self, series: PriceSeries) -> Self {
        self.series.insert(series.ticker.clone(), series);
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_daily_series(&self, ticker: &str, _lookback: usize) -> Result<PriceSeries, TurtleError> {
        self.series.get(ticker).cloned().ok_or(TurtleError::NoData {
            ticker: ticker.to_string(),
        })
    }
}

pub struct MockRegime {
    pub vix: f64,
    pub exchange_rate: f64,
    pub forward_pe: f64,
}

impl MockRegime {
    pub fn calm() -> Self {
        Self {
            vix: 15.0,
            exchange_rate: 1350.0,
            forward_pe: 21.5,
        }
    }
}

impl RegimePort for MockRegime {
    fn fetch_vix(&self) -> Result<f64, TurtleError> {
        Ok(self.vix)
    }

    fn fetch_exchange_rate(&self) -> Result<f64, TurtleError> {
        Ok(self.exchange_rate)
    }

    fn fetch_forward_pe(&self, _index_ticker: &str) -> Result<f64, TurtleError> {
        Ok(self.forward_pe)
    }
}

pub struct MockUniverse(pub Universe);

impl UniversePort for MockUniverse {
    fn load_universe(&self) -> Result<Universe, TurtleError> {
        Ok(self.0.clone())
    }
}

pub struct MockPositions(pub BTreeMap<String, Position>);

impl MockPositions {
    pub fn of(positions: Vec<Position>) -> Self {
        Self(positions.into_iter().map(|p| (p.ticker.clone(), p)).collect())
    }
}

impl PositionPort for MockPositions {
    fn load_positions(&self) -> Result<BTreeMap<String, Position>, TurtleError> {
        Ok(self.0.clone())
    }
}

/// Writes `<TICKER>.csv` in the layout the CSV adapter reads.
pub fn write_price_csv(dir: &Path, series: &PriceSeries) {
    let mut out = String::from("date,open,high,low,close,volume\n");
    for b in &series.bars {
        writeln!(
            out,
            "{},{},{},{},{},{}",
            b.date.format("%Y-%m-%d"),
            b.open,
            b.high,
            b.low,
            b.close,
            b.volume
        )
        .unwrap();
    }
    std::fs::write(dir.join(format!("{}.csv", series.ticker)), out).unwrap();
}
