//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::html_report_adapter::{FileReportSink, format_krw};
use crate::adapters::position_csv_adapter::PositionCsvAdapter;
use crate::adapters::regime_adapter::CsvRegimeAdapter;
use crate::adapters::universe_file_adapter::UniverseFileAdapter;
use crate::domain::aggregator::TopTierCriteria;
use crate::domain::backtest::{BacktestConfig, run_backtest};
use crate::domain::config_validation::{
    RunSettings, load_email_settings, load_risk_config, load_run_settings,
};
use crate::domain::error::TurtleError;
use crate::domain::market_condition::index_disparity;
use crate::domain::position::Position;
use crate::domain::report::{BACKTEST_NOTE, DailyReport, ReportContext, ReportType};
use crate::domain::risk::{RegimeInputs, RiskConfig};
use crate::domain::scan::{
    BacktestPlan, LOOKBACK_BARS, RegimeFallbacks, SP500_INDEX_TICKER, ScanOptions, load_regime,
    scan_universe,
};
use crate::domain::signal::{EvaluationContext, Staleness, evaluate_ticker};
use crate::domain::snapshot::MIN_BARS;
use crate::domain::universe::{Universe, normalize_ticker, parse_tickers};
use crate::logging::init_logging;
use crate::ports::data_port::DataPort;
use crate::ports::position_port::PositionPort;
use crate::ports::regime_port::RegimePort;
use crate::ports::report_port::ReportPort;
use crate::ports::universe_port::UniversePort;

/// Environment variable holding the SMTP password.
pub const PASSWORD_ENV: &str = "GMAIL_APP_PASSWORD";

#[derive(Parser, Debug)]
#[command(name = "turtlescan", about = "Turtle trend-following signal scanner")]
pub struct Cli {
    /// Log level, overridden by RUST_LOG
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,
    /// `json` or `pretty`
    #[arg(long, global = true, default_value = "pretty")]
    pub log_format: String,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan the universe and write (and optionally email) the daily report
    Run {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long, env = "REPORT_TYPE", default_value_t = ReportType::MorningPlan)]
        report_type: ReportType,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Comma-separated tickers to scan instead of the whole universe
        #[arg(long)]
        tickers: Option<String>,
        /// Reference date for staleness checks (YYYY-MM-DD, default today)
        #[arg(long)]
        as_of: Option<NaiveDate>,
        #[arg(long)]
        no_email: bool,
        /// Validate settings and inputs without scanning
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a settings file
    Check {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Evaluate a single ticker and print the decision
    Signal {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        ticker: String,
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Replay the single-unit rule over a ticker's history
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        ticker: String,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    init_logging(&cli.log_level, &cli.log_format);

    match cli.command {
        Command::Run {
            config,
            report_type,
            output,
            tickers,
            as_of,
            no_email,
            dry_run,
        } => {
            let options = RunOptions {
                report_type,
                output,
                tickers,
                as_of,
                send_email: !no_email,
            };
            if dry_run {
                run_dry_run(&config, &options)
            } else {
                run_report(&config, &options)
            }
        }
        Command::Check { config } => run_check(&config),
        Command::Signal {
            config,
            ticker,
            as_of,
        } => run_signal(&config, &ticker, as_of),
        Command::Backtest { config, ticker } => run_single_backtest(&config, &ticker),
    }
}

/// Flags of the `run` subcommand.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub report_type: ReportType,
    pub output: Option<PathBuf>,
    pub tickers: Option<String>,
    pub as_of: Option<NaiveDate>,
    pub send_email: bool,
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = match e {
            TurtleError::Io(io) => TurtleError::ConfigParse {
                file: path.display().to_string(),
                reason: io.to_string(),
            },
            other => other,
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn fail(e: TurtleError) -> ExitCode {
    eprintln!("error: {e}");
    (&e).into()
}

/// Everything a run needs from its settings file.
pub struct LoadedSettings {
    pub risk: RiskConfig,
    pub run: RunSettings,
    pub config: FileConfigAdapter,
}

fn load_settings(path: &Path) -> Result<LoadedSettings, ExitCode> {
    let config = load_config(path)?;
    let risk = load_risk_config(&config).map_err(fail)?;
    let run = load_run_settings(&config).map_err(fail)?;
    Ok(LoadedSettings { risk, run, config })
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// The collaborators a report run reads from.
pub struct Collaborators<'a> {
    pub data: &'a dyn DataPort,
    pub regime: &'a dyn RegimePort,
    pub universe: &'a dyn UniversePort,
    pub positions: &'a dyn PositionPort,
}

/// Loads inputs, scans the universe and assembles the report. No delivery.
pub fn build_report(
    ports: &Collaborators<'_>,
    risk: &RiskConfig,
    settings: &RunSettings,
    report_type: ReportType,
    as_of: NaiveDate,
    ticker_filter: Option<&[String]>,
) -> Result<DailyReport, TurtleError> {
    let mut universe = ports.universe.load_universe()?;
    if let Some(filter) = ticker_filter {
        universe.restrict_to(filter);
    }
    let positions = ports.positions.load_positions()?;
    let held = held_tickers(&positions, ticker_filter);

    let mut tickers = universe.all_tickers();
    tickers.extend(held.iter().cloned());
    info!(
        universe = universe.count(),
        held = held.len(),
        tickers = tickers.len(),
        "inputs loaded"
    );
    if tickers.is_empty() {
        return Err(TurtleError::EmptyUniverse);
    }

    let fallbacks = RegimeFallbacks {
        vix: settings.vix_default,
        exchange_rate: settings.exchange_rate_default,
        forward_pe: risk.forward_pe_default,
    };
    let regime = load_regime(ports.regime, &fallbacks);
    let ctx = EvaluationContext::new(risk, &regime).with_staleness(Staleness {
        as_of,
        max_days: settings.max_stale_days,
    });

    let options = ScanOptions {
        lookback: LOOKBACK_BARS,
        backtest: Some(BacktestPlan {
            config: BacktestConfig::new(risk.adx_threshold),
            limit: settings.backtest_limit,
        }),
    };
    let scan = scan_universe(ports.data, &tickers, &positions, &ctx, &options)?;

    let report_ctx = ReportContext {
        report_type,
        as_of,
        risk,
        regime,
        thresholds: ctx.thresholds,
        sp500_disparity_pct: sp500_disparity(ports.data),
        criteria: TopTierCriteria::default(),
    };
    Ok(DailyReport::build(&report_ctx, &universe, &scan))
}

fn held_tickers(
    positions: &BTreeMap<String, Position>,
    filter: Option<&[String]>,
) -> BTreeSet<String> {
    positions
        .values()
        .filter(|p| p.units > 0)
        .map(|p| p.ticker.clone())
        .filter(|t| filter.is_none_or(|f| f.contains(t)))
        .collect()
}

fn sp500_disparity(data: &dyn DataPort) -> f64 {
    match data.fetch_daily_series(SP500_INDEX_TICKER, LOOKBACK_BARS) {
        Ok(series) => index_disparity(&series),
        Err(e) => {
            warn!(ticker = SP500_INDEX_TICKER, error = %e, "index series unavailable, disparity set to 0");
            0.0
        }
    }
}

fn resolve_filter(tickers: Option<&str>) -> Result<Option<Vec<String>>, ExitCode> {
    match tickers {
        Some(list) => parse_tickers(list).map(Some).map_err(|e| {
            let err = TurtleError::ConfigInvalid {
                section: "cli".into(),
                key: "tickers".into(),
                reason: e.to_string(),
            };
            eprintln!("error: {err}");
            ExitCode::from(&err)
        }),
        None => Ok(None),
    }
}

fn run_report(config_path: &Path, options: &RunOptions) -> ExitCode {
    // Stage 1: Load and validate settings
    eprintln!("Loading settings from {}", config_path.display());
    let settings = match load_settings(config_path) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let email = match load_email_settings(&settings.config) {
        Ok(e) => e,
        Err(e) => return fail(e),
    };
    let filter = match resolve_filter(options.tickers.as_deref()) {
        Ok(f) => f,
        Err(code) => return code,
    };

    // Stage 2: Wire adapters
    let run = &settings.run;
    let data = CsvAdapter::new(PathBuf::from(&run.price_dir));
    let regime = CsvRegimeAdapter::new(
        CsvAdapter::new(PathBuf::from(&run.price_dir)),
        settings.risk.forward_pe_default,
    );
    let universe = UniverseFileAdapter::new(PathBuf::from(&run.universe_file));
    let positions = PositionCsvAdapter::new(PathBuf::from(&run.positions_file));
    let ports = Collaborators {
        data: &data,
        regime: &regime,
        universe: &universe,
        positions: &positions,
    };

    // Stage 3: Scan and assemble
    let as_of = options.as_of.unwrap_or_else(today);
    eprintln!("Scanning ({}, as of {as_of})...", options.report_type);
    let report = match build_report(
        &ports,
        &settings.risk,
        run,
        options.report_type,
        as_of,
        filter.as_deref(),
    ) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };

    // Stage 4: Console summary
    print_summary(&report);

    // Stage 5: Deliver
    let output = options
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&run.report_output));
    if let Err(e) = FileReportSink::new(&output).render_and_send(&report) {
        return fail(e);
    }
    eprintln!("\nReport written to: {}", output.display());

    if options.send_email {
        if let Some(email) = email {
            if let Err(code) = send_email(email, &report) {
                return code;
            }
        }
    }
    ExitCode::SUCCESS
}

#[cfg(feature = "email")]
fn send_email(
    settings: crate::domain::config_validation::EmailSettings,
    report: &DailyReport,
) -> Result<(), ExitCode> {
    use crate::adapters::email_report_adapter::EmailReportSink;

    let Ok(password) = std::env::var(PASSWORD_ENV) else {
        warn!(env = PASSWORD_ENV, "no SMTP password set, email skipped");
        return Ok(());
    };
    let receiver = settings.receiver.clone();
    EmailReportSink::new(settings, password)
        .render_and_send(report)
        .map_err(fail)?;
    eprintln!("Report emailed to: {receiver}");
    Ok(())
}

#[cfg(not(feature = "email"))]
fn send_email(
    _settings: crate::domain::config_validation::EmailSettings,
    _report: &DailyReport,
) -> Result<(), ExitCode> {
    warn!("built without the email feature, email skipped");
    Ok(())
}

pub fn print_summary(report: &DailyReport) {
    let t = &report.thresholds;
    eprintln!("\n=== {} ===", report.subject());
    eprintln!(
        "VIX {:.2} | USD/KRW {:.2} | Fwd P/E {:.1}",
        report.regime.vix_value, report.regime.exchange_rate_krw_usd, report.regime.forward_pe
    );
    eprintln!(
        "ADX threshold {:.1} | ATR ceiling {:.2}% | max loss/unit {}",
        t.adx_threshold,
        t.atr_upper_limit_pct,
        format_krw(report.max_loss_krw())
    );
    eprintln!("Market phase: {}", report.market.phase);
    eprintln!(
        "Evaluated {}/{} tickers",
        report.evaluated,
        report.evaluated + report.failures.len()
    );
    for (kind, count) in &report.failure_counts {
        eprintln!("  {kind}: {count}");
    }

    if !report.top_tier.candidates.is_empty() {
        eprintln!("\n=== Top Tier ===");
        for c in &report.top_tier.candidates {
            let d = &c.decision;
            eprintln!(
                "  {:<6} {:<24} close {:>9.2}  qty {:>5}  ATR {:.2}%",
                d.ticker, c.sector, d.snapshot.close, d.entry.quantity, d.snapshot.atr_ratio
            );
        }
    }

    for section in &report.sections {
        eprintln!(
            "\n{}: {} tickers, {} buy, {} sell",
            section.name,
            section.ticker_count,
            section.buys.len(),
            section.sells.len()
        );
    }

    if !report.holdings.is_empty() {
        eprintln!("\n=== Holdings ===");
        for d in &report.holdings {
            eprintln!(
                "  {:<6} {:<12} units {} -> {}",
                d.ticker,
                d.signal.to_string(),
                d.state.units(),
                d.next_units
            );
        }
    }
}

fn run_dry_run(config_path: &Path, options: &RunOptions) -> ExitCode {
    eprintln!("Dry run: validating inputs from {}", config_path.display());
    let settings = match load_settings(config_path) {
        Ok(s) => s,
        Err(code) => return code,
    };
    if let Err(e) = load_email_settings(&settings.config) {
        return fail(e);
    }
    let filter = match resolve_filter(options.tickers.as_deref()) {
        Ok(f) => f,
        Err(code) => return code,
    };

    let run = &settings.run;
    let mut universe: Universe =
        match UniverseFileAdapter::new(PathBuf::from(&run.universe_file)).load_universe() {
            Ok(u) => u,
            Err(e) => return fail(e),
        };
    if let Some(filter) = &filter {
        universe.restrict_to(filter);
    }
    let positions = match PositionCsvAdapter::new(PathBuf::from(&run.positions_file)).load_positions()
    {
        Ok(p) => p,
        Err(e) => return fail(e),
    };
    let held = held_tickers(&positions, filter.as_deref());
    if universe.is_empty() && held.is_empty() {
        return fail(TurtleError::EmptyUniverse);
    }

    for index in universe.index_names() {
        eprintln!("  {index}: {} tickers", universe.list_tickers(index).len());
    }
    eprintln!("  open positions: {}", held.len());
    eprintln!("Dry run complete.");
    ExitCode::SUCCESS
}

fn run_check(config_path: &Path) -> ExitCode {
    let settings = match load_settings(config_path) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let email = match load_email_settings(&settings.config) {
        Ok(e) => e,
        Err(e) => return fail(e),
    };

    let risk = &settings.risk;
    let run = &settings.run;
    println!("Settings: OK");
    println!("  Seed:              {}", format_krw(risk.total_seed));
    println!("  Max loss rate:     {:.2}%", risk.max_loss_rate * 100.0);
    println!("  Volume threshold:  {:.2}", risk.volume_ratio_threshold);
    println!("  ADX threshold:     {:.1}", risk.adx_threshold);
    println!("  ATR upper limit:   {:.2}%", risk.atr_upper_limit_pct);
    println!("  Sector limit:      {}", risk.sector_limit);
    println!("  Max pyramid units: {}", risk.max_pyramid_units);
    println!("  Forward P/E:       {:.1}", risk.forward_pe_default);
    println!("  Backtest limit:    {}", run.backtest_limit);
    println!("  Max stale days:    {}", run.max_stale_days);
    println!("  Price directory:   {}", run.price_dir);
    println!("  Universe file:     {}", run.universe_file);
    println!("  Positions file:    {}", run.positions_file);
    println!("  Report output:     {}", run.report_output);
    match email {
        Some(e) => println!(
            "  Email:             {} -> {} via {}:{}",
            e.sender, e.receiver, e.smtp_host, e.smtp_port
        ),
        None => println!("  Email:             disabled"),
    }
    ExitCode::SUCCESS
}

fn normalize_arg(ticker: &str) -> Result<String, ExitCode> {
    normalize_ticker(ticker).ok_or_else(|| {
        let err = TurtleError::ConfigInvalid {
            section: "cli".into(),
            key: "ticker".into(),
            reason: format!("invalid ticker '{ticker}'"),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn run_signal(config_path: &Path, ticker: &str, as_of: Option<NaiveDate>) -> ExitCode {
    let settings = match load_settings(config_path) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let ticker = match normalize_arg(ticker) {
        Ok(t) => t,
        Err(code) => return code,
    };

    let run = &settings.run;
    let data = CsvAdapter::new(PathBuf::from(&run.price_dir));
    let regime_port = CsvRegimeAdapter::new(
        CsvAdapter::new(PathBuf::from(&run.price_dir)),
        settings.risk.forward_pe_default,
    );
    let positions = match PositionCsvAdapter::new(PathBuf::from(&run.positions_file)).load_positions()
    {
        Ok(p) => p,
        Err(e) => return fail(e),
    };
    let regime: RegimeInputs = load_regime(
        &regime_port,
        &RegimeFallbacks {
            vix: run.vix_default,
            exchange_rate: run.exchange_rate_default,
            forward_pe: settings.risk.forward_pe_default,
        },
    );
    let ctx = EvaluationContext::new(&settings.risk, &regime).with_staleness(Staleness {
        as_of: as_of.unwrap_or_else(today),
        max_days: run.max_stale_days,
    });

    let series = match data.fetch_daily_series(&ticker, LOOKBACK_BARS) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    let decision = match evaluate_ticker(&series, positions.get(&ticker), &ctx) {
        Ok(d) => d,
        Err(e) => {
            println!("{ticker}: {} ({e})", e.kind());
            return ExitCode::SUCCESS;
        }
    };

    let s = &decision.snapshot;
    let fx = regime.exchange_rate_krw_usd;
    println!("{} {} on {}", decision.ticker, decision.signal, decision.date);
    println!(
        "  close {:.2} (₩{:.0})  ATR {:.2} ({:.2}%)  ADX {:.1}  +DI {:.1}  -DI {:.1}",
        s.close,
        s.close_krw(fx),
        s.atr,
        s.atr_ratio,
        s.adx,
        s.plus_di,
        s.minus_di
    );
    println!(
        "  RSI {:.1}  disparity {:.2}%  volume ratio {:.2}  volume {:.1}억원",
        s.rsi,
        s.disparity,
        s.volume_ratio,
        s.volume_krw_billion(fx)
    );
    println!(
        "  thresholds: ADX > {:.1}, ATR ratio <= {:.2}%",
        ctx.thresholds.adx_threshold, ctx.thresholds.atr_upper_limit_pct
    );
    match decision.holding {
        Some(levels) => println!(
            "  holding {} units: stop {:.2}, pyramid {:.2}, next units {}",
            decision.state.units(),
            levels.stop_price,
            levels.pyramid_price,
            decision.next_units
        ),
        None => println!(
            "  entry: qty {}, stop {:.2}, target {:.2}",
            decision.entry.quantity, decision.entry.stop_price, decision.entry.target_price
        ),
    }
    ExitCode::SUCCESS
}

fn run_single_backtest(config_path: &Path, ticker: &str) -> ExitCode {
    let settings = match load_settings(config_path) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let ticker = match normalize_arg(ticker) {
        Ok(t) => t,
        Err(code) => return code,
    };

    let data = CsvAdapter::new(PathBuf::from(&settings.run.price_dir));
    let series = match data.fetch_daily_series(&ticker, LOOKBACK_BARS) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    eprintln!("Running backtest: {ticker}, {} bars", series.len());

    match run_backtest(&series, &BacktestConfig::new(settings.risk.adx_threshold)) {
        Ok(result) => {
            println!("{ticker}");
            println!("  Total Return:   {:.2}%", result.total_return_pct);
            println!("  Max Drawdown:   {:.2}%", result.max_drawdown_pct);
            println!("  Trades:         {}", result.trades);
            println!("  Bars in market: {}", result.bars_in_market);
            println!("\n{BACKTEST_NOTE}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {ticker}: {e} (need at least {MIN_BARS} bars)");
            ExitCode::from(5)
        }
    }
}
