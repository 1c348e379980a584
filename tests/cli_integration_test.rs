//! CLI integration tests against real files on disk.
//!
//! Tests cover:
//! - Settings validation through `check` (missing and malformed keys are fatal)
//! - `run` end to end over a directory of price CSVs
//! - Dry run, single-ticker `signal` and `backtest`
//! - Exit codes for empty universes and bad arguments

mod common;

use clap::Parser;
use common::*;
use std::fs;
use std::process::ExitCode;
use tempfile::TempDir;
use turtlescan::cli::{self, Cli};

const BARS: usize = 260;

const RISK_KEYS: &str = "\
TOTAL_SEED_KRW=100000000
MAX_LOSS_RATE=0.01
VOLUME_THRESHOLD=1.5
ADX_THRESHOLD=20
ATR_UPPER_LIMIT=5
SECTOR_LIMIT=2
FORWARD_PER=21.5
";

fn same_code(actual: ExitCode, expected: u8) -> bool {
    // ExitCode has no PartialEq, compare the debug form
    format!("{actual:?}") == format!("{:?}", ExitCode::from(expected))
}

fn invoke(args: &[&str]) -> ExitCode {
    let mut argv = vec!["turtlescan", "--log-level", "warn"];
    argv.extend_from_slice(args);
    cli::run(Cli::try_parse_from(argv).unwrap())
}

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let ws = Self {
            dir: TempDir::new().unwrap(),
        };
        fs::create_dir_all(ws.path("prices")).unwrap();
        ws
    }

    fn path(&self, name: &str) -> std::path::PathBuf {
        self.dir.path().join(name)
    }

    fn write(&self, name: &str, content: &str) -> String {
        let path = self.path(name);
        fs::write(&path, content).unwrap();
        path.display().to_string()
    }

    fn settings(&self, risk: &str) -> String {
        let content = format!(
            "{risk}\n[data]\nprice_dir = {}\nuniverse_file = {}\npositions_file = {}\n\n[report]\noutput = {}\n",
            self.path("prices").display(),
            self.path("universe.csv").display(),
            self.path("portfolio.csv").display(),
            self.path("out/report.html").display(),
        );
        self.write("settings.txt", &content)
    }

    /// A small market: two breakouts, a downtrend, a held name and calm
    /// regime files.
    fn seed_market(&self) {
        let prices = self.path("prices");
        for series in [
            breakout_series("AAPL", BARS),
            breakout_series("MSFT", BARS),
            falling_series("XOM", BARS),
            breakout_series("NVDA", BARS),
            breakout_series("^GSPC", BARS),
        ] {
            write_price_csv(&prices, &series);
        }
        write_price_csv(&prices, &series_from_closes("^VIX", &[16.0, 15.0, 14.5]));
        write_price_csv(
            &prices,
            &series_from_closes("KRW=X", &[1365.0, 1370.0, 1372.5]),
        );
        self.write(
            "universe.csv",
            "symbol,sector,index\n\
             AAPL,Information Technology,sp500\n\
             MSFT,Information Technology,sp500\n\
             XOM,Energy,sp500\n\
             AAPL,,nasdaq100\n\
             BRK.B,Financials,sp500\n",
        );
        self.write(
            "portfolio.csv",
            "ticker,buy_date,buy_price,units\nNVDA,2023-08-01,140.0,1\n",
        );
    }
}

fn as_of() -> String {
    last_date(BARS).format("%Y-%m-%d").to_string()
}

mod check_command {
    use super::*;

    #[test]
    fn valid_settings_pass() {
        let ws = Workspace::new();
        let settings = ws.settings(RISK_KEYS);
        assert!(same_code(invoke(&["check", "-c", &settings]), 0));
    }

    #[test]
    fn every_required_key_is_fatal_when_missing() {
        for key in turtlescan::domain::config_validation::REQUIRED_KEYS {
            let ws = Workspace::new();
            let risk: String = RISK_KEYS
                .lines()
                .filter(|l| !l.starts_with(key))
                .map(|l| format!("{l}\n"))
                .collect();
            let settings = ws.settings(&risk);
            assert!(
                same_code(invoke(&["check", "-c", &settings]), 2),
                "missing {key} should be a config error"
            );
        }
    }

    #[test]
    fn malformed_value_is_fatal() {
        let ws = Workspace::new();
        let settings = ws.settings(&RISK_KEYS.replace("SECTOR_LIMIT=2", "SECTOR_LIMIT=two"));
        assert!(same_code(invoke(&["check", "-c", &settings]), 2));
    }

    #[test]
    fn missing_settings_file_is_config_error() {
        let ws = Workspace::new();
        let missing = ws.path("nope.txt").display().to_string();
        assert!(same_code(invoke(&["check", "-c", &missing]), 2));
    }

    #[test]
    fn email_section_without_sender_is_fatal() {
        let ws = Workspace::new();
        let settings = ws.settings(RISK_KEYS);
        let mut content = fs::read_to_string(&settings).unwrap();
        content.push_str("\n[email]\nsmtp_host = smtp.gmail.com\n");
        fs::write(&settings, content).unwrap();
        assert!(same_code(invoke(&["check", "-c", &settings]), 2));
    }
}

mod run_command {
    use super::*;

    #[test]
    fn writes_report_end_to_end() {
        let ws = Workspace::new();
        ws.seed_market();
        let settings = ws.settings(RISK_KEYS);
        let code = invoke(&[
            "run",
            "-c",
            &settings,
            "--as-of",
            &as_of(),
            "--no-email",
        ]);
        assert!(same_code(code, 0));

        let html = fs::read_to_string(ws.path("out/report.html")).unwrap();
        assert!(html.contains("Turtle Trading Report: Morning Plan"));
        assert!(html.contains("Top tier (2)"));
        assert!(html.contains("AAPL"));
        assert!(html.contains("MSFT"));
        // held outside the universe
        assert!(html.contains("NVDA"));
        assert!(html.contains("Open positions (1)"));
        // listed but without a price file
        assert!(html.contains("BRK-B"));
        assert!(html.contains("PROVIDER_ERROR"));
    }

    #[test]
    fn report_type_and_output_override() {
        let ws = Workspace::new();
        ws.seed_market();
        let settings = ws.settings(RISK_KEYS);
        let output = ws.path("premarket.html").display().to_string();
        let code = invoke(&[
            "run",
            "-c",
            &settings,
            "--report-type",
            "premarket",
            "--output",
            &output,
            "--as-of",
            &as_of(),
            "--no-email",
        ]);
        assert!(same_code(code, 0));
        let html = fs::read_to_string(&output).unwrap();
        assert!(html.contains("Turtle Trading Report: Premarket"));
    }

    #[test]
    fn ticker_override_limits_the_scan() {
        let ws = Workspace::new();
        ws.seed_market();
        let settings = ws.settings(RISK_KEYS);
        let code = invoke(&[
            "run",
            "-c",
            &settings,
            "--tickers",
            "xom",
            "--as-of",
            &as_of(),
            "--no-email",
        ]);
        assert!(same_code(code, 0));
        let html = fs::read_to_string(ws.path("out/report.html")).unwrap();
        assert!(html.contains("XOM"));
        assert!(!html.contains("AAPL"));
    }

    #[test]
    fn invalid_ticker_override_is_config_error() {
        let ws = Workspace::new();
        ws.seed_market();
        let settings = ws.settings(RISK_KEYS);
        let code = invoke(&["run", "-c", &settings, "--tickers", "AAPL,,MSFT", "--no-email"]);
        assert!(same_code(code, 2));
    }

    #[test]
    fn empty_universe_exits_with_5() {
        let ws = Workspace::new();
        ws.write("universe.csv", "symbol,sector,index\n");
        let settings = ws.settings(RISK_KEYS);
        let code = invoke(&["run", "-c", &settings, "--no-email"]);
        assert!(same_code(code, 5));
        assert!(!ws.path("out/report.html").exists());
    }

    #[test]
    fn missing_universe_file_is_data_error() {
        let ws = Workspace::new();
        let settings = ws.settings(RISK_KEYS);
        let code = invoke(&["run", "-c", &settings, "--no-email"]);
        assert!(same_code(code, 3));
    }

    #[test]
    fn dry_run_validates_without_writing() {
        let ws = Workspace::new();
        ws.seed_market();
        let settings = ws.settings(RISK_KEYS);
        let code = invoke(&["run", "-c", &settings, "--dry-run"]);
        assert!(same_code(code, 0));
        assert!(!ws.path("out/report.html").exists());
    }
}

mod single_ticker_commands {
    use super::*;

    #[test]
    fn signal_for_one_ticker() {
        let ws = Workspace::new();
        ws.seed_market();
        let settings = ws.settings(RISK_KEYS);
        let code = invoke(&["signal", "-c", &settings, "--ticker", "aapl", "--as-of", &as_of()]);
        assert!(same_code(code, 0));
    }

    #[test]
    fn signal_without_price_file_is_data_error() {
        let ws = Workspace::new();
        ws.seed_market();
        let settings = ws.settings(RISK_KEYS);
        let code = invoke(&["signal", "-c", &settings, "--ticker", "TSLA"]);
        assert!(same_code(code, 3));
    }

    #[test]
    fn backtest_for_one_ticker() {
        let ws = Workspace::new();
        ws.seed_market();
        let settings = ws.settings(RISK_KEYS);
        assert!(same_code(
            invoke(&["backtest", "-c", &settings, "--ticker", "MSFT"]),
            0
        ));
    }

    #[test]
    fn backtest_on_short_history_exits_with_5() {
        let ws = Workspace::new();
        ws.seed_market();
        write_price_csv(&ws.path("prices"), &sideways_series("TINY", 50));
        let settings = ws.settings(RISK_KEYS);
        assert!(same_code(
            invoke(&["backtest", "-c", &settings, "--ticker", "TINY"]),
            5
        ));
    }
}
