//! Concrete implementations of the ports.

pub mod csv_adapter;
#[cfg(feature = "email")]
pub mod email_report_adapter;
pub mod file_config_adapter;
pub mod html_report_adapter;
pub mod position_csv_adapter;
pub mod regime_adapter;
pub mod universe_file_adapter;
