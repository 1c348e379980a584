//! Report delivery port.

use crate::domain::error::TurtleError;
use crate::domain::report::DailyReport;

pub trait ReportPort {
    fn render_and_send(&self, report: &DailyReport) -> Result<(), TurtleError>;
}
