//! Sends the rendered report as an HTML email over SMTP.

use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::info;

use crate::adapters::html_report_adapter::HtmlReportAdapter;
use crate::domain::config_validation::EmailSettings;
use crate::domain::error::TurtleError;
use crate::domain::report::DailyReport;
use crate::ports::report_port::ReportPort;

pub struct EmailReportSink {
    settings: EmailSettings,
    password: String,
    renderer: HtmlReportAdapter,
}

fn send_failed(what: &str, e: impl std::fmt::Display) -> TurtleError {
    TurtleError::Report {
        reason: format!("{what}: {e}"),
    }
}

impl EmailReportSink {
    pub fn new(settings: EmailSettings, password: String) -> Self {
        Self {
            settings,
            password,
            renderer: HtmlReportAdapter::new(),
        }
    }

    pub fn build_message(&self, report: &DailyReport) -> Result<Message, TurtleError> {
        let body = self.renderer.render(report)?;
        Message::builder()
            .from(
                self.settings
                    .sender
                    .parse()
                    .map_err(|e| send_failed("invalid sender address", e))?,
            )
            .to(self
                .settings
                .receiver
                .parse()
                .map_err(|e| send_failed("invalid receiver address", e))?)
            .subject(report.subject())
            .header(ContentType::TEXT_HTML)
            .body(body)
            .map_err(|e| send_failed("failed to build email", e))
    }

    fn create_smtp_transport(&self) -> Result<SmtpTransport, TurtleError> {
        let creds = Credentials::new(self.settings.sender.clone(), self.password.clone());
        // 465 is implicit TLS, anything else negotiates STARTTLS
        let builder = if self.settings.smtp_port == 465 {
            SmtpTransport::relay(&self.settings.smtp_host)
        } else {
            SmtpTransport::starttls_relay(&self.settings.smtp_host)
        };
        let transport = builder
            .map_err(|e| send_failed("SMTP setup failed", e))?
            .port(self.settings.smtp_port)
            .credentials(creds)
            .build();
        Ok(transport)
    }
}

impl ReportPort for EmailReportSink {
    fn render_and_send(&self, report: &DailyReport) -> Result<(), TurtleError> {
        let email = self.build_message(report)?;
        self.create_smtp_transport()?
            .send(&email)
            .map_err(|e| send_failed("SMTP send failed", e))?;
        info!(receiver = %self.settings.receiver, "report emailed");
        Ok(())
    }
}
