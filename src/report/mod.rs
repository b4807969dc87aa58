//! Aggregation of findings into one diagnostic report.
//!
//! A report is assembled once by [`ReportBuilder`] and then only read. The
//! builder groups findings by protocol (PTP, CAPTURE, GOOSE, SV, MMS)
//! while keeping the order in which each evaluator emitted them.

pub mod log;

use gridwatch_types::{AnalysisWindow, Code, Finding, Severity, Timestamp};
use serde::Serialize;

pub use log::{format_line, parse_line, LineError, LogSink};

/// Identifies the `--json` document layout. Bump on breaking changes.
pub const REPORT_SCHEMA: &str = "gridwatch.report/1";

/// The verdict of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticReport {
    window: AnalysisWindow,
    findings: Vec<Finding>,
    overall: Severity,
}

impl DiagnosticReport {
    /// The report of a run that failed before anything was collected.
    pub fn failed(code: Code, message: impl Into<String>, at: Timestamp) -> Self {
        let mut builder = ReportBuilder::new(AnalysisWindow::new(at, at));
        builder.push(Finding::error(code, message, at));
        builder.build()
    }

    pub fn window(&self) -> AnalysisWindow {
        self.window
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    /// Highest severity among the findings, OK when there are none.
    pub fn overall(&self) -> Severity {
        self.overall
    }

    /// Process exit code for the overall severity.
    pub fn exit_code(&self) -> i32 {
        self.overall.exit_code()
    }

    /// Count findings at each severity, lowest first.
    pub fn counts(&self) -> [(Severity, usize); 4] {
        [Severity::Ok, Severity::Warning, Severity::Critical, Severity::Error]
            .map(|s| (s, self.findings.iter().filter(|f| f.severity == s).count()))
    }

    /// The log sink lines for this report.
    pub fn log_lines(&self) -> impl Iterator<Item = String> + '_ {
        self.findings.iter().map(format_line)
    }

    /// Structured form for `--json`.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&JsonReport::from(self))
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    schema: &'static str,
    generator: &'static str,
    window: JsonWindow,
    overall: Severity,
    exit_code: i32,
    findings: Vec<JsonFinding<'a>>,
}

#[derive(Serialize)]
struct JsonWindow {
    start: String,
    end: String,
}

#[derive(Serialize)]
struct JsonFinding<'a> {
    timestamp: String,
    severity: Severity,
    code: &'static str,
    protocol: &'static str,
    message: &'a str,
}

impl<'a> From<&'a DiagnosticReport> for JsonReport<'a> {
    fn from(report: &'a DiagnosticReport) -> Self {
        Self {
            schema: REPORT_SCHEMA,
            generator: concat!("gridwatch ", env!("CARGO_PKG_VERSION")),
            window: JsonWindow {
                start: log::format_timestamp(report.window.start),
                end: log::format_timestamp(report.window.end),
            },
            overall: report.overall,
            exit_code: report.exit_code(),
            findings: report
                .findings
                .iter()
                .map(|f| JsonFinding {
                    timestamp: log::format_timestamp(f.timestamp),
                    severity: f.severity,
                    code: f.code.as_str(),
                    protocol: f.protocol().as_str(),
                    message: &f.message,
                })
                .collect(),
        }
    }
}

/// Collects findings from the evaluators and produces the report.
#[derive(Debug, Default)]
pub struct ReportBuilder {
    window: AnalysisWindow,
    findings: Vec<Finding>,
}

impl ReportBuilder {
    pub fn new(window: AnalysisWindow) -> Self {
        Self {
            window,
            findings: Vec::new(),
        }
    }

    pub fn push(&mut self, finding: Finding) -> &mut Self {
        self.findings.push(finding);
        self
    }

    pub fn extend(&mut self, findings: impl IntoIterator<Item = Finding>) -> &mut Self {
        self.findings.extend(findings);
        self
    }

    pub fn build(self) -> DiagnosticReport {
        let mut findings = self.findings;
        // Stable: emission order survives within each protocol group.
        findings.sort_by_key(|f| f.protocol());
        let overall = findings
            .iter()
            .map(|f| f.severity)
            .max()
            .unwrap_or_default();

        DiagnosticReport {
            window: self.window,
            findings,
            overall,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(micros: u64) -> Timestamp {
        Timestamp::from_micros(micros)
    }

    fn window() -> AnalysisWindow {
        AnalysisWindow::new(ts(0), ts(15_000_000))
    }

    #[test]
    fn test_empty_report_is_ok() {
        let report = ReportBuilder::new(window()).build();
        assert_eq!(report.overall(), Severity::Ok);
        assert_eq!(report.exit_code(), 0);
        assert!(report.findings().is_empty());
    }

    #[test]
    fn test_overall_is_max_severity() {
        let mut builder = ReportBuilder::new(window());
        builder
            .push(Finding::ok(Code::MmsReport, "report", ts(1)))
            .push(Finding::critical(Code::GooseSeqAnomaly, "jump", ts(2)))
            .push(Finding::warning(Code::PtpOffset, "offset", ts(3)));
        let report = builder.build();
        assert_eq!(report.overall(), Severity::Critical);
        assert_eq!(report.exit_code(), 2);
    }

    #[test]
    fn test_error_outranks_critical() {
        let mut builder = ReportBuilder::new(window());
        builder
            .push(Finding::critical(Code::SvUnsynchronized, "unsync", ts(1)))
            .push(Finding::error(Code::PtpNoData, "no data", ts(2)));
        assert_eq!(builder.build().exit_code(), 3);
    }

    #[test]
    fn test_grouped_by_protocol_in_emission_order() {
        let mut builder = ReportBuilder::new(window());
        builder.extend([
            Finding::ok(Code::MmsReport, "mms-1", ts(1)),
            Finding::warning(Code::GooseSilent, "goose", ts(2)),
            Finding::warning(Code::PtpOffset, "ptp-2", ts(9)),
            Finding::ok(Code::MmsReport, "mms-2", ts(0)),
            Finding::critical(Code::PtpFaulty, "ptp-1", ts(3)),
        ]);
        let report = builder.build();
        let messages: Vec<&str> = report.findings().iter().map(|f| f.message.as_str()).collect();
        assert_eq!(messages, vec!["ptp-2", "ptp-1", "goose", "mms-1", "mms-2"]);
    }

    #[test]
    fn test_counts() {
        let mut builder = ReportBuilder::new(window());
        builder.extend([
            Finding::ok(Code::MmsReport, "a", ts(1)),
            Finding::ok(Code::MmsReport, "b", ts(2)),
            Finding::warning(Code::GooseSilent, "c", ts(3)),
        ]);
        let counts = builder.build().counts();
        assert_eq!(counts[0], (Severity::Ok, 2));
        assert_eq!(counts[1], (Severity::Warning, 1));
        assert_eq!(counts[3], (Severity::Error, 0));
    }

    #[test]
    fn test_failed_run_is_a_single_error() {
        let report = DiagnosticReport::failed(
            Code::ConfigError,
            "invalid configuration: offset_critical_ns (10) must be at least offset_warning_ns (1000)",
            ts(7),
        );
        assert_eq!(report.findings().len(), 1);
        assert_eq!(report.findings()[0].severity, Severity::Error);
        assert_eq!(report.window(), AnalysisWindow::new(ts(7), ts(7)));
        assert_eq!(report.exit_code(), 3);
        let line = report.log_lines().next().unwrap();
        assert!(line.contains(" ERROR CONFIG_ERROR invalid configuration"));
    }

    #[test]
    fn test_json_shape() {
        let mut builder = ReportBuilder::new(window());
        builder.push(Finding::warning(Code::PtpOffset, "offset 5000 ns", ts(1_000_000)));
        let json = builder.build().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["overall"], "WARNING");
        assert_eq!(value["exit_code"], 1);
        assert_eq!(value["schema"], REPORT_SCHEMA);
        assert!(value["generator"].as_str().unwrap().starts_with("gridwatch "));
        assert_eq!(value["window"]["end"], "1970-01-01T00:00:15.000000Z");
        assert_eq!(value["findings"][0]["code"], "PTP_OFFSET");
        assert_eq!(value["findings"][0]["protocol"], "PTP");
        assert_eq!(value["findings"][0]["timestamp"], "1970-01-01T00:00:01.000000Z");
    }
}
