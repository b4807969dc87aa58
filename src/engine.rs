//! The diagnostic pipeline from collected inputs to a report.

use gridwatch_types::{ClockStatus, Finding, Transport};

use crate::collect::Collection;
use crate::config::Thresholds;
use crate::report::{DiagnosticReport, ReportBuilder};
use crate::{iec61850, ptp};

/// Which protocol families a run analyzes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scope {
    pub ptp: bool,
    pub iec61850: bool,
}

impl Scope {
    pub const ALL: Scope = Scope {
        ptp: true,
        iec61850: true,
    };
    pub const PTP: Scope = Scope {
        ptp: true,
        iec61850: false,
    };
    pub const IEC61850: Scope = Scope {
        ptp: false,
        iec61850: true,
    };
}

impl Default for Scope {
    fn default() -> Self {
        Scope::ALL
    }
}

/// Turns a [`Collection`] into a [`DiagnosticReport`].
///
/// Analysis is a pure function of the collection and the thresholds, so the
/// same inputs always give the same report.
#[derive(Debug, Clone)]
pub struct Engine {
    thresholds: Thresholds,
    scope: Scope,
    transport: Option<Transport>,
}

impl Engine {
    pub fn new(thresholds: Thresholds, scope: Scope) -> Self {
        Self {
            thresholds,
            scope,
            transport: None,
        }
    }

    /// PTP transport, when known, for profile recognition.
    pub fn transport(mut self, transport: Option<Transport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn analyze(&self, collection: &Collection) -> DiagnosticReport {
        let mut report = ReportBuilder::new(collection.window);

        // A failed setup leaves nothing trustworthy to analyze.
        if !collection.setup_failures.is_empty() {
            report.extend(collection.setup_failures.iter().cloned());
            return report.build();
        }

        if self.scope.ptp {
            let (snapshots, parse_findings) = self.parse_status(collection);
            report.extend(parse_findings);
            report.extend(ptp::evaluate(&snapshots, &self.thresholds, collection.window));
            report.extend(ptp::evaluate_profile(&snapshots, self.transport));
        }

        if self.scope.iec61850 {
            let (frames, decode_findings) = iec61850::classify_all(&collection.frames);
            report.extend(decode_findings);
            report.extend(iec61850::evaluate(
                &frames,
                &self.thresholds,
                collection.window,
            ));
        }

        report.build()
    }

    fn parse_status(&self, collection: &Collection) -> (Vec<ClockStatus>, Vec<Finding>) {
        ptp::parse_all(
            collection
                .status_blocks
                .iter()
                .map(|b| (b.text.as_str(), b.observed_at)),
        )
    }
}
