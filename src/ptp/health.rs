//! PTP health rules over a window of clock snapshots.

use gridwatch_types::{
    AnalysisWindow, ClockIdentity, ClockStatus, Code, Finding, PortState, Transport,
};

use super::profile::Profile;
use crate::config::Thresholds;

/// Clock class at and above which the grandmaster is in holdover or has no
/// specified time source.
const DEGRADED_CLOCK_CLASS: u8 = 128;

/// Evaluate an ordered sequence of snapshots.
///
/// Numeric fields are only judged on SLAVE snapshots. An empty sequence
/// produces a single `PTP_NO_DATA` error at the end of the window.
pub fn evaluate(
    snapshots: &[ClockStatus],
    thresholds: &Thresholds,
    window: AnalysisWindow,
) -> Vec<Finding> {
    let Some(last) = snapshots.last() else {
        return vec![Finding::error(
            Code::PtpNoData,
            "no clock status was collected in the analysis window",
            window.end,
        )];
    };

    let mut findings = Vec::new();
    let mut once = Once::default();
    let mut previous_gm: Option<ClockIdentity> = None;

    for status in snapshots {
        let ts = status.observed_at;

        match status.port_state {
            PortState::Faulty => {
                findings.push(Finding::critical(Code::PtpFaulty, "PTP port is FAULTY", ts));
                continue;
            }
            PortState::Slave => {}
            _ => continue,
        }

        if let Some(finding) = offset_finding(status, thresholds) {
            findings.push(finding);
        }

        if let Some(prev) = previous_gm {
            if prev != status.grandmaster {
                findings.push(Finding::warning(
                    Code::PtpGmChange,
                    format!("grandmaster changed from {} to {}", prev, status.grandmaster),
                    ts,
                ));
            }
        }
        previous_gm = Some(status.grandmaster);

        if status.mean_path_delay_ns > thresholds.path_delay_warning_ns && !once.path_delay {
            once.path_delay = true;
            findings.push(Finding::warning(
                Code::PtpPathDelay,
                format!(
                    "mean path delay {} ns exceeds {} ns",
                    status.mean_path_delay_ns, thresholds.path_delay_warning_ns
                ),
                ts,
            ));
        }

        if let Some(class) = status.gm_clock_class {
            if class >= DEGRADED_CLOCK_CLASS && !once.clock_class {
                once.clock_class = true;
                findings.push(Finding::warning(
                    Code::PtpGmClockClass,
                    format!("grandmaster clock class {} indicates holdover or no time source", class),
                    ts,
                ));
            }
        }

        let untraceable: Vec<&str> = [
            ("time", status.time_traceable),
            ("frequency", status.frequency_traceable),
        ]
        .into_iter()
        .filter(|(_, traceable)| *traceable == Some(false))
        .map(|(what, _)| what)
        .collect();
        if !untraceable.is_empty() && !once.traceable {
            once.traceable = true;
            findings.push(Finding::warning(
                Code::PtpNotTraceable,
                format!("grandmaster {} is not traceable", untraceable.join(" and ")),
                ts,
            ));
        }
    }

    let locked = snapshots.iter().any(|s| s.port_state.is_locked());
    if !locked && snapshots.iter().any(|s| s.port_state.is_acquiring()) {
        findings.push(Finding::warning(
            Code::PtpNotLocked,
            format!(
                "port never locked during the window (last state {})",
                last.port_state
            ),
            last.observed_at,
        ));
    }

    if let Some(finding) = delay_drift_finding(snapshots, thresholds) {
        findings.push(finding);
    }

    if last.gm_present == Some(false) {
        findings.push(Finding::critical(
            Code::PtpNoGm,
            "no grandmaster present at the end of the window",
            last.observed_at,
        ));
    }

    findings
}

/// Compare the port configuration against the profile it appears to run.
///
/// Port configuration does not change within a window, so only the last
/// snapshot that reports a delay mechanism is judged. Produces one OK
/// finding naming the profile and a WARNING per mismatched setting.
pub fn evaluate_profile(snapshots: &[ClockStatus], transport: Option<Transport>) -> Vec<Finding> {
    let Some((status, mechanism)) = snapshots
        .iter()
        .rev()
        .find_map(|s| s.delay_mechanism.map(|m| (s, m)))
    else {
        return Vec::new();
    };
    let ts = status.observed_at;
    let profile = Profile::select(transport, status.domain.unwrap_or(0), mechanism);
    let expected = profile.expectations();

    let mut findings = vec![Finding::ok(
        Code::PtpProfile,
        format!("detected {}", profile),
        ts,
    )];
    let mut mismatch = |message: String| {
        findings.push(Finding::warning(Code::PtpProfileMismatch, message, ts));
    };

    if let Some(required) = expected.delay_mechanism {
        if required != mechanism {
            mismatch(format!(
                "delay mechanism is {}, {} expects {}",
                mechanism, profile, required
            ));
        }
    }
    if expected.two_step && status.two_step == Some(false) {
        mismatch(format!("one-step clock, {} expects two-step", profile));
    }
    if let Some(interval) = status.log_sync_interval {
        if !expected.log_sync_intervals.is_empty()
            && !expected.log_sync_intervals.contains(&interval)
        {
            mismatch(format!("logSyncInterval {} is atypical for {}", interval, profile));
        }
    }
    if let Some(interval) = status.log_announce_interval {
        if !expected.log_announce_intervals.is_empty()
            && !expected.log_announce_intervals.contains(&interval)
        {
            mismatch(format!(
                "logAnnounceInterval {} is atypical for {}",
                interval, profile
            ));
        }
    }

    findings
}

#[derive(Debug, Default)]
struct Once {
    path_delay: bool,
    clock_class: bool,
    traceable: bool,
}

fn offset_finding(status: &ClockStatus, thresholds: &Thresholds) -> Option<Finding> {
    let magnitude = status.offset_ns.unsigned_abs();
    let warning = thresholds.offset_warning_ns.unsigned_abs();
    let critical = thresholds.offset_critical_ns.unsigned_abs();

    if magnitude <= warning {
        return None;
    }
    let message = format!("offset from master {} ns", status.offset_ns);
    Some(if magnitude <= critical {
        Finding::warning(Code::PtpOffset, format!("{message} exceeds {warning} ns"), status.observed_at)
    } else {
        Finding::critical(Code::PtpOffset, format!("{message} exceeds {critical} ns"), status.observed_at)
    })
}

/// A steadily rising path delay across the locked snapshots.
fn delay_drift_finding(snapshots: &[ClockStatus], thresholds: &Thresholds) -> Option<Finding> {
    let locked: Vec<&ClockStatus> = snapshots
        .iter()
        .filter(|s| s.port_state.is_locked())
        .collect();
    if locked.len() < 3 {
        return None;
    }

    let rising = locked
        .windows(2)
        .all(|w| w[1].mean_path_delay_ns >= w[0].mean_path_delay_ns);
    let first = locked.first()?;
    let last = locked.last()?;
    let growth = last
        .mean_path_delay_ns
        .saturating_sub(first.mean_path_delay_ns);

    (rising && growth > thresholds.delay_drift_ns).then(|| {
        Finding::warning(
            Code::PtpDelayDrift,
            format!(
                "mean path delay rose from {} ns to {} ns over {} snapshots",
                first.mean_path_delay_ns,
                last.mean_path_delay_ns,
                locked.len()
            ),
            last.observed_at,
        )
    })
}
