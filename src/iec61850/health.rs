//! Anomaly rules for GOOSE, Sampled Values and MMS traffic.

use std::collections::{BTreeMap, BTreeSet};

use gridwatch_types::{
    AnalysisWindow, Code, Finding, Frame, GooseFrame, MmsFrame, MmsPdu, SvFrame, Timestamp,
};

use crate::config::Thresholds;

/// Evaluate the classified frames of one window.
///
/// Frames are put into capture order (timestamp, then sequence number)
/// before any rule runs. Findings come out grouped GOOSE, SV, MMS.
pub fn evaluate(frames: &[Frame], thresholds: &Thresholds, window: AnalysisWindow) -> Vec<Finding> {
    let mut ordered: Vec<&Frame> = frames.iter().collect();
    ordered.sort_by_key(|f| (f.timestamp(), f.seq()));

    let mut goose = Vec::new();
    let mut sv = Vec::new();
    let mut mms = Vec::new();
    for frame in ordered {
        match frame {
            Frame::Goose(f) => goose.push(f),
            Frame::SampledValues(f) => sv.push(f),
            Frame::Mms(f) => mms.push(f),
        }
    }

    let mut findings = evaluate_goose(&goose, window);
    findings.extend(evaluate_sv(&sv, thresholds));
    findings.extend(evaluate_mms(&mms, thresholds));
    findings
}

fn evaluate_goose(frames: &[&GooseFrame], window: AnalysisWindow) -> Vec<Finding> {
    let Some(last) = frames.last() else {
        return vec![Finding::warning(
            Code::GooseSilent,
            "no GOOSE traffic observed in the analysis window",
            window.end,
        )];
    };

    let mut blocks: BTreeMap<&str, Vec<&GooseFrame>> = BTreeMap::new();
    for &frame in frames {
        blocks.entry(frame.gocb_ref.as_str()).or_default().push(frame);
    }

    let mut findings = Vec::new();
    for (gocb_ref, block) in &blocks {
        let mut ttl_reported = false;
        for pair in block.windows(2) {
            let (prev, cur) = (pair[0], pair[1]);

            if let Some(message) = sequence_anomaly(prev, cur) {
                findings.push(Finding::critical(
                    Code::GooseSeqAnomaly,
                    format!("{gocb_ref}: {message}"),
                    cur.timestamp,
                ));
            }

            if let Some(ttl_ms) = prev.ttl_ms {
                let gap = cur.timestamp.saturating_since(prev.timestamp);
                if gap.as_millis() > u128::from(ttl_ms) && !ttl_reported {
                    ttl_reported = true;
                    findings.push(Finding::warning(
                        Code::GooseTtlExpired,
                        format!(
                            "{gocb_ref}: {} ms without a message exceeds timeAllowedtoLive {} ms",
                            gap.as_millis(),
                            ttl_ms
                        ),
                        cur.timestamp,
                    ));
                }
            }
        }
    }

    let publishers: BTreeSet<_> = frames.iter().map(|f| f.source).collect();
    findings.push(Finding::ok(
        Code::GooseSummary,
        format!(
            "{} GOOSE frames from {} publishers across {} control blocks",
            frames.len(),
            publishers.len(),
            blocks.len()
        ),
        last.timestamp,
    ));
    findings
}

/// Describe a broken stNum/sqNum progression between two consecutive frames.
fn sequence_anomaly(prev: &GooseFrame, cur: &GooseFrame) -> Option<String> {
    if cur.st_num == prev.st_num {
        let retransmit = cur.sq_num == prev.sq_num;
        let next = cur.sq_num == prev.sq_num.wrapping_add(1);
        let wrapped = prev.sq_num == u32::MAX && cur.sq_num <= 1;
        if retransmit || next || wrapped {
            return None;
        }
        return Some(format!(
            "sqNum jumped from {} to {} at stNum {}",
            prev.sq_num, cur.sq_num, cur.st_num
        ));
    }

    if cur.st_num == prev.st_num.wrapping_add(1) {
        return None;
    }
    Some(format!("stNum jumped from {} to {}", prev.st_num, cur.st_num))
}

fn evaluate_sv(frames: &[&SvFrame], thresholds: &Thresholds) -> Vec<Finding> {
    let Some(last) = frames.last() else {
        return Vec::new();
    };

    let mut streams: BTreeMap<&str, Vec<&SvFrame>> = BTreeMap::new();
    for &frame in frames {
        streams.entry(frame.sv_id.as_str()).or_default().push(frame);
    }

    let mut findings = Vec::new();
    for (sv_id, stream) in &streams {
        let Some(stream_last) = stream.last() else {
            continue;
        };

        if stream.iter().all(|f| !f.synchronized) {
            findings.push(Finding::critical(
                Code::SvUnsynchronized,
                format!("{sv_id}: smpSynch unset for the whole window"),
                stream_last.timestamp,
            ));
        }

        if let Some(message) = rate_deviation(stream, thresholds) {
            findings.push(Finding::warning(
                Code::SvRateDeviation,
                format!("{sv_id}: {message}"),
                stream_last.timestamp,
            ));
        }
    }

    let publishers: BTreeSet<_> = frames.iter().map(|f| f.source).collect();
    findings.push(Finding::ok(
        Code::SvSummary,
        format!(
            "{} SV frames from {} publishers across {} streams",
            frames.len(),
            publishers.len(),
            streams.len()
        ),
        last.timestamp,
    ));
    findings
}

/// Compare the declared or observed samples per cycle with the nominal rate.
fn rate_deviation(stream: &[&SvFrame], thresholds: &Thresholds) -> Option<String> {
    let nominal = f64::from(thresholds.sv_nominal_samples_per_cycle);
    let deviates = |rate: f64| (rate - nominal).abs() / nominal * 100.0 > thresholds.sv_rate_tolerance_pct;

    if let Some(declared) = stream.iter().find_map(|f| f.samples_per_cycle) {
        if deviates(f64::from(declared)) {
            return Some(format!(
                "declared smpRate {} differs from nominal {}",
                declared, thresholds.sv_nominal_samples_per_cycle
            ));
        }
    }

    let (first, last) = match stream {
        [first, .., last] => (first, last),
        _ => return None,
    };
    let span = last.timestamp.saturating_since(first.timestamp).as_secs_f64();
    if span <= 0.0 {
        return None;
    }

    // Samples in the last frame fall after the measured span.
    let samples: u64 = stream.iter().map(|f| u64::from(f.asdu_count)).sum::<u64>()
        - u64::from(last.asdu_count);
    let observed = samples as f64 / span / thresholds.sv_nominal_frequency_hz;

    deviates(observed).then(|| {
        format!(
            "observed {:.1} samples per cycle, nominal {}",
            observed, thresholds.sv_nominal_samples_per_cycle
        )
    })
}

fn evaluate_mms(frames: &[&MmsFrame], thresholds: &Thresholds) -> Vec<Finding> {
    let reports: Vec<&&MmsFrame> = frames
        .iter()
        .filter(|f| f.is_report_or_association())
        .collect();

    if reports.len() > thresholds.mms_report_flood {
        let at: Timestamp = reports[thresholds.mms_report_flood].timestamp;
        return vec![Finding::warning(
            Code::MmsReportFlood,
            format!(
                "{} MMS reports/associations exceed the limit of {}",
                reports.len(),
                thresholds.mms_report_flood
            ),
            at,
        )];
    }

    reports
        .iter()
        .map(|f| {
            let kind = match f.pdu {
                MmsPdu::Association => "association",
                MmsPdu::Report => "report",
                MmsPdu::Other => "message",
            };
            Finding::ok(
                Code::MmsReport,
                format!("MMS {} from {}", kind, f.session.src),
                f.timestamp,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridwatch_types::{MacAddr, Severity, TcpEndpoints};

    const IED: MacAddr = MacAddr([0x00, 0x0a, 0xdc, 0x00, 0x00, 0x01]);

    fn window() -> AnalysisWindow {
        AnalysisWindow::new(Timestamp::from_micros(0), Timestamp::from_micros(15_000_000))
    }

    fn goose(seq: u64, micros: u64, st_num: u32, sq_num: u32) -> Frame {
        Frame::Goose(GooseFrame {
            seq,
            timestamp: Timestamp::from_micros(micros),
            source: IED,
            app_id: 1,
            gocb_ref: "IED1LD0/LLN0$GO$gcb01".to_string(),
            st_num,
            sq_num,
            ttl_ms: None,
        })
    }

    fn sv(seq: u64, micros: u64, synchronized: bool, rate: Option<u16>) -> Frame {
        Frame::SampledValues(SvFrame {
            seq,
            timestamp: Timestamp::from_micros(micros),
            source: IED,
            app_id: 0x4000,
            sv_id: "MU01".to_string(),
            smp_cnt: seq as u16,
            samples_per_cycle: rate,
            synchronized,
            asdu_count: 1,
        })
    }

    fn mms(seq: u64, pdu: MmsPdu) -> Frame {
        Frame::Mms(MmsFrame {
            seq,
            timestamp: Timestamp::from_micros(seq * 10),
            port: 102,
            pdu,
            session: TcpEndpoints {
                src: "10.0.0.2:50000".parse().unwrap(),
                dst: "10.0.0.1:102".parse().unwrap(),
            },
        })
    }

    fn with_code(findings: &[Finding], code: Code) -> Vec<&Finding> {
        findings.iter().filter(|f| f.code == code).collect()
    }

    #[test]
    fn test_sq_num_gap_is_one_critical() {
        let frames: Vec<Frame> = [1, 2, 3, 5]
            .iter()
            .enumerate()
            .map(|(i, &sq)| goose(i as u64, i as u64 * 1000, 7, sq))
            .collect();
        let findings = evaluate(&frames, &Thresholds::default(), window());

        let anomalies = with_code(&findings, Code::GooseSeqAnomaly);
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].severity, Severity::Critical);
        assert_eq!(anomalies[0].timestamp, Timestamp::from_micros(3000));
    }

    #[test]
    fn test_retransmit_state_change_and_wrap_are_clean() {
        let frames = vec![
            goose(0, 0, 1, 5),
            goose(1, 10, 1, 5),
            goose(2, 20, 1, 6),
            goose(3, 30, 2, 0),
            goose(4, 40, 2, 1),
            goose(5, 50, 3, u32::MAX),
            goose(6, 60, 3, 0),
        ];
        let findings = evaluate(&frames, &Thresholds::default(), window());
        assert!(with_code(&findings, Code::GooseSeqAnomaly).is_empty());
        assert_eq!(with_code(&findings, Code::GooseSummary).len(), 1);
    }

    #[test]
    fn test_st_num_jump_and_regression() {
        let frames = vec![goose(0, 0, 1, 0), goose(1, 10, 3, 0), goose(2, 20, 2, 0)];
        let findings = evaluate(&frames, &Thresholds::default(), window());
        assert_eq!(with_code(&findings, Code::GooseSeqAnomaly).len(), 2);
    }

    #[test]
    fn test_out_of_order_input_is_sorted_first() {
        let frames = vec![goose(2, 20, 1, 3), goose(0, 0, 1, 1), goose(1, 10, 1, 2)];
        let findings = evaluate(&frames, &Thresholds::default(), window());
        assert!(with_code(&findings, Code::GooseSeqAnomaly).is_empty());
    }

    #[test]
    fn test_control_blocks_are_independent() {
        let mut other = goose(1, 10, 40, 9);
        if let Frame::Goose(f) = &mut other {
            f.gocb_ref = "IED2LD0/LLN0$GO$gcb01".to_string();
        }
        let frames = vec![goose(0, 0, 1, 1), other, goose(2, 20, 1, 2)];
        let findings = evaluate(&frames, &Thresholds::default(), window());
        assert!(with_code(&findings, Code::GooseSeqAnomaly).is_empty());
        assert!(findings.last().unwrap().message.contains("2 control blocks"));
    }

    #[test]
    fn test_no_goose_is_silent_warning() {
        let findings = evaluate(&[], &Thresholds::default(), window());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].code, Code::GooseSilent);
        assert_eq!(findings[0].severity, Severity::Warning);
        assert_eq!(findings[0].timestamp, window().end);
    }

    #[test]
    fn test_ttl_expiry_reported_once() {
        let mut frames: Vec<Frame> = vec![
            goose(0, 0, 1, 1),
            goose(1, 3_000_000, 1, 2),
            goose(2, 6_000_000, 1, 3),
        ];
        for frame in &mut frames {
            if let Frame::Goose(f) = frame {
                f.ttl_ms = Some(2000);
            }
        }
        let findings = evaluate(&frames, &Thresholds::default(), window());
        let expired = with_code(&findings, Code::GooseTtlExpired);
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].timestamp, Timestamp::from_micros(3_000_000));
    }

    #[test]
    fn test_sv_nominal_rate_is_clean() {
        // 80 samples per 50 Hz cycle is one frame every 250 us.
        let frames: Vec<Frame> = (0..400).map(|i| sv(i, i * 250, true, Some(80))).collect();
        let findings = evaluate(&frames, &Thresholds::default(), window());
        assert!(with_code(&findings, Code::SvRateDeviation).is_empty());
        assert!(with_code(&findings, Code::SvUnsynchronized).is_empty());
        assert_eq!(with_code(&findings, Code::SvSummary).len(), 1);
    }

    #[test]
    fn test_sv_observed_rate_deviation() {
        // Half the nominal rate.
        let frames: Vec<Frame> = (0..100).map(|i| sv(i, i * 500, true, None)).collect();
        let findings = evaluate(&frames, &Thresholds::default(), window());
        let deviations = with_code(&findings, Code::SvRateDeviation);
        assert_eq!(deviations.len(), 1);
        assert!(deviations[0].message.contains("40.0"));
    }

    #[test]
    fn test_sv_declared_rate_deviation() {
        let frames = vec![sv(0, 0, true, Some(256)), sv(1, 250, true, Some(256))];
        let findings = evaluate(&frames, &Thresholds::default(), window());
        let deviations = with_code(&findings, Code::SvRateDeviation);
        assert_eq!(deviations.len(), 1);
        assert!(deviations[0].message.contains("256"));
    }

    #[test]
    fn test_sv_unsynchronized_whole_window() {
        let frames: Vec<Frame> = (0..10).map(|i| sv(i, i * 250, false, Some(80))).collect();
        let findings = evaluate(&frames, &Thresholds::default(), window());
        let unsync = with_code(&findings, Code::SvUnsynchronized);
        assert_eq!(unsync.len(), 1);
        assert_eq!(unsync[0].severity, Severity::Critical);

        // One synchronized frame is enough.
        let mut frames = frames;
        frames[4] = sv(4, 1000, true, Some(80));
        let findings = evaluate(&frames, &Thresholds::default(), window());
        assert!(with_code(&findings, Code::SvUnsynchronized).is_empty());
    }

    #[test]
    fn test_single_sv_frame_is_not_rated() {
        let findings = evaluate(&[sv(0, 0, true, None)], &Thresholds::default(), window());
        assert!(with_code(&findings, Code::SvRateDeviation).is_empty());
    }

    #[test]
    fn test_mms_reports_are_ok() {
        let frames = vec![
            mms(0, MmsPdu::Association),
            mms(1, MmsPdu::Other),
            mms(2, MmsPdu::Report),
        ];
        let findings = evaluate(&frames, &Thresholds::default(), window());
        let reports = with_code(&findings, Code::MmsReport);
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|f| f.severity == Severity::Ok));
    }

    #[test]
    fn test_mms_flood_is_single_warning() {
        let thresholds = Thresholds {
            mms_report_flood: 3,
            ..Thresholds::default()
        };
        let frames: Vec<Frame> = (0..5).map(|i| mms(i, MmsPdu::Report)).collect();
        let findings = evaluate(&frames, &thresholds, window());
        assert!(with_code(&findings, Code::MmsReport).is_empty());
        let flood = with_code(&findings, Code::MmsReportFlood);
        assert_eq!(flood.len(), 1);
        assert_eq!(flood[0].timestamp, Timestamp::from_micros(30));
    }
}
