//! Replay a recorded fix file through a capture session.
//!
//! Useful for reproducing field reports: the same fixes and thresholds
//! always produce the same decisions and close outcome.

use std::collections::BTreeMap;
use std::path::Path;

use claim_core::capture::CaptureSession;
use claim_core::config::EngineConfig;
use claim_core::error::{ClaimError, Result};
use claim_core::ids::{OwnerId, SessionId};
use claim_core::territory::TerritoryRegistry;
use claim_core::track::{FixDecision, RejectReason, TrackFilter, TrackPoint};
use serde::Serialize;

/// Load fixes from a `.json` file, or RON for any other extension.
///
/// Both formats hold a list of `TrackPoint` records.
pub fn load_fixes(path: &Path) -> Result<Vec<TrackPoint>> {
    let contents = std::fs::read_to_string(path).map_err(|source| ClaimError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let parse_error = |message: String| ClaimError::DataParse {
        path: path.display().to_string(),
        message,
    };

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        serde_json::from_str(&contents).map_err(|e| parse_error(e.to_string()))
    } else {
        ron::from_str(&contents).map_err(|e| parse_error(e.to_string()))
    }
}

/// How a replayed capture ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum TraceOutcome {
    /// The loop closed into a valid territory.
    Committed {
        /// Vertices after simplification.
        vertices: usize,
        /// Enclosed area.
        area_m2: f64,
    },
    /// Closing failed.
    Rejected {
        /// Display form of the capture error.
        reason: String,
    },
}

/// Summary of one replay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceReport {
    /// Fixes read from the file.
    pub total: usize,
    /// Fixes appended to the path.
    pub accepted: usize,
    /// Rejected fixes counted by reason.
    pub rejected: BTreeMap<&'static str, usize>,
    /// Distance walked along accepted fixes.
    pub path_length_m: f64,
    /// Gap between the last and first accepted fix.
    pub closing_gap_m: Option<f64>,
    /// Result of closing the capture.
    pub outcome: TraceOutcome,
}

const fn reason_label(reason: &RejectReason) -> &'static str {
    match reason {
        RejectReason::InvalidCoordinate => "invalid_coordinate",
        RejectReason::LowAccuracy { .. } => "low_accuracy",
        RejectReason::OutOfOrder => "out_of_order",
        RejectReason::Stationary { .. } => "stationary",
    }
}

/// Feed `fixes` into a fresh session against an empty registry, then close it.
#[must_use]
pub fn replay(fixes: &[TrackPoint], config: &EngineConfig) -> TraceReport {
    let filter = TrackFilter::new(config.filter);
    let registry = TerritoryRegistry::new(config.territory);
    let start = fixes.first().map_or(0, |f| f.timestamp);
    let end = fixes.iter().map(|f| f.timestamp).max().unwrap_or(start);

    let mut session = CaptureSession::new(SessionId::new(1), OwnerId::new(1), start);
    let mut accepted = 0;
    let mut rejected = BTreeMap::new();

    let outcome = session
        .start(start)
        .and_then(|()| {
            for fix in fixes {
                match session.add_point(*fix, &filter)? {
                    FixDecision::Accepted => accepted += 1,
                    FixDecision::Rejected(reason) => {
                        *rejected.entry(reason_label(&reason)).or_insert(0) += 1;
                    }
                }
            }
            session.request_close(&registry, &config.capture, end)
        })
        .map_or_else(
            |err| TraceOutcome::Rejected {
                reason: err.to_string(),
            },
            |territory| TraceOutcome::Committed {
                vertices: territory.vertex_count(),
                area_m2: territory.area_m2,
            },
        );

    TraceReport {
        total: fixes.len(),
        accepted,
        rejected,
        path_length_m: session.path_length_m(),
        closing_gap_m: session.closing_gap_m(),
        outcome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claim_test_utils::fixtures::{at, square, walk};

    #[test]
    fn test_replay_square_commits() {
        let fixes = walk(&square(0.0, 0.0, 50.0), 0);
        let report = replay(&fixes, &EngineConfig::default());

        assert_eq!(report.total, 4);
        assert_eq!(report.accepted, 4);
        assert!(report.rejected.is_empty());
        assert!((report.path_length_m - 150.0).abs() < 0.5);
        match report.outcome {
            TraceOutcome::Committed { vertices, area_m2 } => {
                assert_eq!(vertices, 4);
                assert!((area_m2 - 2500.0).abs() < 125.0);
            }
            TraceOutcome::Rejected { reason } => panic!("rejected: {reason}"),
        }
    }

    #[test]
    fn test_replay_counts_rejections() {
        let mut fixes = walk(&square(0.0, 0.0, 50.0), 100);
        let p = at(1.0, 0.0);
        // One second after the first fix, a meter away
        fixes.insert(1, TrackPoint::new(p.lat, p.lon, 101, 5.0));
        fixes.push(TrackPoint::new(p.lat, p.lon, 500, 80.0));
        fixes.push(TrackPoint::new(p.lat, p.lon, 10, 5.0));

        let report = replay(&fixes, &EngineConfig::default());
        assert_eq!(report.accepted, 4);
        assert_eq!(report.rejected.get("stationary"), Some(&1));
        assert_eq!(report.rejected.get("low_accuracy"), Some(&1));
        assert_eq!(report.rejected.get("out_of_order"), Some(&1));
    }

    #[test]
    fn test_replay_open_loop_is_rejected() {
        let fixes = walk(&[at(0.0, 0.0), at(100.0, 0.0), at(200.0, 50.0)], 0);
        let report = replay(&fixes, &EngineConfig::default());
        assert!(matches!(report.outcome, TraceOutcome::Rejected { .. }));
        assert!(report.closing_gap_m.expect("path") > 200.0);
    }

    #[test]
    fn test_replay_empty_file() {
        let report = replay(&[], &EngineConfig::default());
        assert_eq!(report.total, 0);
        assert!(report.closing_gap_m.is_none());
        assert!(matches!(report.outcome, TraceOutcome::Rejected { .. }));
    }

    #[test]
    fn test_load_fixes_json_and_ron() {
        let fixes = walk(&square(0.0, 0.0, 50.0), 0);
        let dir = tempfile::tempdir().expect("tempdir");

        let json = dir.path().join("walk.json");
        std::fs::write(&json, serde_json::to_string(&fixes).expect("json")).expect("write");
        assert_eq!(load_fixes(&json).expect("load json"), fixes);

        let ron_path = dir.path().join("walk.ron");
        std::fs::write(&ron_path, ron::to_string(&fixes).expect("ron")).expect("write");
        assert_eq!(load_fixes(&ron_path).expect("load ron"), fixes);
    }

    #[test]
    fn test_load_fixes_missing_file() {
        let err = load_fixes(Path::new("/nonexistent/walk.json")).unwrap_err();
        assert!(matches!(err, ClaimError::Io { .. }));
    }
}
