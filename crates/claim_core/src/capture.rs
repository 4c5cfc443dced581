//! Capture sessions: walking a territory boundary and closing it.
//!
//! ```text
//! Idle ──start──▶ Tracking ──request_close──▶ Closing ──ok──▶ Committed
//!                   ▲  │ add_point                │
//!                   │  └──────────┘               │ error
//!                   └─────────────────────────────┘
//! any state ──abort──▶ Aborted
//! ```
//!
//! A failed close always lands back in `Tracking` with the path intact,
//! so the player can keep walking and try again.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

use serde::{Deserialize, Serialize};

use crate::config::CaptureConfig;
use crate::error::CaptureError;
use crate::geo::LatLon;
use crate::geometry;
use crate::ids::{OwnerId, SessionId, Timestamp};
use crate::territory::{Territory, TerritoryRegistry};
use crate::track::{FixDecision, TrackFilter, TrackPoint};

/// Consecutive fixes closer than this are the same vertex.
const DUPLICATE_EPSILON_M: f64 = 0.01;

/// Lifecycle state of a [`CaptureSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaptureState {
    /// Created, not yet accepting fixes.
    Idle,
    /// Accepting fixes.
    Tracking,
    /// Validating the closed path.
    Closing,
    /// A territory was committed. Terminal.
    Committed,
    /// Abandoned without a territory. Terminal.
    Aborted,
}

impl CaptureState {
    /// Check if no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Committed | Self::Aborted)
    }
}

/// One player's in-progress walk around a boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureSession {
    /// Session identifier.
    pub id: SessionId,
    /// Walking player.
    pub owner: OwnerId,
    state: CaptureState,
    path: Vec<TrackPoint>,
    started_at: Timestamp,
    last_activity: Timestamp,
}

impl CaptureSession {
    /// Create an idle session.
    #[must_use]
    pub const fn new(id: SessionId, owner: OwnerId, now: Timestamp) -> Self {
        Self {
            id,
            owner,
            state: CaptureState::Idle,
            path: Vec::new(),
            started_at: now,
            last_activity: now,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> CaptureState {
        self.state
    }

    /// Accepted fixes, in order.
    #[must_use]
    pub fn path(&self) -> &[TrackPoint] {
        &self.path
    }

    /// When tracking began.
    #[must_use]
    pub const fn started_at(&self) -> Timestamp {
        self.started_at
    }

    /// Time of the last accepted fix, or the start time.
    #[must_use]
    pub const fn last_activity(&self) -> Timestamp {
        self.last_activity
    }

    /// Begin accepting fixes with an empty path.
    pub fn start(&mut self, now: Timestamp) -> Result<(), CaptureError> {
        if self.state != CaptureState::Idle {
            return Err(CaptureError::AlreadyStarted { state: self.state });
        }
        self.state = CaptureState::Tracking;
        self.path.clear();
        self.started_at = now;
        self.last_activity = now;
        Ok(())
    }

    /// Run `fix` through the filter and append it if accepted.
    pub fn add_point(
        &mut self,
        fix: TrackPoint,
        filter: &TrackFilter,
    ) -> Result<FixDecision, CaptureError> {
        if self.state != CaptureState::Tracking {
            return Err(CaptureError::NotTracking { state: self.state });
        }

        let decision = filter.evaluate(&fix, self.path.last());
        match decision {
            FixDecision::Accepted => {
                self.last_activity = self.last_activity.max(fix.timestamp);
                self.path.push(fix);
                tracing::debug!(
                    session = %self.id,
                    owner = %self.owner,
                    points = self.path.len(),
                    "Fix accepted"
                );
            }
            FixDecision::Rejected(reason) => {
                tracing::debug!(session = %self.id, ?reason, "Fix rejected");
            }
        }
        Ok(decision)
    }

    /// Distance from the last accepted fix back to the first.
    #[must_use]
    pub fn closing_gap_m(&self) -> Option<f64> {
        match (self.path.first(), self.path.last()) {
            (Some(first), Some(last)) => Some(last.distance_m(first)),
            _ => None,
        }
    }

    /// Total distance walked along the accepted fixes.
    #[must_use]
    pub fn path_length_m(&self) -> f64 {
        self.path.windows(2).map(|w| w[0].distance_m(&w[1])).sum()
    }

    /// Close the loop and commit the enclosed polygon.
    ///
    /// On any failure the session returns to `Tracking` with its path kept.
    pub fn request_close(
        &mut self,
        registry: &TerritoryRegistry,
        config: &CaptureConfig,
        now: Timestamp,
    ) -> Result<Territory, CaptureError> {
        if self.state != CaptureState::Tracking {
            return Err(CaptureError::NotTracking { state: self.state });
        }

        self.state = CaptureState::Closing;
        match self.close_polygon(registry, config, now) {
            Ok(territory) => {
                self.state = CaptureState::Committed;
                tracing::info!(
                    session = %self.id,
                    owner = %self.owner,
                    territory = %territory.id,
                    "Capture committed"
                );
                Ok(territory)
            }
            Err(err) => {
                self.state = CaptureState::Tracking;
                tracing::debug!(session = %self.id, error = %err, "Capture close failed");
                Err(err)
            }
        }
    }

    fn close_polygon(
        &self,
        registry: &TerritoryRegistry,
        config: &CaptureConfig,
        now: Timestamp,
    ) -> Result<Territory, CaptureError> {
        let mut vertices = distinct_vertices(&self.path);
        let required = config.min_points.max(3);
        if vertices.len() < required {
            return Err(CaptureError::InsufficientPoints {
                found: vertices.len(),
                required,
            });
        }

        let gap_m = self.closing_gap_m().unwrap_or(0.0);
        if gap_m > config.closure_tolerance_m {
            return Err(CaptureError::NotClosed {
                gap_m,
                tolerance_m: config.closure_tolerance_m,
            });
        }

        // Walked back onto the start point: the closing edge is implicit.
        let snaps_to_start = vertices
            .last()
            .is_some_and(|last| last.haversine_m(vertices[0]) < config.simplify_min_segment_m);
        if snaps_to_start && vertices.len() > required {
            vertices.pop();
        }

        let polygon =
            geometry::simplify_path(&vertices, config.max_vertices, config.simplify_min_segment_m);
        Ok(registry.commit(self.owner, polygon, now)?)
    }

    /// Abandon the capture. Always succeeds.
    pub fn abort(&mut self) {
        if self.state != CaptureState::Aborted {
            tracing::info!(session = %self.id, owner = %self.owner, from = ?self.state, "Capture aborted");
        }
        self.state = CaptureState::Aborted;
    }
}

/// Fix positions with consecutive near-duplicates removed, and without a
/// trailing point that merely repeats the first.
fn distinct_vertices(path: &[TrackPoint]) -> Vec<LatLon> {
    let mut vertices: Vec<LatLon> = Vec::with_capacity(path.len());
    for fix in path {
        let p = fix.position();
        if vertices
            .last()
            .map_or(true, |last| last.haversine_m(p) >= DUPLICATE_EPSILON_M)
        {
            vertices.push(p);
        }
    }
    if vertices.len() > 1 && vertices[0].haversine_m(vertices[vertices.len() - 1]) < DUPLICATE_EPSILON_M
    {
        vertices.pop();
    }
    vertices
}

type SharedSession = Arc<Mutex<CaptureSession>>;

#[derive(Debug)]
struct SessionTable {
    sessions: HashMap<OwnerId, SharedSession>,
    next_id: u64,
}

fn lock_session(session: &Mutex<CaptureSession>) -> MutexGuard<'_, CaptureSession> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

/// `None` while another thread holds the session.
fn try_lock_session(session: &Mutex<CaptureSession>) -> Option<MutexGuard<'_, CaptureSession>> {
    match session.try_lock() {
        Ok(guard) => Some(guard),
        Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
        Err(TryLockError::WouldBlock) => None,
    }
}

/// Open capture sessions, at most one per player.
///
/// Each session has its own lock, so closing one player's walk (polygon
/// validation and the registry commit) never stalls fixes from other
/// players. The table lock is only held for lookups and is never acquired
/// while a session lock is held.
#[derive(Debug)]
pub struct CaptureSessions {
    filter: TrackFilter,
    config: CaptureConfig,
    table: Mutex<SessionTable>,
}

impl CaptureSessions {
    /// Create an empty session table.
    #[must_use]
    pub fn new(filter: TrackFilter, config: CaptureConfig) -> Self {
        Self {
            filter,
            config,
            table: Mutex::new(SessionTable {
                sessions: HashMap::new(),
                next_id: 1,
            }),
        }
    }

    /// Closure thresholds in use.
    #[must_use]
    pub const fn config(&self) -> &CaptureConfig {
        &self.config
    }

    fn shared(&self, owner: OwnerId) -> Option<SharedSession> {
        let table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        table.sessions.get(&owner).map(Arc::clone)
    }

    /// Open a fresh tracking session for `owner`.
    pub fn start(&self, owner: OwnerId, now: Timestamp) -> Result<SessionId, CaptureError> {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = table.sessions.get(&owner) {
            // A committed session lingers until its closer removes it
            let finished = try_lock_session(existing).is_some_and(|s| s.state().is_terminal());
            if !finished {
                return Err(CaptureError::AlreadyCapturing(owner));
            }
        }

        let id = SessionId::new(table.next_id);
        table.next_id += 1;

        let mut session = CaptureSession::new(id, owner, now);
        session.start(now)?;
        table.sessions.insert(owner, Arc::new(Mutex::new(session)));

        tracing::info!(%owner, session = %id, "Capture started");
        Ok(id)
    }

    /// Feed one fix into the owner's open session.
    pub fn add_fix(&self, owner: OwnerId, fix: TrackPoint) -> Result<FixDecision, CaptureError> {
        let shared = self
            .shared(owner)
            .ok_or(CaptureError::NoActiveSession(owner))?;
        let mut session = lock_session(&shared);
        session.add_point(fix, &self.filter)
    }

    /// Close the owner's session against `registry`.
    ///
    /// The session is discarded on success and kept on failure.
    pub fn close(
        &self,
        owner: OwnerId,
        registry: &TerritoryRegistry,
        now: Timestamp,
    ) -> Result<Territory, CaptureError> {
        let shared = self
            .shared(owner)
            .ok_or(CaptureError::NoActiveSession(owner))?;
        let territory = lock_session(&shared).request_close(registry, &self.config, now)?;

        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        if table
            .sessions
            .get(&owner)
            .is_some_and(|current| Arc::ptr_eq(current, &shared))
        {
            table.sessions.remove(&owner);
        }
        Ok(territory)
    }

    /// Abort the owner's session, if any. Returns whether one was open.
    ///
    /// Racing a successful close, the commit stands and this returns `false`.
    pub fn abort(&self, owner: OwnerId) -> bool {
        let removed = self
            .table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .sessions
            .remove(&owner);
        let Some(shared) = removed else {
            return false;
        };

        let mut session = lock_session(&shared);
        if session.state().is_terminal() {
            return false;
        }
        session.abort();
        true
    }

    /// Abort every session idle for longer than `max_idle_secs`.
    ///
    /// Sessions busy in another thread are active by definition and skipped.
    /// Returns the affected owners in id order.
    pub fn abort_stale(&self, now: Timestamp, max_idle_secs: u64) -> Vec<OwnerId> {
        let mut stale: Vec<(OwnerId, SharedSession)> = {
            let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
            let owners: Vec<OwnerId> = table
                .sessions
                .iter()
                .filter(|(_, shared)| {
                    try_lock_session(shared).is_some_and(|s| {
                        !s.state().is_terminal()
                            && now.saturating_sub(s.last_activity) > max_idle_secs
                    })
                })
                .map(|(owner, _)| *owner)
                .collect();
            owners
                .into_iter()
                .filter_map(|owner| table.sessions.remove(&owner).map(|s| (owner, s)))
                .collect()
        };
        stale.sort_unstable_by_key(|(owner, _)| *owner);

        for (_, shared) in &stale {
            lock_session(shared).abort();
        }
        if !stale.is_empty() {
            tracing::info!(count = stale.len(), max_idle_secs, "Aborted stale captures");
        }
        stale.into_iter().map(|(owner, _)| owner).collect()
    }

    /// Copy of the owner's open session.
    #[must_use]
    pub fn session(&self, owner: OwnerId) -> Option<CaptureSession> {
        let shared = self.shared(owner)?;
        let session = lock_session(&shared);
        Some(session.clone())
    }

    /// Number of open sessions.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .sessions
            .len()
    }
}

impl Default for CaptureSessions {
    fn default() -> Self {
        Self::new(TrackFilter::default(), CaptureConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FilterConfig, TerritoryConfig};
    use crate::geo::{LocalFrame, Vec2};
    use crate::track::RejectReason;

    const ALICE: OwnerId = OwnerId::new(1);
    const BOB: OwnerId = OwnerId::new(2);

    fn frame() -> LocalFrame {
        LocalFrame::new(LatLon::new(48.85, 2.35))
    }

    fn fix_at(x: f64, y: f64, t: Timestamp) -> TrackPoint {
        let p = frame().unproject(Vec2::new(x, y));
        TrackPoint::new(p.lat, p.lon, t, 5.0)
    }

    /// Four corners of a square, 30 s apart.
    fn square_walk(x: f64, side: f64) -> Vec<TrackPoint> {
        vec![
            fix_at(x, 0.0, 0),
            fix_at(x + side, 0.0, 30),
            fix_at(x + side, side, 60),
            fix_at(x, side, 90),
        ]
    }

    fn tracking(points: &[TrackPoint]) -> CaptureSession {
        let mut session = CaptureSession::new(SessionId::new(1), ALICE, 0);
        session.start(0).expect("start");
        for p in points {
            session
                .add_point(*p, &TrackFilter::default())
                .expect("tracking");
        }
        session
    }

    fn registry() -> TerritoryRegistry {
        TerritoryRegistry::new(TerritoryConfig { min_area_m2: 100.0 })
    }

    // ------------------------------------------------------------------------
    // State machine
    // ------------------------------------------------------------------------

    #[test]
    fn test_start_moves_idle_to_tracking() {
        let mut session = CaptureSession::new(SessionId::new(1), ALICE, 5);
        assert_eq!(session.state(), CaptureState::Idle);
        session.start(7).expect("start");
        assert_eq!(session.state(), CaptureState::Tracking);
        assert_eq!(session.started_at(), 7);
        assert!(matches!(
            session.start(8),
            Err(CaptureError::AlreadyStarted {
                state: CaptureState::Tracking
            })
        ));
    }

    #[test]
    fn test_add_point_requires_tracking() {
        let mut session = CaptureSession::new(SessionId::new(1), ALICE, 0);
        let err = session
            .add_point(fix_at(0.0, 0.0, 0), &TrackFilter::default())
            .unwrap_err();
        assert_eq!(
            err,
            CaptureError::NotTracking {
                state: CaptureState::Idle
            }
        );
    }

    #[test]
    fn test_rejected_fix_not_appended() {
        let filter = TrackFilter::new(FilterConfig {
            max_accuracy_m: 10.0,
            ..FilterConfig::default()
        });
        let mut session = tracking(&[]);
        let mut noisy = fix_at(0.0, 0.0, 0);
        noisy.accuracy_m = 50.0;

        let decision = session.add_point(noisy, &filter).expect("tracking");
        assert!(matches!(
            decision,
            FixDecision::Rejected(RejectReason::LowAccuracy { .. })
        ));
        assert!(session.path().is_empty());
    }

    #[test]
    fn test_close_commits_square() {
        let reg = registry();
        let mut session = tracking(&square_walk(0.0, 50.0));

        let territory = session
            .request_close(&reg, &CaptureConfig::default(), 100)
            .expect("closes");

        assert_eq!(session.state(), CaptureState::Committed);
        assert_eq!(territory.owner, ALICE);
        assert_eq!(territory.vertex_count(), 4);
        assert!((territory.area_m2 - 2500.0).abs() < 2500.0 * 0.05);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_too_few_points_returns_to_tracking() {
        let reg = registry();
        let walk = square_walk(0.0, 50.0);
        let mut session = tracking(&walk[..2]);

        let err = session
            .request_close(&reg, &CaptureConfig::default(), 100)
            .unwrap_err();
        assert_eq!(
            err,
            CaptureError::InsufficientPoints {
                found: 2,
                required: 3
            }
        );
        assert_eq!(session.state(), CaptureState::Tracking);
        assert_eq!(session.path().len(), 2);
    }

    #[test]
    fn test_duplicate_fixes_do_not_count_as_distinct() {
        let reg = registry();
        let mut session = tracking(&[
            fix_at(0.0, 0.0, 0),
            fix_at(0.0, 0.0, 10),
            fix_at(50.0, 0.0, 20),
            fix_at(50.0, 0.0, 30),
        ]);
        let err = session
            .request_close(&reg, &CaptureConfig::default(), 40)
            .unwrap_err();
        assert!(matches!(err, CaptureError::InsufficientPoints { found: 2, .. }));
    }

    #[test]
    fn test_closure_tolerance_is_inclusive() {
        let walk = square_walk(0.0, 50.0);
        let gap = tracking(&walk).closing_gap_m().expect("non-empty path");
        assert!((gap - 50.0).abs() < 0.5);

        let at_boundary = CaptureConfig {
            closure_tolerance_m: gap,
            ..CaptureConfig::default()
        };
        let reg = registry();
        tracking(&walk)
            .request_close(&reg, &at_boundary, 100)
            .expect("gap equal to tolerance closes");

        let one_meter_short = CaptureConfig {
            closure_tolerance_m: gap - 1.0,
            ..CaptureConfig::default()
        };
        let reg = registry();
        let mut session = tracking(&walk);
        let err = session
            .request_close(&reg, &one_meter_short, 100)
            .unwrap_err();
        assert!(matches!(err, CaptureError::NotClosed { .. }));
        assert_eq!(session.state(), CaptureState::Tracking);
        assert!(reg.is_empty());
    }

    #[test]
    fn test_walking_back_to_start_closes() {
        let reg = registry();
        let mut walk = square_walk(0.0, 50.0);
        walk.push(fix_at(0.5, 0.5, 120));

        let territory = tracking(&walk)
            .request_close(
                &reg,
                &CaptureConfig {
                    closure_tolerance_m: 5.0,
                    ..CaptureConfig::default()
                },
                130,
            )
            .expect("closes");
        assert_eq!(territory.vertex_count(), 4);
    }

    #[test]
    fn test_bowtie_walk_is_invalid() {
        let reg = registry();
        let mut walk = square_walk(0.0, 50.0);
        walk.swap(2, 3);
        walk[2].timestamp = 60;
        walk[3].timestamp = 90;

        let config = CaptureConfig {
            closure_tolerance_m: 100.0,
            ..CaptureConfig::default()
        };
        let mut session = tracking(&walk);
        let err = session.request_close(&reg, &config, 100).unwrap_err();
        assert_eq!(err, CaptureError::InvalidPolygon);
        assert_eq!(session.state(), CaptureState::Tracking);
    }

    #[test]
    fn test_small_loop_too_small() {
        let reg = registry();
        let mut session = tracking(&square_walk(0.0, 8.0));
        let err = session
            .request_close(&reg, &CaptureConfig::default(), 100)
            .unwrap_err();
        assert!(matches!(err, CaptureError::TooSmall { .. }));
    }

    #[test]
    fn test_overlap_surfaces_as_capture_error() {
        let reg = registry();
        let first = tracking(&square_walk(0.0, 50.0))
            .request_close(&reg, &CaptureConfig::default(), 100)
            .expect("first");

        let mut second = tracking(&square_walk(20.0, 50.0));
        let err = second
            .request_close(&reg, &CaptureConfig::default(), 200)
            .unwrap_err();
        assert_eq!(err, CaptureError::Overlap { existing: first.id });
        assert_eq!(second.state(), CaptureState::Tracking);
    }

    #[test]
    fn test_abort_from_any_state() {
        let mut idle = CaptureSession::new(SessionId::new(1), ALICE, 0);
        idle.abort();
        assert_eq!(idle.state(), CaptureState::Aborted);
        assert!(idle.state().is_terminal());

        let mut session = tracking(&square_walk(0.0, 50.0));
        session.abort();
        assert_eq!(session.state(), CaptureState::Aborted);
        assert!(session
            .request_close(&registry(), &CaptureConfig::default(), 0)
            .is_err());
    }

    #[test]
    fn test_path_length() {
        let session = tracking(&square_walk(0.0, 50.0));
        assert!((session.path_length_m() - 150.0).abs() < 1.0);
        assert!(tracking(&[]).closing_gap_m().is_none());
    }

    #[test]
    fn test_simplification_caps_vertices() {
        let reg = registry();
        // 200 m square walked in 1 m steps, one fix per second
        let mut walk = Vec::new();
        let mut t = 0;
        for (dx, dy, x0, y0) in [
            (1.0, 0.0, 0.0, 0.0),
            (0.0, 1.0, 200.0, 0.0),
            (-1.0, 0.0, 200.0, 200.0),
            (0.0, -1.0, 0.0, 200.0),
        ] {
            for step in 0..200 {
                let s = f64::from(step);
                walk.push(fix_at(x0 + dx * s, y0 + dy * s, t));
                t += 5;
            }
        }

        let config = CaptureConfig {
            max_vertices: 100,
            closure_tolerance_m: 5.0,
            ..CaptureConfig::default()
        };
        let territory = tracking(&walk)
            .request_close(&reg, &config, t)
            .expect("closes");
        assert!(territory.vertex_count() <= 100);
        assert!((territory.area_m2 - 40_000.0).abs() < 40_000.0 * 0.05);
    }

    // ------------------------------------------------------------------------
    // Session table
    // ------------------------------------------------------------------------

    #[test]
    fn test_one_session_per_player() {
        let sessions = CaptureSessions::default();
        sessions.start(ALICE, 0).expect("start");
        assert_eq!(
            sessions.start(ALICE, 1).unwrap_err(),
            CaptureError::AlreadyCapturing(ALICE)
        );
        sessions.start(BOB, 1).expect("other player");
        assert_eq!(sessions.active_count(), 2);
    }

    #[test]
    fn test_close_discards_session_on_success_only() {
        let sessions = CaptureSessions::default();
        let reg = registry();
        sessions.start(ALICE, 0).expect("start");

        let walk = square_walk(0.0, 50.0);
        sessions.add_fix(ALICE, walk[0]).expect("fix");
        assert!(sessions.close(ALICE, &reg, 10).is_err());
        assert!(sessions.session(ALICE).is_some());

        for fix in &walk[1..] {
            sessions.add_fix(ALICE, *fix).expect("fix");
        }
        sessions.close(ALICE, &reg, 100).expect("close");
        assert!(sessions.session(ALICE).is_none());

        // A new walk starts a fresh session
        let id = sessions.start(ALICE, 200).expect("restart");
        assert_eq!(id, SessionId::new(2));
    }

    #[test]
    fn test_missing_session() {
        let sessions = CaptureSessions::default();
        assert_eq!(
            sessions.add_fix(ALICE, fix_at(0.0, 0.0, 0)).unwrap_err(),
            CaptureError::NoActiveSession(ALICE)
        );
        assert!(!sessions.abort(ALICE));
    }

    #[test]
    fn test_abort_removes_session() {
        let sessions = CaptureSessions::default();
        sessions.start(ALICE, 0).expect("start");
        assert!(sessions.abort(ALICE));
        assert_eq!(sessions.active_count(), 0);
    }

    #[test]
    fn test_abort_stale() {
        let sessions = CaptureSessions::default();
        sessions.start(ALICE, 0).expect("start");
        sessions.start(BOB, 0).expect("start");
        sessions.add_fix(BOB, fix_at(0.0, 0.0, 500)).expect("fix");

        let aborted = sessions.abort_stale(600, 300);
        assert_eq!(aborted, vec![ALICE]);
        assert!(sessions.session(ALICE).is_none());
        assert!(sessions.session(BOB).is_some());
    }

    fn held(sessions: &CaptureSessions, owner: OwnerId) -> SharedSession {
        sessions.shared(owner).expect("open session")
    }

    #[test]
    fn test_busy_session_does_not_block_other_players() {
        let sessions = CaptureSessions::default();
        let carol = OwnerId::new(3);
        sessions.start(ALICE, 0).expect("start");
        sessions.start(BOB, 0).expect("start");

        // Alice's session is mid-close on another thread
        let alice = held(&sessions, ALICE);
        let guard = lock_session(&alice);

        assert!(sessions.add_fix(BOB, fix_at(0.0, 0.0, 5)).expect("fix").is_accepted());
        sessions.start(carol, 0).expect("start");
        assert_eq!(
            sessions.start(ALICE, 1).unwrap_err(),
            CaptureError::AlreadyCapturing(ALICE)
        );
        assert_eq!(sessions.abort_stale(10_000, 60), vec![BOB, carol]);
        assert_eq!(sessions.active_count(), 1);

        drop(guard);
        assert!(sessions.session(ALICE).is_some());
    }

    #[test]
    fn test_close_releases_lock_for_other_players() {
        let sessions = Arc::new(CaptureSessions::default());
        let reg = Arc::new(registry());
        sessions.start(ALICE, 0).expect("start");
        sessions.start(BOB, 0).expect("start");
        for fix in square_walk(0.0, 50.0) {
            sessions.add_fix(ALICE, fix).expect("fix");
        }

        let closer = {
            let sessions = Arc::clone(&sessions);
            let reg = Arc::clone(&reg);
            std::thread::spawn(move || sessions.close(ALICE, &reg, 100))
        };
        for fix in square_walk(200.0, 50.0) {
            sessions.add_fix(BOB, fix).expect("fix");
        }

        closer.join().expect("thread").expect("close");
        sessions.close(BOB, &reg, 200).expect("close");
        assert_eq!(reg.len(), 2);
        assert_eq!(sessions.active_count(), 0);
    }

    #[test]
    fn test_start_replaces_committed_session_left_in_table() {
        let sessions = CaptureSessions::default();
        let reg = registry();

        let mut committed = tracking(&square_walk(0.0, 50.0));
        committed.request_close(&reg, &CaptureConfig::default(), 100).expect("close");
        sessions
            .table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .sessions
            .insert(ALICE, Arc::new(Mutex::new(committed)));

        sessions.start(ALICE, 200).expect("committed session does not block");
        assert_eq!(
            sessions.session(ALICE).map(|s| s.state()),
            Some(CaptureState::Tracking)
        );
        assert!(!sessions.abort(BOB));
    }
}
