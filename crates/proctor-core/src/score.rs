// Integrity score calculation
//
// Pure function over an aggregate's event log. Deterministic and
// reproducible: given the same events the same score always comes out, so
// the stored score of a completed session can be audited against its log.
//
// Structural contract (tested): monotonic non-increasing in event count per
// category, invariant under permutation of the log, clamped to [0, 100].
// The weights themselves are policy, not contract.

use crate::event::{EventKind, Severity};
use crate::session::Session;

/// Highest possible score (no violations)
pub const BASELINE: u32 = 100;

/// Per-event deduction weights and per-category caps
///
/// Each category is capped independently so no single detector can drive
/// the score below that category's floor on its own.
#[derive(Debug, Clone)]
pub struct ScorePolicy {
    pub focus_loss_warning: u32,
    pub focus_loss_danger: u32,
    pub focus_loss_cap: u32,

    pub face_absence_warning: u32,
    pub face_absence_danger: u32,
    pub face_absence_cap: u32,

    pub multiple_faces_penalty: u32,
    pub multiple_faces_cap: u32,

    pub object_detection_penalty: u32,
    pub object_detection_cap: u32,
}

impl Default for ScorePolicy {
    fn default() -> Self {
        Self {
            focus_loss_warning: 2,
            focus_loss_danger: 4,
            focus_loss_cap: 40,

            face_absence_warning: 3,
            face_absence_danger: 6,
            face_absence_cap: 40,

            multiple_faces_penalty: 8,
            multiple_faces_cap: 30,

            object_detection_penalty: 10,
            object_detection_cap: 40,
        }
    }
}

/// Compute the integrity score for an aggregate with the default policy
pub fn integrity_score(session: &Session) -> u8 {
    score_with_policy(session, &ScorePolicy::default())
}

/// Compute the integrity score with an explicit policy
///
/// Counts are taken from the event log itself, never from the cached
/// counters, so the result is reproducible from the log alone.
pub fn score_with_policy(session: &Session, policy: &ScorePolicy) -> u8 {
    let mut counts: [[u32; 2]; 4] = [[0; 2]; 4];
    for event in &session.events {
        let kind = match event.kind {
            EventKind::FocusLoss => 0,
            EventKind::FaceAbsence => 1,
            EventKind::MultipleFaces => 2,
            EventKind::ObjectDetection => 3,
        };
        let severity = match event.severity {
            Severity::Warning => 0,
            Severity::Danger => 1,
        };
        counts[kind][severity] += 1;
    }

    let focus_loss = (counts[0][0] * policy.focus_loss_warning
        + counts[0][1] * policy.focus_loss_danger)
        .min(policy.focus_loss_cap);
    let face_absence = (counts[1][0] * policy.face_absence_warning
        + counts[1][1] * policy.face_absence_danger)
        .min(policy.face_absence_cap);
    let multiple_faces = ((counts[2][0] + counts[2][1]) * policy.multiple_faces_penalty)
        .min(policy.multiple_faces_cap);
    let object_detection = ((counts[3][0] + counts[3][1]) * policy.object_detection_penalty)
        .min(policy.object_detection_cap);

    let deduction = focus_loss + face_absence + multiple_faces + object_detection;
    BASELINE.saturating_sub(deduction).min(100) as u8
}
