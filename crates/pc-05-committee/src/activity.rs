//! # Active-Operator Predicate
//!
//! An operator counts as active for committee duty only while it keeps
//! signing checkpoints and showing up.

use serde::{Deserialize, Serialize};

use shared_types::{CoreConfig, Operator, OperatorStatus, Timestamp};

/// Rolling activity bookkeeping per operator, maintained by the node as
/// checkpoints complete.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorActivity {
    /// Checkpoints this operator signed within the recent window.
    pub checkpoints_signed: u64,
    /// Checkpoints the federation produced within the same window.
    pub recent_checkpoint_count: u64,
    /// Last moment the operator was seen doing anything.
    pub last_active_at: Timestamp,
}

impl OperatorActivity {
    pub fn signature_ratio(&self) -> f64 {
        if self.recent_checkpoint_count == 0 {
            // Nothing to have signed yet; a fresh federation is not
            // penalized.
            return 1.0;
        }
        self.checkpoints_signed as f64 / self.recent_checkpoint_count as f64
    }
}

/// `status = active` AND recent signing ratio ≥ threshold AND seen within
/// the inactivity horizon.
pub fn is_active(
    operator: &Operator,
    activity: &OperatorActivity,
    now: Timestamp,
    config: &CoreConfig,
) -> bool {
    operator.status == OperatorStatus::Active
        && activity.signature_ratio() >= config.active_signature_ratio
        && now.saturating_sub(activity.last_active_at) <= config.active_inactivity_ms
}
