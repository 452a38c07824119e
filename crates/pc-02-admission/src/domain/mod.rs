//! Pure admission logic: the transition table, preconditions, actor
//! signature roles, structural checks, and post-state computation.

pub mod actor;
pub mod effects;
pub mod format;
pub mod preconditions;
pub mod state_machine;
