//! View models returned by repositories.
//!
//! Keep these structs focused on the data returned by queries. Business logic
//! should live in higher layers.

/// Outcome of marking a session as taught.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCompletion {
    pub session_id: i64,
    pub batch_id: i64,
    pub batch_module_id: i64,
    pub module_completed: bool,
    pub batch_completed: bool,
}

/// Totals written by `replace_pending_plan`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlanWrite {
    pub removed_sessions: u64,
    pub inserted_sessions: u64,
    pub inserted_topics: u64,
}
