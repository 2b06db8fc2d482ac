//! Database module: SQL repositories and the planner's store.
//!
//! - `model`: view models returned by repositories.
//! - `repo`: SQL-only functions that map rows into entities.
//! - `store`: `SqliteStore`, the `PlanStore` backed by `repo`.
//!
//! External modules should import from `tsam_sessions::db`; the repository
//! API is re-exported here.

pub mod model;
pub mod repo;
pub mod store;

pub use repo::*;

pub use model::{PlanWrite, SessionCompletion};
pub use store::SqliteStore;
