//! Task queue — lifecycle management for tasks running on this node.
//!
//! - `store` — per-task slots behind a structural lock
//! - `manager` — `Queue`, the authenticated control surface (add, status,
//!   pause, run, quit, list) over the store and the tool registry

pub mod manager;
pub mod store;

pub use manager::Queue;
pub use store::TaskStore;
