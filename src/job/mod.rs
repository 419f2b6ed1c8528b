//! Jobs — the records the controller uses to create and observe tasks.
//!
//! - `model` — `Job` transfer record and caller-assigned `TaskId`
//! - `state` — `JobStatus` lifecycle (created → running ⇄ paused → done/failed/quit)

pub mod model;
pub mod state;

pub use model::{Job, TaskId};
pub use state::JobStatus;
