//! Resource node — task queue and lifecycle manager for a compute resource.

pub mod config;
pub mod error;
pub mod job;
pub mod node;
pub mod queue;
pub mod rpc;
pub mod tools;
