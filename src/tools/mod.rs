//! Tool abstraction for the node's execution capabilities.

pub mod builtin;
pub mod registry;
pub mod tool;

pub use registry::{RegisteredTool, ToolRegistry};
pub use tool::*;
