//! Built-in tools shipped with the resource node.

pub mod command;
pub mod sleep;

pub use command::CommandTool;
pub use sleep::SleepTool;
