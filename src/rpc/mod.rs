//! HTTP/JSON transport for the queue's control operations.

pub mod client;
pub mod protocol;
pub mod routes;

pub use client::ResourceClient;
pub use protocol::{ErrorBody, RpcCall};
pub use routes::{RpcState, rpc_routes, serve};
