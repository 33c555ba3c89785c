//! Application modules: configuration, AWS session, the data-plane core and
//! the transports built on top of it.

pub mod config;
pub mod data_plane;
pub mod engine;
pub mod errors;
pub mod mcp_server;
pub mod session;
