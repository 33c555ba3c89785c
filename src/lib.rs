//! awswatch - typed CloudWatch alarms, log-group checks and Logs Insights queries
//!
//! awswatch gives a uniform, serializable view over CloudWatch and CloudWatch Logs:
//! it lists metric and composite alarms under one shape, checks that log groups
//! exist, runs Logs Insights queries to completion and infers a field schema from
//! sampled log records.
//!
//! # Architecture Overview
//!
//! - **Data plane** ([`app::data_plane`]): the algorithmic core. Pagination,
//!   alarm aggregation, the query state machine, schema discovery and the
//!   log-group validator. Every component talks to AWS through a backend trait
//!   so it can run against an in-memory backend in tests.
//! - **Engine** ([`app::engine::MonitoringEngine`]): the facade that wires the
//!   components together and exposes the public operations.
//! - **Transports**: the MCP stdio server ([`app::mcp_server`]) and the CLI in
//!   `main.rs`. Both are thin glue over the engine.
//!
//! # Error Model
//!
//! Precondition failures (a log group that does not exist) are reported as
//! [`app::errors::EngineError::LogGroupNotFound`] before any query is started.
//! Backend failures during a query become a normal
//! [`app::data_plane::cloudwatch_logs::QueryResult`] whose status says `Failed`,
//! so callers always have to look at the status.

#![warn(clippy::all, rust_2018_idioms)]

// Include logging macros first
#[macro_use]
pub mod logging_macros;

pub mod app;
pub use app::engine::MonitoringEngine;
