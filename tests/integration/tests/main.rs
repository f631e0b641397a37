//! End-to-end integration tests.
//!
//! Each test boots a server on an ephemeral port and drives it over HTTP.

mod auth_flows;
mod common;
mod federation;
mod token_operations;
