//! mcpv control-plane core
//!
//! The RPC control-plane surface for a desktop-managed Model Context
//! Protocol (MCP) daemon: a long-lived process that multiplexes many
//! upstream MCP servers behind a single typed gRPC façade, and brokers
//! discovery, invocation, log streaming, and administrative mutation to
//! multiple concurrent clients.
//!
//! Built on [tonic](https://github.com/hyperium/tonic) for async/await
//! support and full HTTP/2 capabilities, in the same shape as
//! `turbomcp-grpc`: a generated `proto` module, a `server`/`client` pair,
//! and a shared `convert`/`error` layer between them.
//!
//! This crate does not execute tools itself — it delegates to a
//! [`collaborator::ControlPlane`] implementation. See [`testutil`] for an
//! in-memory one used by the test suite.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

/// Generated protobuf types for the control-plane wire contract.
pub mod proto {
    #![allow(missing_docs)]
    #![allow(clippy::all)]
    tonic::include_proto!("mcpv.controlplane.v1");
}

pub mod address;
pub mod client;
pub mod collaborator;
pub mod config;
pub mod convert;
pub mod error;
pub mod facade;
pub mod governance;
pub mod server;
pub mod task;
pub mod tls;
pub mod types;
pub mod watch;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use client::ControlPlaneClient;
pub use error::{CoreError, CoreResult};
pub use facade::ControlPlaneFacade;
pub use server::ControlPlaneServer;
