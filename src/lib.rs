//! idgate is an HTTP proxy that stamps every request with a correlation ID.
//!
//! Each inbound request passes through the identity middleware, which
//! derives an ID (a SHA-256 digest of the request attributes, or a random
//! UUID), writes it to a request header forwarded upstream, stores it in
//! the request extensions for in-process handlers, mirrors it onto the
//! response, and optionally logs it. The request is then forwarded to a
//! single upstream, or answered locally when none is configured.
//!
//! # Architecture
//!
//! - [`cli`] -- Command-line argument parsing with clap derive macros.
//! - [`cmd`] -- Subcommand dispatch and execution (run, init, validate, health).
//! - [`config`] -- Configuration model, validation, and file sources.
//! - [`error`] -- Unified error types using `thiserror`.
//! - [`hash`] -- SHA-256 hex digests.
//! - [`health`] -- `GET /health` endpoint handler returning runtime diagnostics.
//! - [`logging`] -- Structured tracing setup with JSON and pretty-print output.
//! - [`middleware`] -- The request identity Tower layer.
//! - [`proxy`] -- Upstream forwarding and proxy header construction.
//! - [`server`] -- Axum server setup, shared application state, HTTP client, and
//!   graceful shutdown.
//!
//! # Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `yaml` | YAML config file support _(enabled by default)_ |
//! | `json` | JSON config file support |
//! | `toml` | TOML config file support |
//! | `file-backends` | All file format backends |
//! | `full` | All features |

// Binary crate: public functions are internal, not consumed by external users.
#![allow(clippy::missing_errors_doc)]

pub mod cli;
pub mod cmd;
pub mod config;
pub mod error;
pub mod hash;
pub mod health;
pub mod logging;
pub mod middleware;
pub mod proxy;
pub mod server;
