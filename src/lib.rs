//! Append-only proof-of-work ledger.
//!
//! [`blockchain`] holds the ledger core. [`api`] and [`config`] make up the
//! HTTP node built on top of it.

pub mod api;
pub mod blockchain;
pub mod config;
