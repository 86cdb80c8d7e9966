//! Officebook Backend Library
//!
//! Exposes core modules for use by binaries and tests.

pub mod auth;
pub mod betting;
pub mod config;
pub mod middleware;
