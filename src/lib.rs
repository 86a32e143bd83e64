//! Policy domains administration service.
//!
//! Exposes isolated policy containers ("domains") over HTTP and filters the
//! domain collection by the caller's authorization context.

pub mod api;
pub mod config;
pub mod db;
pub mod domains;
pub mod error;
pub mod models;
