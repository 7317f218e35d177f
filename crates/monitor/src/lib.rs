//! Transaction Monitor service
//!
//! HTTP adapter around the monitoring engine: configuration, historical
//! dataset loading and the JSON API.

pub mod api;
pub mod config;
pub mod history;
