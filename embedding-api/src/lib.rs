pub mod app;
pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod handlers;
pub mod metrics_utils;
pub mod model;
pub mod store;
