// Podcast Bridge - Library root for testing

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod headers;
pub mod http_client;
pub mod login_flow;
