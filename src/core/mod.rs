//! Core translation engine module

pub mod cache;
pub mod client;
pub mod config;
pub mod errors;
pub mod models;
pub mod port;
pub mod report;
pub mod retry;
pub mod scheduler;
