pub mod cache;
pub mod config;
pub mod media;
pub mod server;
pub mod service;
