//! Probe origins directly and through a CDN edge to find IP allow-lists
//! that a CDN tenant can walk around.

pub mod backend;
pub mod bypass;
pub mod cloudflare;
pub mod concurrent;
pub mod config;
pub mod discover;
pub mod errors;
pub mod http_client;
pub mod output;
pub mod probe;
pub mod resolver;
pub mod scanner;

pub use errors::ScanError;
