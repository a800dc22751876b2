pub mod config;
pub mod logging;

pub mod cleanup;
pub mod coordinator;
pub mod fetcher;
pub mod manifest;
pub mod merge;
pub mod pipeline;
pub mod progress;
pub mod retry;
