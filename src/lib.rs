pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod types;

// Ports and the adapters behind them
pub mod app;
pub mod gateway;
pub mod infra;
