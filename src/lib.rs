pub mod api;
pub mod config;
pub mod domain;
pub mod metrics_server;
pub mod normalize;
pub mod observability;
pub mod refresh;
pub mod store;
pub mod upstream;

pub use domain::{BalanceRecord, BreakdownEntry};
