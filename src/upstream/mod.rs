pub mod client;
pub mod payload;

pub use client::{BalanceClient, BalanceProvider, Truncation, UpstreamError};
pub use payload::{Category, Observation, RawBalancePayload};
