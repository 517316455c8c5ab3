//! Streams an address list from a delimited file and delivers it to a bulk
//! notification API in fixed-size, rate-limited batches, recording every
//! address in a success or failed ledger.

pub mod app;
pub mod config;
pub mod constants;
pub mod error;
pub mod infra;
pub mod observability;
pub mod pipeline;
pub mod types;

pub use config::Config;
pub use error::{DispatchError, NotifyError, Result};
pub use pipeline::Pipeline;
pub use types::{DispatchOutcome, Record, RunSummary, StatusTag};
