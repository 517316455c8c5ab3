//! The ingest → validate → batch → throttle → dispatch → reconcile pipeline.

pub mod batch;
pub mod dispatcher;
pub mod driver;
pub mod ledger;
pub mod rate_limiter;
pub mod source;
pub mod validator;

pub use batch::{Batch, BatchAccumulator};
pub use dispatcher::NotificationDispatcher;
pub use driver::{check_list, CheckReport, Pipeline};
pub use ledger::CsvLedger;
pub use rate_limiter::RateLimiter;
pub use source::CsvSource;
pub use validator::{AddressValidator, Validation};
