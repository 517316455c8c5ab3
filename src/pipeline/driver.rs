use crate::app::ports::{LedgerPort, NotifyApiPort};
use crate::config::Config;
use crate::error::Result;
use crate::observability::metrics;
use crate::pipeline::batch::{Batch, BatchAccumulator};
use crate::pipeline::dispatcher::NotificationDispatcher;
use crate::pipeline::rate_limiter::RateLimiter;
use crate::pipeline::source::CsvSource;
use crate::pipeline::validator::{AddressValidator, Validation};
use crate::types::{DispatchOutcome, RunSummary, StatusTag};
use serde::Serialize;
use tokio::io::AsyncRead;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Drives one pass over the address list:
/// read → validate → batch → wait → dispatch → record.
///
/// Exactly one row is in flight at a time. The next row is not read until the
/// current one, and any batch it completes, has been fully handled, so memory
/// stays bounded by the batch size rather than the input size.
pub struct Pipeline<R> {
    source: CsvSource<R>,
    validator: AddressValidator,
    accumulator: BatchAccumulator,
    delivery: Delivery,
}

/// Everything downstream of the accumulator, plus the run counters.
struct Delivery {
    limiter: RateLimiter,
    dispatcher: NotificationDispatcher,
    ledger: Box<dyn LedgerPort>,
    last_dispatch: Option<Instant>,
    summary: RunSummary,
}

impl<R: AsyncRead + Unpin + Send> Pipeline<R> {
    pub fn new(
        source: CsvSource<R>,
        validator: AddressValidator,
        accumulator: BatchAccumulator,
        limiter: RateLimiter,
        dispatcher: NotificationDispatcher,
        ledger: Box<dyn LedgerPort>,
    ) -> Self {
        Self {
            source,
            validator,
            accumulator,
            delivery: Delivery {
                limiter,
                dispatcher,
                ledger,
                last_dispatch: None,
                summary: RunSummary::default(),
            },
        }
    }

    pub fn from_config(
        config: &Config,
        source: CsvSource<R>,
        api: Box<dyn NotifyApiPort>,
        ledger: Box<dyn LedgerPort>,
    ) -> Result<Self> {
        Ok(Self::new(
            source,
            AddressValidator::from_config(&config.input)?,
            BatchAccumulator::new(config.batch.max_batch_size),
            RateLimiter::new(config.batch.dispatch_floor()),
            NotificationDispatcher::new(api, config.batch.message_body.clone(), config.notify.timeout()),
            ledger,
        ))
    }

    /// Consume the whole input. Dispatch failures are recorded in the ledger and
    /// do not stop the run; only source or ledger I/O errors do. A source error
    /// still sends the addresses already accepted before it is returned.
    pub async fn run(self) -> Result<RunSummary> {
        let Pipeline {
            mut source,
            validator,
            mut accumulator,
            mut delivery,
        } = self;

        info!(
            input = source.name(),
            column = source.column(),
            max_batch_size = accumulator.max_batch_size(),
            dispatch_floor_ms = delivery.limiter.floor().as_millis() as u64,
            "Starting notification run"
        );

        let read_error = loop {
            let record = match source.next_record().await {
                Ok(Some(record)) => record,
                Ok(None) => break None,
                Err(e) => break Some(e),
            };
            delivery.summary.rows_read += 1;
            metrics::source::row_read();

            match validator.validate(record.address.as_deref()) {
                Validation::Rejected => {
                    let raw = record.address.as_deref().unwrap_or("");
                    debug!(line = record.line, address = raw, "invalid address");
                    delivery.record_invalid(raw).await?;
                }
                Validation::Accepted(address) => {
                    if let Some(batch) = accumulator.push(address) {
                        delivery.send(batch).await?;
                    }
                }
            }
        };

        if let Some(batch) = accumulator.flush() {
            delivery.send(batch).await?;
        }

        if let Some(err) = read_error {
            error!(
                input = source.name(),
                rows = delivery.summary.rows_read,
                "Input read failed: {}", err
            );
            return Err(err);
        }

        let summary = delivery.summary;
        info!(
            rows = summary.rows_read,
            delivered = summary.delivered,
            failed = summary.failed,
            invalid = summary.invalid,
            batches = summary.batches_dispatched,
            "Finished sending notifications."
        );
        Ok(summary)
    }
}

impl Delivery {
    async fn record_invalid(&mut self, raw: &str) -> Result<()> {
        self.ledger.record_failure(raw, StatusTag::Invalid).await?;
        self.summary.invalid += 1;
        metrics::validation::record_invalid();
        Ok(())
    }

    async fn send(&mut self, batch: Batch) -> Result<()> {
        let waited = self.limiter.wait_for_next(self.last_dispatch).await;
        metrics::dispatch::rate_limit_wait(waited.as_secs_f64());
        self.last_dispatch = Some(Instant::now());

        let outcome = self.dispatcher.dispatch(&batch).await;
        self.summary.batches_dispatched += 1;
        let size = batch.len() as u64;

        match outcome {
            DispatchOutcome::Delivered => {
                for address in batch.addresses() {
                    self.ledger.record_success(address).await?;
                }
                self.summary.delivered += size;
                metrics::dispatch::batch_delivered(size);
                info!("Batch {} with {} numbers sent.", batch.sequence(), size);
            }
            DispatchOutcome::Rejected(err) => {
                for address in batch.addresses() {
                    self.ledger.record_failure(address, StatusTag::Failed).await?;
                }
                self.summary.failed += size;
                self.summary.batches_failed += 1;
                metrics::dispatch::batch_failed(size);
                warn!("Batch {} failed ({} numbers): {}", batch.sequence(), size, err);
            }
        }
        Ok(())
    }
}

/// Counts from a validate-only pass over the list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    pub rows: u64,
    pub valid: u64,
    pub invalid: u64,
    /// Line numbers of the first few invalid rows, for a quick look.
    pub sample_invalid_lines: Vec<u64>,
}

const SAMPLE_LIMIT: usize = 10;

/// Read and validate every row without dispatching or writing the ledger.
pub async fn check_list<R: AsyncRead + Unpin + Send>(
    mut source: CsvSource<R>,
    validator: &AddressValidator,
) -> Result<CheckReport> {
    let mut report = CheckReport::default();
    while let Some(record) = source.next_record().await? {
        report.rows += 1;
        match validator.validate(record.address.as_deref()) {
            Validation::Accepted(_) => report.valid += 1,
            Validation::Rejected => {
                report.invalid += 1;
                if report.sample_invalid_lines.len() < SAMPLE_LIMIT {
                    report.sample_invalid_lines.push(record.line);
                }
            }
        }
    }
    Ok(report)
}
