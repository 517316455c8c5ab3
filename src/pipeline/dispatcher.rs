use crate::app::ports::{Binding, NotificationRequest, NotifyApiPort};
use crate::constants::SMS_BINDING_TYPE;
use crate::error::DispatchError;
use crate::observability::metrics;
use crate::pipeline::batch::Batch;
use crate::types::DispatchOutcome;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Turns a batch into exactly one notify API call and classifies the result.
///
/// The API reports success or failure for the call as a whole, so the outcome
/// covers every address in the batch.
pub struct NotificationDispatcher {
    api: Box<dyn NotifyApiPort>,
    message_body: String,
    timeout: Duration,
}

impl NotificationDispatcher {
    pub fn new(api: Box<dyn NotifyApiPort>, message_body: impl Into<String>, timeout: Duration) -> Self {
        Self {
            api,
            message_body: message_body.into(),
            timeout,
        }
    }

    pub fn build_request(&self, batch: &Batch) -> NotificationRequest {
        NotificationRequest {
            bindings: batch
                .addresses()
                .iter()
                .map(|address| Binding {
                    binding_type: SMS_BINDING_TYPE.to_string(),
                    address: address.clone(),
                })
                .collect(),
            body: self.message_body.clone(),
        }
    }

    pub async fn dispatch(&self, batch: &Batch) -> DispatchOutcome {
        let request = self.build_request(batch);
        let started = Instant::now();
        let result = match tokio::time::timeout(self.timeout, self.api.create_notification(&request)).await {
            Ok(r) => r,
            Err(_) => Err(DispatchError::Timeout(self.timeout)),
        };
        metrics::dispatch::duration(started.elapsed().as_secs_f64());

        match result {
            Ok(()) => {
                debug!(batch = batch.sequence(), size = batch.len(), "notify API accepted batch");
                DispatchOutcome::Delivered
            }
            Err(e) => {
                warn!(batch = batch.sequence(), size = batch.len(), error = %e, "notify API rejected batch");
                DispatchOutcome::Rejected(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::batch::BatchAccumulator;
    use async_trait::async_trait;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    struct RecordingApi {
        calls: Arc<Mutex<Vec<NotificationRequest>>>,
        reply: Result<(), DispatchError>,
    }

    #[async_trait]
    impl NotifyApiPort for RecordingApi {
        async fn create_notification(&self, request: &NotificationRequest) -> Result<(), DispatchError> {
            self.calls.lock().await.push(request.clone());
            self.reply.clone()
        }
    }

    struct HangingApi;

    #[async_trait]
    impl NotifyApiPort for HangingApi {
        async fn create_notification(&self, _request: &NotificationRequest) -> Result<(), DispatchError> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    fn batch_of(addrs: &[&str]) -> Batch {
        let mut acc = BatchAccumulator::new(addrs.len());
        let mut out = None;
        for a in addrs {
            out = acc.push(a.to_string());
        }
        out.unwrap()
    }

    #[tokio::test]
    async fn one_call_binds_every_address_to_the_body() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let api = RecordingApi { calls: calls.clone(), reply: Ok(()) };
        let dispatcher = NotificationDispatcher::new(Box::new(api), "hello", Duration::from_secs(5));

        let outcome = dispatcher.dispatch(&batch_of(&["+15550001", "+15550002"])).await;
        assert_eq!(outcome, DispatchOutcome::Delivered);

        let calls = calls.lock().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].body, "hello");
        let addrs: Vec<_> = calls[0].bindings.iter().map(|b| b.address.as_str()).collect();
        assert_eq!(addrs, vec!["+15550001", "+15550002"]);
        assert!(calls[0].bindings.iter().all(|b| b.binding_type == "sms"));
    }

    #[tokio::test]
    async fn api_error_rejects_the_batch() {
        let err = DispatchError::Api { status: 400, code: Some(20003), message: "Authenticate".into() };
        let api = RecordingApi { calls: Arc::new(Mutex::new(Vec::new())), reply: Err(err.clone()) };
        let dispatcher = NotificationDispatcher::new(Box::new(api), "hello", Duration::from_secs(5));

        let outcome = dispatcher.dispatch(&batch_of(&["+15550001"])).await;
        assert_eq!(outcome, DispatchOutcome::Rejected(err));
    }

    #[tokio::test(start_paused = true)]
    async fn hung_call_times_out_as_rejected() {
        let dispatcher = NotificationDispatcher::new(Box::new(HangingApi), "hello", Duration::from_secs(30));
        let outcome = dispatcher.dispatch(&batch_of(&["+15550001"])).await;
        assert_eq!(
            outcome,
            DispatchOutcome::Rejected(DispatchError::Timeout(Duration::from_secs(30)))
        );
    }
}
