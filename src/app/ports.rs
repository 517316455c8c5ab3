use crate::error::{DispatchError, Result};
use crate::types::StatusTag;
use async_trait::async_trait;
use serde::Serialize;

/// One destination in a notification request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Binding {
    pub binding_type: String,
    pub address: String,
}

/// A single outbound call: every binding receives the same body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NotificationRequest {
    pub bindings: Vec<Binding>,
    pub body: String,
}

// Outbound side
#[async_trait]
pub trait NotifyApiPort: Send + Sync {
    async fn create_notification(&self, request: &NotificationRequest) -> std::result::Result<(), DispatchError>;
}

// Reconcile side
#[async_trait]
pub trait LedgerPort: Send + Sync {
    async fn record_success(&self, address: &str) -> Result<()>;
    async fn record_failure(&self, address: &str, status: StatusTag) -> Result<()>;
}
