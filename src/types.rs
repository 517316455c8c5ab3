use crate::error::DispatchError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One input row as read from the address list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// 1-based line number in the input file (the header is line 1).
    pub line: u64,
    /// Raw address field. `None` when the row is too short to reach the column.
    pub address: Option<String>,
}

/// Status column written to the failed ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusTag {
    /// Address did not pass validation and was never dispatched.
    Invalid,
    /// Address was part of a batch the notify API rejected.
    Failed,
}

impl StatusTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusTag::Invalid => "Invalid",
            StatusTag::Failed => "Failed",
        }
    }
}

impl fmt::Display for StatusTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a single dispatch call, applied to the whole batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Delivered,
    Rejected(DispatchError),
}

/// Totals for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub rows_read: u64,
    pub invalid: u64,
    pub batches_dispatched: u64,
    pub batches_failed: u64,
    pub delivered: u64,
    pub failed: u64,
}

impl RunSummary {
    /// Rows that ended up in either ledger.
    pub fn accounted(&self) -> u64 {
        self.invalid + self.delivered + self.failed
    }
}
