use crate::app::ports::LedgerPort;
use crate::constants::{FAILED_LEDGER_HEADER, SUCCESS_LEDGER_HEADER};
use crate::error::Result;
use crate::observability::metrics;
use crate::types::StatusTag;
use async_trait::async_trait;
use csv_async::{AsyncWriter, AsyncWriterBuilder};
use std::path::Path;
use tokio::fs::{self, File, OpenOptions};
use tokio::sync::Mutex;

/// The success and failed CSV logs for one run.
///
/// Both files are truncated and given their header on creation. Every append is
/// flushed before the call returns, so entries land in call order and a crash
/// loses at most the append in progress.
pub struct CsvLedger {
    files: Mutex<LedgerFiles>,
}

struct LedgerFiles {
    failed: AsyncWriter<File>,
    success: AsyncWriter<File>,
}

impl CsvLedger {
    pub async fn create(failed_path: &Path, success_path: &Path) -> Result<Self> {
        let failed = recreate(failed_path, &FAILED_LEDGER_HEADER).await?;
        let success = recreate(success_path, &SUCCESS_LEDGER_HEADER).await?;
        Ok(Self {
            files: Mutex::new(LedgerFiles { failed, success }),
        })
    }

    async fn append(&self, which: Log, row: &[&str]) -> Result<()> {
        let mut files = self.files.lock().await;
        let writer = match which {
            Log::Failed => &mut files.failed,
            Log::Success => &mut files.success,
        };
        match write_through(writer, row).await {
            Ok(()) => {
                metrics::ledger::write_success();
                Ok(())
            }
            Err(e) => {
                metrics::ledger::write_error();
                Err(e)
            }
        }
    }
}

#[derive(Clone, Copy)]
enum Log {
    Failed,
    Success,
}

async fn write_through(writer: &mut AsyncWriter<File>, row: &[&str]) -> Result<()> {
    writer.write_record(row).await?;
    writer.flush().await?;
    Ok(())
}

async fn recreate(path: &Path, header: &[&str]) -> Result<AsyncWriter<File>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .await?;
    let mut writer = AsyncWriterBuilder::new().create_writer(file);
    write_through(&mut writer, header).await?;
    Ok(writer)
}

#[async_trait]
impl LedgerPort for CsvLedger {
    async fn record_success(&self, address: &str) -> Result<()> {
        self.append(Log::Success, &[address]).await
    }

    async fn record_failure(&self, address: &str, status: StatusTag) -> Result<()> {
        self.append(Log::Failed, &[address, status.as_str()]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn writes_headers_and_rows_in_order() {
        let dir = tempdir().unwrap();
        let failed = dir.path().join("failed.csv");
        let success = dir.path().join("success.csv");
        let ledger = CsvLedger::create(&failed, &success).await.unwrap();

        ledger.record_failure("bad", StatusTag::Invalid).await.unwrap();
        ledger.record_success("+15550001").await.unwrap();
        ledger.record_failure("+15550002", StatusTag::Failed).await.unwrap();
        ledger.record_success("+15550003").await.unwrap();

        assert_eq!(
            fs::read_to_string(&failed).unwrap(),
            "Numbers,Status\nbad,Invalid\n+15550002,Failed\n"
        );
        assert_eq!(
            fs::read_to_string(&success).unwrap(),
            "Numbers\n+15550001\n+15550003\n"
        );
    }

    #[tokio::test]
    async fn create_truncates_previous_run() {
        let dir = tempdir().unwrap();
        let failed = dir.path().join("failed.csv");
        let success = dir.path().join("success.csv");
        fs::write(&failed, "stale,Failed\nstale2,Failed\n").unwrap();
        fs::write(&success, "stale\n").unwrap();

        let _ledger = CsvLedger::create(&failed, &success).await.unwrap();
        assert_eq!(fs::read_to_string(&failed).unwrap(), "Numbers,Status\n");
        assert_eq!(fs::read_to_string(&success).unwrap(), "Numbers\n");
    }

    #[tokio::test]
    async fn quotes_fields_that_would_break_the_row() {
        let dir = tempdir().unwrap();
        let failed = dir.path().join("nested/failed.csv");
        let success = dir.path().join("nested/success.csv");
        let ledger = CsvLedger::create(&failed, &success).await.unwrap();

        ledger
            .record_failure("+1,555 \"x\"", StatusTag::Invalid)
            .await
            .unwrap();
        ledger
            .record_failure("Smith\nJo", StatusTag::Invalid)
            .await
            .unwrap();
        assert_eq!(
            fs::read_to_string(&failed).unwrap(),
            "Numbers,Status\n\"+1,555 \"\"x\"\"\",Invalid\n\"Smith\nJo\",Invalid\n"
        );
    }

    #[tokio::test]
    async fn empty_invalid_field_keeps_its_status_column() {
        let dir = tempdir().unwrap();
        let failed = dir.path().join("failed.csv");
        let success = dir.path().join("success.csv");
        let ledger = CsvLedger::create(&failed, &success).await.unwrap();

        ledger.record_failure("", StatusTag::Invalid).await.unwrap();
        assert_eq!(fs::read_to_string(&failed).unwrap(), "Numbers,Status\n,Invalid\n");
    }
}
