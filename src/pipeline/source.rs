use crate::error::{NotifyError, Result};
use crate::types::Record;
use csv_async::{AsyncReader, AsyncReaderBuilder, ByteRecord};
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncRead;
use tracing::debug;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Pull-based reader over a delimited address list.
///
/// Rows are produced one at a time and only when asked for, so the consumer
/// sets the pace: nothing past the current row is parsed or held in memory.
/// The header is checked once when the source is built.
///
/// Fields are decoded lossily, so a row in a legacy encoding still comes
/// through as a row (and fails validation) instead of ending the read.
pub struct CsvSource<R> {
    reader: AsyncReader<R>,
    record: ByteRecord,
    name: String,
    column: String,
    column_index: usize,
}

impl CsvSource<File> {
    pub async fn open(path: &Path, column: &str, delimiter: char) -> Result<Self> {
        let file = File::open(path).await?;
        Self::from_reader(file, &path.display().to_string(), column, delimiter).await
    }
}

impl<R: AsyncRead + Unpin + Send> CsvSource<R> {
    /// Read the header from `reader` and locate `column`.
    ///
    /// Fails with [`NotifyError::MissingColumn`] if the header lacks the column
    /// or the input is empty.
    pub async fn from_reader(reader: R, name: &str, column: &str, delimiter: char) -> Result<Self> {
        let delimiter = u8::try_from(delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| {
                NotifyError::Config(format!("delimiter {:?} must be a single ASCII character", delimiter))
            })?;

        let mut reader = AsyncReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .create_reader(reader);

        let column_index = reader
            .byte_headers()
            .await?
            .iter()
            .enumerate()
            .position(|(i, h)| {
                let h = if i == 0 { h.strip_prefix(UTF8_BOM).unwrap_or(h) } else { h };
                String::from_utf8_lossy(h).trim() == column
            })
            .ok_or_else(|| NotifyError::MissingColumn {
                column: column.to_string(),
                path: name.to_string(),
            })?;
        debug!(input = name, column, column_index, "header confirmed");

        Ok(Self {
            reader,
            record: ByteRecord::new(),
            name: name.to_string(),
            column: column.to_string(),
            column_index,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    /// Next data row, or `None` at end of input. Blank lines are not rows.
    pub async fn next_record(&mut self) -> Result<Option<Record>> {
        loop {
            if !self.reader.read_byte_record(&mut self.record).await? {
                return Ok(None);
            }
            if is_blank(&self.record) {
                continue;
            }
            let line = self.record.position().map_or(0, |p| p.line());
            let address = self
                .record
                .get(self.column_index)
                .map(|f| String::from_utf8_lossy(f).into_owned());
            return Ok(Some(Record { line, address }));
        }
    }
}

fn is_blank(record: &ByteRecord) -> bool {
    record.len() <= 1
        && record
            .get(0)
            .map_or(true, |f| f.iter().all(u8::is_ascii_whitespace))
}
