//! Asynchronous CSV reader with batch interface
//!
//! Streams transfer requests from a CSV source in fixed-size batches so the
//! pipeline never holds the whole transfer file in memory.
//!
//! ```text
//! CSV Reader → AsyncReader → Batches of TransferRequests
//!                  ↓
//!           csv_format module
//!           (CsvTransfer, convert_csv_transfer)
//! ```

use crate::io::csv_format::{convert_csv_transfer, CsvTransfer};
use crate::types::TransferRequest;
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;
use tracing::warn;

/// Asynchronous CSV reader over transfer requests
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
    skipped: usize,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self {
            csv_reader,
            skipped: 0,
        }
    }

    /// Read up to `batch_size` transfer requests
    ///
    /// Rows that fail to parse or convert are logged and skipped. Returns an
    /// empty vector at end of input.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<TransferRequest> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut skipped = 0;
        let mut records = self.csv_reader.deserialize::<CsvTransfer>();

        while batch.len() < batch_size {
            match records.next().await {
                Some(Ok(csv_transfer)) => match convert_csv_transfer(csv_transfer) {
                    Ok(request) => batch.push(request),
                    Err(e) => {
                        skipped += 1;
                        warn!(error = %e, "skipping transfer row");
                    }
                },
                Some(Err(e)) => {
                    skipped += 1;
                    warn!(error = %e, "skipping malformed CSV row");
                }
                None => break,
            }
        }

        self.skipped += skipped;
        batch
    }

    /// Number of rows skipped so far
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}
