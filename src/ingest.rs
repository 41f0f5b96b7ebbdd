//! Newline-delimited JSON report input

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};

use crate::{errors::LocationError, models::LocationRecord};

/// Reads location reports, one JSON object per line
///
/// Blank lines are skipped. Lines that are not valid UTF-8 or not a valid
/// report are logged and skipped; only I/O errors end the stream.
pub struct ReportReader<R> {
    reader: R,
    buf: Vec<u8>,
    line_number: u64,
}

impl<R: AsyncBufRead + Unpin> ReportReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            line_number: 0,
        }
    }

    /// Next well-formed report, None at end of input
    pub async fn next_report(&mut self) -> Result<Option<LocationRecord>, LocationError> {
        loop {
            self.buf.clear();
            if self.reader.read_until(b'\n', &mut self.buf).await? == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            if let Some(record) = parse_line(&self.buf, self.line_number) {
                return Ok(Some(record));
            }
        }
    }
}

fn parse_line(line: &[u8], line_number: u64) -> Option<LocationRecord> {
    if line.iter().all(u8::is_ascii_whitespace) {
        return None;
    }

    // from_slice rejects invalid UTF-8 as a parse error
    match serde_json::from_slice::<LocationRecord>(line) {
        Ok(record) => {
            debug!(
                "Received report from user={}, device={}, reported_at={:?}",
                record.user,
                record.device,
                record.reported_at()
            );
            Some(record)
        }
        Err(e) => {
            warn!("Skipping line {}: failed to parse location report: {}", line_number, e);
            None
        }
    }
}
