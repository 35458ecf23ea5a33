//! Splits a chunked SSE body into complete records.
//!
//! A record is the text between two blank lines, e.g. `data: {...}\n\n`.
//! Bytes are buffered as-is and only complete records are decoded as UTF-8,
//! so a multi-byte character split across two network reads is never mangled.

use crate::error::{DecodeError, DifyRequestError};

/// Field prefix that carries the JSON payload of a record.
pub const DATA_PREFIX: &str = "data:";

/// One complete SSE record, exactly as received minus the terminating blank line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record(String);

impl Record {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    /// Whether any line of the record carries a `data:` field.
    pub fn has_data(&self) -> bool {
        self.0
            .lines()
            .any(|line| line.trim_end_matches('\r').starts_with(DATA_PREFIX))
    }
}

impl AsRef<str> for Record {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Incremental record splitter. Feed it chunks in arrival order.
#[derive(Debug, Default)]
pub struct FrameSplitter {
    buffer: Vec<u8>,
}

impl FrameSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `chunk` and return every record it completes, in order.
    ///
    /// A record that is not valid UTF-8 comes back as an `Err` in its own slot,
    /// so the records around it are still delivered. Blocks without a `data:`
    /// line (comments, bare `event: ping`, stray blank lines) are keep-alives
    /// and are dropped here.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Result<Record, DecodeError>> {
        self.buffer.extend_from_slice(chunk);

        let mut records = Vec::new();
        loop {
            self.skip_blank_lines();

            let Some((end, next)) = find_record_end(&self.buffer) else {
                break;
            };

            let block = std::str::from_utf8(&self.buffer[..end]).map(str::to_owned);
            self.buffer.drain(..next);

            match block {
                Ok(block) => {
                    let record = Record(block);
                    if record.has_data() {
                        records.push(Ok(record));
                    } else {
                        log::debug!("dropping keep-alive block: {:?}", record.as_str());
                    }
                }
                Err(e) => records.push(Err(DecodeError::from(e))),
            }
        }

        records
    }

    /// Bytes held back waiting for a terminator.
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    /// Close the splitter at end of input.
    ///
    /// Leftover content that never saw its blank-line terminator is a truncated
    /// record, not a valid one.
    pub fn finish(mut self) -> Result<(), DifyRequestError> {
        self.skip_blank_lines();
        if self.buffer.iter().all(u8::is_ascii_whitespace) {
            return Ok(());
        }

        let partial = String::from_utf8_lossy(&self.buffer).into_owned();
        log::warn!("stream ended with {} unterminated bytes", self.buffer.len());
        Err(DifyRequestError::TruncatedRecord(partial))
    }

    fn skip_blank_lines(&mut self) {
        let leading = self
            .buffer
            .iter()
            .take_while(|&&b| b == b'\n' || b == b'\r')
            .count();
        if leading > 0 {
            self.buffer.drain(..leading);
        }
    }
}

/// Find the first blank line. Returns the end of the record body and the index
/// just past the terminator. Accepts `\n\n` and `\n\r\n`.
fn find_record_end(buf: &[u8]) -> Option<(usize, usize)> {
    let mut start = 0;
    while let Some(offset) = buf[start..].iter().position(|&b| b == b'\n') {
        let i = start + offset;
        match buf.get(i + 1) {
            Some(b'\n') => return Some((i, i + 2)),
            Some(b'\r') if buf.get(i + 2) == Some(&b'\n') => return Some((i, i + 3)),
            _ => start = i + 1,
        }
    }
    None
}

/// Split a complete body in one go. Errors on a truncated tail.
pub fn split_all(body: &[u8]) -> Result<Vec<Record>, DifyRequestError> {
    let mut splitter = FrameSplitter::new();
    let records = splitter
        .feed(body)
        .into_iter()
        .collect::<Result<Vec<_>, _>>()?;
    splitter.finish()?;
    Ok(records)
}
