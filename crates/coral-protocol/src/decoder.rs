//! Incremental decoder for the backend's newline-delimited output.

use std::io::{self, BufRead};
use std::ops::ControlFlow;

use thiserror::Error;

use crate::event::ProtocolEvent;

/// Reads lines from a backend output stream and classifies each one.
///
/// Lines have no length limit. A trailing carriage return is stripped so
/// backends that emit `\r\n` decode identically. Bytes that are not valid
/// UTF-8 are replaced, which always yields [`ProtocolEvent::Unrecognized`].
#[derive(Debug)]
pub struct LineDecoder<R> {
    reader: R,
    buffer: Vec<u8>,
    summary: DecodeSummary,
}

/// Counters describing a finished decode run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeSummary {
    /// Lines read from the stream.
    pub lines: u64,
    /// Lines that did not match a known token.
    pub unrecognized: u64,
}

/// Errors raised while reading backend output.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The underlying stream failed before reaching end of file.
    #[error("failed to read backend output after {lines} lines: {source}")]
    Read {
        /// Lines successfully read before the failure.
        lines: u64,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

impl<R: BufRead> LineDecoder<R> {
    /// Wraps a buffered reader.
    pub const fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: Vec::new(),
            summary: DecodeSummary {
                lines: 0,
                unrecognized: 0,
            },
        }
    }

    /// Reads and classifies the next line.
    ///
    /// Returns `Ok(None)` once the stream is closed. A final line without a
    /// terminating newline is still delivered.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Read`] when the stream reports an error other
    /// than an interrupted read.
    pub fn next_event(&mut self) -> Result<Option<ProtocolEvent>, DecodeError> {
        self.buffer.clear();
        let read = loop {
            match self.reader.read_until(b'\n', &mut self.buffer) {
                Ok(read) => break read,
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                Err(source) => {
                    return Err(DecodeError::Read {
                        lines: self.summary.lines,
                        source,
                    });
                }
            }
        };
        if read == 0 {
            return Ok(None);
        }

        let line = strip_terminator(&self.buffer);
        let event = ProtocolEvent::decode(&String::from_utf8_lossy(line));
        self.summary.lines += 1;
        if matches!(event, ProtocolEvent::Unrecognized(_)) {
            self.summary.unrecognized += 1;
        }
        Ok(Some(event))
    }

    /// Delivers every event to `on_event` in stream order until the stream
    /// closes or the callback breaks.
    ///
    /// Each event is fully handled before the next line is read.
    ///
    /// # Errors
    ///
    /// Propagates [`DecodeError::Read`] from [`LineDecoder::next_event`].
    pub fn run<F>(mut self, mut on_event: F) -> Result<DecodeSummary, DecodeError>
    where
        F: FnMut(ProtocolEvent) -> ControlFlow<()>,
    {
        while let Some(event) = self.next_event()? {
            if on_event(event).is_break() {
                break;
            }
        }
        Ok(self.summary)
    }
}

fn strip_terminator(raw: &[u8]) -> &[u8] {
    let line = raw.strip_suffix(b"\n").unwrap_or(raw);
    line.strip_suffix(b"\r").unwrap_or(line)
}
