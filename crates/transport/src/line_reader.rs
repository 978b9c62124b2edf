use std::io::{self, Read};

use memchr::memchr;

/// Default receive-buffer capacity in bytes.
pub const DEFAULT_CAPACITY: usize = 8 * 1024;

/// Refill strategy used by [`LineReader`].
///
/// Both strategies satisfy the same contract: read one CRLF-terminated line
/// within the receive timeout configured on the underlying socket. The
/// single-byte strategy trades throughput for simplicity and never reads past
/// the line terminator; the buffered strategy performs bulk receives and
/// serves subsequent lines from memory.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum ReadStrategy {
    /// One single-byte receive per consumed byte.
    SingleByte,
    /// Bulk refill whenever the buffer is exhausted.
    #[default]
    Buffered,
}

/// Fixed-capacity line reader over a byte stream.
///
/// The buffer is refilled only when no unconsumed bytes remain, preserving
/// the invariant `cursor + remaining <= capacity`. Receive timeouts are the
/// responsibility of the stream itself (`SO_RCVTIMEO` applied by
/// [`connect`](crate::connect)); a timed-out receive surfaces as an
/// [`io::Error`] from [`LineReader::read_line`].
#[derive(Debug)]
pub struct LineReader<R> {
    inner: R,
    strategy: ReadStrategy,
    buf: Vec<u8>,
    cursor: usize,
    remaining: usize,
    total_received: u64,
}

impl<R: Read> LineReader<R> {
    /// Creates a reader with [`DEFAULT_CAPACITY`].
    #[must_use]
    pub fn new(inner: R, strategy: ReadStrategy) -> Self {
        Self::with_capacity(inner, strategy, DEFAULT_CAPACITY)
    }

    /// Creates a reader with an explicit buffer capacity.
    ///
    /// A zero capacity is rounded up to one byte so refills always make
    /// progress.
    #[must_use]
    pub fn with_capacity(inner: R, strategy: ReadStrategy, capacity: usize) -> Self {
        Self {
            inner,
            strategy,
            buf: vec![0; capacity.max(1)],
            cursor: 0,
            remaining: 0,
            total_received: 0,
        }
    }

    /// Reads one line, stripping the trailing CR/LF and trimming leading
    /// ASCII whitespace.
    ///
    /// Returns `Ok(None)` on orderly end of stream. A partial line followed
    /// by EOF is returned as-is; the subsequent call reports `None`. Receive
    /// timeouts and transport failures surface as errors for the caller to
    /// record.
    pub fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line: Vec<u8> = Vec::new();

        loop {
            if self.remaining == 0 && !self.refill()? {
                if line.is_empty() {
                    return Ok(None);
                }
                break;
            }

            let window = &self.buf[self.cursor..self.cursor + self.remaining];
            match memchr(b'\n', window) {
                Some(pos) => {
                    line.extend_from_slice(&window[..pos]);
                    self.consume(pos + 1);
                    break;
                }
                None => {
                    line.extend_from_slice(window);
                    self.consume(window.len());
                }
            }
        }

        while line.last() == Some(&b'\r') {
            line.pop();
        }

        let text = String::from_utf8_lossy(&line);
        Ok(Some(text.trim_start().to_owned()))
    }

    /// Returns the total number of bytes received since construction.
    #[must_use]
    pub const fn total_bytes_received(&self) -> u64 {
        self.total_received
    }

    /// Returns a shared reference to the underlying stream.
    #[must_use]
    pub const fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Returns a mutable reference to the underlying stream, used by the
    /// engine to write commands on the same connection.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Releases the reader and returns the underlying stream. Buffered but
    /// unconsumed bytes are discarded.
    #[must_use]
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Refills the empty buffer, returning `false` on end of stream.
    fn refill(&mut self) -> io::Result<bool> {
        debug_assert_eq!(self.remaining, 0, "refill requires an exhausted buffer");

        let window = match self.strategy {
            ReadStrategy::SingleByte => &mut self.buf[..1],
            ReadStrategy::Buffered => &mut self.buf[..],
        };

        // A receive interrupted by a signal is retried, not surfaced.
        let received = loop {
            match self.inner.read(&mut *window) {
                Ok(received) => break received,
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                Err(error) => return Err(error),
            }
        };
        self.cursor = 0;
        self.remaining = received;
        self.total_received += received as u64;
        Ok(received > 0)
    }

    fn consume(&mut self, count: usize) {
        debug_assert!(count <= self.remaining);
        self.cursor += count;
        self.remaining -= count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn reader_for(input: &[u8], strategy: ReadStrategy) -> LineReader<Cursor<Vec<u8>>> {
        LineReader::new(Cursor::new(input.to_vec()), strategy)
    }

    #[test]
    fn reads_crlf_terminated_lines() {
        for strategy in [ReadStrategy::SingleByte, ReadStrategy::Buffered] {
            let mut reader = reader_for(b"220 Welcome\r\n230 Logged on.\r\n", strategy);
            assert_eq!(reader.read_line().unwrap().as_deref(), Some("220 Welcome"));
            assert_eq!(
                reader.read_line().unwrap().as_deref(),
                Some("230 Logged on.")
            );
            assert_eq!(reader.read_line().unwrap(), None);
        }
    }

    #[test]
    fn accepts_bare_lf_lines() {
        let mut reader = reader_for(b"RESULT_COUNT 1\nFILE a\n", ReadStrategy::Buffered);
        assert_eq!(
            reader.read_line().unwrap().as_deref(),
            Some("RESULT_COUNT 1")
        );
        assert_eq!(reader.read_line().unwrap().as_deref(), Some("FILE a"));
    }

    #[test]
    fn trims_leading_whitespace() {
        let mut reader = reader_for(b"   220 padded\r\n", ReadStrategy::Buffered);
        assert_eq!(reader.read_line().unwrap().as_deref(), Some("220 padded"));
    }

    #[test]
    fn returns_partial_final_line_then_eof() {
        for strategy in [ReadStrategy::SingleByte, ReadStrategy::Buffered] {
            let mut reader = reader_for(b"no terminator", strategy);
            assert_eq!(
                reader.read_line().unwrap().as_deref(),
                Some("no terminator")
            );
            assert_eq!(reader.read_line().unwrap(), None);
        }
    }

    #[test]
    fn empty_stream_is_immediate_eof() {
        let mut reader = reader_for(b"", ReadStrategy::Buffered);
        assert_eq!(reader.read_line().unwrap(), None);
    }

    #[test]
    fn handles_lines_longer_than_the_buffer() {
        let mut input = vec![b'x'; 100];
        input.extend_from_slice(b"\r\n");
        let mut reader =
            LineReader::with_capacity(Cursor::new(input), ReadStrategy::Buffered, 16);
        let line = reader.read_line().unwrap().expect("line");
        assert_eq!(line.len(), 100);
        assert!(line.bytes().all(|b| b == b'x'));
    }

    #[test]
    fn counts_every_received_byte() {
        let input = b"220 Welcome\r\n200 End.\r\n";
        for strategy in [ReadStrategy::SingleByte, ReadStrategy::Buffered] {
            let mut reader = reader_for(input, strategy);
            while reader.read_line().unwrap().is_some() {}
            assert_eq!(reader.total_bytes_received(), input.len() as u64);
        }
    }

    #[test]
    fn single_byte_strategy_never_reads_past_the_line() {
        let mut reader = reader_for(b"first\r\nsecond\r\n", ReadStrategy::SingleByte);
        assert_eq!(reader.read_line().unwrap().as_deref(), Some("first"));
        // Only the first line's bytes have been pulled from the stream.
        assert_eq!(reader.total_bytes_received(), "first\r\n".len() as u64);
    }

    struct InterruptingReader {
        inner: Cursor<Vec<u8>>,
        pending_interrupt: bool,
    }

    impl Read for InterruptingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.pending_interrupt {
                self.pending_interrupt = false;
                return Err(io::Error::from(io::ErrorKind::Interrupted));
            }
            self.pending_interrupt = true;
            self.inner.read(buf)
        }
    }

    #[test]
    fn interrupted_receives_are_retried() {
        let stream = InterruptingReader {
            inner: Cursor::new(b"220 Welcome\r\n230 Logged on.\r\n".to_vec()),
            pending_interrupt: true,
        };

        let mut reader = LineReader::new(stream, ReadStrategy::SingleByte);
        assert_eq!(reader.read_line().unwrap().as_deref(), Some("220 Welcome"));
        assert_eq!(
            reader.read_line().unwrap().as_deref(),
            Some("230 Logged on.")
        );
        assert_eq!(reader.read_line().unwrap(), None);
    }

    #[test]
    fn empty_lines_are_distinct_from_eof() {
        let mut reader = reader_for(b"\r\nnext\r\n", ReadStrategy::Buffered);
        assert_eq!(reader.read_line().unwrap().as_deref(), Some(""));
        assert_eq!(reader.read_line().unwrap().as_deref(), Some("next"));
    }
}
