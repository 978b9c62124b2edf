use crate::sink::{MatchRecord, MatchSink};

/// Filters and tallies match records before they reach the sink.
///
/// Three outcomes per offered record: ignored (folder filtering active and
/// the record is a file), duplicate (identical full path to the immediately
/// preceding accepted record, outside folder-only mode), or accepted and
/// forwarded. Every offered record increments `received`, so after a run
/// `received == ignored + duplicates + accepted` holds unconditionally.
#[derive(Debug)]
pub struct ResultAccumulator {
    folders_only: bool,
    previous: Option<String>,
    received: u64,
    ignored: u64,
    duplicates: u64,
    accepted: u64,
}

impl ResultAccumulator {
    /// Creates an accumulator, optionally restricted to folder entries.
    #[must_use]
    pub const fn new(folders_only: bool) -> Self {
        Self {
            folders_only,
            previous: None,
            received: 0,
            ignored: 0,
            duplicates: 0,
            accepted: 0,
        }
    }

    /// Offers one record, forwarding it to the sink when accepted.
    pub fn offer(&mut self, record: MatchRecord, sink: &mut dyn MatchSink) {
        self.received += 1;

        if self.folders_only && !record.is_directory() {
            self.ignored += 1;
            return;
        }

        // Consecutive-duplicate suppression is exact and case-sensitive, and
        // only applies outside folder-only mode.
        if !self.folders_only && self.previous.as_deref() == Some(record.path()) {
            self.duplicates += 1;
            return;
        }

        self.previous = Some(record.path().to_owned());
        self.accepted += 1;
        sink.push(record);
    }

    /// Total records offered.
    #[must_use]
    pub const fn received(&self) -> u64 {
        self.received
    }

    /// Records discarded by folder filtering.
    #[must_use]
    pub const fn ignored(&self) -> u64 {
        self.ignored
    }

    /// Records discarded as consecutive duplicates.
    #[must_use]
    pub const fn duplicates(&self) -> u64 {
        self.duplicates
    }

    /// Records forwarded to the sink.
    #[must_use]
    pub const fn accepted(&self) -> u64 {
        self.accepted
    }
}
