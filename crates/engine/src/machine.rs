use std::net::{SocketAddr, TcpStream};

use protocol::{
    Command, LOGIN_ACCEPTED, QUERY_RESPONSE, Reply, ResultLine, decode_native_timestamp,
    shell_pattern_to_regex,
};
use tracing::{debug, trace, warn};
use transport::{CancelToken, ConnectStrategy, LineReader, connect, resolve_host};

use crate::accumulator::ResultAccumulator;
use crate::credentials::{CredentialStores, StoreKind, consult_store};
use crate::host_spec::HostSpec;
use crate::options::{PatternMode, QueryOptions};
use crate::sink::{MatchRecord, MatchSink, join_remote_path};

/// Dialogue state.
///
/// Every handler assigns exactly one successor, so the driver loop reaches
/// [`State::Exit`] in a bounded number of transitions for any finite
/// response sequence. Protocol and transport failures route through
/// [`State::Closing`]; nothing escapes the machine as an error.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum State {
    Init,
    ParseSpec,
    AuthinfoLookup,
    NetrcLookup,
    Resolve,
    ConnectBlocking,
    ConnectPolling,
    SendLogin,
    SendPassword,
    AwaitLogin,
    SendQuery,
    AwaitBanner,
    ReadResultCount,
    ReadResultRow,
    Closing,
    Exit,
}

/// Outcome of one query run.
///
/// A run never fails outright; failures leave warnings in the log and show
/// up here as zero accepted matches. Callers that need to distinguish "no
/// matches" from "query failed before any count arrived" cannot: the
/// protocol presents both as zero records.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct QueryStats {
    expected: u64,
    received: u64,
    accepted: u64,
    ignored: u64,
    duplicates: u64,
    bytes_received: u64,
    cancelled: bool,
}

impl QueryStats {
    /// Matches the server announced in its `RESULT_COUNT` line.
    #[must_use]
    pub const fn expected(&self) -> u64 {
        self.expected
    }

    /// Match records received, regardless of outcome.
    #[must_use]
    pub const fn received(&self) -> u64 {
        self.received
    }

    /// Records delivered to the sink.
    #[must_use]
    pub const fn accepted(&self) -> u64 {
        self.accepted
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

    /// Total bytes received over the connection.
    #[must_use]
    pub const fn bytes_received(&self) -> u64 {
        self.bytes_received
    }

    /// Reports whether the run was abandoned by cancellation.
    #[must_use]
    pub const fn cancelled(&self) -> bool {
        self.cancelled
    }
}

/// Runs one query against one remote host.
///
/// The dialogue is driven to completion synchronously; accepted records are
/// pushed into `sink` as they arrive. Resolution, connection, transport, and
/// protocol failures are logged and terminate the run early with whatever
/// was accepted so far. Cancellation is observed between state transitions
/// and inside the polling connect loop; a cancelled run stops without the
/// polite shutdown sequence and is flagged in the returned stats.
pub fn run_query(
    host: &str,
    search: &str,
    options: &QueryOptions,
    stores: CredentialStores<'_>,
    sink: &mut dyn MatchSink,
    cancel: &CancelToken,
) -> QueryStats {
    let mut context = QueryContext::new(host, search, options, stores, sink, cancel);
    let mut state = State::Init;
    let mut cancelled = false;

    while state != State::Exit {
        if cancel.is_cancelled() {
            warn!(host = %context.spec.hostname(), ?state, "query cancelled");
            cancelled = true;
            break;
        }
        let next = context.step(state);
        trace!(from = ?state, to = ?next, "state transition");
        state = next;
    }

    context.finish(cancelled)
}

/// Per-run connection context, exclusively owned by the driver loop.
struct QueryContext<'a> {
    spec: HostSpec,
    search: &'a str,
    options: &'a QueryOptions,
    stores: CredentialStores<'a>,
    cancel: &'a CancelToken,
    sink: &'a mut dyn MatchSink,

    authinfo_enabled: bool,
    netrc_enabled: bool,
    addr: Option<SocketAddr>,
    reader: Option<LineReader<TcpStream>>,
    accumulator: ResultAccumulator,
    expected: u64,
    bytes_received: u64,

    // Directory context carried between result lines.
    current_path: String,
    current_size: Option<u64>,
    current_ticks: Option<u64>,
}

impl<'a> QueryContext<'a> {
    fn new(
        host: &str,
        search: &'a str,
        options: &'a QueryOptions,
        stores: CredentialStores<'a>,
        sink: &'a mut dyn MatchSink,
        cancel: &'a CancelToken,
    ) -> Self {
        Self {
            spec: HostSpec::parse(host),
            search,
            options,
            stores,
            cancel,
            sink,
            authinfo_enabled: true,
            netrc_enabled: true,
            addr: None,
            reader: None,
            accumulator: ResultAccumulator::new(options.folders_only()),
            expected: 0,
            bytes_received: 0,
            current_path: String::new(),
            current_size: None,
            current_ticks: None,
        }
    }

    fn step(&mut self, state: State) -> State {
        match state {
            State::Init => self.on_init(),
            State::ParseSpec => self.on_parse_spec(),
            State::AuthinfoLookup => self.on_authinfo_lookup(),
            State::NetrcLookup => self.on_netrc_lookup(),
            State::Resolve => self.on_resolve(),
            State::ConnectBlocking => self.on_connect(ConnectStrategy::Blocking),
            State::ConnectPolling => self.on_connect(ConnectStrategy::Polling),
            State::SendLogin => self.on_send_login(),
            State::SendPassword => self.on_send_password(),
            State::AwaitLogin => self.on_await_login(),
            State::SendQuery => self.on_send_query(),
            State::AwaitBanner => self.on_await_banner(),
            State::ReadResultCount => self.on_read_result_count(),
            State::ReadResultRow => self.on_read_result_row(),
            State::Closing => self.on_closing(),
            State::Exit => State::Exit,
        }
    }

    fn on_init(&self) -> State {
        debug!(host = %self.spec.hostname(), search = %self.search, "starting remote query");
        State::ParseSpec
    }

    // Host-spec parsing is infallible and already happened in the
    // constructor; this state decides whether credential discovery runs.
    fn on_parse_spec(&mut self) -> State {
        if self.spec.has_inline_credentials() {
            self.authinfo_enabled = false;
            self.netrc_enabled = false;
            debug!(host = %self.spec.hostname(), "using inline credentials");
            return State::Resolve;
        }
        State::AuthinfoLookup
    }

    fn on_authinfo_lookup(&mut self) -> State {
        self.authinfo_enabled = false;
        if consult_store(self.stores.authinfo, StoreKind::Authinfo, &mut self.spec) {
            return State::Resolve;
        }
        if self.netrc_enabled {
            State::NetrcLookup
        } else {
            State::Resolve
        }
    }

    fn on_netrc_lookup(&mut self) -> State {
        self.netrc_enabled = false;
        if consult_store(self.stores.netrc, StoreKind::Netrc, &mut self.spec) {
            return State::Resolve;
        }
        if self.authinfo_enabled {
            State::AuthinfoLookup
        } else {
            State::Resolve
        }
    }

    fn on_resolve(&mut self) -> State {
        match resolve_host(self.spec.hostname(), self.spec.port()) {
            Ok(addr) => {
                self.addr = Some(addr);
                match self.options.connect_options().strategy() {
                    ConnectStrategy::Blocking => State::ConnectBlocking,
                    ConnectStrategy::Polling => State::ConnectPolling,
                }
            }
            Err(error) => {
                warn!(%error, "hostname resolution failed");
                State::Closing
            }
        }
    }

    fn on_connect(&mut self, strategy: ConnectStrategy) -> State {
        let Some(addr) = self.addr else {
            return State::Closing;
        };

        let options = self.options.connect_options().with_strategy(strategy);
        match connect(addr, &options, self.cancel) {
            Ok(stream) => {
                self.reader = Some(LineReader::new(stream, self.options.read_strategy()));
                State::SendLogin
            }
            Err(error) => {
                warn!(%error, "connection failed");
                State::Closing
            }
        }
    }

    fn on_send_login(&mut self) -> State {
        let username = self.spec.username().map(str::to_owned);
        let authenticated = username.is_some() && self.spec.password().is_some();
        let command = if authenticated {
            Command::User(username.as_deref())
        } else {
            Command::User(None)
        };
        if !self.send(command) {
            return State::Closing;
        }

        // The greeting itself is discarded, but a first line outside the
        // success class means the peer does not speak this protocol.
        let Some(greeting) = self.read_line() else {
            return State::Closing;
        };
        match Reply::parse(&greeting) {
            Some(reply) if reply.is_success() => {
                trace!(line = %greeting, "greeting discarded");
            }
            _ => {
                warn!(host = %self.spec.hostname(), line = %greeting, "not an ETP server");
                return State::Closing;
            }
        }

        if authenticated {
            State::SendPassword
        } else {
            State::AwaitLogin
        }
    }

    fn on_send_password(&mut self) -> State {
        let Some(line) = self.read_line() else {
            return State::Closing;
        };

        // Some servers accept the login straight away and ignore passwords.
        if Reply::parse(&line).is_some_and(|reply| reply.code() == LOGIN_ACCEPTED) {
            debug!("server accepted login without a password");
            return State::SendQuery;
        }

        let password = self.spec.password().unwrap_or_default().to_owned();
        if self.send(Command::Pass(&password)) {
            State::AwaitLogin
        } else {
            State::Closing
        }
    }

    fn on_await_login(&mut self) -> State {
        let Some(line) = self.read_line() else {
            return State::Closing;
        };
        match Reply::parse(&line) {
            Some(reply) if reply.code() == LOGIN_ACCEPTED => State::SendQuery,
            _ => {
                warn!(host = %self.spec.hostname(), line = %line, "login failed");
                State::Closing
            }
        }
    }

    fn on_send_query(&mut self) -> State {
        let expression = match self.options.pattern_mode() {
            PatternMode::Shell => shell_pattern_to_regex(self.search),
            PatternMode::Raw => self.search.to_owned(),
        };

        let commands = [
            Command::EnableRegex,
            Command::Search(&expression),
            Command::CaseSensitive(self.options.case_sensitive()),
            Command::EnablePathColumn,
            Command::EnableSizeColumn,
            Command::EnableDateModifiedColumn,
            Command::RunQuery,
        ];
        for command in commands {
            if !self.send(command) {
                return State::Closing;
            }
        }
        State::AwaitBanner
    }

    fn on_await_banner(&mut self) -> State {
        let Some(line) = self.read_line() else {
            return State::Closing;
        };
        match Reply::parse(&line) {
            Some(reply) if reply.code() == QUERY_RESPONSE && reply.is_multiline_start() => {
                State::ReadResultCount
            }
            Some(reply) if reply.is_success() => {
                trace!(line = %line, "ignoring interim reply");
                State::AwaitBanner
            }
            _ => {
                warn!(host = %self.spec.hostname(), line = %line, "not an ETP server");
                State::Closing
            }
        }
    }

    fn on_read_result_count(&mut self) -> State {
        let Some(line) = self.read_line() else {
            return State::Closing;
        };
        match ResultLine::parse(&line) {
            ResultLine::ResultCount(count) => {
                self.expected = count;
                debug!(count, "server announced matches");
                State::ReadResultRow
            }
            // No RESULT_COUNT at all is the zero-match shape; not a failure.
            ResultLine::End => {
                debug!("result stream ended before a count; no matches");
                State::Closing
            }
            _ => {
                warn!(line = %line, "unexpected line while awaiting the result count");
                State::Closing
            }
        }
    }

    fn on_read_result_row(&mut self) -> State {
        let Some(line) = self.read_line() else {
            warn!("connection lost mid-stream");
            return State::Closing;
        };
        match ResultLine::parse(&line) {
            ResultLine::Path(directory) => {
                self.current_path = directory.to_owned();
            }
            ResultLine::Size(size) => self.current_size = Some(size),
            ResultLine::DateModified(ticks) => self.current_ticks = Some(ticks),
            ResultLine::File(name) => self.emit_entry(name, false),
            ResultLine::Folder(name) => self.emit_entry(name, true),
            ResultLine::End => return State::Closing,
            ResultLine::ResultCount(_) | ResultLine::Other(_) => {
                warn!(line = %line, "unexpected result line");
            }
        }
        State::ReadResultRow
    }

    fn on_closing(&mut self) -> State {
        if let Some(reader) = self.reader.take() {
            self.bytes_received = reader.total_bytes_received();
            // Dropping the reader closes the connection.
        }

        if self.accumulator.received() < self.expected {
            warn!(
                expected = self.expected,
                received = self.accumulator.received(),
                bytes = self.bytes_received,
                "server announced more matches than it delivered"
            );
        }
        State::Exit
    }

    /// Builds one match record from the accumulated line context. Size and
    /// timestamp are consumed whether or not the record is accepted.
    fn emit_entry(&mut self, name: &str, is_directory: bool) {
        let record = MatchRecord::new(
            join_remote_path(&self.current_path, name),
            self.current_size.take(),
            self.current_ticks.take().and_then(decode_native_timestamp),
            is_directory,
        );
        self.accumulator.offer(record, &mut *self.sink);
    }

    fn send(&mut self, command: Command<'_>) -> bool {
        let Some(reader) = self.reader.as_mut() else {
            return false;
        };
        match command.write_to(reader.get_mut()) {
            Ok(()) => true,
            Err(error) => {
                warn!(%error, "command send failed");
                false
            }
        }
    }

    fn read_line(&mut self) -> Option<String> {
        let reader = self.reader.as_mut()?;
        match reader.read_line() {
            Ok(Some(line)) => Some(line),
            Ok(None) => {
                warn!("connection closed by server");
                None
            }
            Err(error) => {
                warn!(%error, "receive failed");
                None
            }
        }
    }

    fn finish(self, cancelled: bool) -> QueryStats {
        let bytes_received = self
            .reader
            .as_ref()
            .map_or(self.bytes_received, LineReader::total_bytes_received);
        QueryStats {
            expected: self.expected,
            received: self.accumulator.received(),
            accepted: self.accumulator.accepted(),
            ignored: self.accumulator.ignored(),
            duplicates: self.accumulator.duplicates(),
            bytes_received,
            cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{CredentialLookup, Credentials};
    use std::time::{Duration, SystemTime};

    struct Hit;

    impl CredentialLookup for Hit {
        fn describe(&self) -> String {
            "hit".to_owned()
        }

        fn lookup(&self, _hostname: &str) -> Option<Credentials> {
            Some(Credentials {
                username: Some("alice".to_owned()),
                password: Some("secret".to_owned()),
                port: None,
            })
        }
    }

    struct Miss;

    impl CredentialLookup for Miss {
        fn describe(&self) -> String {
            "miss".to_owned()
        }

        fn lookup(&self, _hostname: &str) -> Option<Credentials> {
            None
        }
    }

    fn context_for<'a>(
        host: &str,
        stores: CredentialStores<'a>,
        options: &'a QueryOptions,
        cancel: &'a CancelToken,
        sink: &'a mut Vec<MatchRecord>,
    ) -> QueryContext<'a> {
        QueryContext::new(host, "*", options, stores, sink, cancel)
    }

    #[test]
    fn inline_credentials_route_straight_to_resolve() {
        let options = QueryOptions::new();
        let cancel = CancelToken::new();
        let mut sink = Vec::new();
        let mut context = context_for(
            "alice:secret@host",
            CredentialStores::default(),
            &options,
            &cancel,
            &mut sink,
        );

        assert_eq!(context.step(State::ParseSpec), State::Resolve);
        assert!(!context.authinfo_enabled);
        assert!(!context.netrc_enabled);
    }

    #[test]
    fn bare_host_routes_to_authinfo_first() {
        let options = QueryOptions::new();
        let cancel = CancelToken::new();
        let mut sink = Vec::new();
        let mut context = context_for(
            "host",
            CredentialStores::default(),
            &options,
            &cancel,
            &mut sink,
        );

        assert_eq!(context.step(State::ParseSpec), State::AuthinfoLookup);
    }

    #[test]
    fn authinfo_hit_short_circuits_netrc() {
        let hit = Hit;
        let options = QueryOptions::new();
        let cancel = CancelToken::new();
        let mut sink = Vec::new();
        let stores = CredentialStores {
            authinfo: Some(&hit),
            netrc: None,
        };
        let mut context = context_for("host", stores, &options, &cancel, &mut sink);

        assert_eq!(context.step(State::AuthinfoLookup), State::Resolve);
        assert_eq!(context.spec.username(), Some("alice"));
        assert!(context.netrc_enabled);
    }

    #[test]
    fn authinfo_miss_falls_back_to_netrc_once() {
        let miss = Miss;
        let hit = Hit;
        let options = QueryOptions::new();
        let cancel = CancelToken::new();
        let mut sink = Vec::new();
        let stores = CredentialStores {
            authinfo: Some(&miss),
            netrc: Some(&hit),
        };
        let mut context = context_for("host", stores, &options, &cancel, &mut sink);

        assert_eq!(context.step(State::AuthinfoLookup), State::NetrcLookup);
        assert!(!context.authinfo_enabled);
        // With authinfo already consulted, a netrc miss would go straight to
        // resolution; here it hits.
        assert_eq!(context.step(State::NetrcLookup), State::Resolve);
        assert_eq!(context.spec.password(), Some("secret"));
    }

    #[test]
    fn both_misses_proceed_anonymously() {
        let miss_a = Miss;
        let miss_b = Miss;
        let options = QueryOptions::new();
        let cancel = CancelToken::new();
        let mut sink = Vec::new();
        let stores = CredentialStores {
            authinfo: Some(&miss_a),
            netrc: Some(&miss_b),
        };
        let mut context = context_for("host", stores, &options, &cancel, &mut sink);

        assert_eq!(context.step(State::AuthinfoLookup), State::NetrcLookup);
        assert_eq!(context.step(State::NetrcLookup), State::Resolve);
        assert_eq!(context.spec.username(), None);
        assert_eq!(context.spec.password(), None);
    }

    #[test]
    fn emitted_entries_consume_the_line_context() {
        let options = QueryOptions::new();
        let cancel = CancelToken::new();
        let mut sink = Vec::new();
        let mut context = context_for(
            "host",
            CredentialStores::default(),
            &options,
            &cancel,
            &mut sink,
        );

        context.current_path = "C:\\Windows".to_owned();
        context.current_size = Some(236_032);
        context.current_ticks = Some(131_343_347_638_616_569);
        context.emit_entry("notepad.exe", false);
        // The second entry has no metadata of its own.
        context.emit_entry("regedit.exe", false);

        assert_eq!(sink.len(), 2);
        assert_eq!(sink[0].path(), "C:\\Windows\\notepad.exe");
        assert_eq!(sink[0].size(), Some(236_032));
        let expected_mtime = SystemTime::UNIX_EPOCH
            + Duration::new(1_489_861_163, 861_656_900);
        assert_eq!(sink[0].modified(), Some(expected_mtime));
        assert_eq!(sink[1].size(), None);
        assert_eq!(sink[1].modified(), None);
    }

    #[test]
    fn cancelled_run_never_touches_the_network() {
        let options = QueryOptions::new();
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut sink: Vec<MatchRecord> = Vec::new();

        let stats = run_query(
            "host.invalid.",
            "*",
            &options,
            CredentialStores::default(),
            &mut sink,
            &cancel,
        );

        assert!(stats.cancelled());
        assert_eq!(stats.accepted(), 0);
        assert_eq!(stats.bytes_received(), 0);
        assert!(sink.is_empty());
    }

    #[test]
    fn resolution_failure_closes_without_records() {
        let options = QueryOptions::new();
        let cancel = CancelToken::new();
        let mut sink: Vec<MatchRecord> = Vec::new();

        // Reserved TLD; resolution fails and the run winds down cleanly.
        let stats = run_query(
            "host.invalid.",
            "*",
            &options,
            CredentialStores::default(),
            &mut sink,
            &cancel,
        );

        assert!(!stats.cancelled());
        assert_eq!(stats.received(), 0);
        assert!(sink.is_empty());
    }
}
