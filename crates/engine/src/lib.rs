//! Query engine for the ETP file-index search protocol.
//!
//! One call to [`run_query`] drives a complete dialogue against one remote
//! host: the raw host token is parsed ([`HostSpec`]), missing credentials
//! are discovered from authinfo- and netrc-style stores
//! ([`CredentialStores`]), the host is resolved and connected (blocking or
//! polling, via the `transport` crate), and the login/query/result exchange
//! runs to completion. Accepted matches are pushed into the caller's
//! [`MatchSink`] as they arrive; the returned [`QueryStats`] carries the
//! expected/received/accepted/ignored/duplicate tallies and the byte count
//! for diagnostics.
//!
//! Failures never cross the engine boundary: resolution, connection,
//! transport, and protocol errors are logged as warnings and the run winds
//! down, leaving the caller with whatever was accepted before the failure.
//! Queries are strictly sequential; each host gets its own run and the
//! stores are consulted at most once per run.

mod accumulator;
mod credentials;
mod host_spec;
mod machine;
mod options;
mod sink;
mod stores;

pub use accumulator::ResultAccumulator;
pub use credentials::{CredentialLookup, CredentialStores, Credentials};
pub use host_spec::{DEFAULT_PORT, HostSpec};
pub use machine::{QueryStats, run_query};
pub use options::{PatternMode, QueryOptions};
pub use sink::{MatchRecord, MatchSink, join_remote_path};
pub use stores::{AuthinfoStore, NetrcStore};

pub use transport::{CancelToken, ConnectOptions, ConnectStrategy, ReadStrategy};
