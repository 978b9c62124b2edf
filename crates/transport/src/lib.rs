//! Byte-stream plumbing for the ETP query engine.
//!
//! The crate provides the two pieces of the client that touch the network
//! directly: connection establishment (hostname resolution plus a blocking or
//! polling non-blocking TCP connect, both bounded by explicit timeouts) and
//! the [`LineReader`] that turns the connected stream into discrete
//! CRLF-terminated lines. A cloneable [`CancelToken`] lets the surrounding
//! tool abandon a connect attempt between poll iterations.
//!
//! Nothing here understands the protocol; reply parsing and the dialogue
//! state machine live in the `protocol` and `engine` crates.

mod cancel;
mod connect;
mod line_reader;

pub use cancel::CancelToken;
pub use connect::{
    ConnectError, ConnectOptions, ConnectStrategy, DEFAULT_CONNECT_TIMEOUT, DEFAULT_RECV_TIMEOUT,
    POLL_INTERVAL, connect, max_poll_attempts, resolve_host,
};
pub use line_reader::{DEFAULT_CAPACITY, LineReader, ReadStrategy};
