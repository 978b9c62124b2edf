use std::io;
use std::net::{IpAddr, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, trace};

use crate::cancel::CancelToken;

/// Overall connect timeout applied when the caller does not override it.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(3000);

/// Per-line receive timeout applied to the established stream.
pub const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_millis(2000);

/// Duration of one writability poll during a non-blocking connect.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Connect strategy selected by configuration.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum ConnectStrategy {
    /// Single blocking connect bounded by the overall timeout.
    #[default]
    Blocking,
    /// Non-blocking connect polled for writability in
    /// [`POLL_INTERVAL`]-sized slices, cancellable between polls.
    Polling,
}

/// Options governing connection establishment.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ConnectOptions {
    strategy: ConnectStrategy,
    connect_timeout: Duration,
    recv_timeout: Duration,
}

impl ConnectOptions {
    /// Creates options with the default strategy and timeouts.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            strategy: ConnectStrategy::Blocking,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            recv_timeout: DEFAULT_RECV_TIMEOUT,
        }
    }

    /// Selects the connect strategy.
    #[must_use]
    pub const fn with_strategy(mut self, strategy: ConnectStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the overall connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the receive timeout applied to the established stream.
    #[must_use]
    pub const fn with_recv_timeout(mut self, timeout: Duration) -> Self {
        self.recv_timeout = timeout;
        self
    }

    /// Returns the configured strategy.
    #[must_use]
    pub const fn strategy(&self) -> ConnectStrategy {
        self.strategy
    }

    /// Returns the overall connect timeout.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Returns the receive timeout.
    #[must_use]
    pub const fn recv_timeout(&self) -> Duration {
        self.recv_timeout
    }
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Failure establishing a connection, split along the spec's taxonomy so the
/// engine can log resolution and connection errors distinctly.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The hostname did not resolve to any address. Fatal for the query; no
    /// retry is attempted.
    #[error("failed to resolve '{host}': {source}")]
    Resolve {
        /// Hostname that failed to resolve.
        host: String,
        /// Underlying resolver error.
        source: io::Error,
    },
    /// The polling connect exhausted its retry budget.
    #[error("connection to {addr} timed out after {attempts} polls")]
    TimedOut {
        /// Address being connected to.
        addr: SocketAddr,
        /// Number of polls performed before giving up.
        attempts: u32,
    },
    /// Cancellation was observed during the poll loop. Treated like a
    /// refused connection by the engine.
    #[error("connection to {addr} cancelled")]
    Cancelled {
        /// Address being connected to.
        addr: SocketAddr,
    },
    /// Any other transport-level failure.
    #[error("failed to connect to {addr}: {source}")]
    Io {
        /// Address being connected to.
        addr: SocketAddr,
        /// Underlying socket error.
        source: io::Error,
    },
}

impl ConnectError {
    fn io(addr: SocketAddr, source: io::Error) -> Self {
        Self::Io { addr, source }
    }
}

/// Resolves a hostname and port to a socket address.
///
/// Numeric literals short-circuit the resolver; everything else goes through
/// a name lookup and the first candidate address is used.
pub fn resolve_host(host: &str, port: u16) -> Result<SocketAddr, ConnectError> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, port));
    }

    let resolve = |host: &str| -> io::Result<Option<SocketAddr>> {
        Ok((host, port).to_socket_addrs()?.next())
    };

    match resolve(host) {
        Ok(Some(addr)) => {
            debug!(host, %addr, "resolved remote host");
            Ok(addr)
        }
        Ok(None) => Err(ConnectError::Resolve {
            host: host.to_owned(),
            source: io::Error::new(io::ErrorKind::NotFound, "no addresses returned"),
        }),
        Err(source) => Err(ConnectError::Resolve {
            host: host.to_owned(),
            source,
        }),
    }
}

/// Number of poll iterations a non-blocking connect may perform.
///
/// Equals the overall timeout divided by the poll interval, rounded up, so a
/// 3000 ms timeout with 500 ms polls yields exactly six attempts.
#[must_use]
pub fn max_poll_attempts(timeout: Duration, interval: Duration) -> u32 {
    let timeout = timeout.as_millis();
    let interval = interval.as_millis().max(1);
    u32::try_from(timeout.div_ceil(interval)).unwrap_or(u32::MAX)
}

/// Establishes a TCP connection using the configured strategy.
///
/// On success the stream is in blocking mode with the receive timeout
/// applied; the caller owns it exclusively and is responsible for closing it
/// exactly once (by dropping it).
pub fn connect(
    addr: SocketAddr,
    options: &ConnectOptions,
    cancel: &CancelToken,
) -> Result<TcpStream, ConnectError> {
    let stream = match options.strategy() {
        ConnectStrategy::Blocking => connect_blocking(addr, options)?,
        ConnectStrategy::Polling => connect_polling(addr, options, cancel)?,
    };

    stream
        .set_read_timeout(Some(options.recv_timeout()))
        .map_err(|error| ConnectError::io(addr, error))?;
    debug!(%addr, strategy = ?options.strategy(), "connection established");
    Ok(stream)
}

fn connect_blocking(addr: SocketAddr, options: &ConnectOptions) -> Result<TcpStream, ConnectError> {
    TcpStream::connect_timeout(&addr, options.connect_timeout())
        .map_err(|error| ConnectError::io(addr, error))
}

#[cfg(unix)]
fn connect_polling(
    addr: SocketAddr,
    options: &ConnectOptions,
    cancel: &CancelToken,
) -> Result<TcpStream, ConnectError> {
    use socket2::{Domain, Protocol, Socket, Type};

    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
        .map_err(|error| ConnectError::io(addr, error))?;
    socket
        .set_nonblocking(true)
        .map_err(|error| ConnectError::io(addr, error))?;

    match socket.connect(&addr.into()) {
        Ok(()) => {}
        Err(error)
            if error.raw_os_error() == Some(libc::EINPROGRESS)
                || error.kind() == io::ErrorKind::WouldBlock => {}
        Err(error) => return Err(ConnectError::io(addr, error)),
    }

    let attempts = max_poll_attempts(options.connect_timeout(), POLL_INTERVAL);
    for attempt in 0..attempts {
        if cancel.is_cancelled() {
            return Err(ConnectError::Cancelled { addr });
        }

        trace!(%addr, attempt, "polling for connect completion");
        match poll_writable(&socket, POLL_INTERVAL).map_err(|error| ConnectError::io(addr, error))?
        {
            PollOutcome::Writable => {
                // A socket can report writable after a failed connect; the
                // pending-error option disambiguates.
                if let Some(error) = socket
                    .take_error()
                    .map_err(|error| ConnectError::io(addr, error))?
                {
                    return Err(ConnectError::io(addr, error));
                }

                socket
                    .set_nonblocking(false)
                    .map_err(|error| ConnectError::io(addr, error))?;
                return Ok(socket.into());
            }
            PollOutcome::Failed => {
                let error = socket
                    .take_error()
                    .map_err(|error| ConnectError::io(addr, error))?
                    .unwrap_or_else(|| {
                        io::Error::new(
                            io::ErrorKind::ConnectionRefused,
                            "connect failed without a pending socket error",
                        )
                    });
                return Err(ConnectError::io(addr, error));
            }
            PollOutcome::Pending => {}
        }
    }

    Err(ConnectError::TimedOut { addr, attempts })
}

/// Fallback for platforms without `poll(2)`: repeated bounded blocking
/// connects with the same retry arithmetic and cancellation points as the
/// Unix poll loop.
#[cfg(not(unix))]
fn connect_polling(
    addr: SocketAddr,
    options: &ConnectOptions,
    cancel: &CancelToken,
) -> Result<TcpStream, ConnectError> {
    let attempts = max_poll_attempts(options.connect_timeout(), POLL_INTERVAL);
    for attempt in 0..attempts {
        if cancel.is_cancelled() {
            return Err(ConnectError::Cancelled { addr });
        }

        trace!(%addr, attempt, "bounded connect attempt");
        match TcpStream::connect_timeout(&addr, POLL_INTERVAL) {
            Ok(stream) => return Ok(stream),
            Err(error) if error.kind() == io::ErrorKind::TimedOut => {}
            Err(error) => return Err(ConnectError::io(addr, error)),
        }
    }

    Err(ConnectError::TimedOut { addr, attempts })
}

#[cfg(unix)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum PollOutcome {
    Writable,
    Failed,
    Pending,
}

#[cfg(unix)]
fn poll_writable(socket: &socket2::Socket, timeout: Duration) -> io::Result<PollOutcome> {
    use std::os::fd::AsRawFd;

    let mut pollfd = libc::pollfd {
        fd: socket.as_raw_fd(),
        events: libc::POLLOUT,
        revents: 0,
    };
    let millis = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);

    // SAFETY: pollfd points at one valid descriptor for the call's duration.
    let rc = unsafe { libc::poll(&mut pollfd, 1, millis) };
    if rc < 0 {
        let error = io::Error::last_os_error();
        if error.kind() == io::ErrorKind::Interrupted {
            return Ok(PollOutcome::Pending);
        }
        return Err(error);
    }

    if rc == 0 {
        return Ok(PollOutcome::Pending);
    }

    if pollfd.revents & (libc::POLLERR | libc::POLLHUP) != 0 {
        return Ok(PollOutcome::Failed);
    }

    if pollfd.revents & libc::POLLOUT != 0 {
        return Ok(PollOutcome::Writable);
    }

    Ok(PollOutcome::Pending)
}
