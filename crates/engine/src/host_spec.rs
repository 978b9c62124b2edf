/// Default TCP port of an ETP server when none is specified or discovered.
pub const DEFAULT_PORT: u16 = 21;

/// Parsed remote host specification.
///
/// A raw token is matched against three shapes, in order: `host[:port]`,
/// `user:password@host[:port]`, and `user@host[:port]`. Field characters
/// exclude `:` and `@` except in the final host segment. Inline credentials
/// take precedence absolutely: when either credentialed shape matches, the
/// credential-discovery chain is skipped for this host.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HostSpec {
    hostname: String,
    username: Option<String>,
    password: Option<String>,
    port: Option<u16>,
    inline_credentials: bool,
}

impl HostSpec {
    /// Parses a raw host token.
    ///
    /// Parsing never fails: when no shape matches completely, the partial
    /// match that did succeed is used, so a token such as `host:notaport`
    /// degrades to the bare hostname with credential lookup still enabled.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();

        if let Some(spec) = match_bare_host(raw) {
            return spec;
        }
        if let Some(spec) = match_user_password_host(raw) {
            return spec;
        }
        if let Some(spec) = match_user_host(raw) {
            return spec;
        }

        // Partial-match fallback: salvage what structure is present rather
        // than failing the query before it starts.
        if let Some((userinfo, host_part)) = raw.rsplit_once('@') {
            let (username, password) = match userinfo.split_once(':') {
                Some((user, password)) => (
                    non_empty(user).map(str::to_owned),
                    non_empty(password).map(str::to_owned),
                ),
                None => (non_empty(userinfo).map(str::to_owned), None),
            };
            let (hostname, port) = split_host_port(host_part);
            return Self {
                hostname: hostname.to_owned(),
                inline_credentials: username.is_some() || password.is_some(),
                username,
                password,
                port,
            };
        }

        let (hostname, port) = split_host_port(raw);
        Self {
            hostname: hostname.to_owned(),
            username: None,
            password: None,
            port,
            inline_credentials: false,
        }
    }

    /// Returns the hostname segment.
    #[must_use]
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Returns the inline or discovered username.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Returns the inline or discovered password.
    #[must_use]
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Returns the port, or [`DEFAULT_PORT`] when none was specified or
    /// discovered.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    /// Reports whether the token embedded credentials, which disables the
    /// credential-discovery chain entirely.
    #[must_use]
    pub const fn has_inline_credentials(&self) -> bool {
        self.inline_credentials
    }

    /// Fills the username only when none is known yet.
    pub(crate) fn fill_username(&mut self, username: Option<String>) {
        if self.username.is_none() {
            self.username = username;
        }
    }

    /// Fills the password only when none is known yet.
    pub(crate) fn fill_password(&mut self, password: Option<String>) {
        if self.password.is_none() {
            self.password = password;
        }
    }

    /// A discovered port only overrides a previously unspecified one.
    pub(crate) fn fill_port(&mut self, port: Option<u16>) {
        if self.port.is_none() {
            self.port = port.filter(|&p| p != 0);
        }
    }
}

/// Shape 1: `host[:port]`, valid only without an embedded `@`.
fn match_bare_host(raw: &str) -> Option<HostSpec> {
    if raw.is_empty() || raw.contains('@') {
        return None;
    }

    let (host, port) = match raw.split_once(':') {
        Some((host, port_text)) => (host, Some(port_text.parse::<u16>().ok()?)),
        None => (raw, None),
    };
    let host = valid_field(host)?;

    Some(HostSpec {
        hostname: host.to_owned(),
        username: None,
        password: None,
        port,
        inline_credentials: false,
    })
}

/// Shape 2: `user:password@host[:port]`.
fn match_user_password_host(raw: &str) -> Option<HostSpec> {
    let (userinfo, host_part) = raw.rsplit_once('@')?;
    let (user, password) = userinfo.split_once(':')?;
    let user = valid_field(user)?;
    let password = valid_field(password)?;
    let (host, port) = parse_host_segment(host_part)?;

    Some(HostSpec {
        hostname: host.to_owned(),
        username: Some(user.to_owned()),
        password: Some(password.to_owned()),
        port,
        inline_credentials: true,
    })
}

/// Shape 3: `user@host[:port]`.
fn match_user_host(raw: &str) -> Option<HostSpec> {
    let (user, host_part) = raw.rsplit_once('@')?;
    let user = valid_field(user)?;
    let (host, port) = parse_host_segment(host_part)?;

    Some(HostSpec {
        hostname: host.to_owned(),
        username: Some(user.to_owned()),
        password: None,
        port,
        inline_credentials: true,
    })
}

fn parse_host_segment(segment: &str) -> Option<(&str, Option<u16>)> {
    let (host, port) = match segment.split_once(':') {
        Some((host, port_text)) => (host, Some(port_text.parse::<u16>().ok()?)),
        None => (segment, None),
    };
    Some((valid_field(host)?, port))
}

/// A structural field: non-empty and free of the shape separators.
fn valid_field(text: &str) -> Option<&str> {
    if text.is_empty() || text.contains([':', '@']) {
        return None;
    }
    Some(text)
}

fn non_empty(text: &str) -> Option<&str> {
    if text.is_empty() { None } else { Some(text) }
}

fn split_host_port(text: &str) -> (&str, Option<u16>) {
    match text.split_once(':') {
        Some((host, port_text)) => match port_text.parse::<u16>() {
            Ok(port) => (host, Some(port)),
            Err(_) => (host, None),
        },
        None => (text, None),
    }
}
