/// Reply code sent by the server as its initial greeting.
pub const GREETING: u16 = 220;
/// Reply code confirming that the login was accepted.
pub const LOGIN_ACCEPTED: u16 = 230;
/// Reply code requesting a password after `USER`.
pub const PASSWORD_REQUIRED: u16 = 331;
/// Reply code rejecting the supplied credentials.
pub const LOGIN_REJECTED: u16 = 530;
/// Reply code framing the query response. `200-` opens the multi-line result
/// block and a plain `200` reply closes it.
pub const QUERY_RESPONSE: u16 = 200;

/// One parsed server control line.
///
/// An ETP reply starts with three ASCII digits followed by either a space (or
/// end of line) for a final reply, or a hyphen for the opening line of a
/// multi-line response. Everything after the separator is the human-readable
/// payload, kept verbatim so callers can surface the server's diagnostic.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Reply<'a> {
    code: u16,
    continued: bool,
    payload: &'a str,
}

impl<'a> Reply<'a> {
    /// Parses a server line into a [`Reply`].
    ///
    /// Returns `None` when the line does not begin with three ASCII digits.
    /// Trailing carriage returns and line feeds are tolerated so callers can
    /// pass lines before or after terminator stripping.
    #[must_use]
    pub fn parse(line: &'a str) -> Option<Self> {
        let trimmed = line.trim_end_matches(['\r', '\n']);
        let bytes = trimmed.as_bytes();
        if bytes.len() < 3 || !bytes[..3].iter().all(u8::is_ascii_digit) {
            return None;
        }

        let code = trimmed[..3].parse::<u16>().ok()?;
        let (continued, payload) = match bytes.get(3) {
            None => (false, ""),
            Some(b'-') => (true, &trimmed[4..]),
            Some(b' ') => (false, &trimmed[4..]),
            // Digits followed by other text ("200OK") are not a reply.
            Some(_) => return None,
        };

        Some(Self {
            code,
            continued,
            payload,
        })
    }

    /// Returns the three-digit reply code.
    #[must_use]
    pub const fn code(&self) -> u16 {
        self.code
    }

    /// Returns the payload following the code and separator.
    #[must_use]
    pub const fn payload(&self) -> &'a str {
        self.payload
    }

    /// Reports whether this line opens a multi-line response (`NNN-`).
    #[must_use]
    pub const fn is_multiline_start(&self) -> bool {
        self.continued
    }

    /// Reports whether the reply belongs to the success class (`2xx`).
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.code / 100 == 2
    }

    /// Reports whether the reply terminates the streamed query results.
    ///
    /// The end-of-results marker is a final (non-continued) `200` reply such
    /// as `200 End.`.
    #[must_use]
    pub const fn is_end_of_results(&self) -> bool {
        self.code == QUERY_RESPONSE && !self.continued
    }
}
