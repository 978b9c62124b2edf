//! File-backed credential stores in the netrc token grammar.
//!
//! Both `~/.netrc` and `~/.authinfo` share the same whitespace-separated
//! token format: `machine <host> login <user> password <pw>`, with `default`
//! accepted in place of a `machine` pair. The authinfo dialect additionally
//! carries a `port <n>` token. Lookups re-read the file on every call; the
//! engine consults each store at most once per query, so there is nothing to
//! cache.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::credentials::{CredentialLookup, Credentials};

/// Authinfo-style store (`machine ... login ... password ... port ...`).
#[derive(Clone, Debug)]
pub struct AuthinfoStore {
    path: PathBuf,
}

impl AuthinfoStore {
    /// Creates a store backed by the given file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the conventional store location (`~/.authinfo`), if a home
    /// directory is known.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        home_dir().map(|home| home.join(".authinfo"))
    }
}

impl CredentialLookup for AuthinfoStore {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn lookup(&self, hostname: &str) -> Option<Credentials> {
        lookup_in_file(&self.path, hostname, PortToken::Recognized)
    }
}

/// Netrc-style store (`machine ... login ... password ...`).
#[derive(Clone, Debug)]
pub struct NetrcStore {
    path: PathBuf,
}

impl NetrcStore {
    /// Creates a store backed by the given file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the conventional store location (`~/.netrc`), if a home
    /// directory is known.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        home_dir().map(|home| home.join(".netrc"))
    }
}

impl CredentialLookup for NetrcStore {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn lookup(&self, hostname: &str) -> Option<Credentials> {
        lookup_in_file(&self.path, hostname, PortToken::Ignored)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum PortToken {
    Recognized,
    Ignored,
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}

fn lookup_in_file(path: &Path, hostname: &str, port_token: PortToken) -> Option<Credentials> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(error) => {
            debug!(path = %path.display(), %error, "credential file unreadable");
            return None;
        }
    };

    parse_entries(&text, hostname, port_token)
}

/// Scans the token stream for the entry matching `hostname`.
///
/// The first matching `machine` entry wins; a `default` entry matches any
/// host but only when no explicit entry matched earlier in the file, which
/// is why scanning continues past it. `macdef` bodies (netrc macro
/// definitions, terminated by a blank line) are skipped wholesale.
fn parse_entries(text: &str, hostname: &str, port_token: PortToken) -> Option<Credentials> {
    #[derive(Clone, Copy, PartialEq)]
    enum EntryKind {
        Matched,
        Default,
        Other,
    }

    let mut explicit: Option<Credentials> = None;
    let mut fallback: Option<Credentials> = None;
    let mut current: Option<(EntryKind, Credentials)> = None;

    let finish = |entry: Option<(EntryKind, Credentials)>,
                  explicit: &mut Option<Credentials>,
                  fallback: &mut Option<Credentials>| {
        match entry {
            Some((EntryKind::Matched, credentials)) if explicit.is_none() => {
                *explicit = Some(credentials);
            }
            Some((EntryKind::Default, credentials)) if fallback.is_none() => {
                *fallback = Some(credentials);
            }
            _ => {}
        }
    };

    // A keyword missing its value means the file is truncated mid-entry;
    // the incomplete entry is dropped but entries completed before it
    // still apply.
    let mut tokens = tokens_without_macdefs(text).into_iter();
    while let Some(token) = tokens.next() {
        match token.as_str() {
            "machine" => {
                finish(current.take(), &mut explicit, &mut fallback);
                let Some(name) = tokens.next() else { break };
                let kind = if name.eq_ignore_ascii_case(hostname) {
                    EntryKind::Matched
                } else {
                    EntryKind::Other
                };
                current = Some((kind, Credentials::default()));
            }
            "default" => {
                finish(current.take(), &mut explicit, &mut fallback);
                current = Some((EntryKind::Default, Credentials::default()));
            }
            "login" | "user" => {
                let Some(value) = tokens.next() else {
                    current = None;
                    break;
                };
                if let Some((_, credentials)) = current.as_mut() {
                    credentials.username = Some(value);
                }
            }
            "password" => {
                let Some(value) = tokens.next() else {
                    current = None;
                    break;
                };
                if let Some((_, credentials)) = current.as_mut() {
                    credentials.password = Some(value);
                }
            }
            "port" => {
                let Some(value) = tokens.next() else {
                    current = None;
                    break;
                };
                if port_token == PortToken::Recognized {
                    if let Some((_, credentials)) = current.as_mut() {
                        credentials.port = value.parse::<u16>().ok();
                    }
                }
            }
            // Tokens such as "account" take a value we do not use.
            "account" => {
                if tokens.next().is_none() {
                    current = None;
                    break;
                }
            }
            _ => {}
        }
    }
    finish(current.take(), &mut explicit, &mut fallback);

    explicit.or(fallback)
}

fn tokens_without_macdefs(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut lines = text.lines();

    while let Some(line) = lines.next() {
        let mut words = line.split_whitespace();
        while let Some(word) = words.next() {
            if word == "macdef" {
                // Macro name plus body up to the next blank line.
                let _ = words.next();
                for body_line in lines.by_ref() {
                    if body_line.trim().is_empty() {
                        break;
                    }
                }
                break;
            }
            tokens.push(word.to_owned());
        }
    }

    tokens
}
