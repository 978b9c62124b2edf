use tracing::{debug, warn};

use crate::host_spec::HostSpec;

/// Credentials produced by a lookup store.
///
/// Absent fields leave the corresponding [`HostSpec`] value untouched when
/// the record is applied.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Credentials {
    /// Login name, if the store knows one.
    pub username: Option<String>,
    /// Password, if the store knows one.
    pub password: Option<String>,
    /// Server port, if the store knows one. Only fills a previously
    /// unspecified port.
    pub port: Option<u16>,
}

/// Hostname-keyed credential store.
///
/// Implementations are expected to be idempotent and side-effect free; the
/// engine consults each store at most once per query.
pub trait CredentialLookup {
    /// Human-readable identity of the store (file path or label), used in
    /// lookup-miss warnings.
    fn describe(&self) -> String;

    /// Looks up credentials for `hostname`, returning `None` on a miss.
    fn lookup(&self, hostname: &str) -> Option<Credentials>;
}

/// The two external stores consulted by the discovery chain.
#[derive(Clone, Copy, Default)]
pub struct CredentialStores<'a> {
    /// The authinfo-style store, tried first.
    pub authinfo: Option<&'a dyn CredentialLookup>,
    /// The netrc-style store, tried when authinfo misses.
    pub netrc: Option<&'a dyn CredentialLookup>,
}

impl std::fmt::Debug for CredentialStores<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStores")
            .field("authinfo", &self.authinfo.map(CredentialLookup::describe))
            .field("netrc", &self.netrc.map(CredentialLookup::describe))
            .finish()
    }
}

/// Which store a lookup state consults.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum StoreKind {
    Authinfo,
    Netrc,
}

impl StoreKind {
    pub(crate) const fn label(self) -> &'static str {
        match self {
            Self::Authinfo => "authinfo",
            Self::Netrc => "netrc",
        }
    }
}

/// Consults one store and applies any hit to the host specification.
///
/// Returns `true` on a hit. A miss (or an absent store) produces a warning
/// naming the store and host, after which the caller falls back to the next
/// source or proceeds with whatever credentials are already known.
pub(crate) fn consult_store(
    store: Option<&dyn CredentialLookup>,
    kind: StoreKind,
    spec: &mut HostSpec,
) -> bool {
    let hostname = spec.hostname().to_owned();

    let Some(store) = store else {
        warn!(
            store = kind.label(),
            host = %hostname,
            "credential store not available"
        );
        return false;
    };

    match store.lookup(&hostname) {
        Some(found) => {
            debug!(
                store = kind.label(),
                source = %store.describe(),
                host = %hostname,
                "credentials discovered"
            );
            spec.fill_username(found.username);
            spec.fill_password(found.password);
            spec.fill_port(found.port);
            true
        }
        None => {
            warn!(
                store = kind.label(),
                source = %store.describe(),
                host = %hostname,
                "no credentials found for host"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct CountingStore {
        calls: Cell<u32>,
        result: Option<Credentials>,
    }

    impl CountingStore {
        fn hit(credentials: Credentials) -> Self {
            Self {
                calls: Cell::new(0),
                result: Some(credentials),
            }
        }

        fn miss() -> Self {
            Self {
                calls: Cell::new(0),
                result: None,
            }
        }
    }

    impl CredentialLookup for CountingStore {
        fn describe(&self) -> String {
            "test store".to_owned()
        }

        fn lookup(&self, _hostname: &str) -> Option<Credentials> {
            self.calls.set(self.calls.get() + 1);
            self.result.clone()
        }
    }

    #[test]
    fn hit_applies_all_fields() {
        let store = CountingStore::hit(Credentials {
            username: Some("alice".to_owned()),
            password: Some("secret".to_owned()),
            port: Some(2121),
        });
        let mut spec = HostSpec::parse("host");

        assert!(consult_store(Some(&store), StoreKind::Authinfo, &mut spec));
        assert_eq!(spec.username(), Some("alice"));
        assert_eq!(spec.password(), Some("secret"));
        assert_eq!(spec.port(), 2121);
        assert_eq!(store.calls.get(), 1);
    }

    #[test]
    fn miss_leaves_spec_untouched() {
        let store = CountingStore::miss();
        let mut spec = HostSpec::parse("host");

        assert!(!consult_store(Some(&store), StoreKind::Netrc, &mut spec));
        assert_eq!(spec.username(), None);
        assert_eq!(spec.password(), None);
    }

    #[test]
    fn absent_store_counts_as_miss() {
        let mut spec = HostSpec::parse("host");
        assert!(!consult_store(None, StoreKind::Authinfo, &mut spec));
    }

    #[test]
    fn partial_record_fills_only_missing_fields() {
        let store = CountingStore::hit(Credentials {
            username: Some("bob".to_owned()),
            password: None,
            port: None,
        });
        let mut spec = HostSpec::parse("host:21");

        assert!(consult_store(Some(&store), StoreKind::Netrc, &mut spec));
        assert_eq!(spec.username(), Some("bob"));
        assert_eq!(spec.password(), None);
        assert_eq!(spec.port(), 21);
    }
}
