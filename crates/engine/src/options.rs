use transport::{ConnectOptions, ReadStrategy};

/// How the caller's search expression is interpreted.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum PatternMode {
    /// The expression is already a regular expression, sent verbatim.
    Raw,
    /// Shell-style wildcard pattern, translated to an anchored regular
    /// expression before it is sent.
    #[default]
    Shell,
}

/// Per-query configuration.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct QueryOptions {
    case_sensitive: bool,
    pattern_mode: PatternMode,
    folders_only: bool,
    read_strategy: ReadStrategy,
    connect: ConnectOptions,
}

impl QueryOptions {
    /// Creates options with the default behavior: case-insensitive
    /// shell-pattern matching, files and folders, buffered reads, blocking
    /// connect with the default timeouts.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            case_sensitive: false,
            pattern_mode: PatternMode::Shell,
            folders_only: false,
            read_strategy: ReadStrategy::Buffered,
            connect: ConnectOptions::new(),
        }
    }

    /// Sets case-sensitive matching.
    #[must_use]
    pub const fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Selects how the search expression is interpreted.
    #[must_use]
    pub const fn with_pattern_mode(mut self, mode: PatternMode) -> Self {
        self.pattern_mode = mode;
        self
    }

    /// Restricts results to folder entries.
    #[must_use]
    pub const fn with_folders_only(mut self, folders_only: bool) -> Self {
        self.folders_only = folders_only;
        self
    }

    /// Selects the line-reading strategy.
    #[must_use]
    pub const fn with_read_strategy(mut self, strategy: ReadStrategy) -> Self {
        self.read_strategy = strategy;
        self
    }

    /// Replaces the connection options.
    #[must_use]
    pub const fn with_connect_options(mut self, connect: ConnectOptions) -> Self {
        self.connect = connect;
        self
    }

    /// Returns whether matching is case-sensitive.
    #[must_use]
    pub const fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Returns the pattern interpretation mode.
    #[must_use]
    pub const fn pattern_mode(&self) -> PatternMode {
        self.pattern_mode
    }

    /// Returns whether only folder entries are wanted.
    #[must_use]
    pub const fn folders_only(&self) -> bool {
        self.folders_only
    }

    /// Returns the line-reading strategy.
    #[must_use]
    pub const fn read_strategy(&self) -> ReadStrategy {
        self.read_strategy
    }

    /// Returns the connection options.
    #[must_use]
    pub const fn connect_options(&self) -> ConnectOptions {
        self.connect
    }
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self::new()
    }
}
