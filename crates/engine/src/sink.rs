use std::time::SystemTime;

/// One reported file or folder entry.
///
/// Built per `FILE`/`FOLDER` line from the directory, size, and timestamp
/// context accumulated since the previous entry. Size and modification time
/// are optional; the server only sends them when the corresponding result
/// columns are enabled and it knows the value.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MatchRecord {
    path: String,
    size: Option<u64>,
    modified: Option<SystemTime>,
    is_directory: bool,
}

impl MatchRecord {
    /// Creates a record from its constituent fields.
    #[must_use]
    pub const fn new(
        path: String,
        size: Option<u64>,
        modified: Option<SystemTime>,
        is_directory: bool,
    ) -> Self {
        Self {
            path,
            size,
            modified,
            is_directory,
        }
    }

    /// Returns the full remote path (directory joined with the entry name).
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the entry size in bytes, when reported.
    #[must_use]
    pub const fn size(&self) -> Option<u64> {
        self.size
    }

    /// Returns the modification time, when reported and representable.
    #[must_use]
    pub const fn modified(&self) -> Option<SystemTime> {
        self.modified
    }

    /// Reports whether the entry is a folder.
    #[must_use]
    pub const fn is_directory(&self) -> bool {
        self.is_directory
    }
}

/// Receiver of accepted match records.
///
/// The engine calls [`MatchSink::push`] once per accepted record,
/// synchronously, in the order the server reported them.
pub trait MatchSink {
    /// Accepts one record.
    fn push(&mut self, record: MatchRecord);
}

impl MatchSink for Vec<MatchRecord> {
    fn push(&mut self, record: MatchRecord) {
        Vec::push(self, record);
    }
}

/// Joins a remote directory and entry name with the directory's own
/// separator convention.
///
/// The index server reports paths in its native notation, so the separator
/// is inferred from the directory: `/` when the directory uses only forward
/// slashes, `\` otherwise (the server's native default).
#[must_use]
pub fn join_remote_path(directory: &str, name: &str) -> String {
    if directory.is_empty() {
        return name.to_owned();
    }
    if directory.ends_with(['\\', '/']) {
        return format!("{directory}{name}");
    }

    let separator = if directory.contains('/') && !directory.contains('\\') {
        '/'
    } else {
        '\\'
    };
    format!("{directory}{separator}{name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_with_backslash_for_windows_directories() {
        assert_eq!(
            join_remote_path("C:\\Windows", "notepad.exe"),
            "C:\\Windows\\notepad.exe"
        );
    }

    #[test]
    fn joins_with_forward_slash_for_posix_directories() {
        assert_eq!(join_remote_path("/srv/data", "report.txt"), "/srv/data/report.txt");
    }

    #[test]
    fn drive_root_already_ends_with_a_separator() {
        assert_eq!(join_remote_path("C:\\", "pagefile.sys"), "C:\\pagefile.sys");
    }

    #[test]
    fn empty_directory_yields_the_bare_name() {
        assert_eq!(join_remote_path("", "orphan.txt"), "orphan.txt");
    }

    #[test]
    fn vec_sink_collects_records_in_order() {
        let mut sink: Vec<MatchRecord> = Vec::new();
        MatchSink::push(
            &mut sink,
            MatchRecord::new("a".to_owned(), None, None, false),
        );
        MatchSink::push(
            &mut sink,
            MatchRecord::new("b".to_owned(), Some(1), None, true),
        );
        assert_eq!(sink.len(), 2);
        assert_eq!(sink[0].path(), "a");
        assert!(sink[1].is_directory());
    }
}
