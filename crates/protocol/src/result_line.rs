use crate::reply::Reply;

/// One line of the streamed query response, classified by keyword.
///
/// The server interleaves per-directory context (`PATH`), per-entry metadata
/// (`SIZE`, `DATE_MODIFIED`), and the entries themselves (`FILE`, `FOLDER`).
/// Unknown content is preserved verbatim in [`ResultLine::Other`] so the
/// caller can log it without aborting the stream; the protocol is only
/// partially trusted and servers are free to add keywords.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ResultLine<'a> {
    /// `RESULT_COUNT <n>` - number of matches the server intends to send.
    ResultCount(u64),
    /// `PATH <dir>` - directory applied to the following entries.
    Path(&'a str),
    /// `SIZE <bytes>` - size of the next `FILE`/`FOLDER` entry.
    Size(u64),
    /// `DATE_MODIFIED <ticks>` - native modification timestamp of the next
    /// entry. Decoded separately via
    /// [`decode_native_timestamp`](crate::decode_native_timestamp).
    DateModified(u64),
    /// `FILE <name>` - one file match relative to the current `PATH`.
    File(&'a str),
    /// `FOLDER <name>` - one folder match relative to the current `PATH`.
    Folder(&'a str),
    /// Final `200` reply closing the result stream.
    End,
    /// Anything else, carried verbatim for diagnostics.
    Other(&'a str),
}

impl<'a> ResultLine<'a> {
    /// Classifies one line of the query response.
    ///
    /// Keywords must be followed by a single space; a keyword with a
    /// malformed numeric argument degrades to [`ResultLine::Other`] rather
    /// than failing, matching the engine's log-and-continue policy for
    /// unexpected server output.
    #[must_use]
    pub fn parse(line: &'a str) -> Self {
        let trimmed = line.trim_end_matches(['\r', '\n']);

        if let Some(reply) = Reply::parse(trimmed) {
            if reply.is_end_of_results() {
                return Self::End;
            }
            return Self::Other(trimmed);
        }

        if let Some(rest) = trimmed.strip_prefix("RESULT_COUNT ") {
            return match rest.trim().parse::<u64>() {
                Ok(count) => Self::ResultCount(count),
                Err(_) => Self::Other(trimmed),
            };
        }

        if let Some(rest) = trimmed.strip_prefix("PATH ") {
            return Self::Path(rest);
        }

        if let Some(rest) = trimmed.strip_prefix("SIZE ") {
            return match rest.trim().parse::<u64>() {
                Ok(size) => Self::Size(size),
                Err(_) => Self::Other(trimmed),
            };
        }

        if let Some(rest) = trimmed.strip_prefix("DATE_MODIFIED ") {
            return match rest.trim().parse::<u64>() {
                Ok(ticks) => Self::DateModified(ticks),
                Err(_) => Self::Other(trimmed),
            };
        }

        if let Some(rest) = trimmed.strip_prefix("FILE ") {
            return Self::File(rest);
        }

        if let Some(rest) = trimmed.strip_prefix("FOLDER ") {
            return Self::Folder(rest);
        }

        Self::Other(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_result_count() {
        assert_eq!(
            ResultLine::parse("RESULT_COUNT 42"),
            ResultLine::ResultCount(42)
        );
    }

    #[test]
    fn classifies_path_and_entries() {
        assert_eq!(
            ResultLine::parse("PATH C:\\Windows"),
            ResultLine::Path("C:\\Windows")
        );
        assert_eq!(
            ResultLine::parse("FILE notepad.exe"),
            ResultLine::File("notepad.exe")
        );
        assert_eq!(
            ResultLine::parse("FOLDER System32"),
            ResultLine::Folder("System32")
        );
    }

    #[test]
    fn classifies_metadata_lines() {
        assert_eq!(ResultLine::parse("SIZE 236032"), ResultLine::Size(236_032));
        assert_eq!(
            ResultLine::parse("DATE_MODIFIED 131343347638616569"),
            ResultLine::DateModified(131_343_347_638_616_569)
        );
    }

    #[test]
    fn end_marker_is_final_200_reply() {
        assert_eq!(ResultLine::parse("200 End."), ResultLine::End);
        assert_eq!(ResultLine::parse("200 End.\r\n"), ResultLine::End);
    }

    #[test]
    fn multiline_opener_is_not_the_end_marker() {
        assert_eq!(
            ResultLine::parse("200-Query results"),
            ResultLine::Other("200-Query results")
        );
    }

    #[test]
    fn preserves_entry_names_verbatim() {
        // Names may contain spaces; only the keyword separator is consumed.
        assert_eq!(
            ResultLine::parse("FILE Program Files"),
            ResultLine::File("Program Files")
        );
    }

    #[test]
    fn malformed_numbers_degrade_to_other() {
        assert_eq!(
            ResultLine::parse("RESULT_COUNT many"),
            ResultLine::Other("RESULT_COUNT many")
        );
        assert_eq!(
            ResultLine::parse("SIZE -3"),
            ResultLine::Other("SIZE -3")
        );
    }

    #[test]
    fn keyword_without_separator_is_other() {
        assert_eq!(ResultLine::parse("FILE"), ResultLine::Other("FILE"));
        assert_eq!(
            ResultLine::parse("PATHLESS x"),
            ResultLine::Other("PATHLESS x")
        );
    }
}
