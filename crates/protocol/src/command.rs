use std::fmt;
use std::io::{self, Write};

/// One client command of the ETP dialogue.
///
/// [`fmt::Display`] renders the command without a line terminator;
/// [`Command::write_to`] appends the CRLF the wire requires and flushes so
/// each command is observed by the server as a discrete line.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Command<'a> {
    /// `USER [name]` - begin login; `None` requests an anonymous session.
    User(Option<&'a str>),
    /// `PASS <password>` - answer a password challenge.
    Pass(&'a str),
    /// `EVERYTHING REGEX 1` - switch the search expression to regex mode.
    EnableRegex,
    /// `EVERYTHING SEARCH <expr>` - set the search expression.
    Search(&'a str),
    /// `EVERYTHING CASE <0|1>` - set case sensitivity.
    CaseSensitive(bool),
    /// `EVERYTHING PATH_COLUMN 1` - include the path column in results.
    EnablePathColumn,
    /// `EVERYTHING SIZE_COLUMN 1` - include the size column in results.
    EnableSizeColumn,
    /// `EVERYTHING DATE_MODIFIED_COLUMN 1` - include the modification-time
    /// column in results.
    EnableDateModifiedColumn,
    /// `EVERYTHING QUERY` - execute the configured query.
    RunQuery,
}

impl Command<'_> {
    /// Writes the command followed by CRLF and flushes the writer.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        write!(writer, "{self}\r\n")?;
        writer.flush()
    }
}

impl fmt::Display for Command<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(None) => f.write_str("USER"),
            Self::User(Some(name)) => write!(f, "USER {name}"),
            Self::Pass(password) => write!(f, "PASS {password}"),
            Self::EnableRegex => f.write_str("EVERYTHING REGEX 1"),
            Self::Search(expr) => write!(f, "EVERYTHING SEARCH {expr}"),
            Self::CaseSensitive(sensitive) => {
                write!(f, "EVERYTHING CASE {}", u8::from(*sensitive))
            }
            Self::EnablePathColumn => f.write_str("EVERYTHING PATH_COLUMN 1"),
            Self::EnableSizeColumn => f.write_str("EVERYTHING SIZE_COLUMN 1"),
            Self::EnableDateModifiedColumn => f.write_str("EVERYTHING DATE_MODIFIED_COLUMN 1"),
            Self::RunQuery => f.write_str("EVERYTHING QUERY"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_anonymous_and_named_user() {
        assert_eq!(Command::User(None).to_string(), "USER");
        assert_eq!(Command::User(Some("alice")).to_string(), "USER alice");
    }

    #[test]
    fn renders_query_configuration() {
        assert_eq!(Command::EnableRegex.to_string(), "EVERYTHING REGEX 1");
        assert_eq!(
            Command::Search("^notepad\\.exe$").to_string(),
            "EVERYTHING SEARCH ^notepad\\.exe$"
        );
        assert_eq!(
            Command::CaseSensitive(true).to_string(),
            "EVERYTHING CASE 1"
        );
        assert_eq!(
            Command::CaseSensitive(false).to_string(),
            "EVERYTHING CASE 0"
        );
        assert_eq!(Command::RunQuery.to_string(), "EVERYTHING QUERY");
    }

    #[test]
    fn renders_column_directives() {
        assert_eq!(
            Command::EnablePathColumn.to_string(),
            "EVERYTHING PATH_COLUMN 1"
        );
        assert_eq!(
            Command::EnableSizeColumn.to_string(),
            "EVERYTHING SIZE_COLUMN 1"
        );
        assert_eq!(
            Command::EnableDateModifiedColumn.to_string(),
            "EVERYTHING DATE_MODIFIED_COLUMN 1"
        );
    }

    #[test]
    fn write_to_appends_crlf() {
        let mut out = Vec::new();
        Command::Pass("secret")
            .write_to(&mut out)
            .expect("write to vec");
        assert_eq!(out, b"PASS secret\r\n");
    }
}
