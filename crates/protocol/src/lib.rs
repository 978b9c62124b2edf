//! Wire grammar for the ETP file-index search protocol.
//!
//! ETP is a plaintext, line-oriented protocol modelled on FTP control-channel
//! conventions: the client issues CRLF-terminated commands and the server
//! answers with three-digit reply codes. After a successful login the client
//! configures and executes a search; the server streams the matches back as a
//! multi-line `200-` response built from `RESULT_COUNT`, `PATH`, `SIZE`,
//! `DATE_MODIFIED`, `FILE`, and `FOLDER` lines, terminated by a plain `200`
//! reply.
//!
//! This crate contains only the grammar: reply classification, result-line
//! parsing, command rendering, the server's native timestamp conversion, and
//! the shell-pattern-to-regex translation used for pattern queries. It
//! performs no I/O; the `transport` and `engine` crates drive the dialogue.

mod command;
mod pattern;
mod reply;
mod result_line;
mod timestamp;

pub use command::Command;
pub use pattern::shell_pattern_to_regex;
pub use reply::{
    GREETING, LOGIN_ACCEPTED, LOGIN_REJECTED, PASSWORD_REQUIRED, QUERY_RESPONSE, Reply,
};
pub use result_line::ResultLine;
pub use timestamp::decode_native_timestamp;
