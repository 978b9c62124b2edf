/// Translates a shell-style wildcard pattern into an anchored regular
/// expression.
///
/// `*` matches any run of characters, `?` matches a single character, and
/// every other character is matched literally; regex metacharacters in the
/// input are escaped. The result is anchored with `^`/`$` so `*.exe` matches
/// whole names when forwarded to the server's regex mode.
#[must_use]
pub fn shell_pattern_to_regex(pattern: &str) -> String {
    let mut regex = String::with_capacity(pattern.len() + 8);
    regex.push('^');

    for ch in pattern.chars() {
        match ch {
            '*' => regex.push_str(".*"),
            '?' => regex.push('.'),
            '.' | '^' | '$' | '+' | '(' | ')' | '[' | ']' | '{' | '}' | '|' | '\\' => {
                regex.push('\\');
                regex.push(ch);
            }
            other => regex.push(other),
        }
    }

    regex.push('$');
    regex
}
