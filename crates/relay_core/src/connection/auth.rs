//! The `PASS` handshake and the post-authentication secret guard.

use std::borrow::Cow;

/// Reply sent when the backend presents the right secret.
pub const AUTH_ACCEPTED: &[u8] = b"200\r\n";

/// Reply sent for any other line received before authentication.
pub const AUTH_REJECTED: &[u8] = b"401\r\n";

const PASS_COMMAND: &str = "PASS";

/// Strips any trailing CR/LF characters.
pub fn trim_line_ending(text: &str) -> &str {
    text.trim_end_matches(['\r', '\n'])
}

/// Whether `line` is exactly `PASS <secret>`.
pub fn is_auth_line(line: &str, secret: &str) -> bool {
    line.strip_prefix(PASS_COMMAND)
        .and_then(|rest| rest.strip_prefix(' '))
        .is_some_and(|presented| presented == secret)
}

/// Removes every line starting with `PASS` from an authenticated payload.
///
/// Returns the remaining text and how many lines were removed, so a secret
/// resent after authentication never reaches the dispatcher or its logs.
pub fn strip_pass_lines(payload: &str) -> (Cow<'_, str>, usize) {
    if !payload.lines().any(|line| line.starts_with(PASS_COMMAND)) {
        return (Cow::Borrowed(payload), 0);
    }

    let mut kept = String::with_capacity(payload.len());
    let mut removed = 0;
    for line in payload.split_inclusive('\n') {
        if line.starts_with(PASS_COMMAND) {
            removed += 1;
        } else {
            kept.push_str(line);
        }
    }
    (Cow::Owned(kept), removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_line_ending() {
        assert_eq!(trim_line_ending("PASS secret\r\n"), "PASS secret");
        assert_eq!(trim_line_ending("Hello\n\r\n"), "Hello");
        assert_eq!(trim_line_ending("  spaced  "), "  spaced  ");
    }

    #[test]
    fn test_auth_line_must_match_exactly() {
        assert!(is_auth_line("PASS secret", "secret"));
        assert!(!is_auth_line("PASS wrong", "secret"));
        assert!(!is_auth_line("PASS secret ", "secret"));
        assert!(!is_auth_line("pass secret", "secret"));
        assert!(!is_auth_line("PASSsecret", "secret"));
        assert!(!is_auth_line("", "secret"));
    }

    #[test]
    fn test_secret_may_contain_spaces() {
        assert!(is_auth_line("PASS correct horse", "correct horse"));
    }

    #[test]
    fn test_strip_pass_lines_borrows_clean_payload() {
        let (text, removed) = strip_pass_lines("Hello world");
        assert!(matches!(text, Cow::Borrowed("Hello world")));
        assert_eq!(removed, 0);
    }

    #[test]
    fn test_strip_pass_lines_removes_secret() {
        let (text, removed) = strip_pass_lines("PASS secret");
        assert_eq!(text, "");
        assert_eq!(removed, 1);

        let (text, removed) = strip_pass_lines("Hello\r\nPASS secret\r\n\r\nWorld");
        assert_eq!(text, "Hello\r\n\r\nWorld");
        assert_eq!(removed, 1);
    }

    #[test]
    fn test_strip_pass_lines_matches_any_pass_prefix() {
        let (text, removed) = strip_pass_lines("PASSWORD=hunter2\nok");
        assert_eq!(text, "ok");
        assert_eq!(removed, 1);
    }
}
