//! Secret scrubbing for text that may reach logs.

const REDACTED: &str = "<redacted>";

// `bearer` runs first so `authorization=Bearer <value>` loses both parts.
const SENSITIVE_KEYS: &[&str] = &[
    "bearer",
    "authorization",
    "password",
    "secret",
    "api_key",
    "token",
];

/// Redacts values that follow common secret markers.
///
/// Matching is case-insensitive. The value after the marker, up to the next
/// whitespace or delimiter, is replaced with `<redacted>`. Applying it twice
/// gives the same output as applying it once.
pub fn redact_sensitive(input: &str) -> String {
    SENSITIVE_KEYS
        .iter()
        .fold(input.to_string(), |redacted, key| redact_after_key(&redacted, key))
}

fn redact_after_key(input: &str, key: &str) -> String {
    let lower = input.to_ascii_lowercase();
    let mut output = String::with_capacity(input.len());
    let mut cursor = 0;

    while let Some(found) = lower[cursor..].find(key) {
        let key_end = cursor + found + key.len();
        let rest = &input[key_end..];
        let value_start = key_end
            + (rest.len()
                - rest
                    .trim_start_matches(|c: char| matches!(c, '=' | ':' | ' ' | '"' | '\''))
                    .len());
        let value_len = input[value_start..]
            .find(|c: char| c.is_whitespace() || matches!(c, '&' | ',' | ';' | '"' | '\'' | '}'))
            .unwrap_or(input.len() - value_start);

        output.push_str(&input[cursor..value_start]);
        if value_len > 0 && &input[value_start..value_start + value_len] != REDACTED {
            output.push_str(REDACTED);
        } else {
            output.push_str(&input[value_start..value_start + value_len]);
        }
        cursor = value_start + value_len;
    }

    output.push_str(&input[cursor..]);
    output
}

#[cfg(test)]
mod tests {
    //! Unit tests for secret scrubbing.

    use super::*;

    #[test]
    fn redaction_keeps_surrounding_text() {
        let redacted = redact_sensitive("upload failed: token=abc123 status=401");
        assert_eq!(redacted, "upload failed: token=<redacted> status=401");
    }

    #[test]
    fn redaction_is_stable_when_applied_twice() {
        let once = redact_sensitive("password: hunter2");
        assert_eq!(redact_sensitive(&once), once);
    }

    #[test]
    fn markers_match_case_insensitively() {
        let redacted = redact_sensitive("Authorization: Bearer abc.def");
        assert!(!redacted.contains("abc.def"));
    }
}
