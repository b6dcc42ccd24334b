//! Storage path generation.
//!
//! Every upload gets a key of the form `{owner}/{millis}-{token}-{name}`.
//! The millisecond timestamp combined with a random token makes collisions
//! negligible in practice; the sanitized original filename keeps paths
//! filesystem-safe while staying recognizable.

use chrono::Utc;
use uuid::Uuid;

const TOKEN_LEN: usize = 7;

/// Derive a unique storage path for an upload.
///
/// Always succeeds for non-empty inputs. Uniqueness comes from the
/// millisecond clock plus a random token, both injected through
/// `generate_path_with` so tests can pin them.
pub fn generate_path(owner_id: &str, file_name: &str) -> String {
    generate_path_with(owner_id, file_name, Utc::now().timestamp_millis(), &random_token())
}

/// Deterministic core of `generate_path` with time and randomness injected.
pub fn generate_path_with(
    owner_id: &str,
    file_name: &str,
    timestamp_millis: i64,
    token: &str,
) -> String {
    format!(
        "{}/{}-{}-{}",
        owner_id,
        timestamp_millis,
        token,
        sanitize_file_name(file_name)
    )
}

/// Replace every character outside `[A-Za-z0-9._-]` with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Short random token, lowercase hex so it stays within `\w`.
fn random_token() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    hex[..TOKEN_LEN].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_unique_for_identical_inputs() {
        let a = generate_path("u1", "notes.txt");
        let b = generate_path("u1", "notes.txt");
        assert_ne!(a, b);
    }

    #[test]
    fn sanitized_segment_is_filesystem_safe() {
        let sanitized = sanitize_file_name("rapport final (v2) äö.pdf");
        assert!(
            sanitized
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')),
            "unsafe char survived: {sanitized}"
        );
        assert_eq!(sanitized, "rapport_final__v2____.pdf");
    }

    #[test]
    fn path_shape_with_injected_inputs() {
        let path = generate_path_with("u1", "my report.txt", 1700000000000, "abc1234");
        assert_eq!(path, "u1/1700000000000-abc1234-my_report.txt");
    }

    #[test]
    fn safe_characters_pass_through_unchanged() {
        assert_eq!(sanitize_file_name("a-b_c.D9"), "a-b_c.D9");
    }
}
