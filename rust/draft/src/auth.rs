use uuid::Uuid;

/// Strips every non-alphanumeric character from a caller-supplied token.
///
/// The result is only ever used as a literal equality operand against the
/// stored secret. Total and idempotent; an all-invalid input becomes `""`.
pub fn sanitize_token(raw: &str) -> String {
    raw.chars().filter(|ch| ch.is_alphanumeric()).collect()
}

/// Fresh opaque secret handed to the drafting client at session creation.
pub fn generate_token() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Fresh candidate session identifier.
pub fn generate_session_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Compares a sanitized token against the stored secret.
pub fn token_matches(stored: &str, presented: &str) -> bool {
    !presented.is_empty() && stored == presented
}
