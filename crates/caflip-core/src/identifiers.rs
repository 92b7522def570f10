//! Storage-key safety checks for values interpolated into backup filenames
//! and keychain service names.

const MAX_STORAGE_KEY_LEN: usize = 254;

/// Returns true when `value` is safe to embed in a backup filename.
///
/// The whitelist is deliberately narrow: emails and aliases that pass it
/// cannot traverse paths, smuggle separators, or carry control characters
/// into a keychain service name.
pub fn is_safe_storage_key(value: &str) -> bool {
    if value.is_empty() || value.len() > MAX_STORAGE_KEY_LEN {
        return false;
    }
    if value.contains("..") {
        return false;
    }
    value
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '@' | '.' | '_' | '+' | '-'))
}
