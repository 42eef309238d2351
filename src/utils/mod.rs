//! Small helpers shared across the pipeline and the HTTP layer.

use once_cell::sync::Lazy;

/// Matches any run of whitespace or underscores, the only characters the
/// kebab-case conversion collapses into a single `-`.
static KEBAB_SEPARATORS: Lazy<regex::Regex> = Lazy::new(|| regex::Regex::new(r"[\s_]+").unwrap());

/// Convert a service name into its kebab-case form: lowercased, with runs of
/// whitespace/underscore collapsed to a single hyphen.
///
/// `"User Management"` and `"user_management"` both normalize to
/// `"user-management"`.
pub fn kebab_case(name: &str) -> String {
    KEBAB_SEPARATORS.replace_all(name.trim(), "-").to_lowercase()
}

/// Generate a fresh request/fetch identifier.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Reject any path segment containing `..` (including percent-encoded
/// variants), which would otherwise let a caller escape the handler's base
/// path.
pub fn contains_path_traversal(path: &str) -> bool {
    let decoded = path.replace("%2e", ".").replace("%2E", ".").replace("%2f", "/").replace("%2F", "/");
    decoded.split('/').any(|segment| segment == "..") || decoded.contains("..")
}
