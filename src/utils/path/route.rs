//! URL path utilities.
//!
//! Shared by the HTTP server (request URLs) and the session handlers
//! (locations announced by editor clients).

use percent_encoding::percent_decode_str;

/// Normalize URL: decode, strip query string and fragment, trim slashes
///
/// # Examples
/// ```ignore
/// assert_eq!(normalize_url("/about.html?x=1"), "about.html");
/// assert_eq!(normalize_url("/my%20page.html"), "my page.html");
/// assert_eq!(normalize_url("/"), "");
/// ```
pub fn normalize_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let decoded = percent_decode_str(path)
        .decode_utf8()
        .map(std::borrow::Cow::into_owned)
        .unwrap_or_else(|_| path.to_string());
    decoded.trim_matches('/').to_string()
}

/// Check that a normalized relative path cannot escape its root.
pub fn is_safe_relative(path: &str) -> bool {
    !path
        .split(['/', '\\'])
        .any(|segment| segment == ".." || segment.contains(':'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("/about.html?x=1"), "about.html");
        assert_eq!(normalize_url("/pages/a.html#top"), "pages/a.html");
        assert_eq!(normalize_url("/my%20page.html"), "my page.html");
        assert_eq!(normalize_url("/"), "");
        assert_eq!(normalize_url(""), "");
    }

    #[test]
    fn test_is_safe_relative() {
        assert!(is_safe_relative("index.html"));
        assert!(is_safe_relative("pages/about.html"));
        assert!(is_safe_relative(""));
        assert!(!is_safe_relative("../secret.txt"));
        assert!(!is_safe_relative("pages/../../x"));
        assert!(!is_safe_relative("C:/windows"));
    }
}
