//! The channel's window onto the hosting page.
//!
//! The page side owns navigation and the primary form; the channel only ever
//! reaches it through this trait. The current page identifier is read at the
//! moment a queue entry is processed, not when it was sent, which is what
//! makes stale-page suppression work.

/// Read-only page-state provider consumed by the dispatcher.
pub trait PageHost: Send + Sync + 'static {
    /// Identifier of the currently-displayed page, if any.
    fn current_page(&self) -> Option<String>;

    /// Re-navigate to the current location.
    fn reload(&self);

    /// Navigate to `url`. Callers have already checked the scheme.
    fn redirect(&self, url: &str);

    /// Programmatically submit the page's primary form.
    fn submit_primary_form(&self);
}

/// Whether a redirect target is acceptable: relative URLs, or absolute ones
/// with an http/https scheme. Everything else (javascript:, data:, ...) is
/// refused.
pub fn redirect_allowed(url: &str) -> bool {
    match scheme_of(url) {
        None => true,
        Some(scheme) => scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https"),
    }
}

/// Extract the URL scheme, if the prefix up to the first `:` is one.
fn scheme_of(url: &str) -> Option<&str> {
    let colon = url.find(':')?;
    let candidate = &url[..colon];
    let mut chars = candidate.chars();
    let first = chars.next()?;
    if !first.is_ascii_alphabetic() {
        return None;
    }
    if chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
        Some(candidate)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_targets_are_allowed() {
        assert!(redirect_allowed("/next"));
        assert!(redirect_allowed("page2"));
        assert!(redirect_allowed("//host/path"));
        assert!(redirect_allowed("?round=2"));
    }

    #[test]
    fn http_schemes_are_allowed() {
        assert!(redirect_allowed("http://example.org/"));
        assert!(redirect_allowed("https://example.org/p/abc"));
        assert!(redirect_allowed("HTTPS://EXAMPLE.ORG"));
    }

    #[test]
    fn script_schemes_are_refused() {
        assert!(!redirect_allowed("javascript:alert(1)"));
        assert!(!redirect_allowed("data:text/html,hi"));
        assert!(!redirect_allowed("vbscript:x"));
        assert!(!redirect_allowed("ws://example.org/"));
    }

    #[test]
    fn colon_in_path_is_not_a_scheme() {
        assert!(redirect_allowed("/a/b:c"));
        assert!(redirect_allowed("weird path:thing"));
    }
}
