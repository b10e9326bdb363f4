use url::Url;

/// Returns true if `line` is an absolute URL with both a scheme and a host
///
/// The input is expected to be trimmed already. Parsing failures yield
/// `false`; this function never panics.
///
/// # Examples
///
/// ```
/// use keyword_probe::url::is_valid_url;
///
/// assert!(is_valid_url("https://example.com/x"));
/// assert!(!is_valid_url("not a url"));
/// assert!(!is_valid_url(""));
/// ```
pub fn is_valid_url(line: &str) -> bool {
    match Url::parse(line) {
        Ok(url) => {
            !url.scheme().is_empty() && url.host_str().map_or(false, |host| !host.is_empty())
        }
        Err(_) => false,
    }
}
