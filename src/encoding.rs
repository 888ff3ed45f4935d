//! Percent-encoding of storage paths for the CDN edge.

/// Encode a slash-separated path for use in a CDN URL.
///
/// Each segment is escaped on its own so `/` is kept as the separator. Bytes
/// outside `A-Z a-z 0-9 - _ . ~` become `%XX` (uppercase hex). A space is
/// written as `%20`, never `+`, since the edge decodes the path component and
/// not a form body.
///
/// Not idempotent: encoding an already encoded path escapes its `%` again.
///
/// # Example
///
/// ```rust
/// use cdn_redirect::encode_path;
///
/// assert_eq!(encode_path("/a b/c"), "/a%20b/c");
/// assert_eq!(encode_path("/%"), "/%25");
/// ```
pub fn encode_path(path: &str) -> String {
    let encoded = path
        .split('/')
        .map(urlencoding::encode)
        .collect::<Vec<_>>()
        .join("/");

    // A literal `+` was escaped to %2B above; any bare `+` is a form-style space.
    encoded.replace('+', "%20")
}
