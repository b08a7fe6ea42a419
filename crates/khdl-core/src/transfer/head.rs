//! Content-Length lookup in collected response header lines.

/// Returns the `Content-Length` of the final response in `lines`.
///
/// With redirects followed, curl reports one header block per hop; each
/// `HTTP/` status line starts a new block and discards earlier values.
pub(crate) fn content_length(lines: &[String]) -> Option<u64> {
    let mut content_length = None;

    for line in lines {
        let line = line.trim();
        if line.starts_with("HTTP/") {
            content_length = None;
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse::<u64>().ok();
            }
        }
    }

    content_length
}
