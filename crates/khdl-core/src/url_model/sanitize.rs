//! Filesystem-safe names for downloaded tracks and album directories.

/// Linux NAME_MAX.
const NAME_MAX: usize = 255;

/// Sanitizes a decoded file or directory name for use as a single path component.
///
/// - Replaces NUL, `/`, `\` and control characters with `_`
/// - Trims leading/trailing whitespace and dots
/// - Limits length to 255 bytes
///
/// Spaces and other printable characters are kept, so "01 - Opening.flac"
/// stays as-is.
pub fn sanitize_file_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| {
            if c == '/' || c == '\\' || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    let trimmed = replaced.trim_matches(|c: char| c.is_whitespace() || c == '.');

    if trimmed.len() > NAME_MAX {
        let mut take = NAME_MAX;
        while take > 0 && !trimmed.is_char_boundary(take) {
            take -= 1;
        }
        trimmed[..take].to_string()
    } else {
        trimmed.to_string()
    }
}
