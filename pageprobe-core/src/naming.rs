use std::path::Path;

/// Characters replaced with `-` when a URL becomes part of a file name.
const SPECIALS: &[char] = &[
    '/', ';', ',', '>', '<', '&', '*', ':', '%', '=', '+', '@', '!', '#', '^', '(', ')', '|', '?',
];

/// Replace URL-special characters with `-` so the URL can name a file.
///
/// Idempotent: sanitizing an already-sanitized URL is a fixed point, since
/// `-` is not in the replaced set.
#[must_use]
pub fn sanitize_url(url: &str) -> String {
    url.chars()
        .map(|c| if SPECIALS.contains(&c) { '-' } else { c })
        .collect()
}

/// File name for the capture artifact of one trial.
///
/// The trial index keeps distinct trials of the same URL from colliding.
#[must_use]
pub fn trace_file_name(url: &str, index: u32, ext: &str) -> String {
    format!("{}-{index}.{ext}", sanitize_url(url))
}

/// Recover the (sanitized) URL from an artifact path by stripping the
/// extension and the trailing trial-index segment.
///
/// Returns `None` when the name does not follow the artifact scheme: no `-`
/// separator, a non-numeric trailing segment, or an empty remainder.
#[must_use]
pub fn url_from_artifact(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let (url, index) = stem.rsplit_once('-')?;
    index.parse::<u32>().ok()?;
    if url.is_empty() {
        return None;
    }
    Some(url.to_string())
}
