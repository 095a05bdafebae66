//! Path and filename sanitization
//!
//! User-supplied names never reach the filesystem as-is. Upload names are only
//! used for extension checks and logging, and download names are rebuilt from
//! sanitized metadata.

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

/// Maximum filename length in bytes (common filesystem limit).
pub const MAX_FILENAME_LEN: usize = 255;

/// Fallback name when nothing usable survives sanitization.
pub const FALLBACK_FILENAME: &str = "unnamed.md";

/// Fallback stem for download filenames.
pub const FALLBACK_DOWNLOAD_STEM: &str = "document";

const MAX_DOWNLOAD_STEM_LEN: usize = 100;

static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s.\-]").expect("static regex"));
static SEPARATOR_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s_]+").expect("static regex"));
static STEM_UNSAFE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_\-]+").expect("static regex"));

/// Truncate `s` to at most `max` bytes without splitting a character.
fn truncate_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Sanitize a single path component: strips directories, traversal sequences
/// and unsafe characters. May return an empty string.
pub fn sanitize_path_component(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let base = base.replace("..", "").replace('\0', "");

    let cleaned = UNSAFE_CHARS.replace_all(&base, "");
    let collapsed = SEPARATOR_RUNS.replace_all(&cleaned, "_");

    collapsed
        .trim_start_matches(['.', '_'])
        .trim_end_matches(['.', '_', ' '])
        .to_string()
}

/// Sanitize an uploaded filename for safe display and extension checks.
///
/// The result is at most [`MAX_FILENAME_LEN`] bytes, keeps its extension when
/// truncated, and falls back to [`FALLBACK_FILENAME`] when empty.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned = sanitize_path_component(name);
    if cleaned.is_empty() {
        return FALLBACK_FILENAME.to_string();
    }

    if cleaned.len() <= MAX_FILENAME_LEN {
        return cleaned;
    }

    match cleaned.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.len() < 16 => {
            let stem = truncate_bytes(stem, MAX_FILENAME_LEN - ext.len() - 1);
            format!("{}.{}", stem, ext)
        }
        _ => truncate_bytes(&cleaned, MAX_FILENAME_LEN).to_string(),
    }
}

/// Lowercased extension of `filename`, if any.
pub fn file_extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .filter(|e| !e.is_empty())
}

/// Whether the extension of `filename` is in `allowed` (lowercase entries).
pub fn check_allowed_extension(filename: &str, allowed: &[String]) -> bool {
    file_extension(filename)
        .map(|ext| allowed.iter().any(|a| a == &ext))
        .unwrap_or(false)
}

/// Stem used for download filenames, derived from a document title.
pub fn download_stem(title: Option<&str>) -> String {
    let Some(title) = title else {
        return FALLBACK_DOWNLOAD_STEM.to_string();
    };

    let replaced = STEM_UNSAFE.replace_all(title.trim(), "_");
    let trimmed = replaced.trim_matches(['_', '-']);
    let stem = truncate_bytes(trimmed, MAX_DOWNLOAD_STEM_LEN).trim_end_matches('_');

    if stem.is_empty() {
        FALLBACK_DOWNLOAD_STEM.to_string()
    } else {
        stem.to_string()
    }
}

/// Whether a redirect target is safe to hand to a browser: a same-origin
/// relative path, or an https URL whose host is in `allowed_hosts`.
pub fn is_safe_redirect_url(target: &str, allowed_hosts: &[String]) -> bool {
    let target = target.trim();
    if target.is_empty() {
        return false;
    }

    if target.starts_with('/') {
        return !target.starts_with("//") && !target.contains('\\');
    }

    match url::Url::parse(target) {
        Ok(parsed) => {
            parsed.scheme() == "https"
                && parsed
                    .host_str()
                    .map(|host| {
                        let host = host.to_lowercase();
                        allowed_hosts.iter().any(|allowed| allowed == &host)
                    })
                    .unwrap_or(false)
        }
        Err(_) => false,
    }
}
