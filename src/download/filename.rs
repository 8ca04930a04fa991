//! Filename derivation for saved images: sanitization and extension
//! inference. Pure functions, no state.

use url::Url;

/// Maximum length of the sanitized source component.
const MAX_SOURCE_LEN: usize = 100;

/// Extensions recognized when inferring from a URL path.
const IMAGE_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".webp", ".bmp", ".tiff", ".svg",
];

/// Derives a filesystem-safe component from a source URL.
///
/// Strips the scheme, maps separator and unsafe character runs to single
/// hyphens, keeps only ASCII alphanumerics plus `-` and `.`, and truncates
/// to 100 characters.
#[must_use]
pub fn sanitize_source(url: &str) -> String {
    let without_scheme = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);

    let mut sanitized = String::with_capacity(without_scheme.len());
    let mut last_was_hyphen = false;
    for ch in without_scheme.chars() {
        if ch.is_ascii_alphanumeric() || ch == '.' {
            sanitized.push(ch);
            last_was_hyphen = false;
        } else if ch == '-'
            || ch.is_whitespace()
            || matches!(ch, '/' | ':' | '?' | '&' | '=' | '%' | '#' | '\\')
        {
            // Separator runs collapse to a single hyphen.
            if !last_was_hyphen && !sanitized.is_empty() {
                sanitized.push('-');
                last_was_hyphen = true;
            }
        }
        // Anything else is dropped.
    }

    let trimmed = sanitized.trim_matches('-');
    let truncated: String = trimmed.chars().take(MAX_SOURCE_LEN).collect();
    truncated.trim_end_matches('-').to_string()
}

/// Infers a file extension (with dot) from the Content-Type header or the
/// URL path suffix, defaulting to `.jpg` when undetermined.
#[must_use]
pub fn infer_extension(url: &str, content_type: Option<&str>) -> &'static str {
    if let Some(content_type) = content_type {
        let base = content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        let mapped = match base.as_str() {
            "image/jpeg" | "image/jpg" => Some(".jpg"),
            "image/png" => Some(".png"),
            "image/gif" => Some(".gif"),
            "image/webp" => Some(".webp"),
            "image/bmp" => Some(".bmp"),
            "image/tiff" => Some(".tiff"),
            "image/svg+xml" => Some(".svg"),
            _ => None,
        };
        if let Some(extension) = mapped {
            return extension;
        }
    }

    let path = Url::parse(url)
        .map(|u| u.path().to_ascii_lowercase())
        .unwrap_or_default();
    for extension in IMAGE_EXTENSIONS {
        if path.ends_with(extension) {
            // .jpeg and .jpg are the same format; normalize on save.
            return if *extension == ".jpeg" { ".jpg" } else { *extension };
        }
    }

    ".jpg"
}

/// Builds the output filename for an accepted image:
/// `{prefix}_{sequence:03}_{sanitized-source}{extension}`.
#[must_use]
pub fn build_image_filename(
    prefix: &str,
    sequence: u64,
    url: &str,
    content_type: Option<&str>,
) -> String {
    let source = sanitize_source(url);
    let extension = infer_extension(url, content_type);
    if source.is_empty() {
        format!("{prefix}_{sequence:03}{extension}")
    } else {
        format!("{prefix}_{sequence:03}_{source}{extension}")
    }
}
