use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Canonical album identifier: a non-empty run of ASCII digits.
///
/// Only [`resolve`] produces these; everything downstream treats the value
/// as opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlbumId(String);

impl AlbumId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AlbumId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The input could not be turned into an album identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveError {
    pub input: String,
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no album id found in {:?}", self.input)
    }
}

impl std::error::Error for ResolveError {}

// Tried first: an explicit `/album/<digits>` path segment. Ordering matters,
// a numeric segment earlier in the path must not shadow this form.
static ALBUM_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/album/(\d+)").expect("album segment pattern"));

// Fallback: a path segment of pure digits, optionally `.html`, ending the
// path or followed by a query string.
static TRAILING_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(\d+)(?:\.html)?(?:\?|$)").expect("trailing id pattern"));

/// Resolves free-form user input (a bare numeric id or a URL containing one)
/// into a canonical [`AlbumId`].
pub fn resolve(input: &str) -> Result<AlbumId, ResolveError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ResolveError {
            input: input.to_string(),
        });
    }

    if trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(AlbumId(trimmed.to_string()));
    }

    for pattern in [&*ALBUM_SEGMENT, &*TRAILING_ID] {
        if let Some(captures) = pattern.captures(trimmed) {
            return Ok(AlbumId(captures[1].to_string()));
        }
    }

    Err(ResolveError {
        input: trimmed.to_string(),
    })
}
