//! Display title normalization for video filenames.
//!
//! Release-style filenames such as `Show.S01E02.[GroupX].1080p.mkv` are
//! reduced to a readable title (`Show S01E02`). Episode numbers and other
//! numeric prefixes are kept since they are how users find their place in
//! a series.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

/// Final extension, e.g. `.mkv`.
static EXTENSION: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\.[^/.]+$").ok());

/// Bracketed and parenthesized groups, matched non-greedily.
static GROUPS: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\[.*?\]|\(.*?\)").ok());

/// Quality and encoding tags, matched as whole tokens.
static QUALITY_TAGS: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:1080p|720p|4k|x264|x265|bluray|h264|h265|web-dl)\b").ok()
});

static WHITESPACE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\s+").ok());

fn strip<'a>(re: &LazyLock<Option<Regex>>, text: &'a str, with: &str) -> Cow<'a, str> {
    match &**re {
        Some(re) => re.replace_all(text, with),
        None => Cow::Borrowed(text),
    }
}

/// Derive a display title from a raw filename.
///
/// Never returns an empty string: if nothing is left after cleanup the
/// original filename is returned untouched.
#[must_use]
pub fn clean_title(filename: &str) -> String {
    let name = strip(&EXTENSION, filename, "");
    let name = strip(&GROUPS, &name, "");
    // Separators become spaces first so tags glued with `_` or `.` are
    // still seen as whole tokens.
    let name = name.replace(['_', '.'], " ");
    let name = strip(&QUALITY_TAGS, &name, "");
    let name = strip(&WHITESPACE, &name, " ");

    let trimmed = name.trim();
    if trimmed.is_empty() {
        filename.to_string()
    } else {
        trimmed.to_string()
    }
}
