//! Output filename derivation.
//!
//! A title becomes a filename in this order:
//!
//! 1. optionally drop the leading `#<digits>:` form reference;
//! 2. apply the removal patterns to the text as written;
//! 3. slugify (reserved characters dropped, whitespace runs to `_`, anything
//!    outside `[A-Za-z0-9_]` dropped, `_` runs collapsed and trimmed);
//! 4. apply the removal patterns again to the slug;
//! 5. collapse and trim underscores once more;
//! 6. `prefix + stem + suffix + ".pdf"`.
//!
//! Running the patterns on both sides of slugify lets a user write either
//! `ACC Build` or `ACC_Build` and get the same result.

use crate::metadata::UNKNOWN;
use crate::patterns::{
    LEADING_ID, NON_STEM_CHARS, RESERVED_CHARS, UNDERSCORE_RUN, WHITESPACE_RUN,
};
use crate::{Result, SplitError};
use regex::Regex;
use std::collections::{BTreeSet, HashMap};

// ── RemovalPattern ───────────────────────────────────────────────────────────

/// A compiled user removal token.
///
/// `*` is the only wildcard and matches the shortest possible run of any
/// characters; every other character is literal. Matching ignores case.
#[derive(Debug, Clone)]
pub struct RemovalPattern {
    token: String,
    regex: Regex,
}

impl RemovalPattern {
    /// Compile one token, e.g. `"03.*_"` or `"ACC Build"`.
    pub fn compile(token: &str) -> Result<Self> {
        let source = wildcard_to_regex(token);
        let regex = Regex::new(&source)
            .map_err(|e| SplitError::PatternError(token.to_string(), e.to_string()))?;
        Ok(Self {
            token: token.to_string(),
            regex,
        })
    }

    /// The token as the user entered it.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// The regular expression the token was translated to.
    pub fn as_regex_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Delete every match from `text`.
    pub fn remove_from(&self, text: &str) -> String {
        self.regex.replace_all(text, "").into_owned()
    }
}

/// Escape each literal piece of `token` and join the pieces with `.*?`.
fn wildcard_to_regex(token: &str) -> String {
    let body = token
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*?");
    format!("(?i){body}")
}

/// Split raw user input on commas and newlines and compile each non-empty
/// token.
pub fn parse_removal_patterns(raw: &str) -> Result<Vec<RemovalPattern>> {
    raw.split([',', '\n'])
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(RemovalPattern::compile)
        .collect()
}

fn apply_patterns(text: &str, patterns: &[RemovalPattern]) -> String {
    patterns
        .iter()
        .fold(text.to_string(), |acc, p| p.remove_from(&acc))
}

// ── Slugify ──────────────────────────────────────────────────────────────────

/// Drop a leading `#<digits>:` form reference and the whitespace after it.
pub fn strip_leading_id(title: &str) -> String {
    LEADING_ID.replace(title, "").into_owned()
}

/// Reduce `text` to `[A-Za-z0-9_]` with single, non-edge underscores.
///
/// Idempotent: `slugify(&slugify(x)) == slugify(x)`.
pub fn slugify(text: &str) -> String {
    let text = RESERVED_CHARS.replace_all(text, "");
    let text = WHITESPACE_RUN.replace_all(text.trim(), "_");
    let text = NON_STEM_CHARS.replace_all(&text, "");
    collapse_underscores(&text)
}

fn collapse_underscores(text: &str) -> String {
    UNDERSCORE_RUN
        .replace_all(text, "_")
        .trim_matches('_')
        .to_string()
}

// ── OutputName ───────────────────────────────────────────────────────────────

/// Everything needed to derive one output filename.
#[derive(Debug, Clone, Copy)]
pub struct OutputNameRequest<'a> {
    pub raw_title: &'a str,
    pub strip_leading_id: bool,
    pub patterns: &'a [RemovalPattern],
    pub prefix: &'a str,
    pub suffix: &'a str,
}

/// A derived filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputName {
    /// Sanitized stem, `[A-Za-z0-9_]*`.
    pub stem: String,
    /// `prefix + stem + suffix + ".pdf"`.
    pub full: String,
}

/// Derive the output filename for one title.
///
/// Reserved path characters are removed from the prefix and suffix so they
/// cannot introduce folders into the archive.
pub fn build_name(request: &OutputNameRequest<'_>) -> OutputName {
    let title = if request.strip_leading_id {
        strip_leading_id(request.raw_title)
    } else {
        request.raw_title.to_string()
    };

    let slug = slugify(&apply_patterns(&title, request.patterns));
    let stem = collapse_underscores(&apply_patterns(&slug, request.patterns));

    let prefix = RESERVED_CHARS.replace_all(request.prefix, "");
    let suffix = RESERVED_CHARS.replace_all(request.suffix, "");
    let full = format!("{prefix}{stem}{suffix}.pdf");

    OutputName { stem, full }
}

/// Make a metadata value usable as one archive folder name.
///
/// Reserved and control characters are dropped, whitespace is collapsed to
/// single spaces and edge dots/spaces are trimmed. An empty result becomes
/// [`UNKNOWN`].
pub fn sanitize_folder(value: &str) -> String {
    let cleaned: String = RESERVED_CHARS
        .replace_all(value, "")
        .chars()
        .filter(|c| !c.is_control())
        .collect();
    let cleaned = WHITESPACE_RUN.replace_all(&cleaned, " ");
    let cleaned = cleaned.trim_matches(|c: char| c == ' ' || c == '.');
    if cleaned.is_empty() {
        UNKNOWN.to_string()
    } else {
        cleaned.to_string()
    }
}

// ── Collisions ───────────────────────────────────────────────────────────────

/// Every name that occurs more than once, compared by exact string equality.
pub fn find_duplicates<I, S>(names: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut counts: HashMap<String, usize> = HashMap::new();
    for name in names {
        *counts.entry(name.as_ref().to_string()).or_default() += 1;
    }
    counts
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(name, _)| name)
        .collect()
}

/// `dir/name.pdf` with `n = 2` becomes `dir/name (2).pdf`.
pub(crate) fn numbered_path(path: &str, n: usize) -> String {
    match path.rsplit_once('.') {
        Some((base, ext)) if !base.is_empty() && !ext.contains('/') => {
            format!("{base} ({n}).{ext}")
        }
        _ => format!("{path} ({n})"),
    }
}
