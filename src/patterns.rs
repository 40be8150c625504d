//! Named text patterns shared by the TOC, naming and metadata stages.
//!
//! Every pattern the pipeline depends on lives here so that a change in the
//! vendor export format is a one-line edit instead of a hunt through call
//! sites.

use regex::Regex;
use std::sync::LazyLock;

/// A page contains a TOC row when any line starts with `#<digits>:`.
pub(crate) static TOC_SIGNATURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*#[ \t]*\d+:").expect("invalid TOC signature regex")
});

/// Same anchor as [`TOC_SIGNATURE`], tested against one line at a time when
/// cutting a page into per-entry chunks.
pub(crate) static TOC_LINE_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[ \t]*#[ \t]*\d+:").expect("invalid TOC line regex"));

/// One TOC row: `#<id>:` then the title, up to the first run of three or more
/// dots, then the start page. The title is non-greedy so that colons inside
/// it (`ACC/DCC-D4.1 (P23459AD0003): 03.04 ...`) stay part of the title.
pub(crate) static TOC_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#[ \t]*(?P<id>\d+):\s*(?P<title>.+?)\s*\.{3,}\s*(?P<page>\d+)")
        .expect("invalid TOC entry regex")
});

/// Leader-less TOC row: the start page is the last whitespace-separated token.
pub(crate) static TOC_ENTRY_NO_LEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#[ \t]*(?P<id>\d+):\s*(?P<title>.+?)\s+(?P<page>\d+)\s*$")
        .expect("invalid leader-less TOC entry regex")
});

/// Leading form reference removed by `strip_leading_id`.
pub(crate) static LEADING_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*#\s*\d+:?\s*").expect("invalid leading id regex"));

/// Windows-reserved filename characters.
pub(crate) static RESERVED_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[\\/:*?"<>|]"#).expect("invalid reserved chars regex"));

pub(crate) static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("invalid whitespace regex"));

/// Anything outside the stem alphabet.
pub(crate) static NON_STEM_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_]").expect("invalid stem alphabet regex"));

pub(crate) static UNDERSCORE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_{2,}").expect("invalid underscore regex"));

/// Marker after which the `Location` and `Category` labels are searched.
pub(crate) const REFERENCES_ANCHOR: &str = "References and Attachments";
