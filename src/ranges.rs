use crate::toc::TocEntry;
use serde::Serialize;
use std::fmt;
use tracing::warn;

// ── FormSplit ────────────────────────────────────────────────────────────────

/// One form's inclusive page range in the source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormSplit {
    pub form_id: String,
    pub title: String,
    /// 1-based, inclusive.
    pub start_page: u32,
    /// 1-based, inclusive. Never less than `start_page`.
    pub end_page: u32,
}

impl FormSplit {
    /// The untouched TOC form name, form reference included.
    pub fn form_name(&self) -> String {
        format!("#{}: {}", self.form_id, self.title)
    }

    pub fn page_count(&self) -> u32 {
        self.end_page - self.start_page + 1
    }

    /// Human-readable range such as `"4–7"`.
    pub fn page_label(&self) -> String {
        format!("{}–{}", self.start_page, self.end_page)
    }
}

// ── Skipped entries ──────────────────────────────────────────────────────────

/// Why a TOC entry produced no split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SkipReason {
    /// The start page is 0 or past the last page of the document.
    StartOutOfBounds { page_count: u32 },
    /// The start page does not come after the previous form's start page
    /// (duplicate or out-of-order TOC row).
    NotAfterPrevious { previous_start: u32 },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::StartOutOfBounds { page_count } => {
                write!(f, "start page outside the document (1-{page_count})")
            }
            SkipReason::NotAfterPrevious { previous_start } => {
                write!(f, "start page not after previous form's start page {previous_start}")
            }
        }
    }
}

/// A TOC entry that was left out of the split plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedEntry {
    pub entry: TocEntry,
    pub reason: SkipReason,
}

/// Result of range computation: the valid splits plus every entry that had to
/// be dropped to keep them contiguous and non-overlapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RangePlan {
    pub splits: Vec<FormSplit>,
    pub skipped: Vec<SkippedEntry>,
}

impl RangePlan {
    /// `true` when no entry was skipped.
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

// ── Range computation ────────────────────────────────────────────────────────

/// Turn ordered TOC entries into contiguous inclusive page ranges.
///
/// Each form ends one page before the next kept form starts; the last form
/// runs to `page_count`. Entries are taken in TOC order. An entry is skipped
/// when its start page lies outside `1..=page_count` or is not strictly
/// greater than the start page of the last kept entry, which keeps every
/// emitted range non-empty and in order. Pages before the first kept start
/// page belong to no split.
pub fn compute_ranges(entries: &[TocEntry], page_count: u32) -> RangePlan {
    let mut kept: Vec<&TocEntry> = Vec::with_capacity(entries.len());
    let mut skipped = Vec::new();

    for entry in entries {
        let reason = if entry.start_page == 0 || entry.start_page > page_count {
            Some(SkipReason::StartOutOfBounds { page_count })
        } else {
            kept.last()
                .filter(|prev| entry.start_page <= prev.start_page)
                .map(|prev| SkipReason::NotAfterPrevious {
                    previous_start: prev.start_page,
                })
        };

        match reason {
            Some(reason) => {
                warn!(
                    form = %entry.form_name(),
                    start_page = entry.start_page,
                    %reason,
                    "TOC entry skipped"
                );
                skipped.push(SkippedEntry {
                    entry: entry.clone(),
                    reason,
                });
            }
            None => kept.push(entry),
        }
    }

    let splits = kept
        .iter()
        .enumerate()
        .map(|(i, entry)| FormSplit {
            form_id: entry.form_id.clone(),
            title: entry.title.clone(),
            start_page: entry.start_page,
            end_page: kept
                .get(i + 1)
                .map(|next| next.start_page - 1)
                .unwrap_or(page_count),
        })
        .collect();

    RangePlan { splits, skipped }
}
