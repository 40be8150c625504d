use crate::document::PageTextSource;
use crate::naming::sanitize_folder;
use crate::patterns::REFERENCES_ANCHOR;
use crate::GroupBy;
use serde::Serialize;
use tracing::debug;

/// Value used for any label that could not be found.
pub const UNKNOWN: &str = "Unknown";

const LABELS: [&str; 3] = ["Template", "Location", "Category"];

// ── FormMetadata ─────────────────────────────────────────────────────────────

/// Grouping labels scraped from a form's body text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormMetadata {
    pub template: String,
    pub location: String,
    pub category: String,
}

impl Default for FormMetadata {
    fn default() -> Self {
        Self {
            template: UNKNOWN.to_string(),
            location: UNKNOWN.to_string(),
            category: UNKNOWN.to_string(),
        }
    }
}

impl FormMetadata {
    /// Archive folder for this form, without a trailing slash, or `None` when
    /// files are not grouped.
    pub fn folder(&self, group_by: GroupBy) -> Option<String> {
        match group_by {
            GroupBy::None => None,
            GroupBy::Template => Some(sanitize_folder(&self.template)),
            GroupBy::LocationCategory => Some(format!(
                "{}/{}",
                sanitize_folder(&self.location),
                sanitize_folder(&self.category)
            )),
        }
    }
}

// ── MetadataExtractor ────────────────────────────────────────────────────────

/// Reads `Template`, `Location` and `Category` label values from page text.
///
/// A label line is a line whose trimmed text starts with the label word. Its
/// value is the text after the first colon, or the rest of the line when
/// there is no colon; if that is empty the next non-empty line is used,
/// unless that line is itself a label.
///
/// Extraction never fails: anything not found is [`UNKNOWN`].
#[derive(Debug, Clone, Copy)]
pub struct MetadataExtractor {
    location_window_pages: u32,
}

impl Default for MetadataExtractor {
    fn default() -> Self {
        Self::new(3)
    }
}

impl MetadataExtractor {
    /// `location_window_pages` is the number of pages, starting with the
    /// "References and Attachments" page, searched for `Location` and
    /// `Category`. Zero is treated as one; values past `u32::MAX` saturate.
    pub fn new(location_window_pages: usize) -> Self {
        Self {
            location_window_pages: u32::try_from(location_window_pages)
                .unwrap_or(u32::MAX)
                .max(1),
        }
    }

    /// Extract metadata from pages `first..=last` (1-based, clamped to the
    /// document).
    ///
    /// `Template` is read from page `first` only. `Location` and `Category`
    /// are read from the text following the first "References and
    /// Attachments" marker in the range, over at most the configured number
    /// of pages; without the marker both stay [`UNKNOWN`].
    pub fn extract<S: PageTextSource + ?Sized>(&self, source: &S, first: u32, last: u32) -> FormMetadata {
        let last = last.min(source.page_count());
        let mut meta = FormMetadata::default();
        if first == 0 || first > last {
            return meta;
        }

        if let Some(template) = Self::template_from_text(&source.page_text(first)) {
            meta.template = template;
        }

        let (location, category) = self.location_category(source, first, last);
        if let Some(location) = location {
            meta.location = location;
        }
        if let Some(category) = category {
            meta.category = category;
        }

        debug!(first, last, ?meta, "metadata extracted");
        meta
    }

    /// The `Template` value in `text`, if any.
    pub fn template_from_text(text: &str) -> Option<String> {
        let lines: Vec<&str> = text.lines().collect();
        label_value(&lines, "Template")
    }

    fn location_category<S: PageTextSource + ?Sized>(
        &self,
        source: &S,
        first: u32,
        last: u32,
    ) -> (Option<String>, Option<String>) {
        let mut location = None;
        let mut category = None;

        let Some((anchor_page, tail)) = (first..=last).find_map(|page| {
            let text = source.page_text(page);
            text.find(REFERENCES_ANCHOR)
                .map(|pos| (page, text[pos + REFERENCES_ANCHOR.len()..].to_string()))
        }) else {
            debug!(first, last, "no references marker, location/category unknown");
            return (location, category);
        };

        let window_end = anchor_page
            .saturating_add(self.location_window_pages - 1)
            .min(last);

        let mut text = tail;
        for page in anchor_page + 1..=window_end {
            text.push('\n');
            text.push_str(&source.page_text(page));
        }

        let lines: Vec<&str> = text.lines().collect();
        for (i, line) in lines.iter().enumerate() {
            if location.is_none() && starts_with_label(line, "Location") {
                location = value_at(&lines, i, "Location");
            } else if category.is_none() && starts_with_label(line, "Category") {
                category = value_at(&lines, i, "Category");
            }
            if location.is_some() && category.is_some() {
                break;
            }
        }

        (location, category)
    }
}

// ── Label lines ──────────────────────────────────────────────────────────────

/// First value for `label` in `lines`.
fn label_value(lines: &[&str], label: &str) -> Option<String> {
    lines
        .iter()
        .enumerate()
        .filter(|(_, line)| starts_with_label(line, label))
        .find_map(|(i, _)| value_at(lines, i, label))
}

/// Whether the trimmed line starts with `label` as a whole word.
fn starts_with_label(line: &str, label: &str) -> bool {
    line.trim_start()
        .strip_prefix(label)
        .map(|rest| !rest.starts_with(|c: char| c.is_alphanumeric()))
        .unwrap_or(false)
}

/// Value of the label line at `index`.
fn value_at(lines: &[&str], index: usize, label: &str) -> Option<String> {
    let rest = lines[index].trim_start().strip_prefix(label)?;
    let inline = match rest.split_once(':') {
        Some((_, after)) => after.trim(),
        None => rest.trim(),
    };
    if !inline.is_empty() {
        return Some(inline.to_string());
    }

    let next = lines[index + 1..]
        .iter()
        .map(|l| l.trim())
        .find(|l| !l.is_empty())?;
    if LABELS.iter().any(|l| starts_with_label(next, l)) {
        return None;
    }
    Some(next.to_string())
}
