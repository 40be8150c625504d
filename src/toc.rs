use crate::document::PageTextSource;
use crate::patterns::{TOC_ENTRY, TOC_ENTRY_NO_LEADER, TOC_LINE_START, TOC_SIGNATURE};
use crate::TocScan;
use serde::Serialize;
use tracing::debug;

// ── TocEntry ─────────────────────────────────────────────────────────────────

/// One row of the embedded table of contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocEntry {
    /// Digits of the `#<digits>:` form reference.
    pub form_id: String,

    /// Title text between the form reference and the dot leader, with
    /// wrapped lines joined by a single space.
    pub title: String,

    /// 1-based first page of the form.
    pub start_page: u32,
}

impl TocEntry {
    /// The form name as shown in the TOC, form reference included
    /// (e.g. `"#6849: Exhibit H-3"`).
    pub fn form_name(&self) -> String {
        format!("#{}: {}", self.form_id, self.title)
    }
}

// ── TocLocator ───────────────────────────────────────────────────────────────

/// Finds the pages that hold TOC rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct TocLocator {
    scan: TocScan,
}

impl TocLocator {
    pub fn new(scan: TocScan) -> Self {
        Self { scan }
    }

    /// Returns the 1-based numbers of every TOC page, in page order.
    ///
    /// With [`TocScan::Full`] all pages are tested, so a form body that echoes
    /// a `#nnnn:` heading is reported too. [`TocScan::StopAfterGap`] stops at
    /// the first page without a match once the TOC run has started.
    pub fn locate<S: PageTextSource + ?Sized>(&self, source: &S) -> Vec<u32> {
        let mut pages = Vec::new();

        for page_number in 1..=source.page_count() {
            if Self::is_toc_text(&source.page_text(page_number)) {
                pages.push(page_number);
            } else if self.scan == TocScan::StopAfterGap && !pages.is_empty() {
                debug!(page = page_number, "TOC run ended");
                break;
            }
        }

        debug!(?pages, "TOC pages located");
        pages
    }

    /// Whether `text` contains at least one `#<digits>:` line.
    pub fn is_toc_text(text: &str) -> bool {
        TOC_SIGNATURE.is_match(text)
    }
}

// ── TocParser ────────────────────────────────────────────────────────────────

/// Extracts ordered [`TocEntry`] rows from TOC pages.
#[derive(Debug, Clone, Copy, Default)]
pub struct TocParser;

impl TocParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse every page in `toc_pages`, keeping the order rows appear in.
    pub fn parse<S: PageTextSource + ?Sized>(&self, source: &S, toc_pages: &[u32]) -> Vec<TocEntry> {
        toc_pages
            .iter()
            .flat_map(|&page_number| {
                let entries = self.parse_page_text(&source.page_text(page_number));
                debug!(page = page_number, entries = entries.len(), "TOC page parsed");
                entries
            })
            .collect()
    }

    /// Parse the text of a single TOC page.
    ///
    /// The page is cut into chunks, each starting at a `#<digits>:` line and
    /// running up to the next one, so a title that wraps onto following lines
    /// is read as one row. Rows are matched against the dot-leader pattern
    /// first; if no chunk on the page has a dot leader, the leader-less
    /// pattern is tried on each row's own line only, so footers and form
    /// body text below a row never supply its page number.
    pub fn parse_page_text(&self, text: &str) -> Vec<TocEntry> {
        let chunks = Self::entry_chunks(text);

        let with_leader: Vec<TocEntry> = chunks
            .iter()
            .filter_map(Self::match_leader)
            .collect();
        if !with_leader.is_empty() {
            return with_leader;
        }

        chunks
            .iter()
            .filter_map(Self::match_without_leader)
            .collect()
    }

    /// Split page text into one whitespace-normalised string per TOC row.
    /// Text above the first row (page headers) is dropped.
    fn entry_chunks(text: &str) -> Vec<Chunk> {
        let mut chunks: Vec<Chunk> = Vec::new();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if TOC_LINE_START.is_match(line) {
                chunks.push(Chunk {
                    first_line: line.to_string(),
                    joined: line.to_string(),
                });
            } else if let Some(current) = chunks.last_mut() {
                current.joined.push(' ');
                current.joined.push_str(line);
            }
        }

        chunks
    }

    fn match_leader(chunk: &Chunk) -> Option<TocEntry> {
        let caps = TOC_ENTRY.captures(&chunk.joined)?;
        Self::entry_from(&caps["id"], &caps["title"], &caps["page"])
    }

    fn match_without_leader(chunk: &Chunk) -> Option<TocEntry> {
        let caps = TOC_ENTRY_NO_LEADER.captures(&chunk.first_line)?;
        Self::entry_from(&caps["id"], &caps["title"], &caps["page"])
    }

    fn entry_from(id: &str, title: &str, page: &str) -> Option<TocEntry> {
        // Oversized page numbers are noise, not a real start page.
        let start_page = page.parse::<u32>().ok()?;
        let title = title.split_whitespace().collect::<Vec<_>>().join(" ");
        if title.is_empty() {
            return None;
        }
        Some(TocEntry {
            form_id: id.to_string(),
            title,
            start_page,
        })
    }
}

struct Chunk {
    first_line: String,
    joined: String,
}
