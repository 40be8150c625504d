use crate::{Result, SplitError};
use lopdf::{Document, Object, ObjectId};
use std::path::Path;
use tracing::{debug, warn};

// ── Capabilities ──────────────────────────────────────────────────────────────

/// Read access to the plain text of a document, one page at a time.
///
/// Page numbers are 1-based. Implementations return an empty string for a
/// page that does not exist or whose text cannot be decoded; callers treat
/// that page as having no content rather than failing.
pub trait PageTextSource {
    /// Number of pages in the document.
    fn page_count(&self) -> u32;

    /// Plain text of `page_number`, lines separated by `\n`.
    fn page_text(&self, page_number: u32) -> String;
}

/// A [`PageTextSource`] that can also copy a page range into a new document.
pub trait PageRangeSource: PageTextSource {
    /// Serialize a new document containing exactly pages `first..=last`, in
    /// their original order.
    fn extract_page_range(&self, first: u32, last: u32) -> Result<Vec<u8>>;
}

/// Pre-extracted page text, index 0 being page 1.
impl<T: AsRef<str>> PageTextSource for [T] {
    fn page_count(&self) -> u32 {
        self.len() as u32
    }

    fn page_text(&self, page_number: u32) -> String {
        page_number
            .checked_sub(1)
            .and_then(|i| self.get(i as usize))
            .map(|t| t.as_ref().to_string())
            .unwrap_or_default()
    }
}

impl<T: AsRef<str>> PageTextSource for Vec<T> {
    fn page_count(&self) -> u32 {
        self.as_slice().page_count()
    }

    fn page_text(&self, page_number: u32) -> String {
        self.as_slice().page_text(page_number)
    }
}

// ── PdfDocument ───────────────────────────────────────────────────────────────

/// A loaded PDF, backed by [`lopdf`].
///
/// ```no_run
/// use accsplit::{PageTextSource, PdfDocument};
///
/// // From a file path
/// let doc = PdfDocument::from_path("acc_build.pdf").unwrap();
///
/// // From an in-memory buffer
/// let bytes = std::fs::read("acc_build.pdf").unwrap();
/// let doc = PdfDocument::from_bytes(&bytes).unwrap();
/// println!("{} pages", doc.page_count());
/// ```
pub struct PdfDocument {
    document: Document,
}

impl PdfDocument {
    /// Load a PDF from the file system.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let doc = Self {
            document: Document::load(path)?,
        };
        doc.validate_structure()?;
        Ok(doc)
    }

    /// Load a PDF from an in-memory byte slice.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let doc = Self {
            document: Document::load_mem(data)?,
        };
        doc.validate_structure()?;
        Ok(doc)
    }

    /// Wrap an already-parsed lopdf document.
    pub fn from_document(document: Document) -> Result<Self> {
        let doc = Self { document };
        doc.validate_structure()?;
        Ok(doc)
    }

    /// Returns a reference to the underlying [`lopdf::Document`].
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Check the elements every split needs: a catalog, at least one page and
    /// a non-empty trailer.
    pub fn validate_structure(&self) -> Result<()> {
        self.document
            .catalog()
            .map_err(|e| SplitError::InvalidPdf(format!("missing or invalid catalog: {e}")))?;

        if self.document.get_pages().is_empty() {
            return Err(SplitError::InvalidPdf("document has no pages".into()));
        }

        if self.document.trailer.is_empty() {
            return Err(SplitError::InvalidPdf("missing trailer dictionary".into()));
        }

        Ok(())
    }
}

impl PageTextSource for PdfDocument {
    fn page_count(&self) -> u32 {
        self.document.get_pages().len() as u32
    }

    fn page_text(&self, page_number: u32) -> String {
        match self.document.extract_text(&[page_number]) {
            Ok(text) => text,
            Err(e) => {
                // Encrypted, image-only or oddly encoded pages simply have no text.
                warn!(page = page_number, error = %e, "page text unavailable");
                String::new()
            }
        }
    }
}

impl PageRangeSource for PdfDocument {
    fn extract_page_range(&self, first: u32, last: u32) -> Result<Vec<u8>> {
        let page_count = self.page_count();
        if first == 0 || first > last || last > page_count {
            return Err(SplitError::PageRange {
                first,
                last,
                page_count,
            });
        }

        let mut part = self.document.clone();
        let outside: Vec<u32> = (1..=page_count)
            .filter(|p| *p < first || *p > last)
            .rev()
            .collect();
        part.delete_pages(&outside);
        let kept = recount_page_tree(&mut part)?;
        if kept != last - first + 1 {
            warn!(first, last, kept, "page tree count differs from requested range");
        }

        // Fonts, images and content streams only used by deleted pages.
        part.prune_objects();
        part.compress();

        let mut buffer = Vec::new();
        part.save_to(&mut buffer)?;
        debug!(first, last, bytes = buffer.len(), "page range extracted");
        Ok(buffer)
    }
}

/// Page tree nesting deeper than this is treated as a reference cycle.
const MAX_PAGE_TREE_DEPTH: usize = 64;

/// Rewrite `/Count` on every node of the page tree from its remaining kids and
/// return the number of pages under the root.
fn recount_page_tree(document: &mut Document) -> Result<u32> {
    let root = document.catalog()?.get(b"Pages")?.as_reference()?;
    Ok(recount_node(document, root, 0))
}

fn recount_node(document: &mut Document, node: ObjectId, depth: usize) -> u32 {
    let kids: Vec<ObjectId> = match document.get_dictionary(node) {
        Ok(dict) if dict.get(b"Type").and_then(Object::as_name).ok() == Some(b"Page".as_slice()) => {
            return 1;
        }
        Ok(dict) => match dict.get(b"Kids").and_then(Object::as_array) {
            Ok(kids) => kids.iter().filter_map(|kid| kid.as_reference().ok()).collect(),
            Err(_) => return 0,
        },
        Err(_) => return 0,
    };
    if depth >= MAX_PAGE_TREE_DEPTH {
        warn!(?node, "page tree too deep, not recounted");
        return 0;
    }

    let count: u32 = kids
        .into_iter()
        .map(|kid| recount_node(document, kid, depth + 1))
        .sum();
    if let Ok(dict) = document.get_dictionary_mut(node) {
        dict.set("Count", Object::Integer(i64::from(count)));
    }
    count
}
