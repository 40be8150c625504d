//! # accsplit
//!
//! Split a multi-form "ACC Build" PDF export into one PDF per form.
//!
//! ## What this crate does
//!
//! 1. **Locate the TOC**: scans every page's text for lines that start with a
//!    `#<digits>:` form reference.
//! 2. **Parse the TOC**: reads `(form id, title, start page)` entries across
//!    dot leaders, wrapped titles and the occasional leader-less row.
//! 3. **Compute page ranges**: turns the ordered entries into contiguous,
//!    inclusive page ranges, the last one running to the end of the document.
//! 4. **Name the output**: slugifies each title into a filesystem-safe stem,
//!    applies user removal patterns (`*` wildcard) and the prefix/suffix.
//! 5. **Group by metadata**: optionally reads `Template`, `Location` and
//!    `Category` labels from the form body to build a folder path.
//! 6. **Assemble**: copies each page range into its own PDF and writes them
//!    into a zip archive, flagging any colliding names in the batch.
//!
//! ## Quick example
//!
//! ```no_run
//! use accsplit::{PdfDocument, SplitAssembler, SplitConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let doc = PdfDocument::from_path("acc_build.pdf")?;
//! let config = SplitConfig {
//!     strip_leading_id: true,
//!     filename_prefix: "J-".into(),
//!     ..Default::default()
//! };
//!
//! let assembler = SplitAssembler::new(&config)?;
//! for row in assembler.preview("acc_build.pdf", &doc).rows {
//!     println!("{}: pages {}, {}", row.form_name, row.pages, row.path);
//! }
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

mod archive;
mod assembler;
mod document;
mod metadata;
mod naming;
mod patterns;
mod ranges;
mod toc;

pub use archive::{write_archive_to_path, write_entries};
pub use assembler::{
    ArchiveEntry, BatchReport, DocumentOutcome, DocumentPreview, DocumentReport, DocumentWarning,
    PreviewRow, SplitAssembler,
};
pub use document::{PageRangeSource, PageTextSource, PdfDocument};
pub use metadata::{FormMetadata, MetadataExtractor, UNKNOWN};
pub use naming::{
    build_name, find_duplicates, parse_removal_patterns, sanitize_folder, slugify,
    strip_leading_id, OutputName, OutputNameRequest, RemovalPattern,
};
pub use ranges::{compute_ranges, FormSplit, RangePlan, SkipReason, SkippedEntry};
pub use toc::{TocEntry, TocLocator, TocParser};

// ── Configuration ────────────────────────────────────────────────────────────

/// How output files are grouped into folders inside the archive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    /// Every file sits at the archive root.
    #[default]
    None,
    /// `{template}/{file}`
    Template,
    /// `{location}/{category}/{file}`
    LocationCategory,
}

/// Which pages the metadata labels are read from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataScope {
    /// One metadata record for the whole source document.
    Document,
    /// A separate metadata record read from each split's own pages.
    #[default]
    Split,
}

/// Stop condition for the TOC page scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TocScan {
    /// Test every page of the document.
    #[default]
    Full,
    /// Stop at the first non-matching page once a TOC page has been seen.
    StopAfterGap,
}

/// Runtime configuration for [`SplitAssembler`].
///
/// Every field has a default, so a JSON config file only needs the keys it
/// wants to change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Drop the leading `#<digits>:` form reference from output filenames.
    /// The displayed form name always keeps it.
    pub strip_leading_id: bool,

    /// Comma- or newline-separated removal tokens. `*` matches any run of
    /// characters (shortest match); everything else is literal. Matching
    /// ignores case. Tokens are applied to the title before slugifying and
    /// again to the slug, so `ACC Build` and `ACC_Build` both work.
    pub removal_patterns: String,

    /// Prepended to every filename stem.
    pub filename_prefix: String,

    /// Appended to every filename stem, before `.pdf`.
    pub filename_suffix: String,

    /// Folder grouping inside the archive.
    pub group_by: GroupBy,

    /// Whether grouping metadata is read per document or per split.
    pub metadata_scope: MetadataScope,

    /// TOC page scan policy.
    pub toc_scan: TocScan,

    /// Number of pages, starting at the "References and Attachments" page,
    /// that are searched for `Location` and `Category` labels.
    pub location_window_pages: usize,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            strip_leading_id: false,
            removal_patterns: String::new(),
            filename_prefix: String::new(),
            filename_suffix: String::new(),
            group_by: GroupBy::None,
            metadata_scope: MetadataScope::Split,
            toc_scan: TocScan::Full,
            location_window_pages: 3,
        }
    }
}

impl SplitConfig {
    /// Load a configuration from a JSON file. Missing keys keep their
    /// defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        Self::from_json_slice(&data)
    }

    /// Parse a configuration from JSON bytes.
    pub fn from_json_slice(data: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(data)?)
    }
}

// ── Error type ───────────────────────────────────────────────────────────────

/// Every error that this crate can produce.
///
/// Problems with the *text* of a document (no TOC, unparsable rows, missing
/// labels) are not errors; they surface as [`DocumentWarning`]s or the
/// [`UNKNOWN`] sentinel.
#[derive(Error, Debug)]
pub enum SplitError {
    /// A filesystem I/O error occurred (e.g. when loading or saving a file).
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The input bytes do not form a structurally valid PDF document.
    #[error("Invalid PDF: {0}")]
    InvalidPdf(String),

    /// The underlying lopdf parser returned an error.
    #[error("PDF parse error: {0}")]
    ParseError(#[from] lopdf::Error),

    /// A page range request does not fit inside the document.
    #[error("Page range {first}-{last} is outside the document (1-{page_count})")]
    PageRange {
        first: u32,
        last: u32,
        page_count: u32,
    },

    /// The zip writer failed.
    #[error("Archive error: {0}")]
    ArchiveError(#[from] zip::result::ZipError),

    /// A configuration file could not be parsed.
    #[error("Invalid configuration: {0}")]
    ConfigError(#[from] serde_json::Error),

    /// A removal token could not be compiled into a pattern.
    #[error("Invalid removal pattern '{0}': {1}")]
    PatternError(String, String),
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, SplitError>;
