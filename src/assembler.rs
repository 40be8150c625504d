use crate::document::{PageRangeSource, PageTextSource};
use crate::metadata::{FormMetadata, MetadataExtractor};
use crate::naming::{build_name, find_duplicates, parse_removal_patterns};
use crate::naming::{OutputName, OutputNameRequest, RemovalPattern};
use crate::ranges::{compute_ranges, FormSplit, RangePlan, SkippedEntry};
use crate::toc::{TocLocator, TocParser};
use crate::{GroupBy, MetadataScope, Result, SplitConfig};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use tracing::{info, warn};

// ── Report types ──────────────────────────────────────────────────────────────

/// One planned output file, as shown before anything is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewRow {
    /// Name of the source document the form comes from.
    pub source: String,
    /// Untouched TOC form name, form reference included.
    pub form_name: String,
    /// Inclusive page range, e.g. `"4–7"`.
    pub pages: String,
    pub start_page: u32,
    pub end_page: u32,
    /// Folder inside the archive, when grouping is enabled.
    pub folder: Option<String>,
    /// `prefix + stem + suffix + ".pdf"`.
    pub filename: String,
    /// Full archive path, `folder/filename` or just `filename`.
    pub path: String,
    /// Metadata read for grouping, when grouping is enabled.
    pub metadata: Option<FormMetadata>,
    /// Another row of the same batch has the same path.
    pub duplicate: bool,
}

/// One output PDF ready for the archive.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub path: String,
    pub bytes: Vec<u8>,
    /// Another entry of the same batch has the same path.
    pub duplicate: bool,
}

/// A non-fatal problem found while planning one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum DocumentWarning {
    /// No TOC page was found, or none of its rows produced a split.
    NoFormsDetected,
    /// A TOC row was dropped by range validation.
    SkippedEntry(SkippedEntry),
}

impl fmt::Display for DocumentWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentWarning::NoFormsDetected => write!(f, "no forms detected"),
            DocumentWarning::SkippedEntry(skipped) => write!(
                f,
                "skipped '{}' (page {}): {}",
                skipped.entry.form_name(),
                skipped.entry.start_page,
                skipped.reason
            ),
        }
    }
}

/// Planned rows and warnings for one document, before any page is copied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentPreview {
    pub source: String,
    pub rows: Vec<PreviewRow>,
    pub warnings: Vec<DocumentWarning>,
}

/// Everything produced for one source document.
#[derive(Debug, Clone)]
pub struct DocumentReport {
    pub source: String,
    pub rows: Vec<PreviewRow>,
    pub entries: Vec<ArchiveEntry>,
    pub warnings: Vec<DocumentWarning>,
}

/// Outcome of one document in a batch.
#[derive(Debug, Clone)]
pub enum DocumentOutcome {
    Split(DocumentReport),
    /// The PDF capability failed; the rest of the batch was still processed.
    Failed { source: String, error: String },
}

/// Result of [`SplitAssembler::assemble_batch`].
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub documents: Vec<DocumentOutcome>,
    /// Archive paths used by more than one entry of the batch.
    pub duplicates: BTreeSet<String>,
}

impl BatchReport {
    /// All archive entries of the batch, in document then TOC order.
    pub fn entries(&self) -> impl Iterator<Item = &ArchiveEntry> {
        self.reports().flat_map(|r| r.entries.iter())
    }

    /// All preview rows of the batch, in document then TOC order.
    pub fn rows(&self) -> impl Iterator<Item = &PreviewRow> {
        self.reports().flat_map(|r| r.rows.iter())
    }

    /// Reports of the documents that were split.
    pub fn reports(&self) -> impl Iterator<Item = &DocumentReport> {
        self.documents.iter().filter_map(|d| match d {
            DocumentOutcome::Split(report) => Some(report),
            DocumentOutcome::Failed { .. } => None,
        })
    }

    /// `(source, error)` for every document that failed.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.documents.iter().filter_map(|d| match d {
            DocumentOutcome::Failed { source, error } => Some((source.as_str(), error.as_str())),
            DocumentOutcome::Split(_) => None,
        })
    }
}

// ── SplitAssembler ────────────────────────────────────────────────────────────

/// Drives TOC location, parsing, range computation, metadata and naming for
/// each source document.
///
/// ```no_run
/// use accsplit::{write_entries, PdfDocument, SplitAssembler, SplitConfig};
///
/// let config = SplitConfig::default();
/// let assembler = SplitAssembler::new(&config).unwrap();
/// let docs = vec![("a.pdf".to_string(), PdfDocument::from_path("a.pdf").unwrap())];
///
/// let batch = assembler.assemble_batch(&docs);
/// let entries: Vec<_> = batch.entries().cloned().collect();
/// let zip_bytes = write_entries(&entries).unwrap();
/// ```
pub struct SplitAssembler<'a> {
    config: &'a SplitConfig,
    patterns: Vec<RemovalPattern>,
    locator: TocLocator,
    parser: TocParser,
    metadata: MetadataExtractor,
}

impl<'a> SplitAssembler<'a> {
    /// Compiles the removal patterns of `config` once for every document.
    pub fn new(config: &'a SplitConfig) -> Result<Self> {
        Ok(Self {
            config,
            patterns: parse_removal_patterns(&config.removal_patterns)?,
            locator: TocLocator::new(config.toc_scan),
            parser: TocParser::new(),
            metadata: MetadataExtractor::new(config.location_window_pages),
        })
    }

    pub fn config(&self) -> &SplitConfig {
        self.config
    }

    pub fn patterns(&self) -> &[RemovalPattern] {
        &self.patterns
    }

    /// Locate and parse the TOC and turn it into page ranges.
    pub fn plan_splits<S: PageTextSource + ?Sized>(&self, doc: &S) -> RangePlan {
        let toc_pages = self.locator.locate(doc);
        let entries = self.parser.parse(doc, &toc_pages);
        compute_ranges(&entries, doc.page_count())
    }

    /// Output filename for a form name under the active configuration.
    pub fn build_name(&self, form_name: &str) -> OutputName {
        build_name(&OutputNameRequest {
            raw_title: form_name,
            strip_leading_id: self.config.strip_leading_id,
            patterns: &self.patterns,
            prefix: &self.config.filename_prefix,
            suffix: &self.config.filename_suffix,
        })
    }

    /// Plan one document without copying any pages. Rows sharing a path are
    /// flagged as duplicates.
    pub fn preview<S: PageTextSource + ?Sized>(&self, source: &str, doc: &S) -> DocumentPreview {
        let mut preview = self.preview_document(source, doc);
        mark_duplicates(preview.rows.iter_mut());
        preview
    }

    /// Plan several documents, flagging duplicate paths across all of them.
    pub fn preview_batch<S: PageTextSource>(&self, documents: &[(String, S)]) -> Vec<DocumentPreview> {
        let mut previews: Vec<DocumentPreview> = documents
            .iter()
            .map(|(source, doc)| self.preview_document(source, doc))
            .collect();
        mark_duplicates(previews.iter_mut().flat_map(|p| p.rows.iter_mut()));
        previews
    }

    /// Split one document into archive entries.
    ///
    /// Duplicate flags only cover this document; use
    /// [`assemble_batch`](Self::assemble_batch) to check a whole upload.
    pub fn assemble<D: PageRangeSource + ?Sized>(&self, source: &str, doc: &D) -> Result<DocumentReport> {
        let (planned, warnings) = self.plan_document(source, doc);

        let mut rows = Vec::with_capacity(planned.len());
        let mut entries = Vec::with_capacity(planned.len());
        for (split, row) in planned {
            let bytes = doc.extract_page_range(split.start_page, split.end_page)?;
            entries.push(ArchiveEntry {
                path: row.path.clone(),
                bytes,
                duplicate: false,
            });
            rows.push(row);
        }

        let mut report = DocumentReport {
            source: source.to_string(),
            rows,
            entries,
            warnings,
        };
        let duplicates = find_duplicates(report.rows.iter().map(|r| &r.path));
        apply_duplicates(&mut report, &duplicates);

        info!(
            source,
            forms = report.entries.len(),
            warnings = report.warnings.len(),
            "document split"
        );
        Ok(report)
    }

    /// Split every document, then check all archive paths of the batch for
    /// collisions. A document whose pages cannot be copied is reported as
    /// failed and the others are still processed.
    pub fn assemble_batch<D: PageRangeSource>(&self, documents: &[(String, D)]) -> BatchReport {
        let mut outcomes: Vec<DocumentOutcome> = documents
            .iter()
            .map(|(source, doc)| match self.assemble(source, doc) {
                Ok(report) => DocumentOutcome::Split(report),
                Err(e) => {
                    warn!(source = %source, error = %e, "document failed");
                    DocumentOutcome::Failed {
                        source: source.clone(),
                        error: e.to_string(),
                    }
                }
            })
            .collect();

        let duplicates = find_duplicates(outcomes.iter().flat_map(|o| match o {
            DocumentOutcome::Split(report) => report.rows.iter().map(|r| r.path.as_str()).collect::<Vec<_>>(),
            DocumentOutcome::Failed { .. } => Vec::new(),
        }));

        for outcome in &mut outcomes {
            if let DocumentOutcome::Split(report) = outcome {
                apply_duplicates(report, &duplicates);
            }
        }
        for path in &duplicates {
            warn!(path = %path, "duplicate archive path");
        }

        BatchReport {
            documents: outcomes,
            duplicates,
        }
    }

    // ── Private ───────────────────────────────────────────────────────────────

    fn preview_document<S: PageTextSource + ?Sized>(&self, source: &str, doc: &S) -> DocumentPreview {
        let (planned, warnings) = self.plan_document(source, doc);
        DocumentPreview {
            source: source.to_string(),
            rows: planned.into_iter().map(|(_, row)| row).collect(),
            warnings,
        }
    }

    fn plan_document<S: PageTextSource + ?Sized>(
        &self,
        source: &str,
        doc: &S,
    ) -> (Vec<(FormSplit, PreviewRow)>, Vec<DocumentWarning>) {
        let plan = self.plan_splits(doc);

        let mut warnings: Vec<DocumentWarning> = plan
            .skipped
            .iter()
            .cloned()
            .map(DocumentWarning::SkippedEntry)
            .collect();
        if plan.splits.is_empty() {
            warn!(source, "no forms detected");
            warnings.push(DocumentWarning::NoFormsDetected);
        }

        let group_by = self.config.group_by;
        let document_metadata = match (group_by, self.config.metadata_scope) {
            (GroupBy::None, _) | (_, MetadataScope::Split) => None,
            (_, MetadataScope::Document) => Some(self.metadata.extract(doc, 1, doc.page_count())),
        };

        let planned = plan
            .splits
            .into_iter()
            .map(|split| {
                let metadata = match group_by {
                    GroupBy::None => None,
                    _ => Some(match &document_metadata {
                        Some(meta) => meta.clone(),
                        None => self.metadata.extract(doc, split.start_page, split.end_page),
                    }),
                };
                let folder = metadata.as_ref().and_then(|m| m.folder(group_by));
                let name = self.build_name(&split.form_name());
                let path = match &folder {
                    Some(folder) => format!("{folder}/{}", name.full),
                    None => name.full.clone(),
                };

                let row = PreviewRow {
                    source: source.to_string(),
                    form_name: split.form_name(),
                    pages: split.page_label(),
                    start_page: split.start_page,
                    end_page: split.end_page,
                    folder,
                    filename: name.full,
                    path,
                    metadata,
                    duplicate: false,
                };
                (split, row)
            })
            .collect();

        (planned, warnings)
    }
}

fn mark_duplicates<'r>(rows: impl Iterator<Item = &'r mut PreviewRow>) {
    let mut rows: Vec<&mut PreviewRow> = rows.collect();
    let duplicates = find_duplicates(rows.iter().map(|r| r.path.as_str()));
    for row in &mut rows {
        row.duplicate = duplicates.contains(&row.path);
    }
}

fn apply_duplicates(report: &mut DocumentReport, duplicates: &BTreeSet<String>) {
    for row in &mut report.rows {
        row.duplicate = duplicates.contains(&row.path);
    }
    for entry in &mut report.entries {
        entry.duplicate = duplicates.contains(&entry.path);
    }
}
