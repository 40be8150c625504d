// Integration tests for accsplit.
//
// The PDFs used here are generated in memory with lopdf: every text line is
// its own BT/ET block, so lopdf's text extraction returns one line per block.

use accsplit::{
    write_entries, GroupBy, PageRangeSource, PageTextSource, PdfDocument, SplitAssembler,
    SplitConfig, SplitError, TocScan,
};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream, StringFormat};
use std::io::{Cursor, Read};

// ── Fixtures ──────────────────────────────────────────────────────────────────

/// Build a PDF with one page per element of `pages`, each page holding the
/// given text lines.
fn build_pdf(pages: &[Vec<String>]) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
        ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
    ]));
    let resources_id = doc.add_object(Dictionary::from_iter(vec![(
        "Font",
        Object::Dictionary(Dictionary::from_iter(vec![("F1", Object::Reference(font_id))])),
    )]));

    let mut page_ids = Vec::new();
    for lines in pages {
        let mut operations = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new(
                "Tf",
                vec![Object::Name(b"F1".to_vec()), Object::Integer(10)],
            ));
            operations.push(Operation::new(
                "Td",
                vec![Object::Integer(50), Object::Integer(750 - 14 * i as i64)],
            ));
            operations.push(Operation::new(
                "Tj",
                vec![Object::String(line.clone().into_bytes(), StringFormat::Literal)],
            ));
            operations.push(Operation::new("ET", vec![]));
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));

        let page_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(612),
                    Object::Integer(792),
                ]),
            ),
            ("Resources", Object::Reference(resources_id)),
            ("Contents", Object::Reference(content_id)),
        ]));
        page_ids.push(page_id);
    }

    let pages_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Count", Object::Integer(page_ids.len() as i64)),
        (
            "Kids",
            Object::Array(page_ids.iter().map(|id| Object::Reference(*id)).collect()),
        ),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

fn lines(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// A 12-page export: cover, TOC, then three forms starting at 3, 6 and 10.
fn acc_build_pdf() -> Vec<u8> {
    let mut pages = vec![
        lines(&["ACC Build Report", "Project P23459"]),
        lines(&[
            "Table of Contents",
            "#6849: ACC/DCC-D4.1 (P23459AD0003): 03.04 Exhibit H-3 ........ 3",
            "#6850: Startup Checklist ........ 6",
            "#6851: Functional Test ........ 10",
        ]),
    ];
    for page in 3..=12 {
        let mut body = vec![format!("Page {page} body")];
        if page == 3 || page == 6 || page == 10 {
            body.push("Template: Commissioning".to_string());
            body.push("References and Attachments".to_string());
            body.push(format!("Location: Building {}", if page == 10 { "B" } else { "A" }));
            body.push("Category: HVAC".to_string());
        }
        pages.push(body);
    }
    build_pdf(&pages)
}

fn page_markers(pdf: &[u8]) -> Vec<String> {
    let doc = PdfDocument::from_bytes(pdf).unwrap();
    (1..=doc.page_count())
        .map(|p| {
            doc.page_text(p)
                .lines()
                .map(str::trim)
                .find(|l| !l.is_empty())
                .unwrap_or_default()
                .to_string()
        })
        .collect()
}

fn zip_names(bytes: Vec<u8>) -> Vec<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}

// ── SplitConfig ───────────────────────────────────────────────────────────────

#[test]
fn default_config_matches_documented_defaults() {
    let cfg = SplitConfig::default();
    assert!(!cfg.strip_leading_id);
    assert!(cfg.removal_patterns.is_empty());
    assert_eq!(cfg.group_by, GroupBy::None);
    assert_eq!(cfg.toc_scan, TocScan::Full);
    assert_eq!(cfg.location_window_pages, 3);
}

#[test]
fn json_config_fills_missing_keys_with_defaults() {
    let cfg = SplitConfig::from_json_slice(
        br#"{ "strip_leading_id": true, "group_by": "location_category", "removal_patterns": "ACC Build, 03.*_" }"#,
    )
    .unwrap();
    assert!(cfg.strip_leading_id);
    assert_eq!(cfg.group_by, GroupBy::LocationCategory);
    assert_eq!(cfg.removal_patterns, "ACC Build, 03.*_");
    assert_eq!(cfg.filename_prefix, "");
}

#[test]
fn json_config_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("accsplit.json");
    std::fs::write(&path, r#"{ "filename_prefix": "J-", "toc_scan": "stop_after_gap" }"#).unwrap();

    let cfg = SplitConfig::from_json_file(&path).unwrap();
    assert_eq!(cfg.filename_prefix, "J-");
    assert_eq!(cfg.toc_scan, TocScan::StopAfterGap);
}

#[test]
fn bad_json_config_is_a_config_error() {
    let err = SplitConfig::from_json_slice(b"{ not json").unwrap_err();
    assert!(matches!(err, SplitError::ConfigError(_)));
}

// ── SplitError display ────────────────────────────────────────────────────────

#[test]
fn error_display_is_non_empty() {
    let errors: &[SplitError] = &[
        SplitError::InvalidPdf("test".into()),
        SplitError::PageRange {
            first: 3,
            last: 9,
            page_count: 5,
        },
        SplitError::PatternError("x".into(), "reason".into()),
    ];
    for e in errors {
        assert!(!e.to_string().is_empty(), "empty display for {e:?}");
    }
}

// ── PdfDocument ───────────────────────────────────────────────────────────────

#[test]
fn from_bytes_rejects_empty_slice() {
    assert!(PdfDocument::from_bytes(&[]).is_err());
}

#[test]
fn from_bytes_rejects_non_pdf() {
    assert!(PdfDocument::from_bytes(b"not a pdf").is_err());
}

#[test]
fn reads_page_text_line_by_line() {
    let doc = PdfDocument::from_bytes(&acc_build_pdf()).unwrap();
    assert_eq!(doc.page_count(), 12);

    let toc = doc.page_text(2);
    assert!(toc.lines().any(|l| l.trim().starts_with("#6850: Startup Checklist")));
    assert!(doc.page_text(5).contains("Page 5 body"));
}

#[test]
fn missing_page_has_no_text() {
    let doc = PdfDocument::from_bytes(&acc_build_pdf()).unwrap();
    assert_eq!(doc.page_text(99), "");
}

#[test]
fn extracts_exactly_the_requested_pages() {
    let doc = PdfDocument::from_bytes(&acc_build_pdf()).unwrap();
    let part = doc.extract_page_range(6, 9).unwrap();
    assert_eq!(
        page_markers(&part),
        vec!["Page 6 body", "Page 7 body", "Page 8 body", "Page 9 body"]
    );
}

fn root_page_count(pdf: &[u8]) -> i64 {
    let doc = Document::load_mem(pdf).unwrap();
    let root = doc.catalog().unwrap().get(b"Pages").unwrap().as_reference().unwrap();
    doc.get_dictionary(root).unwrap().get(b"Count").unwrap().as_i64().unwrap()
}

#[test]
fn extracted_page_tree_counts_kept_pages() {
    let doc = PdfDocument::from_bytes(&acc_build_pdf()).unwrap();
    assert_eq!(root_page_count(&doc.extract_page_range(6, 9).unwrap()), 4);
}

#[test]
fn stale_source_count_is_rewritten() {
    let mut raw = Document::load_mem(&acc_build_pdf()).unwrap();
    let root = raw.catalog().unwrap().get(b"Pages").unwrap().as_reference().unwrap();
    raw.get_dictionary_mut(root).unwrap().set("Count", Object::Integer(99));

    let doc = PdfDocument::from_document(raw).unwrap();
    let part = doc.extract_page_range(10, 12).unwrap();
    assert_eq!(root_page_count(&part), 3);
    assert_eq!(page_markers(&part), vec!["Page 10 body", "Page 11 body", "Page 12 body"]);
}

#[test]
fn rejects_ranges_outside_the_document() {
    let doc = PdfDocument::from_bytes(&acc_build_pdf()).unwrap();
    assert!(matches!(
        doc.extract_page_range(10, 13),
        Err(SplitError::PageRange { page_count: 12, .. })
    ));
    assert!(doc.extract_page_range(0, 2).is_err());
    assert!(doc.extract_page_range(5, 4).is_err());
}

// ── End to end ────────────────────────────────────────────────────────────────

#[test]
fn splits_export_into_named_forms() {
    let config = SplitConfig {
        strip_leading_id: true,
        filename_prefix: "J-".into(),
        ..Default::default()
    };
    let assembler = SplitAssembler::new(&config).unwrap();
    let doc = PdfDocument::from_bytes(&acc_build_pdf()).unwrap();

    let report = assembler.assemble("export.pdf", &doc).unwrap();
    assert!(report.warnings.is_empty());

    let ranges: Vec<&str> = report.rows.iter().map(|r| r.pages.as_str()).collect();
    assert_eq!(ranges, vec!["3–5", "6–9", "10–12"]);

    let paths: Vec<&str> = report.entries.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(
        paths,
        vec![
            "J-ACCDCCD41_P23459AD0003_0304_Exhibit_H3.pdf",
            "J-Startup_Checklist.pdf",
            "J-Functional_Test.pdf",
        ]
    );

    assert_eq!(
        page_markers(&report.entries[2].bytes),
        vec!["Page 10 body", "Page 11 body", "Page 12 body"]
    );
}

#[test]
fn grouped_archive_round_trip() {
    let config = SplitConfig {
        strip_leading_id: true,
        removal_patterns: "Checklist".into(),
        group_by: GroupBy::LocationCategory,
        ..Default::default()
    };
    let assembler = SplitAssembler::new(&config).unwrap();
    let docs = vec![(
        "export.pdf".to_string(),
        PdfDocument::from_bytes(&acc_build_pdf()).unwrap(),
    )];

    let batch = assembler.assemble_batch(&docs);
    assert!(batch.duplicates.is_empty());

    let entries: Vec<_> = batch.entries().cloned().collect();
    let bytes = write_entries(&entries).unwrap();
    assert_eq!(
        zip_names(bytes.clone()),
        vec![
            "Building A/HVAC/ACCDCCD41_P23459AD0003_0304_Exhibit_H3.pdf",
            "Building A/HVAC/Startup.pdf",
            "Building B/HVAC/Functional_Test.pdf",
        ]
    );

    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut pdf = Vec::new();
    archive
        .by_name("Building A/HVAC/Startup.pdf")
        .unwrap()
        .read_to_end(&mut pdf)
        .unwrap();
    assert_eq!(page_markers(&pdf).len(), 4);
}

#[test]
fn same_export_twice_collides_and_keeps_every_entry() {
    let config = SplitConfig::default();
    let assembler = SplitAssembler::new(&config).unwrap();
    let bytes = acc_build_pdf();
    let docs = vec![
        ("first.pdf".to_string(), PdfDocument::from_bytes(&bytes).unwrap()),
        ("second.pdf".to_string(), PdfDocument::from_bytes(&bytes).unwrap()),
    ];

    let batch = assembler.assemble_batch(&docs);
    assert_eq!(batch.duplicates.len(), 3);
    assert!(batch.entries().all(|e| e.duplicate));

    let entries: Vec<_> = batch.entries().cloned().collect();
    let names = zip_names(write_entries(&entries).unwrap());
    assert_eq!(names.len(), 6);
    assert!(names.contains(&"6850_Startup_Checklist (2).pdf".to_string()));
}

#[test]
fn document_without_toc_yields_no_entries() {
    let config = SplitConfig::default();
    let assembler = SplitAssembler::new(&config).unwrap();
    let doc = PdfDocument::from_bytes(&build_pdf(&[lines(&["Just a letter"]), lines(&["Page two"])]))
        .unwrap();

    assert!(assembler.plan_splits(&doc).splits.is_empty());
    let report = assembler.assemble("letter.pdf", &doc).unwrap();
    assert!(report.entries.is_empty());
    assert_eq!(report.warnings.len(), 1);
}

#[test]
fn save_archive_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let config = SplitConfig::default();
    let assembler = SplitAssembler::new(&config).unwrap();
    let doc = PdfDocument::from_bytes(&acc_build_pdf()).unwrap();
    let report = assembler.assemble("export.pdf", &doc).unwrap();

    let target = dir.path().join("forms.zip");
    accsplit::write_archive_to_path(&report.entries, &target).unwrap();
    assert_eq!(zip_names(std::fs::read(&target).unwrap()).len(), 3);
}

// ── Fixture-based tests (ignored without real exports) ────────────────────────

/// To run: place a real ACC Build export at `tests/fixtures/acc_build.pdf`
/// and run with `--include-ignored`.
#[test]
#[ignore]
fn fixture_acc_build_export() {
    let bytes = std::fs::read("tests/fixtures/acc_build.pdf")
        .expect("place tests/fixtures/acc_build.pdf to run this test");

    let doc = PdfDocument::from_bytes(&bytes).unwrap();
    let config = SplitConfig::default();
    let plan = SplitAssembler::new(&config).unwrap().plan_splits(&doc);
    assert!(!plan.splits.is_empty());
    for pair in plan.splits.windows(2) {
        assert_eq!(pair[0].end_page + 1, pair[1].start_page);
    }
    assert_eq!(plan.splits.last().unwrap().end_page, doc.page_count());
}
