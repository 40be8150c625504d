//! Print the split plan of one PDF and optionally write the archive.
//!
//! Usage:
//!   cargo run --example preview_plan -- report.pdf
//!   cargo run --example preview_plan -- report.pdf --strip-id --zip forms.zip

use accsplit::{write_archive_to_path, GroupBy, PdfDocument, SplitAssembler, SplitConfig};
use std::{env, process};

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <pdf> [--strip-id] [--group] [--zip <out.zip>]", args[0]);
        process::exit(1);
    }

    let pdf_path = &args[1];
    let zip_path: Option<String> = args
        .windows(2)
        .find(|w| w[0] == "--zip")
        .map(|w| w[1].clone());

    let config = SplitConfig {
        strip_leading_id: args.contains(&"--strip-id".to_string()),
        group_by: if args.contains(&"--group".to_string()) {
            GroupBy::LocationCategory
        } else {
            GroupBy::None
        },
        ..Default::default()
    };

    let doc = PdfDocument::from_path(pdf_path).unwrap_or_else(|e| {
        eprintln!("Cannot load PDF: {e}");
        process::exit(1);
    });
    let assembler = SplitAssembler::new(&config).unwrap_or_else(|e| {
        eprintln!("Bad configuration: {e}");
        process::exit(1);
    });

    let plan = assembler.plan_splits(&doc);
    println!("{} form(s) in {pdf_path}:", plan.splits.len());
    for row in assembler.preview(pdf_path, &doc).rows {
        let flag = if row.duplicate { " (duplicate)" } else { "" };
        println!("  {:>9}  {}{flag}", row.pages, row.path);
    }
    for skipped in &plan.skipped {
        println!("  skipped {}: {}", skipped.entry.form_name(), skipped.reason);
    }

    if let Some(zip_path) = zip_path {
        let report = assembler.assemble(pdf_path, &doc).unwrap_or_else(|e| {
            eprintln!("Split failed: {e}");
            process::exit(1);
        });
        write_archive_to_path(&report.entries, &zip_path).unwrap_or_else(|e| {
            eprintln!("Write failed: {e}");
            process::exit(1);
        });
        println!("Saved {} file(s) to {zip_path}", report.entries.len());
    }
}
