//! Command-line front end: preview and split ACC Build PDF exports.

use accsplit::{
    write_archive_to_path, GroupBy, MetadataScope, PdfDocument, PreviewRow, SplitAssembler,
    SplitConfig, TocScan,
};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "accsplit",
    version,
    about = "Split ACC Build PDF exports into one PDF per form using the embedded table of contents"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the planned filenames and page ranges without writing anything
    Preview(PreviewArgs),
    /// Split the documents and write every form into a zip archive
    Split(SplitArgs),
}

#[derive(Args, Debug)]
struct PreviewArgs {
    /// Source PDF files
    #[arg(required = true, value_name = "PDF")]
    sources: Vec<PathBuf>,

    #[command(flatten)]
    options: NamingOptions,

    /// Print the preview as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct SplitArgs {
    /// Source PDF files
    #[arg(required = true, value_name = "PDF")]
    sources: Vec<PathBuf>,

    #[command(flatten)]
    options: NamingOptions,

    /// Output zip archive
    #[arg(short, long, value_name = "ZIP", default_value = "split_forms.zip")]
    output: PathBuf,
}

#[derive(Args, Debug)]
struct NamingOptions {
    /// JSON configuration file; the flags below override its values
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Drop the leading "#<digits>:" form reference from filenames
    #[arg(long)]
    strip_id: bool,

    /// Comma-separated removal tokens ("*" matches any run of characters,
    /// case-insensitive; applied before and after slugifying)
    #[arg(long, value_name = "PATTERNS")]
    remove: Option<String>,

    /// Filename prefix
    #[arg(long)]
    prefix: Option<String>,

    /// Filename suffix (before ".pdf")
    #[arg(long)]
    suffix: Option<String>,

    /// Folder grouping inside the archive
    #[arg(long, value_enum)]
    group_by: Option<GroupByArg>,

    /// Read grouping metadata once per document or per form
    #[arg(long, value_enum)]
    metadata_scope: Option<ScopeArg>,

    /// Scan every page for TOC rows, or stop after the first gap
    #[arg(long, value_enum)]
    toc_scan: Option<TocScanArg>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum GroupByArg {
    None,
    Template,
    LocationCategory,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum ScopeArg {
    Document,
    Split,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum TocScanArg {
    Full,
    StopAfterGap,
}

impl NamingOptions {
    fn to_config(&self) -> Result<SplitConfig> {
        let mut config = match &self.config {
            Some(path) => SplitConfig::from_json_file(path)
                .with_context(|| format!("failed to load config: {}", path.display()))?,
            None => SplitConfig::default(),
        };

        if self.strip_id {
            config.strip_leading_id = true;
        }
        if let Some(remove) = &self.remove {
            config.removal_patterns = remove.clone();
        }
        if let Some(prefix) = &self.prefix {
            config.filename_prefix = prefix.clone();
        }
        if let Some(suffix) = &self.suffix {
            config.filename_suffix = suffix.clone();
        }
        if let Some(group_by) = self.group_by {
            config.group_by = match group_by {
                GroupByArg::None => GroupBy::None,
                GroupByArg::Template => GroupBy::Template,
                GroupByArg::LocationCategory => GroupBy::LocationCategory,
            };
        }
        if let Some(scope) = self.metadata_scope {
            config.metadata_scope = match scope {
                ScopeArg::Document => MetadataScope::Document,
                ScopeArg::Split => MetadataScope::Split,
            };
        }
        if let Some(scan) = self.toc_scan {
            config.toc_scan = match scan {
                TocScanArg::Full => TocScan::Full,
                TocScanArg::StopAfterGap => TocScan::StopAfterGap,
            };
        }

        Ok(config)
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli.command) {
        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Preview(args) => run_preview(args),
        Commands::Split(args) => run_split(args),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Load every source; unreadable files are reported and left out.
fn load_documents(sources: &[PathBuf]) -> Vec<(String, PdfDocument)> {
    sources
        .iter()
        .filter_map(|path| match PdfDocument::from_path(path) {
            Ok(doc) => Some((display_name(path), doc)),
            Err(e) => {
                warn!(source = %path.display(), error = %e, "cannot load PDF, skipping");
                None
            }
        })
        .collect()
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn run_preview(args: PreviewArgs) -> Result<()> {
    let config = args.options.to_config()?;
    let assembler = SplitAssembler::new(&config)?;
    let documents = load_documents(&args.sources);
    let previews = assembler.preview_batch(&documents);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&previews)?);
        return Ok(());
    }

    let rows: Vec<PreviewRow> = previews.iter().flat_map(|p| p.rows.iter().cloned()).collect();
    print_rows(&rows);
    for preview in &previews {
        for warning in &preview.warnings {
            println!("⚠️  {}: {warning}", preview.source);
        }
    }
    Ok(())
}

fn run_split(args: SplitArgs) -> Result<()> {
    let config = args.options.to_config()?;
    let assembler = SplitAssembler::new(&config)?;
    let documents = load_documents(&args.sources);

    let batch = assembler.assemble_batch(&documents);
    for report in batch.reports() {
        for warning in &report.warnings {
            warn!(source = %report.source, "{warning}");
        }
    }
    for (source, error) in batch.failures() {
        warn!(source, error, "document not split");
    }

    let rows: Vec<PreviewRow> = batch.rows().cloned().collect();
    print_rows(&rows);

    let entries: Vec<_> = batch.entries().cloned().collect();
    write_archive_to_path(&entries, &args.output)
        .with_context(|| format!("failed to write archive: {}", args.output.display()))?;

    println!("\n📦 {} form(s) written to {}", entries.len(), args.output.display());
    if !batch.duplicates.is_empty() {
        println!(
            "⚠️  {} duplicate filename(s) were numbered in the archive; adjust prefix, suffix or removal patterns:",
            batch.duplicates.len()
        );
        for path in &batch.duplicates {
            println!("   • {path}");
        }
    }

    Ok(())
}

fn print_rows(rows: &[PreviewRow]) {
    if rows.is_empty() {
        println!("ℹ️  No forms found");
        return;
    }

    println!("{:<24} {:>9}  {}", "SOURCE", "PAGES", "FILENAME");
    println!("{}", "─".repeat(72));
    for row in rows {
        let marker = if row.duplicate { "  ⚠️ duplicate" } else { "" };
        println!("{:<24} {:>9}  {}{}", row.source, row.pages, row.path, marker);
        println!("{:<24} {:>9}  {}", "", "", row.form_name);
    }
}
