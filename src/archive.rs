use crate::assembler::ArchiveEntry;
use crate::naming::numbered_path;
use crate::Result;
use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::path::Path;
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Write `entries` into an in-memory zip archive.
///
/// Entries keep their order. A path that is already taken gets ` (2)`,
/// ` (3)`, ... inserted before its extension so that no entry is lost.
pub fn write_entries(entries: &[ArchiveEntry]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut used: HashSet<String> = HashSet::with_capacity(entries.len());
    for entry in entries {
        let path = unique_path(&entry.path, &used);
        if path != entry.path {
            warn!(original = %entry.path, renamed = %path, "archive path already used");
        }

        zip.start_file(path.as_str(), options)?;
        zip.write_all(&entry.bytes)?;
        debug!(path = %path, bytes = entry.bytes.len(), "archive entry written");
        used.insert(path);
    }

    Ok(zip.finish()?.into_inner())
}

/// Write `entries` into a zip file at `path`, creating parent directories.
pub fn write_archive_to_path<P: AsRef<Path>>(entries: &[ArchiveEntry], path: P) -> Result<()> {
    let path = path.as_ref();
    let bytes = write_entries(entries)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)?;
    Ok(())
}

fn unique_path(path: &str, used: &HashSet<String>) -> String {
    if !used.contains(path) {
        return path.to_string();
    }
    (2..)
        .map(|n| numbered_path(path, n))
        .find(|candidate| !used.contains(candidate))
        .unwrap_or_else(|| path.to_string())
}
