//! Content package extraction
//!
//! SCORM and zipped-HTML uploads are unpacked into a per-content directory
//! under the content root, then the package's entry document is located so
//! the pipeline can annotate and instrument it.

use std::fs;
use std::path::{Path, PathBuf};
use tt_common::{Error, Result};

/// Unpack a zip archive into `dest_dir`. Returns the number of files
/// written. Entries that would land outside `dest_dir` fail the whole
/// extraction.
pub fn extract_package(archive_path: &Path, dest_dir: &Path) -> Result<usize> {
    let file = fs::File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| Error::Ingestion(format!("unreadable package: {}", e)))?;

    fs::create_dir_all(dest_dir)?;
    let mut written = 0;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| Error::Ingestion(format!("unreadable package entry: {}", e)))?;

        // enclosed_name rejects absolute paths and `..` components
        let Some(relative) = entry.enclosed_name() else {
            return Err(Error::Ingestion(format!(
                "package entry escapes the extraction directory: {}",
                entry.name()
            )));
        };
        let out_path = dest_dir.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = fs::File::create(&out_path)?;
        std::io::copy(&mut entry, &mut out)?;
        written += 1;
    }

    tracing::debug!(files = written, dest = %dest_dir.display(), "package extracted");
    Ok(written)
}

/// Locate the document the player should load: `index.html` (or
/// `index.htm`) at the package root, or one directory deep when the
/// archive wraps everything in a single folder. A root-level match always
/// wins over a nested one.
pub fn find_entry_document(dir: &Path) -> Result<PathBuf> {
    if let Some(found) = entry_document_in(dir)? {
        return Ok(found);
    }

    // One level of subdirectories, in name order so the choice is stable
    let mut subdirs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            subdirs.push(path);
        }
    }
    subdirs.sort();

    for subdir in subdirs {
        if let Some(found) = entry_document_in(&subdir)? {
            return Ok(found);
        }
    }

    Err(Error::Ingestion(
        "package has no index.html entry document".to_string(),
    ))
}

/// Persist pasted markup as the package's sole document
pub fn write_raw_markup(dest_dir: &Path, html: &str) -> Result<PathBuf> {
    fs::create_dir_all(dest_dir)?;
    let path = dest_dir.join("index.html");
    fs::write(&path, html)?;
    Ok(path)
}

fn entry_document_in(dir: &Path) -> Result<Option<PathBuf>> {
    let mut html = None;
    let mut htm = None;

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        match entry.file_name().to_string_lossy().to_lowercase().as_str() {
            "index.html" => html = Some(path),
            "index.htm" => htm = Some(path),
            _ => {}
        }
    }

    Ok(html.or(htm))
}
