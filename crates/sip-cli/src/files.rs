use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context;
use sip_assembly::{ContentInfoMap, DigitalObject, SipResult, XmlFragment};
use walkdir::WalkDir;

/// One regular file to archive; a single AIU with a single digital object.
#[derive(Clone, Debug)]
pub struct FileRecord {
    pub path: PathBuf,
    /// Path below the archived root, `/`-separated.
    pub relative: String,
    pub size: u64,
    pub permissions: String,
    pub content_type: String,
}

impl FileRecord {
    fn new(root: &Path, path: &Path, metadata: &Metadata) -> anyhow::Result<Self> {
        let relative = path
            .strip_prefix(root)
            .with_context(|| format!("{} is outside {}", path.display(), root.display()))?
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        Ok(Self {
            path: path.to_path_buf(),
            relative,
            size: metadata.len(),
            permissions: permissions(metadata),
            content_type: content_type(path).to_string(),
        })
    }
}

/// Every regular file under `root` in file-name order, skipping `exclude`.
pub fn collect(root: &Path, exclude: Option<&Path>) -> anyhow::Result<Vec<FileRecord>> {
    let mut records = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| exclude != Some(e.path()));
    for entry in walker {
        let entry = entry.with_context(|| format!("failed to walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let metadata = entry
            .metadata()
            .with_context(|| format!("failed to stat {}", entry.path().display()))?;
        records.push(FileRecord::new(root, entry.path(), &metadata)?);
    }
    Ok(records)
}

pub fn extract(record: &FileRecord) -> io::Result<Vec<DigitalObject>> {
    Ok(vec![DigitalObject::from_file(record.relative.clone(), &record.path)])
}

/// `<path>`, `<size>`, `<permissions>`, `<contentType>` and the content hashes.
pub fn fragment(record: &FileRecord, content: &ContentInfoMap, xml: &mut XmlFragment<'_>) -> SipResult<()> {
    xml.element("path", &record.relative)?
        .element("size", &record.size.to_string())?
        .element("permissions", &record.permissions)?
        .element("contentType", &record.content_type)?;
    if let Some(info) = content.get(&record.relative) {
        xml.hashes(&info.hashes)?;
    }
    Ok(())
}

#[cfg(unix)]
fn permissions(metadata: &Metadata) -> String {
    use std::os::unix::fs::PermissionsExt;

    let mode = metadata.permissions().mode();
    [(0o400, 'r'), (0o200, 'w'), (0o100, 'x')]
        .iter()
        .map(|&(bit, c)| if mode & bit != 0 { c } else { '-' })
        .collect()
}

#[cfg(not(unix))]
fn permissions(metadata: &Metadata) -> String {
    let flags = if metadata.permissions().readonly() { "r--" } else { "rw-" };
    flags.to_string()
}

fn content_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "txt" | "md" | "log" => "text/plain",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "xml" => "application/xml",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "tif" | "tiff" => "image/tiff",
        _ => "application/octet-stream",
    }
}
