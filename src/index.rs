//! Source tree indexing.
//!
//! Walks the source directory and produces one [`TopicEntry`] per eligible
//! file. The walk is depth-first; within each folder, files come before
//! subfolders and both are sorted by name, so the result is the same on
//! every run and every platform.
//!
//! ## Eligibility
//!
//! - Extension is `.md`, `.markdown` or `.amdl` (any case)
//! - Neither the file nor any folder on its path starts with `.`
//!
//! ```text
//! docs/
//! ├── Welcome.md               → General, relative_dir ""
//! ├── notes.txt                  (skipped: extension)
//! ├── .drafts/                   (skipped with everything below it)
//! └── Widgets/
//!     ├── Widgets.md           → Orientation, relative_dir "Widgets"
//!     └── HowTo-Build.md       → HowTo, relative_dir "Widgets"
//! ```

use crate::naming;
use crate::types::TopicEntry;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Directory not found: {0}")]
    SourceNotFound(PathBuf),
}

/// Extensions of files that are converted, compared case-insensitively.
pub const TOPIC_EXTENSIONS: &[&str] = &["md", "markdown", "amdl"];

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

fn has_topic_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| TOPIC_EXTENSIONS.iter().any(|t| e.eq_ignore_ascii_case(t)))
        .unwrap_or(false)
}

/// Index every eligible topic file under `root`.
pub fn index(root: &Path) -> Result<Vec<TopicEntry>, IndexError> {
    if !root.is_dir() {
        return Err(IndexError::SourceNotFound(root.to_path_buf()));
    }

    let walker = WalkDir::new(root)
        .sort_by(|a, b| {
            let a_dir = a.file_type().is_dir();
            let b_dir = b.file_type().is_dir();
            a_dir
                .cmp(&b_dir)
                .then_with(|| a.file_name().cmp(b.file_name()))
        })
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

    let mut entries = Vec::new();
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() || !has_topic_extension(entry.path()) {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().into_owned();
        let relative_dir = entry
            .path()
            .parent()
            .and_then(|p| p.strip_prefix(root).ok())
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let folder = relative_dir
            .file_name()
            .map(|f| f.to_string_lossy().into_owned());
        let base_name = entry
            .path()
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let len = entry.metadata()?.len();

        entries.push(TopicEntry {
            kind: naming::topic_kind(&base_name, folder.as_deref(), len),
            file_name,
            relative_dir,
        });
    }
    Ok(entries)
}
