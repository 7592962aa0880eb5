//! Shared types passed between pipeline steps.
//!
//! A topic starts life as a [`TopicEntry`] produced by the indexer and
//! becomes a [`Topic`] once the matcher has assigned its title and id. The
//! split keeps "id assigned exactly once" a property of the types rather
//! than of call order.

use crate::markup::Document;
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Topic variant, decided from the file name and its folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopicKind {
    /// Placeholder topic. Takes part in link resolution but writes no file.
    Empty,
    General,
    Glossary,
    HowTo,
    Orientation,
}

impl fmt::Display for TopicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TopicKind::Empty => "empty",
            TopicKind::General => "general",
            TopicKind::Glossary => "glossary",
            TopicKind::HowTo => "how-to",
            TopicKind::Orientation => "orientation",
        };
        f.write_str(name)
    }
}

/// How much progress narration a run prints. Ordered from quietest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, clap::ValueEnum)]
pub enum Verbosity {
    Silent,
    Minimal,
    #[default]
    Normal,
    Detailed,
    Insane,
}

/// An eligible source file found by the indexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicEntry {
    pub kind: TopicKind,
    /// File name including its extension, e.g. `HowTo-Build.md`.
    pub file_name: String,
    /// Directory of the file relative to the source root. Empty at the root.
    pub relative_dir: PathBuf,
}

impl TopicEntry {
    /// File stem used as the topic's link name.
    pub fn name(&self) -> &str {
        Path::new(&self.file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.file_name)
    }

    /// Path of the source file relative to the source root.
    pub fn relative_path(&self) -> PathBuf {
        self.relative_dir.join(&self.file_name)
    }

    pub fn source_path(&self, root: &Path) -> PathBuf {
        root.join(self.relative_path())
    }

    /// Path of the written topic relative to the destination root.
    pub fn destination_path(&self, extension: &str) -> PathBuf {
        self.relative_dir
            .join(Path::new(&self.file_name).with_extension(extension))
    }
}

/// A titled topic with its final identifier.
#[derive(Debug, Clone)]
pub struct Topic {
    pub entry: TopicEntry,
    pub id: Uuid,
    pub title: String,
    /// Parse tree kept from the matching step, if caching is enabled.
    pub document: Option<Document>,
}

impl Topic {
    pub fn name(&self) -> &str {
        self.entry.name()
    }

    pub fn kind(&self) -> TopicKind {
        self.entry.kind
    }
}
