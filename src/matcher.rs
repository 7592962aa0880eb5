//! Topic matcher: titles, identifiers and the name registry.
//!
//! Each indexed file is read and parsed once. The text of its `#` heading
//! becomes the topic title (the file stem when there is none), and the title
//! picks the identifier:
//!
//! 1. a title listed in the content layout reuses the layout's id, so ids stay
//!    stable across runs
//! 2. otherwise a new id is made according to `ids.strategy`: random by
//!    default, or a name-based UUID of the topic's relative path
//!
//! Once every topic is titled, [`TopicRegistry::build`] indexes them by file
//! stem for link resolution. Topics are immutable from that point on.

use crate::config::{Config, IdStrategy, MarkdownConfig};
use crate::layout::TitleLookup;
use crate::markup::{self, Document, MarkupError};
use crate::types::{Topic, TopicEntry};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum MatchError {
    #[error("Failed to read {path}: {error}")]
    Read { path: PathBuf, error: std::io::Error },
    #[error("Failed to parse {path}: {error}")]
    Parse { path: PathBuf, error: MarkupError },
    #[error("Duplicate topic name {name}: {first} and {second}")]
    DuplicateName {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },
}

/// Read and parse a topic's source file.
///
/// Parsing has no side effects, so this is also how the writing step gets a
/// tree back when trees are not cached.
pub fn read_document(
    root: &Path,
    entry: &TopicEntry,
    config: &MarkdownConfig,
) -> Result<Document, MatchError> {
    let path = entry.relative_path();
    let text = fs::read_to_string(entry.source_path(root)).map_err(|error| MatchError::Read {
        path: path.clone(),
        error,
    })?;
    markup::parse(&text, config).map_err(|error| MatchError::Parse { path, error })
}

/// Parse a topic, resolve its title and id, and build the [`Topic`].
pub fn match_topic(
    root: &Path,
    entry: TopicEntry,
    lookup: &TitleLookup,
    config: &Config,
) -> Result<Topic, MatchError> {
    let document = read_document(root, &entry, &config.markdown)?;
    let title = resolve_title(&document, &entry);
    let id = resolve_id(&title, &entry, lookup, config.ids.strategy);
    Ok(Topic {
        entry,
        id,
        title,
        document: config.processing.cache_documents.then_some(document),
    })
}

/// Text of the first `#` heading, or the file stem.
pub fn resolve_title(document: &Document, entry: &TopicEntry) -> String {
    document
        .title_heading()
        .map(|heading| heading.text())
        .unwrap_or_else(|| entry.name().to_string())
}

pub fn resolve_id(title: &str, entry: &TopicEntry, lookup: &TitleLookup, strategy: IdStrategy) -> Uuid {
    if let Some(id) = lookup.get(title) {
        return *id;
    }
    match strategy {
        IdStrategy::Random => Uuid::new_v4(),
        IdStrategy::Derived => Uuid::new_v5(&Uuid::NAMESPACE_URL, path_key(entry).as_bytes()),
    }
}

/// Relative path with `/` separators on every platform.
fn path_key(entry: &TopicEntry) -> String {
    entry
        .relative_path()
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

// ============================================================================
// Registry
// ============================================================================

/// Topics by file stem, for resolving link targets.
#[derive(Debug)]
pub struct TopicRegistry<'a> {
    by_name: HashMap<&'a str, &'a Topic>,
}

impl<'a> TopicRegistry<'a> {
    /// Index topics by name. Two files with the same stem are an error.
    pub fn build(topics: &'a [Topic]) -> Result<Self, MatchError> {
        let mut by_name: HashMap<&'a str, &'a Topic> = HashMap::with_capacity(topics.len());
        for topic in topics {
            if let Some(first) = by_name.insert(topic.name(), topic) {
                return Err(MatchError::DuplicateName {
                    name: topic.name().to_string(),
                    first: first.entry.relative_path(),
                    second: topic.entry.relative_path(),
                });
            }
        }
        Ok(Self { by_name })
    }

    pub fn get(&self, name: &str) -> Option<&'a Topic> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
