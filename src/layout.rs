//! Content layout files.
//!
//! A content layout is a small XML tree associating topic titles with their
//! identifiers:
//!
//! ```xml
//! <Topics>
//!   <Topic id="9d0c7e2b-..." visible="True" title="Widgets">
//!     <Topic id="4f1a..." visible="True" title="How to Build Widgets" />
//!   </Topic>
//! </Topics>
//! ```
//!
//! [`read_layout`] flattens such a file into a title → id lookup. Nesting is
//! ignored; every `Topic` element counts. [`write_layout`] produces the same
//! format for a finished run, so feeding it back with `--layout` keeps ids
//! stable.

use crate::types::{Topic, TopicKind};
use crate::writer::xml::XmlEmitter;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

/// Title → identifier, matched case-sensitively.
pub type TitleLookup = HashMap<String, Uuid>;

#[derive(Error, Debug)]
pub enum LayoutError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed layout: {0}")]
    Malformed(#[from] roxmltree::Error),
    #[error("Layout root must be <Topics>, found <{0}>")]
    UnexpectedRoot(String),
    #[error("Topic without id: {0}")]
    MissingId(String),
    #[error("Invalid topic id {id}: {error}")]
    InvalidId { id: String, error: uuid::Error },
    #[error("Duplicate title in layout: {0}")]
    DuplicateTitle(String),
}

/// Read the layout file, if any. No path means an empty lookup.
pub fn read_layout(path: Option<&Path>) -> Result<TitleLookup, LayoutError> {
    let Some(path) = path else {
        return Ok(TitleLookup::new());
    };
    if !path.is_file() {
        return Err(LayoutError::FileNotFound(path.to_path_buf()));
    }
    let text = fs::read_to_string(path)?;
    parse_layout(&text)
}

/// Parse layout XML, visiting `Topic` elements in document (pre-)order.
///
/// Topics without a `title` attribute are skipped; their children are not.
pub fn parse_layout(text: &str) -> Result<TitleLookup, LayoutError> {
    let doc = roxmltree::Document::parse(text)?;
    let root = doc.root_element();
    if root.tag_name().name() != "Topics" {
        return Err(LayoutError::UnexpectedRoot(root.tag_name().name().to_string()));
    }

    let mut lookup = TitleLookup::new();
    for node in root.descendants().filter(|n| n.has_tag_name("Topic")) {
        let Some(title) = node.attribute("title") else {
            continue;
        };
        let id = node
            .attribute("id")
            .ok_or_else(|| LayoutError::MissingId(title.to_string()))?;
        let id = Uuid::parse_str(id).map_err(|error| LayoutError::InvalidId {
            id: id.to_string(),
            error,
        })?;
        if lookup.insert(title.to_string(), id).is_some() {
            return Err(LayoutError::DuplicateTitle(title.to_string()));
        }
    }
    Ok(lookup)
}

// ============================================================================
// Writing
// ============================================================================

/// Render the layout of a finished run.
///
/// Topics are listed folder by folder in index order. A folder with an
/// orientation topic appears as that topic with the folder's contents nested
/// below it; without one, its contents join the parent level. Placeholder
/// topics are left out. A title already used by an earlier topic is not
/// repeated, so the file always reads back without a duplicate.
pub fn write_layout(topics: &[Topic], indent: bool) -> Result<Vec<u8>, LayoutError> {
    let listed: Vec<&Topic> = topics.iter().filter(|t| t.kind() != TopicKind::Empty).collect();
    let mut folders: BTreeSet<&Path> = BTreeSet::new();
    for topic in &listed {
        let mut dir = Some(topic.entry.relative_dir.as_path());
        while let Some(d) = dir {
            folders.insert(d);
            dir = d.parent();
        }
    }

    let mut layout = LayoutWriter {
        xml: XmlEmitter::new(indent),
        topics: &listed,
        folders: &folders,
        titles: HashSet::new(),
    };
    layout.xml.declaration()?;
    layout.xml.start("Topics")?;
    layout.folder(Path::new(""))?;
    layout.xml.end()?;
    Ok(layout.xml.finish()?)
}

struct LayoutWriter<'a> {
    xml: XmlEmitter,
    topics: &'a [&'a Topic],
    folders: &'a BTreeSet<&'a Path>,
    titles: HashSet<&'a str>,
}

impl<'a> LayoutWriter<'a> {
    /// Write a folder's topics, then its subfolders.
    fn folder(&mut self, dir: &Path) -> Result<(), LayoutError> {
        let own = self.orientation(dir).filter(|_| !dir.as_os_str().is_empty());
        let topics = self.topics;
        for topic in topics.iter().filter(|t| t.entry.relative_dir == dir) {
            if own.is_some_and(|o| std::ptr::eq(o, *topic)) {
                continue;
            }
            self.start_topic(topic)?;
            self.xml.end()?;
        }

        let folders = self.folders;
        for sub in folders.iter().filter(|f| f.parent() == Some(dir) && !f.as_os_str().is_empty()) {
            match self.orientation(sub) {
                Some(parent) => {
                    self.start_topic(parent)?;
                    self.folder(sub)?;
                    self.xml.end()?;
                }
                None => self.folder(sub)?,
            }
        }
        Ok(())
    }

    /// The folder's orientation topic, preferring the one named after it.
    fn orientation(&self, dir: &Path) -> Option<&'a Topic> {
        let folder_name = dir.file_name().and_then(|n| n.to_str());
        let mut candidates = self
            .topics
            .iter()
            .copied()
            .filter(|t| t.entry.relative_dir == dir && t.kind() == TopicKind::Orientation);
        let first = candidates.next()?;
        let named = std::iter::once(first)
            .chain(candidates)
            .find(|t| folder_name.is_some_and(|f| t.name().eq_ignore_ascii_case(f)));
        Some(named.unwrap_or(first))
    }

    fn start_topic(&mut self, topic: &'a Topic) -> Result<(), LayoutError> {
        self.xml.start("Topic")?;
        self.xml.attribute("id", &topic.id.to_string())?;
        self.xml.attribute("visible", "True")?;
        if self.titles.insert(topic.title.as_str()) {
            self.xml.attribute("title", &topic.title)?;
        }
        Ok(())
    }
}
