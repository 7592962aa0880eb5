//! Shared test utilities for the amdl2maml test suite.
//!
//! Provides fixture setup and a small rendering harness around the topic
//! writer. Every rendered topic is `Topic.md` at the source root, converted
//! next to two linkable topics, `Widgets` and `Gadgets`, whose ids are fixed.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let out = render_general("# T\n\n[W](Widgets)\n");
//! assert!(out.contains(&format!("<link xlink:href=\"{WIDGETS_ID}\">W</link>")));
//! assert_well_formed(&out);
//! ```

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tempfile::TempDir;
use uuid::Uuid;

use crate::config::Config;
use crate::markup;
use crate::matcher::TopicRegistry;
use crate::types::{Topic, TopicEntry, TopicKind};
use crate::writer::{self, WriteContext, WriteError};

pub const TOPIC_ID: &str = "00000000-0000-0000-0000-000000000001";
pub const WIDGETS_ID: &str = "11111111-1111-1111-1111-111111111111";
pub const GADGETS_ID: &str = "22222222-2222-2222-2222-222222222222";

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/content/` to a temp directory and return it.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/content");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

// =========================================================================
// Topic rendering
// =========================================================================

fn topic(kind: TopicKind, file_name: &str, id: &str, title: &str) -> Topic {
    Topic {
        entry: TopicEntry {
            kind,
            file_name: file_name.to_string(),
            relative_dir: PathBuf::new(),
        },
        id: Uuid::parse_str(id).unwrap(),
        title: title.to_string(),
        document: None,
    }
}

/// Render `source` as `Topic.md` of the given kind, keeping the emitter's
/// output as is. `None` for placeholder topics.
pub fn render_output(
    config: &Config,
    kind: TopicKind,
    source: &str,
) -> Result<Option<Vec<u8>>, WriteError> {
    let topics = vec![
        topic(kind, "Topic.md", TOPIC_ID, "Topic"),
        topic(TopicKind::General, "Widgets.md", WIDGETS_ID, "Widgets"),
        topic(TopicKind::General, "Gadgets.md", GADGETS_ID, "Gadgets"),
    ];
    let registry = TopicRegistry::build(&topics).unwrap();
    let document = markup::parse(source, &config.markdown).unwrap();
    let ctx = WriteContext {
        registry: &registry,
        config,
    };
    writer::write_topic(&topics[0], &document, &ctx)
}

/// Render to a string. Panics for placeholder topics.
pub fn render_with(config: &Config, kind: TopicKind, source: &str) -> Result<String, WriteError> {
    let bytes = render_output(config, kind, source)?.expect("placeholder topics render nothing");
    Ok(String::from_utf8(bytes).unwrap())
}

/// Render with the stock config, indentation intact.
pub fn render_raw(kind: TopicKind, source: &str) -> String {
    render_with(&Config::default(), kind, source).unwrap()
}

/// Render with the stock config and strip indentation between tags.
pub fn render(kind: TopicKind, source: &str) -> String {
    compact(&render_raw(kind, source))
}

pub fn render_general(source: &str) -> String {
    render(TopicKind::General, source)
}

// =========================================================================
// XML assertions
// =========================================================================

static BETWEEN_TAGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r">\s+<").unwrap());

/// Drop whitespace-only runs between tags so assertions can use one line.
pub fn compact(xml: &str) -> String {
    BETWEEN_TAGS.replace_all(xml, "><").into_owned()
}

pub fn parse_xml(xml: &str) -> roxmltree::Document<'_> {
    roxmltree::Document::parse(xml)
        .unwrap_or_else(|e| panic!("output is not well-formed XML: {e}\n{xml}"))
}

pub fn assert_well_formed(xml: &str) {
    parse_xml(xml);
}
