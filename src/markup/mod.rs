//! Typed document tree for AMDL topics.
//!
//! [`parse`] runs pulldown-cmark over a topic's source and folds its event
//! stream into an owned tree of [`Block`] and [`Inline`] nodes. The writer
//! walks this tree; it never sees parser events.
//!
//! On top of CommonMark the tree carries a few things the writer needs that
//! a plain event stream does not expose directly:
//!
//! - heading style (ATX `#` or Setext underline), which decides `autoOutline`
//! - the delimiter of each emphasis run (`*` or `_`)
//! - the bullet character of each unordered list
//! - link reference definitions, in source order
//! - `:::name` fenced containers
//!
//! ```text
//! :::note
//! Containers hold ordinary blocks.
//! :::
//! ```
//!
//! Containers are recognized line by line before Markdown parsing, outside
//! fenced code. An unclosed container ends at the end of the document; a
//! closing `:::` with nothing open is kept as text.

mod parser;

pub use parser::{parse, parse_inlines};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarkupError {
    #[error("Unsupported block: {0}")]
    UnsupportedBlock(String),
    #[error("Unsupported inline: {0}")]
    UnsupportedInline(String),
    #[error("Unbalanced parser events at {0}")]
    Unbalanced(String),
}

/// A parsed topic.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub blocks: Vec<Block>,
    /// Link reference definitions (`[label]: url "title"`) in source order.
    pub references: Vec<Reference>,
}

impl Document {
    /// The first level-1 heading among the top-level blocks.
    pub fn title_heading(&self) -> Option<&Heading> {
        self.blocks.iter().find_map(|block| match block {
            Block::Heading(h) if h.level == 1 => Some(h),
            _ => None,
        })
    }

    /// Targets of every link in the document, in source order.
    pub fn link_targets(&self) -> Vec<&str> {
        let mut targets = Vec::new();
        collect_blocks(&self.blocks, &mut targets);
        targets
    }
}

fn collect_blocks<'a>(blocks: &'a [Block], out: &mut Vec<&'a str>) {
    for block in blocks {
        match block {
            Block::Heading(h) => collect_inlines(&h.inlines, out),
            Block::Paragraph(inlines) => collect_inlines(inlines, out),
            Block::Quote(blocks) | Block::Container { blocks, .. } => collect_blocks(blocks, out),
            Block::List(list) => list.items.iter().for_each(|item| collect_blocks(item, out)),
            Block::Table(rows) => rows
                .iter()
                .flat_map(|row| &row.cells)
                .for_each(|cell| collect_inlines(cell, out)),
            Block::Html(_) | Block::IndentedCode(_) | Block::FencedCode { .. } | Block::Rule => {}
        }
    }
}

fn collect_inlines<'a>(inlines: &'a [Inline], out: &mut Vec<&'a str>) {
    for inline in inlines {
        if let Inline::Link { target, .. } = inline {
            out.push(target.as_str());
        }
        collect_inlines(inline.children(), out);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub label: String,
    pub url: String,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingStyle {
    /// `# Title`
    Atx,
    /// `Title` underlined with `=` or `-`
    Setext,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Heading {
    pub level: u8,
    pub style: HeadingStyle,
    pub inlines: Vec<Inline>,
}

impl Heading {
    /// Concatenated literal text of the heading.
    pub fn text(&self) -> String {
        plain_text(&self.inlines)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    /// Unordered list and its bullet character (`*`, `-` or `+`).
    Bullet(char),
    /// Ordered list and its first number.
    Ordered(u64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct List {
    pub kind: ListKind,
    /// Each item is a sequence of blocks. Tight items hold a single
    /// paragraph wrapping their text.
    pub items: Vec<Vec<Block>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub header: bool,
    pub cells: Vec<Vec<Inline>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading(Heading),
    Paragraph(Vec<Inline>),
    Quote(Vec<Block>),
    /// Raw HTML block, verbatim.
    Html(String),
    IndentedCode(String),
    FencedCode {
        info: String,
        content: String,
    },
    List(List),
    Table(Vec<TableRow>),
    Container {
        name: String,
        blocks: Vec<Block>,
    },
    Rule,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Text(String),
    Code(String),
    /// Raw inline HTML, verbatim.
    Html(String),
    Emphasis {
        delimiter: char,
        children: Vec<Inline>,
    },
    Strong(Vec<Inline>),
    Strikethrough(Vec<Inline>),
    Subscript(Vec<Inline>),
    Superscript(Vec<Inline>),
    Math(String),
    SoftBreak,
    HardBreak,
    Link {
        target: String,
        title: String,
        children: Vec<Inline>,
    },
    Image {
        target: String,
        title: String,
        children: Vec<Inline>,
    },
}

impl Inline {
    /// Child inlines of container nodes; empty for leaves.
    pub fn children(&self) -> &[Inline] {
        match self {
            Inline::Emphasis { children, .. }
            | Inline::Strong(children)
            | Inline::Strikethrough(children)
            | Inline::Subscript(children)
            | Inline::Superscript(children)
            | Inline::Link { children, .. }
            | Inline::Image { children, .. } => children,
            _ => &[],
        }
    }

    fn push_text(&self, out: &mut String) {
        match self {
            Inline::Text(s) | Inline::Code(s) | Inline::Html(s) | Inline::Math(s) => {
                out.push_str(s)
            }
            Inline::SoftBreak | Inline::HardBreak => out.push(' '),
            other => other.children().iter().for_each(|c| c.push_text(out)),
        }
    }
}

/// Concatenate the literal text of a run of inlines, descending into spans.
pub fn plain_text(inlines: &[Inline]) -> String {
    let mut out = String::new();
    for inline in inlines {
        inline.push_text(&mut out);
    }
    out
}
