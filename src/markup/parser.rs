use super::{
    Block, Document, Heading, HeadingStyle, Inline, List, ListKind, MarkupError, Reference,
    TableRow,
};
use crate::config::MarkdownConfig;
use pulldown_cmark::{
    BrokenLink, CodeBlockKind, CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd,
};
use std::collections::HashMap;
use std::ops::Range;

fn options(config: &MarkdownConfig) -> Options {
    let mut options = Options::empty();
    if config.tables {
        options.insert(Options::ENABLE_TABLES);
    }
    if config.strikethrough {
        options.insert(Options::ENABLE_STRIKETHROUGH);
    }
    if config.subscript {
        options.insert(Options::ENABLE_SUBSCRIPT);
    }
    if config.superscript {
        options.insert(Options::ENABLE_SUPERSCRIPT);
    }
    if config.math {
        options.insert(Options::ENABLE_MATH);
    }
    options
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Parse a topic's source text into a [`Document`].
pub fn parse(text: &str, config: &MarkdownConfig) -> Result<Document, MarkupError> {
    let options = options(config);
    let segments = split_containers(text);
    let mut references = Vec::new();
    collect_references(&segments, options, &mut references);
    let definitions = Definitions::new(&references);
    let blocks = parse_segments(segments, options, &definitions)?;
    Ok(Document { blocks, references })
}

/// Parse a single line as inline content.
///
/// Anything that does not parse to exactly one paragraph comes back as a
/// single text node holding the input.
pub fn parse_inlines(text: &str, config: &MarkdownConfig) -> Vec<Inline> {
    match parse(text, config) {
        Ok(Document { mut blocks, .. }) if blocks.len() == 1 => match blocks.pop() {
            Some(Block::Paragraph(inlines)) => inlines,
            _ => vec![Inline::Text(text.to_string())],
        },
        _ => vec![Inline::Text(text.to_string())],
    }
}

// ============================================================================
// Container pre-pass
// ============================================================================

#[derive(Debug, PartialEq)]
enum Segment {
    Markdown(String),
    Container { name: String, body: Vec<Segment> },
}

fn parse_segments(
    segments: Vec<Segment>,
    options: Options,
    definitions: &Definitions,
) -> Result<Vec<Block>, MarkupError> {
    let mut blocks = Vec::new();
    for segment in segments {
        match segment {
            Segment::Markdown(text) => blocks.extend(parse_markdown(&text, options, definitions)?),
            Segment::Container { name, body } => blocks.push(Block::Container {
                name,
                blocks: parse_segments(body, options, definitions)?,
            }),
        }
    }
    Ok(blocks)
}

/// Reference definitions of every segment, in source order.
fn collect_references(segments: &[Segment], options: Options, references: &mut Vec<Reference>) {
    for segment in segments {
        match segment {
            Segment::Markdown(text) => {
                let parser = Parser::new_ext(text, options);
                let mut definitions: Vec<(usize, Reference)> = parser
                    .reference_definitions()
                    .iter()
                    .map(|(label, def)| {
                        (
                            def.span.start,
                            Reference {
                                label: label.to_string(),
                                url: def.dest.to_string(),
                                title: def.title.as_ref().map(|t| t.to_string()),
                            },
                        )
                    })
                    .collect();
                definitions.sort_by_key(|(start, _)| *start);
                references.extend(definitions.into_iter().map(|(_, r)| r));
            }
            Segment::Container { body, .. } => collect_references(body, options, references),
        }
    }
}

/// Document-wide label lookup, so a reference link resolves whichever
/// container its definition sits in. The first definition of a label wins.
struct Definitions(HashMap<String, Reference>);

impl Definitions {
    fn new(references: &[Reference]) -> Self {
        let mut map = HashMap::new();
        for reference in references {
            map.entry(normalize_label(&reference.label))
                .or_insert_with(|| reference.clone());
        }
        Self(map)
    }

    fn get(&self, label: &str) -> Option<&Reference> {
        self.0.get(&normalize_label(label))
    }
}

/// Labels match case-insensitively with runs of whitespace collapsed.
fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn container_name(rest: &str) -> Option<&str> {
    let name = rest.split_whitespace().next()?;
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        .then_some(name)
}

/// Opening code fence: a run of at least three backticks or tildes.
fn fence_open(content: &str) -> Option<(char, usize)> {
    let ch = content.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let len = content.chars().take_while(|c| *c == ch).count();
    (len >= 3).then_some((ch, len))
}

fn is_fence_close(content: &str, ch: char, len: usize) -> bool {
    let content = content.trim_end();
    content.chars().all(|c| c == ch) && content.chars().count() >= len
}

/// Split source text into Markdown runs and `:::name` containers.
fn split_containers(text: &str) -> Vec<Segment> {
    fn flush(current: &mut String, segments: &mut Vec<Segment>) {
        if !current.is_empty() {
            segments.push(Segment::Markdown(std::mem::take(current)));
        }
    }

    let mut stack: Vec<(String, Vec<Segment>)> = vec![(String::new(), Vec::new())];
    let mut current = String::new();
    let mut fence: Option<(char, usize)> = None;

    for line in text.split_inclusive('\n') {
        let bare = line.trim_end_matches(['\n', '\r']);
        let content = bare.trim_start_matches(' ');
        let shallow = bare.len() - content.len() < 4;

        if let Some((ch, len)) = fence {
            if shallow && is_fence_close(content, ch, len) {
                fence = None;
            }
            current.push_str(line);
            continue;
        }

        if shallow {
            if let Some(open) = fence_open(content) {
                fence = Some(open);
            } else if let Some(rest) = content.strip_prefix(":::") {
                if rest.trim().is_empty() && stack.len() > 1 {
                    if let Some((name, mut body)) = stack.pop() {
                        flush(&mut current, &mut body);
                        if let Some((_, parent)) = stack.last_mut() {
                            parent.push(Segment::Container { name, body });
                        }
                    }
                    continue;
                }
                if let Some(name) = container_name(rest) {
                    if let Some((_, segments)) = stack.last_mut() {
                        flush(&mut current, segments);
                    }
                    stack.push((name.to_string(), Vec::new()));
                    continue;
                }
            }
        }
        current.push_str(line);
    }

    while let Some((name, mut body)) = stack.pop() {
        flush(&mut current, &mut body);
        match stack.last_mut() {
            Some((_, parent)) => parent.push(Segment::Container { name, body }),
            None => return body,
        }
    }
    Vec::new()
}

// ============================================================================
// Event folding
// ============================================================================

fn parse_markdown(
    text: &str,
    options: Options,
    definitions: &Definitions,
) -> Result<Vec<Block>, MarkupError> {
    let mut resolve = |link: BrokenLink| {
        definitions.get(&link.reference).map(|reference| {
            let title = reference.title.clone().unwrap_or_default();
            (CowStr::from(reference.url.clone()), CowStr::from(title))
        })
    };
    let parser = Parser::new_with_broken_link_callback(text, options, Some(&mut resolve));

    let mut builder = TreeBuilder::new(text);
    for (event, range) in parser.into_offset_iter() {
        builder.event(event, range)?;
    }
    builder.finish()
}

enum SpanKind {
    Emphasis(char),
    Strong,
    Strikethrough,
    Subscript,
    Superscript,
    Link { target: String, title: String },
    Image { target: String, title: String },
}

impl SpanKind {
    fn into_inline(self, children: Vec<Inline>) -> Inline {
        match self {
            SpanKind::Emphasis(delimiter) => Inline::Emphasis {
                delimiter,
                children,
            },
            SpanKind::Strong => Inline::Strong(children),
            SpanKind::Strikethrough => Inline::Strikethrough(children),
            SpanKind::Subscript => Inline::Subscript(children),
            SpanKind::Superscript => Inline::Superscript(children),
            SpanKind::Link { target, title } => Inline::Link {
                target,
                title,
                children,
            },
            SpanKind::Image { target, title } => Inline::Image {
                target,
                title,
                children,
            },
        }
    }
}

/// An open node while folding events.
enum Frame {
    Root(Vec<Block>),
    Quote(Vec<Block>),
    List { kind: ListKind, items: Vec<Vec<Block>> },
    Item(Vec<Block>),
    /// `implicit` paragraphs wrap the bare text of tight list items.
    Paragraph { inlines: Vec<Inline>, implicit: bool },
    Heading(Heading),
    Code { info: Option<String>, text: String },
    Html(String),
    Table(Vec<TableRow>),
    Row(TableRow),
    Cell(Vec<Inline>),
    Span { kind: SpanKind, children: Vec<Inline> },
}

struct TreeBuilder<'t> {
    source: &'t str,
    stack: Vec<Frame>,
}

impl<'t> TreeBuilder<'t> {
    fn new(source: &'t str) -> Self {
        Self {
            source,
            stack: vec![Frame::Root(Vec::new())],
        }
    }

    fn finish(mut self) -> Result<Vec<Block>, MarkupError> {
        self.close_implicit()?;
        match (self.stack.pop(), self.stack.is_empty()) {
            (Some(Frame::Root(blocks)), true) => Ok(blocks),
            _ => Err(MarkupError::Unbalanced("end of document".into())),
        }
    }

    fn event(&mut self, event: Event<'_>, range: Range<usize>) -> Result<(), MarkupError> {
        match event {
            Event::Start(tag) => self.start(tag, range),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => match self.stack.last_mut() {
                Some(Frame::Code { text: buf, .. }) => {
                    buf.push_str(&text);
                    Ok(())
                }
                _ => self.push_inline(Inline::Text(text.into_string())),
            },
            Event::Html(html) => match self.stack.last_mut() {
                Some(Frame::Html(buf)) => {
                    buf.push_str(&html);
                    Ok(())
                }
                _ => self.push_inline(Inline::Html(html.into_string())),
            },
            Event::InlineHtml(html) => self.push_inline(Inline::Html(html.into_string())),
            Event::Code(code) => self.push_inline(Inline::Code(code.into_string())),
            Event::InlineMath(math) | Event::DisplayMath(math) => {
                self.push_inline(Inline::Math(math.into_string()))
            }
            Event::SoftBreak => self.push_inline(Inline::SoftBreak),
            Event::HardBreak => self.push_inline(Inline::HardBreak),
            Event::Rule => {
                self.close_implicit()?;
                self.push_block(Block::Rule)
            }
            other => Err(MarkupError::UnsupportedInline(format!("{other:?}"))),
        }
    }

    fn start(&mut self, tag: Tag<'_>, range: Range<usize>) -> Result<(), MarkupError> {
        let frame = match tag {
            Tag::Paragraph => {
                self.close_implicit()?;
                Frame::Paragraph {
                    inlines: Vec::new(),
                    implicit: false,
                }
            }
            Tag::Heading { level, .. } => {
                self.close_implicit()?;
                Frame::Heading(Heading {
                    level: heading_level(level),
                    style: self.heading_style(&range),
                    inlines: Vec::new(),
                })
            }
            Tag::BlockQuote(_) => {
                self.close_implicit()?;
                Frame::Quote(Vec::new())
            }
            Tag::CodeBlock(kind) => {
                self.close_implicit()?;
                let info = match kind {
                    CodeBlockKind::Indented => None,
                    CodeBlockKind::Fenced(info) => Some(info.trim().to_string()),
                };
                Frame::Code {
                    info,
                    text: String::new(),
                }
            }
            Tag::HtmlBlock => {
                self.close_implicit()?;
                Frame::Html(String::new())
            }
            Tag::List(start) => {
                self.close_implicit()?;
                let kind = match start {
                    Some(n) => ListKind::Ordered(n),
                    None => ListKind::Bullet(self.bullet_char(&range)),
                };
                Frame::List {
                    kind,
                    items: Vec::new(),
                }
            }
            Tag::Item => Frame::Item(Vec::new()),
            Tag::Table(_) => {
                self.close_implicit()?;
                Frame::Table(Vec::new())
            }
            Tag::TableHead => Frame::Row(TableRow {
                header: true,
                cells: Vec::new(),
            }),
            Tag::TableRow => Frame::Row(TableRow {
                header: false,
                cells: Vec::new(),
            }),
            Tag::TableCell => Frame::Cell(Vec::new()),
            Tag::Emphasis => self.span(SpanKind::Emphasis(self.delimiter(&range)))?,
            Tag::Strong => self.span(SpanKind::Strong)?,
            Tag::Strikethrough => self.span(SpanKind::Strikethrough)?,
            Tag::Subscript => self.span(SpanKind::Subscript)?,
            Tag::Superscript => self.span(SpanKind::Superscript)?,
            Tag::Link {
                dest_url, title, ..
            } => self.span(SpanKind::Link {
                target: dest_url.into_string(),
                title: title.into_string(),
            })?,
            Tag::Image {
                dest_url, title, ..
            } => self.span(SpanKind::Image {
                target: dest_url.into_string(),
                title: title.into_string(),
            })?,
            other => return Err(MarkupError::UnsupportedBlock(format!("{other:?}"))),
        };
        self.stack.push(frame);
        Ok(())
    }

    fn end(&mut self, tag: TagEnd) -> Result<(), MarkupError> {
        if matches!(tag, TagEnd::Item) {
            self.close_implicit()?;
        }
        let frame = self
            .stack
            .pop()
            .ok_or_else(|| MarkupError::Unbalanced(format!("{tag:?}")))?;
        match frame {
            Frame::Paragraph { inlines, .. } => self.push_block(Block::Paragraph(inlines)),
            Frame::Heading(heading) => self.push_block(Block::Heading(heading)),
            Frame::Quote(blocks) => self.push_block(Block::Quote(blocks)),
            Frame::Code { info: None, text } => self.push_block(Block::IndentedCode(text)),
            Frame::Code {
                info: Some(info),
                text,
            } => self.push_block(Block::FencedCode {
                info,
                content: text,
            }),
            Frame::Html(raw) => self.push_block(Block::Html(raw)),
            Frame::List { kind, items } => self.push_block(Block::List(List { kind, items })),
            Frame::Item(blocks) => match self.stack.last_mut() {
                Some(Frame::List { items, .. }) => {
                    items.push(blocks);
                    Ok(())
                }
                _ => Err(MarkupError::Unbalanced(format!("{tag:?}"))),
            },
            Frame::Table(rows) => self.push_block(Block::Table(rows)),
            Frame::Row(row) => match self.stack.last_mut() {
                Some(Frame::Table(rows)) => {
                    rows.push(row);
                    Ok(())
                }
                _ => Err(MarkupError::Unbalanced(format!("{tag:?}"))),
            },
            Frame::Cell(inlines) => match self.stack.last_mut() {
                Some(Frame::Row(row)) => {
                    row.cells.push(inlines);
                    Ok(())
                }
                _ => Err(MarkupError::Unbalanced(format!("{tag:?}"))),
            },
            Frame::Span { kind, children } => self.push_inline(kind.into_inline(children)),
            Frame::Root(_) => Err(MarkupError::Unbalanced(format!("{tag:?}"))),
        }
    }

    /// Open an inline span, first wrapping bare list item text in a paragraph.
    fn span(&mut self, kind: SpanKind) -> Result<Frame, MarkupError> {
        self.open_implicit();
        Ok(Frame::Span {
            kind,
            children: Vec::new(),
        })
    }

    fn open_implicit(&mut self) {
        if matches!(self.stack.last(), Some(Frame::Item(_))) {
            self.stack.push(Frame::Paragraph {
                inlines: Vec::new(),
                implicit: true,
            });
        }
    }

    fn close_implicit(&mut self) -> Result<(), MarkupError> {
        if matches!(
            self.stack.last(),
            Some(Frame::Paragraph { implicit: true, .. })
        ) {
            if let Some(Frame::Paragraph { inlines, .. }) = self.stack.pop() {
                return self.push_block(Block::Paragraph(inlines));
            }
        }
        Ok(())
    }

    fn push_block(&mut self, block: Block) -> Result<(), MarkupError> {
        match self.stack.last_mut() {
            Some(Frame::Root(blocks) | Frame::Quote(blocks) | Frame::Item(blocks)) => {
                blocks.push(block);
                Ok(())
            }
            _ => Err(MarkupError::Unbalanced("block outside a block container".into())),
        }
    }

    fn push_inline(&mut self, inline: Inline) -> Result<(), MarkupError> {
        self.open_implicit();
        let target = match self.stack.last_mut() {
            Some(
                Frame::Paragraph { inlines, .. }
                | Frame::Heading(Heading { inlines, .. })
                | Frame::Cell(inlines)
                | Frame::Span {
                    children: inlines, ..
                },
            ) => inlines,
            _ => return Err(MarkupError::Unbalanced("inline outside a text block".into())),
        };
        if let Inline::Text(next) = &inline {
            if let Some(Inline::Text(prev)) = target.last_mut() {
                prev.push_str(next);
                return Ok(());
            }
        }
        target.push(inline);
        Ok(())
    }

    /// ATX headings start with one to six `#` followed by a space or the line end.
    fn heading_style(&self, range: &Range<usize>) -> HeadingStyle {
        let text = self.source.get(range.clone()).unwrap_or_default().trim_start();
        let hashes = text.chars().take_while(|c| *c == '#').count();
        let after = text[hashes..].chars().next();
        if (1..=6).contains(&hashes) && after.is_none_or(char::is_whitespace) {
            HeadingStyle::Atx
        } else {
            HeadingStyle::Setext
        }
    }

    fn bullet_char(&self, range: &Range<usize>) -> char {
        self.source
            .get(range.start..)
            .and_then(|s| s.trim_start().chars().next())
            .filter(|c| matches!(c, '*' | '-' | '+'))
            .unwrap_or('*')
    }

    fn delimiter(&self, range: &Range<usize>) -> char {
        self.source
            .get(range.start..)
            .and_then(|s| s.chars().next())
            .filter(|c| matches!(c, '*' | '_'))
            .unwrap_or('*')
    }
}
