//! Topic writer: streams one topic's document tree to a MAML document.
//!
//! The walk is shared by every topic variant. Variant differences live in a
//! hook table (see `hooks`) picked from the topic's [`TopicKind`]. Placeholder
//! topics have no hooks and produce no output.
//!
//! ## Document shape
//!
//! ```text
//! <?xml ...?>
//! <!-- banner comments -->
//! <topic id="..." revisionNumber="1">
//!   <developerConceptualDocument xmlns=... xmlns:xlink=...>
//!     <summary>       everything before the `#` heading
//!     <introduction>  the `#` heading up to the first `##`
//!     <section>       one per `##`..`######`, nested by level
//!     <relatedTopics> "See Also" region and link reference definitions
//! ```
//!
//! ## Sections
//!
//! One [`SectionState`] is kept per open heading level. A section starts with
//! flat `<content>`; the first deeper heading closes that content and opens
//! `<sections>` in its place. A heading at the same or a shallower level pops
//! and closes levels until it fits.
//!
//! A heading whose text equals the configured "See Also" title turns the
//! current level into a related topics region. Deeper headings inside it
//! (`Concepts`, `Tasks`, ...) only select the `topicType_id` given to the
//! links that follow.
//!
//! ## Links
//!
//! Link targets are classified in order:
//!
//! | Target | Element |
//! |--------|---------|
//! | `@term` | `newTerm` |
//! | absolute URL or email address | `externalLink` |
//! | `T:System.String` (second char `:`) | `codeEntityReference` |
//! | `U:Name` | `unmanagedCodeEntityReference` |
//! | `Name`, `Name#frag`, `#frag` | `link` resolved through the registry |

mod command;
mod hooks;
mod state;
pub mod xml;

use crate::config::Config;
use crate::markup::{Block, Document, Heading, HeadingStyle, Inline, TableRow, plain_text};
use crate::matcher::TopicRegistry;
use crate::types::{Topic, TopicKind};
use hooks::Hooks;
use regex::Regex;
use state::{SectionState, SeeAlsoGroup, TopicState, WriterState};
use std::path::PathBuf;
use std::sync::LazyLock;
use thiserror::Error;
use url::Url;
use xml::XmlEmitter;

const MAML_NAMESPACE: &str = "http://ddue.schemas.microsoft.com/authoring/2003/5";
const XLINK_NAMESPACE: &str = "http://www.w3.org/1999/xlink";

/// Fence info strings written as a `language` attribute. Matched exactly.
const LANGUAGES: &[&str] = &[
    "C#",
    "CSharp",
    "C++",
    "cpp",
    "C",
    "F#",
    "FSharp",
    "JavaScript",
    "js",
    "VB.NET",
    "HTML",
    "XML",
    "XSL",
    "PowerShell",
    "Python",
    "SQL",
];

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .unwrap()
});

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cannot find topic {target}, source: {from}")]
    TopicNotFound { target: String, from: PathBuf },
    #[error("Title already set: {0}")]
    TitleAlreadySet(PathBuf),
}

/// Read-only inputs shared by every topic of a run.
#[derive(Clone, Copy)]
pub struct WriteContext<'a> {
    pub registry: &'a TopicRegistry<'a>,
    pub config: &'a Config,
}

/// Render a topic. Returns `None` for placeholder topics.
pub fn write_topic(
    topic: &Topic,
    document: &Document,
    ctx: &WriteContext<'_>,
) -> Result<Option<Vec<u8>>, WriteError> {
    let Some(hooks) = hooks::for_kind(topic.kind()) else {
        return Ok(None);
    };
    let mut writer = TopicWriter {
        topic,
        registry: ctx.registry,
        config: ctx.config,
        hooks,
        xml: XmlEmitter::new(ctx.config.output.indent),
        state: WriterState::new(),
        nesting: 0,
    };
    writer.write_document(document)?;
    Ok(Some(writer.xml.finish()?))
}

/// Whether a topic of this kind produces a file.
pub fn writes_output(kind: TopicKind) -> bool {
    hooks::for_kind(kind).is_some()
}

/// Name of the topic a link target refers to, or `None` when the target is
/// not a link to another topic.
pub fn linked_topic(target: &str) -> Option<&str> {
    if target.starts_with('@') || external_target(target).is_some() || is_code_entity(target) {
        return None;
    }
    let name = target.split_once('#').map_or(target, |(name, _)| name);
    (!name.is_empty()).then_some(name)
}

pub(crate) struct TopicWriter<'a> {
    topic: &'a Topic,
    registry: &'a TopicRegistry<'a>,
    config: &'a Config,
    hooks: &'static Hooks,
    xml: XmlEmitter,
    state: WriterState,
    /// Depth of quotes, list items and containers around the current block.
    nesting: usize,
}

impl TopicWriter<'_> {
    // ========================================================================
    // Document
    // ========================================================================

    fn write_document(&mut self, document: &Document) -> Result<(), WriteError> {
        self.start_document()?;
        self.write_blocks(&document.blocks)?;
        self.end_document(document)
    }

    fn start_document(&mut self) -> Result<(), WriteError> {
        let config = self.config;
        self.xml.declaration()?;
        self.xml.comment(" This document was generated by a tool. ")?;
        self.xml.comment(
            " Changes to this file may cause incorrect behavior and will be lost if the code is regenerated. ",
        )?;
        self.xml.comment(&format!(
            " amdl2maml Version {}.{} ",
            env!("CARGO_PKG_VERSION_MAJOR"),
            env!("CARGO_PKG_VERSION_MINOR")
        ))?;
        if !config.output.copyright.is_empty() {
            self.xml.comment(&format!(" {} ", config.output.copyright))?;
        }

        self.xml.start("topic")?;
        self.xml.attribute("id", &self.topic.id.to_string())?;
        self.xml.attribute("revisionNumber", "1")?;
        self.xml.start(self.hooks.doc_element)?;
        self.xml.attribute("xmlns", MAML_NAMESPACE)?;
        self.xml.attribute("xmlns:xlink", XLINK_NAMESPACE)?;

        self.xml.start("summary")?;
        self.state.topic = TopicState::Summary;
        Ok(())
    }

    fn end_document(&mut self, document: &Document) -> Result<(), WriteError> {
        self.end_sections(2)?;
        self.end_summary()?;
        (self.hooks.end_introduction)(self)?;
        (self.hooks.related_topics)(self, &document.references)?;
        self.xml.end()?;
        self.xml.end()?;
        Ok(())
    }

    fn end_summary(&mut self) -> Result<(), WriteError> {
        if self.state.topic == TopicState::Summary {
            self.xml.end()?;
            self.state.topic = TopicState::Content;
        }
        Ok(())
    }

    // ========================================================================
    // Sections
    // ========================================================================

    fn start_section(&mut self, heading: &Heading) -> Result<(), WriteError> {
        self.end_summary()?;
        let level = usize::from(heading.level);
        if level == 1 {
            if self.state.title_set {
                return Err(WriteError::TitleAlreadySet(self.topic.entry.relative_path()));
            }
            self.state.title_set = true;
            return (self.hooks.start_introduction)(self, heading);
        }

        (self.hooks.end_introduction)(self)?;
        let title = heading.text();
        if self.state.in_see_also() && level > self.state.section_level() {
            self.state.group = SeeAlsoGroup::from_title(&title, &self.config.titles);
            return Ok(());
        }
        if title == self.config.titles.see_also {
            return self.start_see_also(level);
        }

        self.end_sections(level)?;
        while level > self.state.section_level() {
            let state = (self.hooks.start_section)(self, heading, &title)?;
            self.state.sections.push(state);
        }
        Ok(())
    }

    fn start_see_also(&mut self, level: usize) -> Result<(), WriteError> {
        (self.hooks.start_see_also)(self, level)?;
        self.state.set_section(SectionState::SeeAlso);
        self.state.group = SeeAlsoGroup::None;
        Ok(())
    }

    /// Close every open level at `level` or deeper.
    fn end_sections(&mut self, level: usize) -> Result<(), WriteError> {
        let level = level.max(2);
        while self.state.section_level() >= level {
            let Some(state) = self.state.sections.pop() else {
                break;
            };
            (self.hooks.end_section)(self, state)?;
        }
        Ok(())
    }

    fn auto_outline(&mut self, heading: &Heading) -> Result<(), WriteError> {
        if heading.style == HeadingStyle::Setext {
            self.xml.start("autoOutline")?;
            self.xml.attribute("lead", "none")?;
            self.xml.attribute("excludeRelatedTopics", "true")?;
            self.xml.end()?;
        }
        Ok(())
    }

    fn write_title(&mut self, heading: &Heading) -> Result<(), WriteError> {
        self.xml.start("title")?;
        self.write_inlines(&heading.inlines)?;
        self.xml.end()?;
        Ok(())
    }

    // ========================================================================
    // Blocks
    // ========================================================================

    fn write_blocks(&mut self, blocks: &[Block]) -> Result<(), WriteError> {
        blocks.iter().try_for_each(|block| self.write_block(block))
    }

    /// Write blocks held by a quote, list item or container.
    fn nested(&mut self, blocks: &[Block]) -> Result<(), WriteError> {
        self.nesting += 1;
        let result = self.write_blocks(blocks);
        self.nesting -= 1;
        result
    }

    fn write_block(&mut self, block: &Block) -> Result<(), WriteError> {
        match block {
            Block::Heading(heading) if self.nesting == 0 => self.start_section(heading),
            Block::Heading(heading) => self.nested_heading(heading),
            Block::Paragraph(inlines) => self.paragraph(inlines),
            Block::Quote(blocks) => self.element("quote", blocks),
            Block::Html(html) => self.html_block(html),
            Block::IndentedCode(text) => {
                let line = text.trim_matches('\n');
                if line.contains('\n') {
                    self.code("", line)
                } else {
                    self.command(line)
                }
            }
            Block::FencedCode { info, content } => self.code(info, content),
            // Related topics are a flat run of links.
            Block::List(list) if self.state.in_see_also() => list
                .items
                .iter()
                .try_for_each(|item| self.nested(item)),
            Block::List(list) => (self.hooks.list)(self, list),
            Block::Table(rows) => self.table(rows),
            Block::Container { name, blocks } => self.container(name, blocks),
            Block::Rule => Ok(()),
        }
    }

    /// Headings below the top level cannot open sections. Inside a related
    /// topics region they still select the link group.
    fn nested_heading(&mut self, heading: &Heading) -> Result<(), WriteError> {
        if self.state.in_see_also() {
            self.state.group = SeeAlsoGroup::from_title(&heading.text(), &self.config.titles);
            return Ok(());
        }
        self.xml.start("para")?;
        self.xml.start("legacyBold")?;
        self.write_inlines(&heading.inlines)?;
        self.xml.end()?;
        self.xml.end()?;
        Ok(())
    }

    fn paragraph(&mut self, inlines: &[Inline]) -> Result<(), WriteError> {
        if self.state.in_see_also() {
            return self.write_inlines(inlines);
        }
        self.xml.start("para")?;
        self.state.block = state::BlockState::Start;
        self.write_inlines(inlines)?;
        self.xml.end()?;
        Ok(())
    }

    fn element(&mut self, name: &str, blocks: &[Block]) -> Result<(), WriteError> {
        self.xml.start(name)?;
        self.nested(blocks)?;
        self.xml.end()?;
        Ok(())
    }

    fn html_block(&mut self, html: &str) -> Result<(), WriteError> {
        if let Some(comment) = html_comment(html) {
            self.xml.raw(comment)?;
            return Ok(());
        }
        self.xml.start("markup")?;
        self.xml.raw("\n")?;
        self.xml.raw(html)?;
        self.xml.end()?;
        Ok(())
    }

    fn code(&mut self, info: &str, content: &str) -> Result<(), WriteError> {
        self.xml.start("code")?;
        match info {
            "" => self.xml.attribute("language", "none")?,
            known if LANGUAGES.contains(&known) => self.xml.attribute("language", known)?,
            other => {
                self.xml.attribute("title", other)?;
                self.xml.attribute("language", "none")?;
            }
        }
        self.xml.raw("\n")?;
        self.xml.text(content)?;
        self.xml.end()?;
        Ok(())
    }

    fn table(&mut self, rows: &[TableRow]) -> Result<(), WriteError> {
        self.xml.start("table")?;
        for row in rows {
            if row.header {
                self.xml.start("tableHeader")?;
            }
            self.xml.start("row")?;
            for cell in &row.cells {
                self.xml.start("entry")?;
                self.write_inlines(cell)?;
                self.xml.end()?;
            }
            self.xml.end()?;
            if row.header {
                self.xml.end()?;
            }
        }
        self.xml.end()?;
        Ok(())
    }

    /// `:::relatedTopics` (or `:::seeAlso`) at the top level opens the related
    /// topics region, which then stays open like a "See Also" heading would.
    /// `:::quote` is a block quote; any other name is an alert of that class.
    fn container(&mut self, name: &str, blocks: &[Block]) -> Result<(), WriteError> {
        let related = name.eq_ignore_ascii_case("relatedTopics") || name.eq_ignore_ascii_case("seeAlso");
        if related && self.nesting == 0 {
            if !self.state.in_see_also() {
                self.end_summary()?;
                (self.hooks.end_introduction)(self)?;
                self.start_see_also(2)?;
            }
            return self.nested(blocks);
        }
        if name.eq_ignore_ascii_case("quote") {
            return self.element("quote", blocks);
        }
        self.xml.start("alert")?;
        self.xml.attribute("class", name)?;
        self.nested(blocks)?;
        self.xml.end()?;
        Ok(())
    }

    // ========================================================================
    // Inlines
    // ========================================================================

    /// Write a block's inline run. An image alone in the run is a block image.
    fn write_inlines(&mut self, inlines: &[Inline]) -> Result<(), WriteError> {
        self.inline_run(inlines, inlines.len() == 1)
    }

    fn write_children(&mut self, inlines: &[Inline]) -> Result<(), WriteError> {
        self.inline_run(inlines, false)
    }

    /// A `<markup>` run opened inside this run is closed at its end.
    fn inline_run(&mut self, inlines: &[Inline], standalone: bool) -> Result<(), WriteError> {
        let outer_markup = self.state.markup;
        for inline in inlines {
            self.write_inline(inline, standalone)?;
        }
        if self.state.markup && !outer_markup {
            self.xml.end()?;
            self.state.markup = false;
        }
        Ok(())
    }

    fn write_inline(&mut self, inline: &Inline, standalone: bool) -> Result<(), WriteError> {
        match inline {
            Inline::Text(text) => self.xml.text(text)?,
            Inline::Code(code) => self.text_element("codeInline", code)?,
            Inline::Math(math) => self.text_element("math", math)?,
            Inline::Html(html) => match html_comment(html) {
                Some(comment) => self.xml.raw(comment)?,
                None => {
                    self.start_markup()?;
                    self.xml.raw(html)?;
                }
            },
            Inline::Emphasis {
                delimiter,
                children,
            } => match children.as_slice() {
                [Inline::Emphasis { children: inner, .. }] if *delimiter == '_' => {
                    self.span("legacyUnderline", inner)?
                }
                [Inline::Emphasis { children: inner, .. }] => self.span("literal", inner)?,
                _ => self.span("legacyItalic", children)?,
            },
            Inline::Strong(children) => self.span("legacyBold", children)?,
            Inline::Strikethrough(children) => {
                self.start_markup()?;
                self.span("s", children)?;
            }
            Inline::Subscript(children) => self.span("subscript", children)?,
            Inline::Superscript(children) => self.span("superscript", children)?,
            Inline::SoftBreak => {
                if !self.state.in_see_also() {
                    self.xml.raw("\n")?;
                }
            }
            Inline::HardBreak => self.hard_break()?,
            Inline::Link {
                target, children, ..
            } => self.link(target, children)?,
            Inline::Image {
                target, children, ..
            } => self.image(target, children, standalone)?,
        }
        Ok(())
    }

    fn span(&mut self, name: &str, children: &[Inline]) -> Result<(), WriteError> {
        self.xml.start(name)?;
        self.write_children(children)?;
        self.xml.end()?;
        Ok(())
    }

    fn text_element(&mut self, name: &str, text: &str) -> Result<(), WriteError> {
        self.xml.start(name)?;
        self.xml.text(text)?;
        self.xml.end()?;
        Ok(())
    }

    fn start_markup(&mut self) -> Result<(), WriteError> {
        if !self.state.markup {
            self.xml.start("markup")?;
            self.state.markup = true;
        }
        Ok(())
    }

    fn hard_break(&mut self) -> Result<(), WriteError> {
        if self.state.in_see_also() {
            return Ok(());
        }
        if self.state.markup {
            self.xml.start("br")?;
            self.xml.end()?;
            return Ok(());
        }
        self.xml.start("markup")?;
        self.xml.start("br")?;
        self.xml.end()?;
        self.xml.end()?;
        Ok(())
    }

    fn image(&mut self, target: &str, children: &[Inline], standalone: bool) -> Result<(), WriteError> {
        self.xml.start(if standalone { "mediaLink" } else { "mediaLinkInline" })?;
        self.xml.start("image")?;
        self.xml.attribute("xlink:href", target)?;
        self.xml.end()?;
        if standalone && !children.is_empty() {
            self.xml.start("caption")?;
            self.xml.attribute("placement", "after")?;
            self.write_children(children)?;
            self.xml.end()?;
        }
        self.xml.end()?;
        Ok(())
    }

    // ========================================================================
    // Links
    // ========================================================================

    fn link(&mut self, target: &str, children: &[Inline]) -> Result<(), WriteError> {
        if target.starts_with('@') {
            return self.span("newTerm", children);
        }
        if let Some(uri) = external_target(target) {
            return (self.hooks.external_link)(self, &uri, children);
        }
        if is_code_entity(target) {
            return self.code_link(target, children);
        }
        (self.hooks.conceptual_link)(self, target, children)
    }

    fn code_link(&mut self, target: &str, children: &[Inline]) -> Result<(), WriteError> {
        let (element, target) = match target.strip_prefix("U:") {
            Some(name) => ("unmanagedCodeEntityReference", name),
            None => ("codeEntityReference", target),
        };
        self.xml.start(element)?;
        let link_text = plain_text(children);
        if !link_text.is_empty() {
            self.xml.attribute("linkText", &link_text)?;
        }
        self.xml.text(target)?;
        self.xml.end()?;
        Ok(())
    }

    /// Resolve `Name#fragment` to `id#fragment`. A bare `#fragment` stays as is.
    /// Only the first fragment is kept: `A#b#c` becomes `id#b`.
    fn conceptual_href(&self, target: &str) -> Result<String, WriteError> {
        let mut parts = target.split('#');
        let name = parts.next().unwrap_or_default();
        let fragment = parts.next();
        if name.is_empty() {
            return Ok(format!("#{}", fragment.unwrap_or_default()));
        }
        let topic = self
            .registry
            .get(name)
            .ok_or_else(|| WriteError::TopicNotFound {
                target: name.to_string(),
                from: self.topic.entry.relative_path(),
            })?;
        Ok(match fragment {
            Some(fragment) => format!("{}#{fragment}", topic.id),
            None => topic.id.to_string(),
        })
    }

    fn topic_type_attribute(&mut self) -> Result<(), WriteError> {
        if !self.state.in_see_also() {
            return Ok(());
        }
        if let Some(id) = self.state.group.topic_type_id() {
            self.xml.attribute("topicType_id", &id.to_string())?;
        }
        Ok(())
    }
}

/// Absolute URLs pass through; bare email addresses become `mailto:` links.
fn external_target(target: &str) -> Option<String> {
    // Single-letter schemes are code entity prefixes such as `T:`.
    match Url::parse(target) {
        Ok(url) if url.scheme().len() > 1 => return Some(target.to_string()),
        _ => {}
    }
    EMAIL
        .is_match(target)
        .then(|| format!("mailto:{target}"))
}

fn is_code_entity(target: &str) -> bool {
    target.chars().nth(1) == Some(':')
}

/// The trimmed text if it is exactly one well-formed HTML comment.
fn html_comment(content: &str) -> Option<&str> {
    let trimmed = content.trim();
    let inner = trimmed.strip_prefix("<!--")?.strip_suffix("-->")?;
    if inner.starts_with('>') || inner.starts_with("->") || inner.ends_with('-') || inner.contains("--") {
        return None;
    }
    Some(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_COPYRIGHT;
    use crate::test_helpers::*;

    #[test]
    fn document_skeleton() {
        let out = render_raw(TopicKind::General, "# Widgets\n\nIntro text.\n");
        assert!(out.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(out.contains("<!-- This document was generated by a tool. -->"));
        assert!(out.contains(&format!(
            "<!-- amdl2maml Version {}.{} -->",
            env!("CARGO_PKG_VERSION_MAJOR"),
            env!("CARGO_PKG_VERSION_MINOR")
        )));
        assert!(out.contains(&format!("<topic id=\"{TOPIC_ID}\" revisionNumber=\"1\">")));
        assert!(out.contains(
            "<developerConceptualDocument xmlns=\"http://ddue.schemas.microsoft.com/authoring/2003/5\" xmlns:xlink=\"http://www.w3.org/1999/xlink\">"
        ));
        assert_well_formed(&out);
    }

    #[test]
    fn summary_precedes_introduction() {
        let out = render_general("Short summary.\n\n# Widgets\n\nIntro text.\n");
        assert!(out.contains(
            "<summary><para>Short summary.</para></summary><introduction><para>Intro text.</para></introduction>"
        ));
    }

    #[test]
    fn empty_summary_is_self_closed() {
        let out = render_general("# Widgets\n");
        assert!(out.contains("<summary/><introduction/>"));
    }

    #[test]
    fn setext_title_adds_auto_outline() {
        let out = render_general("Widgets\n=======\n\nIntro.\n");
        assert!(out.contains(
            "<introduction><autoOutline lead=\"none\" excludeRelatedTopics=\"true\"/><para>Intro.</para>"
        ));
        let atx = render_general("# Widgets\n\nIntro.\n");
        assert!(!atx.contains("autoOutline"));
    }

    #[test]
    fn copyright_banner_defaults_to_license_line() {
        let plain = render_raw(TopicKind::General, "# A\n");
        assert_eq!(plain.matches("<!--").count(), 4);
        assert!(plain.contains(&format!("<!-- {DEFAULT_COPYRIGHT} -->")));
        assert!(plain.contains("Licensed under the MIT license."));

        let mut config = Config::default();
        config.output.copyright = "(c) Widget Co".into();
        let out = render_with(&config, TopicKind::General, "# A\n").unwrap();
        assert!(out.contains("<!-- (c) Widget Co -->"));
        assert!(!out.contains(DEFAULT_COPYRIGHT));

        config.output.copyright = String::new();
        let bare = render_with(&config, TopicKind::General, "# A\n").unwrap();
        assert_eq!(bare.matches("<!--").count(), 3);
    }

    #[test]
    fn sections_nest_by_level() {
        let out = render_general("# T\n\n## One\n\nFirst.\n\n### Deeper\n\nSecond.\n\n## Two\n");
        // Flat content of "One" is closed and followed by <sections>.
        assert!(out.contains(
            "<section address=\"One\"><title>One</title><content><para>First.</para></content><sections><section address=\"Deeper\"><title>Deeper</title><content><para>Second.</para></content></section></sections></section>"
        ));
        assert!(out.contains(
            "<section address=\"Two\"><title>Two</title><content/></section>"
        ));
        assert_well_formed(&out);
    }

    #[test]
    fn skipped_level_gets_untitled_section() {
        let out = render_general("# T\n\n## A\n\n#### Deep\n\nText.\n");
        let doc = parse_xml(&out);
        let titled: Vec<_> = doc
            .descendants()
            .filter(|n| n.has_tag_name((MAML_NAMESPACE, "section")))
            .map(|n| n.attribute("address").unwrap_or(""))
            .collect();
        assert_eq!(titled, vec!["A", "", "Deep"]);
    }

    #[test]
    fn second_title_is_fatal() {
        let err = render_with(&Config::default(), TopicKind::General, "# One\n\n# Two\n").unwrap_err();
        assert!(matches!(err, WriteError::TitleAlreadySet(_)));
    }

    #[test]
    fn headings_inside_quotes_do_not_open_sections() {
        let out = render_general("# T\n\n> ## Aside\n> Text.\n");
        assert!(out.contains("<quote><para><legacyBold>Aside</legacyBold></para><para>Text.</para></quote>"));
        assert!(!out.contains("<section"));
    }

    #[test]
    fn see_also_groups_tag_links() {
        let out = render_general(
            "# T\n\n## See Also\n\n### Tasks\n\n[Build](Widgets)\n\n### Reference\n\n[Docs](Gadgets#api)\n",
        );
        assert!(out.contains(&format!(
            "<relatedTopics><link xlink:href=\"{WIDGETS_ID}\" topicType_id=\"dac3a6a0-c863-4e5b-8f65-79efc6a4ba09\">Build</link><link xlink:href=\"{GADGETS_ID}#api\" topicType_id=\"a635375f-98c2-4241-94e7-e427b47c20b6\">Docs</link></relatedTopics>"
        )));
        assert!(!out.contains("<para>"));
        assert_well_formed(&out);
    }

    #[test]
    fn see_also_without_group_has_no_topic_type() {
        let out = render_general("# T\n\n## See Also\n\n[Build](Widgets)\n");
        assert!(out.contains(&format!("<relatedTopics><link xlink:href=\"{WIDGETS_ID}\">Build</link></relatedTopics>")));
    }

    #[test]
    fn see_also_lists_are_flattened() {
        let out = render_general("# T\n\n## See Also\n\n* [A](Widgets)\n* [B](Gadgets)\n");
        assert!(!out.contains("<list"));
        assert!(out.contains(&format!(
            "<relatedTopics><link xlink:href=\"{WIDGETS_ID}\">A</link><link xlink:href=\"{GADGETS_ID}\">B</link></relatedTopics>"
        )));
    }

    #[test]
    fn see_also_closes_open_sections() {
        let out = render_general("# T\n\n## Body\n\nText.\n\n## See Also\n\n[W](Widgets)\n");
        assert!(out.contains("</content></section><relatedTopics>"));
        assert_well_formed(&out);
    }

    #[test]
    fn nested_see_also_replaces_section_content() {
        let out = render_general("# T\n\n## Body\n\nText.\n\n### See Also\n\n[W](Widgets)\n\n## Next\n");
        assert!(out.contains(&format!(
            "<content><para>Text.</para></content><relatedTopics><link xlink:href=\"{WIDGETS_ID}\">W</link></relatedTopics></section><section address=\"Next\">"
        )));
        assert_well_formed(&out);
    }

    #[test]
    fn localized_see_also_title() {
        let mut config = Config::default();
        config.titles.see_also = "Siehe auch".into();
        let out = compact(&render_with(&config, TopicKind::General, "# T\n\n## Siehe auch\n\n[W](Widgets)\n").unwrap());
        assert!(out.contains("<relatedTopics><link"));
        let english = render_with(&config, TopicKind::General, "# T\n\n## See Also\n").unwrap();
        assert!(english.contains("address=\"See Also\""));
    }

    #[test]
    fn reference_definitions_become_related_topics() {
        let out = render_general("# T\n\nBody.\n\n[spec]: https://example.com/spec \"The Spec\"\n[home]: https://example.com/\n");
        assert!(out.contains(
            "<relatedTopics><externalLink><linkUri>https://example.com/spec</linkUri><linkText>The Spec</linkText></externalLink><externalLink><linkUri>https://example.com/</linkUri><linkText>home</linkText></externalLink></relatedTopics></developerConceptualDocument>"
        ));
    }

    #[test]
    fn reference_definitions_join_open_see_also() {
        let out = render_general("# T\n\n## See Also\n\n[W](Widgets)\n\n[home]: https://example.com/\n");
        assert_eq!(out.matches("<relatedTopics>").count(), 1);
        assert!(out.contains("</link><externalLink><linkUri>https://example.com/</linkUri>"));
    }

    #[test]
    fn paragraph_inlines() {
        let out = render_general(
            "# T\n\nUse `Widget` with *care*, **force**, _*underline*_, *_literal_* and ~~never~~.\n",
        );
        assert!(out.contains("<codeInline>Widget</codeInline>"));
        assert!(out.contains("<legacyItalic>care</legacyItalic>"));
        assert!(out.contains("<legacyBold>force</legacyBold>"));
        assert!(out.contains("<legacyUnderline>underline</legacyUnderline>"));
        assert!(out.contains("<literal>literal</literal>"));
        assert!(out.contains("<markup><s>never</s>.</markup></para>"));
    }

    #[test]
    fn breaks() {
        let out = render_general("# T\n\nOne\nTwo  \nThree\n");
        assert!(out.contains("<para>One\nTwo<markup><br/></markup>Three</para>"));
    }

    #[test]
    fn scripts_and_math() {
        let out = render_general("# T\n\nH~2~O and x^2^ and $a+b$.\n");
        assert!(out.contains("H<subscript>2</subscript>O"));
        assert!(out.contains("x<superscript>2</superscript>"));
        assert!(out.contains("<math>a+b</math>"));
    }

    #[test]
    fn inline_html_is_wrapped_in_markup() {
        let out = render_general("# T\n\nPress <kbd>Ctrl</kbd> now.\n");
        assert!(out.contains("<para>Press <markup><kbd>Ctrl</kbd> now.</markup></para>"));
    }

    #[test]
    fn inline_comment_passes_through() {
        let out = render_general("# T\n\nText <!-- note --> more.\n");
        assert!(out.contains("<para>Text <!-- note --> more.</para>"));
    }

    #[test]
    fn html_block_comment_and_markup() {
        let out = render_raw(TopicKind::General, "# T\n\n<!-- hidden -->\n\n<div>raw</div>\n");
        assert!(out.contains("<!-- hidden -->"));
        assert!(out.contains("<markup>\n<div>raw</div>\n</markup>"));
    }

    #[test]
    fn comment_rules() {
        assert_eq!(html_comment("  <!-- ok -->\n"), Some("<!-- ok -->"));
        assert_eq!(html_comment("<!---->"), Some("<!---->"));
        assert_eq!(html_comment("<!-->"), None);
        assert_eq!(html_comment("<!--->"), None);
        assert_eq!(html_comment("<!-- a -- b -->"), None);
        assert_eq!(html_comment("<!-- a --->"), None);
        assert_eq!(html_comment("<p>"), None);
    }

    #[test]
    fn fenced_code_languages() {
        let out = render_raw(TopicKind::General, "# T\n\n```CSharp\nvar x = 1;\n```\n");
        assert!(out.contains("<code language=\"CSharp\">\nvar x = 1;\n</code>"));

        let out = render_raw(TopicKind::General, "# T\n\n```rust\nlet x = a < b;\n```\n");
        assert!(out.contains("<code title=\"rust\" language=\"none\">\nlet x = a &lt; b;\n</code>"));

        let out = render_raw(TopicKind::General, "# T\n\n```\nplain\n```\n");
        assert!(out.contains("<code language=\"none\">\nplain\n</code>"));
    }

    #[test]
    fn multi_line_indented_code_is_code() {
        let out = render_raw(TopicKind::General, "# T\n\n    one\n    two\n");
        assert!(out.contains("<code language=\"none\">\none\ntwo</code>"));
        assert!(!out.contains("<command>"));
    }

    #[test]
    fn list_classes_and_items() {
        let out = render_general("# T\n\n* a\n* b\n\n- c\n\n1. d\n");
        assert!(out.contains("<list class=\"bullet\"><listItem><para>a</para></listItem><listItem><para>b</para></listItem></list>"));
        assert!(out.contains("<list class=\"nobullet\"><listItem><para>c</para></listItem></list>"));
        assert!(out.contains("<list class=\"ordered\"><listItem><para>d</para></listItem></list>"));
    }

    #[test]
    fn bare_list_in_subsection_is_wrapped_in_para() {
        let out = render_general("# T\n\n## A\n\n### B\n\n* x\n");
        assert!(out.contains("<content><para><list class=\"bullet\">"));
        let after_text = render_general("# T\n\n## A\n\n### B\n\nLead.\n\n* x\n");
        assert!(after_text.contains("<para>Lead.</para><list class=\"bullet\">"));
        let top = render_general("# T\n\n## A\n\n* x\n");
        assert!(top.contains("<content><list class=\"bullet\">"));
    }

    #[test]
    fn tables() {
        let out = render_general("# T\n\n| Name | Size |\n|------|------|\n| a | 1 |\n");
        assert!(out.contains(
            "<table><tableHeader><row><entry>Name</entry><entry>Size</entry></row></tableHeader><row><entry>a</entry><entry>1</entry></row></table>"
        ));
    }

    #[test]
    fn rules_are_dropped() {
        let out = render_general("# T\n\nA\n\n---\n\nB\n");
        assert!(out.contains("<para>A</para><para>B</para>"));
    }

    #[test]
    fn containers() {
        let out = render_general("# T\n\n:::note\nCareful.\n:::\n\n:::quote\nSaid.\n:::\n");
        assert!(out.contains("<alert class=\"note\"><para>Careful.</para></alert>"));
        assert!(out.contains("<quote><para>Said.</para></quote>"));
    }

    #[test]
    fn reference_link_inside_container_uses_outer_definition() {
        let out = render_general(
            "# T\n\n:::note\nSee [the spec][spec].\n:::\n\n[spec]: https://example.com/spec\n",
        );
        assert!(out.contains(
            "<alert class=\"note\"><para>See <externalLink><linkUri>https://example.com/spec</linkUri><linkText>the spec</linkText></externalLink>.</para></alert>"
        ));
        assert_well_formed(&out);
    }

    #[test]
    fn related_topics_container_opens_region() {
        let out = render_general("# T\n\n## Body\n\nText.\n\n:::relatedTopics\n### Tasks\n[W](Widgets)\n:::\n");
        assert!(out.contains(&format!(
            "</section><relatedTopics><link xlink:href=\"{WIDGETS_ID}\" topicType_id=\"dac3a6a0-c863-4e5b-8f65-79efc6a4ba09\">W</link></relatedTopics>"
        )));
        assert_well_formed(&out);
    }

    #[test]
    fn images() {
        let out = render_general("# T\n\n![Figure one](fig.png)\n\nSee ![icon](icon.png) here.\n");
        assert!(out.contains(
            "<mediaLink><image xlink:href=\"fig.png\"/><caption placement=\"after\">Figure one</caption></mediaLink>"
        ));
        assert!(out.contains("See <mediaLinkInline><image xlink:href=\"icon.png\"/></mediaLinkInline> here."));
    }

    #[test]
    fn links_by_target_kind() {
        let out = render_general(
            "# T\n\n[term](@) [site](https://example.com) [mail](info@example.com) [str](T:System.String) [win](U:CreateWindow) [w](Widgets#usage) [here](#top)\n",
        );
        assert!(out.contains("<newTerm>term</newTerm>"));
        assert!(out.contains("<externalLink><linkUri>https://example.com</linkUri><linkText>site</linkText></externalLink>"));
        assert!(out.contains("<linkUri>mailto:info@example.com</linkUri>"));
        assert!(out.contains("<codeEntityReference linkText=\"str\">T:System.String</codeEntityReference>"));
        assert!(out.contains("<unmanagedCodeEntityReference linkText=\"win\">CreateWindow</unmanagedCodeEntityReference>"));
        assert!(out.contains(&format!("<link xlink:href=\"{WIDGETS_ID}#usage\">w</link>")));
        assert!(out.contains("<link xlink:href=\"#top\">here</link>"));
    }

    #[test]
    fn conceptual_links_keep_the_first_fragment() {
        let out = render_general("# T\n\n[w](Widgets#a#b) [here](#top#more)\n");
        assert!(out.contains(&format!("<link xlink:href=\"{WIDGETS_ID}#a\">w</link>")));
        assert!(out.contains("<link xlink:href=\"#top\">here</link>"));
    }

    #[test]
    fn missing_link_target_names_both_topics() {
        let err = render_with(&Config::default(), TopicKind::General, "# T\n\n[c](Missing)\n").unwrap_err();
        match &err {
            WriteError::TopicNotFound { target, from } => {
                assert_eq!(target, "Missing");
                assert_eq!(from, &PathBuf::from("Topic.md"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("Missing"));
        assert!(err.to_string().contains("Topic.md"));
    }

    #[test]
    fn external_targets() {
        assert_eq!(external_target("https://a.b/c").as_deref(), Some("https://a.b/c"));
        assert_eq!(external_target("a@b.org").as_deref(), Some("mailto:a@b.org"));
        assert_eq!(external_target("T:System.String"), None);
        assert_eq!(external_target("Widgets#top"), None);
        assert_eq!(external_target("#top"), None);
    }

    #[test]
    fn linked_topic_names() {
        assert_eq!(linked_topic("Widgets"), Some("Widgets"));
        assert_eq!(linked_topic("Widgets#usage"), Some("Widgets"));
        assert_eq!(linked_topic("#top"), None);
        assert_eq!(linked_topic("@term"), None);
        assert_eq!(linked_topic("T:System.String"), None);
        assert_eq!(linked_topic("https://example.com/"), None);
        assert_eq!(linked_topic("me@example.com"), None);
    }

    #[test]
    fn empty_topics_write_nothing() {
        let out = render_output(&Config::default(), TopicKind::Empty, "# Ignored\n").unwrap();
        assert!(out.is_none());
        assert!(!writes_output(TopicKind::Empty));
        assert!(writes_output(TopicKind::HowTo));
    }

    #[test]
    fn orientation_root_element() {
        let out = render_raw(TopicKind::Orientation, "# Parts\n\n## Overview\n");
        assert!(out.contains("<developerOrientationDocument "));
        assert!(out.contains("<section address=\"Overview\">"));
    }

    // ------------------------------------------------------------------------
    // Glossary
    // ------------------------------------------------------------------------

    #[test]
    fn glossary_entries() {
        let out = render(TopicKind::Glossary, "# Glossary\n\n## Alpha, Beta\n\nFirst letters.\n\n## Big Widget\n\nLarge.\n");
        assert!(out.contains("<developerGlossaryDocument "));
        assert!(out.contains(
            "<glossary><glossaryEntry><terms><term termId=\"Alpha\">Alpha</term><term termId=\"Beta\">Beta</term></terms><definition><para>First letters.</para></definition></glossaryEntry>"
        ));
        assert!(out.contains("<term termId=\"Big-Widget\">Big Widget</term>"));
        assert!(out.contains("</glossaryEntry></glossary></developerGlossaryDocument>"));
        assert!(!out.contains("<introduction"));
        assert_well_formed(&out);
    }

    #[test]
    fn glossary_see_also_keeps_fragment_links_only() {
        let out = render(
            TopicKind::Glossary,
            "# Glossary\n\n## Alpha\n\nFirst.\n\n### See Also\n\n[Beta](#Beta) [Site](https://example.com) [W](Widgets)\n\n## Beta\n\nSecond.\n",
        );
        assert!(out.contains(
            "<definition><para>First.</para></definition><relatedEntry termId=\"Beta\"/>"
        ));
        assert!(!out.contains("externalLink"));
        assert!(!out.contains("<link "));
        assert!(out.contains("</glossaryEntry><glossaryEntry><terms><term termId=\"Beta\">"));
        assert_well_formed(&out);
    }

    #[test]
    fn glossary_entry_after_nested_see_also_keeps_its_definition() {
        let out = render(
            TopicKind::Glossary,
            "# Glossary\n\n## Alpha\n\nFirst.\n\n### See Also\n\n[Beta](#Beta)\n\n## Beta\n\nSecond.\n\n* more\n",
        );
        assert!(out.contains(
            "<relatedEntry termId=\"Beta\"/></glossaryEntry><glossaryEntry><terms><term termId=\"Beta\">Beta</term></terms><definition><para>Second.</para><list class=\"bullet\"><listItem><para>more</para></listItem></list></definition></glossaryEntry></glossary>"
        ));
        assert_well_formed(&out);
    }

    #[test]
    fn glossary_see_also_still_resolves_targets() {
        let err = render_with(
            &Config::default(),
            TopicKind::Glossary,
            "# G\n\n## A\n\n### See Also\n\n[x](Missing)\n",
        )
        .unwrap_err();
        assert!(matches!(err, WriteError::TopicNotFound { .. }));
    }

    #[test]
    fn glossary_links_outside_see_also() {
        let out = render(TopicKind::Glossary, "# G\n\n## A\n\nSee [W](Widgets).\n");
        assert!(out.contains(&format!("<link xlink:href=\"{WIDGETS_ID}\">W</link>")));
    }

    // ------------------------------------------------------------------------
    // HowTo
    // ------------------------------------------------------------------------

    #[test]
    fn how_to_procedures_and_steps() {
        let out = render(TopicKind::HowTo, "# Build\n\n## Prepare\n\n1. Open\n2. Close\n");
        assert!(out.contains("<developerHowToDocument "));
        assert!(out.contains(
            "<procedure><title>Prepare</title><steps class=\"ordered\"><step><content><para>Open</para></content></step><step><content><para>Close</para></content></step></steps></procedure>"
        ));
        assert!(!out.contains("<section"));
        assert_well_formed(&out);
    }

    #[test]
    fn how_to_step_class_follows_bullet() {
        let out = render(TopicKind::HowTo, "# Build\n\n## Prepare\n\n- Open\n");
        assert!(out.contains("<steps class=\"nobullet\">"));
    }

    #[test]
    fn how_to_nested_list_stays_a_list() {
        let out = render(TopicKind::HowTo, "# Build\n\n## Prepare\n\n1. Open\n   * lid\n   * box\n");
        assert!(out.contains("<step><content><para>Open</para><list class=\"bullet\"><listItem><para>lid</para></listItem>"));
        assert_eq!(out.matches("<steps").count(), 1);
    }

    #[test]
    fn how_to_intro_list_is_plain() {
        let out = render(TopicKind::HowTo, "# Build\n\n* needs\n");
        assert!(out.contains("<introduction><list class=\"bullet\">"));
    }

    #[test]
    fn how_to_see_also_closes_procedures() {
        let out = render(TopicKind::HowTo, "# Build\n\n## Prepare\n\nText.\n\n### See Also\n\n[W](Widgets)\n");
        assert!(out.contains(&format!(
            "</procedure><relatedTopics><link xlink:href=\"{WIDGETS_ID}\">W</link></relatedTopics>"
        )));
        assert_well_formed(&out);
    }

    #[test]
    fn how_to_procedure_after_nested_see_also() {
        let out = render(
            TopicKind::HowTo,
            "# Build\n\n## Prepare\n\nText.\n\n### See Also\n\n[W](Widgets)\n\n## Assemble\n\n1. Fit\n2. Tighten\n",
        );
        assert!(out.contains(&format!(
            "<procedure><title>Prepare</title><para>Text.</para></procedure><relatedTopics><link xlink:href=\"{WIDGETS_ID}\">W</link></relatedTopics><procedure><title>Assemble</title><steps class=\"ordered\"><step><content><para>Fit</para></content></step><step><content><para>Tighten</para></content></step></steps></procedure></developerHowToDocument>"
        )));
        assert!(!out.contains("FitTighten"));
        assert_well_formed(&out);
    }

    #[test]
    fn how_to_top_level_see_also_runs_to_the_end() {
        let out = render(
            TopicKind::HowTo,
            "# Build\n\n## Prepare\n\nText.\n\n## See Also\n\n### Tasks\n\n[W](Widgets)\n",
        );
        assert!(out.contains(&format!(
            "</procedure><relatedTopics><link xlink:href=\"{WIDGETS_ID}\" topicType_id=\"dac3a6a0-c863-4e5b-8f65-79efc6a4ba09\">W</link></relatedTopics></developerHowToDocument>"
        )));
        assert_well_formed(&out);
    }

    #[test]
    fn every_variant_balances_a_busy_document() {
        let source = "Summary.\n\n# Title\n\nIntro.\n\n## A\n\nText.\n\n### A1\n\n* x\n\n#### A1a\n\n> quote\n\n## B, C\n\n```js\nx\n```\n\n## See Also\n\n### Concepts\n\n[W](Widgets)\n\n[r]: https://example.com\n";
        for kind in [TopicKind::General, TopicKind::Glossary, TopicKind::HowTo, TopicKind::Orientation] {
            let out = render(kind, source);
            assert_well_formed(&out);
        }
    }
}
