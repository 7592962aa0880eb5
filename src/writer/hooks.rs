//! Per-variant hook table.
//!
//! Every topic variant shares the walk in [`super::TopicWriter`] and differs
//! only at a handful of points. Each variant is a [`Hooks`] value; the
//! conceptual functions below are the defaults the others fall back to.
//!
//! | Variant | Document element | Overrides |
//! |---------|------------------|-----------|
//! | General | `developerConceptualDocument` | none |
//! | Orientation | `developerOrientationDocument` | none |
//! | Glossary | `developerGlossaryDocument` | introduction, sections, See Also, links |
//! | HowTo | `developerHowToDocument` | sections, See Also, lists |
//! | Empty | no output | |

use super::state::{ListClass, SectionState, TopicState};
use super::{TopicWriter, WriteError};
use crate::markup::{Heading, Inline, List, Reference};
use crate::types::TopicKind;

pub(super) struct Hooks {
    pub doc_element: &'static str,
    pub start_introduction: fn(&mut TopicWriter<'_>, &Heading) -> Result<(), WriteError>,
    pub end_introduction: fn(&mut TopicWriter<'_>) -> Result<(), WriteError>,
    /// Opens one section level and returns the state pushed for it.
    pub start_section:
        fn(&mut TopicWriter<'_>, &Heading, &str) -> Result<SectionState, WriteError>,
    pub end_section: fn(&mut TopicWriter<'_>, SectionState) -> Result<(), WriteError>,
    pub start_see_also: fn(&mut TopicWriter<'_>, usize) -> Result<(), WriteError>,
    pub related_topics: fn(&mut TopicWriter<'_>, &[Reference]) -> Result<(), WriteError>,
    pub list: fn(&mut TopicWriter<'_>, &List) -> Result<(), WriteError>,
    pub conceptual_link: fn(&mut TopicWriter<'_>, &str, &[Inline]) -> Result<(), WriteError>,
    pub external_link: fn(&mut TopicWriter<'_>, &str, &[Inline]) -> Result<(), WriteError>,
}

const CONCEPTUAL: Hooks = Hooks {
    doc_element: "developerConceptualDocument",
    start_introduction,
    end_introduction,
    start_section,
    end_section,
    start_see_also,
    related_topics,
    list,
    conceptual_link,
    external_link,
};

static GENERAL: Hooks = CONCEPTUAL;

static ORIENTATION: Hooks = Hooks {
    doc_element: "developerOrientationDocument",
    ..CONCEPTUAL
};

static GLOSSARY: Hooks = Hooks {
    doc_element: "developerGlossaryDocument",
    start_introduction: glossary_start_introduction,
    end_introduction: glossary_end_introduction,
    start_section: glossary_start_section,
    end_section: glossary_end_section,
    start_see_also: glossary_start_see_also,
    related_topics: glossary_related_topics,
    conceptual_link: glossary_conceptual_link,
    external_link: glossary_external_link,
    ..CONCEPTUAL
};

static HOW_TO: Hooks = Hooks {
    doc_element: "developerHowToDocument",
    start_section: how_to_start_section,
    end_section: how_to_end_section,
    start_see_also: how_to_start_see_also,
    list: how_to_list,
    ..CONCEPTUAL
};

/// Hooks for a topic variant. `None` for placeholder topics.
pub(super) fn for_kind(kind: TopicKind) -> Option<&'static Hooks> {
    match kind {
        TopicKind::Empty => None,
        TopicKind::General => Some(&GENERAL),
        TopicKind::Glossary => Some(&GLOSSARY),
        TopicKind::HowTo => Some(&HOW_TO),
        TopicKind::Orientation => Some(&ORIENTATION),
    }
}

// ============================================================================
// Conceptual
// ============================================================================

fn start_introduction(w: &mut TopicWriter<'_>, heading: &Heading) -> Result<(), WriteError> {
    w.xml.start("introduction")?;
    w.auto_outline(heading)?;
    w.state.topic = TopicState::Introduction;
    Ok(())
}

fn end_introduction(w: &mut TopicWriter<'_>) -> Result<(), WriteError> {
    if w.state.topic == TopicState::Introduction {
        w.xml.end()?;
        w.state.topic = TopicState::Content;
    }
    Ok(())
}

fn start_section(
    w: &mut TopicWriter<'_>,
    heading: &Heading,
    title: &str,
) -> Result<SectionState, WriteError> {
    if w.state.section() == SectionState::Content {
        w.xml.end()?;
        w.xml.start("sections")?;
        w.state.set_section(SectionState::Sections);
    }
    w.xml.start("section")?;
    // Skipped levels get an untitled wrapper.
    let titled = usize::from(heading.level) == w.state.section_level() + 1;
    if titled {
        w.xml.attribute("address", title)?;
        w.write_title(heading)?;
    }
    w.xml.start("content")?;
    w.auto_outline(heading)?;
    w.state.reset_block();
    Ok(SectionState::Content)
}

fn end_section(w: &mut TopicWriter<'_>, _state: SectionState) -> Result<(), WriteError> {
    w.xml.end()?;
    w.xml.end()?;
    Ok(())
}

fn start_see_also(w: &mut TopicWriter<'_>, level: usize) -> Result<(), WriteError> {
    w.end_sections(level)?;
    // A nested See Also replaces the parent's content or sections element.
    if level > 2 && w.state.section_level() > 1 {
        w.xml.end()?;
    }
    w.xml.start("relatedTopics")?;
    Ok(())
}

fn related_topics(w: &mut TopicWriter<'_>, references: &[Reference]) -> Result<(), WriteError> {
    let in_see_also = w.state.in_see_also();
    if references.is_empty() && !in_see_also {
        return Ok(());
    }
    if !in_see_also {
        w.xml.start("relatedTopics")?;
    }
    for reference in references {
        w.xml.start("externalLink")?;
        w.xml.start("linkUri")?;
        w.xml.text(&reference.url)?;
        w.xml.end()?;
        w.xml.start("linkText")?;
        w.xml.text(reference.title.as_deref().unwrap_or(&reference.label))?;
        w.xml.end()?;
        w.xml.end()?;
    }
    w.xml.end()?;
    Ok(())
}

fn list(w: &mut TopicWriter<'_>, list: &List) -> Result<(), WriteError> {
    let class = ListClass::of(list.kind);
    let wrap = w.state.section_level() > 2
        && !w.state.block_started()
        && matches!(class, ListClass::Ordered | ListClass::Bullet);
    if wrap {
        w.xml.start("para")?;
    }
    w.xml.start("list")?;
    w.xml.attribute("class", class.as_str())?;
    for item in &list.items {
        w.xml.start("listItem")?;
        w.nested(item)?;
        w.xml.end()?;
    }
    w.xml.end()?;
    if wrap {
        w.xml.end()?;
    }
    Ok(())
}

fn conceptual_link(
    w: &mut TopicWriter<'_>,
    target: &str,
    children: &[Inline],
) -> Result<(), WriteError> {
    let href = w.conceptual_href(target)?;
    w.xml.start("link")?;
    w.xml.attribute("xlink:href", &href)?;
    w.topic_type_attribute()?;
    w.write_children(children)?;
    w.xml.end()?;
    Ok(())
}

fn external_link(w: &mut TopicWriter<'_>, uri: &str, children: &[Inline]) -> Result<(), WriteError> {
    w.xml.start("externalLink")?;
    w.xml.start("linkUri")?;
    w.xml.text(uri)?;
    w.xml.end()?;
    w.xml.start("linkText")?;
    w.write_children(children)?;
    w.xml.end()?;
    w.xml.end()?;
    Ok(())
}

// ============================================================================
// Glossary
// ============================================================================

fn glossary_start_introduction(w: &mut TopicWriter<'_>, _heading: &Heading) -> Result<(), WriteError> {
    w.xml.start("glossary")?;
    w.state.topic = TopicState::Introduction;
    Ok(())
}

/// Entries live inside `<glossary>`, so it stays open until the end.
fn glossary_end_introduction(_w: &mut TopicWriter<'_>) -> Result<(), WriteError> {
    Ok(())
}

fn glossary_start_section(
    w: &mut TopicWriter<'_>,
    _heading: &Heading,
    title: &str,
) -> Result<SectionState, WriteError> {
    w.xml.start("glossaryEntry")?;
    w.xml.start("terms")?;
    for term in title.split(',').map(str::trim) {
        w.xml.start("term")?;
        w.xml.attribute("termId", &term.replace(' ', "-"))?;
        w.xml.text(term)?;
        w.xml.end()?;
    }
    w.xml.end()?;
    w.xml.start("definition")?;
    w.state.reset_block();
    Ok(SectionState::Content)
}

fn glossary_end_section(w: &mut TopicWriter<'_>, state: SectionState) -> Result<(), WriteError> {
    if state != SectionState::SeeAlso {
        w.xml.end()?;
    }
    w.xml.end()?;
    Ok(())
}

fn glossary_start_see_also(w: &mut TopicWriter<'_>, _level: usize) -> Result<(), WriteError> {
    if w.state.section_level() > 1 && w.state.section() == SectionState::Content {
        w.xml.end()?;
    }
    Ok(())
}

fn glossary_related_topics(w: &mut TopicWriter<'_>, _references: &[Reference]) -> Result<(), WriteError> {
    if w.state.topic == TopicState::Introduction {
        w.xml.end()?;
        w.state.topic = TopicState::Content;
    }
    Ok(())
}

/// In a See Also region only same-topic fragments survive, as related entries.
fn glossary_conceptual_link(
    w: &mut TopicWriter<'_>,
    target: &str,
    children: &[Inline],
) -> Result<(), WriteError> {
    if !w.state.in_see_also() {
        return conceptual_link(w, target, children);
    }
    let href = w.conceptual_href(target)?;
    if let Some(term) = href.strip_prefix('#') {
        w.xml.start("relatedEntry")?;
        w.xml.attribute("termId", term)?;
        w.xml.end()?;
    }
    Ok(())
}

fn glossary_external_link(
    w: &mut TopicWriter<'_>,
    uri: &str,
    children: &[Inline],
) -> Result<(), WriteError> {
    if w.state.in_see_also() {
        return Ok(());
    }
    external_link(w, uri, children)
}

// ============================================================================
// HowTo
// ============================================================================

fn how_to_start_section(
    w: &mut TopicWriter<'_>,
    heading: &Heading,
    _title: &str,
) -> Result<SectionState, WriteError> {
    w.xml.start("procedure")?;
    w.write_title(heading)?;
    w.state.reset_block();
    Ok(SectionState::Content)
}

fn how_to_end_section(w: &mut TopicWriter<'_>, _state: SectionState) -> Result<(), WriteError> {
    w.xml.end()?;
    Ok(())
}

/// Related topics cannot sit inside a procedure. A nested See Also closes the
/// enclosing one and keeps its level, so the level's later pop closes only
/// `<relatedTopics>`.
fn how_to_start_see_also(w: &mut TopicWriter<'_>, level: usize) -> Result<(), WriteError> {
    w.end_sections(level)?;
    if level > 2 && w.state.section_level() > 1 {
        w.xml.end()?;
    }
    w.xml.start("relatedTopics")?;
    Ok(())
}

/// Lists directly inside a procedure become its steps.
fn how_to_list(w: &mut TopicWriter<'_>, source: &List) -> Result<(), WriteError> {
    if w.state.section_level() < 2 || w.state.in_steps {
        return list(w, source);
    }
    w.xml.start("steps")?;
    w.xml.attribute("class", ListClass::of(source.kind).as_str())?;
    w.state.in_steps = true;
    for item in &source.items {
        w.xml.start("step")?;
        w.xml.start("content")?;
        w.nested(item)?;
        w.xml.end()?;
        w.xml.end()?;
    }
    w.state.in_steps = false;
    w.xml.end()?;
    Ok(())
}
