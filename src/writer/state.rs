//! Per-topic writer state.

use crate::config::TitlesConfig;
use crate::markup::ListKind;
use uuid::{Uuid, uuid};

/// Where the writer is in the fixed summary → introduction → body order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicState {
    None,
    Summary,
    Introduction,
    Content,
}

/// State of one level of the section stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionState {
    /// Nothing open at this level.
    None,
    /// A `<content>` element is open.
    Content,
    /// Flat content was closed and a `<sections>` element is open.
    Sections,
    /// A related topics region is open.
    SeeAlso,
}

/// Whether a block-level paragraph has been started in the current section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    None,
    Start,
}

/// Link group announced by a sub-heading of the related topics region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeeAlsoGroup {
    None,
    Concepts,
    OtherResources,
    Reference,
    Tasks,
}

impl SeeAlsoGroup {
    /// Match a heading against the localized group names.
    pub fn from_title(title: &str, titles: &TitlesConfig) -> Self {
        if title == titles.concepts {
            SeeAlsoGroup::Concepts
        } else if title == titles.other_resources {
            SeeAlsoGroup::OtherResources
        } else if title == titles.reference {
            SeeAlsoGroup::Reference
        } else if title == titles.tasks {
            SeeAlsoGroup::Tasks
        } else {
            SeeAlsoGroup::None
        }
    }

    /// Well-known topic type id written as `topicType_id`.
    pub fn topic_type_id(self) -> Option<Uuid> {
        match self {
            SeeAlsoGroup::None => None,
            SeeAlsoGroup::Concepts => Some(uuid!("1FE70836-AA7D-4515-B54B-E10C4B516E50")),
            SeeAlsoGroup::OtherResources => Some(uuid!("4A273212-0AC8-4D72-8349-EC11CD2FF8CD")),
            SeeAlsoGroup::Reference => Some(uuid!("A635375F-98C2-4241-94E7-E427B47C20B6")),
            SeeAlsoGroup::Tasks => Some(uuid!("DAC3A6A0-C863-4E5B-8F65-79EFC6A4BA09")),
        }
    }
}

/// Value of a list's `class` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListClass {
    NoBullet,
    Bullet,
    Ordered,
}

impl ListClass {
    /// `*` lists are bulleted; `-` and `+` lists are not.
    pub fn of(kind: ListKind) -> Self {
        match kind {
            ListKind::Bullet('*') => ListClass::Bullet,
            ListKind::Bullet(_) => ListClass::NoBullet,
            ListKind::Ordered(_) => ListClass::Ordered,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ListClass::NoBullet => "nobullet",
            ListClass::Bullet => "bullet",
            ListClass::Ordered => "ordered",
        }
    }
}

/// Mutable state threaded through one topic's tree walk.
#[derive(Debug)]
pub struct WriterState {
    pub topic: TopicState,
    /// One entry per open heading level; starts with a single `None`.
    pub sections: Vec<SectionState>,
    pub block: BlockState,
    /// A `<markup>` run is open in the current inline run.
    pub markup: bool,
    pub group: SeeAlsoGroup,
    pub title_set: bool,
    /// Direct items of a how-to `<steps>` list are being written.
    pub in_steps: bool,
}

impl WriterState {
    pub fn new() -> Self {
        Self {
            topic: TopicState::None,
            sections: vec![SectionState::None],
            block: BlockState::None,
            markup: false,
            group: SeeAlsoGroup::None,
            title_set: false,
            in_steps: false,
        }
    }

    /// Current nesting depth; 1 outside any section.
    pub fn section_level(&self) -> usize {
        self.sections.len()
    }

    pub fn section(&self) -> SectionState {
        self.sections.last().copied().unwrap_or(SectionState::None)
    }

    pub fn set_section(&mut self, state: SectionState) {
        if let Some(top) = self.sections.last_mut() {
            *top = state;
        }
    }

    pub fn in_see_also(&self) -> bool {
        self.section() == SectionState::SeeAlso
    }

    /// Whether a paragraph was written since the current section opened.
    pub fn block_started(&self) -> bool {
        self.block == BlockState::Start
    }

    pub fn reset_block(&mut self) {
        self.block = BlockState::None;
    }
}
