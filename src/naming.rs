//! File-name conventions that decide a topic's variant.
//!
//! The base name (file name without extension) is split on `-` and spaces.
//! Rules are tried in order and the first match wins:
//!
//! 1. base name equals the containing folder's name → Orientation
//!    (`Widgets/Widgets.md`)
//! 2. first token is `HowTo` → HowTo (`HowTo-Build-Widgets.md`)
//! 3. last token is `Glossary` → Glossary (`Widget-Glossary.md`)
//! 4. last token is `Orientation` → Orientation (`Widgets-Orientation.md`)
//! 5. anything else → General
//!
//! All comparisons ignore ASCII case. Files at the source root have no
//! containing folder, so rule 1 never applies to them. Rule 4 is the older
//! naming scheme and is kept as a fallback for trees that still use it.
//!
//! A zero-length source file is a placeholder and is classified as Empty
//! before any of the rules run; see [`topic_kind`].

use crate::types::TopicKind;

/// Classify a topic from its base name and the name of its folder.
///
/// `folder` is `None` for files at the source root.
pub fn classify(base_name: &str, folder: Option<&str>) -> TopicKind {
    if folder.is_some_and(|f| base_name.eq_ignore_ascii_case(f)) {
        return TopicKind::Orientation;
    }

    let tokens: Vec<&str> = base_name.split(['-', ' ']).collect();
    let first = tokens.first().copied().unwrap_or_default();
    let last = tokens.last().copied().unwrap_or_default();

    if first.eq_ignore_ascii_case("HowTo") {
        TopicKind::HowTo
    } else if last.eq_ignore_ascii_case("Glossary") {
        TopicKind::Glossary
    } else if last.eq_ignore_ascii_case("Orientation") {
        TopicKind::Orientation
    } else {
        TopicKind::General
    }
}

/// Classify a source file, treating zero-length files as Empty.
pub fn topic_kind(base_name: &str, folder: Option<&str>, file_len: u64) -> TopicKind {
    if file_len == 0 {
        return TopicKind::Empty;
    }
    classify(base_name, folder)
}
