//! # amdl2maml
//!
//! Converts a folder tree of AMDL topics (a Markdown dialect) into Microsoft
//! Assistance Markup Language (MAML) topics, plus a content layout that keeps
//! topic ids stable from one run to the next.
//!
//! # Architecture: Step Pipeline
//!
//! A run goes through a fixed sequence of steps. Each step finishes for the
//! whole tree before the next starts, so every later step sees read-only data:
//!
//! ```text
//! 1. Reading   layout file  →  title → id lookup
//! 2. Indexing  source/      →  topic entries    (file name → topic variant)
//! 3. Matching  entries      →  topics           (parse, title, id)
//! 4. Mapping   topics       →  name registry    (link targets)
//! 5. Writing   topics       →  destination/**/*.aml
//! 6. Layout    topics       →  destination/amdl2maml.content
//! ```
//!
//! Matching and writing run one task per topic on a rayon pool. A topic that
//! fails in either step is reported and skipped; everything else keeps going.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | `amdl2maml.toml` loading, validation and the documented stock config |
//! | [`types`] | Shared types passed between steps (`TopicEntry`, `Topic`, `Verbosity`) |
//! | [`naming`] | File name → topic variant classification |
//! | [`index`] | Walks the source tree into topic entries |
//! | [`layout`] | Reads content layouts into a title lookup and writes the companion layout |
//! | [`markup`] | Markdown → typed document tree (pulldown-cmark plus `:::` containers) |
//! | [`matcher`] | Titles, ids and the name registry |
//! | [`writer`] | The topic writer: document tree → MAML, one hook table per variant |
//! | [`convert`] | Runs the steps, reports progress events, handles cancellation |
//! | [`output`] | CLI output formatting for progress and check reports |
//!
//! # Design Decisions
//!
//! ## Topic Variants as Hook Tables
//!
//! General, Glossary, HowTo and Orientation topics share one tree walk and
//! differ at a handful of points: the document element, the introduction, how
//! a section opens and closes, the See Also region, lists and links. Each
//! variant is a static table of function pointers, with the conceptual table
//! as the base the others override field by field. Placeholder topics have no
//! table at all and write nothing.
//!
//! ## Ids From the Layout
//!
//! A topic whose title appears in the content layout reuses that id.
//! Everything else gets a fresh random id, or with `ids.strategy = "derived"`
//! a name-based UUID of its relative path. Feeding the written layout back in
//! with `--layout` reproduces the same ids, so a second run over an unchanged
//! tree writes identical files.
//!
//! ## Writes Are All or Nothing
//!
//! A topic is rendered completely in memory before anything touches the
//! destination, then moved into place through a temporary file in the same
//! folder. An unresolved link, a second `#` heading or a cancelled run never
//! leaves a truncated `.aml` file behind.

pub mod config;
pub mod convert;
pub mod index;
pub mod layout;
pub mod markup;
pub mod matcher;
pub mod naming;
pub mod output;
pub mod types;
pub mod writer;

#[cfg(test)]
pub(crate) mod test_helpers;
