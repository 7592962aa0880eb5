//! Run orchestration: sequences the pipeline steps over a whole source tree.
//!
//! ```text
//! READING   layout file → title lookup
//! INDEXING  source tree → topic entries
//! MATCHING  parse, title and id per topic          (parallel)
//! MAPPING   topics → name registry
//! WRITING   one MAML file per topic                (parallel)
//! LAYOUT    companion content layout, when enabled
//! ```
//!
//! Steps that affect the whole run (a missing source folder, a broken layout
//! file, two topics with the same name) abort it. A failure inside a single
//! topic is reported as a [`ConvertEvent::TopicFailed`] and the run goes on
//! without that topic.
//!
//! Progress is reported as [`ConvertEvent`]s over an optional channel. The
//! receiving end is a single printer thread, so workers never touch stdout.
//!
//! Topic files are rendered in memory and moved into place through a
//! temporary file in the destination folder. A failed or cancelled topic
//! leaves no partial file behind.

use crate::config::Config;
use crate::index::{self, IndexError};
use crate::layout::{self, LayoutError, TitleLookup};
use crate::matcher::{self, MatchError, TopicRegistry};
use crate::types::{Topic, TopicEntry};
use crate::writer::{self, WriteContext, WriteError};
use rayon::prelude::*;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Match(#[from] MatchError),
    #[error(transparent)]
    Write(#[from] WriteError),
    #[error("Failed to write {path}: {error}")]
    Output { path: PathBuf, error: std::io::Error },
    #[error("Conversion cancelled")]
    Cancelled,
}

/// Input and output locations of a run.
#[derive(Debug, Clone)]
pub struct Paths {
    pub source: PathBuf,
    pub destination: PathBuf,
    /// Content layout whose ids are reused.
    pub layout: Option<PathBuf>,
}

/// Shared stop signal. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), ConvertError> {
        if self.is_cancelled() {
            return Err(ConvertError::Cancelled);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Reading,
    Indexing,
    Matching,
    Mapping,
    Writing,
    Layout,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Reading => "READING",
            Step::Indexing => "INDEXING",
            Step::Matching => "MATCHING",
            Step::Mapping => "MAPPING",
            Step::Writing => "WRITING",
            Step::Layout => "LAYOUT",
        };
        f.write_str(name)
    }
}

const CONVERT_STEPS: &[Step] = &[
    Step::Reading,
    Step::Indexing,
    Step::Matching,
    Step::Mapping,
    Step::Writing,
    Step::Layout,
];

/// Progress of a run, in the order it happens.
///
/// `index` values are 1-based. Per-topic events from parallel steps arrive
/// in completion order.
#[derive(Debug, Clone, PartialEq)]
pub enum ConvertEvent {
    Started,
    StepStarted {
        step: Step,
        index: usize,
        count: usize,
    },
    Progress {
        step: Step,
        index: usize,
        count: usize,
        name: String,
    },
    StepFinished {
        step: Step,
        elapsed: Duration,
    },
    TopicFailed {
        path: PathBuf,
        message: String,
    },
    Finished {
        elapsed: Duration,
        written: usize,
        failed: usize,
    },
}

/// A topic left out of the run.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicFailure {
    /// Source path relative to the source root.
    pub path: PathBuf,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct ConvertReport {
    pub written: usize,
    pub failed: Vec<TopicFailure>,
}

/// A link to a topic name that no indexed topic has.
#[derive(Debug, Clone, PartialEq)]
pub struct UnresolvedLink {
    pub from: PathBuf,
    pub target: String,
}

#[derive(Debug, Default)]
pub struct CheckReport {
    pub topics: Vec<Topic>,
    pub failed: Vec<TopicFailure>,
    pub unresolved: Vec<UnresolvedLink>,
}

// ============================================================================
// Pipeline plumbing
// ============================================================================

struct Pipeline<'a> {
    events: Option<Sender<ConvertEvent>>,
    cancel: &'a CancellationToken,
    steps: Vec<Step>,
}

impl Pipeline<'_> {
    fn send(&self, event: ConvertEvent) {
        if let Some(tx) = &self.events {
            tx.send(event).ok();
        }
    }

    /// Run one step between its start and finish events.
    fn step<T>(
        &self,
        step: Step,
        run: impl FnOnce() -> Result<T, ConvertError>,
    ) -> Result<T, ConvertError> {
        self.cancel.check()?;
        let index = self.steps.iter().position(|s| *s == step).map_or(0, |i| i + 1);
        self.send(ConvertEvent::StepStarted {
            step,
            index,
            count: self.steps.len(),
        });
        let started = Instant::now();
        let value = run()?;
        self.cancel.check()?;
        self.send(ConvertEvent::StepFinished {
            step,
            elapsed: started.elapsed(),
        });
        Ok(value)
    }

    fn progress(&self, step: Step, done: &AtomicUsize, count: usize, name: &str) {
        let index = done.fetch_add(1, Ordering::SeqCst) + 1;
        self.send(ConvertEvent::Progress {
            step,
            index,
            count,
            name: name.to_string(),
        });
    }

    fn failure(&self, path: PathBuf, error: &ConvertError) -> TopicFailure {
        let failure = TopicFailure {
            path,
            message: error.to_string(),
        };
        self.send(ConvertEvent::TopicFailed {
            path: failure.path.clone(),
            message: failure.message.clone(),
        });
        failure
    }

    /// Parse and title every entry. Failed topics are dropped and returned
    /// separately.
    fn match_topics(
        &self,
        source: &Path,
        entries: Vec<TopicEntry>,
        lookup: &TitleLookup,
        config: &Config,
    ) -> (Vec<Topic>, Vec<TopicFailure>) {
        let count = entries.len();
        let done = AtomicUsize::new(0);
        let results: Vec<Option<Result<Topic, TopicFailure>>> = entries
            .into_par_iter()
            .map(|entry| {
                if self.cancel.is_cancelled() {
                    return None;
                }
                let path = entry.relative_path();
                let name = entry.name().to_string();
                let result = matcher::match_topic(source, entry, lookup, config)
                    .map_err(|e| self.failure(path, &ConvertError::from(e)));
                self.progress(Step::Matching, &done, count, &name);
                Some(result)
            })
            .collect();

        let mut topics = Vec::with_capacity(count);
        let mut failed = Vec::new();
        for result in results.into_iter().flatten() {
            match result {
                Ok(topic) => topics.push(topic),
                Err(failure) => failed.push(failure),
            }
        }
        (topics, failed)
    }
}

fn read_and_index(
    pipeline: &Pipeline<'_>,
    source: &Path,
    layout: Option<&Path>,
) -> Result<(TitleLookup, Vec<TopicEntry>), ConvertError> {
    let lookup = pipeline.step(Step::Reading, || Ok(layout::read_layout(layout)?))?;
    let entries = pipeline.step(Step::Indexing, || Ok(index::index(source)?))?;
    Ok((lookup, entries))
}

// ============================================================================
// Convert
// ============================================================================

/// Convert a whole source tree into `paths.destination`.
pub fn convert(
    paths: &Paths,
    config: &Config,
    cancel: &CancellationToken,
    events: Option<Sender<ConvertEvent>>,
) -> Result<ConvertReport, ConvertError> {
    let started = Instant::now();
    let mut steps = CONVERT_STEPS.to_vec();
    if config.output.layout_file.is_empty() {
        steps.retain(|s| *s != Step::Layout);
    }
    let pipeline = Pipeline {
        events,
        cancel,
        steps,
    };
    pipeline.send(ConvertEvent::Started);

    let (lookup, entries) = read_and_index(&pipeline, &paths.source, paths.layout.as_deref())?;
    let (topics, mut failed) = pipeline.step(Step::Matching, || {
        Ok(pipeline.match_topics(&paths.source, entries, &lookup, config))
    })?;
    let registry = pipeline.step(Step::Mapping, || Ok(TopicRegistry::build(&topics)?))?;

    let ctx = WriteContext {
        registry: &registry,
        config,
    };
    let (written, write_failed) =
        pipeline.step(Step::Writing, || write_topics(&pipeline, paths, &topics, &ctx))?;
    failed.extend(write_failed);

    if !config.output.layout_file.is_empty() {
        pipeline.step(Step::Layout, || {
            let bytes = layout::write_layout(&topics, config.output.indent)?;
            write_atomic(&paths.destination.join(&config.output.layout_file), &bytes)
        })?;
    }

    pipeline.send(ConvertEvent::Finished {
        elapsed: started.elapsed(),
        written,
        failed: failed.len(),
    });
    Ok(ConvertReport { written, failed })
}

fn write_topics(
    pipeline: &Pipeline<'_>,
    paths: &Paths,
    topics: &[Topic],
    ctx: &WriteContext<'_>,
) -> Result<(usize, Vec<TopicFailure>), ConvertError> {
    fs::create_dir_all(&paths.destination).map_err(|error| ConvertError::Output {
        path: paths.destination.clone(),
        error,
    })?;

    let count = topics.len();
    let done = AtomicUsize::new(0);
    let results: Vec<Result<bool, TopicFailure>> = topics
        .par_iter()
        .map(|topic| {
            let result = write_one(topic, paths, ctx, pipeline.cancel);
            pipeline.progress(Step::Writing, &done, count, topic.name());
            match result {
                Ok(written) => Ok(written),
                Err(ConvertError::Cancelled) => Ok(false),
                Err(e) => Err(pipeline.failure(topic.entry.relative_path(), &e)),
            }
        })
        .collect();

    let mut written = 0;
    let mut failed = Vec::new();
    for result in results {
        match result {
            Ok(true) => written += 1,
            Ok(false) => {}
            Err(failure) => failed.push(failure),
        }
    }
    Ok((written, failed))
}

/// Render and store one topic. `false` when the topic writes no file.
fn write_one(
    topic: &Topic,
    paths: &Paths,
    ctx: &WriteContext<'_>,
    cancel: &CancellationToken,
) -> Result<bool, ConvertError> {
    if !writer::writes_output(topic.kind()) {
        return Ok(false);
    }
    cancel.check()?;
    let parsed;
    let document = match &topic.document {
        Some(document) => document,
        None => {
            parsed = matcher::read_document(&paths.source, &topic.entry, &ctx.config.markdown)?;
            &parsed
        }
    };
    let Some(bytes) = writer::write_topic(topic, document, ctx)? else {
        return Ok(false);
    };
    cancel.check()?;
    let destination = paths
        .destination
        .join(topic.entry.destination_path(&ctx.config.output.extension));
    write_atomic(&destination, &bytes)?;
    Ok(true)
}

/// Write `bytes` to `path` through a temporary file in the same folder.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ConvertError> {
    let fail = |error| ConvertError::Output {
        path: path.to_path_buf(),
        error,
    };
    let dir = path.parent().unwrap_or(Path::new("."));
    fs::create_dir_all(dir).map_err(fail)?;
    let mut file = NamedTempFile::new_in(dir).map_err(fail)?;
    file.write_all(bytes).map_err(fail)?;
    file.persist(path).map_err(|e| fail(e.error))?;
    Ok(())
}

// ============================================================================
// Check
// ============================================================================

/// Index and match a source tree without writing anything, and list the
/// links whose target topic does not exist.
pub fn check(
    source: &Path,
    layout: Option<&Path>,
    config: &Config,
    cancel: &CancellationToken,
    events: Option<Sender<ConvertEvent>>,
) -> Result<CheckReport, ConvertError> {
    let started = Instant::now();
    let pipeline = Pipeline {
        events,
        cancel,
        steps: vec![Step::Reading, Step::Indexing, Step::Matching, Step::Mapping],
    };
    pipeline.send(ConvertEvent::Started);

    let (lookup, entries) = read_and_index(&pipeline, source, layout)?;
    let (topics, mut failed) = pipeline.step(Step::Matching, || {
        Ok(pipeline.match_topics(source, entries, &lookup, config))
    })?;

    let unresolved = pipeline.step(Step::Mapping, || {
        let registry = TopicRegistry::build(&topics)?;
        let mut unresolved = Vec::new();
        for topic in &topics {
            cancel.check()?;
            let parsed;
            let document = match &topic.document {
                Some(document) => document,
                None => match matcher::read_document(source, &topic.entry, &config.markdown) {
                    Ok(document) => {
                        parsed = document;
                        &parsed
                    }
                    Err(e) => {
                        failed.push(pipeline.failure(topic.entry.relative_path(), &ConvertError::from(e)));
                        continue;
                    }
                },
            };
            for target in document.link_targets() {
                if let Some(name) = writer::linked_topic(target)
                    && registry.get(name).is_none()
                {
                    unresolved.push(UnresolvedLink {
                        from: topic.entry.relative_path(),
                        target: name.to_string(),
                    });
                }
            }
        }
        Ok(unresolved)
    })?;

    pipeline.send(ConvertEvent::Finished {
        elapsed: started.elapsed(),
        written: 0,
        failed: failed.len(),
    });
    Ok(CheckReport {
        topics,
        failed,
        unresolved,
    })
}
