//! Converter configuration module.
//!
//! Handles loading and validating the optional `amdl2maml.toml` file that
//! sits in the source root. Every value has a stock default, so a source tree
//! without a config file converts exactly like one with an empty file.
//!
//! ## Config File Location
//!
//! ```text
//! docs/
//! ├── amdl2maml.toml           # Converter config (optional)
//! ├── Welcome.md
//! └── Widgets/
//!     ├── Widgets.md
//!     └── HowTo-Build-Widgets.md
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [markdown]
//! tables = true             # GitHub-style pipe tables
//! strikethrough = true      # ~~text~~
//! subscript = true          # ~text~
//! superscript = true        # ^text^
//! math = true               # $x$ and $$x$$
//!
//! [ids]
//! strategy = "random"       # "random" or "derived" (stable UUID from the topic path)
//!
//! [output]
//! extension = "aml"
//! indent = true
//! layout_file = "amdl2maml.content"   # "" disables the companion layout
//! copyright = "Copyright (c) Widget Co"   # banner comment; "" omits it
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! cache_documents = true    # Keep parse trees between matching and writing
//!
//! [titles]
//! see_also = "See Also"
//! concepts = "Concepts"
//! other_resources = "Other Resources"
//! reference = "Reference"
//! tasks = "Tasks"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Name of the config file looked up in the source root.
pub const CONFIG_FILE_NAME: &str = "amdl2maml.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Converter configuration loaded from `amdl2maml.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Markdown extensions recognized by the parser.
    pub markdown: MarkdownConfig,
    /// Identifier assignment for topics missing from the layout.
    pub ids: IdsConfig,
    /// Destination file settings.
    pub output: OutputConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
    /// Localized heading strings that drive the See Also region.
    pub titles: TitlesConfig,
}

impl Config {
    /// Validate config values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ext = &self.output.extension;
        if ext.is_empty() || ext.starts_with('.') || ext.contains(['/', '\\']) {
            return Err(ConfigError::Validation(
                "output.extension must be a bare extension like \"aml\"".into(),
            ));
        }
        if self.output.layout_file.contains(['/', '\\']) {
            return Err(ConfigError::Validation(
                "output.layout_file must be a file name, not a path".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        let titles = &self.titles;
        for (key, value) in [
            ("titles.see_also", &titles.see_also),
            ("titles.concepts", &titles.concepts),
            ("titles.other_resources", &titles.other_resources),
            ("titles.reference", &titles.reference),
            ("titles.tasks", &titles.tasks),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation(format!("{key} must not be empty")));
            }
        }
        Ok(())
    }
}

/// Markdown extension switches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarkdownConfig {
    pub tables: bool,
    pub strikethrough: bool,
    pub subscript: bool,
    pub superscript: bool,
    pub math: bool,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            tables: true,
            strikethrough: true,
            subscript: true,
            superscript: true,
            math: true,
        }
    }
}

/// How identifiers are produced for topics whose title is not in the layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdStrategy {
    /// A fresh random UUID on every run.
    #[default]
    Random,
    /// A name-based UUID derived from the topic's relative path.
    Derived,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IdsConfig {
    pub strategy: IdStrategy,
}

/// Destination file settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Extension given to every written topic, without the dot.
    pub extension: String,
    /// Indent nested elements (mixed content is never reindented).
    pub indent: bool,
    /// File name of the companion content layout written to the destination root.
    /// Empty disables it.
    pub layout_file: String,
    /// Copyright line written as the last banner comment. Empty omits it.
    /// Defaults to [`DEFAULT_COPYRIGHT`].
    pub copyright: String,
}

/// Licensing line of the tool itself, used when no copyright is configured.
pub const DEFAULT_COPYRIGHT: &str = concat!(
    "Copyright (c) ",
    env!("CARGO_PKG_NAME"),
    " contributors. Licensed under the ",
    env!("CARGO_PKG_LICENSE"),
    " license."
);

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            extension: "aml".to_string(),
            indent: true,
            layout_file: "amdl2maml.content".to_string(),
            copyright: DEFAULT_COPYRIGHT.to_string(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
    /// Keep each topic's parse tree from the matching step for the writing
    /// step. When off, trees are dropped after title resolution and sources
    /// are parsed again right before writing.
    pub cache_documents: bool,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            max_processes: None,
            cache_documents: true,
        }
    }
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Heading strings matched verbatim against heading text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TitlesConfig {
    pub see_also: String,
    pub concepts: String,
    pub other_resources: String,
    pub reference: String,
    pub tasks: String,
}

impl Default for TitlesConfig {
    fn default() -> Self {
        Self {
            see_also: "See Also".to_string(),
            concepts: "Concepts".to_string(),
            other_resources: "Other Resources".to_string(),
            reference: "Reference".to_string(),
            tasks: "Tasks".to_string(),
        }
    }
}

// =============================================================================
// Config loading and validation
// =============================================================================

/// Parse config text, rejecting unknown keys, and validate the result.
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Load config from `amdl2maml.toml` in the given directory.
///
/// Returns the stock defaults when the file does not exist.
pub fn load_config(root: &Path) -> Result<Config, ConfigError> {
    let config_path = root.join(CONFIG_FILE_NAME);
    if !config_path.exists() {
        return Ok(Config::default());
    }
    let content = fs::read_to_string(&config_path)?;
    parse_config(&content)
}

/// Returns a fully-commented stock `amdl2maml.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# amdl2maml Configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Place this file in the root of the source tree as amdl2maml.toml.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Markdown extensions
# ---------------------------------------------------------------------------
[markdown]
# GitHub-style pipe tables, written as <table> with a <tableHeader> row.
tables = true

# ~~text~~ written as <markup><s>text</s></markup>.
strikethrough = true

# ~text~ written as <subscript>.
subscript = true

# ^text^ written as <superscript>.
superscript = true

# $x$ and $$x$$ written as <math>.
math = true

# ---------------------------------------------------------------------------
# Topic identifiers
# ---------------------------------------------------------------------------
[ids]
# Topics whose title appears in the content layout always reuse its id.
# Other topics get:
#   "random"  - a new random id on every run
#   "derived" - a stable id computed from the topic's relative path
strategy = "random"

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
# Extension of written topics, without the dot.
extension = "aml"

# Indent nested elements.
indent = true

# Companion content layout written to the destination root.
# Feed it back with --layout to keep ids stable. Set to "" to disable.
layout_file = "amdl2maml.content"

# Copyright line added to the banner comments of every topic.
# Defaults to the amdl2maml license line. Set to "" to omit the comment.
# copyright = "Copyright (c) Widget Co"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4

# Keep parse trees in memory between matching and writing.
# Turn off for very large trees; sources are then parsed twice.
cache_documents = true

# ---------------------------------------------------------------------------
# Localized headings
# ---------------------------------------------------------------------------
[titles]
# A heading with exactly this text starts the related topics region.
see_also = "See Also"

# Sub-headings of the related topics region that group the links below them.
concepts = "Concepts"
other_resources = "Other Resources"
reference = "Reference"
tasks = "Tasks"
"##
}
