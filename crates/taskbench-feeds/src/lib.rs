//! taskbench-feeds — content sources for taskbench.
//!
//! Each source implements [`taskbench_core::ContentSource`]. Sources are
//! picked by name from the `[content]` config section through
//! [`open_content_source`].

pub mod generated;
pub mod line;
pub mod single;

pub use generated::GeneratedDocSource;
pub use line::LineDocSource;
pub use single::SingleDocSource;

use taskbench_core::config::ContentConfig;
use taskbench_core::{ConfigError, ContentSource, Result};
use tracing::debug;

type Opener = fn(&ContentConfig) -> Result<Box<dyn ContentSource>>;

/// Name → constructor table for every known content source.
const SOURCES: &[(&str, Opener)] = &[
    ("single", open_single),
    ("line", open_line),
    ("generated", open_generated),
];

fn open_single(cfg: &ContentConfig) -> Result<Box<dyn ContentSource>> {
    Ok(Box::new(SingleDocSource::new(cfg.forever)))
}

fn open_line(cfg: &ContentConfig) -> Result<Box<dyn ContentSource>> {
    Ok(Box::new(LineDocSource::open(&cfg.docs_file, cfg.forever)?))
}

fn open_generated(cfg: &ContentConfig) -> Result<Box<dyn ContentSource>> {
    Ok(Box::new(GeneratedDocSource::new(cfg.generated_docs, cfg.forever)))
}

/// Names accepted by [`open_content_source`].
pub fn source_names() -> impl Iterator<Item = &'static str> {
    SOURCES.iter().map(|(name, _)| *name)
}

/// Build the source named by `cfg.source` (case-insensitive; a trailing
/// `DocSource` or `ContentSource` is ignored).
pub fn open_content_source(cfg: &ContentConfig) -> Result<Box<dyn ContentSource>> {
    let requested = cfg.source.trim();
    let lowered = requested.to_ascii_lowercase();
    let key = lowered
        .strip_suffix("contentsource")
        .or_else(|| lowered.strip_suffix("docsource"))
        .unwrap_or(&lowered);

    let (_, open) = SOURCES
        .iter()
        .find(|(name, _)| *name == key)
        .ok_or_else(|| ConfigError::UnknownContentSource {
            name: requested.to_string(),
            supported: source_names().collect::<Vec<_>>().join(", "),
        })?;
    debug!(source = key, forever = cfg.forever, "opening content source");
    open(cfg)
}
