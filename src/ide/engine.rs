//! The public completion engine.

use std::borrow::Cow;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

use super::completion::{AutoCompleteContext, Completion};
use crate::base::{char_to_byte_offset, floor_char_boundary};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::project::{CacheStats, Counters, PackageImporter};
use crate::syntax::{GoParser, SourceParser};

/// A completion engine: configuration plus the caches it owns.
///
/// Requests are serialized; the work inside one request (reading sibling
/// files, importing packages) runs on the engine's own thread pool.
///
/// ```no_run
/// use gocomplete::{Config, Engine};
///
/// let engine = Engine::new(Config::from_env())?;
/// let src = b"package main\nimport \"fmt\"\nfunc main() { fmt.Pr }";
/// let completion = engine.complete(src, "/src/app/main.go", src.len() - 2);
/// for candidate in &completion.candidates {
///     println!("{candidate}");
/// }
/// # Ok::<(), gocomplete::Error>(())
/// ```
pub struct Engine {
    context: Mutex<AutoCompleteContext>,
    parser: Arc<dyn SourceParser>,
    importer: Option<Arc<dyn PackageImporter>>,
    pool: Arc<rayon::ThreadPool>,
    counters: Arc<Counters>,
}

impl Engine {
    /// Create an engine with the bundled parser and source importer.
    pub fn new(config: Config) -> Result<Self> {
        Self::build(config, Arc::new(GoParser), None)
    }

    /// Create an engine with custom collaborators.
    pub fn with_collaborators(
        config: Config,
        parser: Arc<dyn SourceParser>,
        importer: Arc<dyn PackageImporter>,
    ) -> Result<Self> {
        Self::build(config, parser, Some(importer))
    }

    fn build(
        config: Config,
        parser: Arc<dyn SourceParser>,
        importer: Option<Arc<dyn PackageImporter>>,
    ) -> Result<Self> {
        let pool = Arc::new(build_pool(config.worker_threads)?);
        let counters = Arc::new(Counters::default());
        let context = AutoCompleteContext::new(
            config,
            parser.clone(),
            importer.clone(),
            pool.clone(),
            counters.clone(),
        );
        Ok(Self {
            context: Mutex::new(context),
            parser,
            importer,
            pool,
            counters,
        })
    }

    /// Complete at byte offset `cursor` of `buffer`.
    ///
    /// Never fails: anything that goes wrong is logged and answered with
    /// an empty completion.
    pub fn complete(&self, buffer: &[u8], filename: &str, cursor: usize) -> Completion {
        if cursor > buffer.len() {
            let err = Error::CursorOutOfRange {
                cursor,
                len: buffer.len(),
            };
            tracing::debug!(filename, "{err}");
            return Completion::default();
        }
        let (text, cursor) = decode(buffer, cursor);
        self.complete_text(&text, filename, cursor)
    }

    /// Like [`Engine::complete`], with the cursor counted in characters.
    pub fn complete_chars(&self, buffer: &[u8], filename: &str, chars: usize) -> Completion {
        let text = String::from_utf8_lossy(buffer);
        let cursor = char_to_byte_offset(&text, chars);
        self.complete_text(&text, filename, cursor)
    }

    fn complete_text(&self, text: &str, filename: &str, cursor: usize) -> Completion {
        let context = self.context.lock();
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            context.apropos(text, Path::new(filename), cursor)
        }));
        match outcome {
            Ok(Ok(completion)) => completion,
            Ok(Err(err)) => {
                tracing::debug!(filename, cursor, "completion failed: {err}");
                Completion::default()
            }
            Err(payload) => {
                let err = Error::from_panic(payload);
                tracing::warn!(filename, cursor, "completion panicked: {err}");
                Completion::default()
            }
        }
    }

    /// Counters of the work the caches have done so far.
    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }

    pub fn config(&self) -> Config {
        self.context.lock().config.clone()
    }

    /// Replace the configuration.
    ///
    /// Changing the search roots or cache sizing drops every cache; the
    /// other options take effect on the next request.
    pub fn set_config(&self, config: Config) -> Result<()> {
        let mut context = self.context.lock();
        let current = &context.config;
        let keeps_caches = current.lib_paths == config.lib_paths
            && current.max_concurrent_reads == config.max_concurrent_reads
            && current.dir_cache_capacity == config.dir_cache_capacity
            && current.worker_threads == config.worker_threads;
        if keeps_caches {
            context.config = config;
            return Ok(());
        }

        tracing::debug!(lib_paths = ?config.lib_paths, "configuration changed, dropping caches");
        let pool = if current.worker_threads == config.worker_threads {
            self.pool.clone()
        } else {
            Arc::new(build_pool(config.worker_threads)?)
        };
        *context = AutoCompleteContext::new(
            config,
            self.parser.clone(),
            self.importer.clone(),
            pool,
            self.counters.clone(),
        );
        Ok(())
    }
}

fn build_pool(threads: usize) -> Result<rayon::ThreadPool> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("gocomplete-{i}"))
        .build()?;
    Ok(pool)
}

/// Decode `buffer`, moving `cursor` back to the start of the character it
/// points into.
fn decode(buffer: &[u8], cursor: usize) -> (Cow<'_, str>, usize) {
    if let Ok(text) = std::str::from_utf8(buffer) {
        return (Cow::Borrowed(text), floor_char_boundary(text, cursor));
    }
    let mut cursor = cursor;
    while cursor > 0 && cursor < buffer.len() && buffer[cursor] & 0xC0 == 0x80 {
        cursor -= 1;
    }
    // Invalid sequences widen when replaced; decode the halves separately
    // so the cursor stays between the same characters.
    let head = String::from_utf8_lossy(&buffer[..cursor]);
    let tail = String::from_utf8_lossy(&buffer[cursor..]);
    let cursor = head.len();
    (Cow::Owned(format!("{head}{tail}")), cursor)
}
