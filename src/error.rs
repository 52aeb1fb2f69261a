//! Crate error type.
//!
//! Completion itself never fails from the caller's point of view: the
//! [`Engine`](crate::Engine) logs these and answers with an empty list.
//! They surface from the cache and importer layers, and from
//! [`Engine::new`](crate::Engine::new).

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Reading or stat-ing a file failed.
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A package could not be located or decoded.
    #[error("cannot import {path:?}: {message}")]
    Import { path: String, message: String },

    #[error("cursor {cursor} is past the end of a {len}-byte buffer")]
    CursorOutOfRange { cursor: usize, len: usize },

    /// A worker panicked; the payload message is kept when it was a string.
    #[error("task panicked: {0}")]
    TaskPanicked(String),

    /// Some tasks of a parallel batch failed. `first` is one of them.
    #[error("{failed} of the batch failed, first: {first}")]
    FanOut { failed: usize, first: Box<Error> },

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Turn a `catch_unwind` payload into an error.
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_owned());
        Error::TaskPanicked(message)
    }

    /// Fold the outcomes of a parallel batch: `Ok` only when every task
    /// succeeded.
    pub(crate) fn join<T>(results: Vec<Result<T>>) -> Result<Vec<T>> {
        let mut values = Vec::with_capacity(results.len());
        let mut failed = 0;
        let mut first = None;
        for result in results {
            match result {
                Ok(value) => values.push(value),
                Err(err) => {
                    failed += 1;
                    first.get_or_insert(err);
                }
            }
        }
        match first {
            None => Ok(values),
            Some(first) => Err(Error::FanOut {
                failed,
                first: Box::new(first),
            }),
        }
    }
}
