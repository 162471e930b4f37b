//! Error taxonomy shared by every stage of index construction and reading.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// File unreadable/missing or output location invalid
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// Unparseable sequence record
    #[error("{}:{line}: {message}", path.display())]
    Format {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// Symbol outside the alphabet, or alphabet/flag mismatch
    #[error("{0}")]
    Alphabet(String),

    /// One or more violated option constraints
    #[error("{0}")]
    Configuration(Violations),

    /// The reader asked for a table that was never written
    #[error("index {} has no {table} table (it was not requested at construction time)", index.display())]
    MissingTable { index: PathBuf, table: String },

    /// On-disk state that disagrees with itself
    #[error("index {} is inconsistent: {message}", index.display())]
    Corrupt { index: PathBuf, message: String },
}

impl Error {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Error::Io {
            context: context.into(),
            source,
        }
    }

    /// Io error whose context names a file
    pub fn file(action: &str, path: &Path, source: io::Error) -> Self {
        Error::Io {
            context: format!("cannot {} {}", action, path.display()),
            source,
        }
    }

    pub fn format(path: &Path, line: usize, message: impl Into<String>) -> Self {
        Error::Format {
            path: path.to_path_buf(),
            line,
            message: message.into(),
        }
    }

    pub fn corrupt(index: &Path, message: impl Into<String>) -> Self {
        Error::Corrupt {
            index: index.to_path_buf(),
            message: message.into(),
        }
    }

    /// Single-violation configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        let mut violations = Violations::default();
        violations.push(message);
        Error::Configuration(violations)
    }
}

/// Collected constraint violations, reported together in lexical order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Violations(Vec<String>);

impl Violations {
    pub fn push(&mut self, message: impl Into<String>) {
        self.0.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn messages(&self) -> &[String] {
        &self.0
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.0.iter().any(|m| m.contains(needle))
    }

    pub fn extend(&mut self, other: Violations) {
        self.0.extend(other.0);
    }

    /// `Ok(())` when nothing was violated, otherwise a sorted, de-duplicated
    /// configuration error.
    pub fn into_result(mut self) -> Result<()> {
        if self.0.is_empty() {
            return Ok(());
        }
        self.0.sort();
        self.0.dedup();
        Err(Error::Configuration(self))
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [single] => write!(f, "{}", single),
            many => {
                write!(f, "{} configuration errors:", many.len())?;
                for message in many {
                    write!(f, "\n  - {}", message)?;
                }
                Ok(())
            }
        }
    }
}
