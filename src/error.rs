//! Error records for every pipeline stage.
//!
//! Scanner, parser, resolver and interpreter failures share one shape,
//! `{line, message}`, rendered as `"{line}: {message}"`.  Nothing here
//! prints; reporting is the caller's job.

use std::io;
use thiserror::Error;

use log::info;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoxError {
    #[error("{line}: {message}")]
    Lex { message: String, line: usize },

    #[error("{line}: {message}")]
    Parse { message: String, line: usize },

    /// Static resolution failure (top-level `return`, self-referencing
    /// initializer, duplicate local declaration).
    #[error("{line}: {message}")]
    Resolve { message: String, line: usize },

    /// Runtime evaluation error, reported at the offending token's line.
    #[error("{line}: {message}")]
    Runtime { message: String, line: usize },

    /// Failed write of `print` output.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Source file that is not UTF-8.
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl LoxError {
    // Constructors log every record at info level.

    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("lex error at {}: {}", line, message);

        LoxError::Lex { message, line }
    }

    pub fn parse<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("parse error at {}: {}", line, message);

        LoxError::Parse { message, line }
    }

    pub fn resolve<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("resolve error at {}: {}", line, message);

        LoxError::Resolve { message, line }
    }

    pub fn runtime<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("runtime error at {}: {}", line, message);

        LoxError::Runtime { message, line }
    }

    /// Source line of the record, `0` for errors that come from outside the
    /// pipeline (I/O, decoding).
    pub fn line(&self) -> usize {
        match self {
            LoxError::Lex { line, .. }
            | LoxError::Parse { line, .. }
            | LoxError::Resolve { line, .. }
            | LoxError::Runtime { line, .. } => *line,
            LoxError::Io(_) | LoxError::Utf8(_) => 0,
        }
    }

    /// Message part of the record, without the line prefix.
    pub fn message(&self) -> String {
        match self {
            LoxError::Lex { message, .. }
            | LoxError::Parse { message, .. }
            | LoxError::Resolve { message, .. }
            | LoxError::Runtime { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// `true` for failures that happen while the program runs, as opposed to
    /// static (scan/parse/resolve) failures.
    pub fn is_runtime(&self) -> bool {
        matches!(self, LoxError::Runtime { .. } | LoxError::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, LoxError>;
