use std::error::Error as StdError;
use std::fmt;
use std::path::PathBuf;

use tracing_error::{SpanTrace, SpanTraceStatus};

/* 📖 # What does an error carry?

An error is a structural `ErrorKind` plus everything gathered while it travels upwards:
- a list of context strings, in the order they were attached
- an optional cause (another `LecternError`) for errors raised while handling an error
- the span trace captured at construction time

The kind is what callers match on (the HTTP layer maps kinds to status codes); the rest
is diagnostics only.
*/

/// Error variants that can occur in lectern operations.
#[derive(Debug)]
pub enum ErrorKind {
    /// File system operation failed
    FileError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A requested resource (usually a book file) does not exist
    NotFound { what: String },

    /// A payload could not be parsed into a document
    ParseFailure { message: String },

    /// A directory could not be enumerated
    DirectoryReadFailure {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Caller supplied an unusable argument (empty query, zero page length, ...)
    InvalidArgument { message: String },

    /// Catch-all for other errors with a message
    Message { message: String },
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::FileError { path, source } => {
                write!(f, "File error at {}: {}", path.display(), source)
            }
            ErrorKind::NotFound { what } => write!(f, "Not found: {}", what),
            ErrorKind::ParseFailure { message } => write!(f, "Parse failure: {}", message),
            ErrorKind::DirectoryReadFailure { path, source } => {
                write!(f, "Could not read directory {}: {}", path.display(), source)
            }
            ErrorKind::InvalidArgument { message } => write!(f, "Invalid argument: {}", message),
            ErrorKind::Message { message } => write!(f, "{}", message),
        }
    }
}

/// Error type wrapping an [`ErrorKind`] with context, cause and span trace.
pub struct LecternError {
    kind: ErrorKind,
    context: Vec<String>,
    cause: Option<Box<LecternError>>,
    span_trace: SpanTrace,
}

impl LecternError {
    /// Creates a new error from an ErrorKind, capturing the current span trace.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: vec![],
            cause: None,
            span_trace: SpanTrace::capture(),
        }
    }

    /// Creates a `Message` error.
    pub fn message(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Message {
            message: message.into(),
        })
    }

    /// Creates a `NotFound` error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound { what: what.into() })
    }

    /// Creates a `ParseFailure` error.
    pub fn parse_failure(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ParseFailure {
            message: message.into(),
        })
    }

    /// Creates an `InvalidArgument` error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument {
            message: message.into(),
        })
    }

    /// Attaches context to an error.
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Attaches context using lazy evaluation.
    pub fn with_context<F>(mut self, f: F) -> Self
    where
        F: FnOnce() -> String,
    {
        self.context.push(f());
        self
    }

    /// Records the error that was being handled when this one was raised.
    pub fn caused_by(mut self, cause: impl Into<Box<LecternError>>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Returns a reference to the underlying ErrorKind.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Returns the attached context strings in attachment order.
    pub fn get_context(&self) -> &[String] {
        &self.context
    }

    /// Returns the cause recorded with [`LecternError::caused_by`].
    pub fn cause(&self) -> Option<&LecternError> {
        self.cause.as_deref()
    }

    /// Returns the innermost error in the chain.
    pub fn root_cause(&self) -> &(dyn StdError + 'static) {
        let mut current: &(dyn StdError + 'static) = self;
        while let Some(next) = current.source() {
            current = next;
        }
        current
    }

    fn fmt_tree(&self, f: &mut fmt::Formatter<'_>, indent: &str) -> fmt::Result {
        let branch_count = self.context.len() + usize::from(self.cause.is_some());
        for (index, context) in self.context.iter().enumerate() {
            let branch = if index + 1 == branch_count {
                "└─"
            } else {
                "├─"
            };
            writeln!(f, "{}{} {}", indent, branch, context)?;
        }
        if let Some(cause) = &self.cause {
            writeln!(f, "{}└─ cause: {}", indent, cause.kind)?;
            cause.fmt_tree(f, &format!("{}   ", indent))?;
        }
        Ok(())
    }
}

impl From<ErrorKind> for LecternError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl StdError for LecternError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match &self.kind {
            ErrorKind::FileError { source, .. } => Some(source),
            ErrorKind::DirectoryReadFailure { source, .. } => Some(source),
            _ => self
                .cause
                .as_deref()
                .map(|cause| cause as &(dyn StdError + 'static)),
        }
    }
}

impl fmt::Display for LecternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ctx in &self.context {
            write!(f, "{}: ", ctx)?;
        }
        write!(f, "{}", self.kind)
    }
}

impl fmt::Debug for LecternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.kind)?;
        self.fmt_tree(f, "")?;
        if self.span_trace.status() == SpanTraceStatus::CAPTURED {
            writeln!(f, "Trace: {}", self.span_trace)?;
        }
        Ok(())
    }
}

/// Standard result type for lectern operations.
pub type LecternResult<T> = std::result::Result<T, Box<LecternError>>;

/// Extension trait for attaching context to Results.
pub trait ResultExt<T> {
    /// Attaches context to an error, consuming and re-wrapping it.
    fn context(self, context: impl Into<String>) -> LecternResult<T>;

    /// Attaches context using lazy evaluation.
    /// Context is only evaluated if the result is an error.
    fn with_context<F>(self, f: F) -> LecternResult<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for LecternResult<T> {
    fn context(self, context: impl Into<String>) -> LecternResult<T> {
        self.map_err(|err| Box::new(err.context(context)))
    }

    fn with_context<F>(self, f: F) -> LecternResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|err| Box::new(err.with_context(f)))
    }
}

/// Builds a boxed `Message` error from format arguments.
#[macro_export]
macro_rules! err {
    ($($arg:tt)*) => {
        ::std::boxed::Box::new($crate::LecternError::message(format!($($arg)*)))
    };
}

/// Returns early with a boxed `Message` error built from format arguments.
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::err!($($arg)*))
    };
}
