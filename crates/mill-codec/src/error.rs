use std::fmt;

use crate::mapping::MappingError;

/// Scope/state misuse of a [`DocumentWriter`](crate::DocumentWriter).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterError {
    /// A value or scope was written inside a document with no name pending.
    MissingName,
    /// `write_name` was called while a name was already pending, or a scope
    /// was closed with an unconsumed pending name.
    PendingName,
    /// `write_name` was called outside a document scope.
    NameOutsideDocument,
    /// An `end_*` did not match the innermost open scope.
    ScopeMismatch,
    /// A write was attempted after the root value was completed.
    Finished,
    /// The writer was finished while scopes were still open.
    Unfinished,
    /// The writer was finished before anything was written.
    Empty,
    /// The finished root value is not a document.
    NotADocument,
}

impl fmt::Display for WriterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriterError::MissingName => write!(f, "value written in document without a name"),
            WriterError::PendingName => write!(f, "name pending without a value"),
            WriterError::NameOutsideDocument => write!(f, "name written outside a document"),
            WriterError::ScopeMismatch => write!(f, "end does not match the open scope"),
            WriterError::Finished => write!(f, "write after the root value was completed"),
            WriterError::Unfinished => write!(f, "writer finished with open scopes"),
            WriterError::Empty => write!(f, "writer finished with no output"),
            WriterError::NotADocument => write!(f, "root value is not a document"),
        }
    }
}

impl std::error::Error for WriterError {}

/// Error raised while encoding a stage, expression, or filter tree.
///
/// All errors are raised at the point of detection and propagate uncaught
/// through the encode call chain; a partially written sink after a failed
/// encode is invalid and must be discarded.
#[derive(Debug, Clone, PartialEq)]
pub enum EncodeError {
    Writer(WriterError),
    Mapping(MappingError),
    /// Two mutually exclusive construction paths were used on one node.
    ConflictingModes(&'static str),
    /// Malformed input detected at construction time.
    InvalidArgument(String),
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::Writer(e) => write!(f, "writer error: {e}"),
            EncodeError::Mapping(e) => write!(f, "mapping error: {e}"),
            EncodeError::ConflictingModes(what) => {
                write!(f, "conflicting construction modes on {what}")
            }
            EncodeError::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
        }
    }
}

impl std::error::Error for EncodeError {}

impl From<WriterError> for EncodeError {
    fn from(e: WriterError) -> Self {
        EncodeError::Writer(e)
    }
}

impl From<MappingError> for EncodeError {
    fn from(e: MappingError) -> Self {
        EncodeError::Mapping(e)
    }
}
