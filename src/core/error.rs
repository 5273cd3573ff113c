use std::error::Error;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::panic::Location;

/// What went wrong, in terms a caller can dispatch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A write would exceed a fixed-length view.
    OutOfRangeWrite,
    /// Invalid construction or call parameters.
    InvalidRange,
    /// The input ended before the format said it would.
    TruncatedInput,
    /// A token in the compressed stream is illegal for its format.
    MalformedToken,
    /// A Huffman code cannot be represented within the format's cap.
    HuffmanCapExceeded,
    /// Encode requested for a decode-only format.
    UnsupportedOperation,
    /// Failure in the underlying byte source.
    Io,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug)]
pub struct CodecError {
    pub kind: ErrorKind,
    pub message: Option<String>,
    pub context: Option<String>,
    pub source: Option<Box<dyn Error + Send + Sync>>,
    pub location: &'static Location<'static>,
}

pub type Res<T> = Result<T, CodecError>;

impl Error for CodecError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self.source {
            Some(ref err) => Some(err.deref()),
            None => None,
        }
    }
}

impl Display for CodecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {}", self.kind, self.location)?;
        if let Some(context) = &self.context {
            write!(f, " ({})", context)?
        }
        if let Some(message) = &self.message {
            write!(f, ": {}", message)?
        }
        if let Some(cause) = &self.source {
            write!(f, "\ncaused by {}", cause)?
        }
        Ok(())
    }
}

impl CodecError {
    #[track_caller]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        CodecError {
            kind,
            message: Some(message.into()),
            context: None,
            source: None,
            location: Location::caller(),
        }
    }

    #[track_caller]
    pub(crate) fn truncated(what: &str) -> Self {
        Self::new(ErrorKind::TruncatedInput, format!("ran out of input reading {}", what))
    }

    pub(crate) fn with_context(mut self, context: Option<String>) -> Self {
        if self.context.is_none() {
            self.context = context;
        }
        self
    }
}

impl From<CodecError> for std::io::Error {
    fn from(value: CodecError) -> Self {
        let kind = match value.kind {
            ErrorKind::TruncatedInput => std::io::ErrorKind::UnexpectedEof,
            _ => std::io::ErrorKind::InvalidData,
        };
        std::io::Error::new(kind, value)
    }
}

impl From<std::io::Error> for CodecError {
    #[track_caller]
    fn from(value: std::io::Error) -> Self {
        let kind = match value.kind() {
            std::io::ErrorKind::UnexpectedEof => ErrorKind::TruncatedInput,
            _ => ErrorKind::Io,
        };
        CodecError {
            kind,
            message: None,
            context: None,
            source: Some(Box::new(value)),
            location: Location::caller(),
        }
    }
}

/// Error-raising helpers for types that carry decode/encode state. The
/// `describe` text is attached to every error raised through the trait, so a
/// failure deep in a token loop still names the operation it happened in.
pub(crate) trait ErrorContext {
    fn describe(&self) -> Option<String> {
        None
    }

    #[track_caller]
    fn raise<T>(&self, kind: ErrorKind, message: String) -> Res<T> {
        Err(CodecError {
            kind,
            message: Some(message),
            context: self.describe(),
            source: None,
            location: Location::caller(),
        })
    }

    #[track_caller]
    fn malformed<T>(&self, message: String) -> Res<T> {
        self.raise(ErrorKind::MalformedToken, message)
    }
}

/// Attach a context's description to an error bubbling through it.
pub(crate) trait WithContext<T> {
    fn at<C: ErrorContext>(self, context: &C) -> Res<T>;
}

impl<T> WithContext<T> for Res<T> {
    fn at<C: ErrorContext>(self, context: &C) -> Res<T> {
        self.map_err(|e| e.with_context(context.describe()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Op;

    impl ErrorContext for Op {
        fn describe(&self) -> Option<String> {
            Some("test op".into())
        }
    }

    #[test]
    fn raised_errors_carry_kind_and_context() {
        let err = Op.raise::<()>(ErrorKind::MalformedToken, "bad token".into()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedToken);
        assert_eq!(err.context.as_deref(), Some("test op"));
        let text = err.to_string();
        assert!(text.contains("MalformedToken"));
        assert!(text.contains("bad token"));
    }

    #[test]
    fn io_eof_maps_to_truncated() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
        let err = CodecError::from(io);
        assert_eq!(err.kind, ErrorKind::TruncatedInput);
    }
}
