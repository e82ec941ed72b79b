use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum YzError {
    #[error("I/O error: {0}")]
    Io(#[source] std::io::Error),

    #[error("Format error: {0}")]
    Format(String),

    /// API called out of order, or called with arguments it can never accept.
    #[error("Usage error: {0}")]
    Usage(String),

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("pipeline did not drain within {0:?}")]
    Timeout(Duration),

    #[error("pipeline aborted: {0}")]
    Aborted(String),
}

impl YzError {
    pub fn format(msg: impl Into<String>) -> Self {
        YzError::Format(msg.into())
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        YzError::Usage(msg.into())
    }
}

impl From<YzError> for std::io::Error {
    fn from(e: YzError) -> Self {
        use std::io::ErrorKind;
        let kind = match &e {
            YzError::Io(inner) => inner.kind(),
            YzError::Usage(_) => ErrorKind::InvalidInput,
            YzError::Format(_) | YzError::Codec(_) => ErrorKind::InvalidData,
            YzError::Timeout(_) => ErrorKind::TimedOut,
            YzError::Aborted(_) => ErrorKind::Other,
        };
        match e {
            YzError::Io(inner) => inner,
            other => std::io::Error::new(kind, other),
        }
    }
}

// A YzError that crossed a Read/Write boundary comes back out unchanged.
impl From<std::io::Error> for YzError {
    fn from(e: std::io::Error) -> Self {
        if !e.get_ref().is_some_and(|inner| inner.is::<YzError>()) {
            return YzError::Io(e);
        }
        match e.into_inner().map(|inner| inner.downcast::<YzError>()) {
            Some(Ok(inner)) => *inner,
            _ => YzError::Aborted("wrapped error lost in conversion".into()),
        }
    }
}

// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, YzError>;
