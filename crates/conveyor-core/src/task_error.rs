//! Processing error types
//!
//! Errors raised by a task processor are either transient (the work item is
//! left unacknowledged so the queue redelivers it, bounded by the receive
//! cap) or fatal (the task is marked failed immediately and never retried).

use std::fmt;

/// Error from a task processor, tagged with retry semantics.
#[derive(Debug)]
pub struct ProcessingError {
    inner: anyhow::Error,
    transient: bool,
}

impl ProcessingError {
    /// Create a fatal processing error.
    ///
    /// Fatal errors mark the task failed without retrying. Use this for
    /// domain failures: invalid input that will not change on redelivery,
    /// business-rule rejections, missing configuration.
    pub fn fatal(err: impl Into<anyhow::Error>) -> Self {
        Self {
            inner: err.into(),
            transient: false,
        }
    }

    /// Create a transient processing error.
    ///
    /// Transient errors leave the work item unacknowledged so the queue's
    /// visibility timeout redelivers it. Use this for network failures,
    /// temporary resource unavailability, or rate limiting.
    pub fn transient(err: impl Into<anyhow::Error>) -> Self {
        Self {
            inner: err.into(),
            transient: true,
        }
    }

    /// Whether redelivery should retry this error.
    pub fn is_transient(&self) -> bool {
        self.transient
    }

    /// Get the inner error
    pub fn inner(&self) -> &anyhow::Error {
        &self.inner
    }
}

impl fmt::Display for ProcessingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl std::error::Error for ProcessingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner.source()
    }
}

/// Extension trait for Result to tag errors as transient processing errors.
pub trait ProcessingResultExt<T> {
    /// Mark this result as transient on error
    fn transient(self) -> Result<T, ProcessingError>;
}

impl<T, E: Into<anyhow::Error>> ProcessingResultExt<T> for Result<T, E> {
    fn transient(self) -> Result<T, ProcessingError> {
        self.map_err(|e| ProcessingError::transient(e.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_error() {
        let err = ProcessingError::fatal(anyhow::anyhow!("bad payload"));
        assert!(!err.is_transient());
        assert!(err.to_string().contains("bad payload"));
    }

    #[test]
    fn test_transient_error() {
        let err = ProcessingError::transient(anyhow::anyhow!("network timeout"));
        assert!(err.is_transient());
        assert!(err.to_string().contains("network timeout"));
    }

    #[test]
    fn test_result_ext() {
        let result: Result<(), anyhow::Error> = Err(anyhow::anyhow!("downstream unavailable"));
        let tagged = result.transient();
        assert!(tagged.unwrap_err().is_transient());
    }
}
