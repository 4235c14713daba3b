//! The success/error envelope every reader returns.
//!
//! A parse either fails with a [`ReaderError`] (grammar violations carry the
//! 1-based line where the tokenizer stood) or succeeds with a [`Parsed`] value
//! that also carries any non-fatal warnings collected along the way.

/// Errors that can occur while reading any supported format
#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    /// Structural grammar violation at a known line
    #[error("{message} (line {line})")]
    Syntax {
        /// Human readable description of the violation
        message: String,
        /// 1-based line number where the violation was detected
        line: usize,
    },

    /// Malformed input without a meaningful line (bad binary framing, version mismatch, missing sections)
    #[error("{0}")]
    Format(String),

    /// Input requests a feature the readers do not implement
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Cooperative cancellation was observed between chunks
    #[error("Parsing cancelled")]
    Cancelled,

    /// I/O error while unwrapping compressed input
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReaderError {
    /// Create a syntax error at the given line
    pub fn syntax(message: impl Into<String>, line: usize) -> Self {
        ReaderError::Syntax {
            message: message.into(),
            line,
        }
    }

    /// Create a format error
    pub fn format(message: impl Into<String>) -> Self {
        ReaderError::Format(message.into())
    }

    /// Line number of a syntax error, if any
    pub fn line(&self) -> Option<usize> {
        match self {
            ReaderError::Syntax { line, .. } => Some(*line),
            _ => None,
        }
    }

    /// The message without the line suffix
    pub fn message(&self) -> String {
        match self {
            ReaderError::Syntax { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// A successfully parsed value plus the warnings produced while parsing it
#[derive(Debug, Clone)]
pub struct Parsed<T> {
    /// The parsed value
    pub result: T,
    /// Recoverable anomalies (skipped records, unknown header lines, ...)
    pub warnings: Vec<String>,
}

impl<T> Parsed<T> {
    /// Wrap a value with no warnings
    pub fn new(result: T) -> Self {
        Self {
            result,
            warnings: Vec::new(),
        }
    }

    /// Wrap a value with the given warnings
    pub fn with_warnings(result: T, warnings: Vec<String>) -> Self {
        Self { result, warnings }
    }

    /// Drop the warnings and keep the value
    pub fn into_result(self) -> T {
        self.result
    }

    /// Transform the value, keeping the warnings
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Parsed<U> {
        Parsed {
            result: f(self.result),
            warnings: self.warnings,
        }
    }
}

/// Result type returned by every reader entry point
pub type ReaderResult<T> = Result<Parsed<T>, ReaderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error_carries_line() {
        let err = ReaderError::syntax("Expected value.", 12);
        assert_eq!(err.line(), Some(12));
        assert_eq!(err.message(), "Expected value.");
        assert_eq!(err.to_string(), "Expected value. (line 12)");
    }

    #[test]
    fn test_format_error_has_no_line() {
        let err = ReaderError::format("no atoms data");
        assert_eq!(err.line(), None);
        assert_eq!(err.to_string(), "no atoms data");
    }

    #[test]
    fn test_parsed_map_keeps_warnings() {
        let parsed = Parsed::with_warnings(2, vec!["skipped".to_string()]);
        let mapped = parsed.map(|v| v * 10);
        assert_eq!(mapped.result, 20);
        assert_eq!(mapped.warnings, vec!["skipped".to_string()]);
    }
}
