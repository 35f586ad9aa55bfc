//! Error types for wildfire-client.

use thiserror::Error;

use crate::transport::SourceLocation;

/// Main error type for all encode and emit operations.
///
/// Depth, recursion and filter sentinels are not errors: they are ordinary
/// string values in the encoded output.
#[derive(Debug, Error)]
pub enum WildfireError {
    /// A value has no representable form on the wire (e.g. NaN).
    #[error("Unsupported value: {0}")]
    UnsupportedValueKind(String),

    /// The per-stream message index ran past its limit. Fatal to the stream.
    #[error("Maximum number ({limit}) of messages reached")]
    IndexExhausted {
        /// Highest index the protocol allows.
        limit: u32,
    },

    /// The transport already started sending its body, so headers can no
    /// longer be written.
    #[error("Headers already sent{}. Cannot send log data", display_location(.location))]
    TransportAlreadyCommitted {
        /// Where the body output started, if the transport knows.
        location: Option<SourceLocation>,
    },

    /// Bad arguments at the caller API (label format, missing label,
    /// unbalanced groups, unknown options).
    #[error("Invalid call arguments: {0}")]
    InvalidCallArguments(String),

    /// JSON error from the `serde_json` backend or config loading.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn display_location(location: &Option<SourceLocation>) -> String {
    match location {
        Some(loc) => format!(" in {} on line {}", loc.file, loc.line),
        None => String::new(),
    }
}

impl WildfireError {
    /// Whether the stream can still be used after this error.
    ///
    /// Encoding failures only abort the current message.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WildfireError::IndexExhausted { .. } | WildfireError::TransportAlreadyCommitted { .. }
        )
    }
}

/// Result type alias using WildfireError.
pub type Result<T> = std::result::Result<T, WildfireError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_committed_message_includes_location() {
        let err = WildfireError::TransportAlreadyCommitted {
            location: Some(SourceLocation {
                file: "index.php".to_string(),
                line: 12,
            }),
        };
        assert_eq!(
            err.to_string(),
            "Headers already sent in index.php on line 12. Cannot send log data"
        );
    }

    #[test]
    fn test_committed_message_without_location() {
        let err = WildfireError::TransportAlreadyCommitted { location: None };
        assert_eq!(err.to_string(), "Headers already sent. Cannot send log data");
    }

    #[test]
    fn test_terminal_classification() {
        assert!(WildfireError::IndexExhausted { limit: 99_999 }.is_terminal());
        assert!(WildfireError::TransportAlreadyCommitted { location: None }.is_terminal());
        assert!(!WildfireError::UnsupportedValueKind("NaN".into()).is_terminal());
        assert!(!WildfireError::InvalidCallArguments("x".into()).is_terminal());
    }
}
