//! Domain error types
//!
//! This module defines the error hierarchy for Ediflow. The top-level variants follow
//! the failure taxonomy the engine reasons about: configuration errors are fatal,
//! validation errors are surfaced to the operator, transport errors are downgraded to a
//! failed transaction, and data-mapping errors are scoped to a single line or record.
//! Errors never expose third-party types.

use thiserror::Error;

/// Main Ediflow error type
///
/// This is the primary error type used throughout the application.
#[derive(Debug, Error)]
pub enum EdiError {
    /// Configuration-related errors (missing sub-schema, missing split tag, bad model)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Validation errors (missing credentials, required export field, destination)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Transport errors (FTP/SFTP/local transfer)
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Data mapping errors (element not found, coercion failure, unresolved reference)
    #[error("Data mapping error: {0}")]
    DataMapping(String),

    /// Empty or blank XML document, raised before parsing is attempted
    #[error("Invalid XML: {0}")]
    InvalidXml(String),

    /// XML parse or write failure
    #[error("XML error: {0}")]
    Xml(String),

    /// Record or EDI store errors
    #[error("Store error: {0}")]
    Store(String),

    /// Illegal transaction state transitions
    #[error("State error: {0}")]
    State(String),

    /// Authentication errors
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

/// Transport-specific errors
///
/// Errors that occur while talking to an FTP/SFTP server or its local stand-in.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Failed to connect to the server
    #[error("Failed to connect to {host}: {message}")]
    ConnectionFailed { host: String, message: String },

    /// Connection was reset by the peer mid-operation
    #[error("Connection reset: {0}")]
    ConnectionReset(String),

    /// Authentication against the server failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Directory or file not found on the server
    #[error("Path not found: {0}")]
    NotFound(String),

    /// Listing a directory failed
    #[error("Failed to list {path}: {message}")]
    ListFailed { path: String, message: String },

    /// Upload failed
    #[error("Failed to upload {path}: {message}")]
    UploadFailed { path: String, message: String },

    /// Download failed
    #[error("Failed to download {path}: {message}")]
    DownloadFailed { path: String, message: String },

    /// Protocol is not supported by the configured factory
    #[error("Unsupported protocol: {0}")]
    UnsupportedProtocol(String),
}

impl EdiError {
    /// Returns true for errors that must abort a whole batch rather than one unit
    pub fn is_systemic(&self) -> bool {
        matches!(
            self,
            EdiError::Configuration(_)
                | EdiError::Transport(TransportError::ConnectionFailed { .. })
        )
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for EdiError {
    fn from(err: std::io::Error) -> Self {
        EdiError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for EdiError {
    fn from(err: serde_json::Error) -> Self {
        EdiError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for EdiError {
    fn from(err: toml::de::Error) -> Self {
        EdiError::Configuration(format!("TOML parse error: {err}"))
    }
}

impl From<quick_xml::Error> for EdiError {
    fn from(err: quick_xml::Error) -> Self {
        EdiError::Xml(err.to_string())
    }
}

impl From<zip::result::ZipError> for EdiError {
    fn from(err: zip::result::ZipError) -> Self {
        EdiError::Io(format!("Zip archive error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edi_error_display() {
        let err = EdiError::Configuration("Sub schema missing".to_string());
        assert_eq!(err.to_string(), "Configuration error: Sub schema missing");
    }

    #[test]
    fn test_invalid_xml_display() {
        let err = EdiError::InvalidXml("document is empty".to_string());
        assert_eq!(err.to_string(), "Invalid XML: document is empty");
    }

    #[test]
    fn test_transport_error_conversion() {
        let transport_err = TransportError::ConnectionReset("peer closed".to_string());
        let err: EdiError = transport_err.into();
        assert!(matches!(err, EdiError::Transport(_)));
        assert!(!err.is_systemic());
    }

    #[test]
    fn test_connection_failure_is_systemic() {
        let err: EdiError = TransportError::ConnectionFailed {
            host: "ftp.example.com".to_string(),
            message: "refused".to_string(),
        }
        .into();
        assert!(err.is_systemic());
        assert!(EdiError::Configuration("x".to_string()).is_systemic());
        assert!(!EdiError::DataMapping("x".to_string()).is_systemic());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: EdiError = io_err.into();
        assert!(matches!(err, EdiError::Io(_)));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: EdiError = json_err.into();
        assert!(matches!(err, EdiError::Serialization(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let err: EdiError = toml_err.into();
        assert!(matches!(err, EdiError::Configuration(_)));
        assert!(err.to_string().contains("TOML parse error"));
    }
}
