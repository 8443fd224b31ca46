//! Domain identifier types with validation
//!
//! Newtype wrappers for configuration names (schemas, servers) and for the numeric
//! identifiers the stores hand out (records, transactions, attachments, log books,
//! directories). Mixing them up is a compile error.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Schema identifier newtype wrapper
///
/// Names one configured SchemaTable (e.g. `partner_export`).
///
/// # Examples
///
/// ```
/// use ediflow::domain::ids::SchemaId;
/// use std::str::FromStr;
///
/// let schema = SchemaId::from_str("partner_export").unwrap();
/// assert_eq!(schema.as_str(), "partner_export");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaId(String);

impl SchemaId {
    /// Creates a new SchemaId from a string
    ///
    /// # Returns
    ///
    /// Returns `Ok(SchemaId)` if the name is valid, `Err` otherwise
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Schema ID cannot be empty".to_string());
        }
        if id.contains('/') {
            return Err(format!("Schema ID cannot contain '/': {id}"));
        }
        Ok(Self(id))
    }

    /// Returns the schema ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SchemaId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for SchemaId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Server identifier newtype wrapper
///
/// Names one configured FTP/SFTP server entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerId(String);

impl ServerId {
    /// Creates a new ServerId from a string
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Server ID cannot be empty".to_string());
        }
        Ok(Self(id))
    }

    /// Returns the server ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ServerId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for ServerId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Declares a store-assigned numeric identifier.
macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Wraps a raw store identifier
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            /// Returns the raw identifier
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<u64>()
                    .map(Self)
                    .map_err(|_| format!("Invalid {}: {s}", stringify!($name)))
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }
    };
}

numeric_id!(
    /// Business record identifier, unique within one model
    RecordId
);
numeric_id!(
    /// EDI transaction identifier
    TransactionId
);
numeric_id!(
    /// Attachment identifier
    AttachmentId
);
numeric_id!(
    /// Log book identifier
    LogBookId
);
numeric_id!(
    /// Discovered remote directory identifier
    DirectoryId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_id_valid() {
        let id = SchemaId::new("partner_export").unwrap();
        assert_eq!(id.as_str(), "partner_export");
        assert_eq!(id.to_string(), "partner_export");
    }

    #[test]
    fn test_schema_id_empty() {
        assert!(SchemaId::new("").is_err());
        assert!(SchemaId::new("   ").is_err());
    }

    #[test]
    fn test_schema_id_rejects_slash() {
        assert!(SchemaId::new("a/b").is_err());
    }

    #[test]
    fn test_server_id_from_str() {
        let id = ServerId::from_str("main-ftp").unwrap();
        assert_eq!(id.as_ref(), "main-ftp");
        assert!(ServerId::from_str("").is_err());
    }

    #[test]
    fn test_numeric_id_parse() {
        let id = RecordId::from_str(" 42 ").unwrap();
        assert_eq!(id.get(), 42);
        assert_eq!(id, RecordId::new(42));
        assert!(TransactionId::from_str("abc").is_err());
    }

    #[test]
    fn test_numeric_id_serde_transparent() {
        let id = TransactionId::new(7);
        assert_eq!(serde_json::to_string(&id).unwrap(), "7");
        let back: TransactionId = serde_json::from_str("7").unwrap();
        assert_eq!(back, id);
    }
}
