//! File attachments
//!
//! An attachment stores the raw bytes of one transferred document plus a text cache of
//! its content.

use super::ids::{AttachmentId, DirectoryId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored document payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: AttachmentId,
    pub name: String,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
    /// Decoded text of XML payloads
    pub file_content: Option<String>,
    pub directory: Option<DirectoryId>,
    pub sync_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Values for an attachment about to be created
#[derive(Debug, Clone, PartialEq)]
pub struct NewAttachment {
    pub name: String,
    pub data: Vec<u8>,
    pub file_content: Option<String>,
    pub directory: Option<DirectoryId>,
    pub sync_date: Option<DateTime<Utc>>,
}

impl NewAttachment {
    /// Builds an attachment, caching text content for XML file names
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        let name = name.into();
        let file_content = name
            .to_lowercase()
            .contains("xml")
            .then(|| String::from_utf8_lossy(&data).into_owned());
        Self {
            name,
            data,
            file_content,
            directory: None,
            sync_date: None,
        }
    }

    pub fn in_directory(mut self, directory: DirectoryId, synced_at: DateTime<Utc>) -> Self {
        self.directory = Some(directory);
        self.sync_date = Some(synced_at);
        self
    }

    pub fn into_attachment(self, id: AttachmentId, now: DateTime<Utc>) -> Attachment {
        Attachment {
            id,
            name: self.name,
            data: self.data,
            file_content: self.file_content,
            directory: self.directory,
            sync_date: self.sync_date,
            created_at: now,
        }
    }
}

impl Attachment {
    /// Text content, falling back to a lossy decode of the raw bytes
    pub fn text(&self) -> String {
        self.file_content
            .clone()
            .unwrap_or_else(|| String::from_utf8_lossy(&self.data).into_owned())
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_cache_only_for_xml_names() {
        let xml = NewAttachment::new("/in/orders.xml", b"<Orders/>".to_vec());
        assert_eq!(xml.file_content.as_deref(), Some("<Orders/>"));

        let bin = NewAttachment::new("/in/image.png", vec![0, 1, 2]);
        assert!(bin.file_content.is_none());
    }

    #[test]
    fn test_data_serializes_as_base64() {
        let att = NewAttachment::new("a.xml", b"<a/>".to_vec())
            .into_attachment(AttachmentId::new(1), Utc::now());
        let json = serde_json::to_value(&att).unwrap();
        assert_eq!(json["data"], "PGEvPg==");

        let back: Attachment = serde_json::from_value(json).unwrap();
        assert_eq!(back.data, b"<a/>".to_vec());
    }
}
