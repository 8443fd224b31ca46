//! Remote directories discovered on a transfer server

use super::ids::{DirectoryId, RecordId, SchemaId, ServerId};
use serde::{Deserialize, Serialize};

/// Per-directory transfer settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectorySettings {
    /// Download files from this directory during inner-file sync
    #[serde(default)]
    pub download: bool,

    /// Allow exports to upload into this directory
    #[serde(default)]
    pub upload: bool,

    /// Trading partner attached to incoming transactions
    #[serde(default)]
    pub partner: Option<RecordId>,

    /// Incoming schema applied to downloaded files
    #[serde(default)]
    pub mapping_schema: Option<SchemaId>,

    /// Resolve the schema from the document root element instead
    #[serde(default)]
    pub search_schema_by_header: bool,

    /// The partner drops a same-named file every day; keep each copy
    #[serde(default)]
    pub daily_new_file: bool,

    /// Split large files before ingesting them
    #[serde(default)]
    pub split_records: bool,

    /// Element name the splitter cuts on
    #[serde(default)]
    pub split_tag: Option<String>,
}

/// A directory known to exist on a server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteDirectory {
    pub id: DirectoryId,
    pub server: ServerId,
    /// Absolute remote path, e.g. `/in/orders`
    pub path: String,
    #[serde(default)]
    pub settings: DirectorySettings,
}

impl RemoteDirectory {
    /// Last path segment (`/in/orders` -> `orders`)
    pub fn base_name(&self) -> &str {
        self.path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
    }

    /// Sibling folder receiving split parts (`/in/orders/orders_split`)
    pub fn split_path(&self) -> String {
        join_remote(&self.path, &format!("{}_split", self.base_name()))
    }
}

/// Joins remote path segments with a single slash
pub fn join_remote(base: &str, name: &str) -> String {
    let base = base.trim_end_matches('/');
    let name = name.trim_start_matches('/');
    if base.is_empty() {
        format!("/{name}")
    } else {
        format!("{base}/{name}")
    }
}
