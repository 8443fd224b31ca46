//! Configuration schema types
//!
//! This module defines the configuration structure for Ediflow: runtime settings plus
//! the operator-maintained mapping tables (servers, schemas, translations, routes).

use crate::config::SecretString;
use crate::domain::directory::DirectorySettings;
use crate::domain::ids::{RecordId, SchemaId, ServerId};
use crate::domain::record::Values;
use crate::domain::schema::{ExportDestination, FileType, TranslationEntry};
use crate::domain::transaction::Direction;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::SocketAddr;

/// Transfer protocol of a server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Local directory standing in for a remote root
    Local,
    /// FTP server
    Ftp,
    /// SFTP server
    Sftp,
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::Local => write!(f, "local"),
            Protocol::Ftp => write!(f, "ftp"),
            Protocol::Sftp => write!(f, "sftp"),
        }
    }
}

/// Main Ediflow configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EdiConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Snapshot locations of the in-memory stores
    #[serde(default)]
    pub store: StoreConfig,

    /// Engine tuning
    #[serde(default)]
    pub processing: ProcessingConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Receipt endpoint settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Transfer servers and their directory settings
    #[serde(default)]
    pub servers: Vec<ServerConfig>,

    /// Mapping schemas
    #[serde(default)]
    pub schemas: Vec<SchemaConfig>,

    /// Value translation entries
    #[serde(default)]
    pub translations: Vec<TranslationEntry>,

    /// Receipt route to schema mapping
    #[serde(default)]
    pub routes: Vec<RouteConfig>,

    /// Accounts allowed to post documents to the receipt endpoint
    #[serde(default)]
    pub users: Vec<UserConfig>,
}

impl EdiConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.processing.validate()?;
        self.logging.validate()?;
        self.http.validate()?;

        let mut server_ids = HashSet::new();
        for server in &self.servers {
            server.validate()?;
            if !server_ids.insert(server.id.as_str()) {
                return Err(format!("Duplicate server id '{}'", server.id));
            }
        }

        let mut schema_ids = HashSet::new();
        for schema in &self.schemas {
            schema.validate()?;
            if !schema_ids.insert(schema.id.as_str()) {
                return Err(format!("Duplicate schema id '{}'", schema.id));
            }
            if let Some(dest) = &schema.export_destination {
                if !server_ids.contains(dest.server.as_str()) {
                    return Err(format!(
                        "Schema '{}' exports to unknown server '{}'",
                        schema.id, dest.server
                    ));
                }
            }
        }

        for server in &self.servers {
            for dir in &server.directories {
                if let Some(schema) = &dir.settings.mapping_schema {
                    if !schema_ids.contains(schema.as_str()) {
                        return Err(format!(
                            "Directory '{}' on server '{}' maps to unknown schema '{}'",
                            dir.path, server.id, schema
                        ));
                    }
                }
            }
        }

        for entry in &self.translations {
            if !schema_ids.contains(entry.schema.as_str()) {
                return Err(format!(
                    "Translation for '{}' references unknown schema '{}'",
                    entry.xml_element, entry.schema
                ));
            }
        }

        for route in &self.routes {
            if route.route.trim().is_empty() {
                return Err("routes.route cannot be empty".to_string());
            }
            if !schema_ids.contains(route.schema.as_str()) {
                return Err(format!(
                    "Route '{}' references unknown schema '{}'",
                    route.route, route.schema
                ));
            }
        }

        for user in &self.users {
            if user.login.trim().is_empty() {
                return Err("users.login cannot be empty".to_string());
            }
        }

        Ok(())
    }

    /// Looks up a server by id
    pub fn server(&self, id: &ServerId) -> Option<&ServerConfig> {
        self.servers.iter().find(|s| &s.id == id)
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Dry run mode (report what would be processed without touching anything)
    #[serde(default)]
    pub dry_run: bool,
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            dry_run: false,
        }
    }
}

/// Store snapshot configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// JSON snapshot of business records and model metadata
    #[serde(default)]
    pub records_path: Option<String>,

    /// JSON snapshot of transactions, attachments, logs and directories
    #[serde(default)]
    pub state_path: Option<String>,
}

/// Engine tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Matching elements per split part
    #[serde(default = "default_split_records_per_file")]
    pub split_records_per_file: usize,

    /// Days a log book is kept before the retention sweep deletes it
    #[serde(default = "default_log_retention_days")]
    pub log_retention_days: i64,

    /// Seconds a worker holds a transaction claim
    #[serde(default = "default_claim_lease_seconds")]
    pub claim_lease_seconds: u64,

    /// Maximum nesting of sub-schemas
    #[serde(default = "default_max_schema_depth")]
    pub max_schema_depth: usize,

    /// Parent of per-invocation temporary directories (system temp when unset)
    #[serde(default)]
    pub scratch_dir: Option<String>,
}

impl ProcessingConfig {
    fn validate(&self) -> Result<(), String> {
        if self.split_records_per_file == 0 {
            return Err("processing.split_records_per_file must be > 0".to_string());
        }
        if self.log_retention_days <= 0 {
            return Err("processing.log_retention_days must be > 0".to_string());
        }
        if self.claim_lease_seconds == 0 {
            return Err("processing.claim_lease_seconds must be > 0".to_string());
        }
        if self.max_schema_depth == 0 || self.max_schema_depth > 64 {
            return Err(format!(
                "processing.max_schema_depth must be between 1 and 64, got {}",
                self.max_schema_depth
            ));
        }
        Ok(())
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            split_records_per_file: default_split_records_per_file(),
            log_retention_days: default_log_retention_days(),
            claim_lease_seconds: default_claim_lease_seconds(),
            max_schema_depth: default_max_schema_depth(),
            scratch_dir: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local file logging
    #[serde(default)]
    pub local_enabled: bool,

    /// Local log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy (daily, hourly, never)
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }
        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err("logging.local_path cannot be empty when local_enabled".to_string());
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

/// Receipt endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Socket address the server binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Request path, also the route identifier looked up in `[[routes]]`
    #[serde(default = "default_route")]
    pub route: String,
}

impl HttpConfig {
    fn validate(&self) -> Result<(), String> {
        self.bind_address.parse::<SocketAddr>().map_err(|e| {
            format!(
                "Invalid http.bind_address '{}': {}",
                self.bind_address, e
            )
        })?;
        if !self.route.starts_with('/') {
            return Err(format!("http.route must start with '/', got '{}'", self.route));
        }
        Ok(())
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            route: default_route(),
        }
    }
}

/// Transfer server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub id: ServerId,

    pub protocol: Protocol,

    /// Host name (ftp/sftp)
    #[serde(default)]
    pub host: String,

    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub username: Option<String>,

    /// Stored securely in memory and automatically zeroized on drop
    #[serde(default)]
    pub password: Option<SecretString>,

    /// Private key file for SFTP key authentication
    #[serde(default)]
    pub private_key_path: Option<String>,

    /// Local directory acting as the remote root (local protocol)
    #[serde(default)]
    pub root: Option<String>,

    /// Settings applied to directories discovered on this server
    #[serde(default)]
    pub directories: Vec<DirectoryConfig>,
}

impl ServerConfig {
    fn validate(&self) -> Result<(), String> {
        match self.protocol {
            Protocol::Local => {
                if self.root.as_deref().map_or(true, |r| r.trim().is_empty()) {
                    return Err(format!(
                        "Server '{}' uses the local protocol but has no root",
                        self.id
                    ));
                }
            }
            Protocol::Ftp | Protocol::Sftp => {
                if self.host.trim().is_empty() {
                    return Err(format!("Server '{}' has no host", self.id));
                }
            }
        }

        for dir in &self.directories {
            if !dir.path.starts_with('/') {
                return Err(format!(
                    "Directory '{}' on server '{}' must be an absolute path",
                    dir.path, self.id
                ));
            }
            if dir.settings.split_records
                && dir
                    .settings
                    .split_tag
                    .as_deref()
                    .map_or(true, |t| t.trim().is_empty())
            {
                return Err(format!(
                    "Directory '{}' on server '{}' splits records but has no split_tag",
                    dir.path, self.id
                ));
            }
        }
        Ok(())
    }

    /// Host and port label for log output
    pub fn address(&self) -> String {
        match (self.protocol, self.port) {
            (Protocol::Local, _) => self.root.clone().unwrap_or_default(),
            (_, Some(port)) => format!("{}:{}", self.host, port),
            (_, None) => self.host.clone(),
        }
    }

    /// Configured settings for a directory path
    pub fn directory_settings(&self, path: &str) -> Option<&DirectorySettings> {
        let wanted = path.trim_end_matches('/');
        self.directories
            .iter()
            .find(|d| d.path.trim_end_matches('/') == wanted)
            .map(|d| &d.settings)
    }
}

/// Settings for one directory path of a server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    pub path: String,

    #[serde(flatten)]
    pub settings: DirectorySettings,
}

/// Mapping schema configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaConfig {
    pub id: SchemaId,

    /// Target record model (e.g. `res.partner`)
    pub model: String,

    pub direction: Direction,

    #[serde(default)]
    pub file_type: FileType,

    /// Main tables are entry points; sub tables are only reached through lines
    #[serde(default = "default_true")]
    pub main_table: bool,

    /// Slash-delimited wrapper path, outermost first
    #[serde(default)]
    pub xml_header: Option<String>,

    /// Element repeated once per record in multi-record documents
    #[serde(default)]
    pub multiple_records_element: Option<String>,

    #[serde(default)]
    pub default_values: Values,

    /// Comma-separated element paths used for upsert matching
    #[serde(default)]
    pub search_keys: Option<String>,

    /// Extra export selection filter
    #[serde(default)]
    pub additional_filter: Option<String>,

    #[serde(default)]
    pub translate: bool,

    #[serde(default)]
    pub partner_id: Option<RecordId>,

    #[serde(default)]
    pub company_id: Option<RecordId>,

    /// Inventory location injected into quant imports
    #[serde(default)]
    pub inventory_location_id: Option<RecordId>,

    #[serde(default)]
    pub export_destination: Option<ExportDestination>,

    #[serde(default)]
    pub lines: Vec<SchemaLineConfig>,
}

impl SchemaConfig {
    fn validate(&self) -> Result<(), String> {
        if self.model.trim().is_empty() {
            return Err(format!("Schema '{}' has no model", self.id));
        }
        for line in &self.lines {
            if line.xml_element.trim().is_empty() {
                return Err(format!("Schema '{}' has a line without xml_element", self.id));
            }
            if line.field.trim().is_empty() {
                return Err(format!(
                    "Schema '{}' line '{}' has no field",
                    self.id, line.xml_element
                ));
            }
            if line.char_length == Some(0) {
                return Err(format!(
                    "Schema '{}' line '{}' has char_length 0",
                    self.id, line.xml_element
                ));
            }
        }
        Ok(())
    }

    /// Parsed search key element paths
    pub fn search_key_list(&self) -> Vec<String> {
        self.search_keys
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// One schema line configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaLineConfig {
    pub xml_element: String,

    /// Field name on the schema's model
    pub field: String,

    #[serde(default)]
    pub m2o_search_field: Option<String>,

    #[serde(default)]
    pub sub_schema: Option<SchemaId>,

    #[serde(default)]
    pub char_length: Option<usize>,

    #[serde(default)]
    pub required: bool,
}

/// Receipt route mapping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    pub route: String,
    pub schema: SchemaId,
}

/// Receipt endpoint account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    pub login: String,

    /// Stored securely in memory and automatically zeroized on drop
    pub shared_secret: SecretString,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_split_records_per_file() -> usize {
    2000
}

fn default_log_retention_days() -> i64 {
    13
}

fn default_claim_lease_seconds() -> u64 {
    300
}

fn default_max_schema_depth() -> usize {
    8
}

fn default_local_path() -> String {
    "logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}

fn default_bind_address() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_route() -> String {
    "/cxml/receive".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::secret_string;
    use std::str::FromStr;

    fn server(id: &str) -> ServerConfig {
        ServerConfig {
            id: ServerId::from_str(id).unwrap(),
            protocol: Protocol::Local,
            host: String::new(),
            port: None,
            username: None,
            password: None,
            private_key_path: None,
            root: Some("/tmp/edi".to_string()),
            directories: vec![],
        }
    }

    fn schema(id: &str) -> SchemaConfig {
        SchemaConfig {
            id: SchemaId::from_str(id).unwrap(),
            model: "res.partner".to_string(),
            direction: Direction::Outgoing,
            file_type: FileType::Single,
            main_table: true,
            xml_header: None,
            multiple_records_element: None,
            default_values: Values::new(),
            search_keys: None,
            additional_filter: None,
            translate: false,
            partner_id: None,
            company_id: None,
            inventory_location_id: None,
            export_destination: None,
            lines: vec![],
        }
    }

    #[test]
    fn test_application_config_validation() {
        let mut config = ApplicationConfig {
            log_level: "info".to_string(),
            dry_run: false,
        };

        assert!(config.validate().is_ok());

        config.log_level = "invalid".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_processing_config_validation() {
        let mut config = ProcessingConfig::default();
        assert!(config.validate().is_ok());

        config.split_records_per_file = 0;
        assert!(config.validate().is_err());

        config = ProcessingConfig::default();
        config.max_schema_depth = 100;
        assert!(config.validate().is_err());

        config = ProcessingConfig::default();
        config.log_retention_days = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_http_config_validation() {
        let mut config = HttpConfig::default();
        assert!(config.validate().is_ok());

        config.bind_address = "not-an-address".to_string();
        assert!(config.validate().is_err());

        config = HttpConfig::default();
        config.route = "cxml".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_local_server_requires_root() {
        let mut s = server("local");
        assert!(s.validate().is_ok());
        s.root = None;
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_split_directory_requires_tag() {
        let mut s = server("local");
        s.directories.push(DirectoryConfig {
            path: "/in".to_string(),
            settings: DirectorySettings {
                split_records: true,
                ..Default::default()
            },
        });
        assert!(s.validate().is_err());

        s.directories[0].settings.split_tag = Some("Item".to_string());
        assert!(s.validate().is_ok());
        assert!(s.directory_settings("/in/").is_some());
    }

    #[test]
    fn test_duplicate_schema_ids_rejected() {
        let config = EdiConfig {
            schemas: vec![schema("a"), schema("a")],
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().contains("Duplicate schema id"));
    }

    #[test]
    fn test_unknown_destination_server_rejected() {
        let mut s = schema("partners");
        s.export_destination = Some(ExportDestination {
            server: ServerId::from_str("missing").unwrap(),
            directory: "/out".to_string(),
        });
        let config = EdiConfig {
            servers: vec![server("local")],
            schemas: vec![s],
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().contains("unknown server"));
    }

    #[test]
    fn test_route_must_reference_schema() {
        let config = EdiConfig {
            schemas: vec![schema("orders")],
            routes: vec![RouteConfig {
                route: "/cxml/receive".to_string(),
                schema: SchemaId::from_str("other").unwrap(),
            }],
            users: vec![UserConfig {
                login: "buyer".to_string(),
                shared_secret: secret_string("s3cret".to_string()),
            }],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_search_key_list() {
        let mut s = schema("a");
        s.search_keys = Some(" Ref, Name ,,".to_string());
        assert_eq!(s.search_key_list(), vec!["Ref", "Name"]);
    }

    #[test]
    fn test_default_values() {
        let config = EdiConfig::default();
        assert_eq!(config.processing.split_records_per_file, 2000);
        assert_eq!(config.processing.log_retention_days, 13);
        assert_eq!(config.http.route, "/cxml/receive");
        assert!(!config.logging.local_enabled);
        assert!(config.validate().is_ok());
    }
}
