//! Remote directory and file synchronization
//!
//! - [`sync_directories`] mirrors the directory tree of a server into the EDI store
//! - [`sync_inner_files`] downloads `.xml` files from download-enabled directories and
//!   creates an attachment and an incoming transaction for each
//!
//! Directories flagged with `split_records` have their files split first. The parts are
//! uploaded to the sibling `<dir>_split` folder, which is then ingested in place of the
//! original directory.

use crate::adapters::transport::TransportSession;
use crate::config::ServerConfig;
use crate::core::context::EngineContext;
use crate::core::split::split_file;
use crate::core::xml::root_name;
use crate::domain::directory::join_remote;
use crate::domain::schema::SchemaTable;
use crate::domain::{
    Attachment, Direction, DirectoryId, DirectorySettings, EdiError, NewAttachment,
    RemoteDirectory, Result, ServerId, TransactionBuilder,
};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::path::Path;

/// Outcome of a directory sync
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectorySyncReport {
    pub created: Vec<String>,
    pub removed: Vec<String>,
}

/// Outcome of an inner-file sync
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSyncReport {
    pub attachments_created: usize,
    pub transactions_created: usize,
    pub files_split: usize,
    /// Files kept as attachments only because no incoming schema matched
    pub unmatched: Vec<String>,
}

/// Records new directories of a server and forgets vanished ones
///
/// Newly discovered directories take the settings configured for their path under the
/// server's `directories`, or default settings.
pub async fn sync_directories(ctx: &EngineContext, server_id: &ServerId) -> Result<DirectorySyncReport> {
    let server = ctx.require_server(server_id)?;
    let mut session = connect(ctx, server).await?;
    let listed = session.list_directories("/").await;
    disconnect(session, server).await;
    let listed: BTreeSet<String> = listed?.into_iter().map(|p| normalize(&p)).collect();

    let known = ctx.edi.directories(server_id)?;
    let mut report = DirectorySyncReport::default();

    for path in &listed {
        if known.iter().any(|d| &normalize(&d.path) == path) {
            continue;
        }
        let settings = configured_settings(server, path).unwrap_or_default();
        ctx.edi.create_directory(server_id, path, settings)?;
        tracing::info!(server = %server_id, path = %path, "Directory discovered");
        report.created.push(path.clone());
    }

    for directory in known {
        if !listed.contains(&normalize(&directory.path)) {
            ctx.edi.delete_directory(directory.id)?;
            tracing::info!(server = %server_id, path = %directory.path, "Directory removed");
            report.removed.push(directory.path);
        }
    }

    ctx.edi.commit()?;
    tracing::info!(
        server = %server_id,
        created = report.created.len(),
        removed = report.removed.len(),
        "Directory sync completed"
    );
    Ok(report)
}

/// Downloads new files of every download-enabled directory of a server
///
/// With `only`, just that directory is synced. A commit is taken per file.
///
/// # Errors
///
/// Returns a validation error before connecting when a download directory has neither
/// a mapping schema nor header-based schema lookup, or when a splitting directory has
/// no split tag.
pub async fn sync_inner_files(
    ctx: &EngineContext,
    server_id: &ServerId,
    only: Option<DirectoryId>,
) -> Result<FileSyncReport> {
    let server = ctx.require_server(server_id)?;
    let directories: Vec<RemoteDirectory> = ctx
        .edi
        .directories(server_id)?
        .into_iter()
        .filter(|d| d.settings.download)
        .filter(|d| only.map_or(true, |id| d.id == id))
        .collect();

    let unmapped: Vec<&str> = directories
        .iter()
        .filter(|d| !d.settings.search_schema_by_header && d.settings.mapping_schema.is_none())
        .map(|d| d.path.as_str())
        .collect();
    if !unmapped.is_empty() {
        return Err(EdiError::Validation(format!(
            "Mapping table not set on these directories [{}]",
            unmapped.join(", ")
        )));
    }
    if directories
        .iter()
        .any(|d| d.settings.split_records && d.settings.split_tag.as_deref().map_or(true, str::is_empty))
    {
        return Err(EdiError::Validation("Split tag must be provided.".to_string()));
    }

    let mut session = connect(ctx, server).await?;
    let mut report = FileSyncReport::default();
    let mut outcome = Ok(());
    for directory in &directories {
        outcome = FileSync::new(ctx, session.as_mut(), &mut report)
            .run(directory)
            .await;
        if outcome.is_err() {
            break;
        }
    }
    disconnect(session, server).await;
    outcome?;

    tracing::info!(
        server = %server_id,
        directories = directories.len(),
        attachments = report.attachments_created,
        transactions = report.transactions_created,
        "File sync completed"
    );
    Ok(report)
}

/// Sync of one directory over an open session
struct FileSync<'a, 's> {
    ctx: &'a EngineContext,
    session: &'s mut dyn TransportSession,
    report: &'s mut FileSyncReport,
}

impl<'a, 's> FileSync<'a, 's> {
    fn new(
        ctx: &'a EngineContext,
        session: &'s mut dyn TransportSession,
        report: &'s mut FileSyncReport,
    ) -> Self {
        Self {
            ctx,
            session,
            report,
        }
    }

    async fn run(&mut self, directory: &RemoteDirectory) -> Result<()> {
        let source = match directory.settings.split_tag.as_deref() {
            Some(tag) if directory.settings.split_records => self.split_directory(directory, tag).await?,
            _ => directory.path.clone(),
        };

        let files = xml_files(self.session.list_files(&source).await?);
        tracing::debug!(path = %source, files = files.len(), "Listing directory");

        for file in files {
            let remote = join_remote(&source, &file);
            self.ingest(directory, &remote).await?;
            self.ctx.edi.commit()?;
        }
        Ok(())
    }

    /// Splits every file of the directory into its `_split` sibling
    ///
    /// Returns the sibling path.
    async fn split_directory(&mut self, directory: &RemoteDirectory, tag: &str) -> Result<String> {
        let target = directory.split_path();
        self.session.make_dir(&target).await?;

        let scratch = self.ctx.scratch_dir()?;
        let files = xml_files(self.session.list_files(&directory.path).await?);
        for file in files {
            let bytes = self.session.download(&join_remote(&directory.path, &file)).await?;
            let local = scratch.path().join(&file);
            tokio::fs::write(&local, &bytes).await?;

            let parts_dir = scratch.path().join(format!("{file}.parts"));
            tokio::fs::create_dir_all(&parts_dir).await?;
            let parts = split_file(
                &local,
                tag,
                self.ctx.processing.split_records_per_file,
                &parts_dir,
            )?;

            for part in &parts {
                let data = tokio::fs::read(part).await?;
                let name = file_name(part);
                self.session.upload(&data, &join_remote(&target, &name)).await?;
            }
            self.report.files_split += 1;
            tracing::info!(file = %file, parts = parts.len(), target = %target, "File split and uploaded");
        }
        Ok(target)
    }

    async fn ingest(&mut self, directory: &RemoteDirectory, remote: &str) -> Result<()> {
        let now = Utc::now();
        let existing = self.ctx.edi.find_attachment(remote, Some(directory.id))?;

        let attachment = match existing {
            Some(_) if directory.settings.daily_new_file => {
                let name = dated_name(remote, now);
                if self.ctx.edi.find_attachment(&name, Some(directory.id))?.is_some() {
                    return Ok(());
                }
                self.download_attachment(directory, remote, name, now).await?
            }
            Some(attachment) => attachment,
            None => {
                self.download_attachment(directory, remote, remote.to_string(), now)
                    .await?
            }
        };

        self.ensure_transaction(directory, &attachment)
    }

    async fn download_attachment(
        &mut self,
        directory: &RemoteDirectory,
        remote: &str,
        name: String,
        now: DateTime<Utc>,
    ) -> Result<Attachment> {
        let data = self.session.download(remote).await?;
        let attachment = self
            .ctx
            .edi
            .create_attachment(NewAttachment::new(name, data).in_directory(directory.id, now))?;
        self.report.attachments_created += 1;
        tracing::info!(attachment = %attachment.name, directory = %directory.path, "Attachment created");
        Ok(attachment)
    }

    fn ensure_transaction(&mut self, directory: &RemoteDirectory, attachment: &Attachment) -> Result<()> {
        if self.ctx.edi.find_transaction_by_name(&attachment.name)?.is_some() {
            return Ok(());
        }

        let text = attachment.text();
        let Some(schema) = self.resolve_schema(&directory.settings, &text)? else {
            tracing::warn!(
                attachment = %attachment.name,
                directory = %directory.path,
                "No incoming schema matches the document"
            );
            self.report.unmatched.push(attachment.name.clone());
            return Ok(());
        };

        let tx = self.ctx.edi.create_transaction(
            TransactionBuilder::new(attachment.name.clone(), schema.direction)
                .schema(schema.id.clone())
                .xml_content(text)
                .attachment(attachment.id)
                .partner(directory.settings.partner)
                .build(),
        )?;
        self.report.transactions_created += 1;
        tracing::info!(
            transaction_id = %tx.id,
            file = %tx.name,
            schema = %schema.id,
            "Incoming transaction created"
        );
        Ok(())
    }

    fn resolve_schema(&self, settings: &DirectorySettings, text: &str) -> Result<Option<&'a SchemaTable>> {
        if settings.search_schema_by_header {
            return match root_name(text) {
                Ok(root) => Ok(self.ctx.registry.find_by_header(&root)),
                Err(e) => {
                    tracing::warn!(error = %e, "Document root could not be read");
                    Ok(None)
                }
            };
        }
        match &settings.mapping_schema {
            Some(id) => {
                let schema = self.ctx.registry.get(id)?;
                Ok((schema.direction == Direction::Incoming).then_some(schema))
            }
            None => Ok(None),
        }
    }
}

async fn connect(ctx: &EngineContext, server: &ServerConfig) -> Result<Box<dyn TransportSession>> {
    let transport = ctx.transports.transport(server.protocol)?;
    Ok(transport.connect(server).await?)
}

async fn disconnect(session: Box<dyn TransportSession>, server: &ServerConfig) {
    if let Err(e) = session.disconnect().await {
        tracing::debug!(server = %server.id, error = %e, "Disconnect failed");
    }
}

fn configured_settings(server: &ServerConfig, path: &str) -> Option<DirectorySettings> {
    server
        .directories
        .iter()
        .find(|d| normalize(&d.path) == path)
        .map(|d| d.settings.clone())
}

fn normalize(path: &str) -> String {
    join_remote("/", path.trim_end_matches('/'))
}

fn xml_files(names: Vec<String>) -> Vec<String> {
    names
        .into_iter()
        .filter(|n| n.to_lowercase().ends_with(".xml"))
        .collect()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `/in/orders.xml` -> `/in/orders_2025-03-01_10:15:00.xml`
fn dated_name(remote: &str, now: DateTime<Utc>) -> String {
    let stamp = now.format("%Y-%m-%d_%H:%M:%S");
    match remote.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.contains('/') => {
            format!("{stem}_{stamp}.{ext}")
        }
        _ => format!("{remote}_{stamp}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::store::{EdiStore, MemoryEdiStore, MemoryRecordStore};
    use crate::adapters::transport::DefaultTransportFactory;
    use crate::config::{DirectoryConfig, Protocol, SchemaConfig};
    use crate::core::registry::SchemaRegistry;
    use crate::domain::field::{FieldDescriptor, FieldKind, ModelDescriptor};
    use crate::domain::schema::FileType;
    use crate::domain::{RecordId, SchemaId, TransactionState, Values};
    use chrono::TimeZone;
    use std::str::FromStr;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn schema(id: &str, direction: Direction, header: &str) -> SchemaConfig {
        SchemaConfig {
            id: SchemaId::from_str(id).unwrap(),
            model: "sale.order".to_string(),
            direction,
            file_type: FileType::Single,
            main_table: true,
            xml_header: Some(header.to_string()),
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

    fn context(root: &TempDir, directories: Vec<DirectoryConfig>) -> (EngineContext, Arc<MemoryEdiStore>) {
        let records = MemoryRecordStore::new().with_model(
            ModelDescriptor::new("sale.order")
                .with_field(FieldDescriptor::new("name", FieldKind::Char)),
        );
        let registry = SchemaRegistry::from_parts(
            &[
                schema("orders_in", Direction::Incoming, "Orders/Order"),
                schema("invoices_out", Direction::Outgoing, "Invoices/Invoice"),
            ],
            &[],
            &[],
            8,
            &records,
        )
        .unwrap();

        let server = ServerConfig {
            id: ServerId::from_str("partner").unwrap(),
            protocol: Protocol::Local,
            host: String::new(),
            port: None,
            username: None,
            password: None,
            private_key_path: None,
            root: Some(root.path().display().to_string()),
            directories,
        };
        let edi = Arc::new(MemoryEdiStore::new());
        let ctx = EngineContext::new(
            Arc::new(registry),
            Arc::new(records),
            edi.clone(),
            Arc::new(DefaultTransportFactory::new()),
        )
        .with_servers(vec![server]);
        (ctx, edi)
    }

    fn server_id() -> ServerId {
        ServerId::from_str("partner").unwrap()
    }

    fn order_xml(name: &str) -> String {
        format!("<Orders><Order><Name>{name}</Name></Order></Orders>")
    }

    fn download_dir(path: &str, settings: DirectorySettings) -> DirectoryConfig {
        DirectoryConfig {
            path: path.to_string(),
            settings: DirectorySettings {
                download: true,
                ..settings
            },
        }
    }

    #[tokio::test]
    async fn test_sync_directories_creates_and_removes() {
        let root = TempDir::new().unwrap();
        std::fs::create_dir_all(root.path().join("in/orders")).unwrap();
        std::fs::create_dir_all(root.path().join("out")).unwrap();

        let configured = download_dir(
            "/in/orders/",
            DirectorySettings {
                search_schema_by_header: true,
                ..Default::default()
            },
        );
        let (ctx, edi) = context(&root, vec![configured]);
        edi.create_directory(&server_id(), "/gone", DirectorySettings::default())
            .unwrap();

        let report = sync_directories(&ctx, &server_id()).await.unwrap();
        assert_eq!(report.created, vec!["/in", "/in/orders", "/out"]);
        assert_eq!(report.removed, vec!["/gone"]);

        let dirs = edi.directories(&server_id()).unwrap();
        assert_eq!(dirs.len(), 3);
        let orders = dirs.iter().find(|d| d.path == "/in/orders").unwrap();
        assert!(orders.settings.download);
        assert!(orders.settings.search_schema_by_header);

        let again = sync_directories(&ctx, &server_id()).await.unwrap();
        assert!(again.created.is_empty() && again.removed.is_empty());
    }

    #[tokio::test]
    async fn test_sync_inner_files_creates_attachment_and_transaction() {
        let root = TempDir::new().unwrap();
        std::fs::create_dir_all(root.path().join("in")).unwrap();
        std::fs::write(root.path().join("in/o1.xml"), order_xml("SO1")).unwrap();
        std::fs::write(root.path().join("in/readme.txt"), "ignored").unwrap();

        let (ctx, edi) = context(&root, vec![]);
        edi.create_directory(
            &server_id(),
            "/in",
            DirectorySettings {
                download: true,
                search_schema_by_header: true,
                partner: Some(RecordId::new(9)),
                ..Default::default()
            },
        )
        .unwrap();

        let report = sync_inner_files(&ctx, &server_id(), None).await.unwrap();
        assert_eq!(report.attachments_created, 1);
        assert_eq!(report.transactions_created, 1);

        let tx = edi.find_transaction_by_name("/in/o1.xml").unwrap().unwrap();
        assert_eq!(tx.direction, Direction::Incoming);
        assert_eq!(tx.state, TransactionState::Draft);
        assert_eq!(tx.schema, Some(SchemaId::from_str("orders_in").unwrap()));
        assert_eq!(tx.partner, Some(RecordId::new(9)));
        assert!(tx.xml_content.unwrap().contains("SO1"));

        let again = sync_inner_files(&ctx, &server_id(), None).await.unwrap();
        assert_eq!(again.attachments_created, 0);
        assert_eq!(again.transactions_created, 0);
    }

    #[tokio::test]
    async fn test_outgoing_mapping_schema_leaves_attachment_only() {
        let root = TempDir::new().unwrap();
        std::fs::create_dir_all(root.path().join("in")).unwrap();
        std::fs::write(root.path().join("in/o1.xml"), order_xml("SO1")).unwrap();

        let (ctx, edi) = context(&root, vec![]);
        edi.create_directory(
            &server_id(),
            "/in",
            DirectorySettings {
                download: true,
                mapping_schema: Some(SchemaId::from_str("invoices_out").unwrap()),
                ..Default::default()
            },
        )
        .unwrap();

        let report = sync_inner_files(&ctx, &server_id(), None).await.unwrap();
        assert_eq!(report.attachments_created, 1);
        assert_eq!(report.transactions_created, 0);
        assert_eq!(report.unmatched, vec!["/in/o1.xml"]);
        assert!(edi.find_transaction_by_name("/in/o1.xml").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_daily_new_file_keeps_each_copy() {
        let root = TempDir::new().unwrap();
        std::fs::create_dir_all(root.path().join("in")).unwrap();
        std::fs::write(root.path().join("in/daily.xml"), order_xml("SO1")).unwrap();

        let (ctx, edi) = context(&root, vec![]);
        edi.create_directory(
            &server_id(),
            "/in",
            DirectorySettings {
                download: true,
                search_schema_by_header: true,
                daily_new_file: true,
                ..Default::default()
            },
        )
        .unwrap();

        sync_inner_files(&ctx, &server_id(), None).await.unwrap();
        let report = sync_inner_files(&ctx, &server_id(), None).await.unwrap();

        assert_eq!(report.attachments_created, 1);
        assert_eq!(report.transactions_created, 1);
        let names: Vec<String> = edi.transactions().unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names.len(), 2);
        assert!(names.iter().any(|n| n.starts_with("/in/daily_") && n.ends_with(".xml")));
    }

    #[tokio::test]
    async fn test_split_directory_ingests_parts() {
        let root = TempDir::new().unwrap();
        std::fs::create_dir_all(root.path().join("in/bulk")).unwrap();
        let orders: String = (1..=5)
            .map(|i| format!("<Order><Name>SO{i}</Name></Order>"))
            .collect();
        std::fs::write(
            root.path().join("in/bulk/orders.xml"),
            format!("<Orders>{orders}</Orders>"),
        )
        .unwrap();

        let (mut ctx, edi) = context(&root, vec![]);
        ctx.processing.split_records_per_file = 2;
        edi.create_directory(
            &server_id(),
            "/in/bulk",
            DirectorySettings {
                download: true,
                search_schema_by_header: true,
                split_records: true,
                split_tag: Some("Order".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

        let report = sync_inner_files(&ctx, &server_id(), None).await.unwrap();
        assert_eq!(report.files_split, 1);
        assert_eq!(report.transactions_created, 3);
        assert!(root.path().join("in/bulk/bulk_split/orders_part3.xml").exists());
        assert!(edi
            .find_transaction_by_name("/in/bulk/bulk_split/orders_part1.xml")
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_unmapped_directory_is_rejected() {
        let root = TempDir::new().unwrap();
        let (ctx, edi) = context(&root, vec![]);
        edi.create_directory(
            &server_id(),
            "/in",
            DirectorySettings {
                download: true,
                ..Default::default()
            },
        )
        .unwrap();

        let err = sync_inner_files(&ctx, &server_id(), None).await.unwrap_err();
        assert!(matches!(err, EdiError::Validation(msg) if msg.contains("[/in]")));
    }

    #[tokio::test]
    async fn test_split_without_tag_is_rejected() {
        let root = TempDir::new().unwrap();
        let (ctx, edi) = context(&root, vec![]);
        edi.create_directory(
            &server_id(),
            "/in",
            DirectorySettings {
                download: true,
                search_schema_by_header: true,
                split_records: true,
                ..Default::default()
            },
        )
        .unwrap();

        let err = sync_inner_files(&ctx, &server_id(), None).await.unwrap_err();
        assert_eq!(err.to_string(), "Validation error: Split tag must be provided.");
    }

    #[test]
    fn test_dated_name() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 10, 15, 0).unwrap();
        assert_eq!(dated_name("/in/orders.xml", now), "/in/orders_2025-03-01_10:15:00.xml");
        assert_eq!(dated_name("/in/orders", now), "/in/orders_2025-03-01_10:15:00");
    }
}
