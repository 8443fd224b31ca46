//! Integration tests for the outgoing flow
//!
//! These tests verify that:
//! - Unprocessed records are rendered into draft transactions with attachments
//! - Processing uploads the XML and marks the exported records
//! - Rendering and transfer failures end in failed transactions with log books
//! - Failed exports can be recomputed once the record is fixed
//! - Operator selections and claims are honoured

use async_trait::async_trait;
use ediflow::adapters::store::{EdiStore, MemoryEdiStore, MemoryRecordStore, RecordStore};
use ediflow::adapters::transport::{
    DefaultTransportFactory, Transport, TransportResult, TransportSession,
};
use ediflow::config::{parse_config, Protocol, ServerConfig};
use ediflow::core::context::EngineContext;
use ediflow::core::export::{export_edi_transactions, ExportEngine, RECOMPUTE_HINT};
use ediflow::core::process::{auto_process_edi_transactions, Processor};
use ediflow::domain::{
    Direction, DirectorySettings, EdiError, FieldDescriptor, FieldKind, ModelDescriptor,
    RecordId, Reference, SchemaId, ServerId, Transaction, TransactionState, TransportError,
    Values, PROCESSED_FIELD,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const PARTNER_SCHEMA: &str = r#"
[[schemas]]
id = "partner_export"
model = "res.partner"
direction = "outgoing"
xml_header = "Partner"
export_destination = { server = "partner", directory = "/out" }

[[schemas.lines]]
xml_element = "Name"
field = "name"
required = true

[[schemas.lines]]
xml_element = "Address/Country"
field = "country_id"
m2o_search_field = "code"

[[schemas.lines]]
xml_element = "Active"
field = "active"

[[schemas.lines]]
xml_element = "Credit"
field = "credit_limit"
"#;

const PARTNER_BATCH_SCHEMA: &str = r#"
[[schemas]]
id = "partner_batch"
model = "res.partner"
direction = "outgoing"
file_type = "multiple"
xml_header = "Partners"
multiple_records_element = "Partner"
additional_filter = "[('customer', '=', True)]"
export_destination = { server = "partner", directory = "/out" }

[[schemas.lines]]
xml_element = "Name"
field = "name"
"#;

const CATALOG_SCHEMA: &str = r#"
[[schemas]]
id = "catalog"
model = "product.product"
direction = "outgoing"
file_type = "multiple"
xml_header = "Catalog"
multiple_records_element = "Product"

[[schemas.lines]]
xml_element = "Sku"
field = "default_code"
"#;

fn record_store() -> MemoryRecordStore {
    MemoryRecordStore::new()
        .with_model(
            ModelDescriptor::new("res.country")
                .with_field(FieldDescriptor::new("name", FieldKind::Char))
                .with_field(FieldDescriptor::new("code", FieldKind::Char)),
        )
        .with_model(
            ModelDescriptor::new("res.partner")
                .with_field(FieldDescriptor::new("name", FieldKind::Char))
                .with_field(FieldDescriptor::new("active", FieldKind::Boolean))
                .with_field(FieldDescriptor::new("customer", FieldKind::Boolean))
                .with_field(FieldDescriptor::new("credit_limit", FieldKind::Float))
                .with_field(
                    FieldDescriptor::new("country_id", FieldKind::Many2one)
                        .with_relation("res.country"),
                ),
        )
        .with_model(
            ModelDescriptor::new("product.product")
                .with_field(FieldDescriptor::new("name", FieldKind::Char))
                .with_field(FieldDescriptor::new("default_code", FieldKind::Char)),
        )
}

fn values(value: Value) -> Values {
    value.as_object().cloned().unwrap_or_default()
}

struct Fixture {
    ctx: EngineContext,
    records: Arc<MemoryRecordStore>,
    edi: Arc<MemoryEdiStore>,
    root: TempDir,
}

impl Fixture {
    fn new(schemas: &str) -> Self {
        Self::with_factory(schemas, "local", DefaultTransportFactory::new())
    }

    fn with_factory(schemas: &str, protocol: &str, factory: DefaultTransportFactory) -> Self {
        let root = TempDir::new().unwrap();
        std::fs::create_dir_all(root.path().join("out")).unwrap();
        let text = format!(
            r#"
[[servers]]
id = "partner"
protocol = "{protocol}"
host = "ftp.example.com"
root = "{root}"

[[servers.directories]]
path = "/out"
upload = true

[[servers.directories]]
path = "/locked"
{schemas}
"#,
            root = root.path().display().to_string().replace('\\', "/"),
        );
        let config = parse_config(&text).unwrap();

        let records = Arc::new(record_store());
        let edi = Arc::new(MemoryEdiStore::new());
        let ctx = EngineContext::from_config(&config, records.clone(), edi.clone(), Arc::new(factory))
            .unwrap();
        Self {
            ctx,
            records,
            edi,
            root,
        }
    }

    fn partner(&self, name: &str) -> RecordId {
        let country = self
            .records
            .create("res.country", values(json!({"name": "Belgium", "code": "BE"})))
            .unwrap();
        self.records
            .create(
                "res.partner",
                values(json!({
                    "name": name,
                    "active": true,
                    "customer": true,
                    "credit_limit": 1500.0,
                    "country_id": country.get(),
                })),
            )
            .unwrap()
    }

    fn uploaded(&self, name: &str) -> Option<String> {
        std::fs::read_to_string(self.root.path().join("out").join(name)).ok()
    }
}

fn is_processed(records: &MemoryRecordStore, model: &str, id: RecordId) -> bool {
    records.read(model, id).unwrap().unwrap().get(PROCESSED_FIELD) == &Value::Bool(true)
}

#[derive(Clone, Default)]
struct RecordingTransport {
    connects: Arc<AtomicUsize>,
    uploads: Arc<Mutex<Vec<String>>>,
    fail_uploads: bool,
}

impl RecordingTransport {
    fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }
}

struct RecordingSession {
    uploads: Arc<Mutex<Vec<String>>>,
    fail_uploads: bool,
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn connect(&self, _server: &ServerConfig) -> TransportResult<Box<dyn TransportSession>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(RecordingSession {
            uploads: self.uploads.clone(),
            fail_uploads: self.fail_uploads,
        }))
    }
}

#[async_trait]
impl TransportSession for RecordingSession {
    async fn list_directories(&mut self, _path: &str) -> TransportResult<Vec<String>> {
        Ok(vec![])
    }

    async fn list_files(&mut self, _path: &str) -> TransportResult<Vec<String>> {
        Ok(vec![])
    }

    async fn download(&mut self, remote_path: &str) -> TransportResult<Vec<u8>> {
        Err(TransportError::NotFound(remote_path.to_string()))
    }

    async fn upload(&mut self, _data: &[u8], remote_path: &str) -> TransportResult<()> {
        if self.fail_uploads {
            return Err(TransportError::UploadFailed {
                path: remote_path.to_string(),
                message: "550 Permission denied".to_string(),
            });
        }
        self.uploads.lock().unwrap().push(remote_path.to_string());
        Ok(())
    }

    async fn make_dir(&mut self, _path: &str) -> TransportResult<()> {
        Ok(())
    }

    async fn disconnect(self: Box<Self>) -> TransportResult<()> {
        Ok(())
    }
}

fn recorded_fixture(schemas: &str) -> (Fixture, RecordingTransport) {
    let transport = RecordingTransport::default();
    let factory = DefaultTransportFactory::new().register(Protocol::Ftp, Arc::new(transport.clone()));
    (Fixture::with_factory(schemas, "ftp", factory), transport)
}

/// Asserts a failed transaction whose log book holds exactly `message`
fn assert_failed_with(fx: &Fixture, tx: &Transaction, message: &str) {
    assert_eq!(tx.state, TransactionState::Failed);
    let book = fx.edi.log_book(tx.log.unwrap()).unwrap().unwrap();
    assert_eq!(book.lines.len(), 1);
    assert_eq!(book.lines[0].message, message);
    assert!(book.has_faults());
    assert!(tx
        .notes
        .contains(&format!("Please check log [{}] for more details.", book.name)));
}

#[tokio::test]
async fn test_export_then_process_uploads_and_marks_record() {
    let fx = Fixture::new(PARTNER_SCHEMA);
    let id = fx.partner("Acme Corp");

    let summary = export_edi_transactions(&fx.ctx).unwrap();
    assert_eq!(summary.schemas, 1);
    assert_eq!(summary.records_selected, 1);
    assert_eq!(summary.transactions_created, 1);
    assert!(summary.is_successful());

    let name = format!("res_partner_{id}_Acme_Corp.xml");
    let tx = fx.edi.find_transaction_by_name(&name).unwrap().unwrap();
    assert_eq!(tx.state, TransactionState::Draft);
    assert_eq!(tx.direction, Direction::Outgoing);
    let xml = tx.xml_content.clone().unwrap();
    assert!(xml.contains("<Name>Acme Corp</Name>"));
    assert!(xml.contains("<Country>BE</Country>"));
    assert!(xml.contains("<Active>True</Active>"));
    assert!(xml.contains("<Credit>1500.0</Credit>"));
    let attachment = fx.edi.attachment(tx.attachment.unwrap()).unwrap().unwrap();
    assert_eq!(attachment.name, name);

    let result = auto_process_edi_transactions(&fx.ctx).await.unwrap();
    assert_eq!(result.successful, 1);
    assert_eq!(result.failed, 0);

    let tx = fx.edi.transaction(tx.id).unwrap().unwrap();
    assert_eq!(tx.state, TransactionState::Done);
    assert!(tx.log.is_none());
    assert_eq!(fx.uploaded(&name).as_deref(), Some(xml.as_str()));
    assert!(is_processed(&fx.records, "res.partner", id));

    // Processed records are not selected again
    let again = export_edi_transactions(&fx.ctx).unwrap();
    assert_eq!(again.records_selected, 0);
    assert_eq!(fx.edi.transactions().unwrap().len(), 1);
}

#[tokio::test]
async fn test_missing_required_value_fails_and_recomputes() {
    let fx = Fixture::new(PARTNER_SCHEMA);
    let id = fx.partner("");

    let summary = export_edi_transactions(&fx.ctx).unwrap();
    assert_eq!(summary.transactions_failed, 1);
    assert_eq!(summary.transactions_created, 0);

    let tx = fx.edi.transactions().unwrap().remove(0);
    assert_eq!(tx.state, TransactionState::Failed);
    assert!(tx.xml_content.is_none());
    assert!(tx.attachment.is_none());
    assert!(tx.notes.iter().any(|n| n == RECOMPUTE_HINT));
    let book = fx.edi.log_book(tx.log.unwrap()).unwrap().unwrap();
    assert!(book.has_faults());
    assert!(book.lines[0]
        .message
        .contains("Required Value is not set for Name"));

    fx.records
        .write("res.partner", id, values(json!({"name": "Fixed Ltd"})))
        .unwrap();
    let recomputed = Processor::new(&fx.ctx).recompute_xml(tx.clone()).unwrap();
    assert_eq!(recomputed.id, tx.id);
    assert_eq!(recomputed.state, TransactionState::Draft);
    assert!(recomputed
        .xml_content
        .as_deref()
        .unwrap()
        .contains("<Name>Fixed Ltd</Name>"));
    assert!(recomputed.attachment.is_some());
    assert_eq!(fx.edi.transactions().unwrap().len(), 1);
}

#[tokio::test]
async fn test_recompute_requires_failed_state() {
    let fx = Fixture::new(PARTNER_SCHEMA);
    fx.partner("Acme Corp");
    export_edi_transactions(&fx.ctx).unwrap();

    let tx = fx.edi.transactions().unwrap().remove(0);
    let result = Processor::new(&fx.ctx).recompute_xml(tx);
    assert!(matches!(result, Err(EdiError::State(_))));
}

#[tokio::test]
async fn test_upload_requires_upload_permission() {
    let schema = PARTNER_SCHEMA.replace("directory = \"/out\"", "directory = \"/locked\"");
    let fx = Fixture::new(&schema);
    let id = fx.partner("Acme Corp");
    export_edi_transactions(&fx.ctx).unwrap();

    let result = auto_process_edi_transactions(&fx.ctx).await.unwrap();
    assert_eq!(result.failed, 1);

    let tx = fx.edi.transactions().unwrap().remove(0);
    assert_eq!(tx.state, TransactionState::Failed);
    let book = fx.edi.log_book(tx.log.unwrap()).unwrap().unwrap();
    assert!(book.lines[0]
        .message
        .contains("Please enable Upload configuration for your selected export directory [/locked]"));
    assert!(tx
        .notes
        .iter()
        .any(|n| n.starts_with("Please check log [LOG/")));
    assert!(!is_processed(&fx.records, "res.partner", id));
}

#[tokio::test]
async fn test_failed_transfer_keeps_record_unprocessed() {
    let transport = RecordingTransport {
        fail_uploads: true,
        ..Default::default()
    };
    let factory = DefaultTransportFactory::new().register(Protocol::Ftp, Arc::new(transport.clone()));
    let fx = Fixture::with_factory(PARTNER_SCHEMA, "ftp", factory);
    let id = fx.partner("Acme Corp");
    export_edi_transactions(&fx.ctx).unwrap();

    let mut tx = fx.edi.transactions().unwrap().remove(0);
    Processor::new(&fx.ctx).process(&mut tx).await.unwrap();

    assert_eq!(tx.state, TransactionState::Failed);
    assert!(transport.uploads.lock().unwrap().is_empty());
    let book = fx.edi.log_book(tx.log.unwrap()).unwrap().unwrap();
    assert!(book.lines[0].message.starts_with("Something went wrong =>"));
    assert!(book.lines[0].message.contains("550 Permission denied"));
    assert!(!is_processed(&fx.records, "res.partner", id));

    // A failed transaction can be processed again
    let stored = fx.edi.transaction(tx.id).unwrap().unwrap();
    assert_eq!(stored.state, TransactionState::Failed);
}

#[tokio::test]
async fn test_upload_through_registered_transport() {
    let transport = RecordingTransport::default();
    let factory = DefaultTransportFactory::new().register(Protocol::Ftp, Arc::new(transport.clone()));
    let fx = Fixture::with_factory(PARTNER_SCHEMA, "ftp", factory);
    let id = fx.partner("Acme Corp");
    export_edi_transactions(&fx.ctx).unwrap();

    let result = auto_process_edi_transactions(&fx.ctx).await.unwrap();
    assert_eq!(result.successful, 1);
    assert_eq!(
        transport.uploads.lock().unwrap().as_slice(),
        [format!("/out/res_partner_{id}_Acme_Corp.xml")]
    );
    assert!(is_processed(&fx.records, "res.partner", id));
}

#[tokio::test]
async fn test_multiple_records_share_one_file() {
    let fx = Fixture::new(PARTNER_BATCH_SCHEMA);
    let first = fx.partner("Acme Corp");
    let second = fx.partner("Globex");
    let excluded = fx
        .records
        .create(
            "res.partner",
            values(json!({"name": "Supplier", "customer": false})),
        )
        .unwrap();

    let summary = export_edi_transactions(&fx.ctx).unwrap();
    assert_eq!(summary.records_selected, 2);
    assert_eq!(summary.transactions_created, 1);

    let tx = fx.edi.transactions().unwrap().remove(0);
    assert_eq!(tx.name, format!("res_partner_{first}_{second}.xml"));
    let xml = tx.xml_content.clone().unwrap();
    assert!(xml.contains("<Partners>"));
    assert_eq!(xml.matches("<Partner>").count(), 2);
    assert!(!xml.contains("Supplier"));

    auto_process_edi_transactions(&fx.ctx).await.unwrap();
    assert!(is_processed(&fx.records, "res.partner", first));
    assert!(is_processed(&fx.records, "res.partner", second));
    assert!(!is_processed(&fx.records, "res.partner", excluded));
}

#[tokio::test]
async fn test_export_selected_catalog_records() {
    let fx = Fixture::new(CATALOG_SCHEMA);
    let a = fx
        .records
        .create("product.product", values(json!({"default_code": "SKU-A"})))
        .unwrap();
    let b = fx
        .records
        .create(
            "product.product",
            values(json!({"default_code": "SKU-B", "x_is_processed": true})),
        )
        .unwrap();

    // Catalog schemas are left out of the periodic batch
    let summary = export_edi_transactions(&fx.ctx).unwrap();
    assert_eq!(summary.schemas, 0);

    let catalog = SchemaId::from_str("catalog").unwrap();
    let engine = ExportEngine::new(&fx.ctx);
    let tx = engine.export_selected(&catalog, &[a, b]).unwrap();
    assert_eq!(tx.name, format!("product_product_{a}.xml"));
    assert!(tx.partner.is_none());
    let xml = tx.xml_content.unwrap();
    assert!(xml.contains("<Sku>SKU-A</Sku>"));
    assert!(!xml.contains("SKU-B"));

    let err = engine.export_selected(&catalog, &[b]).unwrap_err();
    assert!(err.to_string().contains("Selected products already exported."));
}

#[tokio::test]
async fn test_export_selected_rejects_other_models() {
    let fx = Fixture::new(PARTNER_SCHEMA);
    let id = fx.partner("Acme Corp");
    let err = ExportEngine::new(&fx.ctx)
        .export_selected(&SchemaId::from_str("partner_export").unwrap(), &[id])
        .unwrap_err();
    assert!(matches!(err, EdiError::Validation(_)));
}

#[tokio::test]
async fn test_claimed_transactions_are_skipped() {
    let fx = Fixture::new(PARTNER_SCHEMA);
    fx.partner("Acme Corp");
    export_edi_transactions(&fx.ctx).unwrap();
    let tx = fx.edi.transactions().unwrap().remove(0);

    let now = Utc::now();
    assert!(fx
        .edi
        .try_claim(tx.id, "other-worker", now + Duration::hours(1), now)
        .unwrap());

    let result = auto_process_edi_transactions(&fx.ctx).await.unwrap();
    assert_eq!(result.skipped, 1);
    assert_eq!(result.successful, 0);
    assert_eq!(
        fx.edi.transaction(tx.id).unwrap().unwrap().state,
        TransactionState::Draft
    );

    // Once released the transaction is processed again
    fx.edi.release_claim(tx.id, "other-worker").unwrap();
    let result = auto_process_edi_transactions(&fx.ctx).await.unwrap();
    assert_eq!(result.successful, 1);
}

#[tokio::test]
async fn test_cancel_and_reset() {
    let fx = Fixture::new(PARTNER_SCHEMA);
    fx.partner("Acme Corp");
    export_edi_transactions(&fx.ctx).unwrap();
    let id = fx.edi.transactions().unwrap()[0].id;
    let processor = Processor::new(&fx.ctx);

    let cancelled = processor.cancel(id).unwrap();
    assert_eq!(cancelled.state, TransactionState::Cancel);
    assert!(matches!(processor.cancel(id), Err(EdiError::State(_))));

    let mut tx = processor.load(id).unwrap();
    assert!(matches!(
        processor.process(&mut tx).await,
        Err(EdiError::State(_))
    ));

    let reset = processor.reset(id).unwrap();
    assert_eq!(reset.state, TransactionState::Draft);
    assert_eq!(
        fx.edi.transaction(id).unwrap().unwrap().state,
        TransactionState::Draft
    );
}

#[test]
fn test_unknown_transaction_is_a_validation_error() {
    let fx = Fixture::new(PARTNER_SCHEMA);
    let result = Processor::new(&fx.ctx).load(ediflow::domain::TransactionId::new(999));
    assert!(matches!(result, Err(EdiError::Validation(_))));
}

#[tokio::test]
async fn test_unset_destination_fails_without_connecting() {
    let schema = PARTNER_SCHEMA.replace(
        "export_destination = { server = \"partner\", directory = \"/out\" }\n",
        "",
    );
    assert!(!schema.contains("export_destination"));
    let (fx, transport) = recorded_fixture(&schema);
    let id = fx.partner("Acme Corp");
    export_edi_transactions(&fx.ctx).unwrap();

    let mut tx = fx.edi.transactions().unwrap().remove(0);
    Processor::new(&fx.ctx).process(&mut tx).await.unwrap();

    assert_failed_with(
        &fx,
        &tx,
        "Please select an export directory for schema [partner_export]",
    );
    assert_eq!(transport.connect_count(), 0);
    assert_eq!(transport.upload_count(), 0);
    assert!(!is_processed(&fx.records, "res.partner", id));
    assert_eq!(
        fx.edi.transaction(tx.id).unwrap().unwrap().state,
        TransactionState::Failed
    );
}

#[tokio::test]
async fn test_missing_server_fails_without_connecting() {
    let (fx, transport) = recorded_fixture(PARTNER_SCHEMA);
    fx.partner("Acme Corp");
    export_edi_transactions(&fx.ctx).unwrap();

    // The directory is known from an earlier sync but the server is gone
    let server = ServerId::from_str("partner").unwrap();
    fx.edi
        .create_directory(
            &server,
            "/out",
            DirectorySettings {
                upload: true,
                ..Default::default()
            },
        )
        .unwrap();
    let ctx = fx.ctx.clone().with_servers(Vec::new());

    let result = auto_process_edi_transactions(&ctx).await.unwrap();
    assert_eq!(result.failed, 1);

    let tx = fx.edi.transactions().unwrap().remove(0);
    assert_failed_with(&fx, &tx, "Please Create Server record.");
    assert_eq!(transport.connect_count(), 0);
    assert_eq!(transport.upload_count(), 0);
}

#[tokio::test]
async fn test_unflaggable_record_is_not_uploaded_twice() {
    let (fx, transport) = recorded_fixture(PARTNER_SCHEMA);
    fx.partner("Acme Corp");
    export_edi_transactions(&fx.ctx).unwrap();

    // The exported record disappears before the transaction is processed
    let mut tx = fx.edi.transactions().unwrap().remove(0);
    tx.reference = Some(Reference::single("res.partner", RecordId::new(999)));
    fx.edi.save_transaction(&tx).unwrap();

    let first = auto_process_edi_transactions(&fx.ctx).await.unwrap();
    assert_eq!(first.successful, 1);
    assert_eq!(transport.upload_count(), 1);

    let tx = fx.edi.transaction(tx.id).unwrap().unwrap();
    assert_eq!(tx.state, TransactionState::Done);
    let book = fx.edi.log_book(tx.log.unwrap()).unwrap().unwrap();
    assert_eq!(book.lines.len(), 1);
    assert!(book.lines[0].message.starts_with("Something went wrong =>"));
    assert!(book.lines[0].message.contains("does not exist"));
    assert!(tx
        .notes
        .contains(&format!("Please check log [{}] for more details.", book.name)));

    let second = auto_process_edi_transactions(&fx.ctx).await.unwrap();
    assert_eq!(second.successful + second.failed + second.skipped, 0);
    assert_eq!(transport.upload_count(), 1);
    assert_eq!(transport.connect_count(), 1);
}

