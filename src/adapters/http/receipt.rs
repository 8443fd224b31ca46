//! Inbound document receipt
//!
//! Transport-independent handling of documents pushed by trading partners: credential
//! extraction from `Header/Sender/Credential`, authentication, route lookup and storage
//! as an incoming transaction with its attachment. Every request is answered with a
//! cXML status document.

use crate::config::UserConfig;
use crate::core::context::EngineContext;
use crate::core::import::coerce::element_text;
use crate::core::tree::get_path;
use crate::core::xml::decode;
use crate::domain::{EdiError, NewAttachment, Result, Transaction, TransactionBuilder};
use chrono::{DateTime, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use secrecy::ExposeSecret;
use serde_json::Value;
use std::io::{Cursor, Read};
use std::sync::Arc;
use uuid::Uuid;

const IDENTITY_PATH: &str = "Header/Sender/Credential/Identity";
const SECRET_PATH: &str = "Header/Sender/Credential/SharedSecret";

/// Verifies the credentials carried in a document header
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, login: &str, secret: &str) -> Result<()>;
}

/// Authenticates against the `[[users]]` configuration section
pub struct ConfigAuthenticator {
    users: Vec<UserConfig>,
}

impl ConfigAuthenticator {
    pub fn new(users: Vec<UserConfig>) -> Self {
        Self { users }
    }
}

impl Authenticator for ConfigAuthenticator {
    fn authenticate(&self, login: &str, secret: &str) -> Result<()> {
        let user = self
            .users
            .iter()
            .find(|u| u.login == login)
            .ok_or_else(|| EdiError::Authentication(format!("User not found: {login}")))?;
        if user.shared_secret.expose_secret().matches(secret) {
            Ok(())
        } else {
            Err(EdiError::Authentication(
                "Invalid username/password".to_string(),
            ))
        }
    }
}

/// One uploaded multipart file
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub data: Vec<u8>,
}

/// Body of a receipt request
#[derive(Debug, Clone)]
pub enum ReceiptPayload {
    /// The document itself as the request body
    Raw(Vec<u8>),
    /// Multipart files: `.xml` documents or `.zip` archives of them
    Files(Vec<UploadedFile>),
}

/// Status answered to the sender
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptResponse {
    pub status: u16,
    pub message: String,
}

impl ReceiptResponse {
    fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// cXML status document for this response
    pub fn to_cxml(&self, now: DateTime<Utc>) -> Result<String> {
        cxml_status(self.status, &self.message, now)
    }
}

/// Stores pushed documents as incoming transactions
#[derive(Clone)]
pub struct ReceiptService {
    ctx: EngineContext,
    authenticator: Arc<dyn Authenticator>,
    route: String,
}

impl ReceiptService {
    /// Creates a service answering for `route`
    pub fn new(ctx: EngineContext, authenticator: Arc<dyn Authenticator>, route: impl Into<String>) -> Self {
        Self {
            ctx,
            authenticator,
            route: route.into(),
        }
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    /// Handles one request
    ///
    /// A blank raw body is answered with 400. Any rejected file or document turns the
    /// answer into 500 listing the errors; documents stored before the failure stay
    /// stored.
    pub fn receive(&self, payload: ReceiptPayload) -> ReceiptResponse {
        let mut stored = 0usize;
        let mut errors: Vec<String> = Vec::new();

        match payload {
            ReceiptPayload::Raw(body) => {
                let xml = String::from_utf8_lossy(&body);
                if xml.trim().is_empty() {
                    tracing::warn!(route = %self.route, "Empty XML received in request body");
                    return ReceiptResponse::new(400, "Empty XML");
                }
                match self.store_document(&xml) {
                    Ok(_) => stored += 1,
                    Err(e) => errors.push(e.to_string()),
                }
            }
            ReceiptPayload::Files(files) => {
                if let Err(e) = self.receive_files(files, &mut stored, &mut errors) {
                    errors.push(e.to_string());
                }
            }
        }

        if errors.is_empty() {
            tracing::info!(route = %self.route, stored, "Documents received");
            ReceiptResponse::new(200, format!("Authenticated and stored {stored} record(s)"))
        } else {
            let joined = errors.join("; ");
            tracing::error!(route = %self.route, stored, errors = %joined, "Receipt failed");
            ReceiptResponse::new(500, format!("Errors: {joined}"))
        }
    }

    fn receive_files(
        &self,
        files: Vec<UploadedFile>,
        stored: &mut usize,
        errors: &mut Vec<String>,
    ) -> Result<()> {
        for file in files {
            tracing::debug!(file = %file.name, bytes = file.data.len(), "Received file");
            let lower = file.name.to_lowercase();

            if file.data.is_empty() {
                errors.push(format!("Empty file content: {}", file.name));
            } else if lower.ends_with(".zip") {
                for (name, xml) in zip_documents(&file.data)? {
                    if xml.trim().is_empty() {
                        errors.push(format!("Empty XML in ZIP: {name}"));
                        continue;
                    }
                    self.store_document(&xml)?;
                    *stored += 1;
                }
            } else if lower.ends_with(".xml") {
                let xml = String::from_utf8_lossy(&file.data);
                if xml.trim().is_empty() {
                    errors.push(format!("Empty XML file: {}", file.name));
                    continue;
                }
                self.store_document(&xml)?;
                *stored += 1;
            } else {
                tracing::warn!(file = %file.name, "Unsupported file type");
                errors.push(format!("Unsupported file type: {}", file.name));
            }
        }
        Ok(())
    }

    /// Authenticates one document and stores it with its attachment
    pub fn store_document(&self, xml: &str) -> Result<Transaction> {
        let tree = decode(xml)?;
        let (login, secret) = credentials(&tree)?;
        self.authenticator.authenticate(&login, &secret)?;
        tracing::debug!(login = %login, "Sender authenticated");

        let schema = self.ctx.registry.route(&self.route)?;
        let name = receipt_name(Utc::now());

        let attachment = self
            .ctx
            .edi
            .create_attachment(NewAttachment::new(name.clone(), xml.as_bytes().to_vec()))?;
        let tx = self.ctx.edi.create_transaction(
            TransactionBuilder::new(name, schema.direction)
                .schema(schema.id.clone())
                .xml_content(xml)
                .attachment(attachment.id)
                .build(),
        )?;
        self.ctx.edi.commit()?;

        tracing::info!(
            transaction_id = %tx.id,
            file = %tx.name,
            schema = %schema.id,
            "Received document stored"
        );
        Ok(tx)
    }
}

/// Transaction name of a received document, unique within one second
fn receipt_name(received: DateTime<Utc>) -> String {
    let token = Uuid::new_v4().simple().to_string();
    format!(
        "Incoming_cXML_{}_{}.xml",
        received.format("%Y%m%d_%H%M%S_%6f"),
        &token[..8]
    )
}

/// Identity and shared secret under the document root
fn credentials(tree: &Value) -> Result<(String, String)> {
    let root = tree
        .as_object()
        .and_then(|map| map.values().next())
        .unwrap_or(&Value::Null);
    let field = |path: &str| get_path(root, path).and_then(element_text);

    match (field(IDENTITY_PATH), field(SECRET_PATH)) {
        (Some(login), Some(secret)) => Ok((login, secret)),
        _ => Err(EdiError::Validation("Missing credentials".to_string())),
    }
}

/// `.xml` entries of a zip archive, in archive order
fn zip_documents(data: &[u8]) -> Result<Vec<(String, String)>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data))?;
    let mut documents = Vec::new();
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if !entry.is_file() || !entry.name().to_lowercase().ends_with(".xml") {
            continue;
        }
        let name = entry.name().to_string();
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes)?;
        documents.push((name, String::from_utf8_lossy(&bytes).into_owned()));
    }
    Ok(documents)
}

/// `<cXML timestamp payloadID xml:lang><Response><Status code text>message</Status>`
pub fn cxml_status(code: u16, message: &str, now: DateTime<Utc>) -> Result<String> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let timestamp = now.format("%Y-%m-%dT%H:%M:%SZ").to_string();
    let payload_id = format!("resp-{}", now.timestamp_micros() as f64 / 1_000_000.0);
    let mut root = BytesStart::new("cXML");
    root.push_attribute(("timestamp", timestamp.as_str()));
    root.push_attribute(("xml:lang", "en"));
    root.push_attribute(("payloadID", payload_id.as_str()));
    writer.write_event(Event::Start(root))?;
    writer.write_event(Event::Start(BytesStart::new("Response")))?;

    let code_text = code.to_string();
    let mut status = BytesStart::new("Status");
    status.push_attribute(("code", code_text.as_str()));
    status.push_attribute(("text", if code == 200 { "OK" } else { "Error" }));
    writer.write_event(Event::Start(status))?;
    writer.write_event(Event::Text(BytesText::new(message)))?;
    writer.write_event(Event::End(BytesEnd::new("Status")))?;

    writer.write_event(Event::End(BytesEnd::new("Response")))?;
    writer.write_event(Event::End(BytesEnd::new("cXML")))?;

    String::from_utf8(writer.into_inner())
        .map_err(|e| EdiError::Xml(format!("Response is not valid UTF-8: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::store::{EdiStore, MemoryEdiStore, MemoryRecordStore};
    use crate::adapters::transport::DefaultTransportFactory;
    use crate::config::{secret_string, RouteConfig, SchemaConfig};
    use crate::core::registry::SchemaRegistry;
    use crate::domain::field::{FieldDescriptor, FieldKind, ModelDescriptor};
    use crate::domain::schema::FileType;
    use crate::domain::{Direction, SchemaId, TransactionState, Values};
    use chrono::TimeZone;
    use std::io::Write;
    use std::str::FromStr;

    fn order_schema() -> SchemaConfig {
        SchemaConfig {
            id: SchemaId::from_str("cxml_orders").unwrap(),
            model: "sale.order".to_string(),
            direction: Direction::Incoming,
            file_type: FileType::Single,
            main_table: true,
            xml_header: Some("cXML/Request".to_string()),
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

    fn service(routes: Vec<RouteConfig>) -> (ReceiptService, Arc<MemoryEdiStore>) {
        let records = MemoryRecordStore::new().with_model(
            ModelDescriptor::new("sale.order")
                .with_field(FieldDescriptor::new("name", FieldKind::Char)),
        );
        let registry =
            SchemaRegistry::from_parts(&[order_schema()], &[], &routes, 8, &records).unwrap();
        let edi = Arc::new(MemoryEdiStore::new());
        let ctx = EngineContext::new(
            Arc::new(registry),
            Arc::new(records),
            edi.clone(),
            Arc::new(DefaultTransportFactory::new()),
        );
        let users = vec![UserConfig {
            login: "buyer".to_string(),
            shared_secret: secret_string("s3cret".to_string()),
        }];
        let service = ReceiptService::new(
            ctx,
            Arc::new(ConfigAuthenticator::new(users)),
            "/cxml/receive",
        );
        (service, edi)
    }

    fn default_route() -> Vec<RouteConfig> {
        vec![RouteConfig {
            route: "/cxml/receive".to_string(),
            schema: SchemaId::from_str("cxml_orders").unwrap(),
        }]
    }

    fn document(identity: &str, secret: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<cXML payloadID="42@buyer" timestamp="2025-03-01T10:00:00Z">
  <Header>
    <Sender>
      <Credential domain="NetworkID">
        <Identity>{identity}</Identity>
        <SharedSecret>{secret}</SharedSecret>
      </Credential>
    </Sender>
  </Header>
  <Request><OrderRequest><ID>PO-1</ID></OrderRequest></Request>
</cXML>"#
        )
    }

    #[test]
    fn test_raw_document_is_stored() {
        let (service, edi) = service(default_route());
        let response = service.receive(ReceiptPayload::Raw(document("buyer", "s3cret").into_bytes()));

        assert_eq!(response.status, 200);
        assert_eq!(response.message, "Authenticated and stored 1 record(s)");

        let txs = edi.transactions().unwrap();
        assert_eq!(txs.len(), 1);
        let tx = &txs[0];
        assert!(tx.name.starts_with("Incoming_cXML_") && tx.name.ends_with(".xml"));
        assert_eq!(tx.direction, Direction::Incoming);
        assert_eq!(tx.state, TransactionState::Draft);
        assert_eq!(tx.schema, Some(SchemaId::from_str("cxml_orders").unwrap()));

        let attachment = edi.attachment(tx.attachment.unwrap()).unwrap().unwrap();
        assert!(attachment.text().contains("PO-1"));
    }

    #[test]
    fn test_same_second_receipts_get_distinct_names() {
        let received = Utc.with_ymd_and_hms(2025, 3, 4, 10, 15, 30).unwrap();
        let first = receipt_name(received);
        let second = receipt_name(received);
        assert_ne!(first, second);
        assert!(first.starts_with("Incoming_cXML_20250304_101530_000000_"));
        assert!(first.ends_with(".xml"));

        let (service, edi) = service(default_route());
        for _ in 0..2 {
            let response =
                service.receive(ReceiptPayload::Raw(document("buyer", "s3cret").into_bytes()));
            assert_eq!(response.status, 200);
        }
        let names: std::collections::BTreeSet<String> =
            edi.transactions().unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names.len(), 2);
    }

    #[test]
    fn test_blank_body_is_bad_request() {
        let (service, edi) = service(default_route());
        let response = service.receive(ReceiptPayload::Raw(b"  \n ".to_vec()));
        assert_eq!(response, ReceiptResponse::new(400, "Empty XML"));
        assert!(edi.transactions().unwrap().is_empty());
    }

    #[test]
    fn test_missing_credentials() {
        let (service, _) = service(default_route());
        let xml = "<cXML><Header><Sender/></Header></cXML>";
        let response = service.receive(ReceiptPayload::Raw(xml.as_bytes().to_vec()));
        assert_eq!(response.status, 500);
        assert!(response.message.contains("Missing credentials"));
    }

    #[test]
    fn test_unknown_user_and_wrong_secret() {
        let (service, edi) = service(default_route());

        let unknown = service.receive(ReceiptPayload::Raw(document("ghost", "x").into_bytes()));
        assert_eq!(unknown.status, 500);
        assert!(unknown.message.contains("User not found: ghost"));

        let wrong = service.receive(ReceiptPayload::Raw(document("buyer", "nope").into_bytes()));
        assert_eq!(wrong.status, 500);
        assert!(wrong.message.contains("Invalid username/password"));
        assert!(edi.transactions().unwrap().is_empty());
    }

    #[test]
    fn test_route_falls_back_to_first_mapping() {
        let (service, edi) = service(vec![RouteConfig {
            route: "/other".to_string(),
            schema: SchemaId::from_str("cxml_orders").unwrap(),
        }]);
        let response = service.receive(ReceiptPayload::Raw(document("buyer", "s3cret").into_bytes()));
        assert_eq!(response.status, 200);
        assert_eq!(edi.transactions().unwrap().len(), 1);
    }

    #[test]
    fn test_no_route_mapping_is_error() {
        let (service, _) = service(vec![]);
        let response = service.receive(ReceiptPayload::Raw(document("buyer", "s3cret").into_bytes()));
        assert_eq!(response.status, 500);
        assert!(response.message.contains("No schema is mapped"));
    }

    #[test]
    fn test_multipart_files_and_zip() {
        let (service, edi) = service(default_route());

        let mut zipped = Vec::new();
        {
            let mut writer = zip::ZipWriter::new(Cursor::new(&mut zipped));
            let options = zip::write::FileOptions::default();
            writer.start_file("a.xml", options).unwrap();
            writer.write_all(document("buyer", "s3cret").as_bytes()).unwrap();
            writer.start_file("notes.txt", options).unwrap();
            writer.write_all(b"ignored").unwrap();
            writer.start_file("b.xml", options).unwrap();
            writer.write_all(document("buyer", "s3cret").as_bytes()).unwrap();
            writer.finish().unwrap();
        }

        let response = service.receive(ReceiptPayload::Files(vec![
            UploadedFile {
                name: "order.XML".to_string(),
                data: document("buyer", "s3cret").into_bytes(),
            },
            UploadedFile {
                name: "batch.zip".to_string(),
                data: zipped,
            },
        ]));

        assert_eq!(response.status, 200);
        assert_eq!(response.message, "Authenticated and stored 3 record(s)");
        assert_eq!(edi.transactions().unwrap().len(), 3);
    }

    #[test]
    fn test_rejected_files_are_listed() {
        let (service, edi) = service(default_route());
        let response = service.receive(ReceiptPayload::Files(vec![
            UploadedFile {
                name: "empty.xml".to_string(),
                data: Vec::new(),
            },
            UploadedFile {
                name: "scan.pdf".to_string(),
                data: b"%PDF".to_vec(),
            },
            UploadedFile {
                name: "ok.xml".to_string(),
                data: document("buyer", "s3cret").into_bytes(),
            },
        ]));

        assert_eq!(response.status, 500);
        assert_eq!(
            response.message,
            "Errors: Empty file content: empty.xml; Unsupported file type: scan.pdf"
        );
        assert_eq!(edi.transactions().unwrap().len(), 1);
    }

    #[test]
    fn test_cxml_status_document() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap();
        let xml = cxml_status(200, "Authenticated and stored 1 record(s)", now).unwrap();

        let tree = decode(&xml).unwrap();
        assert_eq!(get_path(&tree, "cXML/@timestamp").unwrap(), "2025-03-01T10:00:00Z");
        assert_eq!(get_path(&tree, "cXML/@xml:lang").unwrap(), "en");
        assert_eq!(get_path(&tree, "cXML/Response/Status/@code").unwrap(), "200");
        assert_eq!(get_path(&tree, "cXML/Response/Status/@text").unwrap(), "OK");
        assert_eq!(
            get_path(&tree, "cXML/Response/Status/#text").unwrap(),
            "Authenticated and stored 1 record(s)"
        );

        let error = cxml_status(500, "Errors: boom", now).unwrap();
        assert!(error.contains(r#"text="Error""#));
    }
}
