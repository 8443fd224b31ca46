//! Outgoing document generation
//!
//! Renders records through a schema, stores the XML as an attachment and records a
//! draft outgoing transaction. Preparation failures never escape: they are written to
//! a log book and the transaction is created in failed state instead.

use super::prepare::{batch_file_name, record_file_name, ValuePreparer};
use crate::adapters::store::{EdiStore, RecordStore};
use crate::core::context::EngineContext;
use crate::core::registry::CATALOG_MODEL;
use crate::core::state::{LogSession, TransactionStateMachine};
use crate::core::tree::wrap_under;
use crate::core::xml::encode_document;
use crate::domain::attachment::{Attachment, NewAttachment};
use crate::domain::field::PROCESSED_FIELD;
use crate::domain::ids::RecordId;
use crate::domain::record::{is_falsy, Record};
use crate::domain::schema::SchemaTable;
use crate::domain::transaction::{
    Direction, Reference, Transaction, TransactionBuilder, TransactionState,
};
use crate::domain::{EdiError, Result, SchemaId};
use chrono::Utc;
use serde_json::{Map, Value};

/// Note added to transactions whose export failed
pub const RECOMPUTE_HINT: &str =
    "After rectify issue, you can re-compute XML content again from 'Re-compute' button.";

/// Export entry points over an [`EngineContext`]
pub struct ExportEngine<'a> {
    ctx: &'a EngineContext,
}

impl<'a> ExportEngine<'a> {
    pub fn new(ctx: &'a EngineContext) -> Self {
        Self { ctx }
    }

    fn edi(&self) -> &dyn EdiStore {
        self.ctx.edi.as_ref()
    }

    fn records(&self) -> &dyn RecordStore {
        self.ctx.records.as_ref()
    }

    /// Builds the value tree of one record (see [`ValuePreparer::prepare`])
    pub fn prepare_values(
        &self,
        schema: &SchemaTable,
        record: &Record,
        multiple: bool,
    ) -> Result<Value> {
        ValuePreparer::new(&self.ctx.registry, self.records()).prepare(schema, record, multiple)
    }

    /// Exports one record into its own file
    ///
    /// With `existing`, that transaction is updated in place instead of creating a new one.
    pub fn export_record(
        &self,
        schema: &SchemaTable,
        record: &Record,
        existing: Option<Transaction>,
    ) -> Result<Transaction> {
        let name = record_file_name(record);
        let rendered = self
            .prepare_values(schema, record, false)
            .and_then(|tree| encode_document(&tree));

        self.store_export(
            schema,
            name,
            rendered,
            Reference::single(&record.model, record.id),
            schema.partner,
            existing,
        )
    }

    /// Exports several records of one schema into a single file
    pub fn export_records(
        &self,
        schema: &SchemaTable,
        records: &[Record],
        existing: Option<Transaction>,
    ) -> Result<Transaction> {
        let ids: Vec<RecordId> = records.iter().map(|r| r.id).collect();
        let name = batch_file_name(&schema.model, &ids);
        let rendered = self
            .prepare_batch(schema, records)
            .and_then(|tree| encode_document(&tree));
        let partner = if schema.model == CATALOG_MODEL {
            None
        } else {
            schema.partner
        };

        self.store_export(
            schema,
            name,
            rendered,
            Reference::multi(&schema.model, ids),
            partner,
            existing,
        )
    }

    /// Exports operator-selected catalog records that were not exported yet
    ///
    /// # Errors
    ///
    /// Returns a validation error when the schema does not target the product variant
    /// model or when every selected record is already processed.
    pub fn export_selected(&self, schema_id: &SchemaId, ids: &[RecordId]) -> Result<Transaction> {
        let schema = self.ctx.registry.get(schema_id)?;
        if schema.model != CATALOG_MODEL {
            return Err(EdiError::Validation(
                "Mapping table must belongs to Product Variant(product.product).".to_string(),
            ));
        }

        let mut pending = Vec::new();
        for id in ids {
            if let Some(record) = self.records().read(&schema.model, *id)? {
                if is_falsy(record.get(PROCESSED_FIELD)) {
                    pending.push(record);
                }
            }
        }
        if pending.is_empty() {
            return Err(EdiError::Validation(
                "Selected products already exported.".to_string(),
            ));
        }

        self.export_records(schema, &pending, None)
    }

    fn prepare_batch(&self, schema: &SchemaTable, records: &[Record]) -> Result<Value> {
        let element = schema.multiple_records_element.as_deref().ok_or_else(|| {
            EdiError::Configuration(format!(
                "Schema '{}' exports multiple records but has no multiple records element",
                schema.id
            ))
        })?;

        let mut items = records
            .iter()
            .map(|record| self.prepare_values(schema, record, true))
            .collect::<Result<Vec<_>>>()?;
        let items = if items.len() == 1 {
            items.remove(0)
        } else {
            Value::Array(items)
        };

        let mut tree = Map::new();
        tree.insert(element.to_string(), items);
        Ok(wrap_under(Value::Object(tree), &schema.header_segments()))
    }

    fn store_export(
        &self,
        schema: &SchemaTable,
        name: String,
        rendered: Result<String>,
        reference: Reference,
        partner: Option<RecordId>,
        existing: Option<Transaction>,
    ) -> Result<Transaction> {
        let mut log = LogSession::open(
            self.edi(),
            existing.as_ref().and_then(|tx| tx.log),
            &name,
        )?;

        let (xml, attachment, failed) = match rendered {
            Ok(xml) => {
                let attachment = self.upsert_attachment(&name, &xml)?;
                (Some(xml), Some(attachment.id), false)
            }
            Err(e) => {
                log.fault("export", format!("Something went wrong => {e}"))?;
                tracing::info!(
                    schema = %schema.id,
                    file = %name,
                    error = %e,
                    "Something went wrong at the time of preparing xml data"
                );
                (None, None, true)
            }
        };

        let mut tx = match existing {
            Some(mut tx) => {
                tx.name = name;
                tx.direction = Direction::Outgoing;
                tx.schema = Some(schema.id.clone());
                tx.xml_content = xml;
                tx.reference = Some(reference);
                tx.attachment = attachment;
                tx.partner = partner;
                self.edi().save_transaction(&tx)?;
                tx
            }
            None => self.edi().create_transaction(
                TransactionBuilder::new(name, Direction::Outgoing)
                    .schema(schema.id.clone())
                    .maybe_xml_content(xml)
                    .reference(reference)
                    .maybe_attachment(attachment)
                    .partner(partner)
                    .build(),
            )?,
        };

        if failed {
            TransactionStateMachine::complete(&mut tx, TransactionState::Failed)?;
            tx.log = Some(log.id());
            tx.notes
                .push(format!("Please check log [{}] for more details.", log.name()));
            tx.notes.push(RECOMPUTE_HINT.to_string());
            self.edi().save_transaction(&tx)?;
        }

        let log_id = log.id();
        if log.finish()?.is_none() && tx.log == Some(log_id) {
            tx.log = None;
        }
        self.edi().commit()?;

        tracing::info!(
            schema = %schema.id,
            transaction_id = %tx.id,
            file = %tx.name,
            state = %tx.state,
            "Export stored"
        );
        Ok(tx)
    }

    fn upsert_attachment(&self, name: &str, xml: &str) -> Result<Attachment> {
        let now = Utc::now();
        match self.edi().find_attachment(name, None)? {
            Some(mut attachment) => {
                attachment.data = xml.as_bytes().to_vec();
                attachment.file_content = Some(xml.to_string());
                attachment.sync_date = Some(now);
                self.edi().save_attachment(&attachment)?;
                Ok(attachment)
            }
            None => {
                let mut new = NewAttachment::new(name, xml.as_bytes().to_vec());
                new.file_content = Some(xml.to_string());
                new.sync_date = Some(now);
                self.edi().create_attachment(new)
            }
        }
    }
}
