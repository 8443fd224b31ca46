//! Transaction processing and operator actions
//!
//! [`Processor::process`] dispatches on direction: incoming transactions are imported,
//! outgoing ones are uploaded to their schema's export directory. Outgoing failures at
//! any step (missing destination, missing server, connection or transfer errors) end
//! the transaction in failed state with a log book; they are never returned as errors.
//! A failure to flag the records after a completed upload is logged on a done
//! transaction, so the file is not sent twice.

use crate::adapters::store::EdiStore;
use crate::adapters::transport::TransportSession;
use crate::config::ServerConfig;
use crate::core::context::EngineContext;
use crate::core::export::summary::{BatchError, BatchErrorType, BatchResult};
use crate::core::export::ExportEngine;
use crate::core::import::ImportEngine;
use crate::core::state::{LogSession, TransactionStateMachine};
use crate::domain::directory::join_remote;
use crate::domain::field::PROCESSED_FIELD;
use crate::domain::ids::TransactionId;
use crate::domain::record::{Record, Values};
use crate::domain::schema::{ExportDestination, SchemaTable};
use crate::domain::transaction::{Direction, Reference, Transaction, TransactionState};
use crate::domain::{DirectorySettings, EdiError, Result};
use chrono::{Duration, Utc};
use serde_json::Value;
use uuid::Uuid;

/// Runs `process` and the operator actions over an [`EngineContext`]
pub struct Processor<'a> {
    ctx: &'a EngineContext,
}

impl<'a> Processor<'a> {
    pub fn new(ctx: &'a EngineContext) -> Self {
        Self { ctx }
    }

    fn edi(&self) -> &'a dyn EdiStore {
        self.ctx.edi.as_ref()
    }

    /// Loads a transaction or fails with a validation error
    pub fn load(&self, id: TransactionId) -> Result<Transaction> {
        self.edi()
            .transaction(id)?
            .ok_or_else(|| EdiError::Validation(format!("Transaction {id} does not exist")))
    }

    /// Imports or uploads a transaction depending on its direction
    ///
    /// # Errors
    ///
    /// Returns a validation error when the transaction has no attachment, and a state
    /// error when it is not in a processable state. Import errors about missing or
    /// malformed XML propagate as well.
    pub async fn process(&self, tx: &mut Transaction) -> Result<()> {
        if tx.attachment.is_none() {
            return Err(EdiError::Validation(
                "No any attachment data found.".to_string(),
            ));
        }
        TransactionStateMachine::ensure_processable(tx)?;

        match tx.direction {
            Direction::Incoming => ImportEngine::new(self.ctx).import_transaction(tx),
            Direction::Outgoing => self.upload(tx).await,
        }
    }

    async fn upload(&self, tx: &mut Transaction) -> Result<()> {
        let schema_id = tx.schema.clone().ok_or_else(|| {
            EdiError::Configuration(format!("Transaction '{}' has no mapping schema", tx.name))
        })?;
        let schema = self.ctx.registry.get(&schema_id)?;
        let mut log = LogSession::open(self.edi(), tx.log, &tx.name)?;

        // Once the file is on the remote the transaction is done, even when flagging the
        // exported records fails
        let state = match self.try_upload(tx, schema).await {
            Ok(()) => {
                if let Err(e) = self.mark_processed(tx.reference.as_ref()) {
                    log.fault("upload", format!("Something went wrong => {e}"))?;
                }
                TransactionState::Done
            }
            Err(message) => {
                log.fault("upload", message)?;
                TransactionState::Failed
            }
        };

        TransactionStateMachine::complete(tx, state)?;
        if log.has_faults() {
            tx.log = Some(log.id());
            let note = format!("Please check log [{}] for more details.", log.name());
            if !tx.notes.contains(&note) {
                tx.notes.push(note);
            }
        }
        let log_id = log.id();
        if log.finish()?.is_none() && tx.log == Some(log_id) {
            tx.log = None;
        }

        self.edi().save_transaction(tx)?;
        self.edi().commit()?;
        tracing::info!(
            transaction_id = %tx.id,
            file = %tx.name,
            state = %tx.state,
            "Outgoing transaction processed"
        );
        Ok(())
    }

    /// Uploads the XML payload; the error is the log line to write
    async fn try_upload(
        &self,
        tx: &Transaction,
        schema: &SchemaTable,
    ) -> std::result::Result<(), String> {
        let destination = schema.export_destination.as_ref().ok_or_else(|| {
            format!(
                "Please select an export directory for schema [{}]",
                schema.id
            )
        })?;

        let settings = self
            .destination_settings(destination)
            .map_err(|e| format!("Something went wrong => {e}"))?;
        if !settings.is_some_and(|s| s.upload) {
            return Err(format!(
                "Please enable Upload configuration for your selected export directory [{}]",
                destination.directory
            ));
        }

        let server = self
            .ctx
            .server(&destination.server)
            .ok_or_else(|| "Please Create Server record.".to_string())?;

        let mut session = self
            .connect(server)
            .await
            .map_err(|e| format!("Error due to connection failure => {e}"))?;

        let result = self.transfer(tx, destination, session.as_mut()).await;
        if let Err(e) = session.disconnect().await {
            tracing::debug!(server = %server.id, error = %e, "Disconnect failed");
        }
        result.map_err(|e| format!("Something went wrong => {e}"))
    }

    async fn connect(&self, server: &ServerConfig) -> Result<Box<dyn TransportSession>> {
        let transport = self.ctx.transports.transport(server.protocol)?;
        Ok(transport.connect(server).await?)
    }

    async fn transfer(
        &self,
        tx: &Transaction,
        destination: &ExportDestination,
        session: &mut dyn TransportSession,
    ) -> Result<()> {
        let scratch = self.ctx.scratch_dir()?;
        let local = scratch.path().join(&tx.name);
        tokio::fs::write(&local, tx.xml_content.as_deref().unwrap_or_default()).await?;
        let bytes = tokio::fs::read(&local).await?;

        let remote = join_remote(&destination.directory, &tx.name);
        session.upload(&bytes, &remote).await?;
        tracing::info!(file = %tx.name, remote = %remote, "Uploaded");
        Ok(())
    }

    /// Settings of the export directory, discovered or configured
    fn destination_settings(
        &self,
        destination: &ExportDestination,
    ) -> Result<Option<DirectorySettings>> {
        let wanted = destination.directory.trim_end_matches('/');
        let discovered = self
            .edi()
            .directories(&destination.server)?
            .into_iter()
            .find(|d| d.path.trim_end_matches('/') == wanted)
            .map(|d| d.settings);
        if discovered.is_some() {
            return Ok(discovered);
        }
        Ok(self.ctx.server(&destination.server).and_then(|server| {
            server
                .directories
                .iter()
                .find(|d| d.path.trim_end_matches('/') == wanted)
                .map(|d| d.settings.clone())
        }))
    }

    fn mark_processed(&self, reference: Option<&Reference>) -> Result<()> {
        let Some(reference) = reference else {
            return Ok(());
        };
        let mut values = Values::new();
        values.insert(PROCESSED_FIELD.to_string(), Value::Bool(true));
        for (model, id) in reference.records() {
            self.ctx.records.write(&model, id, values.clone())?;
        }
        self.ctx.records.commit()
    }

    /// Regenerates the XML of a failed outgoing transaction in place
    ///
    /// The record(s) are taken from the transaction's reference: a single reference
    /// re-runs the single-record export, a multi reference the batch export.
    pub fn recompute_xml(&self, mut tx: Transaction) -> Result<Transaction> {
        TransactionStateMachine::begin_recompute(&mut tx)?;

        let schema_id = tx.schema.clone().ok_or_else(|| {
            EdiError::Configuration(format!("Transaction '{}' has no mapping schema", tx.name))
        })?;
        let schema = self.ctx.registry.get(&schema_id)?;
        let engine = ExportEngine::new(self.ctx);

        match tx.reference.clone() {
            Some(Reference::Single { model, id }) => {
                let record = self.ctx.records.read(&model, id)?.ok_or_else(|| {
                    EdiError::Validation(format!("Record {model},{id} no longer exists"))
                })?;
                engine.export_record(schema, &record, Some(tx))
            }
            Some(Reference::Multi { records }) => {
                let mut found: Vec<Record> = Vec::new();
                for (model, ids) in &records {
                    for id in ids {
                        if let Some(record) = self.ctx.records.read(model, *id)? {
                            found.push(record);
                        }
                    }
                    if !found.is_empty() {
                        break;
                    }
                }
                if found.is_empty() {
                    return Err(EdiError::Validation(format!(
                        "Records of transaction '{}' no longer exist",
                        tx.name
                    )));
                }
                engine.export_records(schema, &found, Some(tx))
            }
            None => Err(EdiError::Validation(format!(
                "Transaction '{}' does not reference any record",
                tx.name
            ))),
        }
    }

    /// Moves a transaction back to draft and persists it
    pub fn reset(&self, id: TransactionId) -> Result<Transaction> {
        let mut tx = self.load(id)?;
        TransactionStateMachine::reset(&mut tx)?;
        self.edi().save_transaction(&tx)?;
        self.edi().commit()?;
        Ok(tx)
    }

    /// Cancels a transaction and persists it
    pub fn cancel(&self, id: TransactionId) -> Result<Transaction> {
        let mut tx = self.load(id)?;
        TransactionStateMachine::cancel(&mut tx)?;
        self.edi().save_transaction(&tx)?;
        self.edi().commit()?;
        Ok(tx)
    }
}

/// Processes every draft transaction
///
/// Each transaction is claimed for `claim_lease_seconds` before processing and released
/// afterwards; transactions claimed by another worker are skipped. One transaction's
/// failure never stops the others.
pub async fn auto_process_edi_transactions(ctx: &EngineContext) -> Result<BatchResult> {
    let processor = Processor::new(ctx);
    let owner = Uuid::new_v4().to_string();
    let lease = Duration::seconds(i64::try_from(ctx.processing.claim_lease_seconds).unwrap_or(i64::MAX));
    let mut result = BatchResult::new();

    let drafts = ctx.edi.transactions_in_state(TransactionState::Draft)?;
    let total = drafts.len();
    for (index, listed) in drafts.into_iter().enumerate() {
        crate::log_batch_progress!("auto_process", index + 1, total);

        let now = Utc::now();
        if !ctx.edi.try_claim(listed.id, &owner, now + lease, now)? {
            tracing::debug!(transaction_id = %listed.id, "Claimed by another worker, skipped");
            result.add_skipped();
            continue;
        }

        let outcome = match processor.load(listed.id) {
            Ok(tx) if tx.state != TransactionState::Draft => {
                result.add_skipped();
                Ok(())
            }
            Ok(mut tx) => match processor.process(&mut tx).await {
                Ok(()) if tx.state == TransactionState::Failed => {
                    result.add_failure(
                        BatchError::new(
                            BatchErrorType::State,
                            "Transaction ended in failed state".to_string(),
                        )
                        .with_context(tx.name.as_str()),
                    );
                    Ok(())
                }
                Ok(()) => {
                    result.add_success();
                    Ok(())
                }
                Err(e) => Err((tx.name, e)),
            },
            Err(e) => Err((listed.name.clone(), e)),
        };

        if let Err((name, e)) = outcome {
            let context = format!("Processing transaction '{name}' failed");
            crate::log_error_with_context!(&e, context.as_str());
            result.add_failure(BatchError::from(&e).with_context(name));
        }

        ctx.edi.release_claim(listed.id, &owner)?;
        ctx.edi.commit()?;
    }

    result.log_summary("auto_process");
    Ok(result)
}
