//! Incoming document import
//!
//! Materializes the records described by an incoming transaction's XML:
//!
//! 1. The XML is decoded and the schema's header path is stripped.
//! 2. Every schema line is resolved against the tree, translated when the schema asks
//!    for it, and coerced into a field value ([`LineOutcome`]).
//! 3. One2many lines collect child drafts, created once the parent exists.
//! 4. The record is matched on the schema's search keys and updated, or created.
//!
//! Single-record documents commit once per record. Multi-record documents import every
//! item independently and commit once at the end; the transaction then ends up done,
//! failed or partially done depending on how many items made it.

use super::coerce::{element_text, Coercer, LineOutcome};
use crate::adapters::store::{EdiStore, RecordStore};
use crate::core::context::EngineContext;
use crate::core::registry::SchemaRegistry;
use crate::core::state::{LogSession, TransactionStateMachine};
use crate::core::tree::{as_list, get_path, strip_header};
use crate::core::xml::decode;
use crate::domain::field::{FieldKind, PROCESSED_FIELD};
use crate::domain::ids::RecordId;
use crate::domain::query::Condition;
use crate::domain::record::{is_falsy, Values};
use crate::domain::schema::{split_path, SchemaLine, SchemaTable};
use crate::domain::transaction::{Reference, Transaction, TransactionState};
use crate::domain::{EdiError, Result};
use serde_json::Value;

/// Model whose imports receive the schema's inventory location
pub const INVENTORY_MODEL: &str = "stock.quant";

const LOCATION_FIELD: &str = "location_id";

/// Field values of one record, resolved but not yet written
#[derive(Debug)]
struct RecordDraft<'s> {
    values: Values,
    children: Vec<ChildDraft<'s>>,
    faults: usize,
    aborted: bool,
}

impl RecordDraft<'_> {
    fn new(defaults: &Values) -> Self {
        Self {
            values: defaults.clone(),
            children: Vec::new(),
            faults: 0,
            aborted: false,
        }
    }
}

/// A one2many child, created after its parent
#[derive(Debug)]
struct ChildDraft<'s> {
    schema: &'s SchemaTable,
    inverse_field: String,
    draft: RecordDraft<'s>,
}

/// How one item of a multi-record document ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    Imported,
    ImportedWithFaults,
    Skipped,
}

/// Aggregated state of a multi-record import
///
/// Done when every item imported cleanly, failed when none was imported, partially
/// done otherwise. A document without items counts as done.
pub fn batch_state(outcomes: &[ItemOutcome]) -> TransactionState {
    if outcomes.iter().all(|o| *o == ItemOutcome::Imported) {
        TransactionState::Done
    } else if outcomes.iter().all(|o| *o == ItemOutcome::Skipped) {
        TransactionState::Failed
    } else {
        TransactionState::PartiallyDone
    }
}

/// Import entry points over an [`EngineContext`]
pub struct ImportEngine<'a> {
    ctx: &'a EngineContext,
}

impl<'a> ImportEngine<'a> {
    pub fn new(ctx: &'a EngineContext) -> Self {
        Self { ctx }
    }

    fn edi(&self) -> &'a dyn EdiStore {
        self.ctx.edi.as_ref()
    }

    fn records(&self) -> &'a dyn RecordStore {
        self.ctx.records.as_ref()
    }

    fn registry(&self) -> &'a SchemaRegistry {
        &self.ctx.registry
    }

    /// Imports the XML content of an incoming transaction
    ///
    /// # Errors
    ///
    /// Returns a validation error when the transaction has no XML or the XML cannot be
    /// parsed, and a configuration error when it has no known schema. Row-level
    /// problems are logged and reflected in the transaction state instead.
    pub fn import_transaction(&self, tx: &mut Transaction) -> Result<()> {
        let schema_id = tx.schema.clone().ok_or_else(|| {
            EdiError::Configuration(format!("Transaction '{}' has no mapping schema", tx.name))
        })?;
        let schema = self.registry().get(&schema_id)?;

        let xml = tx
            .xml_content
            .as_deref()
            .filter(|xml| !xml.trim().is_empty())
            .ok_or_else(|| {
                EdiError::Validation("XML Data is Required to create a Record.".to_string())
            })?;
        let tree = decode(xml).map_err(|e| {
            EdiError::Validation(format!("Something wrong in XML content: \n {e}"))
        })?;
        let tree = strip_header(tree, &schema.header_segments());

        self.create_record(tx, &tree, schema)
    }

    /// Creates or updates the record described by `tree`
    ///
    /// Main multi-record schemas are delegated to the batch path through the sub schema
    /// of their first line.
    pub fn create_record(
        &self,
        tx: &mut Transaction,
        tree: &Value,
        schema: &'a SchemaTable,
    ) -> Result<()> {
        let mut log = LogSession::open(self.edi(), tx.log, &tx.name)?;

        if schema.is_multiple() && schema.main_table {
            let first = schema.lines.first().ok_or_else(|| {
                EdiError::Configuration(
                    "Please configure Mapping XML Elements with Fields in the schema".to_string(),
                )
            })?;
            let item_schema = self.registry().sub_schema(first)?;
            return self.create_records(tx, tree, &first.xml_element, item_schema, log);
        }

        let draft = self.resolve_lines(schema, tree, &mut log, false)?;
        let state = if draft.aborted {
            TransactionState::Failed
        } else {
            let conditions = key_conditions(schema, &draft.values);
            match self.upsert(schema, draft, conditions, true) {
                Ok(id) => {
                    tx.reference = Some(Reference::single(&schema.model, id));
                    TransactionState::Done
                }
                Err(e) if !e.is_systemic() => {
                    log.fault("import", format!("Something went wrong! {e}"))?;
                    TransactionState::Failed
                }
                Err(e) => return Err(e),
            }
        };

        self.records().commit()?;
        self.finish(tx, state, log)
    }

    fn create_records(
        &self,
        tx: &mut Transaction,
        tree: &Value,
        element: &str,
        schema: &'a SchemaTable,
        mut log: LogSession<'a>,
    ) -> Result<()> {
        let items_root = strip_header(tree.clone(), &split_path(element));
        let items = as_list(&items_root);
        let location = inventory_location(schema);

        let mut outcomes = Vec::with_capacity(items.len());
        let mut imported = Vec::new();

        for (index, item) in items.iter().enumerate() {
            crate::log_batch_progress!("import", index + 1, items.len());

            let mut draft = self.resolve_lines(schema, item, &mut log, false)?;
            if draft.aborted {
                outcomes.push(ItemOutcome::Skipped);
                continue;
            }
            if draft.values.is_empty() {
                continue;
            }

            let mut conditions = key_conditions(schema, &draft.values);
            if let Some(location) = location {
                if !schema.search_keys.is_empty()
                    && !conditions.iter().any(|c| c.path == LOCATION_FIELD)
                {
                    conditions.push(Condition::eq(LOCATION_FIELD, location.get()));
                }
                draft
                    .values
                    .entry(LOCATION_FIELD)
                    .or_insert_with(|| Value::from(location.get()));
            }

            let faults = draft.faults;
            match self.upsert(schema, draft, conditions, true) {
                Ok(id) => {
                    imported.push(id);
                    outcomes.push(if faults > 0 {
                        ItemOutcome::ImportedWithFaults
                    } else {
                        ItemOutcome::Imported
                    });
                }
                Err(e) if !e.is_systemic() => {
                    log.fault("import", format!("Something went wrong! {e}"))?;
                    outcomes.push(ItemOutcome::Skipped);
                }
                Err(e) => return Err(e),
            }
        }

        if !imported.is_empty() {
            tx.reference = Some(Reference::multi(&schema.model, imported));
        }
        self.records().commit()?;

        tracing::info!(
            transaction_id = %tx.id,
            schema = %schema.id,
            items = outcomes.len(),
            skipped = outcomes.iter().filter(|o| **o == ItemOutcome::Skipped).count(),
            "Multi-record import finished"
        );
        self.finish(tx, batch_state(&outcomes), log)
    }

    /// Resolves every line of `schema` against `item`
    ///
    /// In `nested` drafts a missing optional element is skipped without a log line.
    fn resolve_lines(
        &self,
        schema: &'a SchemaTable,
        item: &Value,
        log: &mut LogSession<'_>,
        nested: bool,
    ) -> Result<RecordDraft<'a>> {
        let mut draft = RecordDraft::new(&schema.default_values);

        for line in &schema.lines {
            let Some(found) = get_path(item, &line.xml_element) else {
                if line.required {
                    log.fault("import", required_message(line))?;
                    draft.faults += 1;
                    draft.aborted = true;
                    break;
                }
                if !nested {
                    log.fault("import", format!("{} element not found", line.xml_element))?;
                    draft.faults += 1;
                }
                continue;
            };

            if line.field.kind == FieldKind::One2many {
                if !self.resolve_children(line, found, &mut draft, log)? {
                    draft.aborted = true;
                    break;
                }
                continue;
            }

            let outcome = match self.resolve_value(schema, line, found) {
                Ok(outcome) => require(line, outcome),
                Err(e) if !e.is_systemic() => {
                    LineOutcome::skip(format!("Something went wrong! {e}"))
                }
                Err(e) => return Err(e),
            };

            match outcome {
                LineOutcome::Value(value) => {
                    draft.values.insert(line.field.name.clone(), value);
                }
                LineOutcome::Skip { reason: None } => {}
                LineOutcome::Skip {
                    reason: Some(reason),
                } => {
                    log.fault("import", reason)?;
                    draft.faults += 1;
                }
                LineOutcome::Abort(reason) => {
                    log.fault("import", reason)?;
                    draft.faults += 1;
                    draft.aborted = true;
                    break;
                }
            }
        }
        Ok(draft)
    }

    /// Collects one child draft per element under a one2many line
    ///
    /// Returns `false` when a child could not be resolved, which abandons the parent.
    fn resolve_children(
        &self,
        line: &SchemaLine,
        found: &Value,
        draft: &mut RecordDraft<'a>,
        log: &mut LogSession<'_>,
    ) -> Result<bool> {
        let sub = self.registry().sub_schema(line)?;
        let inverse_field = line.field.inverse_field.clone().ok_or_else(|| {
            EdiError::Configuration(format!(
                "One2many field '{}' has no inverse field",
                line.field.name
            ))
        })?;

        for element in as_list(found) {
            let child = self.resolve_lines(sub, element, log, true)?;
            draft.faults += child.faults;
            if child.aborted {
                return Ok(false);
            }
            if child.values.is_empty() && child.children.is_empty() {
                continue;
            }
            draft.children.push(ChildDraft {
                schema: sub,
                inverse_field: inverse_field.clone(),
                draft: child,
            });
        }
        Ok(true)
    }

    /// Text of an element, translated and coerced for the line's field
    ///
    /// An empty element clears the field, except on translated schemas where it is
    /// skipped altogether.
    fn resolve_value(
        &self,
        schema: &SchemaTable,
        line: &SchemaLine,
        found: &Value,
    ) -> Result<LineOutcome> {
        let Some(raw) = element_text(found) else {
            if schema.translate {
                return Ok(LineOutcome::silent_skip());
            }
            return Ok(LineOutcome::Value(Value::Null));
        };

        let raw = if schema.translate {
            self.registry()
                .translate(&schema.id, &line.xml_element, &raw)
                .map(str::to_string)
                .unwrap_or(raw)
        } else {
            raw
        };

        Coercer::new(self.records()).coerce(line, &raw)
    }

    /// Writes a draft: updates the record matching `conditions`, or creates one
    ///
    /// Created top-level records get the processed flag unless their values set it.
    /// Children are upserted afterwards, scoped by their back-reference to the parent.
    fn upsert(
        &self,
        schema: &SchemaTable,
        draft: RecordDraft<'a>,
        conditions: Vec<Condition>,
        top_level: bool,
    ) -> Result<RecordId> {
        let existing = if conditions.is_empty() {
            None
        } else {
            self.records()
                .search(&schema.model, &conditions, Some(1))?
                .into_iter()
                .next()
        };

        let mut values = draft.values;
        let id = match existing {
            Some(id) => {
                self.records().write(&schema.model, id, values)?;
                tracing::debug!(model = %schema.model, id = %id, "Matched record updated");
                id
            }
            None => {
                if top_level {
                    values
                        .entry(PROCESSED_FIELD)
                        .or_insert(Value::Bool(true));
                }
                let id = self.records().create(&schema.model, values)?;
                tracing::debug!(model = %schema.model, id = %id, "Record created");
                id
            }
        };

        for child in draft.children {
            let mut child_draft = child.draft;
            child_draft
                .values
                .insert(child.inverse_field.clone(), Value::from(id.get()));
            let mut child_conditions = key_conditions(child.schema, &child_draft.values);
            if !child_conditions.is_empty() {
                child_conditions.push(Condition::eq(child.inverse_field.as_str(), id.get()));
            }
            self.upsert(child.schema, child_draft, child_conditions, false)?;
        }
        Ok(id)
    }

    fn finish(
        &self,
        tx: &mut Transaction,
        state: TransactionState,
        log: LogSession<'_>,
    ) -> Result<()> {
        TransactionStateMachine::complete(tx, state)?;

        let log_id = log.id();
        let note = format!("Please check log [{}] for more details.", log.name());
        match log.finish()? {
            Some(kept) => {
                tx.log = Some(kept);
                if !tx.notes.contains(&note) {
                    tx.notes.push(note);
                }
            }
            None if tx.log == Some(log_id) => tx.log = None,
            None => {}
        }

        self.edi().save_transaction(tx)?;
        self.edi().commit()?;

        tracing::info!(
            transaction_id = %tx.id,
            file = %tx.name,
            state = %tx.state,
            reference = ?tx.reference.as_ref().map(ToString::to_string),
            "Import finished"
        );
        Ok(())
    }
}

/// Equality conditions built from the search-key elements that resolved to a value
fn key_conditions(schema: &SchemaTable, values: &Values) -> Vec<Condition> {
    schema
        .search_keys
        .iter()
        .filter_map(|key| schema.line_for_element(key.trim()))
        .filter_map(|line| {
            values
                .get(&line.field.name)
                .filter(|v| !is_falsy(v))
                .map(|v| Condition::eq(line.field.name.as_str(), v.clone()))
        })
        .collect()
}

fn inventory_location(schema: &SchemaTable) -> Option<RecordId> {
    if schema.model == INVENTORY_MODEL {
        schema.inventory_location
    } else {
        None
    }
}

fn required_message(line: &SchemaLine) -> String {
    format!("Required Value is not set for {}", line.xml_element)
}

/// Escalates an empty outcome on a required line to an abort
fn require(line: &SchemaLine, outcome: LineOutcome) -> LineOutcome {
    if !line.required {
        return outcome;
    }
    match outcome {
        LineOutcome::Value(Value::Null) | LineOutcome::Skip { .. } => {
            LineOutcome::Abort(required_message(line))
        }
        LineOutcome::Value(Value::String(s)) if s.is_empty() => {
            LineOutcome::Abort(required_message(line))
        }
        other => other,
    }
}
