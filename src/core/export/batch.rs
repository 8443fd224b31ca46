//! Periodic export batch
//!
//! Selects the unprocessed records of every main outgoing schema and exports them,
//! one file per record or one file per schema depending on the schema's file type.

use super::engine::ExportEngine;
use super::summary::{BatchError, ExportSummary};
use crate::adapters::store::RecordStore;
use crate::core::context::EngineContext;
use crate::domain::field::{ModelDescriptor, PROCESSED_FIELD};
use crate::domain::query::{parse_filter, Condition, Operator};
use crate::domain::schema::SchemaTable;
use crate::domain::transaction::TransactionState;
use crate::domain::Result;
use std::time::Instant;

/// Runs the export batch over every main outgoing schema
///
/// A failing schema is recorded in the summary and the batch moves on; only errors
/// flagged systemic abort the run.
pub fn export_edi_transactions(ctx: &EngineContext) -> Result<ExportSummary> {
    let started = Instant::now();
    let engine = ExportEngine::new(ctx);
    let mut summary = ExportSummary::new();

    let schemas = ctx.registry.outgoing_main_schemas();
    let total = schemas.len();
    for (index, schema) in schemas.into_iter().enumerate() {
        crate::log_batch_progress!("export", index + 1, total);
        summary.schemas += 1;

        if let Err(e) = export_schema(ctx, &engine, schema, &mut summary) {
            if e.is_systemic() {
                crate::log_error_with_context!(&e, "Export batch aborted");
                return Err(e);
            }
            tracing::warn!(schema = %schema.id, error = %e, "Schema export failed");
            summary.add_error(BatchError::from(&e).with_context(schema.id.as_str()));
        }
    }

    let summary = summary.with_duration(started.elapsed());
    summary.log_summary();
    Ok(summary)
}

fn export_schema(
    ctx: &EngineContext,
    engine: &ExportEngine<'_>,
    schema: &SchemaTable,
    summary: &mut ExportSummary,
) -> Result<()> {
    let conditions = selection_conditions(ctx.records.as_ref(), schema)?;
    let ids = ctx.records.search(&schema.model, &conditions, None)?;
    summary.records_selected += ids.len();

    let mut records = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(record) = ctx.records.read(&schema.model, id)? {
            records.push(record);
        }
    }

    tracing::debug!(schema = %schema.id, records = records.len(), "Records selected for export");

    if schema.is_multiple() {
        if !records.is_empty() {
            let tx = engine.export_records(schema, &records, None)?;
            count(summary, tx.state);
        }
    } else {
        for record in &records {
            let tx = engine.export_record(schema, record, None)?;
            count(summary, tx.state);
        }
    }
    Ok(())
}

fn count(summary: &mut ExportSummary, state: TransactionState) {
    if state == TransactionState::Failed {
        summary.transactions_failed += 1;
    } else {
        summary.transactions_created += 1;
    }
}

/// Record selection of a schema
///
/// Combines partner scoping (`child_of`), the unprocessed flag and company scoping
/// with the schema's additional filter. Conditions whose field path does not exist on
/// the model are dropped with a warning. An unparsable additional filter is ignored.
pub fn selection_conditions(
    records: &dyn RecordStore,
    schema: &SchemaTable,
) -> Result<Vec<Condition>> {
    let mut conditions = Vec::new();
    if let Some(partner) = schema.partner {
        conditions.push(Condition::new("partner_id", Operator::ChildOf, partner.get()));
    }
    conditions.push(Condition::eq(PROCESSED_FIELD, false));
    if let Some(company) = schema.company {
        conditions.push(Condition::eq("company_id", company.get()));
    }

    if let Some(filter) = schema.additional_filter.as_deref() {
        match parse_filter(filter) {
            Ok(extra) => conditions.extend(extra),
            Err(e) => {
                tracing::warn!(schema = %schema.id, error = %e, "Failed to parse additional filter");
            }
        }
    }

    let model = records.model(&schema.model)?;
    let mut valid = Vec::with_capacity(conditions.len());
    for condition in conditions {
        if is_valid_path(records, &model, &condition.path)? {
            valid.push(condition);
        } else {
            tracing::warn!(
                "Ignored invalid field '{}' in domain for model '{}'",
                condition.path,
                schema.model
            );
        }
    }
    Ok(valid)
}

fn is_valid_path(records: &dyn RecordStore, model: &ModelDescriptor, path: &str) -> Result<bool> {
    let mut current = model.clone();
    for segment in path.split('.') {
        if segment == "id" {
            continue;
        }
        let Some(field) = current.field(segment) else {
            return Ok(false);
        };
        if field.kind.is_relational() {
            if let Some(relation) = field.relation.clone() {
                current = records.model(&relation)?;
            }
        }
    }
    Ok(true)
}
