//! EDI transaction model
//!
//! A transaction tracks one document transfer: the XML payload, the record(s) it
//! produced or consumed, and its lifecycle state. State changes go through
//! [`crate::core::state::TransactionStateMachine`].

use super::ids::{AttachmentId, LogBookId, RecordId, SchemaId, TransactionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Transfer direction of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Incoming,
    Outgoing,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Incoming => write!(f, "incoming"),
            Direction::Outgoing => write!(f, "outgoing"),
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "incoming" | "in" => Ok(Direction::Incoming),
            "outgoing" | "out" => Ok(Direction::Outgoing),
            _ => Err(format!("Invalid direction: {s}")),
        }
    }
}

/// Transaction lifecycle state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionState {
    /// Created, waiting to be processed
    #[default]
    Draft,
    /// Processed successfully
    Done,
    /// Processing failed, see the log book
    Failed,
    /// Some records of a multi-record document failed
    PartiallyDone,
    /// Cancelled by an operator
    Cancel,
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionState::Draft => "draft",
            TransactionState::Done => "done",
            TransactionState::Failed => "failed",
            TransactionState::PartiallyDone => "partially_done",
            TransactionState::Cancel => "cancel",
        };
        f.write_str(s)
    }
}

impl FromStr for TransactionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(TransactionState::Draft),
            "done" => Ok(TransactionState::Done),
            "failed" => Ok(TransactionState::Failed),
            "partially_done" => Ok(TransactionState::PartiallyDone),
            "cancel" => Ok(TransactionState::Cancel),
            _ => Err(format!("Invalid transaction state: {s}")),
        }
    }
}

/// Record(s) a transaction produced or consumed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reference {
    /// One record
    Single { model: String, id: RecordId },
    /// Model name to record ids, for multi-record documents
    Multi {
        records: BTreeMap<String, Vec<RecordId>>,
    },
}

impl Reference {
    pub fn single(model: impl Into<String>, id: RecordId) -> Self {
        Reference::Single {
            model: model.into(),
            id,
        }
    }

    pub fn multi(model: impl Into<String>, ids: Vec<RecordId>) -> Self {
        let mut records = BTreeMap::new();
        records.insert(model.into(), ids);
        Reference::Multi { records }
    }

    /// Flattens the reference into `(model, id)` pairs
    pub fn records(&self) -> Vec<(String, RecordId)> {
        match self {
            Reference::Single { model, id } => vec![(model.clone(), *id)],
            Reference::Multi { records } => records
                .iter()
                .flat_map(|(model, ids)| ids.iter().map(move |id| (model.clone(), *id)))
                .collect(),
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::Single { model, id } => write!(f, "{model},{id}"),
            Reference::Multi { records } => {
                let parts: Vec<String> = records
                    .iter()
                    .map(|(model, ids)| {
                        let ids: Vec<String> = ids.iter().map(|i| i.to_string()).collect();
                        format!("{model}: [{}]", ids.join(", "))
                    })
                    .collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
        }
    }
}

/// A persisted EDI transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub name: String,
    pub direction: Direction,
    pub schema: Option<SchemaId>,
    pub xml_content: Option<String>,
    pub state: TransactionState,
    pub reference: Option<Reference>,
    pub attachment: Option<AttachmentId>,
    pub partner: Option<RecordId>,
    pub log: Option<LogBookId>,
    #[serde(default)]
    pub notes: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    pub fn is_incoming(&self) -> bool {
        self.direction == Direction::Incoming
    }

    /// True when an incoming transaction already materialized its records
    pub fn is_reference_locked(&self) -> bool {
        self.is_incoming() && self.reference.is_some()
    }
}

/// Values for a transaction about to be created
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub name: String,
    pub direction: Direction,
    pub schema: Option<SchemaId>,
    pub xml_content: Option<String>,
    pub state: TransactionState,
    pub reference: Option<Reference>,
    pub attachment: Option<AttachmentId>,
    pub partner: Option<RecordId>,
    pub log: Option<LogBookId>,
    pub notes: Vec<String>,
}

impl NewTransaction {
    /// Materializes the transaction under a store-assigned id
    pub fn into_transaction(self, id: TransactionId, now: DateTime<Utc>) -> Transaction {
        Transaction {
            id,
            name: self.name,
            direction: self.direction,
            schema: self.schema,
            xml_content: self.xml_content,
            state: self.state,
            reference: self.reference,
            attachment: self.attachment,
            partner: self.partner,
            log: self.log,
            notes: self.notes,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Builder for [`NewTransaction`]
///
/// # Examples
///
/// ```
/// use ediflow::domain::transaction::{Direction, TransactionBuilder, TransactionState};
///
/// let tx = TransactionBuilder::new("orders.xml", Direction::Incoming)
///     .xml_content("<Orders/>")
///     .build();
///
/// assert_eq!(tx.state, TransactionState::Draft);
/// assert_eq!(tx.xml_content.as_deref(), Some("<Orders/>"));
/// ```
pub struct TransactionBuilder {
    inner: NewTransaction,
}

impl TransactionBuilder {
    pub fn new(name: impl Into<String>, direction: Direction) -> Self {
        Self {
            inner: NewTransaction {
                name: name.into(),
                direction,
                schema: None,
                xml_content: None,
                state: TransactionState::Draft,
                reference: None,
                attachment: None,
                partner: None,
                log: None,
                notes: Vec::new(),
            },
        }
    }

    pub fn schema(mut self, schema: SchemaId) -> Self {
        self.inner.schema = Some(schema);
        self
    }

    pub fn xml_content(mut self, xml: impl Into<String>) -> Self {
        self.inner.xml_content = Some(xml.into());
        self
    }

    pub fn maybe_xml_content(mut self, xml: Option<String>) -> Self {
        self.inner.xml_content = xml;
        self
    }

    pub fn reference(mut self, reference: Reference) -> Self {
        self.inner.reference = Some(reference);
        self
    }

    pub fn attachment(mut self, attachment: AttachmentId) -> Self {
        self.inner.attachment = Some(attachment);
        self
    }

    pub fn maybe_attachment(mut self, attachment: Option<AttachmentId>) -> Self {
        self.inner.attachment = attachment;
        self
    }

    pub fn partner(mut self, partner: Option<RecordId>) -> Self {
        self.inner.partner = partner;
        self
    }

    pub fn log(mut self, log: Option<LogBookId>) -> Self {
        self.inner.log = log;
        self
    }

    pub fn build(self) -> NewTransaction {
        self.inner
    }
}
