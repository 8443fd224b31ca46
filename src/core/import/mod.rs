//! Incoming document import
//!
//! - [`coerce`] - element text to field value rules
//! - [`engine`] - record resolution, upsert matching and transaction outcome

pub mod coerce;
pub mod engine;

pub use coerce::{Coercer, LineOutcome};
pub use engine::{batch_state, ImportEngine, ItemOutcome, INVENTORY_MODEL};
