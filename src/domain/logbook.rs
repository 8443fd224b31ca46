//! Operator-facing audit logs

use super::ids::LogBookId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Groups the log lines of one processing attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogBook {
    pub id: LogBookId,
    /// Sequence name, e.g. `LOG/00042`
    pub name: String,
    /// Document the attempt was about
    pub file_name: String,
    #[serde(default)]
    pub lines: Vec<LogLine>,
    pub created_at: DateTime<Utc>,
}

impl LogBook {
    pub fn has_faults(&self) -> bool {
        self.lines.iter().any(|l| l.fault)
    }
}

/// One audit entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    pub name: String,
    pub message: String,
    /// True when the entry records a failed operation
    pub fault: bool,
    pub logged_at: DateTime<Utc>,
}

impl LogLine {
    pub fn new(name: impl Into<String>, message: impl Into<String>, fault: bool) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            fault,
            logged_at: Utc::now(),
        }
    }
}

/// Formats the sequence name of the n-th log book
pub fn sequence_name(n: u64) -> String {
    format!("LOG/{n:05}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_name() {
        assert_eq!(sequence_name(42), "LOG/00042");
    }

    #[test]
    fn test_has_faults() {
        let mut book = LogBook {
            id: LogBookId::new(1),
            name: sequence_name(1),
            file_name: "a.xml".to_string(),
            lines: vec![LogLine::new("a.xml", "uploaded", false)],
            created_at: Utc::now(),
        };
        assert!(!book.has_faults());
        book.lines.push(LogLine::new("a.xml", "boom", true));
        assert!(book.has_faults());
    }
}
