//! FILENAME: plan-pivot/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PivotError {
    #[error("Invalid input{}: {reason}", .record.map(|i| format!(" (record {})", i)).unwrap_or_default())]
    InvalidInput {
        /// Index of the offending record, when one record is to blame.
        record: Option<usize>,
        reason: String,
    },

    #[error("Unknown attribute: {0}")]
    UnknownAttribute(String),

    #[error("Invalid node key: {0}")]
    InvalidNodeKey(String),

    #[error("Definition error: {0}")]
    Definition(#[from] serde_json::Error),
}

impl PivotError {
    pub(crate) fn invalid_record(record: usize, reason: impl Into<String>) -> Self {
        PivotError::InvalidInput {
            record: Some(record),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        PivotError::InvalidInput {
            record: None,
            reason: reason.into(),
        }
    }
}

pub type PivotResult<T> = Result<T, PivotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = PivotError::invalid_record(3, "missing time field 'Week'");
        assert_eq!(err.to_string(), "Invalid input (record 3): missing time field 'Week'");

        let err = PivotError::invalid("duplicate metric 'A'");
        assert_eq!(err.to_string(), "Invalid input: duplicate metric 'A'");

        let err = PivotError::UnknownAttribute("Region".to_string());
        assert_eq!(err.to_string(), "Unknown attribute: Region");
    }
}
