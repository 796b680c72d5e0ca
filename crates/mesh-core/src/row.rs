//! Datastore row representation
//!
//! Payloads are persisted as flat JSON objects keyed by column name.

use crate::error::CoreError;
use serde::Serialize;

/// One persisted record (column name -> value)
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Serialize a payload into a row
///
/// # Errors
/// `CoreError::NotAnObject` if the payload does not serialize to a JSON object.
pub fn to_row<T: Serialize>(payload: &T) -> Result<Row, CoreError> {
    match serde_json::to_value(payload)? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(CoreError::NotAnObject(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Sample {
        id: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    }

    #[test]
    fn skipped_fields_are_absent_from_row() {
        let row = to_row(&Sample { id: "a", label: None }).unwrap();
        assert_eq!(row.len(), 1);
        assert_eq!(row["id"], "a");
    }

    #[test]
    fn scalars_are_rejected() {
        assert!(matches!(to_row(&5_u32), Err(CoreError::NotAnObject(_))));
    }
}
