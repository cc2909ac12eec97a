//! Typed identifiers.
//!
//! The backend uses integer primary keys. Wrapping them keeps a dataset id
//! from being passed where a question set id is expected.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Raw integer value.
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }
    };
}

entity_id!(
    /// Identifier of a question set.
    QuestionSetId
);
entity_id!(
    /// Identifier of a question inside a question set.
    QuestionId
);
entity_id!(
    /// Identifier of a dataset.
    DatasetId
);
entity_id!(
    /// Identifier of a respondent record.
    RecordId
);
entity_id!(
    /// Identifier of an assessment result.
    ResultId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_serialize_as_plain_integers() {
        let json = serde_json::to_string(&DatasetId(42)).unwrap();
        assert_eq!(json, "42");
        let id: QuestionSetId = serde_json::from_str("7").unwrap();
        assert_eq!(id, QuestionSetId(7));
    }

    #[test]
    fn test_id_display() {
        assert_eq!(RecordId(3).to_string(), "3");
    }
}
