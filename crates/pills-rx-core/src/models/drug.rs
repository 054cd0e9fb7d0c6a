//! Drug catalog models.

use serde::{Deserialize, Serialize};

/// Catalog identifier of a drug.
pub type DrugId = i64;

/// A single entry in the drug catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Drug {
    /// Catalog identifier
    pub id: DrugId,
    /// Display name (e.g., "Aspirin 100mg")
    pub description: String,
}

impl Drug {
    /// Create a new catalog entry.
    pub fn new(id: DrugId, description: impl Into<String>) -> Self {
        Self {
            id,
            description: description.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drug_json_shape() {
        let drug = Drug::new(10, "Aspirin");
        let json = serde_json::to_value(&drug).unwrap();
        assert_eq!(json["id"], 10);
        assert_eq!(json["description"], "Aspirin");
    }
}
