use serde::{Deserialize, Serialize};

use super::enums::Severity;

/// A patient allergy as held by the patient record. Read-only input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Allergy {
    pub allergen: String,
    pub severity: Severity,
    #[serde(default)]
    pub reaction: String,
}
