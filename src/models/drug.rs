use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A catalog drug. Immutable once referenced by a `PrescriptionItem`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Drug {
    pub id: String,
    pub brand_name: String,
    /// Generic ingredient names. A combination product lists every
    /// constituent; a single-ingredient drug still lists one entry.
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub strength: String,
    #[serde(default)]
    pub form: String,
    #[serde(default)]
    pub category: String,
}

impl Drug {
    /// Ingredient names with blank entries removed.
    pub fn named_ingredients(&self) -> impl Iterator<Item = &str> {
        self.ingredients
            .iter()
            .map(|i| i.trim())
            .filter(|i| !i.is_empty())
    }

    pub fn has_ingredient_data(&self) -> bool {
        self.named_ingredients().next().is_some()
    }
}

/// One line of the active prescription draft. The engine only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionItem {
    pub id: Uuid,
    pub drug: Drug,
    #[serde(default)]
    pub dosage: String,
    #[serde(default)]
    pub frequency: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub route: String,
    #[serde(default)]
    pub instructions: String,
    pub created_at: DateTime<Utc>,
}

/// Editable fields of a prescription item. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionItemUpdate {
    pub dosage: Option<String>,
    pub frequency: Option<String>,
    pub duration: Option<String>,
    pub route: Option<String>,
    pub instructions: Option<String>,
}

impl PrescriptionItem {
    pub fn apply(&mut self, update: PrescriptionItemUpdate) {
        if let Some(v) = update.dosage {
            self.dosage = v;
        }
        if let Some(v) = update.frequency {
            self.frequency = v;
        }
        if let Some(v) = update.duration {
            self.duration = v;
        }
        if let Some(v) = update.route {
            self.route = v;
        }
        if let Some(v) = update.instructions {
            self.instructions = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_drug(ingredients: &[&str]) -> Drug {
        Drug {
            id: "drug_test".into(),
            brand_name: "Testol".into(),
            ingredients: ingredients.iter().map(|s| s.to_string()).collect(),
            strength: "500mg".into(),
            form: "Tablet".into(),
            category: "Test".into(),
        }
    }

    #[test]
    fn blank_ingredients_are_not_data() {
        assert!(!make_drug(&[]).has_ingredient_data());
        assert!(!make_drug(&["  ", ""]).has_ingredient_data());
        assert!(make_drug(&["Metformin"]).has_ingredient_data());
    }

    #[test]
    fn named_ingredients_skip_blanks() {
        let drug = make_drug(&["Amoxicillin", " ", " Clavulanic Acid "]);
        let names: Vec<&str> = drug.named_ingredients().collect();
        assert_eq!(names, vec!["Amoxicillin", "Clavulanic Acid"]);
    }

    #[test]
    fn apply_update_touches_only_given_fields() {
        let mut item = PrescriptionItem {
            id: Uuid::nil(),
            drug: make_drug(&["Metformin"]),
            dosage: "1 tablet".into(),
            frequency: "twice_daily".into(),
            duration: "7_days".into(),
            route: "Oral".into(),
            instructions: String::new(),
            created_at: Utc::now(),
        };
        item.apply(PrescriptionItemUpdate {
            dosage: Some("2 tablets".into()),
            instructions: Some("After meals".into()),
            ..Default::default()
        });
        assert_eq!(item.dosage, "2 tablets");
        assert_eq!(item.frequency, "twice_daily");
        assert_eq!(item.instructions, "After meals");
    }
}
