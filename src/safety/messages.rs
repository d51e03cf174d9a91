use crate::models::enums::Severity;

/// Clinician-facing wording for findings. Plain, actionable, no alarm
/// vocabulary beyond the severity label itself.
pub struct MessageTemplates;

impl MessageTemplates {
    pub fn interaction_title(severity: Severity) -> String {
        format!("{} drug interaction", Self::severity_label(severity))
    }

    pub fn interaction(
        brand_a: &str,
        ingredient_a: &str,
        brand_b: &str,
        ingredient_b: &str,
        description: &str,
    ) -> String {
        let mut msg = format!(
            "{} ({}) interacts with {} ({}).",
            brand_a, ingredient_a, brand_b, ingredient_b,
        );
        let description = description.trim();
        if !description.is_empty() {
            msg.push(' ');
            msg.push_str(description);
        }
        msg
    }

    pub fn allergy_title(allergen: &str) -> String {
        format!("Allergy alert: {}", allergen)
    }

    /// `ingredients` are the item constituents that matched the allergen.
    pub fn allergy(allergen: &str, brand: &str, ingredients: &[String], reaction: &str) -> String {
        let mut msg = format!(
            "Patient is allergic to {}. {} contains {}.",
            allergen,
            brand,
            ingredients.join(", "),
        );
        let reaction = reaction.trim();
        if !reaction.is_empty() {
            msg.push_str(&format!(" Recorded reaction: {}.", reaction));
        }
        msg
    }

    pub fn unchecked_item(brand: &str) -> String {
        format!(
            "{} has no ingredient data and was not checked for interactions or allergies.",
            brand,
        )
    }

    fn severity_label(severity: Severity) -> &'static str {
        match severity {
            Severity::High => "Major",
            Severity::Moderate => "Moderate",
            Severity::Low => "Minor",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interaction_message_names_both_items() {
        let msg = MessageTemplates::interaction(
            "Metformin",
            "metformin",
            "Atorvastatin",
            "atorvastatin",
            "May increase risk of myopathy.",
        );
        assert!(msg.starts_with("Metformin (metformin) interacts with Atorvastatin (atorvastatin)."));
        assert!(msg.ends_with("myopathy."));
    }

    #[test]
    fn interaction_message_without_description() {
        let msg = MessageTemplates::interaction("A", "a", "B", "b", "  ");
        assert_eq!(msg, "A (a) interacts with B (b).");
    }

    #[test]
    fn interaction_titles_by_severity() {
        assert_eq!(
            MessageTemplates::interaction_title(Severity::High),
            "Major drug interaction"
        );
        assert_eq!(
            MessageTemplates::interaction_title(Severity::Low),
            "Minor drug interaction"
        );
    }

    #[test]
    fn allergy_message_lists_ingredients_and_reaction() {
        let msg = MessageTemplates::allergy(
            "Penicillin",
            "Augmentin",
            &["amoxicillin".to_string()],
            "Anaphylaxis",
        );
        assert_eq!(
            msg,
            "Patient is allergic to Penicillin. Augmentin contains amoxicillin. \
             Recorded reaction: Anaphylaxis."
        );
    }

    #[test]
    fn allergy_message_without_reaction() {
        let msg = MessageTemplates::allergy("Sulfa", "Septran", &["sulfamethoxazole".into()], "");
        assert!(!msg.contains("Recorded reaction"));
    }

    #[test]
    fn unchecked_item_message() {
        assert!(MessageTemplates::unchecked_item("Mystery Syrup").starts_with("Mystery Syrup has no"));
    }
}
