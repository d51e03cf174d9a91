use std::collections::{BTreeSet, HashSet};

use uuid::Uuid;

use crate::models::enums::{FindingKind, Severity};
use crate::models::{Allergy, PrescriptionItem};

use super::helpers::pair_key;
use super::reference::{InteractionRule, KnowledgeBase};
use super::types::*;

/// Canonical ingredient set of a checkable item.
struct CheckedItem<'a> {
    item: &'a PrescriptionItem,
    /// Sorted, deduplicated. The fixed order makes rule tie-breaks reproducible.
    ingredients: Vec<String>,
}

impl CheckedItem<'_> {
    fn item_ref(&self) -> ItemRef {
        ItemRef {
            item_id: self.item.id,
            brand_name: self.item.drug.brand_name.clone(),
        }
    }
}

/// Items usable for matching, in input order. Items without ingredient data
/// are left out (`scan_data_quality` reports them).
fn checkable_items<'a>(
    items: &'a [PrescriptionItem],
    kb: &KnowledgeBase,
) -> Vec<CheckedItem<'a>> {
    items
        .iter()
        .filter_map(|item| {
            let ingredients: BTreeSet<String> = item
                .drug
                .named_ingredients()
                .map(|name| kb.canonicalize(name))
                .filter(|name| !name.is_empty())
                .collect();
            (!ingredients.is_empty()).then(|| CheckedItem {
                item,
                ingredients: ingredients.into_iter().collect(),
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Interactions
// ---------------------------------------------------------------------------

/// Detect drug-drug interactions between every unordered pair of items.
///
/// At most one finding per item pair: across all ingredient cross-products the
/// highest-severity rule wins; ties go to the lowest canonical ingredient
/// pair, whatever the item order.
pub fn detect_interactions(items: &[PrescriptionItem], kb: &KnowledgeBase) -> Vec<Finding> {
    let checked = checkable_items(items, kb);
    let mut findings = Vec::new();
    let mut seen: HashSet<FindingId> = HashSet::new();

    for (i, a) in checked.iter().enumerate() {
        for b in checked.iter().skip(i + 1) {
            if a.item.id == b.item.id {
                continue;
            }
            let id = FindingId::interaction(a.item.id, b.item.id);
            if seen.contains(&id) {
                continue;
            }

            let Some((rule, ingredient_a, ingredient_b)) = best_interaction(a, b, kb) else {
                continue;
            };

            seen.insert(id.clone());
            findings.push(Finding {
                id,
                kind: FindingKind::Interaction,
                severity: rule.severity,
                detail: FindingDetail::Interaction(InteractionDetail {
                    item_a: a.item_ref(),
                    item_b: b.item_ref(),
                    ingredient_a: ingredient_a.to_string(),
                    ingredient_b: ingredient_b.to_string(),
                    rule: rule.clone(),
                }),
            });
        }
    }

    findings
}

/// Best rule across the ingredient cross-product of `a` and `b`, with the
/// ingredient from each side. Ordered by severity, then by canonical pair key,
/// so the winner does not depend on which item came first in the draft.
fn best_interaction<'k, 'i>(
    a: &'i CheckedItem<'_>,
    b: &'i CheckedItem<'_>,
    kb: &'k KnowledgeBase,
) -> Option<(&'k InteractionRule, &'i str, &'i str)> {
    let mut best: Option<(&InteractionRule, (String, String), &str, &str)> = None;
    for ia in &a.ingredients {
        for ib in &b.ingredients {
            if ia == ib {
                continue;
            }
            let Some(rule) = kb.interaction(ia, ib) else {
                continue;
            };
            let key = pair_key(ia, ib);
            let better = match &best {
                Some((current, current_key, _, _)) => {
                    rule.severity > current.severity
                        || (rule.severity == current.severity && key < *current_key)
                }
                None => true,
            };
            if better {
                best = Some((rule, key, ia.as_str(), ib.as_str()));
            }
        }
    }
    best.map(|(rule, _, ia, ib)| (rule, ia, ib))
}

// ---------------------------------------------------------------------------
// Allergies
// ---------------------------------------------------------------------------

/// Detect drug-allergy conflicts: one finding per (item, allergen).
///
/// An allergen with a rule matches when any of the item's ingredients is in
/// the rule's related set (or is the allergen itself), so combination
/// products are caught by any constituent. An allergen without a rule still
/// matches an ingredient of the same name, at the patient's recorded severity.
pub fn detect_allergy_conflicts(
    items: &[PrescriptionItem],
    allergies: &[Allergy],
    kb: &KnowledgeBase,
) -> Vec<Finding> {
    let mut findings = Vec::new();

    if allergies.is_empty() {
        return findings;
    }

    let allergens: Vec<(String, &Allergy)> = allergies
        .iter()
        .map(|a| (kb.canonicalize(&a.allergen), a))
        .filter(|(key, _)| !key.is_empty())
        .collect();

    let mut seen: HashSet<FindingId> = HashSet::new();

    for checked in checkable_items(items, kb) {
        for (key, allergy) in &allergens {
            let id = FindingId::allergy(checked.item.id, key);
            if seen.contains(&id) {
                continue;
            }

            let rule = kb.allergy_rule(key);
            let matching: Vec<String> = checked
                .ingredients
                .iter()
                .filter(|ing| {
                    *ing == key
                        || rule.is_some_and(|r| r.related_ingredients.contains(ing.as_str()))
                })
                .cloned()
                .collect();

            if matching.is_empty() {
                continue;
            }

            let (severity, reaction) = match rule {
                Some(r) => (r.severity, r.reaction.clone()),
                None => (allergy.severity, allergy.reaction.clone()),
            };

            seen.insert(id.clone());
            findings.push(Finding {
                id,
                kind: FindingKind::Allergy,
                severity,
                detail: FindingDetail::Allergy(AllergyDetail {
                    item: checked.item_ref(),
                    allergen: allergy.allergen.trim().to_string(),
                    matching_ingredients: matching,
                    reaction,
                    rule: rule.cloned(),
                }),
            });
        }
    }

    findings
}

// ---------------------------------------------------------------------------
// Data quality + full pass
// ---------------------------------------------------------------------------

/// Items that cannot be checked: no usable ingredient data, or an id already
/// used by an earlier item.
pub fn scan_data_quality(items: &[PrescriptionItem]) -> Vec<DataQualityWarning> {
    let mut warnings = Vec::new();
    let mut ids: HashSet<Uuid> = HashSet::new();

    for item in items {
        if !ids.insert(item.id) {
            warnings.push(DataQualityWarning {
                item_id: item.id,
                brand_name: item.drug.brand_name.clone(),
                issue: DataQualityIssue::DuplicateItemId,
            });
        }
        if !item.drug.has_ingredient_data() {
            warnings.push(DataQualityWarning {
                item_id: item.id,
                brand_name: item.drug.brand_name.clone(),
                issue: DataQualityIssue::MissingIngredients,
            });
        }
    }

    warnings
}

/// Run both detectors and order the result: severity descending, then
/// detection order (interactions before allergies, then input order).
pub fn run_detection(
    items: &[PrescriptionItem],
    allergies: &[Allergy],
    kb: &KnowledgeBase,
) -> DetectionReport {
    let mut findings = detect_interactions(items, kb);
    findings.extend(detect_allergy_conflicts(items, allergies, kb));
    // Stable sort keeps detection order within a severity.
    findings.sort_by(|a, b| b.severity.cmp(&a.severity));

    DetectionReport {
        findings,
        warnings: scan_data_quality(items),
    }
}

/// Highest severity among `findings`, if any.
pub fn max_severity<'a>(findings: impl IntoIterator<Item = &'a Finding>) -> Option<Severity> {
    findings.into_iter().map(|f| f.severity).max()
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::models::Drug;

    fn kb() -> KnowledgeBase {
        KnowledgeBase::bundled().unwrap()
    }

    fn make_item(n: u128, brand: &str, ingredients: &[&str]) -> PrescriptionItem {
        PrescriptionItem {
            id: Uuid::from_u128(n),
            drug: Drug {
                id: format!("drug_{n}"),
                brand_name: brand.into(),
                ingredients: ingredients.iter().map(|s| s.to_string()).collect(),
                strength: "500mg".into(),
                form: "Tablet".into(),
                category: String::new(),
            },
            dosage: "1 tablet".into(),
            frequency: "once_daily".into(),
            duration: "7_days".into(),
            route: "Oral".into(),
            instructions: String::new(),
            created_at: Utc.with_ymd_and_hms(2024, 9, 10, 9, 0, 0).unwrap(),
        }
    }

    fn make_allergy(allergen: &str, severity: Severity) -> Allergy {
        Allergy {
            allergen: allergen.into(),
            severity,
            reaction: "Anaphylaxis".into(),
        }
    }

    fn ids(findings: &[Finding]) -> BTreeSet<FindingId> {
        findings.iter().map(|f| f.id.clone()).collect()
    }

    /// Metformin + Atorvastatin → one moderate; adding Aspirin → one more, low.
    #[test]
    fn metformin_atorvastatin_aspirin_scenario() {
        let kb = kb();
        let metformin = make_item(1, "Metformin", &["Metformin"]);
        let atorvastatin = make_item(2, "Atorvastatin", &["Atorvastatin"]);

        let report = run_detection(&[metformin.clone(), atorvastatin.clone()], &[], &kb);
        assert_eq!(report.findings.len(), 1);
        let f = &report.findings[0];
        assert_eq!(f.kind, FindingKind::Interaction);
        assert_eq!(f.severity, Severity::Moderate);
        match &f.detail {
            FindingDetail::Interaction(d) => {
                assert_eq!(d.item_a.item_id, metformin.id);
                assert_eq!(d.item_b.item_id, atorvastatin.id);
            }
            other => panic!("Expected interaction detail, got: {:?}", other),
        }

        let aspirin = make_item(3, "Aspirin", &["Aspirin"]);
        let report = run_detection(&[metformin.clone(), atorvastatin, aspirin.clone()], &[], &kb);
        assert_eq!(report.findings.len(), 2);
        assert_eq!(report.findings[0].severity, Severity::Moderate);
        assert_eq!(report.findings[1].severity, Severity::Low);
        assert_eq!(
            report.findings[1].id,
            FindingId::interaction(aspirin.id, metformin.id)
        );
        assert!(report.findings.iter().all(|f| f.kind == FindingKind::Interaction));
    }

    /// Catalog-style names (salts, chemical names) resolve to the same rules.
    #[test]
    fn salt_and_alias_names_match() {
        let kb = kb();
        let items = [
            make_item(1, "Metformin", &["Metformin HCl"]),
            make_item(2, "Atorvastatin", &["Atorvastatin Calcium"]),
            make_item(3, "Aspirin", &["Acetylsalicylic Acid"]),
        ];
        let findings = detect_interactions(&items, &kb);
        assert_eq!(findings.len(), 2);
    }

    #[test]
    fn permutations_yield_same_finding_set() {
        let kb = kb();
        let a = make_item(1, "Metformin", &["Metformin"]);
        let b = make_item(2, "Atorvastatin", &["Atorvastatin"]);
        let c = make_item(3, "Aspirin", &["Aspirin"]);
        let d = make_item(4, "Augmentin", &["Amoxicillin", "Clavulanic Acid"]);

        let baseline = ids(&detect_interactions(
            &[a.clone(), b.clone(), c.clone(), d.clone()],
            &kb,
        ));
        assert_eq!(baseline.len(), 3);

        for order in [
            [&d, &c, &b, &a],
            [&b, &d, &a, &c],
            [&c, &a, &d, &b],
        ] {
            let items: Vec<PrescriptionItem> = order.iter().map(|i| (*i).clone()).collect();
            assert_eq!(ids(&detect_interactions(&items, &kb)), baseline);
        }
    }

    #[test]
    fn final_order_is_fixed_regardless_of_input_order() {
        let kb = kb();
        let a = make_item(1, "Metformin", &["Metformin"]);
        let b = make_item(2, "Atorvastatin", &["Atorvastatin"]);
        let c = make_item(3, "Aspirin", &["Aspirin"]);
        let d = make_item(4, "Augmentin", &["Amoxicillin", "Clavulanic Acid"]);

        let report = run_detection(&[c, a, d, b], &[], &kb);
        let severities: Vec<Severity> = report.findings.iter().map(|f| f.severity).collect();
        assert_eq!(
            severities,
            vec![Severity::High, Severity::Moderate, Severity::Low]
        );
    }

    /// Two ingredient-level matches between one pair collapse into a single
    /// finding carrying the highest severity.
    #[test]
    fn one_finding_per_item_pair_highest_severity_wins() {
        let kb = kb();
        let combo = make_item(1, "Combo", &["Metformin", "Amoxicillin"]);
        let statin = make_item(2, "Atorvastatin", &["Atorvastatin"]);

        let findings = detect_interactions(&[combo, statin], &kb);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::High);
        match &findings[0].detail {
            FindingDetail::Interaction(d) => {
                assert_eq!(d.ingredient_a, "amoxicillin");
                assert_eq!(d.ingredient_b, "atorvastatin");
            }
            other => panic!("Expected interaction detail, got: {:?}", other),
        }
    }

    #[test]
    fn equal_severity_tie_goes_to_first_canonical_ingredient() {
        let kb = KnowledgeBase::load(
            vec![
                crate::safety::reference::RawInteractionRecord {
                    drug_a: "Zeta".into(),
                    drug_b: "Target".into(),
                    severity: "moderate".into(),
                    mechanism: "z".into(),
                    ..Default::default()
                },
                crate::safety::reference::RawInteractionRecord {
                    drug_a: "Alpha".into(),
                    drug_b: "Target".into(),
                    severity: "moderate".into(),
                    mechanism: "a".into(),
                    ..Default::default()
                },
            ],
            vec![],
        )
        .unwrap();

        let combo = make_item(1, "Combo", &["Zeta", "Alpha"]);
        let target = make_item(2, "Target", &["Target"]);
        let findings = detect_interactions(&[combo, target], &kb);
        assert_eq!(findings.len(), 1);
        match &findings[0].detail {
            FindingDetail::Interaction(d) => assert_eq!(d.rule.mechanism, "a"),
            other => panic!("Expected interaction detail, got: {:?}", other),
        }
    }

    #[test]
    fn equal_severity_tie_is_independent_of_item_order() {
        let record = |a: &str, b: &str, mechanism: &str| {
            crate::safety::reference::RawInteractionRecord {
                drug_a: a.into(),
                drug_b: b.into(),
                severity: "moderate".into(),
                mechanism: mechanism.into(),
                ..Default::default()
            }
        };
        let kb = KnowledgeBase::load(
            vec![record("Alpha", "Target", "AT"), record("Zeta", "Beta", "ZB")],
            vec![],
        )
        .unwrap();

        let x = make_item(1, "Xcombo", &["Zeta", "Alpha"]);
        let y = make_item(2, "Ycombo", &["Target", "Beta"]);

        let mechanism = |findings: &[Finding]| match &findings[0].detail {
            FindingDetail::Interaction(d) => d.rule.mechanism.clone(),
            other => panic!("Expected interaction detail, got: {:?}", other),
        };

        let xy = detect_interactions(&[x.clone(), y.clone()], &kb);
        let yx = detect_interactions(&[y, x], &kb);
        assert_eq!(xy.len(), 1);
        assert_eq!(yx.len(), 1);
        assert_eq!(xy[0].id, yx[0].id);
        assert_eq!(mechanism(&xy), "AT");
        assert_eq!(mechanism(&yx), "AT");
    }

    #[test]
    fn no_duplicate_pairs_even_with_repeated_item_ids() {
        let kb = kb();
        let a = make_item(1, "Metformin", &["Metformin"]);
        let b = make_item(2, "Atorvastatin", &["Atorvastatin"]);
        let findings = detect_interactions(&[a.clone(), b.clone(), a.clone(), b], &kb);
        assert_eq!(findings.len(), 1);
        assert_eq!(ids(&findings).len(), findings.len());
    }

    /// Augmentin (amoxicillin + clavulanate) against a penicillin allergy.
    #[test]
    fn combination_drug_matches_penicillin_allergy() {
        let kb = kb();
        let augmentin = make_item(7, "Augmentin", &["Amoxicillin", "Clavulanic Acid"]);
        let allergies = [make_allergy("Penicillin", Severity::High)];

        let findings = detect_allergy_conflicts(&[augmentin.clone()], &allergies, &kb);
        assert_eq!(findings.len(), 1);
        let f = &findings[0];
        assert_eq!(f.kind, FindingKind::Allergy);
        assert_eq!(f.severity, Severity::High);
        assert_eq!(f.id, FindingId::allergy(augmentin.id, "penicillin"));
        match &f.detail {
            FindingDetail::Allergy(d) => {
                assert_eq!(d.item.item_id, augmentin.id);
                assert_eq!(d.allergen, "Penicillin");
                assert_eq!(d.matching_ingredients, vec!["amoxicillin".to_string()]);
                assert!(d.rule.is_some());
            }
            other => panic!("Expected allergy detail, got: {:?}", other),
        }
    }

    #[test]
    fn allergy_rule_severity_beats_patient_severity() {
        let kb = kb();
        let aspirin = make_item(1, "Aspirin", &["Acetylsalicylic Acid"]);
        let findings = detect_allergy_conflicts(
            &[aspirin],
            &[make_allergy("aspirin", Severity::High)],
            &kb,
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Moderate);
    }

    #[test]
    fn allergen_without_rule_matches_same_ingredient() {
        let kb = kb();
        let item = make_item(1, "Crocin", &["Paracetamol"]);
        let findings = detect_allergy_conflicts(
            &[item],
            &[
                make_allergy("Acetaminophen", Severity::Low),
                make_allergy("Latex", Severity::High),
            ],
            &kb,
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Low);
        match &findings[0].detail {
            FindingDetail::Allergy(d) => assert!(d.rule.is_none()),
            other => panic!("Expected allergy detail, got: {:?}", other),
        }
    }

    #[test]
    fn repeated_allergy_entries_yield_one_finding() {
        let kb = kb();
        let item = make_item(1, "Amoxil", &["Amoxicillin"]);
        let findings = detect_allergy_conflicts(
            &[item],
            &[
                make_allergy("Penicillin", Severity::High),
                make_allergy("  PENICILLIN ", Severity::Moderate),
            ],
            &kb,
        );
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn unrelated_allergy_yields_nothing() {
        let kb = kb();
        let item = make_item(1, "Metformin", &["Metformin"]);
        assert!(detect_allergy_conflicts(
            &[item],
            &[make_allergy("Penicillin", Severity::High)],
            &kb
        )
        .is_empty());
    }

    #[test]
    fn items_without_ingredients_are_skipped_and_reported() {
        let kb = kb();
        let metformin = make_item(1, "Metformin", &["Metformin"]);
        let unknown = make_item(2, "Mystery", &[]);
        let blank = make_item(3, "Blank", &["  "]);
        let atorvastatin = make_item(4, "Atorvastatin", &["Atorvastatin"]);

        let report = run_detection(
            &[metformin, unknown.clone(), blank.clone(), atorvastatin],
            &[make_allergy("Penicillin", Severity::High)],
            &kb,
        );
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.warnings.len(), 2);
        assert_eq!(report.warnings[0].item_id, unknown.id);
        assert_eq!(report.warnings[1].item_id, blank.id);
        assert!(report
            .warnings
            .iter()
            .all(|w| w.issue == DataQualityIssue::MissingIngredients));
    }

    #[test]
    fn duplicate_item_ids_are_reported() {
        let item = make_item(1, "Metformin", &["Metformin"]);
        let warnings = scan_data_quality(&[item.clone(), item]);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].issue, DataQualityIssue::DuplicateItemId);
    }

    #[test]
    fn interactions_precede_allergies_at_equal_severity() {
        let kb = kb();
        let augmentin = make_item(1, "Augmentin", &["Amoxicillin", "Clavulanic Acid"]);
        let statin = make_item(2, "Atorvastatin", &["Atorvastatin"]);
        let report = run_detection(
            &[augmentin, statin],
            &[make_allergy("Penicillin", Severity::High)],
            &kb,
        );
        let kinds: Vec<FindingKind> = report.findings.iter().map(|f| f.kind).collect();
        assert_eq!(kinds, vec![FindingKind::Interaction, FindingKind::Allergy]);
        assert_eq!(max_severity(&report.findings), Some(Severity::High));
    }

    #[test]
    fn empty_inputs() {
        let kb = kb();
        let report = run_detection(&[], &[], &kb);
        assert!(report.findings.is_empty());
        assert!(report.warnings.is_empty());
        assert_eq!(max_severity(&report.findings), None);
    }
}
