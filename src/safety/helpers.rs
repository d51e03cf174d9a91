use std::collections::HashMap;

/// Trailing salt/hydrate words dropped from generic names, so
/// "Metformin HCl" and "Atorvastatin Calcium" meet their base ingredient.
const SALT_SUFFIXES: &[&str] = &[
    "hcl",
    "hydrochloride",
    "calcium",
    "sodium",
    "potassium",
    "magnesium",
    "besylate",
    "maleate",
    "mesylate",
    "succinate",
    "tartrate",
    "sulfate",
    "sulphate",
    "citrate",
    "fumarate",
    "monohydrate",
    "trihydrate",
];

/// Case- and whitespace-normalize a drug or allergen name.
/// A trailing salt word is dropped when something remains before it.
pub fn normalize_name(name: &str) -> String {
    let lower = name.to_lowercase();
    let mut words: Vec<&str> = lower.split_whitespace().collect();
    if words.len() > 1 {
        if let Some(last) = words.last() {
            let last = last.trim_matches(|c: char| c == '.' || c == ',');
            if SALT_SUFFIXES.contains(&last) {
                words.pop();
            }
        }
    }
    words.join(" ")
}

/// Resolve a name through the alias table (keys and values already normalized).
pub fn resolve_alias(normalized: String, aliases: &HashMap<String, String>) -> String {
    match aliases.get(&normalized) {
        Some(generic) => generic.clone(),
        None => normalized,
    }
}

/// Canonical unordered pair key: the two names sorted.
pub fn pair_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}
