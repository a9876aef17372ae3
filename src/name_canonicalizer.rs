//! # Ingredient Name Canonicalizer
//!
//! Folds ingredient name variants onto one grouping key so that quantities
//! from different recipes end up on the same purchase line:
//!
//! - "Extra Virgin Olive Oil", "olive oil, extra-virgin" -> "olive oil"
//! - "Onions, chopped", "1 large onion" names -> "onion"
//! - "scallions" -> "green onion"
//!
//! The key is coarser than the lowercase name. [`canonical_key`] is pure and
//! idempotent: applying it to its own output returns the same key.

use log::trace;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Words dropped from the key: preparation, size and grade qualifiers plus
/// filler words. Kept in singular form since words are singularized first.
const QUALIFIERS: [&str; 45] = [
    // grade
    "extra", "virgin", "organic", "premium", "pure", "good", "quality", "best",
    // freshness
    "fresh", "freshly",
    // preparation
    "chopped", "minced", "diced", "sliced", "grated", "shredded", "peeled", "crushed",
    "cubed", "halved", "quartered", "trimmed", "rinsed", "drained", "softened", "melted",
    "beaten", "sifted", "packed", "divided",
    // manner
    "finely", "roughly", "coarsely", "thinly", "lightly",
    // size
    "large", "small", "medium",
    // filler
    "a", "an", "the", "of", "to", "taste", "optional",
];

/// Regional and synonym spellings mapped onto one key
static NAME_ALIASES: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    let mut map = HashMap::new();
    map.insert("scallion", "green onion");
    map.insert("spring onion", "green onion");
    map.insert("garbanzo bean", "chickpea");
    map.insert("garbanzo", "chickpea");
    map.insert("courgette", "zucchini");
    map.insert("aubergine", "eggplant");
    map.insert("capsicum", "bell pepper");
    map.insert("caster sugar", "superfine sugar");
    map.insert("icing sugar", "powdered sugar");
    map.insert("confectioner sugar", "powdered sugar");
    map.insert("confectioners sugar", "powdered sugar");
    map.insert("plain flour", "all purpose flour");
    map.insert("ap flour", "all purpose flour");
    map
});

/// Plain lowercase grouping input: the trimmed name, or the raw statement when
/// the name is empty.
pub fn legacy_key(name: &str, raw: &str) -> String {
    let name = name.trim();
    if name.is_empty() {
        raw.trim().to_lowercase()
    } else {
        name.to_lowercase()
    }
}

/// Canonical grouping key of an ingredient name
pub fn canonical_key(name: &str) -> String {
    let cleaned: String = name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    let words: Vec<String> = cleaned.split_whitespace().map(singularize).collect();

    let kept: Vec<&str> = words
        .iter()
        .map(String::as_str)
        .filter(|w| !QUALIFIERS.contains(w))
        .collect();

    let key = if kept.is_empty() {
        words.join(" ")
    } else {
        kept.join(" ")
    };

    let key = match NAME_ALIASES.get(key.as_str()) {
        Some(alias) => (*alias).to_string(),
        None => key,
    };

    trace!("Canonical key: '{}' -> '{}'", name, key);
    key
}

/// Reduce an English plural to a singular form, repeated until stable
fn singularize(word: &str) -> String {
    let mut current = word.to_string();
    loop {
        let next = singularize_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn singularize_once(word: &str) -> String {
    if !word.is_ascii() || word.len() <= 3 {
        return word.to_string();
    }
    if let Some(stem) = word.strip_suffix("ies") {
        if word.len() > 4 {
            return format!("{stem}y");
        }
    }
    if let Some(stem) = word.strip_suffix("oes") {
        return format!("{stem}o");
    }
    for suffix in ["ches", "shes", "sses", "xes", "zes"] {
        if word.ends_with(suffix) {
            return word[..word.len() - 2].to_string();
        }
    }
    if word.ends_with("ss") || word.ends_with("us") || word.ends_with("is") {
        return word.to_string();
    }
    match word.strip_suffix('s') {
        Some(stem) => stem.to_string(),
        None => word.to_string(),
    }
}
