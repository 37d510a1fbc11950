//! Ticker symbol derivation from company names.
//!
//! Symbols are built from word initials, skipping corporate filler words.
//! Collisions are resolved by widening one word's prefix, then by taking
//! prefixes of the concatenated words. The last resort returns the truncated
//! concatenation even if it is already taken, so callers that need uniqueness
//! must check the result.

use std::collections::HashSet;

/// Filler words that carry no identity, excluded from initials.
pub const COMMON_WORDS: [&str; 28] = [
    "INC",
    "LTD",
    "CORPORATION",
    "CORP",
    "COMPANY",
    "CO",
    "GROUP",
    "SYSTEMS",
    "TECHNOLOGIES",
    "INDUSTRIES",
    "INTERNATIONAL",
    "HOLDINGS",
    "SERVICES",
    "SOLUTIONS",
    "GLOBAL",
    "LIMITED",
    "BUSINESS",
    "INCORPORATED",
    "ASSOCIATION",
    "FOUNDATION",
    "INSTITUTE",
    "LLC",
    "PLC",
    "AND",
    "&",
    "THE",
    "OF",
    "FOR",
];

/// Uppercase the name, strip punctuation and split into words, dropping the
/// filler words. Falls back to all words when nothing else remains.
fn clean_words(name: &str) -> Vec<String> {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect::<String>()
        .to_uppercase();

    let all: Vec<String> = cleaned.split_whitespace().map(str::to_string).collect();
    let kept: Vec<String> = all
        .iter()
        .filter(|word| !COMMON_WORDS.contains(&word.as_str()))
        .cloned()
        .collect();

    if kept.is_empty() { all } else { kept }
}

/// First `len` characters of `s`.
fn prefix(s: &str, len: usize) -> String {
    s.chars().take(len).collect()
}

/// Derive a symbol for `name` that avoids the `taken` set where possible.
///
/// Returns `None` when the name contains no usable characters. May return a
/// symbol already in `taken` once every candidate is exhausted.
pub fn derive_symbol(name: &str, taken: &HashSet<String>, max_len: usize) -> Option<String> {
    let words = clean_words(name);
    if words.is_empty() {
        return None;
    }

    let initials: String = words
        .iter()
        .filter_map(|word| word.chars().next())
        .collect();
    let symbol = prefix(&initials, max_len);
    if !taken.contains(&symbol) {
        return Some(symbol);
    }

    // Widen one word's prefix at a time, keeping the others at initials.
    for width in 1..max_len {
        for i in 0..words.len() {
            if words[i].chars().count() <= width {
                continue;
            }
            let candidate: String = words
                .iter()
                .enumerate()
                .map(|(j, word)| {
                    if j == i {
                        prefix(word, width + 1)
                    } else {
                        prefix(word, 1)
                    }
                })
                .collect();
            let candidate = prefix(&candidate, max_len);
            if !taken.contains(&candidate) {
                return Some(candidate);
            }
        }
    }

    // Prefixes of the concatenated words, growing from the initials' length.
    let concatenated: String = words.concat();
    let concat_len = concatenated.chars().count();
    for end in symbol.chars().count()..=concat_len {
        let candidate = prefix(&concatenated, end.min(max_len));
        if !taken.contains(&candidate) {
            return Some(candidate);
        }
    }

    Some(prefix(&concatenated, max_len))
}

/// Assign a symbol to every usable name, de-duplicating names while keeping
/// first-seen order. Names that clean to nothing are skipped.
pub fn assign_symbols(names: &[String], max_len: usize) -> Vec<(String, String)> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut taken: HashSet<String> = HashSet::new();
    let mut assigned = Vec::new();

    for name in names {
        if !seen.insert(name.as_str()) {
            continue;
        }
        if let Some(symbol) = derive_symbol(name, &taken, max_len) {
            taken.insert(symbol.clone());
            assigned.push((name.clone(), symbol));
        }
    }

    assigned
}
