//! Vocabulary normalization
//!
//! Spreadsheet terms are free text. Output names use a camel-case canonical
//! form, map lookups use a case and whitespace folded key.

/// Camel-case canonical form of a vocabulary term.
///
/// Hyphens and underscores separate words, apostrophes are dropped. The first
/// word is kept as written; every following word gets an upper-case first
/// letter with the rest unchanged.
///
/// `"metal-3D printing"` becomes `"metal3DPrinting"`. Inner capitals survive,
/// so `"Ti-6Al-4V"` becomes `"Ti6Al4V"` and not `"Ti6al4v"`.
pub fn to_canonical_form(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .filter(|c| *c != '\'')
        .map(|c| if c == '-' || c == '_' { ' ' } else { c })
        .collect();

    let mut words = cleaned.split_whitespace();
    let Some(first) = words.next() else {
        return String::new();
    };

    let mut canonical = first.to_string();
    for word in words {
        canonical.push_str(&capitalize_first(word));
    }
    canonical
}

/// Key used for vocabulary map lookups: trimmed, lower-cased, single spaces
pub fn to_lookup_key(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Title-case spelling: a letter after a non-letter is upper-cased, any
/// other letter is lower-cased (`"laser-based pbf"` -> `"Laser-Based Pbf"`)
pub fn to_title_case(text: &str) -> String {
    let mut titled = String::with_capacity(text.len());
    let mut after_letter = false;

    for c in text.chars() {
        if c.is_alphabetic() {
            if after_letter {
                titled.extend(c.to_lowercase());
            } else {
                titled.extend(c.to_uppercase());
            }
            after_letter = true;
        } else {
            titled.push(c);
            after_letter = false;
        }
    }

    titled
}

fn capitalize_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
