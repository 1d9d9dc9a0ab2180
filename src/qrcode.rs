//! QR/barcode handling for the registration flow: cleanup of scans coming
//! from wireless scanners with a mismatched keyboard layout, product lookup
//! and code generation.

use crate::types::Product;

/// AZERTY symbol-row glyphs as emitted by the affected scanners, mapped to
/// the QWERTY digits they stand for (Belgian/French layout). Letters pass
/// through unchanged.
const AZERTY_TO_QWERTY: &[(char, char)] = &[
    ('&', '1'),
    ('é', '2'),
    ('"', '3'),
    ('\'', '4'),
    ('(', '5'),
    ('§', '6'),
    ('è', '7'),
    ('!', '8'),
    ('ç', '9'),
    ('à', '0'),
    ('°', '_'),
];

/// Literal substring fixes for recurring scanner glitches. Grown empirically
/// per observed hardware; entries must be kept verbatim when extending.
const KNOWN_PATTERNS: &[(&str, &str)] = &[("°(!&(\"\"", "_581533"), ("°(!&(", "_5815")];

/// Words that carry no meaning in a product name and are skipped when
/// building a code prefix.
const PREFIX_STOPWORDS: &[&str] = &["spray", "ml", "gr", "kit"];

/// Correction tables for a scanner model. The default profile reproduces the
/// substitutions observed on the wireless AZERTY scanners currently in use;
/// deployments with different hardware can supply their own tables.
#[derive(Clone, Debug)]
pub struct ScannerProfile {
    substitutions: Vec<(char, char)>,
    patterns: Vec<(String, String)>,
}

impl Default for ScannerProfile {
    fn default() -> Self {
        ScannerProfile {
            substitutions: AZERTY_TO_QWERTY.to_vec(),
            patterns: KNOWN_PATTERNS
                .iter()
                .map(|(wrong, correct)| (wrong.to_string(), correct.to_string()))
                .collect(),
        }
    }
}

impl ScannerProfile {
    pub fn new(substitutions: Vec<(char, char)>, patterns: Vec<(String, String)>) -> Self {
        ScannerProfile {
            substitutions,
            patterns,
        }
    }

    /// Applies the per-character substitution pass, then the literal pattern
    /// fixes (first occurrence each). No lookahead; this is not a full
    /// layout remap.
    pub fn clean(&self, raw: &str) -> String {
        let mut cleaned: String = raw
            .chars()
            .map(|ch| {
                self.substitutions
                    .iter()
                    .find(|(from, _)| *from == ch)
                    .map(|(_, to)| *to)
                    .unwrap_or(ch)
            })
            .collect();

        for (wrong, correct) in &self.patterns {
            if cleaned.contains(wrong.as_str()) {
                log::debug!("pattern fix toegepast: {} -> {}", wrong, correct);
                cleaned = cleaned.replacen(wrong.as_str(), correct, 1);
            }
        }

        cleaned
    }
}

fn strip_symbols(code: &str) -> String {
    code.chars()
        .filter(|ch| ch.is_ascii_uppercase() || ch.is_ascii_digit())
        .collect()
}

fn prefix6(code: &str) -> String {
    code.chars().take(6).collect()
}

/// Resolves a scanned token to a product. Lookup order: exact match on the
/// cleaned code, exact match on the raw code (scanners that did not glitch),
/// then a fuzzy fallback comparing symbol-stripped codes or the first six
/// characters of either side. First match in list order wins.
pub fn resolve<'a>(raw: &str, cleaned: &str, products: &'a [Product]) -> Option<&'a Product> {
    if let Some(product) = products
        .iter()
        .find(|p| p.qrcode.as_deref() == Some(cleaned))
    {
        return Some(product);
    }
    if let Some(product) = products.iter().find(|p| p.qrcode.as_deref() == Some(raw)) {
        return Some(product);
    }

    let cleaned_stripped = strip_symbols(cleaned);
    let cleaned_prefix = prefix6(cleaned);
    products.iter().find(|p| {
        let Some(code) = p.qrcode.as_deref() else {
            return false;
        };
        strip_symbols(code) == cleaned_stripped
            || cleaned.contains(&prefix6(code))
            || code.contains(&cleaned_prefix)
    })
}

/// Synthesizes a short code for a product lacking one: uppercased first
/// letters of the significant name words (capped at 4), then the first free
/// zero-padded 3-digit counter. When all 999 slots collide the last
/// attempted code is returned as-is; uniqueness is not guaranteed beyond
/// that for large catalogs.
pub fn generate(name: &str, existing: &[&str]) -> String {
    let mut prefix = String::new();
    for word in name.split_whitespace() {
        if word.chars().count() > 2 && !PREFIX_STOPWORDS.contains(&word.to_lowercase().as_str()) {
            if let Some(first) = word.chars().next() {
                prefix.extend(first.to_uppercase());
            }
        }
    }

    if prefix.chars().count() < 2 {
        let squeezed: String = name.split_whitespace().collect();
        prefix = squeezed.chars().take(3).collect::<String>().to_uppercase();
    }

    if prefix.chars().count() > 4 {
        prefix = prefix.chars().take(4).collect();
    }

    let mut number = 1;
    loop {
        let code = format!("{}{:03}", prefix, number);
        number += 1;
        if !existing.contains(&code.as_str()) || number >= 1000 {
            return code;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: i64, name: &str, code: Option<&str>, category: Option<i64>) -> Product {
        Product {
            id,
            name: name.to_string(),
            qrcode: code.map(str::to_string),
            category_id: category,
            attachment_url: None,
            attachment_name: None,
            created_at: String::new(),
        }
    }

    #[test]
    fn clean_maps_azerty_symbol_row() {
        let profile = ScannerProfile::default();
        assert_eq!(profile.clean("IFLSàà&"), "IFLS001");
        assert_eq!(profile.clean("é§è"), "267");
    }

    #[test]
    fn clean_passes_letters_through() {
        let profile = ScannerProfile::default();
        assert_eq!(profile.clean("IFMK006"), "IFMK006");
    }

    #[test]
    fn clean_known_glitch_contains_fixed_pattern() {
        let profile = ScannerProfile::default();
        assert!(profile.clean("Â°(!&(").contains("_5815"));
    }

    #[test]
    fn custom_profile_overrides_tables() {
        let profile = ScannerProfile::new(vec![('#', '7')], vec![]);
        assert_eq!(profile.clean("A#B&"), "A7B&");
    }

    #[test]
    fn resolve_prefers_exact_cleaned_match() {
        let products = vec![
            product(1, "Metal Clean", Some("IFLS001"), Some(1)),
            product(2, "Fin Super", Some("IFMK006"), None),
        ];
        let found = resolve("IFLSàà&", "IFLS001", &products).unwrap();
        assert_eq!(found.id, 1);
    }

    #[test]
    fn resolve_falls_back_to_raw_code() {
        let products = vec![product(1, "Metal Clean", Some("IFLS-1"), None)];
        // Cleaning rewrote the code but the scanner had not glitched.
        let found = resolve("IFLS-1", "IFLS-&", &products).unwrap();
        assert_eq!(found.id, 1);
    }

    #[test]
    fn resolve_fuzzy_ignores_symbols() {
        let products = vec![product(1, "Metal Clean", Some("IF_LS001"), None)];
        let found = resolve("x", "IF*LS001", &products).unwrap();
        assert_eq!(found.id, 1);
    }

    #[test]
    fn resolve_fuzzy_matches_six_char_prefix() {
        let products = vec![product(1, "Metal Clean", Some("IFLS001"), None)];
        let found = resolve("x", "aaIFLS00zz", &products).unwrap();
        assert_eq!(found.id, 1);
    }

    #[test]
    fn resolve_first_match_wins() {
        let products = vec![
            product(1, "A", Some("IFLS001"), None),
            product(2, "B", Some("IFLS001"), None),
        ];
        assert_eq!(resolve("IFLS001", "IFLS001", &products).unwrap().id, 1);
    }

    #[test]
    fn resolve_none_when_unknown() {
        let products = vec![product(1, "A", Some("IFLS001"), None)];
        assert!(resolve("QQQQQQQ", "QQQQQQQ", &products).is_none());
    }

    #[test]
    fn generate_builds_prefix_from_significant_words() {
        assert_eq!(generate("Interflon Fin Super", &[]), "IFS001");
        // "500ml" is longer than two characters and not a stopword, so its
        // first character lands in the prefix.
        assert_eq!(generate("Interflon Metal Clean spray 500ml", &[]), "IMC5001");
    }

    #[test]
    fn generate_falls_back_to_name_start() {
        assert_eq!(generate("Go 2", &[]), "GO2001");
    }

    #[test]
    fn generate_caps_prefix_at_four() {
        assert_eq!(generate("Alpha Beta Gamma Delta Epsilon Zeta", &[]), "ABGD001");
    }

    #[test]
    fn generate_skips_taken_counters() {
        assert_eq!(
            generate("Interflon Fin Super", &["IFS001", "IFS002"]),
            "IFS003"
        );
    }

    #[test]
    fn generate_returns_last_slot_when_exhausted() {
        let codes: Vec<String> = (1..1000).map(|n| format!("IFS{:03}", n)).collect();
        let existing: Vec<&str> = codes.iter().map(String::as_str).collect();
        assert_eq!(generate("Interflon Fin Super", &existing), "IFS999");
    }
}
