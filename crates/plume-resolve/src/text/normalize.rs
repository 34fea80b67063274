use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Folds a title or name into its comparable form.
///
/// Compatibility-decomposes, lower-cases, drops combining marks, expands the
/// ligatures NFKD leaves alone, maps typographic dashes and apostrophes to
/// ASCII and collapses whitespace. `normalize(normalize(s)) == normalize(s)`.
pub fn normalize(text: &str) -> String {
    // Decompose before lower-casing so compatibility forms such as letterlike
    // capitals come out as plain letters that can still be lowered.
    let lowered = text.nfkd().collect::<String>().to_lowercase();

    let mut folded = String::with_capacity(lowered.len());
    for c in lowered.nfkd() {
        if is_combining_mark(c) {
            continue;
        }
        match c {
            'œ' => folded.push_str("oe"),
            'æ' => folded.push_str("ae"),
            'ß' => folded.push_str("ss"),
            '\u{2010}'..='\u{2015}' | '\u{2212}' | '\u{fe58}' | '\u{fe63}' | '\u{ff0d}' => {
                folded.push('-')
            }
            '\u{2018}' | '\u{2019}' | '\u{201a}' | '\u{201b}' | '\u{2032}' | '\u{02bc}'
            | '\u{0060}' | '\u{00b4}' => folded.push('\''),
            _ => folded.push(c),
        }
    }

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_accents_and_case() {
        assert_eq!(normalize("Anéantir"), "aneantir");
        assert_eq!(normalize("L'ÉTRANGER"), "l'etranger");
        assert_eq!(normalize("Çà et là"), "ca et la");
    }

    #[test]
    fn test_expands_ligatures() {
        assert_eq!(normalize("Cœur"), "coeur");
        assert_eq!(normalize("ŒUVRES"), "oeuvres");
        assert_eq!(normalize("Lætitia"), "laetitia");
        assert_eq!(normalize("ﬁn"), "fin");
    }

    #[test]
    fn test_maps_dashes_and_apostrophes() {
        assert_eq!(normalize("Jean\u{2013}Paul"), "jean-paul");
        assert_eq!(normalize("Jean\u{2014}Paul"), "jean-paul");
        assert_eq!(normalize("L\u{2019}Anomalie"), "l'anomalie");
        assert_eq!(normalize("aujourd\u{02bc}hui"), "aujourd'hui");
    }

    #[test]
    fn test_collapses_whitespace() {
        assert_eq!(normalize("  Le   Mage\tdu\u{00a0}Kremlin \n"), "le mage du kremlin");
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn test_ellipsis_folds_to_dots() {
        assert_eq!(normalize("Tante Alice enquête\u{2026}"), "tante alice enquete...");
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "Anéantir",
            "ŒUVRES COMPLÈTES",
            "Straße",
            "\u{0130}stanbul",
            "\u{210c}ello",
            "\u{212b}ngström",
            "L\u{2019}Été\u{2014}indien",
            "ǅemal",
            "ﬁﬂ   ligatures ",
            "ŉ",
            "Tante Alice enquête\u{2026}",
            "",
        ];
        for s in samples {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "not idempotent for {s:?}");
        }
    }
}
