//! Region name normalization.
//! Query results carry state names in whatever casing the source tables use;
//! the boundary dataset keys its features by title-cased names (`ST_NM`).

use serde::Serialize;
use std::fmt;

/// Title-case a region name: the first letter of every word upper case, the
/// rest lower case. A word starts after any non-alphabetic character, so
/// "andaman & nicobar" becomes "Andaman & Nicobar" and "jammu-&-kashmir"
/// becomes "Jammu-&-Kashmir". Surrounding whitespace is dropped.
pub fn normalize_region_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_word = false;

    for c in raw.trim().chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                // multi-char uppercase forms (e.g. 'ß' -> "SS") title-case as "Ss"
                let mut upper = c.to_uppercase();
                if let Some(first) = upper.next() {
                    out.push(first);
                }
                for rest in upper {
                    out.extend(rest.to_lowercase());
                }
            }
            in_word = true;
        } else if is_combining_mark(c) {
            // accents belong to the letter before them
            out.push(c);
        } else {
            out.push(c);
            in_word = false;
        }
    }

    out
}

fn is_combining_mark(c: char) -> bool {
    matches!(
        c,
        '\u{0300}'..='\u{036F}'
            | '\u{1AB0}'..='\u{1AFF}'
            | '\u{1DC0}'..='\u{1DFF}'
            | '\u{20D0}'..='\u{20FF}'
            | '\u{FE20}'..='\u{FE2F}'
    )
}

/// A region name already in boundary-key form
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RegionName(String);

impl RegionName {
    pub fn normalize(raw: &str) -> Self {
        Self(normalize_region_name(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for RegionName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_case() {
        assert_eq!(normalize_region_name("tamil nadu"), "Tamil Nadu");
        assert_eq!(normalize_region_name("MAHARASHTRA"), "Maharashtra");
        assert_eq!(normalize_region_name("uttar pradesh"), "Uttar Pradesh");
    }

    #[test]
    fn test_punctuation_starts_words() {
        assert_eq!(normalize_region_name("andaman & nicobar"), "Andaman & Nicobar");
        assert_eq!(
            normalize_region_name("jammu-&-kashmir"),
            "Jammu-&-Kashmir"
        );
        assert_eq!(normalize_region_name("dadra and nagar haveli"), "Dadra And Nagar Haveli");
    }

    #[test]
    fn test_trims_whitespace() {
        assert_eq!(normalize_region_name("  kerala \n"), "Kerala");
        assert_eq!(normalize_region_name(""), "");
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "tamil nadu",
            "ANDAMAN-&-NICOBAR-ISLANDS",
            "dadra & nagar haveli & daman & diu",
            "  puducherry",
            "straße",
            "2nd ward",
            "o'neil nagar",
            "AİB",
            "i\u{307}stanbul road",
            "pondicherry e\u{301}cole",
        ];
        for raw in samples {
            let once = normalize_region_name(raw);
            assert_eq!(normalize_region_name(&once), once, "not idempotent for {:?}", raw);
        }
    }

    #[test]
    fn test_combining_marks_stay_in_word() {
        assert_eq!(normalize_region_name("AİB"), "Ai\u{307}b");
        assert_eq!(normalize_region_name("Ai\u{307}b"), "Ai\u{307}b");
        assert_eq!(normalize_region_name("e\u{301}cole normale"), "E\u{301}cole Normale");
    }

    #[test]
    fn test_region_name_wrapper() {
        let name = RegionName::normalize("west bengal");
        assert_eq!(name.as_str(), "West Bengal");
        assert_eq!(name.to_string(), "West Bengal");
        assert_eq!(RegionName::normalize(name.as_str()), name);
    }
}
