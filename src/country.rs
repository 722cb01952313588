//! Country-name reconstruction and normalization.
//!
//! Detail pages list countries in upper case (`IRAN (ISLAMIC REPUBLIC OF)`).
//! Turning that into a canonical, ISO-validated name takes three steps:
//!
//! 1. **Recasing**: each token keeps its leading character (two characters
//!    when it opens a parenthesis) and lowercases the rest.
//! 2. **Alias rewriting**: an ordered [`Rule`] table replaces historical and
//!    irregular names. The first matching rule wins, and substring rules are
//!    listed ahead of exact ones.
//! 3. **Validation**: the rewritten name must exist in [`crate::registry`].

use crate::error::HarvestError;
use crate::models::Country;
use crate::registry;
use itertools::Itertools;

/// How a [`Rule`] matches its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matcher {
    /// The input contains the pattern anywhere.
    Contains(&'static str),
    /// The input equals the pattern.
    Exact(&'static str),
}

impl Matcher {
    pub fn matches(&self, input: &str) -> bool {
        match self {
            Matcher::Contains(p) => input.contains(p),
            Matcher::Exact(p) => input == *p,
        }
    }
}

/// A `(predicate, replacement)` pair of an ordered rewrite table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    pub matcher: Matcher,
    pub replacement: &'static str,
}

pub const fn contains(pattern: &'static str, replacement: &'static str) -> Rule {
    Rule {
        matcher: Matcher::Contains(pattern),
        replacement,
    }
}

pub const fn exact(pattern: &'static str, replacement: &'static str) -> Rule {
    Rule {
        matcher: Matcher::Exact(pattern),
        replacement,
    }
}

/// Apply the first matching rule of `rules`, or return `input` unchanged.
pub fn rewrite<'a>(rules: &[Rule], input: &'a str) -> &'a str {
    rules
        .iter()
        .find(|rule| rule.matcher.matches(input))
        .map_or(input, |rule| rule.replacement)
}

/// Historical and irregular country names, in priority order.
pub const COUNTRY_ALIASES: &[Rule] = &[
    contains("Iran", "Iran"),
    exact("Republic Of Korea", "South Korea"),
    exact("Democratic People's Republic Of Korea", "North Korea"),
    contains("Bosnia", "Bosnia and Herzegovina"),
    contains("Moldova", "Republic of Moldova"),
    exact("Democratic Republic Of The Congo", "Democratic Republic of the Congo"),
    exact("United Republic Of Tanzania", "United Republic of Tanzania"),
    exact("Cote D'ivoire", "Ivory Coast"),
    exact("Antigua And Barbuda", "Antigua and Barbuda"),
    exact("Trinidad And Tobago", "Trinidad and Tobago"),
    exact("Guinea-bissau", "Guinea-Bissau"),
    exact("Czechia", "Czech Republic"),
];

/// Recase a single upper-case token.
///
/// `UNITED` becomes `United`; `(ISLAMIC` becomes `(Islamic`.
pub fn recase_token(token: &str) -> String {
    let keep = if token.starts_with('(') { 2 } else { 1 };
    let mut chars = token.chars();
    let head: String = chars.by_ref().take(keep).collect();
    head + &chars.as_str().to_lowercase()
}

/// Recase every token and join them with single spaces.
pub fn reconstruct_name<S: AsRef<str>>(tokens: &[S]) -> String {
    tokens.iter().map(|t| recase_token(t.as_ref())).join(" ")
}

/// Turns raw country tokens into validated [`Country`] values.
#[derive(Debug, Clone, Copy)]
pub struct CountryNormalizer {
    aliases: &'static [Rule],
}

impl Default for CountryNormalizer {
    fn default() -> Self {
        CountryNormalizer {
            aliases: COUNTRY_ALIASES,
        }
    }
}

impl CountryNormalizer {
    /// The canonical name for `tokens`, without registry validation.
    pub fn canonical_name<S: AsRef<str>>(&self, tokens: &[S]) -> String {
        let recased = reconstruct_name(tokens);
        rewrite(self.aliases, &recased).to_string()
    }

    /// Recase, rewrite and validate a raw token sequence.
    ///
    /// # Errors
    ///
    /// [`HarvestError::Normalization`] when the canonical name has no ISO
    /// alpha-2 code. Callers drop such rows.
    pub fn normalize<S: AsRef<str>>(&self, tokens: &[S]) -> Result<Country, HarvestError> {
        let name = self.canonical_name(tokens);
        match registry::alpha2(&name) {
            Some(alpha2) => Ok(Country {
                raw: tokens.iter().map(|t| t.as_ref()).join(" "),
                name,
                alpha2,
            }),
            None => Err(HarvestError::Normalization { name }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canonical(raw: &str) -> String {
        let tokens: Vec<&str> = raw.split_whitespace().collect();
        CountryNormalizer::default().canonical_name(&tokens)
    }

    #[test]
    fn test_recase_plain_token() {
        assert_eq!(recase_token("UNITED"), "United");
        assert_eq!(recase_token("D'IVOIRE"), "D'ivoire");
        assert_eq!(recase_token("GUINEA-BISSAU"), "Guinea-bissau");
        assert_eq!(recase_token("A"), "A");
    }

    #[test]
    fn test_recase_parenthesized_token() {
        assert_eq!(recase_token("(ISLAMIC"), "(Islamic");
        assert_eq!(recase_token("(Islamic"), "(Islamic");
        assert_eq!(recase_token("("), "(");
    }

    #[test]
    fn test_reconstruct_name() {
        assert_eq!(
            reconstruct_name(&["UNITED", "STATES"]),
            "United States"
        );
        assert_eq!(
            reconstruct_name(&["IRAN", "(ISLAMIC", "REPUBLIC", "OF)"]),
            "Iran (Islamic Republic Of)"
        );
        assert_eq!(
            reconstruct_name(&["(Islamic", "Republic", "Of)", "Iran"]),
            "(Islamic Republic Of) Iran"
        );
    }

    #[test]
    fn test_every_alias_entry() {
        let cases = [
            ("IRAN (ISLAMIC REPUBLIC OF)", "Iran"),
            ("REPUBLIC OF KOREA", "South Korea"),
            ("DEMOCRATIC PEOPLE'S REPUBLIC OF KOREA", "North Korea"),
            ("BOSNIA AND HERZEGOVINA", "Bosnia and Herzegovina"),
            ("REPUBLIC OF MOLDOVA", "Republic of Moldova"),
            (
                "DEMOCRATIC REPUBLIC OF THE CONGO",
                "Democratic Republic of the Congo",
            ),
            ("UNITED REPUBLIC OF TANZANIA", "United Republic of Tanzania"),
            ("COTE D'IVOIRE", "Ivory Coast"),
            ("ANTIGUA AND BARBUDA", "Antigua and Barbuda"),
            ("TRINIDAD AND TOBAGO", "Trinidad and Tobago"),
            ("GUINEA-BISSAU", "Guinea-Bissau"),
            ("CZECHIA", "Czech Republic"),
        ];
        assert_eq!(cases.len(), COUNTRY_ALIASES.len());
        for (raw, expected) in cases {
            assert_eq!(canonical(raw), expected, "alias for {raw}");
            assert!(
                registry::alpha2(expected).is_some(),
                "{expected} missing from registry"
            );
        }
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let rules = [contains("Korea", "Korea"), exact("Republic Of Korea", "South Korea")];
        assert_eq!(rewrite(&rules, "Republic Of Korea"), "Korea");
        assert_eq!(rewrite(COUNTRY_ALIASES, "Republic Of Korea"), "South Korea");
        assert_eq!(rewrite(COUNTRY_ALIASES, "Iran (Islamic Republic Of)"), "Iran");
    }

    #[test]
    fn test_exact_rules_do_not_match_substrings() {
        assert_eq!(
            rewrite(COUNTRY_ALIASES, "Czechia Republic"),
            "Czechia Republic"
        );
        assert_eq!(rewrite(COUNTRY_ALIASES, "Korea"), "Korea");
    }

    #[test]
    fn test_normalize_valid_country() {
        let country = CountryNormalizer::default()
            .normalize(&["UNITED", "STATES"])
            .unwrap();
        assert_eq!(country.name, "United States");
        assert_eq!(country.alpha2, "US");
        assert_eq!(country.raw, "UNITED STATES");
    }

    #[test]
    fn test_normalize_parenthesized_iran() {
        let country = CountryNormalizer::default()
            .normalize(&["(Islamic", "Republic", "Of)", "Iran"])
            .unwrap();
        assert_eq!(country.name, "Iran");
        assert_eq!(country.alpha2, "IR");
    }

    #[test]
    fn test_normalize_rejects_unknown_country() {
        let err = CountryNormalizer::default()
            .normalize(&["VENEZUELA", "(BOLIVARIAN", "REPUBLIC", "OF)"])
            .unwrap_err();
        match err {
            HarvestError::Normalization { name } => {
                assert_eq!(name, "Venezuela (Bolivarian Republic Of)")
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
