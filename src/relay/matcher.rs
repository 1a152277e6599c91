use anyhow::{bail, Context, Result};
use regex::{Regex, RegexBuilder};

/// Prefix marking a keyword as a raw regular expression
pub const PATTERN_PREFIX: &str = "re:";

const PRICE_PATTERN: &str = r"(?:⭐\s*)?(\d+)\s*(?:⭐|stars?)";

/// Keyword matcher with star-price extraction.
///
/// Plain keywords are escaped and matched on word boundaries; terms
/// written as `re:<pattern>` are used verbatim. Matching is
/// case-insensitive.
#[derive(Debug, Clone)]
pub struct Matcher {
    keywords: Regex,
    price: Regex,
}

impl Matcher {
    pub fn new<S: AsRef<str>>(terms: &[S]) -> Result<Self> {
        let mut alternatives = Vec::new();
        for term in terms {
            let term = term.as_ref().trim();
            if term.is_empty() {
                continue;
            }
            let pattern = match term.strip_prefix(PATTERN_PREFIX) {
                Some(raw) => {
                    Regex::new(raw).with_context(|| format!("Invalid keyword pattern: {}", raw))?;
                    raw.to_string()
                }
                None => literal_pattern(term),
            };
            alternatives.push(format!("(?:{})", pattern));
        }

        if alternatives.is_empty() {
            bail!("No keywords configured");
        }

        let keywords = RegexBuilder::new(&alternatives.join("|"))
            .case_insensitive(true)
            .build()
            .context("Failed to compile keyword matcher")?;
        let price = RegexBuilder::new(PRICE_PATTERN)
            .case_insensitive(true)
            .build()
            .context("Failed to compile price pattern")?;

        Ok(Self { keywords, price })
    }

    pub fn matches(&self, text: &str) -> bool {
        !text.is_empty() && self.keywords.is_match(text)
    }

    /// First number written next to a ⭐ or "star(s)", e.g. "50 ⭐".
    pub fn extract_price(&self, text: &str) -> Option<String> {
        self.price
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }
}

/// Escape a literal keyword, adding `\b` on edges that start or end with a word character
fn literal_pattern(keyword: &str) -> String {
    let escaped = regex::escape(keyword);
    let lead = keyword.chars().next().is_some_and(is_word_char);
    let trail = keyword.chars().last().is_some_and(is_word_char);
    format!(
        "{}{}{}",
        if lead { r"\b" } else { "" },
        escaped,
        if trail { r"\b" } else { "" }
    )
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(terms: &[&str]) -> Matcher {
        Matcher::new(terms).unwrap()
    }

    #[test]
    fn test_literal_is_case_insensitive() {
        let m = matcher(&["gift"]);
        assert!(m.matches("New GIFT available"));
        assert!(m.matches("gift"));
    }

    #[test]
    fn test_literal_respects_word_boundaries() {
        let m = matcher(&["gift"]);
        assert!(!m.matches("This is a giftbox"));
        assert!(!m.matches("regifting"));
        assert!(m.matches("gift!"));
    }

    #[test]
    fn test_literal_special_characters_are_escaped() {
        let m = matcher(&["c++", "a.b"]);
        assert!(m.matches("learn c++ today"));
        assert!(m.matches("a.b"));
        assert!(!m.matches("axb"));
    }

    #[test]
    fn test_symbol_keyword_matches_without_boundaries() {
        let m = matcher(&["⭐"]);
        assert!(m.matches("only 50⭐"));
    }

    #[test]
    fn test_pattern_terms() {
        let m = matcher(&[r"re:\bgifts?\b", r"re:\bnuov[oi]\s+regali?\b"]);
        assert!(m.matches("Two new gifts"));
        assert!(m.matches("Nuovi   regali in arrivo"));
        assert!(!m.matches("nothing here"));
    }

    #[test]
    fn test_empty_text_never_matches() {
        let m = matcher(&[r"re:.*"]);
        assert!(!m.matches(""));
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        assert!(Matcher::new(&["re:(unclosed"]).is_err());
    }

    #[test]
    fn test_no_keywords_is_rejected() {
        let empty: [&str; 0] = [];
        assert!(Matcher::new(&empty).is_err());
        assert!(Matcher::new(&["", "  "]).is_err());
    }

    #[test]
    fn test_extract_price() {
        let m = matcher(&["gift"]);
        assert_eq!(
            m.extract_price("New gift available, 50 ⭐ only!").as_deref(),
            Some("50")
        );
        assert_eq!(m.extract_price("New gift available"), None);
        assert_eq!(m.extract_price("New gift: 50 stars").as_deref(), Some("50"));
        assert_eq!(m.extract_price("costs 1 STAR").as_deref(), Some("1"));
        assert_eq!(m.extract_price("⭐ 25 ⭐").as_deref(), Some("25"));
    }

    #[test]
    fn test_extract_price_takes_first() {
        let m = matcher(&["gift"]);
        assert_eq!(
            m.extract_price("was 100 stars, now 75 stars").as_deref(),
            Some("100")
        );
    }
}
