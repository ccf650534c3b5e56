use lazy_static::lazy_static;
use regex::Regex;

/// Substrings that mark a comment as negative.
pub const NEGATIVE_KEYWORDS: [&str; 4] = ["плохо", "ужасно", "невкусно", "жутко"];

lazy_static! {
    static ref NEGATIVE_REGEX: Regex = Regex::new(&format!(
        "(?i){}",
        NEGATIVE_KEYWORDS
            .iter()
            .map(|keyword| regex::escape(keyword))
            .collect::<Vec<_>>()
            .join("|")
    ))
    .unwrap();
}

/// Case-insensitive substring match against [`NEGATIVE_KEYWORDS`].
///
/// A missing comment is never negative.
pub fn is_negative(comment: Option<&str>) -> bool {
    comment.is_some_and(|text| NEGATIVE_REGEX.is_match(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_keywords_in_any_case() {
        assert!(is_negative(Some("Было ужасно")));
        assert!(is_negative(Some("ПЛОХО приготовлено")));
        assert!(is_negative(Some("Суп невкусноватый")));
        assert!(is_negative(Some("жУтКо")));
    }

    #[test]
    fn ignores_other_text() {
        assert!(!is_negative(Some("Прекрасно")));
        assert!(!is_negative(Some("супер")));
        assert!(!is_negative(Some("")));
        assert!(!is_negative(None));
    }
}
