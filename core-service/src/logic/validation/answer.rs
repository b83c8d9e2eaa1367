//! Validator answer parsing
//!
//! The external validator is asked to reply YES or NO. Its reply is free
//! text, so it is reduced to a closed answer: exactly one of the two words
//! (whole word, any case) must be present. Anything else is `Unparseable`,
//! which the cascade treats as "no verdict", never as a negative.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidatorAnswer {
    Yes,
    No,
    Unparseable(String),
}

fn answer_word() -> &'static Regex {
    static ANSWER_WORD: OnceLock<Regex> = OnceLock::new();
    ANSWER_WORD.get_or_init(|| Regex::new(r"(?i)\b(yes|no)\b").expect("Invalid answer regex pattern"))
}

pub fn parse_answer(text: &str) -> ValidatorAnswer {
    let mut saw_yes = false;
    let mut saw_no = false;

    for word in answer_word().find_iter(text) {
        if word.as_str().eq_ignore_ascii_case("yes") {
            saw_yes = true;
        } else {
            saw_no = true;
        }
    }

    match (saw_yes, saw_no) {
        (true, false) => ValidatorAnswer::Yes,
        (false, true) => ValidatorAnswer::No,
        _ => ValidatorAnswer::Unparseable(text.trim().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_answers() {
        assert_eq!(parse_answer("YES"), ValidatorAnswer::Yes);
        assert_eq!(parse_answer("NO"), ValidatorAnswer::No);
        assert_eq!(parse_answer("  no.\n"), ValidatorAnswer::No);
        assert_eq!(parse_answer("Yes, there is visible smoke."), ValidatorAnswer::Yes);
    }

    #[test]
    fn test_whole_word_only() {
        // "NOT", "NONE", "KNOW" and "EYES" must not count
        assert_eq!(
            parse_answer("I do not know, there are none"),
            ValidatorAnswer::Unparseable("I do not know, there are none".to_string())
        );
        assert_eq!(parse_answer("EYES"), ValidatorAnswer::Unparseable("EYES".to_string()));
    }

    #[test]
    fn test_both_words_is_unparseable() {
        assert!(matches!(
            parse_answer("YES or NO? Hard to say."),
            ValidatorAnswer::Unparseable(_)
        ));
    }

    #[test]
    fn test_empty_is_unparseable() {
        assert_eq!(parse_answer(""), ValidatorAnswer::Unparseable(String::new()));
    }
}
