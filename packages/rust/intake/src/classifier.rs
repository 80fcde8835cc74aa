//! Heuristic split between registration answers and questions.
//!
//! A chat message either answers the prompt ("Phoenix", "234001T") or asks
//! something ("what is the venue?"). Only answers reach the state machine;
//! everything else goes to the informational path.

use regex::Regex;
use std::sync::LazyLock;

use crate::phrases;
use crate::validators::is_confirmation_word;

/// Messages outside this character range are never treated as answers.
const MIN_ANSWER_LEN: usize = 2;
const MAX_ANSWER_LEN: usize = 100;

// ---------------------------------------------------------------------------
// Regex patterns (compiled once)
// ---------------------------------------------------------------------------

/// A message that is nothing but an index number, any letter case.
static BARE_INDEX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]{6}[A-Za-z]$").expect("index regex")
});

static QUESTION_WORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(what|when|where|how|why|can|is|are|do|does|will|should|which|who)\b",
    )
    .expect("question word regex")
});

static HELP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(help|format|example|explain|tell me|show me)\b").expect("help regex")
});

static META_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(i want|i need|give me|wait|actually|hold on|never ?mind|not sure|i don'?t know|let me|hello|hi|hey|good (?:morning|afternoon|evening)|thanks|thank you)\b",
    )
    .expect("meta phrase regex")
});

static EVENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(venue|location|guidelines?|rules|hackathon|deadline|schedule|agenda|timeline|prizes?|eligibility|judging|criteria|organi[sz]ers?|submissions?|workshops?|registration fee)\b",
    )
    .expect("event keyword regex")
});

static INFO_VERB_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(provide|tell|give|show|explain|describe)\b").expect("info verb regex")
});

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

/// Whether `message` reads like a direct answer to a registration prompt.
pub fn looks_like_registration_data(message: &str) -> bool {
    let msg = message.trim();
    let lower = msg.to_lowercase();

    // Structured values short-circuit everything else.
    if msg.contains('@')
        || BARE_INDEX_RE.is_match(msg)
        || msg == "23"
        || msg == "24"
        || is_confirmation_word(msg)
    {
        return true;
    }

    let len = msg.chars().count();
    if !(MIN_ANSWER_LEN..=MAX_ANSWER_LEN).contains(&len) || msg.contains('?') {
        return false;
    }

    // "my team name is Bolt" contains "is" but is plainly an answer.
    if phrases::starts_with_answer_phrase(&lower) {
        return true;
    }

    !(QUESTION_WORD_RE.is_match(msg)
        || HELP_RE.is_match(msg)
        || META_RE.is_match(msg)
        || EVENT_RE.is_match(msg)
        || INFO_VERB_RE.is_match(msg))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn questions_are_not_data() {
        assert!(!looks_like_registration_data("what is the venue?"));
        assert!(!looks_like_registration_data("When does it start"));
        assert!(!looks_like_registration_data("provide guidelines"));
        assert!(!looks_like_registration_data("tell me the rules"));
        assert!(!looks_like_registration_data("I need help"));
        assert!(!looks_like_registration_data("wait"));
        assert!(!looks_like_registration_data("hi"));
        assert!(!looks_like_registration_data("Good morning"));
        assert!(!looks_like_registration_data("hackathon prizes"));
        assert!(!looks_like_registration_data("my team name is what?"));
    }

    #[test]
    fn index_number_inside_a_question_is_not_data() {
        assert!(!looks_like_registration_data("what is 234001T?"));
        assert!(!looks_like_registration_data(
            "can you explain the format of 234001T?"
        ));
        assert!(!looks_like_registration_data("is 234001T valid"));
        assert!(looks_like_registration_data("  234001T  "));
    }

    #[test]
    fn answers_are_data() {
        assert!(looks_like_registration_data("John Doe"));
        assert!(looks_like_registration_data("Phoenix"));
        assert!(looks_like_registration_data("my team name is Bolt"));
        assert!(looks_like_registration_data("her index is 234001T"));
    }

    #[test]
    fn structured_values_short_circuit() {
        assert!(looks_like_registration_data("234001T"));
        assert!(looks_like_registration_data("234001t"));
        assert!(looks_like_registration_data("ann@example.com"));
        assert!(looks_like_registration_data("23"));
        assert!(looks_like_registration_data("24"));
        assert!(looks_like_registration_data("YES"));
        assert!(looks_like_registration_data("no"));
        assert!(looks_like_registration_data("y"));
        assert!(looks_like_registration_data("N"));
    }

    #[test]
    fn length_bounds() {
        assert!(!looks_like_registration_data("A"));
        assert!(!looks_like_registration_data(""));
        assert!(!looks_like_registration_data(&"a".repeat(101)));
        assert!(looks_like_registration_data(&"a".repeat(100)));
    }

    #[test]
    fn question_words_match_whole_words_only() {
        // "Isuru" starts with "is", "Howard" with "how"
        assert!(looks_like_registration_data("Isuru Howard"));
        assert!(!looks_like_registration_data("This Is Sparta"));
    }
}
