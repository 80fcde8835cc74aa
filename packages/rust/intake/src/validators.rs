//! Syntactic validators for registration fields.
//!
//! All validators expect already-trimmed input and never trim themselves:
//! `"23 "` is not a valid batch.

use regex::Regex;
use std::sync::LazyLock;

/// Batch codes accepted for this event.
pub const ACCEPTED_BATCHES: [&str; 2] = ["23", "24"];

/// Replies to the confirmation prompt. Never accepted as a name.
pub const CONFIRMATION_WORDS: [&str; 4] = ["yes", "no", "y", "n"];

/// Team names longer than this are rejected.
pub const MAX_TEAM_NAME_LEN: usize = 50;

// ---------------------------------------------------------------------------
// Regex patterns (compiled once)
// ---------------------------------------------------------------------------

/// 2-digit enrollment year + 4-digit sequence + uppercase check letter.
static INDEX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]{6}[A-Z]$").expect("index regex")
});

/// Same shape, any letter case. Used to keep index numbers out of names.
static INDEX_ANY_CASE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]{6}[A-Za-z]$").expect("index regex")
});

/// `local@domain.tld` with a restricted ASCII alphabet.
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("email regex")
});

// ---------------------------------------------------------------------------
// Validators
// ---------------------------------------------------------------------------

/// Exactly one of [`ACCEPTED_BATCHES`].
pub fn is_valid_batch(s: &str) -> bool {
    ACCEPTED_BATCHES.contains(&s)
}

pub fn is_valid_index_number(s: &str) -> bool {
    INDEX_RE.is_match(s)
}

pub fn is_valid_email(s: &str) -> bool {
    EMAIL_RE.is_match(s)
}

/// A person's name: at least 2 characters, not an e-mail, index number,
/// number or confirmation word.
pub fn is_valid_name(s: &str) -> bool {
    if s.contains('@')
        || INDEX_ANY_CASE_RE.is_match(s)
        || is_numeric(s)
        || is_confirmation_word(s)
    {
        return false;
    }
    s.chars().count() >= 2
}

/// A team name: 2 to [`MAX_TEAM_NAME_LEN`] characters, no `@`, not a number
/// or confirmation word.
pub fn is_valid_team_name(s: &str) -> bool {
    let len = s.chars().count();
    (2..=MAX_TEAM_NAME_LEN).contains(&len)
        && !s.contains('@')
        && !is_numeric(s)
        && !is_confirmation_word(s)
}

/// Case-insensitive match against [`CONFIRMATION_WORDS`].
pub fn is_confirmation_word(s: &str) -> bool {
    CONFIRMATION_WORDS.iter().any(|w| s.eq_ignore_ascii_case(w))
}

/// Whether an index number carries the batch's enrollment-year prefix.
pub fn index_matches_batch(index_number: &str, batch: &str) -> bool {
    index_number.starts_with(batch)
}

fn is_numeric(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_is_exact() {
        assert!(is_valid_batch("23"));
        assert!(is_valid_batch("24"));
        for bad in ["25", "025", "23 ", " 24", "2 3", "", "twenty-three"] {
            assert!(!is_valid_batch(bad), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn index_number_shape() {
        assert!(is_valid_index_number("234001T"));
        assert!(is_valid_index_number("240123A"));
        assert!(!is_valid_index_number("234001t"));
        assert!(!is_valid_index_number("23400T"));
        assert!(!is_valid_index_number("2340011T"));
        assert!(!is_valid_index_number("234001TT"));
    }

    #[test]
    fn email_shape() {
        assert!(is_valid_email("ann.perera+hack@uni.example.lk"));
        assert!(is_valid_email("a_b-c@mail-server.io"));
        assert!(!is_valid_email("ann@example"));
        assert!(!is_valid_email("ann@example.c"));
        assert!(!is_valid_email("ann perera@example.com"));
        assert!(!is_valid_email("@example.com"));
    }

    #[test]
    fn name_rules() {
        assert!(is_valid_name("Bindu Silva"));
        assert!(is_valid_name("Al"));
        assert!(!is_valid_name("A"));
        assert!(!is_valid_name("bindu@example.com"));
        assert!(!is_valid_name("234001T"));
        assert!(!is_valid_name("234001t"));
        assert!(!is_valid_name("12345"));
        assert!(!is_valid_name("No"));
        assert!(!is_valid_name("yes"));
        assert!(is_valid_name("Noel"));
    }

    #[test]
    fn team_name_rules() {
        assert!(is_valid_team_name("Phoenix"));
        assert!(!is_valid_team_name("P"));
        assert!(!is_valid_team_name("2024"));
        assert!(!is_valid_team_name("team@home"));
        assert!(!is_valid_team_name("no"));
        assert!(!is_valid_team_name("YES"));
        assert!(is_valid_team_name("Yes Men"));
        assert!(!is_valid_team_name(&"x".repeat(MAX_TEAM_NAME_LEN + 1)));
    }

    #[test]
    fn batch_prefix() {
        assert!(index_matches_batch("234001T", "23"));
        assert!(!index_matches_batch("244001T", "23"));
    }
}
