//! Introductory phrases stripped from conversational answers, per field.
//!
//! Each list is in priority order: the extractor takes the first phrase that
//! occurs in the input, so longer and more specific phrases must come before
//! the generic ones they contain ("our team is called" before "our team is").
//! Phrases are lower-case ASCII.
//!
//! Generic single words that commonly occur inside real values ("email" in
//! "myemail@…", "team name" in "Team Namers") are deliberately absent.

use teamreg_shared::{Field, MemberField};

pub const TEAM_NAME: &[&str] = &[
    "our team name is",
    "out team name is",
    "our tema name is",
    "out tema name is",
    "my team name is",
    "my tema name is",
    "the team name is",
    "the tema name is",
    "team name will be",
    "team name is",
    "tema name is",
    "team name:",
    "tema name:",
    "our team is called",
    "out team is called",
    "our team is named",
    "our team is",
    "out team is",
    "we call ourselves",
    "we are called",
    "we're called",
    "it's called",
    "it is called",
    "call us",
];

pub const MEMBER_NAME: &[&str] = &[
    "my full name is",
    "his full name is",
    "her full name is",
    "their full name is",
    "the full name is",
    "full name is",
    "full name:",
    "member name is",
    "leader's name is",
    "leader name is",
    "my name is",
    "his name is",
    "her name is",
    "their name is",
    "the name is",
    "name is",
    "name:",
    "call me",
    "i'm",
];

pub const INDEX_NUMBER: &[&str] = &[
    "my index number is",
    "his index number is",
    "her index number is",
    "their index number is",
    "the index number is",
    "index number is",
    "index number:",
    "my index no is",
    "his index no is",
    "her index no is",
    "their index no is",
    "index no is",
    "index no:",
    "my index is",
    "his index is",
    "her index is",
    "their index is",
    "index is",
    "index:",
    "index number",
    "index no",
    "index",
];

pub const EMAIL: &[&str] = &[
    "my email address is",
    "his email address is",
    "her email address is",
    "their email address is",
    "the email address is",
    "email address is",
    "email address:",
    "my email is",
    "his email is",
    "her email is",
    "their email is",
    "the email is",
    "email is",
    "email:",
    "my e-mail is",
    "his e-mail is",
    "her e-mail is",
    "e-mail is",
    "e-mail:",
    "my mail is",
];

pub const BATCH: &[&str] = &[
    "we are from batch",
    "we're from batch",
    "our batch is",
    "out batch is",
    "my batch is",
    "the batch is",
    "batch is",
    "batch:",
    "from batch",
    "batch",
];

/// The phrase list for a field. Confirmation answers have none.
pub fn for_field(field: Field) -> &'static [&'static str] {
    match field {
        Field::TeamName => TEAM_NAME,
        Field::Batch => BATCH,
        Field::Member(MemberField::FullName) => MEMBER_NAME,
        Field::Member(MemberField::IndexNumber) => INDEX_NUMBER,
        Field::Member(MemberField::Email) => EMAIL,
        Field::Confirmation => &[],
    }
}

/// Whether `lower` opens with a multi-word answer phrase of any field.
pub(crate) fn starts_with_answer_phrase(lower: &str) -> bool {
    [TEAM_NAME, MEMBER_NAME, INDEX_NUMBER, EMAIL, BATCH]
        .iter()
        .flat_map(|list| list.iter())
        .any(|phrase| phrase.contains(' ') && lower.starts_with(phrase))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// No phrase may be shadowed by an earlier phrase it contains.
    #[test]
    fn specific_phrases_precede_generic_ones() {
        for list in [TEAM_NAME, MEMBER_NAME, INDEX_NUMBER, EMAIL, BATCH] {
            for (i, later) in list.iter().enumerate() {
                for earlier in &list[..i] {
                    assert!(
                        !later.contains(earlier),
                        "'{earlier}' shadows the more specific '{later}'"
                    );
                }
            }
        }
    }

    #[test]
    fn phrases_are_lowercase_ascii() {
        for list in [TEAM_NAME, MEMBER_NAME, INDEX_NUMBER, EMAIL, BATCH] {
            for phrase in list {
                assert!(phrase.is_ascii());
                assert_eq!(*phrase, phrase.to_ascii_lowercase());
            }
        }
    }

    #[test]
    fn answer_openers() {
        assert!(starts_with_answer_phrase("my team name is bolt"));
        assert!(starts_with_answer_phrase("her email is x@y.io"));
        assert!(!starts_with_answer_phrase("what is the venue"));
        // single-word phrases do not count as openers
        assert!(!starts_with_answer_phrase("batch rules"));
    }
}
