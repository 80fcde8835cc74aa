//! Pull the intended value out of a conversational answer.

use teamreg_shared::Field;

use crate::phrases;

/// Strip the first matching introductory phrase from `raw`.
///
/// `phrases` is scanned in order; the first phrase found anywhere in the
/// (ASCII lower-cased) input wins if it leaves a non-empty remainder. The
/// remainder keeps the input's original case. Without a usable match the
/// trimmed input is returned unchanged, so bare answers pass straight
/// through.
pub fn extract(raw: &str, phrases: &[&str]) -> String {
    let input = raw.trim();
    // ASCII lower-casing keeps byte offsets aligned with `input`.
    let lower = input.to_ascii_lowercase();

    for phrase in phrases {
        if let Some(pos) = lower.find(phrase) {
            let rest = input[pos + phrase.len()..].trim();
            if !rest.is_empty() {
                return rest.to_string();
            }
        }
    }

    input.to_string()
}

/// [`extract`] with the phrase list registered for `field`.
pub fn extract_field(raw: &str, field: Field) -> String {
    extract(raw, phrases::for_field(field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phrases::{BATCH, EMAIL, INDEX_NUMBER, MEMBER_NAME, TEAM_NAME};

    #[test]
    fn team_name_phrasings() {
        assert_eq!(extract("my team name is Bolt", TEAM_NAME), "Bolt");
        assert_eq!(extract("Bolt", TEAM_NAME), "Bolt");
        assert_eq!(extract("our tema name is bolt", TEAM_NAME), "bolt");
        assert_eq!(extract("Out team is called Night Owls", TEAM_NAME), "Night Owls");
        assert_eq!(extract("  Team Name: Code Crafters  ", TEAM_NAME), "Code Crafters");
    }

    #[test]
    fn extraction_is_idempotent() {
        let once = extract("our team name is Phoenix", TEAM_NAME);
        assert_eq!(extract(&once, TEAM_NAME), once);
    }

    #[test]
    fn empty_remainder_falls_back_to_input() {
        assert_eq!(extract("my team name is", TEAM_NAME), "my team name is");
        assert_eq!(extract("   ", TEAM_NAME), "");
    }

    #[test]
    fn first_phrase_in_priority_order_wins() {
        // "name is" also occurs, but "his full name is" is listed first
        assert_eq!(extract("his full name is Kasun Perera", MEMBER_NAME), "Kasun Perera");
        assert_eq!(extract("Hi! My name is Ann Fernando", MEMBER_NAME), "Ann Fernando");
    }

    #[test]
    fn member_field_phrasings() {
        assert_eq!(extract("her index number is 234001T", INDEX_NUMBER), "234001T");
        assert_eq!(extract("index 234002U", INDEX_NUMBER), "234002U");
        assert_eq!(
            extract("My email address is Ann@Example.com", EMAIL),
            "Ann@Example.com"
        );
        assert_eq!(extract("myemail@example.com", EMAIL), "myemail@example.com");
        assert_eq!(extract("we are from batch 24", BATCH), "24");
        assert_eq!(extract("23", BATCH), "23");
    }

    #[test]
    fn non_ascii_values_are_preserved() {
        assert_eq!(extract("my name is Zoë Ñúñez", MEMBER_NAME), "Zoë Ñúñez");
        assert_eq!(extract("ÉQUIPE name is x", MEMBER_NAME), "x");
    }

    #[test]
    fn field_dispatch() {
        assert_eq!(extract_field("our batch is 23", Field::Batch), "23");
        assert_eq!(extract_field("yes", Field::Confirmation), "yes");
    }
}
