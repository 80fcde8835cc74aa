//! Within-team duplicate detection for member names, index numbers and e-mails.

use teamreg_shared::{Member, MemberField};

/// How two values are normalized before comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Comparison {
    /// Trim and case-fold only. `"Bindu  Silva"` differs from `"Bindu Silva"`.
    #[default]
    Strict,
    /// Also collapse runs of internal whitespace to a single space.
    CollapseWhitespace,
}

impl Comparison {
    pub fn from_policy(collapse_internal_whitespace: bool) -> Self {
        if collapse_internal_whitespace {
            Self::CollapseWhitespace
        } else {
            Self::Strict
        }
    }

    pub fn normalize(self, value: &str) -> String {
        let lower = value.trim().to_lowercase();
        match self {
            Self::Strict => lower,
            Self::CollapseWhitespace => lower.split_whitespace().collect::<Vec<_>>().join(" "),
        }
    }
}

/// Whether `candidate` equals any of `existing` after normalization.
pub fn is_duplicate<'a>(
    candidate: &str,
    existing: impl IntoIterator<Item = &'a str>,
    comparison: Comparison,
) -> bool {
    let needle = comparison.normalize(candidate);
    existing
        .into_iter()
        .any(|value| comparison.normalize(value) == needle)
}

/// Whether `candidate` collides with `field` of any committed member.
pub fn collides_with_members(
    field: MemberField,
    candidate: &str,
    members: &[Member],
    comparison: Comparison,
) -> bool {
    let hit = is_duplicate(candidate, members.iter().map(|m| m.get(field)), comparison);
    if hit {
        tracing::debug!(field = field.label(), "value already used in this team");
    }
    hit
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(name: &str) -> Member {
        Member {
            full_name: name.into(),
            index_number: "234001T".into(),
            batch: "23".into(),
            email: "bindu@example.com".into(),
        }
    }

    #[test]
    fn case_and_outer_whitespace_are_ignored() {
        assert!(is_duplicate("BINDU SILVA", ["Bindu Silva"], Comparison::Strict));
        assert!(is_duplicate("  bindu silva ", ["Bindu Silva"], Comparison::Strict));
        assert!(!is_duplicate("Bindu Perera", ["Bindu Silva"], Comparison::Strict));
        assert!(!is_duplicate("anything", Vec::<&str>::new(), Comparison::Strict));
    }

    #[test]
    fn internal_whitespace_depends_on_policy() {
        assert!(!is_duplicate("Bindu  Silva", ["Bindu Silva"], Comparison::Strict));
        assert!(is_duplicate(
            "Bindu  Silva",
            ["Bindu Silva"],
            Comparison::CollapseWhitespace
        ));
    }

    #[test]
    fn member_fields_are_checked_independently() {
        let members = vec![member("Bindu Silva")];
        assert!(collides_with_members(
            MemberField::FullName,
            "bindu silva",
            &members,
            Comparison::Strict
        ));
        assert!(collides_with_members(
            MemberField::Email,
            "BINDU@example.com",
            &members,
            Comparison::Strict
        ));
        assert!(!collides_with_members(
            MemberField::IndexNumber,
            "234002U",
            &members,
            Comparison::Strict
        ));
    }
}
