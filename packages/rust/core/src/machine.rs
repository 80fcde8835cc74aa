//! Pure state transitions for one accepted registration answer.
//!
//! [`apply`] either advances the registration in place or returns a
//! [`Rejection`] without touching it. Nothing here does I/O; global
//! uniqueness is checked by the store when the engine saves the result.

use teamreg_intake::{
    Comparison, collides_with_members, extract_field, index_matches_batch, is_valid_batch,
    is_valid_email, is_valid_index_number, is_valid_name, is_valid_team_name,
};
use teamreg_shared::{
    AppConfig, Field, Member, MemberField, Registration, RegistrationState, TEAM_SIZE,
};

/// Input policies shared by the engine and admin edits.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntakePolicy {
    pub comparison: Comparison,
    pub require_batch_prefix: bool,
}

impl From<&AppConfig> for IntakePolicy {
    fn from(config: &AppConfig) -> Self {
        Self {
            comparison: Comparison::from_policy(config.intake.collapse_internal_whitespace),
            require_batch_prefix: config.intake.require_batch_prefix,
        }
    }
}

/// Why an answer was not accepted. The state never advances on a rejection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The value failed the field's format check.
    Format(Field),
    /// Index number does not start with the team's batch digits.
    BatchMismatch { batch: String },
    /// Already used by another member of the same team.
    DuplicateInTeam(Field),
    /// Already used by another team (reported by the store).
    Conflict { field: Field, value: String },
    /// Another write to the same session won the race.
    StaleWrite,
}

impl Rejection {
    pub fn message(&self) -> String {
        match self {
            Self::Format(Field::TeamName) => {
                "Team names need 2 to 50 characters and can't be an e-mail address or a number."
                    .into()
            }
            Self::Format(Field::Batch) => "Please choose batch 23 or 24.".into(),
            Self::Format(Field::Member(MemberField::FullName)) => {
                "That doesn't look like a name. Please enter the member's full name.".into()
            }
            Self::Format(Field::Member(MemberField::IndexNumber)) => {
                "Index numbers are six digits followed by a letter, like 234001T.".into()
            }
            Self::Format(Field::Member(MemberField::Email)) => {
                "That doesn't look like a valid e-mail address.".into()
            }
            Self::Format(Field::Confirmation) => "Please answer yes or no.".into(),
            Self::BatchMismatch { batch } => {
                format!("Index numbers for batch {batch} start with {batch}.")
            }
            Self::DuplicateInTeam(field) => {
                format!("That {field} is already used by another member of this team.")
            }
            Self::Conflict { field, value } => {
                format!("The {field} '{value}' is already registered by another team.")
            }
            Self::StaleWrite => {
                "Your previous message was still being processed. Please send that answer again."
                    .into()
            }
        }
    }
}

/// What an accepted answer did to the registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Moved to the next field or state.
    Advanced,
    /// Confirmed: the registration is now `DONE`.
    Completed,
    /// Accepted but nothing changed ("no" at confirmation, or already done).
    Stay,
}

/// Extract the value for `field` from a chat message and canonicalize it.
pub fn normalize(field: Field, raw: &str) -> String {
    let value = extract_field(raw, field);
    match field {
        Field::Member(MemberField::IndexNumber) => value.to_uppercase(),
        _ => value,
    }
}

/// Format and within-team checks for a member value.
///
/// `skip` excludes one committed member (by position) from the duplicate
/// check, for edits of that member.
pub fn check_member_value(
    field: MemberField,
    value: &str,
    registration: &Registration,
    skip: Option<usize>,
    policy: IntakePolicy,
) -> Result<(), Rejection> {
    let format_ok = match field {
        MemberField::FullName => is_valid_name(value),
        MemberField::IndexNumber => is_valid_index_number(value),
        MemberField::Email => is_valid_email(value),
    };
    if !format_ok {
        return Err(Rejection::Format(Field::Member(field)));
    }

    if field == MemberField::IndexNumber && policy.require_batch_prefix {
        if let Some(batch) = &registration.team_batch {
            if !index_matches_batch(value, batch) {
                return Err(Rejection::BatchMismatch {
                    batch: batch.clone(),
                });
            }
        }
    }

    let others: Vec<Member> = registration
        .members
        .iter()
        .enumerate()
        .filter(|(i, _)| Some(*i) != skip)
        .map(|(_, m)| m.clone())
        .collect();
    if collides_with_members(field, value, &others, policy.comparison) {
        return Err(Rejection::DuplicateInTeam(Field::Member(field)));
    }
    Ok(())
}

/// Apply one registration answer to `registration`.
///
/// On `Err` the registration is left exactly as it was.
pub fn apply(
    registration: &mut Registration,
    raw: &str,
    policy: IntakePolicy,
) -> Result<Transition, Rejection> {
    match registration.state.clone() {
        RegistrationState::Welcome => {
            let name = normalize(Field::TeamName, raw);
            if !is_valid_team_name(&name) {
                return Err(Rejection::Format(Field::TeamName));
            }
            registration.team_name = Some(name);
            registration.state = RegistrationState::BatchSelection;
            Ok(Transition::Advanced)
        }

        RegistrationState::BatchSelection => {
            let batch = normalize(Field::Batch, raw);
            if !is_valid_batch(&batch) {
                return Err(Rejection::Format(Field::Batch));
            }
            registration.team_batch = Some(batch);
            registration.state = RegistrationState::member(1);
            Ok(Transition::Advanced)
        }

        RegistrationState::MemberDetails {
            member_number,
            pending,
            mut staged,
        } => {
            let value = normalize(Field::Member(pending), raw);
            check_member_value(pending, &value, registration, None, policy)?;
            staged.set(pending, value);

            registration.state = match pending.next() {
                Some(next) => RegistrationState::MemberDetails {
                    member_number,
                    pending: next,
                    staged,
                },
                None => {
                    let batch = registration.team_batch.clone().unwrap_or_default();
                    let member = staged
                        .complete(&batch)
                        .ok_or(Rejection::Format(Field::Member(pending)))?;
                    registration.members.push(member);
                    if registration.members.len() >= TEAM_SIZE {
                        RegistrationState::Confirmation
                    } else {
                        RegistrationState::member(member_number + 1)
                    }
                }
            };
            Ok(Transition::Advanced)
        }

        RegistrationState::Confirmation => match raw.trim().to_lowercase().as_str() {
            "yes" | "y" | "confirm" => {
                registration.state = RegistrationState::Done;
                Ok(Transition::Completed)
            }
            "no" | "n" => Ok(Transition::Stay),
            _ => Err(Rejection::Format(Field::Confirmation)),
        },

        RegistrationState::Done => Ok(Transition::Stay),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use teamreg_shared::StagedMember;

    fn member(name: &str, index: &str, email: &str) -> Member {
        Member {
            full_name: name.into(),
            index_number: index.into(),
            batch: "23".into(),
            email: email.into(),
        }
    }

    fn at_member(n: u8, pending: MemberField, staged: StagedMember) -> Registration {
        let mut reg = Registration::new("s1");
        reg.team_name = Some("Phoenix".into());
        reg.team_batch = Some("23".into());
        for i in 1..n {
            reg.members.push(member(
                &format!("Member {i}"),
                &format!("23400{i}T"),
                &format!("m{i}@example.com"),
            ));
        }
        reg.state = RegistrationState::MemberDetails {
            member_number: n,
            pending,
            staged,
        };
        reg
    }

    #[test]
    fn team_name_then_batch() {
        let mut reg = Registration::new("s1");
        let policy = IntakePolicy::default();

        assert_eq!(
            apply(&mut reg, "my team name is Phoenix", policy),
            Ok(Transition::Advanced)
        );
        assert_eq!(reg.team_name.as_deref(), Some("Phoenix"));
        assert_eq!(reg.state, RegistrationState::BatchSelection);

        assert_eq!(
            apply(&mut reg, "25", policy),
            Err(Rejection::Format(Field::Batch))
        );
        assert_eq!(reg.state, RegistrationState::BatchSelection);

        apply(&mut reg, "23", policy).unwrap();
        assert_eq!(reg.state, RegistrationState::member(1));
        assert_eq!(reg.team_batch.as_deref(), Some("23"));
    }

    #[test]
    fn index_answer_updates_staged_member_only() {
        let staged = StagedMember {
            full_name: Some("X".into()),
            ..Default::default()
        };
        let mut reg = at_member(2, MemberField::IndexNumber, staged);
        let first = reg.members[0].clone();

        apply(&mut reg, "234002u", IntakePolicy::default()).unwrap();

        assert_eq!(reg.members.len(), 1);
        assert_eq!(reg.members[0], first);
        match &reg.state {
            RegistrationState::MemberDetails {
                member_number,
                pending,
                staged,
            } => {
                assert_eq!(*member_number, 2);
                assert_eq!(*pending, MemberField::Email);
                assert_eq!(staged.full_name.as_deref(), Some("X"));
                assert_eq!(staged.index_number.as_deref(), Some("234002U"));
            }
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[test]
    fn email_commits_member_and_moves_on() {
        let staged = StagedMember {
            full_name: Some("Ben Silva".into()),
            index_number: Some("234002U".into()),
            email: None,
        };
        let mut reg = at_member(2, MemberField::Email, staged);
        apply(&mut reg, "his email is ben@example.com", IntakePolicy::default()).unwrap();

        assert_eq!(reg.members.len(), 2);
        assert_eq!(reg.members[1].email, "ben@example.com");
        assert_eq!(reg.members[1].batch, "23");
        assert_eq!(reg.state, RegistrationState::member(3));
    }

    #[test]
    fn fourth_member_leads_to_confirmation() {
        let staged = StagedMember {
            full_name: Some("Dilan Jay".into()),
            index_number: Some("234004W".into()),
            email: None,
        };
        let mut reg = at_member(4, MemberField::Email, staged);
        apply(&mut reg, "dilan@example.com", IntakePolicy::default()).unwrap();
        assert_eq!(reg.members.len(), 4);
        assert_eq!(reg.state, RegistrationState::Confirmation);
    }

    #[test]
    fn rejections_leave_registration_untouched() {
        let mut reg = at_member(2, MemberField::FullName, StagedMember::default());
        let before = reg.clone();

        assert_eq!(
            apply(&mut reg, "234001T", IntakePolicy::default()),
            Err(Rejection::Format(Field::Member(MemberField::FullName)))
        );
        assert_eq!(
            apply(&mut reg, "MEMBER 1", IntakePolicy::default()),
            Err(Rejection::DuplicateInTeam(Field::Member(MemberField::FullName)))
        );
        assert_eq!(reg, before);
    }

    #[test]
    fn duplicate_index_within_team() {
        let staged = StagedMember {
            full_name: Some("Ben".into()),
            ..Default::default()
        };
        let mut reg = at_member(2, MemberField::IndexNumber, staged);
        assert_eq!(
            apply(&mut reg, "234001t", IntakePolicy::default()),
            Err(Rejection::DuplicateInTeam(Field::Member(
                MemberField::IndexNumber
            )))
        );
    }

    #[test]
    fn batch_prefix_policy() {
        let staged = StagedMember {
            full_name: Some("Ben".into()),
            ..Default::default()
        };
        let strict = IntakePolicy {
            require_batch_prefix: true,
            ..Default::default()
        };

        let mut reg = at_member(2, MemberField::IndexNumber, staged.clone());
        assert_eq!(
            apply(&mut reg, "244002U", strict),
            Err(Rejection::BatchMismatch { batch: "23".into() })
        );

        let mut reg = at_member(2, MemberField::IndexNumber, staged);
        assert!(apply(&mut reg, "244002U", IntakePolicy::default()).is_ok());
    }

    #[test]
    fn confirmation_answers() {
        let mut reg = Registration::new("s1");
        reg.state = RegistrationState::Confirmation;

        assert_eq!(
            apply(&mut reg, "maybe", IntakePolicy::default()),
            Err(Rejection::Format(Field::Confirmation))
        );
        assert_eq!(
            apply(&mut reg, "No", IntakePolicy::default()),
            Ok(Transition::Stay)
        );
        assert_eq!(reg.state, RegistrationState::Confirmation);
        assert_eq!(
            apply(&mut reg, "YES", IntakePolicy::default()),
            Ok(Transition::Completed)
        );
        assert!(reg.is_done());
    }

    #[test]
    fn rejection_messages_name_the_field() {
        let msg = Rejection::Conflict {
            field: Field::TeamName,
            value: "Phoenix".into(),
        }
        .message();
        assert!(msg.contains("team name 'Phoenix'"));
        assert!(
            Rejection::DuplicateInTeam(Field::Member(MemberField::Email))
                .message()
                .contains("email")
        );
    }
}
