//! Chat replies and prompt text.

use serde::Serialize;
use serde_json::{Value, json};
use teamreg_intake::ACCEPTED_BATCHES;
use teamreg_shared::{MemberField, Registration, RegistrationState, TEAM_SIZE};

use crate::machine::Rejection;

/// What happened to the registration while handling a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The answer was accepted and the state advanced.
    Accepted,
    /// The team confirmed and is now `DONE`.
    Completed,
    /// "no" at confirmation.
    Declined,
    /// The answer was rejected; the same field is asked again.
    Rejected(Rejection),
    /// A question or greeting; state unchanged.
    Informational,
    /// Data sent to a finished registration.
    AlreadyDone,
    /// The session was deleted by a control command.
    Reset,
    /// Storage stayed unavailable after retries; state unchanged.
    Unavailable,
}

/// Outbound chat message: `{message, buttons?, state, data}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buttons: Option<Vec<String>>,
    pub state: &'static str,
    pub data: Value,
    #[serde(skip)]
    pub outcome: Outcome,
}

impl ChatReply {
    pub fn new(
        message: impl Into<String>,
        buttons: Option<Vec<String>>,
        registration: &Registration,
        outcome: Outcome,
    ) -> Self {
        Self {
            message: message.into(),
            buttons,
            state: registration.state.label(),
            data: snapshot(registration),
            outcome,
        }
    }
}

/// Client-facing view of a registration.
fn snapshot(registration: &Registration) -> Value {
    let mut data = json!({
        "sessionId": registration.session_id,
        "teamName": registration.team_name,
        "teamBatch": registration.team_batch,
        "members": registration.members,
    });
    if let RegistrationState::MemberDetails {
        member_number,
        pending,
        ..
    } = &registration.state
    {
        data["memberNumber"] = json!(member_number);
        data["pending"] = json!(pending);
    }
    data
}

/// Question text (and quick-reply buttons) for the field `registration`
/// currently waits for.
pub fn prompt(registration: &Registration, event_name: &str) -> (String, Option<Vec<String>>) {
    let team = registration.team_name.as_deref().unwrap_or("your team");
    match &registration.state {
        RegistrationState::Welcome => (
            format!("Welcome to the {event_name} registration! What is your team name?"),
            None,
        ),
        RegistrationState::BatchSelection => (
            format!("Which batch is team {team} from?"),
            Some(ACCEPTED_BATCHES.iter().map(|b| b.to_string()).collect()),
        ),
        RegistrationState::MemberDetails {
            member_number,
            pending,
            staged,
        } => {
            let name = staged.full_name.as_deref().unwrap_or("this member");
            let text = match pending {
                MemberField::FullName if *member_number == 1 => {
                    format!("Let's add your {TEAM_SIZE} members. What is the full name of member 1?")
                }
                MemberField::FullName => {
                    format!("What is the full name of member {member_number}?")
                }
                MemberField::IndexNumber => format!("What is {name}'s index number?"),
                MemberField::Email => format!("What is {name}'s e-mail address?"),
            };
            (text, None)
        }
        RegistrationState::Confirmation => (
            format!("{}\n\nIs everything correct?", summary(registration)),
            Some(vec!["Yes".into(), "No".into()]),
        ),
        RegistrationState::Done => (
            format!(
                "Team {team} is registered for {event_name}. A confirmation e-mail is on its way to all members."
            ),
            None,
        ),
    }
}

/// Multi-line overview of the team, used before confirmation.
pub fn summary(registration: &Registration) -> String {
    let mut text = format!(
        "Team: {}\nBatch: {}",
        registration.team_name.as_deref().unwrap_or("-"),
        registration.team_batch.as_deref().unwrap_or("-"),
    );
    for (i, member) in registration.members.iter().enumerate() {
        text.push_str(&format!(
            "\nMember {}: {} | {} | {}",
            i + 1,
            member.full_name,
            member.index_number,
            member.email
        ));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use teamreg_shared::StagedMember;

    #[test]
    fn reply_serializes_camel_case_without_outcome() {
        let mut reg = Registration::new("s1");
        reg.team_name = Some("Phoenix".into());
        reg.state = RegistrationState::BatchSelection;

        let (text, buttons) = prompt(&reg, "CodeSprint");
        let reply = ChatReply::new(text, buttons, &reg, Outcome::Accepted);
        let json = serde_json::to_value(&reply).unwrap();

        assert_eq!(json["state"], "BATCH_SELECTION");
        assert_eq!(json["buttons"], json!(["23", "24"]));
        assert_eq!(json["data"]["teamName"], "Phoenix");
        assert!(json.get("outcome").is_none());
        assert!(json["message"].as_str().unwrap().contains("Phoenix"));
    }

    #[test]
    fn member_prompts_use_staged_name() {
        let mut reg = Registration::new("s1");
        reg.state = RegistrationState::MemberDetails {
            member_number: 2,
            pending: MemberField::Email,
            staged: StagedMember {
                full_name: Some("Ben Silva".into()),
                ..Default::default()
            },
        };
        let (text, buttons) = prompt(&reg, "CodeSprint");
        assert_eq!(text, "What is Ben Silva's e-mail address?");
        assert!(buttons.is_none());

        let data = snapshot(&reg);
        assert_eq!(data["memberNumber"], 2);
        assert_eq!(data["pending"], "email");
    }
}
