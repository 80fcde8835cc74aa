//! Core domain types for team registrations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of members every team must register.
pub const TEAM_SIZE: usize = 4;

// ---------------------------------------------------------------------------
// Fields
// ---------------------------------------------------------------------------

/// A per-member attribute collected one at a time during `MEMBER_DETAILS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MemberField {
    FullName,
    IndexNumber,
    Email,
}

impl MemberField {
    /// The field that follows this one, or `None` after the e-mail.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::FullName => Some(Self::IndexNumber),
            Self::IndexNumber => Some(Self::Email),
            Self::Email => None,
        }
    }

    /// Human-readable label used in prompts and error messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::FullName => "full name",
            Self::IndexNumber => "index number",
            Self::Email => "email",
        }
    }
}

/// Any value the conversation can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    TeamName,
    Batch,
    Member(MemberField),
    Confirmation,
}

impl Field {
    pub fn label(self) -> &'static str {
        match self {
            Self::TeamName => "team name",
            Self::Batch => "batch",
            Self::Member(field) => field.label(),
            Self::Confirmation => "confirmation",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Member
// ---------------------------------------------------------------------------

/// A fully collected team member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub full_name: String,
    pub index_number: String,
    pub batch: String,
    pub email: String,
}

impl Member {
    /// Read one of the per-member fields.
    pub fn get(&self, field: MemberField) -> &str {
        match field {
            MemberField::FullName => &self.full_name,
            MemberField::IndexNumber => &self.index_number,
            MemberField::Email => &self.email,
        }
    }

    /// Overwrite one of the per-member fields.
    pub fn set(&mut self, field: MemberField, value: String) {
        match field {
            MemberField::FullName => self.full_name = value,
            MemberField::IndexNumber => self.index_number = value,
            MemberField::Email => self.email = value,
        }
    }
}

/// The member currently being filled in, one field at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedMember {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl StagedMember {
    pub fn get(&self, field: MemberField) -> Option<&str> {
        match field {
            MemberField::FullName => self.full_name.as_deref(),
            MemberField::IndexNumber => self.index_number.as_deref(),
            MemberField::Email => self.email.as_deref(),
        }
    }

    pub fn set(&mut self, field: MemberField, value: String) {
        match field {
            MemberField::FullName => self.full_name = Some(value),
            MemberField::IndexNumber => self.index_number = Some(value),
            MemberField::Email => self.email = Some(value),
        }
    }

    /// Promote to a [`Member`] once all three fields are present.
    pub fn complete(&self, batch: &str) -> Option<Member> {
        Some(Member {
            full_name: self.full_name.clone()?,
            index_number: self.index_number.clone()?,
            batch: batch.to_string(),
            email: self.email.clone()?,
        })
    }
}

// ---------------------------------------------------------------------------
// RegistrationState
// ---------------------------------------------------------------------------

/// Conversation state. Only moves forward; a reset deletes the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum RegistrationState {
    Welcome,
    BatchSelection,
    MemberDetails {
        /// Which of the four slots is being filled (1-based).
        member_number: u8,
        /// The field the next answer is expected to provide.
        pending: MemberField,
        /// Fields of this member accepted so far.
        #[serde(default)]
        staged: StagedMember,
    },
    Confirmation,
    Done,
}

impl RegistrationState {
    /// Entry state for member `member_number`.
    pub fn member(member_number: u8) -> Self {
        Self::MemberDetails {
            member_number,
            pending: MemberField::FullName,
            staged: StagedMember::default(),
        }
    }

    /// Stable upper-case label used on the wire and in the database.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Welcome => "WELCOME",
            Self::BatchSelection => "BATCH_SELECTION",
            Self::MemberDetails { .. } => "MEMBER_DETAILS",
            Self::Confirmation => "CONFIRMATION",
            Self::Done => "DONE",
        }
    }

    /// The field this state is waiting for, if any.
    pub fn expected_field(&self) -> Option<Field> {
        match self {
            Self::Welcome => Some(Field::TeamName),
            Self::BatchSelection => Some(Field::Batch),
            Self::MemberDetails { pending, .. } => Some(Field::Member(*pending)),
            Self::Confirmation => Some(Field::Confirmation),
            Self::Done => None,
        }
    }
}

impl std::fmt::Display for RegistrationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

/// A team's registration document, keyed by the client's session ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_batch: Option<String>,
    #[serde(default)]
    pub members: Vec<Member>,
    pub state: RegistrationState,
    /// Revision counter for optimistic check-and-set. 0 means never saved.
    #[serde(default)]
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Registration {
    /// A fresh, unsaved registration in `WELCOME`.
    pub fn new(session_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            team_name: None,
            team_batch: None,
            members: Vec::new(),
            state: RegistrationState::Welcome,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_done(&self) -> bool {
        self.state == RegistrationState::Done
    }

    /// Lower-cased, trimmed team name used for global uniqueness.
    pub fn team_key(&self) -> Option<String> {
        self.team_name.as_deref().map(|n| n.trim().to_lowercase())
    }

    /// The member currently being staged, if any.
    pub fn staged_member(&self) -> Option<&StagedMember> {
        match &self.state {
            RegistrationState::MemberDetails { staged, .. } => Some(staged),
            _ => None,
        }
    }

    /// Globally unique member identifiers (index numbers and e-mails) held by
    /// this registration, including the staged member, lower-cased.
    pub fn identity_keys(&self) -> Vec<(MemberField, String)> {
        let mut keys = Vec::new();
        for member in &self.members {
            keys.push((MemberField::IndexNumber, member.index_number.trim().to_lowercase()));
            keys.push((MemberField::Email, member.email.trim().to_lowercase()));
        }
        if let Some(staged) = self.staged_member() {
            for field in [MemberField::IndexNumber, MemberField::Email] {
                if let Some(value) = staged.get(field) {
                    keys.push((field, value.trim().to_lowercase()));
                }
            }
        }
        keys
    }
}

// ---------------------------------------------------------------------------
// Delivery log
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for delivery log identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeliveryId(pub Uuid);

impl DeliveryId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for DeliveryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DeliveryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for DeliveryId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Which best-effort collaborator a delivery went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryChannel {
    Email,
    Roster,
}

impl DeliveryChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Roster => "roster",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "email" => Some(Self::Email),
            "roster" => Some(Self::Roster),
            _ => None,
        }
    }
}

/// What was asked of the collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryAction {
    Confirmation,
    Append,
    Update,
    Remove,
}

impl DeliveryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmation => "confirmation",
            Self::Append => "append",
            Self::Update => "update",
            Self::Remove => "remove",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "confirmation" => Some(Self::Confirmation),
            "append" => Some(Self::Append),
            "update" => Some(Self::Update),
            "remove" => Some(Self::Remove),
            _ => None,
        }
    }
}

/// One entry in the delivery log, written after every collaborator call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub id: DeliveryId,
    pub session_id: String,
    pub channel: DeliveryChannel,
    pub action: DeliveryAction,
    /// `true` if the collaborator accepted the call.
    pub delivered: bool,
    /// Error text for failed deliveries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl DeliveryRecord {
    pub fn delivered(session_id: &str, channel: DeliveryChannel, action: DeliveryAction) -> Self {
        Self {
            id: DeliveryId::new(),
            session_id: session_id.to_string(),
            channel,
            action,
            delivered: true,
            detail: None,
            recorded_at: Utc::now(),
        }
    }

    pub fn failed(
        session_id: &str,
        channel: DeliveryChannel,
        action: DeliveryAction,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            delivered: false,
            detail: Some(detail.into()),
            ..Self::delivered(session_id, channel, action)
        }
    }
}
