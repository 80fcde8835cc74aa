//! Confirmation e-mail over SMTP.

use lettre::message::header::ContentType;
use lettre::message::{Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use teamreg_shared::{EventConfig, Registration, Result, SmtpConfig, TeamRegError};

/// Sends the registration confirmation to all members of a team.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    event_name: String,
}

impl SmtpNotifier {
    /// Build a notifier from the `[smtp]` and `[event]` sections.
    ///
    /// Credentials are read from the environment variables named in the
    /// config. No connection is opened until the first send.
    pub fn from_config(smtp: &SmtpConfig, event: &EventConfig) -> Result<Self> {
        let username = read_env(&smtp.username_env)?;
        let password = read_env(&smtp.password_env)?;
        let credentials = Credentials::new(username, password);

        let builder = if smtp.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host).map_err(|e| {
                TeamRegError::config(format!("failed to create SMTP transport: {e}"))
            })?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&smtp.host)
        };
        let transport = builder.port(smtp.port).credentials(credentials).build();

        let address: Address = smtp.from_email.parse().map_err(|e| {
            TeamRegError::config(format!("invalid smtp.from_email '{}': {e}", smtp.from_email))
        })?;

        tracing::debug!(host = %smtp.host, port = smtp.port, "SMTP notifier configured");

        Ok(Self {
            transport,
            from: Mailbox::new(Some(smtp.from_name.clone()), address),
            event_name: event.name.clone(),
        })
    }

    /// Send the confirmation for a completed registration.
    #[tracing::instrument(skip_all, fields(session_id = %registration.session_id))]
    pub async fn send_confirmation(&self, registration: &Registration) -> Result<()> {
        let message = build_confirmation(registration, &self.from, &self.event_name)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| TeamRegError::Notification(format!("failed to send email: {e}")))?;

        tracing::info!(
            recipients = registration.members.len(),
            "confirmation email sent"
        );
        Ok(())
    }
}

fn read_env(var_name: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(TeamRegError::config(format!(
            "SMTP credentials not found. Set the {var_name} environment variable."
        ))),
    }
}

/// Build the plain-text confirmation message addressed to every member.
pub fn build_confirmation(
    registration: &Registration,
    from: &Mailbox,
    event_name: &str,
) -> Result<Message> {
    let team_name = registration
        .team_name
        .as_deref()
        .ok_or_else(|| TeamRegError::Notification("registration has no team name".into()))?;

    if registration.members.is_empty() {
        return Err(TeamRegError::Notification(
            "registration has no members to notify".into(),
        ));
    }

    let mut builder = Message::builder()
        .from(from.clone())
        .subject(format!("Registration confirmed: {team_name} ({event_name})"))
        .header(ContentType::TEXT_PLAIN);

    for member in &registration.members {
        let address: Address = member.email.trim().parse().map_err(|e| {
            TeamRegError::Notification(format!("invalid recipient '{}': {e}", member.email))
        })?;
        builder = builder.to(Mailbox::new(Some(member.full_name.clone()), address));
    }

    builder
        .body(confirmation_body(registration, team_name, event_name))
        .map_err(|e| TeamRegError::Notification(format!("failed to build email: {e}")))
}

fn confirmation_body(registration: &Registration, team_name: &str, event_name: &str) -> String {
    let mut body = format!(
        "Hello team {team_name},\n\nYour registration for {event_name} is complete.\n\n"
    );
    if let Some(batch) = &registration.team_batch {
        body.push_str(&format!("Batch: {batch}\n\n"));
    }
    for (i, member) in registration.members.iter().enumerate() {
        body.push_str(&format!(
            "Member {}: {} ({}) <{}>\n",
            i + 1,
            member.full_name,
            member.index_number,
            member.email
        ));
    }
    body.push_str("\nIf any of these details are wrong, reply to this e-mail.\n");
    body
}
