//! Turso Embedded / libSQL storage layer for registrations.
//!
//! The [`Storage`] struct wraps a libSQL database holding one JSON document
//! per registration, a key table enforcing global uniqueness of member
//! index numbers and e-mails, and the collaborator delivery log.
//!
//! **Write rules:**
//! - every save is a check-and-set on the stored `version`
//! - team names are unique case-insensitively (`team_key` column)
//! - a value owned by another session fails the save with
//!   [`TeamRegError::Conflict`]

mod migrations;

use std::path::Path;

use chrono::{DateTime, Utc};
use libsql::{Connection, Database, Transaction, params};
use teamreg_shared::{
    DeliveryAction, DeliveryChannel, DeliveryRecord, Field, MemberField, Registration, Result,
    TeamRegError,
};

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
    /// One libSQL connection is shared by all callers; transactions on it
    /// must not interleave.
    gate: tokio::sync::Mutex<()>,
}

/// Selection for [`Storage::list_registrations`].
#[derive(Debug, Clone, Default)]
pub struct RegistrationFilter {
    /// Only registrations in this state (`"DONE"`, `"MEMBER_DETAILS"`, ...).
    pub state: Option<String>,
}

/// Selection for [`Storage::list_deliveries`].
#[derive(Debug, Clone)]
pub struct DeliveryFilter {
    pub session_id: Option<String>,
    pub failed_only: bool,
    pub limit: u32,
}

impl Default for DeliveryFilter {
    fn default() -> Self {
        Self {
            session_id: None,
            failed_only: false,
            limit: 100,
        }
    }
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| TeamRegError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(db_err)?;

        let conn = db.connect().map_err(db_err)?;

        let storage = Self {
            db,
            conn,
            readonly: false,
            gate: tokio::sync::Mutex::new(()),
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open a database at `path` in read-only mode (for reporting commands).
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(db_err)?;

        let conn = db.connect().map_err(db_err)?;

        Ok(Self {
            db,
            conn,
            readonly: true,
            gate: tokio::sync::Mutex::new(()),
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        TeamRegError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(TeamRegError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Registration operations
    // -----------------------------------------------------------------------

    /// Load the registration for a session.
    pub async fn load_registration(&self, session_id: &str) -> Result<Option<Registration>> {
        let _gate = self.gate.lock().await;
        let mut rows = self
            .conn
            .query(
                "SELECT document, version FROM registrations WHERE session_id = ?1",
                params![session_id],
            )
            .await
            .map_err(db_err)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_registration(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(db_err(e)),
        }
    }

    /// Persist `registration` if its `version` still matches the stored one.
    ///
    /// Returns the saved document with the bumped version and timestamp.
    /// A version mismatch yields [`TeamRegError::StaleWrite`]; a team name,
    /// index number or e-mail owned by another session yields
    /// [`TeamRegError::Conflict`]. Nothing is written on failure.
    pub async fn save_registration(&self, registration: &Registration) -> Result<Registration> {
        self.check_writable()?;

        let mut saved = registration.clone();
        saved.version = registration.version + 1;
        saved.updated_at = Utc::now();

        let _gate = self.gate.lock().await;
        let tx = self.conn.transaction().await.map_err(db_err)?;
        match write_registration(&tx, registration.version, &saved).await {
            Ok(()) => {
                tx.commit().await.map_err(db_err)?;
                tracing::debug!(
                    session_id = %saved.session_id,
                    version = saved.version,
                    state = saved.state.label(),
                    "registration saved"
                );
                Ok(saved)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::warn!(error = %rollback, "rollback failed");
                }
                Err(e)
            }
        }
    }

    /// Delete a registration and release its member keys.
    /// Returns `false` if nothing was stored for the session.
    pub async fn delete_registration(&self, session_id: &str) -> Result<bool> {
        self.check_writable()?;
        let _gate = self.gate.lock().await;
        let tx = self.conn.transaction().await.map_err(db_err)?;
        tx.execute(
            "DELETE FROM member_keys WHERE session_id = ?1",
            params![session_id],
        )
        .await
        .map_err(db_err)?;
        let deleted = tx
            .execute(
                "DELETE FROM registrations WHERE session_id = ?1",
                params![session_id],
            )
            .await
            .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;
        Ok(deleted > 0)
    }

    /// List registrations, oldest first.
    pub async fn list_registrations(
        &self,
        filter: &RegistrationFilter,
    ) -> Result<Vec<Registration>> {
        let _gate = self.gate.lock().await;
        let mut rows = match &filter.state {
            Some(state) => self
                .conn
                .query(
                    "SELECT document, version FROM registrations
                     WHERE state = ?1 ORDER BY created_at",
                    params![state.as_str()],
                )
                .await
                .map_err(db_err)?,
            None => self
                .conn
                .query(
                    "SELECT document, version FROM registrations ORDER BY created_at",
                    params![],
                )
                .await
                .map_err(db_err)?,
        };

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_registration(&row)?);
        }
        Ok(results)
    }

    /// Number of registrations per state label.
    pub async fn state_counts(&self) -> Result<Vec<(String, u64)>> {
        let _gate = self.gate.lock().await;
        let mut rows = self
            .conn
            .query(
                "SELECT state, COUNT(*) FROM registrations GROUP BY state ORDER BY state",
                params![],
            )
            .await
            .map_err(db_err)?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            let state: String = row.get(0).map_err(db_err)?;
            let count: i64 = row.get(1).map_err(db_err)?;
            results.push((state, count as u64));
        }
        Ok(results)
    }

    // -----------------------------------------------------------------------
    // Delivery log
    // -----------------------------------------------------------------------

    /// Append a collaborator delivery outcome.
    pub async fn record_delivery(&self, record: &DeliveryRecord) -> Result<()> {
        self.check_writable()?;
        let id = record.id.to_string();
        let _gate = self.gate.lock().await;
        self.conn
            .execute(
                "INSERT INTO deliveries (id, session_id, channel, action, delivered, detail, recorded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    id.as_str(),
                    record.session_id.as_str(),
                    record.channel.as_str(),
                    record.action.as_str(),
                    i64::from(record.delivered),
                    record.detail.as_deref(),
                    record.recorded_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Most recent deliveries first.
    pub async fn list_deliveries(&self, filter: &DeliveryFilter) -> Result<Vec<DeliveryRecord>> {
        let failed_only = i64::from(filter.failed_only);
        let _gate = self.gate.lock().await;
        let mut rows = self
            .conn
            .query(
                "SELECT id, session_id, channel, action, delivered, detail, recorded_at
                 FROM deliveries
                 WHERE (?1 IS NULL OR session_id = ?1) AND (?2 = 0 OR delivered = 0)
                 ORDER BY recorded_at DESC, id DESC
                 LIMIT ?3",
                params![
                    filter.session_id.as_deref(),
                    failed_only,
                    i64::from(filter.limit)
                ],
            )
            .await
            .map_err(db_err)?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_delivery(&row)?);
        }
        Ok(results)
    }
}

/// Body of [`Storage::save_registration`], run inside one transaction.
async fn write_registration(
    tx: &Transaction,
    expected_version: u64,
    saved: &Registration,
) -> Result<()> {
    let session_id = saved.session_id.as_str();
    let team_key = saved.team_key();

    if let (Some(key), Some(name)) = (&team_key, &saved.team_name) {
        let mut rows = tx
            .query(
                "SELECT 1 FROM registrations WHERE team_key = ?1 AND session_id != ?2",
                params![key.as_str(), session_id],
            )
            .await
            .map_err(db_err)?;
        if let Ok(Some(_)) = rows.next().await {
            return Err(TeamRegError::conflict(Field::TeamName, name.trim()));
        }
    }

    let document = serde_json::to_string(saved)
        .map_err(|e| TeamRegError::validation(format!("unserializable registration: {e}")))?;

    let written = if expected_version == 0 {
        tx.execute(
            "INSERT INTO registrations (session_id, team_key, state, version, document, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(session_id) DO NOTHING",
            params![
                session_id,
                team_key.as_deref(),
                saved.state.label(),
                saved.version as i64,
                document.as_str(),
                saved.created_at.to_rfc3339(),
                saved.updated_at.to_rfc3339(),
            ],
        )
        .await
    } else {
        tx.execute(
            "UPDATE registrations
             SET team_key = ?1, state = ?2, version = ?3, document = ?4, updated_at = ?5
             WHERE session_id = ?6 AND version = ?7",
            params![
                team_key.as_deref(),
                saved.state.label(),
                saved.version as i64,
                document.as_str(),
                saved.updated_at.to_rfc3339(),
                session_id,
                expected_version as i64,
            ],
        )
        .await
    }
    .map_err(|e| map_unique_violation(e, session_id))?;

    if written == 0 {
        return Err(TeamRegError::StaleWrite {
            session_id: session_id.to_string(),
        });
    }

    tx.execute(
        "DELETE FROM member_keys WHERE session_id = ?1",
        params![session_id],
    )
    .await
    .map_err(db_err)?;

    for (field, value) in saved.identity_keys() {
        let field_name = member_field_key(field);
        let mut rows = tx
            .query(
                "SELECT 1 FROM member_keys WHERE field = ?1 AND value = ?2 AND session_id != ?3",
                params![field_name, value.as_str(), session_id],
            )
            .await
            .map_err(db_err)?;
        if let Ok(Some(_)) = rows.next().await {
            let shown = original_value(saved, field, &value);
            return Err(TeamRegError::conflict(Field::Member(field), shown));
        }

        tx.execute(
            "INSERT INTO member_keys (field, value, session_id) VALUES (?1, ?2, ?3)
             ON CONFLICT(field, value) DO NOTHING",
            params![field_name, value.as_str(), session_id],
        )
        .await
        .map_err(|e| map_unique_violation(e, session_id))?;
    }

    Ok(())
}

fn member_field_key(field: MemberField) -> &'static str {
    match field {
        MemberField::FullName => "fullName",
        MemberField::IndexNumber => "indexNumber",
        MemberField::Email => "email",
    }
}

/// The value as the user typed it, for error messages.
fn original_value(reg: &Registration, field: MemberField, key: &str) -> String {
    reg.members
        .iter()
        .map(|m| m.get(field))
        .chain(reg.staged_member().and_then(|s| s.get(field)))
        .find(|v| v.trim().to_lowercase() == key)
        .unwrap_or(key)
        .trim()
        .to_string()
}

fn db_err(e: libsql::Error) -> TeamRegError {
    TeamRegError::Storage(e.to_string())
}

/// Unique violations that slip past the explicit checks mean another writer
/// committed between our check and our write: report a retryable stale write.
fn map_unique_violation(e: libsql::Error, session_id: &str) -> TeamRegError {
    if e.to_string().contains("UNIQUE constraint failed") {
        TeamRegError::StaleWrite {
            session_id: session_id.to_string(),
        }
    } else {
        db_err(e)
    }
}

/// Convert a `(document, version)` row to a [`Registration`].
fn row_to_registration(row: &libsql::Row) -> Result<Registration> {
    let document: String = row.get(0).map_err(db_err)?;
    let version: i64 = row.get(1).map_err(db_err)?;
    let mut registration: Registration = serde_json::from_str(&document)
        .map_err(|e| TeamRegError::validation(format!("malformed registration document: {e}")))?;
    registration.version = version as u64;
    Ok(registration)
}

/// Convert a `deliveries` row to a [`DeliveryRecord`].
fn row_to_delivery(row: &libsql::Row) -> Result<DeliveryRecord> {
    let id: String = row.get(0).map_err(db_err)?;
    let channel: String = row.get(2).map_err(db_err)?;
    let action: String = row.get(3).map_err(db_err)?;
    let recorded_at: String = row.get(6).map_err(db_err)?;

    Ok(DeliveryRecord {
        id: id
            .parse()
            .map_err(|e| TeamRegError::Storage(format!("invalid delivery id: {e}")))?,
        session_id: row.get::<String>(1).map_err(db_err)?,
        channel: DeliveryChannel::parse(&channel)
            .ok_or_else(|| TeamRegError::Storage(format!("unknown channel '{channel}'")))?,
        action: DeliveryAction::parse(&action)
            .ok_or_else(|| TeamRegError::Storage(format!("unknown action '{action}'")))?,
        delivered: row.get::<i64>(4).map_err(db_err)? != 0,
        detail: row.get::<String>(5).ok(),
        recorded_at: DateTime::parse_from_rfc3339(&recorded_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| TeamRegError::Storage(format!("invalid date: {e}")))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use teamreg_shared::{Member, RegistrationState, StagedMember};
    use uuid::Uuid;

    /// Create a temp file storage for testing.
    async fn test_storage() -> Storage {
        let tmp = std::env::temp_dir().join(format!("tr_test_{}.db", Uuid::now_v7()));
        Storage::open(&tmp).await.expect("open test db")
    }

    fn member(name: &str, index: &str, email: &str) -> Member {
        Member {
            full_name: name.into(),
            index_number: index.into(),
            batch: "23".into(),
            email: email.into(),
        }
    }

    fn team(session: &str, name: &str) -> Registration {
        let mut reg = Registration::new(session);
        reg.team_name = Some(name.into());
        reg.state = RegistrationState::BatchSelection;
        reg
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let storage = test_storage().await;
        let version = storage.get_schema_version().await;
        assert_eq!(version, 2);
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let tmp = std::env::temp_dir().join(format!("tr_test_{}.db", Uuid::now_v7()));
        let _s1 = Storage::open(&tmp).await.expect("first open");
        drop(_s1);
        let s2 = Storage::open(&tmp).await.expect("second open");
        assert_eq!(s2.get_schema_version().await, 2);
    }

    #[tokio::test]
    async fn save_load_and_version_bump() {
        let storage = test_storage().await;
        assert!(storage.load_registration("s1").await.unwrap().is_none());

        let saved = storage
            .save_registration(&team("s1", "Phoenix"))
            .await
            .expect("first save");
        assert_eq!(saved.version, 1);

        let loaded = storage.load_registration("s1").await.unwrap().expect("stored");
        assert_eq!(loaded.team_name.as_deref(), Some("Phoenix"));
        assert_eq!(loaded.state, RegistrationState::BatchSelection);
        assert_eq!(loaded.version, 1);

        let mut next = loaded.clone();
        next.team_batch = Some("23".into());
        next.state = RegistrationState::member(1);
        let saved = storage.save_registration(&next).await.expect("second save");
        assert_eq!(saved.version, 2);
    }

    #[tokio::test]
    async fn stale_version_is_rejected() {
        let storage = test_storage().await;
        let first = storage.save_registration(&team("s1", "Phoenix")).await.unwrap();

        let mut winner = first.clone();
        winner.team_batch = Some("23".into());
        storage.save_registration(&winner).await.expect("winner");

        let mut loser = first;
        loser.team_batch = Some("24".into());
        let err = storage.save_registration(&loser).await.unwrap_err();
        assert!(matches!(err, TeamRegError::StaleWrite { .. }));

        let stored = storage.load_registration("s1").await.unwrap().unwrap();
        assert_eq!(stored.team_batch.as_deref(), Some("23"));
    }

    #[tokio::test]
    async fn concurrent_first_save_is_stale() {
        let storage = test_storage().await;
        storage.save_registration(&Registration::new("s1")).await.unwrap();
        let err = storage
            .save_registration(&Registration::new("s1"))
            .await
            .unwrap_err();
        assert!(matches!(err, TeamRegError::StaleWrite { .. }));
    }

    #[tokio::test]
    async fn team_names_are_unique_case_insensitively() {
        let storage = test_storage().await;
        storage.save_registration(&team("s1", "Phoenix")).await.unwrap();

        let err = storage
            .save_registration(&team("s2", "  PHOENIX "))
            .await
            .unwrap_err();
        match err {
            TeamRegError::Conflict { field, value } => {
                assert_eq!(field, Field::TeamName);
                assert_eq!(value, "PHOENIX");
            }
            other => panic!("expected conflict, got {other:?}"),
        }
        assert!(storage.load_registration("s2").await.unwrap().is_none());

        // Re-saving the owner with the same name is fine
        let own = storage.load_registration("s1").await.unwrap().unwrap();
        storage.save_registration(&own).await.expect("owner re-save");
    }

    #[tokio::test]
    async fn member_keys_are_global() {
        let storage = test_storage().await;
        let mut first = team("s1", "Phoenix");
        first.members.push(member("Ann", "234001T", "ann@example.com"));
        storage.save_registration(&first).await.unwrap();

        let mut second = team("s2", "Bolt");
        second.state = RegistrationState::MemberDetails {
            member_number: 1,
            pending: MemberField::Email,
            staged: StagedMember {
                full_name: Some("Ben".into()),
                index_number: Some("234001T".into()),
                email: None,
            },
        };
        let err = storage.save_registration(&second).await.unwrap_err();
        assert!(matches!(
            err,
            TeamRegError::Conflict {
                field: Field::Member(MemberField::IndexNumber),
                ..
            }
        ));

        let mut third = team("s3", "Comet");
        third.members.push(member("Cara", "234003V", "ANN@example.com"));
        let err = storage.save_registration(&third).await.unwrap_err();
        match err {
            TeamRegError::Conflict { field, value } => {
                assert_eq!(field, Field::Member(MemberField::Email));
                assert_eq!(value, "ANN@example.com");
            }
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn delete_releases_keys() {
        let storage = test_storage().await;
        let mut first = team("s1", "Phoenix");
        first.members.push(member("Ann", "234001T", "ann@example.com"));
        storage.save_registration(&first).await.unwrap();

        assert!(storage.delete_registration("s1").await.unwrap());
        assert!(!storage.delete_registration("s1").await.unwrap());

        let mut again = team("s2", "Phoenix");
        again.members.push(member("Ann", "234001T", "ann@example.com"));
        storage.save_registration(&again).await.expect("keys released");
    }

    #[tokio::test]
    async fn list_and_count_by_state() {
        let storage = test_storage().await;
        storage.save_registration(&team("s1", "Phoenix")).await.unwrap();
        storage.save_registration(&team("s2", "Bolt")).await.unwrap();
        storage.save_registration(&Registration::new("s3")).await.unwrap();

        let all = storage
            .list_registrations(&RegistrationFilter::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 3);

        let batch = storage
            .list_registrations(&RegistrationFilter {
                state: Some("BATCH_SELECTION".into()),
            })
            .await
            .unwrap();
        assert_eq!(batch.len(), 2);

        let counts = storage.state_counts().await.unwrap();
        assert_eq!(
            counts,
            vec![("BATCH_SELECTION".to_string(), 2), ("WELCOME".to_string(), 1)]
        );
    }

    #[tokio::test]
    async fn delivery_log() {
        let storage = test_storage().await;
        storage
            .record_delivery(&DeliveryRecord::delivered(
                "s1",
                DeliveryChannel::Email,
                DeliveryAction::Confirmation,
            ))
            .await
            .expect("record ok");
        storage
            .record_delivery(&DeliveryRecord::failed(
                "s1",
                DeliveryChannel::Roster,
                DeliveryAction::Append,
                "HTTP 500",
            ))
            .await
            .expect("record failure");

        let all = storage.list_deliveries(&DeliveryFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let failed = storage
            .list_deliveries(&DeliveryFilter {
                failed_only: true,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].channel, DeliveryChannel::Roster);
        assert_eq!(failed[0].detail.as_deref(), Some("HTTP 500"));

        let other = storage
            .list_deliveries(&DeliveryFilter {
                session_id: Some("s2".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn readonly_rejects_writes() {
        let tmp = std::env::temp_dir().join(format!("tr_test_{}.db", Uuid::now_v7()));
        let rw = Storage::open(&tmp).await.unwrap();
        rw.save_registration(&team("s1", "Phoenix")).await.unwrap();
        drop(rw);

        let ro = Storage::open_readonly(&tmp).await.unwrap();
        assert!(ro.load_registration("s1").await.unwrap().is_some());
        let result = ro.save_registration(&team("s2", "Bolt")).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("read-only"));
    }
}
