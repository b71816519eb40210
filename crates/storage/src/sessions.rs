#![forbid(unsafe_code)]

use super::{SqliteStore, StoreError, root_key};
use pv_core::{BaselineStore, Fingerprint, Session, StoreFault};
use rusqlite::{OptionalExtension, params};
use std::path::PathBuf;

impl SqliteStore {
    /// Inserts the session's baseline. Returns `false` when one is already recorded.
    pub fn insert_session(&self, session: &Session) -> Result<bool, StoreError> {
        if session.session_id.trim().is_empty() {
            return Err(StoreError::InvalidInput("session_id must not be empty"));
        }
        let root = root_key(&session.root)?;
        let (is_repo, revision, dirty_signature) = match session.baseline.as_ref() {
            Some(fp) => (1i64, fp.revision.as_deref(), fp.dirty_signature.as_deref()),
            None => (0i64, None, None),
        };
        let inserted = self.conn.execute(
            r#"
            INSERT OR IGNORE INTO sessions(session_id, root, started_at_ms, is_repo, revision, dirty_signature)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                session.session_id,
                root,
                session.started_at_ms,
                is_repo,
                revision,
                dirty_signature
            ],
        )?;
        Ok(inserted > 0)
    }

    pub fn session(&self, session_id: &str) -> Result<Option<Session>, StoreError> {
        let row = self
            .conn
            .query_row(
                r#"
                SELECT root, started_at_ms, is_repo, revision, dirty_signature
                FROM sessions
                WHERE session_id = ?1
                "#,
                params![session_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, Option<String>>(4)?,
                    ))
                },
            )
            .optional()?;
        Ok(
            row.map(|(root, started_at_ms, is_repo, revision, dirty_signature)| Session {
                session_id: session_id.to_string(),
                root: PathBuf::from(root),
                started_at_ms,
                baseline: (is_repo != 0).then(|| Fingerprint::new(revision, dirty_signature)),
            }),
        )
    }
}

impl BaselineStore for SqliteStore {
    fn record_baseline(&self, session: &Session) -> Result<bool, StoreFault> {
        Ok(self.insert_session(session)?)
    }

    fn baseline(&self, session_id: &str) -> Result<Option<Session>, StoreFault> {
        Ok(self.session(session_id)?)
    }
}
