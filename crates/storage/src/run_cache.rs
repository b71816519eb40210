#![forbid(unsafe_code)]

use super::{SqliteStore, StoreError, root_key};
use pv_core::{Fingerprint, RunCache, RunRecord, StoreFault};
use rusqlite::{OptionalExtension, params};
use std::path::{Path, PathBuf};

impl SqliteStore {
    pub fn load_run(&self, root: &Path) -> Result<Option<RunRecord>, StoreError> {
        let key = root_key(root)?;
        let row = self
            .conn
            .query_row(
                r#"
                SELECT ran_at_ms, revision, dirty_signature, ok, exit_code, duration_ms, output_tail
                FROM run_cache
                WHERE root = ?1
                "#,
                params![key],
                |row| {
                    Ok(RunRecord {
                        root: PathBuf::from(key),
                        ran_at_ms: row.get(0)?,
                        fingerprint: Fingerprint::new(row.get(1)?, row.get(2)?),
                        ok: row.get::<_, i64>(3)? != 0,
                        exit_code: row.get(4)?,
                        duration_ms: row.get(5)?,
                        output_tail: row.get(6)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// Replaces the record for `record.root`. Readers see the old row or the new one.
    pub fn save_run(&self, record: &RunRecord) -> Result<(), StoreError> {
        let key = root_key(&record.root)?;
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            r#"
            INSERT INTO run_cache(root, ran_at_ms, revision, dirty_signature, ok, exit_code, duration_ms, output_tail)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(root) DO UPDATE SET
              ran_at_ms=excluded.ran_at_ms,
              revision=excluded.revision,
              dirty_signature=excluded.dirty_signature,
              ok=excluded.ok,
              exit_code=excluded.exit_code,
              duration_ms=excluded.duration_ms,
              output_tail=excluded.output_tail
            "#,
            params![
                key,
                record.ran_at_ms,
                record.fingerprint.revision,
                record.fingerprint.dirty_signature,
                i64::from(record.ok),
                record.exit_code,
                record.duration_ms,
                record.output_tail
            ],
        )?;
        tx.commit()?;
        Ok(())
    }
}

impl RunCache for SqliteStore {
    fn last_run(&self, root: &Path) -> Result<Option<RunRecord>, StoreFault> {
        Ok(self.load_run(root)?)
    }

    fn put_last_run(&self, record: &RunRecord) -> Result<(), StoreFault> {
        Ok(self.save_run(record)?)
    }
}
