use crate::database::models::{ConnectionRequestRecord, RequestStatus};
use anyhow::{anyhow, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};

pub(super) struct SqliteConnectionRequestRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

const COLUMNS: &str = "id, from_user_id, to_user_id, status, created_at";

fn map_row(row: &Row<'_>) -> rusqlite::Result<ConnectionRequestRecord> {
    let status: String = row.get(3)?;
    Ok(ConnectionRequestRecord {
        id: row.get(0)?,
        from_user_id: row.get(1)?,
        to_user_id: row.get(2)?,
        status: RequestStatus::parse(&status).unwrap_or(RequestStatus::Pending),
        created_at: row.get(4)?,
    })
}

impl<'conn> super::ConnectionRequestRepository for SqliteConnectionRequestRepository<'conn> {
    fn create(&self, record: &ConnectionRequestRecord) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO connection_requests (id, from_user_id, to_user_id, status, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                record.id,
                record.from_user_id,
                record.to_user_id,
                record.status.as_str(),
                record.created_at
            ],
        )?;
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<ConnectionRequestRecord>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM connection_requests WHERE id = ?1"),
                params![id],
                map_row,
            )
            .optional()?)
    }

    fn find_between(&self, a: &str, b: &str) -> Result<Option<ConnectionRequestRecord>> {
        Ok(self
            .conn
            .query_row(
                &format!(
                    r#"
                    SELECT {COLUMNS} FROM connection_requests
                    WHERE (from_user_id = ?1 AND to_user_id = ?2)
                       OR (from_user_id = ?2 AND to_user_id = ?1)
                    LIMIT 1
                    "#
                ),
                params![a, b],
                map_row,
            )
            .optional()?)
    }

    fn find_pending(&self, from: &str, to: &str) -> Result<Option<ConnectionRequestRecord>> {
        Ok(self
            .conn
            .query_row(
                &format!(
                    r#"
                    SELECT {COLUMNS} FROM connection_requests
                    WHERE from_user_id = ?1 AND to_user_id = ?2 AND status = 'pending'
                    "#
                ),
                params![from, to],
                map_row,
            )
            .optional()?)
    }

    fn mark_accepted(&self, id: &str) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE connection_requests SET status = 'accepted' WHERE id = ?1",
            params![id],
        )?;
        if changed == 0 {
            return Err(anyhow!("connection request {id} not found"));
        }
        Ok(())
    }

    fn count_from_since(&self, from: &str, since: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            r#"
            SELECT COUNT(*) FROM connection_requests
            WHERE from_user_id = ?1 AND datetime(created_at) >= datetime(?2)
            "#,
            params![from, since],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn pending_to(&self, user_id: &str) -> Result<Vec<ConnectionRequestRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {COLUMNS} FROM connection_requests
            WHERE to_user_id = ?1 AND status = 'pending'
            ORDER BY datetime(created_at) ASC
            "#
        ))?;
        let rows = stmt.query_map(params![user_id], map_row)?;
        let mut requests = Vec::new();
        for row in rows {
            requests.push(row?);
        }
        Ok(requests)
    }
}
