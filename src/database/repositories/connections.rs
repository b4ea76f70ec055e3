use anyhow::Result;
use rusqlite::{params, Connection};

pub(super) struct SqliteConnectionRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

/// The edge is owned by neither endpoint, so the pair is stored once in
/// lexicographic order.
fn normalize<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

impl<'conn> super::ConnectionRepository for SqliteConnectionRepository<'conn> {
    fn add(&self, user_id: &str, other_id: &str, created_at: &str) -> Result<()> {
        let (user_a, user_b) = normalize(user_id, other_id);
        self.conn.execute(
            r#"
            INSERT INTO connections (user_a, user_b, created_at)
            VALUES (?1, ?2, ?3)
            "#,
            params![user_a, user_b, created_at],
        )?;
        Ok(())
    }

    fn are_connected(&self, user_id: &str, other_id: &str) -> Result<bool> {
        let (user_a, user_b) = normalize(user_id, other_id);
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM connections WHERE user_a = ?1 AND user_b = ?2",
            params![user_a, user_b],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn peers_of(&self, user_id: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT CASE WHEN user_a = ?1 THEN user_b ELSE user_a END
            FROM connections
            WHERE user_a = ?1 OR user_b = ?1
            ORDER BY datetime(created_at) ASC
            "#,
        )?;
        let rows = stmt.query_map(params![user_id], |row| row.get::<_, String>(0))?;
        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok(ids)
    }
}
