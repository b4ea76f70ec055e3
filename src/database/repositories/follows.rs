use anyhow::Result;
use rusqlite::{params, Connection};

pub(super) struct SqliteFollowRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

impl<'conn> super::FollowRepository for SqliteFollowRepository<'conn> {
    fn add(&self, follower_id: &str, followee_id: &str, created_at: &str) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO follows (follower_id, followee_id, created_at)
            VALUES (?1, ?2, ?3)
            "#,
            params![follower_id, followee_id, created_at],
        )?;
        Ok(())
    }

    fn remove(&self, follower_id: &str, followee_id: &str) -> Result<()> {
        self.conn.execute(
            "DELETE FROM follows WHERE follower_id = ?1 AND followee_id = ?2",
            params![follower_id, followee_id],
        )?;
        Ok(())
    }

    fn is_following(&self, follower_id: &str, followee_id: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM follows WHERE follower_id = ?1 AND followee_id = ?2",
            params![follower_id, followee_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn following_of(&self, user_id: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT followee_id FROM follows
            WHERE follower_id = ?1
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

    fn followers_of(&self, user_id: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT follower_id FROM follows
            WHERE followee_id = ?1
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
