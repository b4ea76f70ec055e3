use crate::database::models::PostRecord;
use anyhow::Result;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

pub(super) struct SqlitePostRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

const COLUMNS: &str = "id, user_id, content, image_urls, post_type, created_at";

// image_urls is stored as a JSON array in a TEXT column.
fn map_row(row: &Row<'_>) -> rusqlite::Result<PostRecord> {
    let raw_urls: String = row.get(3)?;
    Ok(PostRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        content: row.get(2)?,
        image_urls: serde_json::from_str(&raw_urls).unwrap_or_default(),
        post_type: row.get(4)?,
        created_at: row.get(5)?,
    })
}

impl<'conn> super::PostRepository for SqlitePostRepository<'conn> {
    fn create(&self, record: &PostRecord) -> Result<()> {
        let image_urls = serde_json::to_string(&record.image_urls)?;
        self.conn.execute(
            r#"
            INSERT INTO posts (id, user_id, content, image_urls, post_type, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                record.id,
                record.user_id,
                record.content,
                image_urls,
                record.post_type,
                record.created_at
            ],
        )?;
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<PostRecord>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM posts WHERE id = ?1"),
                params![id],
                map_row,
            )
            .optional()?)
    }

    fn list_for_authors(&self, author_ids: &[String]) -> Result<Vec<PostRecord>> {
        if author_ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; author_ids.len()].join(", ");
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {COLUMNS} FROM posts
            WHERE user_id IN ({placeholders})
            -- RFC 3339 at a fixed offset sorts lexicographically, keeping
            -- sub-second ordering that datetime() would truncate away.
            ORDER BY created_at DESC
            "#
        ))?;
        let rows = stmt.query_map(params_from_iter(author_ids.iter()), map_row)?;
        let mut posts = Vec::new();
        for row in rows {
            posts.push(row?);
        }
        Ok(posts)
    }

    fn add_like(&self, post_id: &str, user_id: &str, created_at: &str) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO post_likes (post_id, user_id, created_at)
            VALUES (?1, ?2, ?3)
            "#,
            params![post_id, user_id, created_at],
        )?;
        Ok(())
    }

    fn remove_like(&self, post_id: &str, user_id: &str) -> Result<()> {
        self.conn.execute(
            "DELETE FROM post_likes WHERE post_id = ?1 AND user_id = ?2",
            params![post_id, user_id],
        )?;
        Ok(())
    }

    fn has_liked(&self, post_id: &str, user_id: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM post_likes WHERE post_id = ?1 AND user_id = ?2",
            params![post_id, user_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn likers_of(&self, post_id: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT user_id FROM post_likes
            WHERE post_id = ?1
            ORDER BY datetime(created_at) ASC
            "#,
        )?;
        let rows = stmt.query_map(params![post_id], |row| row.get::<_, String>(0))?;
        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok(ids)
    }
}
