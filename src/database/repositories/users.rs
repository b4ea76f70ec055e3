use crate::database::models::UserRecord;
use anyhow::Result;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

pub(super) struct SqliteUserRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

const COLUMNS: &str =
    "id, username, email, full_name, bio, location, profile_picture, cover_photo, created_at";

fn map_row(row: &Row<'_>) -> rusqlite::Result<UserRecord> {
    Ok(UserRecord {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        full_name: row.get(3)?,
        bio: row.get(4)?,
        location: row.get(5)?,
        profile_picture: row.get(6)?,
        cover_photo: row.get(7)?,
        created_at: row.get(8)?,
    })
}

impl<'conn> super::UserRepository for SqliteUserRepository<'conn> {
    fn create(&self, record: &UserRecord) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO users (id, username, email, full_name, bio, location, profile_picture, cover_photo, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                record.id,
                record.username,
                record.email,
                record.full_name,
                record.bio,
                record.location,
                record.profile_picture,
                record.cover_photo,
                record.created_at
            ],
        )?;
        Ok(())
    }

    fn update(&self, record: &UserRecord) -> Result<()> {
        self.conn.execute(
            r#"
            UPDATE users
            SET username = ?2,
                email = ?3,
                full_name = ?4,
                bio = ?5,
                location = ?6,
                profile_picture = ?7,
                cover_photo = ?8
            WHERE id = ?1
            "#,
            params![
                record.id,
                record.username,
                record.email,
                record.full_name,
                record.bio,
                record.location,
                record.profile_picture,
                record.cover_photo
            ],
        )?;
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<UserRecord>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM users WHERE id = ?1"),
                params![id],
                map_row,
            )
            .optional()?)
    }

    fn get_many(&self, ids: &[String]) -> Result<Vec<UserRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM users WHERE id IN ({placeholders}) ORDER BY username ASC"
        ))?;
        let rows = stmt.query_map(params_from_iter(ids.iter()), map_row)?;
        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }

    fn username_taken(&self, username: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM users WHERE username = ?1",
            params![username],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn delete(&self, id: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM users WHERE id = ?1", params![id])?;
        Ok(())
    }

    fn search(&self, query: &str, exclude_id: &str) -> Result<Vec<UserRecord>> {
        // ESCAPE so a literal % or _ in the query cannot widen the match.
        let pattern = format!(
            "%{}%",
            query
                .replace('\\', "\\\\")
                .replace('%', "\\%")
                .replace('_', "\\_")
                .to_lowercase()
        );
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {COLUMNS} FROM users
            WHERE id != ?1
              AND (lower(username) LIKE ?2 ESCAPE '\'
                OR lower(email) LIKE ?2 ESCAPE '\'
                OR lower(full_name) LIKE ?2 ESCAPE '\'
                OR lower(coalesce(location, '')) LIKE ?2 ESCAPE '\')
            ORDER BY username ASC
            "#
        ))?;
        let rows = stmt.query_map(params![exclude_id, pattern], map_row)?;
        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }
}
