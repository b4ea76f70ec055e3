//! Profile reads and self-service profile updates.

use crate::database::models::UserRecord;
use crate::database::repositories::UserRepository;
use crate::database::Database;
use crate::error::DomainError;
use crate::media::{self, MediaService};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub profile_picture: Option<String>,
    pub cover_photo: Option<String>,
    pub created_at: String,
}

impl UserView {
    pub fn from_record(record: UserRecord) -> Self {
        Self {
            id: record.id,
            username: record.username,
            email: record.email,
            full_name: record.full_name,
            bio: record.bio,
            location: record.location,
            profile_picture: record.profile_picture,
            cover_photo: record.cover_photo,
            created_at: record.created_at,
        }
    }
}

/// Fields absent from the request keep their stored values.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfileInput {
    pub username: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub full_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub data: Vec<u8>,
    pub file_name: String,
}

#[derive(Clone)]
pub struct UserService {
    database: Database,
    media: MediaService,
}

impl UserService {
    pub fn new(database: Database, media: MediaService) -> Self {
        Self { database, media }
    }

    pub fn get_user(&self, id: &str) -> Result<UserView, DomainError> {
        let record = self
            .database
            .with_repositories(|repos| repos.users().get(id))?
            .ok_or_else(|| DomainError::not_found("user not found"))?;
        Ok(UserView::from_record(record))
    }

    pub async fn update_profile(
        &self,
        caller_id: &str,
        input: UpdateProfileInput,
        profile_image: Option<ImageUpload>,
        cover_image: Option<ImageUpload>,
    ) -> Result<UserView, DomainError> {
        let mut record = self
            .database
            .with_repositories(|repos| repos.users().get(caller_id))?
            .ok_or_else(|| DomainError::not_found("user not found"))?;

        if let Some(requested) = input
            .username
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
        {
            // A username held by someone else silently falls back to the
            // caller's current one.
            if requested != record.username {
                let taken = self
                    .database
                    .with_repositories(|repos| repos.users().username_taken(requested))?;
                if !taken {
                    record.username = requested.to_string();
                }
            }
        }
        if let Some(bio) = input.bio {
            record.bio = Some(bio);
        }
        if let Some(location) = input.location {
            record.location = Some(location);
        }
        if let Some(full_name) = input.full_name.filter(|name| !name.trim().is_empty()) {
            record.full_name = full_name;
        }

        if let Some(image) = profile_image {
            let uploaded = self.media.upload(image.data, &image.file_name).await?;
            record.profile_picture = Some(MediaService::transformed_url(
                &uploaded.url,
                &media::PROFILE_PICTURE,
            ));
        }
        if let Some(image) = cover_image {
            let uploaded = self.media.upload(image.data, &image.file_name).await?;
            record.cover_photo = Some(MediaService::transformed_url(
                &uploaded.url,
                &media::COVER_PHOTO,
            ));
        }

        self.database
            .with_repositories(|repos| repos.users().update(&record))?;
        Ok(UserView::from_record(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MediaConfig;
    use crate::utils::now_utc_iso;
    use rusqlite::Connection;

    fn setup() -> (UserService, Database) {
        let conn = Connection::open_in_memory().expect("in-memory db");
        let db = Database::from_connection(conn, true);
        db.ensure_migrations().expect("migrations");
        let media = MediaService::new(MediaConfig::default(), reqwest::Client::new());
        (UserService::new(db.clone(), media), db)
    }

    fn seed_user(db: &Database, id: &str, username: &str) {
        db.with_repositories(|repos| {
            repos.users().create(&UserRecord {
                id: id.into(),
                username: username.into(),
                email: format!("{username}@example.com"),
                full_name: username.into(),
                bio: None,
                location: None,
                profile_picture: None,
                cover_photo: None,
                created_at: now_utc_iso(),
            })
        })
        .expect("seed user");
    }

    #[tokio::test]
    async fn update_applies_provided_fields_only() {
        let (service, db) = setup();
        seed_user(&db, "u1", "alice");

        let view = service
            .update_profile(
                "u1",
                UpdateProfileInput {
                    bio: Some("hello".into()),
                    location: Some("berlin".into()),
                    ..Default::default()
                },
                None,
                None,
            )
            .await
            .expect("update");

        assert_eq!(view.username, "alice");
        assert_eq!(view.bio.as_deref(), Some("hello"));
        assert_eq!(view.location.as_deref(), Some("berlin"));
    }

    #[tokio::test]
    async fn taken_username_falls_back_to_current_one() {
        let (service, db) = setup();
        seed_user(&db, "u1", "alice");
        seed_user(&db, "u2", "bob");

        let view = service
            .update_profile(
                "u2",
                UpdateProfileInput {
                    username: Some("alice".into()),
                    ..Default::default()
                },
                None,
                None,
            )
            .await
            .expect("update");
        assert_eq!(view.username, "bob");

        let view = service
            .update_profile(
                "u2",
                UpdateProfileInput {
                    username: Some("bobby".into()),
                    ..Default::default()
                },
                None,
                None,
            )
            .await
            .expect("update");
        assert_eq!(view.username, "bobby");
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let (service, _db) = setup();
        assert!(matches!(
            service
                .update_profile("ghost", UpdateProfileInput::default(), None, None)
                .await,
            Err(DomainError::NotFound(_))
        ));
    }
}
