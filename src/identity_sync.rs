//! Mirrors the external identity provider's user lifecycle into the user
//! directory. Three independent handlers, one per event type; deletion relies
//! on the schema's cascading foreign keys to scrub the social graph.

use crate::database::models::UserRecord;
use crate::database::repositories::UserRepository;
use crate::database::Database;
use crate::error::DomainError;
use crate::users::UserView;
use crate::utils::now_utc_iso;
use anyhow::anyhow;
use rand::Rng;
use serde::Deserialize;

pub const EVENT_USER_CREATED: &str = "user.created";
pub const EVENT_USER_UPDATED: &str = "user.updated";
pub const EVENT_USER_DELETED: &str = "user.deleted";

const USERNAME_SUFFIX_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, Deserialize)]
pub struct IdentityEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: IdentityUserData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdentityUserData {
    pub id: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email_addresses: Vec<EmailEntry>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailEntry {
    pub email_address: String,
}

impl IdentityUserData {
    fn primary_email(&self) -> Option<&str> {
        self.email_addresses
            .first()
            .map(|entry| entry.email_address.as_str())
    }

    fn display_name(&self) -> String {
        let first = self.first_name.as_deref().unwrap_or("");
        let last = self.last_name.as_deref().unwrap_or("");
        format!("{first} {last}").trim().to_string()
    }
}

#[derive(Clone)]
pub struct IdentitySyncService {
    database: Database,
}

impl IdentitySyncService {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    pub fn on_created(&self, data: &IdentityUserData) -> Result<UserView, DomainError> {
        let email = data
            .primary_email()
            .ok_or_else(|| DomainError::invalid("identity event carries no email address"))?
            .to_string();
        let candidate = email.split('@').next().unwrap_or_default().to_string();
        if candidate.is_empty() {
            return Err(DomainError::invalid("email has no local part"));
        }

        let record = self.database.with_transaction(|repos| {
            let username = resolve_username(&repos.users(), &candidate)?;
            let record = UserRecord {
                id: data.id.clone(),
                username,
                email: email.clone(),
                full_name: data.display_name(),
                bio: None,
                location: None,
                profile_picture: data.image_url.clone(),
                cover_photo: None,
                created_at: now_utc_iso(),
            };
            repos.users().create(&record)?;
            Ok(record)
        })?;

        tracing::info!(user_id = %record.id, username = %record.username, "synced created user");
        Ok(UserView::from_record(record))
    }

    pub fn on_updated(&self, data: &IdentityUserData) -> Result<UserView, DomainError> {
        let record = self.database.with_repositories(|repos| {
            let Some(mut record) = repos.users().get(&data.id)? else {
                return Ok(None);
            };
            if let Some(email) = data.primary_email() {
                record.email = email.to_string();
            }
            let name = data.display_name();
            if !name.is_empty() {
                record.full_name = name;
            }
            if data.image_url.is_some() {
                record.profile_picture = data.image_url.clone();
            }
            repos.users().update(&record)?;
            Ok(Some(record))
        })?;
        let record = record.ok_or_else(|| DomainError::not_found("user not found"))?;
        tracing::info!(user_id = %record.id, "synced updated user");
        Ok(UserView::from_record(record))
    }

    pub fn on_deleted(&self, user_id: &str) -> Result<(), DomainError> {
        self.database
            .with_transaction(|repos| repos.users().delete(user_id))?;
        tracing::info!(user_id = %user_id, "synced deleted user");
        Ok(())
    }
}

/// Uses the email local part as-is when free; otherwise retries with a random
/// 0-9999 suffix. The unique index on `users.username` is the backstop if
/// every attempt collides.
fn resolve_username(users: &impl UserRepository, candidate: &str) -> anyhow::Result<String> {
    if !users.username_taken(candidate)? {
        return Ok(candidate.to_string());
    }
    let mut rng = rand::rng();
    for _ in 0..USERNAME_SUFFIX_ATTEMPTS {
        let suffixed = format!("{candidate}{}", rng.random_range(0..10000));
        if !users.username_taken(&suffixed)? {
            return Ok(suffixed);
        }
    }
    Err(anyhow!("could not find a free username for {candidate}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn setup() -> (IdentitySyncService, Database) {
        let conn = Connection::open_in_memory().expect("in-memory db");
        let db = Database::from_connection(conn, true);
        db.ensure_migrations().expect("migrations");
        (IdentitySyncService::new(db.clone()), db)
    }

    fn created_event(id: &str, email: &str) -> IdentityUserData {
        IdentityUserData {
            id: id.into(),
            first_name: Some("Jane".into()),
            last_name: Some("Doe".into()),
            email_addresses: vec![EmailEntry {
                email_address: email.into(),
            }],
            image_url: Some("https://images.example/jane.png".into()),
        }
    }

    #[test]
    fn created_user_takes_the_email_local_part() {
        let (service, _db) = setup();
        let view = service
            .on_created(&created_event("u1", "jane@x.com"))
            .expect("create");
        assert_eq!(view.username, "jane");
        assert_eq!(view.full_name, "Jane Doe");
        assert_eq!(view.email, "jane@x.com");
    }

    #[test]
    fn taken_username_gets_a_numeric_suffix() {
        let (service, _db) = setup();
        service
            .on_created(&created_event("u1", "jane@x.com"))
            .expect("first create");
        let view = service
            .on_created(&created_event("u2", "jane@y.com"))
            .expect("second create");
        assert!(view.username.starts_with("jane"));
        assert_ne!(view.username, "jane");
        let suffix = &view.username["jane".len()..];
        let suffix: u32 = suffix.parse().expect("numeric suffix");
        assert!(suffix < 10000);
    }

    #[test]
    fn redelivered_create_fails_on_the_primary_key() {
        let (service, _db) = setup();
        service
            .on_created(&created_event("u1", "jane@x.com"))
            .expect("create");
        assert!(service.on_created(&created_event("u1", "jane@x.com")).is_err());
    }

    #[test]
    fn update_touches_identity_fields_only() {
        let (service, db) = setup();
        service
            .on_created(&created_event("u1", "jane@x.com"))
            .expect("create");
        db.with_repositories(|repos| {
            let mut record = repos.users().get("u1")?.expect("user");
            record.bio = Some("kept".into());
            record.location = Some("kept too".into());
            repos.users().update(&record)
        })
        .expect("set profile fields");

        let mut updated = created_event("u1", "jane.doe@x.com");
        updated.first_name = Some("Janet".into());
        let view = service.on_updated(&updated).expect("update");
        assert_eq!(view.email, "jane.doe@x.com");
        assert_eq!(view.full_name, "Janet Doe");
        assert_eq!(view.username, "jane");
        assert_eq!(view.bio.as_deref(), Some("kept"));
        assert_eq!(view.location.as_deref(), Some("kept too"));
    }

    #[test]
    fn update_of_unknown_user_is_not_found() {
        let (service, _db) = setup();
        assert!(matches!(
            service.on_updated(&created_event("ghost", "g@x.com")),
            Err(DomainError::NotFound(_))
        ));
    }

    #[test]
    fn delete_removes_the_user_row() {
        let (service, db) = setup();
        service
            .on_created(&created_event("u1", "jane@x.com"))
            .expect("create");
        service.on_deleted("u1").expect("delete");
        let gone = db
            .with_repositories(|repos| repos.users().get("u1"))
            .expect("lookup");
        assert!(gone.is_none());

        // Deleting an unknown id stays a no-op.
        service.on_deleted("u1").expect("repeat delete");
    }
}
