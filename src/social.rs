//! Follow/unfollow, connection requests and the relationship view. This is
//! the only part of the system with a real state machine: a request goes
//! `(none) -> pending -> accepted` and is never deleted.

use crate::database::models::{ConnectionRequestRecord, RequestStatus};
use crate::database::repositories::{
    ConnectionRepository, ConnectionRequestRepository, FollowRepository, UserRepository,
};
use crate::database::Database;
use crate::error::DomainError;
use crate::events::{AppEvent, EventBus};
use crate::users::UserView;
use crate::utils::now_utc_iso;
use anyhow::Result;
use chrono::{Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Requests sent inside the trailing window before the next one is refused.
pub const REQUEST_LIMIT_PER_WINDOW: usize = 20;
const REQUEST_WINDOW_HOURS: i64 = 24;

#[derive(Clone)]
pub struct SocialGraphService {
    database: Database,
    events: EventBus,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionsView {
    pub connections: Vec<UserView>,
    pub followers: Vec<UserView>,
    pub following: Vec<UserView>,
    pub pending_connections: Vec<UserView>,
}

enum FollowCheck {
    Followed,
    Already,
    TargetMissing,
}

enum SendCheck {
    Created(ConnectionRequestRecord),
    RateLimited,
    AlreadyConnected,
    Pending,
    TargetMissing,
}

enum AcceptCheck {
    Accepted,
    NoPendingRequest,
}

impl SocialGraphService {
    pub fn new(database: Database, events: EventBus) -> Self {
        Self { database, events }
    }

    pub fn follow_user(&self, caller_id: &str, target_id: &str) -> Result<(), DomainError> {
        if caller_id == target_id {
            return Err(DomainError::invalid("you cannot follow yourself"));
        }
        let now = now_utc_iso();
        let outcome = self.database.with_transaction(|repos| {
            if repos.users().get(target_id)?.is_none() {
                return Ok(FollowCheck::TargetMissing);
            }
            if repos.follows().is_following(caller_id, target_id)? {
                return Ok(FollowCheck::Already);
            }
            repos.follows().add(caller_id, target_id, &now)?;
            Ok(FollowCheck::Followed)
        })?;

        match outcome {
            FollowCheck::Followed => Ok(()),
            FollowCheck::Already => Err(DomainError::AlreadyFollowing),
            FollowCheck::TargetMissing => Err(DomainError::not_found("user not found")),
        }
    }

    pub fn unfollow_user(&self, caller_id: &str, target_id: &str) -> Result<(), DomainError> {
        self.database
            .with_repositories(|repos| repos.follows().remove(caller_id, target_id))?;
        Ok(())
    }

    pub fn send_connection_request(
        &self,
        caller_id: &str,
        target_id: &str,
    ) -> Result<ConnectionRequestRecord, DomainError> {
        if caller_id == target_id {
            return Err(DomainError::invalid(
                "you cannot send a connection request to yourself",
            ));
        }
        let window_start = (Utc::now() - Duration::hours(REQUEST_WINDOW_HOURS)).to_rfc3339();
        let record = ConnectionRequestRecord {
            id: Uuid::new_v4().to_string(),
            from_user_id: caller_id.to_string(),
            to_user_id: target_id.to_string(),
            status: RequestStatus::Pending,
            created_at: now_utc_iso(),
        };

        let outcome = self.database.with_transaction(|repos| {
            if repos.users().get(target_id)?.is_none() {
                return Ok(SendCheck::TargetMissing);
            }
            let recent = repos
                .connection_requests()
                .count_from_since(caller_id, &window_start)?;
            if recent >= REQUEST_LIMIT_PER_WINDOW {
                return Ok(SendCheck::RateLimited);
            }
            if let Some(existing) = repos
                .connection_requests()
                .find_between(caller_id, target_id)?
            {
                return Ok(match existing.status {
                    RequestStatus::Accepted => SendCheck::AlreadyConnected,
                    RequestStatus::Pending => SendCheck::Pending,
                });
            }
            repos.connection_requests().create(&record)?;
            Ok(SendCheck::Created(record.clone()))
        })?;

        match outcome {
            SendCheck::Created(created) => {
                self.events.send(AppEvent::ConnectionRequestCreated {
                    request_id: created.id.clone(),
                    from_user_id: created.from_user_id.clone(),
                    to_user_id: created.to_user_id.clone(),
                });
                Ok(created)
            }
            SendCheck::RateLimited => Err(DomainError::RateLimited),
            SendCheck::AlreadyConnected => Err(DomainError::AlreadyConnected),
            SendCheck::Pending => Err(DomainError::RequestPending),
            SendCheck::TargetMissing => Err(DomainError::not_found("user not found")),
        }
    }

    pub fn accept_connection_request(
        &self,
        caller_id: &str,
        requester_id: &str,
    ) -> Result<(), DomainError> {
        let now = now_utc_iso();
        let outcome = self.database.with_transaction(|repos| {
            let Some(request) = repos
                .connection_requests()
                .find_pending(requester_id, caller_id)?
            else {
                return Ok(AcceptCheck::NoPendingRequest);
            };
            repos.connections().add(caller_id, requester_id, &now)?;
            repos.connection_requests().mark_accepted(&request.id)?;
            Ok(AcceptCheck::Accepted)
        })?;

        match outcome {
            AcceptCheck::Accepted => Ok(()),
            AcceptCheck::NoPendingRequest => Err(DomainError::not_found(
                "no pending connection request from this user",
            )),
        }
    }

    pub fn get_user_connections(&self, caller_id: &str) -> Result<ConnectionsView, DomainError> {
        let view = self.database.with_repositories(|repos| {
            if repos.users().get(caller_id)?.is_none() {
                return Ok(None);
            }
            let connections = repos.connections().peers_of(caller_id)?;
            let followers = repos.follows().followers_of(caller_id)?;
            let following = repos.follows().following_of(caller_id)?;
            let pending: Vec<String> = repos
                .connection_requests()
                .pending_to(caller_id)?
                .into_iter()
                .map(|request| request.from_user_id)
                .collect();

            let resolve = |ids: &[String]| -> Result<Vec<UserView>> {
                Ok(repos
                    .users()
                    .get_many(ids)?
                    .into_iter()
                    .map(UserView::from_record)
                    .collect())
            };

            Ok(Some(ConnectionsView {
                connections: resolve(&connections)?,
                followers: resolve(&followers)?,
                following: resolve(&following)?,
                pending_connections: resolve(&pending)?,
            }))
        })?;
        view.ok_or_else(|| DomainError::not_found("user not found"))
    }

    pub fn discover_users(
        &self,
        caller_id: &str,
        query: &str,
    ) -> Result<Vec<UserView>, DomainError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(DomainError::invalid("search input may not be empty"));
        }
        let users = self
            .database
            .with_repositories(|repos| repos.users().search(query, caller_id))?;
        Ok(users.into_iter().map(UserView::from_record).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::UserRecord;
    use crate::database::Database;
    use rusqlite::Connection;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn setup() -> (SocialGraphService, Database, UnboundedReceiver<AppEvent>) {
        let conn = Connection::open_in_memory().expect("in-memory db");
        let db = Database::from_connection(conn, true);
        db.ensure_migrations().expect("migrations");
        let (events, rx) = EventBus::channel();
        (SocialGraphService::new(db.clone(), events), db, rx)
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

    #[test]
    fn follow_creates_one_symmetric_edge() {
        let (service, db, _rx) = setup();
        seed_user(&db, "a", "alice");
        seed_user(&db, "b", "bob");

        service.follow_user("a", "b").expect("follow");
        let view = service.get_user_connections("a").expect("view");
        assert_eq!(view.following.len(), 1);
        assert_eq!(view.following[0].id, "b");

        let target_view = service.get_user_connections("b").expect("view");
        assert_eq!(target_view.followers.len(), 1);
        assert_eq!(target_view.followers[0].id, "a");
    }

    #[test]
    fn repeat_follow_is_a_conflict_without_a_duplicate() {
        let (service, db, _rx) = setup();
        seed_user(&db, "a", "alice");
        seed_user(&db, "b", "bob");

        service.follow_user("a", "b").expect("follow");
        assert!(matches!(
            service.follow_user("a", "b"),
            Err(DomainError::AlreadyFollowing)
        ));
        let view = service.get_user_connections("a").expect("view");
        assert_eq!(view.following.len(), 1);
    }

    #[test]
    fn unfollow_restores_both_lists() {
        let (service, db, _rx) = setup();
        seed_user(&db, "a", "alice");
        seed_user(&db, "b", "bob");

        service.follow_user("a", "b").expect("follow");
        service.unfollow_user("a", "b").expect("unfollow");
        let view = service.get_user_connections("a").expect("view");
        assert!(view.following.is_empty());
        let target_view = service.get_user_connections("b").expect("view");
        assert!(target_view.followers.is_empty());

        // Unfollowing again is a harmless no-op.
        service.unfollow_user("a", "b").expect("unfollow again");
    }

    #[test]
    fn self_follow_is_rejected() {
        let (service, db, _rx) = setup();
        seed_user(&db, "a", "alice");
        assert!(matches!(
            service.follow_user("a", "a"),
            Err(DomainError::InvalidInput(_))
        ));
    }

    #[test]
    fn twenty_first_request_in_a_day_is_rate_limited() {
        let (service, db, _rx) = setup();
        seed_user(&db, "a", "alice");
        for n in 0..21 {
            seed_user(&db, &format!("t{n}"), &format!("target{n}"));
        }

        for n in 0..20 {
            service
                .send_connection_request("a", &format!("t{n}"))
                .expect("request under the limit");
        }
        assert!(matches!(
            service.send_connection_request("a", "t20"),
            Err(DomainError::RateLimited)
        ));
    }

    #[test]
    fn duplicate_request_reports_pending_without_a_second_record() {
        let (service, db, mut rx) = setup();
        seed_user(&db, "a", "alice");
        seed_user(&db, "b", "bob");

        let created = service.send_connection_request("a", "b").expect("send");
        assert!(matches!(
            service.send_connection_request("a", "b"),
            Err(DomainError::RequestPending)
        ));
        // The reverse direction also counts as the same logical request.
        assert!(matches!(
            service.send_connection_request("b", "a"),
            Err(DomainError::RequestPending)
        ));

        let event = rx.try_recv().expect("one event");
        match event {
            AppEvent::ConnectionRequestCreated { request_id, .. } => {
                assert_eq!(request_id, created.id);
            }
        }
        assert!(rx.try_recv().is_err(), "conflicts must not emit events");
    }

    #[test]
    fn accept_connects_both_users_and_flips_status() {
        let (service, db, _rx) = setup();
        seed_user(&db, "a", "alice");
        seed_user(&db, "b", "bob");

        service.send_connection_request("a", "b").expect("send");
        service.accept_connection_request("b", "a").expect("accept");

        let view = service.get_user_connections("a").expect("view");
        assert_eq!(view.connections.len(), 1);
        assert_eq!(view.connections[0].id, "b");
        let other = service.get_user_connections("b").expect("view");
        assert_eq!(other.connections.len(), 1);
        assert_eq!(other.connections[0].id, "a");
        assert!(other.pending_connections.is_empty());

        assert!(matches!(
            service.send_connection_request("a", "b"),
            Err(DomainError::AlreadyConnected)
        ));
    }

    #[test]
    fn accept_without_a_pending_request_is_not_found() {
        let (service, db, _rx) = setup();
        seed_user(&db, "a", "alice");
        seed_user(&db, "b", "bob");
        assert!(matches!(
            service.accept_connection_request("b", "a"),
            Err(DomainError::NotFound(_))
        ));
    }

    #[test]
    fn pending_requests_appear_in_the_recipient_view() {
        let (service, db, _rx) = setup();
        seed_user(&db, "a", "alice");
        seed_user(&db, "b", "bob");

        service.send_connection_request("a", "b").expect("send");
        let view = service.get_user_connections("b").expect("view");
        assert_eq!(view.pending_connections.len(), 1);
        assert_eq!(view.pending_connections[0].id, "a");
        assert!(view.connections.is_empty());
    }

    #[test]
    fn discover_rejects_empty_input_and_excludes_the_caller() {
        let (service, db, _rx) = setup();
        seed_user(&db, "a", "alina");
        seed_user(&db, "b", "bob");

        assert!(matches!(
            service.discover_users("a", "  "),
            Err(DomainError::InvalidInput(_))
        ));

        // "a" matches "ali" itself but must be excluded from its own results.
        let hits = service.discover_users("a", "ali").expect("search");
        assert!(hits.is_empty());
        let hits = service.discover_users("b", "ALI").expect("search");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "a");
    }
}
