mod connection_requests;
mod connections;
mod follows;
mod posts;
mod users;

use super::models::{ConnectionRequestRecord, PostRecord, UserRecord};
use anyhow::Result;
use rusqlite::Connection;

pub trait UserRepository {
    fn create(&self, record: &UserRecord) -> Result<()>;
    fn update(&self, record: &UserRecord) -> Result<()>;
    fn get(&self, id: &str) -> Result<Option<UserRecord>>;
    fn get_many(&self, ids: &[String]) -> Result<Vec<UserRecord>>;
    fn username_taken(&self, username: &str) -> Result<bool>;
    fn delete(&self, id: &str) -> Result<()>;
    /// Case-insensitive substring match over username, email, full name and
    /// location, excluding `exclude_id`.
    fn search(&self, query: &str, exclude_id: &str) -> Result<Vec<UserRecord>>;
}

pub trait FollowRepository {
    fn add(&self, follower_id: &str, followee_id: &str, created_at: &str) -> Result<()>;
    fn remove(&self, follower_id: &str, followee_id: &str) -> Result<()>;
    fn is_following(&self, follower_id: &str, followee_id: &str) -> Result<bool>;
    fn following_of(&self, user_id: &str) -> Result<Vec<String>>;
    fn followers_of(&self, user_id: &str) -> Result<Vec<String>>;
}

pub trait ConnectionRepository {
    fn add(&self, user_id: &str, other_id: &str, created_at: &str) -> Result<()>;
    fn are_connected(&self, user_id: &str, other_id: &str) -> Result<bool>;
    fn peers_of(&self, user_id: &str) -> Result<Vec<String>>;
}

pub trait ConnectionRequestRepository {
    fn create(&self, record: &ConnectionRequestRecord) -> Result<()>;
    fn get(&self, id: &str) -> Result<Option<ConnectionRequestRecord>>;
    /// Any request between the pair, regardless of direction or status.
    fn find_between(&self, a: &str, b: &str) -> Result<Option<ConnectionRequestRecord>>;
    fn find_pending(&self, from: &str, to: &str) -> Result<Option<ConnectionRequestRecord>>;
    fn mark_accepted(&self, id: &str) -> Result<()>;
    fn count_from_since(&self, from: &str, since: &str) -> Result<usize>;
    fn pending_to(&self, user_id: &str) -> Result<Vec<ConnectionRequestRecord>>;
}

pub trait PostRepository {
    fn create(&self, record: &PostRecord) -> Result<()>;
    fn get(&self, id: &str) -> Result<Option<PostRecord>>;
    fn list_for_authors(&self, author_ids: &[String]) -> Result<Vec<PostRecord>>;
    fn add_like(&self, post_id: &str, user_id: &str, created_at: &str) -> Result<()>;
    fn remove_like(&self, post_id: &str, user_id: &str) -> Result<()>;
    fn has_liked(&self, post_id: &str, user_id: &str) -> Result<bool>;
    fn likers_of(&self, post_id: &str) -> Result<Vec<String>>;
}

pub struct SqliteRepositories<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRepositories<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn users(&self) -> impl UserRepository + '_ {
        users::SqliteUserRepository { conn: self.conn }
    }

    pub fn follows(&self) -> impl FollowRepository + '_ {
        follows::SqliteFollowRepository { conn: self.conn }
    }

    pub fn connections(&self) -> impl ConnectionRepository + '_ {
        connections::SqliteConnectionRepository { conn: self.conn }
    }

    pub fn connection_requests(&self) -> impl ConnectionRequestRepository + '_ {
        connection_requests::SqliteConnectionRequestRepository { conn: self.conn }
    }

    pub fn posts(&self) -> impl PostRepository + '_ {
        posts::SqlitePostRepository { conn: self.conn }
    }
}
