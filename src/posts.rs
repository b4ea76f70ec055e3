//! Posts, the home feed and like toggling.

use crate::database::models::PostRecord;
use crate::database::repositories::{ConnectionRepository, FollowRepository, PostRepository, UserRepository};
use crate::database::Database;
use crate::error::DomainError;
use crate::media::{self, MediaService};
use crate::users::{ImageUpload, UserView};
use crate::utils::now_utc_iso;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct AddPostInput {
    pub content: String,
    pub post_type: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub id: String,
    pub user_id: String,
    pub content: String,
    pub image_urls: Vec<String>,
    pub post_type: String,
    pub created_at: String,
}

impl PostView {
    fn from_record(record: PostRecord) -> Self {
        Self {
            id: record.id,
            user_id: record.user_id,
            content: record.content,
            image_urls: record.image_urls,
            post_type: record.post_type,
            created_at: record.created_at,
        }
    }
}

/// A feed entry: the post plus its resolved author and the ids of everyone
/// who liked it.
#[derive(Debug, Clone, Serialize)]
pub struct FeedPostView {
    pub id: String,
    pub user: UserView,
    pub content: String,
    pub image_urls: Vec<String>,
    pub post_type: String,
    pub likes: Vec<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeOutcome {
    Liked,
    Unliked,
}

#[derive(Clone)]
pub struct PostService {
    database: Database,
    media: MediaService,
}

impl PostService {
    pub fn new(database: Database, media: MediaService) -> Self {
        Self { database, media }
    }

    pub async fn add_post(
        &self,
        caller_id: &str,
        input: AddPostInput,
        images: Vec<ImageUpload>,
    ) -> Result<PostView, DomainError> {
        if input.content.trim().is_empty() && images.is_empty() {
            return Err(DomainError::invalid("post needs content or an image"));
        }

        let mut image_urls = Vec::with_capacity(images.len());
        for image in images {
            let uploaded = self.media.upload(image.data, &image.file_name).await?;
            image_urls.push(MediaService::transformed_url(
                &uploaded.url,
                &media::POST_IMAGE,
            ));
        }

        let record = PostRecord {
            id: Uuid::new_v4().to_string(),
            user_id: caller_id.to_string(),
            content: input.content,
            image_urls,
            post_type: input.post_type,
            created_at: now_utc_iso(),
        };

        self.database.with_repositories(|repos| {
            if repos.users().get(caller_id)?.is_none() {
                anyhow::bail!("author not found");
            }
            repos.posts().create(&record)
        })?;

        Ok(PostView::from_record(record))
    }

    /// Posts from the caller, their connections and everyone they follow,
    /// newest first.
    pub fn feed_for(&self, caller_id: &str) -> Result<Vec<FeedPostView>, DomainError> {
        let feed = self.database.with_repositories(|repos| {
            if repos.users().get(caller_id)?.is_none() {
                return Ok(None);
            }
            let mut author_ids = vec![caller_id.to_string()];
            author_ids.extend(repos.connections().peers_of(caller_id)?);
            author_ids.extend(repos.follows().following_of(caller_id)?);
            author_ids.sort();
            author_ids.dedup();

            let posts = repos.posts().list_for_authors(&author_ids)?;
            let authors = repos.users().get_many(&author_ids)?;

            let mut feed = Vec::with_capacity(posts.len());
            for post in posts {
                let Some(author) = authors.iter().find(|user| user.id == post.user_id) else {
                    continue;
                };
                let likes = repos.posts().likers_of(&post.id)?;
                feed.push(FeedPostView {
                    id: post.id,
                    user: UserView::from_record(author.clone()),
                    content: post.content,
                    image_urls: post.image_urls,
                    post_type: post.post_type,
                    likes,
                    created_at: post.created_at,
                });
            }
            Ok(Some(feed))
        })?;
        feed.ok_or_else(|| DomainError::not_found("user not found"))
    }

    pub fn toggle_like(&self, caller_id: &str, post_id: &str) -> Result<LikeOutcome, DomainError> {
        let now = now_utc_iso();
        let outcome = self.database.with_transaction(|repos| {
            if repos.posts().get(post_id)?.is_none() {
                return Ok(None);
            }
            if repos.posts().has_liked(post_id, caller_id)? {
                repos.posts().remove_like(post_id, caller_id)?;
                Ok(Some(LikeOutcome::Unliked))
            } else {
                repos.posts().add_like(post_id, caller_id, &now)?;
                Ok(Some(LikeOutcome::Liked))
            }
        })?;
        outcome.ok_or_else(|| DomainError::not_found("post not found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MediaConfig;
    use crate::database::models::UserRecord;
    use crate::events::EventBus;
    use crate::social::SocialGraphService;
    use rusqlite::Connection;

    fn setup() -> (PostService, SocialGraphService, Database) {
        let conn = Connection::open_in_memory().expect("in-memory db");
        let db = Database::from_connection(conn, true);
        db.ensure_migrations().expect("migrations");
        let media = MediaService::new(MediaConfig::default(), reqwest::Client::new());
        let (events, _rx) = EventBus::channel();
        let social = SocialGraphService::new(db.clone(), events);
        (PostService::new(db.clone(), media), social, db)
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

    async fn seed_post(service: &PostService, author: &str, content: &str) -> PostView {
        service
            .add_post(
                author,
                AddPostInput {
                    content: content.into(),
                    post_type: "text".into(),
                },
                Vec::new(),
            )
            .await
            .expect("post")
    }

    #[tokio::test]
    async fn feed_covers_self_followed_and_connected_authors() {
        let (posts, social, db) = setup();
        seed_user(&db, "a", "alice");
        seed_user(&db, "b", "bob");
        seed_user(&db, "c", "carol");
        seed_user(&db, "d", "dave");

        social.follow_user("a", "b").expect("follow");
        social.send_connection_request("c", "a").expect("request");
        social.accept_connection_request("a", "c").expect("accept");

        seed_post(&posts, "a", "mine").await;
        seed_post(&posts, "b", "followed").await;
        seed_post(&posts, "c", "connected").await;
        seed_post(&posts, "d", "stranger").await;

        let feed = posts.feed_for("a").expect("feed");
        let contents: Vec<&str> = feed.iter().map(|p| p.content.as_str()).collect();
        assert_eq!(contents, vec!["connected", "followed", "mine"]);
        assert!(feed.iter().all(|p| p.user.id != "d"));
    }

    #[tokio::test]
    async fn like_toggles_on_and_off() {
        let (posts, _social, db) = setup();
        seed_user(&db, "a", "alice");
        seed_user(&db, "b", "bob");
        let post = seed_post(&posts, "a", "hello").await;

        assert_eq!(
            posts.toggle_like("b", &post.id).expect("like"),
            LikeOutcome::Liked
        );
        let feed = posts.feed_for("a").expect("feed");
        assert_eq!(feed[0].likes, vec!["b"]);

        assert_eq!(
            posts.toggle_like("b", &post.id).expect("unlike"),
            LikeOutcome::Unliked
        );
        let feed = posts.feed_for("a").expect("feed");
        assert!(feed[0].likes.is_empty());
    }

    #[tokio::test]
    async fn liking_a_missing_post_is_not_found() {
        let (posts, _social, db) = setup();
        seed_user(&db, "a", "alice");
        assert!(matches!(
            posts.toggle_like("a", "nope"),
            Err(DomainError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn empty_post_is_rejected() {
        let (posts, _social, db) = setup();
        seed_user(&db, "a", "alice");
        assert!(matches!(
            posts
                .add_post(
                    "a",
                    AddPostInput {
                        content: "   ".into(),
                        post_type: "text".into(),
                    },
                    Vec::new(),
                )
                .await,
            Err(DomainError::InvalidInput(_))
        ));
    }
}
