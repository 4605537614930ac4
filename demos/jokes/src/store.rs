//! In-memory users, jokes and sessions.

use std::collections::HashMap;
use std::time::Duration;
use std::time::Instant;

use displaydoc::Display;
use rand::Rng;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Store error.
#[derive(Debug, Error, Display, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// User with username {0} already exists
    UsernameTaken(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserRecord {
    pub id: String,
    pub username: String,
    salt: String,
    password_hash: String,
}

impl UserRecord {
    fn new(username: &str, password: &str) -> Self {
        let salt = Uuid::new_v4().simple().to_string();
        Self {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            password_hash: hash_password(&salt, password),
            salt,
        }
    }

    fn verify(&self, password: &str) -> bool {
        hash_password(&self.salt, password) == self.password_hash
    }
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JokeRecord {
    pub id: String,
    pub name: String,
    pub content: String,
    pub jokster_id: String,
    /// Insertion sequence number, used for `createdAt` ordering.
    pub created_at: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Order {
    /// Oldest first.
    #[default]
    Ascending,
    Descending,
}

/// Pagination and ordering of a joke listing.
#[derive(Clone, Copy, Debug, Default)]
pub struct JokeListing {
    pub take: Option<usize>,
    pub skip: Option<usize>,
    pub order: Option<Order>,
}

/// How long a session stays open after login.
pub const SESSION_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 30);

#[derive(Clone, Debug)]
struct Session {
    user_id: String,
    expires_at: Instant,
}

impl Session {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

#[derive(Debug, Default)]
struct Data {
    users: HashMap<String, UserRecord>,
    jokes: Vec<JokeRecord>,
    sessions: HashMap<String, Session>,
    sequence: u64,
}

impl Data {
    fn insert_user(&mut self, username: &str, password: &str) -> UserRecord {
        let user = UserRecord::new(username, password);
        self.users.insert(user.id.clone(), user.clone());
        user
    }

    fn insert_joke(&mut self, jokster_id: &str, name: &str, content: &str) -> JokeRecord {
        self.sequence += 1;
        let joke = JokeRecord {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            content: content.to_string(),
            jokster_id: jokster_id.to_string(),
            created_at: self.sequence,
        };
        self.jokes.push(joke.clone());
        joke
    }

    fn user_by_name(&self, username: &str) -> Option<&UserRecord> {
        self.users.values().find(|user| user.username == username)
    }
}

/// Shared application state, safe to use from concurrent requests.
#[derive(Debug)]
pub struct Store {
    data: RwLock<Data>,
    session_ttl: Duration,
}

impl Default for Store {
    fn default() -> Self {
        Self {
            data: RwLock::default(),
            session_ttl: SESSION_TTL,
        }
    }
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sessions opened from now on expire after `session_ttl`.
    pub fn with_session_ttl(mut self, session_ttl: Duration) -> Self {
        self.session_ttl = session_ttl;
        self
    }

    /// A store holding the user `kody` (password `twixrox`) and a few of
    /// their jokes.
    pub fn seeded() -> Self {
        let mut data = Data::default();
        let kody = data.insert_user("kody", "twixrox");
        for (name, content) in [
            (
                "Road worker",
                "I never wanted to believe that my Dad was stealing from his job as a road worker. But when I got home, all the signs were there.",
            ),
            (
                "Frisbee",
                "I was wondering why the frisbee was getting bigger, then it hit me.",
            ),
            (
                "Trees",
                "Why do trees seem suspicious on sunny days? Dunno, they're just a bit shady.",
            ),
            (
                "Skeletons",
                "Why don't skeletons ride roller coasters? They don't have the stomach for it.",
            ),
            (
                "Hippos",
                "Why don't you find hippopotamuses hiding in trees? They're really good at it.",
            ),
            (
                "Dinner",
                "What did one plate say to the other plate? Dinner is on me!",
            ),
            (
                "Elevator",
                "My first time using an elevator was an uplifting experience. The second time let me down.",
            ),
        ] {
            data.insert_joke(&kody.id, name, content);
        }
        Self {
            data: RwLock::new(data),
            session_ttl: SESSION_TTL,
        }
    }

    /// Create a user, failing when the username is taken.
    pub async fn register(&self, username: &str, password: &str) -> Result<UserRecord, StoreError> {
        let mut data = self.data.write().await;
        if data.user_by_name(username).is_some() {
            return Err(StoreError::UsernameTaken(username.to_string()));
        }
        let user = data.insert_user(username, password);
        tracing::info!(user = %user.id, "user registered");
        Ok(user)
    }

    /// The user with these credentials, if any.
    pub async fn login(&self, username: &str, password: &str) -> Option<UserRecord> {
        let data = self.data.read().await;
        data.user_by_name(username)
            .filter(|user| user.verify(password))
            .cloned()
    }

    pub async fn user(&self, id: &str) -> Option<UserRecord> {
        self.data.read().await.users.get(id).cloned()
    }

    /// Open a session for `user_id` and return its id.
    ///
    /// Expired sessions are dropped on the way.
    pub async fn create_session(&self, user_id: &str) -> String {
        let session_id = Uuid::new_v4().to_string();
        let now = Instant::now();
        let mut data = self.data.write().await;
        data.sessions.retain(|_, session| session.is_live(now));
        data.sessions.insert(
            session_id.clone(),
            Session {
                user_id: user_id.to_string(),
                expires_at: now + self.session_ttl,
            },
        );
        session_id
    }

    /// The user a live session belongs to.
    pub async fn session_user(&self, session_id: &str) -> Option<String> {
        let now = Instant::now();
        self.data
            .read()
            .await
            .sessions
            .get(session_id)
            .filter(|session| session.is_live(now))
            .map(|session| session.user_id.clone())
    }

    #[cfg(test)]
    async fn session_count(&self) -> usize {
        self.data.read().await.sessions.len()
    }

    pub async fn destroy_session(&self, session_id: &str) {
        self.data.write().await.sessions.remove(session_id);
    }

    pub async fn jokes(&self, listing: JokeListing) -> Vec<JokeRecord> {
        let data = self.data.read().await;
        let mut jokes: Vec<_> = data.jokes.iter().collect();
        if let Some(order) = listing.order {
            jokes.sort_by_key(|joke| joke.created_at);
            if order == Order::Descending {
                jokes.reverse();
            }
        }
        jokes
            .into_iter()
            .skip(listing.skip.unwrap_or(0))
            .take(listing.take.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    pub async fn joke(&self, id: &str) -> Option<JokeRecord> {
        let data = self.data.read().await;
        data.jokes.iter().find(|joke| joke.id == id).cloned()
    }

    pub async fn random_joke(&self) -> Option<JokeRecord> {
        let data = self.data.read().await;
        if data.jokes.is_empty() {
            return None;
        }
        let index = rand::rng().random_range(0..data.jokes.len());
        data.jokes.get(index).cloned()
    }

    pub async fn create_joke(&self, jokster_id: &str, name: &str, content: &str) -> JokeRecord {
        self.data
            .write()
            .await
            .insert_joke(jokster_id, name, content)
    }

    /// Remove a joke, returning it if it existed.
    pub async fn delete_joke(&self, id: &str) -> Option<JokeRecord> {
        let mut data = self.data.write().await;
        let index = data.jokes.iter().position(|joke| joke.id == id)?;
        Some(data.jokes.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_then_login() {
        let store = Store::new();
        let user = store.register("alice", "secret1").await.unwrap();
        assert_eq!(store.login("alice", "secret1").await, Some(user.clone()));
        assert_eq!(store.login("alice", "secret2").await, None);
        assert_eq!(
            store.register("alice", "other12").await,
            Err(StoreError::UsernameTaken("alice".to_string()))
        );
        assert_eq!(
            StoreError::UsernameTaken("alice".to_string()).to_string(),
            "User with username alice already exists"
        );
    }

    #[tokio::test]
    async fn passwords_are_salted() {
        let store = Store::new();
        let a = store.register("alice", "secret1").await.unwrap();
        let b = store.register("bobby", "secret1").await.unwrap();
        assert_ne!(a.password_hash, b.password_hash);
    }

    #[tokio::test]
    async fn sessions_map_to_users() {
        let store = Store::new();
        let session = store.create_session("user-1").await;
        assert_eq!(store.session_user(&session).await.as_deref(), Some("user-1"));
        store.destroy_session(&session).await;
        assert_eq!(store.session_user(&session).await, None);
    }

    #[tokio::test]
    async fn expired_sessions_are_closed_and_pruned() {
        let store = Store::new().with_session_ttl(Duration::ZERO);
        let first = store.create_session("user-1").await;
        assert_eq!(store.session_user(&first).await, None);

        store.create_session("user-2").await;
        assert_eq!(store.session_count().await, 1);
    }

    #[tokio::test]
    async fn live_sessions_survive_pruning() {
        let store = Store::new();
        let first = store.create_session("user-1").await;
        let second = store.create_session("user-2").await;
        assert_eq!(store.session_count().await, 2);
        assert_eq!(store.session_user(&first).await.as_deref(), Some("user-1"));
        assert_eq!(store.session_user(&second).await.as_deref(), Some("user-2"));
    }

    #[tokio::test]
    async fn listing_orders_and_paginates() {
        let store = Store::new();
        for name in ["one", "two", "three", "four"] {
            store.create_joke("u", name, "content").await;
        }
        let names = |jokes: Vec<JokeRecord>| jokes.into_iter().map(|j| j.name).collect::<Vec<_>>();

        let newest = store
            .jokes(JokeListing {
                take: Some(2),
                skip: None,
                order: Some(Order::Descending),
            })
            .await;
        assert_eq!(names(newest), vec!["four", "three"]);

        let page = store
            .jokes(JokeListing {
                take: Some(2),
                skip: Some(1),
                order: Some(Order::Ascending),
            })
            .await;
        assert_eq!(names(page), vec!["two", "three"]);
    }

    #[tokio::test]
    async fn delete_removes_once() {
        let store = Store::seeded();
        let joke = store.random_joke().await.unwrap();
        assert_eq!(store.delete_joke(&joke.id).await, Some(joke.clone()));
        assert_eq!(store.delete_joke(&joke.id).await, None);
        assert_eq!(store.joke(&joke.id).await, None);
    }
}
