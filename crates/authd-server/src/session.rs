//! Browser sessions.
//!
//! A session is keyed by a random id carried in an HTTP-only cookie. It starts
//! anonymous and becomes authenticated after a password or federated login,
//! at which point it gets a fresh id. Sessions live in memory and are swept
//! once older than the configured lifetime.

use std::collections::HashMap;

use authd_crypto::generate_session_id;
use axum::http::HeaderMap;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// A browser session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Session id, also the cookie value.
    pub id: String,
    /// Stable key binding federation state to this browser. Kept across id
    /// rotation and never sent to the client.
    pub binding: String,
    /// Authenticated user, if any.
    pub user_id: Option<Uuid>,
    /// Client secrets kept out of resume URLs, by client id.
    pub client_secrets: HashMap<String, String>,
    /// Creation time, reset on rotation.
    pub created_at: DateTime<Utc>,
}

impl Session {
    fn new(binding: String) -> Self {
        Self {
            id: generate_session_id(),
            binding,
            user_id: None,
            client_secrets: HashMap::new(),
            created_at: Utc::now(),
        }
    }

    /// Checks whether the session is older than `ttl` at `now`.
    #[must_use]
    pub fn is_expired_at(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        self.created_at + ttl <= now
    }
}

/// In-memory session store.
#[derive(Debug)]
pub struct SessionStore {
    cookie_name: String,
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    /// Creates an empty store issuing cookies named `cookie_name`.
    #[must_use]
    pub fn new(cookie_name: impl Into<String>) -> Self {
        Self {
            cookie_name: cookie_name.into(),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Starts an anonymous session.
    pub async fn create(&self) -> Session {
        let session = Session::new(generate_session_id());
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        session
    }

    /// Looks up a session by id.
    pub async fn get(&self, id: &str) -> Option<Session> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Checks if there are no sessions.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Session referenced by the request's cookie.
    pub async fn from_headers(&self, headers: &HeaderMap) -> Option<Session> {
        let jar = CookieJar::from_headers(headers);
        let id = jar.get(&self.cookie_name)?.value().to_string();
        self.get(&id).await
    }

    /// Session referenced by the request's cookie, or a new one.
    ///
    /// The flag is `true` when the session was just created and its cookie
    /// must be sent.
    pub async fn resume_or_create(&self, headers: &HeaderMap) -> (Session, bool) {
        match self.from_headers(headers).await {
            Some(session) => (session, false),
            None => (self.create().await, true),
        }
    }

    /// Authenticates `user_id` under a fresh session id.
    ///
    /// The old id stops working. Returns `None` if the session does not exist.
    pub async fn authenticate(&self, id: &str, user_id: Uuid) -> Option<Session> {
        let mut sessions = self.sessions.write().await;
        let old = sessions.remove(id)?;
        let session = Session {
            user_id: Some(user_id),
            client_secrets: old.client_secrets,
            ..Session::new(old.binding)
        };
        sessions.insert(session.id.clone(), session.clone());
        Some(session)
    }

    /// Keeps `secret` for `client_id` so a resumed request can present it.
    pub async fn withhold_secret(&self, id: &str, client_id: &str, secret: &str) {
        if let Some(session) = self.sessions.write().await.get_mut(id) {
            session
                .client_secrets
                .insert(client_id.to_string(), secret.to_string());
        }
    }

    /// Drops sessions older than `ttl`. Returns how many were removed.
    pub async fn remove_expired(&self, ttl: Duration) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let initial_len = sessions.len();
        sessions.retain(|_, session| !session.is_expired_at(ttl, now));
        let removed = initial_len - sessions.len();
        debug!(removed, "Removed expired sessions");
        removed
    }

    /// Cookie carrying `session`.
    #[must_use]
    pub fn cookie(&self, session: &Session) -> Cookie<'static> {
        Cookie::build((self.cookie_name.clone(), session.id.clone()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .build()
    }

    /// Jar setting the cookie for `session` when `created`, empty otherwise.
    #[must_use]
    pub fn jar(&self, session: &Session, created: bool) -> CookieJar {
        let jar = CookieJar::new();
        if created { jar.add(self.cookie(session)) } else { jar }
    }
}
