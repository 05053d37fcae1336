//! Browser sessions: storage backends and per-request session lifecycle
//!
//! A session is a random id (carried in the session cookie) pointing at a
//! record with two fixed fields, `accessToken` and `user`. The record lives in
//! memory or in a redis hash named `session:<id>`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    config::{AppConfig, SessionStoreKind},
    error::{AppError, AppResult},
    models::SessionUser,
};

/// Field holding the backend bearer token
pub const TOKEN_KEY: &str = "accessToken";
/// Field holding the JSON-encoded session user
pub const USER_KEY: &str = "user";

/// Raw stored record; `user` is kept as the JSON text that was written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSession {
    pub access_token: String,
    pub user: String,
}

/// Persistence for session records
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, id: &str) -> AppResult<Option<StoredSession>>;
    async fn put(&self, id: &str, session: StoredSession, ttl_secs: u64) -> AppResult<()>;
    async fn remove(&self, id: &str) -> AppResult<()>;
    async fn ping(&self) -> AppResult<()>;
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Process-local store, lost on restart
#[derive(Default)]
pub struct MemorySessionStore {
    entries: RwLock<HashMap<String, (StoredSession, Instant)>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Longest lifetime the memory store will honour
const MAX_MEMORY_TTL_SECS: u64 = 10 * 365 * 24 * 3600;

fn expiry(now: Instant, ttl_secs: u64) -> Instant {
    let ttl = Duration::from_secs(ttl_secs.min(MAX_MEMORY_TTL_SECS));
    now.checked_add(ttl).unwrap_or(now)
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, id: &str) -> AppResult<Option<StoredSession>> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(id) {
                Some((session, expires)) if *expires > now => return Ok(Some(session.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }
        // Expired: drop it
        self.entries.write().await.remove(id);
        Ok(None)
    }

    async fn put(&self, id: &str, session: StoredSession, ttl_secs: u64) -> AppResult<()> {
        let expires = expiry(Instant::now(), ttl_secs);
        let mut entries = self.entries.write().await;
        entries.retain(|_, (_, at)| *at > Instant::now());
        entries.insert(id.to_string(), (session, expires));
        Ok(())
    }

    async fn remove(&self, id: &str) -> AppResult<()> {
        self.entries.write().await.remove(id);
        Ok(())
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Redis store
// ---------------------------------------------------------------------------

/// Sessions kept as redis hashes with a TTL
#[derive(Clone)]
pub struct RedisSessionStore {
    conn: ConnectionManager,
}

impl RedisSessionStore {
    /// Open a managed connection and check the server answers
    pub async fn new(url: &str) -> AppResult<Self> {
        let client = Client::open(url)
            .map_err(|e| AppError::Internal(format!("Failed to create Redis client: {}", e)))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to connect to Redis: {}", e)))?;
        let store = Self { conn };
        store.ping().await?;
        Ok(store)
    }

    fn key(id: &str) -> String {
        format!("session:{}", id)
    }

    /// Handle on the shared connection; reconnects are handled by the manager
    fn connection(&self) -> ConnectionManager {
        self.conn.clone()
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn get(&self, id: &str) -> AppResult<Option<StoredSession>> {
        let mut conn = self.connection();
        let fields: HashMap<String, String> = conn
            .hgetall(Self::key(id))
            .await
            .map_err(|e| AppError::Internal(format!("Failed to read session from Redis: {}", e)))?;

        match (fields.get(TOKEN_KEY), fields.get(USER_KEY)) {
            (Some(token), Some(user)) => Ok(Some(StoredSession {
                access_token: token.clone(),
                user: user.clone(),
            })),
            _ => Ok(None),
        }
    }

    async fn put(&self, id: &str, session: StoredSession, ttl_secs: u64) -> AppResult<()> {
        let mut conn = self.connection();
        let key = Self::key(id);
        let ttl = i64::try_from(ttl_secs).unwrap_or(i64::MAX);

        redis::pipe()
            .atomic()
            .hset_multiple(
                &key,
                &[(TOKEN_KEY, session.access_token.as_str()), (USER_KEY, session.user.as_str())],
            )
            .ignore()
            .expire(&key, ttl)
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to store session in Redis: {}", e)))
    }

    async fn remove(&self, id: &str) -> AppResult<()> {
        let mut conn = self.connection();
        conn.del::<_, ()>(Self::key(id))
            .await
            .map_err(|e| AppError::Internal(format!("Failed to delete session from Redis: {}", e)))
    }

    async fn ping(&self) -> AppResult<()> {
        let mut conn = self.connection();
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map(|_| ())
            .map_err(|e| AppError::Internal(format!("Redis connection test failed: {}", e)))
    }
}

/// Build the store selected by `session.store`
pub async fn build_store(config: &AppConfig) -> AppResult<Arc<dyn SessionStore>> {
    match config.session.store {
        SessionStoreKind::Memory => Ok(Arc::new(MemorySessionStore::new())),
        SessionStoreKind::Redis => Ok(Arc::new(RedisSessionStore::new(&config.redis.url).await?)),
    }
}

// ---------------------------------------------------------------------------
// Session lifecycle
// ---------------------------------------------------------------------------

/// Token and profile of a logged-in user
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSession {
    pub token: String,
    pub user: SessionUser,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    Anonymous,
    /// Credentials submitted, backend answer pending
    Authenticating,
    Authenticated(AuthSession),
}

/// Session of the current request, restored by the session middleware
#[derive(Debug, Clone, PartialEq)]
pub struct SessionContext {
    id: Option<String>,
    state: AuthState,
}

impl SessionContext {
    pub fn anonymous() -> Self {
        Self {
            id: None,
            state: AuthState::Anonymous,
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn session(&self) -> Option<&AuthSession> {
        match &self.state {
            AuthState::Authenticated(session) => Some(session),
            _ => None,
        }
    }

    pub fn user(&self) -> Option<&SessionUser> {
        self.session().map(|s| &s.user)
    }

    pub fn token(&self) -> Option<&str> {
        self.session().map(|s| s.token.as_str())
    }

    pub fn is_authenticated(&self) -> bool {
        self.session().is_some()
    }

    /// Enter `Authenticating`; the previous session id is kept until replaced
    pub fn begin_login(&mut self) {
        self.state = AuthState::Authenticating;
    }

    /// Back to `Anonymous`, forgetting the session id
    pub fn reset(&mut self) {
        self.id = None;
        self.state = AuthState::Anonymous;
    }

    /// Failed login: anonymous again, but the stored session (if any) is untouched
    pub fn abort_login(&mut self) {
        self.state = AuthState::Anonymous;
    }
}

/// Creates, restores and destroys sessions in the configured store
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    ttl_secs: u64,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, ttl_secs: u64) -> Self {
        Self { store, ttl_secs }
    }

    /// Load the session named by the cookie; any problem yields an anonymous context
    pub async fn restore(&self, id: Option<&str>) -> SessionContext {
        let Some(id) = id.filter(|id| !id.is_empty()) else {
            return SessionContext::anonymous();
        };

        let stored = match self.store.get(id).await {
            Ok(Some(stored)) => stored,
            Ok(None) => return SessionContext::anonymous(),
            Err(e) => {
                tracing::warn!("Failed to restore session: {}", e);
                return SessionContext::anonymous();
            }
        };

        match serde_json::from_str::<SessionUser>(&stored.user) {
            Ok(user) if !stored.access_token.is_empty() => SessionContext {
                id: Some(id.to_string()),
                state: AuthState::Authenticated(AuthSession {
                    token: stored.access_token,
                    user,
                }),
            },
            Ok(_) => SessionContext::anonymous(),
            Err(e) => {
                tracing::warn!("Discarding session with malformed user record: {}", e);
                SessionContext::anonymous()
            }
        }
    }

    /// Persist a fresh session under a new id and mark `ctx` authenticated
    pub async fn establish(
        &self,
        ctx: &mut SessionContext,
        token: String,
        user: SessionUser,
    ) -> AppResult<()> {
        let id = Uuid::new_v4().to_string();
        let record = StoredSession {
            access_token: token.clone(),
            user: serde_json::to_string(&user)
                .map_err(|e| AppError::Internal(format!("Failed to encode session user: {}", e)))?,
        };
        self.store.put(&id, record, self.ttl_secs).await?;

        // A login never reuses the id the browser came with
        if let Some(previous) = ctx.id.take() {
            if let Err(e) = self.store.remove(&previous).await {
                tracing::warn!("Failed to remove previous session: {}", e);
            }
        }

        tracing::info!("Session established for user {}", user.id);
        ctx.id = Some(id);
        ctx.state = AuthState::Authenticated(AuthSession { token, user });
        Ok(())
    }

    /// Remove the stored session and reset `ctx`; never fails
    pub async fn teardown(&self, ctx: &mut SessionContext) {
        if let Some(id) = ctx.id() {
            self.forget(id).await;
        }
        ctx.reset();
    }

    /// Remove a stored session by id, logging failures
    pub async fn forget(&self, id: &str) {
        if let Err(e) = self.store.remove(id).await {
            tracing::warn!("Failed to remove session: {}", e);
        }
    }

    pub async fn ping(&self) -> AppResult<()> {
        self.store.ping().await
    }
}
