//! The session store: single source of truth for the current identity.

use std::sync::Arc;

use chrono::Utc;
use log::{debug, error, info, warn};
use tokio::sync::RwLock;

use clubgate_protocol::{LoginRequest, RegisterRequest, UserRecord};

use super::backend::AuthBackend;
use super::storage::{SessionSnapshot, SessionStorage};
use crate::error::{AuthError, StorageError};

/// In-memory session state. The only mutable shared state in the core.
#[derive(Debug, Default)]
struct SessionState {
    user: Option<UserRecord>,
    token: Option<String>,
    /// Bumped on every credential change (login, register, refresh, logout).
    /// Lets the request pipeline detect that the session it captured a token
    /// from no longer exists.
    epoch: u64,
}

/// Holds the current identity and its bearer token, persisted durably across
/// restarts.
///
/// Constructed once at startup; mutation always writes the in-memory value
/// first and the durable snapshot within the same operation, so no caller
/// observes one without the other.
pub struct SessionStore {
    state: RwLock<SessionState>,
    storage: Arc<dyn SessionStorage>,
    backend: Arc<dyn AuthBackend>,
}

impl SessionStore {
    /// Open the store, loading any persisted session.
    ///
    /// A corrupt snapshot boots an anonymous session and clears the stored
    /// file; it never aborts startup.
    pub async fn open(
        storage: Arc<dyn SessionStorage>,
        backend: Arc<dyn AuthBackend>,
    ) -> Self {
        let snapshot = match storage.load().await {
            Ok(snapshot) => snapshot,
            Err(StorageError::Corrupt(reason)) => {
                warn!("discarding corrupt session snapshot: {reason}");
                if let Err(err) = storage.clear().await {
                    warn!("failed to clear corrupt session snapshot: {err}");
                }
                SessionSnapshot::empty()
            }
            Err(err) => {
                warn!("failed to read session snapshot, starting anonymous: {err}");
                SessionSnapshot::empty()
            }
        };

        let state = SessionState {
            user: snapshot.user,
            token: snapshot.token,
            epoch: 0,
        };
        if state.token.is_some() {
            debug!("restored persisted session for {:?}", state.user.as_ref().map(|u| u.user_id));
        }

        Self {
            state: RwLock::new(state),
            storage,
            backend,
        }
    }

    /// Authenticate. On success the identity and token are set atomically and
    /// persisted; on rejection the prior session is left untouched.
    pub async fn login(&self, request: &LoginRequest) -> Result<UserRecord, AuthError> {
        let data = self.backend.login(request).await?;
        info!("login succeeded for {}", data.user.user_name);
        self.install(Some(data.user.clone()), Some(data.token)).await;
        Ok(data.user)
    }

    /// Create an account and establish a session in one step.
    pub async fn register(&self, request: &RegisterRequest) -> Result<UserRecord, AuthError> {
        let data = self.backend.register(request).await?;
        info!("registration succeeded for {}", data.user.user_name);
        self.install(Some(data.user.clone()), Some(data.token)).await;
        Ok(data.user)
    }

    /// Exchange the current token for a fresh one. The user record is left
    /// unchanged. On any failure the session is left otherwise intact, so
    /// repeated attempts stay safe; whether to log out is the caller's call.
    pub async fn refresh(&self) -> Result<String, AuthError> {
        let current = self
            .state
            .read()
            .await
            .token
            .clone()
            .ok_or(AuthError::Expired)?;

        let fresh = self.backend.refresh(&current).await?;

        let mut state = self.state.write().await;
        if state.token.is_none() {
            // Logged out while the refresh was in flight; do not resurrect
            // the session.
            warn!("refresh completed after logout, discarding new token");
            return Err(AuthError::Expired);
        }
        state.token = Some(fresh.clone());
        state.epoch += 1;
        self.persist(&state).await;
        debug!("token refreshed, epoch {}", state.epoch);
        Ok(fresh)
    }

    /// Clear the session from memory and durable storage. Idempotent.
    pub async fn logout(&self) {
        let mut state = self.state.write().await;
        state.user = None;
        state.token = None;
        state.epoch += 1;
        if let Err(err) = self.storage.clear().await {
            error!("failed to clear persisted session: {err}");
        }
        info!("logged out");
    }

    /// True iff both the user record and the token are present.
    pub async fn is_authenticated(&self) -> bool {
        let state = self.state.read().await;
        state.user.is_some() && state.token.is_some()
    }

    /// Current bearer token, if any, with the epoch it belongs to.
    pub async fn token(&self) -> (Option<String>, u64) {
        let state = self.state.read().await;
        (state.token.clone(), state.epoch)
    }

    /// Current identity, if any.
    pub async fn current_user(&self) -> Option<UserRecord> {
        self.state.read().await.user.clone()
    }

    /// Current session epoch.
    pub async fn epoch(&self) -> u64 {
        self.state.read().await.epoch
    }

    /// Replace the whole session under one write lock and persist it.
    async fn install(&self, user: Option<UserRecord>, token: Option<String>) {
        let mut state = self.state.write().await;
        state.user = user;
        state.token = token;
        state.epoch += 1;
        self.persist(&state).await;
    }

    /// Write-through to durable storage. Storage is a cache of memory: a
    /// failed write keeps the in-memory session valid but is logged loudly.
    async fn persist(&self, state: &SessionState) {
        let snapshot = SessionSnapshot {
            user: state.user.clone(),
            token: state.token.clone(),
            saved_at: Some(Utc::now()),
        };
        if let Err(err) = self.storage.store(&snapshot).await {
            error!("failed to persist session snapshot: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::storage::MemoryStorage;
    use async_trait::async_trait;
    use clubgate_protocol::LoginData;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedBackend {
        login_ok: bool,
        refresh_calls: AtomicUsize,
        refresh_token: Option<String>,
    }

    impl ScriptedBackend {
        fn accepting() -> Self {
            Self {
                login_ok: true,
                refresh_calls: AtomicUsize::new(0),
                refresh_token: Some("tok2".to_string()),
            }
        }

        fn rejecting() -> Self {
            Self {
                login_ok: false,
                refresh_calls: AtomicUsize::new(0),
                refresh_token: None,
            }
        }

        fn user() -> UserRecord {
            UserRecord {
                user_id: 1,
                user_name: "kai".to_string(),
                name: "Kai".to_string(),
                role_id: 2,
                avatar: None,
            }
        }
    }

    #[async_trait]
    impl AuthBackend for ScriptedBackend {
        async fn login(&self, _request: &LoginRequest) -> Result<LoginData, AuthError> {
            if self.login_ok {
                Ok(LoginData {
                    user: Self::user(),
                    token: "tok1".to_string(),
                })
            } else {
                Err(AuthError::Rejected("wrong password".to_string()))
            }
        }

        async fn register(&self, _request: &RegisterRequest) -> Result<LoginData, AuthError> {
            self.login(&LoginRequest {
                user_name: String::new(),
                password: String::new(),
            })
            .await
        }

        async fn refresh(&self, _token: &str) -> Result<String, AuthError> {
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            self.refresh_token.clone().ok_or(AuthError::Expired)
        }
    }

    fn login_request() -> LoginRequest {
        LoginRequest {
            user_name: "kai".to_string(),
            password: "hunter2".to_string(),
        }
    }

    async fn open_store(backend: ScriptedBackend) -> (SessionStore, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        let store = SessionStore::open(storage.clone(), Arc::new(backend)).await;
        (store, storage)
    }

    #[tokio::test]
    async fn test_login_then_authenticated() {
        let (store, storage) = open_store(ScriptedBackend::accepting()).await;
        assert!(!store.is_authenticated().await);

        let user = store.login(&login_request()).await.unwrap();
        assert_eq!(user.user_name, "kai");
        assert!(store.is_authenticated().await);
        assert_eq!(store.token().await.0.as_deref(), Some("tok1"));
        assert!(!storage.is_empty().await);
    }

    #[tokio::test]
    async fn test_rejected_login_leaves_session_untouched() {
        let (store, storage) = open_store(ScriptedBackend::rejecting()).await;
        let err = store.login(&login_request()).await.unwrap_err();
        assert_eq!(err, AuthError::Rejected("wrong password".to_string()));
        assert!(!store.is_authenticated().await);
        assert!(storage.is_empty().await);
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let (store, storage) = open_store(ScriptedBackend::accepting()).await;
        store.login(&login_request()).await.unwrap();

        store.logout().await;
        assert!(!store.is_authenticated().await);
        assert!(storage.is_empty().await);

        store.logout().await;
        assert!(!store.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_refresh_replaces_only_token() {
        let (store, _storage) = open_store(ScriptedBackend::accepting()).await;
        store.login(&login_request()).await.unwrap();
        let epoch_before = store.epoch().await;

        let fresh = store.refresh().await.unwrap();
        assert_eq!(fresh, "tok2");
        assert_eq!(store.token().await.0.as_deref(), Some("tok2"));
        assert_eq!(store.current_user().await.unwrap().user_name, "kai");
        assert_eq!(store.epoch().await, epoch_before + 1);
    }

    #[tokio::test]
    async fn test_refresh_without_token_is_expired() {
        let (store, _storage) = open_store(ScriptedBackend::accepting()).await;
        assert_eq!(store.refresh().await.unwrap_err(), AuthError::Expired);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_session() {
        let backend = ScriptedBackend {
            login_ok: true,
            refresh_calls: AtomicUsize::new(0),
            refresh_token: None,
        };
        let (store, _storage) = open_store(backend).await;
        store.login(&login_request()).await.unwrap();

        assert_eq!(store.refresh().await.unwrap_err(), AuthError::Expired);
        // Session left intact; a later attempt is safe.
        assert!(store.is_authenticated().await);
        assert_eq!(store.token().await.0.as_deref(), Some("tok1"));
    }

    #[tokio::test]
    async fn test_restart_restores_from_storage() {
        let storage = Arc::new(MemoryStorage::new());
        let store =
            SessionStore::open(storage.clone(), Arc::new(ScriptedBackend::accepting())).await;
        store.login(&login_request()).await.unwrap();
        drop(store);

        // Same storage, fresh process.
        let store =
            SessionStore::open(storage.clone(), Arc::new(ScriptedBackend::accepting())).await;
        assert!(store.is_authenticated().await);
        assert_eq!(store.token().await.0.as_deref(), Some("tok1"));
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_boots_anonymous() {
        let storage = Arc::new(MemoryStorage::new());
        storage.seed_raw(b"}}} not json".to_vec()).await;

        let store =
            SessionStore::open(storage.clone(), Arc::new(ScriptedBackend::accepting())).await;
        assert!(!store.is_authenticated().await);
        // The corrupt snapshot was cleared.
        assert!(storage.is_empty().await);
    }
}
