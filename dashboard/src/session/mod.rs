//! # Session Store
//!
//! Owns authentication state and its persistence. Every resource store is
//! handed an `Arc<SessionStore>` at construction and reads the session from
//! it; nothing reaches for a global.
//!
//! State is published through a `tokio::sync::watch` channel so stores can
//! react to login and logout:
//!
//! ```text
//!   initial (loading) ──restore──► authenticated | anonymous
//!   anonymous ──login──► LOGIN_START ──► LOGIN_SUCCESS | LOGIN_FAILURE
//!   any ──logout──► anonymous (storage cleared)
//! ```

pub mod state;

use shared::{Account, Profile, RegisterRequest, User};
use std::sync::Arc;
use tokio::sync::watch;

use crate::core::error::{AppError, Result};
use crate::services::api::{account, auth, ApiClient};
use crate::services::storage::{TOKEN_KEY, USER_KEY, WATCHLIST_CACHE_PREFIX};
use crate::utils::validation::{self, ValidationResult};

pub use state::{reduce, AuthenticatedUser, SessionAction, SessionState};

pub struct SessionStore {
    client: Arc<ApiClient>,
    state: watch::Sender<SessionState>,
}

impl SessionStore {
    pub fn new(client: Arc<ApiClient>) -> Self {
        let (state, _) = watch::channel(SessionState::initial());
        Self { client, state }
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// See [`SessionState::ready_user_id`].
    pub fn ready_user_id(&self) -> Option<i64> {
        self.state.borrow().ready_user_id()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    pub fn dispatch(&self, action: SessionAction) {
        let name = action.name();
        self.state.send_modify(|state| *state = reduce(state, action));
        tracing::debug!(action = name, "Session transition");
    }

    pub fn clear_error(&self) {
        self.dispatch(SessionAction::ClearError);
    }

    #[tracing::instrument(skip(self, password), fields(username = %username))]
    pub async fn login(&self, username: &str, password: &str) -> Result<User> {
        let username = username.trim();
        let check = ValidationResult::first_failure([
            required(username, "Username is required"),
            required(password, "Password is required"),
        ]);
        if let Err(e) = check.into_result() {
            self.fail_login(&e);
            return Err(e);
        }

        self.dispatch(SessionAction::LoginStart);
        let result = auth::login(&self.client, username.to_string(), password.to_string()).await;
        self.complete_login(result)
    }

    #[tracing::instrument(skip(self, request), fields(username = %request.username))]
    pub async fn register(&self, request: RegisterRequest) -> Result<User> {
        if let Err(e) = validation::validate_registration(&request).into_result() {
            self.fail_login(&e);
            return Err(e);
        }

        self.dispatch(SessionAction::LoginStart);
        let result = auth::register(&self.client, request).await;
        self.complete_login(result)
    }

    /// Best-effort server logout, then clear persisted state and the session.
    /// Never fails.
    #[tracing::instrument(skip(self))]
    pub async fn logout(&self) {
        if self.client.token().is_some() {
            if let Err(e) = auth::logout(&self.client).await {
                tracing::warn!(error = %e, "Server logout failed, clearing local session anyway");
            }
        }
        self.force_logout();
        tracing::info!("Logged out");
    }

    /// Clear persisted state and the session without calling the backend.
    pub fn force_logout(&self) {
        self.clear_persisted();
        self.dispatch(SessionAction::Logout);
    }

    /// Silent restoration at startup.
    ///
    /// Reads the stored token, validates it with the backend and reconciles
    /// the result with the stored user blob. Any mismatch or failure ends in
    /// a logged-out session with cleared storage. Never fails; returns the
    /// restored user.
    #[tracing::instrument(skip(self))]
    pub async fn restore(&self) -> Option<User> {
        if self.client.token().is_none() {
            tracing::debug!("No stored token, starting anonymous");
            self.force_logout();
            return None;
        }

        let stored_user = self.stored_user();
        let validated = match auth::validate(&self.client).await {
            Ok(response) if response.valid => response.user,
            Ok(_) => {
                tracing::info!("Stored token rejected, clearing session");
                self.force_logout();
                return None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Token validation failed, clearing session");
                self.force_logout();
                return None;
            }
        };

        let user = match (validated, stored_user) {
            (Some(validated), Some(stored)) if validated.user_id != stored.user_id => {
                tracing::warn!(
                    validated_user_id = validated.user_id,
                    stored_user_id = stored.user_id,
                    "Stored user does not match token, clearing session"
                );
                None
            }
            (Some(validated), _) => Some(validated),
            (None, stored) => stored,
        };

        let (Some(user), Some(token)) = (user, self.client.token()) else {
            self.force_logout();
            return None;
        };

        if let Err(e) = self.persist(&token, &user) {
            tracing::warn!(error = %e, "Failed to persist restored session");
        }
        tracing::info!(user_id = user.user_id, "Session restored");
        self.dispatch(SessionAction::LoginSuccess {
            user: user.clone(),
            token,
        });
        Some(user)
    }

    /// Log out when `error` says the token is no longer accepted. Returns
    /// whether the session was cleared.
    pub fn handle_auth_error(&self, error: &AppError) -> bool {
        let expired = matches!(error, AppError::Unauthenticated) || error.status() == Some(401);
        if expired && self.is_authenticated() {
            tracing::warn!(error = %error, "Session expired");
            self.force_logout();
            return true;
        }
        false
    }

    pub async fn account(&self) -> Result<Account> {
        if !self.is_authenticated() {
            return Err(AppError::Unauthenticated);
        }
        account::get_account(&self.client).await
    }

    pub async fn profile(&self, user_id: i64) -> Result<Profile> {
        account::get_profile(&self.client, user_id).await
    }

    fn complete_login(&self, result: Result<shared::AuthResponse>) -> Result<User> {
        let response = match result {
            Ok(response) => response,
            Err(e) => {
                self.fail_login(&e);
                return Err(e);
            }
        };

        if let Err(e) = self.persist(&response.token, &response.user) {
            self.fail_login(&e);
            return Err(e);
        }

        self.dispatch(SessionAction::LoginSuccess {
            user: response.user.clone(),
            token: response.token,
        });
        Ok(response.user)
    }

    /// A failed login ends any previous session too, so storage must not keep
    /// a token the in-memory state no longer has.
    fn fail_login(&self, error: &AppError) {
        self.clear_persisted();
        self.dispatch(SessionAction::LoginFailure(error.user_message()));
    }

    fn persist(&self, token: &str, user: &User) -> Result<()> {
        let storage = self.client.storage();
        storage.set(TOKEN_KEY, token)?;
        if let Err(e) = storage.set(USER_KEY, &serde_json::to_string(user)?) {
            let _ = storage.remove(TOKEN_KEY);
            return Err(e);
        }
        Ok(())
    }

    fn stored_user(&self) -> Option<User> {
        let raw = self.client.storage().get(USER_KEY).ok().flatten()?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::warn!(error = %e, "Stored user blob is unreadable");
                None
            }
        }
    }

    fn clear_persisted(&self) {
        let storage = self.client.storage();
        for key in [TOKEN_KEY, USER_KEY] {
            if let Err(e) = storage.remove(key) {
                tracing::warn!(key, error = %e, "Failed to clear session key");
            }
        }
        match storage.keys() {
            Ok(keys) => {
                for key in keys.iter().filter(|key| key.starts_with(WATCHLIST_CACHE_PREFIX)) {
                    let _ = storage.remove(key);
                }
            }
            Err(e) => tracing::warn!(error = %e, "Failed to list cached keys"),
        }
    }
}

fn required(value: &str, message: &str) -> ValidationResult {
    if value.is_empty() {
        ValidationResult::err(message)
    } else {
        ValidationResult::ok()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::service::{KeyValueStore, Method};
    use crate::services::mock::{MockResponse, MockTransport};
    use crate::services::storage::{watchlist_cache_key, MemoryStore};
    use serde_json::json;

    pub(crate) fn login_response(user_id: i64) -> serde_json::Value {
        json!({
            "token": "tok-1",
            "user": { "user_id": user_id, "username": "alice", "email": "alice@example.com" }
        })
    }

    fn session() -> (SessionStore, Arc<MockTransport>, Arc<MemoryStore>) {
        let transport = Arc::new(MockTransport::new());
        let storage = Arc::new(MemoryStore::new());
        let client = Arc::new(ApiClient::with_transport(
            transport.clone(),
            storage.clone(),
            "http://api/v1",
            "http://api",
        ));
        (SessionStore::new(client), transport, storage)
    }

    #[tokio::test]
    async fn test_login_persists_token_and_user_together() {
        let (session, transport, storage) = session();
        transport.on(Method::Post, "/auth/login", MockResponse::json(200, login_response(7)));
        let mut rx = session.subscribe();

        let user = session.login("alice", "Secret123").await.unwrap();
        assert_eq!(user.user_id, 7);
        assert!(rx.has_changed().unwrap());

        let state = rx.borrow_and_update().clone();
        assert_eq!(state.ready_user_id(), Some(7));
        assert_eq!(storage.get(TOKEN_KEY).unwrap().as_deref(), Some("tok-1"));
        assert!(storage.get(USER_KEY).unwrap().unwrap().contains("\"user_id\":7"));
    }

    #[tokio::test]
    async fn test_register_rejects_weak_password_locally() {
        let (session, transport, storage) = session();
        let request = RegisterRequest {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password: "password".to_string(),
            first_name: None,
            last_name: None,
        };

        assert!(matches!(session.register(request).await, Err(AppError::Validation(_))));
        assert!(transport.calls().is_empty());
        assert!(storage.get(TOKEN_KEY).unwrap().is_none());
        let state = session.snapshot();
        assert!(!state.is_authenticated());
        assert_eq!(
            state.error.as_deref(),
            Some("Password needs an upper-case letter, a digit")
        );
    }

    #[tokio::test]
    async fn test_login_failure_sets_error() {
        let (session, transport, storage) = session();
        transport.on(
            Method::Post,
            "/auth/login",
            MockResponse::json(401, json!({ "error": "Invalid credentials" })),
        );

        assert!(session.login("alice", "wrong").await.is_err());
        let state = session.snapshot();
        assert_eq!(state.error.as_deref(), Some("Invalid credentials"));
        assert!(!state.is_loading);
        assert!(storage.get(TOKEN_KEY).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_login_drops_previous_session_from_storage() {
        let (session, transport, storage) = session();
        transport.on(Method::Post, "/auth/login", MockResponse::json(200, login_response(7)));
        session.login("alice", "Secret123").await.unwrap();
        assert!(session.client().token().is_some());

        assert!(session.login("alice", "").await.is_err());
        assert!(!session.is_authenticated());
        assert!(storage.get(TOKEN_KEY).unwrap().is_none());
        assert!(storage.get(USER_KEY).unwrap().is_none());
        assert!(session.client().token().is_none());
        assert_eq!(transport.call_count(Method::Post, "/auth/login"), 1);
    }

    #[tokio::test]
    async fn test_empty_credentials_never_reach_network() {
        let (session, transport, _) = session();

        let err = session.login("  ", "Secret123").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_restore_with_valid_token() {
        let (session, transport, storage) = session();
        storage.set(TOKEN_KEY, "tok-1").unwrap();
        storage
            .set(USER_KEY, r#"{"user_id":7,"username":"alice","email":"alice@example.com"}"#)
            .unwrap();
        transport.on(Method::Get, "/auth/validate", MockResponse::json(200, json!({ "valid": true })));

        assert!(session.snapshot().is_loading);
        let user = session.restore().await.unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(session.ready_user_id(), Some(7));
    }

    #[tokio::test]
    async fn test_restore_mismatch_forces_logout() {
        let (session, transport, storage) = session();
        storage.set(TOKEN_KEY, "tok-1").unwrap();
        storage
            .set(USER_KEY, r#"{"user_id":7,"username":"alice","email":"alice@example.com"}"#)
            .unwrap();
        transport.on(
            Method::Get,
            "/auth/validate",
            MockResponse::json(200, json!({ "valid": true, "user": { "user_id": 8, "username": "mallory" } })),
        );

        assert!(session.restore().await.is_none());
        let state = session.snapshot();
        assert!(!state.is_authenticated());
        assert!(!state.is_loading);
        assert!(storage.get(TOKEN_KEY).unwrap().is_none());
        assert!(storage.get(USER_KEY).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_restore_without_token_resolves_anonymous() {
        let (session, transport, _) = session();

        assert!(session.restore().await.is_none());
        assert!(!session.snapshot().is_loading);
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_logout_clears_storage_even_when_server_fails() {
        let (session, transport, storage) = session();
        transport.on(Method::Post, "/auth/login", MockResponse::json(200, login_response(7)));
        transport.on(Method::Post, "/auth/logout", MockResponse::network_error("connection reset"));
        session.login("alice", "Secret123").await.unwrap();
        storage.set(&watchlist_cache_key(7), "{}").unwrap();

        session.logout().await;
        assert!(!session.is_authenticated());
        assert!(storage.keys().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_401_expires_session() {
        let (session, transport, _) = session();
        transport.on(Method::Post, "/auth/login", MockResponse::json(200, login_response(7)));
        session.login("alice", "Secret123").await.unwrap();

        let forbidden = AppError::Http {
            status: 403,
            message: "Forbidden".to_string(),
            body: None,
        };
        assert!(!session.handle_auth_error(&forbidden));

        let expired = AppError::Http {
            status: 401,
            message: "Token expired".to_string(),
            body: None,
        };
        assert!(session.handle_auth_error(&expired));
        assert!(!session.is_authenticated());
    }
}
