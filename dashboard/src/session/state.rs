//! # Session State Machine
//!
//! Pure reducer behind [`super::SessionStore`]. Token and user live in one
//! `Option`, so they are always set and cleared together.

use shared::User;

/// Authenticated identity.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatedUser {
    pub user: User,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub auth: Option<AuthenticatedUser>,
    /// True while a login is in flight and until the first restore finished
    pub is_loading: bool,
    pub error: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::initial()
    }
}

impl SessionState {
    /// State at process start: unresolved until `restore` completes.
    pub fn initial() -> Self {
        Self {
            auth: None,
            is_loading: true,
            error: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth.is_some()
    }

    pub fn user(&self) -> Option<&User> {
        self.auth.as_ref().map(|auth| &auth.user)
    }

    pub fn token(&self) -> Option<&str> {
        self.auth.as_ref().map(|auth| auth.token.as_str())
    }

    /// User id once the session is resolved and authenticated.
    ///
    /// Stores gate every fetch on this, so nothing is requested while a
    /// restore or login is still in flight.
    pub fn ready_user_id(&self) -> Option<i64> {
        if self.is_loading {
            return None;
        }
        self.user().map(|user| user.user_id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    LoginStart,
    LoginSuccess { user: User, token: String },
    LoginFailure(String),
    Logout,
    ClearError,
}

impl SessionAction {
    pub fn name(&self) -> &'static str {
        match self {
            SessionAction::LoginStart => "LOGIN_START",
            SessionAction::LoginSuccess { .. } => "LOGIN_SUCCESS",
            SessionAction::LoginFailure(_) => "LOGIN_FAILURE",
            SessionAction::Logout => "LOGOUT",
            SessionAction::ClearError => "CLEAR_ERROR",
        }
    }
}

pub fn reduce(state: &SessionState, action: SessionAction) -> SessionState {
    match action {
        SessionAction::LoginStart => SessionState {
            is_loading: true,
            error: None,
            ..state.clone()
        },
        SessionAction::LoginSuccess { user, token } => SessionState {
            auth: Some(AuthenticatedUser { user, token }),
            is_loading: false,
            error: None,
        },
        SessionAction::LoginFailure(message) => SessionState {
            auth: None,
            is_loading: false,
            error: Some(message),
        },
        SessionAction::Logout => SessionState {
            auth: None,
            is_loading: false,
            error: None,
        },
        SessionAction::ClearError => SessionState {
            error: None,
            ..state.clone()
        },
    }
}
