use serde::{Deserialize, Serialize};
use std::fmt;

/// The client's belief about whether the user is signed in.
///
/// Every process starts in `Unknown`; the first session check or an explicit
/// login/logout settles it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Unknown,
    Authenticated,
    Unauthenticated,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionStatus::Unknown => "unknown",
            SessionStatus::Authenticated => "authenticated",
            SessionStatus::Unauthenticated => "unauthenticated",
        };
        f.write_str(name)
    }
}

/// Non-sensitive identity snapshot used to render the UI.
///
/// This is never proof of authentication; it is only shown optimistically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

impl UserProfile {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            bio: String::new(),
            email: String::new(),
            first_name: String::new(),
            last_name: String::new(),
        }
    }

    /// "First Last", falling back to the username when both names are blank.
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }

    /// Path of the user's home view.
    pub fn home_path(&self) -> String {
        format!("/{}", self.username)
    }
}

/// Process-wide authentication state.
///
/// A profile can only be attached to an authenticated session; the
/// constructors are the only way to build one.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Session {
    status: SessionStatus,
    profile: Option<UserProfile>,
}

impl Session {
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn authenticated(profile: Option<UserProfile>) -> Self {
        Self {
            status: SessionStatus::Authenticated,
            profile,
        }
    }

    pub fn unauthenticated() -> Self {
        Self {
            status: SessionStatus::Unauthenticated,
            profile: None,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn profile(&self) -> Option<&UserProfile> {
        self.profile.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }
}

/// Login form contents.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Sign-up form contents, including the confirmation field that never
/// leaves the client.
#[derive(Clone, Default)]
pub struct RegistrationRequest {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub password_confirmation: String,
}

impl RegistrationRequest {
    pub fn passwords_match(&self) -> bool {
        self.password == self.password_confirmation
    }
}

impl fmt::Debug for RegistrationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationRequest")
            .field("username", &self.username)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .finish_non_exhaustive()
    }
}

/// Proof that a renewal call succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Renewed;

/// Why a renewal request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum DenialReason {
    #[error("a refresh is already in progress")]
    AlreadyInProgress,
    #[error("refresh attempted within the cooldown window")]
    Cooldown,
    #[error("the server rate limited the refresh")]
    RateLimited,
    #[error("the session cannot be renewed")]
    Unrecoverable,
}

impl DenialReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenialReason::AlreadyInProgress => "already_in_progress",
            DenialReason::Cooldown => "cooldown",
            DenialReason::RateLimited => "rate_limited",
            DenialReason::Unrecoverable => "unrecoverable",
        }
    }
}

/// Result of asking the coordinator for a renewal.
pub type RefreshOutcome = std::result::Result<Renewed, DenialReason>;
