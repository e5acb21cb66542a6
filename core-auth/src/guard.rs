//! Route guard for protected views.

use crate::types::{Session, SessionStatus};
use tokio::sync::watch;

/// What the router should do with a protected route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// The first session check has not finished; show a neutral placeholder.
    Loading,
    /// Show the requested view.
    Render,
    /// Send the user elsewhere.
    Redirect { to: String },
}

/// Stateless gate in front of protected views.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    login_path: String,
}

impl RouteGuard {
    pub fn new(login_path: impl Into<String>) -> Self {
        Self {
            login_path: login_path.into(),
        }
    }

    /// Decide purely from the session status.
    pub fn decide(&self, session: &Session) -> GuardDecision {
        match session.status() {
            SessionStatus::Unknown => GuardDecision::Loading,
            SessionStatus::Authenticated => GuardDecision::Render,
            SessionStatus::Unauthenticated => GuardDecision::Redirect {
                to: self.login_path.clone(),
            },
        }
    }

    /// Wait until the session leaves `Unknown` and decide.
    ///
    /// Returns `Loading` if the session source is dropped before that.
    pub async fn wait_for_decision(&self, sessions: &mut watch::Receiver<Session>) -> GuardDecision {
        match sessions
            .wait_for(|session| session.status() != SessionStatus::Unknown)
            .await
        {
            Ok(session) => self.decide(&session),
            Err(_) => GuardDecision::Loading,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UserProfile;

    #[test]
    fn test_decisions() {
        let guard = RouteGuard::new("/login");

        assert_eq!(guard.decide(&Session::unknown()), GuardDecision::Loading);
        assert_eq!(
            guard.decide(&Session::authenticated(Some(UserProfile::new("ada")))),
            GuardDecision::Render
        );
        assert_eq!(
            guard.decide(&Session::unauthenticated()),
            GuardDecision::Redirect {
                to: "/login".into()
            }
        );
    }

    #[tokio::test]
    async fn test_wait_for_decision() {
        let guard = RouteGuard::new("/login");
        let (tx, mut rx) = watch::channel(Session::unknown());

        let waiter = tokio::spawn(async move { guard.wait_for_decision(&mut rx).await });
        tx.send(Session::authenticated(None)).unwrap();

        assert_eq!(waiter.await.unwrap(), GuardDecision::Render);
    }

    #[tokio::test]
    async fn test_wait_for_decision_when_source_dropped() {
        let guard = RouteGuard::new("/login");
        let (tx, mut rx) = watch::channel(Session::unknown());
        drop(tx);

        assert_eq!(guard.wait_for_decision(&mut rx).await, GuardDecision::Loading);
    }
}
