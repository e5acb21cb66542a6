mod common;

use common::{drain, Harness, RefreshBehavior, FEED};
use core_auth::api::paths;
use core_auth::{AuthError, Credentials, DenialReason, GuardDecision, SessionStatus};
use core_runtime::events::{AuthEvent, CoreEvent, NavigationEvent};
use std::time::Duration;

async fn signed_in() -> Harness {
    let harness = Harness::new();
    harness
        .controller
        .login(Credentials::new("ada", "s3cret!"))
        .await
        .unwrap();
    harness
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_expired_requests_share_one_refresh() {
    let harness = signed_in().await;
    harness.server.expire_session();
    harness.server.set_refresh_delay(Duration::from_millis(50));

    let (a, b, c) = tokio::join!(
        harness.api.get_json::<serde_json::Value>(FEED),
        harness.api.get_json::<serde_json::Value>(FEED),
        harness.api.get_json::<serde_json::Value>(FEED),
    );
    let results = [a, b, c];

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    let expired = results
        .iter()
        .filter(|r| matches!(r, Err(AuthError::AuthExpired)))
        .count();

    assert_eq!(harness.server.calls(paths::REFRESH), 1);
    assert_eq!(succeeded, 1);
    assert_eq!(expired, 2);
    assert_eq!(harness.controller.status(), SessionStatus::Authenticated);
}

#[tokio::test]
async fn test_replayed_request_is_not_retried_twice() {
    let harness = signed_in().await;
    harness.server.expire_session();
    harness
        .server
        .set_refresh(RefreshBehavior::RenewWithoutEffect);

    let result = harness.api.get_json::<serde_json::Value>(FEED).await;

    assert_eq!(result.unwrap_err(), AuthError::AuthExpired);
    assert_eq!(harness.server.calls(FEED), 2);
    assert_eq!(harness.server.calls(paths::REFRESH), 1);
}

#[tokio::test]
async fn test_renewed_request_is_replayed_once() {
    let harness = signed_in().await;
    harness.server.expire_session();

    let result = harness.api.get_json::<serde_json::Value>(FEED).await;

    assert!(result.is_ok());
    assert_eq!(harness.server.calls(FEED), 2);
    assert_eq!(harness.server.calls(paths::REFRESH), 1);
}

#[tokio::test]
async fn test_cooldown_denies_second_refresh_without_network() {
    let harness = signed_in().await;

    assert!(harness.coordinator.request_refresh().await.is_ok());
    harness.clock.advance(Duration::from_secs(2));
    assert_eq!(
        harness.coordinator.request_refresh().await,
        Err(DenialReason::Cooldown)
    );
    assert_eq!(harness.server.calls(paths::REFRESH), 1);

    harness.clock.advance(Duration::from_secs(3));
    assert!(harness.coordinator.request_refresh().await.is_ok());
    assert_eq!(harness.server.calls(paths::REFRESH), 2);
}

#[tokio::test]
async fn test_rate_limited_refresh_keeps_session() {
    let harness = signed_in().await;
    let mut events = harness.events.subscribe();
    harness.server.expire_session();
    harness.server.set_refresh(RefreshBehavior::RateLimit);

    let result = harness.api.get_json::<serde_json::Value>(FEED).await;

    assert_eq!(result.unwrap_err(), AuthError::RefreshRateLimited);
    assert_eq!(harness.controller.status(), SessionStatus::Authenticated);
    assert!(harness.controller.session().profile().is_some());

    let events = drain(&mut events);
    assert!(!events.iter().any(|e| matches!(
        e,
        CoreEvent::Navigation(NavigationEvent::Redirect { .. })
            | CoreEvent::Auth(AuthEvent::SessionExpired)
    )));
    assert!(events.contains(&CoreEvent::Auth(AuthEvent::RefreshDenied {
        reason: "rate_limited".into()
    })));
}

#[tokio::test]
async fn test_rate_limited_check_keeps_session() {
    let harness = signed_in().await;
    harness.server.expire_session();
    harness.server.set_refresh(RefreshBehavior::RateLimit);

    assert_eq!(
        harness.controller.check_session().await,
        SessionStatus::Authenticated
    );
}

#[tokio::test]
async fn test_unrecoverable_refresh_ends_session_and_guard_redirects() {
    let harness = signed_in().await;
    let mut events = harness.events.subscribe();
    harness.server.expire_session();
    harness.server.set_refresh(RefreshBehavior::Refuse);

    let result = harness.api.get_json::<serde_json::Value>(FEED).await;

    assert_eq!(result.unwrap_err(), AuthError::RefreshUnrecoverable);
    assert_eq!(harness.controller.status(), SessionStatus::Unauthenticated);
    assert!(harness.controller.session().profile().is_none());
    assert_eq!(
        harness.guard.decide(&harness.controller.session()),
        GuardDecision::Redirect {
            to: "/login".into()
        }
    );

    let events = drain(&mut events);
    assert!(events.contains(&CoreEvent::Auth(AuthEvent::SessionExpired)));
    let redirects = events
        .iter()
        .filter(|e| matches!(e, CoreEvent::Navigation(NavigationEvent::Redirect { .. })))
        .count();
    assert_eq!(redirects, 1);
}

#[tokio::test]
async fn test_http_error_surfaces_without_state_change() {
    let harness = signed_in().await;

    let result = harness
        .api
        .get_json::<serde_json::Value>("does-not-exist/")
        .await;

    assert_eq!(result.unwrap_err(), AuthError::Http { status: 404 });
    assert_eq!(harness.controller.status(), SessionStatus::Authenticated);
    assert_eq!(harness.server.calls(paths::REFRESH), 0);
}
