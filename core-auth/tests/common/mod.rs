#![allow(dead_code)]

use async_trait::async_trait;
use bridge_desktop::MemoryKeyValueStore;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{Clock, HttpClient, HttpMethod, HttpRequest, HttpResponse, KeyValueStore, ManualClock};
use core_auth::api::{endpoint_url, paths};
use core_auth::{
    ApiClient, AuthController, HttpSessionApi, NavigationWatcher, ProfileStore, RefreshCoordinator,
    RequestInterceptor, RouteGuard, SessionState,
};
use core_runtime::events::{CoreEvent, EventBus, Receiver};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

pub const BASE_URL: &str = "https://api.example.com/api/";
pub const FEED: &str = "get_posts/?page=1";

pub const USER_JSON: &str = r#"{"username": "ada", "bio": "Analyst", "email": "ada@example.com", "first_name": "Ada", "last_name": "Lovelace"}"#;

/// How the fake answers `POST token/refresh/`.
#[derive(Clone, Copy, Debug)]
pub enum RefreshBehavior {
    /// `{"success": true}` and the session becomes valid again, provided a
    /// login issued a refresh cookie; `{"success": false}` otherwise.
    Renew,
    /// `{"success": true}` but the session stays invalid.
    RenewWithoutEffect,
    /// HTTP 429.
    RateLimit,
    /// `{"success": false}`.
    Refuse,
}

/// In-process stand-in for the remote API with cookie-session semantics.
pub struct FakeServer {
    session_valid: AtomicBool,
    refresh_cookie: AtomicBool,
    refresh: Mutex<RefreshBehavior>,
    refresh_delay: Mutex<Duration>,
    calls: Mutex<HashMap<String, usize>>,
}

impl FakeServer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            session_valid: AtomicBool::new(false),
            refresh_cookie: AtomicBool::new(false),
            refresh: Mutex::new(RefreshBehavior::Renew),
            refresh_delay: Mutex::new(Duration::ZERO),
            calls: Mutex::new(HashMap::new()),
        })
    }

    pub fn set_refresh(&self, behavior: RefreshBehavior) {
        *self.refresh.lock().unwrap() = behavior;
    }

    pub fn set_refresh_delay(&self, delay: Duration) {
        *self.refresh_delay.lock().unwrap() = delay;
    }

    /// Let the access cookie lapse.
    pub fn expire_session(&self) {
        self.session_valid.store(false, Ordering::SeqCst);
    }

    pub fn calls(&self, path: &str) -> usize {
        self.calls.lock().unwrap().get(path).copied().unwrap_or(0)
    }

    fn valid(&self) -> bool {
        self.session_valid.load(Ordering::SeqCst)
    }

    fn guarded(&self, body: &str) -> HttpResponse {
        if self.valid() {
            HttpResponse::new(200, body.to_string())
        } else {
            HttpResponse::new(401, r#"{"detail": "Given token not valid"}"#)
        }
    }
}

#[async_trait]
impl HttpClient for FakeServer {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        let path = request
            .url
            .strip_prefix(BASE_URL)
            .unwrap_or(&request.url)
            .to_string();
        *self.calls.lock().unwrap().entry(path.clone()).or_default() += 1;

        let response = match (request.method, path.as_str()) {
            (HttpMethod::Post, paths::AUTHENTICATE) => {
                let body: serde_json::Value =
                    serde_json::from_slice(request.body.as_deref().unwrap_or_default())
                        .unwrap_or_default();
                if body["username"] == "ada" && body["password"] == "s3cret!" {
                    self.session_valid.store(true, Ordering::SeqCst);
                    self.refresh_cookie.store(true, Ordering::SeqCst);
                    HttpResponse::new(200, format!(r#"{{"success": true, "user": {}}}"#, USER_JSON))
                } else {
                    HttpResponse::new(200, r#"{"success": false}"#)
                }
            }
            (HttpMethod::Post, paths::REFRESH) => {
                let delay = *self.refresh_delay.lock().unwrap();
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                let behavior = *self.refresh.lock().unwrap();
                match behavior {
                    RefreshBehavior::Renew if self.refresh_cookie.load(Ordering::SeqCst) => {
                        self.session_valid.store(true, Ordering::SeqCst);
                        HttpResponse::new(200, r#"{"success": true}"#)
                    }
                    RefreshBehavior::Renew => HttpResponse::new(200, r#"{"success": false}"#),
                    RefreshBehavior::RenewWithoutEffect => {
                        HttpResponse::new(200, r#"{"success": true}"#)
                    }
                    RefreshBehavior::RateLimit => HttpResponse::new(429, ""),
                    RefreshBehavior::Refuse => HttpResponse::new(200, r#"{"success": false}"#),
                }
            }
            (HttpMethod::Get, paths::WHOAMI) => self.guarded(r#"{"authenticated": true}"#),
            (HttpMethod::Post, paths::TERMINATE) => {
                self.session_valid.store(false, Ordering::SeqCst);
                self.refresh_cookie.store(false, Ordering::SeqCst);
                HttpResponse::new(200, r#"{"success": true}"#)
            }
            (HttpMethod::Get, FEED) => self.guarded(r#"{"results": [], "next": null}"#),
            _ => HttpResponse::new(404, ""),
        };

        Ok(response)
    }
}

/// Everything a host would wire, over the fake server.
pub struct Harness {
    pub server: Arc<FakeServer>,
    pub clock: Arc<ManualClock>,
    pub store: Arc<dyn KeyValueStore>,
    pub events: EventBus,
    pub coordinator: Arc<RefreshCoordinator>,
    pub api: ApiClient,
    pub controller: AuthController,
    pub guard: RouteGuard,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryKeyValueStore::new()))
    }

    pub fn with_store(store: Arc<dyn KeyValueStore>) -> Self {
        let server = FakeServer::new();
        let clock = Arc::new(ManualClock::default());
        let events = EventBus::new(256);
        let base = Url::parse(BASE_URL).unwrap();

        let state = Arc::new(SessionState::new(
            ProfileStore::new(store.clone()),
            events.clone(),
            "/login",
        ));
        let coordinator = Arc::new(RefreshCoordinator::new(
            server.clone(),
            endpoint_url(&base, paths::REFRESH).unwrap(),
            clock.clone() as Arc<dyn Clock>,
            Duration::from_secs(5),
            events.clone(),
            state.clone(),
        ));
        let interceptor = Arc::new(RequestInterceptor::new(server.clone(), coordinator.clone()));
        let api = ApiClient::new(base, interceptor);
        let controller = AuthController::new(Arc::new(HttpSessionApi::new(api.clone())), state);

        Self {
            server,
            clock,
            store,
            events,
            coordinator,
            api,
            controller,
            guard: RouteGuard::new("/login"),
        }
    }

    pub fn watcher(&self, debounce: Duration) -> NavigationWatcher {
        NavigationWatcher::new(self.controller.clone(), debounce)
    }
}

pub fn drain(rx: &mut Receiver<CoreEvent>) -> Vec<CoreEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
