//! Fakes shared by the unit tests of this crate.

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::{HttpClient, HttpRequest, HttpResponse};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

#[derive(Clone)]
enum Reply {
    Status(u16, String),
    TransportError,
}

#[derive(Default)]
struct Route {
    replies: VecDeque<Reply>,
    gate: Option<Arc<Notify>>,
}

/// HTTP client answering from per-path scripts.
///
/// Replies queued for a path are consumed in order; the last one keeps
/// answering once the queue is down to a single entry. Paths without a script
/// answer 404.
#[derive(Default)]
pub(crate) struct ScriptedHttpClient {
    routes: Mutex<HashMap<String, Route>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedHttpClient {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn reply(&self, path: &str, status: u16, body: &str) {
        self.route(path, |route| {
            route
                .replies
                .push_back(Reply::Status(status, body.to_string()))
        });
    }

    pub(crate) fn fail(&self, path: &str) {
        self.route(path, |route| route.replies.push_back(Reply::TransportError));
    }

    /// Hold every call to `path` until the returned handle is notified.
    pub(crate) fn gate(&self, path: &str) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        let handle = notify.clone();
        self.route(path, move |route| route.gate = Some(handle));
        notify
    }

    pub(crate) fn calls_to(&self, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|request| request.url.ends_with(path))
            .count()
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn route(&self, path: &str, update: impl FnOnce(&mut Route)) {
        let mut routes = self.routes.lock().unwrap();
        update(routes.entry(path.to_string()).or_default());
    }

    fn next_reply(&self, url: &str) -> (Option<Reply>, Option<Arc<Notify>>) {
        let mut routes = self.routes.lock().unwrap();
        let Some(route) = routes
            .iter_mut()
            .filter(|(path, _)| url.ends_with(path.as_str()))
            .max_by_key(|(path, _)| path.len())
            .map(|(_, route)| route)
        else {
            return (None, None);
        };

        let reply = if route.replies.len() > 1 {
            route.replies.pop_front()
        } else {
            route.replies.front().cloned()
        };
        (reply, route.gate.clone())
    }
}

#[async_trait]
impl HttpClient for ScriptedHttpClient {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        let url = request.url.clone();
        self.requests.lock().unwrap().push(request);

        let (reply, gate) = self.next_reply(&url);
        if let Some(gate) = gate {
            gate.notified().await;
        }

        match reply {
            Some(Reply::Status(status, body)) => Ok(HttpResponse::new(status, body)),
            Some(Reply::TransportError) => {
                Err(BridgeError::Connection(format!("connection refused: {}", url)))
            }
            None => Ok(HttpResponse::new(404, "")),
        }
    }
}
