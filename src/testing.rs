//! Test double for the admin dashboard collaborator.
//!
//! `FakeApiClient` serves canned responses in FIFO order, or — in gated
//! mode — parks every request on a oneshot channel so a test controls
//! resolution order exactly (supersession and cancellation tests need
//! requests that resolve out of start order).

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::oneshot;

use crate::api::ApiClient;
use crate::error::Error;

pub(crate) struct FakeApiClient {
    gated: bool,
    canned: Mutex<VecDeque<Result<Value, Error>>>,
    pending: Mutex<Vec<(String, oneshot::Sender<Result<Value, Error>>)>>,
    calls: Mutex<Vec<String>>,
    token: Mutex<Option<String>>,
}

impl FakeApiClient {
    /// Canned mode: each request pops the next queued response.
    pub(crate) fn new() -> Self {
        Self {
            gated: false,
            canned: Mutex::new(VecDeque::new()),
            pending: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            token: Mutex::new(None),
        }
    }

    /// Gated mode: requests park until `resolve_pending` is called.
    pub(crate) fn gated() -> Self {
        Self {
            gated: true,
            ..Self::new()
        }
    }

    pub(crate) fn push_ok(&self, value: Value) {
        self.canned.lock().unwrap().push_back(Ok(value));
    }

    pub(crate) fn push_err(&self, err: Error) {
        self.canned.lock().unwrap().push_back(Err(err));
    }

    /// Descriptors of every request seen, e.g. `GET /menus?page=1&limit=10`.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn auth_token(&self) -> Option<String> {
        self.token.lock().unwrap().clone()
    }

    /// Resolve the parked request at `index` (in arrival order). Sending to
    /// a caller that gave up (cancelled) is fine; the result is dropped.
    pub(crate) fn resolve_pending(&self, index: usize, result: Result<Value, Error>) {
        let (_, tx) = self.pending.lock().unwrap().remove(index);
        let _ = tx.send(result);
    }

    /// Yield until `n` requests are parked. Panics rather than hanging when
    /// the requests never arrive.
    pub(crate) async fn wait_for_pending(&self, n: usize) {
        for _ in 0..10_000 {
            if self.pending.lock().unwrap().len() >= n {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("timed out waiting for {n} in-flight requests");
    }

    async fn respond(&self, desc: String) -> Result<Value, Error> {
        self.calls.lock().unwrap().push(desc.clone());
        if self.gated {
            let (tx, rx) = oneshot::channel();
            self.pending.lock().unwrap().push((desc, tx));
            rx.await
                .unwrap_or_else(|_| Err(Error::Network("test channel closed".into())))
        } else {
            self.canned
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(Value::Null))
        }
    }

    fn describe(method: &str, path: &str, query: &[(String, String)]) -> String {
        if query.is_empty() {
            return format!("{method} {path}");
        }
        let qs = query
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        format!("{method} {path}?{qs}")
    }
}

#[async_trait]
impl ApiClient for FakeApiClient {
    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<Value, Error> {
        self.respond(Self::describe("GET", path, query)).await
    }

    async fn post(&self, path: &str, _body: &Value) -> Result<Value, Error> {
        self.respond(Self::describe("POST", path, &[])).await
    }

    async fn put(&self, path: &str, _body: &Value) -> Result<Value, Error> {
        self.respond(Self::describe("PUT", path, &[])).await
    }

    async fn delete(&self, path: &str) -> Result<Value, Error> {
        self.respond(Self::describe("DELETE", path, &[])).await
    }

    fn set_auth_token(&self, token: Option<&str>) {
        *self.token.lock().unwrap() = token.map(|t| t.to_string());
    }
}
