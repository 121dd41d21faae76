//! Test doubles and common utilities for refresh contract tests
//!
//! The doubles record every network and storage interaction so tests can
//! assert on call counts without touching the network.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use yddns_core::{Domain, RefreshEngine, RefreshSettings, WanIpResolver};
use yddns_core::error::{Error, Result};
use yddns_core::traits::{Cache, CacheItem, HttpRequest, HttpResponse, HttpTransport};

pub const WAN_IP4: &str = "125.148.255.41";
pub const WAN_IP6: &str = "e764:9ec5:88f3:94a9:ad4c:a7b4:4075:1ca7";
pub const IP4_URL: &str = "http://wan.test/ip4";
pub const IP6_URL: &str = "http://wan.test/ip6";

/// Scripted reply of the mock transport
#[derive(Debug, Clone)]
pub enum Reply {
    Respond(HttpResponse),
    Fail(String),
}

impl Reply {
    fn into_result(self) -> Result<HttpResponse> {
        match self {
            Reply::Respond(response) => Ok(response),
            Reply::Fail(msg) => Err(Error::http(msg)),
        }
    }
}

/// An HttpTransport answering from a script
///
/// `get` is routed by exact URL (WAN lookups), `execute` always returns the
/// current refresh reply.
pub struct MockTransport {
    routes: Mutex<HashMap<String, Reply>>,
    refresh_reply: Mutex<Reply>,
    get_calls: Mutex<Vec<String>>,
    executed: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    /// Transport answering the test WAN endpoints and `200 good` to refreshes
    pub fn new() -> Self {
        let routes = HashMap::from([
            (IP4_URL.to_string(), Reply::Respond(HttpResponse::new(200, format!("{}\n", WAN_IP4)))),
            (IP6_URL.to_string(), Reply::Respond(HttpResponse::new(200, WAN_IP6))),
        ]);

        Self {
            routes: Mutex::new(routes),
            refresh_reply: Mutex::new(Reply::Respond(HttpResponse::new(200, "good"))),
            get_calls: Mutex::new(Vec::new()),
            executed: Mutex::new(Vec::new()),
        }
    }

    /// Set the reply for plain GETs to `url`
    pub fn route(&self, url: &str, reply: Reply) {
        self.routes.lock().unwrap().insert(url.to_string(), reply);
    }

    /// Set the reply for every refresh request
    pub fn respond_to_refresh(&self, reply: Reply) {
        *self.refresh_reply.lock().unwrap() = reply;
    }

    /// Number of plain GETs issued to `url`
    pub fn get_call_count(&self, url: &str) -> usize {
        self.get_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|called| called.as_str() == url)
            .count()
    }

    /// Every refresh request, in order
    pub fn executed_requests(&self) -> Vec<HttpRequest> {
        self.executed.lock().unwrap().clone()
    }

    /// Number of refresh requests
    pub fn execute_call_count(&self) -> usize {
        self.executed.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl HttpTransport for MockTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        self.get_calls.lock().unwrap().push(url.to_string());

        let reply = self.routes.lock().unwrap().get(url).cloned();
        reply
            .unwrap_or_else(|| Reply::Fail(format!("no route for {}", url)))
            .into_result()
    }

    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        self.executed.lock().unwrap().push(request.clone());
        self.refresh_reply.lock().unwrap().clone().into_result()
    }
}

/// A cache whose every operation fails
pub struct FailingCache;

#[async_trait::async_trait]
impl Cache for FailingCache {
    async fn get(&self, _key: &str) -> Result<CacheItem> {
        Err(Error::storage("disk unavailable"))
    }

    async fn set(&self, _item: &mut CacheItem) -> Result<()> {
        Err(Error::storage("disk unavailable"))
    }

    async fn delete(&self, _key: &str) -> Result<()> {
        Err(Error::storage("disk unavailable"))
    }

    async fn delete_expired(&self) -> Result<()> {
        Err(Error::storage("disk unavailable"))
    }

    fn is_valid(&self, _item: &CacheItem) -> bool {
        false
    }
}

/// Log sink shared between a test and a `tracing` subscriber
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// Everything written so far
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    /// Subscriber writing every level, without colours, into this sink
    pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync + 'static {
        let sink = self.clone();
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(move || sink.clone())
            .finish()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Domain refreshed through a plain literal pattern
pub fn literal_domain(name: &str, refresh_url: &str) -> Domain {
    Domain::new(name, refresh_url).with_credentials("foo", "bar")
}

/// Engine wired to `transport` with the test WAN endpoints
pub fn engine(
    transport: &Arc<MockTransport>,
    cache: Box<dyn Cache>,
    settings: RefreshSettings,
) -> RefreshEngine {
    let transport: Arc<dyn HttpTransport> = transport.clone();
    let wan = WanIpResolver::with_endpoints(transport.clone(), IP4_URL, IP6_URL);
    RefreshEngine::new(transport, cache, settings).with_wan_resolver(wan)
}
