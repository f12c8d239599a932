//! Test doubles shared across module tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{Html, Response};
use axum::routing::get;
use axum::Router;

use crate::llm::{Message, ResponseFormat, TextGenerator};

/// Returns canned output per response format and counts calls.
pub struct ScriptedGenerator {
    credential: bool,
    json_reply: Result<String, String>,
    text_reply: Result<String, String>,
    json_calls: AtomicUsize,
    text_calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    latency: Duration,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(json_reply: &str, text_reply: &str) -> Self {
        Self {
            credential: true,
            json_reply: Ok(json_reply.to_string()),
            text_reply: Ok(text_reply.to_string()),
            json_calls: AtomicUsize::new(0),
            text_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            latency: Duration::ZERO,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn without_credential(mut self) -> Self {
        self.credential = false;
        self
    }

    /// Hold every call open for `latency` before replying.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn failing_json(mut self, message: &str) -> Self {
        self.json_reply = Err(message.to_string());
        self
    }

    pub fn failing_text(mut self, message: &str) -> Self {
        self.text_reply = Err(message.to_string());
        self
    }

    pub fn json_calls(&self) -> usize {
        self.json_calls.load(Ordering::SeqCst)
    }

    pub fn text_calls(&self) -> usize {
        self.text_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.json_calls() + self.text_calls()
    }

    /// Most calls that were ever outstanding at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Every user message seen so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn has_credential(&self) -> bool {
        self.credential
    }

    async fn generate(&self, messages: &[Message], format: ResponseFormat) -> Result<String> {
        {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.extend(
                messages
                    .iter()
                    .filter(|m| m.role == "user")
                    .map(|m| m.content.clone()),
            );
        }
        let reply = match format {
            ResponseFormat::Json => {
                self.json_calls.fetch_add(1, Ordering::SeqCst);
                &self.json_reply
            }
            ResponseFormat::Text => {
                self.text_calls.fetch_add(1, Ordering::SeqCst);
                &self.text_reply
            }
        };

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        reply.clone().map_err(|e| anyhow!(e))
    }
}

/// Last words of the `/big` page, far past any small body limit.
pub const BIG_PAGE_TAIL: &str = "closing pledge";

/// Serve a few fixed pages on an ephemeral local port. Returns the base URL.
pub async fn serve_pages() -> String {
    serve_counted_pages().await.0
}

/// Like [`serve_pages`], also returning a counter of requests received.
pub async fn serve_counted_pages() -> (String, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let big_page = format!(
        "<html><body><p>Platform {}</p><p>{}</p></body></html>",
        "more homes and better transit. ".repeat(8 * 1024),
        BIG_PAGE_TAIL
    );

    let app = Router::new()
        .route(
            "/policy",
            get(|| async {
                Html(
                    "<html><head><script>analytics()</script></head>\
                     <body><p>Build more homes.</p></body></html>",
                )
            }),
        )
        .route(
            "/other",
            get(|| async { Html("<body><main><p>Expand public transit.</p></main></body>") }),
        )
        .route("/missing", get(|| async { StatusCode::NOT_FOUND }))
        .route(
            "/delayed",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(400)).await;
                Html("<p>worth the wait</p>")
            }),
        )
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                Html("<p>late</p>")
            }),
        )
        .route(
            "/big",
            get(move || {
                let page = big_page.clone();
                async move { Html(page) }
            }),
        )
        .layer(middleware::from_fn_with_state(hits.clone(), count_hit));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{}", addr), hits)
}

async fn count_hit(
    State(hits): State<Arc<AtomicUsize>>,
    request: Request,
    next: Next,
) -> Response {
    hits.fetch_add(1, Ordering::SeqCst);
    next.run(request).await
}

/// A URL nothing listens on.
pub fn unreachable_url() -> String {
    "http://127.0.0.1:1/policy".to_string()
}
