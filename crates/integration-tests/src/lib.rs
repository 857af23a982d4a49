//! Integration tests for Boutique.
//!
//! The tests in `tests/` run the real `reqwest` content client and the
//! file-backed cart store against [`FixtureBackend`], an in-process `axum`
//! server that answers content API paths with canned JSON.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p boutique-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use boutique_storefront::config::{BoutiqueConfig, ConfigError};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Bearer token the fixture configuration sends.
pub const FIXTURE_TOKEN: &str = "tok_9fK2xQ7vLm3Rz8Wp";

/// Media base the fixture configuration resolves relative images against.
pub const FIXTURE_MEDIA_URL: &str = "https://media.example.com";

/// Canned answer for one path.
#[derive(Debug, Clone)]
pub enum Fixture {
    /// 200 with a JSON body.
    Json(serde_json::Value),
    /// 200 with a raw (possibly invalid) body.
    Raw(String),
    /// Error status with an empty body.
    Status(u16),
    /// 429 with a `Retry-After` header.
    RateLimited(u64),
}

#[derive(Debug, Default)]
struct Fixtures {
    routes: HashMap<String, Fixture>,
    hits: HashMap<String, usize>,
    last_authorization: Option<String>,
}

type Shared = Arc<Mutex<Fixtures>>;

/// In-process content backend on a random local port.
///
/// Paths are matched exactly, query string included
/// (e.g. `/api/produits?populate=*`). Unknown paths answer 404.
/// The server stops when the value is dropped.
#[derive(Debug)]
pub struct FixtureBackend {
    addr: SocketAddr,
    fixtures: Shared,
    server: JoinHandle<()>,
}

impl FixtureBackend {
    /// Bind to `127.0.0.1:0` and start serving.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn start() -> std::io::Result<Self> {
        let fixtures = Shared::default();
        let app = Router::new()
            .fallback(serve_fixture)
            .with_state(Arc::clone(&fixtures));

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            addr,
            fixtures,
            server,
        })
    }

    /// Origin of the server, e.g. `http://127.0.0.1:41234`.
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Answer `path` with a JSON body.
    pub fn respond(&self, path: &str, body: serde_json::Value) {
        self.set(path, Fixture::Json(body));
    }

    /// Answer `path` with an error status.
    pub fn fail(&self, path: &str, status: u16) {
        self.set(path, Fixture::Status(status));
    }

    /// Set the canned answer for `path`.
    pub fn set(&self, path: &str, fixture: Fixture) {
        self.lock().routes.insert(path.to_string(), fixture);
    }

    /// Number of requests received for `path`.
    #[must_use]
    pub fn hits(&self, path: &str) -> usize {
        self.lock().hits.get(path).copied().unwrap_or(0)
    }

    /// `Authorization` header of the most recent request.
    #[must_use]
    pub fn last_authorization(&self) -> Option<String> {
        self.lock().last_authorization.clone()
    }

    /// Storefront configuration pointing at this backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the generated configuration is rejected.
    pub fn config(&self, data_dir: &Path) -> Result<BoutiqueConfig, ConfigError> {
        let vars: HashMap<&str, String> = HashMap::from([
            ("CONTENT_API_URL", self.url()),
            ("CONTENT_MEDIA_URL", FIXTURE_MEDIA_URL.to_string()),
            ("CONTENT_API_TOKEN", FIXTURE_TOKEN.to_string()),
            ("CONTENT_TIMEOUT_SECS", "5".to_string()),
            ("BOUTIQUE_DATA_DIR", data_dir.display().to_string()),
        ]);
        BoutiqueConfig::from_lookup(|key| vars.get(key).cloned())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Fixtures> {
        self.fixtures.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for FixtureBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn serve_fixture(State(fixtures): State<Shared>, uri: Uri, headers: HeaderMap) -> Response {
    let key = uri
        .path_and_query()
        .map_or_else(|| uri.path().to_string(), ToString::to_string);

    let fixture = {
        let mut fixtures = fixtures.lock().unwrap_or_else(PoisonError::into_inner);
        *fixtures.hits.entry(key.clone()).or_insert(0) += 1;
        fixtures.last_authorization = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        fixtures.routes.get(&key).cloned()
    };

    match fixture {
        Some(Fixture::Json(body)) => axum::Json(body).into_response(),
        Some(Fixture::Raw(body)) => body.into_response(),
        Some(Fixture::Status(status)) => StatusCode::from_u16(status)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            .into_response(),
        Some(Fixture::RateLimited(retry_after)) => (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, retry_after.to_string())],
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// A backend seeded with a small catalog mixing both record shapes.
///
/// | Id | Product | Category | Subcategory |
/// |----|---------|----------|-------------|
/// | 100 | Runner | Shoes (1) | - |
/// | 101 | Court | - | Sneakers (10, in Shoes) |
/// | 102 | Snapback | - | Caps (20, in Hats) |
///
/// # Errors
///
/// Returns an error if the listener cannot be bound.
pub async fn seeded_backend() -> std::io::Result<FixtureBackend> {
    use serde_json::json;

    let backend = FixtureBackend::start().await?;
    backend.respond(
        "/api/categories",
        json!({"data": [
            {"id": 1, "Nom": "Shoes"},
            {"id": 2, "attributes": {"Nom": "Hats"}}
        ]}),
    );
    backend.respond(
        "/api/sous-categories?populate=*",
        json!({"data": [
            {"id": 10, "attributes": {"nom": "Sneakers", "category": {"data": {"id": 1, "attributes": {"Nom": "Shoes"}}}}},
            {"id": 20, "nom": "Caps", "category": {"id": 2}}
        ]}),
    );
    backend.respond(
        "/api/produits?populate=*",
        json!({"data": [
            {
                "id": 100,
                "Nom": "Runner",
                "prix": "59.90",
                "anscienPrix": "79",
                "image": [{"url": "/uploads/runner.png"}],
                "category": {"id": 1}
            },
            {
                "id": 101,
                "attributes": {
                    "Nom": "Court",
                    "prix": 45,
                    "image": {"data": [{"id": 5, "attributes": {"url": "https://cdn.example.net/court.png"}}]},
                    "subcategory": {"data": {"id": 10}}
                }
            },
            {"id": 102, "Nom": "Snapback", "prix": 15.5, "subcategory": 20}
        ]}),
    );
    Ok(backend)
}
