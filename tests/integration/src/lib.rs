//! End-to-end tests for the Manifold signature server.
//!
//! Each test starts its own server in-process on an ephemeral loopback port,
//! trusting a fixed test master key, and talks to it over real TCP.
//!
//! Run them with:
//! ```text
//! cargo test -p manifold-signature-integration
//! ```

use std::net::SocketAddr;
use std::sync::Once;

use chrono::{DateTime, SecondsFormat, Utc};
use ed25519_dalek::SigningKey;
use manifold_signature::{MasterKey, RequestSigner, Verifier, VerifierConfig};
use manifold_signature_server::{GatewayService, serve};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// The master signing key trusted by test servers.
#[must_use]
pub fn test_master() -> SigningKey {
    SigningKey::from_bytes(&[42; 32])
}

/// A signer endorsed by `master`.
#[must_use]
pub fn signer_for(master: &SigningKey, seed: u8) -> RequestSigner {
    RequestSigner::endorsed_by(master, SigningKey::from_bytes(&[seed; 32]))
}

/// Format a timestamp the way signers put it in the `Date` header.
#[must_use]
pub fn date_header(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// A server running on a background task.
#[derive(Debug)]
pub struct TestServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<anyhow::Result<()>>,
}

impl TestServer {
    /// Start a server trusting [`test_master`].
    pub async fn start() -> Self {
        let config = VerifierConfig {
            master_key: MasterKey::from(test_master().verifying_key()).to_base64(),
            ..VerifierConfig::default()
        };
        Self::start_with(&config).await
    }

    /// Start a server with explicit verifier settings.
    pub async fn start_with(config: &VerifierConfig) -> Self {
        init_tracing();

        let verifier = Verifier::from_config(config).expect("valid verifier config");
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind loopback listener");
        let addr = listener.local_addr().expect("listener address");

        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(serve(listener, GatewayService::new(verifier), async {
            rx.await.ok();
        }));

        tracing::debug!(%addr, "started test server");

        Self {
            addr,
            shutdown: Some(tx),
            handle,
        }
    }

    /// The `host:port` the server listens on.
    #[must_use]
    pub fn host(&self) -> String {
        self.addr.to_string()
    }

    /// Absolute URL for a path on this server.
    #[must_use]
    pub fn url(&self, path_and_query: &str) -> String {
        format!("http://{}{path_and_query}", self.addr)
    }

    /// Stop the server and wait for in-flight requests to drain.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            tx.send(()).ok();
        }
        (&mut self.handle)
            .await
            .expect("server task panicked")
            .expect("server exited with error");
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            tx.send(()).ok();
        }
    }
}

/// A request to be signed and sent to a [`TestServer`].
#[derive(Debug, Clone)]
pub struct SignedRequest {
    /// HTTP method.
    pub method: http::Method,
    /// Path and query, exactly as sent on the wire.
    pub path_and_query: String,
    /// Value of the `Date` header.
    pub date: String,
    /// Request body.
    pub body: Vec<u8>,
}

impl SignedRequest {
    /// A JSON request dated now.
    #[must_use]
    pub fn new(method: http::Method, path_and_query: &str, body: &[u8]) -> Self {
        Self {
            method,
            path_and_query: path_and_query.to_owned(),
            date: date_header(Utc::now()),
            body: body.to_vec(),
        }
    }

    /// Override the `Date` header.
    #[must_use]
    pub fn dated(mut self, at: DateTime<Utc>) -> Self {
        self.date = date_header(at);
        self
    }

    /// The signed headers for this request as sent to `host`.
    #[must_use]
    pub fn headers(&self, signer: &RequestSigner, host: &str) -> http::HeaderMap {
        let (mut parts, ()) = http::Request::builder()
            .method(self.method.clone())
            .uri(self.path_and_query.as_str())
            .header(http::header::HOST, host)
            .header(http::header::DATE, self.date.as_str())
            .header(http::header::CONTENT_TYPE, "application/json")
            .header("x-signed-headers", "host date content-type")
            .body(())
            .expect("valid request head")
            .into_parts();

        let signature = signer
            .sign(&parts, self.body.as_slice())
            .expect("in-memory body is readable");
        parts.headers.insert(
            "x-signature",
            signature.parse().expect("signature is a valid header value"),
        );
        parts.headers
    }

    /// Sign and send with `client`, overriding the body that goes on the wire.
    pub async fn send_with_body(
        &self,
        client: &reqwest::Client,
        server: &TestServer,
        signer: &RequestSigner,
        body: Vec<u8>,
    ) -> reqwest::Response {
        client
            .request(self.method.clone(), server.url(&self.path_and_query))
            .headers(self.headers(signer, &server.host()))
            .body(body)
            .send()
            .await
            .expect("request reaches the server")
    }

    /// Sign and send with `client`.
    pub async fn send(
        &self,
        client: &reqwest::Client,
        server: &TestServer,
        signer: &RequestSigner,
    ) -> reqwest::Response {
        self.send_with_body(client, server, signer, self.body.clone())
            .await
    }
}

mod test_health;
mod test_signature;
