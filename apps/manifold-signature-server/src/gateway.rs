//! Gateway service in front of the verified handler.
//!
//! Health-check endpoints (`/health`, `/_health`) are answered at the gateway
//! level without a signature. Every other request goes through
//! [`SignatureVerification`] before it reaches the [`ProviderHandler`].
//!
//! Rejections are returned exactly as the middleware builds them, carrying
//! only `content-type` and `content-length`.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use http_body::Body;
use http_body_util::{Either, Full};
use hyper::service::Service;
use manifold_signature_http::{BoxError, RejectionBody, RequestVerifier, SignatureVerification};

use crate::handler::ProviderHandler;

/// Response body of the gateway.
pub type GatewayBody = Either<Full<Bytes>, Either<RejectionBody, Full<Bytes>>>;

/// Header carrying the per-request identifier.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Routes health checks directly and everything else through verification.
#[derive(Debug)]
pub struct GatewayService<V> {
    verified: SignatureVerification<ProviderHandler, V>,
}

impl<V: RequestVerifier> GatewayService<V> {
    /// Create a gateway that verifies requests with `verifier`.
    pub fn new(verifier: V) -> Self {
        Self {
            verified: SignatureVerification::new(ProviderHandler, verifier),
        }
    }
}

impl<V> Clone for GatewayService<V> {
    fn clone(&self) -> Self {
        Self {
            verified: self.verified.clone(),
        }
    }
}

impl<V, B> Service<http::Request<B>> for GatewayService<V>
where
    V: RequestVerifier,
    B: Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    type Response = http::Response<GatewayBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<B>) -> Self::Future {
        let request_id = uuid::Uuid::new_v4().to_string();

        if is_health_check(req.method(), req.uri().path()) {
            return Box::pin(async move {
                Ok(add_common_headers(health_check_response(), &request_id))
            });
        }

        let verified = self.verified.clone();
        Box::pin(async move {
            let resp = verified.call(req).await;
            let resp = resp.unwrap_or_else(|e| match e {}).map(Either::Right);
            if is_rejection(&resp) {
                return Ok(resp);
            }
            Ok(add_common_headers(resp, &request_id))
        })
    }
}

/// Check if the request is a health check probe.
fn is_health_check(method: &http::Method, path: &str) -> bool {
    *method == http::Method::GET && (path == "/health" || path == "/_health")
}

fn is_rejection(response: &http::Response<GatewayBody>) -> bool {
    matches!(response.body(), Either::Right(Either::Left(_)))
}

/// Produce the health check response.
fn health_check_response() -> http::Response<GatewayBody> {
    let body = r#"{"status":"running"}"#;
    http::Response::builder()
        .status(http::StatusCode::OK)
        .header("Content-Type", "application/json")
        .body(Either::Left(Full::new(Bytes::from_static(body.as_bytes()))))
        .expect("static health response should be valid")
}

/// Add headers shared by every gateway response.
fn add_common_headers(
    mut response: http::Response<GatewayBody>,
    request_id: &str,
) -> http::Response<GatewayBody> {
    let headers = response.headers_mut();

    if let Ok(hv) = http::HeaderValue::from_str(request_id) {
        headers.entry(REQUEST_ID_HEADER).or_insert(hv);
    }
    headers.insert(
        "server",
        http::HeaderValue::from_static("manifold-signature-server"),
    );

    response
}
