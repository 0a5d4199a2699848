//! The handler behind the signature check.
//!
//! It stands in for a provider's real API: every request that reaches it has
//! already been verified, so it only acknowledges what it received.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::service::Service;
use tracing::info;

/// Acknowledgement returned for every verified request.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Acknowledgement {
    /// Always `"verified"`.
    pub message: String,
    /// The request method.
    pub method: String,
    /// The request path.
    pub path: String,
    /// Number of body bytes received.
    pub body_length: usize,
}

/// Acknowledges verified requests with a JSON summary.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProviderHandler;

impl Service<http::Request<Full<Bytes>>> for ProviderHandler {
    type Response = http::Response<Full<Bytes>>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Full<Bytes>>) -> Self::Future {
        Box::pin(async move {
            let (parts, body) = req.into_parts();
            let body = body.collect().await?.to_bytes();

            info!(
                method = %parts.method,
                path = parts.uri.path(),
                body_length = body.len(),
                "accepted signed request"
            );

            let ack = Acknowledgement {
                message: "verified".to_owned(),
                method: parts.method.to_string(),
                path: parts.uri.path().to_owned(),
                body_length: body.len(),
            };
            let json = serde_json::to_vec(&ack).expect("JSON serialization cannot fail");

            Ok(http::Response::builder()
                .status(http::StatusCode::OK)
                .header(http::header::CONTENT_TYPE, "application/json")
                .body(Full::new(Bytes::from(json)))
                .expect("valid acknowledgement response"))
        })
    }
}
