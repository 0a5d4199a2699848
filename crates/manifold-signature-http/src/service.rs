//! Signature verification as a hyper `Service` wrapper.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http_body::Body;
use http_body_util::{BodyExt, Either, Full};
use hyper::service::Service;
use tracing::debug;

use crate::body::RejectionBody;
use crate::response::ErrorResponse;
use crate::verifier::{BoxError, RequestVerifier};

/// Response of a [`SignatureVerification`] service: either a rejection written
/// by the middleware or the inner service's own response.
pub type VerifiedResponse<B> = http::Response<Either<RejectionBody, B>>;

/// Wraps a service so that it only sees requests with a valid signature.
///
/// The request body is buffered once, verified, and then handed to the inner
/// service as a [`Full`] body holding the same bytes. Rejected requests never
/// reach the inner service.
pub struct SignatureVerification<S, V> {
    inner: Arc<S>,
    verifier: Arc<V>,
}

impl<S, V> SignatureVerification<S, V> {
    /// Wrap `inner` with `verifier`.
    pub fn new(inner: S, verifier: V) -> Self {
        Self {
            inner: Arc::new(inner),
            verifier: Arc::new(verifier),
        }
    }

    /// The wrapped service.
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S, V> Clone for SignatureVerification<S, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            verifier: Arc::clone(&self.verifier),
        }
    }
}

impl<S: fmt::Debug, V> fmt::Debug for SignatureVerification<S, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureVerification")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl<S, V, ReqBody, ResBody> Service<http::Request<ReqBody>> for SignatureVerification<S, V>
where
    S: Service<http::Request<Full<Bytes>>, Response = http::Response<ResBody>>
        + Send
        + Sync
        + 'static,
    S::Future: Send,
    S::Error: Send + 'static,
    V: RequestVerifier,
    ResBody: Send + 'static,
    ReqBody: Body + Send + 'static,
    ReqBody::Data: Send,
    ReqBody::Error: Into<BoxError>,
{
    type Response = VerifiedResponse<ResBody>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<ReqBody>) -> Self::Future {
        let inner = Arc::clone(&self.inner);
        let verifier = Arc::clone(&self.verifier);

        Box::pin(async move {
            let (parts, body) = req.into_parts();

            let body = match body.collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(err) => {
                    let err: BoxError = err.into();
                    debug!(%err, "failed to read request body");
                    return Ok(reject(ErrorResponse::unreadable_body()));
                }
            };

            if let Err(err) = verifier.verify_request(&parts, &body) {
                let rejection = ErrorResponse::from_verify_error(err.as_ref());
                debug!(
                    method = %parts.method,
                    path = parts.uri.path(),
                    status = rejection.status.as_u16(),
                    %err,
                    "rejecting unsigned request"
                );
                return Ok(reject(rejection));
            }

            let req = http::Request::from_parts(parts, Full::new(body));
            inner
                .call(req)
                .await
                .map(|response| response.map(Either::Right))
        })
    }
}

fn reject<B>(rejection: ErrorResponse) -> VerifiedResponse<B> {
    rejection.into_response().map(Either::Left)
}
