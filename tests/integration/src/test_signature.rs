//! Signature verification integration tests.

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, Utc};
    use ed25519_dalek::SigningKey;
    use futures::future::join_all;
    use http::Method;
    use manifold_signature::{MasterKey, VerifierConfig};

    use crate::{SignedRequest, TestServer, signer_for, test_master};

    const BODY: &[u8] = br#"{"id":"2686c96868emyj61cgt2ma7vdntg4","plan":"low","product":"generators"}"#;

    async fn message(resp: reqwest::Response) -> String {
        let body: serde_json::Value = resp.json().await.unwrap();
        body["message"].as_str().unwrap().to_owned()
    }

    #[tokio::test]
    async fn test_should_accept_signed_request() {
        let server = TestServer::start().await;
        let client = reqwest::Client::new();
        let signer = signer_for(&test_master(), 1);

        let resp = SignedRequest::new(Method::PUT, "/v1/resources/2686c96868emyj61cgt2ma7vdntg4", BODY)
            .send(&client, &server, &signer)
            .await;

        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let ack: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(ack["message"], "verified");
        assert_eq!(ack["method"], "PUT");
        assert_eq!(ack["path"], "/v1/resources/2686c96868emyj61cgt2ma7vdntg4");
        assert_eq!(ack["bodyLength"], BODY.len());

        server.stop().await;
    }

    #[tokio::test]
    async fn test_should_accept_unsorted_query_string() {
        let server = TestServer::start().await;
        let client = reqwest::Client::new();
        let signer = signer_for(&test_master(), 2);

        let resp = SignedRequest::new(Method::GET, "/v1/resources?zone=b&id=1&Zone=a", b"")
            .send(&client, &server, &signer)
            .await;

        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        server.stop().await;
    }

    #[tokio::test]
    async fn test_should_reject_modified_body() {
        let server = TestServer::start().await;
        let client = reqwest::Client::new();
        let signer = signer_for(&test_master(), 3);

        let resp = SignedRequest::new(Method::PUT, "/v1/resources/1", BODY)
            .send_with_body(&client, &server, &signer, br#"{"plan":"enterprise"}"#.to_vec())
            .await;

        assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
        assert_eq!(
            resp.headers()["content-type"],
            "application/json"
        );
        assert_eq!(
            message(resp).await,
            "Request was not signed by included Public Key"
        );

        server.stop().await;
    }

    #[tokio::test]
    async fn test_should_reject_key_not_endorsed_by_master() {
        let server = TestServer::start().await;
        let client = reqwest::Client::new();
        let impostor = signer_for(&SigningKey::from_bytes(&[99; 32]), 4);

        let resp = SignedRequest::new(Method::PUT, "/v1/resources/1", BODY)
            .send(&client, &server, &impostor)
            .await;

        assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
        assert_eq!(
            message(resp).await,
            "Request Public Key was not endorsed by Manifold"
        );

        server.stop().await;
    }

    #[tokio::test]
    async fn test_should_reject_missing_signature() {
        let server = TestServer::start().await;
        let client = reqwest::Client::new();

        let resp = client
            .put(server.url("/v1/resources/1"))
            .body(BODY)
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
        assert_eq!(message(resp).await, "Missing X-Signature header");

        server.stop().await;
    }

    #[tokio::test]
    async fn test_should_reject_stale_request() {
        let server = TestServer::start().await;
        let client = reqwest::Client::new();
        let signer = signer_for(&test_master(), 5);

        let resp = SignedRequest::new(Method::PUT, "/v1/resources/1", BODY)
            .dated(Utc::now() - TimeDelta::minutes(30))
            .send(&client, &server, &signer)
            .await;

        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
        assert_eq!(message(resp).await, "Request time skew is too great");

        server.stop().await;
    }

    #[tokio::test]
    async fn test_should_honor_configured_skew() {
        let config = VerifierConfig {
            master_key: MasterKey::from(test_master().verifying_key()).to_base64(),
            permitted_skew_secs: 3600,
        };
        let server = TestServer::start_with(&config).await;
        let client = reqwest::Client::new();
        let signer = signer_for(&test_master(), 6);

        let resp = SignedRequest::new(Method::PUT, "/v1/resources/1", BODY)
            .dated(Utc::now() - TimeDelta::minutes(30))
            .send(&client, &server, &signer)
            .await;

        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        server.stop().await;
    }

    #[tokio::test]
    async fn test_should_verify_concurrent_requests() {
        let server = TestServer::start().await;
        let client = reqwest::Client::new();
        let signer = signer_for(&test_master(), 7);

        let requests: Vec<SignedRequest> = (0..16)
            .map(|i| SignedRequest::new(Method::POST, &format!("/v1/callbacks/{i}"), BODY))
            .collect();
        let responses = join_all(
            requests
                .iter()
                .map(|req| req.send(&client, &server, &signer)),
        )
        .await;

        for resp in responses {
            assert_eq!(resp.status(), reqwest::StatusCode::OK);
        }

        server.stop().await;
    }
}
