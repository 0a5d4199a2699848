//! Health check integration tests.

#[cfg(test)]
mod tests {
    use crate::TestServer;

    #[tokio::test]
    async fn test_should_answer_health_check_without_signature() {
        let server = TestServer::start().await;

        let resp = reqwest::get(server.url("/health")).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        assert!(resp.headers().contains_key("x-request-id"));

        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "running");

        server.stop().await;
    }

    #[tokio::test]
    async fn test_should_require_signature_for_non_health_paths() {
        let server = TestServer::start().await;

        let resp = reqwest::get(server.url("/healthz")).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);

        server.stop().await;
    }
}
