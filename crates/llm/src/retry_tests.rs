#[cfg(test)]
mod tests {
    use crate::client::{AiSettings, LlmClient};
    use crate::error::LlmError;
    use ora2pg_assist_core::AiProvider;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn openai_client(server: &MockServer) -> LlmClient {
        LlmClient::new(AiSettings {
            provider: AiProvider::OpenAi,
            endpoint: server.uri(),
            model: "test-model".to_owned(),
            api_key: Some("test-key".to_owned()),
            temperature: 0.2,
            max_output_tokens: 1024,
        })
        .unwrap()
    }

    fn chat_body(content: &str, finish_reason: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{
                "message": { "role": "assistant", "content": content },
                "finish_reason": finish_reason
            }],
            "usage": { "prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15 }
        })
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let server = MockServer::start().await;
        let client = openai_client(&server);

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("SELECT 1;", "stop")))
            .expect(1)
            .mount(&server)
            .await;

        let result = client.complete("system", "prompt").await.unwrap();
        assert_eq!(result.content, "SELECT 1;");
        assert_eq!(result.usage.total_tokens, 15);
        assert_eq!(result.usage.prompt_tokens, 10);
    }

    #[tokio::test]
    async fn test_retry_on_429_then_success() {
        let server = MockServer::start().await;
        let client = openai_client(&server);

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("ok;", "stop")))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("Rate limit exceeded"))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        let result = client.complete("system", "prompt").await.unwrap();
        assert_eq!(result.content, "ok;");
    }

    #[tokio::test]
    async fn test_no_retry_on_400() {
        let server = MockServer::start().await;
        let client = openai_client(&server);

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad model"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client.complete("system", "prompt").await.unwrap_err();
        assert!(matches!(err, LlmError::HttpStatus { code: 400, .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn test_retries_exhausted_on_persistent_503() {
        let server = MockServer::start().await;
        let client = openai_client(&server);

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .expect(4)
            .mount(&server)
            .await;

        let err = client.complete("system", "prompt").await.unwrap_err();
        match err {
            LlmError::RetriesExhausted(inner) => {
                assert!(matches!(*inner, LlmError::HttpStatus { code: 503, .. }));
            },
            other => panic!("expected RetriesExhausted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_length_finish_reason_is_truncation() {
        let server = MockServer::start().await;
        let client = openai_client(&server);

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(chat_body("CREATE TABLE t (", "length")),
            )
            .mount(&server)
            .await;

        let err = client.complete("system", "prompt").await.unwrap_err();
        assert!(matches!(err, LlmError::Truncated { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn test_fenced_output_is_stripped_and_blank_is_error() {
        let server = MockServer::start().await;
        let client = openai_client(&server);

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("```sql\n  \n```", "stop")))
            .mount(&server)
            .await;

        let err = client.complete("system", "prompt").await.unwrap_err();
        assert!(matches!(err, LlmError::EmptyResponse), "got {err:?}");
    }

    #[tokio::test]
    async fn test_google_generate_content() {
        let server = MockServer::start().await;
        let client = LlmClient::new(AiSettings {
            provider: AiProvider::Google,
            endpoint: server.uri(),
            model: "gemini-pro-latest".to_owned(),
            api_key: Some("g-key".to_owned()),
            temperature: 0.2,
            max_output_tokens: 1024,
        })
        .unwrap();

        Mock::given(method("POST"))
            .and(path("/models/gemini-pro:generateContent"))
            .and(query_param("key", "g-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "```sql\nCREATE TABLE t (id INTEGER);\n```" }] },
                    "finishReason": "STOP"
                }],
                "usageMetadata": { "promptTokenCount": 7, "candidatesTokenCount": 3, "totalTokenCount": 10 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = client.complete("system", "prompt").await.unwrap();
        assert_eq!(result.content, "CREATE TABLE t (id INTEGER);");
        assert_eq!(result.usage.total_tokens, 10);
        assert_eq!(result.usage.completion_tokens, 3);
    }

    #[tokio::test]
    async fn test_google_max_tokens_is_truncation() {
        let server = MockServer::start().await;
        let client = LlmClient::new(AiSettings {
            provider: AiProvider::Google,
            endpoint: server.uri(),
            model: "gemini-pro".to_owned(),
            api_key: Some("g-key".to_owned()),
            temperature: 0.2,
            max_output_tokens: 16,
        })
        .unwrap();

        Mock::given(method("POST"))
            .and(path("/models/gemini-pro:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "CREATE" }] },
                    "finishReason": "MAX_TOKENS"
                }]
            })))
            .mount(&server)
            .await;

        let err = client.complete("system", "prompt").await.unwrap_err();
        assert!(matches!(err, LlmError::Truncated { ref finish_reason } if finish_reason == "MAX_TOKENS"));
    }
}
