use docqa_core::config::LlmSettings;
use docqa_core::traits::LanguageModel;
use docqa_llm::GeminiClient;
use mockito::Matcher;

const PATH: &str = "/v1beta/models/gemini-2.0-flash:generateContent";

#[tokio::test]
async fn sends_prompt_and_reads_answer() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", PATH)
        .match_header("x-goog-api-key", "test-key")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "contents": [{ "parts": [{ "text": "What is in the PDF?" }] }],
            "generationConfig": { "temperature": 0.0 }
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"A resume."}]},"finishReason":"STOP"}]}"#)
        .create_async()
        .await;

    let client = GeminiClient::new("test-key", "gemini-2.0-flash").with_base_url(&server.url());
    let answer = client.complete("What is in the PDF?", 0.0).await.expect("answer");
    assert_eq!(answer, "A resume.");
    mock.assert_async().await;
}

#[tokio::test]
async fn api_error_is_reported() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", PATH)
        .with_status(429)
        .with_body(r#"{"error":{"code":429,"message":"Resource has been exhausted","status":"RESOURCE_EXHAUSTED"}}"#)
        .create_async()
        .await;

    let client = GeminiClient::new("k", "gemini-2.0-flash").with_base_url(&server.url());
    let err = client.complete("q", 0.0).await.unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("429"), "{msg}");
    assert!(msg.contains("Resource has been exhausted"), "{msg}");
}

#[tokio::test]
async fn malformed_body_is_an_error() {
    let mut server = mockito::Server::new_async().await;
    server.mock("POST", PATH).with_status(200).with_body("not json").create_async().await;

    let client = GeminiClient::new("k", "gemini-2.0-flash").with_base_url(&server.url());
    assert!(client.complete("q", 0.0).await.is_err());
}

#[test]
fn missing_api_key_fails_to_configure() {
    let settings = LlmSettings { api_key_env: "DOCQA_TEST_KEY_THAT_IS_NOT_SET".to_string(), ..LlmSettings::default() };
    let err = GeminiClient::from_settings(&settings).err().expect("should fail");
    assert!(err.to_string().contains("DOCQA_TEST_KEY_THAT_IS_NOT_SET"));
}
