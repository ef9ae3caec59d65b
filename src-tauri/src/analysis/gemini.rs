//! Google Gemini provider — non-streaming `generateContent`.
//!
//! One HTTP client is shared by all three calls. The response is parsed
//! into typed structs; the text field is optional and checked before use.

use super::prompts::{keyword_instruction, EXTRACT_TEXT_PROMPT, TRANSLATOR_INSTRUCTION};
use super::{AnalysisClient, ServiceError};
use crate::config::{AppConfig, Credential};
use base64::{engine::general_purpose::STANDARD, Engine};
use image::{DynamicImage, ImageFormat};
use serde::Deserialize;
use std::io::Cursor;
use std::time::Instant;

pub struct GeminiClient {
    http: reqwest::Client,
    api_base: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_base: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.into(),
            model: model.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.api_base.clone(), config.model.clone())
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base, self.model
        )
    }

    async fn generate(
        &self,
        call: &str,
        credential: &Credential,
        body: &serde_json::Value,
    ) -> Result<String, ServiceError> {
        let start = Instant::now();

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", credential.expose())
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let raw = response.text().await?;

        if !status.is_success() {
            log::error!("[GEMINI] {} returned {}", call, status);
            return Err(ServiceError::Api {
                status: status.as_u16(),
                message: api_error_message(&raw),
            });
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&raw)
            .map_err(|e| ServiceError::MalformedResponse(e.to_string()))?;

        log::info!(
            "[GEMINI] {} in {}ms ({} tokens)",
            call,
            start.elapsed().as_millis(),
            parsed.total_tokens()
        );

        parsed.text().ok_or(ServiceError::NoText)
    }
}

impl AnalysisClient for GeminiClient {
    async fn extract_text(
        &self,
        credential: &Credential,
        image: &DynamicImage,
    ) -> Result<String, ServiceError> {
        let png = encode_png(image)?;
        log::info!("[GEMINI] Sending {} byte PNG for extraction", png.len());
        let body = image_request(&STANDARD.encode(&png), EXTRACT_TEXT_PROMPT);
        self.generate("extract_text", credential, &body).await
    }

    async fn translate(&self, credential: &Credential, text: &str) -> Result<String, ServiceError> {
        let body = instruction_request(TRANSLATOR_INSTRUCTION, text);
        self.generate("translate", credential, &body).await
    }

    async fn extract_keywords(
        &self,
        credential: &Credential,
        text: &str,
    ) -> Result<String, ServiceError> {
        let body = instruction_request(&keyword_instruction(), text);
        self.generate("extract_keywords", credential, &body).await
    }
}

/// Flattens the capture to RGB and encodes it as PNG.
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, ServiceError> {
    let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
    let mut png_bytes: Vec<u8> = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut png_bytes), ImageFormat::Png)
        .map_err(|e| ServiceError::ImageEncoding(e.to_string()))?;
    Ok(png_bytes)
}

fn image_request(png_base64: &str, prompt: &str) -> serde_json::Value {
    serde_json::json!({
        "contents": [{
            "role": "user",
            "parts": [
                {
                    "inlineData": {
                        "mimeType": "image/png",
                        "data": png_base64
                    }
                },
                { "text": prompt }
            ]
        }]
    })
}

fn instruction_request(instruction: &str, text: &str) -> serde_json::Value {
    serde_json::json!({
        "systemInstruction": {
            "parts": [{ "text": instruction }]
        },
        "contents": [{
            "role": "user",
            "parts": [{ "text": text }]
        }]
    })
}

/// Pulls `error.message` out of an error body, falling back to the raw text.
fn api_error_message(raw: &str) -> String {
    serde_json::from_str::<serde_json::Value>(raw)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| raw.chars().take(200).collect())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<Content>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
pub struct Part {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub total_token_count: u64,
}

impl GenerateContentResponse {
    /// Text of the first candidate, all text parts joined.
    ///
    /// `None` when the candidate carries no text part at all.
    pub fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let texts: Vec<&str> = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        if texts.is_empty() {
            None
        } else {
            Some(texts.concat())
        }
    }

    pub fn total_tokens(&self) -> u64 {
        self.usage_metadata
            .as_ref()
            .map(|u| u.total_token_count)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    fn parse(json: &str) -> GenerateContentResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn text_from_single_part() {
        let resp = parse(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"HELLO"}]},"finishReason":"STOP"}],
                "usageMetadata":{"promptTokenCount":10,"totalTokenCount":12}}"#,
        );
        assert_eq!(resp.text().as_deref(), Some("HELLO"));
        assert_eq!(resp.total_tokens(), 12);
    }

    #[test]
    fn text_joins_parts() {
        let resp = parse(
            r#"{"candidates":[{"content":{"parts":[{"text":"Hello, "},{"inlineData":{}},{"text":"world"}]}}]}"#,
        );
        assert_eq!(resp.text().as_deref(), Some("Hello, world"));
    }

    #[test]
    fn blocked_response_has_no_text() {
        let resp = parse(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#);
        assert!(resp.candidates.is_empty());
        assert_eq!(resp.text(), None);
        assert_eq!(resp.total_tokens(), 0);
    }

    #[test]
    fn candidate_without_content_has_no_text() {
        let resp = parse(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#);
        assert_eq!(resp.text(), None);
    }

    #[test]
    fn error_message_is_extracted() {
        let body = r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(api_error_message(body), "API key not valid.");
        assert_eq!(api_error_message("Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn image_request_carries_png_and_prompt() {
        let body = image_request("QUJD", EXTRACT_TEXT_PROMPT);
        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[0]["inlineData"]["data"], "QUJD");
        assert_eq!(parts[1]["text"], EXTRACT_TEXT_PROMPT);
    }

    #[test]
    fn instruction_request_separates_system_and_user() {
        let body = instruction_request(TRANSLATOR_INSTRUCTION, "HELLO");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], TRANSLATOR_INSTRUCTION);
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "HELLO");
    }

    #[test]
    fn endpoint_includes_model() {
        let client = GeminiClient::new("http://localhost:9", "gemini-2.0-flash");
        assert_eq!(
            client.endpoint(),
            "http://localhost:9/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn encode_png_writes_png_magic() {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(8, 4));
        let bytes = encode_png(&img).unwrap();
        assert_eq!(&bytes[..4], &[0x89, 0x50, 0x4E, 0x47]);
    }

    // ── HTTP round trips against a one-shot local server ──────────────

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    /// Answers exactly one request with `status` and `body`, then hands
    /// back the raw request it received.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let request = read_request(&mut stream).await;
            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            let _ = stream.shutdown().await;
            request
        });

        (base, server)
    }

    async fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    #[tokio::test]
    async fn sends_key_header_and_returns_text() {
        let (base, server) = serve_once(
            "200 OK",
            r#"{"candidates":[{"content":{"parts":[{"text":"OLÁ"}]}}]}"#,
        )
        .await;
        let client = GeminiClient::new(base, "test-model");

        let text = client
            .translate(&Credential::new("secret-key"), "HELLO")
            .await
            .unwrap();
        assert_eq!(text, "OLÁ");

        let request = server.await.unwrap();
        let lowered = request.to_ascii_lowercase();
        assert!(lowered.starts_with("post /v1beta/models/test-model:generatecontent "));
        assert!(lowered.contains("x-goog-api-key: secret-key"));
        assert!(request.contains("\"systemInstruction\""));
        assert!(request.contains("\"text\":\"HELLO\""));
    }

    #[tokio::test]
    async fn error_status_maps_to_api_error() {
        let (base, server) = serve_once(
            "403 Forbidden",
            r#"{"error":{"code":403,"message":"API key not valid.","status":"PERMISSION_DENIED"}}"#,
        )
        .await;
        let client = GeminiClient::new(base, "test-model");

        let err = client
            .extract_keywords(&Credential::new("bad"), "HELLO")
            .await
            .unwrap_err();
        match err {
            ServiceError::Api { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "API key not valid.");
            }
            other => panic!("expected Api error, got {:?}", other),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn unparseable_body_is_malformed() {
        let (base, server) = serve_once("200 OK", "<html>not json</html>").await;
        let client = GeminiClient::new(base, "test-model");

        let err = client
            .translate(&Credential::new("key"), "HELLO")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::MalformedResponse(_)), "got {:?}", err);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn response_without_text_is_no_text() {
        let (base, server) = serve_once(
            "200 OK",
            r#"{"candidates":[{"finishReason":"SAFETY"}]}"#,
        )
        .await;
        let client = GeminiClient::new(base, "test-model");

        let img = DynamicImage::ImageRgba8(RgbaImage::new(4, 4));
        let err = client
            .extract_text(&Credential::new("key"), &img)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NoText), "got {:?}", err);

        let request = server.await.unwrap();
        assert!(request.contains("\"mimeType\":\"image/png\""));
    }
}
