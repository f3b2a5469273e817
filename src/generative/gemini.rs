//! HTTP client for the Gemini generative API
//!
//! Image and JSON calls go through `models/{model}:generateContent`; videos
//! use `models/{model}:predictLongRunning` and are polled through the
//! returned operation name.

use super::{
    GenerativeBackend, GenerativeRequest, GenerativeResponse, InlineImage, ResponseFormat,
    VideoOperation, VideoRequest, VideoStatus,
};
use crate::{
    config::ApiConfig,
    error::{Result, StudioError},
};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, instrument};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// `generateContent` / `predictLongRunning` client
pub struct GeminiClient {
    client: Client,
    api: ApiConfig,
    api_key: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.api.base_url)
            .field("image_model", &self.api.image_model)
            .field("text_model", &self.api.text_model)
            .field("video_model", &self.api.video_model)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Create a client from API settings
    ///
    /// # Errors
    /// - No API key configured or present in the environment
    /// - Failed to create HTTP client
    pub fn new(api: ApiConfig) -> Result<Self> {
        let api_key = api.resolve_api_key().ok_or_else(|| {
            StudioError::invalid_config(
                "no API key: set `api.api_key` or the GEMINI_API_KEY environment variable",
            )
        })?;
        let client = Client::builder()
            .timeout(Duration::from_secs(api.request_timeout_secs.max(1)))
            .build()?;
        Ok(Self {
            client,
            api,
            api_key,
        })
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!(
            "{}/models/{}:{}",
            self.api.base_url.trim_end_matches('/'),
            model,
            method
        )
    }

    async fn post_json<T: Serialize + ?Sized>(&self, url: &str, body: &T) -> Result<Response> {
        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await?;
        check_status(response).await
    }

    async fn get(&self, url: &str) -> Result<Response> {
        let response = self
            .client
            .get(url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;
        check_status(response).await
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.pointer("/error/message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.chars().take(200).collect());
    Err(StudioError::generation(format!("HTTP {status}: {detail}")))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
enum RequestPart<'a> {
    InlineData(InlineData<'a>),
    Text(&'a str),
}

/// Build the `generateContent` body: images first, instruction last
fn request_body(request: &GenerativeRequest) -> serde_json::Value {
    let mut parts: Vec<RequestPart<'_>> = request
        .images
        .iter()
        .map(|image| {
            RequestPart::InlineData(InlineData {
                mime_type: image.mime.as_str(),
                data: image.to_base64(),
            })
        })
        .collect();
    parts.push(RequestPart::Text(&request.instruction));

    let mut generation_config = match request.response_format {
        ResponseFormat::Json => json!({ "responseMimeType": "application/json" }),
        ResponseFormat::Image => json!({ "responseModalities": ["IMAGE", "TEXT"] }),
    };
    if let Some(ratio) = request.aspect_ratio {
        generation_config["imageConfig"] = json!({ "aspectRatio": ratio.as_str() });
    }

    json!({
        "contents": [{ "parts": parts }],
        "generationConfig": generation_config,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    text: Option<String>,
    inline_data: Option<ResponseInlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseInlineData {
    mime_type: Option<String>,
    data: String,
}

/// Pick the first inline image (or the JSON text) of the first candidate
fn parse_response(
    body: GenerateContentResponse,
    format: ResponseFormat,
) -> Result<GenerativeResponse> {
    let parts = body
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts)
        .unwrap_or_default();

    match format {
        ResponseFormat::Image => {
            let inline = parts
                .into_iter()
                .find_map(|p| p.inline_data)
                .ok_or_else(|| StudioError::generation("model returned no image"))?;
            let image = InlineImage::from_base64(&inline.data, inline.mime_type.as_deref())?;
            Ok(GenerativeResponse {
                image: Some(image),
                json: None,
            })
        }
        ResponseFormat::Json => {
            let text: String = parts.into_iter().filter_map(|p| p.text).collect();
            let value = serde_json::from_str(strip_code_fence(&text))?;
            Ok(GenerativeResponse {
                image: None,
                json: Some(value),
            })
        }
    }
}

/// Models sometimes wrap JSON in a markdown fence
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map_or(trimmed, str::trim)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationBody {
    name: Option<String>,
    #[serde(default)]
    done: bool,
    error: Option<serde_json::Value>,
    response: Option<serde_json::Value>,
}

/// Done operations carry the video URI at a fixed path
fn video_uri(response: &serde_json::Value) -> Option<&str> {
    response
        .pointer("/generateVideoResponse/generatedSamples/0/video/uri")
        .and_then(serde_json::Value::as_str)
}

#[async_trait]
impl GenerativeBackend for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    #[instrument(skip(self, request), fields(images = request.images.len(), format = ?request.response_format))]
    async fn generate(&self, request: &GenerativeRequest) -> Result<GenerativeResponse> {
        let model = match request.response_format {
            ResponseFormat::Image => &self.api.image_model,
            ResponseFormat::Json => &self.api.text_model,
        };
        let url = self.model_url(model, "generateContent");
        debug!(model = %model, "Sending generateContent request");

        let body: GenerateContentResponse =
            self.post_json(&url, &request_body(request)).await?.json().await?;
        parse_response(body, request.response_format)
    }

    #[instrument(skip(self, request))]
    async fn start_video(&self, request: &VideoRequest) -> Result<VideoOperation> {
        let url = self.model_url(&self.api.video_model, "predictLongRunning");
        let body = json!({
            "instances": [{
                "prompt": request.prompt,
                "image": {
                    "bytesBase64Encoded": request.image.to_base64(),
                    "mimeType": request.image.mime.as_str(),
                },
            }],
            "parameters": { "aspectRatio": request.aspect_ratio.as_str() },
        });
        let operation: OperationBody = self.post_json(&url, &body).await?.json().await?;
        let name = operation
            .name
            .filter(|n| !n.is_empty())
            .ok_or_else(|| StudioError::generation("video request returned no operation"))?;
        debug!(operation = %name, "Video generation started");
        Ok(VideoOperation { name })
    }

    #[instrument(skip(self), fields(operation = %operation.name))]
    async fn poll_video(&self, operation: &VideoOperation) -> Result<VideoStatus> {
        let url = format!(
            "{}/{}",
            self.api.base_url.trim_end_matches('/'),
            operation.name
        );
        let body: OperationBody = self.get(&url).await?.json().await?;
        if let Some(error) = body.error {
            let message = error
                .get("message")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("video generation failed");
            return Err(StudioError::generation(message.to_string()));
        }
        if !body.done {
            return Ok(VideoStatus::Running);
        }
        let uri = body
            .response
            .as_ref()
            .and_then(video_uri)
            .ok_or_else(|| StudioError::generation("finished video operation has no video"))?;
        let bytes = self.get(uri).await?.bytes().await?;
        Ok(VideoStatus::Done(bytes.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{generative::AspectRatio, types::ImageMime};

    #[test]
    fn test_request_body_orders_images_before_text() {
        let request = GenerativeRequest::new("apply")
            .with_image(InlineImage::new(vec![1, 2], ImageMime::Jpeg))
            .with_image(InlineImage::new(vec![3], ImageMime::Png))
            .with_aspect_ratio(AspectRatio::Portrait);
        let body = request_body(&request);
        let parts = body.pointer("/contents/0/parts").unwrap().as_array().unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[0]["inlineData"]["data"], "AQI=");
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[2]["text"], "apply");
        assert_eq!(body["generationConfig"]["imageConfig"]["aspectRatio"], "3:4");
    }

    #[test]
    fn test_json_request_asks_for_json_mime() {
        let body = request_body(&GenerativeRequest::new("classify").expecting_json());
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert!(body["generationConfig"].get("imageConfig").is_none());
    }

    #[test]
    fn test_parse_response_takes_first_inline_image() {
        let raw = json!({
            "candidates": [{
                "content": { "parts": [
                    { "text": "here you go" },
                    { "inlineData": { "mimeType": "image/png", "data": "AAEC" } },
                    { "inlineData": { "mimeType": "image/png", "data": "BBBB" } }
                ]}
            }]
        });
        let body: GenerateContentResponse = serde_json::from_value(raw).unwrap();
        let response = parse_response(body, ResponseFormat::Image).unwrap();
        assert_eq!(response.image_bytes(), Some(&[0u8, 1, 2][..]));
    }

    #[test]
    fn test_parse_response_without_image_fails() {
        let raw = json!({ "candidates": [{ "content": { "parts": [{ "text": "sorry" }] } }] });
        let body: GenerateContentResponse = serde_json::from_value(raw).unwrap();
        assert!(matches!(
            parse_response(body, ResponseFormat::Image),
            Err(StudioError::Generation(_))
        ));
        let empty: GenerateContentResponse = serde_json::from_value(json!({})).unwrap();
        assert!(parse_response(empty, ResponseFormat::Image).is_err());
    }

    #[test]
    fn test_parse_json_strips_code_fence() {
        let raw = json!({ "candidates": [{ "content": { "parts": [
            { "text": "```json\n{\"category\": \"RING\", \"gender\": \"FEMALE\"}\n```" }
        ]}}]});
        let body: GenerateContentResponse = serde_json::from_value(raw).unwrap();
        let json = parse_response(body, ResponseFormat::Json)
            .unwrap()
            .into_json()
            .unwrap();
        assert_eq!(json["category"], "RING");
    }

    #[test]
    fn test_video_uri_path() {
        let response = json!({
            "generateVideoResponse": { "generatedSamples": [{ "video": { "uri": "https://x/v.mp4" } }] }
        });
        assert_eq!(video_uri(&response), Some("https://x/v.mp4"));
        assert_eq!(video_uri(&json!({})), None);
    }

    #[test]
    fn test_new_requires_api_key() {
        let api = ApiConfig {
            api_key: Some("test-key".to_string()),
            ..ApiConfig::default()
        };
        let client = GeminiClient::new(api).unwrap();
        assert_eq!(
            client.model_url("gemini-2.5-flash", "generateContent"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert!(!format!("{client:?}").contains("test-key"));
    }
}
