//! Wire types for the Gemini `generateContent` endpoint.

use super::image::{ProviderImage, DEFAULT_MEDIA_TYPE};
use serde::{Deserialize, Serialize};

/// Request body. Borrows the shared encoded upload so no branch copies it.
#[derive(Debug, Serialize)]
pub struct GenerateContentRequest<'a> {
    pub contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
pub struct RequestContent<'a> {
    pub role: &'a str,
    pub parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RequestPart<'a> {
    Text(&'a str),
    InlineData {
        #[serde(rename = "mimeType")]
        mime_type: &'a str,
        data: &'a str,
    },
}

impl<'a> GenerateContentRequest<'a> {
    /// Image first, then the instruction, as a single user turn.
    pub fn image_edit(mime_type: &'a str, data: &'a str, prompt: &'a str) -> Self {
        Self {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![
                    RequestPart::InlineData { mime_type, data },
                    RequestPart::Text(prompt),
                ],
            }],
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, alias = "inline_data")]
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(default, alias = "mime_type")]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub data: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

impl GenerateContentResponse {
    fn first_parts(&self) -> &[Part] {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| content.parts.as_slice())
            .unwrap_or(&[])
    }

    /// First inline image of the first candidate, if any.
    pub fn first_inline_image(&self) -> Option<ProviderImage> {
        self.first_parts().iter().find_map(|part| {
            let inline = part.inline_data.as_ref()?;
            if inline.data.is_empty() {
                return None;
            }
            let media_type = inline
                .mime_type
                .as_deref()
                .filter(|m| !m.is_empty())
                .unwrap_or(DEFAULT_MEDIA_TYPE);
            Some(ProviderImage::new(media_type, inline.data.clone()))
        })
    }

    /// Why no image came back: block reason, finish reason or the text the
    /// model answered with instead.
    pub fn explain_missing_image(&self) -> String {
        if let Some(reason) = self
            .prompt_feedback
            .as_ref()
            .and_then(|feedback| feedback.block_reason.as_deref())
        {
            return format!("prompt blocked: {}", reason);
        }

        let text: Vec<&str> = self
            .first_parts()
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect();
        if !text.is_empty() {
            return format!("text-only response: {}", text.join(" "));
        }

        match self
            .candidates
            .first()
            .and_then(|candidate| candidate.finish_reason.as_deref())
        {
            Some(reason) => format!("finish reason: {}", reason),
            None => "empty response".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorEnvelope {
    pub error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_inline_image_after_text_part() {
        let body = r#"{
            "candidates": [{
                "content": {"role": "model", "parts": [
                    {"text": "Here is your caricature"},
                    {"inlineData": {"mimeType": "image/jpeg", "data": "AAAA"}}
                ]},
                "finishReason": "STOP"
            }]
        }"#;
        let response: GenerateContentResponse = serde_json::from_str(body).unwrap();
        let image = response.first_inline_image().unwrap();
        assert_eq!(image.media_type, "image/jpeg");
        assert_eq!(image.data, "AAAA");
    }

    #[test]
    fn snake_case_inline_data_defaults_media_type() {
        let body = r#"{"candidates":[{"content":{"parts":[{"inline_data":{"data":"QUJD"}}]}}]}"#;
        let response: GenerateContentResponse = serde_json::from_str(body).unwrap();
        let image = response.first_inline_image().unwrap();
        assert_eq!(image.media_type, DEFAULT_MEDIA_TYPE);
    }

    #[test]
    fn text_only_response_has_no_image() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"A cheerful person"}]}}]}"#;
        let response: GenerateContentResponse = serde_json::from_str(body).unwrap();
        assert!(response.first_inline_image().is_none());
        assert_eq!(
            response.explain_missing_image(),
            "text-only response: A cheerful person"
        );
    }

    #[test]
    fn blocked_prompt_is_explained() {
        let body = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        let response: GenerateContentResponse = serde_json::from_str(body).unwrap();
        assert!(response.first_inline_image().is_none());
        assert_eq!(response.explain_missing_image(), "prompt blocked: SAFETY");
        assert_eq!(
            GenerateContentResponse::default().explain_missing_image(),
            "empty response"
        );
    }

    #[test]
    fn request_serializes_in_camel_case() {
        let request = GenerateContentRequest::image_edit("image/png", "QUJD", "draw me");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(
            json["contents"][0]["parts"][0]["inlineData"]["mimeType"],
            "image/png"
        );
        assert_eq!(json["contents"][0]["parts"][0]["inlineData"]["data"], "QUJD");
        assert_eq!(json["contents"][0]["parts"][1]["text"], "draw me");
    }
}
