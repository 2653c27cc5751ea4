//! Requests to a multimodal language model.
//!
//! The model is reached through the [`CompletionClient`] trait. This module builds the
//! requests, reads the answers and turns photographed tables into [`Table`]s. It does not
//! ship a network client: the transport is up to the embedding application.

use crate::census::*;

pub const EXTRACTION_SYSTEM_PROMPT: &str = "You are a data extraction tool. You will be given an image of a table (handwritten or typed) containing biodiversity data. Your task is to extract this data and return **ONLY** a valid JSON array of objects. The keys in the objects should be the column headers. Be as accurate as possible. Do not include markdown formatting (like ```json) or any other explanatory text. Just return the valid JSON array.";

pub const EXTRACTION_USER_PROMPT: &str =
    "Extract the table data from this image and return it as a JSON array of objects.";

pub const ANALYST_SYSTEM_PROMPT: &str = "You are a friendly and helpful biodiversity expert assisting a citizen scientist. Your goal is to identify species (from images), analyze simple datasets (when text is provided), and answer questions about ecology. When a user provides biodiversity indices (Richness, Shannon, Simpson), help them interpret what these numbers mean in a simple, understandable way. For example, explain what high or low diversity means. Be encouraging and clear.";

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CompletionError {
    #[snafu(display("{message}"))]
    Network { message: String },
    #[snafu(display("{message}"))]
    Api { status: u16, message: String },
    #[snafu(display("Invalid response structure from AI."))]
    MalformedResponse {},
}

/// An image sent along with a prompt.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct InlineImage {
    pub mime_type: String,
    /// Base64-encoded content.
    pub data: String,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CompletionRequest {
    pub system_instruction: String,
    pub prompt: String,
    pub image: Option<InlineImage>,
}

impl CompletionRequest {
    /// The body of a `generateContent` call.
    pub fn to_payload(&self) -> JSValue {
        let mut parts = vec![json!({ "text": self.prompt })];
        if let Some(image) = &self.image {
            parts.push(json!({
                "inlineData": {
                    "mimeType": image.mime_type,
                    "data": image.data,
                }
            }));
        }
        json!({
            "contents": [{ "role": "user", "parts": parts }],
            "systemInstruction": {
                "parts": [{ "text": self.system_instruction }]
            }
        })
    }
}

/// Anything that can answer a request with a text.
pub trait CompletionClient {
    fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;
}

/// The text of the first candidate of a successful response.
pub fn extract_completion_text(response: &JSValue) -> Result<String, CompletionError> {
    match response["candidates"][0]["content"]["parts"][0]["text"].as_str() {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => MalformedResponseSnafu {}.fail(),
    }
}

/// The error carried by a response with a non-success status.
pub fn api_error(status: u16, response: &JSValue) -> CompletionError {
    let message = match response["error"]["message"].as_str() {
        Some(m) if !m.is_empty() => m.to_string(),
        _ => format!("API Error: {}", status),
    };
    CompletionError::Api { status, message }
}

/// Reads a response, given its HTTP status and its decoded body.
pub fn read_response(status: u16, response: &JSValue) -> Result<String, CompletionError> {
    if !(200..300).contains(&status) {
        return Err(api_error(status, response));
    }
    extract_completion_text(response)
}

/// Asks the model to transcribe the photograph of a table.
pub fn extract_table(
    client: &dyn CompletionClient,
    image: InlineImage,
    name: &str,
) -> CensusResult<Table> {
    info!("extract_table: {} ({})", name, image.mime_type);
    let request = CompletionRequest {
        system_instruction: EXTRACTION_SYSTEM_PROMPT.to_string(),
        prompt: EXTRACTION_USER_PROMPT.to_string(),
        image: Some(image),
    };
    let answer = client.complete(&request).context(CompletionSnafu {})?;
    io_json::parse_ai_table(&answer, name)
}
