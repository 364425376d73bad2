use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::tables::preview;
use crate::{ExpandError, Result};

const ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Resolve the Gemini API key: the `GEMINI_API_KEY` environment variable
/// wins, then the key file (last non-empty line that is not a comment).
pub fn load_api_key(key_file: &Path) -> Option<String> {
    if let Ok(key) = std::env::var("GEMINI_API_KEY") {
        let key = key.trim().to_string();
        if !key.is_empty() {
            return Some(key);
        }
    }

    let content = fs::read_to_string(key_file).ok()?;
    content
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
}

/// Thin blocking client for the Gemini `generateContent` endpoint. The rest
/// of the pipeline only sees `generate(system, user, temperature) -> text`,
/// so swapping the provider means swapping this one type.
pub struct GeminiClient {
    api_key: String,
    model: String,
    http: reqwest::blocking::Client,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Result<Self> {
        // Generation calls are awaited to completion; this layer enforces no
        // timeout of its own.
        let http = reqwest::blocking::Client::builder().timeout(None).build()?;

        Ok(Self {
            api_key: api_key.trim().to_string(),
            model,
            http,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// One generation call. Blocks until the model answers; transport
    /// failures and non-success statuses are fatal for the run, there is no
    /// retry at this layer.
    pub fn generate(&self, system_prompt: &str, user_prompt: &str, temperature: f32) -> Result<String> {
        let url = format!("{}/{}:generateContent", ENDPOINT, self.model);

        let body = serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": user_prompt }]
            }],
            "systemInstruction": {
                "parts": [{ "text": system_prompt }]
            },
            "generationConfig": {
                "temperature": temperature
            }
        });

        let response = self
            .http
            .post(&url)
            .header("content-type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(ExpandError::Generation(format!(
                "HTTP {}: {}",
                status.as_u16(),
                preview(&text, 200),
            )));
        }

        let decoded: GenerateResponse = response.json()?;
        let text: String = decoded
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(ExpandError::Generation(
                "model returned no text candidates".to_string(),
            ));
        }

        Ok(text)
    }
}
