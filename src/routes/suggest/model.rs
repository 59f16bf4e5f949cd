use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::ApiError;

// 固定提示词，产出用 || 分隔的三个开放式问题
const SUGGEST_PROMPT: &str = "Create a list of three open-ended and engaging questions formatted \
as a single string. Each question should be separated by '||'. These questions are for an \
anonymous social messaging platform, like Qooh.me, and should be suitable for a diverse audience. \
Avoid personal or sensitive topics, focusing instead on universal themes that encourage friendly \
interaction. For example, your output should be structured like this: 'What's a hobby you've \
recently started? || If you could have dinner with any historical figure, who would it be?|| \
What's a simple thing that makes you happy?'. Ensure the questions are intriguing, foster \
curiosity, and contribute to a positive and welcoming conversational environment.";

const GEMINI_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent";

#[derive(Debug, Serialize)]
pub struct SuggestResponse {
    pub suggestions: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: String,
}

/// 调用生成式 AI 拿一组建议问题。和账户、消息的状态完全无关
pub async fn generate_suggestions(
    http: &reqwest::Client,
    config: &Config,
) -> Result<String, ApiError> {
    let body = serde_json::json!({
        "contents": [{ "parts": [{ "text": SUGGEST_PROMPT }] }]
    });

    let response = http
        .post(GEMINI_ENDPOINT)
        .query(&[("key", config.gemini_api_key.as_str())])
        .json(&body)
        .send()
        .await
        .map_err(|e| {
            tracing::error!("Suggestion request failed: {}", e);
            ApiError::Suggestion
        })?;

    if !response.status().is_success() {
        tracing::error!("Suggestion provider returned {}", response.status());
        return Err(ApiError::Suggestion);
    }

    let payload: GenerateContentResponse = response.json().await.map_err(|e| {
        tracing::error!("Failed to decode suggestion response: {}", e);
        ApiError::Suggestion
    })?;

    payload
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content.parts.into_iter().next())
        .map(|p| p.text)
        .ok_or(ApiError::Suggestion)
}
