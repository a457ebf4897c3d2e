//! Gemini client for question generation and scoring
//!
//! Wraps the `generateContent` REST endpoint. Recorded answers travel as
//! base64 inline data next to the prompt text, so the model transcribes and
//! reacts in a single call. Model output is prompted to be a bare JSON
//! object, but models wrap it in code fences or prose often enough that
//! [`extract_json`] recovers the first balanced-looking object instead of
//! trusting the raw text.

use async_trait::async_trait;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::flow::{InterviewContext, Interviewer, InterviewerTurn, InterviewScore};
use crate::{Error, Result};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default generation model
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Client for the Gemini `generateContent` API
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl GeminiClient {
    /// Create a new client with the default model
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new(api_key: String) -> Result<Self> {
        Self::with_model(api_key, DEFAULT_MODEL.to_string())
    }

    /// Create a new client with a custom model
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn with_model(api_key: String, model: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("Gemini API key required".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
        })
    }

    /// Run one `generateContent` call and return the concatenated text of
    /// the first candidate
    async fn generate(&self, parts: Vec<Part>) -> Result<String> {
        let url = format!("{API_BASE}/models/{}:generateContent", self.model);
        let request = GenerateRequest {
            contents: vec![Content { parts }],
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Llm(format!("Gemini error {status}: {body}")));
        }

        let body: GenerateResponse = response.json().await?;
        let text: String = body
            .candidates
            .first()
            .map(|c| {
                c.content
                    .parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(Error::Llm("Gemini returned no candidates".to_string()));
        }

        Ok(text)
    }

    fn turn_prompt(ctx: InterviewContext<'_>) -> Result<String> {
        let mut prompt = String::from(
            "You are an AI interviewer conducting a job interview.\n\n\
             IMPORTANT: Return ONLY a raw JSON object. Do not wrap it in code \
             fences and do not add any text before or after it.\n\n",
        );

        prompt.push_str(&format!("Job Description: {}\n\n", ctx.job_description));

        if let Some(profile) = ctx.profile {
            prompt.push_str(&format!(
                "Candidate Profile: {}\n\n",
                serde_json::to_string(profile)?
            ));
        }

        if !ctx.history.is_empty() {
            prompt.push_str(&format!(
                "Previous questions and answers in this interview: {}\n\n",
                serde_json::to_string(ctx.history)?
            ));
        }

        prompt.push_str(
            "The attached audio is the candidate's spoken answer to the most \
             recent question. Transcribe it, react to it briefly and naturally \
             as an interviewer would, and ask one relevant follow-up question \
             that has not been asked before.\n\n\
             Return the data in this exact JSON structure:\n\
             {\n\
             \x20 \"transcript\": \"verbatim transcription of the candidate's answer\",\n\
             \x20 \"response\": \"your brief reaction to the answer\",\n\
             \x20 \"nextQuestion\": \"the next interview question\"\n\
             }",
        );

        Ok(prompt)
    }

    fn score_prompt(ctx: InterviewContext<'_>) -> Result<String> {
        let mut prompt = String::from(
            "You are an AI interviewer evaluating a completed job interview.\n\n\
             IMPORTANT: Return ONLY a raw JSON object. Do not wrap it in code \
             fences and do not add any text before or after it.\n\n",
        );

        prompt.push_str(&format!("Job Description: {}\n\n", ctx.job_description));

        if let Some(profile) = ctx.profile {
            prompt.push_str(&format!(
                "Candidate Profile: {}\n\n",
                serde_json::to_string(profile)?
            ));
        }

        prompt.push_str(&format!(
            "Interview transcript (questions and answers): {}\n\n",
            serde_json::to_string(ctx.history)?
        ));

        prompt.push_str(
            "Evaluate the candidate's performance against the job description. \
             Consider relevance, depth, clarity, and communication.\n\n\
             Return the data in this exact JSON structure:\n\
             {\n\
             \x20 \"score\": 75,\n\
             \x20 \"feedback\": \"overall feedback on the interview\",\n\
             \x20 \"questionFeedback\": [\n\
             \x20   { \"question\": \"...\", \"answer\": \"...\", \"feedback\": \"...\" }\n\
             \x20 ]\n\
             }\n\
             The overall score is a number between 0 and 100.",
        );

        Ok(prompt)
    }
}

#[async_trait]
impl Interviewer for GeminiClient {
    async fn next_turn(
        &self,
        audio: &[u8],
        mime: &str,
        ctx: InterviewContext<'_>,
    ) -> Result<InterviewerTurn> {
        let parts = vec![
            Part::Text {
                text: Self::turn_prompt(ctx)?,
            },
            Part::InlineData {
                inline_data: InlineData {
                    mime_type: mime.to_string(),
                    data: base64::engine::general_purpose::STANDARD.encode(audio),
                },
            },
        ];

        let text = self.generate(parts).await?;
        let value = extract_json(&text)?;

        serde_json::from_value(value)
            .map_err(|e| Error::Parse(format!("malformed interviewer turn: {e}")))
    }

    async fn evaluate(&self, ctx: InterviewContext<'_>) -> Result<InterviewScore> {
        let parts = vec![Part::Text {
            text: Self::score_prompt(ctx)?,
        }];

        let text = self.generate(parts).await?;
        let value = extract_json(&text)?;

        serde_json::from_value(value)
            .map_err(|e| Error::Parse(format!("malformed interview score: {e}")))
    }
}

/// Recover a JSON object from model output
///
/// Strips Markdown code fences, then takes the slice from the first `{` to
/// the last `}` and parses it. Anything else is a parse error; the caller
/// treats that as a failed turn and leaves session state alone.
///
/// # Errors
///
/// Returns error if the text contains no parseable JSON object
pub fn extract_json(text: &str) -> Result<serde_json::Value> {
    let mut cleaned = text.trim();

    if let Some(rest) = cleaned.strip_prefix("```json") {
        cleaned = rest;
    } else if let Some(rest) = cleaned.strip_prefix("```") {
        cleaned = rest;
    }
    if let Some(rest) = cleaned.strip_suffix("```") {
        cleaned = rest;
    }
    let cleaned = cleaned.trim();

    let start = cleaned
        .find('{')
        .ok_or_else(|| Error::Parse("no JSON object in model output".to_string()))?;
    let end = cleaned
        .rfind('}')
        .ok_or_else(|| Error::Parse("no JSON object in model output".to_string()))?;
    if end < start {
        return Err(Error::Parse("no JSON object in model output".to_string()));
    }

    serde_json::from_str(&cleaned[start..=end])
        .map_err(|e| Error::Parse(format!("invalid JSON in model output: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::QaPair;

    #[test]
    fn test_extract_json_plain() {
        let value = extract_json(r#"{"response":"ok"}"#).unwrap();
        assert_eq!(value["response"], "ok");
    }

    #[test]
    fn test_extract_json_fenced() {
        let text = "```json\n{\"score\": 8, \"feedback\": \"solid\"}\n```";
        let value = extract_json(text).unwrap();
        assert_eq!(value["score"], 8);
    }

    #[test]
    fn test_extract_json_with_surrounding_prose() {
        let text = "Here is the result:\n{\"response\":\"ok\",\"nextQuestion\":\"next\"}\nHope that helps!";
        let value = extract_json(text).unwrap();
        assert_eq!(value["nextQuestion"], "next");
    }

    #[test]
    fn test_extract_json_rejects_non_json() {
        assert!(extract_json("I could not process the audio.").is_err());
        assert!(extract_json("} backwards {").is_err());
        assert!(extract_json("{not json}").is_err());
    }

    #[test]
    fn test_empty_api_key_rejected() {
        assert!(GeminiClient::new(String::new()).is_err());
    }

    #[test]
    fn test_turn_prompt_includes_history() {
        let history = vec![QaPair {
            question: "Could you please introduce yourself?".to_string(),
            answer: "I am a backend engineer.".to_string(),
        }];
        let prompt = GeminiClient::turn_prompt(InterviewContext {
            job_description: "Senior Rust developer",
            history: &history,
            profile: None,
        })
        .unwrap();

        assert!(prompt.contains("Senior Rust developer"));
        assert!(prompt.contains("backend engineer"));
        assert!(prompt.contains("nextQuestion"));
    }
}
