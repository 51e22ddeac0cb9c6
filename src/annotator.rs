//! Annotation service client.
//!
//! Sends a batch of ranked unknown words (with their sample contexts) to an
//! OpenAI-compatible chat completions API and parses the returned JSON into
//! per-word annotations. Any malformed response is a single failure, never
//! a partial panic; callers degrade to an empty result.

use crate::types::{UnknownWordStats, WordAnnotation};
use anyhow::{anyhow, Context, Result};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

pub struct Annotator {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl Annotator {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    /// Request annotations for the top `limit` ranked words.
    ///
    /// Returns an empty map when there is nothing to annotate; returns an
    /// error for HTTP failures and malformed payloads.
    pub async fn annotate(
        &self,
        words: &[UnknownWordStats],
        limit: usize,
    ) -> Result<HashMap<String, WordAnnotation>> {
        let top: Vec<&UnknownWordStats> = words.iter().take(limit).collect();
        if top.is_empty() {
            return Ok(HashMap::new());
        }

        let endpoint = format!("{}/chat/completions", self.base_url);
        debug!(
            "Requesting annotations for {} words from {}",
            top.len(),
            endpoint
        );

        let request_body = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: "You are a helpful English learning assistant. Always respond with valid JSON only.".to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: build_prompt(&top),
                },
            ],
            temperature: 0.3,
        };

        let response = self
            .client
            .post(&endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await
            .context("annotation request failed")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error response".to_string());
            return Err(anyhow!("annotation API error ({}): {}", status, error_text));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .context("failed to parse annotation API response")?;

        let content = completion
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| anyhow!("annotation response has no content"))?;

        parse_annotations(&content)
    }
}

/// Build the annotation prompt: the contract mirrors the WordAnnotation
/// field names so the model's JSON deserializes directly.
fn build_prompt(words: &[&UnknownWordStats]) -> String {
    let word_lines: Vec<String> = words
        .iter()
        .map(|w| format!("- {} (context: \"{}\")", w.word, w.sample_context))
        .collect();

    format!(
        r#"You are an English learning assistant. For each of the following words, provide:
1. A concise Japanese translation (translation)
2. A brief English definition in one sentence (meaning)
3. IPA phonetic notation (ipa)
4. Pronunciation tips in Japanese (pronunciationTips) - include accent, weak forms, common mistakes
5. An example sentence from the given context and a simple paraphrase (example)

Words:
{}

Return a JSON object where keys are the words and values are objects with the above fields.
Example format:
{{
  "word1": {{
    "translation": "翻訳",
    "meaning": "Definition",
    "ipa": "/wɜːrd/",
    "pronunciationTips": "注意点",
    "example": {{
      "original": "Example sentence",
      "paraphrase": "Simplified version"
    }}
  }}
}}"#,
        word_lines.join("\n")
    )
}

static JSON_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{.*\}").expect("invalid JSON block regex"));

/// Parse the model's reply into annotations, tolerating code fences and
/// prose around the JSON object.
fn parse_annotations(content: &str) -> Result<HashMap<String, WordAnnotation>> {
    let json_text = JSON_BLOCK
        .find(content)
        .map(|m| m.as_str())
        .unwrap_or(content);

    serde_json::from_str(json_text).context("annotation response is not the expected JSON shape")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(word: &str, context: &str) -> UnknownWordStats {
        UnknownWordStats {
            word: word.to_string(),
            count: 1,
            first_occurrence: 0,
            sample_context: context.to_string(),
        }
    }

    #[test]
    fn test_prompt_lists_words_with_contexts() {
        let words = [stats("cat", "the cat sat"), stats("sat", "the cat sat")];
        let refs: Vec<&UnknownWordStats> = words.iter().collect();

        let prompt = build_prompt(&refs);
        assert!(prompt.contains("- cat (context: \"the cat sat\")"));
        assert!(prompt.contains("- sat (context: \"the cat sat\")"));
        assert!(prompt.contains("pronunciationTips"));
    }

    #[test]
    fn test_parse_annotations_plain_json() {
        let content = r#"{
            "cat": {
                "translation": "猫",
                "meaning": "A small domesticated feline",
                "ipa": "/kaet/",
                "pronunciationTips": "short vowel",
                "example": {"original": "The cat sat", "paraphrase": "A cat was sitting"}
            }
        }"#;

        let annotations = parse_annotations(content).unwrap();
        assert_eq!(annotations.len(), 1);
        assert_eq!(annotations["cat"].meaning, "A small domesticated feline");
    }

    #[test]
    fn test_parse_annotations_strips_code_fences() {
        let content = "Here you go:\n```json\n{\"cat\": {\"translation\": \"t\", \"meaning\": \"m\", \"ipa\": \"i\", \"pronunciationTips\": \"p\", \"example\": {\"original\": \"o\", \"paraphrase\": \"p\"}}}\n```";

        let annotations = parse_annotations(content).unwrap();
        assert_eq!(annotations["cat"].translation, "t");
    }

    #[test]
    fn test_parse_annotations_rejects_non_json() {
        assert!(parse_annotations("Sorry, I can't help with that.").is_err());
        assert!(parse_annotations("{\"cat\": \"not an object\"}").is_err());
    }

    #[tokio::test]
    async fn test_annotate_empty_batch_makes_no_request() {
        // Unroutable base URL: a request would fail, an empty batch must not.
        let annotator = Annotator::new("http://127.0.0.1:1", "sk-test", "gpt-4o-mini");
        let result = annotator.annotate(&[], 50).await.unwrap();
        assert!(result.is_empty());
    }
}
