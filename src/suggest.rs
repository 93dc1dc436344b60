//! Related-drug suggestions from a hosted generative-language model.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::AiConfig;
use crate::gateway::send_request;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SuggestError {
    #[error("AI service is not configured (set ai.api_key or DRUGPRICE_AI_KEY)")]
    NotConfigured,
    #[error("Active ingredient must not be empty")]
    MissingIngredient,
    #[error("AI service request failed: {0}")]
    Transport(String),
    #[error("AI service rejected the request (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("AI service returned an unusable answer: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for SuggestError {
    fn from(err: reqwest::Error) -> Self {
        SuggestError::Transport(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub related_drugs: Vec<String>,
    pub reasoning: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
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

pub fn prompt(active_ingredient: &str, concentration: &str) -> String {
    format!(
        "You are a pharmacist recommending alternative medications.\n\n\
         Based on the active ingredient and concentration of the drug provided, suggest 3 related drugs.\n\
         Explain your reasoning for each suggestion.\n\n\
         Active Ingredient: {active_ingredient}\n\
         Concentration: {concentration}\n\n\
         Format your output as a JSON object with 'relatedDrugs' (an array of drug names) \
         and 'reasoning' (your explanation)."
    )
}

/// Pulls the suggestion out of the model's text, tolerating a fenced code
/// block around the JSON.
pub fn parse_suggestion(text: &str) -> Result<Suggestion, SuggestError> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();
    let suggestion: Suggestion =
        serde_json::from_str(body).map_err(|err| SuggestError::Malformed(err.to_string()))?;
    if suggestion.related_drugs.is_empty() {
        return Err(SuggestError::Malformed("no related drugs".to_string()));
    }
    Ok(suggestion)
}

#[derive(Clone)]
pub struct Suggester {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl Suggester {
    pub fn from_config(config: &AiConfig) -> Result<Self, SuggestError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or(SuggestError::NotConfigured)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;
        Ok(Self {
            client,
            endpoint: format!(
                "{}/models/{}:generateContent",
                config.base_url.trim_end_matches('/'),
                config.model
            ),
            api_key,
        })
    }

    pub async fn suggest(
        &self,
        active_ingredient: &str,
        concentration: &str,
    ) -> Result<Suggestion, SuggestError> {
        let active_ingredient = active_ingredient.trim();
        if active_ingredient.is_empty() {
            return Err(SuggestError::MissingIngredient);
        }
        let prompt = prompt(active_ingredient, concentration.trim());
        let body = GenerateRequest {
            contents: [Content {
                parts: [Part { text: &prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
            },
        };
        debug!(active_ingredient, concentration, "Requesting related drugs");

        let (result, _) = send_request("SuggestRelatedDrugs", || async {
            let response = self
                .client
                .post(&self.endpoint)
                .query(&[("key", self.api_key.as_str())])
                .json(&body)
                .send()
                .await?;
            let status = response.status();
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(SuggestError::Rejected {
                    status: status.as_u16(),
                    message: message.trim().to_string(),
                });
            }
            Ok::<_, SuggestError>(response.json::<GenerateResponse>().await?)
        })
        .await;
        let response = result.inspect_err(|err| warn!(error = %err, "Suggestion failed"))?;

        let text: String = response
            .candidates
            .into_iter()
            .filter_map(|candidate| candidate.content)
            .flat_map(|content| content.parts)
            .map(|part| part.text)
            .collect();
        if text.trim().is_empty() {
            return Err(SuggestError::Malformed("empty response".to_string()));
        }
        parse_suggestion(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json() {
        let suggestion = parse_suggestion(
            r#"{"relatedDrugs":["Augmentin","Klamentin","Curam"],"reasoning":"Cùng hoạt chất."}"#,
        )
        .unwrap();
        assert_eq!(suggestion.related_drugs.len(), 3);
        assert_eq!(suggestion.reasoning, "Cùng hoạt chất.");
    }

    #[test]
    fn parses_fenced_json() {
        let text = "```json\n{\"relatedDrugs\":[\"Efferalgan\"],\"reasoning\":\"r\"}\n```\n";
        assert_eq!(
            parse_suggestion(text).unwrap().related_drugs,
            vec!["Efferalgan".to_string()]
        );
    }

    #[test]
    fn rejects_garbage_and_empty_lists() {
        assert!(matches!(
            parse_suggestion("I cannot help with that"),
            Err(SuggestError::Malformed(_))
        ));
        assert!(matches!(
            parse_suggestion(r#"{"relatedDrugs":[],"reasoning":""}"#),
            Err(SuggestError::Malformed(_))
        ));
    }

    #[test]
    fn prompt_mentions_inputs() {
        let text = prompt("Paracetamol", "500mg");
        assert!(text.contains("Active Ingredient: Paracetamol"));
        assert!(text.contains("Concentration: 500mg"));
    }

    #[test]
    fn missing_key_is_not_configured() {
        let config = AiConfig::default();
        assert!(matches!(
            Suggester::from_config(&config),
            Err(SuggestError::NotConfigured)
        ));
    }

    #[tokio::test]
    async fn blank_ingredient_fails_before_request() {
        let config = AiConfig {
            api_key: Some("k".to_string()),
            base_url: "http://127.0.0.1:9".to_string(),
            ..AiConfig::default()
        };
        let suggester = Suggester::from_config(&config).unwrap();
        assert_eq!(
            suggester.suggest("  ", "500mg").await.unwrap_err(),
            SuggestError::MissingIngredient
        );
    }
}
