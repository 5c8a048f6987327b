//! Optional AI-enhancement collaborator.
//!
//! Implements the same `(text) -> ParsedQuery` contract as the rule-based
//! `QueryParser`, backed by a chat-completions endpoint. The caller prefers
//! this implementation and falls back to the rule-based one on any failure,
//! so nothing here is load-bearing for correctness.

use crate::error::{AnalyzerError, Result};
use crate::integrator::KnownEntities;
use crate::models::normalize_value;
use crate::parser::{Filter, Intent, ParsedQuery};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl LlmConfig {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            model: "sonar".to_string(),
            base_url: "https://api.perplexity.ai".to_string(),
        }
    }
}

/// Raw shape the model is asked to return for query interpretation.
#[derive(Debug, Deserialize)]
struct Interpretation {
    #[serde(default)]
    cities: Vec<String>,
    #[serde(default)]
    clients: Vec<String>,
    #[serde(default)]
    warehouses: Vec<String>,
    date_from: Option<String>,
    date_to: Option<String>,
    intent: String,
    confidence: f64,
    volume: Option<u64>,
}

pub struct LlmClient {
    config: LlmConfig,
    http: reqwest::Client,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Interprets free text into the same `ParsedQuery` shape the rule-based
    /// parser produces. Entity values the model invents are dropped unless
    /// they exist in the known-entity vocabulary.
    pub async fn interpret_query(
        &self,
        query: &str,
        entities: &KnownEntities,
    ) -> Result<ParsedQuery> {
        let prompt = format!(
            r#"You are a query interpreter for a delivery analytics system.
Extract a structured filter and intent from the user query and return ONLY valid JSON.

Known cities: {}
Known clients: {}
Known warehouses: {}

Fields:
- cities/clients/warehouses: arrays of values from the known lists only
- date_from/date_to: "YYYY-MM-DD" or null
- intent: one of "explain_causes", "compare", "analyze_trends", "predict"
- confidence: 0.0 to 1.0
- volume: integer order volume for predictive queries, null otherwise

User query: "{}"

Return JSON in this exact format:
{{
  "cities": ["mumbai"],
  "clients": [],
  "warehouses": [],
  "date_from": null,
  "date_to": null,
  "intent": "explain_causes",
  "confidence": 0.9,
  "volume": null
}}

Only return the JSON, no other text."#,
            entities.cities.join(", "),
            entities.clients.join(", "),
            entities.warehouses.join(", "),
            query
        );

        let response = self.call(&prompt).await?;
        let raw: Interpretation = serde_json::from_str(extract_json(&response))
            .map_err(|e| AnalyzerError::Llm(format!("Failed to parse interpretation: {}", e)))?;
        debug!("LLM interpretation: {:?}", raw);

        let intent = match raw.intent.as_str() {
            "explain_causes" => Intent::ExplainCauses,
            "compare" => Intent::Compare,
            "analyze_trends" => Intent::AnalyzeTrends,
            "predict" => Intent::Predict,
            other => {
                return Err(AnalyzerError::Llm(format!(
                    "Unknown intent from model: {}",
                    other
                )))
            }
        };

        let filter = Filter {
            cities: keep_known(raw.cities, &entities.cities),
            clients: keep_known(raw.clients, &entities.clients),
            warehouses: keep_known(raw.warehouses, &entities.warehouses),
            drivers: Vec::new(),
            date_from: raw.date_from.as_deref().and_then(parse_date),
            date_to: raw.date_to.as_deref().and_then(parse_date),
        };

        Ok(ParsedQuery {
            filter,
            intent,
            confidence: raw.confidence.clamp(0.0, 1.0),
            projection_volume: raw.volume,
        })
    }

    /// Generates a short business-facing narrative for an already-computed
    /// result. Purely additive: no computed field depends on it.
    pub async fn narrative_summary(&self, query: &str, result_json: &str) -> Result<String> {
        let prompt = format!(
            r#"Create a concise executive summary for this delivery analytics result.

Original query: "{}"

Result data:
{}

Write 2-3 short paragraphs covering the situation, the primary root causes
with their quantified impact, and the top priorities for improvement.
Business language, specific numbers from the data, no markdown headings."#,
            query,
            truncate(result_json, 1500)
        );
        self.call(&prompt).await
    }

    async fn call(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": "You are a precise analytics assistant. When asked for JSON, return valid JSON and no other text."},
                {"role": "user", "content": prompt}
            ],
            "temperature": 0.1,
            "max_tokens": 1000
        });

        let response = self
            .http
            .post(format!("{}/chat/completions", self.config.base_url))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AnalyzerError::Llm(format!("API call failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AnalyzerError::Llm(format!(
                "API returned status {}",
                response.status()
            )));
        }

        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AnalyzerError::Llm(format!("Failed to read response body: {}", e)))?;

        let content = response_json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| AnalyzerError::Llm("No content in model response".to_string()))?;

        Ok(content.to_string())
    }
}

fn keep_known(values: Vec<String>, known: &[String]) -> Vec<String> {
    values
        .into_iter()
        .map(|v| normalize_value(&v))
        .filter(|v| known.iter().any(|k| k == v))
        .collect()
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Strips markdown code fences some models wrap around JSON payloads.
fn extract_json(response: &str) -> &str {
    let trimmed = response.trim();
    let without_fence = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_fence.strip_suffix("```").unwrap_or(without_fence).trim()
}
