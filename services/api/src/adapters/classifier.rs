//! services/api/src/adapters/classifier.rs
//!
//! This module contains the adapter for the two classification capabilities the
//! allergen scanner needs:
//!   - meal recognition from an image URL (Clarifai food model, over HTTP), and
//!   - allergen inference from a food name (OpenAI Responses API).
//! It implements the `ClassificationService` port from the `core` crate.

const ALLERGEN_INSTRUCTIONS: &str = r#"You are a food allergen classifier.

Given the name of a food or dish, identify the single most likely common allergen it contains.
Use short, lower-case, singular allergen names such as: peanut, tree nut, milk, egg, wheat, gluten,
soy, fish, shellfish, sesame, mustard, celery, lupin, sulphite.
If the food is unlikely to contain any common allergen, use "none".

Respond with ONLY a JSON object, no prose and no code fences:
{"allergen": "<allergen>", "confidence": <number between 0 and 1>}"#;

use async_openai::{
    config::OpenAIConfig, error::OpenAIError, types::responses::CreateResponseArgs, Client,
};
use async_trait::async_trait;
use medvault_core::domain::Classification;
use medvault_core::ports::{ClassificationService, PortError, PortResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `ClassificationService` using Clarifai and OpenAI.
#[derive(Clone)]
pub struct FoodClassifierAdapter {
    http: reqwest::Client,
    clarifai_model_url: String,
    clarifai_pat: String,
    openai: Client<OpenAIConfig>,
    allergen_model: String,
}

impl FoodClassifierAdapter {
    /// Creates a new `FoodClassifierAdapter`.
    pub fn new(
        http: reqwest::Client,
        clarifai_model_url: String,
        clarifai_pat: String,
        openai: Client<OpenAIConfig>,
        allergen_model: String,
    ) -> Self {
        Self {
            http,
            clarifai_model_url,
            clarifai_pat,
            openai,
            allergen_model,
        }
    }
}

//=========================================================================================
// Clarifai Wire Types
//=========================================================================================

#[derive(Serialize)]
struct ClarifaiRequest<'a> {
    inputs: [ClarifaiInput<'a>; 1],
}

#[derive(Serialize)]
struct ClarifaiInput<'a> {
    data: ClarifaiInputData<'a>,
}

#[derive(Serialize)]
struct ClarifaiInputData<'a> {
    image: ClarifaiImage<'a>,
}

#[derive(Serialize)]
struct ClarifaiImage<'a> {
    url: &'a str,
}

#[derive(Deserialize)]
struct ClarifaiResponse {
    status: ClarifaiStatus,
    #[serde(default)]
    outputs: Vec<ClarifaiOutput>,
}

#[derive(Deserialize)]
struct ClarifaiStatus {
    code: u32,
    #[serde(default)]
    description: String,
}

#[derive(Deserialize)]
struct ClarifaiOutput {
    data: ClarifaiOutputData,
}

#[derive(Deserialize)]
struct ClarifaiOutputData {
    #[serde(default)]
    concepts: Vec<ClarifaiConcept>,
}

#[derive(Deserialize)]
struct ClarifaiConcept {
    name: String,
    value: f64,
}

const CLARIFAI_SUCCESS: u32 = 10000;

/// Picks the top concept from a Clarifai prediction.
fn top_concept(response: ClarifaiResponse) -> PortResult<Classification> {
    if response.status.code != CLARIFAI_SUCCESS {
        return Err(PortError::Upstream(format!(
            "Image classification failed: {} ({})",
            response.status.description, response.status.code
        )));
    }
    response
        .outputs
        .into_iter()
        .next()
        .and_then(|o| o.data.concepts.into_iter().next())
        .map(|c| Classification {
            label: c.name,
            confidence: c.value,
        })
        .ok_or_else(|| PortError::Upstream("Image classifier returned no concepts".to_string()))
}

//=========================================================================================
// Allergen Reply Parsing
//=========================================================================================

#[derive(Deserialize)]
struct AllergenReply {
    allergen: String,
    confidence: f64,
}

/// Extracts the JSON object from the model's reply, tolerating stray prose or fences.
fn parse_allergen_reply(raw: &str) -> PortResult<Classification> {
    let object_pattern = Regex::new(r"(?s)\{.*\}")
        .map_err(|e| PortError::Unexpected(format!("Invalid reply pattern: {}", e)))?;
    let json = object_pattern.find(raw).map(|m| m.as_str()).ok_or_else(|| {
        PortError::Upstream(format!("Allergen classifier returned no JSON object: {}", raw))
    })?;
    let reply: AllergenReply = serde_json::from_str(json)
        .map_err(|e| PortError::Upstream(format!("Malformed allergen classification: {}", e)))?;
    if !reply.confidence.is_finite() {
        return Err(PortError::Upstream(
            "Allergen classifier returned an invalid confidence".to_string(),
        ));
    }
    Ok(Classification {
        label: reply.allergen.trim().to_string(),
        confidence: reply.confidence.clamp(0.0, 1.0),
    })
}

//=========================================================================================
// `ClassificationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ClassificationService for FoodClassifierAdapter {
    async fn classify_image(&self, image_url: &str) -> PortResult<Classification> {
        let body = ClarifaiRequest {
            inputs: [ClarifaiInput {
                data: ClarifaiInputData {
                    image: ClarifaiImage { url: image_url },
                },
            }],
        };

        let response = self
            .http
            .post(&self.clarifai_model_url)
            .header("Authorization", format!("Key {}", self.clarifai_pat))
            .json(&body)
            .send()
            .await
            .map_err(|e| PortError::Upstream(format!("Image classifier unreachable: {}", e)))?;

        let status = response.status();
        let parsed: ClarifaiResponse = response.json().await.map_err(|e| {
            PortError::Upstream(format!("Unreadable image classification ({}): {}", status, e))
        })?;

        let classification = top_concept(parsed)?;
        debug!(
            "Image classified as '{}' ({:.2})",
            classification.label, classification.confidence
        );
        Ok(classification)
    }

    async fn classify_text(&self, descriptor: &str) -> PortResult<Classification> {
        let request = CreateResponseArgs::default()
            .model(&self.allergen_model)
            .instructions(ALLERGEN_INSTRUCTIONS)
            .input(format!("Food: {}", descriptor))
            .max_output_tokens(100u32)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        // Call the API and manually map the error, which respects the orphan rule.
        let response = self
            .openai
            .responses()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Upstream(e.to_string()))?;

        let raw = response.output_text().unwrap_or_default();
        let classification = parse_allergen_reply(&raw)?;
        debug!(
            "'{}' classified as allergen '{}' ({:.2})",
            descriptor, classification.label, classification.confidence
        );
        Ok(classification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json_reply() {
        let c = parse_allergen_reply(r#"{"allergen": "peanut", "confidence": 0.82}"#).unwrap();
        assert_eq!(c.label, "peanut");
        assert_eq!(c.confidence, 0.82);
    }

    #[test]
    fn parses_fenced_reply_and_clamps() {
        let raw = "```json\n{\"allergen\": \" Milk \", \"confidence\": 1.4}\n```";
        let c = parse_allergen_reply(raw).unwrap();
        assert_eq!(c.label, "Milk");
        assert_eq!(c.confidence, 1.0);
    }

    #[test]
    fn prose_reply_is_an_upstream_failure() {
        assert!(matches!(
            parse_allergen_reply("I think it contains nuts."),
            Err(PortError::Upstream(_))
        ));
        assert!(matches!(
            parse_allergen_reply(r#"{"allergen": "egg"}"#),
            Err(PortError::Upstream(_))
        ));
    }

    #[test]
    fn object_spanning_lines_is_extracted() {
        let raw = concat!(
            "Sure! Here it is:\n",
            "{\n  \"allergen\": \"sesame\",\n  \"confidence\": 0.61\n}\n",
            "Hope that helps."
        );
        let c = parse_allergen_reply(raw).unwrap();
        assert_eq!(c.label, "sesame");
        assert_eq!(c.confidence, 0.61);
    }

    #[test]
    fn top_concept_takes_first_prediction() {
        let response: ClarifaiResponse = serde_json::from_str(
            r#"{"status":{"code":10000,"description":"Ok"},
                "outputs":[{"data":{"concepts":[{"name":"pancakes","value":0.97},{"name":"waffle","value":0.4}]}}]}"#,
        )
        .unwrap();
        let c = top_concept(response).unwrap();
        assert_eq!(c.label, "pancakes");
    }

    #[test]
    fn failed_status_is_upstream() {
        let response: ClarifaiResponse = serde_json::from_str(
            r#"{"status":{"code":11102,"description":"Invalid request"}}"#,
        )
        .unwrap();
        assert!(matches!(top_concept(response), Err(PortError::Upstream(_))));
    }
}
