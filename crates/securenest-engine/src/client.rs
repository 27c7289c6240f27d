use std::time::Duration;

use anyhow::{bail, Context};
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use securenest_contracts::plan::SecurityPlan;
use securenest_contracts::schema::{security_plan_schema, ANALYSIS_INSTRUCTION};
use serde_json::{json, Value};

use crate::capture::EncodedImage;
use crate::config::AnalysisConfig;
use crate::error::{truncate_text, AnalysisError};

/// Everything one analysis attempt sends to the generation service.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub model: String,
    pub api_key: String,
    pub images: Vec<EncodedImage>,
    pub instruction: String,
    pub response_schema: Value,
    pub temperature: f64,
}

pub trait GenerationService: Send + Sync {
    fn name(&self) -> &str;
    /// Returns the raw response text, or `None` when the service produced none.
    fn generate(&self, request: &GenerationRequest) -> Result<Option<String>, AnalysisError>;
}

pub struct GeminiService {
    api_base: String,
    http: HttpClient,
    request_timeout_s: f64,
}

impl GeminiService {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            http: HttpClient::new(),
            request_timeout_s: config.request_timeout_s,
        }
    }

    fn endpoint_for_model(&self, model: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }

    fn build_payload(request: &GenerationRequest) -> Value {
        let mut parts: Vec<Value> = request
            .images
            .iter()
            .map(|image| {
                json!({
                    "inlineData": {
                        "mimeType": image.mime_type,
                        "data": image.data,
                    }
                })
            })
            .collect();
        parts.push(json!({ "text": request.instruction }));

        json!({
            "contents": [{
                "role": "user",
                "parts": parts,
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": request.response_schema,
                "temperature": request.temperature,
            },
        })
    }

    fn extract_text(response_payload: &Value) -> Option<String> {
        let parts = response_payload
            .get("candidates")
            .and_then(Value::as_array)
            .and_then(|candidates| candidates.first())
            .and_then(|candidate| candidate.get("content"))
            .and_then(|content| content.get("parts"))
            .and_then(Value::as_array)?;
        let text = parts
            .iter()
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect::<String>();
        if text.trim().is_empty() {
            return None;
        }
        Some(text)
    }
}

impl GenerationService for GeminiService {
    fn name(&self) -> &str {
        "gemini"
    }

    fn generate(&self, request: &GenerationRequest) -> Result<Option<String>, AnalysisError> {
        let endpoint = self.endpoint_for_model(&request.model);
        let payload = Self::build_payload(request);
        tracing::debug!(
            endpoint = %endpoint,
            images = request.images.len(),
            temperature = request.temperature,
            "sending analysis request"
        );

        let response = self
            .http
            .post(&endpoint)
            .query(&[("key", request.api_key.as_str())])
            .timeout(Duration::from_secs_f64(self.request_timeout_s))
            .json(&payload)
            .send()
            .map_err(|err| {
                // The URL carries the key as a query parameter.
                let err = anyhow::Error::new(err.without_url())
                    .context(format!("Gemini request failed ({endpoint})"));
                AnalysisError::service(&err)
            })?;
        let response_payload = response_json_or_error("Gemini", response)
            .map_err(|err| AnalysisError::service(&err))?;
        Ok(Self::extract_text(&response_payload))
    }
}

/// Offline service that answers every request with a fixed sample plan.
pub struct DryrunService;

impl DryrunService {
    pub fn sample_plan(image_count: usize) -> Value {
        json!({
            "vulnerabilities": [
                "Unlit approach to the front entry",
                "Ground-floor windows without contact sensors",
                format!("{image_count} photo(s) reviewed; rear of property not visible"),
            ],
            "recommendations": [
                {
                    "name": "Outdoor Floodlight Camera",
                    "category": "Camera",
                    "description": "1080p, motion-activated, two-way audio",
                    "reasoning": "Lights and records the main approach after dark",
                    "estimatedCost": 179.0,
                    "priority": "High"
                },
                {
                    "name": "Video Doorbell",
                    "category": "Camera",
                    "description": "Head-to-toe view, package detection",
                    "reasoning": "Covers deliveries and visitors at the front door",
                    "estimatedCost": 99.0,
                    "priority": "High"
                },
                {
                    "name": "Window Contact Sensor (4-pack)",
                    "category": "Sensor",
                    "description": "Zigbee, magnetic, 2-year battery",
                    "reasoning": "Alerts on ground-floor window openings",
                    "estimatedCost": 59.0,
                    "priority": "Medium"
                },
                {
                    "name": "Smart Deadbolt",
                    "category": "Lock",
                    "description": "Keypad and app unlock, auto-lock",
                    "reasoning": "Removes the need for hidden spare keys",
                    "estimatedCost": 149.0,
                    "priority": "Low"
                }
            ],
            "totalEstimatedCostMin": 450.0,
            "totalEstimatedCostMax": 620.0,
            "executiveSummary": "Light and record the approach, sense every ground-floor opening, and replace keyed entry with a smart deadbolt tied to the same hub.",
            "ecosystemBenefits": [
                "Single app for cameras, sensors and locks",
                "Visible deterrence at the main entry",
                "Alerts before an intruder is inside"
            ]
        })
    }
}

impl GenerationService for DryrunService {
    fn name(&self) -> &str {
        "dryrun"
    }

    fn generate(&self, request: &GenerationRequest) -> Result<Option<String>, AnalysisError> {
        let plan = Self::sample_plan(request.images.len());
        serde_json::to_string(&plan)
            .map(Some)
            .map_err(|err| AnalysisError::Service(err.to_string()))
    }
}

/// Builds analysis requests and turns service replies into plans.
pub struct AnalysisClient {
    config: AnalysisConfig,
    service: Box<dyn GenerationService>,
}

impl AnalysisClient {
    pub fn new(config: AnalysisConfig, service: impl GenerationService + 'static) -> Self {
        Self {
            config,
            service: Box::new(service),
        }
    }

    pub fn gemini(config: AnalysisConfig) -> Self {
        let service = GeminiService::new(&config);
        Self::new(config, service)
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        self.config.model = model.into();
    }

    pub fn service_name(&self) -> &str {
        self.service.name()
    }

    pub fn build_request(
        &self,
        images: &[EncodedImage],
    ) -> Result<GenerationRequest, AnalysisError> {
        if images.is_empty() {
            return Err(AnalysisError::NoImages);
        }
        let Some(api_key) = self.config.api_key.clone() else {
            return Err(AnalysisError::missing_credential());
        };
        Ok(GenerationRequest {
            model: self.config.model.clone(),
            api_key,
            images: images.to_vec(),
            instruction: ANALYSIS_INSTRUCTION.to_string(),
            response_schema: security_plan_schema(),
            temperature: self.config.temperature,
        })
    }

    /// Runs one analysis attempt. No retries.
    pub fn analyze(&self, images: &[EncodedImage]) -> Result<SecurityPlan, AnalysisError> {
        let request = self.build_request(images)?;
        let text = self.service.generate(&request)?;
        let Some(text) = text.filter(|value| !value.trim().is_empty()) else {
            return Err(AnalysisError::EmptyResponse);
        };
        parse_plan(&text)
    }
}

/// Parses response text into a plan; any missing or mistyped field fails the whole plan.
pub fn parse_plan(text: &str) -> Result<SecurityPlan, AnalysisError> {
    serde_json::from_str(text.trim())
        .map_err(|err| AnalysisError::MalformedResponse(err.to_string()))
}

fn response_json_or_error(provider: &str, response: HttpResponse) -> anyhow::Result<Value> {
    let status = response.status();
    let code = status.as_u16();
    let body = response
        .text()
        .with_context(|| format!("{provider} response body read failed"))?;
    if !status.is_success() {
        bail!(
            "{provider} request failed ({code}): {}",
            truncate_text(&body, 512)
        );
    }
    let parsed: Value = serde_json::from_str(&body)
        .with_context(|| format!("{provider} returned invalid JSON payload"))?;
    Ok(parsed)
}
