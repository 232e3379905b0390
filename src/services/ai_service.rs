use serde_json::{json, Value};

use crate::error::GatewayError;
use crate::gateway::{paths, ApiRequest, RequestGateway};
use crate::models::{AiAnswer, Suggestions};

/// Chat-style wrapper around the hosted model endpoints
#[derive(Debug, Clone)]
pub struct AiService {
    gateway: RequestGateway,
}

impl AiService {
    pub fn new(gateway: RequestGateway) -> Self {
        Self { gateway }
    }

    /// Ask a free-text question. When the model is unavailable the server
    /// sends a `fallback` text with its error; that is returned as the answer.
    pub async fn ask(&self, query: &str) -> Result<AiAnswer, GatewayError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(GatewayError::validation("Query cannot be empty"));
        }

        match self.gateway.post_json(paths::AI_QUERY, &json!({ "query": query })).await {
            Ok(body) => {
                let mut answer: AiAnswer = serde_json::from_value(body)?;
                if answer.query.is_empty() {
                    answer.query = query.to_string();
                }
                Ok(answer)
            }
            Err(err) => match fallback_text(&err) {
                Some(text) => {
                    tracing::warn!("AI query failed, using server fallback: {}", err);
                    Ok(AiAnswer {
                        query: query.to_string(),
                        answer: text,
                        context: None,
                        is_fallback: true,
                    })
                }
                None => Err(err),
            },
        }
    }

    pub async fn suggestions(&self) -> Result<Suggestions, GatewayError> {
        let body = self.gateway.get_json(ApiRequest::get(paths::AI_SUGGESTIONS)).await?;
        Ok(serde_json::from_value(body).unwrap_or_default())
    }
}

fn fallback_text(err: &GatewayError) -> Option<String> {
    err.body()
        .and_then(|body| body.get("fallback"))
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
        .map(str::to_string)
}
