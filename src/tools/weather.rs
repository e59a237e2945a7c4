use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};

use super::{CallableTool, ToolContext};

/// One-line weather report from a wttr.in-compatible service
pub struct WeatherTool {
    client: reqwest::Client,
}

impl WeatherTool {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for WeatherTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CallableTool for WeatherTool {
    fn name(&self) -> &str {
        "weather"
    }

    fn description(&self) -> &str {
        "Fetches the current weather for a location."
    }

    async fn call(&self, params: Map<String, Value>, ctx: &ToolContext<'_>) -> Result<Value> {
        let location = params
            .get("location")
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or("");

        let url = format!(
            "{}/{}",
            ctx.config.weather_base_url.trim_end_matches('/'),
            location.replace(' ', "+")
        );

        tracing::debug!("Fetching weather from {}", url);
        let response = self
            .client
            .get(&url)
            .query(&[("format", "3")])
            .send()
            .await
            .context("Weather request failed")?
            .error_for_status()
            .context("Weather service returned an error")?;

        let body = response.text().await.context("Failed to read weather response")?;
        Ok(Value::String(body.trim().to_string()))
    }
}
