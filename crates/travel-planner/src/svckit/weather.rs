//! Weather Tools
//!
//! Current conditions and multi-day forecast for a city.

use std::sync::Arc;
use async_trait::async_trait;

use agent_core::{
    Tool, ToolSchema, ToolCall, ToolResult,
    tool::ParameterSchema,
    AgentError, Result as CoreResult,
};

use crate::providers::WeatherClient;

fn city_schema(name: &str, description: &str) -> ToolSchema {
    ToolSchema {
        name: name.into(),
        description: description.into(),
        parameters: vec![ParameterSchema::required("city", "string", "City name, e.g. 'Rome' or 'Paris, FR'")],
        category: Some("weather".into()),
    }
}

fn city_arg<'a>(call: &'a ToolCall, tool: &str) -> CoreResult<&'a str> {
    call.str_arg("city")
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AgentError::invalid_arguments(tool, "city must not be empty"))
}

/// Tool reporting current weather
pub struct CurrentWeatherTool {
    weather: Arc<dyn WeatherClient>,
}

impl CurrentWeatherTool {
    pub const NAME: &'static str = "get_current_weather";

    pub fn new(weather: Arc<dyn WeatherClient>) -> Self {
        Self { weather }
    }
}

#[async_trait]
impl Tool for CurrentWeatherTool {
    fn schema(&self) -> ToolSchema {
        city_schema(Self::NAME, "Get the current weather for a city: temperature, conditions, humidity and wind.")
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let city = city_arg(call, Self::NAME)?;
        let report = self.weather.current(city).await?;

        Ok(ToolResult::success(Self::NAME, report.to_string()).with_source(self.weather.name()))
    }
}

/// Tool reporting a daily forecast
pub struct WeatherForecastTool {
    weather: Arc<dyn WeatherClient>,
}

impl WeatherForecastTool {
    pub const NAME: &'static str = "get_weather_forecast";

    pub fn new(weather: Arc<dyn WeatherClient>) -> Self {
        Self { weather }
    }
}

#[async_trait]
impl Tool for WeatherForecastTool {
    fn schema(&self) -> ToolSchema {
        city_schema(Self::NAME, "Get the weather forecast for the next days in a city. Use this when planning a trip.")
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let city = city_arg(call, Self::NAME)?;
        let forecast = self.weather.forecast(city).await?;

        if forecast.days.is_empty() {
            return Ok(ToolResult::failure(Self::NAME, format!("No forecast available for {}", city)));
        }

        Ok(ToolResult::success(Self::NAME, forecast.to_string()).with_source(self.weather.name()))
    }
}
