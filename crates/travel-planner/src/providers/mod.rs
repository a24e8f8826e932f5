//! Provider Integration
//!
//! Clients for the third-party data providers behind the tools. Weather and
//! exchange rates have a single provider each and sit behind a client trait
//! (Strategy pattern); place search implements `FallbackProvider` so the
//! resolver can chain Google Places, Foursquare and Tavily.

mod exchange_rate;
mod openweather;
mod places;

pub use exchange_rate::ExchangeRateClient;
pub use openweather::OpenWeatherClient;
pub use places::{
    FOURSQUARE_LABEL, FoursquareSource, GOOGLE_LABEL, GooglePlacesSource, PlaceKeys, TAVILY_LABEL, TavilySource,
    place_chain,
};

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::{PlannerError, Result};
use crate::model::{Forecast, WeatherReport};

/// Weather data source
#[async_trait]
pub trait WeatherClient: Send + Sync {
    /// Current conditions
    async fn current(&self, city: &str) -> Result<WeatherReport>;

    /// Daily forecast for the next few days
    async fn forecast(&self, city: &str) -> Result<Forecast>;

    fn name(&self) -> &str;
}

/// Exchange-rate data source
#[async_trait]
pub trait RatesClient: Send + Sync {
    /// Units of `to` per one unit of `from`
    async fn rate(&self, from: &str, to: &str) -> Result<Decimal>;

    fn name(&self) -> &str;
}

/// Shared HTTP client with a request timeout
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("travel-planner/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| PlannerError::Config(format!("HTTP client: {}", e)))
}

/// Turn a non-success response into `PlannerError::Upstream`
pub(crate) async fn check_status(service: &'static str, response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    tracing::warn!(service, status = status.as_u16(), "Upstream request failed");
    Err(PlannerError::Upstream {
        service,
        status: status.as_u16(),
        message: truncate(&message, 200),
    })
}

fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé…");
        assert_eq!(truncate("short", 10), "short");
    }
}
