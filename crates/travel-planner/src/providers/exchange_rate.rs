//! ExchangeRate-API client

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;

use super::{RatesClient, check_status};
use crate::error::{PlannerError, Result};

const SERVICE: &str = "ExchangeRate-API";
const BASE_URL: &str = "https://v6.exchangerate-api.com/v6";

pub struct ExchangeRateClient {
    http: Client,
    api_key: Option<String>,
    base_url: String,
}

impl ExchangeRateClient {
    pub fn new(http: Client, api_key: Option<String>) -> Self {
        Self {
            http,
            api_key,
            base_url: BASE_URL.into(),
        }
    }
}

#[async_trait]
impl RatesClient for ExchangeRateClient {
    async fn rate(&self, from: &str, to: &str) -> Result<Decimal> {
        let key = self.api_key.as_deref().ok_or(PlannerError::MissingCredential("EXCHANGE_RATE_API_KEY"))?;
        let from = from.to_uppercase();
        let to = to.to_uppercase();

        let response = self.http
            .get(format!("{}/{}/latest/{}", self.base_url, key, from))
            .send()
            .await?;
        let body: LatestResponse = check_status(SERVICE, response).await?.json().await?;

        body.rate_for(&from, &to)
    }

    fn name(&self) -> &str {
        SERVICE
    }
}

#[derive(Debug, Deserialize)]
struct LatestResponse {
    result: String,
    #[serde(default, rename = "error-type")]
    error_type: Option<String>,
    #[serde(default)]
    conversion_rates: HashMap<String, f64>,
}

impl LatestResponse {
    fn rate_for(&self, from: &str, to: &str) -> Result<Decimal> {
        if self.result != "success" {
            return match self.error_type.as_deref() {
                Some("unsupported-code") => Err(PlannerError::UnsupportedCurrency(from.to_string())),
                other => Err(PlannerError::Upstream {
                    service: SERVICE,
                    status: 200,
                    message: other.unwrap_or("unknown error").to_string(),
                }),
            };
        }

        let rate = self
            .conversion_rates
            .get(to)
            .ok_or_else(|| PlannerError::UnsupportedCurrency(to.to_string()))?;

        Decimal::try_from(*rate).map_err(|e| PlannerError::Config(format!("rate {} for {}: {}", rate, to, e)))
    }
}
