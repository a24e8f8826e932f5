//! OpenWeatherMap client

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use super::{WeatherClient, check_status};
use crate::error::{PlannerError, Result};
use crate::model::{DailyForecast, Forecast, WeatherReport};

const SERVICE: &str = "OpenWeatherMap";
const BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

/// Number of 3-hour slots requested (5 days)
const FORECAST_SLOTS: u32 = 40;

pub struct OpenWeatherClient {
    http: Client,
    api_key: Option<String>,
    base_url: String,
}

impl OpenWeatherClient {
    pub fn new(http: Client, api_key: Option<String>) -> Self {
        Self {
            http,
            api_key,
            base_url: BASE_URL.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, endpoint: &str, city: &str, extra: &[(&str, String)]) -> Result<T> {
        let key = self.api_key.as_deref().ok_or(PlannerError::MissingCredential("OPENWEATHERMAP_API_KEY"))?;

        let mut query = vec![
            ("q", city.to_string()),
            ("appid", key.to_string()),
            ("units", "metric".to_string()),
        ];
        query.extend(extra.iter().map(|(k, v)| (*k, v.clone())));

        let response = self.http
            .get(format!("{}/{}", self.base_url, endpoint))
            .query(&query)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(PlannerError::CityNotFound(city.to_string()));
        }

        Ok(check_status(SERVICE, response).await?.json().await?)
    }
}

#[async_trait]
impl WeatherClient for OpenWeatherClient {
    async fn current(&self, city: &str) -> Result<WeatherReport> {
        let body: CurrentResponse = self.get("weather", city, &[]).await?;
        tracing::debug!(city, "Fetched current weather");
        Ok(body.into_report(city))
    }

    async fn forecast(&self, city: &str) -> Result<Forecast> {
        let body: ForecastResponse = self.get("forecast", city, &[("cnt", FORECAST_SLOTS.to_string())]).await?;
        tracing::debug!(city, slots = body.list.len(), "Fetched forecast");
        Ok(body.into_forecast(city))
    }

    fn name(&self) -> &str {
        SERVICE
    }
}

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    #[serde(default)]
    name: Option<String>,
    main: MainBlock,
    #[serde(default)]
    weather: Vec<Condition>,
    #[serde(default)]
    wind: Option<Wind>,
}

#[derive(Debug, Deserialize)]
struct MainBlock {
    temp: f64,
    #[serde(default)]
    feels_like: Option<f64>,
    #[serde(default)]
    temp_min: Option<f64>,
    #[serde(default)]
    temp_max: Option<f64>,
    #[serde(default)]
    humidity: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
}

#[derive(Debug, Deserialize)]
struct Wind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    list: Vec<ForecastSlot>,
    #[serde(default)]
    city: Option<CityBlock>,
}

#[derive(Debug, Deserialize)]
struct ForecastSlot {
    dt: i64,
    main: MainBlock,
    #[serde(default)]
    weather: Vec<Condition>,
}

#[derive(Debug, Deserialize)]
struct CityBlock {
    name: String,
}

fn describe(conditions: &[Condition]) -> String {
    conditions
        .first()
        .map(|c| c.description.clone())
        .unwrap_or_else(|| "conditions unavailable".into())
}

impl CurrentResponse {
    fn into_report(self, requested: &str) -> WeatherReport {
        WeatherReport {
            city: self.name.filter(|n| !n.is_empty()).unwrap_or_else(|| requested.to_string()),
            temperature: self.main.temp,
            feels_like: self.main.feels_like.unwrap_or(self.main.temp),
            humidity: self.main.humidity.unwrap_or_default(),
            wind_speed: self.wind.map(|w| w.speed).unwrap_or_default(),
            description: describe(&self.weather),
        }
    }
}

impl ForecastResponse {
    /// Fold 3-hour slots into per-day min/max; the first slot of a day
    /// supplies its description
    fn into_forecast(self, requested: &str) -> Forecast {
        let mut days: BTreeMap<chrono::NaiveDate, DailyForecast> = BTreeMap::new();

        for slot in self.list {
            let Some(date) = DateTime::from_timestamp(slot.dt, 0).map(|dt| dt.date_naive()) else {
                continue;
            };
            let low = slot.main.temp_min.unwrap_or(slot.main.temp);
            let high = slot.main.temp_max.unwrap_or(slot.main.temp);

            days.entry(date)
                .and_modify(|day| {
                    day.temp_min = day.temp_min.min(low);
                    day.temp_max = day.temp_max.max(high);
                })
                .or_insert_with(|| DailyForecast {
                    date,
                    temp_min: low,
                    temp_max: high,
                    description: describe(&slot.weather),
                });
        }

        Forecast {
            city: self.city.map(|c| c.name).unwrap_or_else(|| requested.to_string()),
            days: days.into_values().collect(),
        }
    }
}
