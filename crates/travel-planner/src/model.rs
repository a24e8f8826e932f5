//! Domain Models
//!
//! Data types shared by the provider clients and the tools. Money values use
//! `rust_decimal`; temperatures and wind speeds are plain floats.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Current conditions for a city
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WeatherReport {
    pub city: String,

    /// Temperature in °C
    pub temperature: f64,

    /// Apparent temperature in °C
    pub feels_like: f64,

    /// Relative humidity (%)
    pub humidity: u8,

    /// Wind speed in m/s
    pub wind_speed: f64,

    /// Human-readable conditions ("light rain")
    pub description: String,
}

impl fmt::Display for WeatherReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Current weather in {}: {:.1}°C (feels like {:.1}°C), {}, humidity {}%, wind {:.1} m/s",
            self.city, self.temperature, self.feels_like, self.description, self.humidity, self.wind_speed
        )
    }
}

/// Aggregated forecast for one calendar day
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DailyForecast {
    pub date: NaiveDate,
    pub temp_min: f64,
    pub temp_max: f64,
    pub description: String,
}

/// Multi-day forecast for a city
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Forecast {
    pub city: String,
    pub days: Vec<DailyForecast>,
}

impl fmt::Display for Forecast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Weather forecast for {}:", self.city)?;
        for day in &self.days {
            write!(
                f,
                "\n  {}: {:.1}°C to {:.1}°C, {}",
                day.date.format("%a %Y-%m-%d"),
                day.temp_min,
                day.temp_max,
                day.description
            )?;
        }
        Ok(())
    }
}

/// Kinds of place search, one tool each
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceCategory {
    Attractions,
    Restaurants,
    Activities,
    Transportation,
}

impl PlaceCategory {
    pub const ALL: [PlaceCategory; 4] = [
        Self::Attractions,
        Self::Restaurants,
        Self::Activities,
        Self::Transportation,
    ];

    /// Registered tool name
    pub fn tool_name(self) -> &'static str {
        match self {
            Self::Attractions => "search_attractions",
            Self::Restaurants => "search_restaurants",
            Self::Activities => "search_activities",
            Self::Transportation => "search_transportation",
        }
    }

    /// Keyword used by venue APIs
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Attractions => "attractions",
            Self::Restaurants => "restaurants",
            Self::Activities => "activities",
            Self::Transportation => "transportation",
        }
    }

    /// Free-text query for text-search style APIs
    pub fn search_query(self, place: &str) -> String {
        match self {
            Self::Attractions => format!("top attractive places in and around {}", place),
            Self::Restaurants => format!("top restaurants and eateries in and around {}", place),
            Self::Activities => format!("activities in and around {}", place),
            Self::Transportation => format!("modes of transportation available in {}", place),
        }
    }

    /// Phrase used when presenting results
    pub fn heading(self, place: &str) -> String {
        match self {
            Self::Attractions => format!("the attractions of {}", place),
            Self::Restaurants => format!("the restaurants of {}", place),
            Self::Activities => format!("the activities in and around {}", place),
            Self::Transportation => format!("the modes of transportation available in {}", place),
        }
    }

    /// Phrase a venue API answers with when it has nothing for the place
    pub fn not_found_phrase(self) -> &'static str {
        match self {
            Self::Attractions => "No attractions found",
            Self::Restaurants => "No restaurants found",
            Self::Activities => "No activities found",
            Self::Transportation => "No transportation options found",
        }
    }
}

impl fmt::Display for PlaceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// A venue returned by a places API
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    pub address: Option<String>,
    pub rating: Option<f64>,
    pub price_level: Option<u8>,
}

impl Place {
    /// One bullet line
    pub fn to_line(&self) -> String {
        let mut line = format!("• {}", self.name);
        if let Some(address) = &self.address {
            line.push_str(&format!(" - {}", address));
        }
        match (self.rating, self.price_level) {
            (Some(rating), Some(price)) => line.push_str(&format!(" (Rating: {:.1}, Price: {})", rating, "$".repeat(price.into()))),
            (Some(rating), None) => line.push_str(&format!(" (Rating: {:.1})", rating)),
            (None, Some(price)) => line.push_str(&format!(" (Price: {})", "$".repeat(price.into()))),
            (None, None) => {}
        }
        line
    }
}

/// Render places as a bullet list
pub fn format_places(places: &[Place]) -> String {
    places.iter().map(Place::to_line).collect::<Vec<_>>().join("\n")
}

/// Result of a currency conversion
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Conversion {
    pub amount: Decimal,
    pub from: String,
    pub to: String,
    pub rate: Decimal,
    pub converted: Decimal,
}

impl Conversion {
    /// `None` when `amount * rate` overflows
    pub fn new(amount: Decimal, from: impl Into<String>, to: impl Into<String>, rate: Decimal) -> Option<Self> {
        let converted = amount.checked_mul(rate)?.round_dp(2);
        Some(Self {
            amount,
            from: from.into(),
            to: to.into(),
            rate,
            converted,
        })
    }
}

impl fmt::Display for Conversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.2} {} = {:.2} {} (rate {})",
            self.amount,
            self.from,
            self.converted,
            self.to,
            self.rate.normalize()
        )
    }
}
