//! Place search sources
//!
//! Each source is bound to one [`PlaceCategory`] and implements
//! `FallbackProvider`, so a category's chain reads
//! Google Places → Foursquare → Tavily (catch-all).

use std::sync::Arc;
use std::time::Duration;

use agent_core::{AgentError, FallbackChain, FallbackProvider, Result as CoreResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::check_status;
use crate::error::{PlannerError, Result};
use crate::model::{Place, PlaceCategory, format_places};

pub const GOOGLE_LABEL: &str = "Google";
pub const FOURSQUARE_LABEL: &str = "Foursquare";
pub const TAVILY_LABEL: &str = "Tavily";

const GOOGLE_URL: &str = "https://maps.googleapis.com/maps/api/place/textsearch/json";
const FOURSQUARE_URL: &str = "https://api.foursquare.com/v3/places/search";
const TAVILY_URL: &str = "https://api.tavily.com/search";

/// Venues kept per answer
const MAX_PLACES: usize = 5;

/// Build the fallback chain for one category
pub fn place_chain(
    category: PlaceCategory,
    http: &Client,
    keys: &PlaceKeys,
    timeout: Duration,
) -> FallbackChain {
    let tavily = TavilySource::new(http.clone(), keys.tavily.clone(), category);
    FallbackChain::new(category.tool_name(), Arc::new(tavily))
        .then(Arc::new(GooglePlacesSource::new(http.clone(), keys.google.clone(), category)))
        .then(Arc::new(FoursquareSource::new(http.clone(), keys.foursquare.clone(), category)))
        .with_timeout(timeout)
}

/// Credentials for the place sources
#[derive(Clone, Debug, Default)]
pub struct PlaceKeys {
    pub google: Option<String>,
    pub foursquare: Option<String>,
    pub tavily: Option<String>,
}

fn into_core(err: PlannerError) -> AgentError {
    err.into()
}

// ============================================================================
// Google Places (text search)
// ============================================================================

pub struct GooglePlacesSource {
    http: Client,
    api_key: Option<String>,
    category: PlaceCategory,
}

impl GooglePlacesSource {
    pub fn new(http: Client, api_key: Option<String>, category: PlaceCategory) -> Self {
        Self { http, api_key, category }
    }

    async fn search(&self, place: &str) -> Result<String> {
        let key = self.api_key.as_deref().ok_or(PlannerError::MissingCredential("GPLACES_API_KEY"))?;

        let response = self.http
            .get(GOOGLE_URL)
            .query(&[("query", self.category.search_query(place)), ("key", key.to_string())])
            .send()
            .await?;
        let body: GoogleResponse = check_status("Google Places", response).await?.json().await?;

        match body.status.as_str() {
            "OK" => Ok(format_places(&body.into_places())),
            "ZERO_RESULTS" => Ok(String::new()),
            status => Err(PlannerError::Upstream {
                service: "Google Places",
                status: 200,
                message: format!("{}: {}", status, body.error_message.unwrap_or_default()),
            }),
        }
    }
}

#[async_trait]
impl FallbackProvider for GooglePlacesSource {
    fn label(&self) -> &str {
        GOOGLE_LABEL
    }

    async fn fetch(&self, query: &str) -> CoreResult<String> {
        self.search(query).await.map_err(into_core)
    }
}

#[derive(Debug, Deserialize)]
struct GoogleResponse {
    status: String,
    #[serde(default)]
    results: Vec<GooglePlace>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GooglePlace {
    name: String,
    #[serde(default)]
    formatted_address: Option<String>,
    #[serde(default)]
    rating: Option<f64>,
    #[serde(default)]
    price_level: Option<u8>,
}

impl GoogleResponse {
    fn into_places(self) -> Vec<Place> {
        self.results
            .into_iter()
            .take(MAX_PLACES)
            .map(|p| Place {
                name: p.name,
                address: p.formatted_address,
                rating: p.rating,
                price_level: p.price_level,
            })
            .collect()
    }
}

// ============================================================================
// Foursquare
// ============================================================================

pub struct FoursquareSource {
    http: Client,
    api_key: Option<String>,
    category: PlaceCategory,
}

impl FoursquareSource {
    pub fn new(http: Client, api_key: Option<String>, category: PlaceCategory) -> Self {
        Self { http, api_key, category }
    }

    /// Foursquare category ids for the search
    fn category_ids(&self) -> &'static str {
        match self.category {
            PlaceCategory::Attractions => "16000",
            PlaceCategory::Restaurants => "13065",
            PlaceCategory::Activities => "16000,10000",
            PlaceCategory::Transportation => "10000",
        }
    }

    async fn search(&self, place: &str) -> Result<String> {
        let key = self.api_key.as_deref().ok_or(PlannerError::MissingCredential("FOURSQUARE_API_KEY"))?;

        let response = self.http
            .get(FOURSQUARE_URL)
            .header("Accept", "application/json")
            .header("Authorization", key)
            .query(&[
                ("query", self.category.keyword()),
                ("near", place),
                ("categories", self.category_ids()),
                ("sort", "RATING"),
                ("limit", "10"),
            ])
            .send()
            .await?;
        let body: FoursquareResponse = check_status("Foursquare", response).await?.json().await?;

        Ok(self.render(body, place))
    }

    fn render(&self, body: FoursquareResponse, place: &str) -> String {
        let places: Vec<Place> = body
            .results
            .into_iter()
            .take(MAX_PLACES)
            .map(|venue| Place {
                name: venue.name,
                address: venue.location.and_then(|l| l.formatted_address),
                rating: venue.rating,
                price_level: venue.price,
            })
            .collect();

        if places.is_empty() {
            format!("{} for {}", self.category.not_found_phrase(), place)
        } else {
            format_places(&places)
        }
    }
}

#[async_trait]
impl FallbackProvider for FoursquareSource {
    fn label(&self) -> &str {
        FOURSQUARE_LABEL
    }

    fn not_found_sentinel(&self) -> Option<&str> {
        Some(self.category.not_found_phrase())
    }

    async fn fetch(&self, query: &str) -> CoreResult<String> {
        self.search(query).await.map_err(into_core)
    }
}

#[derive(Debug, Deserialize)]
struct FoursquareResponse {
    #[serde(default)]
    results: Vec<FoursquareVenue>,
}

#[derive(Debug, Deserialize)]
struct FoursquareVenue {
    name: String,
    #[serde(default)]
    location: Option<FoursquareLocation>,
    #[serde(default)]
    rating: Option<f64>,
    #[serde(default)]
    price: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct FoursquareLocation {
    #[serde(default)]
    formatted_address: Option<String>,
}

// ============================================================================
// Tavily web search (catch-all)
// ============================================================================

pub struct TavilySource {
    http: Client,
    api_key: Option<String>,
    category: PlaceCategory,
}

impl TavilySource {
    pub fn new(http: Client, api_key: Option<String>, category: PlaceCategory) -> Self {
        Self { http, api_key, category }
    }

    async fn search(&self, place: &str) -> Result<String> {
        let key = self.api_key.as_deref().ok_or(PlannerError::MissingCredential("TAVILY_API_KEY"))?;

        let response = self.http
            .post(TAVILY_URL)
            .bearer_auth(key)
            .json(&json!({
                "query": self.category.search_query(place),
                "search_depth": "advanced",
                "include_answer": true,
                "max_results": MAX_PLACES,
            }))
            .send()
            .await?;
        let body: TavilyResponse = check_status("Tavily", response).await?.json().await?;

        Ok(body.render())
    }
}

#[async_trait]
impl FallbackProvider for TavilySource {
    fn label(&self) -> &str {
        TAVILY_LABEL
    }

    async fn fetch(&self, query: &str) -> CoreResult<String> {
        self.search(query).await.map_err(into_core)
    }
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    results: Vec<TavilyHit>,
}

#[derive(Debug, Deserialize)]
struct TavilyHit {
    title: String,
    #[serde(default)]
    content: String,
}

impl TavilyResponse {
    /// The synthesized answer when present, otherwise the hits
    fn render(self) -> String {
        if let Some(answer) = self.answer.filter(|a| !a.trim().is_empty()) {
            return answer;
        }
        self.results
            .iter()
            .map(|hit| format!("• {}: {}", hit.title, hit.content))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chain_order() {
        let chain = place_chain(
            PlaceCategory::Restaurants,
            &Client::new(),
            &PlaceKeys::default(),
            Duration::from_secs(5),
        );
        assert_eq!(chain.capability(), "search_restaurants");
        assert_eq!(chain.labels(), vec![GOOGLE_LABEL, FOURSQUARE_LABEL, TAVILY_LABEL]);
    }

    #[test]
    fn test_google_results_are_capped() {
        let results: Vec<_> = (0..8)
            .map(|i| json!({"name": format!("Spot {}", i), "formatted_address": "Paris", "rating": 4.5}))
            .collect();
        let body: GoogleResponse = serde_json::from_value(json!({"status": "OK", "results": results})).unwrap();

        let places = body.into_places();
        assert_eq!(places.len(), MAX_PLACES);
        assert_eq!(places[0].to_line(), "• Spot 0 - Paris (Rating: 4.5)");
    }

    #[test]
    fn test_foursquare_empty_hits_sentinel() {
        let source = FoursquareSource::new(Client::new(), Some("key".into()), PlaceCategory::Activities);
        let body: FoursquareResponse = serde_json::from_value(json!({"results": []})).unwrap();

        let rendered = source.render(body, "Lyon");
        assert_eq!(rendered, "No activities found for Lyon");
        assert!(rendered.contains(source.not_found_sentinel().unwrap()));
    }

    #[test]
    fn test_tavily_prefers_answer() {
        let body: TavilyResponse = serde_json::from_value(json!({
            "answer": "Metro, buses and Vélib' bikes.",
            "results": [{"title": "RATP", "content": "Paris transit"}]
        }))
        .unwrap();
        assert_eq!(body.render(), "Metro, buses and Vélib' bikes.");

        let body: TavilyResponse = serde_json::from_value(json!({
            "answer": null,
            "results": [{"title": "RATP", "content": "Paris transit"}]
        }))
        .unwrap();
        assert_eq!(body.render(), "• RATP: Paris transit");
    }

    #[tokio::test]
    async fn test_missing_keys_surface_as_provider_errors() {
        let source = GooglePlacesSource::new(Client::new(), None, PlaceCategory::Attractions);
        let err = source.fetch("Paris").await.unwrap_err();
        assert!(matches!(err, AgentError::ProviderUnavailable(msg) if msg.contains("GPLACES_API_KEY")));
    }
}
