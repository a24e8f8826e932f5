//! # travel-planner
//!
//! Travel planning and expense tools for the orchestration engine.
//!
//! ## Tools
//!
//! ```text
//! ┌────────────────────────────────┬───────────────────────────────────────┐
//! │ get_current_weather(city)      │ OpenWeatherMap                        │
//! │ get_weather_forecast(city)     │ OpenWeatherMap                        │
//! │ search_attractions(place)      │ Google → Foursquare → Tavily (always) │
//! │ search_restaurants(place)      │ Google → Foursquare → Tavily (always) │
//! │ search_activities(place)       │ Google → Foursquare → Tavily (always) │
//! │ search_transportation(place)   │ Google → Foursquare → Tavily (always) │
//! │ estimate_total_hotel_cost      │ local                                 │
//! │ calculate_total_expense        │ local                                 │
//! │ calculate_daily_expense_budget │ local                                 │
//! │ convert_currency               │ ExchangeRate-API                      │
//! └────────────────────────────────┴───────────────────────────────────────┘
//! ```
//!
//! Place-search providers without credentials are disabled once at startup
//! through [`ProviderAvailability`]; the Tavily catch-all is always tried
//! last.

pub mod error;
pub mod model;
pub mod providers;
pub mod svckit;

use std::sync::Arc;
use std::time::Duration;

use agent_core::{FallbackResolver, PromptComposer, ProviderAvailability, ToolRegistry};

pub use error::{PlannerError, Result};
pub use model::{Conversion, Forecast, Place, PlaceCategory, WeatherReport};

use providers::{
    ExchangeRateClient, FOURSQUARE_LABEL, GOOGLE_LABEL, OpenWeatherClient, PlaceKeys, RatesClient, WeatherClient,
    http_client, place_chain,
};

/// Re-export tools for easy registration
pub mod tools {
    pub use crate::svckit::{
        CurrencyConverterTool,
        CurrentWeatherTool,
        DailyBudgetTool,
        HotelCostTool,
        PlaceSearchTool,
        TotalExpenseTool,
        WeatherForecastTool,
    };
}

/// System prompt for the travel agent
pub const TRAVEL_AGENT_PROMPT: &str = r#"You are a helpful AI travel agent and expense planner with access to tools.

Read the user's request carefully and pick tools accordingly.

## Trip planning requests
("Plan a trip to Paris", "Create an itinerary for Tokyo")

- Get the destination forecast with get_weather_forecast
- Find attractions, restaurants, activities and transportation with the search tools
- Estimate accommodation with estimate_total_hotel_cost
- Add everything up with calculate_total_expense and derive a daily budget
- Use convert_currency when the traveller pays in another currency
- Answer with a day-by-day itinerary built from the tool results

## Specific questions
("What's the weather in London?", "Convert 100 USD to EUR")

- Call only the tool the question needs
- Answer directly and concisely; do not produce a full plan unless asked

## Tools

- get_current_weather(city), get_weather_forecast(city)
- search_attractions(place), search_restaurants(place), search_activities(place), search_transportation(place)
- estimate_total_hotel_cost(price_per_night, total_days)
- calculate_total_expense(costs), calculate_daily_expense_budget(total_cost, days)
- convert_currency(amount, from_currency, to_currency)

Always use tools for live data instead of relying on memory."#;

/// Prompt composer seeded with the travel agent prompt
pub fn composer() -> PromptComposer {
    PromptComposer::new(TRAVEL_AGENT_PROMPT)
}

/// Credentials and limits for the data providers
#[derive(Clone, Debug)]
pub struct PlannerConfig {
    pub openweather_key: Option<String>,
    pub exchange_rate_key: Option<String>,
    pub places: PlaceKeys,

    /// Timeout for each outbound HTTP request
    pub http_timeout: Duration,

    /// Budget for one provider in a place-search chain
    pub provider_timeout: Duration,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            openweather_key: None,
            exchange_rate_key: None,
            places: PlaceKeys::default(),
            http_timeout: Duration::from_secs(20),
            provider_timeout: agent_core::fallback::DEFAULT_PROVIDER_TIMEOUT,
        }
    }
}

fn credential(var: &'static str) -> Option<String> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
        _ => {
            tracing::warn!("{} not found or empty - dependent provider disabled", var);
            None
        }
    }
}

impl PlannerConfig {
    /// Read provider credentials from the environment. Missing keys
    /// disable the matching provider; they never fail startup.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let provider_timeout = std::env::var("PROVIDER_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map_or(defaults.provider_timeout, Duration::from_secs);

        Self {
            openweather_key: credential("OPENWEATHERMAP_API_KEY"),
            exchange_rate_key: credential("EXCHANGE_RATE_API_KEY"),
            places: PlaceKeys {
                google: credential("GPLACES_API_KEY"),
                foursquare: credential("FOURSQUARE_API_KEY"),
                tavily: credential("TAVILY_API_KEY"),
            },
            provider_timeout,
            ..defaults
        }
    }

    /// Which place-search providers may be called
    pub fn availability(&self) -> ProviderAvailability {
        ProviderAvailability::from_flags([
            (GOOGLE_LABEL, self.places.google.is_some()),
            (FOURSQUARE_LABEL, self.places.foursquare.is_some()),
        ])
    }
}

/// Build the registry with the real HTTP providers
pub fn build_registry(config: &PlannerConfig) -> Result<ToolRegistry> {
    let http = http_client(config.http_timeout)?;

    let weather: Arc<dyn WeatherClient> = Arc::new(OpenWeatherClient::new(http.clone(), config.openweather_key.clone()));
    let rates: Arc<dyn RatesClient> = Arc::new(ExchangeRateClient::new(http.clone(), config.exchange_rate_key.clone()));
    let resolver = FallbackResolver::new(Arc::new(config.availability()));

    let disabled: Vec<_> = resolver.availability().disabled().collect();
    if !disabled.is_empty() {
        tracing::info!(?disabled, "Place search providers disabled");
    }

    let mut registry = register_core_tools(weather, rates);
    for category in PlaceCategory::ALL {
        let chain = place_chain(category, &http, &config.places, config.provider_timeout);
        registry.register(tools::PlaceSearchTool::new(category, chain, resolver.clone()));
    }

    tracing::info!(tools = registry.len(), "Travel tools registered");
    Ok(registry)
}

/// Weather, expense and currency tools over the given clients
pub fn register_core_tools(weather: Arc<dyn WeatherClient>, rates: Arc<dyn RatesClient>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(tools::CurrentWeatherTool::new(weather.clone()));
    registry.register(tools::WeatherForecastTool::new(weather));
    registry.register(tools::HotelCostTool);
    registry.register(tools::TotalExpenseTool);
    registry.register(tools::DailyBudgetTool);
    registry.register(tools::CurrencyConverterTool::new(rates));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::adapter::StructuredAdapter;
    use agent_core::message::{Message, Role};
    use agent_core::provider::{Completion, GenerationOptions, LlmProvider, ProviderInfo};
    use agent_core::{
        AgentBuilder, AgentError, FallbackChain, FallbackProvider, Intent, ToolCall, ToolSchema,
        Result as CoreResult,
    };
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    use crate::model::DailyForecast;

    /// Replays scripted completions and records what it was sent
    struct ScriptedProvider {
        replies: Mutex<VecDeque<Completion>>,
        seen_tools: Mutex<Vec<usize>>,
    }

    impl ScriptedProvider {
        fn new(replies: Vec<Completion>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                seen_tools: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn info(&self) -> ProviderInfo {
            ProviderInfo { name: "scripted".into(), model: "test".into(), supports_tools: true }
        }

        async fn health_check(&self) -> CoreResult<bool> {
            Ok(true)
        }

        async fn complete(&self, _: &[Message], tools: &[ToolSchema], _: &GenerationOptions) -> CoreResult<Completion> {
            self.seen_tools.lock().unwrap().push(tools.len());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| AgentError::BackendUnavailable("script exhausted".into()))
        }
    }

    struct FakeWeather;

    #[async_trait]
    impl WeatherClient for FakeWeather {
        async fn current(&self, city: &str) -> Result<WeatherReport> {
            Ok(WeatherReport {
                city: city.into(),
                temperature: 24.0,
                feels_like: 24.5,
                humidity: 40,
                wind_speed: 3.0,
                description: "clear sky".into(),
            })
        }

        async fn forecast(&self, city: &str) -> Result<Forecast> {
            let days = (1..=3)
                .map(|d| DailyForecast {
                    date: NaiveDate::from_ymd_opt(2025, 6, d).unwrap(),
                    temp_min: 15.0,
                    temp_max: 24.0,
                    description: "sunny".into(),
                })
                .collect();
            Ok(Forecast { city: city.into(), days })
        }

        fn name(&self) -> &str {
            "fake-weather"
        }
    }

    struct FakeRates;

    #[async_trait]
    impl RatesClient for FakeRates {
        async fn rate(&self, _: &str, _: &str) -> Result<Decimal> {
            Ok(dec!(0.5))
        }

        fn name(&self) -> &str {
            "fake-rates"
        }
    }

    struct FakeSearch;

    #[async_trait]
    impl FallbackProvider for FakeSearch {
        fn label(&self) -> &str {
            "Tavily"
        }

        async fn fetch(&self, query: &str) -> CoreResult<String> {
            Ok(format!("Top picks in {}", query))
        }
    }

    fn registry() -> ToolRegistry {
        let mut registry = register_core_tools(Arc::new(FakeWeather), Arc::new(FakeRates));
        for category in PlaceCategory::ALL {
            let chain = FallbackChain::new(category.tool_name(), Arc::new(FakeSearch));
            registry.register(tools::PlaceSearchTool::new(category, chain, FallbackResolver::default()));
        }
        registry
    }

    fn call(name: &str, args: serde_json::Value) -> ToolCall {
        let serde_json::Value::Object(map) = args else { panic!("object expected") };
        ToolCall::new(name, map.into_iter().collect::<HashMap<_, _>>()).with_id(format!("call_{}", name))
    }

    #[test]
    fn test_registry_has_all_tools_in_order() {
        let registry = registry();
        assert_eq!(
            registry.names(),
            vec![
                "get_current_weather",
                "get_weather_forecast",
                "estimate_total_hotel_cost",
                "calculate_total_expense",
                "calculate_daily_expense_budget",
                "convert_currency",
                "search_attractions",
                "search_restaurants",
                "search_activities",
                "search_transportation",
            ]
        );
    }

    #[test]
    fn test_availability_follows_credentials() {
        let config = PlannerConfig {
            places: PlaceKeys { google: None, foursquare: Some("k".into()), tavily: None },
            ..PlannerConfig::default()
        };
        let availability = config.availability();
        assert!(!availability.is_available(GOOGLE_LABEL));
        assert!(availability.is_available(FOURSQUARE_LABEL));
        assert!(availability.is_available(providers::TAVILY_LABEL));
    }

    #[test]
    fn test_build_registry_without_credentials() {
        let registry = build_registry(&PlannerConfig::default()).unwrap();
        assert_eq!(registry.len(), 10);
    }

    #[tokio::test]
    async fn test_weather_question_uses_only_weather() {
        let provider = ScriptedProvider::new(vec![
            Completion::tool_use(vec![call("get_current_weather", json!({"city": "Rome"}))], "test"),
            Completion::text("It's 24°C and clear in Rome.", "test"),
        ]);
        let agent = AgentBuilder::new()
            .adapter(Arc::new(StructuredAdapter::new(provider.clone(), GenerationOptions::default())))
            .tools(registry())
            .composer(composer())
            .build()
            .unwrap();

        let outcome = agent.run("What's the weather in Rome?").await.unwrap();

        assert_eq!(outcome.intent, Intent::Direct);
        assert_eq!(outcome.tools_invoked, vec!["get_current_weather"]);
        assert_eq!(outcome.answer, "It's 24°C and clear in Rome.");
        assert_eq!(*provider.seen_tools.lock().unwrap(), vec![10, 10]);

        let tool_message = &outcome.conversation.messages()[3];
        assert_eq!(tool_message.role, Role::Tool);
        assert!(tool_message.content.contains("Current weather in Rome: 24.0°C"));
    }

    #[tokio::test]
    async fn test_trip_plan_gathers_weather_places_and_costs() {
        let provider = ScriptedProvider::new(vec![
            Completion::tool_use(
                vec![
                    call("get_weather_forecast", json!({"city": "Paris"})),
                    call("search_attractions", json!({"place": "Paris"})),
                    call("estimate_total_hotel_cost", json!({"price_per_night": 150, "total_days": 3})),
                ],
                "test",
            ),
            Completion::tool_use(vec![call("calculate_total_expense", json!({"costs": [450, 300]}))], "test"),
            Completion::text("Day 1: Louvre... Total budget 750.00", "test"),
        ]);
        let agent = AgentBuilder::new()
            .adapter(Arc::new(StructuredAdapter::new(provider, GenerationOptions::default())))
            .tools(registry())
            .composer(composer())
            .build()
            .unwrap();

        let outcome = agent.run("Plan a 3-day trip to Paris with budget breakdown").await.unwrap();

        assert_eq!(outcome.intent, Intent::Planning);
        assert_eq!(
            outcome.tools_invoked,
            vec!["get_weather_forecast", "search_attractions", "estimate_total_hotel_cost", "calculate_total_expense"]
        );
        assert!(outcome.conversation.messages()[0].content.contains(agent_core::prompt::PLANNING_DIRECTIVE));

        let outputs: Vec<_> = outcome
            .conversation
            .messages()
            .iter()
            .filter(|m| m.role == Role::Tool)
            .map(|m| m.content.as_str())
            .collect();
        assert!(outputs[1].contains("Following are the attractions of Paris as suggested by Tavily"));
        assert!(outputs[2].contains("Total hotel cost: 450.00"));
        assert!(outputs[3].contains("Total expense: 750.00"));
        assert_eq!(outcome.answer, "Day 1: Louvre... Total budget 750.00");
    }
}
