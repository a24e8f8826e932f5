//! Service Kit - Agent Tools
//!
//! Domain-specific tools that implement `agent_core::Tool` for the travel planner.

mod currency;
mod expense;
mod place_search;
mod weather;

pub use currency::CurrencyConverterTool;
pub use expense::{DailyBudgetTool, HotelCostTool, TotalExpenseTool, daily_budget, hotel_cost, total_expense};
pub use place_search::PlaceSearchTool;
pub use weather::{CurrentWeatherTool, WeatherForecastTool};
