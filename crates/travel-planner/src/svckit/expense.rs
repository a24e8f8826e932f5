//! Expense Calculator Tools
//!
//! Hotel cost, trip total and daily budget. All arithmetic is done in
//! `Decimal` and rounded to cents for display.

use std::str::FromStr;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;

use agent_core::{
    Tool, ToolSchema, ToolCall, ToolResult,
    tool::ParameterSchema,
    Result as CoreResult,
};

use crate::error::{PlannerError, Result};

/// Read a monetary or count value that may arrive as a number or a numeric string
pub(crate) fn decimal_value(field: &str, value: Option<&Value>) -> Result<Decimal> {
    let parsed = match value {
        Some(Value::Number(n)) => Decimal::from_str(&n.to_string())
            .ok()
            .or_else(|| n.as_f64().and_then(|f| Decimal::try_from(f).ok())),
        Some(Value::String(s)) => Decimal::from_str(s.trim().trim_start_matches('$')).ok(),
        Some(_) => None,
        None => return Err(PlannerError::invalid_amount(field, "missing")),
    };

    parsed.ok_or_else(|| PlannerError::invalid_amount(field, "not a number"))
}

pub(crate) fn decimal_arg(call: &ToolCall, field: &str) -> Result<Decimal> {
    decimal_value(field, call.arguments.get(field))
}

fn non_negative(field: &str, value: Decimal) -> Result<Decimal> {
    if value.is_sign_negative() {
        Err(PlannerError::invalid_amount(field, "must not be negative"))
    } else {
        Ok(value)
    }
}

/// Total hotel cost for a stay; `None` on overflow
pub fn hotel_cost(price_per_night: Decimal, nights: Decimal) -> Option<Decimal> {
    price_per_night.checked_mul(nights).map(|c| c.round_dp(2))
}

/// Sum of individual costs; `None` on overflow
pub fn total_expense(costs: &[Decimal]) -> Option<Decimal> {
    costs
        .iter()
        .try_fold(Decimal::ZERO, |acc, c| acc.checked_add(*c))
        .map(|t| t.round_dp(2))
}

/// Even daily budget; `None` when `days` is zero
pub fn daily_budget(total: Decimal, days: Decimal) -> Option<Decimal> {
    total.checked_div(days).map(|d| d.round_dp(2))
}

fn failure(tool: &str, err: PlannerError) -> ToolResult {
    ToolResult::failure(tool, err.to_string())
}

pub struct HotelCostTool;

impl HotelCostTool {
    pub const NAME: &'static str = "estimate_total_hotel_cost";
}

#[async_trait]
impl Tool for HotelCostTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: Self::NAME.into(),
            description: "Calculate total hotel cost, e.g. 'hotel cost for 5 nights at 150 per night'.".into(),
            parameters: vec![
                ParameterSchema::required("price_per_night", "number", "Price of one night"),
                ParameterSchema::required("total_days", "number", "Number of nights"),
            ],
            category: Some("expenses".into()),
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let inputs = decimal_arg(call, "price_per_night")
            .and_then(|p| non_negative("price_per_night", p))
            .and_then(|p| Ok((p, non_negative("total_days", decimal_arg(call, "total_days")?)?)));

        Ok(match inputs {
            Ok((price, nights)) => match hotel_cost(price, nights) {
                Some(total) => ToolResult::success(
                    Self::NAME,
                    format!(
                        "Total hotel cost: {:.2} ({} nights at {:.2} per night)",
                        total,
                        nights.normalize(),
                        price
                    ),
                ),
                None => failure(Self::NAME, PlannerError::invalid_amount("price_per_night", "overflow")),
            },
            Err(e) => failure(Self::NAME, e),
        })
    }
}

pub struct TotalExpenseTool;

impl TotalExpenseTool {
    pub const NAME: &'static str = "calculate_total_expense";
}

#[async_trait]
impl Tool for TotalExpenseTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: Self::NAME.into(),
            description: "Calculate the total expense of the trip from individual costs.".into(),
            parameters: vec![
                ParameterSchema::required("costs", "array", "Individual costs to add up, e.g. [450, 120.5, 80]")
                    .with_items("number"),
            ],
            category: Some("expenses".into()),
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let costs = match call.arguments.get("costs") {
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, v)| decimal_value(&format!("costs[{}]", i), Some(v)))
                .collect::<Result<Vec<_>>>(),
            Some(_) => Err(PlannerError::invalid_amount("costs", "must be a list of numbers")),
            None => Err(PlannerError::invalid_amount("costs", "missing")),
        };

        Ok(match costs {
            Ok(costs) if costs.is_empty() => ToolResult::failure(Self::NAME, "No costs provided"),
            Ok(costs) => match total_expense(&costs) {
                Some(total) => ToolResult::success(
                    Self::NAME,
                    format!("Total expense: {:.2} across {} items", total, costs.len()),
                ),
                None => failure(Self::NAME, PlannerError::invalid_amount("costs", "overflow")),
            },
            Err(e) => failure(Self::NAME, e),
        })
    }
}

pub struct DailyBudgetTool;

impl DailyBudgetTool {
    pub const NAME: &'static str = "calculate_daily_expense_budget";
}

#[async_trait]
impl Tool for DailyBudgetTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: Self::NAME.into(),
            description: "Calculate the daily budget by spreading the total cost over the trip days.".into(),
            parameters: vec![
                ParameterSchema::required("total_cost", "number", "Total trip cost"),
                ParameterSchema::required("days", "integer", "Number of days"),
            ],
            category: Some("expenses".into()),
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let inputs = decimal_arg(call, "total_cost").and_then(|t| Ok((t, decimal_arg(call, "days")?)));

        Ok(match inputs {
            Ok((_, days)) if days <= Decimal::ZERO => {
                failure(Self::NAME, PlannerError::invalid_amount("days", format!("must be positive, got {}", days)))
            }
            Ok((total, days)) => match daily_budget(total, days) {
                Some(per_day) => ToolResult::success(
                    Self::NAME,
                    format!("Daily budget: {:.2} per day over {} days", per_day, days.normalize()),
                ),
                None => failure(Self::NAME, PlannerError::invalid_amount("days", "division overflow")),
            },
            Err(e) => failure(Self::NAME, e),
        })
    }
}
