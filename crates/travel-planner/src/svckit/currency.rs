//! Currency Conversion Tool

use std::sync::Arc;
use async_trait::async_trait;

use agent_core::{
    Tool, ToolSchema, ToolCall, ToolResult,
    tool::ParameterSchema,
    AgentError, Result as CoreResult,
};

use super::expense::decimal_arg;
use crate::error::PlannerError;
use crate::model::Conversion;
use crate::providers::RatesClient;

/// Converts an amount between two ISO 4217 currencies
pub struct CurrencyConverterTool {
    rates: Arc<dyn RatesClient>,
}

impl CurrencyConverterTool {
    pub const NAME: &'static str = "convert_currency";

    pub fn new(rates: Arc<dyn RatesClient>) -> Self {
        Self { rates }
    }
}

fn currency_code<'a>(call: &'a ToolCall, field: &str) -> CoreResult<&'a str> {
    call.str_arg(field)
        .map(str::trim)
        .filter(|c| c.len() == 3 && c.chars().all(|ch| ch.is_ascii_alphabetic()))
        .ok_or_else(|| AgentError::invalid_arguments(CurrencyConverterTool::NAME, format!("{} must be a 3-letter currency code", field)))
}

#[async_trait]
impl Tool for CurrencyConverterTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: Self::NAME.into(),
            description: "Convert an amount from one currency to another using live exchange rates.".into(),
            parameters: vec![
                ParameterSchema::required("amount", "number", "Amount to convert"),
                ParameterSchema::required("from_currency", "string", "Source currency code, e.g. 'USD'"),
                ParameterSchema::required("to_currency", "string", "Target currency code, e.g. 'EUR'"),
            ],
            category: Some("currency".into()),
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let amount = decimal_arg(call, "amount")?;
        let from = currency_code(call, "from_currency")?.to_uppercase();
        let to = currency_code(call, "to_currency")?.to_uppercase();

        let rate = if from == to {
            rust_decimal::Decimal::ONE
        } else {
            self.rates.rate(&from, &to).await?
        };

        let conversion = Conversion::new(amount, from, to, rate)
            .ok_or_else(|| PlannerError::invalid_amount("amount", "overflow"))?;
        tracing::debug!(%conversion, "Converted currency");

        Ok(ToolResult::success(Self::NAME, conversion.to_string()).with_source(self.rates.name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct EuroRates {
        lookups: AtomicUsize,
    }

    #[async_trait]
    impl RatesClient for EuroRates {
        async fn rate(&self, from: &str, to: &str) -> Result<Decimal> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            match (from, to) {
                ("USD", "EUR") => Ok(dec!(0.92)),
                ("USD", "JPY") => Ok(dec!(150)),
                _ => Err(PlannerError::UnsupportedCurrency(to.into())),
            }
        }

        fn name(&self) -> &str {
            "fixed-rates"
        }
    }

    fn call(amount: serde_json::Value, from: &str, to: &str) -> ToolCall {
        ToolCall::new(
            CurrencyConverterTool::NAME,
            HashMap::from([
                ("amount".to_string(), amount),
                ("from_currency".to_string(), json!(from)),
                ("to_currency".to_string(), json!(to)),
            ]),
        )
    }

    #[tokio::test]
    async fn test_conversion() {
        let tool = CurrencyConverterTool::new(Arc::new(EuroRates::default()));
        let result = tool.execute(&call(json!(250), "usd", "eur")).await.unwrap();
        assert_eq!(result.output, "250.00 USD = 230.00 EUR (rate 0.92)");
        assert_eq!(result.source.as_deref(), Some("fixed-rates"));
    }

    #[tokio::test]
    async fn test_same_currency_skips_lookup() {
        let rates = Arc::new(EuroRates::default());
        let tool = CurrencyConverterTool::new(rates.clone());
        let result = tool.execute(&call(json!("10"), "EUR", "EUR")).await.unwrap();

        assert_eq!(result.output, "10.00 EUR = 10.00 EUR (rate 1)");
        assert_eq!(rates.lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_overflowing_amount_is_a_tool_error() {
        let tool = CurrencyConverterTool::new(Arc::new(EuroRates::default()));
        assert!(matches!(
            tool.execute(&call(json!("79228162514264337593543950335"), "USD", "JPY")).await,
            Err(AgentError::ToolExecution(msg)) if msg.contains("overflow")
        ));
    }

    #[tokio::test]
    async fn test_bad_codes_and_unsupported_currency() {
        let tool = CurrencyConverterTool::new(Arc::new(EuroRates::default()));
        assert!(matches!(
            tool.execute(&call(json!(5), "dollars", "EUR")).await,
            Err(AgentError::InvalidArguments { .. })
        ));
        assert!(matches!(
            tool.execute(&call(json!(5), "USD", "XYZ")).await,
            Err(AgentError::ToolExecution(msg)) if msg.contains("XYZ")
        ));
    }
}
