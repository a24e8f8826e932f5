//! Provider Fallback
//!
//! Tools backed by several interchangeable data sources describe them as a
//! [`FallbackChain`]. The [`FallbackResolver`] walks the chain in declared
//! order and keeps the first usable answer; when nothing in the chain
//! delivers, the chain's catch-all provider answers instead.
//!
//! ```text
//! Google ──✗──▶ Foursquare ──✗──▶ (exhausted) ──▶ Tavily (catch-all)
//!    │              │
//!    ✓              ✓
//!    └──────────────┴──▶ ToolResult tagged with the provider label
//! ```

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{AgentError, Result};
use crate::tool::ToolResult;

/// Default per-provider timeout
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(15);

/// One data source for a logical capability
#[async_trait]
pub trait FallbackProvider: Send + Sync {
    /// Stable identity used for availability checks and result tagging
    fn label(&self) -> &str;

    /// Phrase meaning "nothing found" even though the call succeeded
    fn not_found_sentinel(&self) -> Option<&str> {
        None
    }

    /// Query the source
    async fn fetch(&self, query: &str) -> Result<String>;
}

/// Which providers are usable, decided once at startup
#[derive(Clone, Debug, Default)]
pub struct ProviderAvailability {
    unavailable: HashSet<String>,
}

impl ProviderAvailability {
    /// Every provider available
    pub fn all() -> Self {
        Self::default()
    }

    /// Build from `(label, available)` pairs, e.g. credential presence
    pub fn from_flags<I, S>(flags: I) -> Self
    where
        I: IntoIterator<Item = (S, bool)>,
        S: Into<String>,
    {
        let unavailable = flags
            .into_iter()
            .filter(|(_, available)| !available)
            .map(|(label, _)| label.into())
            .collect();
        Self { unavailable }
    }

    pub fn is_available(&self, label: &str) -> bool {
        !self.unavailable.contains(label)
    }

    /// Labels that were disabled at startup
    pub fn disabled(&self) -> impl Iterator<Item = &str> {
        self.unavailable.iter().map(String::as_str)
    }
}

/// Ordered providers for one capability plus its catch-all
#[derive(Clone)]
pub struct FallbackChain {
    capability: String,
    providers: Vec<Arc<dyn FallbackProvider>>,
    catch_all: Arc<dyn FallbackProvider>,
    timeout: Duration,
}

impl FallbackChain {
    pub fn new(capability: impl Into<String>, catch_all: Arc<dyn FallbackProvider>) -> Self {
        Self {
            capability: capability.into(),
            providers: Vec::new(),
            catch_all,
            timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }

    /// Append a provider; providers are tried in the order they are added
    pub fn then(mut self, provider: Arc<dyn FallbackProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn capability(&self) -> &str {
        &self.capability
    }

    /// Labels in try order, catch-all last
    pub fn labels(&self) -> Vec<&str> {
        self.providers
            .iter()
            .chain(std::iter::once(&self.catch_all))
            .map(|p| p.label())
            .collect()
    }
}

/// Tries a chain's providers in order until one yields usable data
#[derive(Clone, Debug, Default)]
pub struct FallbackResolver {
    availability: Arc<ProviderAvailability>,
}

impl FallbackResolver {
    pub fn new(availability: Arc<ProviderAvailability>) -> Self {
        Self { availability }
    }

    pub fn availability(&self) -> &ProviderAvailability {
        &self.availability
    }

    /// Resolve `query` against `chain`; exactly one provider's output is
    /// returned
    pub async fn resolve(&self, chain: &FallbackChain, query: &str) -> ToolResult {
        for provider in &chain.providers {
            let label = provider.label();

            if !self.availability.is_available(label) {
                tracing::debug!(capability = %chain.capability, provider = %label, "Provider disabled, skipping");
                continue;
            }

            match Self::attempt(provider.as_ref(), query, chain.timeout).await {
                Ok(output) if is_acceptable(provider.as_ref(), &output) => {
                    tracing::debug!(capability = %chain.capability, provider = %label, "Provider satisfied request");
                    return ToolResult::success(&chain.capability, output).with_source(label);
                }
                Ok(_) => {
                    tracing::debug!(capability = %chain.capability, provider = %label, "Provider returned nothing usable");
                }
                Err(e) => {
                    tracing::warn!(capability = %chain.capability, provider = %label, error = %e, "Provider failed");
                }
            }
        }

        let exhausted = AgentError::NoAcceptableProvider(chain.capability.clone());
        tracing::info!(error = %exhausted, catch_all = %chain.catch_all.label(), "Falling back to catch-all provider");

        let label = chain.catch_all.label();
        match Self::attempt(chain.catch_all.as_ref(), query, chain.timeout).await {
            Ok(output) => ToolResult::success(&chain.capability, output).with_source(label),
            Err(e) => {
                tracing::error!(capability = %chain.capability, provider = %label, error = %e, "Catch-all provider failed");
                ToolResult::failure(&chain.capability, format!("No data available: {}", e)).with_source(label)
            }
        }
    }

    async fn attempt(provider: &dyn FallbackProvider, query: &str, timeout: Duration) -> Result<String> {
        match tokio::time::timeout(timeout, provider.fetch(query)).await {
            Ok(result) => result,
            Err(_) => Err(AgentError::ProviderUnavailable(format!(
                "{} timed out after {:?}",
                provider.label(),
                timeout
            ))),
        }
    }
}

fn is_acceptable(provider: &dyn FallbackProvider, output: &str) -> bool {
    if output.trim().is_empty() {
        return false;
    }
    provider
        .not_found_sentinel()
        .is_none_or(|sentinel| !output.contains(sentinel))
}
