use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{InsightError, Result};

/// Billing bucket a request falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    /// Covered by the subscription's included quota.
    Included,
    /// Billed on top of the subscription (usage-based).
    OnDemand,
    /// Errored or aborted; never billed.
    Errored,
}

impl RequestKind {
    /// Classify a raw kind string from the usage export.
    ///
    /// Matching is a case-insensitive substring test, checked in this order:
    /// * contains `errored` or `aborted` → [`RequestKind::Errored`]
    /// * contains `included` → [`RequestKind::Included`]
    /// * anything else → [`RequestKind::OnDemand`]
    ///
    /// # Examples
    ///
    /// ```
    /// use usage_core::models::RequestKind;
    ///
    /// assert_eq!(RequestKind::classify("Errored, Not Charged"), RequestKind::Errored);
    /// assert_eq!(RequestKind::classify("Aborted, Not Charged"), RequestKind::Errored);
    /// assert_eq!(RequestKind::classify("Included in Pro"), RequestKind::Included);
    /// assert_eq!(RequestKind::classify("Usage-based"), RequestKind::OnDemand);
    /// ```
    pub fn classify(raw: &str) -> Self {
        let lower = raw.to_lowercase();
        if lower.contains("errored") || lower.contains("aborted") {
            RequestKind::Errored
        } else if lower.contains("included") {
            RequestKind::Included
        } else {
            RequestKind::OnDemand
        }
    }

    /// Whether requests of this kind are charged.
    pub fn is_billed(&self) -> bool {
        !matches!(self, RequestKind::Errored)
    }
}

/// A single validated usage record.
///
/// Accepts both snake_case and the camelCase spellings used by export tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageEvent {
    /// UTC timestamp when the request was made.
    pub timestamp: DateTime<Utc>,
    /// Raw request-kind string, e.g. `"Included"` or `"Errored, Not Charged"`.
    #[serde(alias = "requestKind", alias = "type")]
    pub kind: String,
    /// Model identifier as reported by the tool.
    #[serde(alias = "modelName")]
    pub model: String,
    /// Cost in US dollars recorded for this request.
    #[serde(default, alias = "costAmount", alias = "cost_usd")]
    pub cost: f64,
    /// Total tokens across all categories.
    #[serde(default, alias = "totalTokens")]
    pub total_tokens: u64,
    /// Tokens served from the prompt cache.
    #[serde(default, alias = "cacheReadTokens")]
    pub cache_read_tokens: u64,
    /// Fresh (non-cached) input tokens.
    #[serde(default, alias = "inputTokens")]
    pub input_tokens: u64,
    /// Output (completion) tokens.
    #[serde(default, alias = "outputTokens")]
    pub output_tokens: u64,
}

impl UsageEvent {
    /// Event with the given identity and cost and no token counts.
    pub fn new(
        timestamp: DateTime<Utc>,
        kind: impl Into<String>,
        model: impl Into<String>,
        cost: f64,
    ) -> Self {
        Self {
            timestamp,
            kind: kind.into(),
            model: model.into(),
            cost,
            total_tokens: 0,
            cache_read_tokens: 0,
            input_tokens: 0,
            output_tokens: 0,
        }
    }

    /// Set the token breakdown; `total_tokens` becomes the sum of the three.
    pub fn with_tokens(mut self, input: u64, output: u64, cache_read: u64) -> Self {
        self.input_tokens = input;
        self.output_tokens = output;
        self.cache_read_tokens = cache_read;
        self.total_tokens = input.saturating_add(output).saturating_add(cache_read);
        self
    }

    /// Override `total_tokens` (exports may count cache writes separately).
    pub fn with_total_tokens(mut self, total: u64) -> Self {
        self.total_tokens = total;
        self
    }

    /// Billing bucket derived from the raw kind string.
    pub fn request_kind(&self) -> RequestKind {
        RequestKind::classify(&self.kind)
    }

    /// UTC calendar day of the request.
    pub fn day(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    /// Cost after applying the billing rule: errored requests are free.
    pub fn billed_cost(&self) -> f64 {
        if self.request_kind().is_billed() {
            self.cost
        } else {
            0.0
        }
    }

    /// Reject events a record producer should never emit.
    pub fn validate(&self) -> Result<()> {
        if !self.cost.is_finite() || self.cost < 0.0 {
            return Err(InsightError::validation(format!(
                "event at {} has invalid cost {}",
                self.timestamp, self.cost
            )));
        }
        if self.model.trim().is_empty() {
            return Err(InsightError::validation(format!(
                "event at {} has no model name",
                self.timestamp
            )));
        }
        Ok(())
    }
}

/// Per-UTC-day rollup of usage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyAggregate {
    /// Calendar day (UTC).
    pub date: NaiveDate,
    /// Sum of raw event costs on this day.
    pub cost: f64,
    /// Number of requests on this day.
    pub requests: u64,
    /// Sum of `total_tokens` on this day.
    pub tokens: u64,
}

impl DailyAggregate {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            cost: 0.0,
            requests: 0,
            tokens: 0,
        }
    }

    pub fn add_event(&mut self, event: &UsageEvent) {
        self.cost += event.cost;
        self.requests += 1;
        self.tokens += event.total_tokens;
    }
}

/// Confidence attached to a heuristic conclusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}
