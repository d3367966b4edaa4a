//! Per-model cost efficiency: aggregation, scoring, categorisation and ranking.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;
use usage_core::error::{InsightError, Result};
use usage_core::models::UsageEvent;
use usage_core::registry::{ModelCategory, ModelRegistry};

/// Upper bound (exclusive, $/M tokens) of the cost-efficient category.
pub const COST_EFFICIENT_MAX: f64 = 50.0;
/// Upper bound (exclusive, $/M tokens) of the specialized category.
pub const SPECIALIZED_MAX: f64 = 500.0;
/// Score multiplier applied to reasoning models.
pub const REASONING_SCORE_BOOST: f64 = 1.2;

const PER_MILLION: f64 = 1_000_000.0;

// ── ModelAggregate ────────────────────────────────────────────────────────────

/// Totals for one model across the analysed events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelAggregate {
    pub model: String,
    pub total_cost: f64,
    pub requests: u64,
    pub total_tokens: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_read_tokens: u64,
}

impl ModelAggregate {
    fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            ..Self::default()
        }
    }

    fn add_event(&mut self, event: &UsageEvent) {
        self.total_cost += event.cost;
        self.requests += 1;
        self.total_tokens += event.total_tokens;
        self.input_tokens += event.input_tokens;
        self.output_tokens += event.output_tokens;
        self.cache_read_tokens += event.cache_read_tokens;
    }
}

/// Group `events` by model name, preserving first-seen order.
pub fn aggregate_by_model(events: &[UsageEvent]) -> Vec<ModelAggregate> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut aggregates: Vec<ModelAggregate> = Vec::new();
    for event in events {
        let slot = *index.entry(event.model.as_str()).or_insert_with(|| {
            aggregates.push(ModelAggregate::new(&event.model));
            aggregates.len() - 1
        });
        aggregates[slot].add_event(event);
    }
    aggregates
}

// ── Derived metrics ───────────────────────────────────────────────────────────

/// Cost per million tokens of any kind; `0.0` when no tokens were recorded.
pub fn cost_per_million_tokens(agg: &ModelAggregate) -> f64 {
    if agg.total_tokens == 0 {
        return 0.0;
    }
    agg.total_cost / agg.total_tokens as f64 * PER_MILLION
}

/// Cost per million output tokens; `0.0` when no output was recorded.
pub fn cost_per_million_output_tokens(agg: &ModelAggregate) -> f64 {
    if agg.output_tokens == 0 {
        return 0.0;
    }
    agg.total_cost / agg.output_tokens as f64 * PER_MILLION
}

/// Share of prompt tokens (cache + fresh input) served from cache, in percent.
pub fn cache_ratio(agg: &ModelAggregate) -> f64 {
    let denom = agg.cache_read_tokens + agg.input_tokens;
    if denom == 0 {
        return 0.0;
    }
    agg.cache_read_tokens as f64 / denom as f64 * 100.0
}

pub fn average_cost_per_request(agg: &ModelAggregate) -> f64 {
    if agg.requests == 0 {
        return 0.0;
    }
    agg.total_cost / agg.requests as f64
}

/// The $/M figure a model is judged by: output-token cost for reasoning
/// models, total-token cost otherwise.
pub fn cost_basis(agg: &ModelAggregate, reasoning: bool) -> f64 {
    if reasoning {
        cost_per_million_output_tokens(agg)
    } else {
        cost_per_million_tokens(agg)
    }
}

/// `clamp(100 − basis/10, 0, 100)`, with the pre-clamp value boosted by
/// [`REASONING_SCORE_BOOST`] for reasoning models.
///
/// ```
/// use usage_analysis::model_efficiency::efficiency_score;
///
/// assert!((efficiency_score(0.10, false) - 99.99).abs() < 1e-9);
/// assert_eq!(efficiency_score(2_000.0, false), 0.0);
/// assert_eq!(efficiency_score(100.0, true), 100.0);
/// ```
pub fn efficiency_score(basis: f64, reasoning: bool) -> f64 {
    let mut score = 100.0 - basis / 10.0;
    if reasoning {
        score *= REASONING_SCORE_BOOST;
    }
    score.clamp(0.0, 100.0)
}

pub fn categorize(basis: f64) -> ModelCategory {
    if basis < COST_EFFICIENT_MAX {
        ModelCategory::CostEfficient
    } else if basis < SPECIALIZED_MAX {
        ModelCategory::Specialized
    } else {
        ModelCategory::Premium
    }
}

// ── Output types ──────────────────────────────────────────────────────────────

/// Scored view of one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEfficiencyEntry {
    pub rank: usize,
    pub model: String,
    pub requests: u64,
    pub total_cost: f64,
    pub total_tokens: u64,
    pub output_tokens: u64,
    pub average_cost_per_request: f64,
    pub cost_per_million_tokens: f64,
    pub cost_per_million_output_tokens: f64,
    pub cache_ratio: f64,
    pub is_reasoning: bool,
    pub efficiency_score: f64,
    pub category: ModelCategory,
    pub recommendation: String,
}

impl ModelEfficiencyEntry {
    /// The $/M figure this entry was scored and categorised by.
    pub fn cost_basis(&self) -> f64 {
        if self.is_reasoning {
            self.cost_per_million_output_tokens
        } else {
            self.cost_per_million_tokens
        }
    }
}

/// Output of [`ModelEfficiencyAnalyzer::analyze`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEfficiency {
    /// Models ordered by score, best first.
    pub rankings: Vec<ModelEfficiencyEntry>,
    pub models_analyzed: usize,
    pub most_efficient: Option<String>,
    pub least_efficient: Option<String>,
}

// ── ModelEfficiencyAnalyzer ───────────────────────────────────────────────────

pub struct ModelEfficiencyAnalyzer;

impl ModelEfficiencyAnalyzer {
    /// Score and rank every model seen in `events`.
    pub fn analyze(events: &[UsageEvent], registry: &ModelRegistry) -> Result<ModelEfficiency> {
        if events.is_empty() {
            return Err(InsightError::validation(
                "model efficiency analysis requires at least one usage event",
            ));
        }

        let mut rankings: Vec<ModelEfficiencyEntry> = aggregate_by_model(events)
            .iter()
            .map(|agg| Self::score(agg, registry))
            .collect();

        // Stable: equal scores keep encounter order.
        rankings.sort_by(|a, b| b.efficiency_score.total_cmp(&a.efficiency_score));
        for (i, entry) in rankings.iter_mut().enumerate() {
            entry.rank = i + 1;
        }

        debug!("ModelEfficiencyAnalyzer: ranked {} models", rankings.len());

        Ok(ModelEfficiency {
            models_analyzed: rankings.len(),
            most_efficient: rankings.first().map(|e| e.model.clone()),
            least_efficient: rankings.last().map(|e| e.model.clone()),
            rankings,
        })
    }

    fn score(agg: &ModelAggregate, registry: &ModelRegistry) -> ModelEfficiencyEntry {
        let reasoning = registry.is_reasoning(&agg.model);
        let basis = cost_basis(agg, reasoning);
        let category = categorize(basis);
        ModelEfficiencyEntry {
            rank: 0,
            model: agg.model.clone(),
            requests: agg.requests,
            total_cost: agg.total_cost,
            total_tokens: agg.total_tokens,
            output_tokens: agg.output_tokens,
            average_cost_per_request: average_cost_per_request(agg),
            cost_per_million_tokens: cost_per_million_tokens(agg),
            cost_per_million_output_tokens: cost_per_million_output_tokens(agg),
            cache_ratio: cache_ratio(agg),
            is_reasoning: reasoning,
            efficiency_score: efficiency_score(basis, reasoning),
            category,
            recommendation: registry.recommendation(&agg.model, category),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
