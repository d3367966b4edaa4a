//! Savings opportunities ranked by projected monthly savings.
//!
//! Candidates come from four sources: the plan recommendation, migrating part
//! of a premium model's traffic to a cheap one, reducing the error rate, and
//! improving the cache hit rate. Only the top [`MAX_OPPORTUNITIES`] survive.

use serde::{Deserialize, Serialize};
use tracing::debug;
use usage_core::error::{InsightError, Result};
use usage_core::formatting::{format_currency, format_percent};
use usage_core::models::{Confidence, RequestKind, UsageEvent};
use usage_core::plans::{monthly_projection, PlanTier};
use usage_core::registry::{ModelCategory, ModelRegistry};

use crate::cache_efficiency::{CacheEfficiency, CacheEfficiencyAnalyzer, IMPROVEMENT_TARGET_RATE};
use crate::cost::{CostAnalysis, CostAnalyzer};
use crate::model_efficiency::{ModelEfficiency, ModelEfficiencyAnalyzer, SPECIALIZED_MAX};
use crate::plan_optimizer::{PlanOptimizer, PlanRecommendation};

/// Maximum opportunities returned.
pub const MAX_OPPORTUNITIES: usize = 5;
/// Plan savings above which the impact is high.
pub const PLAN_HIGH_IMPACT: f64 = 50.0;
/// Share of a premium model's requests assumed to be migratable.
pub const MIGRATION_SHARE: f64 = 0.3;
/// A migration target must cost less than this per million tokens.
pub const CHEAP_MODEL_MAX: f64 = 100.0;
/// Migrations saving less than this per month are dropped.
pub const MIN_MIGRATION_SAVINGS: f64 = 5.0;
/// Error rate (percent) above which error reduction is suggested.
pub const ERROR_RATE_THRESHOLD: f64 = 3.0;
/// Error rate (percent) error reduction aims for.
pub const TARGET_ERROR_RATE: f64 = 2.0;
/// Error rate (percent) above which error reduction has medium impact.
pub const ERROR_RATE_MEDIUM_IMPACT: f64 = 10.0;
/// Hit rate below which cache optimisation has medium impact.
pub const CACHE_MEDIUM_IMPACT_RATE: f64 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Low,
    Medium,
    High,
}

/// Kind-specific facts about an opportunity; serialised inline with a
/// `type` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OpportunityDetails {
    Plan {
        current_tier: PlanTier,
        recommended_tier: PlanTier,
    },
    ModelMigration {
        from_model: String,
        to_model: String,
        migratable_requests: u64,
        from_cost_per_request: f64,
        to_cost_per_request: f64,
    },
    ErrorReduction {
        current_error_rate: f64,
        target_error_rate: f64,
        errored_requests: u64,
    },
    CacheOptimization {
        current_hit_rate: f64,
        target_hit_rate: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityKind {
    Plan,
    ModelMigration,
    ErrorReduction,
    CacheOptimization,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsOpportunity {
    #[serde(flatten)]
    pub details: OpportunityDetails,
    pub title: String,
    pub monthly_savings: f64,
    pub yearly_savings: f64,
    pub difficulty: Difficulty,
    pub impact: Impact,
    pub action: String,
    pub reasoning: String,
    pub confidence: Confidence,
}

impl SavingsOpportunity {
    pub fn kind(&self) -> OpportunityKind {
        match self.details {
            OpportunityDetails::Plan { .. } => OpportunityKind::Plan,
            OpportunityDetails::ModelMigration { .. } => OpportunityKind::ModelMigration,
            OpportunityDetails::ErrorReduction { .. } => OpportunityKind::ErrorReduction,
            OpportunityDetails::CacheOptimization { .. } => OpportunityKind::CacheOptimization,
        }
    }
}

/// Output of the savings analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsReport {
    /// Highest-saving opportunities first.
    pub opportunities: Vec<SavingsOpportunity>,
    /// Candidates found before truncation.
    pub opportunities_found: usize,
    /// Sum over `opportunities`.
    pub total_monthly_savings: f64,
    pub total_yearly_savings: f64,
}

/// Sub-results the savings analyzer draws on.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisParts<'a> {
    pub cost: &'a CostAnalysis,
    pub plan: &'a PlanRecommendation,
    pub models: &'a ModelEfficiency,
    pub cache: &'a CacheEfficiency,
}

// ── SavingsOpportunitiesAnalyzer ──────────────────────────────────────────────

pub struct SavingsOpportunitiesAnalyzer;

impl SavingsOpportunitiesAnalyzer {
    /// Derive cost, plan, model and cache results from `events`, then rank
    /// opportunities.
    pub fn analyze(events: &[UsageEvent], registry: &ModelRegistry) -> Result<SavingsReport> {
        if events.is_empty() {
            return Err(InsightError::validation(
                "savings analysis requires at least one usage event",
            ));
        }
        let cost = CostAnalyzer::analyze(events)?;
        let plan = PlanOptimizer::recommend(events, &cost.summary)?;
        let models = ModelEfficiencyAnalyzer::analyze(events, registry)?;
        let cache = CacheEfficiencyAnalyzer::analyze(events, &cost.summary)?;
        Self::from_parts(
            events,
            AnalysisParts {
                cost: &cost,
                plan: &plan,
                models: &models,
                cache: &cache,
            },
        )
    }

    /// Rank opportunities from precomputed sub-results. Produces the same
    /// report as [`Self::analyze`] given the same events.
    pub fn from_parts(events: &[UsageEvent], parts: AnalysisParts<'_>) -> Result<SavingsReport> {
        if events.is_empty() {
            return Err(InsightError::validation(
                "savings analysis requires at least one usage event",
            ));
        }
        let days = parts.cost.summary.days;
        if days == 0 {
            return Err(InsightError::logic("cost summary covers zero days"));
        }

        let mut found: Vec<SavingsOpportunity> = Vec::new();
        found.extend(Self::plan_opportunity(parts.plan));
        found.extend(Self::migration_opportunities(parts.models, days));
        found.extend(Self::error_opportunity(events, parts.cost));
        found.extend(Self::cache_opportunity(parts.cache, parts.cost));

        let opportunities_found = found.len();
        found.sort_by(|a, b| b.monthly_savings.total_cmp(&a.monthly_savings));
        found.truncate(MAX_OPPORTUNITIES);

        let total_monthly_savings: f64 = found.iter().map(|o| o.monthly_savings).sum();

        debug!(
            "SavingsOpportunitiesAnalyzer: kept {} of {} opportunities, ${:.2}/month",
            found.len(),
            opportunities_found,
            total_monthly_savings
        );

        Ok(SavingsReport {
            opportunities: found,
            opportunities_found,
            total_monthly_savings,
            total_yearly_savings: total_monthly_savings * 12.0,
        })
    }

    // ── Candidates ────────────────────────────────────────────────────────────

    fn plan_opportunity(plan: &PlanRecommendation) -> Option<SavingsOpportunity> {
        if !plan.is_change() || plan.monthly_savings <= 0.0 {
            return None;
        }
        let impact = if plan.monthly_savings > PLAN_HIGH_IMPACT {
            Impact::High
        } else {
            Impact::Medium
        };
        Some(SavingsOpportunity {
            details: OpportunityDetails::Plan {
                current_tier: plan.current_tier,
                recommended_tier: plan.recommended_tier,
            },
            title: format!(
                "Switch from {} to {}",
                plan.current_tier, plan.recommended_tier
            ),
            monthly_savings: plan.monthly_savings,
            yearly_savings: plan.yearly_savings,
            difficulty: Difficulty::Easy,
            impact,
            action: plan
                .actions
                .first()
                .cloned()
                .unwrap_or_else(|| format!("Change your plan to {}.", plan.recommended_tier)),
            reasoning: plan.reasoning.join(" "),
            confidence: plan.confidence,
        })
    }

    fn migration_opportunities(models: &ModelEfficiency, days: u64) -> Vec<SavingsOpportunity> {
        let cheapest = models
            .rankings
            .iter()
            .filter(|m| m.requests > 0 && m.cost_basis() < CHEAP_MODEL_MAX)
            .min_by(|a, b| a.cost_basis().total_cmp(&b.cost_basis()));
        let Some(cheap) = cheapest else {
            return Vec::new();
        };

        models
            .rankings
            .iter()
            .filter(|m| {
                m.model != cheap.model
                    && (m.category == ModelCategory::Premium || m.cost_basis() > SPECIALIZED_MAX)
            })
            .filter_map(|expensive| {
                let migratable = (expensive.requests as f64 * MIGRATION_SHARE).round() as u64;
                let per_request_delta =
                    expensive.average_cost_per_request - cheap.average_cost_per_request;
                let period_savings = per_request_delta * migratable as f64;
                let monthly = monthly_projection(period_savings, days);
                if monthly < MIN_MIGRATION_SAVINGS {
                    return None;
                }
                let impact = if monthly > 30.0 {
                    Impact::High
                } else if monthly > 10.0 {
                    Impact::Medium
                } else {
                    Impact::Low
                };
                Some(SavingsOpportunity {
                    details: OpportunityDetails::ModelMigration {
                        from_model: expensive.model.clone(),
                        to_model: cheap.model.clone(),
                        migratable_requests: migratable,
                        from_cost_per_request: expensive.average_cost_per_request,
                        to_cost_per_request: cheap.average_cost_per_request,
                    },
                    title: format!("Route routine work from {} to {}", expensive.model, cheap.model),
                    monthly_savings: monthly,
                    yearly_savings: monthly * 12.0,
                    difficulty: Difficulty::Medium,
                    impact,
                    action: format!(
                        "Use {} for simple edits and questions; keep {} for complex tasks.",
                        cheap.model, expensive.model
                    ),
                    reasoning: format!(
                        "{} averages {} per request versus {} for {}; moving {} of {} requests saves about {} per month.",
                        expensive.model,
                        format_currency(expensive.average_cost_per_request),
                        format_currency(cheap.average_cost_per_request),
                        cheap.model,
                        migratable,
                        expensive.requests,
                        format_currency(monthly)
                    ),
                    confidence: Confidence::Medium,
                })
            })
            .collect()
    }

    fn error_opportunity(events: &[UsageEvent], cost: &CostAnalysis) -> Option<SavingsOpportunity> {
        let total = events.len() as u64;
        let errored = cost.breakdown_by_type.bucket(RequestKind::Errored).requests;
        let error_rate = errored as f64 / total as f64 * 100.0;
        if error_rate <= ERROR_RATE_THRESHOLD {
            return None;
        }

        // Errored requests are retried; each avoided error saves one billed retry.
        let billed = total - errored;
        let billed_cost = cost.breakdown_by_type.included.cost + cost.breakdown_by_type.on_demand.cost;
        let avg_billed = if billed > 0 {
            billed_cost / billed as f64
        } else {
            0.0
        };
        let avoided = (error_rate - TARGET_ERROR_RATE) / 100.0 * total as f64;
        let monthly = monthly_projection(avoided * avg_billed, cost.summary.days).max(0.0);

        let impact = if error_rate > ERROR_RATE_MEDIUM_IMPACT {
            Impact::Medium
        } else {
            Impact::Low
        };
        Some(SavingsOpportunity {
            details: OpportunityDetails::ErrorReduction {
                current_error_rate: error_rate,
                target_error_rate: TARGET_ERROR_RATE,
                errored_requests: errored,
            },
            title: "Reduce failed requests".to_string(),
            monthly_savings: monthly,
            yearly_savings: monthly * 12.0,
            difficulty: Difficulty::Medium,
            impact,
            action: "Break large prompts into smaller steps and avoid cancelling requests mid-stream.".to_string(),
            reasoning: format!(
                "{} of requests errored or were aborted ({} requests); bringing that to {} avoids about {} retried requests.",
                format_percent(error_rate),
                errored,
                format_percent(TARGET_ERROR_RATE),
                avoided.round()
            ),
            confidence: Confidence::Medium,
        })
    }

    fn cache_opportunity(cache: &CacheEfficiency, cost: &CostAnalysis) -> Option<SavingsOpportunity> {
        let rate = cache.cache_hit_rate;
        if rate >= IMPROVEMENT_TARGET_RATE {
            return None;
        }

        // Without the analyzer's projection, fall back to half the cost-weighted gap.
        let (monthly, confidence) = match cache.feedback.projected_monthly_savings {
            Some(projected) if projected > 0.0 => (projected, Confidence::Medium),
            _ => {
                let monthly_cost = monthly_projection(cost.summary.total_cost, cost.summary.days);
                let estimate = monthly_cost * (IMPROVEMENT_TARGET_RATE - rate) / 100.0 * 0.5;
                (estimate.max(0.0), Confidence::Low)
            }
        };

        let impact = if rate < CACHE_MEDIUM_IMPACT_RATE {
            Impact::Medium
        } else {
            Impact::Low
        };
        Some(SavingsOpportunity {
            details: OpportunityDetails::CacheOptimization {
                current_hit_rate: rate,
                target_hit_rate: IMPROVEMENT_TARGET_RATE,
            },
            title: "Improve prompt cache reuse".to_string(),
            monthly_savings: monthly,
            yearly_savings: monthly * 12.0,
            difficulty: Difficulty::Medium,
            impact,
            action: "Keep related work in one session and put stable context first in prompts.".to_string(),
            reasoning: format!(
                "Cache hit rate is {} ({}), below the {} mark.",
                format_percent(rate),
                cache.benchmark.as_str(),
                format_percent(IMPROVEMENT_TARGET_RATE)
            ),
            confidence,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
