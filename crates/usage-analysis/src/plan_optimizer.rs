//! Pricing-plan inference and recommendation.
//!
//! Projects the observed spend to a 30-day month, guesses which tier the user
//! is on today, and walks a fixed decision tree to recommend a tier. Reported
//! savings are discounted by [`SAVINGS_CONSERVATISM`] and never negative.

use serde::{Deserialize, Serialize};
use tracing::debug;
use usage_core::error::{InsightError, Result};
use usage_core::formatting::{format_currency, format_number, format_percent};
use usage_core::models::{Confidence, RequestKind, UsageEvent};
use usage_core::plans::{monthly_projection, PlanTier};

use crate::cost::CostSummary;

/// Monthly spend above which Ultra is the clear fit.
pub const ULTRA_THRESHOLD: f64 = 220.0;
/// Lower bound of the band where Ultra is recommended for headroom.
pub const ULTRA_EXPERIENCE_THRESHOLD: f64 = 180.0;
/// Monthly spend at or above which a paid plan is warranted.
pub const PRO_THRESHOLD: f64 = 15.0;
/// Below this monthly spend a Free inference is made with high confidence.
pub const FREE_HIGH_CONFIDENCE_THRESHOLD: f64 = 5.0;
/// Share of included requests that suggests an active subscription.
pub const INCLUDED_SUBSCRIPTION_FRACTION: f64 = 0.5;
/// Fraction of raw savings reported, to stay conservative.
pub const SAVINGS_CONSERVATISM: f64 = 0.9;

/// Output of [`PlanOptimizer::recommend`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRecommendation {
    /// Tier the usage most likely reflects today.
    pub current_tier: PlanTier,
    pub current_tier_confidence: Confidence,
    pub recommended_tier: PlanTier,
    /// Observed spend projected to 30 days.
    pub current_monthly_cost: f64,
    /// Subscription price of the recommended tier.
    pub recommended_monthly_cost: f64,
    pub projected_monthly_requests: f64,
    /// Share of requests billed as included, 0–1.
    pub included_fraction: f64,
    /// Undiscounted saving; may be negative.
    pub raw_monthly_savings: f64,
    /// `max(0, raw × 0.9)`.
    pub monthly_savings: f64,
    pub yearly_savings: f64,
    /// Projected requests exceed the recommended tier's cap.
    pub over_request_cap: bool,
    pub confidence: Confidence,
    pub reasoning: Vec<String>,
    pub actions: Vec<String>,
}

impl PlanRecommendation {
    /// Whether acting on this recommendation changes the plan.
    pub fn is_change(&self) -> bool {
        self.recommended_tier != self.current_tier
    }
}

/// Reported savings: `max(0, raw × 0.9)`.
pub fn conservative_savings(raw: f64) -> f64 {
    (raw * SAVINGS_CONSERVATISM).max(0.0)
}

/// Inputs to the tier heuristics, derived once per call.
#[derive(Debug, Clone, Copy)]
struct UsageProfile {
    monthly_cost: f64,
    monthly_requests: f64,
    included_fraction: f64,
}

pub struct PlanOptimizer;

impl PlanOptimizer {
    /// Infer the current tier and recommend one.
    ///
    /// Fails with [`InsightError::Validation`] on empty `events` and with
    /// [`InsightError::Logic`] when `summary` covers zero days.
    pub fn recommend(events: &[UsageEvent], summary: &CostSummary) -> Result<PlanRecommendation> {
        if events.is_empty() {
            return Err(InsightError::validation(
                "plan optimization requires at least one usage event",
            ));
        }
        if summary.days == 0 {
            return Err(InsightError::logic("cost summary covers zero days"));
        }

        let included = events
            .iter()
            .filter(|e| e.request_kind() == RequestKind::Included)
            .count();
        let profile = UsageProfile {
            monthly_cost: monthly_projection(summary.total_cost, summary.days),
            monthly_requests: monthly_projection(events.len() as f64, summary.days),
            included_fraction: included as f64 / events.len() as f64,
        };

        let (current_tier, current_tier_confidence) = Self::infer_current_tier(&profile);
        let recommendation = Self::decide(&profile, current_tier, current_tier_confidence);

        debug!(
            "PlanOptimizer: monthly ${:.2}, current {} → recommended {}",
            profile.monthly_cost, current_tier, recommendation.recommended_tier
        );
        Ok(recommendation)
    }

    /// Heuristic guess at the tier the user is paying for today.
    pub fn infer_tier(
        monthly_cost: f64,
        monthly_requests: f64,
        included_fraction: f64,
    ) -> (PlanTier, Confidence) {
        Self::infer_current_tier(&UsageProfile {
            monthly_cost,
            monthly_requests,
            included_fraction,
        })
    }

    fn infer_current_tier(p: &UsageProfile) -> (PlanTier, Confidence) {
        if p.monthly_cost > ULTRA_THRESHOLD {
            (PlanTier::Ultra, Confidence::High)
        } else if p.monthly_cost > PRO_THRESHOLD {
            let mostly_included = p.included_fraction >= INCLUDED_SUBSCRIPTION_FRACTION;
            if mostly_included && p.monthly_requests > PlanTier::Pro.request_cap() as f64 {
                (PlanTier::Ultra, Confidence::Medium)
            } else if mostly_included {
                (PlanTier::Pro, Confidence::High)
            } else {
                (PlanTier::Pro, Confidence::Medium)
            }
        } else if p.monthly_cost < FREE_HIGH_CONFIDENCE_THRESHOLD {
            (PlanTier::Free, Confidence::High)
        } else {
            (PlanTier::Free, Confidence::Medium)
        }
    }

    fn decide(
        p: &UsageProfile,
        current_tier: PlanTier,
        current_tier_confidence: Confidence,
    ) -> PlanRecommendation {
        let monthly = p.monthly_cost;
        let mut reasoning = vec![format!(
            "Projected monthly spend is {} across about {} requests.",
            format_currency(monthly),
            format_number(p.monthly_requests, 0)
        )];
        let mut actions = Vec::new();
        let mut over_request_cap = false;

        let (recommended_tier, raw, confidence) = if monthly > ULTRA_THRESHOLD {
            let tier = PlanTier::Ultra;
            reasoning.push(format!(
                "Spend above {} per month exceeds the {} Ultra price.",
                format_currency(ULTRA_THRESHOLD),
                format_currency(tier.monthly_price())
            ));
            actions.push("Move to the Ultra plan to cap monthly spend.".to_string());
            (tier, monthly - tier.monthly_price(), Confidence::High)
        } else if monthly >= ULTRA_EXPERIENCE_THRESHOLD {
            let tier = PlanTier::Ultra;
            reasoning.push(format!(
                "Spend is close to the {} Ultra price; Ultra adds headroom and higher limits for little extra cost.",
                format_currency(tier.monthly_price())
            ));
            actions.push("Consider Ultra for a smoother experience at a similar price.".to_string());
            (tier, monthly - tier.monthly_price(), Confidence::Medium)
        } else if monthly >= PRO_THRESHOLD {
            let cap = PlanTier::Pro.request_cap();
            if p.monthly_requests > cap as f64 {
                over_request_cap = true;
                reasoning.push(format!(
                    "Projected requests exceed Pro's {} request allowance; the current plan stays the better fit.",
                    format_number(cap as f64, 0)
                ));
                actions.push(
                    "Watch request volume; sustained overage makes a higher tier worthwhile."
                        .to_string(),
                );
                (current_tier, 0.0, Confidence::Medium)
            } else {
                reasoning.push("Spend fits comfortably within the Pro plan.".to_string());
                actions.push("Stay on Pro; no change needed.".to_string());
                (PlanTier::Pro, 0.0, Confidence::High)
            }
        } else {
            let cap = PlanTier::Free.request_cap();
            if p.monthly_requests > cap as f64 {
                reasoning.push(format!(
                    "Spend is low, but projected requests exceed Free's {} request cap.",
                    format_number(cap as f64, 0)
                ));
                actions.push("Keep a Pro subscription to cover request volume.".to_string());
                (PlanTier::Pro, 0.0, Confidence::Medium)
            } else {
                reasoning.push(format!(
                    "Spend under {} per month does not justify a paid plan.",
                    format_currency(PRO_THRESHOLD)
                ));
                actions.push("Downgrade to Free and pay only for what you use.".to_string());
                (PlanTier::Free, monthly, Confidence::High)
            }
        };

        if p.included_fraction > 0.0 {
            reasoning.push(format!(
                "{} of requests were covered by an included quota.",
                format_percent(p.included_fraction * 100.0)
            ));
        }

        let monthly_savings = conservative_savings(raw);
        if monthly_savings > 0.0 {
            reasoning.push(format!(
                "Estimated saving is {} per month after a 10% safety margin.",
                format_currency(monthly_savings)
            ));
        }

        PlanRecommendation {
            current_tier,
            current_tier_confidence,
            recommended_tier,
            current_monthly_cost: monthly,
            recommended_monthly_cost: recommended_tier.monthly_price(),
            projected_monthly_requests: p.monthly_requests,
            included_fraction: p.included_fraction,
            raw_monthly_savings: raw,
            monthly_savings,
            yearly_savings: monthly_savings * 12.0,
            over_request_cap,
            confidence,
            reasoning,
            actions,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
