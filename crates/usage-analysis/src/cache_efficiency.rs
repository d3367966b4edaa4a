//! Prompt-cache effectiveness: hit rate, benchmark band, savings already
//! realised, and projected savings from improving the hit rate.

use serde::{Deserialize, Serialize};
use tracing::debug;
use usage_core::error::{InsightError, Result};
use usage_core::formatting::{format_currency, format_percent};
use usage_core::models::UsageEvent;
use usage_core::plans::monthly_projection;
use usage_core::stats::{mean, percent};

use crate::cost::CostSummary;

/// Hit rate at which caching is considered healthy.
pub const TARGET_HIT_RATE: f64 = 85.0;
/// Hit rate improvement projections aim for.
pub const IMPROVEMENT_TARGET_RATE: f64 = 75.0;
/// Share of the gap to [`IMPROVEMENT_TARGET_RATE`] a Poor cache is expected to close.
pub const POOR_GAP_CLOSURE: f64 = 0.25;
/// Share of the gap to [`IMPROVEMENT_TARGET_RATE`] an Average cache is expected to close.
pub const AVERAGE_GAP_CLOSURE: f64 = 0.15;

/// Benchmark band for a cache hit rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheBenchmark {
    Poor,
    Average,
    Good,
    Excellent,
    Outstanding,
}

impl CacheBenchmark {
    /// < 60 Poor, < 75 Average, < 85 Good, < 92 Excellent, else Outstanding.
    pub fn from_hit_rate(rate: f64) -> Self {
        if rate < 60.0 {
            CacheBenchmark::Poor
        } else if rate < 75.0 {
            CacheBenchmark::Average
        } else if rate < 85.0 {
            CacheBenchmark::Good
        } else if rate < 92.0 {
            CacheBenchmark::Excellent
        } else {
            CacheBenchmark::Outstanding
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CacheBenchmark::Poor => "Poor",
            CacheBenchmark::Average => "Average",
            CacheBenchmark::Good => "Good",
            CacheBenchmark::Excellent => "Excellent",
            CacheBenchmark::Outstanding => "Outstanding",
        }
    }

    /// Fraction of the gap to 75 % a user in this band can realistically close.
    fn gap_closure(&self) -> Option<f64> {
        match self {
            CacheBenchmark::Poor => Some(POOR_GAP_CLOSURE),
            CacheBenchmark::Average => Some(AVERAGE_GAP_CLOSURE),
            _ => None,
        }
    }
}

/// Advice and projections attached to a cache analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheFeedback {
    pub tips: Vec<String>,
    /// Hit rate after closing part of the gap; only for Poor/Average.
    pub projected_hit_rate: Option<f64>,
    /// Monthly saving from reaching `projected_hit_rate`.
    pub projected_monthly_savings: Option<f64>,
}

/// Output of [`CacheEfficiencyAnalyzer::analyze`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEfficiency {
    pub total_cache_read_tokens: u64,
    pub total_input_tokens: u64,
    pub total_tokens: u64,
    /// `cache / (cache + input) × 100`.
    pub cache_hit_rate: f64,
    /// `cache / total × 100`.
    pub overall_efficiency: f64,
    pub benchmark: CacheBenchmark,
    pub target_hit_rate: f64,
    /// `cache_hit_rate ≥ 85`.
    pub threshold_met: bool,
    /// Average implied cost of one fresh input token.
    pub cost_per_input_token: f64,
    /// What the cached tokens would have cost as fresh input.
    pub estimated_savings: f64,
    pub feedback: CacheFeedback,
}

pub struct CacheEfficiencyAnalyzer;

impl CacheEfficiencyAnalyzer {
    pub fn analyze(events: &[UsageEvent], summary: &CostSummary) -> Result<CacheEfficiency> {
        if events.is_empty() {
            return Err(InsightError::validation(
                "cache efficiency analysis requires at least one usage event",
            ));
        }
        if summary.days == 0 {
            return Err(InsightError::logic("cost summary covers zero days"));
        }

        let total_cache: u64 = events.iter().map(|e| e.cache_read_tokens).sum();
        let total_input: u64 = events.iter().map(|e| e.input_tokens).sum();
        let total_tokens: u64 = events.iter().map(|e| e.total_tokens).sum();

        let cache_hit_rate = percent(total_cache as f64, (total_cache + total_input) as f64);
        let overall_efficiency = percent(total_cache as f64, total_tokens as f64);
        let benchmark = CacheBenchmark::from_hit_rate(cache_hit_rate);

        let cost_per_input_token = Self::cost_per_input_token(events);
        let estimated_savings = cost_per_input_token * total_cache as f64;

        let monthly_cost = monthly_projection(summary.total_cost, summary.days);
        let feedback = Self::feedback(cache_hit_rate, benchmark, monthly_cost);

        debug!(
            "CacheEfficiencyAnalyzer: hit rate {:.1}% ({})",
            cache_hit_rate,
            benchmark.as_str()
        );

        Ok(CacheEfficiency {
            total_cache_read_tokens: total_cache,
            total_input_tokens: total_input,
            total_tokens,
            cache_hit_rate,
            overall_efficiency,
            benchmark,
            target_hit_rate: TARGET_HIT_RATE,
            threshold_met: cache_hit_rate >= TARGET_HIT_RATE,
            cost_per_input_token,
            estimated_savings,
            feedback,
        })
    }

    /// Split each event's cost by its input-token share and average the
    /// implied per-input-token price over events that had input.
    fn cost_per_input_token(events: &[UsageEvent]) -> f64 {
        let per_token: Vec<f64> = events
            .iter()
            .filter(|e| e.input_tokens > 0 && e.total_tokens > 0)
            .map(|e| {
                let input_share = e.input_tokens as f64 / e.total_tokens as f64;
                (e.cost * input_share) / e.input_tokens as f64
            })
            .collect();
        mean(&per_token)
    }

    fn feedback(rate: f64, benchmark: CacheBenchmark, monthly_cost: f64) -> CacheFeedback {
        let mut tips = Vec::new();
        match benchmark {
            CacheBenchmark::Poor => {
                tips.push("Most prompt tokens are sent fresh; keep long-running sessions on one conversation.".to_string());
                tips.push("Avoid restarting chats for follow-up edits to the same files.".to_string());
                tips.push("Keep stable context (rules, docs) at the start of prompts so it can be cached.".to_string());
            }
            CacheBenchmark::Average => {
                tips.push("Caching works but inconsistently; batch related changes in one session.".to_string());
                tips.push("Limit switching between models mid-task, which invalidates the cache.".to_string());
            }
            CacheBenchmark::Good => {
                tips.push("Caching is healthy; longer focused sessions can push it higher.".to_string());
            }
            CacheBenchmark::Excellent => {
                tips.push("Excellent cache reuse; keep the current workflow.".to_string());
            }
            CacheBenchmark::Outstanding => {
                tips.push("Outstanding cache reuse; nearly all context is served from cache.".to_string());
            }
        }

        let (projected_hit_rate, projected_monthly_savings) = match benchmark.gap_closure() {
            Some(closure) => {
                let gained_points = (IMPROVEMENT_TARGET_RATE - rate).max(0.0) * closure;
                let savings = monthly_cost * gained_points / 100.0;
                tips.push(format!(
                    "Raising the hit rate from {} to {} could save about {} per month.",
                    format_percent(rate),
                    format_percent(rate + gained_points),
                    format_currency(savings)
                ));
                (Some(rate + gained_points), Some(savings))
            }
            None => (None, None),
        };

        CacheFeedback {
            tips,
            projected_hit_rate,
            projected_monthly_savings,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::CostAnalyzer;
    use chrono::{TimeZone, Utc};

    fn event(day: u32, cost: f64, input: u64, output: u64, cache: u64) -> UsageEvent {
        UsageEvent::new(
            Utc.with_ymd_and_hms(2025, 3, day, 12, 0, 0).unwrap(),
            "Included",
            "claude-4-sonnet",
            cost,
        )
        .with_tokens(input, output, cache)
    }

    fn analyze(events: &[UsageEvent]) -> CacheEfficiency {
        let cost = CostAnalyzer::analyze(events).unwrap();
        CacheEfficiencyAnalyzer::analyze(events, &cost.summary).unwrap()
    }

    #[test]
    fn test_hit_rate_exactly_75_is_good() {
        let events = vec![event(1, 1.0, 250, 0, 750), event(1, 1.0, 250, 0, 750)];
        let cache = analyze(&events);
        assert!((cache.cache_hit_rate - 75.0).abs() < 1e-9);
        assert_eq!(cache.benchmark, CacheBenchmark::Good);
        assert!(!cache.threshold_met);
        assert!(cache.feedback.projected_monthly_savings.is_none());
    }

    #[test]
    fn test_700_cached_300_input_is_70_percent_average() {
        let events = vec![event(1, 1.0, 300, 0, 700), event(1, 1.0, 300, 0, 700)];
        let cache = analyze(&events);
        assert!((cache.cache_hit_rate - 70.0).abs() < 1e-9);
        assert_eq!(cache.benchmark, CacheBenchmark::Average);
        assert!(!cache.threshold_met);
        assert!(cache.feedback.projected_monthly_savings.is_some());
    }

    #[test]
    fn test_benchmark_bands() {
        assert_eq!(CacheBenchmark::from_hit_rate(0.0), CacheBenchmark::Poor);
        assert_eq!(CacheBenchmark::from_hit_rate(59.9), CacheBenchmark::Poor);
        assert_eq!(CacheBenchmark::from_hit_rate(60.0), CacheBenchmark::Average);
        assert_eq!(CacheBenchmark::from_hit_rate(84.9), CacheBenchmark::Good);
        assert_eq!(CacheBenchmark::from_hit_rate(85.0), CacheBenchmark::Excellent);
        assert_eq!(CacheBenchmark::from_hit_rate(92.0), CacheBenchmark::Outstanding);
    }

    #[test]
    fn test_threshold_met_at_85() {
        let events = vec![event(1, 1.0, 150, 0, 850)];
        let cache = analyze(&events);
        assert!(cache.threshold_met);
        assert_eq!(cache.benchmark, CacheBenchmark::Excellent);
    }

    #[test]
    fn test_overall_efficiency_uses_total_tokens() {
        let events = vec![event(1, 1.0, 300, 500, 200)];
        let cache = analyze(&events);
        assert!((cache.overall_efficiency - 20.0).abs() < 1e-9);
        assert!((cache.cache_hit_rate - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_tokens_yield_zero_rates() {
        let events = vec![event(1, 1.0, 0, 0, 0)];
        let cache = analyze(&events);
        assert_eq!(cache.cache_hit_rate, 0.0);
        assert_eq!(cache.overall_efficiency, 0.0);
        assert_eq!(cache.estimated_savings, 0.0);
        assert_eq!(cache.benchmark, CacheBenchmark::Poor);
    }

    #[test]
    fn test_estimated_savings_from_input_share() {
        // Event 1: $1 over 1000 tokens, 500 input → $0.5 / 500 = $0.001 per input token.
        // Event 2: $3 over 1000 tokens, 1000 input → $3 / 1000 = $0.003.
        // Mean $0.002 × 500 cached tokens = $1.
        let events = vec![event(1, 1.0, 500, 0, 500), event(1, 3.0, 1_000, 0, 0)];
        let cache = analyze(&events);
        assert!((cache.cost_per_input_token - 0.002).abs() < 1e-12);
        assert!((cache.estimated_savings - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_poor_band_projects_quarter_of_gap() {
        // Hit rate 40% on one day costing $1 → $30/month.
        let events = vec![event(1, 1.0, 600, 0, 400)];
        let cache = analyze(&events);
        assert_eq!(cache.benchmark, CacheBenchmark::Poor);
        // Gap 35 points × 0.25 = 8.75 points; 8.75% of $30 = $2.625.
        let projected = cache.feedback.projected_hit_rate.unwrap();
        assert!((projected - 48.75).abs() < 1e-9);
        let savings = cache.feedback.projected_monthly_savings.unwrap();
        assert!((savings - 2.625).abs() < 1e-9);
    }

    #[test]
    fn test_average_band_projects_fifteen_percent_of_gap() {
        // Hit rate 65% on one day costing $2 → $60/month.
        let events = vec![event(1, 2.0, 350, 0, 650)];
        let cache = analyze(&events);
        assert_eq!(cache.benchmark, CacheBenchmark::Average);
        // Gap 10 points × 0.15 = 1.5 points; 1.5% of $60 = $0.90.
        let savings = cache.feedback.projected_monthly_savings.unwrap();
        assert!((savings - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_empty_input_rejected() {
        let events = vec![event(1, 1.0, 1, 0, 1)];
        let summary = CostAnalyzer::analyze(&events).unwrap().summary;
        assert!(CacheEfficiencyAnalyzer::analyze(&[], &summary).is_err());
    }
}
