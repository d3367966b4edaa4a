//! Main analysis pipeline.
//!
//! Runs the cost analyzer once, feeds its summary to the plan, model, cache
//! and pattern analyzers, ranks savings over those results, and returns an
//! [`AnalysisResult`] ready for export or rendering.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use usage_core::error::{InsightError, Result};
use usage_core::models::UsageEvent;
use usage_core::plans::PlanTier;
use usage_core::registry::ModelRegistry;

use crate::cache_efficiency::{CacheEfficiency, CacheEfficiencyAnalyzer};
use crate::cost::{CostAnalysis, CostAnalyzer};
use crate::model_efficiency::{ModelEfficiency, ModelEfficiencyAnalyzer};
use crate::plan_optimizer::{PlanOptimizer, PlanRecommendation};
use crate::savings::{AnalysisParts, SavingsOpportunitiesAnalyzer, SavingsReport};
use crate::usage_patterns::{UsagePatternAnalyzer, UsagePatterns, WorkStyle};

// ── Public types ──────────────────────────────────────────────────────────────

/// Metadata produced alongside the analysis result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    /// RFC 3339 timestamp when this result was generated.
    pub generated_at: String,
    /// Number of events analysed.
    pub record_count: usize,
    /// Distinct models seen.
    pub models_seen: usize,
    /// Version of the analysis engine.
    pub engine_version: String,
}

/// Headline figures drawn from the individual analyses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_cost: f64,
    pub total_requests: u64,
    pub total_tokens: u64,
    pub days: u64,
    pub daily_average: f64,
    pub projected_monthly_cost: f64,
    pub current_tier: PlanTier,
    pub recommended_tier: PlanTier,
    pub most_efficient_model: Option<String>,
    pub cache_hit_rate: f64,
    pub primary_work_style: WorkStyle,
    pub potential_monthly_savings: f64,
    pub potential_yearly_savings: f64,
}

/// The complete output of [`analyze`].
///
/// Field order is the JSON key order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub metadata: AnalysisMetadata,
    pub summary: ReportSummary,
    pub cost_analysis: CostAnalysis,
    pub model_efficiency: ModelEfficiency,
    pub plan_recommendation: PlanRecommendation,
    pub cache_efficiency: CacheEfficiency,
    pub opportunities: SavingsReport,
    pub patterns: UsagePatterns,
}

// ── Public functions ──────────────────────────────────────────────────────────

/// Run the full pipeline with the built-in model registry.
pub fn analyze(events: &[UsageEvent]) -> Result<AnalysisResult> {
    analyze_with_registry(events, ModelRegistry::builtin())
}

/// Run the full pipeline.
///
/// 1. Cost analysis, producing the shared summary.
/// 2. Plan, model, cache and pattern analyses over that summary.
/// 3. Savings ranking over the step 1 and 2 results.
/// 4. Assemble the headline summary and metadata.
///
/// Fails with [`InsightError::Validation`] on empty input; any analyzer
/// failure is returned unchanged.
pub fn analyze_with_registry(
    events: &[UsageEvent],
    registry: &ModelRegistry,
) -> Result<AnalysisResult> {
    if events.is_empty() {
        return Err(InsightError::validation("no usage events to analyze"));
    }
    info!("Analyzing {} usage events", events.len());

    // ── Step 1: Cost ──────────────────────────────────────────────────────────
    let cost_analysis = CostAnalyzer::analyze(events)?;
    let summary = &cost_analysis.summary;

    // ── Step 2: Summary-dependent analyses ────────────────────────────────────
    let plan_recommendation = PlanOptimizer::recommend(events, summary)?;
    let model_efficiency = ModelEfficiencyAnalyzer::analyze(events, registry)?;
    let cache_efficiency = CacheEfficiencyAnalyzer::analyze(events, summary)?;
    let patterns = UsagePatternAnalyzer::analyze(events, summary)?;

    // ── Step 3: Savings ───────────────────────────────────────────────────────
    let opportunities = SavingsOpportunitiesAnalyzer::from_parts(
        events,
        AnalysisParts {
            cost: &cost_analysis,
            plan: &plan_recommendation,
            models: &model_efficiency,
            cache: &cache_efficiency,
        },
    )?;

    // ── Step 4: Assemble ──────────────────────────────────────────────────────
    let report_summary = ReportSummary {
        total_cost: summary.total_cost,
        total_requests: summary.total_requests,
        total_tokens: summary.total_tokens,
        days: summary.days,
        daily_average: summary.daily_average,
        projected_monthly_cost: plan_recommendation.current_monthly_cost,
        current_tier: plan_recommendation.current_tier,
        recommended_tier: plan_recommendation.recommended_tier,
        most_efficient_model: model_efficiency.most_efficient.clone(),
        cache_hit_rate: cache_efficiency.cache_hit_rate,
        primary_work_style: patterns.work_style.primary_style,
        potential_monthly_savings: opportunities.total_monthly_savings,
        potential_yearly_savings: opportunities.total_yearly_savings,
    };

    let metadata = AnalysisMetadata {
        generated_at: Utc::now().to_rfc3339(),
        record_count: events.len(),
        models_seen: model_efficiency.models_analyzed,
        engine_version: env!("CARGO_PKG_VERSION").to_string(),
    };

    info!(
        "Analysis complete: ${:.2} over {} days, {} opportunities",
        report_summary.total_cost,
        report_summary.days,
        opportunities.opportunities.len()
    );

    Ok(AnalysisResult {
        metadata,
        summary: report_summary,
        cost_analysis,
        model_efficiency,
        plan_recommendation,
        cache_efficiency,
        opportunities,
        patterns,
    })
}

/// Serialise `result` to JSON, indented when `pretty` is set.
pub fn export_json(result: &AnalysisResult, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };
    Ok(json)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache_efficiency::CacheBenchmark;
    use crate::savings::OpportunityKind;
    use chrono::{DateTime, Duration, TimeZone};
    use usage_core::models::RequestKind;
    use usage_core::registry::ModelCategory;

    fn ts(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0).unwrap()
    }

    fn mixed_events() -> Vec<UsageEvent> {
        let mut events = Vec::new();
        for i in 0..40 {
            let model = if i % 4 == 0 { "claude-4-opus" } else { "claude-4-sonnet" };
            let kind = match i % 10 {
                0 => "Errored, Not Charged",
                1..=5 => "Included",
                _ => "On-Demand",
            };
            let cost = if model == "claude-4-opus" { 1.5 } else { 0.2 };
            events.push(
                UsageEvent::new(ts(3 + (i % 5) as u32, 9 + (i % 12) as u32), kind, model, cost)
                    .with_tokens(5_000, 1_000, 4_000),
            );
        }
        events
    }

    // ── Pipeline ──────────────────────────────────────────────────────────────

    #[test]
    fn test_empty_input_rejected() {
        let err = analyze(&[]).unwrap_err();
        assert!(matches!(err, InsightError::Validation(_)));
    }

    #[test]
    fn test_idempotent_except_timestamp() {
        let events = mixed_events();
        let mut first = analyze(&events).unwrap();
        let mut second = analyze(&events).unwrap();
        first.metadata.generated_at.clear();
        second.metadata.generated_at.clear();
        assert_eq!(first, second);
    }

    #[test]
    fn test_metadata_populated() {
        let events = mixed_events();
        let result = analyze(&events).unwrap();
        assert_eq!(result.metadata.record_count, 40);
        assert_eq!(result.metadata.models_seen, 2);
        assert!(!result.metadata.generated_at.is_empty());
        assert_eq!(result.metadata.engine_version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_summary_mirrors_sub_results() {
        let result = analyze(&mixed_events()).unwrap();
        let s = &result.summary;
        assert!((s.total_cost - result.cost_analysis.summary.total_cost).abs() < 1e-9);
        assert_eq!(s.current_tier, result.plan_recommendation.current_tier);
        assert_eq!(s.primary_work_style, result.patterns.work_style.primary_style);
        assert!((s.potential_monthly_savings - result.opportunities.total_monthly_savings).abs() < 1e-9);
    }

    #[test]
    fn test_injected_registry_is_used() {
        let events = vec![
            UsageEvent::new(ts(3, 10), "Included", "house-model", 0.5).with_tokens(900, 100, 0),
        ];
        let registry = ModelRegistry::new(vec![usage_core::registry::ModelProfile::new(
            "house-model",
            true,
            "Keep for hard problems.",
        )]);
        let result = analyze_with_registry(&events, &registry).unwrap();
        let entry = &result.model_efficiency.rankings[0];
        assert!(entry.is_reasoning);
        assert_eq!(entry.recommendation, "Keep for hard problems.");
    }

    // ── Properties ────────────────────────────────────────────────────────────

    #[test]
    fn test_invariants_hold_on_mixed_input() {
        let result = analyze(&mixed_events()).unwrap();

        let model_pct: f64 = result
            .cost_analysis
            .breakdown_by_model
            .iter()
            .map(|m| m.percentage)
            .sum();
        assert!((model_pct - 100.0).abs() < 1e-6);

        for entry in &result.model_efficiency.rankings {
            assert!((0.0..=100.0).contains(&entry.efficiency_score));
        }

        let plan = &result.plan_recommendation;
        assert!(plan.monthly_savings >= 0.0);
        assert!((plan.monthly_savings - (plan.raw_monthly_savings * 0.9).max(0.0)).abs() < 1e-9);

        let opps = &result.opportunities;
        assert!(opps.opportunities.len() <= 5);
        for pair in opps.opportunities.windows(2) {
            assert!(pair[0].monthly_savings >= pair[1].monthly_savings);
        }
        let sum: f64 = opps.opportunities.iter().map(|o| o.monthly_savings).sum();
        assert!((opps.total_monthly_savings - sum).abs() < 1e-9);
    }

    // ── Scenarios ─────────────────────────────────────────────────────────────

    #[test]
    fn test_scenario_costs_over_two_days() {
        let events = vec![
            UsageEvent::new(ts(1, 9), "Included", "claude-4-sonnet", 10.0),
            UsageEvent::new(ts(1, 15), "Included", "claude-4-sonnet", 20.0),
            UsageEvent::new(ts(2, 11), "Included", "claude-4-sonnet", 15.0),
        ];
        let result = analyze(&events).unwrap();
        assert!((result.summary.total_cost - 45.0).abs() < 1e-9);
        assert!((result.summary.daily_average - 22.5).abs() < 1e-9);
        assert_eq!(result.summary.days, 2);
    }

    #[test]
    fn test_scenario_cheap_model_per_million() {
        let events = vec![UsageEvent::new(ts(1, 9), "Included", "gemini-2.5-flash", 0.10)
            .with_tokens(600_000, 100_000, 300_000)];
        let result = analyze(&events).unwrap();
        let entry = &result.model_efficiency.rankings[0];
        assert!((entry.cost_per_million_tokens - 0.10).abs() < 1e-9);
        assert!((entry.efficiency_score - 99.99).abs() < 1e-9);
        assert_eq!(entry.category, ModelCategory::CostEfficient);
    }

    #[test]
    fn test_scenario_errored_cost_not_billed() {
        let events = vec![
            UsageEvent::new(ts(1, 9), "Included", "claude-4-sonnet", 1.0),
            UsageEvent::new(ts(1, 10), "Errored, Not Charged", "claude-4-sonnet", 3.0),
            UsageEvent::new(ts(1, 11), "Aborted", "claude-4-sonnet", 2.0),
        ];
        let result = analyze(&events).unwrap();
        let errored = result
            .cost_analysis
            .breakdown_by_type
            .bucket(RequestKind::Errored);
        assert_eq!(errored.requests, 2);
        assert_eq!(errored.cost, 0.0);
    }

    #[test]
    fn test_scenario_cache_hit_rate_75() {
        let events: Vec<UsageEvent> = (0..2)
            .map(|i| {
                UsageEvent::new(ts(1, 9 + i), "Included", "claude-4-sonnet", 1.0)
                    .with_tokens(250, 0, 750)
            })
            .collect();
        let result = analyze(&events).unwrap();
        assert!((result.cache_efficiency.cache_hit_rate - 75.0).abs() < 1e-9);
        assert_eq!(result.cache_efficiency.benchmark, CacheBenchmark::Good);
    }

    #[test]
    fn test_scenario_ten_percent_errors() {
        let start = ts(1, 9);
        let mut events: Vec<UsageEvent> = (0..90)
            .map(|i| {
                UsageEvent::new(start + Duration::minutes(i), "Included", "claude-4-sonnet", 0.05)
                    .with_tokens(2_000, 500, 6_000)
            })
            .collect();
        events.extend((90..100).map(|i| {
            UsageEvent::new(start + Duration::minutes(i), "Errored", "claude-4-sonnet", 0.0)
        }));
        let result = analyze(&events).unwrap();
        let error = result
            .opportunities
            .opportunities
            .iter()
            .find(|o| o.kind() == OpportunityKind::ErrorReduction)
            .expect("error reduction opportunity");
        let json = serde_json::to_value(error).unwrap();
        assert!((json["current_error_rate"].as_f64().unwrap() - 10.0).abs() < 1e-9);
    }

    // ── export_json ───────────────────────────────────────────────────────────

    #[test]
    fn test_export_json_top_level_keys() {
        let result = analyze(&mixed_events()).unwrap();
        let json = export_json(&result, false).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let keys: Vec<&str> = value
            .as_object()
            .unwrap()
            .keys()
            .map(|k| k.as_str())
            .collect();
        let mut expected = vec![
            "metadata",
            "summary",
            "cost_analysis",
            "model_efficiency",
            "plan_recommendation",
            "cache_efficiency",
            "opportunities",
            "patterns",
        ];
        let mut sorted = keys.clone();
        sorted.sort_unstable();
        expected.sort_unstable();
        assert_eq!(sorted, expected);
    }

    #[test]
    fn test_export_json_pretty_is_indented() {
        let events = vec![UsageEvent::new(ts(1, 9), "Included", "claude-4-sonnet", 1.0)];
        let result = analyze(&events).unwrap();
        let pretty = export_json(&result, true).unwrap();
        let compact = export_json(&result, false).unwrap();
        assert!(pretty.contains("\n  \"metadata\""));
        assert!(!compact.contains('\n'));
        let a: serde_json::Value = serde_json::from_str(&pretty).unwrap();
        let b: serde_json::Value = serde_json::from_str(&compact).unwrap();
        assert_eq!(a, b);
    }
}
