//! Plain-text rendering of an [`AnalysisResult`].

use std::fmt::Write;

use usage_analysis::engine::AnalysisResult;
use usage_core::formatting::{format_currency, format_number, format_percent, format_tokens};

/// Models listed in the text report.
const TOP_MODELS: usize = 3;

/// Render the headline report: totals, top models, plan, cache, savings and
/// work style.
pub fn render_text(result: &AnalysisResult) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = write_report(&mut out, result);
    out
}

fn write_report(out: &mut String, result: &AnalysisResult) -> std::fmt::Result {
    let summary = &result.summary;
    let cost = &result.cost_analysis.summary;

    writeln!(out, "Usage report")?;
    writeln!(out, "============")?;
    writeln!(
        out,
        "Period: {} to {} ({} active days)",
        cost.date_range.start, cost.date_range.end, summary.days
    )?;
    writeln!(
        out,
        "Total cost: {}  |  Requests: {}  |  Tokens: {}",
        format_currency(summary.total_cost),
        format_number(summary.total_requests as f64, 0),
        format_tokens(summary.total_tokens)
    )?;
    writeln!(
        out,
        "Daily average: {}  |  Projected monthly: {}",
        format_currency(summary.daily_average),
        format_currency(summary.projected_monthly_cost)
    )?;

    // ── Models ────────────────────────────────────────────────────────────────
    writeln!(out)?;
    writeln!(out, "Top models by cost")?;
    for share in result.cost_analysis.breakdown_by_model.iter().take(TOP_MODELS) {
        writeln!(
            out,
            "  {:<28} {:>12}  {:>6}  {} requests",
            share.model,
            format_currency(share.cost),
            format_percent(share.percentage),
            share.requests
        )?;
    }
    if let Some(best) = &summary.most_efficient_model {
        writeln!(out, "  Most efficient: {}", best)?;
    }

    // ── Plan ──────────────────────────────────────────────────────────────────
    let plan = &result.plan_recommendation;
    writeln!(out)?;
    writeln!(out, "Plan")?;
    writeln!(
        out,
        "  Current: {} ({:?} confidence)  |  Recommended: {}",
        plan.current_tier, plan.current_tier_confidence, plan.recommended_tier
    )?;
    if plan.monthly_savings > 0.0 {
        writeln!(
            out,
            "  Savings: {}/month, {}/year",
            format_currency(plan.monthly_savings),
            format_currency(plan.yearly_savings)
        )?;
    }
    for action in &plan.actions {
        writeln!(out, "  - {}", action)?;
    }

    // ── Cache ─────────────────────────────────────────────────────────────────
    let cache = &result.cache_efficiency;
    writeln!(out)?;
    writeln!(out, "Cache")?;
    writeln!(
        out,
        "  Hit rate: {} ({}), target {}",
        format_percent(cache.cache_hit_rate),
        cache.benchmark.as_str(),
        format_percent(cache.target_hit_rate)
    )?;
    writeln!(
        out,
        "  Estimated savings from cache: {}",
        format_currency(cache.estimated_savings)
    )?;

    // ── Opportunities ─────────────────────────────────────────────────────────
    let savings = &result.opportunities;
    writeln!(out)?;
    writeln!(
        out,
        "Savings opportunities ({} found)",
        savings.opportunities_found
    )?;
    if savings.opportunities.is_empty() {
        writeln!(out, "  None; usage already looks cost-efficient.")?;
    }
    for (i, opp) in savings.opportunities.iter().enumerate() {
        writeln!(
            out,
            "  {}. {}: {}/month ({:?} impact, {:?})",
            i + 1,
            opp.title,
            format_currency(opp.monthly_savings),
            opp.impact,
            opp.difficulty
        )?;
        writeln!(out, "     {}", opp.action)?;
    }
    writeln!(
        out,
        "  Total: {}/month, {}/year",
        format_currency(savings.total_monthly_savings),
        format_currency(savings.total_yearly_savings)
    )?;

    // ── Work style ────────────────────────────────────────────────────────────
    let style = &result.patterns.work_style;
    writeln!(out)?;
    writeln!(out, "Work style")?;
    let labels: Vec<&str> = style.styles.iter().map(|s| s.label()).collect();
    writeln!(out, "  {}", labels.join(", "))?;
    writeln!(
        out,
        "  Evening: {}  |  Weekend: {}  |  Consistency: {:?}",
        format_percent(style.evening_percentage),
        format_percent(style.weekend_percentage),
        style.consistency
    )?;
    if !result.patterns.peak_hours.is_empty() {
        let hours: Vec<String> = result
            .patterns
            .peak_hours
            .iter()
            .map(|h| format!("{:02}:00", h))
            .collect();
        writeln!(out, "  Peak hours (UTC): {}", hours.join(", "))?;
    }
    for tip in &result.patterns.recommendations {
        writeln!(out, "  - {}", tip)?;
    }

    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
