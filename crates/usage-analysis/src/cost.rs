//! Cost aggregation: totals, per-model and per-kind breakdowns, and the most
//! expensive requests and days.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use usage_core::error::{InsightError, Result};
use usage_core::models::{DailyAggregate, RequestKind, UsageEvent};
use usage_core::stats::percent;

/// How many requests / days the "top" lists keep.
pub const TOP_N: usize = 5;

// ── Public types ──────────────────────────────────────────────────────────────

/// First and last active day, inclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Calendar days from `start` to `end`, inclusive.
    pub span_days: u64,
}

/// Headline totals consumed by every downstream analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostSummary {
    pub total_cost: f64,
    pub total_requests: u64,
    pub total_tokens: u64,
    /// Number of distinct UTC days with at least one request.
    pub days: u64,
    pub date_range: DateRange,
    /// `total_cost / days`.
    pub daily_average: f64,
    pub requests_per_day: f64,
    pub average_cost_per_request: f64,
    pub most_expensive_model: Option<String>,
}

/// One row of the per-model breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelCostShare {
    pub model: String,
    pub cost: f64,
    pub requests: u64,
    pub tokens: u64,
    /// Share of total cost.
    pub percentage: f64,
}

/// Totals for one billing bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KindBucket {
    pub requests: u64,
    /// Billed cost; always zero for the errored bucket.
    pub cost: f64,
    /// Share of all requests.
    pub request_percentage: f64,
    /// Share of billed cost.
    pub cost_percentage: f64,
}

/// Breakdown by billing bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KindBreakdown {
    pub included: KindBucket,
    pub on_demand: KindBucket,
    pub errored: KindBucket,
}

impl KindBreakdown {
    pub fn bucket(&self, kind: RequestKind) -> &KindBucket {
        match kind {
            RequestKind::Included => &self.included,
            RequestKind::OnDemand => &self.on_demand,
            RequestKind::Errored => &self.errored,
        }
    }

    fn bucket_mut(&mut self, kind: RequestKind) -> &mut KindBucket {
        match kind {
            RequestKind::Included => &mut self.included,
            RequestKind::OnDemand => &mut self.on_demand,
            RequestKind::Errored => &mut self.errored,
        }
    }

    fn buckets_mut(&mut self) -> [&mut KindBucket; 3] {
        [&mut self.included, &mut self.on_demand, &mut self.errored]
    }
}

/// A single costly request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpensiveRequest {
    pub timestamp: DateTime<Utc>,
    pub model: String,
    pub kind: String,
    pub cost: f64,
    pub total_tokens: u64,
}

/// Complete output of [`CostAnalyzer::analyze`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostAnalysis {
    pub summary: CostSummary,
    pub breakdown_by_model: Vec<ModelCostShare>,
    pub breakdown_by_type: KindBreakdown,
    pub top_expensive_requests: Vec<ExpensiveRequest>,
    pub top_expensive_days: Vec<DailyAggregate>,
    /// Chronological per-day series.
    pub daily: Vec<DailyAggregate>,
}

// ── CostAnalyzer ──────────────────────────────────────────────────────────────

/// Stateless aggregator over a slice of usage events.
pub struct CostAnalyzer;

impl CostAnalyzer {
    /// Aggregate `events` into a [`CostAnalysis`].
    ///
    /// Fails with [`InsightError::Validation`] when `events` is empty.
    pub fn analyze(events: &[UsageEvent]) -> Result<CostAnalysis> {
        if events.is_empty() {
            return Err(InsightError::validation(
                "cost analysis requires at least one usage event",
            ));
        }

        let total_cost: f64 = events.iter().map(|e| e.cost).sum();
        let total_requests = events.len() as u64;
        let total_tokens: u64 = events.iter().map(|e| e.total_tokens).sum();

        let days_first_seen = Self::aggregate_days(events);
        let days = days_first_seen.len() as u64;

        let mut chronological = days_first_seen.clone();
        chronological.sort_by_key(|d| d.date);
        let date_range = Self::date_range(&chronological)?;

        let breakdown_by_model = Self::breakdown_by_model(events, total_cost);
        let most_expensive_model = breakdown_by_model.first().map(|m| m.model.clone());

        let summary = CostSummary {
            total_cost,
            total_requests,
            total_tokens,
            days,
            date_range,
            daily_average: total_cost / days as f64,
            requests_per_day: total_requests as f64 / days as f64,
            average_cost_per_request: total_cost / total_requests as f64,
            most_expensive_model,
        };

        debug!(
            "CostAnalyzer: {} events over {} days, total ${:.2}",
            total_requests, days, total_cost
        );

        Ok(CostAnalysis {
            summary,
            breakdown_by_model,
            breakdown_by_type: Self::breakdown_by_kind(events),
            top_expensive_requests: Self::top_requests(events),
            top_expensive_days: Self::top_days(days_first_seen),
            daily: chronological,
        })
    }

    // ── Private ───────────────────────────────────────────────────────────────

    /// Per-day rollups in first-seen order.
    fn aggregate_days(events: &[UsageEvent]) -> Vec<DailyAggregate> {
        let mut index: HashMap<NaiveDate, usize> = HashMap::new();
        let mut days: Vec<DailyAggregate> = Vec::new();
        for event in events {
            let date = event.day();
            let slot = *index.entry(date).or_insert_with(|| {
                days.push(DailyAggregate::new(date));
                days.len() - 1
            });
            days[slot].add_event(event);
        }
        days
    }

    fn date_range(chronological: &[DailyAggregate]) -> Result<DateRange> {
        let (first, last) = match (chronological.first(), chronological.last()) {
            (Some(f), Some(l)) => (f.date, l.date),
            _ => return Err(InsightError::logic("no days aggregated from non-empty input")),
        };
        Ok(DateRange {
            start: first,
            end: last,
            span_days: (last - first).num_days() as u64 + 1,
        })
    }

    /// Models sorted by cost descending; ties keep first-seen order.
    fn breakdown_by_model(events: &[UsageEvent], total_cost: f64) -> Vec<ModelCostShare> {
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut rows: Vec<ModelCostShare> = Vec::new();
        for event in events {
            let slot = *index.entry(event.model.as_str()).or_insert_with(|| {
                rows.push(ModelCostShare {
                    model: event.model.clone(),
                    cost: 0.0,
                    requests: 0,
                    tokens: 0,
                    percentage: 0.0,
                });
                rows.len() - 1
            });
            let row = &mut rows[slot];
            row.cost += event.cost;
            row.requests += 1;
            row.tokens += event.total_tokens;
        }

        for row in rows.iter_mut() {
            row.percentage = if total_cost > 0.0 {
                percent(row.cost, total_cost)
            } else {
                0.0
            };
        }
        rows.sort_by(|a, b| b.cost.total_cmp(&a.cost));
        rows
    }

    fn breakdown_by_kind(events: &[UsageEvent]) -> KindBreakdown {
        let mut breakdown = KindBreakdown::default();
        for event in events {
            let kind = event.request_kind();
            let bucket = breakdown.bucket_mut(kind);
            bucket.requests += 1;
            bucket.cost += event.billed_cost();
        }

        let total_requests = events.len() as f64;
        let billed_total = breakdown.included.cost + breakdown.on_demand.cost;
        for bucket in breakdown.buckets_mut() {
            bucket.request_percentage = percent(bucket.requests as f64, total_requests);
            bucket.cost_percentage = if billed_total > 0.0 {
                percent(bucket.cost, billed_total)
            } else {
                0.0
            };
        }
        breakdown
    }

    fn top_requests(events: &[UsageEvent]) -> Vec<ExpensiveRequest> {
        let mut ranked: Vec<&UsageEvent> = events.iter().collect();
        // Stable sort keeps encounter order among equal costs.
        ranked.sort_by(|a, b| b.cost.total_cmp(&a.cost));
        ranked
            .into_iter()
            .take(TOP_N)
            .map(|e| ExpensiveRequest {
                timestamp: e.timestamp,
                model: e.model.clone(),
                kind: e.kind.clone(),
                cost: e.cost,
                total_tokens: e.total_tokens,
            })
            .collect()
    }

    fn top_days(mut days_first_seen: Vec<DailyAggregate>) -> Vec<DailyAggregate> {
        days_first_seen.sort_by(|a, b| b.cost.total_cmp(&a.cost));
        days_first_seen.truncate(TOP_N);
        days_first_seen
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
