//! Temporal usage patterns: hour-of-day and day-of-week distributions,
//! sprint-day detection, and a work-style profile.
//!
//! All times are bucketed in UTC.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use tracing::debug;
use usage_core::error::{InsightError, Result};
use usage_core::formatting::{format_currency, format_percent};
use usage_core::models::UsageEvent;
use usage_core::stats::{coefficient_of_variation, mean, percent, percentile, population_std_dev};

use crate::cost::CostSummary;

/// Number of peak hours reported.
pub const PEAK_HOURS: usize = 3;
/// Number of sprint days reported.
pub const MAX_SPRINT_DAYS: usize = 5;
/// Standard deviations above the mean that mark a sprint day.
pub const SPRINT_SIGMA: f64 = 2.0;
/// First UTC hour counted as evening (through 23:59).
pub const EVENING_START_HOUR: u32 = 18;
/// Evening share above which the user is a night coder.
pub const NIGHT_CODER_PERCENT: f64 = 40.0;
/// Saturday + Sunday share above which the user is a weekend warrior.
pub const WEEKEND_WARRIOR_PERCENT: f64 = 20.0;
/// Daily-cost CV above which spending is bursty.
pub const SPRINT_WORKER_CV: f64 = 0.5;
/// Daily-cost CV below which spending is steady.
pub const STEADY_USER_CV: f64 = 0.3;
/// Minimum span (days, exclusive) before CV-based styles apply.
pub const MIN_PERIOD_DAYS: u64 = 7;

// ── Output types ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourBucket {
    /// UTC hour, 0–23.
    pub hour: u32,
    pub requests: u64,
    pub cost: f64,
    /// Share of all requests.
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekdayBucket {
    /// English day name, Monday first.
    pub day: String,
    pub requests: u64,
    pub cost: f64,
    /// Share of all requests.
    pub percentage: f64,
}

/// A day whose cost is an outlier against the user's own history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SprintDay {
    pub date: NaiveDate,
    pub cost: f64,
    pub requests: u64,
    /// `cost − mean`.
    pub deviation: f64,
    /// `deviation / mean × 100`.
    pub deviation_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SprintAnalysis {
    pub mean_daily_cost: f64,
    pub median_daily_cost: f64,
    pub std_dev_daily_cost: f64,
    /// `mean + 2σ`.
    pub threshold: f64,
    /// Every day above the threshold, before truncation.
    pub sprint_count: usize,
    /// Top sprint days by cost.
    pub sprint_days: Vec<SprintDay>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkStyle {
    NightCoder,
    WeekendWarrior,
    SprintWorker,
    SteadyUser,
}

impl WorkStyle {
    pub fn label(&self) -> &'static str {
        match self {
            WorkStyle::NightCoder => "Night coder",
            WorkStyle::WeekendWarrior => "Weekend warrior",
            WorkStyle::SprintWorker => "Sprint worker",
            WorkStyle::SteadyUser => "Steady user",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Consistency {
    Steady,
    Moderate,
    Bursty,
}

impl Consistency {
    pub fn from_cv(cv: f64) -> Self {
        if cv < STEADY_USER_CV {
            Consistency::Steady
        } else if cv < SPRINT_WORKER_CV {
            Consistency::Moderate
        } else {
            Consistency::Bursty
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkStyleProfile {
    /// Every matching style; never empty.
    pub styles: Vec<WorkStyle>,
    pub primary_style: WorkStyle,
    pub evening_percentage: f64,
    pub weekend_percentage: f64,
    /// Coefficient of variation of daily cost.
    pub coefficient_of_variation: f64,
    pub consistency: Consistency,
    /// Calendar span the profile covers.
    pub period_days: u64,
}

/// Output of [`UsagePatternAnalyzer::analyze`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsagePatterns {
    pub hourly: Vec<HourBucket>,
    pub day_of_week: Vec<WeekdayBucket>,
    /// Busiest UTC hours, most requests first.
    pub peak_hours: Vec<u32>,
    pub sprints: SprintAnalysis,
    pub work_style: WorkStyleProfile,
    pub recommendations: Vec<String>,
}

// ── UsagePatternAnalyzer ──────────────────────────────────────────────────────

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

pub struct UsagePatternAnalyzer;

impl UsagePatternAnalyzer {
    pub fn analyze(events: &[UsageEvent], summary: &CostSummary) -> Result<UsagePatterns> {
        if events.is_empty() {
            return Err(InsightError::validation(
                "usage pattern analysis requires at least one usage event",
            ));
        }
        if summary.days == 0 {
            return Err(InsightError::logic("cost summary covers zero days"));
        }

        let hourly = Self::hourly(events);
        let day_of_week = Self::day_of_week(events);
        let peak_hours = Self::peak_hours(&hourly);

        let daily = Self::daily_costs(events);
        let daily_costs: Vec<f64> = daily.values().map(|(cost, _)| *cost).collect();
        let sprints = Self::detect_sprints(&daily, &daily_costs);

        let work_style = Self::work_style(
            &hourly,
            &day_of_week,
            &daily_costs,
            summary.date_range.span_days,
        );
        let recommendations = Self::recommendations(&work_style, &sprints);

        debug!(
            "UsagePatternAnalyzer: primary style {:?}, {} sprint days",
            work_style.primary_style, sprints.sprint_count
        );

        Ok(UsagePatterns {
            hourly,
            day_of_week,
            peak_hours,
            sprints,
            work_style,
            recommendations,
        })
    }

    // ── Distributions ─────────────────────────────────────────────────────────

    fn hourly(events: &[UsageEvent]) -> Vec<HourBucket> {
        let mut buckets: Vec<HourBucket> = (0..24)
            .map(|hour| HourBucket {
                hour,
                requests: 0,
                cost: 0.0,
                percentage: 0.0,
            })
            .collect();
        for event in events {
            let bucket = &mut buckets[event.timestamp.hour() as usize];
            bucket.requests += 1;
            bucket.cost += event.cost;
        }
        let total = events.len() as f64;
        for bucket in buckets.iter_mut() {
            bucket.percentage = percent(bucket.requests as f64, total);
        }
        buckets
    }

    fn day_of_week(events: &[UsageEvent]) -> Vec<WeekdayBucket> {
        let mut buckets: Vec<WeekdayBucket> = WEEKDAYS
            .iter()
            .map(|d| WeekdayBucket {
                day: weekday_name(*d).to_string(),
                requests: 0,
                cost: 0.0,
                percentage: 0.0,
            })
            .collect();
        for event in events {
            let idx = event.timestamp.weekday().num_days_from_monday() as usize;
            buckets[idx].requests += 1;
            buckets[idx].cost += event.cost;
        }
        let total = events.len() as f64;
        for bucket in buckets.iter_mut() {
            bucket.percentage = percent(bucket.requests as f64, total);
        }
        buckets
    }

    /// Top hours by request count; ties go to the earlier hour.
    fn peak_hours(hourly: &[HourBucket]) -> Vec<u32> {
        let mut active: Vec<&HourBucket> = hourly.iter().filter(|b| b.requests > 0).collect();
        active.sort_by(|a, b| b.requests.cmp(&a.requests));
        active.into_iter().take(PEAK_HOURS).map(|b| b.hour).collect()
    }

    // ── Sprints ───────────────────────────────────────────────────────────────

    /// `(cost, requests)` per active day, chronological.
    fn daily_costs(events: &[UsageEvent]) -> BTreeMap<NaiveDate, (f64, u64)> {
        let mut days: BTreeMap<NaiveDate, (f64, u64)> = BTreeMap::new();
        for event in events {
            let entry = days.entry(event.day()).or_insert((0.0, 0));
            entry.0 += event.cost;
            entry.1 += 1;
        }
        days
    }

    fn detect_sprints(daily: &BTreeMap<NaiveDate, (f64, u64)>, costs: &[f64]) -> SprintAnalysis {
        let mean_cost = mean(costs);
        let std_dev = population_std_dev(costs);
        let threshold = mean_cost + SPRINT_SIGMA * std_dev;

        let mut sorted = costs.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let median = percentile(&sorted, 50.0);

        let mut sprint_days: Vec<SprintDay> = daily
            .iter()
            .filter(|(_, (cost, _))| *cost > threshold)
            .map(|(date, (cost, requests))| SprintDay {
                date: *date,
                cost: *cost,
                requests: *requests,
                deviation: cost - mean_cost,
                deviation_percentage: percent(cost - mean_cost, mean_cost),
            })
            .collect();
        let sprint_count = sprint_days.len();
        sprint_days.sort_by(|a, b| b.cost.total_cmp(&a.cost));
        sprint_days.truncate(MAX_SPRINT_DAYS);

        SprintAnalysis {
            mean_daily_cost: mean_cost,
            median_daily_cost: median,
            std_dev_daily_cost: std_dev,
            threshold,
            sprint_count,
            sprint_days,
        }
    }

    // ── Work style ────────────────────────────────────────────────────────────

    fn work_style(
        hourly: &[HourBucket],
        day_of_week: &[WeekdayBucket],
        daily_costs: &[f64],
        period_days: u64,
    ) -> WorkStyleProfile {
        let evening_percentage: f64 = hourly
            .iter()
            .filter(|b| b.hour >= EVENING_START_HOUR)
            .map(|b| b.percentage)
            .sum();
        // Monday-first: Saturday and Sunday are the last two.
        let weekend_percentage: f64 = day_of_week[5..].iter().map(|b| b.percentage).sum();

        let cv = coefficient_of_variation(daily_costs);
        let long_enough = period_days > MIN_PERIOD_DAYS;

        let mut styles = Vec::new();
        if evening_percentage > NIGHT_CODER_PERCENT {
            styles.push(WorkStyle::NightCoder);
        }
        if weekend_percentage > WEEKEND_WARRIOR_PERCENT {
            styles.push(WorkStyle::WeekendWarrior);
        }
        if cv > SPRINT_WORKER_CV && long_enough {
            styles.push(WorkStyle::SprintWorker);
        }
        if cv < STEADY_USER_CV && long_enough {
            styles.push(WorkStyle::SteadyUser);
        }
        if styles.is_empty() {
            styles.push(WorkStyle::SteadyUser);
        }

        WorkStyleProfile {
            primary_style: styles[0],
            styles,
            evening_percentage,
            weekend_percentage,
            coefficient_of_variation: cv,
            consistency: Consistency::from_cv(cv),
            period_days,
        }
    }

    fn recommendations(profile: &WorkStyleProfile, sprints: &SprintAnalysis) -> Vec<String> {
        let mut out: Vec<String> = profile
            .styles
            .iter()
            .map(|style| match style {
                WorkStyle::NightCoder => format!(
                    "{} of requests happen in the evening (UTC); check that long late sessions are not re-sending context a fresh morning session would cache.",
                    format_percent(profile.evening_percentage)
                ),
                WorkStyle::WeekendWarrior => format!(
                    "{} of requests fall on weekends; a plan sized for weekday use may run short.",
                    format_percent(profile.weekend_percentage)
                ),
                WorkStyle::SprintWorker => {
                    "Spending comes in bursts; a plan with headroom avoids on-demand charges during sprints.".to_string()
                }
                WorkStyle::SteadyUser => {
                    "Usage is steady; a fixed-price plan sized to your average month fits well.".to_string()
                }
            })
            .collect();

        if let Some(top) = sprints.sprint_days.first() {
            out.push(format!(
                "Sprint day {} cost {} ({} above your daily average); review what drove it.",
                top.date,
                format_currency(top.cost),
                format_percent(top.deviation_percentage)
            ));
        }
        out
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::CostAnalyzer;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    /// 2025-03-03 is a Monday.
    fn monday(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 3, hour, 0, 0).unwrap()
    }

    fn event(ts: DateTime<Utc>, cost: f64) -> UsageEvent {
        UsageEvent::new(ts, "Included", "auto", cost)
    }

    fn analyze(events: &[UsageEvent]) -> UsagePatterns {
        let cost = CostAnalyzer::analyze(events).unwrap();
        UsagePatternAnalyzer::analyze(events, &cost.summary).unwrap()
    }

    /// One event per weekday at 10:00 UTC for `days` days starting Monday,
    /// with weekend days skipped.
    fn weekday_series(days: i64, cost: impl Fn(i64) -> f64) -> Vec<UsageEvent> {
        (0..days)
            .map(|d| monday(10) + Duration::days(d))
            .filter(|ts| ts.weekday().num_days_from_monday() < 5)
            .enumerate()
            .map(|(i, ts)| event(ts, cost(i as i64)))
            .collect()
    }

    // ── Distributions ─────────────────────────────────────────────────────────

    #[test]
    fn test_hourly_distribution_sums_to_100() {
        let events = vec![event(monday(9), 1.0), event(monday(9), 1.0), event(monday(14), 1.0)];
        let patterns = analyze(&events);
        assert_eq!(patterns.hourly.len(), 24);
        assert_eq!(patterns.hourly[9].requests, 2);
        let sum: f64 = patterns.hourly.iter().map(|b| b.percentage).sum();
        assert!((sum - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_day_of_week_monday_first() {
        let events = vec![event(monday(9), 1.0), event(monday(9) + Duration::days(6), 2.0)];
        let patterns = analyze(&events);
        assert_eq!(patterns.day_of_week.len(), 7);
        assert_eq!(patterns.day_of_week[0].day, "Monday");
        assert_eq!(patterns.day_of_week[0].requests, 1);
        assert_eq!(patterns.day_of_week[6].day, "Sunday");
        assert!((patterns.day_of_week[6].cost - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_peak_hours_top_three_ties_to_earlier_hour() {
        let mut events = Vec::new();
        for (hour, n) in [(8, 1), (11, 4), (15, 2), (16, 2), (20, 2)] {
            for _ in 0..n {
                events.push(event(monday(hour), 1.0));
            }
        }
        let patterns = analyze(&events);
        assert_eq!(patterns.peak_hours, vec![11, 15, 16]);
    }

    // ── Sprints ───────────────────────────────────────────────────────────────

    #[test]
    fn test_sprint_day_detected_above_two_sigma() {
        // Nine $1 days and one $20 day: mean 2.9, σ 5.7, threshold 14.3.
        let events: Vec<UsageEvent> = (0..10)
            .map(|d| event(monday(10) + Duration::days(d), if d == 4 { 20.0 } else { 1.0 }))
            .collect();
        let patterns = analyze(&events);
        let sprints = &patterns.sprints;
        assert!((sprints.mean_daily_cost - 2.9).abs() < 1e-9);
        assert!((sprints.std_dev_daily_cost - 5.7).abs() < 1e-9);
        assert!((sprints.threshold - 14.3).abs() < 1e-9);
        assert_eq!(sprints.sprint_count, 1);
        let day = &sprints.sprint_days[0];
        assert_eq!(day.date, NaiveDate::from_ymd_opt(2025, 3, 7).unwrap());
        assert!((day.deviation - 17.1).abs() < 1e-9);
        assert!((day.deviation_percentage - 17.1 / 2.9 * 100.0).abs() < 1e-6);
        assert!((sprints.median_daily_cost - 1.0).abs() < 1e-9);
        // The sprint day gets its own recommendation.
        assert!(patterns.recommendations.iter().any(|r| r.contains("2025-03-07")));
    }

    #[test]
    fn test_no_sprints_for_uniform_days() {
        let events = weekday_series(14, |_| 3.0);
        let patterns = analyze(&events);
        assert_eq!(patterns.sprints.sprint_count, 0);
        assert!(patterns.sprints.sprint_days.is_empty());
    }

    // ── Work style ────────────────────────────────────────────────────────────

    #[test]
    fn test_night_coder() {
        let events = vec![event(monday(19), 1.0), event(monday(22), 1.0), event(monday(9), 1.0)];
        let patterns = analyze(&events);
        let ws = &patterns.work_style;
        assert!((ws.evening_percentage - 200.0 / 3.0).abs() < 1e-9);
        assert!(ws.styles.contains(&WorkStyle::NightCoder));
        assert_eq!(ws.primary_style, WorkStyle::NightCoder);
    }

    #[test]
    fn test_weekend_warrior() {
        // 2025-03-01 is a Saturday.
        let saturday = Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap();
        let events = vec![event(saturday, 1.0), event(monday(10), 1.0), event(monday(11), 1.0)];
        let patterns = analyze(&events);
        assert!(patterns.work_style.weekend_percentage > WEEKEND_WARRIOR_PERCENT);
        assert!(patterns.work_style.styles.contains(&WorkStyle::WeekendWarrior));
    }

    #[test]
    fn test_sprint_worker_needs_long_period() {
        let bursty = |i: i64| if i % 3 == 0 { 10.0 } else { 0.5 };
        let long = analyze(&weekday_series(21, bursty));
        assert!(long.work_style.coefficient_of_variation > SPRINT_WORKER_CV);
        assert!(long.work_style.styles.contains(&WorkStyle::SprintWorker));
        assert_eq!(long.work_style.consistency, Consistency::Bursty);

        // Same shape over five days does not qualify.
        let short = analyze(&weekday_series(5, bursty));
        assert!(!short.work_style.styles.contains(&WorkStyle::SprintWorker));
    }

    #[test]
    fn test_steady_user_over_long_period() {
        let patterns = analyze(&weekday_series(14, |_| 2.0));
        let ws = &patterns.work_style;
        assert_eq!(ws.styles, vec![WorkStyle::SteadyUser]);
        assert_eq!(ws.consistency, Consistency::Steady);
        assert_eq!(ws.period_days, 12);
    }

    #[test]
    fn test_default_style_is_steady_user() {
        let events = vec![event(monday(10), 1.0), event(monday(11), 5.0)];
        let patterns = analyze(&events);
        assert_eq!(patterns.work_style.styles, vec![WorkStyle::SteadyUser]);
        assert_eq!(patterns.recommendations.len(), 1);
    }

    #[test]
    fn test_consistency_labels() {
        assert_eq!(Consistency::from_cv(0.1), Consistency::Steady);
        assert_eq!(Consistency::from_cv(0.3), Consistency::Moderate);
        assert_eq!(Consistency::from_cv(0.5), Consistency::Bursty);
    }

    #[test]
    fn test_empty_input_rejected() {
        let events = vec![event(monday(10), 1.0)];
        let summary = CostAnalyzer::analyze(&events).unwrap().summary;
        assert!(UsagePatternAnalyzer::analyze(&[], &summary).is_err());
    }
}
