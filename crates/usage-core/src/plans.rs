use serde::{Deserialize, Serialize};

/// Subscription tiers offered by the coding tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    /// No subscription.
    Free,
    /// $20/month plan.
    Pro,
    /// $200/month plan.
    Ultra,
}

impl PlanTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Free => "free",
            PlanTier::Pro => "pro",
            PlanTier::Ultra => "ultra",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PlanTier::Free => "Free",
            PlanTier::Pro => "Pro",
            PlanTier::Ultra => "Ultra",
        }
    }

    /// Fixed price and request cap for this tier.
    pub fn config(&self) -> PlanConfig {
        match self {
            PlanTier::Free => PlanConfig {
                tier: PlanTier::Free,
                monthly_price: 0.0,
                request_cap: 50,
            },
            PlanTier::Pro => PlanConfig {
                tier: PlanTier::Pro,
                monthly_price: 20.0,
                request_cap: 500,
            },
            PlanTier::Ultra => PlanConfig {
                tier: PlanTier::Ultra,
                monthly_price: 200.0,
                request_cap: 10_000,
            },
        }
    }

    pub fn monthly_price(&self) -> f64 {
        self.config().monthly_price
    }

    pub fn request_cap(&self) -> u64 {
        self.config().request_cap
    }
}

impl std::fmt::Display for PlanTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Immutable pricing record for one tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanConfig {
    pub tier: PlanTier,
    /// Monthly subscription price in USD.
    pub monthly_price: f64,
    /// Requests included per 30 days.
    pub request_cap: u64,
}

/// Length of a billing month used for projections.
pub const DAYS_PER_MONTH: f64 = 30.0;

/// Scale a per-period figure observed over `days` to a 30-day month.
///
/// Returns `0.0` when `days` is zero.
pub fn monthly_projection(value: f64, days: u64) -> f64 {
    if days == 0 {
        return 0.0;
    }
    value / days as f64 * DAYS_PER_MONTH
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_prices_and_caps() {
        assert_eq!(PlanTier::Free.monthly_price(), 0.0);
        assert_eq!(PlanTier::Pro.monthly_price(), 20.0);
        assert_eq!(PlanTier::Ultra.monthly_price(), 200.0);
        assert_eq!(PlanTier::Free.request_cap(), 50);
        assert_eq!(PlanTier::Pro.request_cap(), 500);
        assert_eq!(PlanTier::Ultra.request_cap(), 10_000);
    }

    #[test]
    fn test_plan_tier_ordering() {
        assert!(PlanTier::Free < PlanTier::Pro);
        assert!(PlanTier::Pro < PlanTier::Ultra);
    }

    #[test]
    fn test_plan_tier_serde() {
        let json = serde_json::to_string(&PlanTier::Ultra).unwrap();
        assert_eq!(json, r#""ultra""#);
        let back: PlanTier = serde_json::from_str(&json).unwrap();
        assert_eq!(back, PlanTier::Ultra);
    }

    #[test]
    fn test_monthly_projection() {
        assert!((monthly_projection(45.0, 2) - 675.0).abs() < 1e-9);
        assert_eq!(monthly_projection(10.0, 0), 0.0);
    }
}
