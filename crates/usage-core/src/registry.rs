use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

/// Cost tier a model falls into, judged by its cost per million tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelCategory {
    /// Under $50 per million tokens.
    CostEfficient,
    /// Under $500 per million tokens.
    Specialized,
    /// $500 per million tokens or more.
    Premium,
}

impl ModelCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelCategory::CostEfficient => "cost-efficient",
            ModelCategory::Specialized => "specialized",
            ModelCategory::Premium => "premium",
        }
    }

    /// Recommendation used when the registry has no entry for a model.
    pub fn fallback_recommendation(&self) -> &'static str {
        match self {
            ModelCategory::CostEfficient => {
                "Cost-efficient choice; a good default for everyday edits and questions."
            }
            ModelCategory::Specialized => {
                "Mid-priced model; keep it for tasks that clearly benefit from its strengths."
            }
            ModelCategory::Premium => {
                "Premium pricing; reserve for complex problems and route routine work to a cheaper model."
            }
        }
    }
}

/// Static facts about a known model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelProfile {
    /// Canonical model key, matched against event model names.
    pub key: String,
    /// Whether the model is billed mostly for reasoning output.
    pub reasoning: bool,
    /// Human-readable usage advice.
    pub recommendation: String,
}

impl ModelProfile {
    pub fn new(key: &str, reasoning: bool, recommendation: &str) -> Self {
        Self {
            key: key.to_string(),
            reasoning,
            recommendation: recommendation.to_string(),
        }
    }
}

/// Name fragments that mark a reasoning model absent a registry entry.
const REASONING_MARKERS: &[&str] = &["thinking", "reasoning", "-r1"];

/// Model families that only count as a whole name segment (`o1-preview`,
/// `openai/o3`), never inside another word.
const REASONING_SEGMENTS: &[&str] = &["o1", "o3", "o4-mini"];

/// True when `marker` occurs in `name` bounded by the start or a separator
/// on the left and the end or `-` on the right.
fn has_segment(name: &str, marker: &str) -> bool {
    name.match_indices(marker).any(|(start, _)| {
        let before = name[..start].chars().next_back();
        let after = name[start + marker.len()..].chars().next();
        matches!(before, None | Some('-' | '_' | '/' | ' ')) && matches!(after, None | Some('-'))
    })
}

fn builtin_profiles() -> Vec<ModelProfile> {
    vec![
        ModelProfile::new(
            "claude-4-opus-thinking",
            true,
            "Top-tier reasoning at a steep price; use for architecture work and hard debugging only.",
        ),
        ModelProfile::new(
            "claude-4-opus",
            false,
            "Very capable but expensive; Sonnet handles most day-to-day coding at a fraction of the cost.",
        ),
        ModelProfile::new(
            "claude-4-sonnet-thinking",
            true,
            "Strong reasoning for multi-file changes; switch to plain Sonnet for simple edits.",
        ),
        ModelProfile::new(
            "claude-4-sonnet",
            false,
            "Balanced quality and cost; a solid default for agentic coding.",
        ),
        ModelProfile::new(
            "claude-3.7-sonnet",
            false,
            "Older Sonnet generation; consider claude-4-sonnet for better results at similar cost.",
        ),
        ModelProfile::new(
            "claude-3.5-sonnet",
            false,
            "Reliable for completions and refactors; newer Sonnet models offer better value.",
        ),
        ModelProfile::new(
            "gpt-4.1",
            false,
            "Good general-purpose model with a large context window at moderate cost.",
        ),
        ModelProfile::new(
            "gpt-4o",
            false,
            "Fast general-purpose model; fine for chat and small edits.",
        ),
        ModelProfile::new(
            "o3-pro",
            true,
            "Extremely expensive reasoning; reserve for problems other models failed to solve.",
        ),
        ModelProfile::new(
            "o3",
            true,
            "Deep reasoning model; pair with a cheaper model for routine implementation.",
        ),
        ModelProfile::new(
            "o4-mini",
            true,
            "Inexpensive reasoning; a good fit for planning and test generation.",
        ),
        ModelProfile::new(
            "gemini-2.5-pro",
            false,
            "Large context and strong coding ability at a competitive price.",
        ),
        ModelProfile::new(
            "gemini-2.5-flash",
            false,
            "Very cheap and fast; ideal for bulk edits and quick questions.",
        ),
        ModelProfile::new(
            "deepseek-r1",
            true,
            "Low-cost reasoning model; good value for algorithmic problems.",
        ),
        ModelProfile::new(
            "grok-3",
            false,
            "Capable general model; compare its output quality with cheaper alternatives.",
        ),
        ModelProfile::new(
            "auto",
            false,
            "Automatic model selection keeps costs predictable for everyday work.",
        ),
    ]
}

/// Read-only lookup table of known models.
///
/// Analyzers take a `&ModelRegistry` so tests can substitute their own table;
/// [`ModelRegistry::builtin`] is the shared default.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    profiles: Vec<ModelProfile>,
}

impl ModelRegistry {
    /// Build a registry from an explicit set of profiles.
    pub fn new(profiles: Vec<ModelProfile>) -> Self {
        Self { profiles }
    }

    /// The process-wide default registry.
    pub fn builtin() -> &'static ModelRegistry {
        static BUILTIN: OnceLock<ModelRegistry> = OnceLock::new();
        BUILTIN.get_or_init(|| ModelRegistry::new(builtin_profiles()))
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Resolve the profile for `model`, consulting in priority order:
    /// 1. Exact key.
    /// 2. Case-insensitive key.
    /// 3. Longest key contained in the lowercased model name.
    pub fn lookup(&self, model: &str) -> Option<&ModelProfile> {
        if let Some(p) = self.profiles.iter().find(|p| p.key == model) {
            return Some(p);
        }

        let lower = model.to_lowercase();
        if let Some(p) = self.profiles.iter().find(|p| p.key.to_lowercase() == lower) {
            return Some(p);
        }

        self.profiles
            .iter()
            .filter(|p| lower.contains(&p.key.to_lowercase()))
            .max_by_key(|p| p.key.len())
    }

    /// Registry flag if known, otherwise a name heuristic.
    pub fn is_reasoning(&self, model: &str) -> bool {
        match self.lookup(model) {
            Some(p) => p.reasoning,
            None => {
                let lower = model.to_lowercase();
                REASONING_MARKERS.iter().any(|m| lower.contains(m))
                    || REASONING_SEGMENTS.iter().any(|m| has_segment(&lower, m))
            }
        }
    }

    /// Registry advice if known, otherwise the category fallback.
    pub fn recommendation(&self, model: &str, category: ModelCategory) -> String {
        self.lookup(model)
            .map(|p| p.recommendation.clone())
            .unwrap_or_else(|| category.fallback_recommendation().to_string())
    }
}
