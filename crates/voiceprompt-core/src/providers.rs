//! Provider catalog
//!
//! Static description of every completion provider VoicePrompt knows
//! about: display metadata, the free-tier plan, and the model list.
//! The quota policy reads plans from here; nothing in this module is
//! persisted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ============================================================================
// Plan Types
// ============================================================================

/// How a provider's free-tier counter behaves over time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlanKind {
    /// Counter resets at 00:00 UTC every day
    #[serde(rename = "daily")]
    Daily,
    /// Lifetime allowance that never comes back
    #[serde(rename = "one-time")]
    OneTime,
}

impl std::fmt::Display for PlanKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanKind::Daily => write!(f, "daily"),
            PlanKind::OneTime => write!(f, "one-time"),
        }
    }
}

impl std::str::FromStr for PlanKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" | "day" => Ok(PlanKind::Daily),
            "one-time" | "one_time" | "onetime" | "total" => Ok(PlanKind::OneTime),
            _ => Err(format!("Unknown plan kind: {}", s)),
        }
    }
}

/// Free-tier plan of a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderPlan {
    pub kind: PlanKind,
    /// Units available per cycle (per day, or for the lifetime of a one-time plan)
    pub limit: u64,
    /// Unit label shown next to counters, e.g. "calls/day" or "tokens"
    pub unit: String,
}

impl ProviderPlan {
    pub fn daily(limit: u64, unit: impl Into<String>) -> Self {
        Self {
            kind: PlanKind::Daily,
            limit,
            unit: unit.into(),
        }
    }

    pub fn one_time(limit: u64, unit: impl Into<String>) -> Self {
        Self {
            kind: PlanKind::OneTime,
            limit,
            unit: unit.into(),
        }
    }
}

// ============================================================================
// Provider / Model Metadata
// ============================================================================

/// A model offered by a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub max_tokens: u32,
    /// Calls to this model never count against the provider's quota
    #[serde(default)]
    pub free_forever: bool,
}

impl ModelInfo {
    fn new(id: &str, name: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            max_tokens: 4000,
            free_forever: false,
        }
    }

    fn free_forever(mut self) -> Self {
        self.free_forever = true;
        self
    }
}

/// A completion provider and its free tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub website: String,
    /// Where users create an API key
    pub help_url: String,
    /// Human description of the free tier
    pub free_tier: String,
    pub plan: ProviderPlan,
    pub models: Vec<ModelInfo>,
}

impl ProviderInfo {
    /// Look up one of this provider's models
    pub fn model(&self, model_id: &str) -> Option<&ModelInfo> {
        self.models.iter().find(|m| m.id == model_id)
    }
}

/// Default provider selected on first start
pub const DEFAULT_PROVIDER: &str = "openrouter";

/// Default model selected on first start
pub const DEFAULT_MODEL: &str = "deepseek/deepseek-chat-v3.1:free";

// ============================================================================
// Catalog
// ============================================================================

/// Lookup table of known providers, keyed by provider id
#[derive(Debug, Clone, Default)]
pub struct ProviderCatalog {
    providers: BTreeMap<String, ProviderInfo>,
}

impl ProviderCatalog {
    /// Empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// The providers shipped with VoicePrompt
    pub fn builtin() -> Self {
        let mut catalog = Self::new();

        catalog.insert(ProviderInfo {
            id: "openrouter".to_string(),
            name: "OpenRouter".to_string(),
            description: "Unified API for 200+ models".to_string(),
            website: "https://openrouter.ai".to_string(),
            help_url: "https://openrouter.ai/keys".to_string(),
            free_tier: "50 free calls per day on free models".to_string(),
            plan: ProviderPlan::daily(50, "calls/day"),
            models: vec![
                ModelInfo::new(
                    "deepseek/deepseek-chat-v3.1:free",
                    "DeepSeek V3.1",
                    "Latest DeepSeek chat model",
                ),
                ModelInfo::new(
                    "deepseek/deepseek-r1:free",
                    "DeepSeek R1",
                    "DeepSeek reasoning model",
                ),
                ModelInfo::new(
                    "google/gemini-2.5-flash-preview:free",
                    "Gemini 2.5 Flash",
                    "Lightweight Google model",
                ),
            ],
        });

        catalog.insert(ProviderInfo {
            id: "siliconflow".to_string(),
            name: "SiliconFlow".to_string(),
            description: "Model API platform with permanently free small models".to_string(),
            website: "https://cloud.siliconflow.cn".to_string(),
            help_url: "https://cloud.siliconflow.cn/account/ak".to_string(),
            free_tier: "20M tokens for new users, never expires".to_string(),
            plan: ProviderPlan::one_time(20_000_000, "tokens"),
            models: vec![
                ModelInfo::new(
                    "Qwen/Qwen2.5-7B-Instruct",
                    "Qwen 2.5 7B",
                    "Open Qwen model (free forever)",
                )
                .free_forever(),
                ModelInfo::new(
                    "meta-llama/Meta-Llama-3.1-8B-Instruct",
                    "Llama 3.1 8B",
                    "Open Llama model (free forever)",
                )
                .free_forever(),
            ],
        });

        catalog.insert(ProviderInfo {
            id: "gemini".to_string(),
            name: "Google Gemini".to_string(),
            description: "Official Google AI API".to_string(),
            website: "https://ai.google.dev".to_string(),
            help_url: "https://aistudio.google.com/app/apikey".to_string(),
            free_tier: "20 requests per day on Flash models".to_string(),
            plan: ProviderPlan::daily(20, "calls/day"),
            models: vec![ModelInfo::new(
                "gemini-2.0-flash-exp",
                "Gemini 2.0 Flash",
                "Lightweight Google model",
            )],
        });

        catalog.insert(ProviderInfo {
            id: "groq".to_string(),
            name: "Groq".to_string(),
            description: "Low-latency inference API".to_string(),
            website: "https://groq.com".to_string(),
            help_url: "https://console.groq.com/keys".to_string(),
            free_tier: "14,400 requests per day".to_string(),
            plan: ProviderPlan::daily(14_400, "calls/day"),
            models: vec![ModelInfo::new(
                "llama-3.1-8b-instant",
                "Llama 3.1 8B Instant",
                "Fast Llama model",
            )],
        });

        catalog
    }

    /// Add or replace a provider
    pub fn insert(&mut self, provider: ProviderInfo) {
        self.providers.insert(provider.id.clone(), provider);
    }

    /// Replace the plan of a known provider, or register a plan-only
    /// provider when the id is new
    pub fn apply_plan_override(&mut self, provider_id: &str, plan: ProviderPlan) {
        match self.providers.get_mut(provider_id) {
            Some(provider) => {
                log::debug!(
                    "[providers] Overriding plan for {}: {} {} {}",
                    provider_id,
                    plan.kind,
                    plan.limit,
                    plan.unit
                );
                provider.plan = plan;
            }
            None => {
                log::debug!("[providers] Registering plan-only provider {}", provider_id);
                self.insert(ProviderInfo {
                    id: provider_id.to_string(),
                    name: provider_id.to_string(),
                    description: String::new(),
                    website: String::new(),
                    help_url: String::new(),
                    free_tier: String::new(),
                    plan,
                    models: Vec::new(),
                });
            }
        }
    }

    pub fn get(&self, provider_id: &str) -> Option<&ProviderInfo> {
        self.providers.get(provider_id)
    }

    /// Plan of a provider, if known
    pub fn plan(&self, provider_id: &str) -> Option<&ProviderPlan> {
        self.get(provider_id).map(|p| &p.plan)
    }

    /// Look up a model of a provider
    pub fn model(&self, provider_id: &str, model_id: &str) -> Option<&ModelInfo> {
        self.get(provider_id).and_then(|p| p.model(model_id))
    }

    pub fn contains(&self, provider_id: &str) -> bool {
        self.providers.contains_key(provider_id)
    }

    /// Provider ids in sorted order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProviderInfo> {
        self.providers.values()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_kind_display() {
        assert_eq!(PlanKind::Daily.to_string(), "daily");
        assert_eq!(PlanKind::OneTime.to_string(), "one-time");
    }

    #[test]
    fn test_plan_kind_from_str() {
        assert_eq!("daily".parse::<PlanKind>().unwrap(), PlanKind::Daily);
        assert_eq!("one-time".parse::<PlanKind>().unwrap(), PlanKind::OneTime);
        assert_eq!("TOTAL".parse::<PlanKind>().unwrap(), PlanKind::OneTime);
        assert!("weekly".parse::<PlanKind>().is_err());
    }

    #[test]
    fn test_plan_kind_serde() {
        let plan: ProviderPlan =
            serde_json::from_str(r#"{"kind":"one-time","limit":5,"unit":"tokens"}"#).unwrap();
        assert_eq!(plan, ProviderPlan::one_time(5, "tokens"));
        assert_eq!(
            serde_json::to_string(&PlanKind::Daily).unwrap(),
            "\"daily\""
        );
    }

    #[test]
    fn test_builtin_catalog() {
        let catalog = ProviderCatalog::builtin();
        assert_eq!(catalog.len(), 4);
        assert_eq!(
            catalog.ids().collect::<Vec<_>>(),
            vec!["gemini", "groq", "openrouter", "siliconflow"]
        );

        assert_eq!(catalog.plan("openrouter"), Some(&ProviderPlan::daily(50, "calls/day")));
        assert_eq!(catalog.plan("gemini").unwrap().limit, 20);
        assert_eq!(catalog.plan("groq").unwrap().limit, 14_400);

        let sf = catalog.plan("siliconflow").unwrap();
        assert_eq!(sf.kind, PlanKind::OneTime);
        assert_eq!(sf.limit, 20_000_000);
        assert!(catalog.plan("foo").is_none());
    }

    #[test]
    fn test_free_forever_models() {
        let catalog = ProviderCatalog::builtin();
        assert!(catalog
            .model("siliconflow", "Qwen/Qwen2.5-7B-Instruct")
            .unwrap()
            .free_forever);
        assert!(!catalog
            .model("openrouter", DEFAULT_MODEL)
            .unwrap()
            .free_forever);
        assert!(catalog.model("openrouter", "nope").is_none());
    }

    #[test]
    fn test_default_model_exists() {
        let catalog = ProviderCatalog::builtin();
        assert!(catalog.model(DEFAULT_PROVIDER, DEFAULT_MODEL).is_some());
    }

    #[test]
    fn test_apply_plan_override() {
        let mut catalog = ProviderCatalog::builtin();
        catalog.apply_plan_override("gemini", ProviderPlan::daily(100, "calls/day"));
        assert_eq!(catalog.plan("gemini").unwrap().limit, 100);
        // Metadata is preserved
        assert_eq!(catalog.get("gemini").unwrap().name, "Google Gemini");

        catalog.apply_plan_override("local", ProviderPlan::one_time(10, "calls"));
        assert!(catalog.contains("local"));
        assert!(catalog.get("local").unwrap().models.is_empty());
    }
}
