//! Fallback chain resolver
//!
//! Chains are a static, hand-curated priority order. Self-references and
//! duplicates are removed when the table is loaded, and the shared `default`
//! chain is filtered per lookup so a model never falls back to itself.

use crate::config::{RouterConfig, DEFAULT_CHAIN_KEY};
use std::collections::{BTreeMap, HashSet};
use tracing::warn;

/// Validated fallback chain table
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackChains {
    chains: BTreeMap<String, Vec<String>>,
    default_chain: Vec<String>,
}

impl FallbackChains {
    pub fn new(default_chain: Vec<String>) -> Self {
        Self {
            chains: BTreeMap::new(),
            default_chain: dedupe(DEFAULT_CHAIN_KEY, default_chain, None),
        }
    }

    pub fn from_config(config: &RouterConfig) -> Self {
        let mut chains = Self::new(
            config
                .fallback_chains
                .get(DEFAULT_CHAIN_KEY)
                .cloned()
                .unwrap_or_default(),
        );
        for (model_id, chain) in &config.fallback_chains {
            if model_id != DEFAULT_CHAIN_KEY {
                chains = chains.with_chain(model_id, chain.clone());
            }
        }
        chains
    }

    /// Add or replace the chain for one model
    pub fn with_chain(mut self, model_id: &str, chain: Vec<String>) -> Self {
        let cleaned = dedupe(model_id, chain, Some(model_id));
        self.chains.insert(model_id.to_string(), cleaned);
        self
    }

    /// Ordered alternates to try after `model_id`, never containing `model_id` itself
    pub fn chain_for(&self, model_id: &str) -> Vec<String> {
        match self.chains.get(model_id) {
            Some(chain) => chain.clone(),
            None => self
                .default_chain
                .iter()
                .filter(|candidate| candidate.as_str() != model_id)
                .cloned()
                .collect(),
        }
    }

    pub fn default_chain(&self) -> &[String] {
        &self.default_chain
    }

    pub fn has_specific_chain(&self, model_id: &str) -> bool {
        self.chains.contains_key(model_id)
    }
}

/// Drop repeated entries (first occurrence wins) and an optional self-reference
fn dedupe(owner: &str, chain: Vec<String>, self_id: Option<&str>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut cleaned = Vec::with_capacity(chain.len());

    for model in chain {
        if Some(model.as_str()) == self_id {
            warn!(chain = owner, "Removed self-reference from fallback chain");
            continue;
        }
        if !seen.insert(model.clone()) {
            warn!(chain = owner, model = %model, "Removed duplicate from fallback chain");
            continue;
        }
        cleaned.push(model);
    }

    cleaned
}
