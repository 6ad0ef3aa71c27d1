use crate::rules::{RuleSet, RulesEngine};
use std::time::Duration;

/// Runtime settings for one room server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub tick_duration: Duration,
    pub max_clients: usize,
    /// Connections silent for this long are dropped.
    pub client_timeout: Duration,
    pub rules: RuleSet,
    /// Fixed seed for team assignment; entropy when absent.
    pub seed: Option<u64>,
}

impl ServerConfig {
    pub fn rules_engine(&self) -> RulesEngine {
        match self.seed {
            Some(seed) => RulesEngine::seeded(self.rules, seed),
            None => RulesEngine::from_entropy(self.rules),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            tick_duration: Duration::from_millis(50),
            max_clients: 16,
            client_timeout: Duration::from_secs(5),
            rules: RuleSet::default(),
            seed: None,
        }
    }
}
